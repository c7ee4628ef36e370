use super::ClientError;
use crate::api::ImageMetadata;

/// Opens connections to image registries
pub trait RegistryClient {
    /// An empty `registry` means the default public registry
    fn connect(
        &self,
        registry: &str,
        allow_insecure: bool,
    ) -> Result<Box<dyn RegistryConnection + '_>, ClientError>;
}

pub trait RegistryConnection {
    /// Exact tag lookup; an empty tag means the default tag
    fn image_by_tag(
        &self,
        namespace: &str,
        name: &str,
        tag: &str,
    ) -> Result<ImageMetadata, ClientError>;
}
