use super::ClientError;
use crate::api::{ImageMetadata, ImageStream, Template};

/// Read access to image streams, scoped by namespace
pub trait ImageStreamClient {
    fn list_image_streams(&self, namespace: &str) -> Result<Vec<ImageStream>, ClientError>;

    fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, ClientError>;

    /// Metadata for the image `image_id` recorded in `stream`
    fn get_image_stream_image(
        &self,
        namespace: &str,
        stream: &str,
        image_id: &str,
    ) -> Result<ImageMetadata, ClientError>;
}

/// Read access to templates, scoped by namespace
pub trait TemplateClient {
    fn list_templates(&self, namespace: &str) -> Result<Vec<Template>, ClientError>;
}
