//! Gates that decide which generated objects are emitted

use crate::api::Object;
use crate::client::ImageStreamClient;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::debug;

/// Decides whether an object is emitted
pub trait Acceptor {
    fn accept(&self, object: &Object) -> bool;
}

/// Accepts each shared pipeline part the first time it is seen.
///
/// Parts are compared by identity, so one image or deployment reachable
/// from several pipelines is emitted once.
#[derive(Debug, Default)]
pub struct AcceptFirst {
    seen: RefCell<HashSet<usize>>,
}

impl AcceptFirst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_part<T: ?Sized>(&self, part: &Rc<T>) -> bool {
        let key = Rc::as_ptr(part) as *const () as usize;
        self.seen.borrow_mut().insert(key)
    }
}

/// Accepts the first object of each kind, namespace and name
#[derive(Debug, Default)]
pub struct AcceptUnique {
    seen: RefCell<HashSet<(String, String, String)>>,
}

impl AcceptUnique {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Acceptor for AcceptUnique {
    fn accept(&self, object: &Object) -> bool {
        let key = (
            object.kind().to_string(),
            object.namespace().to_string(),
            object.name().to_string(),
        );
        self.seen.borrow_mut().insert(key)
    }
}

/// Rejects objects read back from the server
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptNew;

impl Acceptor for AcceptNew {
    fn accept(&self, object: &Object) -> bool {
        !object.exists_on_server()
    }
}

/// Rejects image streams that already exist in the target namespace
pub struct AcceptNonExistentImageStream {
    client: Rc<dyn ImageStreamClient>,
    namespace: String,
}

impl AcceptNonExistentImageStream {
    pub fn new(client: Rc<dyn ImageStreamClient>, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

impl Acceptor for AcceptNonExistentImageStream {
    fn accept(&self, object: &Object) -> bool {
        let Object::ImageStream(stream) = object else {
            return true;
        };
        match self.client.get_image_stream(&self.namespace, stream.name()) {
            Ok(_) => {
                debug!(
                    stream = stream.name(),
                    namespace = %self.namespace,
                    "image stream already exists"
                );
                false
            }
            Err(_) => true,
        }
    }
}

/// Accepts an object only when every member does
#[derive(Default)]
pub struct Acceptors(pub Vec<Box<dyn Acceptor>>);

impl Acceptor for Acceptors {
    fn accept(&self, object: &Object) -> bool {
        self.0.iter().all(|a| a.accept(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ImageStream, ObjectMeta};
    use crate::client::Catalog;

    fn stream(namespace: &str, name: &str) -> Object {
        let mut meta = ObjectMeta::named(name);
        meta.namespace = namespace.to_string();
        Object::ImageStream(ImageStream::new(meta))
    }

    #[test]
    fn test_accept_first_uses_identity() {
        let accept = AcceptFirst::new();
        let a = Rc::new("ruby".to_string());
        let b = Rc::new("ruby".to_string());
        assert!(accept.accept_part(&a));
        assert!(!accept.accept_part(&Rc::clone(&a)));
        assert!(accept.accept_part(&b));
    }

    #[test]
    fn test_accept_unique_by_kind_namespace_name() {
        let accept = AcceptUnique::new();
        assert!(accept.accept(&stream("", "ruby")));
        assert!(!accept.accept(&stream("", "ruby")));
        assert!(accept.accept(&stream("other", "ruby")));
    }

    #[test]
    fn test_accept_new_rejects_existing_objects() {
        let mut existing = ImageStream::new(ObjectMeta::named("ruby"));
        existing.metadata.resource_version = Some("12".to_string());
        assert!(!AcceptNew.accept(&Object::ImageStream(existing)));
        assert!(AcceptNew.accept(&stream("", "ruby")));
    }

    #[test]
    fn test_non_existent_image_stream_and_composition() {
        let mut meta = ObjectMeta::named("ruby");
        meta.namespace = "myproject".to_string();
        let catalog = Catalog::default().with_image_stream(ImageStream::new(meta));
        let accept = Acceptors(vec![
            Box::new(AcceptNonExistentImageStream::new(Rc::new(catalog), "myproject")),
            Box::new(AcceptUnique::new()),
        ]);

        assert!(!accept.accept(&stream("", "ruby")));
        assert!(accept.accept(&stream("", "mysql")));
        assert!(!accept.accept(&stream("", "mysql")));
    }
}
