//! Opaque byte blobs

use crate::error::Result;
use crate::object::{Allocator, DeepCopy, Entity, EntityType, Object, Ref};
use crate::type_registry::{Describe, StructKind};
use std::any::Any;

/// Tagged byte buffer, used for serialized contexts and module data
pub struct Blob {
    data: Vec<u8>,
    /// Short type tag, e.g. a context type
    tag: String,
    object: Object,
}

impl Blob {
    /// Create an untagged blob
    pub fn new(data: Vec<u8>, alloc: Option<Allocator>) -> Ref<Blob> {
        Self::tagged(data, "", alloc)
    }

    /// Create a blob carrying a type tag
    pub fn tagged(data: Vec<u8>, tag: impl Into<String>, alloc: Option<Allocator>) -> Ref<Blob> {
        Ref::new(Self {
            data,
            tag: tag.into(),
            object: Object::new(StructKind::Blob, alloc),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Entity for Blob {
    fn object(&self) -> &Object {
        &self.object
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for Blob {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{} ({} bytes{}{})",
                self.object.default_description(Describe::Long),
                self.data.len(),
                if self.tag.is_empty() { "" } else { ", " },
                self.tag
            ),
            _ => self.object.default_description(form),
        }
    }
}

impl DeepCopy for Blob {
    fn deep_copy(&self, object: Object) -> Result<Self> {
        Ok(Self {
            data: self.data.clone(),
            tag: self.tag.clone(),
            object,
        })
    }
}
