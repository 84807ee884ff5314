//! Loaded module handles

use crate::info::{ModuleId, ModuleInfo};
use crate::library::LibraryLease;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tint_core::object::{Child, Entity, EntityType, NameType, Object, Ref};
use tint_core::{Describe, StructKind};

/// A loaded module: where it came from and its record
pub struct ModuleHandle {
    lib_name: String,
    source: String,
    info: Ref<ModuleInfo>,
    lease: Option<Arc<LibraryLease>>,
    object: Object,
}

impl ModuleHandle {
    pub(crate) fn new(
        lib_name: String,
        source: String,
        info: Ref<ModuleInfo>,
        lease: Option<Arc<LibraryLease>>,
    ) -> Ref<ModuleHandle> {
        let object = Object::new(StructKind::ModuleHandle, None);
        object.set_name(NameType::Nick, lib_name.as_str());
        Ref::new(Self {
            lib_name,
            source,
            info,
            lease,
            object,
        })
    }

    pub fn lib_name(&self) -> &str {
        &self.lib_name
    }

    /// Name of the source that opened the module
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn info(&self) -> &Ref<ModuleInfo> {
        &self.info
    }

    pub fn id(&self) -> ModuleId {
        (*self.info).id()
    }

    /// Library path of dynamic modules
    pub fn path(&self) -> Option<&Path> {
        self.lease.as_deref().map(LibraryLease::path)
    }
}

impl Entity for ModuleHandle {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        vec![Child::owned("info", &self.info)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for ModuleHandle {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{}[{}] {} from {}",
                self.object.kind(),
                self.object.id(),
                self.lib_name,
                self.source
            ),
            _ => self.object.default_description(form),
        }
    }
}
