//! Filter cores
//!
//! A core binds a validated data-processing interface to the options a
//! node runs with. Several nodes may share one core.

use crate::error::{GraphError, Result};
use parking_lot::RwLock;
use std::any::Any;
use tint_core::object::{Child, Entity, EntityType, NameType, Object, Ref};
use tint_core::{Describe, Options, StructKind};
use tint_module::{Api, ApiKind, ModuleRegistry};

pub struct FilterCore {
    api: Ref<Api>,
    registration: String,
    options: RwLock<Options>,
    object: Object,
}

impl FilterCore {
    /// Wrap a validated data-processing interface
    pub fn new(api: Ref<Api>) -> Result<Ref<FilterCore>> {
        if (*api).kind() != Some(ApiKind::DataProcessing) || !api.is_valid() {
            return Err(GraphError::WrongInterface {
                expected: ApiKind::DataProcessing,
                registration: api.registration().to_string(),
            });
        }
        let object = Object::new(StructKind::FilterCore, None);
        object.set_name(NameType::Nick, api.module().as_str());
        Ok(Ref::new(Self {
            registration: api.registration().to_string(),
            api,
            options: RwLock::new(Options::new()),
            object,
        }))
    }

    /// Best data-processing interface of the registry matching `pattern`
    pub fn from_registry(registry: &ModuleRegistry, pattern: &str) -> Result<Ref<FilterCore>> {
        let api = registry.best(pattern, ApiKind::DataProcessing)?;
        Self::new(api)
    }

    pub fn api(&self) -> &Ref<Api> {
        &self.api
    }

    pub fn registration(&self) -> &str {
        &self.registration
    }

    pub fn options(&self) -> Options {
        self.options.read().clone()
    }

    pub fn set_options(&self, options: Options) {
        *self.options.write() = options;
    }

    pub(crate) fn set_option(&self, key: &str, value: tint_core::Value) {
        self.options.write().set(key, value);
    }
}

impl Entity for FilterCore {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        vec![Child::owned("api", &self.api)]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for FilterCore {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{}[{}] {}",
                self.object.kind(),
                self.object.id(),
                self.registration
            ),
            _ => self.object.default_description(form),
        }
    }
}
