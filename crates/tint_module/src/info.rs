//! Module records
//!
//! A module is identified by four ASCII characters, carries descriptive
//! texts and lifecycle hooks, and heads the chain of interface records it
//! implements.

use crate::api::{Api, ApiDecl, ApiIter};
use crate::error::{ModuleError, Result};
use crate::interfaces::Icon;
use crate::library::LibraryLease;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tint_core::object::{Child, Entity, EntityType, NameType, Object, Ref};
use tint_core::{Allocator, Describe, Status, StructKind, Version, HOST_API_VERSION};

/// Four character module identifier, e.g. `lcm2`
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId([u8; 4]);

impl ModuleId {
    pub fn new(id: &str) -> Result<Self> {
        let bytes = id.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(ModuleError::InvalidModuleId(id.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn as_str(&self) -> &str {
        // Constructed from ASCII only
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.as_str())
    }
}

/// Descriptive texts of a module
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleTexts {
    pub name: String,
    pub manufacturer: String,
    pub copyright: String,
    pub help: String,
}

impl ModuleTexts {
    /// Text for a selector, `None` for unknown selectors
    pub fn get(&self, select: &str) -> Option<&str> {
        let text = match select {
            "name" => &self.name,
            "manufacturer" => &self.manufacturer,
            "copyright" => &self.copyright,
            "help" => &self.help,
            _ => return None,
        };
        Some(text.as_str())
    }
}

/// Module level lifecycle
pub trait ModuleHooks: Send + Sync {
    fn init(&self) -> Status {
        Status::OK
    }

    fn reset(&self) -> Status {
        Status::OK
    }
}

/// Declaration of a module, produced by static tables or by the builder a
/// library exports
pub struct ModuleDecl {
    id: String,
    version: Version,
    module_api: Version,
    texts: ModuleTexts,
    hooks: Option<Arc<dyn ModuleHooks>>,
    icon: Option<Icon>,
    apis: Vec<ApiDecl>,
}

impl ModuleDecl {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            module_api: HOST_API_VERSION,
            texts: ModuleTexts::default(),
            hooks: None,
            icon: None,
            apis: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn module_api(mut self, version: Version) -> Self {
        self.module_api = version;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.texts.name = name.into();
        self
    }

    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.texts.manufacturer = manufacturer.into();
        self
    }

    pub fn copyright(mut self, copyright: impl Into<String>) -> Self {
        self.texts.copyright = copyright.into();
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.texts.help = help.into();
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ModuleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Append an interface to the chain
    pub fn api(mut self, api: ApiDecl) -> Self {
        self.apis.push(api);
        self
    }

    /// Turn the declaration into a module entity heading its interface chain
    pub fn build(
        self,
        lease: Option<Arc<LibraryLease>>,
        alloc: Option<Allocator>,
    ) -> Result<Ref<ModuleInfo>> {
        let id = ModuleId::new(&self.id)?;
        let apis = Api::chain(id, self.apis, lease.clone(), alloc.clone());
        let object = Object::new(StructKind::ModuleInfo, alloc);
        object.set_name(NameType::Nick, id.as_str());
        if !self.texts.name.is_empty() {
            object.set_name(NameType::Name, self.texts.name.as_str());
        }
        if !self.texts.help.is_empty() {
            object.set_name(NameType::Description, self.texts.help.as_str());
        }
        Ok(Ref::new(ModuleInfo {
            id,
            version: self.version,
            module_api: self.module_api,
            texts: self.texts,
            hooks: self.hooks,
            icon: self.icon,
            apis,
            lease,
            object,
        }))
    }
}

/// Module entity
pub struct ModuleInfo {
    id: ModuleId,
    version: Version,
    module_api: Version,
    texts: ModuleTexts,
    hooks: Option<Arc<dyn ModuleHooks>>,
    icon: Option<Icon>,
    apis: Option<Ref<Api>>,
    lease: Option<Arc<LibraryLease>>,
    object: Object,
}

impl ModuleInfo {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn module_api(&self) -> Version {
        self.module_api
    }

    pub fn texts(&self) -> &ModuleTexts {
        &self.texts
    }

    pub fn icon(&self) -> Option<&Icon> {
        self.icon.as_ref()
    }

    /// Interface records in chain order
    pub fn apis(&self) -> ApiIter {
        ApiIter::new(self.apis.clone())
    }

    pub fn api_count(&self) -> usize {
        self.apis().count()
    }

    /// Whether the module came from a dynamic library
    pub fn is_dynamic(&self) -> bool {
        self.lease.is_some()
    }

    pub fn init(&self) -> Status {
        self.hooks.as_ref().map_or(Status::OK, |h| h.init())
    }

    pub fn reset(&self) -> Status {
        self.hooks.as_ref().map_or(Status::OK, |h| h.reset())
    }
}

impl Entity for ModuleInfo {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        self.apis
            .iter()
            .map(|head| Child::owned("apis", head))
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for ModuleInfo {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{}[{}] {} \"{}\" v{} api {}",
                self.object.kind(),
                self.object.id(),
                self.id,
                self.texts.name,
                self.version,
                self.module_api
            ),
            _ => self.object.default_description(form),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiHeader, ApiPayload};
    use crate::interfaces::DataExchangeApi;

    #[test]
    fn test_module_id() {
        assert_eq!(ModuleId::new("lcm2").unwrap().to_string(), "lcm2");
        assert!(ModuleId::new("lcms2").is_err());
        assert!(ModuleId::new("a b ").is_err());
    }

    #[test]
    fn test_build_chain() {
        let info = ModuleDecl::new("test", Version::new(0, 2, 0))
            .name("Test")
            .api(ApiDecl::new(
                ApiHeader::new("org/test/exchange.one", Version::new(1, 0, 0)),
                ApiPayload::DataExchange(DataExchangeApi::default()),
            ))
            .api(ApiDecl::new(
                ApiHeader::new("org/test/exchange.two", Version::new(1, 0, 0)),
                ApiPayload::DataExchange(DataExchangeApi::default()),
            ))
            .build(None, None)
            .unwrap();
        assert_eq!(info.api_count(), 2);
        assert_eq!(info.object().name(NameType::Nick).as_deref(), Some("test"));
        assert_eq!(info.texts().get("name"), Some("Test"));
        assert!(info.init().is_ok());
        assert!(!info.is_dynamic());
        assert!(info.apis().all(|api| api.module() == (*info).id()));
    }

    #[test]
    fn test_invalid_id_rejected() {
        assert!(matches!(
            ModuleDecl::new("toolong", Version::new(1, 0, 0)).build(None, None),
            Err(ModuleError::InvalidModuleId(_))
        ));
    }
}
