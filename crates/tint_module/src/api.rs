//! Capability interface records
//!
//! A module exposes a singly linked chain of interface records. Every
//! record shares an [`ApiHeader`] and carries one kind-specific
//! [`ApiPayload`]:
//!
//! ```text
//!   ModuleInfo ──apis──► Api(ContextBuilder) ──next──► Api(DataProcessing) ──next──► ∅
//!                          │                            │
//!                          └─ ui                        └─ plugs / sockets
//! ```

use crate::check::Validation;
use crate::info::ModuleId;
use crate::interfaces::*;
use crate::library::LibraryLease;
use crate::message::MessageSink;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tint_core::object::{Child, Entity, EntityType, Object, Ref};
use tint_core::{Allocator, Describe, Status, StructKind, Version};

/// Interface kinds a module may implement
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ApiKind {
    ProfileTag,
    ContextBuilder,
    DataConvert,
    DataProcessing,
    DeviceConfig,
    Policy,
    DataExchange,
}

/// Interface tags that only older hosts understood
pub const OBSOLETE_TAGS: [u32; 2] = [1, 2];

/// Tag of the meta loader interface, which this host does not load
pub const META_LOADER_TAG: u32 = 5;

impl ApiKind {
    pub const ALL: [ApiKind; 7] = [
        ApiKind::ProfileTag,
        ApiKind::ContextBuilder,
        ApiKind::DataConvert,
        ApiKind::DataProcessing,
        ApiKind::DeviceConfig,
        ApiKind::Policy,
        ApiKind::DataExchange,
    ];

    /// Numeric interface tag
    pub const fn tag(self) -> u32 {
        match self {
            ApiKind::ProfileTag => 3,
            ApiKind::ContextBuilder => 4,
            ApiKind::DataConvert => 6,
            ApiKind::DataProcessing => 7,
            ApiKind::DeviceConfig => 8,
            ApiKind::Policy => 9,
            ApiKind::DataExchange => 10,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    /// Digit scoping registration attributes to this kind, e.g. `7-lcms`
    pub const fn digit(self) -> Option<char> {
        match self {
            ApiKind::ContextBuilder => Some('4'),
            ApiKind::DataConvert => Some('6'),
            ApiKind::DataProcessing => Some('7'),
            ApiKind::DeviceConfig => Some('8'),
            ApiKind::Policy => Some('9'),
            ApiKind::ProfileTag | ApiKind::DataExchange => None,
        }
    }

    pub const fn struct_kind(self) -> StructKind {
        match self {
            ApiKind::ProfileTag => StructKind::ApiProfileTag,
            ApiKind::ContextBuilder => StructKind::ApiContextBuilder,
            ApiKind::DataConvert => StructKind::ApiDataConvert,
            ApiKind::DataProcessing => StructKind::ApiDataProcessing,
            ApiKind::DeviceConfig => StructKind::ApiDeviceConfig,
            ApiKind::Policy => StructKind::ApiPolicy,
            ApiKind::DataExchange => StructKind::ApiDataExchange,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ApiKind::ProfileTag => "profile-tag",
            ApiKind::ContextBuilder => "context-builder",
            ApiKind::DataConvert => "data-convert",
            ApiKind::DataProcessing => "data-processing",
            ApiKind::DeviceConfig => "device-config",
            ApiKind::Policy => "policy",
            ApiKind::DataExchange => "data-exchange",
        }
    }
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle hooks shared by every interface kind
pub trait ApiLifecycle: Send + Sync {
    /// Called once after the record passed validation
    fn init(&self) -> Status {
        Status::OK
    }

    /// Called before the record's module is unloaded
    fn reset(&self) -> Status {
        Status::OK
    }

    /// Hand the module the channel it reports through
    fn set_message_sink(&self, _sink: MessageSink) {}
}

/// Lifecycle without any behaviour
pub struct NoLifecycle;

impl ApiLifecycle for NoLifecycle {}

/// Fields shared by every interface record
#[derive(Clone)]
pub struct ApiHeader {
    /// Hierarchical name used for selection
    pub registration: String,
    /// Version of the interface implementation
    pub version: Version,
    /// Host API the record was built against
    pub module_api: Version,
    pub lifecycle: Option<Arc<dyn ApiLifecycle>>,
    /// Query answers used for ranking
    pub can_handle: Option<Arc<dyn CanHandle>>,
}

impl ApiHeader {
    /// Header built against the current host API with a no-op lifecycle
    pub fn new(registration: impl Into<String>, version: Version) -> Self {
        Self {
            registration: registration.into(),
            version,
            module_api: tint_core::HOST_API_VERSION,
            lifecycle: Some(Arc::new(NoLifecycle)),
            can_handle: None,
        }
    }

    pub fn module_api(mut self, version: Version) -> Self {
        self.module_api = version;
        self
    }

    pub fn lifecycle(mut self, lifecycle: Option<Arc<dyn ApiLifecycle>>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn can_handle(mut self, can_handle: Arc<dyn CanHandle>) -> Self {
        self.can_handle = Some(can_handle);
        self
    }
}

/// Kind-specific part of an interface record
#[derive(Clone)]
pub enum ApiPayload {
    ProfileTag(ProfileTagApi),
    ContextBuilder(ContextBuilderApi),
    DataConvert(DataConvertApi),
    DataProcessing(DataProcessingApi),
    DeviceConfig(DeviceConfigApi),
    Policy(PolicyApi),
    DataExchange(DataExchangeApi),
    /// A tag this host does not implement
    Unsupported { tag: u32 },
}

impl ApiPayload {
    /// Kind of the payload, `None` for unsupported tags
    pub fn kind(&self) -> Option<ApiKind> {
        match self {
            ApiPayload::ProfileTag(_) => Some(ApiKind::ProfileTag),
            ApiPayload::ContextBuilder(_) => Some(ApiKind::ContextBuilder),
            ApiPayload::DataConvert(_) => Some(ApiKind::DataConvert),
            ApiPayload::DataProcessing(_) => Some(ApiKind::DataProcessing),
            ApiPayload::DeviceConfig(_) => Some(ApiKind::DeviceConfig),
            ApiPayload::Policy(_) => Some(ApiKind::Policy),
            ApiPayload::DataExchange(_) => Some(ApiKind::DataExchange),
            ApiPayload::Unsupported { .. } => None,
        }
    }

    /// Raw interface tag
    pub fn tag(&self) -> u32 {
        match self {
            ApiPayload::Unsupported { tag } => *tag,
            other => other.kind().map_or(0, ApiKind::tag),
        }
    }

    pub fn struct_kind(&self) -> StructKind {
        self.kind()
            .map_or(StructKind::ApiUnsupported, ApiKind::struct_kind)
    }

    /// UI descriptor of kinds that carry one
    pub fn ui(&self) -> Option<&Ref<crate::ui::ModuleUi>> {
        match self {
            ApiPayload::ContextBuilder(p) => p.ui.as_ref(),
            ApiPayload::DeviceConfig(p) => p.ui.as_ref(),
            ApiPayload::Policy(p) => p.ui.as_ref(),
            ApiPayload::DataExchange(p) => p.ui.as_ref(),
            _ => None,
        }
    }
}

/// Declaration of one interface record, turned into an [`Api`] entity when
/// the module chain is built
#[derive(Clone)]
pub struct ApiDecl {
    pub header: ApiHeader,
    pub payload: ApiPayload,
}

impl ApiDecl {
    pub fn new(header: ApiHeader, payload: ApiPayload) -> Self {
        Self { header, payload }
    }
}

/// Interface record entity
pub struct Api {
    header: ApiHeader,
    payload: ApiPayload,
    next: Option<Ref<Api>>,
    module: ModuleId,
    validation: RwLock<Validation>,
    /// Keeps the providing library mapped while the record is alive
    lease: Option<Arc<LibraryLease>>,
    object: Object,
}

impl Api {
    /// Build a linked chain from declarations, back to front. Returns the
    /// head of the chain.
    pub(crate) fn chain(
        module: ModuleId,
        decls: Vec<ApiDecl>,
        lease: Option<Arc<LibraryLease>>,
        alloc: Option<Allocator>,
    ) -> Option<Ref<Api>> {
        let mut next: Option<Ref<Api>> = None;
        for decl in decls.into_iter().rev() {
            let object = Object::new(decl.payload.struct_kind(), alloc.clone());
            next = Some(Ref::new(Api {
                header: decl.header,
                payload: decl.payload,
                next: next.take(),
                module,
                validation: RwLock::new(Validation::Unvalidated),
                lease: lease.clone(),
                object,
            }));
        }
        next
    }

    /// Standalone record outside any module chain
    pub fn standalone(module: ModuleId, decl: ApiDecl) -> Ref<Api> {
        Ref::new(Api {
            object: Object::new(decl.payload.struct_kind(), None),
            header: decl.header,
            payload: decl.payload,
            next: None,
            module,
            validation: RwLock::new(Validation::Unvalidated),
            lease: None,
        })
    }

    pub fn header(&self) -> &ApiHeader {
        &self.header
    }

    pub fn payload(&self) -> &ApiPayload {
        &self.payload
    }

    pub fn registration(&self) -> &str {
        &self.header.registration
    }

    pub fn kind(&self) -> Option<ApiKind> {
        self.payload.kind()
    }

    /// Module providing the record
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn next(&self) -> Option<&Ref<Api>> {
        self.next.as_ref()
    }

    pub fn validation(&self) -> Validation {
        *self.validation.read()
    }

    pub(crate) fn set_validation(&self, validation: Validation) {
        *self.validation.write() = validation;
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.validation(), Validation::Valid(_))
    }

    // ========== Payload accessors ==========

    pub fn as_context_builder(&self) -> Option<&ContextBuilderApi> {
        match &self.payload {
            ApiPayload::ContextBuilder(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_data_processing(&self) -> Option<&DataProcessingApi> {
        match &self.payload {
            ApiPayload::DataProcessing(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&PolicyApi> {
        match &self.payload {
            ApiPayload::Policy(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_data_exchange(&self) -> Option<&DataExchangeApi> {
        match &self.payload {
            ApiPayload::DataExchange(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_device_config(&self) -> Option<&DeviceConfigApi> {
        match &self.payload {
            ApiPayload::DeviceConfig(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_profile_tag(&self) -> Option<&ProfileTagApi> {
        match &self.payload {
            ApiPayload::ProfileTag(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_data_convert(&self) -> Option<&DataConvertApi> {
        match &self.payload {
            ApiPayload::DataConvert(p) => Some(p),
            _ => None,
        }
    }
}

impl Entity for Api {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        let mut children = Vec::new();
        if let Some(next) = &self.next {
            children.push(Child::owned("next", next));
        }
        if let Some(ui) = self.payload.ui() {
            children.push(Child::owned("ui", ui));
        }
        if let ApiPayload::DataProcessing(p) = &self.payload {
            children.extend(p.plugs.connectors.iter().map(|c| Child::owned("plugs", c)));
            children.extend(p.sockets.connectors.iter().map(|c| Child::owned("sockets", c)));
        }
        children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for Api {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{}[{}] {} {} v{} ({:?})",
                self.object.kind(),
                self.object.id(),
                self.module,
                self.header.registration,
                self.header.version,
                self.validation()
            ),
            _ => self.object.default_description(form),
        }
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("id", &self.object.id())
            .field("kind", &self.kind())
            .field("registration", &self.header.registration)
            .field("module", &self.module)
            .field("validation", &self.validation())
            .finish()
    }
}

/// Iterator over an interface chain
pub struct ApiIter {
    next: Option<Ref<Api>>,
}

impl ApiIter {
    pub fn new(head: Option<Ref<Api>>) -> Self {
        Self { next: head }
    }
}

impl Iterator for ApiIter {
    type Item = Ref<Api>;

    fn next(&mut self) -> Option<Ref<Api>> {
        let current = self.next.take()?;
        self.next = current.next().cloned();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(reg: &str) -> ApiDecl {
        ApiDecl::new(
            ApiHeader::new(reg, Version::new(1, 0, 0)),
            ApiPayload::DataExchange(DataExchangeApi::default()),
        )
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in ApiKind::ALL {
            assert_eq!(ApiKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ApiKind::from_tag(META_LOADER_TAG), None);
        assert_eq!(ApiKind::DataProcessing.digit(), Some('7'));
    }

    #[test]
    fn test_chain_links_in_order() {
        let id = ModuleId::new("test").unwrap();
        let head = Api::chain(id, vec![exchange("a/b/c.one"), exchange("a/b/c.two")], None, None);
        let regs: Vec<String> = ApiIter::new(head)
            .map(|api| api.registration().to_string())
            .collect();
        assert_eq!(regs, vec!["a/b/c.one", "a/b/c.two"]);
    }

    #[test]
    fn test_children_follow_next() {
        let id = ModuleId::new("test").unwrap();
        let head = Api::chain(id, vec![exchange("a/b/c.one"), exchange("a/b/c.two")], None, None)
            .unwrap();
        let children = head.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].label, "next");
        assert_eq!((*head).kind(), Some(ApiKind::DataExchange));
        assert_eq!(head.object().kind(), StructKind::ApiDataExchange);
        assert_eq!(head.validation(), Validation::Unvalidated);
    }
}
