//! Filter nodes and their connection points
//!
//! ```text
//!              FilterNode
//!   ┌───────────────────────────────┐
//!   │ core ──► FilterCore ──► Api   │
//!   │ plugs[i]    (inputs)          │◄── remote FilterSocket (weak)
//!   │ sockets[j]  (outputs, data)   │──► requesting FilterPlugs (weak)
//!   │ context     (Blob)            │
//!   └───────────────────────────────┘
//! ```
//!
//! Plugs and sockets are created from the connector declarations of the
//! core's interface, one per connection slot. Edges between nodes are weak
//! in both directions; a plug also observes its remote socket.

use crate::core::FilterCore;
use crate::error::{GraphError, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tint_core::object::{Child, Entity, EntityType, NameType, Object, Ref, WeakRef};
use tint_core::observer;
use tint_core::{Blob, Describe, ObjectId, Options, Signal, StructKind, Value};
use tint_module::interfaces::{DataProcessingApi, ProcessingNode};
use tint_module::{ApiKind, Connector, Direction, ModuleRegistry};

// ========== Plugs ==========

/// Input side of a node
pub struct FilterPlug {
    node: ObjectId,
    index: usize,
    connector: Ref<Connector>,
    remote: RwLock<Option<WeakRef<FilterSocket>>>,
    object: Object,
}

impl FilterPlug {
    fn new(node: ObjectId, index: usize, connector: Ref<Connector>) -> Ref<FilterPlug> {
        let object = Object::new(StructKind::FilterPlug, None);
        object.set_name(NameType::Nick, connector.name());
        Ref::new(Self {
            node,
            index,
            connector,
            remote: RwLock::new(None),
            object,
        })
    }

    /// Id of the owning node
    pub fn node_id(&self) -> ObjectId {
        self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn connector(&self) -> &Ref<Connector> {
        &self.connector
    }

    /// Connected socket, if it is still alive
    pub fn remote(&self) -> Option<Ref<FilterSocket>> {
        let remote = self.remote.read().clone();
        remote.and_then(|r| r.upgrade())
    }

    pub fn is_connected(&self) -> bool {
        self.remote().is_some()
    }

    pub(crate) fn set_remote(&self, socket: Option<WeakRef<FilterSocket>>) -> Option<WeakRef<FilterSocket>> {
        std::mem::replace(&mut *self.remote.write(), socket)
    }
}

impl Entity for FilterPlug {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        let mut children = vec![Child::owned("connector", &self.connector)];
        let remote = self.remote.read().clone();
        if let Some(child) = remote.and_then(|r| Child::refers("remote", &r)) {
            children.push(child);
        }
        children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for FilterPlug {}

// ========== Sockets ==========

/// Output side of a node, holding the data it produced
pub struct FilterSocket {
    node: ObjectId,
    index: usize,
    connector: Ref<Connector>,
    data: RwLock<Option<Ref<Blob>>>,
    requesting: RwLock<Vec<WeakRef<FilterPlug>>>,
    object: Object,
}

impl FilterSocket {
    fn new(node: ObjectId, index: usize, connector: Ref<Connector>) -> Ref<FilterSocket> {
        let object = Object::new(StructKind::FilterSocket, None);
        object.set_name(NameType::Nick, connector.name());
        Ref::new(Self {
            node,
            index,
            connector,
            data: RwLock::new(None),
            requesting: RwLock::new(Vec::new()),
            object,
        })
    }

    /// Id of the owning node
    pub fn node_id(&self) -> ObjectId {
        self.node
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn connector(&self) -> &Ref<Connector> {
        &self.connector
    }

    pub fn data(&self) -> Option<Ref<Blob>> {
        self.data.read().clone()
    }

    /// Live plugs connected to this socket
    pub fn requesting(&self) -> Vec<Ref<FilterPlug>> {
        let plugs = self.requesting.read().clone();
        plugs.iter().filter_map(WeakRef::upgrade).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.requesting.read().iter().filter(|p| p.is_alive()).count()
    }

    pub(crate) fn add_requesting(&self, plug: WeakRef<FilterPlug>) {
        let mut requesting = self.requesting.write();
        requesting.retain(|p| p.is_alive());
        requesting.push(plug);
    }

    pub(crate) fn remove_requesting(&self, plug: ObjectId) -> bool {
        let mut requesting = self.requesting.write();
        let before = requesting.len();
        requesting.retain(|p| p.id() != plug);
        before != requesting.len()
    }
}

/// Store `data` on `socket` and notify the connected plugs. Returns the
/// number of plugs that handled the change.
pub fn set_socket_data(socket: &Ref<FilterSocket>, data: Ref<Blob>) -> usize {
    // Retaining traces parents, which reads `data`; never clone under the lock
    let stored = Some(data.clone());
    let previous = std::mem::replace(&mut *socket.data.write(), stored);
    drop(previous);
    observer::signal(socket, Signal::DataChanged, Some(&*data))
}

impl Entity for FilterSocket {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        let mut children = vec![Child::owned("connector", &self.connector)];
        if let Some(data) = self.data() {
            children.push(Child::owned("data", &data));
        }
        let requesting = self.requesting.read().clone();
        children.extend(requesting.iter().filter_map(|p| Child::refers("requesting", p)));
        children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for FilterSocket {}

// ========== Nodes ==========

/// A processing step: a core plus its connection points
pub struct FilterNode {
    core: Ref<FilterCore>,
    plugs: Vec<Ref<FilterPlug>>,
    sockets: Vec<Ref<FilterSocket>>,
    tags: RwLock<Options>,
    context: RwLock<Option<Ref<Blob>>>,
    object: Object,
}

impl FilterNode {
    /// Create a node with one plug and socket per declared connection slot
    pub fn new(core: Ref<FilterCore>) -> Result<Ref<FilterNode>> {
        let processing = processing_of(&core)?;
        let object = Object::new(StructKind::FilterNode, None);
        object.set_name(NameType::Nick, core.api().module().as_str());
        let id = object.id();

        let plugs = (0..processing.plugs.slots())
            .filter_map(|i| processing.plugs.get(i).map(|c| FilterPlug::new(id, i, c.clone())))
            .collect();
        let sockets = (0..processing.sockets.slots())
            .filter_map(|i| processing.sockets.get(i).map(|c| FilterSocket::new(id, i, c.clone())))
            .collect();

        Ok(Ref::new(Self {
            core,
            plugs,
            sockets,
            tags: RwLock::new(Options::new()),
            context: RwLock::new(None),
            object,
        }))
    }

    /// Create a node from the best data-processing interface matching
    /// `pattern`
    pub fn from_registry(registry: &ModuleRegistry, pattern: &str) -> Result<Ref<FilterNode>> {
        Self::new(FilterCore::from_registry(registry, pattern)?)
    }

    pub fn id(&self) -> ObjectId {
        self.object.id()
    }

    pub fn core(&self) -> &Ref<FilterCore> {
        &self.core
    }

    pub fn registration(&self) -> &str {
        self.core.registration()
    }

    pub fn plugs(&self) -> &[Ref<FilterPlug>] {
        &self.plugs
    }

    pub fn sockets(&self) -> &[Ref<FilterSocket>] {
        &self.sockets
    }

    pub fn plug(&self, index: usize) -> Result<&Ref<FilterPlug>> {
        self.plugs
            .get(index)
            .ok_or_else(|| GraphError::no_such_connector(self.id(), Direction::Plug, index))
    }

    pub fn socket(&self, index: usize) -> Result<&Ref<FilterSocket>> {
        self.sockets
            .get(index)
            .ok_or_else(|| GraphError::no_such_connector(self.id(), Direction::Socket, index))
    }

    /// Data of the first socket
    pub fn output(&self) -> Option<Ref<Blob>> {
        self.sockets.first().and_then(|s| s.data())
    }

    /// Processing interface of the node's core
    pub fn processing(&self) -> &DataProcessingApi {
        // The core only accepts data-processing interfaces
        processing_of(&self.core).unwrap_or(&*EMPTY_PROCESSING)
    }

    /// Context type the node needs, empty if none
    pub fn context_type(&self) -> &str {
        &self.processing().context_type
    }

    /// Change an option of the core; drops the built context
    pub fn set_option(&self, key: &str, value: impl Into<Value>) {
        self.core.set_option(key, value.into());
        let previous = self.context.write().take();
        drop(previous);
        observer::signal(&self.core, Signal::StorageChanged, None);
    }

    pub fn tags(&self) -> Options {
        self.tags.read().clone()
    }

    /// Attach free-form tags, e.g. for front ends
    pub fn set_tag(&self, key: &str, value: impl Into<Value>) {
        self.tags.write().set(key, value);
    }

    pub fn context_blob(&self) -> Option<Ref<Blob>> {
        self.context.read().clone()
    }

    pub(crate) fn set_context(&self, blob: Option<Ref<Blob>>) {
        let previous = std::mem::replace(&mut *self.context.write(), blob);
        drop(previous);
    }
}

static EMPTY_PROCESSING: std::sync::LazyLock<DataProcessingApi> =
    std::sync::LazyLock::new(DataProcessingApi::default);

fn processing_of(core: &FilterCore) -> Result<&DataProcessingApi> {
    core.api()
        .as_data_processing()
        .ok_or_else(|| GraphError::WrongInterface {
            expected: ApiKind::DataProcessing,
            registration: core.registration().to_string(),
        })
}

impl ProcessingNode for FilterNode {
    fn node_id(&self) -> ObjectId {
        self.id()
    }

    fn registration(&self) -> String {
        self.core.registration().to_string()
    }

    fn options(&self) -> Options {
        self.core.options()
    }

    fn input_count(&self) -> usize {
        self.plugs.len()
    }

    fn output_count(&self) -> usize {
        self.sockets.len()
    }

    fn context(&self) -> Option<Vec<u8>> {
        self.context_blob().map(|b| b.data().to_vec())
    }
}

impl Entity for FilterNode {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        let mut children = vec![Child::owned("core", &self.core)];
        children.extend(self.plugs.iter().map(|p| Child::owned("plugs", p)));
        children.extend(self.sockets.iter().map(|s| Child::owned("sockets", s)));
        if let Some(context) = self.context_blob() {
            children.push(Child::owned("context", &context));
        }
        children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for FilterNode {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{}[{}] {} ({} in, {} out)",
                self.object.kind(),
                self.object.id(),
                self.core.registration(),
                self.plugs.len(),
                self.sockets.len()
            ),
            _ => self.object.default_description(form),
        }
    }
}

/// Handler plugs install on their remote socket
pub(crate) fn plug_handler() -> tint_core::SignalHandler {
    Arc::new(|event: &tint_core::SignalEvent<'_>| event.signal == Signal::DataChanged)
}
