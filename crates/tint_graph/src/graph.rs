//! Graph - processing graph structure
//!
//! A graph collects nodes connected socket to plug and runs them in
//! dependency order:
//!
//! ```text
//!   [input] ─socket 0──plug 0─► [convert] ─socket 0──plug 0─► [output]
//! ```
//!
//! Policies may inspect and adjust node options through [`GraphAccess`]
//! before a run.

use crate::connect::disconnect_node;
use crate::context::build_context;
use crate::error::{GraphError, Result};
use crate::node::{set_socket_data, FilterNode};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use tint_core::object::{Child, Entity, EntityType, Object, Ref};
use tint_core::observer;
use tint_core::{Blob, Describe, ObjectId, Options, Signal, Status, StructKind, Value};
use tint_module::interfaces::GraphAccess;
use tint_module::{ApiKind, ModuleError, ModuleRegistry};

/// A connection between two nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Node providing the data
    pub source: ObjectId,
    pub socket: usize,
    /// Node consuming the data
    pub target: ObjectId,
    pub plug: usize,
}

/// The processing graph
pub struct FilterGraph {
    nodes: RwLock<Vec<Ref<FilterNode>>>,
    options: RwLock<Options>,
    object: Object,
}

impl FilterGraph {
    /// Create a new empty graph
    pub fn new() -> Ref<FilterGraph> {
        Ref::new(Self {
            nodes: RwLock::new(Vec::new()),
            options: RwLock::new(Options::new()),
            object: Object::new(StructKind::FilterGraph, None),
        })
    }

    /// Add a node. Returns `false` if it was already present.
    pub fn add_node(&self, node: &Ref<FilterNode>) -> bool {
        if self.contains(node.id()) {
            return false;
        }
        let node = node.clone();
        let mut nodes = self.nodes.write();
        if nodes.iter().any(|n| n.id() == node.id()) {
            return false;
        }
        nodes.push(node);
        true
    }

    /// Remove a node and all its connections
    pub fn remove_node(&self, id: ObjectId) -> Option<Ref<FilterNode>> {
        let node = {
            let mut nodes = self.nodes.write();
            let index = nodes.iter().position(|n| n.id() == id)?;
            nodes.remove(index)
        };
        disconnect_node(&node);
        Some(node)
    }

    pub fn node(&self, id: ObjectId) -> Option<Ref<FilterNode>> {
        self.nodes.read().iter().find(|n| n.id() == id).cloned()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.read().iter().any(|n| n.id() == id)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> Vec<Ref<FilterNode>> {
        self.nodes.read().clone()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn options(&self) -> Options {
        self.options.read().clone()
    }

    pub fn set_options(&self, options: Options) {
        *self.options.write() = options;
    }

    /// Every live connection ending at a node of the graph
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for node in self.nodes() {
            for plug in node.plugs() {
                if let Some(socket) = plug.remote() {
                    edges.push(Edge {
                        source: socket.node_id(),
                        socket: socket.index(),
                        target: node.id(),
                        plug: plug.index(),
                    });
                }
            }
        }
        edges
    }

    // ========== Validation ==========

    /// Check that every required plug is connected to a node of this graph
    pub fn check_complete(&self) -> Result<()> {
        for node in self.nodes() {
            for plug in node.plugs() {
                match plug.remote() {
                    Some(socket) if !self.contains(socket.node_id()) => {
                        return Err(GraphError::NotInGraph(socket.node_id()));
                    }
                    Some(_) => {}
                    None if plug.connector().min() > 0 => {
                        self.notify(Signal::IncompleteGraph);
                        return Err(GraphError::Incomplete {
                            node: node.id(),
                            index: plug.index(),
                        });
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }

    /// Nodes sorted so that every node comes after the nodes it reads from.
    /// Independent nodes keep insertion order.
    pub fn order(&self) -> Result<Vec<Ref<FilterNode>>> {
        let nodes = self.nodes();
        let edges = self.edges();

        let mut indegree: HashMap<ObjectId, usize> = nodes.iter().map(|n| (n.id(), 0)).collect();
        for edge in &edges {
            if !indegree.contains_key(&edge.source) {
                return Err(GraphError::NotInGraph(edge.source));
            }
            if let Some(count) = indegree.get_mut(&edge.target) {
                *count += 1;
            }
        }

        let mut remaining = nodes;
        let mut ordered = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let Some(index) = remaining
                .iter()
                .position(|n| indegree.get(&n.id()).copied().unwrap_or(0) == 0)
            else {
                return Err(GraphError::Cycle(remaining.iter().map(|n| n.id()).collect()));
            };
            let node = remaining.remove(index);
            for edge in edges.iter().filter(|e| e.source == node.id()) {
                if let Some(count) = indegree.get_mut(&edge.target) {
                    *count = count.saturating_sub(1);
                }
            }
            ordered.push(node);
        }
        Ok(ordered)
    }

    // ========== Running ==========

    /// Run every node in dependency order. Contexts are built through
    /// `registry` where a node needs one. Returns the ids in run order.
    pub fn run(&self, registry: Option<&ModuleRegistry>) -> Result<Vec<ObjectId>> {
        self.check_complete()?;
        let order = self.order()?;
        let mut ran = Vec::with_capacity(order.len());

        for node in &order {
            if !node.context_type().is_empty() && node.context_blob().is_none() {
                let registry = registry.ok_or_else(|| GraphError::NoContext {
                    node: node.id(),
                    context_type: node.context_type().to_string(),
                })?;
                build_context(registry, node)?;
            }

            let inputs: Vec<Option<Ref<Blob>>> = node
                .plugs()
                .iter()
                .map(|plug| plug.remote().and_then(|socket| socket.data()))
                .collect();
            let slices: Vec<&[u8]> = inputs
                .iter()
                .map(|data| data.as_ref().map_or(&[][..], |b| b.data()))
                .collect();

            let Some(run) = node.processing().run.clone() else {
                return Err(GraphError::WrongInterface {
                    expected: ApiKind::DataProcessing,
                    registration: node.registration().to_string(),
                });
            };
            let mut output = Vec::new();
            let status = run.run(&**node, &slices, &mut output);
            if status.is_error() {
                return Err(GraphError::RunFailed {
                    node: node.id(),
                    status,
                });
            }
            if status.is_issue() {
                log::warn!("Node {} ran with issue {}", node.id(), status);
            }

            for socket in node.sockets() {
                set_socket_data(socket, Blob::new(output.clone(), None));
            }
            ran.push(node.id());
        }

        log::debug!("Ran {} nodes", ran.len());
        Ok(ran)
    }

    // ========== Policies ==========

    /// Let the best policy matching `pattern` correct the graph
    pub fn correct(
        &self,
        registry: &ModuleRegistry,
        pattern: &str,
        flags: u32,
        options: &Options,
    ) -> Result<Status> {
        let api = registry.best(pattern, ApiKind::Policy)?;
        let handler = api
            .as_policy()
            .and_then(|p| p.handler.clone())
            .ok_or_else(|| GraphError::WrongInterface {
                expected: ApiKind::Policy,
                registration: api.registration().to_string(),
            })?;
        let status = handler.correct(self, flags, options);
        if status.is_error() {
            return Err(ModuleError::call_failed("correct", status).into());
        }
        Ok(status)
    }

    /// Signal observers of the graph itself
    fn notify(&self, signal: Signal) -> usize {
        match tint_core::table::get(self.object.id()) {
            Some(graph) => observer::signal(&graph, signal, None),
            None => 0,
        }
    }
}

impl GraphAccess for FilterGraph {
    fn node_ids(&self) -> Vec<ObjectId> {
        self.nodes.read().iter().map(|n| n.id()).collect()
    }

    fn node_registration(&self, node: ObjectId) -> Option<String> {
        self.node(node).map(|n| n.registration().to_string())
    }

    fn node_options(&self, node: ObjectId) -> Option<Options> {
        self.node(node).map(|n| n.core().options())
    }

    fn set_node_option(&self, node: ObjectId, key: &str, value: Value) -> bool {
        match self.node(node) {
            Some(n) => {
                n.set_option(key, value);
                true
            }
            None => false,
        }
    }
}

impl Entity for FilterGraph {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        self.nodes()
            .iter()
            .map(|n| Child::owned("nodes", n))
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for FilterGraph {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{}[{}] {} nodes",
                self.object.kind(),
                self.object.id(),
                self.node_count()
            ),
            _ => self.object.default_description(form),
        }
    }
}
