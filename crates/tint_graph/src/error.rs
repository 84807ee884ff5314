//! Error types for processing graphs

use thiserror::Error;
use tint_core::{ObjectId, Status};
use tint_module::{ApiKind, Direction, ModuleError};

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while building and running graphs
#[derive(Debug, Error)]
pub enum GraphError {
    /// Interface record is not usable for this purpose
    #[error("Expected a valid {expected} interface, found '{registration}'")]
    WrongInterface {
        expected: ApiKind,
        registration: String,
    },

    /// Node has no connector at this index
    #[error("Node {node} has no {direction:?} at index {index}")]
    NoSuchConnector {
        node: ObjectId,
        direction: Direction,
        index: usize,
    },

    /// Connector data types do not match
    #[error("Cannot connect '{socket}' to '{plug}'")]
    TypeMismatch { socket: String, plug: String },

    /// Plug is already connected
    #[error("Plug {index} of node {node} is already connected")]
    PlugOccupied { node: ObjectId, index: usize },

    /// Socket reached its connection limit
    #[error("Socket {index} of node {node} accepts at most {max} connections")]
    SocketFull {
        node: ObjectId,
        index: usize,
        max: usize,
    },

    /// Node connected to itself
    #[error("Node {0} cannot be connected to itself")]
    SelfConnection(ObjectId),

    /// Node is not part of the graph
    #[error("Node {0} is not part of the graph")]
    NotInGraph(ObjectId),

    /// The graph contains a cycle through these nodes
    #[error("Graph contains a cycle through {0:?}")]
    Cycle(Vec<ObjectId>),

    /// A required plug has no connection
    #[error("Plug {index} of node {node} needs a connection")]
    Incomplete { node: ObjectId, index: usize },

    /// A node's run function reported an error
    #[error("Node {node} failed to run: status {status}")]
    RunFailed { node: ObjectId, status: Status },

    /// Context could not be built
    #[error("No context of type '{context_type}' for node {node}")]
    NoContext {
        node: ObjectId,
        context_type: String,
    },

    /// Module error
    #[error(transparent)]
    Module(#[from] ModuleError),
}

impl GraphError {
    /// Create a connector lookup error
    pub fn no_such_connector(node: ObjectId, direction: Direction, index: usize) -> Self {
        GraphError::NoSuchConnector {
            node,
            direction,
            index,
        }
    }
}
