//! # tint_graph - Processing Graphs
//!
//! Connects data-processing interfaces into runnable graphs:
//! - **Cores** bind a validated interface to its options
//! - **Nodes** carry one plug per input slot and one socket per output slot
//! - **Connections** are typed; plugs observe the sockets they read from
//! - **Runs** visit nodes in dependency order, building contexts on demand
//! - **Policies** adjust node options before a run
//!
//! ## Example
//!
//! ```ignore
//! use tint_graph::prelude::*;
//!
//! let graph = FilterGraph::new();
//! let input = FilterNode::from_registry(&registry, "//color/input")?;
//! let cmm = FilterNode::from_registry(&registry, "//color/icc_color")?;
//! graph.add_node(&input);
//! graph.add_node(&cmm);
//! connect(&input, 0, &cmm, 0)?;
//! graph.run(Some(&registry))?;
//! ```

pub mod connect;
pub mod context;
pub mod core;
pub mod error;
pub mod graph;
pub mod node;

pub use connect::{connect, disconnect, disconnect_node};
pub use context::{build_context, builder_pattern};
pub use crate::core::FilterCore;
pub use error::{GraphError, Result};
pub use graph::{Edge, FilterGraph};
pub use node::{set_socket_data, FilterNode, FilterPlug, FilterSocket};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::connect::{connect, disconnect};
    pub use crate::core::FilterCore;
    pub use crate::error::{GraphError, Result};
    pub use crate::graph::{Edge, FilterGraph};
    pub use crate::node::{FilterNode, FilterPlug, FilterSocket};
}
