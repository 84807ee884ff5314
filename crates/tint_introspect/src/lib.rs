//! # tint_introspect - Object graph introspection
//!
//! Walks live entities along their ownership edges, weak back references
//! and observer edges, and hands the result to visitors:
//!
//! ```text
//!   roots ──► Introspector::build ──► Pass (Leaves + diagnostics)
//!                                       │
//!                         visit ────────┤──► TextPrinter
//!                                       └──► DiagramBuilder ──► JSON / dot
//! ```
//!
//! Leaves exist for one pass only. Cycles and runaway depth end a branch
//! with a [`Diagnostic`]; they never stop the pass.
//!
//! ## Example
//!
//! ```ignore
//! use tint_introspect::prelude::*;
//!
//! let mut printer = TextPrinter::new();
//! let report = Introspector::default().walk_live(&mut [&mut printer]);
//! println!("{}", printer.output());
//! for diagnostic in &report.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

pub mod config;
pub mod diagnostic;
pub mod leave;
pub mod visitor;
pub mod walk;

pub use config::{IntrospectConfig, DEFAULT_MAX_DEPTH, MAX_CHILDREN};
pub use diagnostic::Diagnostic;
pub use leave::{Leave, Link, LinkStatus, Pass};
pub use visitor::{visit, Diagram, DiagramBuilder, DiagramEdge, DiagramNode, TextPrinter, Visitor};
pub use walk::{Introspector, WalkReport};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::IntrospectConfig;
    pub use crate::diagnostic::Diagnostic;
    pub use crate::leave::{Leave, Link, LinkStatus};
    pub use crate::visitor::{Diagram, DiagramBuilder, TextPrinter, Visitor};
    pub use crate::walk::{Introspector, WalkReport};
}
