//! Anomalies found during a traversal pass
//!
//! None of them stop the pass. The affected branch is cut and the rest of
//! the population is still walked.

use std::fmt;
use tint_core::{ObjectId, StructKind};

/// One traversal anomaly
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A child is among its own ancestors. `chain` runs from that ancestor
    /// down to the entity that reported it, then repeats the ancestor.
    Cycle { chain: Vec<ObjectId> },
    /// A branch reached the depth ceiling; `chain` is the path from the root
    /// to the child that was not expanded
    DepthLimit { chain: Vec<ObjectId>, max_depth: usize },
    /// An entity reported more children than are kept
    ChildOverflow {
        id: ObjectId,
        kind: StructKind,
        children: usize,
        kept: usize,
    },
}

impl Diagnostic {
    /// Id the diagnostic is about: the repeated ancestor, the unexpanded
    /// child or the overflowing entity
    pub fn subject(&self) -> Option<ObjectId> {
        match self {
            Diagnostic::Cycle { chain } | Diagnostic::DepthLimit { chain, .. } => {
                chain.last().copied()
            }
            Diagnostic::ChildOverflow { id, .. } => Some(*id),
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self, Diagnostic::Cycle { .. })
    }
}

fn write_chain(f: &mut fmt::Formatter<'_>, chain: &[ObjectId]) -> fmt::Result {
    for (i, id) in chain.iter().enumerate() {
        if i > 0 {
            write!(f, " -> ")?;
        }
        write!(f, "{}", id)?;
    }
    Ok(())
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Cycle { chain } => {
                write!(f, "cycle ")?;
                write_chain(f, chain)
            }
            Diagnostic::DepthLimit { chain, max_depth } => {
                write!(f, "depth limit {} reached at ", max_depth)?;
                write_chain(f, chain)
            }
            Diagnostic::ChildOverflow {
                id,
                kind,
                children,
                kept,
            } => write!(
                f,
                "{}[{}] has {} children, kept {}",
                kind, id, children, kept
            ),
        }
    }
}
