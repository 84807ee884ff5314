//! Cycle-safe traversal
//!
//! ```text
//!   root ──► open Leave ──► next child ─┬─ ancestor on path ──► Cycle
//!              ▲                        ├─ already a Leave ───► Reused
//!              │                        ├─ too deep ──────────► Truncated
//!              └──────── Expanded ◄─────┘
//! ```
//!
//! The walk keeps an explicit stack of open Leaves and the id path from the
//! root, so every entity is expanded at most once per pass and the walk
//! ends after a bounded number of steps whatever the shape of the graph.

use crate::config::IntrospectConfig;
use crate::diagnostic::Diagnostic;
use crate::leave::{Leave, Link, LinkStatus, Pass};
use crate::visitor::{visit, Visitor};
use std::collections::HashSet;
use tint_core::object::{Child, EdgeKind, Entity, Ref};
use tint_core::{observer, table, ObjectId};

/// Summary of a finished walk; the Leaves themselves are already released
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub roots: Vec<ObjectId>,
    /// Leaves built and released by the pass
    pub leaves: usize,
    pub links: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl WalkReport {
    pub fn has_cycles(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_cycle)
    }
}

struct Frame {
    id: ObjectId,
    children: std::vec::IntoIter<Child>,
}

/// Builds traversal passes and runs visitors over them
#[derive(Clone, Debug, Default)]
pub struct Introspector {
    config: IntrospectConfig,
}

impl Introspector {
    pub fn new(config: IntrospectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntrospectConfig {
        &self.config
    }

    // ========== Passes ==========

    /// Build a pass from explicit roots. A root already reached from an
    /// earlier root is not walked again.
    pub fn build(&self, roots: &[Ref<dyn Entity>]) -> Pass {
        let mut pass = Pass::new();
        for root in roots {
            self.expand(&mut pass, root.clone());
        }
        pass
    }

    /// Build a pass over the live object table. Objects no other live object
    /// owns are the roots.
    pub fn build_live(&self) -> Pass {
        let population = table::live_objects();
        let owned: HashSet<ObjectId> = population
            .iter()
            .flat_map(|entity| entity.children())
            .filter(|child| child.edge == EdgeKind::Owns)
            .map(|child| child.target.id())
            .collect();

        let mut pass = Pass::new();
        for entity in population.iter().filter(|e| !owned.contains(&e.id())) {
            self.expand(&mut pass, entity.clone());
        }
        if self.config.include_unreached {
            for entity in &population {
                if !pass.contains(entity.id()) {
                    self.expand(&mut pass, entity.clone());
                }
            }
        }
        log::debug!(
            "Introspection pass over {} live objects: {} roots, {} leaves",
            population.len(),
            pass.roots().len(),
            pass.len()
        );
        pass
    }

    // ========== Walks ==========

    /// Build a pass from `roots`, run every visitor over it and release it
    pub fn walk(&self, roots: &[Ref<dyn Entity>], visitors: &mut [&mut dyn Visitor]) -> WalkReport {
        let pass = self.build(roots);
        finish(pass, visitors)
    }

    /// [`Introspector::walk`] over the live object table
    pub fn walk_live(&self, visitors: &mut [&mut dyn Visitor]) -> WalkReport {
        let pass = self.build_live();
        finish(pass, visitors)
    }

    // ========== Expansion ==========

    fn expand(&self, pass: &mut Pass, root: Ref<dyn Entity>) {
        if pass.contains(root.id()) {
            return;
        }
        pass.add_root(root.id());

        let mut path: Vec<ObjectId> = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        self.open(pass, &mut path, &mut stack, root, None, None);

        while let Some(frame) = stack.last_mut() {
            let parent = frame.id;
            let Some(child) = frame.children.next() else {
                stack.pop();
                path.pop();
                continue;
            };

            let target = child.target.id();
            let status = if let Some(start) = path.iter().position(|id| *id == target) {
                let mut chain = path[start..].to_vec();
                chain.push(target);
                pass.report(Diagnostic::Cycle { chain });
                LinkStatus::Cycle
            } else if pass.contains(target) {
                LinkStatus::Reused
            } else if path.len() > self.config.max_depth {
                let mut chain = path.clone();
                chain.push(target);
                pass.report(Diagnostic::DepthLimit {
                    chain,
                    max_depth: self.config.max_depth,
                });
                LinkStatus::Truncated
            } else {
                LinkStatus::Expanded
            };

            let grandparent = match pass.leave_mut(parent) {
                Some(leave) => {
                    leave.push_link(Link {
                        label: child.label,
                        edge: child.edge,
                        target,
                        target_kind: child.target.kind(),
                        status,
                    });
                    leave.parent()
                }
                None => None,
            };
            if status == LinkStatus::Expanded {
                self.open(pass, &mut path, &mut stack, child.target, Some(parent), grandparent);
            }
        }
    }

    fn open(
        &self,
        pass: &mut Pass,
        path: &mut Vec<ObjectId>,
        stack: &mut Vec<Frame>,
        entity: Ref<dyn Entity>,
        parent: Option<ObjectId>,
        grandparent: Option<ObjectId>,
    ) {
        let id = entity.id();
        let children = self.children_of(pass, &entity);
        pass.insert(Leave::new(entity, parent, grandparent, path.len()));
        path.push(id);
        stack.push(Frame {
            id,
            children: children.into_iter(),
        });
    }

    /// Members reported by the entity plus, optionally, the models it
    /// observes, capped at `max_children`
    fn children_of(&self, pass: &mut Pass, entity: &Ref<dyn Entity>) -> Vec<Child> {
        let mut children = entity.children();
        if self.config.follow_observers {
            children.extend(
                observer::models_of(entity.object())
                    .into_iter()
                    .map(|model| Child {
                        label: "observes",
                        edge: EdgeKind::Observes,
                        target: model,
                    }),
            );
        }
        if children.len() > self.config.max_children {
            pass.report(Diagnostic::ChildOverflow {
                id: entity.id(),
                kind: entity.kind(),
                children: children.len(),
                kept: self.config.max_children,
            });
            children.truncate(self.config.max_children);
        }
        children
    }
}

fn finish(pass: Pass, visitors: &mut [&mut dyn Visitor]) -> WalkReport {
    for visitor in visitors.iter_mut() {
        visit(&pass, &mut **visitor);
    }
    let roots = pass.roots().to_vec();
    let links = pass.link_count();
    let (leaves, diagnostics) = pass.release();
    log::debug!("Introspection pass released {} leaves", leaves);
    WalkReport {
        roots,
        leaves,
        links,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tint_core::Blob;

    fn observe(observer: &Ref<Blob>, model: &Ref<Blob>) {
        observer::observe(observer, model, None);
    }

    #[test]
    fn test_single_root_without_children() {
        let blob = Blob::new(vec![1, 2], None);
        let pass = Introspector::default().build(&[blob.as_dyn()]);
        assert_eq!(pass.roots(), &[blob.id()]);
        assert_eq!(pass.len(), 1);
        assert_eq!(pass.link_count(), 0);
    }

    #[test]
    fn test_observer_edges_are_optional() {
        let a = Blob::new(vec![], None);
        let b = Blob::new(vec![], None);
        observe(&a, &b);

        let followed = Introspector::default().build(&[a.as_dyn()]);
        assert!(followed.contains(b.id()));
        let link = &followed.leave(a.id()).unwrap().links()[0];
        assert_eq!(link.edge, EdgeKind::Observes);
        assert_eq!(link.status, LinkStatus::Expanded);

        let config = IntrospectConfig::default().follow_observers(false);
        let ignored = Introspector::new(config).build(&[a.as_dyn()]);
        assert!(!ignored.contains(b.id()));
    }

    #[test]
    fn test_parent_and_grandparent() {
        let a = Blob::new(vec![], None);
        let b = Blob::new(vec![], None);
        let c = Blob::new(vec![], None);
        observe(&a, &b);
        observe(&b, &c);

        let pass = Introspector::default().build(&[a.as_dyn()]);
        let leave = pass.leave(c.id()).unwrap();
        assert_eq!(leave.parent(), Some(b.id()));
        assert_eq!(leave.grandparent(), Some(a.id()));
        assert_eq!(leave.depth(), 2);
    }

    #[test]
    fn test_shared_child_is_reused() {
        let a = Blob::new(vec![], None);
        let b = Blob::new(vec![], None);
        let shared = Blob::new(vec![], None);
        observe(&a, &b);
        observe(&a, &shared);
        observe(&b, &shared);

        let pass = Introspector::default().build(&[a.as_dyn()]);
        let statuses: Vec<LinkStatus> = pass
            .iter()
            .flat_map(|l| l.links().iter().map(|link| link.status))
            .collect();
        assert_eq!(
            statuses.iter().filter(|s| **s == LinkStatus::Reused).count(),
            1
        );
        assert!(pass.diagnostics().is_empty());
    }

    #[test]
    fn test_depth_limit_truncates() {
        let a = Blob::new(vec![], None);
        let b = Blob::new(vec![], None);
        let c = Blob::new(vec![], None);
        observe(&a, &b);
        observe(&b, &c);

        let config = IntrospectConfig::default().max_depth(1);
        let pass = Introspector::new(config).build(&[a.as_dyn()]);
        assert!(pass.contains(b.id()));
        assert!(!pass.contains(c.id()));
        assert_eq!(
            pass.diagnostics(),
            &[Diagnostic::DepthLimit {
                chain: vec![a.id(), b.id(), c.id()],
                max_depth: 1,
            }]
        );
    }

    #[test]
    fn test_child_overflow() {
        let hub = Blob::new(vec![], None);
        let spokes: Vec<Ref<Blob>> = (0..3).map(|_| Blob::new(vec![], None)).collect();
        for spoke in &spokes {
            observe(&hub, spoke);
        }

        let config = IntrospectConfig::default().max_children(2);
        let pass = Introspector::new(config).build(&[hub.as_dyn()]);
        assert_eq!(pass.leave(hub.id()).unwrap().links().len(), 2);
        assert!(matches!(
            pass.diagnostics(),
            [Diagnostic::ChildOverflow { children: 3, kept: 2, .. }]
        ));
    }
}
