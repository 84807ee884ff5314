//! Leaves and the pass that owns them
//!
//! A [`Leave`] wraps one entity reached during a traversal pass. It records
//! where the entity was first reached (parent and grandparent on that path)
//! and one [`Link`] per child the entity reported. Leaves hold strong
//! handles, so a [`Pass`] keeps every reached entity alive until it is
//! released; a pass never outlives the walk that built it.

use crate::diagnostic::Diagnostic;
use std::collections::HashMap;
use tint_core::object::{EdgeKind, Entity, NameType, Ref};
use tint_core::type_registry;
use tint_core::{Describe, ObjectId, StructKind};

/// How the traversal treated a child edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    /// The child was first reached here and expanded below this Leave
    Expanded,
    /// The child was already expanded on another path
    Reused,
    /// The child is an ancestor on the current path
    Cycle,
    /// The depth ceiling stopped the branch
    Truncated,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Expanded => "expanded",
            LinkStatus::Reused => "reused",
            LinkStatus::Cycle => "cycle",
            LinkStatus::Truncated => "truncated",
        }
    }
}

/// Edge from a Leave to one of its children
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub label: &'static str,
    pub edge: EdgeKind,
    pub target: ObjectId,
    pub target_kind: StructKind,
    pub status: LinkStatus,
}

/// Traversal-scoped wrapper of one entity
pub struct Leave {
    entity: Ref<dyn Entity>,
    parent: Option<ObjectId>,
    grandparent: Option<ObjectId>,
    depth: usize,
    links: Vec<Link>,
}

impl Leave {
    pub(crate) fn new(
        entity: Ref<dyn Entity>,
        parent: Option<ObjectId>,
        grandparent: Option<ObjectId>,
        depth: usize,
    ) -> Self {
        Self {
            entity,
            parent,
            grandparent,
            depth,
            links: Vec::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.entity.id()
    }

    pub fn kind(&self) -> StructKind {
        self.entity.kind()
    }

    pub fn entity(&self) -> &Ref<dyn Entity> {
        &self.entity
    }

    /// Parent on the path that first reached this Leave
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn grandparent(&self) -> Option<ObjectId> {
        self.grandparent
    }

    /// Distance from the root of the path that first reached this Leave
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn nick(&self) -> Option<String> {
        self.entity.object().name(NameType::Nick)
    }

    pub fn describe(&self, form: Describe) -> String {
        type_registry::describe(&*self.entity, form).into_owned()
    }

    /// `Kind[id]`
    pub fn label(&self) -> String {
        format!("{}[{}]", self.kind(), self.id())
    }

    pub(crate) fn push_link(&mut self, link: Link) {
        self.links.push(link);
    }
}

/// Every Leave of one traversal pass, plus what the pass found
#[derive(Default)]
pub struct Pass {
    leaves: HashMap<ObjectId, Leave>,
    order: Vec<ObjectId>,
    roots: Vec<ObjectId>,
    diagnostics: Vec<Diagnostic>,
}

impl Pass {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, leave: Leave) {
        let id = leave.id();
        self.order.push(id);
        self.leaves.insert(id, leave);
    }

    pub(crate) fn leave_mut(&mut self, id: ObjectId) -> Option<&mut Leave> {
        self.leaves.get_mut(&id)
    }

    pub(crate) fn add_root(&mut self, id: ObjectId) {
        self.roots.push(id);
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("Introspection: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    pub fn leave(&self, id: ObjectId) -> Option<&Leave> {
        self.leaves.get(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.leaves.contains_key(&id)
    }

    /// Leaves in the order they were created
    pub fn iter(&self) -> impl Iterator<Item = &Leave> {
        self.order.iter().filter_map(|id| self.leaves.get(id))
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Number of links across all Leaves
    pub fn link_count(&self) -> usize {
        self.leaves.values().map(|l| l.links.len()).sum()
    }

    /// Drop every Leave, returning how many were released. Diagnostics are
    /// handed back to the caller.
    pub fn release(self) -> (usize, Vec<Diagnostic>) {
        let Pass {
            leaves,
            diagnostics,
            ..
        } = self;
        let count = leaves.len();
        drop(leaves);
        (count, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tint_core::Blob;

    #[test]
    fn test_pass_release_drops_handles() {
        let blob = Blob::new(vec![1], None);
        let mut pass = Pass::new();
        pass.insert(Leave::new(blob.as_dyn(), None, None, 0));
        assert_eq!(blob.ref_count(), 2);
        assert_eq!(pass.leave(blob.id()).map(|l| l.label()), Some(format!("Blob[{}]", blob.id())));

        let (released, diagnostics) = pass.release();
        assert_eq!(released, 1);
        assert!(diagnostics.is_empty());
        assert_eq!(blob.ref_count(), 1);
    }
}
