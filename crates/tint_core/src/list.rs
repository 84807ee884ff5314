//! Heterogeneous list of entities

use crate::error::Result;
use crate::object::{AsEntity, Allocator, Child, DeepCopy, Entity, EntityType, Object, Ref};
use crate::type_registry::StructKind;
use parking_lot::RwLock;
use std::any::Any;

/// Owning list of entities of any kind
pub struct StructList {
    items: RwLock<Vec<Ref<dyn Entity>>>,
    object: Object,
}

impl StructList {
    pub fn new(alloc: Option<Allocator>) -> Ref<StructList> {
        Ref::new(Self {
            items: RwLock::new(Vec::new()),
            object: Object::new(StructKind::StructList, alloc),
        })
    }

    /// Append a strong reference
    pub fn push(&self, item: &impl AsEntity) {
        let item = item.as_entity();
        self.items.write().push(item);
    }

    /// Remove and return the entry at `index`
    pub fn remove(&self, index: usize) -> Option<Ref<dyn Entity>> {
        let mut items = self.items.write();
        (index < items.len()).then(|| items.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<Ref<dyn Entity>> {
        self.items.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Snapshot of the entries
    pub fn items(&self) -> Vec<Ref<dyn Entity>> {
        self.items.read().clone()
    }

    /// Drop every entry
    pub fn clear(&self) {
        let drained: Vec<_> = std::mem::take(&mut *self.items.write());
        drop(drained);
    }
}

impl Entity for StructList {
    fn object(&self) -> &Object {
        &self.object
    }

    fn children(&self) -> Vec<Child> {
        self.items()
            .iter()
            .map(|item| Child::owned("items", item))
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for StructList {}

impl DeepCopy for StructList {
    /// Shallow in the entries: the new list retains the same members
    fn deep_copy(&self, object: Object) -> Result<Self> {
        Ok(Self {
            items: RwLock::new(self.items()),
            object,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;

    #[test]
    fn test_list_owns_members() {
        let list = StructList::new(None);
        let blob = Blob::new(vec![1], None);
        list.push(&blob);
        assert_eq!(blob.ref_count(), 2);
        assert_eq!(list.children().len(), 1);

        let removed = list.remove(0);
        assert!(removed.is_some());
        assert!(list.remove(0).is_none());
        drop(removed);
        assert_eq!(blob.ref_count(), 1);
    }

    #[test]
    fn test_clear_releases_members() {
        let list = StructList::new(None);
        let blob = Blob::new(vec![1], None);
        list.push(&blob);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(blob.ref_count(), 1);
    }

    #[test]
    fn test_push_while_member_is_traced() {
        use crate::debug::{set_debug_target, DebugTarget};

        let list = StructList::new(None);
        let first = Blob::new(vec![1], None);
        list.push(&first);

        log::set_max_level(log::LevelFilter::Debug);
        set_debug_target(DebugTarget::Id(first.id()));
        list.push(&first);
        set_debug_target(DebugTarget::Off);
        assert_eq!(list.len(), 2);
        assert_eq!(first.ref_count(), 3);
    }
}
