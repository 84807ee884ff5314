//! Live object table
//!
//! Process-wide index of every entity created through [`Ref::new`], keyed by
//! id. Entries are weak, so the table never extends a lifetime; an entry
//! disappears when its object is freed. Ids at or above
//! [`MAX_OBJECTS_TRACKED`] are not indexed.

use crate::id::{peek_object_id, ObjectId};
use crate::object::{Entity, Ref};
use crate::type_registry::StructKind;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Weak};

/// Upper bound on indexed object ids
pub const MAX_OBJECTS_TRACKED: usize = 1_000_000;

struct Slot {
    kind: StructKind,
    entity: Weak<dyn Entity>,
}

struct ObjectTable {
    slots: RwLock<BTreeMap<ObjectId, Slot>>,
    overflow_reported: AtomicBool,
}

static TABLE: LazyLock<ObjectTable> = LazyLock::new(|| ObjectTable {
    slots: RwLock::new(BTreeMap::new()),
    overflow_reported: AtomicBool::new(false),
});

pub(crate) fn track(id: ObjectId, kind: StructKind, entity: Weak<dyn Entity>) -> bool {
    if id.raw() as usize >= MAX_OBJECTS_TRACKED {
        if !TABLE.overflow_reported.swap(true, Ordering::Relaxed) {
            log::warn!(
                "Object table full: {}[{}] and later objects are not indexed",
                kind,
                id
            );
        }
        return false;
    }
    TABLE.slots.write().insert(id, Slot { kind, entity });
    true
}

pub(crate) fn untrack(id: ObjectId) {
    TABLE.slots.write().remove(&id);
}

/// Strong handle to a live object
pub fn get(id: ObjectId) -> Option<Ref<dyn Entity>> {
    let slots = TABLE.slots.read();
    slots.get(&id).and_then(|s| s.entity.upgrade()).map(Ref::from_arc)
}

/// Kind of a live object without taking a handle
pub fn kind_of(id: ObjectId) -> Option<StructKind> {
    TABLE.slots.read().get(&id).map(|s| s.kind)
}

/// Number of indexed objects
pub fn count() -> usize {
    TABLE.slots.read().len()
}

/// Ids of all indexed objects, ascending
pub fn live_ids() -> Vec<ObjectId> {
    TABLE.slots.read().keys().copied().collect()
}

/// Strong handles to every live object, ascending by id
pub fn live_objects() -> Vec<Ref<dyn Entity>> {
    let slots = TABLE.slots.read();
    slots
        .values()
        .filter_map(|s| s.entity.upgrade())
        .map(Ref::from_arc)
        .collect()
}

/// Ids of live objects listing `id` among their children
pub fn parents_of(id: ObjectId) -> Vec<ObjectId> {
    live_objects()
        .into_iter()
        .filter(|candidate| candidate.id() != id)
        .filter(|candidate| candidate.children().iter().any(|c| c.target.id() == id))
        .map(|candidate| candidate.id())
        .collect()
}

/// Marker for finding objects created after a point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    next: ObjectId,
}

/// Remember the current id high-water mark
pub fn snapshot() -> Snapshot {
    Snapshot {
        next: peek_object_id(),
    }
}

/// Live objects created after `snapshot` was taken
pub fn new_since(snapshot: &Snapshot) -> Vec<ObjectId> {
    TABLE
        .slots
        .read()
        .range(snapshot.next..)
        .filter(|(_, s)| s.entity.strong_count() > 0)
        .map(|(id, _)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;
    use crate::list::StructList;

    #[test]
    fn test_get_and_untrack() {
        let blob = Blob::new(vec![1], None);
        let id = blob.id();
        assert_eq!(get(id).map(|r| r.id()), Some(id));
        assert_eq!(kind_of(id), Some(StructKind::Blob));
        drop(blob);
        assert!(get(id).is_none());
        assert!(!live_ids().contains(&id));
    }

    #[test]
    fn test_new_since_snapshot() {
        let before = Blob::new(Vec::new(), None);
        let snap = snapshot();
        let after = Blob::new(Vec::new(), None);
        let fresh = new_since(&snap);
        assert!(fresh.contains(&after.id()));
        assert!(!fresh.contains(&before.id()));
        let after_id = after.id();
        drop(after);
        assert!(!new_since(&snap).contains(&after_id));
    }

    #[test]
    fn test_parents_of() {
        let blob = Blob::new(Vec::new(), None);
        let list = StructList::new(None);
        list.push(&blob);
        assert_eq!(parents_of(blob.id()), vec![list.id()]);
    }
}
