//! Object envelope and reference handles
//!
//! Every entity embeds one [`Object`] which carries its id, kind, name cache,
//! allocation strategy and observer handles. Entities are shared through
//! [`Ref`], an atomically counted strong handle. Observer edges use
//! [`WeakRef`] and can never keep their target alive.
//!
//! ```text
//!   Ref<FilterNode> ──┐
//!   Ref<FilterNode> ──┼──► FilterNode { plugs, sockets, .., object: Object }
//!   WeakRef ─ ─ ─ ─ ──┘                                         │
//!                                               id, kind, names, handles
//! ```
//!
//! Declare the `object` field last in an entity struct: fields drop in
//! declaration order, so members are torn down before the object releases
//! its handles and calls the deallocation hook.

use crate::debug::{self, TraceEvent};
use crate::error::Result;
use crate::id::{next_object_id, ObjectId};
use crate::observer::Handles;
use crate::table;
use crate::type_registry::{self, Describe, KindHooks, StructKind};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

// ========== Allocation ==========

/// Allocation strategy attached to an object.
///
/// Memory itself comes from the global allocator; the strategy is told when
/// an object under its care is created and when it is finally freed.
pub trait AllocStrategy: Send + Sync {
    /// Strategy name for diagnostics
    fn name(&self) -> &str {
        "custom"
    }

    /// Called once when an object is constructed
    fn allocated(&self, _id: ObjectId, _kind: StructKind) {}

    /// Called exactly once when the object is freed
    fn deallocated(&self, id: ObjectId, kind: StructKind);
}

/// Shared allocation strategy
pub type Allocator = Arc<dyn AllocStrategy>;

// ========== Names ==========

/// Which entry of the name cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NameType {
    Nick,
    Name,
    Description,
}

/// Cached names of an object
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameCache {
    pub nick: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl NameCache {
    fn slot(&mut self, ty: NameType) -> &mut Option<String> {
        match ty {
            NameType::Nick => &mut self.nick,
            NameType::Name => &mut self.name,
            NameType::Description => &mut self.description,
        }
    }

    fn get(&self, ty: NameType) -> Option<&str> {
        match ty {
            NameType::Nick => self.nick.as_deref(),
            NameType::Name => self.name.as_deref(),
            NameType::Description => self.description.as_deref(),
        }
    }
}

// ========== Object ==========

/// Ownership envelope embedded in every entity
pub struct Object {
    id: ObjectId,
    kind: StructKind,
    alloc: Option<Allocator>,
    names: RwLock<NameCache>,
    pub(crate) handles: Mutex<Handles>,
}

impl Object {
    /// Create the envelope for a new entity of `kind`
    pub fn new(kind: StructKind, alloc: Option<Allocator>) -> Self {
        let id = next_object_id();
        if let Some(alloc) = &alloc {
            alloc.allocated(id, kind);
        }
        Self {
            id,
            kind,
            alloc,
            names: RwLock::new(NameCache::default()),
            handles: Mutex::new(Handles::default()),
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> StructKind {
        self.kind
    }

    /// Allocation strategy, `None` for the system default
    pub fn allocator(&self) -> Option<&Allocator> {
        self.alloc.as_ref()
    }

    /// Set one entry of the name cache
    pub fn set_name(&self, ty: NameType, text: impl Into<String>) {
        *self.names.write().slot(ty) = Some(text.into());
    }

    /// Read one entry of the name cache
    pub fn name(&self, ty: NameType) -> Option<String> {
        self.names.read().get(ty).map(str::to_string)
    }

    /// Snapshot of all names
    pub fn names(&self) -> NameCache {
        self.names.read().clone()
    }

    /// Copy all names of `other` into this object
    pub fn copy_names_from(&self, other: &Object) {
        let names = other.names();
        *self.names.write() = names;
    }

    /// Description used when a kind registers no custom hook
    pub fn default_description(&self, form: Describe) -> String {
        let names = self.names.read();
        match form {
            Describe::Static => self.kind.name().to_string(),
            Describe::Short => match &names.nick {
                Some(nick) => nick.clone(),
                None => format!("{}[{}]", self.kind, self.id),
            },
            Describe::Long => match names.description.as_ref().or(names.name.as_ref()) {
                Some(text) => format!("{}[{}] {}", self.kind, self.id, text),
                None => format!("{}[{}]", self.kind, self.id),
            },
        }
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        let handles = std::mem::take(self.handles.get_mut());
        let notified = handles.release(self.id, self.kind);
        table::untrack(self.id);
        debug::trace(TraceEvent::Freed, self, notified);
        if let Some(alloc) = self.alloc.take() {
            alloc.deallocated(self.id, self.kind);
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("names", &*self.names.read())
            .finish()
    }
}

// ========== Entity traits ==========

/// Edge between an entity and one of its members
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Member held by a strong reference
    Owns,
    /// Back reference held weakly by the entity itself
    Refers,
    /// Observer edge recorded in the object handles
    Observes,
}

impl EdgeKind {
    pub fn is_weak(&self) -> bool {
        !matches!(self, EdgeKind::Owns)
    }
}

/// A member entity reported by [`Entity::children`]
#[derive(Clone)]
pub struct Child {
    /// Member name, e.g. `"plugs"`
    pub label: &'static str,
    pub edge: EdgeKind,
    pub target: Ref<dyn Entity>,
}

impl Child {
    /// Strongly held member
    pub fn owned(label: &'static str, target: &impl AsEntity) -> Self {
        Self {
            label,
            edge: EdgeKind::Owns,
            target: target.as_entity(),
        }
    }

    /// Weakly held back reference; `None` once the target is gone
    pub fn refers<T: ?Sized + Entity>(label: &'static str, target: &WeakRef<T>) -> Option<Self>
    where
        Ref<T>: AsEntity,
    {
        target.upgrade().map(|r| Self {
            label,
            edge: EdgeKind::Refers,
            target: r.as_entity(),
        })
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Child({} {:?} {}[{}])",
            self.label,
            self.edge,
            self.target.kind(),
            self.target.id()
        )
    }
}

/// Behaviour shared by every heap entity
pub trait Entity: Any + Send + Sync {
    /// The embedded object envelope
    fn object(&self) -> &Object;

    /// Member entities, strong ones as [`EdgeKind::Owns`] and weak back
    /// references as [`EdgeKind::Refers`]
    ///
    /// Object tracing calls this on every live object whenever a handle is
    /// retained. Members read here must never be write locked while a
    /// handle is cloned.
    fn children(&self) -> Vec<Child> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;
}

/// Statically typed entity that can be registered with the kind registry
pub trait EntityType: Entity + Sized {
    /// Short or long description; the default uses the name cache
    fn describe(&self, form: Describe) -> String {
        self.object().default_description(form)
    }

    /// Release process-wide caches owned by this type
    fn free_static_caches() {}
}

/// Kind-specific member copy used by [`Ref::copy`] with an allocator
pub trait DeepCopy: EntityType {
    /// Duplicate members into a new entity owning `object`
    fn deep_copy(&self, object: Object) -> Result<Self>;
}

// ========== Ref ==========

/// Strong, atomically counted handle to an entity
pub struct Ref<T: ?Sized + Entity> {
    inner: Arc<T>,
}

/// Outcome of [`Ref::release`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Released {
    /// The slot was already empty; nothing happened
    Empty,
    /// Other strong handles keep the entity alive
    Remaining(usize),
    /// This was the last strong handle; the entity is gone
    Freed,
}

impl<T: EntityType> Ref<T> {
    /// Move an entity to the heap and start tracking it
    pub fn new(value: T) -> Self {
        let kind = value.object().kind();
        type_registry::ensure_registered(kind, KindHooks::of::<T>);
        let inner = Arc::new(value);
        let weak: Weak<dyn Entity> = Arc::downgrade(&inner) as Weak<T>;
        table::track(inner.object().id(), kind, weak);
        debug::trace(TraceEvent::Created, inner.object(), 1);
        Self { inner }
    }

    /// Type-erased handle to the same entity
    pub fn as_dyn(&self) -> Ref<dyn Entity> {
        let inner: Arc<dyn Entity> = self.retain().inner;
        Ref { inner }
    }

    /// Type-erase this handle
    pub fn into_dyn(self) -> Ref<dyn Entity> {
        let inner: Arc<dyn Entity> = self.inner;
        Ref { inner }
    }
}

impl<T: DeepCopy> Ref<T> {
    /// Without an allocator this is [`Ref::retain`]. With one, the entity is
    /// duplicated member by member into a fresh object owned by `alloc`.
    pub fn copy(&self, alloc: Option<&Allocator>) -> Result<Self> {
        let Some(alloc) = alloc else {
            return Ok(self.retain());
        };
        let object = Object::new(self.kind(), Some(Arc::clone(alloc)));
        object.copy_names_from(self.object());
        match self.inner.deep_copy(object) {
            Ok(copy) => Ok(Ref::new(copy)),
            Err(e) => {
                log::warn!("Copy of {}[{}] failed: {}", self.kind(), self.id(), e);
                Err(e)
            }
        }
    }
}

impl Ref<dyn Entity> {
    /// Borrow as a concrete entity type
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }
}

impl<T: ?Sized + Entity> Ref<T> {
    pub(crate) fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.inner.object().id()
    }

    #[inline]
    pub fn kind(&self) -> StructKind {
        self.inner.object().kind()
    }

    /// Take another strong handle
    pub fn retain(&self) -> Self {
        self.clone()
    }

    /// Number of strong handles; weak observer edges are not counted
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether both handles point at the same entity
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        a.id() == b.id()
    }

    /// Weak handle to the same entity
    pub fn downgrade(&self) -> WeakRef<T> {
        WeakRef {
            id: self.id(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Release the handle held in `slot`, leaving it empty.
    ///
    /// Releasing an empty slot is a no-op, so repeated releases of the same
    /// slot can never free twice.
    pub fn release(slot: &mut Option<Self>) -> Released {
        let Some(handle) = slot.take() else {
            log::debug!("Release of an empty handle ignored");
            return Released::Empty;
        };
        let probe = Arc::downgrade(&handle.inner);
        debug::trace(
            TraceEvent::Released,
            handle.inner.object(),
            Arc::strong_count(&handle.inner).saturating_sub(1),
        );
        drop(handle);
        match probe.strong_count() {
            0 => Released::Freed,
            n => Released::Remaining(n),
        }
    }
}

impl<T: ?Sized + Entity> Clone for Ref<T> {
    fn clone(&self) -> Self {
        let inner = Arc::clone(&self.inner);
        debug::trace(
            TraceEvent::Retained,
            inner.object(),
            Arc::strong_count(&inner),
        );
        Self { inner }
    }
}

impl<T: ?Sized + Entity> Deref for Ref<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + Entity> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ref({}[{}], refs={})",
            self.kind(),
            self.id(),
            self.ref_count()
        )
    }
}

/// Conversion to a type-erased strong handle
pub trait AsEntity {
    fn as_entity(&self) -> Ref<dyn Entity>;
}

impl<T: EntityType> AsEntity for Ref<T> {
    fn as_entity(&self) -> Ref<dyn Entity> {
        self.as_dyn()
    }
}

impl AsEntity for Ref<dyn Entity> {
    fn as_entity(&self) -> Ref<dyn Entity> {
        self.clone()
    }
}

// ========== WeakRef ==========

/// Non-owning handle; never keeps its target alive
pub struct WeakRef<T: ?Sized + Entity> {
    id: ObjectId,
    inner: Weak<T>,
}

impl<T: ?Sized + Entity> WeakRef<T> {
    /// Id of the target, valid even after it is gone
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Strong handle if the target is still alive
    pub fn upgrade(&self) -> Option<Ref<T>> {
        self.inner.upgrade().map(Ref::from_arc)
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T: ?Sized + Entity> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: ?Sized + Entity> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakRef({}, alive={})", self.id, self.is_alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAlloc {
        allocated: AtomicUsize,
        freed: AtomicUsize,
    }

    impl AllocStrategy for CountingAlloc {
        fn allocated(&self, _id: ObjectId, _kind: StructKind) {
            self.allocated.fetch_add(1, Ordering::SeqCst);
        }

        fn deallocated(&self, _id: ObjectId, _kind: StructKind) {
            self.freed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_frees_on_last_handle() {
        let alloc = Arc::new(CountingAlloc::default());
        let blob = Blob::new(vec![1, 2, 3], Some(alloc.clone() as Allocator));
        let mut a = Some(blob.retain());
        let mut b = Some(blob);

        assert_eq!(Ref::release(&mut a), Released::Remaining(1));
        assert_eq!(alloc.freed.load(Ordering::SeqCst), 0);
        assert_eq!(Ref::release(&mut b), Released::Freed);
        assert_eq!(alloc.freed.load(Ordering::SeqCst), 1);
        assert_eq!(Ref::release(&mut b), Released::Empty);
        assert_eq!(alloc.freed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_copy_without_allocator_retains() {
        let blob = Blob::new(vec![7], None);
        let copy = blob.copy(None).unwrap();
        assert_eq!(copy.id(), blob.id());
        assert_eq!(blob.ref_count(), 2);
    }

    #[test]
    fn test_copy_with_allocator_duplicates() {
        let alloc = Arc::new(CountingAlloc::default());
        let blob = Blob::new(vec![7, 8], None);
        blob.object().set_name(NameType::Nick, "src");
        let copy = blob.copy(Some(&(alloc.clone() as Allocator))).unwrap();

        assert_ne!(copy.id(), blob.id());
        assert_eq!(copy.data(), blob.data());
        assert_eq!(copy.object().name(NameType::Nick).as_deref(), Some("src"));
        assert_eq!(alloc.allocated.load(Ordering::SeqCst), 1);
        drop(copy);
        assert_eq!(alloc.freed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_weak_ref_does_not_keep_alive() {
        let blob = Blob::new(Vec::new(), None);
        let weak = blob.downgrade();
        assert!(weak.is_alive());
        drop(blob);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_default_description() {
        let blob = Blob::new(Vec::new(), None);
        let id = blob.id();
        assert_eq!(
            blob.object().default_description(Describe::Short),
            format!("Blob[{}]", id)
        );
        blob.object().set_name(NameType::Name, "profile data");
        assert_eq!(
            blob.object().default_description(Describe::Long),
            format!("Blob[{}] profile data", id)
        );
    }

    #[test]
    fn test_downcast_from_dyn() {
        let blob = Blob::new(vec![4], None);
        let any = blob.as_dyn();
        assert_eq!(any.downcast_ref::<Blob>().map(|b| b.data().to_vec()), Some(vec![4]));
    }
}
