//! # tint_core - Object Core
//!
//! Lifecycle primitives shared by every part of Tint:
//! - **Objects**: an envelope with id, kind, names and observer handles
//!   embedded in every entity, shared through atomically counted [`Ref`]s
//! - **Kind registry**: a closed set of [`StructKind`]s with lazily
//!   registered describe and cache-release hooks
//! - **Observers**: weak edges between entities plus signal delivery
//! - **Live table**: a bounded id index of every live entity, used for
//!   tracing and graph introspection
//! - **Registrations**: hierarchical names and the pattern matching used to
//!   pick modules
//!
//! ## Ownership
//!
//! ```text
//!   Ref ──strong──► entity ──strong──► member entities
//!                     │
//!                     └── handles ─ ─weak─ ─► models / observers
//! ```
//!
//! Strong edges own, weak edges never do. An entity is freed exactly once,
//! when its last [`Ref`] goes away, whatever observers still point at it.

pub mod blob;
pub mod debug;
pub mod error;
pub mod id;
pub mod list;
pub mod object;
pub mod observer;
pub mod options;
pub mod registration;
pub mod table;
pub mod type_registry;
pub mod version;

pub use blob::Blob;
pub use debug::{debug_target, set_debug_target, DebugTarget, DEBUG_OBJECTS_ENV};
pub use error::{CoreError, Result, Status};
pub use id::{IdGenerator, ObjectId};
pub use list::StructList;
pub use object::{
    AllocStrategy, Allocator, AsEntity, Child, DeepCopy, EdgeKind, Entity, EntityType, NameCache,
    NameType, Object, Ref, Released, WeakRef,
};
pub use observer::{Signal, SignalEvent, SignalHandler};
pub use options::{OptionEntry, Options, Value};
pub use registration::{registration_match, registration_match_key, RegField};
pub use type_registry::{Describe, KindHooks, StructKind};
pub use version::{Version, HOST_API_VERSION, LAST_API_BREAK};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CoreError, Result, Status};
    pub use crate::object::{AsEntity, Child, EdgeKind, Entity, EntityType, Object, Ref, WeakRef};
    pub use crate::observer::Signal;
    pub use crate::options::{Options, Value};
    pub use crate::type_registry::{Describe, StructKind};
    pub use crate::version::Version;
    pub use crate::id::ObjectId;
}
