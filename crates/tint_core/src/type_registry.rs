//! Struct type registry
//!
//! Every entity carries a [`StructKind`] drawn from a closed enumeration.
//! The first construction of an entity of a given kind registers that
//! kind's [`KindHooks`]; later constructions find the slot already filled.
//! Slots are append-only for the lifetime of the process.

use crate::object::{Entity, EntityType};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

/// Closed set of entity kinds
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum StructKind {
    Blob,
    StructList,
    ModuleInfo,
    ModuleHandle,
    ModuleUi,
    Connector,
    ApiProfileTag,
    ApiContextBuilder,
    ApiDataConvert,
    ApiDataProcessing,
    ApiDeviceConfig,
    ApiPolicy,
    ApiDataExchange,
    ApiUnsupported,
    FilterCore,
    FilterNode,
    FilterPlug,
    FilterSocket,
    FilterGraph,
}

impl StructKind {
    /// Number of kinds
    pub const COUNT: usize = 19;

    /// All kinds in declaration order
    pub const ALL: [StructKind; Self::COUNT] = [
        StructKind::Blob,
        StructKind::StructList,
        StructKind::ModuleInfo,
        StructKind::ModuleHandle,
        StructKind::ModuleUi,
        StructKind::Connector,
        StructKind::ApiProfileTag,
        StructKind::ApiContextBuilder,
        StructKind::ApiDataConvert,
        StructKind::ApiDataProcessing,
        StructKind::ApiDeviceConfig,
        StructKind::ApiPolicy,
        StructKind::ApiDataExchange,
        StructKind::ApiUnsupported,
        StructKind::FilterCore,
        StructKind::FilterNode,
        StructKind::FilterPlug,
        StructKind::FilterSocket,
        StructKind::FilterGraph,
    ];

    /// Index into per-kind tables
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Static kind name, usable without allocation
    pub const fn name(self) -> &'static str {
        match self {
            StructKind::Blob => "Blob",
            StructKind::StructList => "StructList",
            StructKind::ModuleInfo => "ModuleInfo",
            StructKind::ModuleHandle => "ModuleHandle",
            StructKind::ModuleUi => "ModuleUi",
            StructKind::Connector => "Connector",
            StructKind::ApiProfileTag => "ApiProfileTag",
            StructKind::ApiContextBuilder => "ApiContextBuilder",
            StructKind::ApiDataConvert => "ApiDataConvert",
            StructKind::ApiDataProcessing => "ApiDataProcessing",
            StructKind::ApiDeviceConfig => "ApiDeviceConfig",
            StructKind::ApiPolicy => "ApiPolicy",
            StructKind::ApiDataExchange => "ApiDataExchange",
            StructKind::ApiUnsupported => "ApiUnsupported",
            StructKind::FilterCore => "FilterCore",
            StructKind::FilterNode => "FilterNode",
            StructKind::FilterPlug => "FilterPlug",
            StructKind::FilterSocket => "FilterSocket",
            StructKind::FilterGraph => "FilterGraph",
        }
    }

    /// Whether this kind is a capability interface record
    pub const fn is_api(self) -> bool {
        matches!(
            self,
            StructKind::ApiProfileTag
                | StructKind::ApiContextBuilder
                | StructKind::ApiDataConvert
                | StructKind::ApiDataProcessing
                | StructKind::ApiDeviceConfig
                | StructKind::ApiPolicy
                | StructKind::ApiDataExchange
                | StructKind::ApiUnsupported
        )
    }
}

impl fmt::Debug for StructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for StructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Requested textual form of an entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Describe {
    /// Static kind name only; never allocates
    Static,
    /// Nick or `Kind[id]`
    Short,
    /// Human readable, may include names and kind-specific details
    Long,
}

/// Per-kind shared hooks
#[derive(Clone, Copy)]
pub struct KindHooks {
    /// Produce a short or long description
    pub describe: fn(&dyn Entity, Describe) -> String,
    /// Drop process-wide caches owned by the kind
    pub free_static_caches: fn(),
}

impl KindHooks {
    /// Hooks dispatching to an entity type's [`EntityType`] implementation
    pub fn of<T: EntityType>() -> Self {
        Self {
            describe: describe_as::<T>,
            free_static_caches: T::free_static_caches,
        }
    }
}

impl fmt::Debug for KindHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindHooks").finish_non_exhaustive()
    }
}

fn describe_as<T: EntityType>(entity: &dyn Entity, form: Describe) -> String {
    match entity.as_any().downcast_ref::<T>() {
        Some(typed) => typed.describe(form),
        None => entity.object().default_description(form),
    }
}

struct KindRegistry {
    slots: [OnceLock<KindHooks>; StructKind::COUNT],
}

static REGISTRY: KindRegistry = KindRegistry {
    slots: [const { OnceLock::new() }; StructKind::COUNT],
};

/// Register the hooks of a kind once. Returns `true` if this call performed
/// the registration, `false` if the kind was already registered.
pub fn ensure_registered(kind: StructKind, hooks: impl FnOnce() -> KindHooks) -> bool {
    let slot = &REGISTRY.slots[kind.index()];
    if slot.get().is_some() {
        return false;
    }
    let mut registered = false;
    slot.get_or_init(|| {
        registered = true;
        hooks()
    });
    if registered {
        log::debug!("Registered struct kind {}", kind);
    }
    registered
}

/// Hooks of a registered kind
pub fn hooks(kind: StructKind) -> Option<KindHooks> {
    REGISTRY.slots[kind.index()].get().copied()
}

/// Whether a kind has been registered in this process
pub fn is_registered(kind: StructKind) -> bool {
    REGISTRY.slots[kind.index()].get().is_some()
}

/// All kinds registered so far
pub fn registered_kinds() -> Vec<StructKind> {
    StructKind::ALL
        .iter()
        .copied()
        .filter(|k| is_registered(*k))
        .collect()
}

/// Describe an entity through its kind hooks.
///
/// [`Describe::Static`] returns the static kind name and never allocates.
pub fn describe(entity: &dyn Entity, form: Describe) -> Cow<'static, str> {
    let kind = entity.object().kind();
    if form == Describe::Static {
        return Cow::Borrowed(kind.name());
    }
    match hooks(kind) {
        Some(h) => Cow::Owned((h.describe)(entity, form)),
        None => Cow::Owned(entity.object().default_description(form)),
    }
}

/// Run every registered kind's static cache release hook.
///
/// Returns the number of hooks run. Slots stay registered.
pub fn shutdown() -> usize {
    let mut count = 0;
    for kind in StructKind::ALL {
        if let Some(h) = hooks(kind) {
            (h.free_static_caches)();
            count += 1;
        }
    }
    log::debug!("Released static caches of {} struct kinds", count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;

    #[test]
    fn test_kind_table_is_consistent() {
        for (i, kind) in StructKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
        assert!(StructKind::ApiPolicy.is_api());
        assert!(!StructKind::FilterNode.is_api());
    }

    #[test]
    fn test_registration_happens_once() {
        let _blob = Blob::new(b"x".to_vec(), None);
        assert!(is_registered(StructKind::Blob));
        assert!(!ensure_registered(StructKind::Blob, KindHooks::of::<Blob>));
        assert!(registered_kinds().contains(&StructKind::Blob));
    }

    #[test]
    fn test_static_describe_does_not_allocate() {
        let blob = Blob::new(Vec::new(), None);
        let d = describe(&*blob, Describe::Static);
        assert!(matches!(d, Cow::Borrowed("Blob")));
    }

    #[test]
    fn test_concurrent_first_use_registers_once() {
        // no entity type of this crate carries ApiUnsupported
        let winners: usize = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    ensure_registered(StructKind::ApiUnsupported, KindHooks::of::<Blob>) as usize
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap_or(0))
            .sum();
        assert!(winners <= 1);
        assert!(is_registered(StructKind::ApiUnsupported));
    }
}
