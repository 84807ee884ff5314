//! Object lifecycle tracing
//!
//! A process-wide debug target selects which objects get a log line on
//! every construction, retain, release and free. The target comes from the
//! `TINT_DEBUG_OBJECTS` environment variable on first use and can be changed
//! by the host at any time:
//!
//! - `all` or `1` traces every object
//! - a number traces the object with that id
//! - any other text traces objects whose kind name or nick contains it

use crate::id::ObjectId;
use crate::object::{NameType, Object};
use crate::observer;
use crate::table;
use parking_lot::RwLock;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

/// Environment variable read for the initial debug target
pub const DEBUG_OBJECTS_ENV: &str = "TINT_DEBUG_OBJECTS";

/// Which objects to trace
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DebugTarget {
    #[default]
    Off,
    All,
    Id(ObjectId),
    Name(String),
}

impl DebugTarget {
    /// Parse the textual form used by the environment variable
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "0" | "off" | "none" => DebugTarget::Off,
            "all" | "1" => DebugTarget::All,
            text => match text.parse::<u32>() {
                Ok(raw) => DebugTarget::Id(ObjectId::from_raw(raw)),
                Err(_) => DebugTarget::Name(text.to_string()),
            },
        }
    }

    /// Read [`DEBUG_OBJECTS_ENV`]
    pub fn from_env() -> Self {
        std::env::var(DEBUG_OBJECTS_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    /// Whether an object is selected
    pub fn matches(&self, id: ObjectId, kind_name: &str, nick: Option<&str>) -> bool {
        match self {
            DebugTarget::Off => false,
            DebugTarget::All => true,
            DebugTarget::Id(target) => *target == id || *target == ObjectId::ALL,
            DebugTarget::Name(text) => {
                kind_name.contains(text.as_str())
                    || nick.map_or(false, |n| n.contains(text.as_str()))
            }
        }
    }
}

struct DebugState {
    target: RwLock<DebugTarget>,
    enabled: AtomicBool,
}

static STATE: LazyLock<DebugState> = LazyLock::new(|| {
    let target = DebugTarget::from_env();
    if target != DebugTarget::Off {
        log::info!("Object tracing enabled for {:?}", target);
    }
    DebugState {
        enabled: AtomicBool::new(target != DebugTarget::Off),
        target: RwLock::new(target),
    }
});

thread_local! {
    static IN_TRACE: Cell<bool> = const { Cell::new(false) };
}

/// Current debug target
pub fn debug_target() -> DebugTarget {
    STATE.target.read().clone()
}

/// Replace the debug target
pub fn set_debug_target(target: DebugTarget) {
    let mut current = STATE.target.write();
    STATE
        .enabled
        .store(target != DebugTarget::Off, Ordering::Relaxed);
    *current = target;
}

/// Whether an object is currently selected for tracing
pub fn is_traced(object: &Object) -> bool {
    if !STATE.enabled.load(Ordering::Relaxed) {
        return false;
    }
    let nick = object.name(NameType::Nick);
    STATE
        .target
        .read()
        .matches(object.id(), object.kind().name(), nick.as_deref())
}

/// Lifecycle event being traced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Created,
    Retained,
    Released,
    Freed,
}

/// Log one lifecycle event. `refs` is the strong count after the event, or
/// the number of notified observers for [`TraceEvent::Freed`].
pub(crate) fn trace(event: TraceEvent, object: &Object, refs: usize) {
    if !STATE.enabled.load(Ordering::Relaxed) {
        return;
    }
    // collecting parents clones handles, which must not trace again
    if IN_TRACE.with(|flag| flag.replace(true)) {
        return;
    }
    if is_traced(object) {
        let counts = observer::observation_count(object);
        match event {
            TraceEvent::Freed => log::debug!(
                "{}[{}] freed, {} observers notified",
                object.kind(),
                object.id(),
                refs
            ),
            _ => log::debug!(
                "{}[{}] {:?} refs={} observers={} models={} parents={:?}",
                object.kind(),
                object.id(),
                event,
                refs,
                counts.observers,
                counts.models,
                table::parents_of(object.id())
            ),
        }
    }
    IN_TRACE.with(|flag| flag.set(false));
}
