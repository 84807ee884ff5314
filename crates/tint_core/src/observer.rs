//! Observer edges and signals
//!
//! An observer watches a model without owning it. Both sides record the
//! edge in their object handles as weak references; neither side keeps the
//! other alive. Freeing a model sends [`Signal::Released`] to every live
//! observer and removes the edge from their handles.

use crate::id::ObjectId;
use crate::object::{AsEntity, Entity, Object, Ref, WeakRef};
use crate::type_registry::StructKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Signals sent from a model to its observers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    Ok,
    Connected,
    Released,
    DataChanged,
    StorageChanged,
    IncompatibleData,
    IncompatibleOption,
    IncompatibleContext,
    IncompleteGraph,
    Visited,
    /// Application defined
    User(u32),
}

/// One signal delivery
pub struct SignalEvent<'a> {
    pub signal: Signal,
    pub model: ObjectId,
    pub model_kind: StructKind,
    pub observer: ObjectId,
    /// Optional payload supplied by the sender
    pub data: Option<&'a dyn Entity>,
}

/// Observer callback; returns `true` when it handled the signal
pub type SignalHandler = Arc<dyn Fn(&SignalEvent<'_>) -> bool + Send + Sync>;

struct ModelEdge {
    model: WeakRef<dyn Entity>,
}

struct ObserverEdge {
    observer: WeakRef<dyn Entity>,
    handler: Option<SignalHandler>,
}

/// Observer bookkeeping stored in an object
#[derive(Default)]
pub(crate) struct Handles {
    models: Vec<ModelEdge>,
    observers: Vec<ObserverEdge>,
    muted: bool,
}

impl Handles {
    /// Tear down the handles of a freed model. Returns the number of live
    /// observers that were notified.
    pub(crate) fn release(self, id: ObjectId, kind: StructKind) -> usize {
        let mut notified = 0;
        for edge in self.observers {
            let Some(observer) = edge.observer.upgrade() else {
                continue;
            };
            observer
                .object()
                .handles
                .lock()
                .models
                .retain(|m| m.model.id() != id);
            if let Some(handler) = &edge.handler {
                handler(&SignalEvent {
                    signal: Signal::Released,
                    model: id,
                    model_kind: kind,
                    observer: observer.id(),
                    data: None,
                });
            }
            notified += 1;
        }
        notified
    }
}

static SIGNALS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Suspend delivery of signals process-wide
pub fn disable_signals() {
    SIGNALS_ENABLED.store(false, Ordering::SeqCst);
}

/// Resume delivery of signals process-wide
pub fn enable_signals() {
    SIGNALS_ENABLED.store(true, Ordering::SeqCst);
}

/// Start observing `model`. A repeated call for the same pair replaces the
/// handler. The handler receives [`Signal::Connected`] right away.
///
/// Returns `true` if a new edge was created.
pub fn observe(
    observer: &impl AsEntity,
    model: &impl AsEntity,
    handler: Option<SignalHandler>,
) -> bool {
    let observer = observer.as_entity();
    let model = model.as_entity();

    let added = {
        let mut handles = model.object().handles.lock();
        match handles
            .observers
            .iter_mut()
            .find(|e| e.observer.id() == observer.id())
        {
            Some(edge) => {
                edge.handler = handler.clone();
                false
            }
            None => {
                handles.observers.push(ObserverEdge {
                    observer: observer.downgrade(),
                    handler: handler.clone(),
                });
                true
            }
        }
    };
    if added {
        observer.object().handles.lock().models.push(ModelEdge {
            model: model.downgrade(),
        });
    }

    if let Some(handler) = handler {
        handler(&SignalEvent {
            signal: Signal::Connected,
            model: model.id(),
            model_kind: model.kind(),
            observer: observer.id(),
            data: None,
        });
    }
    added
}

/// Remove the edge between `observer` and `model`. Returns `true` if one
/// existed.
pub fn unobserve(observer: &impl AsEntity, model: &impl AsEntity) -> bool {
    let observer = observer.as_entity();
    let model = model.as_entity();

    let removed = {
        let mut handles = model.object().handles.lock();
        let before = handles.observers.len();
        handles.observers.retain(|e| e.observer.id() != observer.id());
        before != handles.observers.len()
    };
    observer
        .object()
        .handles
        .lock()
        .models
        .retain(|e| e.model.id() != model.id());
    removed
}

/// Send `signal` to every live observer of `model`. Returns the number of
/// handlers that reported the signal as handled.
pub fn signal(model: &impl AsEntity, signal: Signal, data: Option<&dyn Entity>) -> usize {
    if !SIGNALS_ENABLED.load(Ordering::SeqCst) {
        return 0;
    }
    let model = model.as_entity();
    let targets: Vec<(WeakRef<dyn Entity>, SignalHandler)> = {
        let mut handles = model.object().handles.lock();
        if handles.muted {
            return 0;
        }
        handles.observers.retain(|e| e.observer.is_alive());
        handles
            .observers
            .iter()
            .filter_map(|e| e.handler.clone().map(|h| (e.observer.clone(), h)))
            .collect()
    };

    let mut handled = 0;
    for (observer, handler) in targets {
        let Some(observer) = observer.upgrade() else {
            continue;
        };
        let event = SignalEvent {
            signal,
            model: model.id(),
            model_kind: model.kind(),
            observer: observer.id(),
            data,
        };
        if handler(&event) {
            handled += 1;
        }
    }
    handled
}

/// Mute or unmute signals sent by one model. [`Signal::Released`] is
/// delivered regardless.
pub fn set_muted(model: &Object, muted: bool) {
    model.handles.lock().muted = muted;
}

/// Whether any live observer watches `model`
pub fn is_observed(model: &Object) -> bool {
    model
        .handles
        .lock()
        .observers
        .iter()
        .any(|e| e.observer.is_alive())
}

/// Live edge counts of an object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObservationCount {
    /// Models this object observes
    pub models: usize,
    /// Observers watching this object
    pub observers: usize,
}

/// Count live observer edges on both sides of `object`
pub fn observation_count(object: &Object) -> ObservationCount {
    let handles = object.handles.lock();
    ObservationCount {
        models: handles.models.iter().filter(|e| e.model.is_alive()).count(),
        observers: handles
            .observers
            .iter()
            .filter(|e| e.observer.is_alive())
            .count(),
    }
}

/// Live models observed by `object`
pub fn models_of(object: &Object) -> Vec<Ref<dyn Entity>> {
    let weak: Vec<WeakRef<dyn Entity>> = object
        .handles
        .lock()
        .models
        .iter()
        .map(|e| e.model.clone())
        .collect();
    weak.iter().filter_map(WeakRef::upgrade).collect()
}

/// Live observers watching `object`
pub fn observers_of(object: &Object) -> Vec<Ref<dyn Entity>> {
    let weak: Vec<WeakRef<dyn Entity>> = object
        .handles
        .lock()
        .observers
        .iter()
        .map(|e| e.observer.clone())
        .collect();
    weak.iter().filter_map(WeakRef::upgrade).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;
    use parking_lot::Mutex;

    #[test]
    fn test_observe_and_signal() {
        let model = Blob::new(vec![1], None);
        let watcher = Blob::new(Vec::new(), None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: SignalHandler = Arc::new(move |ev: &SignalEvent<'_>| {
            sink.lock().push(ev.signal);
            true
        });

        assert!(observe(&watcher, &model, Some(handler)));
        assert!(is_observed(model.object()));
        assert_eq!(signal(&model, Signal::DataChanged, None), 1);
        assert_eq!(*seen.lock(), vec![Signal::Connected, Signal::DataChanged]);

        let counts = observation_count(watcher.object());
        assert_eq!(counts, ObservationCount { models: 1, observers: 0 });
    }

    #[test]
    fn test_observer_edge_does_not_own_model() {
        let model = Blob::new(vec![1], None);
        let watcher = Blob::new(Vec::new(), None);
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        observe(
            &watcher,
            &model,
            Some(Arc::new(move |ev: &SignalEvent<'_>| {
                if ev.signal == Signal::Released {
                    flag.store(true, Ordering::SeqCst);
                }
                true
            })),
        );

        let weak = model.downgrade();
        drop(model);
        assert!(weak.upgrade().is_none());
        assert!(released.load(Ordering::SeqCst));
        assert!(models_of(watcher.object()).is_empty());
    }

    #[test]
    fn test_unobserve_and_mute() {
        let model = Blob::new(Vec::new(), None);
        let watcher = Blob::new(Vec::new(), None);
        let handler: SignalHandler = Arc::new(|_: &SignalEvent<'_>| true);
        observe(&watcher, &model, Some(handler));

        set_muted(model.object(), true);
        assert_eq!(signal(&model, Signal::Visited, None), 0);
        set_muted(model.object(), false);
        assert_eq!(signal(&model, Signal::Visited, None), 1);

        assert!(unobserve(&watcher, &model));
        assert!(!unobserve(&watcher, &model));
        assert!(!is_observed(model.object()));
        assert_eq!(signal(&model, Signal::Visited, None), 0);
    }

    #[test]
    fn test_repeat_observe_replaces_handler() {
        let model = Blob::new(Vec::new(), None);
        let watcher = Blob::new(Vec::new(), None);
        assert!(observe(&watcher, &model, None));
        assert!(!observe(&watcher, &model, None));
        assert_eq!(observers_of(model.object()).len(), 1);
    }
}
