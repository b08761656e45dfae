#![forbid(unsafe_code)]

//! Per-form typed event bus.
//!
//! One [`EventBus`] exists per form instance and is handed by reference to
//! everything that needs it. It is never a process-wide singleton.
//!
//! # Events
//!
//! | Event | Emitted by | Payload |
//! |-------|-----------|---------|
//! | `Value` | `set_value`, shadow writes, entry removal | full path written |
//! | `Change` | every state mutation | none (read the controller) |
//! | `Submit` | successful `submit_form` | submitted values |
//! | `Failure` | failed `submit_form` | errors map |
//!
//! # Invariants
//!
//! 1. Listeners of one kind run in registration order.
//! 2. `on(kind, listener)` is idempotent per (kind, listener) pair.
//! 3. Emission never holds a borrow while running listeners, so a listener
//!    may mutate the form and cause nested emissions.

use std::rc::Rc;

use formwork_core::{ErrorMap, Path, Value};

use super::subscribers::{SubscriberList, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Value,
    Change,
    Submit,
    Failure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// A value was written at this full path.
    Value(Path),
    /// Some part of the form state changed.
    Change,
    /// Submit passed validation; carries the (pre-submit transformed) values.
    Submit(Value),
    /// Submit was blocked; carries the errors map.
    Failure(ErrorMap),
}

impl FormEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Value(_) => EventKind::Value,
            Self::Change => EventKind::Change,
            Self::Submit(_) => EventKind::Submit,
            Self::Failure(_) => EventKind::Failure,
        }
    }
}

/// Caller-owned listener handle for `on`/`remove_listener`.
///
/// The bus holds listeners weakly: dropping every clone of the handle
/// unsubscribes it as well.
pub type Listener = Rc<dyn Fn(&FormEvent)>;

struct BusInner {
    value: SubscriberList<FormEvent>,
    change: SubscriberList<FormEvent>,
    submit: SubscriberList<FormEvent>,
    failure: SubscriberList<FormEvent>,
}

impl BusInner {
    fn list(&self, kind: EventKind) -> &SubscriberList<FormEvent> {
        match kind {
            EventKind::Value => &self.value,
            EventKind::Change => &self.change,
            EventKind::Submit => &self.submit,
            EventKind::Failure => &self.failure,
        }
    }
}

/// Cloning an `EventBus` yields another handle to the same listeners.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("value", &self.inner.value.len())
            .field("change", &self.inner.change.len())
            .field("submit", &self.inner.submit.len())
            .field("failure", &self.inner.failure.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                value: SubscriberList::new(),
                change: SubscriberList::new(),
                submit: SubscriberList::new(),
                failure: SubscriberList::new(),
            }),
        }
    }

    /// Subscribe for as long as the returned guard lives.
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&FormEvent) + 'static,
    ) -> Subscription {
        self.inner.list(kind).subscribe(callback)
    }

    /// Register a caller-owned listener. Returns `false` if it was already
    /// registered for `kind`.
    pub fn on(&self, kind: EventKind, listener: &Listener) -> bool {
        self.inner.list(kind).insert(listener)
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, kind: EventKind, listener: &Listener) -> bool {
        self.inner.list(kind).remove(listener)
    }

    /// Deliver `event` to the listeners of its kind.
    pub fn emit(&self, event: &FormEvent) {
        self.inner.list(event.kind()).notify(event);
    }

    /// Registered listeners for `kind`, including dead ones not yet pruned.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.list(kind).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn counter() -> (Rc<Cell<u32>>, Listener) {
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let listener: Listener = Rc::new(move |_: &FormEvent| c.set(c.get() + 1));
        (count, listener)
    }

    #[test]
    fn events_reach_only_their_kind() {
        let bus = EventBus::new();
        let (values, on_value) = counter();
        let (changes, on_change) = counter();
        bus.on(EventKind::Value, &on_value);
        bus.on(EventKind::Change, &on_change);

        bus.emit(&FormEvent::Value(Path::parse("a")));
        bus.emit(&FormEvent::Change);
        bus.emit(&FormEvent::Change);

        assert_eq!(values.get(), 1);
        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn on_is_idempotent() {
        let bus = EventBus::new();
        let (count, listener) = counter();
        assert!(bus.on(EventKind::Change, &listener));
        assert!(!bus.on(EventKind::Change, &listener));
        assert_eq!(bus.listener_count(EventKind::Change), 1);

        bus.emit(&FormEvent::Change);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn remove_listener_stops_delivery() {
        let bus = EventBus::new();
        let (count, listener) = counter();
        bus.on(EventKind::Change, &listener);
        assert!(bus.remove_listener(EventKind::Change, &listener));
        assert!(!bus.remove_listener(EventKind::Change, &listener));

        bus.emit(&FormEvent::Change);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn dropping_listener_handle_unsubscribes() {
        let bus = EventBus::new();
        let (count, listener) = counter();
        bus.on(EventKind::Change, &listener);
        drop(listener);
        bus.emit(&FormEvent::Change);
        assert_eq!(count.get(), 0);
        assert_eq!(bus.listener_count(EventKind::Change), 0);
    }

    #[test]
    fn subscription_guard_unsubscribes_on_drop() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let sub = bus.subscribe(EventKind::Submit, move |_| c.set(c.get() + 1));

        bus.emit(&FormEvent::Submit(Value::Null));
        drop(sub);
        bus.emit(&FormEvent::Submit(Value::Null));

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn registration_order_is_delivery_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = ['A', 'B', 'C']
            .into_iter()
            .map(|tag| {
                let log = Rc::clone(&log);
                bus.subscribe(EventKind::Change, move |_| log.borrow_mut().push(tag))
            })
            .collect();

        bus.emit(&FormEvent::Change);
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
        drop(subs);
    }

    #[test]
    fn listener_may_emit_reentrantly() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = bus.clone();
        let l1 = Rc::clone(&log);
        let _value = bus.subscribe(EventKind::Value, move |event| {
            l1.borrow_mut().push(format!("{event:?}"));
            inner_bus.emit(&FormEvent::Change);
        });
        let l2 = Rc::clone(&log);
        let _change = bus.subscribe(EventKind::Change, move |_| l2.borrow_mut().push("change".into()));

        bus.emit(&FormEvent::Value(Path::parse("x")));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(log.borrow()[1], "change");
    }
}
