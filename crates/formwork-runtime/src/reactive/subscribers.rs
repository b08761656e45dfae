#![forbid(unsafe_code)]

//! Weakly held callback lists shared by the event bus and tracked cells.
//!
//! # Design
//!
//! Callbacks are stored as `Weak` references. The strong `Rc` lives either
//! in a [`Subscription`] guard (RAII registration) or in a caller-owned
//! [`Listener`](super::Listener) handle (explicit `on`/`remove_listener`).
//! Either way, dropping the strong side is enough to unsubscribe; dead
//! entries are pruned on the next notification.
//!
//! # Failure Modes
//!
//! - **Re-entrant notify**: callbacks are collected before any is invoked,
//!   so a callback may subscribe, unsubscribe, or trigger another
//!   notification without a `RefCell` panic. Callbacks added during a
//!   notification are first called on the next one.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub(crate) type Callback<E> = Rc<dyn Fn(&E)>;

struct Entry<E: ?Sized> {
    /// Address of the callback allocation, for identity comparisons.
    addr: *const (),
    callback: Weak<dyn Fn(&E)>,
}

impl<E: ?Sized> Entry<E> {
    fn is_live(&self) -> bool {
        self.callback.strong_count() > 0
    }
}

pub(crate) struct SubscriberList<E: ?Sized> {
    entries: RefCell<Vec<Entry<E>>>,
}

impl<E: ?Sized + 'static> SubscriberList<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register `callback` unless it is already registered. Returns whether
    /// it was added.
    pub(crate) fn insert(&self, callback: &Callback<E>) -> bool {
        let addr = Rc::as_ptr(callback).cast::<()>();
        let mut entries = self.entries.borrow_mut();
        entries.retain(Entry::is_live);
        if entries.iter().any(|e| e.addr == addr) {
            return false;
        }
        entries.push(Entry {
            addr,
            callback: Rc::downgrade(callback),
        });
        true
    }

    /// Register a fresh callback owned by the returned guard.
    pub(crate) fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let strong: Callback<E> = Rc::new(callback);
        self.insert(&strong);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Remove `callback`. Returns whether it was registered.
    pub(crate) fn remove(&self, callback: &Callback<E>) -> bool {
        let addr = Rc::as_ptr(callback).cast::<()>();
        let mut entries = self.entries.borrow_mut();
        let found = entries.iter().any(|e| e.is_live() && e.addr == addr);
        entries.retain(|e| e.is_live() && e.addr != addr);
        found
    }

    /// Number of registered callbacks, including dead ones not yet pruned.
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Invoke every live callback in registration order.
    pub(crate) fn notify(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(Entry::is_live);
            entries.iter().filter_map(|e| e.callback.upgrade()).collect()
        };
        for cb in &callbacks {
            cb(event);
        }
    }
}

/// RAII guard for a subscriber callback.
///
/// Dropping the guard drops the only strong reference to the callback, so
/// it is never invoked again.
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
