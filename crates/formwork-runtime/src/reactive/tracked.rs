#![forbid(unsafe_code)]

//! Shared cell with a synchronous getter and change notification.
//!
//! [`Tracked<T>`] is what listeners and validators capture when they must
//! read the *latest* committed value rather than a copy taken when they were
//! registered (the array key list is the main user). Change subscribers are
//! how an integration layer learns it should re-render; reads never wait on
//! them.
//!
//! # Invariants
//!
//! 1. `version` increments by exactly 1 on each value-changing mutation.
//! 2. Setting an equal value is a no-op (no version bump, no notification).
//! 3. Subscribers run after the borrow is released, in registration order.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscribers::{SubscriberList, Subscription};

struct TrackedInner<T> {
    value: RefCell<T>,
    version: std::cell::Cell<u64>,
    subscribers: SubscriberList<T>,
}

/// Cloning a `Tracked` creates another handle to the same cell.
pub struct Tracked<T> {
    inner: Rc<TrackedInner<T>>,
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracked")
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Tracked<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(TrackedInner {
                value: RefCell::new(value),
                version: std::cell::Cell::new(0),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.bump_and_notify();
    }

    /// Mutate in place; subscribers are notified if the value changed.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (result, changed) = {
            let mut current = self.inner.value.borrow_mut();
            let before = current.clone();
            let result = f(&mut current);
            (result, *current != before)
        };
        if changed {
            self.bump_and_notify();
        }
        result
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    fn bump_and_notify(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        let value = self.get();
        self.inner.subscribers.notify(&value);
    }
}
