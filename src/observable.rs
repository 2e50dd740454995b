//! Tiny reactive cells used for priority and gate booleans.
//!
//! Each [`Observable<T>`] supports `subscribe`/`value`/`set` with synchronous,
//! re-entrant-safe dispatch: a listener is free to subscribe, unsubscribe, or
//! `set` other observables (including this one) from within its own callback.
//! This is load-bearing for the queue: a priority-change listener re-runs the
//! prioritisation sweep, which may remove queue entries and thereby drop
//! their `Subscription` guards — while we are still in the middle of
//! notifying listeners for the original change.
//!
//! The trick is the same one used by single-threaded reactive runtimes
//! generally: never hold a `RefCell` borrow across a callback invocation.
//! `notify` clones the listener table (an `Rc` clone per entry, not a deep
//! copy) and releases its borrow before calling out.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Listener<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Inner<T> {
    value: T,
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// A reactive cell: holds a value, notifies subscribers synchronously when
/// it changes.
pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// RAII subscription handle. Dropping it unsubscribes the listener.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    unsubscribe: Box<dyn FnOnce()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let noop: Box<dyn FnOnce()> = Box::new(|| {});
        let f = std::mem::replace(&mut self.unsubscribe, noop);
        f();
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Set a new value. No-op (no notification) if the value is unchanged.
    pub fn set(&self, new_value: T) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == new_value {
                false
            } else {
                inner.value = new_value;
                true
            }
        };
        if changed {
            self.notify();
        }
    }

    /// Subscribe a listener, called synchronously on every change.
    ///
    /// Returns a [`Subscription`] guard; dropping it unsubscribes.
    pub fn subscribe(&self, mut listener: impl FnMut(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            let boxed: Listener<T> = Rc::new(RefCell::new(move |v: &T| listener(v)));
            inner.listeners.push((id, boxed));
            id
        };
        let weak: Weak<RefCell<Inner<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
                }
            }),
        }
    }

    fn notify(&self) {
        let snapshot: Vec<(u64, Listener<T>)> = {
            let inner = self.inner.borrow();
            inner.listeners.clone()
        };
        let value = self.get();
        for (_, listener) in snapshot {
            // Re-entrant calls may have already unsubscribed this listener;
            // that's fine, we still hold our own Rc clone keeping it alive
            // for the duration of this call.
            (listener.borrow_mut())(&value);
        }
    }
}

/// A fire-and-forget event channel (no retained "current value"), used for
/// the Announcer's completion signal.
pub struct EventEmitter<T> {
    inner: Rc<RefCell<Vec<(u64, Listener<T>)>>>,
    next_id: Rc<RefCell<u64>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            next_id: Rc::clone(&self.next_id),
        }
    }
}

impl<T: Clone + 'static> EventEmitter<T> {
    /// Create a new, empty emitter.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(RefCell::new(0)),
        }
    }

    /// Subscribe a listener. Returns a [`Subscription`] guard.
    pub fn subscribe(&self, mut listener: impl FnMut(&T) + 'static) -> Subscription {
        let id = {
            let mut next_id = self.next_id.borrow_mut();
            let id = *next_id;
            *next_id += 1;
            id
        };
        let boxed: Listener<T> = Rc::new(RefCell::new(move |v: &T| listener(v)));
        self.inner.borrow_mut().push((id, boxed));
        let weak: Weak<RefCell<Vec<(u64, Listener<T>)>>> = Rc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().retain(|(lid, _)| *lid != id);
                }
            }),
        }
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(u64, Listener<T>)> = self.inner.borrow().clone();
        for (_, listener) in snapshot {
            (listener.borrow_mut())(value);
        }
    }
}

impl<T: Clone + 'static> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
