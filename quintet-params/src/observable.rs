//! Observer lists with revocable subscriptions
//!
//! Notification works on a snapshot of the observer list, so observers may
//! subscribe or unsubscribe while being notified.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::terminable::Terminable;

type Callback<T> = Rc<dyn Fn(&T)>;

struct ObserverList<T: ?Sized> {
    observers: RefCell<Vec<(u64, Callback<T>)>>,
    next_id: Cell<u64>,
}

impl<T: ?Sized> ObserverList<T> {
    fn remove(&self, id: u64) {
        self.observers.borrow_mut().retain(|(observer_id, _)| *observer_id != id);
    }
}

/// A list of observers notified with `&T`
///
/// Cloning shares the same list.
pub struct Observable<T: ?Sized> {
    list: Rc<ObserverList<T>>,
}

impl<T: ?Sized + 'static> Observable<T> {
    pub fn new() -> Self {
        Self {
            list: Rc::new(ObserverList {
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Add an observer; terminating the returned subscription removes it
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let id = self.list.next_id.get();
        self.list.next_id.set(id + 1);
        let observer: Callback<T> = Rc::new(observer);
        self.list.observers.borrow_mut().push((id, observer));

        let list: Weak<ObserverList<T>> = Rc::downgrade(&self.list);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(list) = list.upgrade() {
                    list.remove(id);
                }
            })),
        }
    }

    /// Call every observer registered at the time of the call
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .list
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in snapshot {
            observer(value);
        }
    }

    /// Drop all observers
    pub fn clear(&self) {
        self.list.observers.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.list.observers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.observers.borrow().is_empty()
    }
}

impl<T: ?Sized + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            list: Rc::clone(&self.list),
        }
    }
}

/// Handle that removes one observer when terminated
///
/// Dropping the handle keeps the observer registered.
#[must_use = "an unused subscription can never be revoked"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Revoke the subscription
    pub fn unsubscribe(mut self) {
        self.terminate();
    }
}

impl Terminable for Subscription {
    fn terminate(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
