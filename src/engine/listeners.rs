//! Keyboard modifier listeners.
//!
//! The host forwards key events to a [`ListenerRegistry`]; components hold
//! a [`Subscription`] for as long as they are mounted.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Modifier keys held down at the time of a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierKeys {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

type Callback<E> = Box<dyn FnMut(&E)>;

struct Slots<E> {
    next_id: u64,
    listeners: Vec<(u64, Callback<E>)>,
}

/// Single-threaded listener list.
pub struct ListenerRegistry<E> {
    inner: Rc<RefCell<Slots<E>>>,
}

impl<E> Clone for ListenerRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: 'static> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> ListenerRegistry<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Slots {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register `callback`. It stays registered until the subscription drops.
    pub fn subscribe(&self, callback: impl FnMut(&E) + 'static) -> Subscription {
        let mut slots = self.inner.borrow_mut();
        let id = slots.next_id;
        slots.next_id += 1;
        slots.listeners.push((id, Box::new(callback)));

        let weak: Weak<RefCell<Slots<E>>> = Rc::downgrade(&self.inner);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    pub fn emit(&self, event: &E) {
        // Listeners must not subscribe or unsubscribe from inside a callback.
        let mut slots = self.inner.borrow_mut();
        for (_, callback) in slots.listeners.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deregisters its listener on drop.
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}
