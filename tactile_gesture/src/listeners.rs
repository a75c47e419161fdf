// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small ordered listener list with explicit add/remove.
//!
//! Listeners are invoked in registration order. Each registration returns a
//! [`ListenerId`] that the caller keeps to remove the listener again; there
//! is no implicit deregistration.

/// Handle to a registered listener.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

/// An ordered list of event listeners.
pub struct Listeners<E> {
    entries: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
    next: u64,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Listeners<E> {
    /// Creates an empty listener list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
        }
    }

    /// Registers a listener, appended after all existing ones.
    pub fn add(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `true` if it was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Invokes every listener, in registration order.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> core::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_fire_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::<u32>::new();

        let first = Rc::clone(&seen);
        listeners.add(move |e| first.borrow_mut().push(("first", *e)));
        let second = Rc::clone(&seen);
        listeners.add(move |e| second.borrow_mut().push(("second", *e)));

        listeners.emit(&7);
        assert_eq!(&*seen.borrow(), &[("first", 7), ("second", 7)]);
    }

    #[test]
    fn removal_by_handle() {
        let seen = Rc::new(RefCell::new(0_u32));
        let mut listeners = Listeners::<()>::new();

        let counter = Rc::clone(&seen);
        let id = listeners.add(move |()| *counter.borrow_mut() += 1);
        listeners.emit(&());
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.emit(&());

        assert_eq!(*seen.borrow(), 1);
        assert!(listeners.is_empty());
    }
}
