//! Change notification for containers.
//!
//! Each container owns its own listener list. Listeners carry no payload:
//! they are handed a shared reference to the container and re-read whatever
//! state they need.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// Listener list owned by a single container.
pub(crate) struct Observers<T> {
    inner: Rc<RefCell<Listeners<T>>>,
}

impl<T> Observers<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Invoke every listener attached when the notification starts.
    ///
    /// Listeners attached or detached from inside a listener take effect on
    /// the next notification.
    pub(crate) fn notify(&self, target: &T) {
        let snapshot: Vec<Listener<T>> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in snapshot {
            let mut listener = listener.borrow_mut();
            (&mut *listener)(target);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

impl<T: 'static> Observers<T> {
    pub(crate) fn subscribe(&self, listener: impl FnMut(&T) + 'static) -> Subscription {
        let listener: Listener<T> = Rc::new(RefCell::new(listener));
        let id = {
            let mut listeners = self.inner.borrow_mut();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, listener));
            id
        };

        let list: Weak<RefCell<Listeners<T>>> = Rc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(list) = list.upgrade() {
                    list.borrow_mut().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }
}

/// Handle to an attached change listener.
///
/// The listener stays attached for as long as the handle lives; dropping the
/// handle (or calling [`Subscription::detach`]) removes it.
#[must_use = "dropping a subscription detaches its listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn detach(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
