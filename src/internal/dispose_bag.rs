//! Internal disposal bag for a handle's listeners.

use super::collections::ListenerVec;

/// A disposal listener.
pub(crate) type Listener = Box<dyn FnOnce()>;

/// Listeners run in registration order (FIFO), exactly once.
///
/// Draining the bag leaves a disposed sentinel behind: later pushes are
/// refused and handed back to the caller, which decides how to report them.
pub(crate) struct DisposeBag {
    listeners: Option<ListenerVec<Listener>>,
}

impl Default for DisposeBag {
    fn default() -> Self {
        Self {
            listeners: Some(ListenerVec::default()),
        }
    }
}

impl DisposeBag {
    /// Adds a listener, or returns it if the bag was already drained.
    pub(crate) fn push(&mut self, listener: Listener) -> Result<(), Listener> {
        match self.listeners {
            Some(ref mut listeners) => {
                listeners.push(listener);
                Ok(())
            }
            None => Err(listener),
        }
    }

    /// Takes every listener and marks the bag disposed. `None` on the
    /// second call.
    pub(crate) fn drain(&mut self) -> Option<ListenerVec<Listener>> {
        self.listeners.take()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.listeners.is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.as_ref().map(|l| l.len()).unwrap_or(0)
    }
}

/// Runs drained listeners in order.
pub(crate) fn run_all(listeners: ListenerVec<Listener>) {
    for listener in listeners {
        listener();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn drains_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for i in 0..3 {
            let o = order.clone();
            assert!(bag.push(Box::new(move || o.borrow_mut().push(i))).is_ok());
        }
        assert_eq!(bag.len(), 3);

        run_all(bag.drain().unwrap());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn refuses_after_drain() {
        let mut bag = DisposeBag::default();
        bag.drain();
        assert!(bag.is_disposed());
        assert!(bag.push(Box::new(|| {})).is_err());
        assert!(bag.drain().is_none());
        assert_eq!(bag.len(), 0);
    }
}
