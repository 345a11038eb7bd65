use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{Observer, StreamError, Subscription};

#[derive(Clone)]
enum Terminal {
    Complete,
    Error(StreamError),
}

struct SubjectState<T> {
    observers: Vec<(u64, Rc<Observer<T>>)>,
    next_id: u64,
    terminal: Option<Terminal>,
}

/// Multicast core shared by the hot buffer and `share`.
///
/// Observers are snapshotted before every emission so callbacks may
/// subscribe, unsubscribe or emit again without tripping the `RefCell`.
pub(crate) struct Subject<T> {
    state: Rc<RefCell<SubjectState<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Subject {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + 'static> Subject<T> {
    pub(crate) fn new() -> Self {
        Subject {
            state: Rc::new(RefCell::new(SubjectState {
                observers: Vec::new(),
                next_id: 0,
                terminal: None,
            })),
        }
    }

    /// Attaches an observer. A terminated subject signals the observer
    /// immediately and hands back a closed subscription.
    pub(crate) fn subscribe(&self, observer: Rc<Observer<T>>) -> Subscription {
        let terminal = self.state.borrow().terminal.clone();
        if let Some(terminal) = terminal {
            match terminal {
                Terminal::Complete => observer.complete(),
                Terminal::Error(err) => observer.error(err),
            }
            return Subscription::empty();
        }

        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, observer));
            id
        };

        let weak: Weak<RefCell<SubjectState<T>>> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().observers.retain(|(oid, _)| *oid != id);
            }
        })
    }

    pub(crate) fn next(&self, value: T) {
        let observers = self.snapshot();
        for observer in observers {
            observer.next(value.clone());
        }
    }

    pub(crate) fn error(&self, error: StreamError) {
        if let Some(observers) = self.terminate(Terminal::Error(error.clone())) {
            for observer in observers {
                observer.error(error.clone());
            }
        }
    }

    pub(crate) fn complete(&self) {
        if let Some(observers) = self.terminate(Terminal::Complete) {
            for observer in observers {
                observer.complete();
            }
        }
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    pub(crate) fn same_as(&self, other: &Subject<T>) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    fn snapshot(&self) -> Vec<Rc<Observer<T>>> {
        let state = self.state.borrow();
        if state.terminal.is_some() {
            return Vec::new();
        }
        state.observers.iter().map(|(_, o)| o.clone()).collect()
    }

    fn terminate(&self, terminal: Terminal) -> Option<Vec<Rc<Observer<T>>>> {
        let mut state = self.state.borrow_mut();
        if state.terminal.is_some() {
            return None;
        }
        state.terminal = Some(terminal);
        let observers = std::mem::take(&mut state.observers);
        Some(observers.into_iter().map(|(_, o)| o).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn unsubscribed_observer_stops_receiving() {
        let subject = Subject::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let sub = subject.subscribe(Rc::new(Observer::new(move |_: i32| h.set(h.get() + 1))));

        subject.next(1);
        sub.unsubscribe();
        subject.next(2);

        assert_eq!(hits.get(), 1);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn late_subscriber_sees_terminal() {
        let subject: Subject<i32> = Subject::new();
        subject.complete();

        let completed = Rc::new(Cell::new(false));
        let c = completed.clone();
        let observer = Observer::new(|_| {}).on_complete(move || c.set(true));
        let sub = subject.subscribe(Rc::new(observer));

        assert!(completed.get());
        assert!(sub.is_closed());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn observer_may_subscribe_during_emission() {
        let subject = Subject::new();
        let inner_hits = Rc::new(Cell::new(0));

        let s = subject.clone();
        let h = inner_hits.clone();
        subject.subscribe(Rc::new(Observer::new(move |v: i32| {
            if v == 1 {
                let h = h.clone();
                s.subscribe(Rc::new(Observer::new(move |_| h.set(h.get() + 1))));
            }
        })));

        subject.next(1);
        assert_eq!(inner_hits.get(), 0);
        subject.next(2);
        assert_eq!(inner_hits.get(), 1);
    }
}
