use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{Observer, Subject, Subscription};

type SubscribeFn<T> = dyn Fn(Observer<T>) -> Subscription;

/// Read side of a push stream.
///
/// A `Source` is a subscribe function: each `subscribe` call attaches one
/// observer and returns its [`Subscription`]. Whether emissions are shared
/// between subscribers depends on what the source wraps: a hot buffer's
/// source is shared, `Source::of` replays per subscriber, `share` multicasts
/// an upstream.
pub struct Source<T> {
    subscribe: Rc<SubscribeFn<T>>,
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Source {
            subscribe: self.subscribe.clone(),
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Source<T> {
    /// Wraps a subscribe function.
    pub fn new(subscribe: impl Fn(Observer<T>) -> Subscription + 'static) -> Self {
        Source {
            subscribe: Rc::new(subscribe),
        }
    }

    /// A source that emits `values` synchronously on subscribe, then completes.
    pub fn of(values: Vec<T>) -> Self {
        Source::new(move |observer| {
            for value in values.iter().cloned() {
                observer.next(value);
            }
            observer.complete();
            Subscription::empty()
        })
    }

    /// A source that never emits.
    pub fn never() -> Self {
        Source::new(|_| Subscription::empty())
    }

    /// Attaches an observer.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        (self.subscribe)(observer)
    }

    /// Attaches a value-only observer.
    pub fn subscribe_fn(&self, next: impl Fn(T) + 'static) -> Subscription {
        self.subscribe(Observer::new(next))
    }

    /// Transforms every value.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Source<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Source::new(move |observer: Observer<U>| {
            let downstream = Rc::new(observer);
            let (d_next, d_err, d_done) = (downstream.clone(), downstream.clone(), downstream);
            let f = f.clone();
            upstream.subscribe(
                Observer::new(move |v| d_next.next(f(v)))
                    .on_error(move |e| d_err.error(e))
                    .on_complete(move || d_done.complete()),
            )
        })
    }

    /// Keeps the values matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Source<T> {
        let upstream = self.clone();
        let predicate = Rc::new(predicate);
        Source::new(move |observer: Observer<T>| {
            let downstream = Rc::new(observer);
            let (d_next, d_err, d_done) = (downstream.clone(), downstream.clone(), downstream);
            let predicate = predicate.clone();
            upstream.subscribe(
                Observer::new(move |v| {
                    if predicate(&v) {
                        d_next.next(v);
                    }
                })
                .on_error(move |e| d_err.error(e))
                .on_complete(move || d_done.complete()),
            )
        })
    }

    /// Multicasts a single upstream subscription among all subscribers.
    ///
    /// The upstream is subscribed when the first downstream subscriber
    /// attaches and unsubscribed as soon as the last one leaves, including
    /// the very last inner subscription. A terminated upstream resets the
    /// share so the next subscriber starts a fresh upstream subscription.
    pub fn share(&self) -> Source<T> {
        let shared = Rc::new(RefCell::new(ShareState::<T> {
            subject: None,
            upstream: None,
            refs: 0,
        }));
        let source = self.clone();
        Source::new(move |observer| {
            let (subject, first) = {
                let mut state = shared.borrow_mut();
                state.refs += 1;
                match state.subject {
                    Some(ref subject) => (subject.clone(), false),
                    None => {
                        let subject = Subject::new();
                        state.subject = Some(subject.clone());
                        (subject, true)
                    }
                }
            };

            let inner = subject.subscribe(Rc::new(observer));

            if first {
                let (s_next, s_err, s_done) = (subject.clone(), subject.clone(), subject.clone());
                let (r_err, r_done) = (shared.clone(), shared.clone());
                let upstream = source.subscribe(
                    Observer::new(move |v| s_next.next(v))
                        .on_error(move |e| {
                            ShareState::reset(&r_err);
                            s_err.error(e);
                        })
                        .on_complete(move || {
                            ShareState::reset(&r_done);
                            s_done.complete();
                        }),
                );
                let mut state = shared.borrow_mut();
                let same = state
                    .subject
                    .as_ref()
                    .map(|s| s.same_as(&subject))
                    .unwrap_or(false);
                if same {
                    state.upstream = Some(upstream);
                }
            }

            let shared = shared.clone();
            Subscription::new(move || {
                inner.unsubscribe();
                let upstream = {
                    let mut state = shared.borrow_mut();
                    let same = state
                        .subject
                        .as_ref()
                        .map(|s| s.same_as(&subject))
                        .unwrap_or(false);
                    if !same {
                        return;
                    }
                    state.refs = state.refs.saturating_sub(1);
                    if state.refs > 0 {
                        return;
                    }
                    state.subject = None;
                    state.upstream.take()
                };
                if let Some(upstream) = upstream {
                    upstream.unsubscribe();
                }
            })
        })
    }
}

struct ShareState<T> {
    subject: Option<Subject<T>>,
    upstream: Option<Subscription>,
    refs: usize,
}

impl<T> ShareState<T> {
    fn reset(state: &Rc<RefCell<ShareState<T>>>) {
        let mut state = state.borrow_mut();
        state.subject = None;
        state.upstream = None;
        state.refs = 0;
    }
}
