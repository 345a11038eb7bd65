use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::{Observer, Source, StreamError, Subject, Subscription};

enum Signal<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

enum BufferState<T> {
    /// No subscriber has ever attached; every signal is memoized.
    Cold { memo: VecDeque<Signal<T>> },
    /// The first subscriber is receiving the memo. `historical` counts the
    /// entries that predate it; anything pushed meanwhile queues behind them.
    Replaying {
        memo: VecDeque<Signal<T>>,
        historical: usize,
    },
    /// Live broadcast, forever.
    Hot,
}

struct BufferInner<T> {
    subject: Subject<T>,
    state: RefCell<BufferState<T>>,
    terminated: Cell<bool>,
}

/// Push channel that memoizes until its first subscriber, then goes live.
///
/// Before any subscriber attaches, pushed values (and terminal signals) are
/// kept in order. The first `subscribe` replays them to that subscriber
/// only, after which the buffer stays hot: later subscribers see values from
/// their own subscription onward and nothing historical.
///
/// # Examples
///
/// ```rust
/// use ferrous_cyclotron::{HotBuffer, Observer};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let buffer = HotBuffer::new();
/// buffer.push(1);
/// buffer.push(2);
///
/// let first = Rc::new(RefCell::new(Vec::new()));
/// let f = first.clone();
/// buffer.subscribe(Observer::new(move |v| f.borrow_mut().push(v)));
///
/// let second = Rc::new(RefCell::new(Vec::new()));
/// let s = second.clone();
/// buffer.subscribe(Observer::new(move |v| s.borrow_mut().push(v)));
///
/// buffer.push(3);
/// assert_eq!(*first.borrow(), vec![1, 2, 3]);
/// assert_eq!(*second.borrow(), vec![3]);
/// ```
pub struct HotBuffer<T> {
    inner: Rc<BufferInner<T>>,
}

impl<T> Clone for HotBuffer<T> {
    fn clone(&self) -> Self {
        HotBuffer {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for HotBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> HotBuffer<T> {
    /// Creates a cold, empty buffer.
    pub fn new() -> Self {
        HotBuffer {
            inner: Rc::new(BufferInner {
                subject: Subject::new(),
                state: RefCell::new(BufferState::Cold {
                    memo: VecDeque::new(),
                }),
                terminated: Cell::new(false),
            }),
        }
    }

    /// Appends a value: memoized while cold, broadcast once hot.
    pub fn push(&self, value: T) {
        if self.inner.terminated.get() {
            tracing::warn!("value pushed to a terminated buffer was dropped");
            return;
        }
        if let Some(Signal::Next(value)) = self.memoize(Signal::Next(value)) {
            self.inner.subject.next(value);
        }
    }

    /// Propagates an error signal. Later pushes are dropped.
    pub fn error(&self, error: StreamError) {
        if self.inner.terminated.replace(true) {
            return;
        }
        if self.memoize(Signal::Error(error.clone())).is_some() {
            self.inner.subject.error(error);
        }
    }

    /// Propagates completion. Later pushes are dropped.
    pub fn complete(&self) {
        if self.inner.terminated.replace(true) {
            return;
        }
        if self.memoize(Signal::Complete).is_some() {
            self.inner.subject.complete();
        }
    }

    /// Attaches a consumer; the first one ever receives the memo.
    pub fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let observer = Rc::new(observer);
        let subscription = self.inner.subject.subscribe(observer.clone());

        let memo = {
            let mut state = self.inner.state.borrow_mut();
            match &mut *state {
                BufferState::Cold { memo } => {
                    let memo = std::mem::take(memo);
                    let historical = memo.len();
                    *state = BufferState::Replaying { memo, historical };
                    true
                }
                _ => false,
            }
        };
        if memo {
            self.replay(&observer, &subscription);
        }
        subscription
    }

    /// The read side of the buffer.
    pub fn source(&self) -> Source<T> {
        let buffer = self.clone();
        Source::new(move |observer| buffer.subscribe(observer))
    }

    /// The write side of the buffer.
    pub fn sink(&self) -> Sink<T> {
        Sink {
            buffer: self.clone(),
        }
    }

    /// Whether the buffer still memoizes (no subscriber ever attached).
    pub fn is_cold(&self) -> bool {
        matches!(*self.inner.state.borrow(), BufferState::Cold { .. })
    }

    /// Whether `complete` or `error` was called.
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.get()
    }

    /// Number of currently attached consumers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subject.observer_count()
    }

    /// Queues the signal unless the buffer is hot, in which case it is
    /// handed back for broadcast.
    fn memoize(&self, signal: Signal<T>) -> Option<Signal<T>> {
        let mut state = self.inner.state.borrow_mut();
        match &mut *state {
            BufferState::Cold { memo } | BufferState::Replaying { memo, .. } => {
                memo.push_back(signal);
                None
            }
            BufferState::Hot => Some(signal),
        }
    }

    fn replay(&self, first: &Rc<Observer<T>>, subscription: &Subscription) {
        loop {
            let (signal, private) = {
                let mut state = self.inner.state.borrow_mut();
                match &mut *state {
                    BufferState::Replaying { memo, historical } => match memo.pop_front() {
                        Some(signal) => {
                            let private = *historical > 0;
                            *historical = historical.saturating_sub(1);
                            (signal, private)
                        }
                        None => {
                            *state = BufferState::Hot;
                            return;
                        }
                    },
                    _ => return,
                }
            };

            // Terminal signals always reach everyone attached.
            match signal {
                Signal::Next(value) if private => {
                    if !subscription.is_closed() {
                        first.next(value);
                    }
                }
                Signal::Next(value) => self.inner.subject.next(value),
                Signal::Error(err) => self.inner.subject.error(err),
                Signal::Complete => self.inner.subject.complete(),
            }
        }
    }
}

impl<T> fmt::Debug for HotBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.inner.state.borrow() {
            BufferState::Cold { ref memo } => format!("cold({})", memo.len()),
            BufferState::Replaying { ref memo, .. } => format!("replaying({})", memo.len()),
            BufferState::Hot => "hot".to_string(),
        };
        f.debug_struct("HotBuffer")
            .field("state", &state)
            .field("terminated", &self.inner.terminated.get())
            .finish()
    }
}

/// Write side of a [`HotBuffer`].
pub struct Sink<T> {
    buffer: HotBuffer<T>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Sink {
            buffer: self.buffer.clone(),
        }
    }
}

impl<T: Clone + 'static> Sink<T> {
    /// Pushes a value.
    pub fn next(&self, value: T) {
        self.buffer.push(value);
    }

    /// Pushes an error signal.
    pub fn error(&self, error: StreamError) {
        self.buffer.error(error);
    }

    /// Completes the buffer.
    pub fn complete(&self) {
        self.buffer.complete();
    }

    /// Whether the underlying buffer has terminated.
    pub fn is_closed(&self) -> bool {
        self.buffer.is_terminated()
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("buffer", &self.buffer).finish()
    }
}
