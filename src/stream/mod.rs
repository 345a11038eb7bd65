//! Push-value primitives the runtime is built on.
//!
//! Everything here is single-threaded and synchronous: a `next` call runs
//! every observer to completion before it returns. Adapters translate these
//! types into whatever stream type an embedding application prefers.

mod buffer;
mod source;
mod subject;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use buffer::{HotBuffer, Sink};
pub use source::Source;
pub(crate) use subject::Subject;

/// Error payload carried by a stream's error signal.
///
/// Cheap to clone so that one error can reach every observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError(Rc<str>);

impl StreamError {
    /// Creates a stream error with the given message.
    pub fn new(message: impl AsRef<str>) -> Self {
        StreamError(Rc::from(message.as_ref()))
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for StreamError {}

impl From<&str> for StreamError {
    fn from(message: &str) -> Self {
        StreamError::new(message)
    }
}

impl From<String> for StreamError {
    fn from(message: String) -> Self {
        StreamError::new(message)
    }
}

type NextFn<T> = Box<dyn Fn(T)>;
type ErrorFn = Box<dyn Fn(StreamError)>;
type CompleteFn = Box<dyn Fn()>;

/// Consumer callbacks for a stream.
///
/// # Examples
///
/// ```rust
/// use ferrous_cyclotron::{Observer, Source};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let done = Rc::new(RefCell::new(false));
///
/// let (s, d) = (seen.clone(), done.clone());
/// Source::of(vec![1, 2]).subscribe(
///     Observer::new(move |v| s.borrow_mut().push(v)).on_complete(move || *d.borrow_mut() = true),
/// );
///
/// assert_eq!(*seen.borrow(), vec![1, 2]);
/// assert!(*done.borrow());
/// ```
pub struct Observer<T> {
    next: NextFn<T>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl<T> Observer<T> {
    /// Creates an observer that only handles values.
    pub fn new(next: impl Fn(T) + 'static) -> Self {
        Self {
            next: Box::new(next),
            error: None,
            complete: None,
        }
    }

    /// Adds an error handler.
    pub fn on_error(mut self, error: impl Fn(StreamError) + 'static) -> Self {
        self.error = Some(Box::new(error));
        self
    }

    /// Adds a completion handler.
    pub fn on_complete(mut self, complete: impl Fn() + 'static) -> Self {
        self.complete = Some(Box::new(complete));
        self
    }

    /// Delivers a value.
    pub fn next(&self, value: T) {
        (self.next)(value);
    }

    /// Delivers an error signal.
    pub fn error(&self, error: StreamError) {
        if let Some(ref on_error) = self.error {
            on_error(error);
        }
    }

    /// Delivers a completion signal.
    pub fn complete(&self) {
        if let Some(ref on_complete) = self.complete {
            on_complete();
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

/// Handle to an active subscription.
///
/// Unsubscribing runs the teardown at most once; clones share that state.
/// Dropping a subscription does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    teardown: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl Subscription {
    /// Creates a subscription that runs `teardown` on first unsubscribe.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Rc::new(RefCell::new(Some(Box::new(teardown)))),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self {
            teardown: Rc::new(RefCell::new(None)),
        }
    }

    /// Runs the teardown if it has not run yet.
    pub fn unsubscribe(&self) {
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Whether the teardown has already run (or never existed).
    pub fn is_closed(&self) -> bool {
        self.teardown.borrow().is_none()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscription_tears_down_once() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let sub = Subscription::new(move || c.set(c.get() + 1));
        let clone = sub.clone();

        assert!(!sub.is_closed());
        sub.unsubscribe();
        clone.unsubscribe();
        assert_eq!(count.get(), 1);
        assert!(clone.is_closed());
    }

    #[test]
    fn empty_subscription_is_closed() {
        assert!(Subscription::empty().is_closed());
    }

    #[test]
    fn stream_error_message() {
        let err = StreamError::from("boom");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.to_string(), "boom");
    }
}
