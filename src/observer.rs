//! Lifecycle observers for service traceability.
//!
//! Observers receive a synchronous callback at every lifecycle point of a
//! service handle: resolution, construction, connect, disconnect and
//! disposal. They are installed through [`RuntimeConfig::with_observer`].
//!
//! [`RuntimeConfig::with_observer`]: crate::RuntimeConfig::with_observer

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::key::ProviderId;

/// Hooks into the life of every service handle of a runtime.
///
/// All hooks default to doing nothing, so an implementation only overrides
/// what it cares about. Calls happen inline with the lifecycle operation;
/// keep them cheap.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, LifecycleObserver, Provider, RuntimeConfig, Scope};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// #[derive(Default)]
/// struct Journal(RefCell<Vec<String>>);
///
/// impl LifecycleObserver for Journal {
///     fn disposed(&self, name: &'static str) {
///         self.0.borrow_mut().push(format!("disposed {name}"));
///     }
/// }
///
/// let journal = Rc::new(Journal::default());
/// let scope = Scope::root();
/// let config = RuntimeConfig::default().with_observer(journal.clone());
/// let _dispose = bootstrap(&scope.host(), config);
///
/// let child = scope.child();
/// child.connect(&Provider::read_only("clock", |_| Ok(0u64))).unwrap();
/// child.destroy();
///
/// assert_eq!(*journal.0.borrow(), vec!["disposed clock".to_string()]);
/// ```
pub trait LifecycleObserver {
    /// A provider is about to be constructed.
    fn resolving(&self, _name: &'static str, _id: ProviderId) {}

    /// A handle was constructed and cached.
    fn created(&self, _name: &'static str, _duration: Duration) {}

    /// A factory returned an error.
    fn factory_failed(&self, _name: &'static str, _message: &str) {}

    /// A connection was added; `ref_count` is the new count.
    fn connected(&self, _name: &'static str, _ref_count: usize) {}

    /// A connection was released; `ref_count` is the new count.
    fn disconnected(&self, _name: &'static str, _ref_count: usize) {}

    /// A handle finished disposing.
    fn disposed(&self, _name: &'static str) {}

    /// A disposal listener was offered to an already disposed handle.
    fn late_listener(&self, _name: &'static str) {}
}

/// Fan-out over every observer registered on a runtime config.
#[derive(Default)]
pub(crate) struct Observers {
    observers: Vec<Rc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Rc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }
}

impl LifecycleObserver for Observers {
    fn resolving(&self, name: &'static str, id: ProviderId) {
        for observer in &self.observers {
            observer.resolving(name, id);
        }
    }

    fn created(&self, name: &'static str, duration: Duration) {
        for observer in &self.observers {
            observer.created(name, duration);
        }
    }

    fn factory_failed(&self, name: &'static str, message: &str) {
        for observer in &self.observers {
            observer.factory_failed(name, message);
        }
    }

    fn connected(&self, name: &'static str, ref_count: usize) {
        for observer in &self.observers {
            observer.connected(name, ref_count);
        }
    }

    fn disconnected(&self, name: &'static str, ref_count: usize) {
        for observer in &self.observers {
            observer.disconnected(name, ref_count);
        }
    }

    fn disposed(&self, name: &'static str) {
        for observer in &self.observers {
            observer.disposed(name);
        }
    }

    fn late_listener(&self, name: &'static str) {
        for observer in &self.observers {
            observer.late_listener(name);
        }
    }
}

/// Observer that re-emits every hook as a `tracing` event.
///
/// Events carry the configured prefix in a `runtime` field so several
/// runtimes can share one subscriber.
pub struct TracingObserver {
    prefix: String,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "cyclotron".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for TracingObserver {
    fn resolving(&self, name: &'static str, id: ProviderId) {
        tracing::debug!(runtime = %self.prefix, service = name, provider = %id, "resolving");
    }

    fn created(&self, name: &'static str, duration: Duration) {
        tracing::debug!(runtime = %self.prefix, service = name, ?duration, "created");
    }

    fn factory_failed(&self, name: &'static str, message: &str) {
        tracing::error!(runtime = %self.prefix, service = name, error = message, "factory failed");
    }

    fn connected(&self, name: &'static str, ref_count: usize) {
        tracing::trace!(runtime = %self.prefix, service = name, ref_count, "connected");
    }

    fn disconnected(&self, name: &'static str, ref_count: usize) {
        tracing::trace!(runtime = %self.prefix, service = name, ref_count, "disconnected");
    }

    fn disposed(&self, name: &'static str) {
        tracing::debug!(runtime = %self.prefix, service = name, "disposed");
    }

    fn late_listener(&self, name: &'static str) {
        tracing::warn!(runtime = %self.prefix, service = name, "listener added after disposal");
    }
}

/// Counters collected by a [`MetricsObserver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub created: u64,
    pub failed: u64,
    pub connected: u64,
    pub disconnected: u64,
    pub disposed: u64,
    pub late_listeners: u64,
}

impl MetricsSnapshot {
    /// Handles created and not yet disposed.
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.disposed)
    }
}

/// Observer that only counts events.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    created: Cell<u64>,
    failed: Cell<u64>,
    connected: Cell<u64>,
    disconnected: Cell<u64>,
    disposed: Cell<u64>,
    late_listeners: Cell<u64>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            created: self.created.get(),
            failed: self.failed.get(),
            connected: self.connected.get(),
            disconnected: self.disconnected.get(),
            disposed: self.disposed.get(),
            late_listeners: self.late_listeners.get(),
        }
    }
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

impl LifecycleObserver for MetricsObserver {
    fn created(&self, _name: &'static str, _duration: Duration) {
        bump(&self.created);
    }

    fn factory_failed(&self, _name: &'static str, _message: &str) {
        bump(&self.failed);
    }

    fn connected(&self, _name: &'static str, _ref_count: usize) {
        bump(&self.connected);
    }

    fn disconnected(&self, _name: &'static str, _ref_count: usize) {
        bump(&self.disconnected);
    }

    fn disposed(&self, _name: &'static str) {
        bump(&self.disposed);
    }

    fn late_listener(&self, _name: &'static str) {
        bump(&self.late_listeners);
    }
}
