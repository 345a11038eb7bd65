//! Service handles ("cyclotrons") and what connecting to them yields.
//!
//! A [`ServiceHandle`] is one live instance of a provider inside one scope.
//! It counts its connections and disposes itself when the last one is
//! released. A [`CycleProxy`] stands in for a handle that is still being
//! built when its own construction tries to connect to it.

mod connection;
mod handle;
mod proxy;
mod teardown;

pub use connection::{Connection, Writer};
pub use handle::ServiceHandle;
pub use proxy::{CycleProxy, ProxyPhase};

pub(crate) use connection::WriteFn;
pub(crate) use handle::{AnyHandle, Dependency, HandleParts};
pub(crate) use teardown::Teardown;

/// Result of resolving a provider.
pub enum HandleRef<I, O> {
    /// The materialized handle.
    Real(ServiceHandle<I, O>),
    /// Placeholder for a provider whose construction is still on the stack.
    Proxy(CycleProxy<I, O>),
}

impl<I: Clone + 'static, O: Clone + 'static> HandleRef<I, O> {
    /// The real handle, if one exists yet.
    pub fn handle(&self) -> Option<ServiceHandle<I, O>> {
        match self {
            HandleRef::Real(handle) => Some(handle.clone()),
            HandleRef::Proxy(proxy) => proxy.handle(),
        }
    }

    /// Whether this is a placeholder still waiting for its handle.
    pub fn is_pending(&self) -> bool {
        matches!(self, HandleRef::Proxy(proxy) if proxy.phase() == ProxyPhase::Pending)
    }
}

impl<I, O> std::fmt::Debug for HandleRef<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandleRef::Real(handle) => f.debug_tuple("Real").field(handle).finish(),
            HandleRef::Proxy(proxy) => f.debug_tuple("Proxy").field(proxy).finish(),
        }
    }
}
