use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{Connection, ServiceHandle, Writer};
use crate::error::{DiError, DiResult};
use crate::traits::Dispose;

/// Where a [`CycleProxy`] is in its single-use life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyPhase {
    /// The provider's construction is still on the stack.
    Pending,
    /// The real handle exists; no connect yet.
    Bound,
    /// The one permitted connect has been made and not released.
    Connected,
    /// The self-connection has been released.
    Released,
    /// Construction failed; no handle will ever exist.
    Abandoned,
}

struct ProxyState<I, O> {
    handle: Option<ServiceHandle<I, O>>,
    connected: bool,
    released: bool,
    abandoned: bool,
}

struct ProxyInner<I, O> {
    name: &'static str,
    writer: Option<Writer<I>>,
    state: RefCell<ProxyState<I, O>>,
}

/// Placeholder handed out when a provider resolves itself while it is being
/// built (the daemon pattern).
///
/// A proxy may be connected once. A connect made before the real handle
/// exists is recorded and applied to the handle's ref count when the
/// construction finishes. Releasing the proxy gives that reference back
/// exactly once; afterwards it is inert.
///
/// The write side is live right away: it feeds the same input buffer the
/// provider is reading, so a daemon can post to itself during construction.
pub struct CycleProxy<I, O> {
    inner: Rc<ProxyInner<I, O>>,
}

impl<I, O> Clone for CycleProxy<I, O> {
    fn clone(&self) -> Self {
        CycleProxy {
            inner: self.inner.clone(),
        }
    }
}

impl<I: Clone + 'static, O: Clone + 'static> CycleProxy<I, O> {
    pub(crate) fn new(name: &'static str, writer: Option<Writer<I>>) -> Self {
        CycleProxy {
            inner: Rc::new(ProxyInner {
                name,
                writer,
                state: RefCell::new(ProxyState {
                    handle: None,
                    connected: false,
                    released: false,
                    abandoned: false,
                }),
            }),
        }
    }

    /// Consumes the single permitted connect.
    pub fn connect(&self) -> DiResult<Connection<I, O>> {
        let handle = {
            let mut state = self.inner.state.borrow_mut();
            if state.connected || state.released || state.abandoned {
                return Err(DiError::CyclicReconnect(self.inner.name));
            }
            state.connected = true;
            state.handle.clone()
        };
        if let Some(handle) = handle {
            handle.retain();
        }
        Ok(Connection::Cyclic(self.clone()))
    }

    /// Attaches the finished handle, or marks the proxy abandoned when
    /// construction failed.
    pub(crate) fn bind(&self, handle: Option<ServiceHandle<I, O>>) {
        let retain = {
            let mut state = self.inner.state.borrow_mut();
            match handle {
                Some(handle) => {
                    let retain = state.connected && !state.released;
                    state.handle = Some(handle.clone());
                    retain.then_some(handle)
                }
                None => {
                    state.abandoned = true;
                    None
                }
            }
        };
        if let Some(handle) = retain {
            handle.retain();
        }
    }

    /// Gives back the self-connection's reference. Only the first call has
    /// an effect.
    pub fn release(&self) {
        let handle = {
            let mut state = self.inner.state.borrow_mut();
            if state.released {
                return;
            }
            state.released = true;
            if state.connected {
                state.handle.clone()
            } else {
                None
            }
        };
        if let Some(handle) = handle {
            handle.disconnect();
        }
    }

    /// The real handle, once bound.
    pub fn handle(&self) -> Option<ServiceHandle<I, O>> {
        self.inner.state.borrow().handle.clone()
    }

    /// The output of the real handle, once bound.
    pub fn read(&self) -> Option<O> {
        self.handle().and_then(|h| h.output())
    }

    pub fn writer(&self) -> Option<Writer<I>> {
        self.inner.writer.clone()
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn phase(&self) -> ProxyPhase {
        let state = self.inner.state.borrow();
        if state.released {
            ProxyPhase::Released
        } else if state.abandoned {
            ProxyPhase::Abandoned
        } else if state.handle.is_none() {
            ProxyPhase::Pending
        } else if state.connected {
            ProxyPhase::Connected
        } else {
            ProxyPhase::Bound
        }
    }
}

impl<I: Clone + 'static, O: Clone + 'static> Dispose for CycleProxy<I, O> {
    fn dispose(&self) {
        self.release();
    }

    fn is_disposed(&self) -> bool {
        matches!(self.phase(), ProxyPhase::Released | ProxyPhase::Abandoned)
    }
}

impl<I, O> fmt::Debug for CycleProxy<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CycleProxy")
            .field("name", &self.inner.name)
            .field("bound", &state.handle.is_some())
            .field("connected", &state.connected)
            .field("released", &state.released)
            .finish()
    }
}
