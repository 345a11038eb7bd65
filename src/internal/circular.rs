//! Cyclic self-resolution tracking.
//!
//! Every provider under construction owns a frame keyed by its identity.
//! Resolving a provider that already has a frame is a cycle: the caller gets
//! the frame's proxy, whose binder is parked in the frame until the real
//! handle exists. One frame hands out one proxy.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::collections::Map;
use crate::error::{DiError, DiResult};
use crate::key::ProviderId;

pub(crate) type AnyRc = Rc<dyn Any>;

/// Called with the finished handle, or `None` if construction failed.
pub(crate) type Binder = Box<dyn FnOnce(Option<&AnyRc>)>;

struct Frame {
    input: Option<AnyRc>,
    proxy: Option<AnyRc>,
    binders: Vec<Binder>,
}

/// In-flight constructions of one runtime.
#[derive(Default)]
pub(crate) struct Resolving {
    frames: RefCell<Map<ProviderId, Frame>>,
    depth: Cell<usize>,
}

impl Resolving {
    pub(crate) fn contains(&self, id: ProviderId) -> bool {
        self.frames.borrow().contains_key(&id)
    }

    /// Input buffer of a provider under construction, type-erased.
    pub(crate) fn pending_input(&self, id: ProviderId) -> Option<AnyRc> {
        self.frames.borrow().get(&id).and_then(|f| f.input.clone())
    }

    /// Proxy already handed out for a provider under construction.
    pub(crate) fn proxy(&self, id: ProviderId) -> Option<AnyRc> {
        self.frames.borrow().get(&id).and_then(|f| f.proxy.clone())
    }

    /// Records the proxy of a frame and parks its binder until the
    /// provider's construction finishes.
    pub(crate) fn set_proxy(&self, id: ProviderId, proxy: AnyRc, binder: Binder) {
        if let Some(frame) = self.frames.borrow_mut().get_mut(&id) {
            frame.proxy = Some(proxy);
            frame.binders.push(binder);
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth.get()
    }
}

/// Guard for one provider construction.
///
/// Dropping the guard without [`complete`](ResolutionGuard::complete), on an
/// error return or while unwinding, removes the frame and tells every parked
/// binder that no handle will ever exist.
pub(crate) struct ResolutionGuard<'a> {
    resolving: &'a Resolving,
    id: ProviderId,
    done: bool,
}

impl<'a> ResolutionGuard<'a> {
    pub(crate) fn enter(
        resolving: &'a Resolving,
        id: ProviderId,
        input: Option<AnyRc>,
        max_depth: usize,
    ) -> DiResult<Self> {
        let depth = resolving.depth.get();
        if depth >= max_depth {
            return Err(DiError::DepthExceeded(depth));
        }
        resolving.frames.borrow_mut().insert(
            id,
            Frame {
                input,
                proxy: None,
                binders: Vec::new(),
            },
        );
        resolving.depth.set(depth + 1);
        Ok(Self {
            resolving,
            id,
            done: false,
        })
    }

    /// Ends the construction and binds every parked proxy to `handle`.
    pub(crate) fn complete(mut self, handle: &AnyRc) {
        self.done = true;
        let frame = self.resolving.frames.borrow_mut().remove(&self.id);
        if let Some(frame) = frame {
            for binder in frame.binders {
                binder(Some(handle));
            }
        }
    }
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.resolving
            .depth
            .set(self.resolving.depth.get().saturating_sub(1));
        if self.done {
            return;
        }
        let frame = self.resolving.frames.borrow_mut().remove(&self.id);
        if let Some(frame) = frame {
            for binder in frame.binders {
                binder(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_lives_while_guard_is_held() {
        let resolving = Resolving::default();
        let id = ProviderId::next();
        {
            let _guard = ResolutionGuard::enter(&resolving, id, None, 8).unwrap();
            assert!(resolving.contains(id));
            assert_eq!(resolving.depth(), 1);
        }
        assert!(!resolving.contains(id));
        assert_eq!(resolving.depth(), 0);
    }

    #[test]
    fn binders_see_failure_when_guard_drops() {
        let resolving = Resolving::default();
        let id = ProviderId::next();
        let outcome = Rc::new(Cell::new(None));
        {
            let _guard = ResolutionGuard::enter(&resolving, id, None, 8).unwrap();
            let o = outcome.clone();
            resolving.set_proxy(id, Rc::new(()), Box::new(move |h| o.set(Some(h.is_some()))));
        }
        assert_eq!(outcome.get(), Some(false));
    }

    #[test]
    fn binders_see_handle_on_complete() {
        let resolving = Resolving::default();
        let id = ProviderId::next();
        let outcome = Rc::new(Cell::new(None));
        let guard = ResolutionGuard::enter(&resolving, id, Some(Rc::new(5u8)), 8).unwrap();
        assert!(resolving.pending_input(id).is_some());
        assert!(resolving.proxy(id).is_none());
        resolving.set_proxy(id, Rc::new("proxy"), Box::new(|_| {}));
        assert!(resolving.proxy(id).is_some());
        let o = outcome.clone();
        resolving.set_proxy(id, Rc::new(()), Box::new(move |h| o.set(Some(h.is_some()))));

        let handle: AnyRc = Rc::new(());
        guard.complete(&handle);
        assert_eq!(outcome.get(), Some(true));
        assert_eq!(resolving.depth(), 0);
    }

    #[test]
    fn depth_guard() {
        let resolving = Resolving::default();
        let _outer = ResolutionGuard::enter(&resolving, ProviderId::next(), None, 1).unwrap();
        let inner = ResolutionGuard::enter(&resolving, ProviderId::next(), None, 1);
        assert!(matches!(inner, Err(DiError::DepthExceeded(1))));
    }
}
