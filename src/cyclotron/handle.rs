use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::teardown::push_listener;
use super::{Connection, Teardown, WriteFn, Writer};
use crate::error::{DiError, DiResult};
use crate::internal::{run_all, DisposeBag};
use crate::key::{ContextKey, ProviderId};
use crate::kind::ProviderKind;
use crate::observer::LifecycleObserver;
use crate::stream::{HotBuffer, Source};
use crate::traits::{Dispose, Host};

/// A provider a handle connected to while it was built, and the override
/// entry that was visible for it at that time.
pub(crate) struct Dependency {
    pub(crate) id: ProviderId,
    pub(crate) seen: Option<Rc<dyn Any>>,
}

impl Dependency {
    /// Captures the override currently visible from `host` for `id`.
    pub(crate) fn observe(host: &dyn Host, id: ProviderId) -> Self {
        Dependency {
            id,
            seen: host.get_context(&ContextKey::Override(id)),
        }
    }

    fn still_visible(&self, host: &dyn Host) -> bool {
        let current = host.get_context(&ContextKey::Override(self.id));
        match (current, &self.seen) {
            (None, None) => true,
            (Some(now), Some(then)) => {
                Rc::as_ptr(&now) as *const () == Rc::as_ptr(then) as *const ()
            }
            _ => false,
        }
    }
}

/// Everything the runtime gathered while constructing a handle.
pub(crate) struct HandleParts<I, O> {
    pub(crate) provider_id: ProviderId,
    pub(crate) serial: u64,
    pub(crate) name: &'static str,
    pub(crate) kind: ProviderKind,
    pub(crate) input: Option<HotBuffer<I>>,
    pub(crate) output: Option<O>,
    pub(crate) write: Option<WriteFn<I>>,
    pub(crate) listeners: Rc<RefCell<DisposeBag>>,
    pub(crate) observer: Option<Rc<dyn LifecycleObserver>>,
    pub(crate) dependencies: Vec<Dependency>,
}

struct HandleInner<I, O> {
    provider_id: ProviderId,
    serial: u64,
    name: &'static str,
    kind: ProviderKind,
    input: Option<HotBuffer<I>>,
    output: Option<O>,
    write: Option<WriteFn<I>>,
    ref_count: Cell<usize>,
    listeners: Rc<RefCell<DisposeBag>>,
    observer: Option<Rc<dyn LifecycleObserver>>,
    dependencies: Vec<Dependency>,
}

/// Live, reference-counted instance of a provider within one scope.
///
/// Every [`connect`](crate::connect) adds one reference; the scope-exit hook
/// it registers removes it again. The handle disposes when the count drops
/// from one to zero, or when the runtime's bulk disposal runs.
///
/// Disposal completes the input buffer first, then runs the disposal
/// listeners in registration order. Listeners include the release of every
/// connection the provider made while it was being built, so disposing a
/// service also unwinds what it depends on.
pub struct ServiceHandle<I, O> {
    inner: Rc<HandleInner<I, O>>,
}

impl<I, O> Clone for ServiceHandle<I, O> {
    fn clone(&self) -> Self {
        ServiceHandle {
            inner: self.inner.clone(),
        }
    }
}

impl<I: Clone + 'static, O: Clone + 'static> ServiceHandle<I, O> {
    pub(crate) fn new(parts: HandleParts<I, O>) -> Self {
        ServiceHandle {
            inner: Rc::new(HandleInner {
                provider_id: parts.provider_id,
                serial: parts.serial,
                name: parts.name,
                kind: parts.kind,
                input: parts.input,
                output: parts.output,
                write: parts.write,
                ref_count: Cell::new(0),
                listeners: parts.listeners,
                observer: parts.observer,
                dependencies: parts.dependencies,
            }),
        }
    }

    /// Adds one reference and registers its release with `teardown`.
    pub(crate) fn connect(&self, teardown: &Teardown) -> DiResult<Connection<I, O>> {
        if self.is_disposed() {
            return Err(DiError::Disposed(self.inner.name));
        }
        let connection = self.connection(teardown)?;
        self.retain();

        let handle = self.clone();
        teardown.register(Box::new(move || handle.disconnect()));

        Ok(connection)
    }

    /// Adds one reference without any release hook. Pairs with
    /// [`disconnect`](ServiceHandle::disconnect).
    pub(crate) fn retain(&self) {
        let count = self.inner.ref_count.get() + 1;
        self.inner.ref_count.set(count);
        tracing::trace!(service = self.inner.name, ref_count = count, "connected");
        if let Some(ref observer) = self.inner.observer {
            observer.connected(self.inner.name, count);
        }
    }

    /// Removes one reference; the last one disposes the handle.
    pub(crate) fn disconnect(&self) {
        if self.is_disposed() {
            return;
        }
        let count = self.inner.ref_count.get().saturating_sub(1);
        self.inner.ref_count.set(count);
        tracing::trace!(service = self.inner.name, ref_count = count, "disconnected");
        if let Some(ref observer) = self.inner.observer {
            observer.disconnected(self.inner.name, count);
        }
        if count == 0 {
            self.dispose();
        }
    }

    fn connection(&self, teardown: &Teardown) -> DiResult<Connection<I, O>> {
        let writer = self.writer(teardown);
        match (writer, self.inner.output.clone()) {
            (Some(writer), Some(output)) => Ok(Connection::ReadWrite(writer, output)),
            (Some(writer), None) => Ok(Connection::Write(writer)),
            (None, Some(output)) => Ok(Connection::Read(output)),
            (None, None) => Err(DiError::TypeMismatch(self.inner.name)),
        }
    }

    pub(crate) fn writer(&self, teardown: &Teardown) -> Option<Writer<I>> {
        let input = self.inner.input.as_ref()?;
        let write = self.inner.write.clone()?;
        Some(Writer::new(self.inner.name, input.sink(), write, teardown.clone()))
    }

    /// Registers a callback for the handle's disposal.
    ///
    /// On an already disposed handle the callback is dropped and a warning
    /// is logged; it is never invoked.
    pub fn on_dispose(&self, listener: impl FnOnce() + 'static) {
        let _ = push_listener(
            &self.inner.listeners,
            self.inner.name,
            self.inner.observer.as_deref(),
            Box::new(listener),
        );
    }

    /// Current number of live connections.
    pub fn ref_count(&self) -> usize {
        self.inner.ref_count.get()
    }

    /// The service's shared output, if it has one.
    pub fn output(&self) -> Option<O> {
        self.inner.output.clone()
    }

    /// Read side of the service's input buffer, if it has one.
    pub fn input(&self) -> Option<Source<I>> {
        self.inner.input.as_ref().map(|b| b.source())
    }

    /// Diagnostic name of the provider.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Kind of the provider.
    pub fn kind(&self) -> ProviderKind {
        self.inner.kind
    }

    /// Identity of the provider this handle was built from.
    pub fn provider_id(&self) -> ProviderId {
        self.inner.provider_id
    }

    /// Whether two handles are the same instance.
    pub fn same_as(&self, other: &ServiceHandle<I, O>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn serial(&self) -> u64 {
        self.inner.serial
    }

    /// Providers this handle depends on, directly or through its own
    /// dependencies.
    pub(crate) fn dependency_ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.inner.dependencies.iter().map(|dep| dep.id)
    }

    /// Whether `host` sees a different override for one of the dependencies
    /// than the scope this handle was built in did.
    pub(crate) fn is_shadowed_in(&self, host: &dyn Host) -> bool {
        self.inner.dependencies.iter().any(|dep| !dep.still_visible(host))
    }
}

impl<I: Clone + 'static, O: Clone + 'static> Dispose for ServiceHandle<I, O> {
    fn dispose(&self) {
        let listeners = self.inner.listeners.borrow_mut().drain();
        let Some(listeners) = listeners else {
            return;
        };
        if let Some(ref input) = self.inner.input {
            input.complete();
        }
        run_all(listeners);
        tracing::debug!(service = self.inner.name, "disposed");
        if let Some(ref observer) = self.inner.observer {
            observer.disposed(self.inner.name);
        }
    }

    fn is_disposed(&self) -> bool {
        self.inner.listeners.borrow().is_disposed()
    }
}

impl<I, O> fmt::Debug for ServiceHandle<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.inner.name)
            .field("provider", &self.inner.provider_id)
            .field("kind", &self.inner.kind)
            .field("ref_count", &self.inner.ref_count.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Type-erased view the runtime keeps for bulk disposal and snapshots.
pub(crate) trait AnyHandle: Dispose {
    fn name(&self) -> &'static str;
    fn kind(&self) -> ProviderKind;
    fn ref_count(&self) -> usize;
    fn provider_id(&self) -> ProviderId;
}

impl<I: Clone + 'static, O: Clone + 'static> AnyHandle for ServiceHandle<I, O> {
    fn name(&self) -> &'static str {
        self.inner.name
    }

    fn kind(&self) -> ProviderKind {
        self.inner.kind
    }

    fn ref_count(&self) -> usize {
        self.inner.ref_count.get()
    }

    fn provider_id(&self) -> ProviderId {
        self.inner.provider_id
    }
}
