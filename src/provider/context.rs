//! Context handed to factories while their service is being built.

use std::cell::RefCell;
use std::rc::Rc;

use super::Provider;
use crate::adapter::Adapter;
use crate::cyclotron::{HandleRef, Teardown};
use crate::error::DiResult;
use crate::key::ProviderId;
use crate::runtime::Runtime;
use crate::traits::Host;

/// What a factory can do while its service is under construction.
///
/// Connections made through the context are owned by the service being
/// built: they are released when that service's handle disposes, not when
/// the scope that triggered the construction is destroyed.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, Provider, RuntimeConfig, Scope, Source};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let scope = Scope::root();
/// let _dispose = bootstrap(&scope.host(), RuntimeConfig::default());
///
/// let closed = Rc::new(Cell::new(false));
/// let flag = closed.clone();
/// let socket = Provider::read_only("socket", move |ctx| {
///     let flag = flag.clone();
///     ctx.on_dispose(move || flag.set(true));
///     Ok(Source::<u8>::never())
/// });
///
/// let view = scope.child();
/// view.connect(&socket).unwrap();
/// view.destroy();
/// assert!(closed.get());
/// ```
pub struct ServiceContext<'a, A: Adapter> {
    runtime: &'a Runtime<A>,
    host: &'a Rc<dyn Host>,
    teardown: Teardown,
    id: ProviderId,
    name: &'static str,
    dependencies: RefCell<Vec<ProviderId>>,
}

impl<'a, A: Adapter> ServiceContext<'a, A> {
    pub(crate) fn new(
        runtime: &'a Runtime<A>,
        host: &'a Rc<dyn Host>,
        teardown: Teardown,
        id: ProviderId,
        name: &'static str,
    ) -> Self {
        Self {
            runtime,
            host,
            teardown,
            id,
            name,
            dependencies: RefCell::new(Vec::new()),
        }
    }

    /// Connects to another service (or, for a daemon, to itself).
    pub fn connect<I, O>(&self, provider: &Provider<I, O, A>) -> DiResult<A::Connection<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let connection = self.runtime.connect_with(self.host, provider, &self.teardown)?;
        self.record(provider);
        Ok(connection)
    }

    /// Resolves a provider without connecting to it.
    pub fn resolve<I, O>(&self, provider: &Provider<I, O, A>) -> DiResult<HandleRef<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let handle = self.runtime.resolve_with(self.host, provider, &self.teardown)?;
        self.record(provider);
        Ok(handle)
    }

    /// Registers cleanup for when the service under construction disposes.
    pub fn on_dispose(&self, listener: impl FnOnce() + 'static) {
        self.teardown.register(Box::new(listener));
    }

    pub fn adapter(&self) -> &A {
        self.runtime.adapter()
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        self.host
    }

    /// Name of the service under construction.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Notes `provider` and everything its handle depends on.
    fn record<I, O>(&self, provider: &Provider<I, O, A>)
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let mut dependencies = self.dependencies.borrow_mut();
        dependencies.push(provider.id());
        if let Ok(Some(handle)) = self.runtime.lookup(self.host, provider) {
            dependencies.extend(handle.dependency_ids());
        }
    }

    /// Every provider recorded so far, once each, excluding the service
    /// itself.
    pub(crate) fn dependencies(&self) -> Vec<ProviderId> {
        let mut ids = self.dependencies.borrow().clone();
        ids.sort();
        ids.dedup();
        ids.retain(|id| *id != self.id);
        ids
    }
}
