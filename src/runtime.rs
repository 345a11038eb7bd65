//! The runtime installed by `bootstrap` and the resolution entry points.
//!
//! A runtime lives in host context under [`ContextKey::Runtime`], so every
//! descendant of the bootstrapping scope finds it through the ordinary
//! scope-chain read. Materialized handles are cached in host context too,
//! one entry per provider identity in the scope that created them.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::adapter::{Adapter, Direct, Input};
use crate::config::RuntimeOptions;
use crate::cyclotron::{
    AnyHandle, Connection, CycleProxy, Dependency, HandleParts, HandleRef, ServiceHandle, Teardown,
    WriteFn, Writer,
};
use crate::debug::{HandleInfo, RuntimeSnapshot};
use crate::error::{DiError, DiResult};
use crate::internal::{run_all, AnyRc, DisposeBag, ResolutionGuard, Resolving};
use crate::key::{ContextKey, ProviderId};
use crate::observer::{LifecycleObserver, Observers};
use crate::provider::{Provider, ServiceContext};
use crate::stream::{HotBuffer, Sink};
use crate::traits::{Dispose, Host};

type Registry = RefCell<BTreeMap<u64, Rc<dyn AnyHandle>>>;

/// Everything `bootstrap` needs.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, MetricsObserver, RuntimeConfig, RuntimeOptions, Scope};
/// use std::rc::Rc;
///
/// let metrics = Rc::new(MetricsObserver::new());
/// let config = RuntimeConfig::default()
///     .with_observer(metrics.clone())
///     .with_options(RuntimeOptions::named("editor"));
///
/// let scope = Scope::root();
/// let dispose_all = bootstrap(&scope.host(), config);
/// assert_eq!(dispose_all.snapshot().name, "editor");
/// ```
pub struct RuntimeConfig<A: Adapter = Direct> {
    adapter: A,
    observers: Observers,
    options: RuntimeOptions,
}

impl<A: Adapter> RuntimeConfig<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            observers: Observers::default(),
            options: RuntimeOptions::default(),
        }
    }

    /// Adds a lifecycle observer. Observers are called in the order added.
    pub fn with_observer(mut self, observer: Rc<dyn LifecycleObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for RuntimeConfig<Direct> {
    fn default() -> Self {
        Self::new(Direct)
    }
}

/// Input buffer of a provider under construction, for proxies that need
/// to write into it before the handle exists.
struct PendingInput<I> {
    sink: Sink<I>,
    write: WriteFn<I>,
}

/// Releases whatever a factory registered if construction does not finish.
struct PendingBag<I: Clone + 'static> {
    listeners: Rc<RefCell<DisposeBag>>,
    input: Option<HotBuffer<I>>,
    armed: bool,
}

impl<I: Clone + 'static> PendingBag<I> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<I: Clone + 'static> Drop for PendingBag<I> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let drained = self.listeners.borrow_mut().drain();
        if let Some(ref input) = self.input {
            input.complete();
        }
        if let Some(listeners) = drained {
            run_all(listeners);
        }
    }
}

/// One connection runtime.
///
/// Owns the adapter, the observers and the registry of every handle created
/// under it, and tracks which providers are under construction.
pub struct Runtime<A: Adapter = Direct> {
    adapter: Rc<A>,
    options: RuntimeOptions,
    observer: Option<Rc<dyn LifecycleObserver>>,
    registry: Rc<Registry>,
    resolving: Resolving,
    next_serial: Cell<u64>,
}

impl<A: Adapter> Runtime<A> {
    fn new(config: RuntimeConfig<A>) -> Self {
        let observer: Option<Rc<dyn LifecycleObserver>> = if config.observers.has_observers() {
            Some(Rc::new(config.observers))
        } else {
            None
        };
        Self {
            adapter: Rc::new(config.adapter),
            options: config.options,
            observer,
            registry: Rc::new(RefCell::new(BTreeMap::new())),
            resolving: Resolving::default(),
            next_serial: Cell::new(1),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Connects `provider`, registering the release with `teardown`.
    pub(crate) fn connect_with<I, O>(
        &self,
        host: &Rc<dyn Host>,
        provider: &Provider<I, O, A>,
        teardown: &Teardown,
    ) -> DiResult<A::Connection<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let connection = self.connect_core(host, provider, teardown)?;
        Ok(self.adapter.wrap_connection(connection))
    }

    /// Like `connect_with`, without the adapter's final shaping.
    pub(crate) fn connect_core<I, O>(
        &self,
        host: &Rc<dyn Host>,
        provider: &Provider<I, O, A>,
        teardown: &Teardown,
    ) -> DiResult<Connection<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        match self.resolve_with(host, provider, teardown)? {
            HandleRef::Real(handle) => handle.connect(teardown),
            HandleRef::Proxy(proxy) => {
                let connection = proxy.connect()?;
                let release = proxy.clone();
                teardown.register(Box::new(move || release.release()));
                Ok(connection)
            }
        }
    }

    /// Finds or creates the handle of `provider` as seen from `host`.
    pub(crate) fn resolve_with<I, O>(
        &self,
        host: &Rc<dyn Host>,
        provider: &Provider<I, O, A>,
        teardown: &Teardown,
    ) -> DiResult<HandleRef<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let provider = effective_provider(host, provider)?;
        if self.resolving.contains(provider.id()) {
            return self.proxy(&provider, teardown).map(HandleRef::Proxy);
        }
        if let Some(handle) = cached(host, &provider)? {
            return Ok(HandleRef::Real(handle));
        }
        self.create(host, &provider).map(HandleRef::Real)
    }

    /// Materialized handle of `provider`, without creating one.
    pub(crate) fn lookup<I, O>(
        &self,
        host: &Rc<dyn Host>,
        provider: &Provider<I, O, A>,
    ) -> DiResult<Option<ServiceHandle<I, O>>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let provider = effective_provider(host, provider)?;
        cached(host, &provider)
    }

    fn proxy<I, O>(
        &self,
        provider: &Provider<I, O, A>,
        teardown: &Teardown,
    ) -> DiResult<CycleProxy<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let id = provider.id();
        if let Some(existing) = self.resolving.proxy(id) {
            return existing
                .downcast_ref::<CycleProxy<I, O>>()
                .cloned()
                .ok_or(DiError::TypeMismatch(provider.name()));
        }

        let writer = self
            .resolving
            .pending_input(id)
            .and_then(|any| any.downcast::<PendingInput<I>>().ok())
            .map(|pending| {
                Writer::new(
                    provider.name(),
                    pending.sink.clone(),
                    pending.write.clone(),
                    teardown.clone(),
                )
            });

        tracing::debug!(
            service = provider.name(),
            provider = %id,
            "cyclic resolution, handing out proxy"
        );
        let proxy = CycleProxy::new(provider.name(), writer);
        let binding = proxy.clone();
        self.resolving.set_proxy(
            id,
            Rc::new(proxy.clone()),
            Box::new(move |handle| {
                let handle =
                    handle.and_then(|h| h.downcast_ref::<ServiceHandle<I, O>>().cloned());
                binding.bind(handle);
            }),
        );
        Ok(proxy)
    }

    fn create<I, O>(
        &self,
        host: &Rc<dyn Host>,
        provider: &Provider<I, O, A>,
    ) -> DiResult<ServiceHandle<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
    {
        let (id, name, kind) = (provider.id(), provider.name(), provider.kind());
        if let Some(ref observer) = self.observer {
            observer.resolving(name, id);
        }
        let started = Instant::now();

        let input = kind.has_input().then(HotBuffer::<I>::new);
        let write = input.as_ref().map(|_| {
            let adapter = self.adapter.clone();
            let write = move |sink: &Sink<I>, value: Input<I>| adapter.write(sink, value);
            Rc::new(write) as WriteFn<I>
        });
        let pending: Option<AnyRc> = match (&input, &write) {
            (Some(buffer), Some(write)) => Some(Rc::new(PendingInput {
                sink: buffer.sink(),
                write: write.clone(),
            }) as AnyRc),
            _ => None,
        };

        let guard = ResolutionGuard::enter(&self.resolving, id, pending, self.options.max_depth)?;
        let listeners = Rc::new(RefCell::new(DisposeBag::default()));
        let mut pending_bag = PendingBag {
            listeners: listeners.clone(),
            input: input.clone(),
            armed: true,
        };

        let teardown = Teardown::bag(listeners.clone(), name, self.observer.clone());
        let ctx = ServiceContext::new(self, host, teardown, id, name);
        let output = match provider.build(&ctx, input.as_ref().map(|b| b.source())) {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(service = name, error = %err, "factory failed");
                if let Some(ref observer) = self.observer {
                    observer.factory_failed(name, &err.to_string());
                }
                return Err(err);
            }
        };

        let dependencies = ctx
            .dependencies()
            .into_iter()
            .map(|dep| Dependency::observe(host.as_ref(), dep))
            .collect();
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);
        let handle = ServiceHandle::new(HandleParts {
            provider_id: id,
            serial,
            name,
            kind,
            input,
            output,
            write,
            listeners,
            observer: self.observer.clone(),
            dependencies,
        });
        pending_bag.disarm();

        let entry = Rc::new(handle.clone()) as Rc<dyn Any>;
        host.set_context(ContextKey::Service(id), Some(entry));
        self.registry
            .borrow_mut()
            .insert(serial, Rc::new(handle.clone()) as Rc<dyn AnyHandle>);
        handle.on_dispose(evict::<I, O>(host, id, serial, Rc::downgrade(&self.registry)));

        tracing::debug!(service = name, provider = %id, kind = ?kind, "created");
        if let Some(ref observer) = self.observer {
            observer.created(name, started.elapsed());
        }

        let erased: AnyRc = Rc::new(handle.clone());
        guard.complete(&erased);
        Ok(handle)
    }

    /// Disposes every live handle created under this runtime, oldest first.
    pub fn dispose_all(&self) {
        let handles: Vec<Rc<dyn AnyHandle>> =
            self.registry.borrow().values().cloned().collect();
        tracing::debug!(runtime = %self.options.name, handles = handles.len(), "disposing all");
        for handle in handles {
            handle.dispose();
        }
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        let handles = self
            .registry
            .borrow()
            .values()
            .map(|h| HandleInfo {
                name: h.name(),
                provider_id: h.provider_id(),
                kind: h.kind(),
                ref_count: h.ref_count(),
                disposed: h.is_disposed(),
            })
            .collect();
        RuntimeSnapshot {
            name: self.options.name.clone(),
            handles,
        }
    }
}

impl<A: Adapter> fmt::Debug for Runtime<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("name", &self.options.name)
            .field("handles", &self.registry.borrow().len())
            .field("resolving_depth", &self.resolving.depth())
            .finish()
    }
}

/// Disposal listener that drops a handle from its scope cache and from the
/// runtime registry. A newer handle cached under the same key is left alone.
fn evict<I, O>(
    host: &Rc<dyn Host>,
    id: ProviderId,
    serial: u64,
    registry: Weak<Registry>,
) -> impl FnOnce() + 'static
where
    I: Clone + 'static,
    O: Clone + 'static,
{
    let host = Rc::downgrade(host);
    move || {
        if let Some(registry) = registry.upgrade() {
            registry.borrow_mut().remove(&serial);
        }
        let Some(host) = host.upgrade() else {
            return;
        };
        let key = ContextKey::Service(id);
        let current = host
            .get_context(&key)
            .and_then(|entry| entry.downcast_ref::<ServiceHandle<I, O>>().map(|h| h.serial()));
        if current == Some(serial) {
            host.set_context(key, None);
        }
    }
}

/// The live handle of `provider` visible from `host`.
///
/// A handle built where a dependency resolved differently than it does from
/// `host` counts as absent, so an override declared closer to `host` than
/// the cached handle reaches its dependents too.
fn cached<I, O, A>(
    host: &Rc<dyn Host>,
    provider: &Provider<I, O, A>,
) -> DiResult<Option<ServiceHandle<I, O>>>
where
    I: Clone + 'static,
    O: Clone + 'static,
    A: Adapter,
{
    let Some(entry) = host.get_context(&ContextKey::Service(provider.id())) else {
        return Ok(None);
    };
    let handle = entry
        .downcast_ref::<ServiceHandle<I, O>>()
        .ok_or(DiError::TypeMismatch(provider.name()))?;
    if handle.is_disposed() {
        return Ok(None);
    }
    if handle.is_shadowed_in(host.as_ref()) {
        tracing::trace!(service = provider.name(), "dependency overridden, not reusing handle");
        return Ok(None);
    }
    Ok(Some(handle.clone()))
}

fn effective_provider<I, O, A>(
    host: &Rc<dyn Host>,
    provider: &Provider<I, O, A>,
) -> DiResult<Provider<I, O, A>>
where
    I: 'static,
    O: 'static,
    A: Adapter,
{
    match host.get_context(&ContextKey::Override(provider.id())) {
        Some(entry) => entry
            .downcast_ref::<Provider<I, O, A>>()
            .cloned()
            .ok_or(DiError::TypeMismatch(provider.name())),
        None => Ok(provider.clone()),
    }
}

/// Type-erased runtime behind [`DisposeAll`].
trait RuntimeControl {
    fn dispose_all(&self);
    fn snapshot(&self) -> RuntimeSnapshot;
}

impl<A: Adapter> RuntimeControl for Runtime<A> {
    fn dispose_all(&self) {
        Runtime::dispose_all(self)
    }

    fn snapshot(&self) -> RuntimeSnapshot {
        Runtime::snapshot(self)
    }
}

/// Returned by [`bootstrap`]: disposes every handle of the runtime.
#[derive(Clone)]
pub struct DisposeAll {
    runtime: Rc<dyn RuntimeControl>,
}

impl DisposeAll {
    /// Disposes every live handle, each exactly once. Calling it again only
    /// affects handles created since.
    pub fn dispose(&self) {
        self.runtime.dispose_all();
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.runtime.snapshot()
    }
}

impl fmt::Debug for DisposeAll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeAll").finish_non_exhaustive()
    }
}

/// Installs a runtime in the host's current scope.
///
/// Every descendant scope resolves through it. Bootstrapping again in a
/// descendant installs an independent runtime for that subtree.
pub fn bootstrap<A: Adapter>(host: &Rc<dyn Host>, config: RuntimeConfig<A>) -> DisposeAll {
    let runtime = Rc::new(Runtime::new(config));
    tracing::debug!(runtime = %runtime.options.name, "bootstrapped");
    host.set_context(ContextKey::Runtime, Some(runtime.clone() as Rc<dyn Any>));
    DisposeAll { runtime }
}

/// The runtime serving `host`.
pub fn runtime_of<A: Adapter>(host: &Rc<dyn Host>) -> DiResult<Rc<Runtime<A>>> {
    host.get_context(&ContextKey::Runtime)
        .ok_or(DiError::NotBootstrapped)?
        .downcast::<Runtime<A>>()
        .map_err(|_| DiError::TypeMismatch("runtime"))
}

/// Connects the host's scope to `provider`.
///
/// The connection is released when the host's current scope is destroyed.
pub fn connect<I, O, A>(
    host: &Rc<dyn Host>,
    provider: &Provider<I, O, A>,
) -> DiResult<A::Connection<I, O>>
where
    I: Clone + 'static,
    O: Clone + 'static,
    A: Adapter,
{
    runtime_of::<A>(host)?.connect_with(host, provider, &Teardown::host(host))
}

/// Finds or creates the handle of `provider` without connecting to it.
pub fn resolve<I, O, A>(
    host: &Rc<dyn Host>,
    provider: &Provider<I, O, A>,
) -> DiResult<HandleRef<I, O>>
where
    I: Clone + 'static,
    O: Clone + 'static,
    A: Adapter,
{
    runtime_of::<A>(host)?.resolve_with(host, provider, &Teardown::host(host))
}

/// The already materialized handle of `provider`, if any.
pub fn lookup<I, O, A>(
    host: &Rc<dyn Host>,
    provider: &Provider<I, O, A>,
) -> DiResult<Option<ServiceHandle<I, O>>>
where
    I: Clone + 'static,
    O: Clone + 'static,
    A: Adapter,
{
    runtime_of::<A>(host)?.lookup(host, provider)
}

/// Makes the host's scope and its descendants resolve `original` through
/// `replacement`.
pub fn provide_override<I, O, A>(
    host: &Rc<dyn Host>,
    original: &Provider<I, O, A>,
    replacement: Provider<I, O, A>,
) where
    I: 'static,
    O: 'static,
    A: Adapter,
{
    tracing::debug!(
        service = original.name(),
        replacement = replacement.name(),
        "override declared"
    );
    let entry = Rc::new(replacement) as Rc<dyn Any>;
    host.set_context(ContextKey::Override(original.id()), Some(entry));
}
