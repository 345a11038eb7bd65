//! Providers: the user functions that define services.
//!
//! A provider is identified by the [`ProviderId`] allocated when it is
//! constructed, never by the closure it wraps. Every clone of a provider is
//! the same service; two providers built from the same closure are not.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::adapter::{Adapter, Direct};
use crate::error::{DiError, DiResult};
use crate::key::ProviderId;
use crate::kind::ProviderKind;
use crate::stream::Source;

pub mod context;
pub mod scope;

pub use context::ServiceContext;
pub use scope::Scope;

type Factory<I, O, A> =
    Box<dyn Fn(&ServiceContext<'_, A>, Option<Source<I>>) -> DiResult<Option<O>>>;

struct ProviderInner<I, O, A: Adapter> {
    id: ProviderId,
    name: &'static str,
    kind: ProviderKind,
    factory: Factory<I, O, A>,
    _adapter: PhantomData<fn() -> A>,
}

/// A service definition.
///
/// `I` is the type of values written into the service, `O` the type of its
/// shared output and `A` the adapter of the runtime it is served by. The
/// [`ProviderKind`] is fixed by the constructor:
///
/// | constructor | kind | factory receives | output |
/// |---|---|---|---|
/// | `read_only` | `ReadOnly` | nothing | factory result |
/// | `write_only` | `WriteOnly` | input | none |
/// | `read_write` | `ReadWrite` | input | factory result |
/// | `passthrough` | `Passthrough` | (no factory) | the input itself |
///
/// Constructors without the `adapted_` prefix are for the core [`Direct`]
/// adapter; the `adapted_*` forms work with any adapter.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, ProviderKind, Provider, RuntimeConfig, Scope, Source};
///
/// let scope = Scope::root();
/// let _dispose = bootstrap(&scope.host(), RuntimeConfig::default());
///
/// let settings = Provider::read_only("settings", |_| Ok(Source::of(vec![("lang", "en")])));
/// let upper = Provider::read_write("upper", move |ctx, input: Source<String>| {
///     let _settings = ctx.connect(&settings)?;
///     Ok(input.map(|s| s.to_uppercase()))
/// });
///
/// assert_eq!(upper.kind(), ProviderKind::ReadWrite);
/// assert_eq!(upper.clone().id(), upper.id());
/// scope.connect(&upper).unwrap();
/// ```
pub struct Provider<I, O, A: Adapter = Direct> {
    inner: Rc<ProviderInner<I, O, A>>,
}

impl<I, O, A: Adapter> Clone for Provider<I, O, A> {
    fn clone(&self) -> Self {
        Provider {
            inner: self.inner.clone(),
        }
    }
}

impl<I, O, A: Adapter> Provider<I, O, A> {
    fn from_factory(name: &'static str, kind: ProviderKind, factory: Factory<I, O, A>) -> Self {
        Provider {
            inner: Rc::new(ProviderInner {
                id: ProviderId::next(),
                name,
                kind,
                factory,
                _adapter: PhantomData,
            }),
        }
    }

    pub fn id(&self) -> ProviderId {
        self.inner.id
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.inner.kind
    }

    /// Runs the factory. `input` is the read side of the input buffer for
    /// every kind that takes input.
    pub(crate) fn build(
        &self,
        ctx: &ServiceContext<'_, A>,
        input: Option<Source<I>>,
    ) -> DiResult<Option<O>> {
        (self.inner.factory)(ctx, input)
    }
}

fn missing_input(name: &'static str) -> DiError {
    DiError::provider(name, "constructed without an input buffer")
}

impl<O: Clone + 'static, A: Adapter> Provider<(), O, A> {
    /// Read-only provider for any adapter.
    pub fn adapted_read_only<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&ServiceContext<'_, A>) -> DiResult<O> + 'static,
    {
        Self::from_factory(
            name,
            ProviderKind::ReadOnly,
            Box::new(move |ctx, _| factory(ctx).map(Some)),
        )
    }
}

impl<I: Clone + 'static, A: Adapter> Provider<I, (), A> {
    /// Write-only provider for any adapter.
    pub fn adapted_write_only<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&ServiceContext<'_, A>, A::Read<I>) -> DiResult<()> + 'static,
    {
        Self::from_factory(
            name,
            ProviderKind::WriteOnly,
            Box::new(move |ctx, input| {
                let input = input.ok_or_else(|| missing_input(name))?;
                factory(ctx, ctx.adapter().read(input))?;
                Ok(None)
            }),
        )
    }
}

impl<I: Clone + 'static, O: Clone + 'static, A: Adapter> Provider<I, O, A> {
    /// Read-write provider for any adapter.
    pub fn adapted_read_write<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&ServiceContext<'_, A>, A::Read<I>) -> DiResult<O> + 'static,
    {
        Self::from_factory(
            name,
            ProviderKind::ReadWrite,
            Box::new(move |ctx, input| {
                let input = input.ok_or_else(|| missing_input(name))?;
                factory(ctx, ctx.adapter().read(input)).map(Some)
            }),
        )
    }
}

impl<I: Clone + 'static, A: Adapter> Provider<I, Source<I>, A> {
    /// Passthrough provider for any adapter.
    pub fn adapted_passthrough(name: &'static str) -> Self {
        Self::from_factory(
            name,
            ProviderKind::Passthrough,
            Box::new(move |_, input| input.map(Some).ok_or_else(|| missing_input(name))),
        )
    }
}

impl<O: Clone + 'static> Provider<(), O, Direct> {
    /// A service with no input; the factory's result is its permanent
    /// output.
    pub fn read_only<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&ServiceContext<'_, Direct>) -> DiResult<O> + 'static,
    {
        Self::adapted_read_only(name, factory)
    }
}

impl<I: Clone + 'static> Provider<I, (), Direct> {
    /// A service that consumes its input and exposes nothing.
    pub fn write_only<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&ServiceContext<'_, Direct>, Source<I>) -> DiResult<()> + 'static,
    {
        Self::adapted_write_only(name, factory)
    }
}

impl<I: Clone + 'static, O: Clone + 'static> Provider<I, O, Direct> {
    /// A service that consumes its input and exposes an output.
    pub fn read_write<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&ServiceContext<'_, Direct>, Source<I>) -> DiResult<O> + 'static,
    {
        Self::adapted_read_write(name, factory)
    }
}

impl<I: Clone + 'static> Provider<I, Source<I>, Direct> {
    /// A service whose output is its own input buffer.
    pub fn passthrough(name: &'static str) -> Self {
        Self::adapted_passthrough(name)
    }
}

impl<I, O, A: Adapter> fmt::Debug for Provider<I, O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("kind", &self.inner.kind)
            .finish()
    }
}
