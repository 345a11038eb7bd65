//! Disposal trait for live services.

/// Trait for synchronous, idempotent teardown.
///
/// Implemented by [`ServiceHandle`](crate::ServiceHandle). The first
/// `dispose` call does the work; every later call is a no-op.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, resolve, Dispose, HandleRef, Provider, RuntimeConfig, Scope};
///
/// let scope = Scope::root();
/// let _dispose_all = bootstrap(&scope.host(), RuntimeConfig::default());
///
/// let cache = Provider::read_only("cache", |_| Ok(vec![1u8, 2, 3]));
/// let handle = match resolve(&scope.host(), &cache).unwrap() {
///     HandleRef::Real(handle) => handle,
///     HandleRef::Proxy(_) => unreachable!(),
/// };
///
/// handle.dispose();
/// handle.dispose(); // no-op
/// assert!(handle.is_disposed());
/// ```
pub trait Dispose {
    /// Tears the resource down once.
    fn dispose(&self);

    /// Whether `dispose` has already run.
    fn is_disposed(&self) -> bool;
}
