//! The host capabilities the runtime consumes.

use std::any::Any;
use std::rc::Rc;

use crate::key::ContextKey;

/// A node of the embedding framework's component tree.
///
/// The runtime needs exactly three things from its host: scope-chain reads,
/// current-scope writes, and a teardown hook for the current scope.
/// [`Scope`](crate::Scope) is the crate's own implementation; an embedding
/// framework implements this trait over its own component contexts.
pub trait Host {
    /// Reads `key` from the current scope or the nearest ancestor holding it.
    fn get_context(&self, key: &ContextKey) -> Option<Rc<dyn Any>>;

    /// Writes `key` in the current scope; `None` clears the local entry.
    fn set_context(&self, key: ContextKey, value: Option<Rc<dyn Any>>);

    /// Registers a callback fired exactly once when the current scope ends.
    fn on_destroy(&self, callback: Box<dyn FnOnce()>);
}
