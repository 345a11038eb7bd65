//! The crate's own host: an explicit tree of scopes.
//!
//! Embedding frameworks usually implement [`Host`] over their component
//! contexts. `Scope` is the stand-alone implementation, useful for tests,
//! command-line tools and anything without a UI framework.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::adapter::Adapter;
use crate::cyclotron::{HandleRef, ServiceHandle};
use crate::error::DiResult;
use crate::internal::collections::Map;
use crate::key::ContextKey;
use crate::provider::Provider;
use crate::runtime::{self, DisposeAll, RuntimeConfig};
use crate::traits::Host;

type Callback = Box<dyn FnOnce()>;

struct ScopeInner {
    parent: Option<Rc<ScopeInner>>,
    context: RefCell<Map<ContextKey, Rc<dyn Any>>>,
    // `None` once destroyed.
    on_destroy: RefCell<Option<Vec<Callback>>>,
    children: RefCell<Vec<Weak<ScopeInner>>>,
}

impl ScopeInner {
    fn new(parent: Option<Rc<ScopeInner>>) -> Self {
        Self {
            parent,
            context: RefCell::new(Map::default()),
            on_destroy: RefCell::new(Some(Vec::new())),
            children: RefCell::new(Vec::new()),
        }
    }

    fn destroy(&self) {
        let Some(callbacks) = self.on_destroy.borrow_mut().take() else {
            return;
        };
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.destroy();
        }
        for callback in callbacks {
            callback();
        }
        let context = std::mem::take(&mut *self.context.borrow_mut());
        drop(context);
    }

    fn is_destroyed(&self) -> bool {
        self.on_destroy.borrow().is_none()
    }
}

impl Host for ScopeInner {
    fn get_context(&self, key: &ContextKey) -> Option<Rc<dyn Any>> {
        if let Some(value) = self.context.borrow().get(key) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get_context(key))
    }

    fn set_context(&self, key: ContextKey, value: Option<Rc<dyn Any>>) {
        let previous = match value {
            Some(value) => self.context.borrow_mut().insert(key, value),
            None => self.context.borrow_mut().remove(&key),
        };
        drop(previous);
    }

    fn on_destroy(&self, callback: Box<dyn FnOnce()>) {
        let rejected = match self.on_destroy.borrow_mut().as_mut() {
            Some(callbacks) => {
                callbacks.push(callback);
                None
            }
            None => Some(callback),
        };
        // A destroyed scope ends immediately for late registrations.
        if let Some(callback) = rejected {
            callback();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// A node of the scope tree.
///
/// Cloning a `Scope` yields another reference to the same node. A scope is
/// destroyed by [`destroy`](Scope::destroy) or when its last reference
/// (including those held by its children) is dropped. Destroying a scope
/// destroys its live children first, then fires its own teardown callbacks
/// in registration order, then clears its context.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{Provider, RuntimeConfig, Scope, Source};
///
/// let root = Scope::root();
/// let _dispose_all = root.bootstrap(RuntimeConfig::default());
///
/// let feed = Provider::<String, Source<String>>::passthrough("feed");
/// let page = root.child();
/// let widget = page.child();
/// widget.connect(&feed).unwrap();
///
/// let handle = page.lookup(&feed).unwrap();
/// assert!(handle.is_none(), "cached in the widget scope, not the page");
///
/// page.destroy();
/// assert!(widget.is_destroyed());
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// A new tree root.
    pub fn root() -> Self {
        Scope {
            inner: Rc::new(ScopeInner::new(None)),
        }
    }

    /// A new child of this scope.
    pub fn child(&self) -> Self {
        let child = Rc::new(ScopeInner::new(Some(self.inner.clone())));
        if self.inner.is_destroyed() {
            child.destroy();
        } else {
            let mut children = self.inner.children.borrow_mut();
            children.retain(|c| c.strong_count() > 0);
            children.push(Rc::downgrade(&child));
        }
        Scope { inner: child }
    }

    pub fn parent(&self) -> Option<Scope> {
        self.inner.parent.clone().map(|inner| Scope { inner })
    }

    /// This scope as a host for the free functions.
    pub fn host(&self) -> Rc<dyn Host> {
        self.inner.clone()
    }

    /// Destroys the scope; later calls do nothing.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    pub fn bootstrap<A: Adapter>(&self, config: RuntimeConfig<A>) -> DisposeAll {
        runtime::bootstrap(&self.host(), config)
    }

    pub fn connect<I, O, A>(&self, provider: &Provider<I, O, A>) -> DiResult<A::Connection<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
        A: Adapter,
    {
        runtime::connect(&self.host(), provider)
    }

    pub fn resolve<I, O, A>(&self, provider: &Provider<I, O, A>) -> DiResult<HandleRef<I, O>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
        A: Adapter,
    {
        runtime::resolve(&self.host(), provider)
    }

    pub fn lookup<I, O, A>(
        &self,
        provider: &Provider<I, O, A>,
    ) -> DiResult<Option<ServiceHandle<I, O>>>
    where
        I: Clone + 'static,
        O: Clone + 'static,
        A: Adapter,
    {
        runtime::lookup(&self.host(), provider)
    }

    pub fn provide_override<I, O, A>(
        &self,
        original: &Provider<I, O, A>,
        replacement: Provider<I, O, A>,
    ) where
        I: 'static,
        O: 'static,
        A: Adapter,
    {
        runtime::provide_override(&self.host(), original, replacement)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Host for Scope {
    fn get_context(&self, key: &ContextKey) -> Option<Rc<dyn Any>> {
        self.inner.get_context(key)
    }

    fn set_context(&self, key: ContextKey, value: Option<Rc<dyn Any>>) {
        self.inner.set_context(key, value)
    }

    fn on_destroy(&self, callback: Box<dyn FnOnce()>) {
        self.inner.on_destroy(callback)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("root", &self.inner.parent.is_none())
            .field("entries", &self.inner.context.borrow().len())
            .field("destroyed", &self.inner.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn record(order: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Box<dyn FnOnce()> {
        let order = order.clone();
        Box::new(move || order.borrow_mut().push(label))
    }

    #[test]
    fn children_are_destroyed_before_parent_callbacks() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let root = Scope::root();
        let child = root.child();
        root.on_destroy(record(&order, "root-1"));
        child.on_destroy(record(&order, "child"));
        root.on_destroy(record(&order, "root-2"));

        root.destroy();
        root.destroy();

        assert_eq!(*order.borrow(), vec!["child", "root-1", "root-2"]);
    }

    #[test]
    fn context_reads_walk_to_ancestors_and_writes_stay_local() {
        let root = Scope::root();
        let child = root.child();
        root.set_context(ContextKey::Named("a"), Some(Rc::new(1u8)));
        child.set_context(ContextKey::Named("a"), Some(Rc::new(2u8)));

        let local = child.get_context(&ContextKey::Named("a")).unwrap();
        assert_eq!(local.downcast_ref::<u8>(), Some(&2));

        child.set_context(ContextKey::Named("a"), None);
        let inherited = child.get_context(&ContextKey::Named("a")).unwrap();
        assert_eq!(inherited.downcast_ref::<u8>(), Some(&1));
    }

    #[test]
    fn late_callback_runs_immediately() {
        let scope = Scope::root();
        scope.destroy();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        scope.on_destroy(Box::new(move || f.set(true)));
        assert!(fired.get());
    }

    #[test]
    fn dropping_last_reference_destroys() {
        let fired = Rc::new(Cell::new(false));
        {
            let scope = Scope::root();
            let f = fired.clone();
            scope.on_destroy(Box::new(move || f.set(true)));
        }
        assert!(fired.get());
    }
}
