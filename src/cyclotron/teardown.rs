use std::cell::RefCell;
use std::rc::Rc;

use crate::internal::{DisposeBag, Listener};
use crate::observer::LifecycleObserver;
use crate::traits::Host;

/// Where a connection's release is registered.
///
/// Connections made by a scope are released when the scope is destroyed;
/// connections made while a provider is being built are released when that
/// provider's handle disposes.
#[derive(Clone)]
pub(crate) struct Teardown(Rc<dyn Fn(Listener) -> Result<(), Listener>>);

impl Teardown {
    pub(crate) fn host(host: &Rc<dyn Host>) -> Self {
        let host = host.clone();
        Teardown(Rc::new(move |listener: Listener| -> Result<(), Listener> {
            host.on_destroy(listener);
            Ok(())
        }))
    }

    pub(crate) fn bag(
        bag: Rc<RefCell<DisposeBag>>,
        name: &'static str,
        observer: Option<Rc<dyn LifecycleObserver>>,
    ) -> Self {
        Teardown(Rc::new(move |listener| {
            push_listener(&bag, name, observer.as_deref(), listener)
        }))
    }

    /// Registers a release. An owner already torn down runs it at once.
    pub(crate) fn register(&self, listener: Listener) {
        if let Err(late) = (self.0)(listener) {
            late();
        }
    }
}

/// Adds a disposal listener. A drained bag logs a warning and hands the
/// listener back.
pub(crate) fn push_listener(
    bag: &RefCell<DisposeBag>,
    name: &'static str,
    observer: Option<&dyn LifecycleObserver>,
    listener: Listener,
) -> Result<(), Listener> {
    let refused = bag.borrow_mut().push(listener);
    if refused.is_err() {
        tracing::warn!(service = name, "trying to add a listener to a disposed service");
        if let Some(observer) = observer {
            observer.late_listener(name);
        }
    }
    refused
}
