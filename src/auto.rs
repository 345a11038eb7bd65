//! Auto-connecting streams.
//!
//! [`auto`] and [`connectable`] turn providers into plain [`Source`]s that
//! hold their connections only while subscribed. The connections are not
//! tied to any scope's teardown: unsubscribing is what releases them.

use std::cell::RefCell;
use std::rc::Rc;

use crate::adapter::Adapter;
use crate::cyclotron::Teardown;
use crate::error::{DiError, DiResult};
use crate::internal::{run_all, DisposeBag};
use crate::provider::Provider;
use crate::runtime::runtime_of;
use crate::stream::{Observer, Source, StreamError, Subscription};
use crate::traits::Host;

/// Connections opened for one subscription.
struct Session {
    bag: Rc<RefCell<DisposeBag>>,
    teardown: Teardown,
}

impl Session {
    fn new(name: &'static str) -> Self {
        let bag = Rc::new(RefCell::new(DisposeBag::default()));
        let teardown = Teardown::bag(bag.clone(), name, None);
        Self { bag, teardown }
    }

    fn close(bag: &RefCell<DisposeBag>) {
        let drained = bag.borrow_mut().drain();
        if let Some(listeners) = drained {
            run_all(listeners);
        }
    }

    /// Subscribes `observer` to what `open` produced, or reports the failure
    /// and releases whatever was opened.
    fn run<T: Clone + 'static>(
        self,
        observer: Observer<T>,
        opened: DiResult<Source<T>>,
    ) -> Subscription {
        match opened {
            Ok(output) => {
                let inner = output.subscribe(observer);
                let bag = self.bag;
                Subscription::new(move || {
                    inner.unsubscribe();
                    Session::close(&bag);
                })
            }
            Err(err) => {
                tracing::debug!(error = %err, "auto-connect failed");
                Session::close(&self.bag);
                observer.error(StreamError::new(err.to_string()));
                Subscription::empty()
            }
        }
    }
}

fn open<I, T, A>(
    host: &Rc<dyn Host>,
    provider: &Provider<I, Source<T>, A>,
    session: &Session,
) -> DiResult<Source<T>>
where
    I: Clone + 'static,
    T: Clone + 'static,
    A: Adapter,
{
    let connection = runtime_of::<A>(host)?.connect_core(host, provider, &session.teardown)?;
    connection.read().ok_or(DiError::TypeMismatch(provider.name()))
}

/// A stream that connects `provider` on subscribe and disconnects on
/// unsubscribe.
///
/// Connection failures are delivered to the subscriber as stream errors.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{auto, Provider, RuntimeConfig, Scope, Source};
///
/// let scope = Scope::root();
/// let _dispose_all = scope.bootstrap(RuntimeConfig::default());
///
/// let numbers = Provider::read_only("numbers", |_| Ok(Source::of(vec![1, 2, 3])));
/// let stream = auto(&scope.host(), &numbers);
///
/// let sub = stream.subscribe_fn(|n| println!("{n}"));
/// assert_eq!(scope.lookup(&numbers).unwrap().map(|h| h.ref_count()), Some(1));
/// sub.unsubscribe();
/// assert!(scope.lookup(&numbers).unwrap().is_none());
/// ```
pub fn auto<I, T, A>(host: &Rc<dyn Host>, provider: &Provider<I, Source<T>, A>) -> Source<T>
where
    I: Clone + 'static,
    T: Clone + 'static,
    A: Adapter,
{
    let host = host.clone();
    let provider = provider.clone();
    Source::new(move |observer| {
        let session = Session::new(provider.name());
        let opened = open(&host, &provider, &session);
        session.run(observer, opened)
    })
}

/// Chains drivers into one auto-connecting stream: each driver's output is
/// written into the next driver's input, and the last driver's output is
/// what subscribers see.
///
/// The first driver's input is left unwritten. No drivers gives a stream
/// that never emits; one driver behaves like [`auto`].
pub fn connectable<T, A>(host: &Rc<dyn Host>, drivers: &[Provider<T, Source<T>, A>]) -> Source<T>
where
    T: Clone + 'static,
    A: Adapter,
{
    match drivers {
        [] => Source::never(),
        [driver] => auto(host, driver),
        _ => {
            let host = host.clone();
            let drivers = drivers.to_vec();
            Source::new(move |observer| {
                let session = Session::new(drivers[0].name());
                let opened = chain(&host, &drivers, &session);
                session.run(observer, opened)
            })
        }
    }
}

fn chain<T, A>(
    host: &Rc<dyn Host>,
    drivers: &[Provider<T, Source<T>, A>],
    session: &Session,
) -> DiResult<Source<T>>
where
    T: Clone + 'static,
    A: Adapter,
{
    let runtime = runtime_of::<A>(host)?;
    let mut upstream: Option<Source<T>> = None;
    for driver in drivers {
        let connection = runtime.connect_core(host, driver, &session.teardown)?;
        if let Some(previous) = upstream.take() {
            let writer = connection.writer().ok_or(DiError::ReadOnly(driver.name()))?;
            writer.write_stream(previous);
        }
        upstream = Some(connection.read().ok_or(DiError::TypeMismatch(driver.name()))?);
    }
    upstream.ok_or(DiError::TypeMismatch("connectable"))
}
