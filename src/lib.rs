//! # ferrous-cyclotron
//!
//! Scope-tree dependency injection with reference-counted, reactive service
//! lifecycles.
//!
//! ## Features
//!
//! - **Lazy, shared services**: a provider is built on first `connect` and
//!   shared by every connection in the scope subtree that created it
//! - **Ref-counted teardown**: a service disposes exactly when its last
//!   connection's scope is destroyed
//! - **Hot input buffers**: values written before anyone reads are replayed
//!   once to the first reader
//! - **Daemons**: a service may connect to itself while being built and so
//!   keep itself alive
//! - **Pluggable adapters**: the stream type a provider sees and the shape
//!   `connect` returns are chosen per `bootstrap`
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_cyclotron::{Provider, RuntimeConfig, Scope, Source};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let app = Scope::root();
//! let dispose_all = app.bootstrap(RuntimeConfig::default());
//!
//! // Read-write service: doubles whatever is written to it.
//! let doubler = Provider::read_write("doubler", |_, input: Source<i32>| Ok(input.map(|n| n * 2)));
//!
//! let view = app.child();
//! let connection = view.connect(&doubler).unwrap();
//! connection.send(1).unwrap();
//! connection.send(2).unwrap();
//!
//! // The first reader sees what was written before it subscribed.
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let s = seen.clone();
//! connection.read().unwrap().subscribe_fn(move |n| s.borrow_mut().push(n));
//! connection.send(3).unwrap();
//! assert_eq!(*seen.borrow(), vec![2, 4, 6]);
//!
//! // Destroying the only connecting scope disposes the service.
//! view.destroy();
//! assert_eq!(dispose_all.snapshot().live_count(), 0);
//! ```
//!
//! ## Daemons
//!
//! ```rust
//! use ferrous_cyclotron::{Dispose, Provider, RuntimeConfig, Scope, Source};
//! use std::cell::OnceCell;
//! use std::rc::Rc;
//!
//! let app = Scope::root();
//! let _dispose_all = app.bootstrap(RuntimeConfig::default());
//!
//! let slot: Rc<OnceCell<Provider<(), Source<u8>>>> = Rc::new(OnceCell::new());
//! let this = slot.clone();
//! let heartbeat = Provider::read_only("heartbeat", move |ctx| {
//!     if let Some(me) = this.get() {
//!         ctx.connect(me)?; // keeps the service alive
//!     }
//!     Ok(Source::never())
//! });
//! let _ = slot.set(heartbeat.clone());
//!
//! let view = app.child();
//! view.connect(&heartbeat).unwrap();
//! let handle = view.lookup(&heartbeat).unwrap().unwrap();
//! assert_eq!(handle.ref_count(), 2);
//!
//! view.destroy();
//! assert_eq!(handle.ref_count(), 1);
//! assert!(!handle.is_disposed());
//! ```

// Module declarations
pub mod adapter;
pub mod auto;
pub mod config;
pub mod cyclotron;
pub mod debug;
pub mod error;
pub mod key;
pub mod kind;
pub mod observer;
pub mod provider;
pub mod runtime;
pub mod stream;
pub mod traits;

// Internal modules
mod internal;

// Re-exports
pub use adapter::{forward, Adapter, Direct, Input, Split};
pub use auto::{auto, connectable};
pub use config::{RuntimeOptions, DEFAULT_MAX_DEPTH};
pub use cyclotron::{Connection, CycleProxy, HandleRef, ProxyPhase, ServiceHandle, Writer};
pub use debug::{HandleInfo, RuntimeSnapshot};
pub use error::{DiError, DiResult};
pub use key::{ContextKey, ProviderId};
pub use kind::ProviderKind;
pub use observer::{LifecycleObserver, MetricsObserver, MetricsSnapshot, TracingObserver};
pub use provider::{Provider, Scope, ServiceContext};
pub use runtime::{
    bootstrap, connect, lookup, provide_override, resolve, runtime_of, DisposeAll, Runtime,
    RuntimeConfig,
};
pub use stream::{HotBuffer, Observer, Sink, Source, StreamError, Subscription};
pub use traits::{Dispose, Host};
