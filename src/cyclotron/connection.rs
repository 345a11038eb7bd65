use std::fmt;
use std::rc::Rc;

use super::{CycleProxy, Teardown};
use crate::adapter::Input;
use crate::error::{DiError, DiResult};
use crate::stream::{Sink, Source, Subscription};

/// Adapter write hook bound to a runtime.
pub(crate) type WriteFn<I> = Rc<dyn Fn(&Sink<I>, Input<I>) -> Option<Subscription>>;

/// Write accessor of a connection.
///
/// Every writer of a service feeds the same input buffer. Sub-streams written
/// through it stay subscribed until the returned [`Subscription`] is
/// unsubscribed or the connection's owner is torn down, whichever comes first.
pub struct Writer<I> {
    name: &'static str,
    sink: Sink<I>,
    write: WriteFn<I>,
    teardown: Teardown,
}

impl<I> Clone for Writer<I> {
    fn clone(&self) -> Self {
        Writer {
            name: self.name,
            sink: self.sink.clone(),
            write: self.write.clone(),
            teardown: self.teardown.clone(),
        }
    }
}

impl<I: Clone + 'static> Writer<I> {
    pub(crate) fn new(
        name: &'static str,
        sink: Sink<I>,
        write: WriteFn<I>,
        teardown: Teardown,
    ) -> Self {
        Self {
            name,
            sink,
            write,
            teardown,
        }
    }

    /// Pushes one value into the service's input.
    pub fn write(&self, value: I) {
        self.send(Input::Value(value));
    }

    /// Forwards a sub-stream into the service's input.
    ///
    /// Once the connection's owner is torn down the forwarding is closed
    /// immediately.
    pub fn write_stream(&self, source: Source<I>) -> Subscription {
        self.send(Input::Stream(source))
    }

    /// Delivers an input through the runtime's adapter.
    pub fn send(&self, input: Input<I>) -> Subscription {
        match (self.write)(&self.sink, input) {
            Some(subscription) => {
                let release = subscription.clone();
                self.teardown.register(Box::new(move || release.unsubscribe()));
                subscription
            }
            None => Subscription::empty(),
        }
    }

    /// Name of the service this writer feeds.
    pub fn service_name(&self) -> &'static str {
        self.name
    }
}

impl<I> fmt::Debug for Writer<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer").field("service", &self.name).finish()
    }
}

/// What `connect` yields for each service kind.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, Connection, Provider, RuntimeConfig, Scope, Source};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let scope = Scope::root();
/// let _dispose = bootstrap(&scope.host(), RuntimeConfig::default());
///
/// let doubler = Provider::read_write("doubler", |_, input: Source<i32>| Ok(input.map(|v| v * 2)));
/// let connection = scope.connect(&doubler).unwrap();
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let s = seen.clone();
/// connection.read().unwrap().subscribe_fn(move |v| s.borrow_mut().push(v));
/// connection.send(21).unwrap();
/// assert_eq!(*seen.borrow(), vec![42]);
/// assert!(matches!(connection, Connection::ReadWrite(..)));
/// ```
pub enum Connection<I, O> {
    /// Read-only service: the shared output.
    Read(O),
    /// Write-only service: the shared input.
    Write(Writer<I>),
    /// Read-write or passthrough service.
    ReadWrite(Writer<I>, O),
    /// Self-connection made during the service's own construction.
    Cyclic(CycleProxy<I, O>),
}

impl<I: Clone + 'static, O: Clone + 'static> Connection<I, O> {
    /// The output, if the service has one (and, for a cyclic connection,
    /// once its handle exists).
    pub fn read(&self) -> Option<O> {
        match self {
            Connection::Read(output) | Connection::ReadWrite(_, output) => Some(output.clone()),
            Connection::Write(_) => None,
            Connection::Cyclic(proxy) => proxy.read(),
        }
    }

    /// The write accessor, if the service takes input.
    pub fn writer(&self) -> Option<Writer<I>> {
        match self {
            Connection::Write(writer) | Connection::ReadWrite(writer, _) => Some(writer.clone()),
            Connection::Read(_) => None,
            Connection::Cyclic(proxy) => proxy.writer(),
        }
    }

    /// Writes one value; fails on services without input.
    pub fn send(&self, value: I) -> DiResult<()> {
        let writer = self.writer().ok_or(DiError::ReadOnly(self.service_name()))?;
        writer.write(value);
        Ok(())
    }

    /// Splits into `(writer, output)`.
    pub fn into_parts(self) -> (Option<Writer<I>>, Option<O>) {
        match self {
            Connection::Read(output) => (None, Some(output)),
            Connection::Write(writer) => (Some(writer), None),
            Connection::ReadWrite(writer, output) => (Some(writer), Some(output)),
            Connection::Cyclic(proxy) => (proxy.writer(), proxy.read()),
        }
    }

    /// Whether this is a self-connection through a cycle-guard proxy.
    pub fn is_cyclic(&self) -> bool {
        matches!(self, Connection::Cyclic(_))
    }

    fn service_name(&self) -> &'static str {
        match self {
            Connection::Write(writer) | Connection::ReadWrite(writer, _) => writer.service_name(),
            Connection::Cyclic(proxy) => proxy.name(),
            Connection::Read(_) => "read-only service",
        }
    }
}

impl<I: Clone + 'static, O: Clone + 'static> Clone for Connection<I, O> {
    fn clone(&self) -> Self {
        match self {
            Connection::Read(output) => Connection::Read(output.clone()),
            Connection::Write(writer) => Connection::Write(writer.clone()),
            Connection::ReadWrite(writer, output) => {
                Connection::ReadWrite(writer.clone(), output.clone())
            }
            Connection::Cyclic(proxy) => Connection::Cyclic(proxy.clone()),
        }
    }
}

impl<I, O> fmt::Debug for Connection<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Read(_) => f.write_str("Connection::Read"),
            Connection::Write(writer) => f.debug_tuple("Connection::Write").field(writer).finish(),
            Connection::ReadWrite(writer, _) => {
                f.debug_tuple("Connection::ReadWrite").field(writer).finish()
            }
            Connection::Cyclic(proxy) => f.debug_tuple("Connection::Cyclic").field(proxy).finish(),
        }
    }
}
