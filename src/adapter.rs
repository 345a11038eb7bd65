//! Stream adapters.
//!
//! An adapter sits between the runtime's raw push values and the stream
//! type an application wants to work with. It is chosen per `bootstrap`
//! call and decides three things:
//!
//! - what a provider receives as its input (`read`)
//! - how a value or sub-stream written through a connection reaches the
//!   input buffer (`write`)
//! - what `connect` finally hands out (`wrap_connection`)

use crate::cyclotron::Connection;
use crate::stream::{Observer, Sink, Source, Subscription};

/// Something written through a connection's write accessor.
pub enum Input<T> {
    /// A single value.
    Value(T),
    /// A sub-stream whose values are forwarded until it is unsubscribed.
    Stream(Source<T>),
}

impl<T> std::fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Value(_) => f.write_str("Input::Value(..)"),
            Input::Stream(_) => f.write_str("Input::Stream(..)"),
        }
    }
}

/// Pluggable translation layer between the runtime and its embedding.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, connect, Provider, RuntimeConfig, Scope, Split, Source};
///
/// let scope = Scope::root();
/// let _dispose = bootstrap(&scope.host(), RuntimeConfig::new(Split));
///
/// let echo = Provider::<u8, Source<u8>, Split>::adapted_passthrough("echo");
/// let (write, read) = connect(&scope.host(), &echo).unwrap();
/// assert!(write.is_some());
/// assert!(read.is_some());
/// ```
pub trait Adapter: 'static {
    /// What a provider receives as its input.
    type Read<T: Clone + 'static>;

    /// What `connect` returns.
    type Connection<I: Clone + 'static, O: Clone + 'static>;

    /// Converts an input buffer's read side for the provider.
    fn read<T: Clone + 'static>(&self, source: Source<T>) -> Self::Read<T>;

    /// Delivers `input` to `sink`. Returns a disposer when the input keeps
    /// a subscription open.
    fn write<T: Clone + 'static>(&self, sink: &Sink<T>, input: Input<T>) -> Option<Subscription>;

    /// Shapes the connection handed to consumers.
    fn wrap_connection<I: Clone + 'static, O: Clone + 'static>(
        &self,
        connection: Connection<I, O>,
    ) -> Self::Connection<I, O>;
}

/// Forwards a sub-stream's values and errors into `sink`.
///
/// The sub-stream completing does not complete the sink: an input buffer
/// only terminates when its service is disposed.
pub fn forward<T: Clone + 'static>(sink: &Sink<T>, source: &Source<T>) -> Subscription {
    let (next_sink, error_sink) = (sink.clone(), sink.clone());
    source.subscribe(
        Observer::new(move |v| next_sink.next(v)).on_error(move |e| error_sink.error(e)),
    )
}

/// The core adapter: providers see raw [`Source`]s and `connect` returns the
/// core [`Connection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl Adapter for Direct {
    type Read<T: Clone + 'static> = Source<T>;
    type Connection<I: Clone + 'static, O: Clone + 'static> = Connection<I, O>;

    fn read<T: Clone + 'static>(&self, source: Source<T>) -> Source<T> {
        source
    }

    fn write<T: Clone + 'static>(&self, sink: &Sink<T>, input: Input<T>) -> Option<Subscription> {
        match input {
            Input::Value(value) => {
                sink.next(value);
                None
            }
            Input::Stream(source) => Some(forward(sink, &source)),
        }
    }

    fn wrap_connection<I: Clone + 'static, O: Clone + 'static>(
        &self,
        connection: Connection<I, O>,
    ) -> Connection<I, O> {
        connection
    }
}

/// Positional adapter: `connect` returns a `(writer, output)` pair.
///
/// Providers still see raw sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct Split;

impl Adapter for Split {
    type Read<T: Clone + 'static> = Source<T>;
    type Connection<I: Clone + 'static, O: Clone + 'static> =
        (Option<crate::cyclotron::Writer<I>>, Option<O>);

    fn read<T: Clone + 'static>(&self, source: Source<T>) -> Source<T> {
        source
    }

    fn write<T: Clone + 'static>(&self, sink: &Sink<T>, input: Input<T>) -> Option<Subscription> {
        Direct.write(sink, input)
    }

    fn wrap_connection<I: Clone + 'static, O: Clone + 'static>(
        &self,
        connection: Connection<I, O>,
    ) -> Self::Connection<I, O> {
        connection.into_parts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::HotBuffer;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn direct_write_of_stream_forwards_until_unsubscribed() {
        let buffer = HotBuffer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        buffer.subscribe(Observer::new(move |v| s.borrow_mut().push(v)));

        let upstream = HotBuffer::new();
        let sub = Direct
            .write(&buffer.sink(), Input::Stream(upstream.source()))
            .expect("stream input keeps a subscription");
        upstream.push(1);
        sub.unsubscribe();
        upstream.push(2);

        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn completion_of_written_stream_keeps_sink_open() {
        let buffer = HotBuffer::new();
        Direct.write(&buffer.sink(), Input::Stream(Source::of(vec![1, 2])));
        assert!(!buffer.is_terminated());
    }
}
