//! Provider kind definitions.

/// Shape of a provider's input and output.
///
/// Decides whether a service gets an input buffer, whether it exposes an
/// output, and therefore what a [`Connection`](crate::Connection) to it
/// carries.
///
/// # Kind Characteristics
///
/// - **ReadOnly**: no input buffer; the factory's result is the output
/// - **WriteOnly**: input buffer only; nothing to read back
/// - **ReadWrite**: input buffer handed to the factory, result is the output
/// - **Passthrough**: no factory; the input buffer's read side is the output
///
/// # Examples
///
/// ```rust
/// use ferrous_cyclotron::{Provider, ProviderKind, Source};
///
/// let clock = Provider::read_only("clock", |_| Ok(Source::of(vec![1u64, 2, 3])));
/// let logger = Provider::write_only("logger", |_, _input: Source<String>| Ok(()));
/// let upper = Provider::read_write("upper", |_, input: Source<String>| {
///     Ok(input.map(|s| s.to_uppercase()))
/// });
/// let bus = Provider::<u8, Source<u8>>::passthrough("bus");
///
/// assert_eq!(clock.kind(), ProviderKind::ReadOnly);
/// assert_eq!(logger.kind(), ProviderKind::WriteOnly);
/// assert_eq!(upper.kind(), ProviderKind::ReadWrite);
/// assert_eq!(bus.kind(), ProviderKind::Passthrough);
/// assert!(!clock.kind().has_input());
/// assert!(!logger.kind().has_output());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Called once with no input; its return value is the permanent output.
    ///
    /// Every connection to a read-only service is the same shared value, so
    /// no per-connection teardown exists beyond reference counting.
    ReadOnly,
    /// Receives the input buffer; produces no readable output.
    WriteOnly,
    /// Receives the input buffer and returns the output.
    ReadWrite,
    /// No factory at all: what is written is what is read.
    Passthrough,
}

impl ProviderKind {
    /// Whether the service owns an input buffer.
    pub fn has_input(&self) -> bool {
        !matches!(self, ProviderKind::ReadOnly)
    }

    /// Whether the service exposes an output value.
    pub fn has_output(&self) -> bool {
        !matches!(self, ProviderKind::WriteOnly)
    }
}
