//! Error types for the connection runtime.

use std::fmt;

/// Runtime errors
///
/// Represents the conditions that can occur while bootstrapping a runtime,
/// resolving a provider to its service handle, or connecting to it.
///
/// # Examples
///
/// ```rust
/// use ferrous_cyclotron::{connect, DiError, Provider, Scope};
///
/// // No bootstrap call above this scope
/// let scope = Scope::root();
/// let counter = Provider::read_only("counter", |_| Ok(0u32));
/// match connect(&scope.host(), &counter) {
///     Err(DiError::NotBootstrapped) => {}
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_cyclotron::DiError;
///
/// let read_only = DiError::ReadOnly("clock");
/// let failed = DiError::provider("session", "token expired");
/// println!("Error: {}", read_only);
/// println!("Error: {}", failed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// `connect`/`resolve` called with no runtime installed above the scope
    NotBootstrapped,
    /// A cycle-guard proxy was connected more than once
    CyclicReconnect(&'static str),
    /// Attempt to write through a read-only service's connection
    ReadOnly(&'static str),
    /// Attempt to connect to a handle that is already disposed
    Disposed(&'static str),
    /// A provider's factory failed during construction
    Provider {
        /// Provider name
        name: &'static str,
        /// Failure message reported by the factory
        message: String,
    },
    /// A context entry or runtime did not have the expected type
    TypeMismatch(&'static str),
    /// Maximum nested construction depth exceeded
    DepthExceeded(usize),
    /// Runtime options could not be loaded
    Config(String),
}

impl DiError {
    /// Builds a [`DiError::Provider`] from a factory failure.
    pub fn provider(name: &'static str, message: impl Into<String>) -> Self {
        DiError::Provider {
            name,
            message: message.into(),
        }
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotBootstrapped => write!(
                f,
                "You must call bootstrap from a root scope before calling connect"
            ),
            DiError::CyclicReconnect(name) => write!(
                f,
                "Cyclically resolved services may connect to themselves only once: {}",
                name
            ),
            DiError::ReadOnly(name) => write!(f, "Cannot write to read-only service: {}", name),
            DiError::Disposed(name) => write!(f, "Service already disposed: {}", name),
            DiError::Provider { name, message } => {
                write!(f, "Provider {} failed: {}", name, message)
            }
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::Config(message) => write!(f, "Invalid runtime options: {}", message),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for runtime operations
///
/// A convenience alias for `Result<T, DiError>`. Factories return it too, so
/// a factory can forward failures from nested connections with `?`.
///
/// # Examples
///
/// ```rust
/// use ferrous_cyclotron::{DiError, DiResult};
///
/// fn parse_port(raw: &str) -> DiResult<u16> {
///     raw.parse().map_err(|_| DiError::provider("port", format!("bad port {raw}")))
/// }
///
/// assert_eq!(parse_port("8080"), Ok(8080));
/// assert!(parse_port("http").is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
