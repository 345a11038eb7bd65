//! Core traits of the runtime.

mod dispose;
mod host;

pub use dispose::Dispose;
pub use host::Host;
