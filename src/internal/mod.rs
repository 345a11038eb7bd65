//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod collections;
pub(crate) mod dispose_bag;

pub(crate) use circular::{AnyRc, ResolutionGuard, Resolving};
pub(crate) use dispose_bag::{run_all, DisposeBag, Listener};
