//! Identity and context key types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a provider.
///
/// Allocated once per [`Provider`](crate::Provider) construction and shared
/// by its clones. Resolution is keyed by identity, never by value: two
/// providers built from identical closures are distinct services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

impl ProviderId {
    pub(crate) fn next() -> Self {
        ProviderId(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, useful in diagnostics.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Key for values stored in a host's scope context.
///
/// The runtime keeps all of its per-scope state in host context so that a
/// lookup walks the scope chain exactly the way the host resolves any other
/// context value.
///
/// # Key Types
///
/// - **Runtime**: the runtime installed by `bootstrap`
/// - **Service**: the materialized handle of a provider
/// - **Override**: a replacement provider declared for a subtree
/// - **Named**: free-form keys for embedders sharing the same host
///
/// # Examples
///
/// ```rust
/// use ferrous_cyclotron::{ContextKey, Host, Scope};
/// use std::rc::Rc;
///
/// let root = Scope::root();
/// root.set_context(ContextKey::Named("theme"), Some(Rc::new("dark")));
///
/// let child = root.child();
/// let theme = child.get_context(&ContextKey::Named("theme")).unwrap();
/// assert_eq!(theme.downcast_ref::<&str>(), Some(&"dark"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKey {
    /// The runtime installed by `bootstrap`
    Runtime,
    /// Handle cache entry for a provider
    Service(ProviderId),
    /// Replacement provider declared for a subtree
    Override(ProviderId),
    /// Embedder-defined entry
    Named(&'static str),
}

impl ContextKey {
    /// Returns a human-readable label for diagnostics.
    pub fn display_name(&self) -> String {
        match self {
            ContextKey::Runtime => "runtime".to_string(),
            ContextKey::Service(id) => format!("service{}", id),
            ContextKey::Override(id) => format!("override{}", id),
            ContextKey::Named(name) => (*name).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_are_unique() {
        let a = ProviderId::next();
        let b = ProviderId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn display_names() {
        let id = ProviderId(7);
        assert_eq!(ContextKey::Service(id).display_name(), "service#7");
        assert_eq!(ContextKey::Override(id).display_name(), "override#7");
        assert_eq!(ContextKey::Runtime.display_name(), "runtime");
        assert_eq!(ContextKey::Named("theme").display_name(), "theme");
    }
}
