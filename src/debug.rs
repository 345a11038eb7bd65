//! Debug tooling: point-in-time views of a runtime's handles.

use std::fmt;

use crate::key::ProviderId;
use crate::kind::ProviderKind;

/// One live handle as seen by [`RuntimeSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleInfo {
    /// Provider name
    pub name: &'static str,
    /// Provider identity
    pub provider_id: ProviderId,
    /// Provider kind
    pub kind: ProviderKind,
    /// Live connections
    pub ref_count: usize,
    /// Whether disposal has already run
    pub disposed: bool,
}

/// Handles registered with a runtime, in creation order.
///
/// # Examples
///
/// ```
/// use ferrous_cyclotron::{bootstrap, Provider, RuntimeConfig, Scope, Source};
///
/// let scope = Scope::root();
/// let dispose_all = bootstrap(&scope.host(), RuntimeConfig::default());
///
/// let ticks = Provider::<u32, Source<u32>>::passthrough("ticks");
/// scope.connect(&ticks).unwrap();
/// scope.connect(&ticks).unwrap();
///
/// let snapshot = dispose_all.snapshot();
/// assert_eq!(snapshot.find("ticks").map(|h| h.ref_count), Some(2));
/// println!("{}", snapshot);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    /// Runtime name from its options
    pub name: String,
    pub handles: Vec<HandleInfo>,
}

impl RuntimeSnapshot {
    /// Handles that have not been disposed.
    pub fn live_count(&self) -> usize {
        self.handles.iter().filter(|h| !h.disposed).count()
    }

    /// Sum of the ref counts of live handles.
    pub fn total_refs(&self) -> usize {
        self.handles
            .iter()
            .filter(|h| !h.disposed)
            .map(|h| h.ref_count)
            .sum()
    }

    /// First handle created for a provider with this name.
    pub fn find(&self, name: &str) -> Option<&HandleInfo> {
        self.handles.iter().find(|h| h.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl fmt::Display for RuntimeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Runtime {}", self.name)?;
        writeln!(f, "========================")?;
        writeln!(f, "Handles: {}", self.handles.len())?;
        writeln!(f, "Live: {}", self.live_count())?;
        writeln!(f, "Connections: {}", self.total_refs())?;

        if !self.handles.is_empty() {
            writeln!(f)?;
            for handle in &self.handles {
                write!(
                    f,
                    "  {} {} {:?} refs={}",
                    handle.provider_id, handle.name, handle.kind, handle.ref_count
                )?;
                if handle.disposed {
                    write!(f, " (disposed)")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
