//! Connectivity probe seam

/// Synchronous "is connectivity currently available?" query.
///
/// Implementations must never suspend the caller; a cached or otherwise
/// stale answer is acceptable. The app layer supplies a TCP-dial based
/// implementation; tests substitute a fixed one.
pub trait NetworkProbe: Send {
    fn is_online(&self) -> bool;
}

/// Probe with a fixed answer, for tests and offline development
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl NetworkProbe for FixedProbe {
    fn is_online(&self) -> bool {
        self.0
    }
}
