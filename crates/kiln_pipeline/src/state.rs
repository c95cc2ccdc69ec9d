//! The per-directory export state machine.

use std::fmt;

/// States an export pass moves through for each directory.
///
/// `Scanning` always recomputes the parameter digest from scratch; only
/// directory and file digests are persisted between runs. `Retrieving` and
/// `Rebuilding` are alternatives chosen in `CheckingCache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// Nothing in flight.
    Idle,
    /// Enumerating files and computing digests.
    Scanning,
    /// Deciding between a cache fetch and a local rebuild.
    CheckingCache,
    /// Replaying a cached bundle into the output targets.
    Retrieving,
    /// Rebuilding objects locally.
    Rebuilding,
    /// Writing manifests and assembling the cache bundle.
    Writing,
    /// Persisting the digests consumed by this pass.
    UpdatingDigests,
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Idle => "idle",
            ExportState::Scanning => "scanning",
            ExportState::CheckingCache => "checking cache",
            ExportState::Retrieving => "retrieving",
            ExportState::Rebuilding => "rebuilding",
            ExportState::Writing => "writing",
            ExportState::UpdatingDigests => "updating digests",
        };
        write!(f, "{name}")
    }
}

/// Records the state transitions of one export run.
#[derive(Debug)]
pub struct StateTracker {
    current: ExportState,
    trace: Vec<ExportState>,
}

impl StateTracker {
    /// Starts idle.
    pub fn new() -> Self {
        Self {
            current: ExportState::Idle,
            trace: vec![ExportState::Idle],
        }
    }

    /// The current state.
    pub fn current(&self) -> ExportState {
        self.current
    }

    /// Moves to `state`, recording the transition.
    pub fn advance(&mut self, state: ExportState) {
        self.current = state;
        self.trace.push(state);
    }

    /// Every state entered so far, in order.
    pub fn trace(&self) -> &[ExportState] {
        &self.trace
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_records_transitions() {
        let mut tracker = StateTracker::new();
        tracker.advance(ExportState::Scanning);
        tracker.advance(ExportState::CheckingCache);
        tracker.advance(ExportState::Rebuilding);
        assert_eq!(tracker.current(), ExportState::Rebuilding);
        assert_eq!(
            tracker.trace(),
            [
                ExportState::Idle,
                ExportState::Scanning,
                ExportState::CheckingCache,
                ExportState::Rebuilding
            ]
        );
    }
}
