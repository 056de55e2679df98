//! Job state machine and progress snapshots (spec §4.3). Grounded on the
//! teacher's `session::actor` command/event shape, generalized from a
//! human-interactive session to a cancel-only background job: there is no
//! inbound command stream besides "stop".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct JobProgress {
    pub jobs_total: usize,
    pub jobs_completed: usize,
    pub current_game_id: Option<String>,
    pub moves_analyzed: usize,
    pub moves_total: usize,
    pub phase: JobState,
}

impl JobProgress {
    pub fn new(jobs_total: usize) -> Self {
        Self {
            jobs_total,
            jobs_completed: 0,
            current_game_id: None,
            moves_analyzed: 0,
            moves_total: 0,
            phase: JobState::Queued,
        }
    }
}

/// Cheap, clonable cancellation flag checked between positions, per
/// spec §5: "jobs check a cancellation signal between positions".
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Queued.is_terminal());
    }

    #[test]
    fn test_cancellation_token_is_observable_after_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
