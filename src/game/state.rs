//! Stages of a match and the result of a finished one.

use crate::game::Side;

/// Current state - or stage - of a match.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchState {
    Paused(PauseReason),
    /// Seconds remaining before play resumes.
    Countdown(u32),
    Running,
}

impl MatchState {
    /// Create the state of a match which hasn't been started yet.
    pub fn new() -> Self {
        Self::Paused(PauseReason::Initial)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_counting_down(&self) -> bool {
        matches!(self, Self::Countdown(_))
    }
}

/// Why the match is paused.
#[derive(Clone, Debug, PartialEq)]
pub enum PauseReason {
    Initial,
    User,
    MatchEnded(MatchResult),
}

/// Result of a match, with a winner and the final score.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchResult {
    pub score: [u32; 2],
    pub winner: Side,
}

impl MatchResult {
    pub fn new(score: [u32; 2], winner: Side) -> Self {
        Self { score, winner }
    }
}
