//! Events going in and out of the [`crate::game::MatchController`].

use crate::game::Side;

/// Inputs from the keyboard, the analog controller or the window, queued and handed to the match controller at tick
/// boundaries.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// Per-tick paddle movement from digital controls. `0` stops the paddle.
    DigitalSpeed { side: Side, delta: i32 },
    /// A decoded controller channel, with its value normalized to `[0, 1]`.
    AnalogPosition { channel: u16, value: f64 },
    PauseToggle,
    /// Change the ball's base speed by this amount.
    SpeedAdjust(f64),
    Resize { width: i32, height: i32 },
}

/// Outcome of a finished match, handed to the leaderboard.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScoreCommit {
    pub winner_score: u32,
    pub loser_score: u32,
    pub winner_name: String,
    pub loser_name: String,
}

/// Requests made by the match controller to its collaborators.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// The field changed outside of the regular gameplay ticks and should be drawn again.
    RequestRepaint,
    ScoreCommit(ScoreCommit),
    /// The paddle of the given side returned the ball.
    PlayAudioCue(Side),
    /// A selection channel moved while the game is not running.
    PlayerSelectionChanged { side: Side, value: f64 },
    /// A countdown began, its timer should start from a full period.
    CountdownStarted,
}
