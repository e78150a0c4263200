//! Implementation of the logic of the Pong game.
//!
//! This mod exposes the [`MatchController`], which owns the ball, the paddles and the [`settings::GameSettings`]. It
//! is driven by the timers of [`crate::runner`], consumes [`InputEvent`]s and emits [`GameEvent`]s. The physics live
//! in the [`ball`] and [`paddle`] sub-mods.

pub use events::{GameEvent, InputEvent, ScoreCommit};
pub use match_controller::{Frame, MatchController};
pub use side::Side;
pub use state::MatchState;

pub mod ball;
pub mod constants;
mod events;
mod match_controller;
pub mod paddle;
pub mod settings;
mod side;
mod state;
pub mod vector;
