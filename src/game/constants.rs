//! Constants tuning the feel of the game.

use std::f64::consts::PI;

pub const TICK_INTERVAL_MS: u64 = 10;
pub const COUNTDOWN_INTERVAL_MS: u64 = 500;
pub const COUNTDOWN_SECONDS: u32 = 3;

/// Ball speed bounds, as fractions of the field width travelled per tick.
pub const MIN_SPEED_RATIO: f64 = 0.005;
pub const MAX_SPEED_RATIO: f64 = 0.02;
/// Digital paddle movement per tick, as a fraction of the field width.
pub const PADDLE_STEP_RATIO: f64 = 0.007;

/// Half-width of the band of headings around the vertical axis the ball may not travel in.
pub const FORBIDDEN_HALF_BAND: f64 = PI / 5.0;
/// Maximum random deviation added to a paddle bounce.
pub const BOUNCE_JITTER: f64 = 0.25;
/// Extra rotation applied to a paddle bounce which still ends up in the forbidden band.
pub const BAND_ESCAPE_ROTATION: f64 = 0.6;
/// Speed multiplier change when the paddle moves at bounce time.
pub const PADDLE_SPEED_RESPONSE: f64 = 0.2;
/// Every this many consecutive returns add one unit of speed.
pub const RALLY_STEP: u32 = 10;

/// Below this normalized value, the analog speed control pauses the game.
pub const SPEED_PAUSE_THRESHOLD: f64 = 0.1;
/// Normalized value above which the analog pause button counts as pressed.
pub const PAUSE_BUTTON_THRESHOLD: f64 = 0.5;
