//! The paddles, controlled either digitally (keyboard) or through an analog controller channel.

use crate::game::settings::GameSettings;
use crate::game::vector::Rect;

/// A player's paddle, with its score and name.
///
/// The paddle's size is derived from the [`GameSettings`] each time it is needed, only its horizontal center and
/// its top edge are stored.
#[derive(Clone, Debug)]
pub struct Paddle {
    name: String,
    center_x: i32,
    top: i32,
    speed: i32,
    velocity: i32,
    controller_pos: Option<f64>,
    last_active_pos: Option<i32>,
    score: u32,
}

impl Paddle {
    /// Create a paddle centered vertically on the field, at the given horizontal position.
    pub fn new(name: impl Into<String>, center_x: i32, settings: &GameSettings) -> Self {
        let mut paddle = Self {
            name: name.into(),
            center_x,
            top: 0,
            speed: 0,
            velocity: 0,
            controller_pos: None,
            last_active_pos: None,
            score: 0,
        };
        paddle.reset((center_x, settings.field().1 / 2), settings);
        paddle
    }

    /// The paddle's rectangle, always fully inside the field vertically.
    pub fn rect(&self, settings: &GameSettings) -> Rect {
        let unit = settings.unit();
        let height = settings.paddle_height();
        Rect::new(
            self.center_x - unit / 2,
            clamp_top(self.top, height, settings),
            unit,
            height,
        )
    }

    /// Move the paddle by one tick and record its velocity.
    ///
    /// While an analog position is set, it fully determines where the paddle is and the digital speed is ignored.
    pub fn advance(&mut self, settings: &GameSettings) {
        let height = settings.paddle_height();
        let field_height = settings.field().1;
        let old_top = clamp_top(self.top, height, settings);

        let new_top = match self.controller_pos {
            Some(pos) => analog_top(pos, height, field_height),
            None if old_top + self.speed < 0 => 0,
            None if old_top + height + self.speed > field_height => field_height - height,
            None => old_top + self.speed,
        };
        self.top = clamp_top(new_top, height, settings);
        self.velocity = old_top - self.top;
    }

    /// Set the per-tick movement from digital input. A non-zero speed remembers where the movement started, for the
    /// next serve.
    pub fn set_speed(&mut self, speed: i32, settings: &GameSettings) {
        self.speed = speed;
        self.last_active_pos = match speed {
            0 => None,
            _ => Some(self.rect(settings).center().y.round() as i32),
        };
    }

    /// Set the analog position, clamped to `[0, 1]` where `1` is the top of the field, and move there at once.
    pub fn set_pos(&mut self, pos: f64, settings: &GameSettings) {
        self.controller_pos = Some(if pos.is_nan() { 0.5 } else { pos.clamp(0.0, 1.0) });
        self.advance(settings);
    }

    /// Give the paddle back to digital control.
    #[cfg(test)]
    pub fn release_controller(&mut self) {
        self.controller_pos = None;
    }

    /// Center the paddle on the serve point. Only the horizontal position is taken from the serve point when the
    /// paddle is under analog control, or while it is moved digitally : the vertical one then follows the controller,
    /// or stays where the digital movement started.
    pub fn reset(&mut self, serve_point: (i32, i32), settings: &GameSettings) {
        let height = settings.paddle_height();
        self.center_x = serve_point.0;
        self.top = match (self.controller_pos, self.last_active_pos) {
            (Some(pos), _) => analog_top(pos, height, settings.field().1),
            (None, Some(center_y)) => center_y - height / 2,
            (None, None) => serve_point.1 - height / 2,
        };
        self.top = clamp_top(self.top, height, settings);
        self.velocity = 0;
    }

    /// Signed movement of the top edge during the last tick, positive upwards.
    pub fn velocity(&self) -> i32 {
        self.velocity
    }

    pub fn increase_score(&mut self) {
        self.score += 1;
    }

    pub fn reset_score(&mut self) {
        self.score = 0;
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

fn analog_top(pos: f64, height: i32, field_height: i32) -> i32 {
    ((1.0 - pos) * (field_height - height) as f64).round() as i32
}

fn clamp_top(top: i32, height: i32, settings: &GameSettings) -> i32 {
    top.clamp(0, (settings.field().1 - height).max(0))
}
