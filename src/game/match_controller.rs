//! Orchestration of a match : the gameplay tick, the countdown, the pause state machine and the routing of inputs.

use rand::Rng;

use crate::game::ball::{Ball, Movement};
use crate::game::constants::{COUNTDOWN_SECONDS, PAUSE_BUTTON_THRESHOLD, SPEED_PAUSE_THRESHOLD};
use crate::game::events::{GameEvent, InputEvent, ScoreCommit};
use crate::game::paddle::Paddle;
use crate::game::settings::{GameSettings, SettingsError, SettingsStore};
use crate::game::state::{MatchResult, MatchState, PauseReason};
use crate::game::vector::Rect;
use crate::game::Side;

/// Everything a presenter needs to draw the game.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub field: (i32, i32),
    pub ball: Rect,
    pub paddles: [Rect; 2],
    pub scores: [u32; 2],
    pub names: [String; 2],
    pub state: MatchState,
}

/// Owner of the settings, the ball and the paddles. It is driven by two timers, [`Self::tick`] for gameplay and
/// [`Self::count_down`] for the countdown, and fed with [`InputEvent`]s. What it needs from the outside world is
/// queued as [`GameEvent`]s, collected with [`Self::drain_events`].
pub struct MatchController {
    settings: GameSettings,
    store: Box<dyn SettingsStore>,
    ball: Ball,
    paddles: [Paddle; 2],
    state: MatchState,
    pause_button_down: bool,
    events: Vec<GameEvent>,
}

impl MatchController {
    /// Create a paused match with the settings given by the store, or the defaults if they can't be loaded.
    pub fn new<R: Rng + ?Sized>(store: Box<dyn SettingsStore>, rng: &mut R) -> Self {
        let settings = store.load().map(GameSettings::sanitized).unwrap_or_else(|e| {
            log::warn!("Could not load the settings, using the defaults : {e}.");
            GameSettings::default()
        });
        let ball = Ball::new(&settings, rng);
        let paddles = [
            Paddle::new(settings.player1_name(), 0, &settings),
            Paddle::new(settings.player2_name(), 0, &settings),
        ];
        let mut match_controller = Self {
            settings,
            store,
            ball,
            paddles,
            state: MatchState::new(),
            pause_button_down: false,
            events: Vec::new(),
        };
        match_controller.init_round();
        match_controller
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Write the current settings through the store.
    pub fn save_settings(&self) -> Result<(), SettingsError> {
        self.store.save(&self.settings)
    }

    #[cfg(test)]
    pub fn state(&self) -> &MatchState {
        &self.state
    }

    #[cfg(test)]
    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn paddle(&self, side: Side) -> &Paddle {
        &self.paddles[usize::from(side)]
    }

    pub fn set_player_name(&mut self, side: Side, name: &str) {
        self.paddles[usize::from(side)].set_name(name);
        match side {
            Side::Left => self.settings.set_player1_name(name),
            Side::Right => self.settings.set_player2_name(name),
        }
    }

    pub fn set_total_score(&mut self, total_score: u32) {
        self.settings.set_total_score(total_score);
    }

    /// Take all the events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn frame(&self) -> Frame {
        Frame {
            field: self.settings.field(),
            ball: self.ball.rect(&self.settings),
            paddles: [
                self.paddles[0].rect(&self.settings),
                self.paddles[1].rect(&self.settings),
            ],
            scores: [self.paddles[0].score(), self.paddles[1].score()],
            names: [
                self.paddles[0].name().to_owned(),
                self.paddles[1].name().to_owned(),
            ],
            state: self.state.clone(),
        }
    }

    /// Apply one input event.
    pub fn handle_input<R: Rng + ?Sized>(&mut self, event: InputEvent, rng: &mut R) {
        match event {
            InputEvent::DigitalSpeed { side, delta } => {
                self.paddles[usize::from(side)].set_speed(delta, &self.settings);
            }
            InputEvent::AnalogPosition { channel, value } => self.controller_update(channel, value),
            InputEvent::PauseToggle => self.toggle_pause(),
            InputEvent::SpeedAdjust(delta) => self.change_speed(delta),
            InputEvent::Resize { width, height } => self.resize(width, height, rng),
        }
    }

    /// Gameplay tick. Only does something while running on a non-empty field.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.state.is_running() {
            return;
        }
        if !self.settings.has_valid_field() {
            log::trace!("Skipping a tick on the empty field {:?}.", self.settings.field());
            return;
        }

        match self.ball.advance(&mut self.paddles, &self.settings, rng) {
            Movement::Scored(scorer) => self.finish_round(scorer),
            movement => {
                if let Movement::Returned(side) = movement {
                    self.events.push(GameEvent::PlayAudioCue(side));
                }
                for paddle in &mut self.paddles {
                    paddle.advance(&self.settings);
                }
                self.events.push(GameEvent::RequestRepaint);
            }
        }
    }

    /// Countdown tick. Play starts when the countdown reaches zero.
    pub fn count_down(&mut self) {
        if let MatchState::Countdown(seconds) = self.state {
            match seconds.saturating_sub(1) {
                0 => self.resume(),
                remaining => self.state = MatchState::Countdown(remaining),
            }
            self.events.push(GameEvent::RequestRepaint);
        }
    }

    /// Start a countdown, unless one is already going on.
    pub fn start_countdown(&mut self) {
        if self.state.is_counting_down() {
            return;
        }
        log::debug!("Starting a {COUNTDOWN_SECONDS} seconds countdown.");
        self.state = MatchState::Countdown(COUNTDOWN_SECONDS);
        self.events.push(GameEvent::CountdownStarted);
        self.events.push(GameEvent::RequestRepaint);
    }

    /// Stop the game. A match that already ended stays ended.
    pub fn pause(&mut self) {
        if !matches!(self.state, MatchState::Paused(_)) {
            log::info!("Game paused.");
            self.state = MatchState::Paused(PauseReason::User);
            self.events.push(GameEvent::RequestRepaint);
        }
    }

    /// Pause a running or counting down game, or count down to resume a paused one.
    pub fn toggle_pause(&mut self) {
        match self.state {
            MatchState::Running | MatchState::Countdown(_) => self.pause(),
            MatchState::Paused(_) => self.start_countdown(),
        }
    }

    pub fn change_speed(&mut self, delta: f64) {
        let speed = self.ball.set_speed(self.ball.speed() + delta, &self.settings);
        self.settings.set_speed(speed);
        log::debug!("Ball speed set to {speed}.");
    }

    /// Adopt a new field size. The round starts over with a new serve heading.
    pub fn resize<R: Rng + ?Sized>(&mut self, width: i32, height: i32, rng: &mut R) {
        log::debug!("Field resized to {width}x{height}.");
        self.settings.set_field(width, height);
        if self.settings.has_valid_field() {
            self.ball.update_size(&self.settings, rng);
        }
        self.init_round();
        self.events.push(GameEvent::RequestRepaint);
    }

    fn resume(&mut self) {
        let total_score = self.settings.total_score();
        if self.paddles.iter().any(|p| p.score() >= total_score) {
            self.paddles.iter_mut().for_each(Paddle::reset_score);
            self.init_round();
        }
        log::info!("Game running.");
        self.state = MatchState::Running;
    }

    /// Serve : re-center the ball and the paddles.
    fn init_round(&mut self) {
        let (width, height) = self.settings.field();
        let unit = self.settings.unit();
        let serve_points = [
            (unit, height / 2),
            ((width as f64 - unit as f64 * 1.5).round() as i32, height / 2),
        ];
        self.ball.reset(&self.settings);
        for (paddle, serve_point) in self.paddles.iter_mut().zip(serve_points) {
            paddle.reset(serve_point, &self.settings);
        }
    }

    fn finish_round(&mut self, scorer: Side) {
        self.init_round();
        let score = [self.paddles[0].score(), self.paddles[1].score()];
        log::info!(
            "{} scored : {} - {}.",
            self.paddles[usize::from(scorer)].name(),
            score[0],
            score[1]
        );

        if score.iter().any(|&s| s >= self.settings.total_score()) {
            let winner = if score[0] > score[1] {
                Side::Left
            } else {
                Side::Right
            };
            let commit = ScoreCommit {
                winner_score: score[usize::from(winner)],
                loser_score: score[usize::from(!winner)],
                winner_name: self.paddles[usize::from(winner)].name().to_owned(),
                loser_name: self.paddles[usize::from(!winner)].name().to_owned(),
            };
            log::info!("{} won the match.", commit.winner_name);
            self.events.push(GameEvent::ScoreCommit(commit));
            self.paddles.iter_mut().for_each(Paddle::reset_score);
            self.state = MatchState::Paused(PauseReason::MatchEnded(MatchResult::new(score, winner)));
        } else {
            self.start_countdown();
        }
        self.events.push(GameEvent::RequestRepaint);
    }

    /// Route a controller channel to its function. Channels that aren't mapped are ignored.
    fn controller_update(&mut self, channel: u16, value: f64) {
        if value.is_nan() {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        let s = &self.settings;
        let (player1, player2, speed, pause, player1_select, player2_select) = (
            s.player1_channel(),
            s.player2_channel(),
            s.speed_channel(),
            s.pause_channel(),
            s.player1_select_channel(),
            s.player2_select_channel(),
        );

        match channel {
            c if c == player1 => self.move_paddle(Side::Left, value),
            c if c == player2 => self.move_paddle(Side::Right, value),
            c if c == speed => {
                let speed = self.ball.set_analog_speed(value, &self.settings);
                self.settings.set_speed(speed);
                if value < SPEED_PAUSE_THRESHOLD {
                    self.pause();
                } else if value > SPEED_PAUSE_THRESHOLD && !self.state.is_running() {
                    self.start_countdown();
                }
            }
            c if c == pause => {
                let down = value > PAUSE_BUTTON_THRESHOLD;
                if down && !self.pause_button_down {
                    self.toggle_pause();
                }
                self.pause_button_down = down;
            }
            c if c == player1_select && !self.state.is_running() => {
                self.events.push(GameEvent::PlayerSelectionChanged {
                    side: Side::Left,
                    value,
                });
            }
            c if c == player2_select && !self.state.is_running() => {
                self.events.push(GameEvent::PlayerSelectionChanged {
                    side: Side::Right,
                    value,
                });
            }
            c => log::trace!("Ignoring controller channel {c}."),
        }
    }

    fn move_paddle(&mut self, side: Side, value: f64) {
        self.paddles[usize::from(side)].set_pos(value, &self.settings);
        if !self.state.is_running() {
            self.events.push(GameEvent::RequestRepaint);
        }
    }
}
