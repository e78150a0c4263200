//! Settings snapshot shared read-only with the ball and paddles, and its persistence.
//!
//! All the sizes and speeds derived from the field are computed when queried, so a resize is reflected by the very
//! next physics step.

use std::path::PathBuf;
use std::{fs, io};

use serde::{Deserialize, Serialize};

use crate::game::constants::{MAX_SPEED_RATIO, MIN_SPEED_RATIO, PADDLE_STEP_RATIO};
use crate::game::vector::Vec2;

const DEFAULT_PLAYER_RATIO: f64 = 0.15;
const DEFAULT_SPEED: f64 = 30.0;

/// Game settings, owned by the [`crate::game::MatchController`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    field_width: i32,
    field_height: i32,
    unit: i32,
    total_score: u32,
    player_ratio: f64,
    speed: f64,

    player1_name: String,
    player2_name: String,

    player1_channel: u16,
    player2_channel: u16,
    speed_channel: u16,
    pause_channel: u16,
    player1_select_channel: u16,
    player2_select_channel: u16,

    highscore_path: PathBuf,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            field_width: 800,
            field_height: 600,
            unit: 10,
            total_score: 10,
            player_ratio: DEFAULT_PLAYER_RATIO,
            speed: DEFAULT_SPEED,
            player1_name: String::from("Player 1"),
            player2_name: String::from("Player 2"),
            player1_channel: 2,
            player2_channel: 4,
            speed_channel: 1,
            pause_channel: 7,
            player1_select_channel: 3,
            player2_select_channel: 4,
            highscore_path: PathBuf::from("highscores.json"),
        }
    }
}

impl GameSettings {
    /// Pass every value through its setter. Deserialized settings skip the setters and must be sanitized before use.
    pub fn sanitized(mut self) -> Self {
        self.set_field(self.field_width, self.field_height);
        self.set_unit(self.unit);
        self.set_total_score(self.total_score);
        self.set_player_ratio(self.player_ratio);
        if !self.speed.is_finite() {
            self.speed = DEFAULT_SPEED;
        }
        self
    }

    /// Field size as `(width, height)`.
    pub fn field(&self) -> (i32, i32) {
        (self.field_width, self.field_height)
    }

    pub fn set_field(&mut self, width: i32, height: i32) {
        self.field_width = width.max(0);
        self.field_height = height.max(0);
    }

    /// A minimized window gives an empty field, on which no physics can run.
    pub fn has_valid_field(&self) -> bool {
        self.field_width > 0 && self.field_height > 0 && self.unit > 0
    }

    pub fn field_center(&self) -> Vec2 {
        Vec2::new(
            (self.field_width / 2) as f64,
            (self.field_height / 2) as f64,
        )
    }

    pub fn unit(&self) -> i32 {
        self.unit
    }

    pub fn set_unit(&mut self, unit: i32) {
        self.unit = unit.max(1);
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn set_total_score(&mut self, total_score: u32) {
        self.total_score = total_score.max(1);
    }

    pub fn player_ratio(&self) -> f64 {
        self.player_ratio
    }

    /// Set the paddle height as a fraction of the field height. A ratio that isn't in `(0, 1]` is capped at `1` or
    /// replaced by the default.
    pub fn set_player_ratio(&mut self, ratio: f64) {
        self.player_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio.min(1.0)
        } else {
            DEFAULT_PLAYER_RATIO
        };
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn paddle_height(&self) -> i32 {
        (self.field_height as f64 * self.player_ratio()).round() as i32
    }

    pub fn min_ball_speed(&self) -> f64 {
        self.field_width as f64 * MIN_SPEED_RATIO
    }

    pub fn max_ball_speed(&self) -> f64 {
        self.field_width as f64 * MAX_SPEED_RATIO
    }

    /// Distance a paddle moves per tick under digital control.
    pub fn paddle_step(&self) -> i32 {
        (self.field_width as f64 * PADDLE_STEP_RATIO).round() as i32
    }

    pub fn player1_name(&self) -> &str {
        &self.player1_name
    }

    pub fn set_player1_name(&mut self, name: impl Into<String>) {
        self.player1_name = name.into();
    }

    pub fn player2_name(&self) -> &str {
        &self.player2_name
    }

    pub fn set_player2_name(&mut self, name: impl Into<String>) {
        self.player2_name = name.into();
    }

    pub fn player1_channel(&self) -> u16 {
        self.player1_channel
    }

    pub fn player2_channel(&self) -> u16 {
        self.player2_channel
    }

    pub fn speed_channel(&self) -> u16 {
        self.speed_channel
    }

    pub fn pause_channel(&self) -> u16 {
        self.pause_channel
    }

    pub fn player1_select_channel(&self) -> u16 {
        self.player1_select_channel
    }

    pub fn player2_select_channel(&self) -> u16 {
        self.player2_select_channel
    }

    pub fn highscore_path(&self) -> &PathBuf {
        &self.highscore_path
    }
}

/// Errors encountered while loading or saving settings.
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("could not access the settings file : {0}")]
    Io(#[from] io::Error),

    #[error("settings file is not valid JSON : {0}")]
    Json(#[from] serde_json::Error),
}

/// Loader and saver of [`GameSettings`], given to the match controller at construction.
pub trait SettingsStore {
    fn load(&self) -> Result<GameSettings, SettingsError>;
    fn save(&self, settings: &GameSettings) -> Result<(), SettingsError>;
}

/// [`SettingsStore`] keeping the settings as a pretty-printed JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for JsonSettingsStore {
    /// A file that doesn't exist yet means the defaults are used.
    fn load(&self) -> Result<GameSettings, SettingsError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice::<GameSettings>(&bytes)?.sanitized()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(GameSettings::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, settings: &GameSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(settings)?)?;
        log::debug!("Settings written to {}.", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("arcade-pong-{}-{name}", std::process::id()))
    }

    #[test]
    fn derived_values_follow_the_field() {
        let mut settings = GameSettings::default();
        settings.set_field(800, 600);
        assert_eq!(settings.paddle_height(), 90);
        assert_eq!(settings.min_ball_speed(), 4.0);
        assert_eq!(settings.max_ball_speed(), 16.0);
        assert_eq!(settings.paddle_step(), 6);

        settings.set_field(400, 200);
        assert_eq!(settings.paddle_height(), 30);
        assert_eq!(settings.min_ball_speed(), 2.0);
        assert_eq!(settings.max_ball_speed(), 8.0);
        assert_eq!(settings.field_center(), Vec2::new(200.0, 100.0));
    }

    #[test]
    fn degenerate_field() {
        let mut settings = GameSettings::default();
        assert!(settings.has_valid_field());
        settings.set_field(0, 600);
        assert!(!settings.has_valid_field());
        settings.set_field(-3, -3);
        assert_eq!(settings.field(), (0, 0));
    }

    #[test]
    fn json_store_round_trip() {
        let path = scratch_path("settings.json");
        let store = JsonSettingsStore::new(&path);
        let mut settings = GameSettings::default();
        settings.set_total_score(3);
        settings.set_player1_name("Ada");
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_and_keys_give_defaults() {
        let path = scratch_path("absent.json");
        let store = JsonSettingsStore::new(&path);
        assert_eq!(store.load().unwrap(), GameSettings::default());

        let partial: GameSettings = serde_json::from_str(r#"{"unit": 20}"#).unwrap();
        assert_eq!(partial.unit(), 20);
        assert_eq!(partial.total_score(), 10);
    }

    #[test]
    fn loaded_values_follow_the_setters_rules() {
        let path = scratch_path("out-of-range.json");
        let store = JsonSettingsStore::new(&path);
        let load = |json: &str| {
            fs::write(&path, json).unwrap();
            store.load().unwrap()
        };

        assert_eq!(load(r#"{"total_score": 0}"#).total_score(), 1);
        assert_eq!(load(r#"{"unit": 0}"#).unit(), 1);
        assert_eq!(load(r#"{"unit": -5}"#).unit(), 1);
        assert_eq!(load(r#"{"player_ratio": -0.2}"#).paddle_height(), 90);
        assert_eq!(load(r#"{"player_ratio": 0}"#).paddle_height(), 90);

        let tall = load(r#"{"player_ratio": 1.5}"#);
        assert_eq!(tall.paddle_height(), tall.field().1);

        let negative = load(r#"{"field_width": -100, "field_height": -1}"#);
        assert_eq!(negative.field(), (0, 0));
        assert!(!negative.has_valid_field());
        assert!(negative.min_ball_speed() <= negative.max_ball_speed());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn sanitizing_keeps_valid_settings() {
        let mut settings = GameSettings::default();
        settings.set_field(640, 480);
        settings.set_player_ratio(0.3);
        assert_eq!(settings.clone().sanitized(), settings);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = scratch_path("broken.json");
        fs::write(&path, b"{ not json").unwrap();
        let store = JsonSettingsStore::new(&path);
        assert!(matches!(store.load(), Err(SettingsError::Json(_))));
        fs::remove_file(&path).unwrap();
    }
}
