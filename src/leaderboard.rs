//! Highscore book : the roster of known players and the results of finished matches.

use std::path::PathBuf;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Iso8601;

use crate::game::{ScoreCommit, Side};

/// Errors encountered while reading or writing the highscore book.
#[derive(thiserror::Error, Debug)]
pub enum LeaderboardError {
    #[error("input/output error on the highscore book : {0}")]
    Io(#[from] io::Error),

    #[error("malformed highscore book : {0}")]
    Json(#[from] serde_json::Error),
}

/// Collaborator of the game loop for player selection and score persistence.
pub trait Leaderboard {
    /// Name of the player pointed at by a selection channel's normalized value, if any.
    fn select_player(&self, side: Side, value: f64) -> Option<String>;

    /// Record the result of a finished match.
    fn commit_score(&mut self, commit: &ScoreCommit) -> Result<(), LeaderboardError>;
}

/// Result of one match as written in the book.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// ISO-8601 UTC timestamp of the end of the match.
    pub time: String,
    pub winner: String,
    pub winner_score: u32,
    pub loser: String,
    pub loser_score: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Book {
    players: Vec<String>,
    scores: Vec<ScoreRecord>,
}

/// [`Leaderboard`] kept in a JSON file, rewritten after every match.
#[derive(Debug)]
pub struct JsonLeaderboard {
    path: PathBuf,
    book: Book,
}

impl JsonLeaderboard {
    /// Read the book at the given path. A missing file is an empty book.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LeaderboardError> {
        let path = path.into();
        let book = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Book::default(),
            Err(e) => return Err(e.into()),
        };
        log::debug!(
            "Loaded {} players and {} scores from {}.",
            book.players.len(),
            book.scores.len(),
            path.display()
        );
        Ok(Self { path, book })
    }

    /// Start a new book at the given path, discarding whatever is there on the first commit.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            book: Book::default(),
        }
    }

    fn enroll(&mut self, name: &str) {
        if !self.book.players.iter().any(|p| p == name) {
            self.book.players.push(name.to_owned());
        }
    }
}

impl Leaderboard for JsonLeaderboard {
    /// The roster is split in equal slices of the `[0, 1]` range. A value of exactly `1` points past the roster.
    fn select_player(&self, side: Side, value: f64) -> Option<String> {
        if !(0.0..=1.0).contains(&value) {
            return None;
        }
        let index = (value * self.book.players.len() as f64).floor() as usize;
        let name = self.book.players.get(index).cloned();
        log::trace!("Selection for {side:?} at {value} : {name:?}.");
        name
    }

    fn commit_score(&mut self, commit: &ScoreCommit) -> Result<(), LeaderboardError> {
        self.enroll(&commit.winner_name);
        self.enroll(&commit.loser_name);
        self.book.scores.push(ScoreRecord {
            time: time::OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or(String::from("invalid date")),
            winner: commit.winner_name.clone(),
            winner_score: commit.winner_score,
            loser: commit.loser_name.clone(),
            loser_score: commit.loser_score,
        });
        fs::write(&self.path, serde_json::to_vec_pretty(&self.book)?)?;
        log::info!(
            "Recorded {} {} - {} {}.",
            commit.winner_name,
            commit.winner_score,
            commit.loser_score,
            commit.loser_name
        );
        Ok(())
    }
}
