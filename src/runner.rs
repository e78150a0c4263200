//! The game loop : timers driving the [`MatchController`], input queue draining and dispatch of the events it emits.

use std::future::Future;
use std::io;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use crate::game::constants::{COUNTDOWN_INTERVAL_MS, TICK_INTERVAL_MS};
use crate::game::{Frame, GameEvent, InputEvent, MatchController, MatchState, Side};
use crate::leaderboard::Leaderboard;

/// Errors preventing the game loop from running.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("failed to create the signal handlers : {0}")]
    Signal(#[from] io::Error),
}

/// What draws the game and plays its sounds.
pub trait Presenter {
    /// Draw the given frame.
    fn present(&mut self, frame: &Frame);

    /// Play the bounce sound of the paddle on the given side.
    fn play_cue(&mut self, side: Side);
}

/// [`Presenter`] writing the game to the log : state changes at info level and every frame at trace level.
#[derive(Debug, Default)]
pub struct LogPresenter {
    last_state: Option<MatchState>,
}

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &Frame) {
        if self.last_state.as_ref() != Some(&frame.state) {
            log::info!(
                "{:?} | {} {} - {} {}",
                frame.state,
                frame.names[0],
                frame.scores[0],
                frame.scores[1],
                frame.names[1]
            );
            self.last_state = Some(frame.state.clone());
        }
        log::trace!(
            "field {:?} ball {:?} paddles {:?} {:?}",
            frame.field,
            frame.ball,
            frame.paddles[0],
            frame.paddles[1]
        );
    }

    fn play_cue(&mut self, side: Side) {
        log::debug!("Bounce on the {side:?} paddle.");
    }
}

/// Owner of the match and its collaborators, running everything on the current task.
pub struct GameLoop<P, L> {
    game: MatchController,
    presenter: P,
    leaderboard: L,
    inputs: mpsc::Receiver<InputEvent>,
    rng: StdRng,
}

impl<P: Presenter, L: Leaderboard> GameLoop<P, L> {
    pub fn new(
        game: MatchController,
        presenter: P,
        leaderboard: L,
        inputs: mpsc::Receiver<InputEvent>,
        rng: StdRng,
    ) -> Self {
        Self {
            game,
            presenter,
            leaderboard,
            inputs,
            rng,
        }
    }

    /// Give back the match, e.g. to save its settings.
    pub fn into_game(self) -> MatchController {
        self.game
    }

    /// Run the loop until an interrupt or terminate signal is received.
    pub async fn run_until_signaled(&mut self) -> Result<(), RunError> {
        let mut sigint_handler = signal(SignalKind::interrupt())?;
        let mut sigterm_handler = signal(SignalKind::terminate())?;
        self.run_until(async move {
            tokio::select! {
                signal = sigint_handler.recv() => match signal {
                    Some(()) => log::info!("Received an interrupt signal."),
                    None => log::error!("The interrupt signal handler stopped working, have to stop now."),
                },
                signal = sigterm_handler.recv() => match signal {
                    Some(()) => log::info!("Received a terminate signal."),
                    None => log::error!("The terminate signal handler stopped working, have to stop now."),
                },
            }
        })
        .await;
        Ok(())
    }

    /// Run the loop until the given future completes.
    ///
    /// The countdown timer is polled before the gameplay timer, so a countdown reaching zero lets the gameplay tick
    /// of the same period run. Inputs are applied at the start of each gameplay tick.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        let mut tick_interval = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut countdown_interval =
            tokio::time::interval(Duration::from_millis(COUNTDOWN_INTERVAL_MS));
        tokio::pin!(shutdown);

        self.presenter.present(&self.game.frame());
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = countdown_interval.tick() => self.game.count_down(),
                _ = tick_interval.tick() => {
                    self.drain_inputs();
                    self.game.tick(&mut self.rng);
                }
            }
            self.dispatch_events(&mut countdown_interval);
        }
        log::info!("Game loop stopped.");
    }

    fn drain_inputs(&mut self) {
        while let Ok(event) = self.inputs.try_recv() {
            self.game.handle_input(event, &mut self.rng);
        }
    }

    fn dispatch_events(&mut self, countdown_interval: &mut Interval) {
        let mut repaint = false;
        for event in self.game.drain_events() {
            match event {
                GameEvent::RequestRepaint => repaint = true,
                GameEvent::ScoreCommit(commit) => {
                    if let Err(e) = self.leaderboard.commit_score(&commit) {
                        log::error!("Could not record the match result : {e}.");
                    }
                }
                GameEvent::PlayAudioCue(side) => self.presenter.play_cue(side),
                GameEvent::PlayerSelectionChanged { side, value } => {
                    if let Some(name) = self.leaderboard.select_player(side, value) {
                        if name != self.game.paddle(side).name() {
                            log::info!("{side:?} player is now {name}.");
                            self.game.set_player_name(side, &name);
                            repaint = true;
                        }
                    }
                }
                GameEvent::CountdownStarted => countdown_interval.reset(),
            }
        }
        if repaint {
            self.presenter.present(&self.game.frame());
        }
    }
}
