//! Keyboard controls, read from the terminal on a dedicated thread and forwarded to the game loop.
//!
//! W and S move the left paddle, the arrow keys the right one. Space toggles the pause, `+` and `-` change the ball
//! speed, and Q, Esc or Ctrl-C stop the game. The terminal is in raw mode while the keyboard is read, so the quit keys
//! raise the interrupt signal themselves.

use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use nix::sys::signal::{self, Signal};
use tokio::sync::mpsc;

use crate::game::{InputEvent, Side};

/// Time waited for a key before checking the stop flag again.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Without release events, a paddle key that wasn't repeated for this long is considered released. It is longer than
/// the usual delay before a held key starts repeating.
pub const HOLD_TIMEOUT: Duration = Duration::from_millis(600);

/// Errors stopping the keyboard reader.
#[derive(thiserror::Error, Debug)]
pub enum KeyboardError {
    #[error("could not read the terminal : {0}")]
    Io(#[from] io::Error),

    #[error("could not raise the interrupt signal : {0}")]
    Signal(#[from] nix::Error),
}

/// What a key does.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyAction {
    /// Per-tick movement of a paddle, `0` once its key is released.
    Paddle { side: Side, delta: i32 },
    Input(InputEvent),
    Quit,
}

/// Map a key event to its action, moving paddles by `step` per tick. Keys other than the paddle ones only act when
/// pressed, their repeats and releases are ignored.
pub fn map_key(key: &KeyEvent, step: i32) -> Option<KeyAction> {
    let held = matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat);
    let paddle = |side: Side, delta: i32| {
        Some(KeyAction::Paddle {
            side,
            delta: if held { delta } else { 0 },
        })
    };

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            (key.kind == KeyEventKind::Press).then_some(KeyAction::Quit)
        }
        KeyCode::Char('w' | 'W') => paddle(Side::Left, -step),
        KeyCode::Char('s' | 'S') => paddle(Side::Left, step),
        KeyCode::Up => paddle(Side::Right, -step),
        KeyCode::Down => paddle(Side::Right, step),
        _ if key.kind != KeyEventKind::Press => None,
        KeyCode::Char(' ') => Some(KeyAction::Input(InputEvent::PauseToggle)),
        KeyCode::Char('+' | '=') => Some(KeyAction::Input(InputEvent::SpeedAdjust(1.0))),
        KeyCode::Char('-') => Some(KeyAction::Input(InputEvent::SpeedAdjust(-1.0))),
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Digital speed of each paddle, with the last time its key was seen.
///
/// Only changes of speed are forwarded, so holding a key doesn't flood the game with identical inputs.
#[derive(Debug, Default)]
pub struct PaddleKeys {
    held: [Option<(i32, Instant)>; 2],
}

impl PaddleKeys {
    /// Record a paddle key. Returns the input to queue when the paddle's speed changes.
    pub fn update(&mut self, side: Side, delta: i32, now: Instant) -> Option<InputEvent> {
        let held = &mut self.held[usize::from(side)];
        let previous = held.map_or(0, |(previous, _)| previous);
        *held = (delta != 0).then_some((delta, now));
        (delta != previous).then_some(InputEvent::DigitalSpeed { side, delta })
    }

    /// Stop the paddles whose key wasn't seen for [`HOLD_TIMEOUT`].
    pub fn expire(&mut self, now: Instant) -> Vec<InputEvent> {
        let mut released = Vec::new();
        for side in [Side::Left, Side::Right] {
            if let Some((_, seen)) = self.held[usize::from(side)] {
                if now.duration_since(seen) >= HOLD_TIMEOUT {
                    released.extend(self.update(side, 0, now));
                }
            }
        }
        released
    }
}

/// Handle on the keyboard thread. The thread stops when [`Self::stop`] is called or when the receiving end of the
/// input queue is dropped, and gives the terminal back its normal mode.
#[derive(Debug)]
pub struct KeyboardHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Result<(), KeyboardError>>,
}

impl KeyboardHandle {
    /// Raise the stop flag and wait for the thread to finish. Gives back the error that ended the reader, if any.
    pub fn stop(self) -> Result<(), KeyboardError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.thread.join() {
            Ok(result) => {
                log::debug!("Keyboard reader stopped.");
                result
            }
            Err(_) => {
                log::error!("Keyboard reader panicked.");
                Ok(())
            }
        }
    }
}

/// Put the terminal in raw mode and read the keyboard on a new thread. Nothing is started when the standard input
/// isn't a terminal.
pub fn spawn(
    step: i32,
    sender: mpsc::Sender<InputEvent>,
) -> Result<Option<KeyboardHandle>, KeyboardError> {
    if !io::stdin().is_terminal() {
        log::info!("The standard input is not a terminal, keyboard controls are disabled.");
        return Ok(None);
    }
    terminal::enable_raw_mode()?;
    let releases_reported = terminal::supports_keyboard_enhancement().unwrap_or(false);
    log::info!("Reading the keyboard, key releases reported : {releases_reported}.");

    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();
    let thread = thread::spawn(move || {
        let result = run(step, &sender, &thread_stop, releases_reported);
        if let Err(e) = terminal::disable_raw_mode() {
            log::error!("Could not restore the terminal mode : {e}.");
        }
        if let Err(e) = &result {
            log::error!("Lost the keyboard : {e}.");
        }
        result
    });
    Ok(Some(KeyboardHandle { stop, thread }))
}

fn run(
    step: i32,
    sender: &mpsc::Sender<InputEvent>,
    stop: &AtomicBool,
    releases_reported: bool,
) -> Result<(), KeyboardError> {
    if !releases_reported {
        return read_loop(step, sender, stop, false);
    }
    execute!(
        io::stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )?;
    let result = read_loop(step, sender, stop, true);
    execute!(io::stdout(), PopKeyboardEnhancementFlags)?;
    result
}

fn read_loop(
    step: i32,
    sender: &mpsc::Sender<InputEvent>,
    stop: &AtomicBool,
    releases_reported: bool,
) -> Result<(), KeyboardError> {
    let mut paddles = PaddleKeys::default();
    while !stop.load(Ordering::Relaxed) {
        let mut inputs = Vec::new();
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                match map_key(&key, step) {
                    Some(KeyAction::Paddle { side, delta }) => {
                        inputs.extend(paddles.update(side, delta, Instant::now()));
                    }
                    Some(KeyAction::Input(input)) => inputs.push(input),
                    Some(KeyAction::Quit) => {
                        log::info!("Quit key pressed.");
                        signal::raise(Signal::SIGINT)?;
                    }
                    None => {}
                }
            }
        }
        if !releases_reported {
            inputs.extend(paddles.expire(Instant::now()));
        }

        for input in inputs {
            if sender.blocking_send(input).is_err() {
                log::debug!("Input queue closed, keyboard reader exiting.");
                return Ok(());
            }
        }
    }
    Ok(())
}
