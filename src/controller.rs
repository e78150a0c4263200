//! Analog controller : a microcontroller streaming channel values over a serial link.
//!
//! The link is read on a dedicated thread, see [`spawn`], and every sample the [`FrameDecoder`] gives is forwarded to
//! the game loop as an [`InputEvent::AnalogPosition`].

use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::mpsc;

pub use frame::FrameDecoder;

use crate::game::InputEvent;

mod frame;
mod serial;

/// Delay between two reads when the link had nothing to give.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Errors stopping the controller.
#[derive(thiserror::Error, Debug)]
pub enum ControllerError {
    #[error("input/output error on the serial link : {0}")]
    Io(#[from] io::Error),

    /// Happens when the serial device refuses to be configured, usually because the path isn't a terminal.
    #[error("could not configure the serial link : {0}")]
    Termios(#[from] nix::Error),
}

/// Handle on the reader thread. The thread stops when [`Self::stop`] is called or when the receiving end of the input
/// queue is dropped.
#[derive(Debug)]
pub struct ControllerHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Result<(), ControllerError>>,
}

impl ControllerHandle {
    /// Raise the stop flag and wait for the thread to finish. Gives back the error that ended the reader, if any.
    pub fn stop(self) -> Result<(), ControllerError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.thread.join() {
            Ok(result) => {
                log::debug!("Controller reader stopped.");
                result
            }
            Err(_) => {
                log::error!("Controller reader panicked.");
                Ok(())
            }
        }
    }
}

/// Open the serial device at the given path and start reading it on a new thread.
pub fn spawn(
    path: &Path,
    sender: mpsc::Sender<InputEvent>,
) -> Result<ControllerHandle, ControllerError> {
    let port = serial::open(path)?;
    log::info!("Reading the analog controller on {}.", path.display());
    Ok(spawn_reader(port, sender))
}

/// Start reading samples from any byte source on a new thread.
pub fn spawn_reader<R>(source: R, sender: mpsc::Sender<InputEvent>) -> ControllerHandle
where
    R: Read + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();
    let thread = thread::spawn(move || {
        let result = read_loop(source, &sender, &thread_stop);
        if let Err(e) = &result {
            log::error!("Lost the analog controller : {e}.");
        }
        result
    });
    ControllerHandle { stop, thread }
}

fn read_loop<R: Read>(
    mut source: R,
    sender: &mpsc::Sender<InputEvent>,
    stop: &AtomicBool,
) -> Result<(), ControllerError> {
    let mut decoder = FrameDecoder::new();
    let mut buffer = [0u8; 64];
    while !stop.load(Ordering::Relaxed) {
        let read = match source.read(&mut buffer) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(e) => return Err(e.into()),
        };
        if read == 0 {
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        for sample in buffer[..read].iter().filter_map(|&b| decoder.push(b)) {
            let event = InputEvent::AnalogPosition {
                channel: sample.channel,
                value: sample.value,
            };
            if sender.blocking_send(event).is_err() {
                log::debug!("Input queue closed, controller reader exiting.");
                return Ok(());
            }
        }
    }
    Ok(())
}
