use std::path::PathBuf;
use std::{fs, io};

use clap::{Parser, ValueEnum};
use fern::FormatCallback;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use time::format_description::well_known::Iso8601;
use tokio::sync::mpsc;

use crate::game::settings::JsonSettingsStore;
use crate::game::{InputEvent, MatchController, Side};
use crate::leaderboard::JsonLeaderboard;
use crate::runner::{GameLoop, LogPresenter};

mod controller;
mod game;
mod keyboard;
mod leaderboard;
mod runner;

/// Capacity of the queue between the input sources and the game loop.
const INPUT_QUEUE_SIZE: usize = 256;

#[derive(Parser)]
#[command(about, long_about = None)]
struct Cli {
    /// Ask the presenter for a fullscreen display.
    #[arg(long, short)]
    fullscreen: bool,

    /// Path of the serial device the analog controller is plugged on.
    #[arg(long, short, value_name = "PATH")]
    comport: Option<PathBuf>,

    /// Name of the left player, overriding the settings.
    #[arg(long, value_name = "NAME")]
    player1: Option<String>,

    /// Name of the right player, overriding the settings.
    #[arg(long, value_name = "NAME")]
    player2: Option<String>,

    /// Width of the field, overriding the settings.
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    width: Option<i32>,

    /// Height of the field, overriding the settings.
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    height: Option<i32>,

    /// Score a player has to reach to win a match, overriding the settings.
    #[arg(long, short, value_parser = clap::value_parser!(u32).range(1..))]
    score: Option<u32>,

    /// Path of the JSON settings file. It is created on exit if it doesn't exist.
    #[arg(long, default_value = "pong-settings.json", value_name = "PATH")]
    settings: PathBuf,

    /// Set the folder path.
    ///
    /// The given path can be absolute or relative.
    /// The game will attempt to create all the folders nested in the path.
    #[arg(long, short, default_value = "./log/", value_name = "PATH")]
    log_folder: String,

    /// Set where the printed logging is outputted.
    #[arg(value_enum, long, default_value_t)]
    console_channel: ConsoleChannel,

    /// Start the first countdown right away instead of waiting for a pause toggle.
    #[arg(long)]
    autostart: bool,
}

#[derive(Copy, Clone, ValueEnum, Default)]
enum ConsoleChannel {
    /// Print to stdout
    #[default]
    Out,
    /// Print to stderr
    Err,
}

/// Run the game on the current thread until an interrupt or terminate signal is received. All errors are logged, the
/// [`Result`] returned is only given for command-line environments.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    setup_logger(cli.log_folder, cli.console_channel)
        .map_err(|e| eprintln!("Error while configuring logging : {e:?}"))?;
    if cli.fullscreen {
        log::warn!("Fullscreen requested, but the log presenter has no window.");
    }

    let mut rng = StdRng::from_entropy();
    let mut game = MatchController::new(Box::new(JsonSettingsStore::new(cli.settings)), &mut rng);
    if let Some(name) = &cli.player1 {
        game.set_player_name(Side::Left, name);
    }
    if let Some(name) = &cli.player2 {
        game.set_player_name(Side::Right, name);
    }
    if let Some(score) = cli.score {
        game.set_total_score(score);
    }
    if cli.width.is_some() || cli.height.is_some() {
        let (width, height) = game.settings().field();
        let (width, height) = (cli.width.unwrap_or(width), cli.height.unwrap_or(height));
        game.handle_input(InputEvent::Resize { width, height }, &mut rng);
    }

    let highscore_path = game.settings().highscore_path().clone();
    let leaderboard = JsonLeaderboard::load(&highscore_path).unwrap_or_else(|e| {
        log::warn!(
            "Could not read the highscores in {}, starting a new book : {e}.",
            highscore_path.display()
        );
        JsonLeaderboard::empty(&highscore_path)
    });

    let (sender, receiver) = mpsc::channel(INPUT_QUEUE_SIZE);
    let controller = cli
        .comport
        .and_then(|path| match controller::spawn(&path, sender.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Could not open the controller on {} : {e}.", path.display());
                None
            }
        });
    let keyboard = keyboard::spawn(game.settings().paddle_step(), sender.clone())
        .unwrap_or_else(|e| {
            log::error!("Could not read the keyboard : {e}.");
            None
        });
    if cli.autostart && sender.try_send(InputEvent::PauseToggle).is_err() {
        log::warn!("Could not queue the automatic start.");
    }

    log::info!("Game started.");
    let mut game_loop = GameLoop::new(game, LogPresenter::default(), leaderboard, receiver, rng);
    let res = game_loop
        .run_until_signaled()
        .await
        .map_err(|e| log::error!("Game loop error : {e}."));

    // Dropping the loop closes the queue, so the readers can't stay blocked on it
    let game = game_loop.into_game();
    if let Some(Err(e)) = controller.map(controller::ControllerHandle::stop) {
        log::warn!("The controller was lost during the game : {e}.");
    }
    if let Some(Err(e)) = keyboard.map(keyboard::KeyboardHandle::stop) {
        log::warn!("The keyboard was lost during the game : {e}.");
    }
    if let Err(e) = game.save_settings() {
        log::error!("Could not save the settings : {e}.");
    }
    log::info!("Done, exiting.");
    res
}

/// Set up the global logger to log to stdout/stderr and to a file named as the current timestamp.
fn setup_logger(log_folder: String, console_channel: ConsoleChannel) -> io::Result<()> {
    // Frames are logged every tick, keep them out of the console. Lines end with "\r\n" as the terminal may be in
    // raw mode
    let console_config = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .format(format_log);
    let console_config = match console_channel {
        ConsoleChannel::Out => console_config.chain(fern::Output::stdout("\r\n")),
        ConsoleChannel::Err => console_config.chain(fern::Output::stderr("\r\n")),
    };

    // Configure log output in rotating log files
    let rotator = make_rotator(log_folder)?;
    let file_config = fern::Dispatch::new()
        .level(log::LevelFilter::Trace)
        .format(format_log)
        .chain(rotator as Box<dyn io::Write + Send>);

    // Finish the config. Can unwrap because we know we only set the logger once.
    fern::Dispatch::new()
        .chain(console_config)
        .chain(file_config)
        .apply()
        .unwrap();
    Ok(())
}

/// Make the rotating file middleware to give to the logger.
fn make_rotator(log_folder: String) -> io::Result<Box<FileRotate<AppendCount>>> {
    fs::create_dir_all(&log_folder)?;
    let log_file_path = log_folder + "/" + &utc_now_wrapper() + ".log";
    let rotator = Box::new(FileRotate::new(
        log_file_path,
        AppendCount::new(10),
        ContentLimit::Lines(4000),
        Compression::None,
        #[cfg(unix)]
        None,
    ));
    Ok(rotator)
}

/// The function given to the logging crate [`fern`] to format messages.
fn format_log(out: FormatCallback, message: &std::fmt::Arguments, record: &log::Record) {
    out.finish(format_args!(
        "[{} {} {}] {}",
        utc_now_wrapper(),
        record.level(),
        record.target(),
        message
    ))
}

/// Create a [`String`] of the current time in the UTC timezone, with a default in case of error.
fn utc_now_wrapper() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Iso8601::DATE_TIME)
        .unwrap_or(String::from("invalid date"))
}
