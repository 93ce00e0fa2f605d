//! # moodplay
//!
//! Music for how you feel. Describe your mood in words or out loud and a
//! matching song from your folder starts, with an AI-written quote and
//! lyrics alongside.
//!
//! ## Usage
//!
//! ```bash
//! # Interactive player
//! moodplay --songs-dir ~/Music/moods
//!
//! # Start straight away
//! moodplay play "so much energy today"
//!
//! # Just classify
//! moodplay detect "I am furious and mad"
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;

use moodplay::audio::RodioBackend;
use moodplay::chat::ChatSession;
use moodplay::cli::{self, Command};
use moodplay::completion;
use moodplay::config::{self, Credentials, Settings};
use moodplay::events::Publisher;
use moodplay::library::{Library, LibraryError};
use moodplay::llm::{LanguageModel, OpenAiClient};
use moodplay::mood::{detect_mood, Mood};
use moodplay::playback::PlaybackController;
use moodplay::player::MoodPlayer;
use moodplay::poller::PollerPool;
use moodplay::speech::{GoogleTranscriber, MicrophoneRecognizer};
use moodplay::{repl, ui};

/// How long to wait for queued output before exiting. A voice worker still
/// waiting on the network keeps the render thread alive.
const RENDER_GRACE: Duration = Duration::from_secs(2);

fn language_model(settings: &Settings, credentials: &Credentials) -> Arc<dyn LanguageModel> {
    Arc::new(OpenAiClient::new(
        settings.api_base.clone(),
        settings.model.clone(),
        credentials.openai.clone(),
        settings.request_timeout(),
    ))
}

/// Build the player and run the interactive loop, optionally starting with
/// `initial` as the first mood.
fn interactive(settings: &Settings, initial: Option<String>) -> Result<()> {
    let credentials = Credentials::from_env();
    let songs_dir = settings.resolved_songs_dir()?;
    info!("Songs folder: {}", songs_dir.display());

    let (publisher, rx) = Publisher::channel();
    let renderer = ui::spawn_renderer(rx).context("Failed to start the display thread")?;

    let llm = language_model(settings, &credentials);
    let audio = RodioBackend::spawn(settings.initial_volume)
        .context("Failed to open the audio output device")?;
    let pool = PollerPool::new(Arc::clone(&llm), publisher.clone(), settings.poller_settings());
    let playback = PlaybackController::new(
        Box::new(audio),
        pool,
        settings.initial_volume,
        publisher.clone(),
    );

    let transcriber = GoogleTranscriber::new(
        credentials.speech.clone(),
        settings.speech_language.clone(),
        settings.request_timeout(),
    );
    let recognizer = MicrophoneRecognizer::new(settings.input_device.clone(), transcriber);

    let player = MoodPlayer::new(
        Library::new(songs_dir),
        playback,
        llm,
        Box::new(recognizer),
        settings.listen_settings(),
        publisher,
    );

    if let Some(text) = initial {
        player.play_from_text(&text);
    }

    let result = repl::run(&player);
    player.shutdown();
    drop(player);
    if ui::wait_for_renderer(renderer, RENDER_GRACE).is_none() {
        debug!("Display thread did not finish in time");
    }
    result
}

fn chat_only(settings: &Settings) -> Result<()> {
    let credentials = Credentials::from_env();
    let (publisher, rx) = Publisher::channel();
    let renderer = ui::spawn_renderer(rx).context("Failed to start the display thread")?;

    let chat = ChatSession::new(language_model(settings, &credentials), publisher);
    let result = repl::run_chat(&chat);
    drop(chat);
    if ui::wait_for_renderer(renderer, RENDER_GRACE).is_none() {
        debug!("Display thread did not finish in time");
    }
    result
}

fn detect(text: &str) {
    let mood = detect_mood(text);
    let lowered = text.to_lowercase();
    match mood.matches(&lowered) {
        Some(keyword) => println!("{} {} (keyword `{keyword}')", mood.theme().emoji, mood.title().bold()),
        None => println!("{} {} (no keyword, default)", mood.theme().emoji, mood.title().bold()),
    }
}

fn list_tracks(settings: &Settings, only: Option<Mood>) -> Result<()> {
    let library = Library::new(settings.resolved_songs_dir()?);
    let moods: Vec<Mood> = only.map_or_else(|| Mood::ALL.to_vec(), |mood| vec![mood]);

    for mood in moods {
        println!("{} {}", mood.theme().emoji, mood.title().bold());
        match library.tracks_for(mood) {
            Ok(tracks) if tracks.is_empty() => println!("  {}", "(none)".italic()),
            Ok(tracks) => {
                for track in tracks {
                    println!("  {}", track.name());
                }
            }
            Err(e @ LibraryError::Io { .. }) => return Err(e).context("Failed to list tracks"),
            Err(e) => println!("  {e}"),
        }
    }
    Ok(())
}

fn list_devices(settings: &Settings) -> Result<()> {
    let devices = MicrophoneRecognizer::list_devices().context("Failed to list input devices")?;
    if devices.is_empty() {
        println!("{}", "No input devices found".yellow());
    }
    for name in devices {
        let chosen = settings.input_device.as_deref() == Some(name.as_str());
        if chosen {
            println!("* {}", name.bold());
        } else {
            println!("  {name}");
        }
    }
    Ok(())
}

fn show_themes() {
    for mood in Mood::ALL {
        let theme = mood.theme();
        println!(
            "{} {:<10} bg {} fg {}  {}",
            theme.emoji,
            mood.title(),
            theme.background,
            theme.foreground,
            mood.keywords().join(", ")
        );
    }
}

/// Main entry point for moodplay.
///
/// Initializes logging, parses command-line arguments, loads settings and
/// routes to the chosen command.
///
/// # Logging
///
/// Controlled via `RUST_LOG`:
/// - `RUST_LOG=debug moodplay` - Enable debug logging
/// - `RUST_LOG=moodplay::poller=trace moodplay` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();
    config::load_dotenv();

    let args = cli::Args::parse();
    let settings = Settings::load(args.config.as_deref())?
        .with_overrides(args.songs_dir.clone(), args.volume);
    debug!("{settings:?}");

    match args.command.unwrap_or(Command::Repl) {
        Command::Repl => interactive(&settings, None)?,
        Command::Play { text } => interactive(&settings, Some(text.join(" ")))?,
        Command::Detect { text } => detect(&text.join(" ")),
        Command::Tracks { mood } => list_tracks(&settings, mood)?,
        Command::Chat => chat_only(&settings)?,
        Command::Themes => show_themes(),
        Command::Devices => list_devices(&settings)?,
        Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
    }

    Ok(())
}
