//! Interactive line-editor loop.
//!
//! Reads commands with rustyline and dispatches them to the [`MoodPlayer`].
//! Results are shown by the render thread, so this loop only prints help
//! and the odd direct answer.

use crate::chat::ChatSession;
use crate::cli::parse_volume;
use crate::player::MoodPlayer;
use anyhow::Result;
use log::{debug, info};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "mood> ";
const CHAT_PROMPT: &str = "chat> ";
const CLOSE_CHAT: &str = "/close";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Bare text is treated as a mood description too.
    Play(String),
    Voice,
    Stop,
    Volume(f32),
    Chat,
    Status,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl ReplCommand {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "" => ReplCommand::Empty,
            "play" => ReplCommand::Play(rest.to_string()),
            "voice" | "listen" => ReplCommand::Voice,
            "stop" => ReplCommand::Stop,
            "volume" | "vol" => match parse_volume(rest) {
                Ok(level) => ReplCommand::Volume(level),
                Err(e) => ReplCommand::Invalid(e),
            },
            "chat" => ReplCommand::Chat,
            "status" => ReplCommand::Status,
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            _ => ReplCommand::Play(line.to_string()),
        }
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  play <how you feel>  pick a song for your mood");
    println!("  voice                say how you feel instead");
    println!("  stop                 stop the music");
    println!("  volume <0.0-1.0>     set the volume");
    println!("  chat                 talk to the assistant ({CLOSE_CHAT} to leave)");
    println!("  status               what is playing");
    println!("  quit                 leave");
}

fn print_status(player: &MoodPlayer) {
    let playback = player.playback();
    match playback.now_playing() {
        Some(track) => println!(
            "{} {} ({})",
            "Playing".green(),
            track.name(),
            track.mood.title()
        ),
        None => println!("{}", "Nothing playing".yellow()),
    }
    println!("Volume: {:.0}%", player.volume() * 100.0);
    println!("Songs folder: {}", player.library().dir().display());
}

/// Run the player loop until `quit`, Ctrl-C or Ctrl-D.
///
/// # Errors
///
/// Fails if the terminal cannot be set up or read.
pub fn run(player: &MoodPlayer) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("Type how you feel, or {} for commands.", "help".bold());

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if !line.trim().is_empty() {
            let _ = rl.add_history_entry(line.as_str());
        }

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Play(text) => {
                player.play_from_text(&text);
            }
            ReplCommand::Voice => {
                if player.start_voice_capture().is_none() {
                    println!("{}", "Already listening…".yellow());
                }
            }
            ReplCommand::Stop => player.stop(),
            ReplCommand::Volume(level) => {
                player.set_volume(level);
            }
            ReplCommand::Chat => {
                let chat = player.open_chat();
                chat_loop(&mut rl, &chat)?;
                debug!("Chat closed, {} lines discarded", chat.transcript().entries().len());
            }
            ReplCommand::Status => print_status(player),
            ReplCommand::Help => print_help(),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(msg) => player.report_invalid(msg),
        }
    }

    info!("Leaving interactive mode");
    Ok(())
}

/// Send every line to `chat` until `/close`, Ctrl-C or Ctrl-D.
///
/// # Errors
///
/// Fails if the terminal cannot be read.
pub fn chat_loop(rl: &mut DefaultEditor, chat: &ChatSession) -> Result<()> {
    println!(
        "{} Type {} to go back.",
        "🤖 Chat with AI.".bold(),
        CLOSE_CHAT.italic()
    );

    loop {
        let line = match rl.readline(CHAT_PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if line.trim() == CLOSE_CHAT {
            break;
        }
        // Replies arrive on the render thread.
        chat.send(&line);
    }
    Ok(())
}

/// Standalone chat without the player.
///
/// # Errors
///
/// Fails if the terminal cannot be set up or read.
pub fn run_chat(chat: &ChatSession) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    chat_loop(&mut rl, chat)
}
