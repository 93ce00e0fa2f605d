//! # Command-Line Interface Module
//!
//! Clap derive definitions for moodplay. Without a subcommand the
//! interactive player starts.
//!
//! ## Commands
//!
//! - `repl`: interactive player (default)
//! - `play`: detect a mood, start playing, then go interactive
//! - `detect`: print the mood a text maps to
//! - `tracks`: list the songs each mood would pick from
//! - `chat`: chat with the assistant only
//! - `themes`: show every mood's keywords and colours
//!
//! ## Examples
//!
//! ```bash
//! moodplay --songs-dir ~/Music/moods
//! moodplay play "long day, I need a boost"
//! moodplay detect "I am furious and mad"
//! moodplay tracks --mood calm
//! ```

use crate::mood::Mood;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "moodplay")]
#[command(about = "moodplay: music for how you feel, with AI quotes and lyrics")]
#[command(version)]
pub struct Args {
    /// Settings file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Folder of mood-named audio files
    ///
    /// A file plays for a mood when its name contains the mood, e.g.
    /// `rainy_sad_piano.mp3`. Overrides the settings file.
    #[arg(long, global = true, env = "MOODPLAY_SONGS_DIR", value_name = "DIR")]
    pub songs_dir: Option<PathBuf>,

    /// Starting volume between 0.0 and 1.0
    #[arg(long, global = true, value_parser = parse_volume)]
    pub volume: Option<f32>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start the interactive player
    Repl,

    /// Detect the mood in TEXT, start playing, then go interactive
    Play {
        /// How you feel, in your own words
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Print the mood TEXT maps to and the keyword that decided it
    Detect {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List candidate tracks per mood
    Tracks {
        /// Only this mood
        #[arg(long, value_enum)]
        mood: Option<Mood>,
    },

    /// Chat with the assistant without playing music
    Chat,

    /// Show every mood's keywords, colours and emoji
    Themes,

    /// List microphones usable as `input_device` in the config file
    Devices,

    /// Generate shell completions
    ///
    /// Usage: moodplay completion bash > ~/.local/share/bash-completion/completions/moodplay
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Parse a volume level, rejecting values outside `[0.0, 1.0]`.
///
/// # Errors
///
/// Returns a message for non-numbers and out-of-range values.
pub fn parse_volume(raw: &str) -> Result<f32, String> {
    let level: f32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}' is not a number"))?;
    if (0.0..=1.0).contains(&level) {
        Ok(level)
    } else {
        Err(format!("volume must be between 0.0 and 1.0, got {level}"))
    }
}
