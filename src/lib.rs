//! Mood-driven music player.
//!
//! Type (or say) how you feel; moodplay detects a mood from keywords, plays
//! a random song whose file name contains that mood and, while it plays,
//! keeps asking a language model for a fitting quote and a couple of lines
//! of lyrics.
//!
//! Core modules:
//! - [`mood`] - Keyword mood classification and display themes
//! - [`library`] - Picking a track for a mood from a flat folder
//! - [`playback`] - Audio plus the poller session that goes with it
//! - [`poller`] - Cancellable AI quote and lyrics workers
//! - [`voice`] - Spoken mood capture
//! - [`chat`] - Single-turn assistant chat
//! - [`player`] - The facade the terminal UI drives
//!
//! ### Collaborators
//!
//! - [`audio`] - Output backend trait and its rodio implementation
//! - [`llm`] - Chat-completion trait and an OpenAI-compatible client
//! - [`speech`] - Microphone capture and speech-to-text
//!
//! ### Supporting Modules
//!
//! - [`config`] - Settings file and API keys
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`events`] - Events from workers to the render thread
//! - [`ui`] - Render thread and display state
//! - [`repl`] - Interactive command loop
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use moodplay::library::Library;
//! use moodplay::mood::detect_mood;
//!
//! let mood = detect_mood("long week, I need a boost");
//! let track = Library::new("songs").select_track(mood)?;
//! println!("{mood}: {}", track.name());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Threads
//!
//! The control thread runs the line editor. A render thread owns all
//! display state and is fed through an `mpsc` channel. rodio's output
//! stream lives on its own audio thread. Voice capture, each poller and
//! each chat request run on short-lived workers; pollers belong to a
//! [`poller::PollerPool`] and are cancelled through a per-session
//! [`poller::CancelToken`].
//!
//! ## Error Handling
//!
//! Domain failures are typed ([`library::LibraryError`],
//! [`speech::SpeechError`], [`llm::LlmError`], [`playback::PlaybackError`])
//! and turned into status messages. Only startup problems such as a
//! malformed settings file end the program, via `anyhow`.

pub mod audio;
pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod events;
pub mod library;
pub mod llm;
pub mod mood;
pub mod playback;
pub mod player;
pub mod poller;
pub mod repl;
pub mod speech;
pub mod ui;
pub mod voice;
