//! Events flowing from the core to the presentation layer.
//!
//! Workers never touch display state. They publish [`UiEvent`]s through a
//! [`Publisher`] and the render thread applies them in order.

use crate::chat::ChatEntry;
use crate::mood::Mood;
use crate::poller::{ContentKind, ContentOutcome};
use std::fmt;
use std::sync::mpsc;

/// Identifies one play..stop span. Content events carry it so stale ones
/// can be told apart from the current session's.
pub type SessionId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Status(Status),
    /// `None` restores the default theme.
    Theme(Option<Mood>),
    Content {
        session: SessionId,
        kind: ContentKind,
        outcome: ContentOutcome,
    },
    /// Quote and lyrics go back to their placeholders.
    ContentReset,
    ChatLine(ChatEntry),
    /// A voice transcript, shown in the mood input.
    Recognized(String),
}

/// Everything the status line can say.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Welcome,
    EmptyInput,
    /// A command the REPL couldn't make sense of.
    InvalidInput(String),
    Playing { mood: Mood, track: String },
    NoTracks { mood: Mood },
    LibraryUnavailable(String),
    PlaybackFailed(String),
    Stopped,
    Volume(f32),
    Listening,
    Processing,
    Recognized(String),
    SpeechTimeout,
    Unintelligible,
    SpeechService(String),
    SpeechDevice(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Welcome => write!(f, "Welcome! Share your mood to play music."),
            Status::EmptyInput => write!(f, "Please enter your mood or feelings."),
            Status::InvalidInput(e) => write!(f, "Invalid input: {e}"),
            Status::Playing { mood, track } => {
                write!(f, "Mood: {} | Playing: {track}", mood.title())
            }
            Status::NoTracks { mood } => write!(f, "No '{mood}' songs found."),
            Status::LibraryUnavailable(e) => write!(f, "Error playing music: {e}"),
            Status::PlaybackFailed(e) => write!(f, "Error playing music: {e}"),
            Status::Stopped => write!(f, "Music stopped."),
            Status::Volume(level) => write!(f, "Volume: {:.0}%", level * 100.0),
            Status::Listening => write!(f, "🎙️ Listening..."),
            Status::Processing => write!(f, "🎧 Processing..."),
            Status::Recognized(text) => write!(f, "Recognized: '{text}'"),
            Status::SpeechTimeout => write!(f, "⌛ Timeout: No speech detected."),
            Status::Unintelligible => write!(f, "😕 Could not understand the audio."),
            Status::SpeechService(e) => write!(f, "🔌 API Error: {e}"),
            Status::SpeechDevice(e) => write!(f, "⚠️ Error: {e}"),
        }
    }
}

/// Cloneable sending half of the UI event channel.
///
/// Sending never fails from the caller's point of view: once the render
/// thread is gone there is nobody left to show anything to.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: mpsc::Sender<UiEvent>,
}

impl Publisher {
    /// New publisher and the receiver the render thread drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("UI receiver dropped, event discarded");
        }
    }

    pub fn status(&self, status: Status) {
        self.publish(UiEvent::Status(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        let playing = Status::Playing {
            mood: Mood::Energetic,
            track: "energetic_run.mp3".to_string(),
        };
        assert_eq!(playing.to_string(), "Mood: Energetic | Playing: energetic_run.mp3");
        assert_eq!(Status::NoTracks { mood: Mood::Sad }.to_string(), "No 'sad' songs found.");
        assert_eq!(Status::Volume(0.5).to_string(), "Volume: 50%");
        assert_eq!(
            Status::InvalidInput("volume must be between 0.0 and 1.0, got 11".into()).to_string(),
            "Invalid input: volume must be between 0.0 and 1.0, got 11"
        );
    }

    #[test]
    fn test_publish_after_receiver_dropped_is_silent() {
        let (publisher, rx) = Publisher::channel();
        drop(rx);
        publisher.status(Status::Stopped);
    }

    #[test]
    fn test_events_arrive_in_order() {
        let (publisher, rx) = Publisher::channel();
        publisher.status(Status::Listening);
        publisher.publish(UiEvent::ContentReset);
        assert_eq!(rx.recv().unwrap(), UiEvent::Status(Status::Listening));
        assert_eq!(rx.recv().unwrap(), UiEvent::ContentReset);
    }
}
