//! # Terminal Presentation
//!
//! A render thread owns all display state. It drains [`UiEvent`]s in order,
//! folds them into a [`DisplayState`] and prints whatever changed, tinted
//! with the current mood's theme.
//!
//! Content from a session other than the newest one is dropped here as
//! well, so a late result can never overwrite the current mood's quote.

use crate::chat::ChatEntry;
use crate::events::{SessionId, Status, UiEvent};
use crate::mood::{Mood, Rgb, Theme};
use crate::poller::{ContentKind, ContentOutcome};
use log::{debug, trace};
use owo_colors::OwoColorize;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Everything the screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub status: String,
    pub quote: String,
    pub lyrics: String,
    pub mood: Option<Mood>,
    pub theme: Theme,
    /// Last voice transcript, as if typed into the mood input.
    pub input: String,
    pub chat: Vec<ChatEntry>,
    newest_session: SessionId,
    closed_through: SessionId,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            status: Status::Welcome.to_string(),
            quote: placeholder(ContentKind::Quote),
            lyrics: placeholder(ContentKind::Lyrics),
            mood: None,
            theme: Theme::DEFAULT,
            input: String::new(),
            chat: Vec::new(),
            newest_session: 0,
            closed_through: 0,
        }
    }
}

fn placeholder(kind: ContentKind) -> String {
    format!("{} {}", kind.icon(), kind.placeholder())
}

/// What changed after applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Status,
    Theme,
    Content(ContentKind),
    Reset,
    Chat,
    Input,
    Ignored,
}

impl DisplayState {
    pub fn apply(&mut self, event: UiEvent) -> Change {
        match event {
            UiEvent::Status(status) => {
                self.status = status.to_string();
                Change::Status
            }
            UiEvent::Theme(mood) => {
                self.mood = mood;
                self.theme = mood.map_or(Theme::DEFAULT, Mood::theme);
                Change::Theme
            }
            UiEvent::Content {
                session,
                kind,
                outcome,
            } => {
                if session < self.newest_session || session <= self.closed_through {
                    trace!("Dropping {kind} from stale session {session}");
                    return Change::Ignored;
                }
                self.newest_session = session;
                let text = match &outcome {
                    ContentOutcome::Generated(text) => format!("{} {text}", kind.icon()),
                    ContentOutcome::Fallback { message, reason } => {
                        debug!("{kind} fallback: {reason}");
                        (*message).to_string()
                    }
                };
                match kind {
                    ContentKind::Quote => self.quote = text,
                    ContentKind::Lyrics => self.lyrics = text,
                }
                Change::Content(kind)
            }
            UiEvent::ContentReset => {
                self.closed_through = self.newest_session;
                self.quote = placeholder(ContentKind::Quote);
                self.lyrics = placeholder(ContentKind::Lyrics);
                Change::Reset
            }
            UiEvent::ChatLine(entry) => {
                self.chat.push(entry);
                Change::Chat
            }
            UiEvent::Recognized(text) => {
                self.input = text;
                Change::Input
            }
        }
    }

    /// The lines to print for `change`, uncoloured.
    #[must_use]
    pub fn lines_for(&self, change: &Change) -> Vec<String> {
        match change {
            Change::Status => vec![self.status.clone()],
            Change::Theme => match self.mood {
                Some(mood) => vec![format!("{} {} mood", self.theme.emoji, mood.title())],
                None => Vec::new(),
            },
            Change::Content(ContentKind::Quote) => vec![self.quote.clone()],
            Change::Content(ContentKind::Lyrics) => vec![self.lyrics.clone()],
            Change::Reset => vec![self.quote.clone(), self.lyrics.clone()],
            Change::Chat => self.chat.last().map(ToString::to_string).into_iter().collect(),
            Change::Input => vec![format!("> {}", self.input)],
            Change::Ignored => Vec::new(),
        }
    }
}

fn paint(line: &str, theme: Theme) -> String {
    let Rgb(fr, fg, fb) = theme.foreground;
    let Rgb(br, bg, bb) = theme.background;
    line.truecolor(fr, fg, fb).on_truecolor(br, bg, bb).to_string()
}

/// Spawn the render thread. It exits once every publisher is dropped and
/// returns the final state.
///
/// # Errors
///
/// Fails if the OS refuses to spawn the thread.
pub fn spawn_renderer(rx: Receiver<UiEvent>) -> std::io::Result<JoinHandle<DisplayState>> {
    thread::Builder::new()
        .name("moodplay-render".to_string())
        .spawn(move || {
            let mut state = DisplayState::default();
            println!("{}", paint(&state.status, state.theme));
            for event in rx {
                let change = state.apply(event);
                for line in state.lines_for(&change) {
                    let line = match change {
                        Change::Content(_) | Change::Reset => line.italic().to_string(),
                        _ => line,
                    };
                    println!("{}", paint(&line, state.theme));
                }
            }
            debug!("Render thread exiting");
            state
        })
}

/// Wait up to `grace` for the render thread to drain its queue and exit,
/// which it does once every [`crate::events::Publisher`] is dropped.
/// Returns the final state, or `None` if it is still running or panicked.
pub fn wait_for_renderer(
    renderer: JoinHandle<DisplayState>,
    grace: Duration,
) -> Option<DisplayState> {
    let deadline = Instant::now() + grace;
    while !renderer.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    if !renderer.is_finished() {
        return None;
    }
    renderer.join().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Speaker;

    fn content(session: SessionId, kind: ContentKind, text: &str) -> UiEvent {
        UiEvent::Content {
            session,
            kind,
            outcome: ContentOutcome::Generated(text.to_string()),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = DisplayState::default();
        assert_eq!(state.status, "Welcome! Share your mood to play music.");
        assert_eq!(state.quote, "💡 Your motivational quote will appear here");
        assert_eq!(state.lyrics, "🎶 Your mood-based lyrics will appear here");
        assert_eq!(state.theme, Theme::DEFAULT);
    }

    #[test]
    fn test_renderer_drains_queue_before_exit() {
        let (publisher, rx) = crate::events::Publisher::channel();
        let renderer = spawn_renderer(rx).unwrap();
        publisher.status(Status::Stopped);
        publisher.publish(UiEvent::Theme(Some(Mood::Calm)));
        drop(publisher);

        let state = wait_for_renderer(renderer, Duration::from_secs(5)).unwrap();
        assert_eq!(state.status, "Music stopped.");
        assert_eq!(state.mood, Some(Mood::Calm));
    }

    #[test]
    fn test_renderer_wait_gives_up_while_publishers_live() {
        let (publisher, rx) = crate::events::Publisher::channel();
        let renderer = spawn_renderer(rx).unwrap();
        assert!(wait_for_renderer(renderer, Duration::from_millis(30)).is_none());
        drop(publisher);
    }

    #[test]
    fn test_invalid_input_is_printed() {
        let mut state = DisplayState::default();
        let change = state.apply(UiEvent::Status(Status::InvalidInput(
            "volume must be between 0.0 and 1.0, got 11".to_string(),
        )));
        assert_eq!(
            state.lines_for(&change),
            vec!["Invalid input: volume must be between 0.0 and 1.0, got 11".to_string()]
        );
    }

    #[test]
    fn test_theme_follows_mood() {
        let mut state = DisplayState::default();
        state.apply(UiEvent::Theme(Some(Mood::Sad)));
        assert_eq!(state.theme, Mood::Sad.theme());
        state.apply(UiEvent::Theme(None));
        assert_eq!(state.theme, Theme::DEFAULT);
    }

    #[test]
    fn test_stale_session_ignored() {
        let mut state = DisplayState::default();
        state.apply(content(2, ContentKind::Quote, "new"));
        let change = state.apply(content(1, ContentKind::Quote, "old"));
        assert_eq!(change, Change::Ignored);
        assert_eq!(state.quote, "💡 new");
    }

    #[test]
    fn test_reset_restores_placeholders_and_closes_session() {
        let mut state = DisplayState::default();
        state.apply(content(3, ContentKind::Lyrics, "la la"));
        state.apply(UiEvent::ContentReset);
        assert_eq!(state.lyrics, "🎶 Your mood-based lyrics will appear here");

        assert_eq!(state.apply(content(3, ContentKind::Lyrics, "late")), Change::Ignored);
        assert_eq!(
            state.apply(content(4, ContentKind::Lyrics, "next")),
            Change::Content(ContentKind::Lyrics)
        );
    }

    #[test]
    fn test_fallback_shows_static_message() {
        let mut state = DisplayState::default();
        state.apply(UiEvent::Content {
            session: 1,
            kind: ContentKind::Quote,
            outcome: ContentOutcome::Fallback {
                message: "Couldn't fetch quote.",
                reason: "timeout".to_string(),
            },
        });
        assert_eq!(state.quote, "Couldn't fetch quote.");
    }

    #[test]
    fn test_chat_lines_accumulate() {
        let mut state = DisplayState::default();
        state.apply(UiEvent::ChatLine(ChatEntry {
            speaker: Speaker::User,
            message: "hi".to_string(),
        }));
        assert_eq!(state.lines_for(&Change::Chat), vec!["You: hi".to_string()]);
    }
}
