//! Single-turn chat with the language model.
//!
//! Every message is sent on its own with a fixed preamble; earlier lines are
//! kept only for display.

use crate::events::{Publisher, UiEvent};
use crate::llm::{CompletionRequest, LanguageModel};
use log::{debug, error, warn};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

const PREAMBLE: &str = "You are a kind and empathetic AI assistant.";
const FAILURE_NOTICE: &str = "Sorry, something went wrong.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("You"),
            Speaker::Assistant => f.write_str("AI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub speaker: Speaker,
    pub message: String,
}

impl fmt::Display for ChatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.message)
    }
}

/// Append-only log of one chat window.
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    entries: Vec<ChatEntry>,
}

impl ChatTranscript {
    pub fn push(&mut self, speaker: Speaker, message: impl Into<String>) -> ChatEntry {
        let entry = ChatEntry {
            speaker,
            message: message.into(),
        };
        self.entries.push(entry.clone());
        entry
    }

    #[must_use]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The transcript lives as long as the session; dropping it discards the
/// conversation.
pub struct ChatSession {
    llm: Arc<dyn LanguageModel>,
    publisher: Publisher,
    transcript: Arc<Mutex<ChatTranscript>>,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LanguageModel>, publisher: Publisher) -> Self {
        Self {
            llm,
            publisher,
            transcript: Arc::default(),
        }
    }

    /// Append `message` and request a reply on a worker thread.
    ///
    /// Returns `None` for blank input, which is ignored entirely.
    pub fn send(&self, message: &str) -> Option<JoinHandle<()>> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }

        self.append(&self.transcript, Speaker::User, message);

        let llm = Arc::clone(&self.llm);
        let publisher = self.publisher.clone();
        let transcript = Arc::clone(&self.transcript);
        let request = CompletionRequest::new(100, 0.8)
            .system(PREAMBLE)
            .user(message);

        let spawned = thread::Builder::new()
            .name("chat-reply".to_string())
            .spawn(move || {
                let reply = match llm.complete(&request) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Chat request failed: {e}");
                        FAILURE_NOTICE.to_string()
                    }
                };
                let entry = lock(&transcript).push(Speaker::Assistant, reply);
                publisher.publish(UiEvent::ChatLine(entry));
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn chat worker: {e}");
                self.append(&self.transcript, Speaker::Assistant, FAILURE_NOTICE);
                None
            }
        }
    }

    /// Snapshot of the conversation so far.
    #[must_use]
    pub fn transcript(&self) -> ChatTranscript {
        lock(&self.transcript).clone()
    }

    fn append(&self, transcript: &Mutex<ChatTranscript>, speaker: Speaker, message: &str) {
        let entry = lock(transcript).push(speaker, message);
        debug!("chat {entry}");
        self.publisher.publish(UiEvent::ChatLine(entry));
    }
}

fn lock(transcript: &Mutex<ChatTranscript>) -> std::sync::MutexGuard<'_, ChatTranscript> {
    transcript.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, Role};

    struct Parrot;

    impl LanguageModel for Parrot {
        fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            assert_eq!(request.messages[0].role, Role::System);
            assert_eq!(request.max_tokens, 100);
            Ok(format!("you said {}", request.messages[1].content))
        }
    }

    struct Offline;

    impl LanguageModel for Offline {
        fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::MissingApiKey)
        }
    }

    #[test]
    fn test_blank_message_ignored() {
        let (publisher, rx) = Publisher::channel();
        let chat = ChatSession::new(Arc::new(Parrot), publisher);
        assert!(chat.send("   ").is_none());
        assert!(chat.transcript().entries().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reply_appended_after_user_line() {
        let (publisher, rx) = Publisher::channel();
        let chat = ChatSession::new(Arc::new(Parrot), publisher);
        chat.send(" hello ").unwrap().join().unwrap();

        assert_eq!(chat.transcript().render(), "You: hello\nAI: you said hello");
        let lines: Vec<UiEvent> = rx.try_iter().collect();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_failure_notice() {
        let (publisher, _rx) = Publisher::channel();
        let chat = ChatSession::new(Arc::new(Offline), publisher);
        chat.send("anyone there?").unwrap().join().unwrap();

        let transcript = chat.transcript();
        let last = transcript.entries().last().unwrap();
        assert_eq!(last.speaker, Speaker::Assistant);
        assert_eq!(last.message, "Sorry, something went wrong.");
    }
}
