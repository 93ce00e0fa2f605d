//! # Mood Player
//!
//! The facade the presentation layer drives. Every action reports its
//! outcome as events; nothing here prints.

use crate::chat::ChatSession;
use crate::events::{Publisher, SessionId, Status, UiEvent};
use crate::library::{Library, LibraryError};
use crate::llm::LanguageModel;
use crate::mood::{detect_mood, Mood};
use crate::playback::PlaybackController;
use crate::speech::{ListenSettings, SpeechRecognizer};
use crate::voice::{failure_status, VoiceCapture};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

type SharedVoice = Arc<Mutex<VoiceCapture<Box<dyn SpeechRecognizer>>>>;

/// Clears the capturing flag when the voice worker exits, panics included.
struct CaptureGuard(Arc<AtomicBool>);

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State shared with the voice worker.
struct Core {
    library: Library,
    playback: PlaybackController,
    publisher: Publisher,
}

impl Core {
    fn play_mood(&self, mood: Mood) -> Option<SessionId> {
        let track = match self.library.select_track(mood) {
            Ok(track) => track,
            Err(LibraryError::NotFound { .. }) => {
                info!("No tracks for `{mood}'");
                self.publisher.status(Status::NoTracks { mood });
                return None;
            }
            Err(e) => {
                warn!("{e}");
                self.publisher.status(Status::LibraryUnavailable(e.to_string()));
                return None;
            }
        };

        match self.playback.play(&track) {
            Ok(session) => {
                self.publisher.status(Status::Playing {
                    mood,
                    track: track.name(),
                });
                self.publisher.publish(UiEvent::Theme(Some(mood)));
                Some(session)
            }
            Err(e) => {
                error!("{e}");
                self.publisher.status(Status::PlaybackFailed(e.to_string()));
                None
            }
        }
    }
}

pub struct MoodPlayer {
    core: Arc<Core>,
    llm: Arc<dyn LanguageModel>,
    voice: SharedVoice,
    capturing: Arc<AtomicBool>,
}

impl MoodPlayer {
    pub fn new(
        library: Library,
        playback: PlaybackController,
        llm: Arc<dyn LanguageModel>,
        recognizer: Box<dyn SpeechRecognizer>,
        listen: ListenSettings,
        publisher: Publisher,
    ) -> Self {
        let voice = VoiceCapture::new(recognizer, listen, publisher.clone());
        Self {
            core: Arc::new(Core {
                library,
                playback,
                publisher,
            }),
            llm,
            voice: Arc::new(Mutex::new(voice)),
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Detect a mood in `text` and play a matching track.
    ///
    /// Blank input only publishes a prompt to type something.
    pub fn play_from_text(&self, text: &str) -> Option<SessionId> {
        if text.trim().is_empty() {
            self.core.publisher.status(Status::EmptyInput);
            return None;
        }
        let mood = detect_mood(text);
        self.play_mood(mood)
    }

    pub fn play_mood(&self, mood: Mood) -> Option<SessionId> {
        self.core.play_mood(mood)
    }

    /// Show a bad-input message on the status line.
    pub fn report_invalid(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Rejected input: {message}");
        self.core.publisher.status(Status::InvalidInput(message));
    }

    pub fn stop(&self) {
        self.core.playback.stop();
        self.core.publisher.status(Status::Stopped);
    }

    /// Returns the level actually applied.
    pub fn set_volume(&self, level: f32) -> f32 {
        let applied = self.core.playback.set_volume(level);
        self.core.publisher.status(Status::Volume(applied));
        applied
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        self.core.playback.volume()
    }

    /// Listen for a spoken mood on a worker thread, then play it like
    /// typed input. Returns `None` if a capture is already running.
    pub fn start_voice_capture(&self) -> Option<JoinHandle<Option<SessionId>>> {
        if self
            .capturing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Voice capture already in progress");
            return None;
        }
        let guard = CaptureGuard(Arc::clone(&self.capturing));
        let voice = Arc::clone(&self.voice);
        let core = Arc::clone(&self.core);

        let spawned = thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || {
                let _guard = guard;
                let result = {
                    let mut capture = voice.lock().unwrap_or_else(PoisonError::into_inner);
                    capture.capture_and_classify()
                };
                match result {
                    Ok((_, mood)) => core.play_mood(mood),
                    Err(e) => {
                        warn!("Voice capture failed: {e}");
                        core.publisher.status(failure_status(&e));
                        None
                    }
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn voice worker: {e}");
                self.core
                    .publisher
                    .status(Status::SpeechDevice(e.to_string()));
                None
            }
        }
    }

    /// A fresh chat with an empty transcript.
    #[must_use]
    pub fn open_chat(&self) -> ChatSession {
        ChatSession::new(Arc::clone(&self.llm), self.core.publisher.clone())
    }

    #[must_use]
    pub fn library(&self) -> &Library {
        &self.core.library
    }

    #[must_use]
    pub fn playback(&self) -> &PlaybackController {
        &self.core.playback
    }

    /// Stop playback and join every worker.
    pub fn shutdown(&self) {
        self.core.playback.shutdown();
    }
}
