//! Playback controller.
//!
//! Ties the audio backend to the poller pool: one playing track means one
//! live poller session. Every method takes `&self` so the REPL and the voice
//! worker can share the controller behind an `Arc`.

use crate::audio::{AudioBackend, AudioError};
use crate::events::{Publisher, SessionId, UiEvent};
use crate::library::Track;
use crate::mood::Mood;
use crate::poller::PollerPool;
use log::{debug, info, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("{0}")]
    Load(#[source] AudioError),

    #[error("could not start playback: {0}")]
    Start(#[source] AudioError),
}

struct State {
    audio: Box<dyn AudioBackend>,
    pool: PollerPool,
    volume: f32,
    now_playing: Option<Track>,
}

pub struct PlaybackController {
    state: Mutex<State>,
    publisher: Publisher,
}

impl PlaybackController {
    pub fn new(
        mut audio: Box<dyn AudioBackend>,
        pool: PollerPool,
        initial_volume: f32,
        publisher: Publisher,
    ) -> Self {
        let volume = initial_volume.clamp(0.0, 1.0);
        audio.set_volume(volume);
        Self {
            state: Mutex::new(State {
                audio,
                pool,
                volume,
                now_playing: None,
            }),
            publisher,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace whatever is playing with `track` and start its pollers.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError`] if the file cannot be loaded or started.
    /// The controller is left stopped and the old content is reset.
    pub fn play(&self, track: &Track) -> Result<SessionId, PlaybackError> {
        let mut state = self.state();
        state.pool.cancel_all();
        state.now_playing = None;

        if let Err(e) = state.audio.load(&track.path) {
            warn!("Loading `{}' failed: {e}", track.path.display());
            state.audio.stop();
            self.publisher.publish(UiEvent::ContentReset);
            return Err(PlaybackError::Load(e));
        }

        let volume = state.volume;
        state.audio.set_volume(volume);
        if let Err(e) = state.audio.play() {
            warn!("Starting `{}' failed: {e}", track.path.display());
            state.audio.stop();
            self.publisher.publish(UiEvent::ContentReset);
            return Err(PlaybackError::Start(e));
        }

        let session = state.pool.start(track.mood);
        state.now_playing = Some(track.clone());
        info!("Playing `{}' as session {session}", track.name());
        Ok(session)
    }

    /// Halt audio and cancel the pollers. Safe to call while idle.
    ///
    /// Once this returns no poller of the stopped session can publish.
    pub fn stop(&self) {
        let mut state = self.state();
        state.audio.stop();
        if state.pool.cancel_all() {
            debug!("Pollers cancelled");
        }
        state.now_playing = None;
        self.publisher.publish(UiEvent::ContentReset);
    }

    /// Clamp `level` to `[0.0, 1.0]` and apply it now. Returns the applied
    /// level.
    pub fn set_volume(&self, level: f32) -> f32 {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        let mut state = self.state();
        state.volume = level;
        state.audio.set_volume(level);
        level
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        self.state().audio.volume()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state().now_playing.is_some()
    }

    #[must_use]
    pub fn now_playing(&self) -> Option<Track> {
        self.state().now_playing.clone()
    }

    /// Session id and mood of the running pollers.
    #[must_use]
    pub fn session(&self) -> Option<(SessionId, Mood)> {
        self.state().pool.current()
    }

    /// Stop and wait for every worker to exit.
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.audio.stop();
        state.now_playing = None;
        state.pool.join();
        info!("Playback shut down");
    }
}
