//! Speech-to-text collaborator.
//!
//! [`SpeechRecognizer`] mirrors the three steps of a spoken mood check:
//! calibrate against room noise, wait for an utterance, transcribe it.
//!
//! - [`detector`] - energy-based phrase detection over PCM frames
//! - [`microphone`] - cpal capture feeding the detector
//! - [`google`] - Google Speech-to-Text REST transcription

pub mod detector;
pub mod google;
pub mod microphone;

pub use google::GoogleTranscriber;
pub use microphone::MicrophoneRecognizer;

use std::time::Duration;

/// Mono 16-bit PCM of one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl Utterance {
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// Each variant maps to its own user-facing status.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("no speech detected before timeout")]
    Timeout,

    #[error("could not understand the audio")]
    Unintelligible,

    #[error("speech service unreachable: {0}")]
    ServiceUnreachable(String),

    #[error("microphone error: {0}")]
    Device(String),
}

/// Timing knobs for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenSettings {
    pub calibration: Duration,
    /// How long to wait for speech to start.
    pub timeout: Duration,
    /// Hard cap on utterance length once speech started.
    pub phrase_limit: Duration,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
        }
    }
}

pub trait SpeechRecognizer: Send {
    /// Sample ambient noise to set the speech threshold.
    fn calibrate(&mut self, duration: Duration) -> Result<(), SpeechError>;

    /// Block until an utterance is captured.
    ///
    /// Fails with [`SpeechError::Timeout`] if nothing louder than the
    /// calibrated threshold starts within `timeout`.
    fn listen(&mut self, timeout: Duration, phrase_limit: Duration)
        -> Result<Utterance, SpeechError>;

    fn transcribe(&self, utterance: &Utterance) -> Result<String, SpeechError>;
}

impl<R: SpeechRecognizer + ?Sized> SpeechRecognizer for Box<R> {
    fn calibrate(&mut self, duration: Duration) -> Result<(), SpeechError> {
        (**self).calibrate(duration)
    }

    fn listen(
        &mut self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Utterance, SpeechError> {
        (**self).listen(timeout, phrase_limit)
    }

    fn transcribe(&self, utterance: &Utterance) -> Result<String, SpeechError> {
        (**self).transcribe(utterance)
    }
}
