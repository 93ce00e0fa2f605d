//! One-shot voice mood capture.
//!
//! Calibrate, listen, transcribe, classify. Progress goes out as status
//! events so the UI can show listening/processing while the worker blocks.

use crate::events::{Publisher, Status, UiEvent};
use crate::mood::{detect_mood, Mood};
use crate::speech::{ListenSettings, SpeechError, SpeechRecognizer};
use log::{debug, info};

pub struct VoiceCapture<R: SpeechRecognizer> {
    recognizer: R,
    settings: ListenSettings,
    publisher: Publisher,
}

impl<R: SpeechRecognizer> VoiceCapture<R> {
    pub fn new(recognizer: R, settings: ListenSettings, publisher: Publisher) -> Self {
        Self {
            recognizer,
            settings,
            publisher,
        }
    }

    /// Capture one utterance and detect the mood in it.
    ///
    /// Publishes `Listening` before the microphone opens, `Processing`
    /// before transcription and the transcript once recognized.
    ///
    /// # Errors
    ///
    /// Whatever the recognizer reports. The caller turns it into a status.
    pub fn capture_and_classify(&mut self) -> Result<(String, Mood), SpeechError> {
        self.publisher.status(Status::Listening);
        self.recognizer.calibrate(self.settings.calibration)?;
        let utterance = self
            .recognizer
            .listen(self.settings.timeout, self.settings.phrase_limit)?;
        debug!("Utterance of {:?}", utterance.duration());

        self.publisher.status(Status::Processing);
        let text = self.recognizer.transcribe(&utterance)?;
        info!("Recognized `{text}'");

        self.publisher.publish(UiEvent::Recognized(text.clone()));
        self.publisher.status(Status::Recognized(text.clone()));

        let mood = detect_mood(&text);
        Ok((text, mood))
    }
}

/// Status line for a failed capture.
#[must_use]
pub fn failure_status(err: &SpeechError) -> Status {
    match err {
        SpeechError::Timeout => Status::SpeechTimeout,
        SpeechError::Unintelligible => Status::Unintelligible,
        SpeechError::ServiceUnreachable(e) => Status::SpeechService(e.clone()),
        SpeechError::Device(e) => Status::SpeechDevice(e.clone()),
    }
}
