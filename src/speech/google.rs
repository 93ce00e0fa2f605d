//! Google Speech-to-Text (REST v1) transcription.
//!
//! Audio is sent inline as base64 LINEAR16 in a JSON body, which keeps the
//! request a plain `send_json` call.

use super::{SpeechError, Utterance};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://speech.googleapis.com/v1/speech:recognize";

pub struct GoogleTranscriber {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
    language: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl GoogleTranscriber {
    pub fn new(api_key: Option<String>, language: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            language: language.into(),
        }
    }

    fn request_body(&self, utterance: &Utterance) -> serde_json::Value {
        let bytes: Vec<u8> = utterance
            .samples
            .iter()
            .flat_map(|sample| sample.to_le_bytes())
            .collect();

        json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": utterance.sample_rate,
                "languageCode": self.language,
            },
            "audio": {
                "content": STANDARD.encode(bytes),
            },
        })
    }

    /// Recognize `utterance`.
    ///
    /// # Errors
    ///
    /// [`SpeechError::ServiceUnreachable`] for missing credentials, network
    /// and HTTP failures; [`SpeechError::Unintelligible`] when the service
    /// returns no transcript.
    pub fn transcribe(&self, utterance: &Utterance) -> Result<String, SpeechError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            SpeechError::ServiceUnreachable(
                "no speech API key configured (set MOODPLAY_SPEECH_API_KEY)".to_string(),
            )
        })?;

        debug!(
            "Sending {:.1}s of audio for recognition",
            utterance.duration().as_secs_f32()
        );

        let response = match self
            .agent
            .post(&self.endpoint)
            .query("key", api_key)
            .send_json(self.request_body(utterance))
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(SpeechError::ServiceUnreachable(format!("HTTP {status}")));
            }
            Err(e) => return Err(SpeechError::ServiceUnreachable(e.to_string())),
        };

        let parsed: RecognizeResponse = response
            .into_json()
            .map_err(|e| SpeechError::ServiceUnreachable(format!("bad response: {e}")))?;
        best_transcript(parsed)
    }
}

fn best_transcript(response: RecognizeResponse) -> Result<String, SpeechError> {
    let transcript = response
        .results
        .into_iter()
        .filter_map(|result| result.alternatives.into_iter().next())
        .map(|alternative| alternative.transcript.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if transcript.is_empty() {
        Err(SpeechError::Unintelligible)
    } else {
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_encodes_little_endian_pcm() {
        let transcriber = GoogleTranscriber::new(Some("k".into()), "en-US", Duration::from_secs(1));
        let utterance = Utterance {
            samples: vec![1, -1],
            sample_rate: 44_100,
        };
        let body = transcriber.request_body(&utterance);
        assert_eq!(body["config"]["sampleRateHertz"], 44_100);
        assert_eq!(body["config"]["languageCode"], "en-US");
        // [0x01, 0x00, 0xFF, 0xFF]
        assert_eq!(body["audio"]["content"], "AQD//w==");
    }

    #[test]
    fn test_best_transcript_joins_results() {
        let response: RecognizeResponse = serde_json::from_str(
            r#"{"results":[
                {"alternatives":[{"transcript":"I feel ","confidence":0.9},{"transcript":"eye feel"}]},
                {"alternatives":[{"transcript":" really happy"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(best_transcript(response).unwrap(), "I feel really happy");
    }

    #[test]
    fn test_empty_response_is_unintelligible() {
        let response: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(best_transcript(response), Err(SpeechError::Unintelligible)));
    }

    #[test]
    fn test_missing_key_is_service_error() {
        let transcriber = GoogleTranscriber::new(None, "en-US", Duration::from_secs(1));
        let err = transcriber.transcribe(&Utterance::default()).unwrap_err();
        assert!(matches!(err, SpeechError::ServiceUnreachable(_)));
    }
}
