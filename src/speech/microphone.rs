//! Microphone capture via cpal.
//!
//! Every call opens the input stream, downmixes to mono f32 on the cpal
//! callback thread and ships chunks back over a channel. The stream is
//! dropped before the call returns, so nothing keeps the microphone open
//! between captures.

use super::detector::{rms, threshold_from_ambient, to_pcm16, Phase, PhraseDetector};
use super::{GoogleTranscriber, SpeechError, SpeechRecognizer, Utterance};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Speech threshold before calibration has run.
const UNCALIBRATED_THRESHOLD: f32 = 0.02;

pub struct MicrophoneRecognizer {
    device_name: Option<String>,
    threshold: f32,
    transcriber: GoogleTranscriber,
}

struct OpenInput {
    // Held so the stream keeps running; dropped to close the device.
    _stream: Stream,
    chunks: Receiver<Vec<f32>>,
    sample_rate: u32,
}

impl MicrophoneRecognizer {
    /// `device_name` of `None` uses the system default input.
    pub fn new(device_name: Option<String>, transcriber: GoogleTranscriber) -> Self {
        Self {
            device_name,
            threshold: UNCALIBRATED_THRESHOLD,
            transcriber,
        }
    }

    /// Names of available input devices.
    ///
    /// # Errors
    ///
    /// Fails if the audio host cannot enumerate devices.
    pub fn list_devices() -> Result<Vec<String>, SpeechError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| SpeechError::Device(e.to_string()))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn open_input(&self) -> Result<OpenInput, SpeechError> {
        let host = cpal::default_host();
        let device = match &self.device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| SpeechError::Device(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| SpeechError::Device(format!("input device '{name}' not found")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| SpeechError::Device("no microphone available".to_string()))?,
        };

        let supported = device
            .default_input_config()
            .map_err(|e| SpeechError::Device(e.to_string()))?;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.config();
        let sample_rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));
        debug!("Input config: {format:?} {sample_rate}Hz x{channels}");

        let (tx, chunks) = mpsc::channel::<Vec<f32>>();
        let err_fn = |err| warn!("Input stream error: {err}");

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, |s| s));
                },
                err_fn,
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, |s| f32::from(s) / 32_768.0));
                },
                err_fn,
                None,
            ),
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, |s| {
                        (f32::from(s) - 32_768.0) / 32_768.0
                    }));
                },
                err_fn,
                None,
            ),
            other => {
                return Err(SpeechError::Device(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|e| SpeechError::Device(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SpeechError::Device(e.to_string()))?;

        Ok(OpenInput {
            _stream: stream,
            chunks,
            sample_rate,
        })
    }
}

fn downmix<T: Copy>(data: &[T], channels: usize, convert: impl Fn(T) -> f32) -> Vec<f32> {
    data.chunks(channels)
        .map(|frame| frame.iter().map(|&s| convert(s)).sum::<f32>() / frame.len() as f32)
        .collect()
}

impl SpeechRecognizer for MicrophoneRecognizer {
    fn calibrate(&mut self, duration: Duration) -> Result<(), SpeechError> {
        let input = self.open_input()?;
        let deadline = Instant::now() + duration;
        let mut ambient = Vec::new();

        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match input.chunks.recv_timeout(remaining) {
                Ok(chunk) => ambient.extend(chunk),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SpeechError::Device("input stream closed".to_string()))
                }
            }
        }

        self.threshold = threshold_from_ambient(rms(&ambient));
        info!(
            "Calibrated on {} samples, threshold {:.4}",
            ambient.len(),
            self.threshold
        );
        Ok(())
    }

    fn listen(
        &mut self,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Utterance, SpeechError> {
        let input = self.open_input()?;
        let mut detector = PhraseDetector::new(self.threshold, input.sample_rate, phrase_limit);
        let started = Instant::now();
        // Generous ceiling so a stuck device cannot hang the worker.
        let hard_stop = started + timeout + phrase_limit + Duration::from_secs(1);

        loop {
            let now = Instant::now();
            if detector.phase() == Phase::Waiting && now.duration_since(started) >= timeout {
                return Err(SpeechError::Timeout);
            }
            if now >= hard_stop {
                break;
            }

            match input.chunks.recv_timeout(Duration::from_millis(100)) {
                Ok(chunk) => {
                    if detector.push(&chunk) == Phase::Complete {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SpeechError::Device("input stream closed".to_string()))
                }
            }
        }

        if detector.phase() == Phase::Waiting {
            return Err(SpeechError::Timeout);
        }

        let samples = to_pcm16(&detector.into_samples());
        debug!("Captured {} samples", samples.len());
        Ok(Utterance {
            samples,
            sample_rate: input.sample_rate,
        })
    }

    fn transcribe(&self, utterance: &Utterance) -> Result<String, SpeechError> {
        self.transcriber.transcribe(utterance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let mixed = downmix(&[0.5_f32, -0.5, 1.0, 0.0], 2, |s| s);
        assert_eq!(mixed, vec![0.0, 0.5]);
    }

    #[test]
    fn test_downmix_i16() {
        let mixed = downmix(&[16_384_i16], 1, |s| f32::from(s) / 32_768.0);
        assert_eq!(mixed, vec![0.5]);
    }
}
