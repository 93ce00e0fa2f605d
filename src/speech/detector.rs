//! Energy-based phrase detection.
//!
//! Audio arrives in arbitrary chunks; the detector slices it into 30 ms
//! frames and compares each frame's RMS energy against a threshold derived
//! from the calibration pass. Speech starts on the first loud frame and ends
//! after a run of quiet frames or when the phrase limit is reached.

use std::collections::VecDeque;
use std::time::Duration;

pub const FRAME_MS: u32 = 30;
/// Quiet time that ends a phrase.
pub const PAUSE: Duration = Duration::from_millis(800);
/// Audio kept from before the first loud frame so onsets aren't clipped.
pub const PREROLL: Duration = Duration::from_millis(300);

const AMBIENT_MULTIPLIER: f32 = 1.5;
const MIN_THRESHOLD: f32 = 0.01;

/// Root-mean-square energy of `frame`; 0.0 for empty input.
#[must_use]
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|s| s * s).sum();
    (sum / frame.len() as f32).sqrt()
}

/// Speech threshold for a room whose background measured `ambient_rms`.
#[must_use]
pub fn threshold_from_ambient(ambient_rms: f32) -> f32 {
    (ambient_rms * AMBIENT_MULTIPLIER).max(MIN_THRESHOLD)
}

/// Float samples in [-1, 1] to signed 16-bit PCM.
#[must_use]
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
        .collect()
}

fn frames_in(duration: Duration) -> usize {
    let ms = duration.as_millis() as usize;
    ms.div_ceil(FRAME_MS as usize).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Speaking,
    Complete,
}

pub struct PhraseDetector {
    threshold: f32,
    frame_len: usize,
    pending: Vec<f32>,
    preroll: VecDeque<Vec<f32>>,
    preroll_frames: usize,
    captured: Vec<f32>,
    speech_frames: usize,
    silent_run: usize,
    pause_frames: usize,
    max_frames: usize,
    phase: Phase,
}

impl PhraseDetector {
    #[must_use]
    pub fn new(threshold: f32, sample_rate: u32, phrase_limit: Duration) -> Self {
        let frame_len = ((sample_rate * FRAME_MS) / 1000).max(1) as usize;
        Self {
            threshold,
            frame_len,
            pending: Vec::with_capacity(frame_len),
            preroll: VecDeque::new(),
            preroll_frames: frames_in(PREROLL),
            captured: Vec::new(),
            speech_frames: 0,
            silent_run: 0,
            pause_frames: frames_in(PAUSE),
            max_frames: frames_in(phrase_limit),
            phase: Phase::Waiting,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Feed raw mono samples; returns the phase after consuming them.
    pub fn push(&mut self, samples: &[f32]) -> Phase {
        self.pending.extend_from_slice(samples);
        while self.phase != Phase::Complete && self.pending.len() >= self.frame_len {
            let frame: Vec<f32> = self.pending.drain(..self.frame_len).collect();
            self.process_frame(frame);
        }
        self.phase
    }

    /// Captured speech, including the pre-roll.
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.captured
    }

    fn process_frame(&mut self, frame: Vec<f32>) {
        let loud = rms(&frame) > self.threshold;
        match self.phase {
            Phase::Waiting => {
                if loud {
                    for earlier in self.preroll.drain(..) {
                        self.captured.extend(earlier);
                    }
                    self.captured.extend(frame);
                    self.speech_frames = 1;
                    self.silent_run = 0;
                    self.phase = Phase::Speaking;
                } else {
                    self.preroll.push_back(frame);
                    if self.preroll.len() > self.preroll_frames {
                        self.preroll.pop_front();
                    }
                }
            }
            Phase::Speaking => {
                self.captured.extend(frame);
                self.speech_frames += 1;
                self.silent_run = if loud { 0 } else { self.silent_run + 1 };
                if self.silent_run >= self.pause_frames || self.speech_frames >= self.max_frames {
                    self.phase = Phase::Complete;
                }
            }
            Phase::Complete => {}
        }
    }
}
