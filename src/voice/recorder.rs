//! Single-utterance recording with ambient calibration and time limits

use std::time::Duration;

use super::capture::{AudioCapture, SAMPLE_RATE, rms_energy};
use crate::config::CaptureConfig;
use crate::{Error, Result};

/// Lowest energy threshold, used when the room is silent
const MIN_ENERGY_THRESHOLD: f32 = 0.015;

/// Speech must exceed ambient energy by this factor
const DYNAMIC_ENERGY_RATIO: f32 = 1.5;

/// Analysis window (50ms at 16kHz)
const WINDOW_SAMPLES: usize = 800;

/// How often the recorder drains the capture buffer
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Progress of a phrase through the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseState {
    /// No speech yet
    Waiting,
    /// Speech started, accumulating
    Recording,
    /// Phrase ended by a pause or the length cap
    Complete,
    /// Nobody spoke before the listen timeout
    TimedOut,
}

/// Splits a sample stream into one phrase using energy thresholds
pub struct PhraseSegmenter {
    threshold: f32,
    listen_timeout: usize,
    phrase_limit: usize,
    pause: usize,
    state: PhraseState,
    waited: usize,
    silence: usize,
    phrase: Vec<f32>,
    window: Vec<f32>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn to_samples(d: Duration, sample_rate: u32) -> usize {
    (d.as_secs_f64() * f64::from(sample_rate)) as usize
}

impl PhraseSegmenter {
    /// Create a segmenter for audio at `sample_rate`
    #[must_use]
    pub fn new(limits: &CaptureConfig, sample_rate: u32) -> Self {
        Self {
            threshold: MIN_ENERGY_THRESHOLD,
            listen_timeout: to_samples(limits.listen_timeout, sample_rate),
            phrase_limit: to_samples(limits.phrase_limit, sample_rate),
            pause: to_samples(limits.pause_threshold, sample_rate),
            state: PhraseState::Waiting,
            waited: 0,
            silence: 0,
            phrase: Vec::new(),
            window: Vec::with_capacity(WINDOW_SAMPLES),
        }
    }

    /// Set the speech threshold from a sample of background noise
    pub fn calibrate(&mut self, ambient: &[f32]) {
        let ambient_energy = rms_energy(ambient);
        self.threshold = (ambient_energy * DYNAMIC_ENERGY_RATIO).max(MIN_ENERGY_THRESHOLD);
        tracing::debug!(ambient_energy, threshold = self.threshold, "calibrated for ambient noise");
    }

    /// Current speech threshold
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> PhraseState {
        self.state
    }

    /// Feed samples; returns the state after consuming them
    pub fn feed(&mut self, samples: &[f32]) -> PhraseState {
        for &sample in samples {
            if matches!(self.state, PhraseState::Complete | PhraseState::TimedOut) {
                break;
            }
            self.window.push(sample);
            if self.window.len() == WINDOW_SAMPLES {
                let window = std::mem::take(&mut self.window);
                self.step(&window);
            }
        }
        self.state
    }

    fn step(&mut self, window: &[f32]) {
        let is_speech = rms_energy(window) > self.threshold;

        match self.state {
            PhraseState::Waiting => {
                if is_speech {
                    self.state = PhraseState::Recording;
                    self.phrase.extend_from_slice(window);
                    tracing::trace!("phrase started");
                } else {
                    self.waited += window.len();
                    if self.waited >= self.listen_timeout {
                        self.state = PhraseState::TimedOut;
                    }
                }
            }
            PhraseState::Recording => {
                self.phrase.extend_from_slice(window);
                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += window.len();
                }

                if self.silence >= self.pause || self.phrase.len() >= self.phrase_limit {
                    self.state = PhraseState::Complete;
                }
            }
            PhraseState::Complete | PhraseState::TimedOut => {}
        }
    }

    /// Take the recorded phrase, trailing pause included
    pub fn take_phrase(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.phrase)
    }
}

/// Records one utterance from the default microphone
pub struct UtteranceRecorder {
    limits: CaptureConfig,
}

impl UtteranceRecorder {
    #[must_use]
    pub const fn new(limits: CaptureConfig) -> Self {
        Self { limits }
    }

    /// Calibrate, then block until a phrase is captured or a limit elapses
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureFailure`] when nobody speaks before the timeout,
    /// or an audio error if the microphone cannot be opened
    pub fn record(&self) -> Result<Vec<f32>> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        let mut segmenter = PhraseSegmenter::new(&self.limits, SAMPLE_RATE);

        std::thread::sleep(self.limits.calibration);
        segmenter.calibrate(&capture.take_buffer());

        // Upper bound on wall time in case the device stalls
        let deadline = std::time::Instant::now()
            + self.limits.listen_timeout
            + self.limits.phrase_limit
            + self.limits.pause_threshold;

        loop {
            std::thread::sleep(POLL_INTERVAL);

            match segmenter.feed(&capture.take_buffer()) {
                PhraseState::Complete => break,
                PhraseState::TimedOut => {
                    return Err(Error::CaptureFailure(format!(
                        "no speech within {}s",
                        self.limits.listen_timeout.as_secs()
                    )));
                }
                PhraseState::Waiting | PhraseState::Recording => {}
            }

            if std::time::Instant::now() > deadline {
                if segmenter.state() == PhraseState::Recording {
                    break;
                }
                return Err(Error::CaptureFailure("microphone delivered no audio".to_string()));
            }
        }

        capture.stop();
        let phrase = segmenter.take_phrase();
        tracing::debug!(samples = phrase.len(), "utterance captured");
        Ok(phrase)
    }
}
