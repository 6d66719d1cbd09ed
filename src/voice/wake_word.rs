//! Wake word detection
//!
//! Detects wake words in the audio stream to activate the assistant.
//! Uses a hybrid approach: local energy detection segments short bursts of
//! speech, and a transcription pass verifies whether a keyword was said.

use super::capture::{i16_to_f32, rms_energy, samples_to_wav};
use super::stt::Transcriber;
use crate::Result;

/// Sample rate the detector expects
pub const DETECTOR_SAMPLE_RATE: u32 = 16000;

/// Samples per frame handed to the detector
pub const FRAME_LENGTH: usize = 512;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to trigger (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Silence duration to consider end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Segments longer than this are conversation, not a wake word
const MAX_SEGMENT_SAMPLES: usize = 48000; // 3 seconds

/// A keyword spotter fed with fixed-length PCM frames
pub trait KeywordDetector {
    /// Sample rate the input stream must be opened at
    fn sample_rate(&self) -> u32;

    /// Exact number of samples in each frame passed to [`Self::process`]
    fn frame_length(&self) -> usize;

    /// Process one frame; returns the index of the detected keyword
    ///
    /// # Errors
    ///
    /// Returns error if the detector itself fails
    fn process(&mut self, frame: &[i16]) -> Result<Option<usize>>;

    /// Discard any partial state
    fn reset(&mut self);
}

/// State of the wake word detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech
    Idle,
    /// Detected potential speech, accumulating
    Listening,
}

/// Energy-gated detector that verifies keywords by transcription
pub struct TranscriptKeywordDetector<T> {
    keywords: Vec<String>,
    transcriber: T,
    state: DetectorState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl<T: Transcriber> TranscriptKeywordDetector<T> {
    /// Create a detector for `keywords`
    ///
    /// Keywords are lowercased and trimmed; empty entries are dropped.
    pub fn new(keywords: Vec<String>, transcriber: T) -> Self {
        let normalized: Vec<String> = keywords
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        tracing::debug!(keywords = ?normalized, "wake word detector initialized");

        Self {
            keywords: normalized,
            transcriber,
            state: DetectorState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Get the configured keywords
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// Get the accumulated speech buffer
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Feed samples; returns true once a speech segment is complete
    fn accumulate(&mut self, samples: &[f32]) -> bool {
        let energy = rms_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            DetectorState::Idle => {
                if is_speech {
                    self.state = DetectorState::Listening;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech detected, listening");
                }
            }
            DetectorState::Listening => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.speech_buffer.len() > MAX_SEGMENT_SAMPLES {
                    tracing::trace!("segment too long for a wake word, resetting");
                    self.reset_state();
                    return false;
                }

                if self.silence_counter > SILENCE_SAMPLES
                    && self.speech_buffer.len() > MIN_SPEECH_SAMPLES
                {
                    tracing::debug!(samples = self.speech_buffer.len(), "speech segment complete");
                    return true;
                }

                // Too much silence without enough speech
                if self.silence_counter > SILENCE_SAMPLES * 2 {
                    self.reset_state();
                }
            }
        }

        false
    }

    fn verify_segment(&mut self) -> Option<usize> {
        let segment = std::mem::take(&mut self.speech_buffer);
        self.reset_state();

        let transcript = match samples_to_wav(&segment, DETECTOR_SAMPLE_RATE)
            .and_then(|wav| self.transcriber.transcribe(&wav))
        {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "wake word verification failed");
                return None;
            }
        };

        let found = match_keyword(&transcript, &self.keywords);
        if let Some(idx) = found {
            tracing::info!(wake_word = %self.keywords[idx], transcript = %transcript, "wake word detected");
        } else {
            tracing::trace!(transcript = %transcript, "no wake word in segment");
        }
        found
    }

    fn reset_state(&mut self) {
        self.state = DetectorState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }
}

impl<T: Transcriber> KeywordDetector for TranscriptKeywordDetector<T> {
    fn sample_rate(&self) -> u32 {
        DETECTOR_SAMPLE_RATE
    }

    fn frame_length(&self) -> usize {
        FRAME_LENGTH
    }

    fn process(&mut self, frame: &[i16]) -> Result<Option<usize>> {
        let samples: Vec<f32> = frame.iter().copied().map(i16_to_f32).collect();

        if self.accumulate(&samples) {
            return Ok(self.verify_segment());
        }
        Ok(None)
    }

    fn reset(&mut self) {
        self.reset_state();
    }
}

impl<T> Drop for TranscriptKeywordDetector<T> {
    fn drop(&mut self) {
        tracing::debug!("wake word detector released");
    }
}

/// Find the first keyword appearing as whole words in `transcript`
#[must_use]
pub fn match_keyword(transcript: &str, keywords: &[String]) -> Option<usize> {
    let lowered = transcript.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    keywords.iter().position(|keyword| {
        let parts: Vec<&str> = keyword.split_whitespace().collect();
        !parts.is_empty() && words.windows(parts.len()).any(|window| window == parts.as_slice())
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::Error;

    struct FixedTranscript {
        text: &'static str,
        calls: Cell<usize>,
    }

    impl Transcriber for FixedTranscript {
        fn transcribe(&self, _wav: &[u8]) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            if self.text.is_empty() {
                Err(Error::Stt("offline".to_string()))
            } else {
                Ok(self.text.to_string())
            }
        }
    }

    fn detector(text: &'static str) -> TranscriptKeywordDetector<FixedTranscript> {
        TranscriptKeywordDetector::new(
            vec!["Jarvis".to_string(), " alexa ".to_string()],
            FixedTranscript {
                text,
                calls: Cell::new(0),
            },
        )
    }

    fn loud_frame() -> Vec<i16> {
        (0..FRAME_LENGTH)
            .map(|i| if i % 2 == 0 { 9000 } else { -9000 })
            .collect()
    }

    fn quiet_frame() -> Vec<i16> {
        vec![0; FRAME_LENGTH]
    }

    /// Feed 0.5s of speech then silence until the segment closes
    fn speak_segment<T: Transcriber>(d: &mut TranscriptKeywordDetector<T>) -> Option<usize> {
        for _ in 0..16 {
            assert_eq!(d.process(&loud_frame()).unwrap(), None);
        }
        let mut hit = None;
        for _ in 0..17 {
            if let Some(idx) = d.process(&quiet_frame()).unwrap() {
                hit = Some(idx);
            }
        }
        hit
    }

    #[test]
    fn keywords_are_normalized() {
        let d = detector("jarvis");
        assert_eq!(d.keywords(), &["jarvis", "alexa"]);
        assert_eq!(d.sample_rate(), 16000);
        assert_eq!(d.frame_length(), 512);
    }

    #[test]
    fn silence_never_transcribes() {
        let mut d = detector("jarvis");
        for _ in 0..100 {
            assert_eq!(d.process(&quiet_frame()).unwrap(), None);
        }
        assert_eq!(d.state(), DetectorState::Idle);
        assert_eq!(d.transcriber.calls.get(), 0);
    }

    #[test]
    fn verified_segment_reports_keyword_index() {
        let mut d = detector("Hey, Alexa!");
        assert_eq!(speak_segment(&mut d), Some(1));
        assert_eq!(d.state(), DetectorState::Idle);
        assert!(d.speech_buffer().is_empty());
    }

    #[test]
    fn segment_without_keyword_resets() {
        let mut d = detector("what a nice day");
        assert_eq!(speak_segment(&mut d), None);
        assert_eq!(d.transcriber.calls.get(), 1);
        assert_eq!(d.state(), DetectorState::Idle);
    }

    #[test]
    fn verification_failure_is_not_fatal() {
        let mut d = detector("");
        assert_eq!(speak_segment(&mut d), None);
        assert_eq!(d.transcriber.calls.get(), 1);
    }

    #[test]
    fn long_speech_is_not_a_wake_word() {
        let mut d = detector("jarvis");
        // 94 frames pushes the buffer just past the 3s cap
        for _ in 0..94 {
            d.process(&loud_frame()).unwrap();
        }
        assert_eq!(d.state(), DetectorState::Idle);
        for _ in 0..40 {
            assert_eq!(d.process(&quiet_frame()).unwrap(), None);
        }
        assert_eq!(d.transcriber.calls.get(), 0);
    }

    #[test]
    fn keyword_matching_uses_whole_words() {
        let keywords = vec!["jarvis".to_string(), "hey orin".to_string()];
        assert_eq!(match_keyword("Jarvis.", &keywords), Some(0));
        assert_eq!(match_keyword("ok HEY ORIN go", &keywords), Some(1));
        assert_eq!(match_keyword("jarvisson", &keywords), None);
        assert_eq!(match_keyword("hey there orin", &keywords), None);
    }
}
