//! Voice processing module
//!
//! Handles audio capture, wake word detection, playback, and the blocking
//! STT/TTS clients used by the listener thread.

mod capture;
mod playback;
mod recorder;
mod stream;
mod stt;
mod tts;
mod wake_word;

pub use capture::{AudioCapture, SAMPLE_RATE, f32_to_i16, i16_to_f32, rms_energy, samples_to_wav};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE};
pub use recorder::{PhraseSegmenter, PhraseState, UtteranceRecorder};
pub use stream::{AudioInput, MicrophoneStream};
pub use stt::{SpeechToText, Transcriber};
pub use tts::TextToSpeech;
pub use wake_word::{
    DETECTOR_SAMPLE_RATE, DetectorState, FRAME_LENGTH, KeywordDetector,
    TranscriptKeywordDetector, match_keyword,
};
