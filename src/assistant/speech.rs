//! Speech I/O adapter
//!
//! Binds the microphone recorder, speech recognition, speech synthesis and
//! playback into a single [`Voice`]. Every piece is optional: without TTS
//! replies are only displayed, without STT nothing can be captured.

use std::path::PathBuf;

use super::{RECOGNIZING_MESSAGE, SharedPresenter, Speaker, Transcription, Voice};
use crate::Result;
use crate::config::Config;
use crate::voice::{
    AudioPlayback, PLAYBACK_SAMPLE_RATE, SAMPLE_RATE, SpeechToText, TextToSpeech, Transcriber, UtteranceRecorder,
    samples_to_wav,
};

/// Microphone plus cloud speech services
pub struct SpeechIo {
    presenter: SharedPresenter,
    recorder: Option<UtteranceRecorder>,
    stt: Option<Box<dyn Transcriber>>,
    tts: Option<TextToSpeech>,
    playback: Option<AudioPlayback>,
    notification_sound: Option<PathBuf>,
}

impl SpeechIo {
    /// Build from configuration
    ///
    /// Must run on the listener thread: audio devices are not `Send` and the
    /// blocking HTTP clients must live outside the async runtime. Missing
    /// keys or devices are logged and leave the matching piece disabled.
    #[must_use]
    pub fn from_config(config: &Config, presenter: SharedPresenter) -> Self {
        if !config.voice.enabled {
            return Self::text_only(presenter);
        }

        let stt = SpeechToText::from_config(&config.voice, &config.api_keys)
            .map(|s| Box::new(s) as Box<dyn Transcriber>)
            .map_err(|e| tracing::warn!(error = %e, "speech recognition disabled"))
            .ok();

        let tts = TextToSpeech::from_config(&config.voice, &config.api_keys)
            .map_err(|e| tracing::warn!(error = %e, "speech synthesis disabled"))
            .ok();

        let playback = AudioPlayback::new()
            .map_err(|e| tracing::warn!(error = %e, "audio output unavailable"))
            .ok();

        Self {
            presenter,
            recorder: Some(UtteranceRecorder::new(config.capture)),
            stt,
            tts,
            playback,
            notification_sound: config
                .notification_sound
                .clone()
                .filter(|p| p.is_file()),
        }
    }

    /// Display-only voice with no audio at all
    #[must_use]
    pub fn text_only(presenter: SharedPresenter) -> Self {
        Self {
            presenter,
            recorder: None,
            stt: None,
            tts: None,
            playback: None,
            notification_sound: None,
        }
    }

    /// Whether utterances can be captured and recognized
    #[must_use]
    pub const fn can_listen(&self) -> bool {
        self.recorder.is_some() && self.stt.is_some()
    }

    /// Whether replies are spoken aloud
    #[must_use]
    pub const fn can_speak(&self) -> bool {
        self.tts.is_some() && self.playback.is_some()
    }
}

impl Speaker for SpeechIo {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.presenter.display_message(text);
        tracing::info!(text = %text, "speaking");

        if let (Some(tts), Some(playback)) = (&self.tts, &self.playback) {
            let audio = tts.synthesize(text)?;
            playback.play_mp3(&audio)?;
        }
        Ok(())
    }
}

impl Voice for SpeechIo {
    fn listen(&mut self) -> Transcription {
        let (Some(recorder), Some(stt)) = (&self.recorder, &self.stt) else {
            tracing::debug!("no speech input configured");
            return Transcription::CaptureFailed;
        };

        let samples = match recorder.record() {
            Ok(samples) => samples,
            Err(e) => {
                tracing::info!(error = %e, "capture failed");
                return Transcription::CaptureFailed;
            }
        };

        self.presenter.display_message(RECOGNIZING_MESSAGE);

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode utterance");
                return Transcription::CaptureFailed;
            }
        };

        match stt.transcribe(&wav) {
            Ok(raw) => {
                let transcription = Transcription::from_transcript(&raw);
                if let Transcription::Text(text) = &transcription {
                    if !text.is_empty() {
                        self.presenter.display_message(text);
                    }
                }
                transcription
            }
            Err(e) => Transcription::ServiceError(e.to_string()),
        }
    }

    fn chime(&mut self) {
        let Some(playback) = &self.playback else {
            return;
        };
        let played = match &self.notification_sound {
            Some(path) => playback.play_file(path),
            None => playback.play(chime_tone()),
        };
        if let Err(e) = played {
            tracing::warn!(error = %e, "notification sound failed");
        }
    }
}

/// Rising two-note chime at [`PLAYBACK_SAMPLE_RATE`], used when no sound file is set
fn chime_tone() -> Vec<f32> {
    const NOTES: [f32; 2] = [880.0, 1320.0];
    const NOTE_SECS: f32 = 0.12;
    const PEAK: f32 = 0.3;

    let rate = PLAYBACK_SAMPLE_RATE as f32;
    let per_note = (rate * NOTE_SECS) as usize;
    NOTES
        .iter()
        .flat_map(|&freq| {
            (0..per_note).map(move |i| {
                let t = i as f32 / rate;
                // Linear fade out so the note ends without a click
                let envelope = 1.0 - i as f32 / per_note as f32;
                PEAK * envelope * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
        })
        .collect()
}
