//! Speech-to-text (STT) processing
//!
//! Blocking clients: transcription runs on the listener thread, never on the
//! async runtime.

use std::time::Duration;

use crate::config::{ApiKeys, SttBackend, VoiceConfig};
use crate::{Error, Result};

/// Anything that turns WAV audio into text
pub trait Transcriber {
    /// Transcribe WAV bytes
    ///
    /// # Errors
    ///
    /// Returns error if the recognition service fails
    fn transcribe(&self, wav: &[u8]) -> Result<String>;
}

/// Response from OpenAI Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes speech to text
pub struct SpeechToText {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    language: String,
    provider: SttBackend,
}

impl SpeechToText {
    /// Build the client selected by `voice.stt_provider`
    ///
    /// # Errors
    ///
    /// Returns error if the provider's API key is missing
    pub fn from_config(voice: &VoiceConfig, keys: &ApiKeys) -> Result<Self> {
        let key = match voice.stt_provider {
            SttBackend::Whisper => keys.openai.clone(),
            SttBackend::Deepgram => keys.deepgram.clone(),
        }
        .unwrap_or_default();

        Self::new(voice.stt_provider, key, voice.stt_model.clone(), voice.stt_language.clone())
    }

    /// Create a new STT instance
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(
        provider: SttBackend,
        api_key: String,
        model: String,
        language: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            let msg = match provider {
                SttBackend::Whisper => "OpenAI API key required for Whisper",
                SttBackend::Deepgram => "Deepgram API key required",
            };
            return Err(Error::Config(msg.to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            language,
            provider,
        })
    }

    /// Transcribe using OpenAI Whisper
    fn transcribe_whisper(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::blocking::multipart::Form::new()
            .part(
                "file",
                reqwest::blocking::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", whisper_language(&self.language));

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json()?;
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    fn transcribe_deepgram(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language={}&punctuate=true",
            urlencoding::encode(&self.model),
            urlencoding::encode(&self.language)
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response.json()?;

        Ok(result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default())
    }
}

impl Transcriber for SpeechToText {
    fn transcribe(&self, wav: &[u8]) -> Result<String> {
        let transcript = match self.provider {
            SttBackend::Whisper => self.transcribe_whisper(wav)?,
            SttBackend::Deepgram => self.transcribe_deepgram(wav)?,
        };
        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// Whisper takes ISO-639-1 codes only ("en-IN" → "en")
fn whisper_language(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or(tag)
        .to_lowercase()
}
