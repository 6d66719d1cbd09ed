//! Configuration management for the Jarvis assistant
//!
//! Values resolve with precedence env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};
use file::JarvisConfigFile;

/// Default assistant name, also the first wake word
pub const DEFAULT_ASSISTANT_NAME: &str = "jarvis";

/// Default UI port
pub const DEFAULT_UI_PORT: u16 = 8000;

/// Jarvis assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Name the assistant answers to; removed from spoken commands
    pub assistant_name: String,

    /// Keywords the listener reacts to
    pub wake_words: Vec<String>,

    /// Path to data directory (database, cache, etc)
    pub data_dir: PathBuf,

    /// Path to the command store
    pub db_path: PathBuf,

    /// Local UI server configuration
    pub ui: UiConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Utterance capture limits
    pub capture: CaptureConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Sound played when the assistant activates
    pub notification_sound: Option<PathBuf>,

    /// Maximum time to wait for the UI before giving up (`None` waits forever)
    pub ready_timeout: Option<Duration>,
}

/// Local UI server configuration
#[derive(Debug, Clone)]
pub struct UiConfig {
    /// Port to listen on
    pub port: u16,

    /// Directory with `index.html` and assets
    pub static_dir: PathBuf,

    /// Open the UI in the default browser on startup
    pub open_browser: bool,
}

impl UiConfig {
    /// URL of the UI entry page
    #[must_use]
    pub fn index_url(&self) -> String {
        format!("http://localhost:{}/index.html", self.port)
    }
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttBackend {
    Whisper,
    Deepgram,
}

impl SttBackend {
    /// Parse a provider name, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns error for unknown provider names
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Text-to-speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsBackend {
    OpenAi,
    ElevenLabs,
}

impl TtsBackend {
    /// Parse a provider name, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns error for unknown provider names
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable microphone input and speech output
    pub enabled: bool,

    pub stt_provider: SttBackend,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// Recognition language tag
    pub stt_language: String,

    pub tts_provider: TtsBackend,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

/// Utterance capture limits
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// How long to wait for speech to begin
    pub listen_timeout: Duration,

    /// Hard cap on a single phrase
    pub phrase_limit: Duration,

    /// Silence that ends a phrase
    pub pause_threshold: Duration,

    /// Ambient noise sampling before listening
    pub calibration: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            listen_timeout: Duration::from_secs(10),
            phrase_limit: Duration::from_secs(6),
            pause_threshold: Duration::from_secs(1),
            calibration: Duration::from_secs(1),
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is invalid
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is invalid
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        let fc = file::load_config_file();
        let config = Self::resolve(fc, |key| std::env::var(key).ok(), disable_voice)?;

        // Ensure data dir exists
        std::fs::create_dir_all(&config.data_dir).ok();

        Ok(config)
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name is invalid
    pub fn resolve<F>(fc: JarvisConfigFile, env: F, disable_voice: bool) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let assistant_name = env("JARVIS_NAME")
            .or(fc.assistant.name)
            .unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string())
            .trim()
            .to_lowercase();

        let wake_words = env("JARVIS_WAKE_WORDS")
            .map(|s| s.split(',').map(str::to_string).collect())
            .or(fc.assistant.wake_words)
            .unwrap_or_else(|| vec![DEFAULT_ASSISTANT_NAME.to_string(), "alexa".to_string()])
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>();

        if wake_words.is_empty() {
            return Err(Error::Config("at least one wake word is required".to_string()));
        }

        // Determine data directory (~/.local/share/jarvis on Linux)
        let data_dir = env("JARVIS_DATA_DIR").map_or_else(
            || {
                directories::BaseDirs::new()
                    .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("jarvis"))
            },
            PathBuf::from,
        );

        let db_path = env("JARVIS_DB_PATH")
            .or(fc.database.path)
            .map_or_else(|| data_dir.join("jarvis.db"), PathBuf::from);

        // UI server (env > toml > default)
        let static_dir = env("JARVIS_UI_DIR")
            .or(fc.ui.static_dir)
            .map_or_else(|| PathBuf::from("www"), PathBuf::from);
        let ui = UiConfig {
            port: env("JARVIS_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.ui.port)
                .unwrap_or(DEFAULT_UI_PORT),
            open_browser: env("JARVIS_OPEN_BROWSER")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(fc.ui.open_browser)
                .unwrap_or(true),
            static_dir,
        };

        let notification_sound = env("JARVIS_SOUND")
            .or(fc.assistant.notification_sound)
            .map(PathBuf::from)
            .or_else(|| Some(ui.static_dir.join("assets").join("audio").join("sound.mp3")));

        let ready_timeout = env("JARVIS_READY_TIMEOUT")
            .and_then(|s| s.parse().ok())
            .or(fc.assistant.ready_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        // Load API keys (env > toml > None)
        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY").or(fc.api_keys.openai),
            deepgram: env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram),
            elevenlabs: env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs),
        };

        // Voice config (env > toml > default)
        let stt_provider = SttBackend::parse(
            &env("JARVIS_STT_PROVIDER")
                .or(fc.voice.stt_provider)
                .unwrap_or_else(|| "whisper".to_string()),
        )?;
        let tts_provider = TtsBackend::parse(
            &env("JARVIS_TTS_PROVIDER")
                .or(fc.voice.tts_provider)
                .unwrap_or_else(|| "openai".to_string()),
        )?;
        let default_stt_model = match stt_provider {
            SttBackend::Whisper => "whisper-1",
            SttBackend::Deepgram => "nova-2",
        };
        let default_tts_model = match tts_provider {
            TtsBackend::OpenAi => "tts-1",
            TtsBackend::ElevenLabs => "eleven_monolingual_v1",
        };

        let voice = VoiceConfig {
            enabled: !disable_voice && fc.voice.enabled.unwrap_or(true),
            stt_provider,
            stt_model: env("JARVIS_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| default_stt_model.to_string()),
            stt_language: env("JARVIS_STT_LANGUAGE")
                .or(fc.voice.stt_language)
                .unwrap_or_else(|| "en-IN".to_string()),
            tts_provider,
            tts_model: env("JARVIS_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| default_tts_model.to_string()),
            tts_voice: env("JARVIS_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0).clamp(0.25, 4.0),
        };

        if disable_voice {
            tracing::info!("voice explicitly disabled via --disable-voice");
        }

        let defaults = CaptureConfig::default();
        let capture = CaptureConfig {
            listen_timeout: fc
                .capture
                .listen_timeout_secs
                .map_or(defaults.listen_timeout, Duration::from_secs),
            phrase_limit: fc
                .capture
                .phrase_limit_secs
                .map_or(defaults.phrase_limit, Duration::from_secs),
            pause_threshold: fc
                .capture
                .pause_threshold_ms
                .map_or(defaults.pause_threshold, Duration::from_millis),
            calibration: fc
                .capture
                .calibration_ms
                .map_or(defaults.calibration, Duration::from_millis),
        };

        Ok(Self {
            assistant_name,
            wake_words,
            data_dir,
            db_path,
            ui,
            voice,
            capture,
            api_keys,
            notification_sound,
            ready_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve_with(vars: &[(&str, &str)], fc: JarvisConfigFile) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::resolve(fc, |k| map.get(k).cloned(), false).unwrap()
    }

    #[test]
    fn defaults_without_env_or_file() {
        let config = resolve_with(&[], JarvisConfigFile::default());

        assert_eq!(config.assistant_name, "jarvis");
        assert_eq!(config.wake_words, vec!["jarvis", "alexa"]);
        assert_eq!(config.ui.port, 8000);
        assert_eq!(config.ui.index_url(), "http://localhost:8000/index.html");
        assert_eq!(config.capture.listen_timeout, Duration::from_secs(10));
        assert_eq!(config.capture.phrase_limit, Duration::from_secs(6));
        assert_eq!(config.capture.pause_threshold, Duration::from_secs(1));
        assert!(config.ready_timeout.is_none());
        assert_eq!(config.voice.stt_provider, SttBackend::Whisper);
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert!(config.voice.enabled);
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = JarvisConfigFile::default();
        fc.ui.port = Some(9000);
        fc.assistant.name = Some("Friday".to_string());

        let config = resolve_with(&[("JARVIS_PORT", "9100")], fc);
        assert_eq!(config.ui.port, 9100);
        assert_eq!(config.assistant_name, "friday");
    }

    #[test]
    fn wake_words_from_env_are_normalized() {
        let config = resolve_with(
            &[("JARVIS_WAKE_WORDS", " Jarvis , COMPUTER ,")],
            JarvisConfigFile::default(),
        );
        assert_eq!(config.wake_words, vec!["jarvis", "computer"]);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let config = resolve_with(&[("JARVIS_NAME", "  ")], JarvisConfigFile::default());
        assert_eq!(config.assistant_name, "jarvis");
    }

    #[test]
    fn zero_ready_timeout_means_wait_forever() {
        let config = resolve_with(&[("JARVIS_READY_TIMEOUT", "0")], JarvisConfigFile::default());
        assert!(config.ready_timeout.is_none());

        let config = resolve_with(&[("JARVIS_READY_TIMEOUT", "30")], JarvisConfigFile::default());
        assert_eq!(config.ready_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn deepgram_switches_default_model() {
        let config = resolve_with(
            &[("JARVIS_STT_PROVIDER", "Deepgram")],
            JarvisConfigFile::default(),
        );
        assert_eq!(config.voice.stt_provider, SttBackend::Deepgram);
        assert_eq!(config.voice.stt_model, "nova-2");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = Config::resolve(
            JarvisConfigFile::default(),
            |k| (k == "JARVIS_TTS_PROVIDER").then(|| "espeak".to_string()),
            false,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn disable_voice_wins() {
        let config =
            Config::resolve(JarvisConfigFile::default(), |_| None, true).unwrap();
        assert!(!config.voice.enabled);
    }
}
