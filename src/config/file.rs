//! TOML configuration file loading
//!
//! Supports `~/.config/jarvis/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct JarvisConfigFile {
    /// Assistant identity and wake words
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Utterance capture limits
    #[serde(default)]
    pub capture: CaptureFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Local UI server
    #[serde(default)]
    pub ui: UiFileConfig,

    /// Command store location
    #[serde(default)]
    pub database: DatabaseFileConfig,
}

/// Assistant identity
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AssistantFileConfig {
    /// Name stripped from commands (e.g. "jarvis")
    pub name: Option<String>,

    /// Keywords that wake the assistant
    pub wake_words: Option<Vec<String>>,

    /// Sound played when the assistant activates
    pub notification_sound: Option<String>,

    /// Give up waiting for the UI after this many seconds
    pub ready_timeout_secs: Option<u64>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceFileConfig {
    /// Enable microphone and speech output
    pub enabled: Option<bool>,

    /// STT backend ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Recognition language tag (e.g. "en-IN")
    pub stt_language: Option<String>,

    /// TTS backend ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// Capture timing, in seconds unless noted
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CaptureFileConfig {
    pub listen_timeout_secs: Option<u64>,
    pub phrase_limit_secs: Option<u64>,
    pub pause_threshold_ms: Option<u64>,
    pub calibration_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// UI server configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UiFileConfig {
    /// Port to serve the UI on
    pub port: Option<u16>,

    /// Directory holding `index.html` and assets
    pub static_dir: Option<String>,

    /// Open the UI in the default browser on startup
    pub open_browser: Option<bool>,
}

/// Database configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DatabaseFileConfig {
    /// Path to the `SQLite` file
    pub path: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `JarvisConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> JarvisConfigFile {
    config_file_path().map_or_else(JarvisConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Returns `JarvisConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_from(path: &Path) -> JarvisConfigFile {
    if !path.exists() {
        return JarvisConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                JarvisConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            JarvisConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/jarvis/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("jarvis").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_file_from(&dir.path().join("nope.toml"));
        assert!(fc.assistant.name.is_none());
        assert!(fc.ui.port.is_none());
    }

    #[test]
    fn partial_file_overlays_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[assistant]
name = "friday"
wake_words = ["friday"]

[ui]
port = 9000
"#,
        )
        .unwrap();

        let fc = load_config_file_from(&path);
        assert_eq!(fc.assistant.name.as_deref(), Some("friday"));
        assert_eq!(fc.ui.port, Some(9000));
        assert!(fc.voice.stt_model.is_none());
    }

    #[test]
    fn unparsable_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let fc = load_config_file_from(&path);
        assert!(fc.assistant.name.is_none());
    }
}
