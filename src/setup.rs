//! Interactive first-run setup wizard (`jarvis setup`)

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{
    AssistantFileConfig, JarvisConfigFile, UiFileConfig, VoiceFileConfig,
};
use crate::config::{DEFAULT_ASSISTANT_NAME, DEFAULT_UI_PORT};

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Jarvis Setup\n");

    // Load existing config if present
    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/jarvis/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. Identity
    let name: String = Input::new()
        .with_prompt("Assistant name")
        .default(
            existing
                .assistant
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string()),
        )
        .interact_text()?;

    let default_words = existing
        .assistant
        .wake_words
        .clone()
        .map_or_else(|| format!("{name}, alexa"), |w| w.join(", "));
    let wake_words_input: String = Input::new()
        .with_prompt("Wake words (comma separated)")
        .default(default_words)
        .interact_text()?;
    let wake_words: Vec<String> = wake_words_input
        .split(',')
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    // 2. Voice (optional)
    let mut api_keys = existing.api_keys;
    let enable_voice = Confirm::new()
        .with_prompt("Enable voice (wake word, STT/TTS)?")
        .default(existing.voice.enabled.unwrap_or(true))
        .interact()?;

    let voice = if enable_voice {
        let stt_providers = ["whisper", "deepgram"];
        let stt_idx = Select::new()
            .with_prompt("Speech recognition provider")
            .items(&stt_providers)
            .default(position_of(&stt_providers, existing.voice.stt_provider.as_deref()))
            .interact()?;

        let tts_providers = ["openai", "elevenlabs"];
        let tts_idx = Select::new()
            .with_prompt("Speech synthesis provider")
            .items(&tts_providers)
            .default(position_of(&tts_providers, existing.voice.tts_provider.as_deref()))
            .interact()?;

        if stt_idx == 0 || tts_idx == 0 {
            api_keys.openai = prompt_key("OpenAI", "OPENAI_API_KEY", api_keys.openai.take())?;
        }
        if stt_idx == 1 {
            api_keys.deepgram =
                prompt_key("Deepgram", "DEEPGRAM_API_KEY", api_keys.deepgram.take())?;
        }
        if tts_idx == 1 {
            api_keys.elevenlabs =
                prompt_key("ElevenLabs", "ELEVENLABS_API_KEY", api_keys.elevenlabs.take())?;
        }

        VoiceFileConfig {
            enabled: Some(true),
            stt_provider: Some(stt_providers[stt_idx].to_string()),
            tts_provider: Some(tts_providers[tts_idx].to_string()),
            // Models only carry over when the provider is unchanged
            stt_model: existing
                .voice
                .stt_model
                .filter(|_| existing.voice.stt_provider.as_deref() == Some(stt_providers[stt_idx])),
            tts_model: existing
                .voice
                .tts_model
                .filter(|_| existing.voice.tts_provider.as_deref() == Some(tts_providers[tts_idx])),
            ..existing.voice
        }
    } else {
        VoiceFileConfig {
            enabled: Some(false),
            ..existing.voice
        }
    };

    // 3. UI
    let port: u16 = Input::new()
        .with_prompt("UI port")
        .default(existing.ui.port.unwrap_or(DEFAULT_UI_PORT))
        .interact_text()?;

    let open_browser = Confirm::new()
        .with_prompt("Open the UI in your browser on startup?")
        .default(existing.ui.open_browser.unwrap_or(true))
        .interact()?;

    // 4. Build and write config
    let config_file = JarvisConfigFile {
        assistant: AssistantFileConfig {
            name: Some(name),
            wake_words: Some(wake_words),
            ..existing.assistant
        },
        voice,
        capture: existing.capture,
        api_keys,
        ui: UiFileConfig {
            port: Some(port),
            open_browser: Some(open_browser),
            ..existing.ui
        },
        database: existing.database,
    };

    write_config(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `jarvis -v` to start.");

    Ok(())
}

fn position_of(options: &[&str], current: Option<&str>) -> usize {
    current
        .and_then(|c| options.iter().position(|o| o.eq_ignore_ascii_case(c)))
        .unwrap_or(0)
}

/// Ask for an API key, keeping the current one on empty input
fn prompt_key(
    provider: &str,
    env_hint: &str,
    existing: Option<String>,
) -> anyhow::Result<Option<String>> {
    let masked = existing.as_deref().map(mask_key);

    let prompt = masked.map_or_else(
        || format!("{provider} API key ({env_hint})"),
        |m| format!("{provider} API key (current: {m}, leave blank to keep)"),
    );

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(if input.trim().is_empty() {
        existing
    } else {
        Some(input.trim().to_string())
    })
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Serialize and write the config file
fn write_config(path: &Path, config: &JarvisConfigFile) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::load_config_file_from;

    #[test]
    fn keys_are_masked() {
        assert_eq!(mask_key("sk-1234567890abcd"), "sk-1...abcd");
        assert_eq!(mask_key("short"), "****");
    }

    #[test]
    fn provider_position_defaults_to_first() {
        assert_eq!(position_of(&["whisper", "deepgram"], Some("Deepgram")), 1);
        assert_eq!(position_of(&["whisper", "deepgram"], Some("other")), 0);
        assert_eq!(position_of(&["whisper", "deepgram"], None), 0);
    }

    #[test]
    fn written_config_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = JarvisConfigFile {
            assistant: AssistantFileConfig {
                name: Some("friday".to_string()),
                wake_words: Some(vec!["friday".to_string()]),
                ..AssistantFileConfig::default()
            },
            ..JarvisConfigFile::default()
        };
        write_config(&path, &config).unwrap();

        let loaded = load_config_file_from(&path);
        assert_eq!(loaded.assistant.name.as_deref(), Some("friday"));
        assert!(loaded.voice.enabled.is_none());
    }
}
