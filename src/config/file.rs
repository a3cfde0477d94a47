//! TOML configuration file loading
//!
//! Supports `~/.config/sigma/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SigmaConfigFile {
    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Whisper server configuration
    #[serde(default)]
    pub whisper: WhisperFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub tts: TtsFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Path to an `llms.txt` registry (expands `~` and `$VAR`)
    pub registry: Option<String>,

    /// Endpoint used when neither `--name` nor `SIGMA_DEFAULT_LLM` is given
    pub default: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<f64>,
}

/// Whisper server configuration
#[derive(Debug, Default, Deserialize)]
pub struct WhisperFileConfig {
    /// Inference URL
    pub url: Option<String>,

    /// Model identifier forwarded to the server
    pub model: Option<String>,

    /// Spoken language hint
    pub language: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<f64>,
}

/// Speech synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct TtsFileConfig {
    /// Output sample rate in Hz
    pub sample_rate: Option<u32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `SigmaConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> SigmaConfigFile {
    config_file_path().map_or_else(SigmaConfigFile::default, |path| load_config_from(&path))
}

/// Load a config file from an explicit path, falling back to defaults
pub fn load_config_from(path: &Path) -> SigmaConfigFile {
    if !path.exists() {
        return SigmaConfigFile::default();
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
                SigmaConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            SigmaConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/sigma/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("sigma").join("config.toml"))
}
