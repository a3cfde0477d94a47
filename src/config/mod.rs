//! Configuration management for Sigma
//!
//! Values resolve as env > `~/.config/sigma/config.toml` > defaults.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::llm::DEFAULT_TIMEOUT as DEFAULT_LLM_TIMEOUT;
use crate::registry::DEFAULT_LLM_ENV;
use crate::voice::{DEFAULT_SAMPLE_RATE, DEFAULT_WHISPER_TIMEOUT, WHISPER_URL_ENV, whisper_url_from};
use crate::{Error, Result};

/// Sigma runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the `llms.txt` registry; `None` uses the bundled copy
    /// Set via `SIGMA_LLMS_PATH`
    pub llms_path: Option<PathBuf>,

    /// Fallback endpoint name from the config file
    ///
    /// Only set when `SIGMA_DEFAULT_LLM` is absent; the registry reads that
    /// variable itself.
    pub default_llm: Option<String>,

    /// LLM request timeout
    pub llm_timeout: Duration,

    /// Whisper server configuration
    pub whisper: WhisperConfig,

    /// Speech synthesis sample rate in Hz
    pub tts_sample_rate: u32,
}

/// Whisper server configuration
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Inference URL
    pub url: String,

    /// Model identifier
    pub model: Option<String>,

    /// Language hint
    pub language: Option<String>,

    /// Request timeout
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// # Errors
    ///
    /// Returns error if an environment variable holds an unusable value
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let llms_path = std::env::var("SIGMA_LLMS_PATH")
            .ok()
            .or(fc.llm.registry)
            .filter(|p| !p.trim().is_empty())
            .map(|p| expand_path(&p));

        let default_llm = if std::env::var_os(DEFAULT_LLM_ENV).is_some() {
            None
        } else {
            fc.llm.default
        };

        let llm_timeout = env_seconds("SIGMA_LLM_TIMEOUT")?
            .or(fc.llm.timeout_secs.map(|s| seconds("llm.timeout_secs", s)).transpose()?)
            .unwrap_or(DEFAULT_LLM_TIMEOUT);

        let whisper_env = std::env::var(WHISPER_URL_ENV).ok();
        let whisper = WhisperConfig {
            url: whisper_url_from(whisper_env.as_deref(), fc.whisper.url.as_deref())?,
            model: std::env::var("SIGMA_WHISPER_MODEL").ok().or(fc.whisper.model),
            language: std::env::var("SIGMA_WHISPER_LANGUAGE")
                .ok()
                .or(fc.whisper.language),
            timeout: env_seconds("SIGMA_WHISPER_TIMEOUT")?
                .or(fc
                    .whisper
                    .timeout_secs
                    .map(|s| seconds("whisper.timeout_secs", s))
                    .transpose()?)
                .unwrap_or(DEFAULT_WHISPER_TIMEOUT),
        };

        let tts_sample_rate = match std::env::var("SIGMA_TTS_SAMPLE_RATE") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                Error::Config(format!("SIGMA_TTS_SAMPLE_RATE must be an integer, got '{raw}'"))
            })?,
            Err(_) => fc.tts.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
        };

        tracing::debug!(
            llms_path = ?llms_path,
            whisper_url = %whisper.url,
            tts_sample_rate,
            "configuration loaded"
        );

        Ok(Self {
            llms_path,
            default_llm,
            llm_timeout,
            whisper,
            tts_sample_rate,
        })
    }
}

/// Convert a positive, finite number of seconds into a `Duration`
///
/// # Errors
///
/// Returns error naming `source` if the value is not positive and finite
pub fn seconds(source: &str, value: f64) -> Result<Duration> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Config(format!(
            "{source} must be a positive number of seconds, got {value}"
        )));
    }
    Ok(Duration::from_secs_f64(value))
}

fn env_seconds(var: &str) -> Result<Option<Duration>> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{var} must be a number of seconds, got '{raw}'")))?;
    seconds(var, value).map(Some)
}

/// Expand `$VAR`, `${VAR}` and a leading `~` in a path
///
/// Unknown variables are left untouched.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    let home = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf());
    expand_path_with(raw, |name| std::env::var(name).ok(), home)
}

/// [`expand_path`] with an explicit variable lookup
///
/// `HOME` from `lookup` wins over `fallback_home` for `~`.
pub fn expand_path_with(
    raw: &str,
    lookup: impl Fn(&str) -> Option<String>,
    fallback_home: Option<PathBuf>,
) -> PathBuf {
    let expanded = expand_vars(raw, &lookup);

    let rest = if expanded == "~" {
        Some("")
    } else {
        expanded.strip_prefix("~/")
    };

    match rest {
        Some(rest) => {
            let home = lookup("HOME").map(PathBuf::from).or(fallback_home);
            home.map_or_else(|| PathBuf::from(&expanded), |home| home.join(rest))
        }
        None => PathBuf::from(expanded),
    }
}

fn is_var_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn expand_vars(raw: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after.find(|c: char| !is_var_char(c)).unwrap_or(after.len());
            (&after[..end], end)
        };

        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}
