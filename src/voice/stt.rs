//! Speech-to-text (STT) via `whisper.cpp`-style servers
//!
//! Audio is sent base64-encoded inside a JSON body. Replies may be JSON in a
//! handful of shapes or plain text.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Map, Value};

use crate::auth::{AuthSource, WHISPER_AUTH};
use crate::config::expand_path;
use crate::http::{ContentType, collect_headers, decode_body, json_payload, looks_like_json};
use crate::{Error, Result};

/// Default inference URL of a local `whisper.cpp` server
pub const DEFAULT_WHISPER_URL: &str = "http://127.0.0.1:8080/inference";

/// Environment variable overriding the inference URL
pub const WHISPER_URL_ENV: &str = "SIGMA_WHISPER_URL";

/// Default request timeout
pub const DEFAULT_WHISPER_TIMEOUT: Duration = Duration::from_secs(30);

const NO_TRANSCRIPT: &str = "Whisper server response did not include a transcription";

/// Audio handed to a transcriber
#[derive(Debug, Clone)]
pub enum AudioInput {
    /// Encoded audio bytes (WAV, MP3, ...)
    Bytes(Vec<u8>),
    /// Path to an audio file; `~` and `$VAR` are expanded
    Path(PathBuf),
}

impl AudioInput {
    /// Load the raw audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the audio is empty
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let data = match self {
            Self::Bytes(data) => data,
            Self::Path(path) => std::fs::read(expand_path(&path.to_string_lossy()))?,
        };
        if data.is_empty() {
            return Err(Error::InvalidInput(
                "audio payload must be non-empty".to_string(),
            ));
        }
        Ok(data)
    }
}

impl From<Vec<u8>> for AudioInput {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }
}

impl From<PathBuf> for AudioInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// Transcription parameters
#[derive(Debug, Clone)]
pub struct WhisperRequest {
    /// Inference URL; falls back to `SIGMA_WHISPER_URL`, then the default
    pub url: Option<String>,
    /// Model identifier
    pub model: Option<String>,
    /// Language hint
    pub language: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Extra server parameters merged into the body
    pub extra_params: Option<Map<String, Value>>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for WhisperRequest {
    fn default() -> Self {
        Self {
            url: None,
            model: None,
            language: None,
            temperature: None,
            extra_params: None,
            timeout: DEFAULT_WHISPER_TIMEOUT,
        }
    }
}

/// Transcription returned by a Whisper server
#[derive(Debug, Clone)]
pub struct WhisperResult {
    /// Transcript text
    pub text: String,
    /// Detected or echoed language
    pub language: Option<String>,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Raw response body
    pub raw: Vec<u8>,
    /// Charset reported by the server
    pub encoding: String,
}

impl WhisperResult {
    /// Decode the raw body as JSON
    ///
    /// # Errors
    ///
    /// Returns error if the body is not valid JSON
    pub fn json(&self) -> Result<Option<Value>> {
        json_payload(&self.raw, &self.encoding)
    }
}

/// Pick the inference URL from an env value, a configured fallback, or the default
///
/// # Errors
///
/// Returns error if the env value is blank after trimming
pub fn whisper_url_from(env_value: Option<&str>, fallback: Option<&str>) -> Result<String> {
    if let Some(raw) = env_value {
        let url = raw.trim();
        if url.is_empty() {
            return Err(Error::Config(format!(
                "Environment variable {WHISPER_URL_ENV} is set but empty after stripping."
            )));
        }
        return Ok(url.to_string());
    }
    Ok(fallback
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_WHISPER_URL)
        .to_string())
}

/// Build the JSON request body
///
/// # Errors
///
/// Returns error if the temperature is not finite or `extra_params` tries to
/// replace the audio
pub fn build_payload(audio: &[u8], request: &WhisperRequest) -> Result<Map<String, Value>> {
    let mut payload = Map::new();
    payload.insert("audio".to_string(), Value::String(STANDARD.encode(audio)));

    if let Some(model) = &request.model {
        payload.insert("model".to_string(), Value::String(model.clone()));
    }
    if let Some(language) = &request.language {
        payload.insert("language".to_string(), Value::String(language.clone()));
    }
    if let Some(temperature) = request.temperature {
        let number = serde_json::Number::from_f64(temperature).ok_or_else(|| {
            Error::InvalidInput("temperature must be a finite number".to_string())
        })?;
        payload.insert("temperature".to_string(), Value::Number(number));
    }
    if let Some(extra) = &request.extra_params {
        if extra.contains_key("audio") {
            return Err(Error::InvalidInput(
                "extra_params must not override the audio payload".to_string(),
            ));
        }
        payload.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    Ok(payload)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn non_empty(language: Option<String>) -> Option<String> {
    language.filter(|l| !l.is_empty())
}

/// Pull `(text, language)` out of a decoded Whisper reply
///
/// The language is reported even when no transcript is found. A top-level
/// `language` is kept as given, while an empty nested one defers to it.
#[must_use]
pub fn extract_transcript(value: &Value) -> (Option<String>, Option<String>) {
    match value {
        Value::Object(map) => {
            let language = map
                .get("language")
                .and_then(Value::as_str)
                .map(str::to_string);

            for key in ["text", "transcription", "transcript"] {
                if let Some(text) = non_empty_str(map.get(key)) {
                    return (Some(text.to_string()), language);
                }
            }

            if let Some(segments) = map.get("segments").filter(|v| v.is_array())
                && let (Some(text), segment_language) = extract_transcript(segments)
            {
                return (Some(text), non_empty(segment_language).or(language));
            }

            for key in ["result", "results", "data", "response", "output"] {
                if let Some(nested) = map.get(key)
                    && let (Some(text), nested_language) = extract_transcript(nested)
                {
                    return (Some(text), non_empty(nested_language).or(language));
                }
            }

            if let Some(texts) = map.get("text").filter(|v| v.is_array())
                && let (Some(text), nested_language) = extract_transcript(texts)
            {
                return (Some(text), non_empty(nested_language).or(language));
            }

            (None, language)
        }
        Value::Array(items) => {
            let mut fragments = String::new();
            let mut found = false;
            let mut language = None;
            for item in items {
                let (text, item_language) = extract_transcript(item);
                if let Some(text) = text.filter(|t| !t.is_empty()) {
                    fragments.push_str(&text);
                    found = true;
                }
                if language.is_none() {
                    language = non_empty(item_language);
                }
            }
            (found.then_some(fragments), language)
        }
        Value::String(text) if !text.is_empty() => (Some(text.clone()), None),
        _ => (None, None),
    }
}

/// Something that turns speech into text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe `audio`
    async fn transcribe(&self, audio: AudioInput, request: &WhisperRequest)
    -> Result<WhisperResult>;
}

/// HTTP client for `whisper.cpp`-style servers
#[derive(Debug, Clone)]
pub struct WhisperSpeechToText {
    client: Client,
    auth: AuthSource,
}

impl Default for WhisperSpeechToText {
    fn default() -> Self {
        Self::new()
    }
}

impl WhisperSpeechToText {
    /// Create a client that reads credentials from `SIGMA_WHISPER_AUTH_*`
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            auth: AuthSource::Env(WHISPER_AUTH),
        }
    }

    /// Override the credential source
    #[must_use]
    pub fn with_auth(mut self, auth: AuthSource) -> Self {
        self.auth = auth;
        self
    }
}

#[async_trait]
impl SpeechToText for WhisperSpeechToText {
    async fn transcribe(
        &self,
        audio: AudioInput,
        request: &WhisperRequest,
    ) -> Result<WhisperResult> {
        let audio = audio.into_bytes()?;
        let payload = build_payload(&audio, request)?;
        let body = serde_json::to_vec(&payload)?;

        let url = match &request.url {
            Some(url) => url.clone(),
            None => whisper_url_from(std::env::var(WHISPER_URL_ENV).ok().as_deref(), None)?,
        };

        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .header(ACCEPT, "application/json, text/plain")
            .timeout(request.timeout)
            .body(body);
        if let Some(auth) = self.auth.resolve()? {
            builder = builder.header(AUTHORIZATION, auth.expose());
        }

        tracing::debug!(url = %url, audio_bytes = audio.len(), "sending audio to whisper");

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Stt(format!("Failed to reach Whisper server: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Stt(format!(
                "Whisper request failed with HTTP status {}",
                status.as_u16()
            )));
        }

        let content_type = ContentType::from_headers(response.headers());
        let headers = collect_headers(response.headers());
        let raw = response
            .bytes()
            .await
            .map_err(|e| Error::Stt(format!("Failed to reach Whisper server: {e}")))?
            .to_vec();
        if raw.is_empty() {
            return Err(Error::Stt(
                "Whisper server returned an empty response".to_string(),
            ));
        }

        let text_body = decode_body(&raw, &content_type.charset);
        let (text, language) = if content_type.media == "application/json"
            || looks_like_json(&text_body)
        {
            let parsed: Value = serde_json::from_str(&text_body)
                .map_err(|_| Error::Stt("Whisper server returned invalid JSON".to_string()))?;
            match extract_transcript(&parsed) {
                (Some(text), language) => (text, language),
                (None, _) => return Err(Error::Stt(NO_TRANSCRIPT.to_string())),
            }
        } else {
            (text_body, None)
        };

        tracing::debug!(
            status = status.as_u16(),
            chars = text.len(),
            language = ?language,
            "whisper transcription received"
        );

        Ok(WhisperResult {
            text,
            language,
            status: status.as_u16(),
            headers,
            raw,
            encoding: content_type.charset,
        })
    }
}

/// Transcribe `audio` with the default Whisper client
///
/// # Errors
///
/// Returns error if the audio is unusable, the server is unreachable, or the
/// reply holds no transcription
pub async fn transcribe_audio(audio: AudioInput, request: &WhisperRequest) -> Result<WhisperResult> {
    WhisperSpeechToText::new().transcribe(audio, request).await
}
