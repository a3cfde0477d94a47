//! Response body helpers shared by the LLM and Whisper clients

use std::collections::BTreeMap;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::Value;

use crate::{Error, Result};

/// Media type and charset of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentType {
    pub media: String,
    pub charset: String,
}

impl ContentType {
    /// Parse a `Content-Type` header, defaulting the charset to UTF-8
    pub(crate) fn parse(header: Option<&str>) -> Self {
        let mut parts = header.unwrap_or_default().split(';');
        let media = parts.next().unwrap_or_default().trim().to_lowercase();
        let charset = parts
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "utf-8".to_string());
        Self { media, charset }
    }

    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        Self::parse(headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()))
    }

    pub(crate) fn is_json(&self) -> bool {
        matches!(self.media.as_str(), "application/json" | "text/json")
    }
}

/// Heuristic for JSON served with a non-JSON content type
pub(crate) fn looks_like_json(text: &str) -> bool {
    matches!(text.trim_start().chars().next(), Some('{' | '['))
}

/// Flatten response headers into a sorted map
pub(crate) fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// Decode a body with the declared charset
///
/// Unknown labels fall back to UTF-8. Malformed sequences become U+FFFD.
pub(crate) fn decode_body(raw: &[u8], charset: &str) -> String {
    let encoding = Encoding::for_label(charset.trim().as_bytes()).unwrap_or(UTF_8);
    encoding.decode_without_bom_handling(raw).0.into_owned()
}

/// Decode a raw body as JSON
///
/// An empty body yields `Ok(None)`.
///
/// # Errors
///
/// Returns error if the body is non-empty and not valid JSON
pub(crate) fn json_payload(raw: &[u8], charset: &str) -> Result<Option<Value>> {
    if raw.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&decode_body(raw, charset))
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("response payload is not valid JSON: {e}")))
}
