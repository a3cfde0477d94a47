//! HTTP client for LLM endpoints listed in `llms.txt`

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Map, Value};
use url::Url;

use super::extract::extract_text;
use crate::auth::{AuthSource, LLM_AUTH};
use crate::http::{ContentType, collect_headers, decode_body, json_payload, looks_like_json};
use crate::registry::{Endpoint, resolve_llm_endpoint};
use crate::{Error, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const REQUEST_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const REQUEST_ACCEPT: &str = "application/json, text/plain";

/// Response returned by an LLM query
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Endpoint display name
    pub name: String,
    /// Endpoint URL
    pub url: String,
    /// Normalised response text
    pub text: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Raw response body
    pub raw: Vec<u8>,
    /// Charset reported by the server
    pub encoding: String,
}

impl LlmResponse {
    /// Decode the raw body as JSON
    ///
    /// Returns `Ok(None)` when the body is empty.
    ///
    /// # Errors
    ///
    /// Returns error if the body is not valid JSON
    pub fn json(&self) -> Result<Option<Value>> {
        json_payload(&self.raw, &self.encoding)
    }
}

/// Options for a single LLM query
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Prompt text, overriding any `prompt` in `extra_payload`
    pub prompt: Option<String>,
    /// Provider-specific fields merged into the request body
    pub extra_payload: Option<Map<String, Value>>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LlmRequest {
    fn default() -> Self {
        Self {
            prompt: None,
            extra_payload: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LlmRequest {
    /// Request carrying only a prompt
    #[must_use]
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }
}

fn ensure_prompt(prompt: &Value) -> Result<Value> {
    match prompt {
        Value::String(s) if s.trim().is_empty() => Err(Error::InvalidInput(
            "prompt must be a non-empty string".to_string(),
        )),
        Value::String(_) => Ok(prompt.clone()),
        _ => Err(Error::InvalidInput("prompt must be a string".to_string())),
    }
}

/// Build the JSON request body
///
/// An explicit prompt replaces any `prompt` field in the extra payload and is
/// placed last.
///
/// # Errors
///
/// Returns error if a prompt is blank or not a string, or the body would be
/// empty
pub fn prepare_payload(
    prompt: Option<&str>,
    extra_payload: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>> {
    let mut payload = extra_payload.cloned().unwrap_or_default();

    if let Some(prompt) = prompt {
        payload.shift_remove("prompt");
        let prompt = ensure_prompt(&Value::String(prompt.to_string()))?;
        payload.insert("prompt".to_string(), prompt);
    } else if let Some(existing) = payload.get_mut("prompt") {
        *existing = ensure_prompt(existing)?;
    }

    if payload.is_empty() {
        return Err(Error::InvalidInput(
            "Payload must include at least one field; provide prompt or extra_payload".to_string(),
        ));
    }
    Ok(payload)
}

/// Async client for LLM endpoints
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    auth: AuthSource,
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClient {
    /// Create a client that reads credentials from `SIGMA_LLM_AUTH_*`
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            auth: AuthSource::Env(LLM_AUTH),
        }
    }

    /// Override the credential source
    #[must_use]
    pub fn with_auth(mut self, auth: AuthSource) -> Self {
        self.auth = auth;
        self
    }

    /// Send a request to `endpoint` and normalise the reply
    ///
    /// # Errors
    ///
    /// Returns error if the URL scheme is unsupported, the payload is
    /// invalid, the endpoint is unreachable or answers with a non-2xx status,
    /// or a JSON reply has no recognisable text
    pub async fn query(&self, endpoint: &Endpoint, request: &LlmRequest) -> Result<LlmResponse> {
        let name = &endpoint.name;
        let url = Url::parse(&endpoint.url)
            .map_err(|e| Error::Llm(format!("LLM endpoint '{name}' has an invalid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Llm(format!(
                "LLM endpoint '{name}' uses unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let payload =
            prepare_payload(request.prompt.as_deref(), request.extra_payload.as_ref())?;
        let body = serde_json::to_vec(&payload)?;

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, REQUEST_CONTENT_TYPE)
            .header(ACCEPT, REQUEST_ACCEPT)
            .timeout(request.timeout)
            .body(body);
        if let Some(auth) = self.auth.resolve()? {
            builder = builder.header(AUTHORIZATION, auth.expose());
        }

        tracing::debug!(endpoint = %name, url = %endpoint.url, "sending llm request");

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Failed to reach LLM endpoint '{name}': {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "LLM request to '{name}' failed with HTTP status {}",
                status.as_u16()
            )));
        }

        let content_type = ContentType::from_headers(response.headers());
        let headers = collect_headers(response.headers());
        let raw = response
            .bytes()
            .await
            .map_err(|e| Error::Llm(format!("Failed to reach LLM endpoint '{name}': {e}")))?
            .to_vec();
        let text_body = decode_body(&raw, &content_type.charset);

        tracing::debug!(
            endpoint = %name,
            status = status.as_u16(),
            bytes = raw.len(),
            content_type = %content_type.media,
            "received llm response"
        );

        let text = interpret_body(name, &content_type, &raw, text_body)?;

        Ok(LlmResponse {
            name: name.clone(),
            url: endpoint.url.clone(),
            text,
            status: status.as_u16(),
            headers,
            raw,
            encoding: content_type.charset,
        })
    }
}

/// Turn a successful response body into reply text
fn interpret_body(
    name: &str,
    content_type: &ContentType,
    raw: &[u8],
    text_body: String,
) -> Result<String> {
    let is_json_content = content_type.is_json();
    let mut parsed = None;

    if !raw.is_empty() && (is_json_content || looks_like_json(&text_body)) {
        match serde_json::from_str::<Value>(&text_body) {
            Ok(value) => parsed = Some(value),
            Err(e) => {
                tracing::debug!(endpoint = %name, error = %e, "llm response is not valid json");
                return Err(Error::Llm(format!(
                    "LLM endpoint '{name}' returned invalid JSON"
                )));
            }
        }
    }

    match parsed {
        Some(value) if !value.is_null() => extract_text(&value).ok_or_else(|| {
            Error::Llm(format!(
                "LLM endpoint '{name}' returned JSON without a recognised text field"
            ))
        }),
        _ if is_json_content => {
            let detail = if raw.is_empty() {
                "an empty JSON response"
            } else {
                "invalid JSON"
            };
            Err(Error::Llm(format!("LLM endpoint '{name}' returned {detail}")))
        }
        _ => Ok(text_body),
    }
}

/// Options for routing a prompt through the registry
#[derive(Debug, Clone, Default)]
pub struct LlmQueryOptions {
    /// Endpoint name; falls back to `SIGMA_DEFAULT_LLM`, then the first entry
    pub name: Option<String>,
    /// Registry path; `None` uses the bundled `llms.txt`
    pub path: Option<PathBuf>,
    /// Request parameters other than the prompt
    pub request: LlmRequest,
}

/// Something that answers prompts
#[async_trait]
pub trait LlmRouter: Send + Sync {
    /// Send `prompt` and return the normalised reply
    async fn query(&self, prompt: Option<&str>, options: &LlmQueryOptions) -> Result<LlmResponse>;
}

/// Router that resolves endpoints from `llms.txt`
#[derive(Debug, Clone, Default)]
pub struct ConfiguredLlmRouter {
    client: LlmClient,
}

impl ConfiguredLlmRouter {
    /// Router using the given client
    #[must_use]
    pub const fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LlmRouter for ConfiguredLlmRouter {
    async fn query(&self, prompt: Option<&str>, options: &LlmQueryOptions) -> Result<LlmResponse> {
        let endpoint = resolve_llm_endpoint(options.name.as_deref(), options.path.as_deref())?;
        let mut request = options.request.clone();
        if let Some(prompt) = prompt {
            request.prompt = Some(prompt.to_string());
        }
        self.client.query(&endpoint, &request).await
    }
}

/// Send `prompt` to the configured endpoint
///
/// # Errors
///
/// Returns error if the endpoint cannot be resolved or the request fails
pub async fn query_llm(prompt: Option<&str>, options: &LlmQueryOptions) -> Result<LlmResponse> {
    ConfiguredLlmRouter::default().query(prompt, options).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_prompt_overrides_extra_and_goes_last() {
        let extra = object(json!({"prompt": "old", "temperature": 0.2}));
        let payload = prepare_payload(Some("new"), Some(&extra)).unwrap();
        let keys: Vec<_> = payload.keys().map(String::as_str).collect();
        assert_eq!(keys, ["temperature", "prompt"]);
        assert_eq!(payload["prompt"], "new");
    }

    #[test]
    fn test_extra_prompt_is_validated() {
        let extra = object(json!({"prompt": "   "}));
        assert!(prepare_payload(None, Some(&extra)).is_err());

        let extra = object(json!({"prompt": 5}));
        let err = prepare_payload(None, Some(&extra)).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let err = prepare_payload(Some(" \n "), None).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_empty_payload_rejected() {
        let err = prepare_payload(None, Some(&Map::new())).unwrap_err();
        assert!(err.to_string().contains("at least one field"));
    }

    #[test]
    fn test_extra_only_payload() {
        let extra = object(json!({"messages": []}));
        let payload = prepare_payload(None, Some(&extra)).unwrap();
        assert!(payload.contains_key("messages"));
    }

    fn json_type() -> ContentType {
        ContentType::parse(Some("application/json"))
    }

    #[test]
    fn test_interpret_plain_text() {
        let ct = ContentType::parse(Some("text/plain"));
        let text = interpret_body("x", &ct, b"hello", "hello".to_string()).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_interpret_json_like_plain_text() {
        let ct = ContentType::parse(Some("text/plain"));
        let body = r#"{"text": "hi"}"#;
        let text = interpret_body("x", &ct, body.as_bytes(), body.to_string()).unwrap();
        assert_eq!(text, "hi");

        let err = interpret_body("x", &ct, b"{invalid", "{invalid".to_string()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_interpret_json_errors() {
        let err = interpret_body("x", &json_type(), b"", String::new()).unwrap_err();
        assert!(err.to_string().contains("an empty JSON response"));

        let err = interpret_body("x", &json_type(), b"null", "null".to_string()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));

        let body = r#"{"unexpected": 1}"#;
        let err = interpret_body("x", &json_type(), body.as_bytes(), body.to_string()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "LLM endpoint 'x' returned JSON without a recognised text field"
        );
    }
}
