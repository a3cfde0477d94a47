//! Speech → LLM → speech round trips
//!
//! A recording is transcribed, the transcript (or an override) is sent to an
//! LLM endpoint, and the reply is rendered back to WAV audio.

use std::path::PathBuf;
use std::sync::Arc;

use crate::llm::{ConfiguredLlmRouter, LlmQueryOptions, LlmResponse, LlmRouter};
use crate::voice::{
    AudioInput, DEFAULT_SAMPLE_RATE, FormantTextToSpeech, PushToTalk, SpeechToText,
    TextToSpeech, WhisperRequest, WhisperResult, WhisperSpeechToText,
};
use crate::{Error, Result};

/// Template used when no prompt override is given
pub const DEFAULT_PROMPT_TEMPLATE: &str = "{transcript}";

const TEMPLATE_KEYS: &str = "transcript, language";

/// Per-call options
#[derive(Debug, Clone)]
pub struct ConversationOptions {
    /// Prompt sent verbatim instead of the rendered template
    pub prompt: Option<String>,
    /// Template with `{transcript}` and `{language}` placeholders
    ///
    /// `None` sends no prompt, for payloads carried entirely by
    /// `llm.request.extra_payload`.
    pub prompt_template: Option<String>,
    /// Transcription parameters
    pub whisper: WhisperRequest,
    /// Endpoint selection and request parameters
    pub llm: LlmQueryOptions,
    /// Sample rate of the spoken reply
    pub tts_sample_rate: u32,
    /// Where to write the reply WAV
    pub output_path: Option<PathBuf>,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            prompt: None,
            prompt_template: Some(DEFAULT_PROMPT_TEMPLATE.to_string()),
            whisper: WhisperRequest::default(),
            llm: LlmQueryOptions::default(),
            tts_sample_rate: DEFAULT_SAMPLE_RATE,
            output_path: None,
        }
    }
}

/// Everything produced by one round trip
#[derive(Debug, Clone)]
pub struct ConversationResult {
    pub transcript: WhisperResult,
    pub prompt: Option<String>,
    pub llm: LlmResponse,
    pub audio: Vec<u8>,
    pub audio_path: Option<PathBuf>,
}

/// The speech, language, and synthesis backends of a conversation
#[derive(Clone)]
pub struct ConversationComponents {
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn LlmRouter>,
    pub tts: Arc<dyn TextToSpeech>,
    /// Used when the caller passes no audio
    pub push_to_talk: Option<Arc<dyn PushToTalk>>,
}

impl Default for ConversationComponents {
    fn default() -> Self {
        Self {
            stt: Arc::new(WhisperSpeechToText::new()),
            llm: Arc::new(ConfiguredLlmRouter::default()),
            tts: Arc::new(FormantTextToSpeech),
            push_to_talk: None,
        }
    }
}

fn unknown_placeholders() -> Error {
    Error::InvalidInput(format!(
        "prompt_template references unknown placeholders; available keys: {TEMPLATE_KEYS}"
    ))
}

fn unbalanced_braces() -> Error {
    Error::InvalidInput("prompt_template has unbalanced braces".to_string())
}

/// Fill `{transcript}` and `{language}` in `template`
///
/// `{{` and `}}` produce literal braces.
///
/// # Errors
///
/// Returns error on an unknown placeholder, a format spec or conversion
/// (`{transcript:>10}`, `{language!r}`), or an unbalanced brace
pub fn render_prompt(template: &str, transcript: &str, language: &str) -> Result<String> {
    let mut out = String::with_capacity(template.len() + transcript.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => return Err(unbalanced_braces()),
                    }
                }
                let (name, spec) = match field.find([':', '!']) {
                    Some(index) => (&field[..index], Some(&field[index..])),
                    None => (field.as_str(), None),
                };
                let text = match name {
                    "transcript" => transcript,
                    "language" => language,
                    _ => return Err(unknown_placeholders()),
                };
                if let Some(spec) = spec {
                    return Err(Error::InvalidInput(format!(
                        "prompt_template placeholder '{{{name}}}' has unsupported format '{spec}'"
                    )));
                }
                out.push_str(text);
            }
            '}' => return Err(unbalanced_braces()),
            c => out.push(c),
        }
    }

    Ok(out)
}

fn resolve_prompt(options: &ConversationOptions, transcript: &WhisperResult) -> Result<Option<String>> {
    if let Some(prompt) = &options.prompt {
        return Ok(Some(prompt.clone()));
    }
    options
        .prompt_template
        .as_deref()
        .map(|template| {
            render_prompt(
                template,
                &transcript.text,
                transcript.language.as_deref().unwrap_or_default(),
            )
        })
        .transpose()
}

/// Transcribe, query, and synthesise a spoken reply
///
/// Without `audio`, the push-to-talk component records one.
///
/// # Errors
///
/// Returns error if no audio is available or any stage fails
pub async fn run_conversation(
    audio: Option<AudioInput>,
    options: &ConversationOptions,
    components: &ConversationComponents,
) -> Result<ConversationResult> {
    let audio = match (audio, &components.push_to_talk) {
        (Some(audio), _) => audio,
        (None, Some(ptt)) => {
            let captured = ptt.capture().await?;
            tracing::debug!(
                bytes = captured.data.len(),
                mime_type = %captured.mime_type,
                "push-to-talk capture complete"
            );
            AudioInput::Bytes(captured.data)
        }
        (None, None) => {
            return Err(Error::Conversation(
                "no audio provided and no push-to-talk capture configured".to_string(),
            ));
        }
    };

    let transcript = components.stt.transcribe(audio, &options.whisper).await?;
    tracing::info!(
        chars = transcript.text.len(),
        language = ?transcript.language,
        "transcribed speech"
    );

    let prompt = resolve_prompt(options, &transcript)?;
    let llm = components.llm.query(prompt.as_deref(), &options.llm).await?;
    tracing::info!(endpoint = %llm.name, chars = llm.text.len(), "llm replied");

    let audio = components.tts.synthesize(&llm.text, options.tts_sample_rate)?;

    let audio_path = match &options.output_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &audio)?;
            tracing::debug!(path = %path.display(), bytes = audio.len(), "wrote reply audio");
            Some(path.clone())
        }
        None => None,
    };

    Ok(ConversationResult {
        transcript,
        prompt,
        llm,
        audio,
        audio_path,
    })
}
