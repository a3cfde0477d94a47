//! Voice processing module
//!
//! Whisper-backed speech-to-text, a local formant synthesiser for replies,
//! and the push-to-talk capture seam.

mod ptt;
mod stt;
mod tts;

pub use ptt::{ConversationAudio, PassthroughPushToTalk, PushToTalk};
pub use stt::{
    AudioInput, DEFAULT_WHISPER_TIMEOUT, DEFAULT_WHISPER_URL, SpeechToText, WHISPER_URL_ENV,
    WhisperRequest, WhisperResult, WhisperSpeechToText, build_payload, extract_transcript,
    transcribe_audio, whisper_url_from,
};
pub use tts::{
    DEFAULT_SAMPLE_RATE, FormantTextToSpeech, TextToSpeech, save_speech, synthesize_speech,
};
