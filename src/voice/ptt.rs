//! Push-to-talk capture seam

use async_trait::async_trait;

use crate::Result;

/// Captured audio and its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationAudio {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ConversationAudio {
    /// Wrap WAV bytes
    #[must_use]
    pub fn wav(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: "audio/wav".to_string(),
        }
    }
}

/// Something that records audio when the user presses to talk
#[async_trait]
pub trait PushToTalk: Send + Sync {
    /// Wait for the user to finish speaking and return the recording
    async fn capture(&self) -> Result<ConversationAudio>;
}

/// Push-to-talk that hands back a pre-recorded payload
#[derive(Debug, Clone)]
pub struct PassthroughPushToTalk {
    payload: ConversationAudio,
}

impl PassthroughPushToTalk {
    #[must_use]
    pub const fn new(payload: ConversationAudio) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl PushToTalk for PassthroughPushToTalk {
    async fn capture(&self) -> Result<ConversationAudio> {
        Ok(self.payload.clone())
    }
}
