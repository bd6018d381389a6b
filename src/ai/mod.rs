//! AI service integration for mnemonic and image generation
//!
//! Provides the provider seams used by the mnemonic and illustration
//! services, the OpenAI implementations, and in-process mocks.

pub mod mock;
pub mod openai;

pub use mock::{MockChatClient, MockImageGenerationClient};
pub use openai::{OpenAiChatClient, OpenAiImageClient};

use crate::models::ImageRef;
use crate::Result;
use async_trait::async_trait;

/// One system + user exchange sent to a chat-completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    /// Ask the provider to constrain output to a JSON object.
    pub json_output: bool,
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Returns the text of the first choice, or `None` when the provider
    /// answered without content.
    async fn complete(&self, prompt: ChatPrompt) -> Result<Option<String>>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<ImageRef>;
}
