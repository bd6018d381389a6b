use super::{ChatPrompt, ChatService, ImageGenerationService};
use crate::models::ImageRef;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum ChatReply {
    Text(String),
    Empty,
    Fail(String),
}

/// Scripted chat provider. Replies cycle; every prompt is recorded.
#[derive(Clone)]
pub struct MockChatClient {
    replies: Arc<Mutex<Vec<ChatReply>>>,
    prompts: Arc<Mutex<Vec<ChatPrompt>>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(ChatReply::Text(response.into()));
        self
    }

    /// Answer without any message content.
    pub fn with_empty_response(self) -> Self {
        self.replies.lock().unwrap().push(ChatReply::Empty);
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(ChatReply::Fail(message.into()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<ChatPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn complete(&self, prompt: ChatPrompt) -> Result<Option<String>> {
        let count = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt);
            prompts.len()
        };

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(Some("{}".to_string()));
        }

        match &replies[(count - 1) % replies.len()] {
            ChatReply::Text(text) => Ok(Some(text.clone())),
            ChatReply::Empty => Ok(None),
            ChatReply::Fail(message) => Err(Error::AiProvider(message.clone())),
        }
    }
}

/// Scripted image provider. Returns a 1x1 PNG unless told otherwise.
#[derive(Clone)]
pub struct MockImageGenerationClient {
    responses: Arc<Mutex<Vec<ImageRef>>>,
    failure: Arc<Mutex<Option<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_image_response(self, response: ImageRef) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_error(self, message: impl Into<String>) -> Self {
        *self.failure.lock().unwrap() = Some(message.into());
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, prompt: &str) -> Result<ImageRef> {
        let count = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(Error::AiProvider(message));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return a tiny valid PNG as default
            Ok(ImageRef::Inline(vec![
                0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
                0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
                0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
                0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49,
                0x44, 0x41, // IDAT chunk
                0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2,
                0x25, 0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
                0x44, 0xAE, 0x42, 0x60, 0x82,
            ]))
        } else {
            Ok(responses[(count - 1) % responses.len()].clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(user: &str) -> ChatPrompt {
        ChatPrompt {
            system: "system".to_string(),
            user: user.to_string(),
            temperature: 0.2,
            json_output: false,
        }
    }

    #[tokio::test]
    async fn test_mock_chat_default_is_empty_object() {
        let client = MockChatClient::new();
        let text = client.complete(prompt("hi")).await.unwrap();
        assert_eq!(text.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_mock_chat_custom_responses_cycle() {
        let client = MockChatClient::new()
            .with_response("first")
            .with_empty_response()
            .with_error("boom");

        assert_eq!(
            client.complete(prompt("a")).await.unwrap().as_deref(),
            Some("first")
        );
        assert_eq!(client.complete(prompt("b")).await.unwrap(), None);
        assert!(client.complete(prompt("c")).await.is_err());

        // Should cycle back
        assert_eq!(
            client.complete(prompt("d")).await.unwrap().as_deref(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn test_mock_chat_records_prompts() {
        let client = MockChatClient::new();
        let shared = client.clone();

        assert_eq!(shared.get_call_count(), 0);
        client.complete(prompt("scene")).await.unwrap();
        assert_eq!(shared.get_call_count(), 1);
        assert_eq!(shared.prompts()[0].user, "scene");
    }

    #[tokio::test]
    async fn test_mock_image_default_is_png() {
        let client = MockImageGenerationClient::new();
        let image = client.generate_image("a cat").await.unwrap();
        assert!(image.to_image_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
        assert_eq!(client.prompts(), vec!["a cat".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_image_error() {
        let client = MockImageGenerationClient::new().with_error("upstream down");
        let err = client.generate_image("a cat").await.unwrap_err();
        assert!(err.to_string().contains("upstream down"));
        assert_eq!(client.get_call_count(), 1);
    }
}
