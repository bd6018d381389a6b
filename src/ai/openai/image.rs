use super::client::OpenAiHttpClient;
use super::types::{ImageGenerationRequest, ImageGenerationResponse};
use crate::ai::ImageGenerationService;
use crate::models::ImageRef;
use crate::{Error, Result};
use async_trait::async_trait;

const IMAGE_SIZE: &str = "1024x1024";

pub struct OpenAiImageClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiImageClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            http: OpenAiHttpClient::new(api_key),
            model,
        }
    }

    pub fn new_with_client(
        api_key: Option<String>,
        model: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, client),
            model,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ImageGenerationService for OpenAiImageClient {
    async fn generate_image(&self, prompt: &str) -> Result<ImageRef> {
        let request = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: IMAGE_SIZE.to_string(),
        };

        let response: ImageGenerationResponse =
            self.http.post("/v1/images/generations", &request).await?;

        let image_data = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::AiProvider("No image produced".to_string()))?;

        if let Some(b64_json) = image_data.b64_json.filter(|b64| !b64.is_empty()) {
            use base64::Engine as _;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64_json)
                .map_err(|e| Error::Generic(format!("Failed to decode base64 image: {}", e)))?;
            Ok(ImageRef::Inline(bytes))
        } else if let Some(url) = image_data.url.filter(|url| !url.is_empty()) {
            Ok(ImageRef::Remote(url))
        } else {
            Err(Error::AiProvider("No image produced".to_string()))
        }
    }
}
