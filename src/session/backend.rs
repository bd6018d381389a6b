use crate::illustration::IllustrationService;
use crate::mnemonic::MnemonicService;
use crate::models::{Candidate, ImageRequest, ImageResponse, MnemonicRequest, MnemonicResponse};
use crate::server::{AppState, ErrorBody};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const MNEMONIC_FALLBACK: &str = "生成に失敗しました";
const IMAGE_FALLBACK: &str = "画像生成に失敗しました";

/// Where the session sends its two generation requests.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_mnemonic(&self, word: &str) -> Result<Vec<Candidate>>;
    /// Returns a data URL or a remote URL.
    async fn generate_image(&self, mnemonic: &str, scene: &str) -> Result<String>;
}

/// Talks to the HTTP API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::new_with_client(base_url, Client::new())
    }

    pub fn new_with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// POST a body; non-2xx answers become `failed(message)` using the
    /// server's message, or `fallback` when it sent none.
    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
        failed: fn(String) -> Error,
        fallback: &str,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| fallback.to_string());
            debug!("{} answered {}: {}", path, status, message);
            return Err(failed(message));
        }

        serde_json::from_str(&body).map_err(|_| failed(fallback.to_string()))
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate_mnemonic(&self, word: &str) -> Result<Vec<Candidate>> {
        let response: MnemonicResponse = self
            .post(
                "/api/generate-mnemonic",
                &MnemonicRequest {
                    word: word.to_string(),
                },
                Error::MnemonicFailed,
                MNEMONIC_FALLBACK,
            )
            .await?;
        Ok(response.candidates)
    }

    async fn generate_image(&self, mnemonic: &str, scene: &str) -> Result<String> {
        let response: ImageResponse = self
            .post(
                "/api/generate-image",
                &ImageRequest {
                    mnemonic: mnemonic.to_string(),
                    scene: scene.to_string(),
                },
                Error::ImageFailed,
                IMAGE_FALLBACK,
            )
            .await?;
        Ok(response.image_url)
    }
}

/// Calls the services in-process, skipping HTTP.
pub struct LocalBackend {
    mnemonic: Arc<MnemonicService>,
    illustration: Arc<IllustrationService>,
}

impl LocalBackend {
    pub fn new(state: &AppState) -> Self {
        Self {
            mnemonic: state.mnemonic.clone(),
            illustration: state.illustration.clone(),
        }
    }
}

#[async_trait]
impl GenerationBackend for LocalBackend {
    async fn generate_mnemonic(&self, word: &str) -> Result<Vec<Candidate>> {
        self.mnemonic.generate(word).await
    }

    async fn generate_image(&self, mnemonic: &str, scene: &str) -> Result<String> {
        let image = self.illustration.generate(mnemonic, scene).await?;
        Ok(image.to_image_url())
    }
}
