//! HTTP API serving the mnemonic and illustration endpoints.
//!
//! ```text
//! POST /api/generate-mnemonic   {word}              → {candidates}
//! POST /api/generate-image      {mnemonic, scene}   → {imageUrl}
//! ```
//!
//! Any other method on these paths answers 405 `METHOD_NOT_ALLOWED`.

mod api;

pub use api::{ApiError, ErrorBody, ErrorCode, ErrorDetail};

use crate::ai::{ChatService, ImageGenerationService, OpenAiChatClient, OpenAiImageClient};
use crate::illustration::IllustrationService;
use crate::mnemonic::MnemonicService;
use crate::models::Config;
use crate::{Error, Result};
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Router state injected into every handler.
///
/// Cheap to clone, both services are reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub mnemonic: Arc<MnemonicService>,
    pub illustration: Arc<IllustrationService>,
}

impl AppState {
    pub fn new(chat: Arc<dyn ChatService>, image_gen: Arc<dyn ImageGenerationService>) -> Self {
        Self {
            mnemonic: Arc::new(MnemonicService::new(chat.clone())),
            illustration: Arc::new(IllustrationService::new(chat, image_gen)),
        }
    }

    /// Wire the OpenAI clients from configuration. A missing key is not
    /// fatal here; each provider call fails with a configuration error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.openai_api_key.clone();
        if api_key.is_none() {
            warn!("OPENAI_API_KEY not set; generation requests will fail");
        }

        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        info!("Chat provider: OpenAI (model: {})", config.chat_model);
        let chat: Arc<dyn ChatService> = Arc::new(OpenAiChatClient::new_with_client(
            api_key.clone(),
            config.chat_model.clone(),
            http_client.clone(),
        ));

        info!("Image provider: OpenAI (model: {})", config.image_model);
        let image_gen: Arc<dyn ImageGenerationService> = Arc::new(
            OpenAiImageClient::new_with_client(api_key, config.image_model.clone(), http_client),
        );

        Ok(Self::new(chat, image_gen))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/generate-mnemonic",
            post(api::generate_mnemonic).fallback(api::method_not_allowed),
        )
        .route(
            "/api/generate-image",
            post(api::generate_image).fallback(api::method_not_allowed),
        )
        .with_state(state)
}

/// Serve on an already-bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "API listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .map_err(|e| Error::Generic(format!("server error: {e}")))?;

    info!("API shut down");
    Ok(())
}

pub async fn bind(bind_addr: &str) -> Result<TcpListener> {
    TcpListener::bind(bind_addr)
        .await
        .map_err(|e| Error::Config(format!("bind failed on {bind_addr}: {e}")))
}
