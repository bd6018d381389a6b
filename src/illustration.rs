//! Illustration generation for a chosen mnemonic.

use crate::ai::{ChatPrompt, ChatService, ImageGenerationService};
use crate::models::ImageRef;
use crate::{prompts, Error, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_FIELD_LEN: usize = 200;
const TRANSLATE_TEMPERATURE: f32 = 0.2;

/// Both fields must be 1–200 characters.
pub fn validate_selection(mnemonic: &str, scene: &str) -> Result<()> {
    let ok = |s: &str| {
        let len = s.chars().count();
        (1..=MAX_FIELD_LEN).contains(&len)
    };
    if ok(mnemonic) && ok(scene) {
        Ok(())
    } else {
        Err(Error::Validation("Invalid body".to_string()))
    }
}

pub struct IllustrationService {
    chat: Arc<dyn ChatService>,
    image_gen: Arc<dyn ImageGenerationService>,
}

impl IllustrationService {
    pub fn new(chat: Arc<dyn ChatService>, image_gen: Arc<dyn ImageGenerationService>) -> Self {
        Self { chat, image_gen }
    }

    /// Render the scene into one simple English sentence, keeping the
    /// original text when the model gives nothing back.
    pub async fn translate_scene(&self, scene: &str) -> Result<String> {
        let prompt = ChatPrompt {
            system: prompts::TRANSLATE_SYSTEM.trim().to_string(),
            user: scene.to_string(),
            temperature: TRANSLATE_TEMPERATURE,
            json_output: false,
        };

        let translated = self
            .chat
            .complete(prompt)
            .await?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| scene.to_string());

        debug!("Translated scene '{}' -> '{}'", scene, translated);
        Ok(translated)
    }

    pub async fn generate(&self, mnemonic: &str, scene: &str) -> Result<ImageRef> {
        validate_selection(mnemonic, scene)?;
        info!("Generating illustration for '{}'", mnemonic);

        let scene_en = self
            .translate_scene(scene)
            .await
            .map_err(|e| Error::ImageFailed(e.to_string()))?;

        let image = self
            .image_gen
            .generate_image(&prompts::image_prompt(&scene_en))
            .await
            .map_err(|e| Error::ImageFailed(e.to_string()))?;

        match &image {
            ImageRef::Inline(bytes) => info!("Received inline image ({} bytes)", bytes.len()),
            ImageRef::Remote(url) => info!("Received image URL: {}", url),
        }
        Ok(image)
    }
}
