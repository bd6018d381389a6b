//! Data models and structures
//!
//! Defines the mnemonic candidates, persisted client state (history and
//! daily quota), the HTTP request/response bodies, and runtime configuration.

use base64::Engine as _;
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Free generations allowed per calendar day.
pub const DAILY_LIMIT: u32 = 5;

/// Maximum number of history entries kept in storage.
pub const HISTORY_CAP: usize = 50;

/// Storage key for the history list.
pub const HISTORY_KEY: &str = "gw_history_v1";

/// Storage key for the quota counter.
pub const LIMIT_KEY: &str = "gw_limit_v1";

/// One mnemonic proposal returned by the language model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub mnemonic: String,
    pub scene: String,
}

impl Candidate {
    pub fn new(mnemonic: impl Into<String>, scene: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            scene: scene.into(),
        }
    }
}

/// Record of one completed word → mnemonic → image generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub word: String,
    pub mnemonic: String,
    pub scene: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub created_at: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

impl HistoryItem {
    pub fn new(word: &str, candidate: &Candidate, image_url: String) -> Self {
        Self {
            word: word.to_string(),
            mnemonic: candidate.mnemonic.clone(),
            scene: candidate.scene.clone(),
            image_url,
            created_at: Local::now(),
            favorite: None,
        }
    }
}

/// Most-recent-first history, bounded to [`HISTORY_CAP`] entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct History {
    items: Vec<HistoryItem>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend an item, evicting the oldest entries past the cap.
    pub fn push_front(&mut self, item: HistoryItem) {
        self.items.insert(0, item);
        self.items.truncate(HISTORY_CAP);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Enforce the cap on lists loaded from storage.
    pub fn bounded(mut self) -> Self {
        self.items.truncate(HISTORY_CAP);
        self
    }
}

/// Day-keyed usage counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaState {
    pub date: String, // Format: YYYY-MM-DD
    pub count: u32,
}

impl QuotaState {
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            date: day_key(day),
            count: 0,
        }
    }

    /// Reset the counter when it belongs to a different day.
    pub fn normalized(self, today: NaiveDate) -> Self {
        if self.date == day_key(today) {
            self
        } else {
            Self::for_day(today)
        }
    }

    pub fn remaining(&self) -> u32 {
        DAILY_LIMIT.saturating_sub(self.count)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }
}

pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Image produced by the generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Decoded image bytes returned inline.
    Inline(Vec<u8>),
    /// Provider-hosted image location.
    Remote(String),
}

impl ImageRef {
    /// Render as something an `<img src>` accepts.
    pub fn to_image_url(&self) -> String {
        match self {
            ImageRef::Inline(bytes) => format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
            ImageRef::Remote(url) => url.clone(),
        }
    }
}

// HTTP API bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MnemonicRequest {
    pub word: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MnemonicResponse {
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub mnemonic: String,
    pub scene: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

// Configuration
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_DATA_DIR: &str = ".goro";
const DEFAULT_PLAN_URL: &str = "https://example.com/plan";

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub image_model: String,
    pub bind_addr: String,
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub plan_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            chat_model: env_or("CHAT_MODEL", DEFAULT_CHAT_MODEL),
            image_model: env_or("IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            bind_addr: env_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            api_base_url: env_or("API_BASE_URL", DEFAULT_API_BASE_URL),
            data_dir: PathBuf::from(env_or("DATA_DIR", DEFAULT_DATA_DIR)),
            plan_url: env_or("PLAN_URL", DEFAULT_PLAN_URL),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
