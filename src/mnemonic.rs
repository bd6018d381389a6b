//! Mnemonic generation
//!
//! Validates a vocabulary word, asks the language model for three
//! 語呂合わせ candidates, and safety-filters what comes back.

use crate::ai::{ChatPrompt, ChatService};
use crate::models::Candidate;
use crate::{prompts, safety, Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const MAX_WORD_LEN: usize = 30;
const TEMPERATURE: f32 = 0.7;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z']+$").expect("valid word regex"));

/// Outcome of reading the model's JSON answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateParse {
    Parsed(Vec<Candidate>),
    Malformed,
}

/// Accepts one or more ASCII letters or apostrophes, at most 30 long.
pub fn validate_word(word: &str) -> Result<&str> {
    if word.len() > MAX_WORD_LEN || !WORD_RE.is_match(word) {
        return Err(Error::Validation("Invalid word".to_string()));
    }
    Ok(word)
}

/// Extract `candidates` from the model output. A missing or non-array field
/// yields an empty list; entries without two non-blank strings are skipped.
pub fn parse_candidates(text: &str) -> CandidateParse {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return CandidateParse::Malformed,
    };

    let candidates = match value.get("candidates") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value::<Candidate>(item.clone()).ok())
            .filter(|c| !c.mnemonic.trim().is_empty() && !c.scene.trim().is_empty())
            .collect(),
        _ => Vec::new(),
    };

    CandidateParse::Parsed(candidates)
}

pub struct MnemonicService {
    chat: Arc<dyn ChatService>,
}

impl MnemonicService {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }

    /// Produce between one and three filtered candidates for `word`.
    pub async fn generate(&self, word: &str) -> Result<Vec<Candidate>> {
        let word = validate_word(word)?;
        info!("Generating mnemonics for '{}'", word);

        let prompt = ChatPrompt {
            system: prompts::MNEMONIC_SYSTEM.trim().to_string(),
            user: prompts::mnemonic_prompt(word),
            temperature: TEMPERATURE,
            json_output: true,
        };

        let text = self
            .chat
            .complete(prompt)
            .await
            .map_err(|e| Error::MnemonicFailed(e.to_string()))?
            .unwrap_or_else(|| "{}".to_string());

        let candidates = match parse_candidates(&text) {
            CandidateParse::Parsed(candidates) => candidates,
            CandidateParse::Malformed => {
                warn!("Language model returned malformed JSON for '{}': {}", word, text);
                return Err(Error::MnemonicFailed(
                    "Malformed JSON from language model".to_string(),
                ));
            }
        };

        if candidates.is_empty() {
            return Err(Error::MnemonicFailed("No candidates returned".to_string()));
        }

        let received = candidates.len();
        let safe = safety::filter_candidates(candidates);
        if safe.is_empty() {
            warn!("All {} candidates for '{}' were filtered", received, word);
            return Err(Error::MnemonicFailed("Filtered all candidates".to_string()));
        }

        info!(
            "Returning {} of {} candidates for '{}'",
            safe.len(),
            received,
            word
        );
        Ok(safe)
    }
}
