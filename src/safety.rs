//! Keyword safety filter for generated mnemonics.

use crate::models::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum candidates handed back to callers.
pub const MAX_CANDIDATES: usize = 3;

static BANNED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(死|殺|差別|ヘイト|fuck|shit)").expect("valid banned-term regex"));

pub fn contains_banned_term(text: &str) -> bool {
    BANNED_RE.is_match(text)
}

/// Drop candidates with a banned term in either field, keeping at most
/// [`MAX_CANDIDATES`] in their original order.
pub fn filter_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| !contains_banned_term(&c.mnemonic) && !contains_banned_term(&c.scene))
        .take(MAX_CANDIDATES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_banned_terms_match_in_both_languages() {
        assert!(contains_banned_term("死ぬほど覚える"));
        assert!(contains_banned_term("殺風景な部屋"));
        assert!(contains_banned_term("差別はだめ"));
        assert!(contains_banned_term("ヘイトの声"));
        assert!(contains_banned_term("What the FUCK"));
        assert!(contains_banned_term("Shitake"));
        assert!(!contains_banned_term("あばんどん、船を捨てる"));
    }

    #[test]
    fn test_filter_removes_candidates_with_banned_scene() {
        let filtered = filter_candidates(vec![
            Candidate::new("安全な語呂", "a calm lake"),
            Candidate::new("もうひとつ", "someone yelling shit"),
        ]);
        assert_eq!(filtered, vec![Candidate::new("安全な語呂", "a calm lake")]);
    }

    #[test]
    fn test_filter_caps_at_three() {
        let candidates: Vec<Candidate> = (0..5)
            .map(|i| Candidate::new(format!("語呂{}", i), format!("scene {}", i)))
            .collect();
        let filtered = filter_candidates(candidates);
        assert_eq!(filtered.len(), MAX_CANDIDATES);
        assert_eq!(filtered[0].mnemonic, "語呂0");
        assert_eq!(filtered[2].mnemonic, "語呂2");
    }

    #[test]
    fn test_filter_is_idempotent() {
        let candidates = vec![
            Candidate::new("ヘイトな語呂", "bad"),
            Candidate::new("語呂A", "scene A"),
            Candidate::new("語呂B", "scene B"),
            Candidate::new("語呂C", "scene C"),
            Candidate::new("語呂D", "scene D"),
        ];
        let once = filter_candidates(candidates);
        let twice = filter_candidates(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_can_remove_everything() {
        let filtered = filter_candidates(vec![Candidate::new("死", "殺")]);
        assert!(filtered.is_empty());
    }
}
