//! Client-side session orchestration
//!
//! Holds the current word, candidates, selected image, daily quota, and
//! history, and drives the two generation calls. Quota and history are
//! loaded once from the injected store and written back in full after every
//! change.
//!
//! ```text
//! Idle ─submit→ GeneratingMnemonic ─ok→ CandidatesReady ─select→ GeneratingImage ─ok→ ImageReady
//!   ↑                  │ err                  ↑                        │ err            │
//!   └──────────────────┘                      └────────────────────────┘                │
//!                                             ↑ select (another candidate) ─────────────┘
//! ```

pub mod backend;
pub mod notifier;

pub use backend::{GenerationBackend, HttpBackend, LocalBackend};
pub use notifier::{ConsoleNotifier, MockNotifier, Notifier};

use crate::models::{
    today, Candidate, History, HistoryItem, QuotaState, HISTORY_KEY, LIMIT_KEY,
};
use crate::storage::{load_json, save_json, KeyValueStore};
use crate::{Error, Result};
use tracing::{info, warn};

pub const QUOTA_NOTICE: &str = "本日の無料枠が終了しました。プランのご案内ページへ移動します。";
pub const CLEAR_CONFIRM: &str = "履歴をすべて削除しますか？";
const MNEMONIC_FALLBACK: &str = "生成に失敗しました";
const IMAGE_FALLBACK: &str = "画像生成に失敗しました";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    GeneratingMnemonic,
    CandidatesReady,
    GeneratingImage,
    ImageReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Empty,
    /// Daily quota used up; no request was made.
    QuotaExhausted,
    /// Candidates are ready; holds how many.
    Generated(usize),
    /// The request failed; holds the notice shown.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Holds the image URL that was added to history.
    Generated(String),
    Failed(String),
}

pub struct Session {
    store: Box<dyn KeyValueStore>,
    backend: Box<dyn GenerationBackend>,
    notifier: Box<dyn Notifier>,
    plan_url: String,
    state: SessionState,
    word: String,
    candidates: Vec<Candidate>,
    selected: Option<usize>,
    image_url: Option<String>,
    quota: QuotaState,
    history: History,
}

impl Session {
    /// Load persisted history and quota, resetting a quota from another day.
    pub fn load(
        store: Box<dyn KeyValueStore>,
        backend: Box<dyn GenerationBackend>,
        notifier: Box<dyn Notifier>,
        plan_url: impl Into<String>,
    ) -> Result<Self> {
        let history = load_json::<History>(&*store, HISTORY_KEY)
            .unwrap_or_default()
            .bounded();
        let quota = load_json::<QuotaState>(&*store, LIMIT_KEY)
            .map(|q| q.normalized(today()))
            .unwrap_or_else(|| QuotaState::for_day(today()));

        info!(
            "Loaded session: {} history items, {}/{} generations left today",
            history.len(),
            quota.remaining(),
            crate::models::DAILY_LIMIT
        );

        let session = Self {
            store,
            backend,
            notifier,
            plan_url: plan_url.into(),
            state: SessionState::Idle,
            word: String::new(),
            candidates: Vec::new(),
            selected: None,
            image_url: None,
            quota,
            history,
        };
        session.save_quota()?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn quota(&self) -> &QuotaState {
        &self.quota
    }

    pub fn remaining(&self) -> u32 {
        self.quota.remaining()
    }

    pub fn history(&self) -> &[HistoryItem] {
        self.history.items()
    }

    /// Ask for mnemonic candidates for `word`.
    pub async fn submit_word(&mut self, word: &str) -> Result<SubmitOutcome> {
        let word = word.trim();
        if word.is_empty() {
            return Ok(SubmitOutcome::Empty);
        }

        let current = self.quota.clone().normalized(today());
        if current != self.quota {
            self.quota = current;
            if let Err(e) = self.save_quota() {
                warn!("Could not persist quota reset: {}", e);
            }
        }

        if self.quota.is_exhausted() {
            info!("Daily quota exhausted; not generating '{}'", word);
            self.notifier.notify(QUOTA_NOTICE);
            self.notifier.open_url(&self.plan_url);
            return Ok(SubmitOutcome::QuotaExhausted);
        }

        self.state = SessionState::GeneratingMnemonic;
        self.word = word.to_string();
        self.candidates.clear();
        self.selected = None;
        self.image_url = None;

        match self.backend.generate_mnemonic(word).await {
            Ok(candidates) if !candidates.is_empty() => {
                let count = candidates.len();
                let mut quota = self.quota.clone();
                quota.increment();
                if let Err(e) = save_json(&*self.store, LIMIT_KEY, &quota) {
                    return Ok(self.fail_mnemonic(notice_text(e, MNEMONIC_FALLBACK)));
                }
                self.quota = quota;
                self.candidates = candidates;
                self.state = SessionState::CandidatesReady;
                info!(
                    "Got {} candidates for '{}' ({} left today)",
                    count,
                    word,
                    self.quota.remaining()
                );
                Ok(SubmitOutcome::Generated(count))
            }
            Ok(_) => Ok(self.fail_mnemonic(MNEMONIC_FALLBACK.to_string())),
            Err(e) => Ok(self.fail_mnemonic(notice_text(e, MNEMONIC_FALLBACK))),
        }
    }

    fn fail_mnemonic(&mut self, message: String) -> SubmitOutcome {
        warn!("Mnemonic generation failed: {}", message);
        self.notifier.notify(&message);
        self.state = SessionState::Idle;
        SubmitOutcome::Failed(message)
    }

    /// Generate the illustration for candidate `index` and record it.
    pub async fn select_candidate(&mut self, index: usize) -> Result<SelectOutcome> {
        if !matches!(
            self.state,
            SessionState::CandidatesReady | SessionState::ImageReady
        ) {
            return Err(Error::Validation(
                "No candidates to choose from".to_string(),
            ));
        }
        let candidate = self
            .candidates
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("No candidate at index {}", index)))?;

        self.selected = Some(index);
        self.state = SessionState::GeneratingImage;
        self.image_url = None;

        match self
            .backend
            .generate_image(&candidate.mnemonic, &candidate.scene)
            .await
        {
            Ok(image_url) => {
                let mut history = self.history.clone();
                history.push_front(HistoryItem::new(&self.word, &candidate, image_url.clone()));
                if let Err(e) = save_json(&*self.store, HISTORY_KEY, &history) {
                    return Ok(self.fail_image(notice_text(e, IMAGE_FALLBACK)));
                }
                self.history = history;
                self.image_url = Some(image_url.clone());
                self.state = SessionState::ImageReady;
                info!("Saved image for '{}' ({} in history)", self.word, self.history.len());
                Ok(SelectOutcome::Generated(image_url))
            }
            Err(e) => Ok(self.fail_image(notice_text(e, IMAGE_FALLBACK))),
        }
    }

    fn fail_image(&mut self, message: String) -> SelectOutcome {
        warn!("Image generation failed: {}", message);
        self.notifier.notify(&message);
        self.state = SessionState::CandidatesReady;
        SelectOutcome::Failed(message)
    }

    /// Empty the history after the user confirms. Returns whether it was cleared.
    pub fn clear_history(&mut self) -> Result<bool> {
        if !self.notifier.confirm(CLEAR_CONFIRM) {
            return Ok(false);
        }
        save_json(&*self.store, HISTORY_KEY, &History::new())?;
        self.history.clear();
        info!("History cleared");
        Ok(true)
    }

    fn save_quota(&self) -> Result<()> {
        save_json(&*self.store, LIMIT_KEY, &self.quota)
    }
}

/// The text shown to the user for a failed request.
fn notice_text(err: Error, fallback: &str) -> String {
    let message = match err {
        Error::MnemonicFailed(m) | Error::ImageFailed(m) | Error::Validation(m) => m,
        other => other.to_string(),
    };
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockChatClient, MockImageGenerationClient};
    use crate::models::{day_key, DAILY_LIMIT, HISTORY_CAP};
    use crate::server::AppState;
    use crate::storage::MemoryStore;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const THREE: &str = r#"{"candidates":[
        {"mnemonic":"あ、番頭んとこ置いてきぼり","scene":"番頭が荷物を置き去りにする"},
        {"mnemonic":"アバンドン、船を捨てて泳ぎ出す","scene":"船から飛び込む水夫"},
        {"mnemonic":"あばん、どーんと見捨てる夜","scene":"夜道で振り返らない旅人"}
    ]}"#;

    struct Harness {
        session: Session,
        store: MemoryStore,
        chat: MockChatClient,
        image_gen: MockImageGenerationClient,
        notifier: MockNotifier,
    }

    fn harness_with(
        store: MemoryStore,
        chat: MockChatClient,
        image_gen: MockImageGenerationClient,
        notifier: MockNotifier,
    ) -> Harness {
        let state = AppState::new(Arc::new(chat.clone()), Arc::new(image_gen.clone()));
        let session = Session::load(
            Box::new(store.clone()),
            Box::new(LocalBackend::new(&state)),
            Box::new(notifier.clone()),
            "https://example.com/plan",
        )
        .unwrap();
        Harness {
            session,
            store,
            chat,
            image_gen,
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with(
            MemoryStore::new(),
            MockChatClient::new().with_response(THREE),
            MockImageGenerationClient::new(),
            MockNotifier::new(),
        )
    }

    fn stored_quota(store: &MemoryStore) -> QuotaState {
        load_json(store, LIMIT_KEY).unwrap()
    }

    fn stored_history(store: &MemoryStore) -> History {
        load_json(store, HISTORY_KEY).unwrap()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let h = harness();
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.session.history().is_empty());
        assert_eq!(h.session.remaining(), DAILY_LIMIT);
        assert_eq!(stored_quota(&h.store).date, day_key(today()));
    }

    #[tokio::test]
    async fn test_submit_success_increments_and_persists_quota() {
        let mut h = harness();

        let outcome = h.session.submit_word("  abandon ").await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Generated(3));
        assert_eq!(h.session.state(), SessionState::CandidatesReady);
        assert_eq!(h.session.word(), "abandon");
        assert_eq!(h.session.quota().count, 1);
        assert_eq!(stored_quota(&h.store).count, 1);
    }

    #[tokio::test]
    async fn test_blank_submit_is_ignored() {
        let mut h = harness();
        assert_eq!(h.session.submit_word("   ").await.unwrap(), SubmitOutcome::Empty);
        assert_eq!(h.chat.get_call_count(), 0);
        assert_eq!(h.session.quota().count, 0);
    }

    #[tokio::test]
    async fn test_sixth_attempt_is_blocked_without_backend_call() {
        let mut h = harness();

        for _ in 0..DAILY_LIMIT {
            let outcome = h.session.submit_word("abandon").await.unwrap();
            assert_eq!(outcome, SubmitOutcome::Generated(3));
        }
        assert_eq!(h.chat.get_call_count(), DAILY_LIMIT as usize);

        let outcome = h.session.submit_word("abandon").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::QuotaExhausted);
        assert_eq!(h.chat.get_call_count(), DAILY_LIMIT as usize);
        assert_eq!(h.notifier.notices(), vec![QUOTA_NOTICE.to_string()]);
        assert_eq!(
            h.notifier.opened_urls(),
            vec!["https://example.com/plan".to_string()]
        );
        assert_eq!(h.session.remaining(), 0);
    }

    #[tokio::test]
    async fn test_yesterdays_quota_resets_before_increment() {
        let yesterday = QuotaState {
            date: day_key(today() - Duration::days(1)),
            count: DAILY_LIMIT,
        };
        let store = MemoryStore::new()
            .with_entry(LIMIT_KEY, &serde_json::to_string(&yesterday).unwrap());
        let mut h = harness_with(
            store,
            MockChatClient::new().with_response(THREE),
            MockImageGenerationClient::new(),
            MockNotifier::new(),
        );

        assert_eq!(h.session.quota().count, 0);
        let outcome = h.session.submit_word("abandon").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Generated(3));

        let quota = stored_quota(&h.store);
        assert_eq!(quota.date, day_key(today()));
        assert_eq!(quota.count, 1);
    }

    #[tokio::test]
    async fn test_mnemonic_failure_returns_to_idle_without_quota_use() {
        let mut h = harness_with(
            MemoryStore::new(),
            MockChatClient::new().with_response(r#"{"candidates":[]}"#),
            MockImageGenerationClient::new(),
            MockNotifier::new(),
        );

        let outcome = h.session.submit_word("abandon").await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Failed("No candidates returned".to_string())
        );
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.session.candidates().is_empty());
        assert_eq!(h.session.quota().count, 0);
        assert_eq!(h.notifier.notices(), vec!["No candidates returned".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_word_surfaces_validation_message() {
        let mut h = harness();
        let outcome = h.session.submit_word("abc123").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Failed("Invalid word".to_string()));
        assert_eq!(h.chat.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_select_candidate_records_history() {
        let mut h = harness();
        h.session.submit_word("abandon").await.unwrap();

        let outcome = h.session.select_candidate(1).await.unwrap();

        let SelectOutcome::Generated(url) = outcome else {
            panic!("expected an image");
        };
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(h.session.state(), SessionState::ImageReady);
        assert_eq!(h.session.selected(), Some(1));
        assert_eq!(h.session.image_url(), Some(url.as_str()));

        let item = &h.session.history()[0];
        assert_eq!(item.word, "abandon");
        assert_eq!(item.mnemonic, h.session.candidates()[1].mnemonic);
        assert_eq!(item.scene, h.session.candidates()[1].scene);
        assert_eq!(stored_history(&h.store).len(), 1);
    }

    #[tokio::test]
    async fn test_image_failure_returns_to_candidates() {
        let mut h = harness_with(
            MemoryStore::new(),
            MockChatClient::new().with_response(THREE),
            MockImageGenerationClient::new().with_error("upstream down"),
            MockNotifier::new(),
        );
        h.session.submit_word("abandon").await.unwrap();

        let outcome = h.session.select_candidate(0).await.unwrap();

        assert!(matches!(outcome, SelectOutcome::Failed(ref m) if m.contains("upstream down")));
        assert_eq!(h.session.state(), SessionState::CandidatesReady);
        assert_eq!(h.session.candidates().len(), 3);
        assert!(h.session.image_url().is_none());
        assert!(h.session.history().is_empty());
        assert_eq!(h.image_gen.get_call_count(), 1);
    }

    #[tokio::test]
    async fn test_select_requires_candidates() {
        let mut h = harness();
        assert!(matches!(
            h.session.select_candidate(0).await,
            Err(Error::Validation(_))
        ));

        h.session.submit_word("abandon").await.unwrap();
        assert!(matches!(
            h.session.select_candidate(3).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(h.image_gen.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_stays_bounded_across_selections() {
        let mut existing = History::new();
        for i in 0..HISTORY_CAP {
            existing.push_front(HistoryItem::new(
                &format!("old{}", i),
                &Candidate::new("m", "s"),
                "https://img.example/old.png".to_string(),
            ));
        }
        let store = MemoryStore::new()
            .with_entry(HISTORY_KEY, &serde_json::to_string(&existing).unwrap());
        let mut h = harness_with(
            store,
            MockChatClient::new().with_response(THREE),
            MockImageGenerationClient::new(),
            MockNotifier::new(),
        );

        h.session.submit_word("abandon").await.unwrap();
        h.session.select_candidate(0).await.unwrap();

        let history = stored_history(&h.store);
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.items()[0].word, "abandon");
        assert_eq!(history.items()[1].word, format!("old{}", HISTORY_CAP - 1));
        assert!(history.items().iter().all(|item| item.word != "old0"));
    }

    #[tokio::test]
    async fn test_clear_history_requires_confirmation() {
        let mut h = harness_with(
            MemoryStore::new(),
            MockChatClient::new().with_response(THREE),
            MockImageGenerationClient::new(),
            MockNotifier::new().with_confirm_reply(false),
        );
        h.session.submit_word("abandon").await.unwrap();
        h.session.select_candidate(0).await.unwrap();

        assert!(!h.session.clear_history().unwrap());
        assert_eq!(h.session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_history_persists_empty_list() {
        let mut h = harness();
        h.session.submit_word("abandon").await.unwrap();
        h.session.select_candidate(0).await.unwrap();

        assert!(h.session.clear_history().unwrap());
        assert!(h.session.history().is_empty());
        assert!(stored_history(&h.store).is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_storage_starts_fresh() {
        let store = MemoryStore::new()
            .with_entry(HISTORY_KEY, "{broken")
            .with_entry(LIMIT_KEY, "[]");
        let h = harness_with(
            store,
            MockChatClient::new(),
            MockImageGenerationClient::new(),
            MockNotifier::new(),
        );
        assert!(h.session.history().is_empty());
        assert_eq!(h.session.quota().count, 0);
    }

    /// Accepts `writes_left` writes, then fails every later one.
    #[derive(Clone)]
    struct FullDiskStore {
        inner: MemoryStore,
        writes_left: Arc<AtomicUsize>,
    }

    impl FullDiskStore {
        fn new(writes_left: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                writes_left: Arc::new(AtomicUsize::new(writes_left)),
            }
        }
    }

    impl KeyValueStore for FullDiskStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            let left = self.writes_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(Error::Storage("disk full".to_string()));
            }
            self.writes_left.store(left - 1, Ordering::SeqCst);
            self.inner.set(key, value)
        }
    }

    fn session_on(store: FullDiskStore, notifier: MockNotifier) -> Session {
        let state = AppState::new(
            Arc::new(MockChatClient::new().with_response(THREE)),
            Arc::new(MockImageGenerationClient::new()),
        );
        Session::load(
            Box::new(store),
            Box::new(LocalBackend::new(&state)),
            Box::new(notifier),
            "https://example.com/plan",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_quota_write_failure_returns_to_idle() {
        // One write for the quota at load, none after.
        let store = FullDiskStore::new(1);
        let notifier = MockNotifier::new();
        let mut session = session_on(store.clone(), notifier.clone());

        let outcome = session.submit_word("abandon").await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Failed("Storage error: disk full".to_string())
        );
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.candidates().is_empty());
        assert_eq!(session.quota().count, 0);
        assert_eq!(
            notifier.notices(),
            vec!["Storage error: disk full".to_string()]
        );
        let stored: QuotaState = load_json(&store.inner, LIMIT_KEY).unwrap();
        assert_eq!(stored.count, 0);
    }

    #[tokio::test]
    async fn test_history_write_failure_keeps_candidates_selectable() {
        // Load and the quota increment succeed; the history write fails.
        let store = FullDiskStore::new(2);
        let notifier = MockNotifier::new();
        let mut session = session_on(store.clone(), notifier.clone());
        session.submit_word("abandon").await.unwrap();

        let outcome = session.select_candidate(0).await.unwrap();

        assert_eq!(
            outcome,
            SelectOutcome::Failed("Storage error: disk full".to_string())
        );
        assert_eq!(session.state(), SessionState::CandidatesReady);
        assert!(session.history().is_empty());
        assert!(session.image_url().is_none());
        assert_eq!(
            notifier.notices(),
            vec!["Storage error: disk full".to_string()]
        );

        store.writes_left.store(1, Ordering::SeqCst);
        let outcome = session.select_candidate(1).await.unwrap();
        assert!(matches!(outcome, SelectOutcome::Generated(_)));
        assert_eq!(session.history().len(), 1);
        assert_eq!(stored_history(&store.inner).len(), 1);
    }

    #[tokio::test]
    async fn test_clear_history_write_failure_keeps_history() {
        let store = FullDiskStore::new(3);
        let mut session = session_on(store.clone(), MockNotifier::new());
        session.submit_word("abandon").await.unwrap();
        session.select_candidate(0).await.unwrap();

        assert!(matches!(session.clear_history(), Err(Error::Storage(_))));
        assert_eq!(session.history().len(), 1);
        assert_eq!(stored_history(&store.inner).len(), 1);
    }

    #[test]
    fn test_notice_text_prefers_message() {
        assert_eq!(
            notice_text(Error::ImageFailed("No image produced".to_string()), IMAGE_FALLBACK),
            "No image produced"
        );
        assert_eq!(
            notice_text(Error::MnemonicFailed(String::new()), MNEMONIC_FALLBACK),
            MNEMONIC_FALLBACK
        );
    }
}
