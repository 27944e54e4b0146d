use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

/// Forms whose in-progress values are mirrored while the visitor types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftForm {
    BookTicket,
    VisaApplication,
    Contact,
}

impl DraftForm {
    pub fn key(&self) -> &'static str {
        match self {
            DraftForm::BookTicket => "book_ticket_form_v1",
            DraftForm::VisaApplication => "visa_application_form_v1",
            DraftForm::Contact => "contact_form_v1",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        [DraftForm::BookTicket, DraftForm::VisaApplication, DraftForm::Contact]
            .into_iter()
            .find(|f| f.key() == key)
    }
}

/// Fields that hold uploaded files; they never go into a draft.
const FILE_FIELDS: &[&str] = &["passport_file", "bank_file", "passport_file_url", "bank_statement_url"];

pub const MAX_CLIENT_ID_LEN: usize = 128;

/// Largest draft body accepted, in bytes.
pub const MAX_DRAFT_BYTES: usize = 16 * 1024;

/// Drafts untouched for this long are dropped.
pub const DRAFT_IDLE_SECS: i64 = 24 * 60 * 60;

pub const MAX_DRAFTS: usize = 5_000;

#[derive(Debug)]
struct Draft {
    fields: Map<String, Value>,
    saved_at: DateTime<Utc>,
}

/// In-memory draft mirror. A draft survives until the matching form is
/// submitted successfully, the client clears it, or it sits idle past the
/// time limit. When the store is full the oldest draft makes room. A restart
/// loses everything.
#[derive(Debug)]
pub struct DraftStore {
    drafts: Mutex<HashMap<(DraftForm, String), Draft>>,
    idle: Duration,
    max_drafts: usize,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::with_limits(Duration::seconds(DRAFT_IDLE_SECS), MAX_DRAFTS)
    }
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle: Duration, max_drafts: usize) -> Self {
        Self {
            drafts: Mutex::new(HashMap::new()),
            idle,
            max_drafts: max_drafts.max(1),
        }
    }

    pub async fn save(&self, form: DraftForm, client_id: &str, mut fields: Map<String, Value>, now: DateTime<Utc>) {
        for f in FILE_FIELDS {
            fields.remove(*f);
        }

        let mut drafts = self.drafts.lock().await;
        self.prune(&mut drafts, now);

        let key = (form, client_id.to_owned());
        if !drafts.contains_key(&key) && drafts.len() >= self.max_drafts {
            let oldest = drafts
                .iter()
                .min_by_key(|(_, d)| d.saved_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                drafts.remove(&oldest);
                log::warn!("draft store full, dropped the oldest draft");
            }
        }
        drafts.insert(key, Draft { fields, saved_at: now });
    }

    pub async fn load(&self, form: DraftForm, client_id: &str, now: DateTime<Utc>) -> Option<Map<String, Value>> {
        let mut drafts = self.drafts.lock().await;
        self.prune(&mut drafts, now);
        drafts
            .get(&(form, client_id.to_owned()))
            .map(|d| d.fields.clone())
    }

    pub async fn clear(&self, form: DraftForm, client_id: &str) -> bool {
        self.drafts
            .lock()
            .await
            .remove(&(form, client_id.to_owned()))
            .is_some()
    }

    pub async fn draft_count(&self) -> usize {
        self.drafts.lock().await.len()
    }

    fn prune(&self, drafts: &mut HashMap<(DraftForm, String), Draft>, now: DateTime<Utc>) {
        drafts.retain(|_, d| now - d.saved_at <= self.idle);
    }
}

pub fn is_valid_client_id(client_id: &str) -> bool {
    !client_id.is_empty()
        && client_id.len() <= MAX_CLIENT_ID_LEN
        && client_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn form_keys_round_trip() {
        assert_eq!(DraftForm::from_key("visa_application_form_v1"), Some(DraftForm::VisaApplication));
        assert_eq!(DraftForm::from_key("book_ticket_form_v2"), None);
    }

    #[test]
    fn client_ids() {
        assert!(is_valid_client_id("3f2b-tab_1"));
        assert!(!is_valid_client_id(""));
        assert!(!is_valid_client_id("../etc"));
        assert!(!is_valid_client_id(&"x".repeat(MAX_CLIENT_ID_LEN + 1)));
    }

    #[tokio::test]
    async fn save_load_clear() {
        let store = DraftStore::new();
        let now = Utc::now();
        store
            .save(
                DraftForm::BookTicket,
                "tab-1",
                fields(json!({"fullName": "Hana", "passengers": 2, "passport_file_url": "x"})),
                now,
            )
            .await;

        let draft = store.load(DraftForm::BookTicket, "tab-1", now).await.unwrap();
        assert_eq!(draft["fullName"], "Hana");
        assert!(!draft.contains_key("passport_file_url"));

        assert!(store.load(DraftForm::Contact, "tab-1", now).await.is_none());
        assert!(store.clear(DraftForm::BookTicket, "tab-1").await);
        assert!(!store.clear(DraftForm::BookTicket, "tab-1").await);
        assert!(store.load(DraftForm::BookTicket, "tab-1", now).await.is_none());
    }

    #[tokio::test]
    async fn idle_drafts_expire() {
        let store = DraftStore::new();
        let start = Utc::now();
        store
            .save(DraftForm::Contact, "old-tab", fields(json!({"name": "Abebe"})), start)
            .await;
        store
            .save(DraftForm::Contact, "fresh-tab", fields(json!({"name": "Sara"})), start + Duration::hours(20))
            .await;

        let later = start + Duration::seconds(DRAFT_IDLE_SECS + 1);
        assert!(store.load(DraftForm::Contact, "old-tab", later).await.is_none());
        assert!(store.load(DraftForm::Contact, "fresh-tab", later).await.is_some());
        assert_eq!(store.draft_count().await, 1);
    }

    #[tokio::test]
    async fn full_store_drops_the_oldest_draft() {
        let store = DraftStore::with_limits(Duration::hours(1), 3);
        let start = Utc::now();
        for i in 0..10 {
            store
                .save(
                    DraftForm::BookTicket,
                    &format!("tab-{i}"),
                    fields(json!({"n": i})),
                    start + Duration::seconds(i),
                )
                .await;
        }

        assert_eq!(store.draft_count().await, 3);
        let now = start + Duration::seconds(10);
        assert!(store.load(DraftForm::BookTicket, "tab-0", now).await.is_none());
        assert_eq!(store.load(DraftForm::BookTicket, "tab-9", now).await.unwrap()["n"], 9);

        // Re-saving an existing draft never evicts another one.
        store
            .save(DraftForm::BookTicket, "tab-9", fields(json!({"n": 99})), now)
            .await;
        assert_eq!(store.draft_count().await, 3);
        assert!(store.load(DraftForm::BookTicket, "tab-7", now).await.is_some());
    }
}
