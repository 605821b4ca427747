use async_trait::async_trait;
use chatform_core::{ChatformError, ChatformResult, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The persisted shape of one conversation.
///
/// Downstream analytics read the count, last-activity timestamp and
/// anonymous flag; this subsystem only ever writes the record whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// The session key this conversation is stored under.
    pub session_key: String,
    /// The full ordered transcript.
    pub messages: Vec<Message>,
    /// Denormalized message count.
    pub message_count: usize,
    /// Timestamp of the last write.
    pub last_activity: DateTime<Utc>,
    /// True when no authenticated respondent was attached to the session.
    pub anonymous: bool,
}

impl ConversationRecord {
    /// Builds a record from the current transcript.
    pub fn new(session_key: impl Into<String>, messages: Vec<Message>, anonymous: bool) -> Self {
        let message_count = messages.len();
        Self {
            session_key: session_key.into(),
            messages,
            message_count,
            last_activity: Utc::now(),
            anonymous,
        }
    }
}

/// The external conversation store, addressed by
/// `(form_id, field_id, session_key)`.
///
/// The real backend is a managed record store; tests and local hosts use
/// [`FileConversationStore`]. Deleting conversations is an external
/// administrative operation and deliberately absent here.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetches the conversation for a session key, if one was ever written.
    async fn get(
        &self,
        form_id: &str,
        field_id: &str,
        session_key: &str,
    ) -> ChatformResult<Option<ConversationRecord>>;

    /// Creates or replaces the conversation for a session key.
    async fn upsert(
        &self,
        form_id: &str,
        field_id: &str,
        record: &ConversationRecord,
    ) -> ChatformResult<()>;
}

/// File-based conversation store (one JSON file per conversation).
pub struct FileConversationStore {
    dir: PathBuf,
}

impl FileConversationStore {
    /// Creates the store, creating the backing directory if needed.
    pub async fn new(dir: PathBuf) -> ChatformResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn record_path(&self, form_id: &str, field_id: &str, session_key: &str) -> PathBuf {
        self.dir
            .join(format!("{form_id}_{field_id}_{session_key}.json"))
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn get(
        &self,
        form_id: &str,
        field_id: &str,
        session_key: &str,
    ) -> ChatformResult<Option<ConversationRecord>> {
        let path = self.record_path(form_id, field_id, session_key);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        let record: ConversationRecord = serde_json::from_str(&data)
            .map_err(|e| ChatformError::Store(format!("Failed to parse conversation: {e}")))?;
        Ok(Some(record))
    }

    async fn upsert(
        &self,
        form_id: &str,
        field_id: &str,
        record: &ConversationRecord,
    ) -> ChatformResult<()> {
        let path = self.record_path(form_id, field_id, record.session_key.as_str());
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn temp_store() -> (FileConversationStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = FileConversationStore::new(tmp.path().join("conversations"))
            .await
            .unwrap();
        (store, tmp)
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _tmp) = temp_store().await;
        let result = store.get("f1", "c1", "session_f1_c1_tok").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_upsert_and_get_round_trip() {
        let (store, _tmp) = temp_store().await;
        let messages = vec![Message::welcome("hi"), Message::user("hello")];
        let record = ConversationRecord::new("session_f1_c1_tok", messages, true);

        store.upsert("f1", "c1", &record).await.unwrap();

        let loaded = store
            .get("f1", "c1", "session_f1_c1_tok")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.message_count, 2);
        assert!(loaded.anonymous);
        assert_eq!(loaded.messages[1].content, "hello");
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_record() {
        let (store, _tmp) = temp_store().await;
        let first = ConversationRecord::new("session_f1_c1_tok", vec![Message::user("one")], true);
        store.upsert("f1", "c1", &first).await.unwrap();

        let second = ConversationRecord::new(
            "session_f1_c1_tok",
            vec![Message::user("one"), Message::bot("two")],
            false,
        );
        store.upsert("f1", "c1", &second).await.unwrap();

        let loaded = store
            .get("f1", "c1", "session_f1_c1_tok")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.message_count, 2);
        assert!(!loaded.anonymous);
    }

    #[tokio::test]
    async fn test_records_are_isolated_per_field() {
        let (store, _tmp) = temp_store().await;
        let record = ConversationRecord::new("session_f1_c1_tok", vec![Message::user("hi")], true);
        store.upsert("f1", "c1", &record).await.unwrap();

        assert!(store
            .get("f1", "c2", "session_f1_c1_tok")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_persistence_across_store_instances() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("conversations");

        {
            let store = FileConversationStore::new(dir.clone()).await.unwrap();
            let record =
                ConversationRecord::new("session_f1_c1_tok", vec![Message::user("persist me")], true);
            store.upsert("f1", "c1", &record).await.unwrap();
        }

        {
            let store = FileConversationStore::new(dir).await.unwrap();
            let loaded = store
                .get("f1", "c1", "session_f1_c1_tok")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(loaded.messages[0].content, "persist me");
        }
    }
}
