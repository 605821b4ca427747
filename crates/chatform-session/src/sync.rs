use crate::identity::{FieldContext, SessionKey};
use crate::store::{ConversationRecord, ConversationStore};
use chatform_core::{ChatformResult, Message};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Digest of a transcript's `(role, content, timestamp)` tuples.
///
/// Used to gate writes: an unchanged transcript hashes to the value already
/// persisted and the write is skipped. Message ids are deliberately left
/// out so a reloaded transcript hashes identically to the one that wrote it.
pub fn transcript_digest(messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.role.as_str().as_bytes());
        hasher.update([0x1f]);
        hasher.update(message.content.as_bytes());
        hasher.update([0x1f]);
        hasher.update(message.timestamp.to_rfc3339().as_bytes());
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

/// Debounced, hash-gated writer reconciling the in-memory transcript with
/// the conversation store.
///
/// Every transcript mutation calls [`schedule`](Self::schedule) with a
/// snapshot; the synchronizer restarts its timer, so a burst of appends
/// coalesces into one write carrying the latest snapshot. Before writing it
/// digests the snapshot and skips the write when nothing changed since the
/// last successful one. Failed writes are logged and retried on the next
/// scheduled cycle; the in-memory transcript stays authoritative either
/// way.
///
/// The pending timer is an explicit, abortable task so teardown
/// ([`cancel`](Self::cancel)) is a first-class operation — unmounting a
/// field never leaves a stray write behind.
pub struct PersistenceSynchronizer {
    store: Arc<dyn ConversationStore>,
    context: FieldContext,
    session_key: SessionKey,
    debounce: Duration,
    last_hash: Arc<Mutex<Option<String>>>,
    pending: Option<JoinHandle<()>>,
}

impl PersistenceSynchronizer {
    /// Creates a synchronizer for one session.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        context: FieldContext,
        session_key: SessionKey,
        debounce: Duration,
    ) -> Self {
        Self {
            store,
            context,
            session_key,
            debounce,
            last_hash: Arc::new(Mutex::new(None)),
            pending: None,
        }
    }

    /// Loads persisted history, once per mount.
    ///
    /// Without persistable form context this resolves to no history. A
    /// loaded transcript primes the hash gate so the restore itself never
    /// triggers a redundant write.
    pub async fn load(&self) -> ChatformResult<Vec<Message>> {
        let (Some(form_id), Some(field_id)) = (&self.context.form_id, &self.context.field_id)
        else {
            return Ok(Vec::new());
        };
        let record = self
            .store
            .get(form_id, field_id, self.session_key.as_str())
            .await?;
        match record {
            Some(record) => {
                let mut last_hash = self.last_hash.lock().await;
                *last_hash = Some(transcript_digest(&record.messages));
                Ok(record.messages)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Schedules a debounced write of the given transcript snapshot.
    ///
    /// No-op when the snapshot is empty or the field has no form context
    /// (standalone/demo mode never persists). Otherwise any previously
    /// pending write is aborted and the timer restarts with this snapshot.
    pub fn schedule(&mut self, snapshot: Vec<Message>, anonymous: bool) {
        if snapshot.is_empty() || !self.context.is_persistable() {
            return;
        }
        let (Some(form_id), Some(field_id)) = (
            self.context.form_id.clone(),
            self.context.field_id.clone(),
        ) else {
            return;
        };

        self.cancel();

        let store = Arc::clone(&self.store);
        let last_hash = Arc::clone(&self.last_hash);
        let session_key = self.session_key.clone();
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let digest = transcript_digest(&snapshot);
            let mut last_hash = last_hash.lock().await;
            if last_hash.as_deref() == Some(digest.as_str()) {
                tracing::debug!(session_key = %session_key, "Transcript unchanged, skipping write");
                return;
            }

            let record =
                ConversationRecord::new(session_key.as_str(), snapshot, anonymous);
            match store.upsert(&form_id, &field_id, &record).await {
                Ok(()) => {
                    *last_hash = Some(digest);
                    tracing::debug!(
                        session_key = %session_key,
                        message_count = record.message_count,
                        "Conversation persisted"
                    );
                }
                Err(e) => {
                    // Non-fatal: the in-memory transcript is authoritative
                    // and the next scheduled cycle retries.
                    tracing::warn!(session_key = %session_key, error = %e, "Conversation write failed");
                }
            }
        }));
    }

    /// Aborts the pending debounce timer, if any. Called on unmount.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// True while a debounced write is pending.
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_finished())
    }
}

impl Drop for PersistenceSynchronizer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const DEBOUNCE: Duration = Duration::from_millis(100);

    /// Mock store that counts upserts and can be told to fail them.
    struct MockStore {
        upserts: AtomicUsize,
        fail_upserts: AtomicBool,
        last_record: std::sync::Mutex<Option<ConversationRecord>>,
    }

    impl MockStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                upserts: AtomicUsize::new(0),
                fail_upserts: AtomicBool::new(false),
                last_record: std::sync::Mutex::new(None),
            })
        }

        fn upsert_count(&self) -> usize {
            self.upserts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConversationStore for MockStore {
        async fn get(
            &self,
            _form_id: &str,
            _field_id: &str,
            _session_key: &str,
        ) -> ChatformResult<Option<ConversationRecord>> {
            Ok(self.last_record.lock().unwrap().clone())
        }

        async fn upsert(
            &self,
            _form_id: &str,
            _field_id: &str,
            record: &ConversationRecord,
        ) -> ChatformResult<()> {
            if self.fail_upserts.load(Ordering::SeqCst) {
                return Err(chatform_core::ChatformError::Store(
                    "write refused".to_string(),
                ));
            }
            self.upserts.fetch_add(1, Ordering::SeqCst);
            *self.last_record.lock().unwrap() = Some(record.clone());
            Ok(())
        }
    }

    fn synchronizer(store: Arc<MockStore>) -> PersistenceSynchronizer {
        let context = FieldContext::new("f1", "c1");
        let key = SessionKey::resolve(&context, &crate::identity::ClientInstanceId::new("tok"));
        PersistenceSynchronizer::new(store, context, key, DEBOUNCE)
    }

    async fn settle() {
        tokio::time::sleep(DEBOUNCE * 3).await;
    }

    #[tokio::test]
    async fn test_single_write_after_debounce() {
        let store = MockStore::new();
        let mut sync = synchronizer(store.clone());

        sync.schedule(vec![Message::user("hi")], true);
        assert_eq!(store.upsert_count(), 0);

        settle().await;
        assert_eq!(store.upsert_count(), 1);
        let record = store.last_record.lock().unwrap().clone().unwrap();
        assert_eq!(record.message_count, 1);
        assert!(record.anonymous);
    }

    #[tokio::test]
    async fn test_burst_coalesces_to_one_write() {
        let store = MockStore::new();
        let mut sync = synchronizer(store.clone());

        let first = Message::user("hi");
        let second = Message::bot("hello!");
        sync.schedule(vec![first.clone()], true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        sync.schedule(vec![first, second], true);

        settle().await;
        assert_eq!(store.upsert_count(), 1);
        let record = store.last_record.lock().unwrap().clone().unwrap();
        assert_eq!(record.message_count, 2);
    }

    #[tokio::test]
    async fn test_unchanged_transcript_skips_write() {
        let store = MockStore::new();
        let mut sync = synchronizer(store.clone());
        let messages = vec![Message::user("hi")];

        sync.schedule(messages.clone(), true);
        settle().await;
        assert_eq!(store.upsert_count(), 1);

        sync.schedule(messages, true);
        settle().await;
        assert_eq!(store.upsert_count(), 1);
    }

    #[tokio::test]
    async fn test_changed_transcript_writes_again() {
        let store = MockStore::new();
        let mut sync = synchronizer(store.clone());
        let first = Message::user("hi");

        sync.schedule(vec![first.clone()], true);
        settle().await;

        sync.schedule(vec![first, Message::bot("hello!")], true);
        settle().await;
        assert_eq!(store.upsert_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_snapshot_never_writes() {
        let store = MockStore::new();
        let mut sync = synchronizer(store.clone());
        sync.schedule(Vec::new(), true);
        settle().await;
        assert_eq!(store.upsert_count(), 0);
    }

    #[tokio::test]
    async fn test_standalone_context_never_writes() {
        let store = MockStore::new();
        let context = FieldContext::default();
        let key =
            SessionKey::resolve(&context, &crate::identity::ClientInstanceId::new("tok"));
        let mut sync = PersistenceSynchronizer::new(store.clone(), context, key, DEBOUNCE);

        sync.schedule(vec![Message::user("hi")], true);
        settle().await;
        assert_eq!(store.upsert_count(), 0);
        assert!(!sync.has_pending());
    }

    #[tokio::test]
    async fn test_cancel_prevents_pending_write() {
        let store = MockStore::new();
        let mut sync = synchronizer(store.clone());

        sync.schedule(vec![Message::user("hi")], true);
        assert!(sync.has_pending());
        sync.cancel();

        settle().await;
        assert_eq!(store.upsert_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_retries_on_next_cycle() {
        let store = MockStore::new();
        let mut sync = synchronizer(store.clone());
        let first = Message::user("hi");

        store.fail_upserts.store(true, Ordering::SeqCst);
        sync.schedule(vec![first.clone()], true);
        settle().await;
        assert_eq!(store.upsert_count(), 0);

        // The hash was not updated, so the next natural cycle writes both.
        store.fail_upserts.store(false, Ordering::SeqCst);
        sync.schedule(vec![first, Message::bot("hello!")], true);
        settle().await;
        assert_eq!(store.upsert_count(), 1);
        let record = store.last_record.lock().unwrap().clone().unwrap();
        assert_eq!(record.message_count, 2);
    }

    #[tokio::test]
    async fn test_load_primes_hash_gate() {
        let store = MockStore::new();
        let messages = vec![Message::user("hi"), Message::bot("hello!")];
        *store.last_record.lock().unwrap() = Some(ConversationRecord::new(
            "session_f1_c1_tok",
            messages.clone(),
            true,
        ));

        let mut sync = synchronizer(store.clone());
        let loaded = sync.load().await.unwrap();
        assert_eq!(loaded.len(), 2);

        // Re-scheduling exactly what was loaded is a no-op write.
        sync.schedule(loaded, true);
        settle().await;
        assert_eq!(store.upsert_count(), 0);
    }

    #[tokio::test]
    async fn test_load_without_context_is_empty() {
        let store = MockStore::new();
        let context = FieldContext::default();
        let key =
            SessionKey::resolve(&context, &crate::identity::ClientInstanceId::new("tok"));
        let sync = PersistenceSynchronizer::new(store, context, key, DEBOUNCE);
        assert!(sync.load().await.unwrap().is_empty());
    }

    #[test]
    fn test_digest_ignores_ids_but_not_content() {
        let a = Message::user("hi");
        let mut b = a.clone();
        b.id = "user_other".to_string();
        assert_eq!(transcript_digest(&[a.clone()]), transcript_digest(&[b]));

        let c = Message {
            content: "hi!".to_string(),
            ..a.clone()
        };
        assert_ne!(transcript_digest(&[a]), transcript_digest(&[c]));
    }

    #[test]
    fn test_digest_is_order_sensitive() {
        let a = Message::user("one");
        let b = Message::bot("two");
        assert_ne!(
            transcript_digest(&[a.clone(), b.clone()]),
            transcript_digest(&[b, a])
        );
    }
}
