use crate::field::FieldValue;
use crate::identity::{ClientInstanceId, FieldContext, SessionKey};
use crate::store::ConversationStore;
use crate::sync::PersistenceSynchronizer;
use crate::transcript::{TranscriptAggregator, TranscriptEvent};
use chatform_core::Message;
use chatform_transport::TransportEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The welcome message appended when a session starts with no history.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    /// Debounce window for persistence, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_welcome_message() -> String {
    "Hi! How can I help you today?".to_string()
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            welcome_message: default_welcome_message(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// The conversational session engine for one mounted chat field.
///
/// Owns the session identity, the transcript aggregator and the
/// persistence synchronizer. All transcript mutations flow through
/// [`apply`](Self::apply) on `&mut self`, so producers are serialized by
/// the host's event loop; the only background work is the debounced write.
///
/// Lifecycle: construct on mount (resolves the session key exactly once),
/// [`restore`](Self::restore) once to fetch history, feed events while
/// mounted, [`close`](Self::close) on unmount to cancel any pending write.
pub struct ChatFieldEngine {
    context: FieldContext,
    key: SessionKey,
    aggregator: TranscriptAggregator,
    sync: PersistenceSynchronizer,
    welcome_message: String,
    restored: bool,
    closed: bool,
}

impl ChatFieldEngine {
    /// Creates the engine for a field mount. The session key is resolved
    /// here, once, and never recomputed.
    pub fn new(
        context: FieldContext,
        instance: &ClientInstanceId,
        store: Arc<dyn ConversationStore>,
        config: EngineConfig,
    ) -> Self {
        let key = SessionKey::resolve(&context, instance);
        let sync = PersistenceSynchronizer::new(
            store,
            context.clone(),
            key.clone(),
            Duration::from_millis(config.debounce_ms),
        );
        tracing::info!(session_key = %key, "Chat field session created");
        Self {
            context,
            key,
            aggregator: TranscriptAggregator::new(),
            sync,
            welcome_message: config.welcome_message,
            restored: false,
            closed: false,
        }
    }

    /// Fetches persisted history and seeds the transcript, once per mount.
    ///
    /// Empty or missing history triggers the one-time welcome message. A
    /// load failure is recoverable: the session is treated as new. If the
    /// engine was closed while the load was in flight, the result is
    /// discarded rather than applied.
    pub async fn restore(&mut self) {
        if self.restored || self.closed {
            return;
        }
        let history = match self.sync.load().await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(session_key = %self.key, error = %e, "History load failed, starting fresh");
                Vec::new()
            }
        };
        if self.closed {
            tracing::debug!(session_key = %self.key, "Discarding history loaded after close");
            return;
        }
        self.restored = true;
        self.aggregator.seed(history, &self.welcome_message);
    }

    /// Applies one producer event. Any resulting append schedules a
    /// debounced write of the updated transcript.
    pub fn apply(&mut self, event: TranscriptEvent) {
        if self.closed {
            return;
        }
        if self.aggregator.apply(event).is_some() {
            let anonymous = self.context.owner_id.is_none();
            self.sync
                .schedule(self.aggregator.messages().to_vec(), anonymous);
        }
    }

    /// Maps an inbound transport event onto the transcript. State changes
    /// are the transport controller's concern and are ignored here.
    pub fn on_transport_event(&mut self, event: TransportEvent) {
        let mapped = match event {
            TransportEvent::StateChanged { .. } => return,
            TransportEvent::UserTranscript { text, is_final } => {
                TranscriptEvent::Speech { text, is_final }
            }
            TransportEvent::BotText { text } => TranscriptEvent::Bot { text },
            TransportEvent::UserStartedSpeaking => TranscriptEvent::SpeakingStarted,
            TransportEvent::UserStoppedSpeaking => TranscriptEvent::SpeakingStopped,
            TransportEvent::BotStartedSpeaking => TranscriptEvent::BotSpeakingStarted,
            TransportEvent::BotStoppedSpeaking => TranscriptEvent::BotSpeakingStopped,
        };
        self.apply(mapped);
    }

    /// Appends typed user input.
    pub fn send_text(&mut self, content: &str) {
        self.apply(TranscriptEvent::Typed {
            content: content.to_string(),
        });
    }

    /// Appends a synthetic error message describing a send/transport
    /// failure.
    pub fn report_failure(&mut self, detail: &str) {
        self.apply(TranscriptEvent::Failure {
            detail: detail.to_string(),
        });
    }

    /// The field's current value for the enclosing form, or `None` while
    /// the transcript is empty. Non-emptiness doubles as the
    /// required-field validation signal.
    pub fn field_value(&self) -> Option<FieldValue> {
        FieldValue::project(self.aggregator.messages(), self.key.as_str())
    }

    /// The transcript so far.
    pub fn messages(&self) -> &[Message] {
        self.aggregator.messages()
    }

    /// Whether the user is currently speaking.
    pub fn listening(&self) -> bool {
        self.aggregator.listening()
    }

    /// The transient partial speech transcription, when one is in flight.
    pub fn partial_transcript(&self) -> Option<&str> {
        self.aggregator.partial_transcript()
    }

    /// This session's key.
    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    /// True while a debounced write is pending.
    pub fn has_pending_write(&self) -> bool {
        self.sync.has_pending()
    }

    /// Marks the engine closed and cancels any pending write. Called on
    /// unmount; further events and late load results are discarded.
    pub fn close(&mut self) {
        self.closed = true;
        self.sync.cancel();
    }
}
