//! The conversational session engine behind Chatform's chat field.
//!
//! One mounted chat field owns exactly one session: a stable session key,
//! an append-only transcript fed by multiple event producers, a debounced
//! hash-gated writer reconciling the transcript with the conversation
//! store, and a projection of the transcript as the field's value for the
//! enclosing form.
//!
//! # Main types
//!
//! - [`SessionKey`] / [`FieldContext`] / [`ClientInstanceId`] — session
//!   identity.
//! - [`TranscriptAggregator`] / [`TranscriptEvent`] — the single serialized
//!   fan-in point for all message producers.
//! - [`PersistenceSynchronizer`] — debounced, hash-gated persistence.
//! - [`ConversationStore`] / [`FileConversationStore`] — the store seam and
//!   a file-backed reference implementation.
//! - [`FieldValue`] — the transcript projected as the form field's value.
//! - [`ChatFieldEngine`] — wires the above together for one field mount.

/// Session identity resolution.
pub mod identity;

/// The transcript aggregator and its event vocabulary.
pub mod transcript;

/// The conversation store seam and file-backed implementation.
pub mod store;

/// Debounced, hash-gated persistence.
pub mod sync;

/// The field value projection.
pub mod field;

/// The per-mount engine wiring.
pub mod engine;

pub use engine::{ChatFieldEngine, EngineConfig};
pub use field::FieldValue;
pub use identity::{ClientInstanceId, FieldContext, SessionKey};
pub use store::{ConversationRecord, ConversationStore, FileConversationStore};
pub use sync::PersistenceSynchronizer;
pub use transcript::{TranscriptAggregator, TranscriptEvent};
