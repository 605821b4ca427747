use chatform_core::Message;
use serde::{Deserialize, Serialize};

/// The chat field's value as seen by the enclosing form.
///
/// Published upward whenever the transcript changes and is non-empty. The
/// form pipeline treats it as an opaque blob; its presence is what
/// required-field validation keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    /// The full transcript in append order.
    pub messages: Vec<Message>,
    /// The session key the conversation is stored under.
    pub session_id: String,
    /// Denormalized message count.
    pub total_messages: usize,
}

impl FieldValue {
    /// Projects a transcript into a field value. `None` when the transcript
    /// is empty — an empty conversation publishes no value at all.
    pub fn project(messages: &[Message], session_id: &str) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        Some(Self {
            messages: messages.to_vec(),
            session_id: session_id.to_string(),
            total_messages: messages.len(),
        })
    }
}
