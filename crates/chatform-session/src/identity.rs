use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a chat field is mounted within the form product.
///
/// Both ids are optional: a field rendered standalone (preview, demo embed)
/// has neither, which puts the session into a degraded no-persistence mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldContext {
    /// The published form this field belongs to.
    pub form_id: Option<String>,
    /// The field's identifier within the form.
    pub field_id: Option<String>,
    /// The authenticated respondent, when known. Absent for anonymous
    /// respondents; recorded on the persisted conversation for analytics.
    pub owner_id: Option<String>,
}

impl FieldContext {
    /// Creates a context for a field mounted inside a published form.
    pub fn new(form_id: impl Into<String>, field_id: impl Into<String>) -> Self {
        Self {
            form_id: Some(form_id.into()),
            field_id: Some(field_id.into()),
            owner_id: None,
        }
    }

    /// Both ids present: conversations under this context are persisted and
    /// survive reloads.
    pub fn is_persistable(&self) -> bool {
        self.form_id.is_some() && self.field_id.is_some()
    }
}

/// A client-instance token identifying one browser tab/profile.
///
/// The host environment creates this once, stores it client-side, and
/// passes it in explicitly at engine construction — it is never read from
/// ambient global state. Reusing the same token across reloads is what
/// gives a session cross-reload continuity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInstanceId(String);

impl ClientInstanceId {
    /// Wraps a token the host already stores.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates a fresh token for hosts that have none yet.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The stable identifier binding a conversation to its
/// (form, field, client instance).
///
/// Resolved exactly once per engine construction and never recomputed —
/// re-resolving mid-session would orphan the history under a second key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// Derives the session key for a field mount.
    ///
    /// With full form context the key is reproducible:
    /// `session_{form}_{field}_{token}`. Without it, a one-off random key
    /// is generated — no cross-reload continuity, which is an accepted
    /// degraded mode rather than an error.
    pub fn resolve(context: &FieldContext, instance: &ClientInstanceId) -> Self {
        match (&context.form_id, &context.field_id) {
            (Some(form_id), Some(field_id)) => Self(format!(
                "session_{}_{}_{}",
                form_id,
                field_id,
                instance.as_str()
            )),
            _ => Self(format!(
                "session_{}_{}",
                Utc::now().timestamp_millis(),
                Uuid::new_v4().simple()
            )),
        }
    }

    /// The raw key string, as used to address the conversation store.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
