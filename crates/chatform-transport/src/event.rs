use crate::state::TransportState;
use serde::{Deserialize, Serialize};

/// Events emitted by a live transport during a voice-enabled conversation.
///
/// These events allow consumers (the chat field engine, the UI) to receive
/// speech transcription and bot output as they arrive. Only events carrying
/// finalized text ever become transcript entries; partial transcription and
/// the speaking boundaries drive transient indicators only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    /// The transport moved to a new lifecycle state.
    StateChanged {
        /// The state the transport reports itself in.
        state: TransportState,
    },

    /// A speech-to-text transcription of user audio. Many non-final events
    /// may arrive per utterance before the final one.
    UserTranscript {
        /// The transcribed text so far.
        text: String,
        /// Whether this transcription is complete and authoritative.
        is_final: bool,
    },

    /// Finalized bot reply text. Transports that stream replies emit this
    /// once per completed reply, not per chunk.
    BotText {
        /// The complete reply text.
        text: String,
    },

    /// The user started speaking.
    UserStartedSpeaking,

    /// The user stopped speaking.
    UserStoppedSpeaking,

    /// The bot started speaking (audio playback).
    BotStartedSpeaking,

    /// The bot stopped speaking.
    BotStoppedSpeaking,
}
