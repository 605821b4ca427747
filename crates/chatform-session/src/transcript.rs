use chatform_core::Message;
use serde::{Deserialize, Serialize};

/// A producer event entering the transcript.
///
/// All message producers — typed input, streamed speech-to-text, the bot
/// reply stream, and failure reporting — funnel through this one tagged
/// vocabulary and a single serialized `apply` entry point, so concurrent
/// producers can never interleave a partial append.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// Typed user input. Always finalized, never provisional.
    Typed {
        /// The text the user submitted.
        content: String,
    },

    /// A speech-to-text transcription event. Only final events become
    /// transcript entries; non-final ones update the transient partial
    /// text and are discarded.
    Speech {
        /// The transcribed text so far.
        text: String,
        /// Whether this transcription is complete and authoritative.
        is_final: bool,
    },

    /// A finalized bot reply. Streamed replies are committed once, as the
    /// completed text.
    Bot {
        /// The complete reply text.
        text: String,
    },

    /// A send or transport failure the user should see inline. Appended as
    /// an `error` message, ordered and persisted like any other.
    Failure {
        /// Human-readable description of what failed.
        detail: String,
    },

    /// The user started speaking. Drives the listening indicator only.
    SpeakingStarted,

    /// The user stopped speaking. Clears the listening indicator and any
    /// partial transcription.
    SpeakingStopped,

    /// The bot started speaking.
    BotSpeakingStarted,

    /// The bot stopped speaking.
    BotSpeakingStopped,
}

/// The ordered, deduplicated log of conversation messages for one session.
///
/// Append-only: messages are immutable once appended and never reordered.
/// Append order is the order this process observes event *finalization*,
/// not remote emission order — no clock-based reordering is attempted.
/// Repeated identical text is legitimate conversation content; duplicate
/// suppression happens at the persistence layer via hashing, not here.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    messages: Vec<Message>,
    listening: bool,
    bot_speaking: bool,
    partial: Option<String>,
    welcomed: bool,
}

impl TranscriptAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the transcript from loaded history, exactly once per mount.
    ///
    /// Non-empty history suppresses the welcome message forever; empty
    /// history appends exactly one welcome message. A second call can
    /// never produce a second welcome.
    pub fn seed(&mut self, history: Vec<Message>, welcome_text: &str) {
        if self.welcomed {
            return;
        }
        self.welcomed = true;
        if history.is_empty() {
            self.messages.push(Message::welcome(welcome_text));
        } else {
            self.messages.extend(history);
        }
    }

    /// Applies one producer event, returning the appended message, if any.
    ///
    /// This is the single serialized mutation entry point: each append is
    /// atomic with respect to the in-memory list.
    pub fn apply(&mut self, event: TranscriptEvent) -> Option<&Message> {
        match event {
            TranscriptEvent::Typed { content } => self.append(Message::user(&content)),
            TranscriptEvent::Speech { text, is_final } => {
                if is_final {
                    self.partial = None;
                    self.append(Message::user(&text))
                } else {
                    self.partial = Some(text);
                    None
                }
            }
            TranscriptEvent::Bot { text } => self.append(Message::bot(&text)),
            TranscriptEvent::Failure { detail } => self.append(Message::error(&detail)),
            TranscriptEvent::SpeakingStarted => {
                self.listening = true;
                None
            }
            TranscriptEvent::SpeakingStopped => {
                self.listening = false;
                self.partial = None;
                None
            }
            TranscriptEvent::BotSpeakingStarted => {
                self.bot_speaking = true;
                None
            }
            TranscriptEvent::BotSpeakingStopped => {
                self.bot_speaking = false;
                None
            }
        }
    }

    fn append(&mut self, message: Message) -> Option<&Message> {
        if message.is_empty() {
            return None;
        }
        self.messages.push(message);
        self.messages.last()
    }

    /// The transcript so far, in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the transcript.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether the user is currently speaking (listening indicator).
    pub fn listening(&self) -> bool {
        self.listening
    }

    /// Whether the bot is currently speaking.
    pub fn bot_speaking(&self) -> bool {
        self.bot_speaking
    }

    /// The transient partial speech transcription, when one is in flight.
    /// Never appended and never persisted.
    pub fn partial_transcript(&self) -> Option<&str> {
        self.partial.as_deref()
    }
}
