//! Real-time transport layer for the Chatform chat field.
//!
//! Models the lifecycle of the optional voice-capable connection behind a
//! chat field. The transport itself (WebRTC, WebSocket, vendor SDK) is an
//! external collaborator hidden behind the [`VoiceTransport`] trait; this
//! crate owns the connection state machine, the event vocabulary the
//! transport emits, and the controller that keeps busy/mic flags honest.
//!
//! A session can accumulate text-only messages with no connection ever
//! opened — the transport is orthogonal to the transcript.

/// Connection state machine.
pub mod state;

/// Events emitted by the transport.
pub mod event;

/// The transport trait and the controller around it.
pub mod transport;

pub use event::TransportEvent;
pub use state::{Connection, TransportState};
pub use transport::{TransportController, VoiceTransport};
