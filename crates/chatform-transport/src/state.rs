use chatform_core::{ChatformError, ChatformResult};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the real-time transport.
///
/// The happy path is `Disconnected → Connecting → Initializing →
/// Authenticating → Connected → Ready`. `Error` is reachable from any
/// non-terminal state; `Disconnected` is reachable from the connected
/// states (user-initiated teardown) and from `Error` (reset before a
/// retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// No connection. Initial state.
    Disconnected,
    /// A connection request has been issued.
    Connecting,
    /// The transport is setting up its media/data channels.
    Initializing,
    /// The transport is authenticating with the remote endpoint.
    Authenticating,
    /// The connection is established.
    Connected,
    /// The connection is established and the remote side accepts input.
    Ready,
    /// The last connection attempt or live connection failed. Retryable.
    Error,
}

impl TransportState {
    /// True while the connection is usable for sending voice or text.
    pub fn is_connected(self) -> bool {
        matches!(self, TransportState::Connected | TransportState::Ready)
    }

    /// True while a connection attempt is in progress.
    pub fn is_connecting(self) -> bool {
        matches!(
            self,
            TransportState::Connecting
                | TransportState::Initializing
                | TransportState::Authenticating
        )
    }

    /// True for states a new `connect()` may be issued from.
    pub fn can_connect(self) -> bool {
        matches!(self, TransportState::Disconnected | TransportState::Error)
    }

    fn allows(self, to: TransportState) -> bool {
        use TransportState::*;
        // Error is reachable from every non-terminal state.
        if to == Error {
            return self != Error;
        }
        match (self, to) {
            (Disconnected, Connecting) => true,
            (Connecting, Initializing) => true,
            (Initializing, Authenticating) => true,
            (Authenticating, Connected) => true,
            // Some transports report ready without a distinct connected step.
            (Authenticating, Ready) => true,
            (Connected, Ready) => true,
            (Connected | Ready, Disconnected) => true,
            (Error, Disconnected) => true,
            _ => false,
        }
    }
}

/// Ephemeral connection state for one chat field. Never persisted.
#[derive(Debug, Clone)]
pub struct Connection {
    state: TransportState,
    mic_enabled: bool,
}

impl Connection {
    /// Creates a connection in the initial `Disconnected` state with the
    /// microphone off.
    pub fn new() -> Self {
        Self {
            state: TransportState::Disconnected,
            mic_enabled: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Whether the microphone is currently enabled. Only meaningful while
    /// [`TransportState::is_connected`] holds.
    pub fn mic_enabled(&self) -> bool {
        self.mic_enabled
    }

    /// Applies a state transition, validating it against the lifecycle
    /// graph. Invalid transitions are recoverable errors, never panics.
    ///
    /// Leaving the connected states always turns the microphone off.
    pub fn transition(&mut self, to: TransportState) -> ChatformResult<()> {
        if !self.state.allows(to) {
            return Err(ChatformError::Transport(format!(
                "invalid transition: {:?} -> {to:?}",
                self.state
            )));
        }
        if !to.is_connected() {
            self.mic_enabled = false;
        }
        self.state = to;
        Ok(())
    }

    /// Toggles the microphone. Permitted only while connected; otherwise a
    /// recoverable error is returned and the flag is left untouched.
    pub fn set_mic(&mut self, enabled: bool) -> ChatformResult<()> {
        if !self.state.is_connected() {
            return Err(ChatformError::Transport(
                "microphone can only be toggled while connected".to_string(),
            ));
        }
        self.mic_enabled = enabled;
        Ok(())
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}
