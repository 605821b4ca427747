use crate::event::TransportEvent;
use crate::state::{Connection, TransportState};
use async_trait::async_trait;
use chatform_core::{ChatformError, ChatformResult};
use std::sync::Arc;
use tokio::sync::broadcast;

/// The external real-time transport behind a voice-enabled chat field.
///
/// Production hosts adapt their real-time stack (WebRTC, WebSocket, vendor
/// SDK) behind this trait; tests use an in-memory mock. Lifecycle progress
/// and inbound speech/bot events are delivered through the broadcast
/// subscription.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Issues a connection request to the remote endpoint.
    async fn connect(&self, endpoint: &str, payload: serde_json::Value) -> ChatformResult<()>;

    /// Tears down the live connection.
    async fn disconnect(&self) -> ChatformResult<()>;

    /// Relays typed user text over the live connection.
    async fn send_text(&self, content: &str) -> ChatformResult<()>;

    /// Subscribes to transport events.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}

/// Drives a [`VoiceTransport`] while keeping the [`Connection`] state
/// machine and the busy flag honest.
///
/// The busy flag covers the in-flight `connect`/`disconnect` calls and is
/// reset on every exit path, success or failure, so the UI can never
/// deadlock in a permanent busy state. Connection failures leave the
/// machine in [`TransportState::Error`]; retrying is the user's call, the
/// controller never reconnects on its own.
pub struct TransportController {
    transport: Arc<dyn VoiceTransport>,
    connection: Connection,
    busy: bool,
}

impl TransportController {
    /// Creates a controller over the given transport, starting disconnected.
    pub fn new(transport: Arc<dyn VoiceTransport>) -> Self {
        Self {
            transport,
            connection: Connection::new(),
            busy: false,
        }
    }

    /// Current connection state.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// True while a connect or disconnect call is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Subscribes to the underlying transport's events.
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.transport.subscribe()
    }

    /// Opens the connection. Valid only from `Disconnected` or `Error`.
    ///
    /// On failure the state machine lands in [`TransportState::Error`] and
    /// the error is returned for the UI to surface; the user must re-invoke
    /// `connect` to retry.
    pub async fn connect(
        &mut self,
        endpoint: &str,
        payload: serde_json::Value,
    ) -> ChatformResult<()> {
        if !self.connection.state().can_connect() {
            return Err(ChatformError::Transport(format!(
                "connect not valid from {:?}",
                self.connection.state()
            )));
        }
        // A retry from Error resets the machine first.
        if self.connection.state() == TransportState::Error {
            self.connection.transition(TransportState::Disconnected)?;
        }
        self.busy = true;
        self.connection.transition(TransportState::Connecting)?;
        let result = self.transport.connect(endpoint, payload).await;
        self.busy = false;
        if let Err(e) = result {
            tracing::warn!(error = %e, "Transport connect failed");
            self.connection.transition(TransportState::Error)?;
            return Err(e);
        }
        Ok(())
    }

    /// Closes the connection. Valid only from the connected states.
    pub async fn disconnect(&mut self) -> ChatformResult<()> {
        if !self.connection.state().is_connected() {
            return Err(ChatformError::Transport(format!(
                "disconnect not valid from {:?}",
                self.connection.state()
            )));
        }
        self.busy = true;
        let result = self.transport.disconnect().await;
        self.busy = false;
        result?;
        self.connection.transition(TransportState::Disconnected)?;
        Ok(())
    }

    /// Relays typed text over the live connection. Requires a connected
    /// transport; callers degrade to local-only accumulation otherwise.
    pub async fn send_text(&self, content: &str) -> ChatformResult<()> {
        if !self.connection.state().is_connected() {
            return Err(ChatformError::Transport(
                "cannot send text while disconnected".to_string(),
            ));
        }
        self.transport.send_text(content).await
    }

    /// Applies a transport-reported lifecycle change. Out-of-order reports
    /// are logged and dropped rather than corrupting the machine.
    pub fn handle_state_change(&mut self, state: TransportState) {
        if let Err(e) = self.connection.transition(state) {
            tracing::warn!(error = %e, "Ignoring out-of-order transport state");
        }
    }

    /// Toggles the microphone, returning the new setting. A recoverable
    /// error is returned while disconnected (surfaced as a toast, not
    /// fatal).
    pub fn toggle_mic(&mut self) -> ChatformResult<bool> {
        let target = !self.connection.mic_enabled();
        self.connection.set_mic(target)?;
        Ok(target)
    }
}
