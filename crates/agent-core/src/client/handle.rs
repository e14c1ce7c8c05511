//! Cloneable operator handle to a running session

use tokio::sync::{broadcast, oneshot, watch};

use crate::error::{AgentError, AgentResult};
use crate::events::{AgentEvent, OperatorAction, SessionEvent, SessionEventSender};
use crate::session::SessionSnapshot;

/// Operator-side handle to a running session.
///
/// Commands are queued behind any SDK events already waiting and answered once
/// the coordinator has processed them. Every command fails with
/// [`AgentError::SessionClosed`] after the session has finished.
#[derive(Clone)]
pub struct AgentHandle {
    pub(super) commands: SessionEventSender,
    pub(super) events: broadcast::Sender<AgentEvent>,
    pub(super) snapshot: watch::Receiver<SessionSnapshot>,
}

impl AgentHandle {
    /// Accept the ringing inbound call
    pub async fn accept(&self) -> AgentResult<()> {
        self.send(OperatorAction::Accept).await
    }

    /// Reject the ringing inbound call
    pub async fn reject(&self) -> AgentResult<()> {
        self.send(OperatorAction::Reject).await
    }

    /// Hang up or cancel the outbound call
    pub async fn hang_up(&self) -> AgentResult<()> {
        self.send(OperatorAction::HangUp).await
    }

    /// Mute or unmute the active outbound call
    pub async fn set_muted(&self, muted: bool) -> AgentResult<()> {
        self.send(OperatorAction::SetMuted(muted)).await
    }

    /// Re-attempt audio bootstrap after the microphone was blocked
    pub async fn retry_audio(&self) -> AgentResult<()> {
        self.send(OperatorAction::RetryAudio).await
    }

    /// Close the session when no call is in progress
    pub async fn shutdown(&self) -> AgentResult<()> {
        self.send(OperatorAction::Shutdown).await
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    /// Latest session snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch snapshot updates
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    async fn send(&self, action: OperatorAction) -> AgentResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(SessionEvent::Operator { action, reply })
            .map_err(|_| AgentError::SessionClosed)?;
        response.await.map_err(|_| AgentError::SessionClosed)?
    }
}
