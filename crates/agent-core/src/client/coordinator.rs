//! Session coordinator
//!
//! Owns the [`Session`], the single [`TelephonyClient`] and the single live
//! [`Call`]. Nothing else mutates them: SDK callbacks, operator commands and
//! timer ticks all arrive as [`SessionEvent`]s and are handled one at a time
//! by [`SessionCoordinator::run`].
//!
//! The `impl SessionCoordinator` is split by concern:
//!
//! - this file: construction, the event loop and the publishing helpers
//! - `bootstrap.rs`: access gate, audio bootstrap and device bootstrap
//! - `lifecycle.rs`: transition lookup and action execution

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::audio::{AudioPlatform, AudioSink};
use crate::call::{Call, CallDirection, CallId, CallState};
use crate::call_log::{CallLogEmitter, LogContext};
use crate::clock::Clock;
use crate::collaborators::{AccessVerifier, TokenProvider};
use crate::config::AgentConfig;
use crate::context::SessionMode;
use crate::error::{AgentError, AgentResult};
use crate::events::{
    AgentEvent, CallEventSender, CallSignal, DeviceEvent, OperatorAction, SessionEvent,
    SessionEventReceiver, SessionEventSender,
};
use crate::session::{Session, SessionSnapshot, SessionStatus};
use crate::state_table::{CallEvent, TransitionTable};
use crate::telephony::{CallHandle, TelephonyClient, TelephonyFactory};
use crate::timer::DurationTimer;

/// Drives one agent session from bootstrap to teardown
pub struct SessionCoordinator {
    pub(super) config: Arc<AgentConfig>,
    pub(super) session: Session,
    pub(super) access_key: Option<String>,

    // Collaborators
    pub(super) tokens: Arc<dyn TokenProvider>,
    pub(super) verifier: Option<Arc<dyn AccessVerifier>>,
    pub(super) audio: Arc<dyn AudioPlatform>,
    pub(super) telephony: Arc<dyn TelephonyFactory>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) call_log: CallLogEmitter,
    pub(super) table: Arc<TransitionTable>,

    // Per-session resources
    pub(super) client: Option<Arc<dyn TelephonyClient>>,
    pub(super) audio_sink: Option<Arc<dyn AudioSink>>,
    pub(super) call: Option<Call>,
    pub(super) timer: Option<DurationTimer>,

    // Channels
    pub(super) events_tx: SessionEventSender,
    pub(super) events_rx: SessionEventReceiver,
    pub(super) event_tx: broadcast::Sender<AgentEvent>,
    pub(super) snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionCoordinator {
    /// Bootstrap the session, then process events until it reaches a terminal status.
    ///
    /// Returns the final status. Inbound sessions only finish on failure or an
    /// explicit shutdown; outbound sessions finish after their call is logged.
    pub async fn run(mut self) -> SessionStatus {
        info!(mode = ?self.session.mode, "Starting agent session");
        self.bootstrap().await;

        while !self.session.status.is_terminal() {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            self.handle_event(event).await;
        }

        self.release_resources().await;
        info!("Agent session finished: {}", self.session.status);
        self.session.status.clone()
    }

    pub(super) async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Device(event) => self.handle_device_event(event).await,
            SessionEvent::Call { call_id, signal } => {
                if self.call.as_ref().map(|c| c.id()) != Some(call_id) {
                    debug!(call_id = %call_id, ?signal, "Ignoring signal for a call that is no longer current");
                } else if let Err(e) = self.apply(signal_event(signal)).await {
                    warn!(call_id = %call_id, "Call signal handling failed: {}", e);
                }
            }
            SessionEvent::Operator { action, reply } => {
                let result = self.handle_operator(action).await;
                if let Err(e) = &result {
                    debug!(action = action.as_str(), "Operator action refused: {}", e);
                }
                self.refresh_snapshot();
                let _ = reply.send(result);
            }
            SessionEvent::TimerTick { call_id } => self.handle_tick(call_id),
        }
        self.refresh_snapshot();
    }

    async fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Registered => debug!("Telephony client registered"),
            DeviceEvent::Error { message } => {
                warn!("Telephony device error: {}", message);
                if self.call.is_none() && !self.session.status.is_terminal() {
                    self.set_status(SessionStatus::DeviceError { message });
                }
            }
            DeviceEvent::Incoming(handle) => self.handle_incoming(handle).await,
        }
    }

    async fn handle_incoming(&mut self, handle: Arc<dyn CallHandle>) {
        let from = handle.remote_number().unwrap_or_default();
        if self.session.mode != SessionMode::Inbound || self.call.is_some() {
            warn!(from = %from, mode = ?self.session.mode, "Rejecting incoming call, session is not free for it");
            if let Err(e) = handle.reject().await {
                warn!("Failed to reject extra incoming call: {}", e);
            }
            return;
        }

        let call = Call::new(CallDirection::Inbound, from.clone(), handle.clone());
        info!(call_id = %call.id(), from = %from, "Incoming call");
        handle.subscribe(CallEventSender::new(call.id(), self.events_tx.clone()));
        self.call = Some(call);
        if let Err(e) = self.apply(CallEvent::Incoming { from }).await {
            warn!("Incoming call handling failed: {}", e);
        }
    }

    async fn handle_operator(&mut self, action: OperatorAction) -> AgentResult<()> {
        match action {
            OperatorAction::Accept => self.apply(CallEvent::Accept).await,
            OperatorAction::Reject => self.apply(CallEvent::Reject).await,
            OperatorAction::HangUp => self.apply(CallEvent::HangUp).await,
            OperatorAction::SetMuted(muted) => self.apply(CallEvent::SetMuted { muted }).await,
            OperatorAction::RetryAudio => self.retry_audio().await,
            OperatorAction::Shutdown => {
                if let Some(call) = &self.call {
                    return Err(AgentError::invalid_state(action.as_str(), Some(call.state())));
                }
                self.set_status(SessionStatus::Closed);
                Ok(())
            }
        }
    }

    fn handle_tick(&mut self, call_id: CallId) {
        let (Some(call), Some(timer)) = (self.call.as_ref(), self.timer.as_ref()) else {
            return;
        };
        if call.id() != call_id || timer.call_id() != call_id || call.state() != CallState::Active {
            debug!(call_id = %call_id, "Dropping stale duration tick");
            return;
        }
        let elapsed_seconds = call.elapsed_seconds(self.clock.now());
        self.publish(AgentEvent::DurationTick {
            call_id,
            elapsed_seconds,
        });
    }

    /// Stop the timer and destroy the telephony client, if still around
    pub(super) async fn release_resources(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
        if let Some(client) = self.client.take() {
            debug!("Destroying telephony client");
            client.destroy().await;
        }
        self.refresh_snapshot();
    }

    pub(super) fn set_status(&mut self, status: SessionStatus) {
        if self.session.status == status {
            return;
        }
        info!("Status: {}", status);
        self.session.status = status.clone();
        self.publish(AgentEvent::StatusChanged { status });
        self.refresh_snapshot();
    }

    pub(super) fn publish(&self, event: AgentEvent) {
        // no subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub(super) fn refresh_snapshot(&self) {
        let call = self.call.as_ref().map(|c| (c.id(), c.state()));
        self.snapshot_tx
            .send_replace(SessionSnapshot::capture(&self.session, call));
    }

    pub(super) fn log_context(&self) -> LogContext {
        LogContext {
            org_id: self.session.org_id.clone(),
            customer_id: self.session.customer_id.clone(),
        }
    }
}

fn signal_event(signal: CallSignal) -> CallEvent {
    match signal {
        CallSignal::Ringing => CallEvent::RemoteRinging,
        CallSignal::Accepted => CallEvent::RemoteAnswered,
        CallSignal::Disconnected => CallEvent::RemoteDisconnect,
        CallSignal::Error { message } => CallEvent::SignalError { message },
    }
}
