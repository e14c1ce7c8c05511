//! Transition execution
//!
//! Looks up `(role, state, event)` in the lifecycle table and runs the
//! resulting actions in order. Entering `Ended` is always followed by an
//! internal `LogDispatched` event, which releases the call.

use tracing::{debug, info, warn};

use super::coordinator::SessionCoordinator;
use crate::call::{CallState, TerminalStatus};
use crate::error::{AgentError, AgentResult};
use crate::events::{AgentEvent, CallStatusInfo};
use crate::session::SessionStatus;
use crate::state_table::{Action, CallEvent, Role};
use crate::timer::DurationTimer;

/// Work that has to wait until the state change has been applied
#[derive(Debug, Default)]
struct Deferred {
    release: bool,
    teardown: bool,
}

impl SessionCoordinator {
    /// Feed one lifecycle event into the current call
    pub(super) async fn apply(&mut self, event: CallEvent) -> AgentResult<()> {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            next = self.apply_once(event).await?;
        }
        Ok(())
    }

    async fn apply_once(&mut self, event: CallEvent) -> AgentResult<Option<CallEvent>> {
        let kind = event.kind();
        let Some(call) = self.call.as_ref() else {
            return if event.is_operator() {
                Err(AgentError::invalid_state(kind.type_name(), None))
            } else {
                debug!(event = kind.type_name(), "No current call, ignoring event");
                Ok(None)
            };
        };

        let call_id = call.id();
        let role = Role::from(call.direction());
        let state = call.state();
        let Some(transition) = self.table.get(role, state, kind).cloned() else {
            if event.is_operator() {
                return Err(AgentError::invalid_state(kind.type_name(), Some(state)));
            }
            debug!(call_id = %call_id, ?state, event = kind.type_name(), "No transition, event ignored");
            return Ok(None);
        };

        debug!(
            call_id = %call_id,
            ?role,
            ?state,
            event = kind.type_name(),
            next_state = ?transition.next_state,
            "Applying transition"
        );

        let mut deferred = Deferred::default();
        for action in &transition.actions {
            self.execute_action(*action, &event, &mut deferred).await?;
        }

        let mut entered_ended = false;
        if let Some(next_state) = transition.next_state {
            if let Some(call) = self.call.as_mut() {
                call.set_state(next_state);
                entered_ended = next_state == CallState::Ended && state != CallState::Ended;
            }
            if next_state != state {
                self.publish(AgentEvent::CallStateChanged(CallStatusInfo {
                    call_id,
                    previous_state: state,
                    new_state: next_state,
                    timestamp: self.clock.now(),
                }));
            }
        }

        let status = match (transition.status, self.call.as_ref()) {
            (Some(template), Some(call)) => Some(template.render(call)),
            _ => None,
        };
        if let Some(status) = status {
            self.set_status(status);
        }

        if deferred.release {
            self.release_call();
        }
        if deferred.teardown {
            self.teardown_session().await;
        }

        Ok(entered_ended.then_some(CallEvent::LogDispatched))
    }

    async fn execute_action(
        &mut self,
        action: Action,
        event: &CallEvent,
        deferred: &mut Deferred,
    ) -> AgentResult<()> {
        let Some(call) = self.call.as_mut() else {
            return Ok(());
        };
        let call_id = call.id();
        debug!(call_id = %call_id, ?action, "Executing action");

        match action {
            Action::AnnounceIncoming => {
                let from = call.remote_number().to_string();
                self.publish(AgentEvent::IncomingCall { call_id, from });
            }
            Action::SendAccept => {
                call.handle().accept().await?;
            }
            Action::SendReject => {
                if let Err(e) = call.handle().reject().await {
                    warn!(call_id = %call_id, "SDK reject failed: {}", e);
                }
            }
            Action::SendDisconnect => {
                if let Err(e) = call.handle().disconnect().await {
                    warn!(call_id = %call_id, "SDK disconnect failed: {}", e);
                }
            }
            Action::ApplyMute => {
                let CallEvent::SetMuted { muted } = *event else {
                    return Ok(());
                };
                call.handle().mute(muted).await?;
                self.session.muted = muted;
                self.publish(AgentEvent::MuteChanged { call_id, muted });
            }
            Action::RecordStart => {
                call.mark_started(self.clock.now());
            }
            Action::RecordEnd(status) => {
                let reason = match (status, event) {
                    (TerminalStatus::Failed, CallEvent::SignalError { message }) => Some(message.clone()),
                    (TerminalStatus::Rejected, _) => Some(self.config.reject_reason.clone()),
                    _ => None,
                };
                if !call.mark_ended(self.clock.now(), status, reason) {
                    debug!(call_id = %call_id, "Call already terminated, keeping first outcome");
                }
            }
            Action::StartTimer => {
                if let Some(old) = self.timer.take() {
                    old.stop();
                }
                self.timer = Some(DurationTimer::start(
                    call_id,
                    self.config.tick_interval(),
                    self.events_tx.clone(),
                ));
            }
            Action::StopTimer => {
                if let Some(timer) = self.timer.take() {
                    timer.stop();
                }
            }
            Action::EmitCallLog => {
                let ctx = self.log_context();
                if let Some(call) = self.call.as_mut() {
                    if let Some(record) = self.call_log.emit(call, &ctx) {
                        self.publish(AgentEvent::CallLogged(record));
                    }
                }
            }
            Action::ReleaseCall => deferred.release = true,
            Action::TeardownSession => deferred.teardown = true,
        }
        Ok(())
    }

    /// Discard the terminated call; its stale SDK events are ignored from now on
    fn release_call(&mut self) {
        if let Some(call) = self.call.take() {
            info!(
                call_id = %call.id(),
                status = ?call.terminal_status(),
                duration = call.duration_seconds(),
                "Call released"
            );
        }
        self.session.muted = false;
    }

    async fn teardown_session(&mut self) {
        info!("Tearing down session");
        self.release_resources().await;
        self.set_status(SessionStatus::Closed);
    }
}
