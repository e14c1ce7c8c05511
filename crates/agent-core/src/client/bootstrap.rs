//! Session bootstrap: access gate, audio and device setup
//!
//! Every step runs to completion before the next one starts. Failures park the
//! session in a status and stop the sequence; only the audio step can be
//! resumed, through an explicit operator retry.

use tracing::{error, info, warn};

use super::coordinator::SessionCoordinator;
use crate::access::{AccessDecision, AccessGate};
use crate::audio::AudioBootstrap;
use crate::call::{Call, CallDirection};
use crate::context::SessionMode;
use crate::error::{AgentError, AgentResult};
use crate::events::{CallEventSender, DeviceEventSender};
use crate::number::normalize_destination;
use crate::session::{AuthorizationState, SessionStatus};
use crate::state_table::CallEvent;
use crate::telephony::ConnectParams;

impl SessionCoordinator {
    pub(super) async fn bootstrap(&mut self) {
        self.set_status(SessionStatus::Initializing);

        if self.session.mode == SessionMode::Outbound && !self.check_access().await {
            return;
        }

        if self.prepare_audio().await.is_err() {
            return;
        }

        self.start_device().await;
    }

    /// Evaluate the access key once. Returns whether the session may proceed.
    async fn check_access(&mut self) -> bool {
        let decision = match &self.verifier {
            Some(verifier) => {
                AccessGate::new(verifier.clone())
                    .evaluate(self.access_key.as_deref())
                    .await
            }
            None => AccessDecision::Denied {
                reason: "no access verifier configured".to_string(),
            },
        };

        match decision {
            AccessDecision::Authorized { org_id } => {
                self.session.authorization = AuthorizationState::Authorized;
                if org_id.is_some() {
                    self.session.org_id = org_id;
                }
                true
            }
            AccessDecision::Denied { reason } => {
                warn!("Session unauthorized: {}", reason);
                self.session.authorization = AuthorizationState::Denied;
                self.set_status(SessionStatus::Unauthorized);
                false
            }
        }
    }

    /// Acquire microphone permission and the output sink
    async fn prepare_audio(&mut self) -> AgentResult<()> {
        match AudioBootstrap::new(self.audio.clone()).prepare().await {
            Ok(sink) => {
                self.audio_sink = Some(sink);
                self.session.audio_ready = true;
                Ok(())
            }
            Err(e) => {
                self.session.audio_ready = false;
                self.set_status(SessionStatus::MicrophoneBlocked);
                Err(e)
            }
        }
    }

    /// Operator-triggered re-attempt of the audio step, only while blocked
    pub(super) async fn retry_audio(&mut self) -> AgentResult<()> {
        if self.session.status != SessionStatus::MicrophoneBlocked {
            return Err(AgentError::invalid_state(
                "retry_audio",
                self.call.as_ref().map(|c| c.state()),
            ));
        }
        info!("Retrying audio bootstrap");
        self.prepare_audio().await?;
        self.start_device().await;
        Ok(())
    }

    /// Fetch the token, build the telephony client, then register or dial
    async fn start_device(&mut self) {
        if let Err(e) = self.try_start_device().await {
            error!("Session bootstrap failed: {}", e);
            if let Some(client) = self.client.take() {
                client.destroy().await;
            }
            self.set_status(SessionStatus::InitFailed);
        }
    }

    async fn try_start_device(&mut self) -> AgentResult<()> {
        let destination = match self.session.mode {
            SessionMode::Inbound => None,
            SessionMode::Outbound => {
                let raw = self
                    .session
                    .destination
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| AgentError::config("outbound session without a destination"))?;
                Some(normalize_destination(raw))
            }
        };

        let token = self.tokens.fetch_token(&self.config.identity).await?;
        let events = DeviceEventSender::new(self.events_tx.clone());
        let client = self
            .telephony
            .create(&token, self.config.client_options(), events)?;
        self.client = Some(client.clone());

        let sink = self
            .audio_sink
            .clone()
            .ok_or_else(|| AgentError::AudioOutputUnavailable {
                reason: "audio sink missing".to_string(),
            })?;
        client.attach_incoming_audio(sink)?;
        info!("Telephony client created");

        match destination {
            None => {
                // incoming calls are already routed through the device sender
                client.register().await.map_err(|e| match e {
                    AgentError::RegistrationFailed { .. } => e,
                    other => AgentError::RegistrationFailed {
                        reason: other.to_string(),
                    },
                })?;
                info!("Registered for inbound calls");
                self.set_status(SessionStatus::Ready);
            }
            Some(to) => {
                info!(to = %to, "Placing outbound call");
                let handle = client.connect(ConnectParams { to: to.clone() }).await?;
                let call = Call::new(CallDirection::Outbound, to.clone(), handle.clone());
                handle.subscribe(CallEventSender::new(call.id(), self.events_tx.clone()));
                self.call = Some(call);
                self.apply(CallEvent::Dial { to }).await?;
            }
        }
        Ok(())
    }
}
