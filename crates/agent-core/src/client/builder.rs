//! Session builder
//!
//! Wires an [`AgentConfig`] and a [`LaunchContext`] to the collaborators a
//! session needs. The audio platform and the telephony factory have no default
//! and must be supplied; the backend collaborators default to the HTTP
//! implementations built from the configured endpoints.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use softphone_agent_core::{AgentBuilder, AgentConfig, LaunchContext};
//! # use softphone_agent_core::audio::AudioPlatform;
//! # use softphone_agent_core::telephony::TelephonyFactory;
//! # async fn demo(audio: Arc<dyn AudioPlatform>, sdk: Arc<dyn TelephonyFactory>) -> softphone_agent_core::AgentResult<()> {
//! let config = AgentConfig::load_from_file("agent.toml")?;
//! let ctx = LaunchContext::from_query("orgId=org-1");
//!
//! let (coordinator, handle) = AgentBuilder::new(config, ctx)
//!     .with_audio_platform(audio)
//!     .with_telephony(sdk)
//!     .build()?;
//!
//! let mut events = handle.subscribe();
//! tokio::spawn(coordinator.run());
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use super::coordinator::SessionCoordinator;
use super::handle::AgentHandle;
use crate::audio::AudioPlatform;
use crate::call_log::CallLogEmitter;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    AccessVerifier, CallLogSink, HttpAccessVerifier, HttpCallLogSink, HttpTokenProvider,
    TokenProvider,
};
use crate::config::AgentConfig;
use crate::context::{LaunchContext, SessionMode};
use crate::error::{AgentError, AgentResult};
use crate::session::{Session, SessionSnapshot};
use crate::state_table::LIFECYCLE_TABLE;
use crate::telephony::TelephonyFactory;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fluent builder for a [`SessionCoordinator`] and its [`AgentHandle`]
pub struct AgentBuilder {
    config: AgentConfig,
    context: LaunchContext,
    tokens: Option<Arc<dyn TokenProvider>>,
    verifier: Option<Arc<dyn AccessVerifier>>,
    call_log: Option<Arc<dyn CallLogSink>>,
    audio: Option<Arc<dyn AudioPlatform>>,
    telephony: Option<Arc<dyn TelephonyFactory>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AgentBuilder {
    pub fn new(config: AgentConfig, context: LaunchContext) -> Self {
        Self {
            config,
            context,
            tokens: None,
            verifier: None,
            call_log: None,
            audio: None,
            telephony: None,
            clock: None,
        }
    }

    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_access_verifier(mut self, verifier: Arc<dyn AccessVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_call_log_sink(mut self, sink: Arc<dyn CallLogSink>) -> Self {
        self.call_log = Some(sink);
        self
    }

    pub fn with_audio_platform(mut self, audio: Arc<dyn AudioPlatform>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_telephony(mut self, telephony: Arc<dyn TelephonyFactory>) -> Self {
        self.telephony = Some(telephony);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and assemble the session
    pub fn build(self) -> AgentResult<(SessionCoordinator, AgentHandle)> {
        self.config.validate()?;

        let audio = self
            .audio
            .ok_or_else(|| AgentError::config("an audio platform is required"))?;
        let telephony = self
            .telephony
            .ok_or_else(|| AgentError::config("a telephony factory is required"))?;
        let tokens: Arc<dyn TokenProvider> = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(HttpTokenProvider::new(&self.config)?),
        };
        let call_log: Arc<dyn CallLogSink> = match self.call_log {
            Some(sink) => sink,
            None => Arc::new(HttpCallLogSink::new(&self.config)?),
        };

        let session = Session::from_context(&self.context);
        let verifier: Option<Arc<dyn AccessVerifier>> = match self.verifier {
            Some(verifier) => Some(verifier),
            None if self.config.verify_url.is_some() => {
                Some(Arc::new(HttpAccessVerifier::new(&self.config)?))
            }
            None => None,
        };
        if session.mode == SessionMode::Outbound && verifier.is_none() {
            return Err(AgentError::config(
                "outbound sessions need verify_url or an access verifier",
            ));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::capture(&session, None));

        let handle = AgentHandle {
            commands: events_tx.clone(),
            events: event_tx.clone(),
            snapshot: snapshot_rx,
        };

        let coordinator = SessionCoordinator {
            config: Arc::new(self.config),
            session,
            access_key: self.context.access_key,
            tokens,
            verifier,
            audio,
            telephony,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            call_log: CallLogEmitter::new(call_log),
            table: LIFECYCLE_TABLE.clone(),
            client: None,
            audio_sink: None,
            call: None,
            timer: None,
            events_tx,
            events_rx,
            event_tx,
            snapshot_tx,
        };

        Ok((coordinator, handle))
    }
}
