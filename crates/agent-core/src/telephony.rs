//! Telephony SDK seam
//!
//! The signaling/media client is an external collaborator. The coordinator only
//! consumes a small command surface (construct, attach audio, register, connect,
//! and per-call accept/reject/disconnect/mute) and receives events back through
//! the senders defined in [`crate::events`].
//!
//! Exactly one [`TelephonyClient`] exists per session. It is created after audio
//! readiness and a valid token, and destroyed on session teardown.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::AudioSink;
use crate::error::AgentResult;
use crate::events::{CallEventSender, DeviceEventSender};

/// Options passed to the SDK when the client is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Report a distinct ringing state for outbound calls
    pub enable_ringing_state: bool,
    /// Ask the host to confirm before closing while a call is up
    pub close_protection: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            enable_ringing_state: true,
            close_protection: true,
        }
    }
}

/// Parameters of an outbound connect request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectParams {
    /// Normalized destination number
    #[serde(rename = "To")]
    pub to: String,
}

/// One call object owned by the SDK
#[async_trait]
pub trait CallHandle: Send + Sync {
    /// Remote party number as reported by the SDK (`parameters.From`)
    fn remote_number(&self) -> Option<String>;

    /// Route this call's `ringing`/`accept`/`disconnect`/`error` events to `events`
    fn subscribe(&self, events: CallEventSender);

    async fn accept(&self) -> AgentResult<()>;

    async fn reject(&self) -> AgentResult<()>;

    async fn disconnect(&self) -> AgentResult<()>;

    async fn mute(&self, muted: bool) -> AgentResult<()>;
}

/// The SDK device handle
#[async_trait]
pub trait TelephonyClient: Send + Sync {
    /// Route incoming-call audio to `sink`
    fn attach_incoming_audio(&self, sink: Arc<dyn AudioSink>) -> AgentResult<()>;

    /// Register for inbound signaling. Resolves once registration completed.
    async fn register(&self) -> AgentResult<()>;

    /// Place an outbound call
    async fn connect(&self, params: ConnectParams) -> AgentResult<Arc<dyn CallHandle>>;

    /// Tear the device down; no events are delivered afterwards
    async fn destroy(&self);
}

/// Constructs the per-session telephony client
pub trait TelephonyFactory: Send + Sync {
    fn create(
        &self,
        token: &str,
        options: ClientOptions,
        events: DeviceEventSender,
    ) -> AgentResult<Arc<dyn TelephonyClient>>;
}
