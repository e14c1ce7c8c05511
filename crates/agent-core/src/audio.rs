//! Audio bootstrap
//!
//! Acquires microphone permission and prepares the output sink used for ringing
//! and call audio. The raw capture obtained while asking for permission is
//! released immediately; only the permission side effect matters here, the SDK
//! opens its own capture once a call is up.
//!
//! Denial is never retried automatically. The coordinator parks the session in
//! the blocked status and waits for an operator-triggered retry.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{AgentError, AgentResult};

/// A live microphone capture handed out by the platform
pub trait CaptureStream: Send {
    /// Stop every track of the capture
    fn stop(&mut self);
}

/// Output sink for incoming-call and ringing audio
pub trait AudioSink: Send + Sync {
    /// Human readable identifier, used in logs
    fn label(&self) -> String;
}

/// Host audio capabilities
#[async_trait]
pub trait AudioPlatform: Send + Sync {
    /// Prompt for microphone access.
    ///
    /// Fails with [`AgentError::MicrophoneUnavailable`] when the operator denies
    /// the prompt or the host has no capture capability.
    async fn request_microphone(&self) -> AgentResult<Box<dyn CaptureStream>>;

    /// Build the output sink (autoplay enabled)
    fn create_output_sink(&self) -> AgentResult<Arc<dyn AudioSink>>;
}

/// Runs the permission + sink sequence against an [`AudioPlatform`]
pub struct AudioBootstrap {
    platform: Arc<dyn AudioPlatform>,
}

impl AudioBootstrap {
    pub fn new(platform: Arc<dyn AudioPlatform>) -> Self {
        Self { platform }
    }

    /// Acquire permission, release the capture, then build the output sink.
    ///
    /// Returns the sink only when both steps succeeded; the caller sets the
    /// audio-ready flag from that.
    pub async fn prepare(&self) -> AgentResult<Arc<dyn AudioSink>> {
        debug!("Requesting microphone access");
        let mut capture = match self.platform.request_microphone().await {
            Ok(capture) => capture,
            Err(e) => {
                warn!("Microphone access failed: {}", e);
                return Err(match e {
                    AgentError::MicrophoneUnavailable { .. } => e,
                    other => AgentError::microphone(other.to_string()),
                });
            }
        };
        capture.stop();
        debug!("Microphone permission granted, capture released");

        let sink = self.platform.create_output_sink().map_err(|e| {
            warn!("Output sink construction failed: {}", e);
            match e {
                AgentError::AudioOutputUnavailable { .. } => e,
                other => AgentError::AudioOutputUnavailable {
                    reason: other.to_string(),
                },
            }
        })?;
        info!("Audio ready, output sink {}", sink.label());
        Ok(sink)
    }
}
