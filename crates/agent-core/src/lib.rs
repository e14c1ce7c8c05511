//! Call-session lifecycle coordinator for a softphone agent
//!
//! This crate runs one agent's softphone session: it resolves the launch
//! parameters, gates outbound sessions on an access key, acquires microphone
//! permission, bootstraps the telephony client and then drives every call
//! through a data-driven lifecycle table, with a live duration clock and an
//! exactly-once audit record per call.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        Operator UI / embedding code          │
//! └─────────────┬──────────────────▲─────────────┘
//!               │ AgentHandle      │ AgentEvent / SessionSnapshot
//! ┌─────────────▼──────────────────┴─────────────┐
//! │             SessionCoordinator               │
//! │  bootstrap ─▶ lifecycle table ─▶ actions     │
//! │  (access, audio, device)  (timer, call log)  │
//! └──────┬───────────────┬───────────────┬───────┘
//!        │               │               │
//! ┌──────▼─────┐  ┌──────▼──────┐  ┌─────▼──────────┐
//! │ Telephony  │  │   Audio     │  │ Token / access │
//! │    SDK     │  │  platform   │  │ / call-log HTTP│
//! └────────────┘  └─────────────┘  └────────────────┘
//! ```
//!
//! All input (SDK callbacks, operator commands, timer ticks) is funnelled into
//! one queue and handled one event at a time. There are no locks around call
//! state; the ordering of the queue is the only concurrency control.
//!
//! # Session flow
//!
//! 1. [`LaunchContext`] is resolved once from the launch query string.
//! 2. Outbound sessions pass the [`access::AccessGate`]; a missing or refused
//!    key ends the session as `Unauthorized` before any audio work.
//! 3. [`audio::AudioBootstrap`] acquires microphone permission and the output
//!    sink. Denial parks the session until [`AgentHandle::retry_audio`].
//! 4. The identity token is fetched and the telephony client created. Inbound
//!    sessions register and wait; outbound sessions dial the normalized
//!    destination right away.
//! 5. Calls move through the [`state_table::LIFECYCLE_TABLE`]. The first
//!    terminal event of a call wins; its record is dispatched exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use softphone_agent_core::*;
//! # use softphone_agent_core::audio::AudioPlatform;
//! # use softphone_agent_core::telephony::TelephonyFactory;
//! # async fn demo(audio: Arc<dyn AudioPlatform>, sdk: Arc<dyn TelephonyFactory>) -> AgentResult<()> {
//! let config = AgentConfig::new(
//!     "https://voice.example.com/getVoiceToken",
//!     "https://voice.example.com/createCallLog",
//! );
//! let (coordinator, handle) = AgentBuilder::new(config, LaunchContext::default())
//!     .with_audio_platform(audio)
//!     .with_telephony(sdk)
//!     .build()?;
//!
//! let mut events = handle.subscribe();
//! tokio::spawn(coordinator.run());
//!
//! while let Ok(event) = events.recv().await {
//!     if let AgentEvent::IncomingCall { from, .. } = event {
//!         println!("call from {}", from);
//!         handle.accept().await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod audio;
pub mod call;
pub mod call_log;
pub mod client;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod number;
pub mod session;
pub mod state_table;
pub mod telephony;
pub mod timer;

pub use call::{Call, CallDirection, CallId, CallState, TerminalStatus};
pub use call_log::CallLogRecord;
pub use client::{AgentBuilder, AgentHandle, SessionCoordinator};
pub use config::AgentConfig;
pub use context::{LaunchContext, SessionMode};
pub use error::{AgentError, AgentResult};
pub use events::{AgentEvent, CallStatusInfo, OperatorAction};
pub use session::{AuthorizationState, SessionSnapshot, SessionStatus};
