//! Shared fakes for the session integration tests
//!
//! Every collaborator is in-process: the telephony SDK, the audio platform and
//! the backend endpoints. Tests drive the SDK side through [`FakeDevice`] and
//! [`FakeCall`] and the operator side through the real [`AgentHandle`].

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use softphone_agent_core::audio::{AudioPlatform, AudioSink, CaptureStream};
use softphone_agent_core::call_log::CallLogRecord;
use softphone_agent_core::clock::ManualClock;
use softphone_agent_core::collaborators::{AccessGrant, AccessVerifier, CallLogSink, TokenProvider};
use softphone_agent_core::events::{AgentEvent, CallEventSender, DeviceEventSender};
use softphone_agent_core::telephony::{
    CallHandle, ClientOptions, ConnectParams, TelephonyClient, TelephonyFactory,
};
use softphone_agent_core::{
    AgentBuilder, AgentConfig, AgentError, AgentHandle, AgentResult, LaunchContext, SessionStatus,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Telephony SDK
// ---------------------------------------------------------------------------

/// One SDK call object
pub struct FakeCall {
    remote: Option<String>,
    events: Mutex<Option<CallEventSender>>,
    commands: Mutex<Vec<String>>,
    fail_accept: AtomicBool,
    slow_sdk: Mutex<Option<(ManualClock, chrono::Duration)>>,
}

impl FakeCall {
    fn new(remote: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            remote,
            events: Mutex::new(None),
            commands: Mutex::new(Vec::new()),
            fail_accept: AtomicBool::new(false),
            slow_sdk: Mutex::new(None),
        })
    }

    fn sender(&self) -> CallEventSender {
        self.events
            .lock()
            .clone()
            .expect("coordinator never subscribed to this call")
    }

    pub fn is_subscribed(&self) -> bool {
        self.events.lock().is_some()
    }

    pub fn remote_ringing(&self) {
        self.sender().ringing();
    }

    pub fn remote_answer(&self) {
        self.sender().accepted();
    }

    pub fn remote_disconnect(&self) {
        self.sender().disconnected();
    }

    pub fn remote_error(&self, message: &str) {
        self.sender().error(message);
    }

    pub fn fail_accept(&self) {
        self.fail_accept.store(true, Ordering::SeqCst);
    }

    /// Make reject and disconnect take `by` of wall-clock time
    pub fn slow_sdk(&self, clock: &ManualClock, by: chrono::Duration) {
        *self.slow_sdk.lock() = Some((clock.clone(), by));
    }

    fn elapse(&self) {
        if let Some((clock, by)) = self.slow_sdk.lock().as_ref() {
            clock.advance(*by);
        }
    }

    /// SDK commands issued on this call, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl CallHandle for FakeCall {
    fn remote_number(&self) -> Option<String> {
        self.remote.clone()
    }

    fn subscribe(&self, events: CallEventSender) {
        *self.events.lock() = Some(events);
    }

    async fn accept(&self) -> AgentResult<()> {
        if self.fail_accept.load(Ordering::SeqCst) {
            return Err(AgentError::telephony("media negotiation failed"));
        }
        self.commands.lock().push("accept".into());
        Ok(())
    }

    async fn reject(&self) -> AgentResult<()> {
        self.elapse();
        self.commands.lock().push("reject".into());
        Ok(())
    }

    async fn disconnect(&self) -> AgentResult<()> {
        self.elapse();
        self.commands.lock().push("disconnect".into());
        Ok(())
    }

    async fn mute(&self, muted: bool) -> AgentResult<()> {
        self.commands.lock().push(format!("mute:{}", muted));
        Ok(())
    }
}

/// The SDK device handle
pub struct FakeDevice {
    events: DeviceEventSender,
    pub token: String,
    pub options: ClientOptions,
    fail_register: bool,
    ring_during_register: Option<String>,
    early: Mutex<Option<Arc<FakeCall>>>,
    registered: AtomicBool,
    destroyed: AtomicBool,
    sink: Mutex<Option<String>>,
    connects: Mutex<Vec<ConnectParams>>,
    outbound: Mutex<Vec<Arc<FakeCall>>>,
}

impl FakeDevice {
    /// Signal an incoming call from `from`
    pub fn ring(&self, from: &str) -> Arc<FakeCall> {
        let call = FakeCall::new(Some(from.to_string()));
        self.events.incoming(call.clone());
        call
    }

    pub fn device_error(&self, message: &str) {
        self.events.error(message);
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn sink_label(&self) -> Option<String> {
        self.sink.lock().clone()
    }

    pub fn connects(&self) -> Vec<ConnectParams> {
        self.connects.lock().clone()
    }

    /// Call that rang while registration was still in flight
    pub fn early_call(&self) -> Arc<FakeCall> {
        self.early
            .lock()
            .clone()
            .expect("no call rang during registration")
    }

    pub fn outbound_call(&self) -> Arc<FakeCall> {
        self.outbound
            .lock()
            .last()
            .cloned()
            .expect("no outbound call placed")
    }
}

#[async_trait]
impl TelephonyClient for FakeDevice {
    fn attach_incoming_audio(&self, sink: Arc<dyn AudioSink>) -> AgentResult<()> {
        *self.sink.lock() = Some(sink.label());
        Ok(())
    }

    async fn register(&self) -> AgentResult<()> {
        if self.fail_register {
            return Err(AgentError::RegistrationFailed {
                reason: "signaling unreachable".into(),
            });
        }
        if let Some(from) = &self.ring_during_register {
            let call = FakeCall::new(Some(from.clone()));
            self.events.incoming(call.clone());
            *self.early.lock() = Some(call);
            tokio::task::yield_now().await;
        }
        self.registered.store(true, Ordering::SeqCst);
        self.events.registered();
        Ok(())
    }

    async fn connect(&self, params: ConnectParams) -> AgentResult<Arc<dyn CallHandle>> {
        let call = FakeCall::new(Some(params.to.clone()));
        self.connects.lock().push(params);
        self.outbound.lock().push(call.clone());
        Ok(call)
    }

    async fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeTelephony {
    fail_register: bool,
    ring_during_register: Option<String>,
    devices: Mutex<Vec<Arc<FakeDevice>>>,
}

impl FakeTelephony {
    pub fn device(&self) -> Arc<FakeDevice> {
        self.devices
            .lock()
            .last()
            .cloned()
            .expect("telephony client was never created")
    }

    pub fn devices_created(&self) -> usize {
        self.devices.lock().len()
    }
}

impl TelephonyFactory for FakeTelephony {
    fn create(
        &self,
        token: &str,
        options: ClientOptions,
        events: DeviceEventSender,
    ) -> AgentResult<Arc<dyn TelephonyClient>> {
        let device = Arc::new(FakeDevice {
            events,
            token: token.to_string(),
            options,
            fail_register: self.fail_register,
            ring_during_register: self.ring_during_register.clone(),
            early: Mutex::new(None),
            registered: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            sink: Mutex::new(None),
            connects: Mutex::new(Vec::new()),
            outbound: Mutex::new(Vec::new()),
        });
        self.devices.lock().push(device.clone());
        Ok(device)
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

struct FakeCapture(Arc<AtomicUsize>);

impl CaptureStream for FakeCapture {
    fn stop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeSink;

impl AudioSink for FakeSink {
    fn label(&self) -> String {
        "fake-speaker".to_string()
    }
}

pub struct FakeAudio {
    grant: AtomicBool,
    prompts: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl FakeAudio {
    pub fn new(grant: bool) -> Self {
        Self {
            grant: AtomicBool::new(grant),
            prompts: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_grant(&self, grant: bool) {
        self.grant.store(grant, Ordering::SeqCst);
    }

    /// Number of microphone prompts issued
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Number of captures released after the prompt
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioPlatform for FakeAudio {
    async fn request_microphone(&self) -> AgentResult<Box<dyn CaptureStream>> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.grant.load(Ordering::SeqCst) {
            Ok(Box::new(FakeCapture(self.released.clone())))
        } else {
            Err(AgentError::microphone("Permission denied"))
        }
    }

    fn create_output_sink(&self) -> AgentResult<Arc<dyn AudioSink>> {
        Ok(Arc::new(FakeSink))
    }
}

// ---------------------------------------------------------------------------
// Backend collaborators
// ---------------------------------------------------------------------------

pub struct FakeTokens {
    fail: bool,
    requests: Mutex<Vec<String>>,
}

impl FakeTokens {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn fetch_token(&self, identity: &str) -> AgentResult<String> {
        self.requests.lock().push(identity.to_string());
        if self.fail {
            Err(AgentError::TokenFetchFailed {
                reason: "token endpoint returned HTTP 500".into(),
            })
        } else {
            Ok(format!("token-for-{}", identity))
        }
    }
}

pub struct FakeVerifier {
    org_id: Option<String>,
    accept: bool,
    keys: Mutex<Vec<String>>,
}

impl FakeVerifier {
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }
}

#[async_trait]
impl AccessVerifier for FakeVerifier {
    async fn verify(&self, key: &str) -> AgentResult<AccessGrant> {
        self.keys.lock().push(key.to_string());
        if self.accept {
            Ok(AccessGrant {
                org_id: self.org_id.clone(),
            })
        } else {
            Err(AgentError::access_denied("verification returned HTTP 403"))
        }
    }
}

pub struct RecordingSink {
    tx: mpsc::UnboundedSender<CallLogRecord>,
    fail: bool,
}

#[async_trait]
impl CallLogSink for RecordingSink {
    async fn submit(&self, record: &CallLogRecord) -> AgentResult<()> {
        let _ = self.tx.send(record.clone());
        if self.fail {
            return Err(AgentError::CallLogRejected { status: 500 });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Knobs for [`Harness::start`]
pub struct Options {
    pub grant_microphone: bool,
    pub fail_token: bool,
    pub fail_register: bool,
    pub ring_during_register: Option<String>,
    pub accept_key: bool,
    pub verified_org: Option<String>,
    pub fail_log: bool,
    pub tick_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            grant_microphone: true,
            fail_token: false,
            fail_register: false,
            ring_during_register: None,
            accept_key: true,
            verified_org: Some("org-verified".to_string()),
            fail_log: false,
            tick_interval: Duration::from_secs(1),
        }
    }
}

pub struct Harness {
    pub handle: AgentHandle,
    pub events: broadcast::Receiver<AgentEvent>,
    pub records: mpsc::UnboundedReceiver<CallLogRecord>,
    pub telephony: Arc<FakeTelephony>,
    pub audio: Arc<FakeAudio>,
    pub tokens: Arc<FakeTokens>,
    pub verifier: Arc<FakeVerifier>,
    pub clock: ManualClock,
    pub run: JoinHandle<SessionStatus>,
}

impl Harness {
    /// Build a session from a launch query string and spawn its coordinator
    pub fn start(query: &str, options: Options) -> Self {
        let config = AgentConfig::new(
            "https://voice.example.com/getVoiceToken",
            "https://voice.example.com/createCallLog",
        )
        .with_verify_url("https://voice.example.com/verifyAccessKey")
        .with_tick_interval(options.tick_interval);

        let telephony = Arc::new(FakeTelephony {
            fail_register: options.fail_register,
            ring_during_register: options.ring_during_register.clone(),
            devices: Mutex::new(Vec::new()),
        });
        let audio = Arc::new(FakeAudio::new(options.grant_microphone));
        let tokens = Arc::new(FakeTokens {
            fail: options.fail_token,
            requests: Mutex::new(Vec::new()),
        });
        let verifier = Arc::new(FakeVerifier {
            org_id: options.verified_org,
            accept: options.accept_key,
            keys: Mutex::new(Vec::new()),
        });
        let (tx, records) = mpsc::unbounded_channel();
        let clock = ManualClock::new(t0());

        let (coordinator, handle) = AgentBuilder::new(config, LaunchContext::from_query(query))
            .with_audio_platform(audio.clone())
            .with_telephony(telephony.clone())
            .with_token_provider(tokens.clone())
            .with_access_verifier(verifier.clone())
            .with_call_log_sink(Arc::new(RecordingSink {
                tx,
                fail: options.fail_log,
            }))
            .with_clock(Arc::new(clock.clone()))
            .build()
            .expect("session should build");

        let events = handle.subscribe();
        let run = tokio::spawn(coordinator.run());

        Self {
            handle,
            events,
            records,
            telephony,
            audio,
            tokens,
            verifier,
            clock,
            run,
        }
    }

    /// Wait until the published snapshot shows `status`
    pub async fn wait_status(&self, status: SessionStatus) {
        let mut watch = self.handle.watch();
        let reached = tokio::time::timeout(WAIT, watch.wait_for(|s| s.status == status))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);
        assert!(
            reached,
            "status never became {:?}, last snapshot {:?}",
            status,
            self.handle.snapshot()
        );
    }

    /// Next published event matching `pred`, skipping everything else
    pub async fn next_event<F>(&mut self, mut pred: F) -> AgentEvent
    where
        F: FnMut(&AgentEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Ok(event)) if pred(&event) => return event,
                Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => panic!("event stream closed"),
                Err(_) => panic!("timed out waiting for event"),
            }
        }
    }

    /// Drain already-published events into a list
    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub async fn next_record(&mut self) -> CallLogRecord {
        tokio::time::timeout(WAIT, self.records.recv())
            .await
            .expect("timed out waiting for a call log record")
            .expect("record channel closed")
    }

    /// Give spawned submissions a chance to run, then assert nothing else was logged
    pub async fn assert_no_more_records(&mut self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(self.records.try_recv().is_err(), "unexpected extra call log record");
    }

    pub async fn wait_incoming(&mut self) {
        self.next_event(|e| matches!(e, AgentEvent::IncomingCall { .. })).await;
    }

    pub async fn finish(self) -> SessionStatus {
        tokio::time::timeout(WAIT, self.run)
            .await
            .expect("session did not finish")
            .expect("coordinator task panicked")
    }
}
