//! Inbound session lifecycle through the public API

mod common;

use chrono::Duration;
use common::{t0, Harness, Options};
use pretty_assertions::assert_eq;
use softphone_agent_core::telephony::ClientOptions;
use softphone_agent_core::{
    AgentError, AgentEvent, CallDirection, CallState, SessionStatus, TerminalStatus,
};
use tracing_test::traced_test;

async fn ready(query: &str, options: Options) -> Harness {
    let h = Harness::start(query, options);
    h.wait_status(SessionStatus::Ready).await;
    h
}

/// Round-trip a refused command so every event queued before it has been handled
async fn flush(h: &Harness) {
    let _ = h.handle.retry_audio().await;
}

#[tokio::test]
async fn bootstrap_registers_with_token_and_audio() {
    let h = ready("orgId=org-1", Options::default()).await;
    let device = h.telephony.device();

    assert!(device.is_registered());
    assert_eq!(device.token, "token-for-agent");
    assert_eq!(device.options, ClientOptions::default());
    assert_eq!(device.sink_label().as_deref(), Some("fake-speaker"));
    assert_eq!(h.tokens.requests(), vec!["agent".to_string()]);
    assert_eq!(h.audio.prompts(), 1);
    assert_eq!(h.audio.released(), 1);
    assert!(h.verifier.keys().is_empty());

    let snapshot = h.handle.snapshot();
    assert!(snapshot.audio_ready);
    assert_eq!(snapshot.call_state, CallState::Idle);
    assert_eq!(snapshot.status.to_string(), "Ready for inbound calls");
}

#[tokio::test]
async fn call_ringing_during_registration_is_delivered_after_ready() {
    let mut h = Harness::start(
        "",
        Options {
            ring_during_register: Some("+15550007777".into()),
            ..Options::default()
        },
    );
    h.next_event(|e| {
        matches!(
            e,
            AgentEvent::StatusChanged {
                status: SessionStatus::Ready
            }
        )
    })
    .await;
    let event = h
        .next_event(|e| matches!(e, AgentEvent::IncomingCall { .. }))
        .await;
    assert!(matches!(event, AgentEvent::IncomingCall { ref from, .. } if from == "+15550007777"));
    assert!(h.telephony.device().is_registered());

    h.handle.accept().await.unwrap();
    assert_eq!(h.handle.snapshot().call_state, CallState::Active);
    assert_eq!(
        h.telephony.device().early_call().commands(),
        vec!["accept".to_string()]
    );
}

#[tokio::test]
async fn accepted_call_logs_duration_and_session_takes_next_call() {
    let mut h = ready("orgId=org-1", Options::default()).await;
    let device = h.telephony.device();

    let first = device.ring("+15550001111");
    h.wait_status(SessionStatus::IncomingCall {
        from: "+15550001111".into(),
    })
    .await;
    h.handle.accept().await.unwrap();
    assert_eq!(h.handle.snapshot().status, SessionStatus::Connected);
    assert_eq!(h.handle.snapshot().call_state, CallState::Active);

    h.clock.advance(Duration::milliseconds(12_400));
    first.remote_disconnect();

    let record = h.next_record().await;
    assert_eq!(record.to, "+15550001111");
    assert_eq!(record.status, TerminalStatus::Ended);
    assert_eq!(record.direction, CallDirection::Inbound);
    assert_eq!(record.duration_seconds, 12);
    assert_eq!(record.started_at, Some(t0()));
    assert_eq!(record.ended_at, Some(t0() + Duration::milliseconds(12_400)));
    assert_eq!(record.reason, None);
    assert_eq!(record.org_id.as_deref(), Some("org-1"));
    h.wait_status(SessionStatus::CallEnded).await;
    assert_eq!(h.handle.snapshot().call_id, None);

    // a second, independent call
    h.clock.advance(Duration::seconds(60));
    let second = device.ring("+15550002222");
    h.wait_status(SessionStatus::IncomingCall {
        from: "+15550002222".into(),
    })
    .await;
    h.handle.accept().await.unwrap();
    h.clock.advance(Duration::seconds(5));
    second.remote_disconnect();

    let record = h.next_record().await;
    assert_eq!(record.to, "+15550002222");
    assert_eq!(record.duration_seconds, 5);
    h.assert_no_more_records().await;

    assert_eq!(first.commands(), vec!["accept".to_string()]);
    assert_eq!(second.commands(), vec!["accept".to_string()]);
}

#[tokio::test]
async fn rejected_call_logs_zero_duration() {
    let mut h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;

    h.clock.advance(Duration::seconds(8));
    h.handle.reject().await.unwrap();

    let record = h.next_record().await;
    assert_eq!(record.status, TerminalStatus::Rejected);
    assert_eq!(record.reason.as_deref(), Some("Agent rejected"));
    assert_eq!(record.duration_seconds, 0);
    assert_eq!(record.started_at, None);
    assert_eq!(record.ended_at, Some(t0() + Duration::seconds(8)));
    assert_eq!(record.org_id, None);
    assert_eq!(call.commands(), vec!["reject".to_string()]);
    assert_eq!(h.handle.snapshot().status.to_string(), "Rejected");

    let events = h.drain_events();
    assert!(!events
        .iter()
        .any(|e| matches!(e, AgentEvent::DurationTick { .. })));
    h.assert_no_more_records().await;
}

#[tokio::test]
async fn reject_end_time_is_taken_before_the_sdk_round_trip() {
    let mut h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;
    call.slow_sdk(&h.clock, Duration::seconds(3));

    h.handle.reject().await.unwrap();
    let record = h.next_record().await;
    assert_eq!(record.ended_at, Some(t0()));
    assert_eq!(call.commands(), vec!["reject".to_string()]);
}

#[tokio::test]
async fn disconnect_then_error_logs_once() {
    let mut h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;
    h.handle.accept().await.unwrap();
    h.clock.advance(Duration::seconds(3));

    call.remote_disconnect();
    call.remote_error("transport closed");
    flush(&h).await;

    let record = h.next_record().await;
    assert_eq!(record.status, TerminalStatus::Ended);
    assert_eq!(record.reason, None);
    assert_eq!(record.duration_seconds, 3);
    h.assert_no_more_records().await;
    assert_eq!(h.handle.snapshot().status, SessionStatus::CallEnded);
}

#[tokio::test]
async fn error_then_disconnect_logs_failure_once() {
    let mut h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;
    h.handle.accept().await.unwrap();

    call.remote_error("ICE failed");
    call.remote_disconnect();
    flush(&h).await;

    let record = h.next_record().await;
    assert_eq!(record.status, TerminalStatus::Failed);
    assert_eq!(record.reason.as_deref(), Some("ICE failed"));
    h.assert_no_more_records().await;
    assert_eq!(
        h.handle.snapshot().status.to_string(),
        "Call failed: ICE failed"
    );
}

#[tokio::test]
async fn caller_hanging_up_while_ringing_is_logged() {
    let mut h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;

    call.remote_disconnect();
    let record = h.next_record().await;
    assert_eq!(record.status, TerminalStatus::Ended);
    assert_eq!(record.started_at, None);
    assert_eq!(record.duration_seconds, 0);
    assert!(call.commands().is_empty());

    // too late to act on it
    let err = h.handle.accept().await.unwrap_err();
    assert!(matches!(err, AgentError::InvalidState { state: None, .. }));
}

#[tokio::test]
async fn second_incoming_while_busy_is_rejected_and_not_logged() {
    let mut h = ready("", Options::default()).await;
    let device = h.telephony.device();
    let first = device.ring("+15550001111");
    h.wait_incoming().await;
    h.handle.accept().await.unwrap();

    let second = device.ring("+15550009999");
    flush(&h).await;
    assert_eq!(second.commands(), vec!["reject".to_string()]);
    assert!(!second.is_subscribed());
    assert_eq!(h.handle.snapshot().call_state, CallState::Active);

    first.remote_disconnect();
    let record = h.next_record().await;
    assert_eq!(record.to, "+15550001111");
    h.assert_no_more_records().await;
}

#[tokio::test]
async fn inbound_hang_up_and_mute_are_refused() {
    let h = ready("", Options::default()).await;
    let _call = h.telephony.device().ring("+15550001111");
    h.wait_status(SessionStatus::IncomingCall {
        from: "+15550001111".into(),
    })
    .await;
    h.handle.accept().await.unwrap();

    let err = h.handle.hang_up().await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::InvalidState {
            state: Some(CallState::Active),
            ..
        }
    ));
    assert!(h.handle.set_muted(true).await.is_err());
    assert!(!h.handle.snapshot().muted);
}

#[tokio::test]
async fn failed_accept_keeps_call_ringing() {
    let mut h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;
    call.fail_accept();

    let err = h.handle.accept().await.unwrap_err();
    assert!(matches!(err, AgentError::Telephony { .. }));
    assert_eq!(h.handle.snapshot().call_state, CallState::RingingIn);

    h.handle.reject().await.unwrap();
    let record = h.next_record().await;
    assert_eq!(record.status, TerminalStatus::Rejected);
    assert_eq!(record.started_at, None);
}

#[tokio::test]
async fn stale_events_of_a_released_call_are_ignored() {
    let mut h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;
    h.handle.reject().await.unwrap();
    h.next_record().await;

    call.remote_error("late error");
    call.remote_disconnect();
    flush(&h).await;

    h.assert_no_more_records().await;
    assert_eq!(h.handle.snapshot().status, SessionStatus::Rejected);
}

#[tokio::test]
async fn device_error_shows_status_while_idle() {
    let h = ready("", Options::default()).await;
    let device = h.telephony.device();

    device.device_error("websocket closed");
    h.wait_status(SessionStatus::DeviceError {
        message: "websocket closed".into(),
    })
    .await;

    // the device keeps delivering calls
    device.ring("+15550001111");
    h.wait_status(SessionStatus::IncomingCall {
        from: "+15550001111".into(),
    })
    .await;
}

#[tokio::test]
async fn shutdown_closes_idle_session_only() {
    let h = ready("", Options::default()).await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_status(SessionStatus::IncomingCall {
        from: "+15550001111".into(),
    })
    .await;
    assert!(matches!(
        h.handle.shutdown().await,
        Err(AgentError::InvalidState { .. })
    ));

    call.remote_disconnect();
    h.wait_status(SessionStatus::CallEnded).await;
    h.handle.shutdown().await.unwrap();

    let device = h.telephony.device();
    let handle = h.handle.clone();
    assert_eq!(h.finish().await, SessionStatus::Closed);
    assert!(device.is_destroyed());
    assert!(matches!(handle.accept().await, Err(AgentError::SessionClosed)));
}

#[tokio::test]
#[traced_test]
async fn log_submission_failure_is_only_diagnosed() {
    let mut h = ready(
        "",
        Options {
            fail_log: true,
            ..Options::default()
        },
    )
    .await;
    let call = h.telephony.device().ring("+15550001111");
    h.wait_incoming().await;
    h.handle.accept().await.unwrap();
    call.remote_disconnect();

    h.next_record().await;
    for _ in 0..20 {
        if logs_contain("Failed to submit call log") {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(logs_contain("Failed to submit call log"));
    assert_eq!(h.handle.snapshot().status, SessionStatus::CallEnded);

    // the session carries on
    h.telephony.device().ring("+15550002222");
    h.wait_incoming().await;
}
