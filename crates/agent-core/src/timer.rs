//! Duration timer
//!
//! Exists only while a call is Active. The timer task does not compute the
//! elapsed time itself; it pushes a [`SessionEvent::TimerTick`] onto the session
//! queue and the coordinator samples the call's accept timestamp. A tick that was
//! already queued when the call left Active is discarded by the coordinator.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::call::CallId;
use crate::events::{SessionEvent, SessionEventSender};

/// Periodic tick source bound to one call
#[derive(Debug)]
pub struct DurationTimer {
    call_id: CallId,
    task: JoinHandle<()>,
}

impl DurationTimer {
    /// Start ticking every `period`, first tick one period from now
    pub(crate) fn start(call_id: CallId, period: Duration, events: SessionEventSender) -> Self {
        debug!(call_id = %call_id, period_ms = period.as_millis() as u64, "Starting duration timer");
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(SessionEvent::TimerTick { call_id }).is_err() {
                    break;
                }
            }
        });
        Self { call_id, task }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// Stop the timer; no tick is sent after this returns
    pub fn stop(self) {
        debug!(call_id = %self.call_id, "Stopping duration timer");
    }
}

impl Drop for DurationTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
