//! Call-log emission
//!
//! One [`CallLogRecord`] per terminated call, built from the [`Call`] entity and
//! handed to the [`CallLogSink`] without waiting for the outcome. Idempotence
//! rests on [`Call::try_mark_logged`]: the coordinator drains its event queue
//! one event at a time, so the check-and-set cannot interleave with another
//! terminal event for the same call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::call::{Call, CallDirection, TerminalStatus};
use crate::collaborators::CallLogSink;

/// Audit record for one terminated call, in the call-log wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogRecord {
    /// Caller number for inbound calls, normalized destination for outbound calls
    pub to: String,
    pub status: TerminalStatus,
    pub reason: Option<String>,
    pub direction: CallDirection,
    /// Accept timestamp, null when the call never connected
    #[serde(with = "iso_millis")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "iso_millis")]
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl CallLogRecord {
    /// Snapshot a terminated call. Returns `None` while the call is still live.
    pub fn from_call(call: &Call, ctx: &LogContext) -> Option<Self> {
        let status = call.terminal_status()?;
        Some(Self {
            to: call.remote_number().to_string(),
            status,
            reason: call.failure_reason().map(str::to_string),
            direction: call.direction(),
            started_at: call.started_at(),
            ended_at: call.ended_at(),
            duration_seconds: call.duration_seconds(),
            org_id: ctx.org_id.clone(),
            customer_id: ctx.customer_id.clone(),
        })
    }
}

/// Session identifiers stamped on every record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    pub org_id: Option<String>,
    pub customer_id: Option<String>,
}

/// Builds and dispatches call-log records, at most once per call
#[derive(Clone)]
pub struct CallLogEmitter {
    sink: Arc<dyn CallLogSink>,
}

impl CallLogEmitter {
    pub fn new(sink: Arc<dyn CallLogSink>) -> Self {
        Self { sink }
    }

    /// Emit the record for `call` if it terminated and was not logged yet.
    ///
    /// Submission runs on its own task; failures are logged and never retried.
    /// Must be called from within a tokio runtime.
    pub fn emit(&self, call: &mut Call, ctx: &LogContext) -> Option<CallLogRecord> {
        if call.terminal_status().is_none() {
            debug!(call_id = %call.id(), "Call still live, nothing to log");
            return None;
        }
        if !call.try_mark_logged() {
            debug!(call_id = %call.id(), "Call already logged, skipping");
            return None;
        }
        let record = CallLogRecord::from_call(call, ctx)?;

        info!(
            call_id = %call.id(),
            status = %record.status,
            duration = record.duration_seconds,
            "Dispatching call log"
        );
        let sink = self.sink.clone();
        let submitted = record.clone();
        let call_id = call.id();
        tokio::spawn(async move {
            if let Err(e) = sink.submit(&submitted).await {
                warn!(call_id = %call_id, "Failed to submit call log: {}", e);
            }
        });
        Some(record)
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
