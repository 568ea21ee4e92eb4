//! Audit trail of user-attributable actions.
//!
//! `record` never blocks and never fails the caller: events go onto an
//! unbounded channel and a background task hands them to the sink. Sink
//! failures are logged at debug level and dropped.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::clock::rfc3339_now;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub timestamp: String,
    pub user_id: Option<String>,
    pub action: String,
    pub resource: String,
    pub status: AuditStatus,
    pub details: Value,
}

#[derive(Debug, Error)]
#[error("audit sink unavailable: {0}")]
pub struct AuditError(pub String);

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Emits each event as a structured log line on the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            timestamp = %event.timestamp,
            user_id = event.user_id.as_deref().unwrap_or("anonymous"),
            action = %event.action,
            resource = %event.resource,
            status = ?event.status,
            details = %event.details,
            "audit"
        );
        Ok(())
    }
}

/// Keeps events in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn write(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .map_err(|_| AuditError("memory sink poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditLogger {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn AuditSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.write(&event) {
                    tracing::debug!(error = %e, action = %event.action, "Dropped audit event");
                }
            }
        });

        Self { tx }
    }

    pub fn record(
        &self,
        user_id: Option<&str>,
        action: &str,
        resource: &str,
        status: AuditStatus,
        details: Value,
    ) {
        let event = AuditEvent {
            timestamp: rfc3339_now(),
            user_id: user_id.map(str::to_owned),
            action: action.to_owned(),
            resource: resource.to_owned(),
            status,
            details,
        };
        // Writer gone means we are shutting down.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn write(&self, _event: &AuditEvent) -> Result<(), AuditError> {
            Err(AuditError("offline".into()))
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let sink = Arc::new(MemoryAuditSink::default());
        let audit = AuditLogger::spawn(sink.clone());

        audit.record(Some("u1"), "updateProgress", "c1", AuditStatus::Success, json!({}));
        audit.record(None, "verifyCertificate", "CERT-X", AuditStatus::Failure, json!({"error": "nope"}));
        settle().await;

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "updateProgress");
        assert_eq!(events[0].user_id.as_deref(), Some("u1"));
        assert_eq!(events[1].status, AuditStatus::Failure);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let audit = AuditLogger::spawn(Arc::new(BrokenSink));
        audit.record(Some("u1"), "revokeCertificate", "CERT-X", AuditStatus::Success, Value::Null);
        settle().await;
        // Still usable afterwards.
        audit.record(Some("u1"), "revokeCertificate", "CERT-Y", AuditStatus::Success, Value::Null);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = AuditEvent {
            timestamp: "t".into(),
            user_id: Some("u1".into()),
            action: "a".into(),
            resource: "r".into(),
            status: AuditStatus::Success,
            details: Value::Null,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["userId"], "u1");
        assert_eq!(v["status"], "success");
    }
}
