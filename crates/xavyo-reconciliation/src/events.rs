//! Audit events emitted for every reconciliation result.
//!
//! The event name is `"<kind>.<operation>"`, e.g. `user.create` or
//! `group.delete`. Sinks must not fail the run: emission errors are logged
//! and dropped by the dispatcher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use xavyo_core::{EntityId, ExecutionId};

use crate::result::{SyncResult, SyncStatus};

/// Event sink errors.
#[derive(Debug, Error)]
pub enum EventError {
    /// The sink could not accept the event.
    #[error("Event sink unavailable: {0}")]
    Unavailable(String),
}

/// Result type for event sinks.
pub type EventResult<T> = Result<T, EventError>;

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationEvent {
    /// `"<kind>.<operation>"`.
    pub event: String,

    /// Result status.
    pub outcome: SyncStatus,

    /// Local entity id (nil for dry-run creations).
    pub entity_id: EntityId,

    /// External uid of the record.
    pub uid: String,

    /// Local state before the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    /// What was sent to the workflow (draft or patch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,

    /// Failure or informational message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Run that produced the event.
    pub execution_id: ExecutionId,

    /// Whether the run was a dry run.
    pub dry_run: bool,

    /// When the event was produced.
    pub occurred_at: DateTime<Utc>,
}

impl ReconciliationEvent {
    /// Build the event describing a result.
    pub fn from_result(execution_id: ExecutionId, dry_run: bool, result: &SyncResult) -> Self {
        Self {
            event: format!(
                "{}.{}",
                result.entity_kind().as_str(),
                result.operation().as_str()
            ),
            outcome: result.status(),
            entity_id: result.entity_id(),
            uid: result.uid().to_string(),
            before: None,
            input: None,
            message: result.message().map(str::to_string),
            execution_id,
            dry_run,
            occurred_at: result.timestamp(),
        }
    }

    /// Attach the local state before the operation.
    #[must_use]
    pub fn with_before(mut self, before: Option<serde_json::Value>) -> Self {
        self.before = before;
        self
    }

    /// Attach the workflow input.
    #[must_use]
    pub fn with_input(mut self, input: Option<serde_json::Value>) -> Self {
        self.input = input;
        self
    }
}

/// Destination of audit events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Record one event.
    async fn emit(&self, event: ReconciliationEvent) -> EventResult<()>;
}

/// Sink writing events to the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: ReconciliationEvent) -> EventResult<()> {
        info!(
            target: "audit",
            event = %event.event,
            outcome = %event.outcome,
            entity_id = %event.entity_id,
            uid = %event.uid,
            execution_id = %event.execution_id,
            dry_run = event.dry_run,
            message = event.message.as_deref().unwrap_or(""),
            "Reconciliation event"
        );
        Ok(())
    }
}
