//! Per-item reconciliation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use xavyo_core::EntityId;

use crate::entity::EntityKind;

/// Local operation a result records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOperation {
    /// Entity created.
    Create,
    /// Entity updated.
    Update,
    /// Entity deleted, or removed from the resource.
    Delete,
    /// No local mutation (link, unlink, ignore).
    None,
}

impl ResourceOperation {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceOperation::Create => "create",
            ResourceOperation::Update => "update",
            ResourceOperation::Delete => "delete",
            ResourceOperation::None => "none",
        }
    }
}

impl std::fmt::Display for ResourceOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ResourceOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(ResourceOperation::Create),
            "update" => Ok(ResourceOperation::Update),
            "delete" => Ok(ResourceOperation::Delete),
            "none" => Ok(ResourceOperation::None),
            _ => Err(format!("Unknown resource operation: {s}")),
        }
    }
}

/// Outcome of an attempted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// The operation succeeded.
    Success,
    /// The operation failed.
    Failure,
    /// The operation failed and an action hook chose to ignore the failure.
    Ignore,
}

impl SyncStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failure => "failure",
            SyncStatus::Ignore => "ignore",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one attempted local mutation.
///
/// Built once, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    operation: ResourceOperation,
    status: SyncStatus,
    entity_kind: EntityKind,
    entity_id: EntityId,
    display_name: String,
    uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    timestamp: DateTime<Utc>,
}

impl SyncResult {
    /// Successful result.
    pub fn success(
        operation: ResourceOperation,
        entity_kind: EntityKind,
        entity_id: EntityId,
        display_name: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            status: SyncStatus::Success,
            entity_kind,
            entity_id,
            display_name: display_name.into(),
            uid: uid.into(),
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed result with the captured error message.
    pub fn failure(
        operation: ResourceOperation,
        entity_kind: EntityKind,
        entity_id: EntityId,
        display_name: impl Into<String>,
        uid: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: SyncStatus::Failure,
            message: Some(message.into()),
            ..Self::success(operation, entity_kind, entity_id, display_name, uid)
        }
    }

    /// Copy of this result with an informational message attached.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Copy of this result marked as ignored.
    #[must_use]
    pub fn into_ignored(self) -> Self {
        Self {
            status: SyncStatus::Ignore,
            ..self
        }
    }

    /// Operation.
    #[must_use]
    pub fn operation(&self) -> ResourceOperation {
        self.operation
    }

    /// Status.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Entity kind.
    #[must_use]
    pub fn entity_kind(&self) -> &EntityKind {
        &self.entity_kind
    }

    /// Entity id (nil for dry-run creates and unmatched ignores).
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Display name of the entity.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// External uid of the record that produced this result.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Captured message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// When the result was produced.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Check if successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }

    /// Check if failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == SyncStatus::Failure
    }
}
