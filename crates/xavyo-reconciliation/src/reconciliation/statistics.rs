//! Run statistics for reconciliation.
//!
//! Aggregates per-kind counts of operation and status from a run's results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::EntityKind;
use crate::result::{ResourceOperation, SyncResult, SyncStatus};

/// Counts for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub create_failures: u32,
    #[serde(default)]
    pub updated: u32,
    #[serde(default)]
    pub update_failures: u32,
    #[serde(default)]
    pub deleted: u32,
    #[serde(default)]
    pub delete_failures: u32,
    /// Successful results with no local operation.
    #[serde(default)]
    pub no_op: u32,
    /// Failed results with no local operation (link, unlink).
    #[serde(default)]
    pub no_op_failures: u32,
    /// Failures an action hook chose to ignore.
    #[serde(default)]
    pub ignored: u32,
}

impl KindCounts {
    /// Count one result.
    pub fn record(&mut self, result: &SyncResult) {
        let slot = match (result.status(), result.operation()) {
            (SyncStatus::Ignore, _) => &mut self.ignored,
            (SyncStatus::Success, ResourceOperation::Create) => &mut self.created,
            (SyncStatus::Success, ResourceOperation::Update) => &mut self.updated,
            (SyncStatus::Success, ResourceOperation::Delete) => &mut self.deleted,
            (SyncStatus::Success, ResourceOperation::None) => &mut self.no_op,
            (SyncStatus::Failure, ResourceOperation::Create) => &mut self.create_failures,
            (SyncStatus::Failure, ResourceOperation::Update) => &mut self.update_failures,
            (SyncStatus::Failure, ResourceOperation::Delete) => &mut self.delete_failures,
            (SyncStatus::Failure, ResourceOperation::None) => &mut self.no_op_failures,
        };
        *slot += 1;
    }

    /// Total failures.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.create_failures + self.update_failures + self.delete_failures + self.no_op_failures
    }

    /// Total results.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.created + self.updated + self.deleted + self.no_op + self.ignored + self.failures()
    }

    /// Add another set of counts.
    pub fn merge(&mut self, other: &KindCounts) {
        self.created += other.created;
        self.create_failures += other.create_failures;
        self.updated += other.updated;
        self.update_failures += other.update_failures;
        self.deleted += other.deleted;
        self.delete_failures += other.delete_failures;
        self.no_op += other.no_op;
        self.no_op_failures += other.no_op_failures;
        self.ignored += other.ignored;
    }
}

/// Statistics for a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Records received from the connector.
    #[serde(default)]
    pub records_processed: u64,
    /// Records skipped before dispatch (correlation failure, ignored conflict).
    #[serde(default)]
    pub records_skipped: u64,
    /// Counts by entity kind label.
    #[serde(default)]
    pub by_kind: BTreeMap<String, KindCounts>,
    /// Total duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl RunStatistics {
    /// Create new empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every result.
    #[must_use]
    pub fn from_results(results: &[SyncResult]) -> Self {
        let mut stats = Self::new();
        for result in results {
            stats
                .by_kind
                .entry(result.entity_kind().as_str().to_string())
                .or_default()
                .record(result);
        }
        stats
    }

    /// Counts of one kind (zero when the kind produced nothing).
    #[must_use]
    pub fn counts(&self, kind: &EntityKind) -> KindCounts {
        self.by_kind.get(kind.as_str()).copied().unwrap_or_default()
    }

    /// Total failures across kinds.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.by_kind.values().map(KindCounts::failures).sum()
    }

    /// Whether any result failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    /// Merge with another statistics instance.
    pub fn merge(&mut self, other: &RunStatistics) {
        self.records_processed += other.records_processed;
        self.records_skipped += other.records_skipped;
        self.duration_ms += other.duration_ms;
        for (kind, counts) in &other.by_kind {
            self.by_kind.entry(kind.clone()).or_default().merge(counts);
        }
    }
}
