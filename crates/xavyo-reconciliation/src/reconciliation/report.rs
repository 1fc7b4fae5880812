//! Reconciliation report generation.
//!
//! Renders the textual trace report of a run from its results, at the
//! resource's trace level.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::entity::EntityKind;
use crate::result::{ResourceOperation, SyncResult, SyncStatus};

use super::statistics::KindCounts;

const DRY_RUN_BANNER: &str = "==>Dry run only, no modifications were made<==\n\n";
const INTERRUPTED_BANNER: &str = "==>Execution was interrupted<==\n\n";

/// Verbosity of the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    /// No report at all.
    None,
    /// Summary counts only.
    Summary,
    /// Summary plus every failure.
    #[default]
    Failures,
    /// Summary plus every result.
    All,
}

impl TraceLevel {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceLevel::None => "none",
            TraceLevel::Summary => "summary",
            TraceLevel::Failures => "failures",
            TraceLevel::All => "all",
        }
    }

    /// Whether the execution record should be persisted.
    #[must_use]
    pub fn should_register(&self, had_failures: bool) -> bool {
        match self {
            TraceLevel::All => true,
            TraceLevel::Failures => had_failures,
            TraceLevel::Summary | TraceLevel::None => false,
        }
    }
}

impl std::fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TraceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TraceLevel::None),
            "summary" => Ok(TraceLevel::Summary),
            "failures" => Ok(TraceLevel::Failures),
            "all" => Ok(TraceLevel::All),
            _ => Err(format!("Unknown trace level: {s}")),
        }
    }
}

/// Generates run reports.
#[derive(Debug, Clone, Copy)]
pub struct ReportGenerator {
    trace_level: TraceLevel,
    dry_run: bool,
    interrupted: bool,
}

impl ReportGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new(trace_level: TraceLevel, dry_run: bool) -> Self {
        Self {
            trace_level,
            dry_run,
            interrupted: false,
        }
    }

    /// Mark the run as interrupted.
    #[must_use]
    pub fn interrupted(mut self, interrupted: bool) -> Self {
        self.interrupted = interrupted;
        self
    }

    /// Render the report for the given kinds, in order.
    ///
    /// Returns `None` at trace level `None`.
    #[must_use]
    pub fn generate(&self, kinds: &[EntityKind], results: &[SyncResult]) -> Option<String> {
        if self.trace_level == TraceLevel::None {
            return None;
        }

        let mut report = String::new();
        if self.dry_run {
            report.push_str(DRY_RUN_BANNER);
        }
        if self.interrupted {
            report.push_str(INTERRUPTED_BANNER);
        }

        let summary: Vec<String> = kinds
            .iter()
            .map(|kind| summary_line(kind, &counts_for(kind, results)))
            .collect();
        report.push_str(&summary.join("\n"));

        if matches!(self.trace_level, TraceLevel::Failures | TraceLevel::All) {
            for kind in kinds {
                let failed = |op| select(results, kind, op, SyncStatus::Failure);
                self.section(&mut report, kind, "failed to create", &failed(ResourceOperation::Create));
                self.section(&mut report, kind, "failed to update", &failed(ResourceOperation::Update));
                self.section(&mut report, kind, "failed to delete", &failed(ResourceOperation::Delete));
                self.section(&mut report, kind, "failed with no operation", &failed(ResourceOperation::None));
            }
        }

        if self.trace_level == TraceLevel::All {
            for kind in kinds {
                let succeeded = |op| select(results, kind, op, SyncStatus::Success);
                self.section(&mut report, kind, "created", &succeeded(ResourceOperation::Create));
                self.section(&mut report, kind, "updated", &succeeded(ResourceOperation::Update));
                self.section(&mut report, kind, "deleted", &succeeded(ResourceOperation::Delete));
                self.section(&mut report, kind, "no operation", &succeeded(ResourceOperation::None));
                let ignored: Vec<&SyncResult> = results
                    .iter()
                    .filter(|r| r.entity_kind() == kind && r.status() == SyncStatus::Ignore)
                    .collect();
                self.section(&mut report, kind, "ignored", &ignored);
            }
        }

        Some(report)
    }

    fn section(&self, report: &mut String, kind: &EntityKind, title: &str, entries: &[&SyncResult]) {
        if entries.is_empty() {
            return;
        }
        let _ = write!(report, "\n\n{} {title}:", kind.plural_label());
        for result in entries {
            report.push('\n');
            report.push_str(&self.entry(result));
        }
    }

    fn entry(&self, result: &SyncResult) -> String {
        let operation = result.operation().as_str().to_uppercase();
        if self.trace_level == TraceLevel::Failures {
            return format!(
                "Failed {operation} (key/name): {}/{} with message: {}",
                result.entity_id(),
                result.display_name(),
                result.message().unwrap_or_default()
            );
        }

        let mut line = format!(
            "{operation} {} (key/name): {}/{}",
            result.status().as_str().to_uppercase(),
            result.entity_id(),
            result.display_name()
        );
        if let Some(message) = result.message().filter(|m| !m.trim().is_empty()) {
            let _ = write!(line, " with message: {message}");
        }
        line
    }
}

fn counts_for(kind: &EntityKind, results: &[SyncResult]) -> KindCounts {
    let mut counts = KindCounts::default();
    for result in results.iter().filter(|r| r.entity_kind() == kind) {
        counts.record(result);
    }
    counts
}

fn select<'a>(
    results: &'a [SyncResult],
    kind: &EntityKind,
    operation: ResourceOperation,
    status: SyncStatus,
) -> Vec<&'a SyncResult> {
    results
        .iter()
        .filter(|r| r.entity_kind() == kind && r.operation() == operation && r.status() == status)
        .collect()
}

fn summary_line(kind: &EntityKind, counts: &KindCounts) -> String {
    format!(
        "{} [created/failures]: {}/{} [updated/failures]: {}/{} [deleted/failures]: {}/{} [no operation/ignored]: {}/{}",
        kind.plural_label(),
        counts.created,
        counts.create_failures,
        counts.updated,
        counts.update_failures,
        counts.deleted,
        counts.delete_failures,
        counts.no_op,
        counts.ignored
    )
}
