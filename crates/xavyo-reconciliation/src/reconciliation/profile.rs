//! Per-execution run profile.

use std::sync::Arc;

use xavyo_connector::traits::Connector;
use xavyo_core::ExecutionId;

use crate::config::{ReconciliationTask, ResourceConfig};
use crate::conflict::ConflictResolutionAction;
use crate::hooks::HookPipeline;
use crate::result::SyncResult;

/// State of one reconciliation execution.
///
/// Created at run start and consumed at run end; its results feed the
/// report and statistics. Results are only ever appended.
pub struct RunProfile {
    execution_id: ExecutionId,
    task: ReconciliationTask,
    resource: ResourceConfig,
    connector: Arc<dyn Connector>,
    dry_run: bool,
    conflict_resolution: ConflictResolutionAction,
    hooks: HookPipeline,
    results: Vec<SyncResult>,
}

impl RunProfile {
    /// Create a profile with no results.
    pub fn new(
        execution_id: ExecutionId,
        task: ReconciliationTask,
        resource: ResourceConfig,
        connector: Arc<dyn Connector>,
        dry_run: bool,
        conflict_resolution: ConflictResolutionAction,
        hooks: HookPipeline,
    ) -> Self {
        Self {
            execution_id,
            task,
            resource,
            connector,
            dry_run,
            conflict_resolution,
            hooks,
            results: Vec::new(),
        }
    }

    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    #[must_use]
    pub fn task(&self) -> &ReconciliationTask {
        &self.task
    }

    #[must_use]
    pub fn resource(&self) -> &ResourceConfig {
        &self.resource
    }

    #[must_use]
    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    #[must_use]
    pub fn conflict_resolution(&self) -> ConflictResolutionAction {
        self.conflict_resolution
    }

    #[must_use]
    pub fn hooks(&self) -> &HookPipeline {
        &self.hooks
    }

    /// Results produced so far, in production order.
    #[must_use]
    pub fn results(&self) -> &[SyncResult] {
        &self.results
    }

    /// Append results.
    pub fn extend_results(&mut self, results: impl IntoIterator<Item = SyncResult>) {
        self.results.extend(results);
    }

    /// Consume the profile, keeping its results.
    #[must_use]
    pub fn into_results(self) -> Vec<SyncResult> {
        self.results
    }
}

impl std::fmt::Debug for RunProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunProfile")
            .field("execution_id", &self.execution_id)
            .field("task", &self.task.id)
            .field("resource", &self.resource.name)
            .field("connector", &self.connector.display_name())
            .field("dry_run", &self.dry_run)
            .field("conflict_resolution", &self.conflict_resolution)
            .field("hooks", &self.hooks)
            .field("results", &self.results.len())
            .finish()
    }
}
