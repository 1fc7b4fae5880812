//! Reconciliation engine orchestrator.
//!
//! Main entry point for reconciliation runs. One call to
//! [`ReconciliationEngine::run`] owns one execution from binding the
//! connector to the final report.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use xavyo_connector::change::SyncToken;
use xavyo_core::{ActingPrincipal, ExecutionId, TaskId};

use crate::binding::KindBinding;
use crate::collaborators::{ConnectorProvider, Propagation, Repository, ResourceStore, Workflow};
use crate::config::{EngineConfig, ReconciliationTask, ResourceConfig};
use crate::correlation::{CorrelationEngine, CorrelationRuleRegistry};
use crate::dispatcher::Dispatcher;
use crate::entity::EntityKind;
use crate::error::{ReconciliationError, ReconciliationResult};
use crate::events::{EventSink, TracingEventSink};
use crate::hooks::HookPipeline;
use crate::result::SyncResult;

use super::handler::RecordHandler;
use super::profile::RunProfile;
use super::report::ReportGenerator;
use super::statistics::RunStatistics;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Validating configuration.
    Init,
    /// Mappings bound and connector acquired.
    Bound,
    /// Enumerating every object.
    FullScan,
    /// Requesting changes since the stored tokens.
    Incremental,
    /// Dispatching records.
    Streaming,
    /// Persisting the latest sync tokens.
    TokenUpdate,
    /// Report built.
    Reported,
    /// Completed.
    Done,
    /// Stopped early on request; results so far were reported.
    Cancelled,
    /// Aborted by a fatal error.
    Failed,
}

impl RunState {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::Bound => "bound",
            RunState::FullScan => "full_scan",
            RunState::Incremental => "incremental",
            RunState::Streaming => "streaming",
            RunState::TokenUpdate => "token_update",
            RunState::Reported => "reported",
            RunState::Done => "done",
            RunState::Cancelled => "cancelled",
            RunState::Failed => "failed",
        }
    }

    /// Check if a transition is valid.
    #[must_use]
    pub fn can_transition_to(&self, target: &Self) -> bool {
        match (self, target) {
            (Self::Init, Self::Bound)
            | (Self::Bound, Self::FullScan | Self::Incremental)
            | (Self::FullScan | Self::Incremental, Self::Streaming)
            | (Self::Streaming, Self::TokenUpdate | Self::Reported)
            | (Self::TokenUpdate, Self::Reported)
            | (Self::Reported, Self::Done | Self::Cancelled) => true,

            // Any live state may abort
            (a, Self::Failed) => !a.is_terminal(),

            _ => false,
        }
    }

    /// Check if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Cancelled | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks and logs the state of one execution.
struct RunStateTracker {
    execution_id: ExecutionId,
    state: RunState,
}

impl RunStateTracker {
    fn new(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            state: RunState::Init,
        }
    }

    fn advance(&mut self, next: RunState) {
        if !self.state.can_transition_to(&next) {
            error!(
                execution_id = %self.execution_id,
                from = %self.state,
                to = %next,
                "Invalid run state transition"
            );
        }
        info!(
            execution_id = %self.execution_id,
            from = %self.state,
            to = %next,
            "Run state changed"
        );
        self.state = next;
    }
}

/// Outcome of a completed (or cancelled) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Execution ID.
    pub execution_id: ExecutionId,
    /// Task that was run.
    pub task_id: TaskId,
    /// Resource name.
    pub resource: String,
    /// Final state, `Done` or `Cancelled`.
    pub state: RunState,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Every result, in production order.
    pub results: Vec<SyncResult>,
    /// Aggregated counts.
    pub statistics: RunStatistics,
    /// Trace report, absent at trace level `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    /// Whether the execution record should be persisted at the resource's trace level.
    pub should_register: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// Check if the run was cancelled.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.state == RunState::Cancelled
    }
}

/// Scan order: users, then groups, then any objects.
fn scan_rank(kind: &EntityKind) -> u8 {
    match kind {
        EntityKind::User => 0,
        EntityKind::Group => 1,
        EntityKind::AnyObject(_) => 2,
    }
}

/// Reconciliation engine for orchestrating reconciliation runs.
pub struct ReconciliationEngine {
    repository: Arc<dyn Repository>,
    workflow: Arc<dyn Workflow>,
    propagation: Arc<dyn Propagation>,
    resources: Arc<dyn ResourceStore>,
    connectors: Arc<dyn ConnectorProvider>,
    events: Arc<dyn EventSink>,
    correlation: CorrelationEngine,
    rules: CorrelationRuleRegistry,
    hooks: HookPipeline,
    config: EngineConfig,
}

impl ReconciliationEngine {
    /// Create a new reconciliation engine over its collaborators.
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository>,
        workflow: Arc<dyn Workflow>,
        propagation: Arc<dyn Propagation>,
        resources: Arc<dyn ResourceStore>,
        connectors: Arc<dyn ConnectorProvider>,
    ) -> Self {
        Self {
            correlation: CorrelationEngine::new(Arc::clone(&repository)),
            repository,
            workflow,
            propagation,
            resources,
            connectors,
            events: Arc::new(TracingEventSink),
            rules: CorrelationRuleRegistry::new(),
            hooks: HookPipeline::new(),
            config: EngineConfig::default(),
        }
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the action hooks every run uses.
    #[must_use]
    pub fn with_hooks(mut self, hooks: HookPipeline) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the named correlation rules mappings may refer to.
    #[must_use]
    pub fn with_correlation_rules(mut self, rules: CorrelationRuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    /// Set the audit event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Run a task to completion.
    pub async fn run(
        &self,
        task: &ReconciliationTask,
        dry_run: bool,
    ) -> ReconciliationResult<RunOutcome> {
        self.run_with_cancellation(task, dry_run, CancellationToken::new())
            .await
    }

    /// Run a task and return its trace report.
    pub async fn run_reconciliation(
        &self,
        task: &ReconciliationTask,
        dry_run: bool,
    ) -> ReconciliationResult<Option<String>> {
        Ok(self.run(task, dry_run).await?.report)
    }

    /// Run a task, checking `cancel` between records.
    ///
    /// A cancelled run stops streaming, skips token persistence and still
    /// reports what it has.
    #[instrument(skip(self, task, cancel), fields(task_id = %task.id, resource = %task.resource))]
    pub async fn run_with_cancellation(
        &self,
        task: &ReconciliationTask,
        dry_run: bool,
        cancel: CancellationToken,
    ) -> ReconciliationResult<RunOutcome> {
        let execution_id = ExecutionId::new();
        let mut tracker = RunStateTracker::new(execution_id);

        info!(
            execution_id = %execution_id,
            full = task.full_reconciliation,
            dry_run,
            "Starting reconciliation run"
        );

        match self.execute(task, dry_run, &cancel, &mut tracker).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    execution_id = %execution_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Reconciliation run failed"
                );
                tracker.advance(RunState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        task: &ReconciliationTask,
        dry_run: bool,
        cancel: &CancellationToken,
        tracker: &mut RunStateTracker,
    ) -> ReconciliationResult<RunOutcome> {
        let started_at = Utc::now();
        self.config
            .validate()
            .map_err(ReconciliationError::configuration)?;
        task.validate().map_err(ReconciliationError::configuration)?;

        let resource = self.resources.load(&task.resource).await.map_err(|source| {
            ReconciliationError::ResourceUnavailable {
                resource: task.resource.clone(),
                source,
            }
        })?;
        let bindings = self.bind(&resource)?;
        let connector = self.connectors.connector_for(&resource).await.map_err(|source| {
            ReconciliationError::ConnectorNotFound {
                resource: resource.name.clone(),
                source,
            }
        })?;
        connector.test_connection().await.map_err(|source| {
            ReconciliationError::ConnectorUnavailable {
                resource: resource.name.clone(),
                source,
            }
        })?;
        tracker.advance(RunState::Bound);

        let conflict_resolution = task
            .conflict_resolution
            .unwrap_or(self.config.default_conflict_resolution);
        let mut profile = RunProfile::new(
            tracker.execution_id,
            task.clone(),
            resource,
            connector,
            dry_run,
            conflict_resolution,
            self.hooks.clone(),
        );

        profile
            .hooks()
            .before_all(&profile)
            .await
            .map_err(|source| ReconciliationError::Hook {
                phase: "before_all",
                source,
            })?;

        tracker.advance(if task.full_reconciliation {
            RunState::FullScan
        } else {
            RunState::Incremental
        });
        tracker.advance(RunState::Streaming);
        let (records_processed, records_skipped) =
            self.stream(&mut profile, &bindings, cancel).await?;

        let cancelled = cancel.is_cancelled();
        if !dry_run && !task.full_reconciliation && !cancelled {
            tracker.advance(RunState::TokenUpdate);
            self.update_tokens(&profile, &bindings).await?;
        }

        profile
            .hooks()
            .after_all(&profile, profile.results())
            .await
            .map_err(|source| ReconciliationError::Hook {
                phase: "after_all",
                source,
            })?;

        let kinds: Vec<EntityKind> = bindings.iter().map(|b| b.kind().clone()).collect();
        let trace_level = profile.resource().trace_level;
        let report = ReportGenerator::new(trace_level, dry_run)
            .interrupted(cancelled)
            .generate(&kinds, profile.results());
        tracker.advance(RunState::Reported);

        let resource_name = profile.resource().name.clone();
        let results = profile.into_results();
        let finished_at = Utc::now();
        let mut statistics = RunStatistics::from_results(&results);
        statistics.records_processed = records_processed;
        statistics.records_skipped = records_skipped;
        statistics.duration_ms =
            u64::try_from((finished_at - started_at).num_milliseconds()).unwrap_or_default();

        tracker.advance(if cancelled {
            RunState::Cancelled
        } else {
            RunState::Done
        });

        info!(
            execution_id = %tracker.execution_id,
            records_processed,
            records_skipped,
            results = results.len(),
            failures = statistics.failures(),
            duration_ms = statistics.duration_ms,
            "Reconciliation run finished"
        );

        Ok(RunOutcome {
            execution_id: tracker.execution_id,
            task_id: task.id,
            resource: resource_name,
            state: tracker.state,
            dry_run,
            should_register: trace_level.should_register(statistics.has_failures()),
            results,
            statistics,
            report,
            started_at,
            finished_at,
        })
    }

    /// Bind every kind mapping of the resource, in scan order.
    ///
    /// Any-object mappings are reconciled only alongside a user or group mapping.
    fn bind(&self, resource: &ResourceConfig) -> ReconciliationResult<Vec<KindBinding>> {
        let has_identity_mapping = resource
            .mappings
            .iter()
            .any(|m| matches!(m.kind, EntityKind::User | EntityKind::Group));
        if !has_identity_mapping {
            return Err(ReconciliationError::NoMapping {
                resource: resource.name.clone(),
            });
        }

        let mut bindings = resource
            .mappings
            .iter()
            .map(|mapping| KindBinding::bind(&resource.name, mapping, &self.rules))
            .collect::<ReconciliationResult<Vec<_>>>()?;
        bindings.sort_by_key(|b| scan_rank(b.kind()));
        Ok(bindings)
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.workflow),
            Arc::clone(&self.propagation),
            ActingPrincipal::system(self.config.principal_name.clone()),
        )
        .with_event_sink(Arc::clone(&self.events))
    }

    /// Stream every bound object class through the record handler.
    async fn stream(
        &self,
        profile: &mut RunProfile,
        bindings: &[KindBinding],
        cancel: &CancellationToken,
    ) -> ReconciliationResult<(u64, u64)> {
        let connector = Arc::clone(profile.connector());
        let full = profile.task().full_reconciliation;
        let dispatcher = self.dispatcher();
        let mut processed = 0;
        let mut skipped = 0;

        for binding in bindings {
            if cancel.is_cancelled() {
                break;
            }

            let object_class = binding.object_class().clone();
            let token = if full {
                None
            } else {
                profile.resource().sync_token(&object_class).cloned()
            };
            info!(
                object_class = %object_class,
                full,
                token = token.as_ref().map(SyncToken::value),
                "Streaming changes"
            );

            let mut handler = RecordHandler::new(
                profile,
                bindings,
                &self.correlation,
                &dispatcher,
                cancel,
                self.config.progress_log_interval,
            );
            connector
                .stream_changes(&object_class, token.as_ref(), &mut handler)
                .await
                .map_err(|source| ReconciliationError::Connector {
                    object_class: object_class.to_string(),
                    source,
                })?;

            let (p, s) = handler.counters();
            processed += p;
            skipped += s;
        }

        Ok((processed, skipped))
    }

    /// Persist the connector's latest token of every bound object class.
    async fn update_tokens(
        &self,
        profile: &RunProfile,
        bindings: &[KindBinding],
    ) -> ReconciliationResult<()> {
        let resource = &profile.resource().name;
        for binding in bindings {
            let object_class = binding.object_class();
            let token = profile
                .connector()
                .latest_token(object_class)
                .await
                .map_err(|e| ReconciliationError::token(object_class, e.to_string()))?;
            self.resources
                .save_sync_token(resource, object_class, &token)
                .await
                .map_err(|e| ReconciliationError::token(object_class, e.to_string()))?;
            info!(object_class = %object_class, token = %token, "Stored latest sync token");
        }
        Ok(())
    }
}
