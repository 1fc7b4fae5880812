//! # xavyo Reconciliation Engine
//!
//! Pull reconciliation of external resources into local identity state.
//!
//! For every change record a connector reports, the engine finds the local
//! entities it corresponds to, resolves ambiguous matches, and creates,
//! updates or deletes local entities through the workflow and propagation
//! collaborators. Every attempted mutation yields one [`SyncResult`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Connector   │───►│ Correlation  │───►│   Conflict   │───►│  Dispatcher  │
//! │   stream     │    │   Engine     │    │  Resolution  │    │              │
//! └──────────────┘    └──────────────┘    └──────────────┘    └──────┬───────┘
//!                                                                    │
//!                            ┌───────────────────┬───────────────────┤
//!                            ▼                   ▼                   ▼
//!                     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//!                     │ Action Hook │     │  Workflow   │     │ Propagation │
//!                     │  Pipeline   │     │             │     │             │
//!                     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Features
//!
//! - **Correlation**: named rules, alternate search schemas, or the mapped account id
//! - **Conflict Resolution**: ignore, first match, last match or all matches
//! - **Matching Rules**: update, link, unlink, unassign, deprovision or ignore matches;
//!   provision, assign or ignore unmatched objects
//! - **Action Hooks**: per-phase record rewriting and error disposition
//! - **Dry Run**: full correlation and hooks without any mutation
//! - **Sync Tokens**: incremental runs resume from the stored token per object class
//! - **Trace Report**: summary, failures or every result
//!
//! ## Example
//!
//! ```ignore
//! use xavyo_reconciliation::{ReconciliationEngine, ReconciliationTask, MatchingRule};
//!
//! let engine = ReconciliationEngine::new(repository, workflow, propagation, resources, connectors);
//!
//! let mut task = ReconciliationTask::new("hr-ldap");
//! task.matching_rule = MatchingRule::Update;
//!
//! let outcome = engine.run(&task, false).await?;
//! for result in &outcome.results {
//!     tracing::info!(uid = %result.uid(), status = %result.status(), "reconciled");
//! }
//! ```

pub mod binding;
pub mod collaborators;
pub mod config;
pub mod conflict;
pub mod correlation;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod events;
pub mod hooks;
pub mod mapper;
pub mod reconciliation;
pub mod result;
pub mod search;

// Re-exports for convenience
pub use binding::KindBinding;
pub use collaborators::{
    ConnectorProvider, Propagation, PropagationOutcome, PropagationStatus, PropagationTarget,
    Repository, ResourceStore, Workflow,
};
pub use config::{
    EngineConfig, KindMapping, MatchingRule, ReconciliationTask, ResourceConfig, UnmatchingRule,
};
pub use conflict::ConflictResolutionAction;
pub use correlation::{
    CorrelationEngine, CorrelationPolicy, CorrelationRule, CorrelationRuleRegistry,
};
pub use dispatcher::Dispatcher;
pub use entity::{EntityDraft, EntityKind, EntityPatch, EntityStatus, LocalEntity, StatusChange};
pub use error::{CorrelationError, DispatchError, ReconciliationError, ReconciliationResult};
pub use events::{EventError, EventResult, EventSink, ReconciliationEvent, TracingEventSink};
pub use hooks::{
    ActionHook, ErrorDisposition, HookCriticality, HookError, HookPhase, HookPipeline, HookResult,
};
pub use mapper::EntityMapper;
pub use reconciliation::{
    KindCounts, ReconciliationEngine, ReportGenerator, RunOutcome, RunProfile, RunState,
    RunStatistics, TraceLevel,
};
pub use result::{ResourceOperation, SyncResult, SyncStatus};
pub use search::SearchCond;
