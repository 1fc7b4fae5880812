//! # Reconciliation Runs
//!
//! One execution of a reconciliation task against one resource.
//!
//! ## Overview
//!
//! A run provides:
//! - Full mode enumerating every object of each mapped object class
//! - Incremental mode processing only changes since the stored sync token
//! - Correlation, conflict resolution and dispatch of every streamed record
//! - Dry-run mode for previewing changes
//! - Cooperative cancellation between records
//! - A trace report and per-kind statistics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      ReconciliationEngine                           │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌───────────────┐    ┌───────────────┐    ┌───────────────┐        │
//! │  │   Connector   │───►│ RecordHandler │───►│  Dispatcher   │        │
//! │  │   (stream)    │    │ (correlate +  │    │ (hooks, work- │        │
//! │  │               │    │   conflicts)  │    │ flow, propag.)│        │
//! │  └───────────────┘    └───────────────┘    └───────────────┘        │
//! │          │                    │                    │                │
//! │          ▼                    ▼                    ▼                │
//! │  ┌───────────────┐    ┌───────────────┐    ┌───────────────┐        │
//! │  │  Sync Token   │    │  RunProfile   │    │  Audit Events │        │
//! │  │  Persistence  │    │  (results)    │    │               │        │
//! │  └───────────────┘    └───────────────┘    └───────────────┘        │
//! │                               │                                     │
//! │                               ▼                                     │
//! │                    ┌─────────────────────┐                          │
//! │                    │ Report + Statistics │                          │
//! │                    └─────────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use xavyo_reconciliation::{ReconciliationEngine, ReconciliationTask};
//!
//! let engine = ReconciliationEngine::new(repository, workflow, propagation, resources, connectors)
//!     .with_hooks(hooks);
//!
//! // Incremental run against the stored tokens
//! let outcome = engine.run(&ReconciliationTask::new("ldap"), false).await?;
//! println!("{}", outcome.report.unwrap_or_default());
//!
//! // Full preview without modifications
//! let preview = engine.run(&ReconciliationTask::new("ldap").full(), true).await?;
//! ```

pub mod engine;
mod handler;
pub mod profile;
pub mod report;
pub mod statistics;

pub use engine::{ReconciliationEngine, RunOutcome, RunState};
pub use profile::RunProfile;
pub use report::{ReportGenerator, TraceLevel};
pub use statistics::{KindCounts, RunStatistics};
