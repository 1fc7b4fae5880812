//! Reconciliation error types.
//!
//! [`ReconciliationError`] is raised only for run-level fatal conditions.
//! Record-scoped problems are carried by [`CorrelationError`] and
//! [`DispatchError`] and end up in the log or in a FAILURE result; they never
//! abort a run.

use thiserror::Error;

use xavyo_connector::error::ConnectorError;
use xavyo_core::XavyoError;

use crate::hooks::HookError;

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// The resource configuration could not be loaded.
    #[error("Resource '{resource}' could not be loaded: {source}")]
    ResourceUnavailable {
        resource: String,
        #[source]
        source: XavyoError,
    },

    /// No connector instance could be resolved for the resource.
    #[error("Connector instance for resource '{resource}' not found: {source}")]
    ConnectorNotFound {
        resource: String,
        #[source]
        source: ConnectorError,
    },

    /// The connector was resolved but its target system is unreachable.
    #[error("Connector for resource '{resource}' is unavailable: {source}")]
    ConnectorUnavailable {
        resource: String,
        #[source]
        source: ConnectorError,
    },

    /// A kind mapping is unusable (typically no account id item).
    #[error("Invalid {kind} mapping on resource '{resource}': {source}")]
    InvalidMapping {
        kind: String,
        resource: String,
        #[source]
        source: ConnectorError,
    },

    /// The resource maps neither users nor groups.
    #[error("Resource '{resource}' has neither user nor group mapping")]
    NoMapping { resource: String },

    /// The task or engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The connector failed while streaming changes.
    #[error("While streaming {object_class} changes from connector: {source}")]
    Connector {
        object_class: String,
        #[source]
        source: ConnectorError,
    },

    /// The latest sync token could not be read or stored.
    #[error("While updating sync token for {object_class}: {message}")]
    TokenPersistence {
        object_class: String,
        message: String,
    },

    /// A run-level action hook failed.
    #[error("Action hook failed during {phase}: {source}")]
    Hook {
        phase: &'static str,
        #[source]
        source: HookError,
    },
}

impl ReconciliationError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a token persistence error.
    pub fn token(object_class: impl ToString, message: impl Into<String>) -> Self {
        Self::TokenPersistence {
            object_class: object_class.to_string(),
            message: message.into(),
        }
    }

    /// Check if a later attempt of the same run may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connector { source, .. }
            | Self::ConnectorNotFound { source, .. }
            | Self::ConnectorUnavailable { source, .. } => source.is_transient(),
            Self::TokenPersistence { .. } => true,
            _ => false,
        }
    }
}

/// Result type for run-level operations.
pub type ReconciliationResult<T> = Result<T, ReconciliationError>;

/// Errors that abort correlation of a single record.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// A correlation rule or the alternate schemas produced a malformed condition.
    #[error("Malformed search condition: {condition}")]
    InvalidCondition { condition: String },

    /// A correlation rule could not build a condition for the record.
    #[error("Correlation rule '{rule}' failed: {message}")]
    Rule { rule: String, message: String },

    /// The repository search failed.
    #[error("Search failed: {0}")]
    Search(#[from] XavyoError),

    /// The binding lacks what correlation needs.
    #[error("Correlation configuration error: {message}")]
    Configuration { message: String },
}

/// Errors from dispatching one mutation. Converted into FAILURE results.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A before-phase action hook failed.
    #[error("{0}")]
    Hook(#[from] HookError),

    /// The workflow collaborator rejected or failed the mutation.
    #[error("{0}")]
    Workflow(#[source] XavyoError),

    /// Outbound propagation is the operation itself and it failed.
    #[error("Propagation to '{resource}' failed: {message}")]
    Propagation { resource: String, message: String },
}
