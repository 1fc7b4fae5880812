//! Error Types
//!
//! This module provides the error taxonomy shared by the repository, workflow
//! and resource collaborators of xavyo.
//!
//! # Example
//!
//! ```
//! use xavyo_core::{XavyoError, Result};
//!
//! fn find_user(id: &str) -> Result<String> {
//!     if id.is_empty() {
//!         return Err(XavyoError::NotFound {
//!             resource: "User".to_string(),
//!             id: None,
//!         });
//!     }
//!     Ok(format!("User {}", id))
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

/// Standardized error type for xavyo.
///
/// Collaborators return this error so the reconciliation engine can tell a
/// vanished entity or a denied call (record-scoped, skipped) apart from a
/// genuine mutation failure.
///
/// # Variants
///
/// - `Unauthorized` - The acting principal lacks permission
/// - `NotFound` - Entity or resource not found
/// - `ValidationError` - Input validation failure
/// - `Conflict` - Concurrent modification or uniqueness violation
/// - `Internal` - Any other collaborator failure
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum XavyoError {
    /// Authentication or authorization failure.
    #[error("Unauthorized{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unauthorized {
        /// Optional message providing more context
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Requested resource was not found.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// The type of resource that was not found (e.g., "User", "Group")
        resource: String,
        /// Optional identifier of the resource
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Input validation failure.
    #[error("Validation error on field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// Uniqueness or concurrent-modification conflict.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict
        message: String,
    },

    /// Unclassified collaborator failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl XavyoError {
    /// Create a not-found error for a resource and identifier.
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.to_string()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error means the target is gone or out of reach for the
    /// caller, as opposed to an operation that was attempted and failed.
    #[must_use]
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Unauthorized { .. })
    }
}

/// Type alias for Results using `XavyoError`.
pub type Result<T> = std::result::Result<T, XavyoError>;
