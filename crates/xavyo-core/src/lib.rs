//! xavyo Core Library
//!
//! Shared types for xavyo.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (EntityId, TaskId, ExecutionId)
//! - [`principal`] - Explicit acting principal passed to mutating collaborators
//! - [`error`] - Standardized error types (XavyoError)
//!
//! # Example
//!
//! ```
//! use xavyo_core::{ActingPrincipal, EntityId, XavyoError, Result};
//!
//! let principal = ActingPrincipal::system("reconciliation");
//! let entity_id = EntityId::new();
//! assert!(!entity_id.is_nil());
//!
//! fn example() -> Result<()> {
//!     Err(XavyoError::Unauthorized { message: None })
//! }
//! assert!(example().is_err());
//! # let _ = principal;
//! ```

pub mod error;
pub mod ids;
pub mod principal;

// Re-export main types for convenient access
pub use error::{Result, XavyoError};
pub use ids::{EntityId, ExecutionId, ParseIdError, TaskId};
pub use principal::ActingPrincipal;
