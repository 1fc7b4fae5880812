//! # Connector Framework
//!
//! Abstractions for pulling identity changes out of external systems.
//!
//! A connector streams [`ChangeRecord`]s for an object class, either as a
//! full snapshot or as the delta after a [`SyncToken`]. The records carry
//! multi-valued attributes that a [`Mapping`] relates to internal entity
//! attributes.
//!
//! ## Example
//!
//! ```
//! use xavyo_connector::prelude::*;
//!
//! let record = ChangeRecord::create_or_update(
//!     "jdoe",
//!     ObjectClass::Principal,
//!     AttributeSet::new().with("mail", "jdoe@example.com"),
//! );
//! assert_eq!(record.change_type(), ChangeType::CreateOrUpdate);
//!
//! let mapping = Mapping::new(vec![
//!     MappingItem::new("username", "uid", MappingTarget::Name).as_account_id(),
//! ]);
//! assert!(mapping.validate().is_ok());
//! ```
//!
//! ## Crate Organization
//!
//! - [`change`] - Change records, object classes and sync tokens
//! - [`operation`] - Attribute values and sets
//! - [`mapping`] - Resource mapping items and the account-id item
//! - [`schema`] - Internal attribute data types and value parsing
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - The `Connector` and `ChangeHandler` traits

pub mod change;
pub mod error;
pub mod mapping;
pub mod operation;
pub mod schema;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use xavyo_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::change::{
        ChangeRecord, ChangeType, ObjectClass, SyncToken, ENABLE_ATTRIBUTE, NAME_ATTRIBUTE,
        UID_ATTRIBUTE,
    };
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::mapping::{Mapping, MappingItem, MappingTarget};
    pub use crate::operation::{AttributeSet, AttributeValue};
    pub use crate::schema::{AttributeDataType, SchemaAttribute};
    pub use crate::traits::{ChangeHandler, Connector};
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
