//! Change records delivered by connectors.
//!
//! A [`ChangeRecord`] is an immutable value. Code that needs a different
//! record (for example an action hook rewriting attributes) builds a new one
//! with the `with_*` methods, which consume the original.

use serde::{Deserialize, Serialize};

use crate::operation::{AttributeSet, AttributeValue};

/// Operational attribute carrying the enabled/disabled state of an account.
pub const ENABLE_ATTRIBUTE: &str = "__ENABLE__";

/// Operational attribute carrying the naming attribute of an object.
pub const NAME_ATTRIBUTE: &str = "__NAME__";

/// Operational attribute carrying the unique id of an object.
pub const UID_ATTRIBUTE: &str = "__UID__";

/// Kind of change reported by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The object exists in the external system (new or modified).
    CreateOrUpdate,
    /// The object was removed from the external system.
    Delete,
}

impl ChangeType {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::CreateOrUpdate => "create_or_update",
            ChangeType::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create_or_update" => Ok(ChangeType::CreateOrUpdate),
            "delete" => Ok(ChangeType::Delete),
            _ => Err(format!("Unknown change type: {s}")),
        }
    }
}

/// Object class of an external object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    /// Accounts (`__ACCOUNT__`).
    Principal,
    /// Groups (`__GROUP__`).
    Group,
    /// Any other object type, by native name.
    AnyObject(String),
}

impl ObjectClass {
    /// Native object class name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ObjectClass::Principal => "__ACCOUNT__",
            ObjectClass::Group => "__GROUP__",
            ObjectClass::AnyObject(name) => name,
        }
    }
}

impl std::fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ObjectClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "__ACCOUNT__" => Ok(ObjectClass::Principal),
            "__GROUP__" => Ok(ObjectClass::Group),
            "" => Err("Object class name must not be empty".to_string()),
            other => Ok(ObjectClass::AnyObject(other.to_string())),
        }
    }
}

/// Opaque cursor for incremental change retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncToken(String);

impl SyncToken {
    /// Wrap a connector-supplied token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SyncToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One change delivered by a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    change_type: ChangeType,
    uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_uid: Option<String>,
    object_class: ObjectClass,
    #[serde(default)]
    attributes: AttributeSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<SyncToken>,
}

impl ChangeRecord {
    /// Record for an object that exists in the external system.
    pub fn create_or_update(
        uid: impl Into<String>,
        object_class: ObjectClass,
        attributes: AttributeSet,
    ) -> Self {
        Self {
            change_type: ChangeType::CreateOrUpdate,
            uid: uid.into(),
            previous_uid: None,
            object_class,
            attributes,
            token: None,
        }
    }

    /// Record for an object removed from the external system.
    pub fn delete(uid: impl Into<String>, object_class: ObjectClass) -> Self {
        Self {
            change_type: ChangeType::Delete,
            uid: uid.into(),
            previous_uid: None,
            object_class,
            attributes: AttributeSet::new(),
            token: None,
        }
    }

    /// Record the uid the object had before a rename.
    #[must_use]
    pub fn with_previous_uid(mut self, previous_uid: impl Into<String>) -> Self {
        self.previous_uid = Some(previous_uid.into());
        self
    }

    /// Replace the whole attribute set.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set one single-valued attribute.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.set(name, value);
        self
    }

    /// Attach the token of the delta that produced this record.
    #[must_use]
    pub fn with_token(mut self, token: SyncToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Change type.
    #[must_use]
    pub fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Current external uid.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// External uid before a rename, if the connector reported one.
    #[must_use]
    pub fn previous_uid(&self) -> Option<&str> {
        self.previous_uid.as_deref()
    }

    /// The uid to correlate on: the previous uid when present, else the uid.
    #[must_use]
    pub fn correlation_uid(&self) -> &str {
        self.previous_uid.as_deref().unwrap_or(&self.uid)
    }

    /// Object class.
    #[must_use]
    pub fn object_class(&self) -> &ObjectClass {
        &self.object_class
    }

    /// External attributes.
    #[must_use]
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Token of the delta, if any.
    #[must_use]
    pub fn token(&self) -> Option<&SyncToken> {
        self.token.as_ref()
    }

    /// The enabled flag from the `__ENABLE__` operational attribute, if set.
    #[must_use]
    pub fn enabled(&self) -> Option<bool> {
        self.attributes
            .first(ENABLE_ATTRIBUTE)
            .and_then(AttributeValue::as_boolean)
    }
}
