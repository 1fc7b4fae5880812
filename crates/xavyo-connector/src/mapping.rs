//! Attribute mapping between external objects and internal entities.
//!
//! A [`Mapping`] belongs to the external-resource configuration and is
//! read-only for the reconciliation engine. Exactly one item is flagged as the
//! account id: it tells the engine how the external unique id maps onto an
//! internal attribute.

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Kind of internal attribute a mapping item targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingTarget {
    /// A plain (stored) schema attribute.
    PlainSchema,
    /// A derived (computed) schema attribute.
    DerivedSchema,
    /// The natural name of the entity: username for users, name for groups.
    Name,
    /// The internal identifier of the entity.
    Id,
}

impl MappingTarget {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingTarget::PlainSchema => "plain_schema",
            MappingTarget::DerivedSchema => "derived_schema",
            MappingTarget::Name => "name",
            MappingTarget::Id => "id",
        }
    }
}

impl std::fmt::Display for MappingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MappingTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain_schema" => Ok(MappingTarget::PlainSchema),
            "derived_schema" => Ok(MappingTarget::DerivedSchema),
            "name" | "username" | "group_name" => Ok(MappingTarget::Name),
            "id" | "user_id" | "group_id" => Ok(MappingTarget::Id),
            _ => Err(format!("Unknown mapping target: {s}")),
        }
    }
}

/// A single attribute mapping item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingItem {
    /// Internal attribute (schema) name.
    pub internal_attribute: String,

    /// External attribute name on the connector object.
    pub external_attribute: String,

    /// What the internal attribute is.
    pub target: MappingTarget,

    /// Whether this item maps the external unique id.
    #[serde(default)]
    pub account_id: bool,
}

impl MappingItem {
    /// Create a mapping item.
    pub fn new(
        internal_attribute: impl Into<String>,
        external_attribute: impl Into<String>,
        target: MappingTarget,
    ) -> Self {
        Self {
            internal_attribute: internal_attribute.into(),
            external_attribute: external_attribute.into(),
            target,
            account_id: false,
        }
    }

    /// Flag this item as the account id.
    #[must_use]
    pub fn as_account_id(mut self) -> Self {
        self.account_id = true;
        self
    }
}

/// Mapping for one entity kind on one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Mapping items.
    #[serde(default)]
    pub items: Vec<MappingItem>,
}

impl Mapping {
    /// Create a mapping from items.
    #[must_use]
    pub fn new(items: Vec<MappingItem>) -> Self {
        Self { items }
    }

    /// Builder-style item append.
    #[must_use]
    pub fn with_item(mut self, item: MappingItem) -> Self {
        self.items.push(item);
        self
    }

    /// The item mapping the external unique id, if any.
    #[must_use]
    pub fn account_id_item(&self) -> Option<&MappingItem> {
        self.items.iter().find(|item| item.account_id)
    }

    /// Items targeting the given internal attribute.
    pub fn items_for_internal<'a>(
        &'a self,
        internal_attribute: &'a str,
    ) -> impl Iterator<Item = &'a MappingItem> + 'a {
        self.items
            .iter()
            .filter(move |item| item.internal_attribute == internal_attribute)
    }

    /// Check that exactly one account-id item exists.
    pub fn validate(&self) -> ConnectorResult<()> {
        match self.items.iter().filter(|item| item.account_id).count() {
            0 => Err(ConnectorError::invalid_mapping("no account id item defined")),
            1 => Ok(()),
            n => Err(ConnectorError::invalid_mapping(format!(
                "{n} account id items defined, expected exactly one"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_mapping() -> Mapping {
        Mapping::new(vec![
            MappingItem::new("username", "uid", MappingTarget::Name).as_account_id(),
            MappingItem::new("email", "mail", MappingTarget::PlainSchema),
            MappingItem::new("email", "mailAlternate", MappingTarget::PlainSchema),
        ])
    }

    #[test]
    fn test_account_id_item() {
        let mapping = user_mapping();
        let item = mapping.account_id_item().unwrap();
        assert_eq!(item.external_attribute, "uid");
        assert_eq!(item.target, MappingTarget::Name);
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_items_for_internal() {
        let mapping = user_mapping();
        let externals: Vec<_> = mapping
            .items_for_internal("email")
            .map(|i| i.external_attribute.as_str())
            .collect();
        assert_eq!(externals, vec!["mail", "mailAlternate"]);
    }

    #[test]
    fn test_validate_rejects_missing_or_duplicate_account_id() {
        let missing = Mapping::new(vec![MappingItem::new(
            "email",
            "mail",
            MappingTarget::PlainSchema,
        )]);
        assert!(matches!(
            missing.validate(),
            Err(ConnectorError::InvalidMapping { .. })
        ));

        let duplicate = user_mapping()
            .with_item(MappingItem::new("id", "employeeNumber", MappingTarget::Id).as_account_id());
        assert!(duplicate.validate().is_err());
    }

    #[test]
    fn test_mapping_target_parse() {
        assert_eq!("username".parse::<MappingTarget>().unwrap(), MappingTarget::Name);
        assert_eq!("GROUP_ID".parse::<MappingTarget>().unwrap(), MappingTarget::Id);
        assert!("virtual".parse::<MappingTarget>().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"items":[{"internal_attribute":"username","external_attribute":"uid","target":"name"}]}"#;
        let mapping: Mapping = serde_json::from_str(json).unwrap();
        assert!(!mapping.items[0].account_id);
        assert!(mapping.account_id_item().is_none());
    }
}
