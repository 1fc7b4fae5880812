//! Internal schema types.
//!
//! Describes the data type of an internal attribute so raw external values
//! (most notably the account uid) can be parsed before they are compared
//! with stored attribute values.

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};
use crate::operation::AttributeValue;

/// Data type for schema attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeDataType {
    /// String/text value.
    #[default]
    String,
    /// Long integer value.
    Long,
    /// Decimal/float value.
    Double,
    /// Boolean value.
    Boolean,
    /// Date/time value (RFC 3339).
    Date,
    /// UUID value.
    Uuid,
    /// One of a fixed set of strings.
    Enum,
}

impl AttributeDataType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeDataType::String => "string",
            AttributeDataType::Long => "long",
            AttributeDataType::Double => "double",
            AttributeDataType::Boolean => "boolean",
            AttributeDataType::Date => "date",
            AttributeDataType::Uuid => "uuid",
            AttributeDataType::Enum => "enum",
        }
    }

    /// Parse from string.
    #[must_use]
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "string" | "text" => Some(AttributeDataType::String),
            "long" | "integer" | "int" => Some(AttributeDataType::Long),
            "double" | "decimal" | "float" => Some(AttributeDataType::Double),
            "boolean" | "bool" => Some(AttributeDataType::Boolean),
            "date" | "datetime" => Some(AttributeDataType::Date),
            "uuid" | "guid" => Some(AttributeDataType::Uuid),
            "enum" => Some(AttributeDataType::Enum),
            _ => None,
        }
    }

    /// Parse a raw string into a typed value of this data type.
    pub fn parse_value(&self, raw: &str) -> ConnectorResult<AttributeValue> {
        let invalid = |detail: String| {
            ConnectorError::invalid_data(format!(
                "'{raw}' is not a valid {} value: {detail}",
                self.as_str()
            ))
        };

        match self {
            AttributeDataType::String | AttributeDataType::Enum => {
                Ok(AttributeValue::String(raw.to_string()))
            }
            AttributeDataType::Long => raw
                .trim()
                .parse::<i64>()
                .map(AttributeValue::Integer)
                .map_err(|e| invalid(e.to_string())),
            AttributeDataType::Double => raw
                .trim()
                .parse::<f64>()
                .map(AttributeValue::Float)
                .map_err(|e| invalid(e.to_string())),
            AttributeDataType::Boolean => raw
                .trim()
                .to_lowercase()
                .parse::<bool>()
                .map(AttributeValue::Boolean)
                .map_err(|e| invalid(e.to_string())),
            AttributeDataType::Date => chrono::DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| {
                    AttributeValue::String(dt.with_timezone(&chrono::Utc).to_rfc3339())
                })
                .map_err(|e| invalid(e.to_string())),
            AttributeDataType::Uuid => uuid::Uuid::parse_str(raw.trim())
                .map(|u| AttributeValue::String(u.to_string()))
                .map_err(|e| invalid(e.to_string())),
        }
    }
}

impl std::fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An internal attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaAttribute {
    /// Attribute name.
    pub name: String,

    /// Data type of the values.
    #[serde(default)]
    pub data_type: AttributeDataType,

    /// Whether this attribute can have multiple values.
    #[serde(default)]
    pub multi_valued: bool,
}

impl SchemaAttribute {
    /// Create a single-valued attribute definition.
    pub fn new(name: impl Into<String>, data_type: AttributeDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            multi_valued: false,
        }
    }

    /// Mark this attribute as multi-valued.
    #[must_use]
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }
}
