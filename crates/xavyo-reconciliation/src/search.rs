//! Search conditions handed to the repository search collaborator.

use serde::{Deserialize, Serialize};

use crate::entity::LocalEntity;

/// Comparison applied by a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CondType {
    /// Equal to the expression.
    Eq,
    /// No value.
    IsNull,
}

/// Leaf condition on one field or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCond {
    /// Schema (attribute) or identity field name.
    pub schema: String,
    /// Comparison.
    pub cond_type: CondType,
    /// Expected value; required for `Eq`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// A search condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchCond {
    /// Condition on the generic attribute store.
    Attribute(AttributeCond),
    /// Condition on an identity field (id, username, name).
    Identity(AttributeCond),
    /// All children must hold.
    And { children: Vec<SearchCond> },
    /// At least one child must hold.
    Or { children: Vec<SearchCond> },
}

impl SearchCond {
    /// `schema == value` on the attribute store.
    pub fn attribute_eq(schema: impl Into<String>, value: impl Into<String>) -> Self {
        SearchCond::Attribute(AttributeCond {
            schema: schema.into(),
            cond_type: CondType::Eq,
            expression: Some(value.into()),
        })
    }

    /// `schema IS NULL` on the attribute store.
    pub fn attribute_is_null(schema: impl Into<String>) -> Self {
        SearchCond::Attribute(AttributeCond {
            schema: schema.into(),
            cond_type: CondType::IsNull,
            expression: None,
        })
    }

    /// `field == value` on an identity field.
    pub fn identity_eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        SearchCond::Identity(AttributeCond {
            schema: field.into(),
            cond_type: CondType::Eq,
            expression: Some(value.into()),
        })
    }

    /// `field IS NULL` on an identity field.
    pub fn identity_is_null(field: impl Into<String>) -> Self {
        SearchCond::Identity(AttributeCond {
            schema: field.into(),
            cond_type: CondType::IsNull,
            expression: None,
        })
    }

    /// Conjunction of conditions. A single condition is returned unwrapped.
    #[must_use]
    pub fn and(mut children: Vec<SearchCond>) -> Self {
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return only;
            }
        }
        SearchCond::And { children }
    }

    /// Disjunction of conditions.
    #[must_use]
    pub fn or(children: Vec<SearchCond>) -> Self {
        SearchCond::Or { children }
    }

    /// Check the condition is well formed: named leaves, an expression on
    /// every `Eq`, and no empty conjunction or disjunction.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            SearchCond::Attribute(leaf) | SearchCond::Identity(leaf) => {
                !leaf.schema.trim().is_empty()
                    && (leaf.cond_type != CondType::Eq || leaf.expression.is_some())
            }
            SearchCond::And { children } | SearchCond::Or { children } => {
                !children.is_empty() && children.iter().all(SearchCond::is_valid)
            }
        }
    }

    /// Evaluate the condition against an entity.
    ///
    /// Identity leaves compare against the entity id or natural name;
    /// attribute leaves use the attribute's comparison string.
    #[must_use]
    pub fn matches(&self, entity: &LocalEntity) -> bool {
        match self {
            SearchCond::Identity(leaf) => {
                let actual = if leaf.schema.eq_ignore_ascii_case("id") {
                    Some(entity.id.to_string())
                } else {
                    Some(entity.name.clone())
                };
                leaf_matches(leaf, actual.as_deref())
            }
            SearchCond::Attribute(leaf) => {
                let actual = entity.attributes.comparison_string(&leaf.schema);
                leaf_matches(leaf, actual.as_deref())
            }
            SearchCond::And { children } => children.iter().all(|c| c.matches(entity)),
            SearchCond::Or { children } => children.iter().any(|c| c.matches(entity)),
        }
    }
}

fn leaf_matches(leaf: &AttributeCond, actual: Option<&str>) -> bool {
    match leaf.cond_type {
        CondType::IsNull => actual.is_none(),
        CondType::Eq => matches!((actual, leaf.expression.as_deref()), (Some(a), Some(e)) if a == e),
    }
}

impl std::fmt::Display for SearchCond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchCond::Attribute(leaf) | SearchCond::Identity(leaf) => match leaf.cond_type {
                CondType::IsNull => write!(f, "{} IS NULL", leaf.schema),
                CondType::Eq => write!(
                    f,
                    "{} == '{}'",
                    leaf.schema,
                    leaf.expression.as_deref().unwrap_or_default()
                ),
            },
            SearchCond::And { children } => write_joined(f, children, "AND"),
            SearchCond::Or { children } => write_joined(f, children, "OR"),
        }
    }
}

fn write_joined(
    f: &mut std::fmt::Formatter<'_>,
    children: &[SearchCond],
    op: &str,
) -> std::fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}
