//! Correlation of external change records with local entities.
//!
//! Exactly one [`CorrelationPolicy`] applies per kind binding, with
//! precedence rule > alternate search schemas > account id. Matches are
//! returned in the order the repository produced them.
//!
//! Deleted objects usually arrive with nothing but their uid, so DELETE
//! records bound to alternate search schemas are correlated on the account
//! id instead.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use xavyo_connector::change::{ChangeRecord, ChangeType};
use xavyo_connector::mapping::MappingTarget;
use xavyo_connector::operation::AttributeValue;
use xavyo_core::EntityId;

use crate::binding::KindBinding;
use crate::collaborators::Repository;
use crate::entity::EntityKind;
use crate::error::CorrelationError;
use crate::search::SearchCond;

/// A pluggable rule building a search condition from a change record.
pub trait CorrelationRule: Send + Sync {
    /// Rule name, as referenced by resource configuration.
    fn name(&self) -> &str;

    /// Build the search condition for a record.
    fn search_condition(&self, record: &ChangeRecord) -> Result<SearchCond, CorrelationError>;
}

/// Registered correlation rules by name.
#[derive(Clone, Default)]
pub struct CorrelationRuleRegistry {
    rules: HashMap<String, Arc<dyn CorrelationRule>>,
}

impl CorrelationRuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under its own name, replacing any previous one.
    pub fn register(&mut self, rule: Arc<dyn CorrelationRule>) {
        self.rules.insert(rule.name().to_string(), rule);
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with_rule(mut self, rule: Arc<dyn CorrelationRule>) -> Self {
        self.register(rule);
        self
    }

    /// Look up a rule.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn CorrelationRule>> {
        self.rules.get(name).cloned()
    }
}

impl std::fmt::Debug for CorrelationRuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.rules.keys()).finish()
    }
}

/// How records of one kind are correlated.
#[derive(Clone)]
pub enum CorrelationPolicy {
    /// A named rule builds the search condition.
    Rule(Arc<dyn CorrelationRule>),
    /// AND of equality conditions on these internal schemas.
    AlternateSchemas(Vec<String>),
    /// Lookup through the account id mapping item.
    AccountId,
}

impl std::fmt::Debug for CorrelationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationPolicy::Rule(rule) => f.debug_tuple("Rule").field(&rule.name()).finish(),
            CorrelationPolicy::AlternateSchemas(schemas) => {
                f.debug_tuple("AlternateSchemas").field(schemas).finish()
            }
            CorrelationPolicy::AccountId => f.write_str("AccountId"),
        }
    }
}

impl CorrelationPolicy {
    /// Pick the policy from configuration. A rule name that is not
    /// registered is logged and the next policy applies.
    pub fn select(
        rule: Option<&str>,
        alternate_schemas: &[String],
        registry: &CorrelationRuleRegistry,
    ) -> Self {
        if let Some(name) = rule {
            match registry.get(name) {
                Some(rule) => return CorrelationPolicy::Rule(rule),
                None => warn!(rule = %name, "Correlation rule not registered, ignoring it"),
            }
        }
        if alternate_schemas.is_empty() {
            CorrelationPolicy::AccountId
        } else {
            CorrelationPolicy::AlternateSchemas(alternate_schemas.to_vec())
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CorrelationPolicy::Rule(_) => "rule",
            CorrelationPolicy::AlternateSchemas(_) => "alternate_schemas",
            CorrelationPolicy::AccountId => "account_id",
        }
    }
}

/// Build the AND-of-equality condition for alternate search schemas.
///
/// For each schema the external value comes from the mapping items targeting
/// it; when several items target the same schema the last one with a value
/// wins. Missing, empty or null values become `IS NULL`. Identity schemas
/// (id, username, name) search the identity field directly.
#[must_use]
pub fn alternate_schema_condition(
    record: &ChangeRecord,
    binding: &KindBinding,
    schemas: &[String],
) -> SearchCond {
    let children = schemas
        .iter()
        .map(|schema| {
            let value = binding
                .mapping()
                .items_for_internal(schema)
                .filter_map(|item| {
                    record
                        .attributes()
                        .comparison_string(&item.external_attribute)
                })
                .last();

            match (EntityKind::is_identity_field(schema), value) {
                (true, Some(v)) => SearchCond::identity_eq(schema.as_str(), v),
                (true, None) => SearchCond::identity_is_null(schema.as_str()),
                (false, Some(v)) => SearchCond::attribute_eq(schema.as_str(), v),
                (false, None) => SearchCond::attribute_is_null(schema.as_str()),
            }
        })
        .collect();
    SearchCond::and(children)
}

/// Finds local entities corresponding to external change records.
#[derive(Clone)]
pub struct CorrelationEngine {
    repository: Arc<dyn Repository>,
}

impl CorrelationEngine {
    /// Create an engine over a repository.
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Find the local entities matching a record.
    #[instrument(skip(self, record, binding), fields(
        uid = %record.correlation_uid(),
        kind = %binding.kind(),
        policy = binding.correlation().label(),
    ))]
    pub async fn find_matches(
        &self,
        record: &ChangeRecord,
        binding: &KindBinding,
    ) -> Result<Vec<EntityId>, CorrelationError> {
        let matches = match binding.correlation() {
            CorrelationPolicy::Rule(rule) => {
                let condition = rule.search_condition(record)?;
                self.search(binding.kind(), &condition).await?
            }
            CorrelationPolicy::AlternateSchemas(_) if record.change_type() == ChangeType::Delete => {
                self.find_by_account_id(record, binding).await?
            }
            CorrelationPolicy::AlternateSchemas(schemas) => {
                let condition = alternate_schema_condition(record, binding, schemas);
                self.search(binding.kind(), &condition).await?
            }
            CorrelationPolicy::AccountId => self.find_by_account_id(record, binding).await?,
        };

        debug!(matches = matches.len(), "Correlation finished");
        Ok(matches)
    }

    async fn search(
        &self,
        kind: &EntityKind,
        condition: &SearchCond,
    ) -> Result<Vec<EntityId>, CorrelationError> {
        if !condition.is_valid() {
            return Err(CorrelationError::InvalidCondition {
                condition: condition.to_string(),
            });
        }
        debug!(condition = %condition, "Searching local entities");
        Ok(self.repository.search(kind, condition).await?)
    }

    async fn find_by_account_id(
        &self,
        record: &ChangeRecord,
        binding: &KindBinding,
    ) -> Result<Vec<EntityId>, CorrelationError> {
        let uid = record.correlation_uid();
        let item = binding.account_id_item();
        let kind = binding.kind();

        match item.target {
            MappingTarget::PlainSchema => {
                let data_type = binding.schema_type(&item.internal_attribute);
                let value = data_type.parse_value(uid).unwrap_or_else(|e| {
                    warn!(
                        uid = %uid,
                        schema = %item.internal_attribute,
                        error = %e,
                        "Account id does not parse as schema type, using it as text"
                    );
                    AttributeValue::String(uid.to_string())
                });
                Ok(self
                    .repository
                    .find_by_attribute_value(kind, &item.internal_attribute, &value)
                    .await?)
            }
            MappingTarget::DerivedSchema => Ok(self
                .repository
                .find_by_derived_attribute_value(kind, &item.internal_attribute, uid)
                .await?),
            MappingTarget::Name => Ok(self
                .repository
                .find_by_name(kind, uid)
                .await?
                .into_iter()
                .collect()),
            MappingTarget::Id => {
                let Ok(id) = uid.parse::<EntityId>() else {
                    debug!(uid = %uid, "Account id is not an entity id, no match");
                    return Ok(Vec::new());
                };
                Ok(self
                    .repository
                    .find_by_id(kind, id)
                    .await?
                    .map(|entity| entity.id)
                    .into_iter()
                    .collect())
            }
        }
    }
}
