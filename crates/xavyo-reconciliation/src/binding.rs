//! Validated per-kind view of a resource configuration.

use xavyo_connector::change::ObjectClass;
use xavyo_connector::mapping::{Mapping, MappingItem};
use xavyo_connector::schema::AttributeDataType;

use crate::config::KindMapping;
use crate::correlation::{CorrelationPolicy, CorrelationRuleRegistry};
use crate::entity::EntityKind;
use crate::error::{ReconciliationError, ReconciliationResult};

/// Everything the run needs to reconcile one entity kind: its object class,
/// mapping, account id item and correlation policy.
#[derive(Debug, Clone)]
pub struct KindBinding {
    kind: EntityKind,
    object_class: ObjectClass,
    config: KindMapping,
    account_id: MappingItem,
    correlation: CorrelationPolicy,
}

impl KindBinding {
    /// Validate a kind mapping and resolve its correlation policy.
    ///
    /// A mapping without exactly one account id item is a fatal
    /// configuration error for the run.
    pub fn bind(
        resource: &str,
        kind_mapping: &KindMapping,
        rules: &CorrelationRuleRegistry,
    ) -> ReconciliationResult<Self> {
        let invalid = |source| ReconciliationError::InvalidMapping {
            kind: kind_mapping.kind.to_string(),
            resource: resource.to_string(),
            source,
        };

        kind_mapping.mapping.validate().map_err(invalid)?;
        let account_id = kind_mapping
            .mapping
            .account_id_item()
            .cloned()
            .ok_or_else(|| {
                invalid(xavyo_connector::error::ConnectorError::invalid_mapping(
                    "no account id item defined",
                ))
            })?;

        let correlation = CorrelationPolicy::select(
            kind_mapping.correlation_rule.as_deref(),
            &kind_mapping.alternate_search_schemas,
            rules,
        );

        Ok(Self {
            kind: kind_mapping.kind.clone(),
            object_class: kind_mapping.kind.object_class(),
            config: kind_mapping.clone(),
            account_id,
            correlation,
        })
    }

    #[must_use]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    #[must_use]
    pub fn object_class(&self) -> &ObjectClass {
        &self.object_class
    }

    #[must_use]
    pub fn mapping(&self) -> &Mapping {
        &self.config.mapping
    }

    #[must_use]
    pub fn account_id_item(&self) -> &MappingItem {
        &self.account_id
    }

    #[must_use]
    pub fn correlation(&self) -> &CorrelationPolicy {
        &self.correlation
    }

    /// Declared data type of an internal attribute.
    #[must_use]
    pub fn schema_type(&self, name: &str) -> AttributeDataType {
        self.config.schema_type(name)
    }
}
