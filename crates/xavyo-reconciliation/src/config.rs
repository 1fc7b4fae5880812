//! Reconciliation configuration.
//!
//! Three layers, all plain serde structs with defaults:
//! - [`ResourceConfig`]: per external resource (mappings, trace level,
//!   stored sync tokens). Owned by the resource store, read-only here.
//! - [`ReconciliationTask`]: what one task is allowed to do.
//! - [`EngineConfig`]: engine-wide defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use xavyo_connector::change::{ObjectClass, SyncToken};
use xavyo_connector::mapping::Mapping;
use xavyo_connector::schema::{AttributeDataType, SchemaAttribute};
use xavyo_core::TaskId;

use crate::conflict::ConflictResolutionAction;
use crate::entity::EntityKind;
use crate::reconciliation::report::TraceLevel;

/// What to do with an external object matching existing entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingRule {
    /// Update the entity from the external attributes.
    #[default]
    Update,
    /// Remove the object from the resource, keep the entity and its link.
    Deprovision,
    /// Remove the resource assignment and the object from the resource.
    Unassign,
    /// Link the entity to the resource without pushing anything.
    Link,
    /// Unlink the entity from the resource without pushing anything.
    Unlink,
    /// Do nothing.
    Ignore,
}

impl MatchingRule {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingRule::Update => "update",
            MatchingRule::Deprovision => "deprovision",
            MatchingRule::Unassign => "unassign",
            MatchingRule::Link => "link",
            MatchingRule::Unlink => "unlink",
            MatchingRule::Ignore => "ignore",
        }
    }
}

impl std::fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MatchingRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "update" => Ok(MatchingRule::Update),
            "deprovision" => Ok(MatchingRule::Deprovision),
            "unassign" => Ok(MatchingRule::Unassign),
            "link" => Ok(MatchingRule::Link),
            "unlink" => Ok(MatchingRule::Unlink),
            "ignore" => Ok(MatchingRule::Ignore),
            _ => Err(format!("Unknown matching rule: {s}")),
        }
    }
}

/// What to do with an external object matching no entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchingRule {
    /// Create the entity and push it to the resource.
    #[default]
    Provision,
    /// Create the entity with the resource assigned.
    Assign,
    /// Do nothing.
    Ignore,
}

impl UnmatchingRule {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmatchingRule::Provision => "provision",
            UnmatchingRule::Assign => "assign",
            UnmatchingRule::Ignore => "ignore",
        }
    }
}

impl std::fmt::Display for UnmatchingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UnmatchingRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "provision" => Ok(UnmatchingRule::Provision),
            "assign" => Ok(UnmatchingRule::Assign),
            "ignore" => Ok(UnmatchingRule::Ignore),
            _ => Err(format!("Unknown unmatching rule: {s}")),
        }
    }
}

/// Mapping and correlation settings of one entity kind on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindMapping {
    /// Entity kind.
    pub kind: EntityKind,

    /// Attribute mapping, including the account id item.
    pub mapping: Mapping,

    /// Name of a registered correlation rule. Takes precedence over
    /// `alternate_search_schemas`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_rule: Option<String>,

    /// Internal schemas used to build an AND-of-equality correlation search.
    #[serde(default)]
    pub alternate_search_schemas: Vec<String>,

    /// Internal attribute definitions used to parse external values.
    #[serde(default)]
    pub schemas: Vec<SchemaAttribute>,
}

impl KindMapping {
    /// Mapping with no correlation settings and no schema definitions.
    #[must_use]
    pub fn new(kind: EntityKind, mapping: Mapping) -> Self {
        Self {
            kind,
            mapping,
            correlation_rule: None,
            alternate_search_schemas: Vec::new(),
            schemas: Vec::new(),
        }
    }

    /// Builder-style correlation rule name.
    #[must_use]
    pub fn with_correlation_rule(mut self, rule: impl Into<String>) -> Self {
        self.correlation_rule = Some(rule.into());
        self
    }

    /// Builder-style alternate search schemas.
    #[must_use]
    pub fn with_alternate_search_schemas(mut self, schemas: Vec<String>) -> Self {
        self.alternate_search_schemas = schemas;
        self
    }

    /// Builder-style schema definition.
    #[must_use]
    pub fn with_schema(mut self, schema: SchemaAttribute) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Data type of an internal attribute; string when undeclared.
    #[must_use]
    pub fn schema_type(&self, name: &str) -> AttributeDataType {
        self.schemas
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.data_type)
            .unwrap_or_default()
    }
}

fn default_propagation_priority() -> bool {
    true
}

/// External resource configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource name.
    pub name: String,

    /// Verbosity of the run report.
    #[serde(default)]
    pub trace_level: TraceLevel,

    /// Mappings per entity kind.
    #[serde(default)]
    pub mappings: Vec<KindMapping>,

    /// Stored sync tokens by object class name.
    #[serde(default)]
    pub sync_tokens: HashMap<String, SyncToken>,

    /// Run propagation synchronously rather than in the background.
    #[serde(default = "default_propagation_priority")]
    pub propagation_priority: bool,
}

impl ResourceConfig {
    /// Resource with no mappings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trace_level: TraceLevel::default(),
            mappings: Vec::new(),
            sync_tokens: HashMap::new(),
            propagation_priority: default_propagation_priority(),
        }
    }

    /// Builder-style kind mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: KindMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Builder-style trace level.
    #[must_use]
    pub fn with_trace_level(mut self, trace_level: TraceLevel) -> Self {
        self.trace_level = trace_level;
        self
    }

    /// Builder-style stored token.
    #[must_use]
    pub fn with_sync_token(mut self, object_class: &ObjectClass, token: SyncToken) -> Self {
        self.sync_tokens
            .insert(object_class.as_str().to_string(), token);
        self
    }

    /// Stored token of an object class.
    #[must_use]
    pub fn sync_token(&self, object_class: &ObjectClass) -> Option<&SyncToken> {
        self.sync_tokens.get(object_class.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// A reconciliation task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationTask {
    /// Task id.
    #[serde(default)]
    pub id: TaskId,

    /// Resource name.
    pub resource: String,

    /// Scan everything instead of the delta since the stored token.
    #[serde(default)]
    pub full_reconciliation: bool,

    /// Allow creating entities.
    #[serde(default = "default_true")]
    pub perform_create: bool,

    /// Allow updating (and linking) entities.
    #[serde(default = "default_true")]
    pub perform_update: bool,

    /// Allow deleting (and deprovisioning) entities.
    #[serde(default = "default_true")]
    pub perform_delete: bool,

    /// Carry the external enabled flag onto users.
    #[serde(default)]
    pub sync_status: bool,

    /// Rule for matched objects.
    #[serde(default)]
    pub matching_rule: MatchingRule,

    /// Rule for unmatched objects.
    #[serde(default)]
    pub unmatching_rule: UnmatchingRule,

    /// Conflict policy; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<ConflictResolutionAction>,
}

impl ReconciliationTask {
    /// Incremental task with every operation enabled.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            resource: resource.into(),
            full_reconciliation: false,
            perform_create: true,
            perform_update: true,
            perform_delete: true,
            sync_status: false,
            matching_rule: MatchingRule::default(),
            unmatching_rule: UnmatchingRule::default(),
            conflict_resolution: None,
        }
    }

    /// Builder-style full reconciliation flag.
    #[must_use]
    pub fn full(mut self) -> Self {
        self.full_reconciliation = true;
        self
    }

    /// Builder-style conflict policy.
    #[must_use]
    pub fn with_conflict_resolution(mut self, action: ConflictResolutionAction) -> Self {
        self.conflict_resolution = Some(action);
        self
    }

    /// Validate the task.
    pub fn validate(&self) -> Result<(), String> {
        if self.resource.trim().is_empty() {
            return Err("resource must not be empty".to_string());
        }
        Ok(())
    }
}

fn default_conflict_resolution() -> ConflictResolutionAction {
    ConflictResolutionAction::Ignore
}

fn default_progress_log_interval() -> u64 {
    1000
}

fn default_principal_name() -> String {
    "reconciliation".to_string()
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Conflict policy for tasks that define none.
    #[serde(default = "default_conflict_resolution")]
    pub default_conflict_resolution: ConflictResolutionAction,

    /// Log progress every N records (0 disables progress logging).
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: u64,

    /// Name of the principal mutations are performed as.
    #[serde(default = "default_principal_name")]
    pub principal_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_conflict_resolution: default_conflict_resolution(),
            progress_log_interval: default_progress_log_interval(),
            principal_name: default_principal_name(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.principal_name.trim().is_empty() {
            return Err("principal_name must not be empty".to_string());
        }
        Ok(())
    }
}
