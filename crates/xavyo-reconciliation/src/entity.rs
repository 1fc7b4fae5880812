//! Local entity model.
//!
//! [`EntityKind`] is the single seam for everything kind-specific: which
//! object class it reconciles against, which field is its natural key, and
//! whether it carries an activation status. Correlation and dispatch take
//! the kind as a parameter instead of branching on concrete types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use xavyo_connector::change::ObjectClass;
use xavyo_connector::operation::AttributeSet;
use xavyo_core::EntityId;

/// Kind of local entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A user (principal).
    User,
    /// A group.
    Group,
    /// A generic object of the given type.
    AnyObject(String),
}

impl EntityKind {
    /// Short lowercase label used in logs and event names.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::AnyObject(type_name) => type_name,
        }
    }

    /// Plural label used in reports.
    #[must_use]
    pub fn plural_label(&self) -> String {
        match self {
            EntityKind::User => "Users".to_string(),
            EntityKind::Group => "Groups".to_string(),
            EntityKind::AnyObject(type_name) => format!("{type_name} objects"),
        }
    }

    /// Object class this kind is reconciled against.
    #[must_use]
    pub fn object_class(&self) -> ObjectClass {
        match self {
            EntityKind::User => ObjectClass::Principal,
            EntityKind::Group => ObjectClass::Group,
            EntityKind::AnyObject(type_name) => ObjectClass::AnyObject(type_name.clone()),
        }
    }

    /// Kind reconciled against an object class.
    #[must_use]
    pub fn for_object_class(object_class: &ObjectClass) -> Self {
        match object_class {
            ObjectClass::Principal => EntityKind::User,
            ObjectClass::Group => EntityKind::Group,
            ObjectClass::AnyObject(type_name) => EntityKind::AnyObject(type_name.clone()),
        }
    }

    /// Field holding the natural key of this kind.
    #[must_use]
    pub fn name_field(&self) -> &'static str {
        match self {
            EntityKind::User => "username",
            EntityKind::Group | EntityKind::AnyObject(_) => "name",
        }
    }

    /// Whether a schema name refers to an identity field rather than the
    /// generic attribute store.
    #[must_use]
    pub fn is_identity_field(schema: &str) -> bool {
        ["id", "username", "name"]
            .iter()
            .any(|field| schema.eq_ignore_ascii_case(field))
    }

    /// Only users carry an activation status.
    #[must_use]
    pub fn supports_status(&self) -> bool {
        matches!(self, EntityKind::User)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Activation status of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Created but never activated.
    Created,
    /// Active.
    #[default]
    Active,
    /// Suspended.
    Suspended,
}

/// Status transition requested from the workflow collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    /// Created → Active.
    Activate,
    /// Suspended → Active.
    Reactivate,
    /// Active → Suspended.
    Suspend,
}

impl StatusChange {
    /// Transition needed to reach the external enabled flag, if any.
    #[must_use]
    pub fn towards(current: EntityStatus, enabled: bool) -> Option<Self> {
        match (current, enabled) {
            (EntityStatus::Created, true) => Some(StatusChange::Activate),
            (EntityStatus::Suspended, true) => Some(StatusChange::Reactivate),
            (EntityStatus::Created | EntityStatus::Active, false) => Some(StatusChange::Suspend),
            (EntityStatus::Active, true) | (EntityStatus::Suspended, false) => None,
        }
    }

    /// Status after the transition.
    #[must_use]
    pub fn resulting_status(&self) -> EntityStatus {
        match self {
            StatusChange::Activate | StatusChange::Reactivate => EntityStatus::Active,
            StatusChange::Suspend => EntityStatus::Suspended,
        }
    }
}

/// A local entity as stored by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalEntity {
    /// Identifier.
    pub id: EntityId,
    /// Kind.
    pub kind: EntityKind,
    /// Natural key (username or name).
    pub name: String,
    /// Plain attributes.
    #[serde(default)]
    pub attributes: AttributeSet,
    /// Resources this entity is linked to.
    #[serde(default)]
    pub resources: BTreeSet<String>,
    /// Activation status.
    #[serde(default)]
    pub status: EntityStatus,
}

impl LocalEntity {
    /// Create an active entity without attributes.
    pub fn new(id: EntityId, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            attributes: AttributeSet::new(),
            resources: BTreeSet::new(),
            status: EntityStatus::Active,
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }

    /// Materialize a draft into an entity with the given id.
    #[must_use]
    pub fn from_draft(id: EntityId, draft: &EntityDraft) -> Self {
        let status = match draft.enabled {
            Some(false) => EntityStatus::Suspended,
            _ => EntityStatus::Active,
        };
        Self {
            id,
            kind: draft.kind.clone(),
            name: draft.name.clone(),
            attributes: draft.attributes.clone(),
            resources: draft.resources.clone(),
            status,
        }
    }

    /// Apply a patch in place.
    pub fn apply(&mut self, patch: &EntityPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        for (attribute, values) in patch.replace.iter() {
            self.attributes.set_values(attribute.clone(), values.iter().cloned());
        }
        for attribute in &patch.remove {
            self.attributes.remove(attribute);
        }
        for resource in &patch.resources_to_add {
            self.resources.insert(resource.clone());
        }
        for resource in &patch.resources_to_remove {
            self.resources.remove(resource);
        }
        if let Some(change) = patch.status {
            self.status = change.resulting_status();
        }
    }
}

/// Proposed new entity built from external attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDraft {
    /// Kind.
    pub kind: EntityKind,
    /// Natural key.
    pub name: String,
    /// Mapped plain attributes.
    #[serde(default)]
    pub attributes: AttributeSet,
    /// Resources to assign on creation.
    #[serde(default)]
    pub resources: BTreeSet<String>,
    /// External enabled flag, when status synchronization is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Difference to apply to an existing entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    /// Target entity.
    pub id: EntityId,
    /// Kind of the target entity.
    pub kind: EntityKind,
    /// New natural key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Attributes whose values are replaced.
    #[serde(default)]
    pub replace: AttributeSet,
    /// Attributes removed.
    #[serde(default)]
    pub remove: Vec<String>,
    /// Resource links to add.
    #[serde(default)]
    pub resources_to_add: BTreeSet<String>,
    /// Resource links to remove.
    #[serde(default)]
    pub resources_to_remove: BTreeSet<String>,
    /// Status transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusChange>,
}

impl EntityPatch {
    /// Empty patch for an entity.
    #[must_use]
    pub fn for_entity(entity: &LocalEntity) -> Self {
        Self {
            id: entity.id,
            kind: entity.kind.clone(),
            name: None,
            replace: AttributeSet::new(),
            remove: Vec::new(),
            resources_to_add: BTreeSet::new(),
            resources_to_remove: BTreeSet::new(),
            status: None,
        }
    }

    /// Compute the patch turning `current` into what `desired` describes.
    ///
    /// Only attributes present in the draft are considered; attributes the
    /// mapping does not cover are left alone. A draft attribute with no
    /// values removes the attribute.
    #[must_use]
    pub fn diff(current: &LocalEntity, desired: &EntityDraft) -> Self {
        let mut patch = Self::for_entity(current);

        if current.name != desired.name {
            patch.name = Some(desired.name.clone());
        }

        for (attribute, values) in desired.attributes.iter() {
            let existing = current.attributes.get(attribute).unwrap_or_default();
            if values.is_empty() {
                if current.attributes.has(attribute) {
                    patch.remove.push(attribute.clone());
                }
            } else if existing != values.as_slice() {
                patch
                    .replace
                    .set_values(attribute.clone(), values.iter().cloned());
            }
        }

        for resource in desired.resources.difference(&current.resources) {
            patch.resources_to_add.insert(resource.clone());
        }

        if current.kind.supports_status() {
            if let Some(enabled) = desired.enabled {
                patch.status = StatusChange::towards(current.status, enabled);
            }
        }

        patch
    }

    /// Builder-style resource link.
    #[must_use]
    pub fn link(mut self, resource: impl Into<String>) -> Self {
        self.resources_to_add.insert(resource.into());
        self
    }

    /// Builder-style resource unlink.
    #[must_use]
    pub fn unlink(mut self, resource: impl Into<String>) -> Self {
        self.resources_to_remove.insert(resource.into());
        self
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.replace.is_empty()
            && self.remove.is_empty()
            && self.resources_to_add.is_empty()
            && self.resources_to_remove.is_empty()
            && self.status.is_none()
    }
}
