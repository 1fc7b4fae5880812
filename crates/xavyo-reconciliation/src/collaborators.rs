//! External collaborators of the reconciliation engine.
//!
//! The engine owns correlation, conflict resolution and dispatch. Durable
//! state lives behind these traits: the repository (reads and search), the
//! workflow (local mutations), propagation (outbound pushes), the resource
//! store (configuration and sync tokens) and the connector provider.
//!
//! Mutating collaborators receive the [`ActingPrincipal`] explicitly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use xavyo_connector::change::{ObjectClass, SyncToken};
use xavyo_connector::error::ConnectorResult;
use xavyo_connector::operation::AttributeValue;
use xavyo_connector::traits::Connector;
use xavyo_core::{ActingPrincipal, EntityId, Result as XavyoResult};

use crate::config::ResourceConfig;
use crate::entity::{EntityDraft, EntityKind, EntityPatch, LocalEntity};
use crate::search::SearchCond;

/// Read access to local entities.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Load an entity. `Ok(None)` when it does not exist.
    async fn find_by_id(&self, kind: &EntityKind, id: EntityId)
        -> XavyoResult<Option<LocalEntity>>;

    /// Find an entity by its natural key (username or name).
    async fn find_by_name(&self, kind: &EntityKind, name: &str) -> XavyoResult<Option<EntityId>>;

    /// Find entities whose plain attribute equals the value.
    async fn find_by_attribute_value(
        &self,
        kind: &EntityKind,
        schema: &str,
        value: &AttributeValue,
    ) -> XavyoResult<Vec<EntityId>>;

    /// Find entities whose derived attribute equals the value.
    async fn find_by_derived_attribute_value(
        &self,
        kind: &EntityKind,
        schema: &str,
        value: &str,
    ) -> XavyoResult<Vec<EntityId>>;

    /// Run a search condition. Result order is the repository's.
    async fn search(&self, kind: &EntityKind, condition: &SearchCond)
        -> XavyoResult<Vec<EntityId>>;
}

/// Local mutations.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Create an entity, returning its id.
    async fn create(
        &self,
        principal: &ActingPrincipal,
        draft: &EntityDraft,
    ) -> XavyoResult<EntityId>;

    /// Apply a patch (attributes, links, status), returning the entity id.
    async fn update(
        &self,
        principal: &ActingPrincipal,
        patch: &EntityPatch,
    ) -> XavyoResult<EntityId>;

    /// Delete an entity.
    async fn delete(
        &self,
        principal: &ActingPrincipal,
        kind: &EntityKind,
        id: EntityId,
    ) -> XavyoResult<()>;
}

/// Where and how a propagation is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationTarget {
    /// Resource to push to.
    pub resource: String,
    /// Execute synchronously (`true`) or leave it to background execution.
    pub priority: bool,
}

/// Outcome of a propagation for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationOutcome {
    /// Pushed successfully.
    Success,
    /// Queued for background execution.
    Queued,
    /// Push failed.
    Failure,
    /// Nothing to do on this resource.
    NotAttempted,
}

/// Per-resource propagation status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationStatus {
    /// Resource name.
    pub resource: String,
    /// Outcome.
    pub outcome: PropagationOutcome,
    /// Failure detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PropagationStatus {
    /// Successful propagation.
    pub fn success(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            outcome: PropagationOutcome::Success,
            message: None,
        }
    }

    /// Failed propagation.
    pub fn failure(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            outcome: PropagationOutcome::Failure,
            message: Some(message.into()),
        }
    }

    /// Check if failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome == PropagationOutcome::Failure
    }
}

/// Outbound propagation of local changes.
///
/// Failures are reported through the returned status, never as errors.
#[async_trait]
pub trait Propagation: Send + Sync {
    /// Push a newly created entity.
    async fn propagate_create(
        &self,
        principal: &ActingPrincipal,
        kind: &EntityKind,
        id: EntityId,
        target: &PropagationTarget,
    ) -> PropagationStatus;

    /// Push an updated entity.
    async fn propagate_update(
        &self,
        principal: &ActingPrincipal,
        kind: &EntityKind,
        id: EntityId,
        target: &PropagationTarget,
    ) -> PropagationStatus;

    /// Remove an entity from the resource.
    async fn propagate_delete(
        &self,
        principal: &ActingPrincipal,
        kind: &EntityKind,
        id: EntityId,
        target: &PropagationTarget,
    ) -> PropagationStatus;
}

/// Access to resource configuration and stored sync tokens.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Load a resource configuration by name.
    async fn load(&self, resource: &str) -> XavyoResult<ResourceConfig>;

    /// Persist the latest sync token of an object class.
    async fn save_sync_token(
        &self,
        resource: &str,
        object_class: &ObjectClass,
        token: &SyncToken,
    ) -> XavyoResult<()>;
}

/// Resolves the connector instance bound to a resource.
#[async_trait]
pub trait ConnectorProvider: Send + Sync {
    /// Get the connector for a resource.
    async fn connector_for(&self, resource: &ResourceConfig) -> ConnectorResult<Arc<dyn Connector>>;
}
