//! Action hooks.
//!
//! Hooks observe and optionally rewrite the work of a reconciliation run.
//! Before-phase methods receive the change record together with the proposed
//! local state and return the record the dispatcher should continue with.
//! Every hook sees the record as left by the previous one. The `after` and
//! `after_all` observers cannot influence results that were already produced.
//!
//! Every method has a no-op default, so a pipeline without hooks behaves
//! exactly like the bare dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use xavyo_connector::change::ChangeRecord;

use crate::entity::{EntityDraft, EntityPatch, LocalEntity};
use crate::error::DispatchError;
use crate::reconciliation::RunProfile;
use crate::result::SyncResult;

/// Hook execution errors.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook refused or failed to process the record.
    #[error("Hook '{hook}' failed: {message}")]
    Failed { hook: String, message: String },
}

impl HookError {
    /// Create a failure raised by the named hook.
    pub fn failed(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// Result type for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Lifecycle phase a hook is invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    BeforeAll,
    BeforeProvision,
    BeforeAssign,
    BeforeCreate,
    BeforeUpdate,
    BeforeLink,
    BeforeUnlink,
    BeforeUnassign,
    BeforeDeprovision,
    BeforeDelete,
    OnError,
    After,
    AfterAll,
}

impl HookPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::BeforeAll => "before_all",
            HookPhase::BeforeProvision => "before_provision",
            HookPhase::BeforeAssign => "before_assign",
            HookPhase::BeforeCreate => "before_create",
            HookPhase::BeforeUpdate => "before_update",
            HookPhase::BeforeLink => "before_link",
            HookPhase::BeforeUnlink => "before_unlink",
            HookPhase::BeforeUnassign => "before_unassign",
            HookPhase::BeforeDeprovision => "before_deprovision",
            HookPhase::BeforeDelete => "before_delete",
            HookPhase::OnError => "on_error",
            HookPhase::After => "after",
            HookPhase::AfterAll => "after_all",
        }
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How to handle hook errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookCriticality {
    /// Hook failure is fatal - abort the operation.
    #[default]
    Fatal,
    /// Hook failure is logged and the record continues unchanged.
    Ignore,
}

/// What a hook wants done with a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorDisposition {
    /// Keep the failure.
    #[default]
    Fail,
    /// Record the operation as ignored instead of failed.
    Ignore,
}

/// A pluggable reconciliation observer.
#[allow(unused_variables)]
#[async_trait]
pub trait ActionHook: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Once per run, before any record is streamed.
    async fn before_all(&self, profile: &RunProfile) -> HookResult<()> {
        Ok(())
    }

    /// Before creating an entity under the provision rule.
    async fn before_provision(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before creating an entity under the assign rule.
    async fn before_assign(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before any entity creation, after the rule-specific phase.
    async fn before_create(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before updating a matched entity.
    async fn before_update(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        patch: &EntityPatch,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before linking a matched entity to the resource.
    async fn before_link(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before unlinking a matched entity from the resource.
    async fn before_unlink(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before removing the resource assignment of a matched entity.
    async fn before_unassign(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before removing a matched entity from the resource.
    async fn before_deprovision(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// Before deleting a local entity.
    async fn before_delete(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        Ok(record)
    }

    /// When an operation failed. Returning `Ignore` downgrades the failure.
    async fn on_error(
        &self,
        profile: &RunProfile,
        record: &ChangeRecord,
        result: &SyncResult,
        error: &DispatchError,
    ) -> ErrorDisposition {
        ErrorDisposition::Fail
    }

    /// After every produced result. `entity` is the local state before the
    /// operation, absent for creations.
    async fn after(
        &self,
        profile: &RunProfile,
        record: &ChangeRecord,
        entity: Option<&LocalEntity>,
        result: &SyncResult,
    ) {
    }

    /// Once per run, with every result of the run.
    async fn after_all(&self, profile: &RunProfile, results: &[SyncResult]) -> HookResult<()> {
        Ok(())
    }
}

struct RegisteredHook {
    hook: Arc<dyn ActionHook>,
    criticality: HookCriticality,
}

/// Ordered hooks of a run, composed sequentially.
#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<RegisteredHook>,
}

impl std::fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.hook.name()))
            .finish()
    }
}

impl Clone for HookPipeline {
    fn clone(&self) -> Self {
        Self {
            hooks: self
                .hooks
                .iter()
                .map(|h| RegisteredHook {
                    hook: Arc::clone(&h.hook),
                    criticality: h.criticality,
                })
                .collect(),
        }
    }
}

macro_rules! fold_before {
    ($self:ident, $phase:expr, $method:ident, $profile:ident, $record:ident, $proposed:ident) => {{
        let mut record = $record;
        for registered in &$self.hooks {
            match registered
                .hook
                .$method($profile, record.clone(), $proposed)
                .await
            {
                Ok(next) => record = next,
                Err(e) => $self.on_failure(registered, $phase, e)?,
            }
        }
        Ok(record)
    }};
}

impl HookPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fatal hook.
    #[must_use]
    pub fn with_hook(self, hook: Arc<dyn ActionHook>) -> Self {
        self.with_hook_criticality(hook, HookCriticality::Fatal)
    }

    /// Append a hook with explicit failure handling.
    #[must_use]
    pub fn with_hook_criticality(
        mut self,
        hook: Arc<dyn ActionHook>,
        criticality: HookCriticality,
    ) -> Self {
        self.hooks.push(RegisteredHook { hook, criticality });
        self
    }

    /// Number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    fn on_failure(
        &self,
        registered: &RegisteredHook,
        phase: HookPhase,
        error: HookError,
    ) -> HookResult<()> {
        match registered.criticality {
            HookCriticality::Fatal => Err(error),
            HookCriticality::Ignore => {
                warn!(
                    hook = %registered.hook.name(),
                    phase = %phase,
                    error = %error,
                    "Ignoring action hook failure"
                );
                Ok(())
            }
        }
    }

    /// Run every hook's `before_all` in registration order.
    ///
    /// A fatal hook failure aborts the run before any record is read.
    pub async fn before_all(&self, profile: &RunProfile) -> HookResult<()> {
        for registered in &self.hooks {
            if let Err(e) = registered.hook.before_all(profile).await {
                self.on_failure(registered, HookPhase::BeforeAll, e)?;
            }
        }
        Ok(())
    }

    /// Fold the record through every hook before an unmatched record is
    /// provisioned.
    ///
    /// Each hook receives the record returned by the previous one. The draft
    /// is built from the record as read from the connector.
    pub async fn before_provision(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeProvision, before_provision, profile, record, draft)
    }

    /// Same as [`Self::before_provision`], for the `Assign` unmatching rule.
    pub async fn before_assign(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeAssign, before_assign, profile, record, draft)
    }

    /// Fold the record through every hook right before an entity is created.
    ///
    /// `draft` reflects the record after the provision or assign phase.
    pub async fn before_create(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeCreate, before_create, profile, record, draft)
    }

    /// Fold the record through every hook before `patch` is applied.
    pub async fn before_update(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        patch: &EntityPatch,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeUpdate, before_update, profile, record, patch)
    }

    /// Fold the record through every hook before `entity` is linked.
    pub async fn before_link(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeLink, before_link, profile, record, entity)
    }

    /// Fold the record through every hook before `entity` loses its link to
    /// the resource.
    pub async fn before_unlink(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeUnlink, before_unlink, profile, record, entity)
    }

    /// Fold the record through every hook before `entity` is unlinked and
    /// deleted from the resource.
    pub async fn before_unassign(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeUnassign, before_unassign, profile, record, entity)
    }

    /// Fold the record through every hook before the deletion of `entity` is
    /// pushed to the resource. The link is kept.
    pub async fn before_deprovision(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeDeprovision, before_deprovision, profile, record, entity)
    }

    /// Fold the record through every hook before `entity` is deleted.
    pub async fn before_delete(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        fold_before!(self, HookPhase::BeforeDelete, before_delete, profile, record, entity)
    }

    /// Ask every hook about a failure. Any `Ignore` wins.
    pub async fn on_error(
        &self,
        profile: &RunProfile,
        record: &ChangeRecord,
        result: &SyncResult,
        error: &DispatchError,
    ) -> ErrorDisposition {
        let mut disposition = ErrorDisposition::Fail;
        for registered in &self.hooks {
            if registered.hook.on_error(profile, record, result, error).await
                == ErrorDisposition::Ignore
            {
                debug!(hook = %registered.hook.name(), "Action hook ignores the failure");
                disposition = ErrorDisposition::Ignore;
            }
        }
        disposition
    }

    /// Notify every hook of a record outcome. Hooks cannot fail here.
    pub async fn after(
        &self,
        profile: &RunProfile,
        record: &ChangeRecord,
        entity: Option<&LocalEntity>,
        result: &SyncResult,
    ) {
        for registered in &self.hooks {
            registered.hook.after(profile, record, entity, result).await;
        }
    }

    /// Run every hook's `after_all` with the results of the whole run.
    pub async fn after_all(&self, profile: &RunProfile, results: &[SyncResult]) -> HookResult<()> {
        for registered in &self.hooks {
            if let Err(e) = registered.hook.after_all(profile, results).await {
                self.on_failure(registered, HookPhase::AfterAll, e)?;
            }
        }
        Ok(())
    }
}
