//! Operation dispatcher.
//!
//! Turns a correlated change record into local mutations. Each attempted
//! mutation yields exactly one [`SyncResult`]; workflow and hook errors are
//! captured in FAILURE results and never abort the run. In dry-run mode no
//! workflow or propagation call is made and creations report the nil id.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use xavyo_connector::change::{ChangeRecord, ChangeType};
use xavyo_core::{ActingPrincipal, EntityId};

use crate::binding::KindBinding;
use crate::collaborators::{
    Propagation, PropagationStatus, PropagationTarget, Repository, Workflow,
};
use crate::config::{MatchingRule, ReconciliationTask, UnmatchingRule};
use crate::entity::{EntityDraft, EntityKind, EntityPatch, LocalEntity};
use crate::error::DispatchError;
use crate::events::{EventSink, ReconciliationEvent, TracingEventSink};
use crate::hooks::ErrorDisposition;
use crate::mapper::EntityMapper;
use crate::reconciliation::RunProfile;
use crate::result::{ResourceOperation, SyncResult};

/// One attempted operation, before hooks and sinks have seen it.
struct Attempt {
    record: ChangeRecord,
    entity: Option<LocalEntity>,
    input: Option<serde_json::Value>,
    result: SyncResult,
    error: Option<DispatchError>,
}

impl Attempt {
    fn succeeded(
        operation: ResourceOperation,
        kind: &EntityKind,
        id: EntityId,
        name: &str,
        record: ChangeRecord,
        entity: Option<LocalEntity>,
    ) -> Self {
        let result = SyncResult::success(operation, kind.clone(), id, name, record.uid());
        Self {
            record,
            entity,
            input: None,
            result,
            error: None,
        }
    }

    fn failed(
        operation: ResourceOperation,
        kind: &EntityKind,
        id: EntityId,
        name: &str,
        record: ChangeRecord,
        entity: Option<LocalEntity>,
        error: DispatchError,
    ) -> Self {
        let result = SyncResult::failure(
            operation,
            kind.clone(),
            id,
            name,
            record.uid(),
            error.to_string(),
        );
        Self {
            record,
            entity,
            input: None,
            result,
            error: Some(error),
        }
    }

    fn with_input<T: Serialize>(mut self, input: &T) -> Self {
        self.input = serde_json::to_value(input).ok();
        self
    }

    fn with_message(mut self, message: Option<String>) -> Self {
        if let Some(message) = message {
            self.result = self.result.with_message(message);
        }
        self
    }
}

fn propagation_failure(status: &PropagationStatus) -> Option<DispatchError> {
    status.is_failure().then(|| DispatchError::Propagation {
        resource: status.resource.clone(),
        message: status.message.clone().unwrap_or_default(),
    })
}

fn rule_allowed(rule: MatchingRule, task: &ReconciliationTask) -> bool {
    match rule {
        MatchingRule::Update | MatchingRule::Link | MatchingRule::Unlink => task.perform_update,
        MatchingRule::Deprovision | MatchingRule::Unassign => task.perform_delete,
        MatchingRule::Ignore => true,
    }
}

/// Executes local mutations through the workflow and propagation
/// collaborators.
pub struct Dispatcher {
    repository: Arc<dyn Repository>,
    workflow: Arc<dyn Workflow>,
    propagation: Arc<dyn Propagation>,
    events: Arc<dyn EventSink>,
    principal: ActingPrincipal,
}

impl Dispatcher {
    /// Create a dispatcher acting as `principal`. Events go to the tracing sink.
    pub fn new(
        repository: Arc<dyn Repository>,
        workflow: Arc<dyn Workflow>,
        propagation: Arc<dyn Propagation>,
        principal: ActingPrincipal,
    ) -> Self {
        Self {
            repository,
            workflow,
            propagation,
            events: Arc::new(TracingEventSink),
            principal,
        }
    }

    /// Replace the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Handle a record that matched no local entity.
    #[instrument(skip_all, fields(uid = %record.uid(), entity_kind = %binding.kind()))]
    pub async fn unmatched(
        &self,
        profile: &RunProfile,
        binding: &KindBinding,
        record: &ChangeRecord,
    ) -> Vec<SyncResult> {
        if record.change_type() == ChangeType::Delete {
            debug!("No local entity matches the deleted object, nothing to do");
            return Vec::new();
        }

        let task = profile.task();
        let attempt = match task.unmatching_rule {
            UnmatchingRule::Ignore => Attempt::succeeded(
                ResourceOperation::None,
                binding.kind(),
                EntityId::nil(),
                record.uid(),
                record.clone(),
                None,
            ),
            rule if task.perform_create => self.create(profile, binding, record.clone(), rule).await,
            rule => {
                debug!(rule = %rule, "Task does not allow creation, skipping");
                return Vec::new();
            }
        };
        vec![self.finalize(profile, attempt).await]
    }

    /// Handle a record matching the given local entities, one result each.
    #[instrument(skip_all, fields(uid = %record.uid(), entity_kind = %binding.kind(), matches = ids.len()))]
    pub async fn matched(
        &self,
        profile: &RunProfile,
        binding: &KindBinding,
        record: &ChangeRecord,
        ids: &[EntityId],
    ) -> Vec<SyncResult> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(attempt) = self.matched_one(profile, binding, record, id).await {
                results.push(self.finalize(profile, attempt).await);
            }
        }
        results
    }

    async fn matched_one(
        &self,
        profile: &RunProfile,
        binding: &KindBinding,
        record: &ChangeRecord,
        id: EntityId,
    ) -> Option<Attempt> {
        let task = profile.task();

        if record.change_type() == ChangeType::Delete {
            if !task.perform_delete {
                debug!(entity_id = %id, "Task does not allow deletion, skipping");
                return None;
            }
            let entity = self.load(binding.kind(), id).await?;
            return Some(self.delete(profile, record.clone(), entity).await);
        }

        let rule = task.matching_rule;
        if !rule_allowed(rule, task) {
            debug!(entity_id = %id, rule = %rule, "Task does not allow this rule, skipping");
            return None;
        }

        let entity = self.load(binding.kind(), id).await?;
        let record = record.clone();
        let attempt = match rule {
            MatchingRule::Update => self.update(profile, binding, record, entity).await,
            MatchingRule::Link => self.relink(profile, record, entity, true).await,
            MatchingRule::Unlink => self.relink(profile, record, entity, false).await,
            MatchingRule::Unassign => self.unassign(profile, record, entity).await,
            MatchingRule::Deprovision => self.deprovision(profile, record, entity).await,
            MatchingRule::Ignore => {
                let name = entity.name.clone();
                Attempt::succeeded(
                    ResourceOperation::None,
                    binding.kind(),
                    id,
                    &name,
                    record,
                    Some(entity),
                )
            }
        };
        Some(attempt)
    }

    async fn load(&self, kind: &EntityKind, id: EntityId) -> Option<LocalEntity> {
        match self.repository.find_by_id(kind, id).await {
            Ok(Some(entity)) => Some(entity),
            Ok(None) => {
                warn!(entity_id = %id, "Matched entity no longer exists, skipping");
                None
            }
            Err(e) if e.is_lookup_failure() => {
                warn!(entity_id = %id, error = %e, "Matched entity cannot be read, skipping");
                None
            }
            Err(e) => {
                error!(entity_id = %id, error = %e, "Failed to load matched entity, skipping");
                None
            }
        }
    }

    fn target(profile: &RunProfile) -> PropagationTarget {
        PropagationTarget {
            resource: profile.resource().name.clone(),
            priority: profile.resource().propagation_priority,
        }
    }

    fn draft_for(
        mapper: &EntityMapper<'_>,
        record: &ChangeRecord,
        rule: UnmatchingRule,
        profile: &RunProfile,
    ) -> EntityDraft {
        let mut draft = mapper.draft(record);
        if rule == UnmatchingRule::Assign {
            draft.resources.insert(profile.resource().name.clone());
        }
        draft
    }

    async fn create(
        &self,
        profile: &RunProfile,
        binding: &KindBinding,
        record: ChangeRecord,
        rule: UnmatchingRule,
    ) -> Attempt {
        let op = ResourceOperation::Create;
        let kind = binding.kind();
        let hooks = profile.hooks();
        let mapper = EntityMapper::new(binding, profile.task().sync_status);

        let draft = Self::draft_for(&mapper, &record, rule, profile);
        let provisioned = match rule {
            UnmatchingRule::Assign => hooks.before_assign(profile, record.clone(), &draft).await,
            _ => hooks.before_provision(profile, record.clone(), &draft).await,
        };
        let provisioned = match provisioned {
            Ok(next) => next,
            Err(e) => {
                return Attempt::failed(op, kind, EntityId::nil(), &draft.name, record, None, e.into())
            }
        };

        // before_create sees the draft of the record as the first phase left it.
        let draft = Self::draft_for(&mapper, &provisioned, rule, profile);
        let record = match hooks.before_create(profile, provisioned.clone(), &draft).await {
            Ok(next) => next,
            Err(e) => {
                return Attempt::failed(op, kind, EntityId::nil(), &draft.name, provisioned, None, e.into())
            }
        };

        let draft = Self::draft_for(&mapper, &record, rule, profile);
        if profile.is_dry_run() {
            return Attempt::succeeded(op, kind, EntityId::nil(), &draft.name, record, None)
                .with_input(&draft);
        }

        match self.workflow.create(&self.principal, &draft).await {
            Ok(id) => {
                let status = self
                    .propagation
                    .propagate_create(&self.principal, kind, id, &Self::target(profile))
                    .await;
                let message = propagation_failure(&status).map(|e| {
                    warn!(entity_id = %id, error = %e, "Entity created, propagation failed");
                    e.to_string()
                });
                Attempt::succeeded(op, kind, id, &draft.name, record, None).with_message(message)
            }
            Err(e) => Attempt::failed(
                op,
                kind,
                EntityId::nil(),
                &draft.name,
                record,
                None,
                DispatchError::Workflow(e),
            ),
        }
        .with_input(&draft)
    }

    async fn update(
        &self,
        profile: &RunProfile,
        binding: &KindBinding,
        record: ChangeRecord,
        entity: LocalEntity,
    ) -> Attempt {
        let op = ResourceOperation::Update;
        let kind = binding.kind();
        let id = entity.id;
        let mapper = EntityMapper::new(binding, profile.task().sync_status);

        let patch = mapper.patch(&record, &entity);
        let record = match profile
            .hooks()
            .before_update(profile, record.clone(), &patch)
            .await
        {
            Ok(next) => next,
            Err(e) => {
                let name = entity.name.clone();
                return Attempt::failed(op, kind, id, &name, record, Some(entity), e.into());
            }
        };

        let patch = mapper.patch(&record, &entity);
        let name = patch.name.clone().unwrap_or_else(|| entity.name.clone());
        if patch.is_empty() {
            debug!(entity_id = %id, "Entity already up to date");
            return Attempt::succeeded(op, kind, id, &name, record, Some(entity));
        }
        if profile.is_dry_run() {
            return Attempt::succeeded(op, kind, id, &name, record, Some(entity)).with_input(&patch);
        }

        match self.workflow.update(&self.principal, &patch).await {
            Ok(updated) => {
                let status = self
                    .propagation
                    .propagate_update(&self.principal, kind, updated, &Self::target(profile))
                    .await;
                let message = propagation_failure(&status).map(|e| {
                    warn!(entity_id = %updated, error = %e, "Entity updated, propagation failed");
                    e.to_string()
                });
                Attempt::succeeded(op, kind, updated, &name, record, Some(entity)).with_message(message)
            }
            Err(e) => Attempt::failed(
                op,
                kind,
                id,
                &name,
                record,
                Some(entity),
                DispatchError::Workflow(e),
            ),
        }
        .with_input(&patch)
    }

    async fn delete(&self, profile: &RunProfile, record: ChangeRecord, entity: LocalEntity) -> Attempt {
        let op = ResourceOperation::Delete;
        let kind = entity.kind.clone();
        let id = entity.id;
        let name = entity.name.clone();

        let record = match profile
            .hooks()
            .before_delete(profile, record.clone(), &entity)
            .await
        {
            Ok(next) => next,
            Err(e) => return Attempt::failed(op, &kind, id, &name, record, Some(entity), e.into()),
        };
        if profile.is_dry_run() {
            return Attempt::succeeded(op, &kind, id, &name, record, Some(entity));
        }

        // Remote removal first, local delete regardless of its outcome.
        let status = self
            .propagation
            .propagate_delete(&self.principal, &kind, id, &Self::target(profile))
            .await;
        let message = propagation_failure(&status).map(|e| {
            warn!(entity_id = %id, error = %e, "Propagation of delete failed, deleting locally anyway");
            e.to_string()
        });

        match self.workflow.delete(&self.principal, &kind, id).await {
            Ok(()) => {
                Attempt::succeeded(op, &kind, id, &name, record, Some(entity)).with_message(message)
            }
            Err(e) => Attempt::failed(
                op,
                &kind,
                id,
                &name,
                record,
                Some(entity),
                DispatchError::Workflow(e),
            ),
        }
    }

    async fn deprovision(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: LocalEntity,
    ) -> Attempt {
        let op = ResourceOperation::Delete;
        let kind = entity.kind.clone();
        let id = entity.id;
        let name = entity.name.clone();

        let record = match profile
            .hooks()
            .before_deprovision(profile, record.clone(), &entity)
            .await
        {
            Ok(next) => next,
            Err(e) => return Attempt::failed(op, &kind, id, &name, record, Some(entity), e.into()),
        };
        if profile.is_dry_run() {
            return Attempt::succeeded(op, &kind, id, &name, record, Some(entity));
        }

        let status = self
            .propagation
            .propagate_delete(&self.principal, &kind, id, &Self::target(profile))
            .await;
        match propagation_failure(&status) {
            Some(e) => Attempt::failed(op, &kind, id, &name, record, Some(entity), e),
            None => Attempt::succeeded(op, &kind, id, &name, record, Some(entity)),
        }
    }

    async fn unassign(&self, profile: &RunProfile, record: ChangeRecord, entity: LocalEntity) -> Attempt {
        let op = ResourceOperation::Delete;
        let kind = entity.kind.clone();
        let id = entity.id;
        let name = entity.name.clone();
        let resource = profile.resource().name.clone();

        let record = match profile
            .hooks()
            .before_unassign(profile, record.clone(), &entity)
            .await
        {
            Ok(next) => next,
            Err(e) => return Attempt::failed(op, &kind, id, &name, record, Some(entity), e.into()),
        };
        let patch = EntityPatch::for_entity(&entity).unlink(resource);
        if profile.is_dry_run() {
            return Attempt::succeeded(op, &kind, id, &name, record, Some(entity)).with_input(&patch);
        }

        if let Err(e) = self.workflow.update(&self.principal, &patch).await {
            return Attempt::failed(
                op,
                &kind,
                id,
                &name,
                record,
                Some(entity),
                DispatchError::Workflow(e),
            )
            .with_input(&patch);
        }

        let status = self
            .propagation
            .propagate_delete(&self.principal, &kind, id, &Self::target(profile))
            .await;
        match propagation_failure(&status) {
            Some(e) => Attempt::failed(op, &kind, id, &name, record, Some(entity), e),
            None => Attempt::succeeded(op, &kind, id, &name, record, Some(entity)),
        }
        .with_input(&patch)
    }

    /// Link (`link == true`) or unlink the entity and the resource without
    /// pushing anything.
    async fn relink(
        &self,
        profile: &RunProfile,
        record: ChangeRecord,
        entity: LocalEntity,
        link: bool,
    ) -> Attempt {
        let op = ResourceOperation::None;
        let kind = entity.kind.clone();
        let id = entity.id;
        let name = entity.name.clone();
        let resource = profile.resource().name.clone();
        let hooks = profile.hooks();

        let rewritten = if link {
            hooks.before_link(profile, record.clone(), &entity).await
        } else {
            hooks.before_unlink(profile, record.clone(), &entity).await
        };
        let record = match rewritten {
            Ok(next) => next,
            Err(e) => return Attempt::failed(op, &kind, id, &name, record, Some(entity), e.into()),
        };

        let linked = entity.resources.contains(&resource);
        let patch = if link {
            EntityPatch::for_entity(&entity).link(resource)
        } else {
            EntityPatch::for_entity(&entity).unlink(resource)
        };
        if profile.is_dry_run() || linked == link {
            return Attempt::succeeded(op, &kind, id, &name, record, Some(entity));
        }

        match self.workflow.update(&self.principal, &patch).await {
            Ok(_) => Attempt::succeeded(op, &kind, id, &name, record, Some(entity)),
            Err(e) => Attempt::failed(
                op,
                &kind,
                id,
                &name,
                record,
                Some(entity),
                DispatchError::Workflow(e),
            ),
        }
        .with_input(&patch)
    }

    /// Apply error disposition, emit the audit event and run `after` hooks.
    async fn finalize(&self, profile: &RunProfile, attempt: Attempt) -> SyncResult {
        let Attempt {
            record,
            entity,
            input,
            mut result,
            error,
        } = attempt;

        match &error {
            Some(error) => {
                error!(
                    uid = %record.uid(),
                    entity_kind = %result.entity_kind(),
                    operation = %result.operation(),
                    error = %error,
                    "Reconciliation operation failed"
                );
                let disposition = profile.hooks().on_error(profile, &record, &result, error).await;
                if disposition == ErrorDisposition::Ignore {
                    result = result.into_ignored();
                }
            }
            None => info!(
                uid = %record.uid(),
                entity_kind = %result.entity_kind(),
                entity_id = %result.entity_id(),
                operation = %result.operation(),
                dry_run = profile.is_dry_run(),
                "Reconciliation operation completed"
            ),
        }

        let event = ReconciliationEvent::from_result(profile.execution_id(), profile.is_dry_run(), &result)
            .with_before(entity.as_ref().and_then(|e| serde_json::to_value(e).ok()))
            .with_input(input);
        if let Err(e) = self.events.emit(event).await {
            warn!(error = %e, "Failed to emit reconciliation event");
        }

        profile
            .hooks()
            .after(profile, &record, entity.as_ref(), &result)
            .await;
        result
    }
}
