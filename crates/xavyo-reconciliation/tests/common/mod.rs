//! Common test utilities for reconciliation tests.
//!
//! In-memory collaborators with call counters and switchable failures. No
//! database or network is involved.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tokio_util::sync::CancellationToken;

use xavyo_connector::change::{ChangeRecord, ObjectClass, SyncToken};
use xavyo_connector::error::{ConnectorError, ConnectorResult};
use xavyo_connector::mapping::{Mapping, MappingItem, MappingTarget};
use xavyo_connector::operation::{AttributeSet, AttributeValue};
use xavyo_connector::traits::{ChangeHandler, Connector};
use xavyo_core::{ActingPrincipal, EntityId, Result as XavyoResult, XavyoError};
use xavyo_reconciliation::{
    ActionHook, ConnectorProvider, DispatchError, EntityDraft, EntityKind, EntityPatch,
    ErrorDisposition, EventResult, EventSink, HookError, HookResult, KindMapping, LocalEntity,
    Propagation, PropagationStatus, PropagationTarget, ReconciliationEngine, ReconciliationEvent,
    Repository, ResourceConfig, ResourceStore, RunProfile, SearchCond, SyncResult, Workflow,
};

static INIT: Once = Once::new();

/// Initialize test logging once. Output only when `RUST_LOG` is set.
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const RESOURCE: &str = "hr-ldap";

// =============================================================================
// Entity store, repository and workflow
// =============================================================================

/// Local entities in insertion order, shared by repository and workflow.
#[derive(Default)]
pub struct EntityStore {
    entities: Mutex<Vec<LocalEntity>>,
}

impl EntityStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, entity: LocalEntity) -> EntityId {
        let id = entity.id;
        self.entities.lock().unwrap().push(entity);
        id
    }

    /// Insert an active user with the given username and attributes.
    pub fn user(&self, name: &str, attributes: AttributeSet) -> EntityId {
        self.insert(
            LocalEntity::new(EntityId::new(), EntityKind::User, name).with_attributes(attributes),
        )
    }

    pub fn get(&self, id: EntityId) -> Option<LocalEntity> {
        self.entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<LocalEntity> {
        self.entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> Vec<LocalEntity> {
        self.entities.lock().unwrap().clone()
    }

    fn remove(&self, id: EntityId) -> bool {
        let mut entities = self.entities.lock().unwrap();
        let before = entities.len();
        entities.retain(|e| e.id != id);
        entities.len() != before
    }

    fn update(&self, patch: &EntityPatch) -> Option<EntityId> {
        let mut entities = self.entities.lock().unwrap();
        let entity = entities.iter_mut().find(|e| e.id == patch.id)?;
        entity.apply(patch);
        Some(entity.id)
    }

    fn filter(&self, kind: &EntityKind, pred: impl Fn(&LocalEntity) -> bool) -> Vec<EntityId> {
        self.entities
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.kind == kind && pred(e))
            .map(|e| e.id)
            .collect()
    }
}

/// Repository over an [`EntityStore`]. Denied ids fail with `Unauthorized`.
pub struct InMemoryRepository {
    store: Arc<EntityStore>,
    denied: Mutex<HashSet<EntityId>>,
    fail_search: AtomicBool,
    pub search_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            denied: Mutex::new(HashSet::new()),
            fail_search: AtomicBool::new(false),
            search_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
        }
    }

    pub fn deny(&self, id: EntityId) {
        self.denied.lock().unwrap().insert(id);
    }

    pub fn fail_search(&self) {
        self.fail_search.store(true, Ordering::SeqCst);
    }

    fn searched(&self) -> XavyoResult<()> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(XavyoError::internal("search backend unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_by_id(
        &self,
        kind: &EntityKind,
        id: EntityId,
    ) -> XavyoResult<Option<LocalEntity>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.denied.lock().unwrap().contains(&id) {
            return Err(XavyoError::Unauthorized {
                message: Some(format!("no access to {id}")),
            });
        }
        Ok(self.store.get(id).filter(|e| &e.kind == kind))
    }

    async fn find_by_name(&self, kind: &EntityKind, name: &str) -> XavyoResult<Option<EntityId>> {
        self.searched()?;
        Ok(self.store.filter(kind, |e| e.name == name).into_iter().next())
    }

    async fn find_by_attribute_value(
        &self,
        kind: &EntityKind,
        schema: &str,
        value: &AttributeValue,
    ) -> XavyoResult<Vec<EntityId>> {
        self.searched()?;
        Ok(self.store.filter(kind, |e| {
            e.attributes
                .get(schema)
                .is_some_and(|values| values.contains(value))
        }))
    }

    async fn find_by_derived_attribute_value(
        &self,
        kind: &EntityKind,
        schema: &str,
        value: &str,
    ) -> XavyoResult<Vec<EntityId>> {
        self.searched()?;
        Ok(self.store.filter(kind, |e| {
            e.attributes.comparison_string(schema).as_deref() == Some(value)
        }))
    }

    async fn search(&self, kind: &EntityKind, condition: &SearchCond) -> XavyoResult<Vec<EntityId>> {
        self.searched()?;
        Ok(self.store.filter(kind, |e| condition.matches(e)))
    }
}

/// Workflow mutating an [`EntityStore`], with call counters.
pub struct RecordingWorkflow {
    store: Arc<EntityStore>,
    fail: Mutex<Option<String>>,
    pub principals: Mutex<Vec<String>>,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl RecordingWorkflow {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            fail: Mutex::new(None),
            principals: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Make every later call fail with this message.
    pub fn fail_with(&self, message: &str) {
        *self.fail.lock().unwrap() = Some(message.to_string());
    }

    pub fn mutations(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.update_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }

    fn enter(&self, principal: &ActingPrincipal) -> XavyoResult<()> {
        self.principals.lock().unwrap().push(principal.name.clone());
        match self.fail.lock().unwrap().as_ref() {
            Some(message) => Err(XavyoError::internal(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Workflow for RecordingWorkflow {
    async fn create(
        &self,
        principal: &ActingPrincipal,
        draft: &EntityDraft,
    ) -> XavyoResult<EntityId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(principal)?;
        Ok(self.store.insert(LocalEntity::from_draft(EntityId::new(), draft)))
    }

    async fn update(
        &self,
        principal: &ActingPrincipal,
        patch: &EntityPatch,
    ) -> XavyoResult<EntityId> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(principal)?;
        self.store
            .update(patch)
            .ok_or_else(|| XavyoError::not_found("entity", patch.id))
    }

    async fn delete(
        &self,
        principal: &ActingPrincipal,
        _kind: &EntityKind,
        id: EntityId,
    ) -> XavyoResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(principal)?;
        if self.store.remove(id) {
            Ok(())
        } else {
            Err(XavyoError::not_found("entity", id))
        }
    }
}

// =============================================================================
// Propagation
// =============================================================================

/// Propagation recording every call; optionally failing.
#[derive(Default)]
pub struct RecordingPropagation {
    fail: AtomicBool,
    pub targets: Mutex<Vec<PropagationTarget>>,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl RecordingPropagation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.update_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }

    fn status(&self, target: &PropagationTarget) -> PropagationStatus {
        self.targets.lock().unwrap().push(target.clone());
        if self.fail.load(Ordering::SeqCst) {
            PropagationStatus::failure(&target.resource, "connector timeout")
        } else {
            PropagationStatus::success(&target.resource)
        }
    }
}

#[async_trait]
impl Propagation for RecordingPropagation {
    async fn propagate_create(
        &self,
        _principal: &ActingPrincipal,
        _kind: &EntityKind,
        _id: EntityId,
        target: &PropagationTarget,
    ) -> PropagationStatus {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.status(target)
    }

    async fn propagate_update(
        &self,
        _principal: &ActingPrincipal,
        _kind: &EntityKind,
        _id: EntityId,
        target: &PropagationTarget,
    ) -> PropagationStatus {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.status(target)
    }

    async fn propagate_delete(
        &self,
        _principal: &ActingPrincipal,
        _kind: &EntityKind,
        _id: EntityId,
        target: &PropagationTarget,
    ) -> PropagationStatus {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.status(target)
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Connector delivering a scripted snapshot (no token) or delta (token).
pub struct ScriptedConnector {
    snapshot: Vec<ChangeRecord>,
    delta: Vec<ChangeRecord>,
    latest: String,
    fail_connection: AtomicBool,
    fail_stream: AtomicBool,
    fail_latest: AtomicBool,
    cancel_after: Option<(usize, CancellationToken)>,
    pub seen_tokens: Mutex<Vec<(ObjectClass, Option<String>)>>,
    pub delivered: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            snapshot: Vec::new(),
            delta: Vec::new(),
            latest: "t1".to_string(),
            fail_connection: AtomicBool::new(false),
            fail_stream: AtomicBool::new(false),
            fail_latest: AtomicBool::new(false),
            cancel_after: None,
            seen_tokens: Mutex::new(Vec::new()),
            delivered: AtomicUsize::new(0),
        }
    }

    /// Records delivered by a full scan.
    pub fn with_snapshot(mut self, records: Vec<ChangeRecord>) -> Self {
        self.snapshot = records;
        self
    }

    /// Records delivered after a stored token.
    pub fn with_delta(mut self, records: Vec<ChangeRecord>) -> Self {
        self.delta = records;
        self
    }

    pub fn with_latest_token(mut self, token: &str) -> Self {
        self.latest = token.to_string();
        self
    }

    /// Cancel `token` right before delivering record number `n` (0-based).
    pub fn with_cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub fn fail_connection(&self) {
        self.fail_connection.store(true, Ordering::SeqCst);
    }

    pub fn fail_stream(&self) {
        self.fail_stream.store(true, Ordering::SeqCst);
    }

    pub fn fail_latest_token(&self) {
        self.fail_latest.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn display_name(&self) -> &str {
        "scripted"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        if self.fail_connection.load(Ordering::SeqCst) {
            return Err(ConnectorError::connection_failed("host unreachable"));
        }
        Ok(())
    }

    async fn stream_changes(
        &self,
        object_class: &ObjectClass,
        token: Option<&SyncToken>,
        handler: &mut dyn ChangeHandler,
    ) -> ConnectorResult<()> {
        self.seen_tokens
            .lock()
            .unwrap()
            .push((object_class.clone(), token.map(|t| t.value().to_string())));
        if self.fail_stream.load(Ordering::SeqCst) {
            return Err(ConnectorError::connection_failed("connection reset by peer"));
        }

        let source = if token.is_some() {
            &self.delta
        } else {
            &self.snapshot
        };
        let records: Vec<ChangeRecord> = source
            .iter()
            .filter(|r| r.object_class() == object_class)
            .cloned()
            .collect();

        for record in records {
            if let Some((n, cancel)) = &self.cancel_after {
                if self.delivered.load(Ordering::SeqCst) == *n {
                    cancel.cancel();
                }
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            if !handler.handle(record).await {
                break;
            }
        }
        Ok(())
    }

    async fn latest_token(&self, _object_class: &ObjectClass) -> ConnectorResult<SyncToken> {
        if self.fail_latest.load(Ordering::SeqCst) {
            return Err(ConnectorError::connection_failed("token query timed out"));
        }
        Ok(SyncToken::new(self.latest.clone()))
    }
}

/// Provider handing out one connector, or none.
pub struct StaticConnectorProvider {
    connector: Option<Arc<dyn Connector>>,
}

impl StaticConnectorProvider {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector: Some(connector),
        }
    }

    pub fn empty() -> Self {
        Self { connector: None }
    }
}

#[async_trait]
impl ConnectorProvider for StaticConnectorProvider {
    async fn connector_for(&self, resource: &ResourceConfig) -> ConnectorResult<Arc<dyn Connector>> {
        self.connector
            .clone()
            .ok_or_else(|| ConnectorError::InvalidConfiguration {
                message: format!("no connector bound to {}", resource.name),
            })
    }
}

// =============================================================================
// Resource store
// =============================================================================

/// Resource configurations in memory. Saved tokens are written back.
#[derive(Default)]
pub struct InMemoryResourceStore {
    resources: Mutex<HashMap<String, ResourceConfig>>,
    fail_save: AtomicBool,
    pub saved: Mutex<Vec<(ObjectClass, String)>>,
}

impl InMemoryResourceStore {
    pub fn new(resource: ResourceConfig) -> Self {
        let store = Self::default();
        store
            .resources
            .lock()
            .unwrap()
            .insert(resource.name.clone(), resource);
        store
    }

    pub fn fail_save(&self) {
        self.fail_save.store(true, Ordering::SeqCst);
    }

    pub fn stored_token(&self, object_class: &ObjectClass) -> Option<String> {
        self.resources
            .lock()
            .unwrap()
            .get(RESOURCE)
            .and_then(|r| r.sync_token(object_class))
            .map(|t| t.value().to_string())
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn load(&self, resource: &str) -> XavyoResult<ResourceConfig> {
        self.resources
            .lock()
            .unwrap()
            .get(resource)
            .cloned()
            .ok_or_else(|| XavyoError::not_found("resource", resource))
    }

    async fn save_sync_token(
        &self,
        resource: &str,
        object_class: &ObjectClass,
        token: &SyncToken,
    ) -> XavyoResult<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(XavyoError::internal("resource store is read-only"));
        }
        let mut resources = self.resources.lock().unwrap();
        let config = resources
            .get_mut(resource)
            .ok_or_else(|| XavyoError::not_found("resource", resource))?;
        config
            .sync_tokens
            .insert(object_class.as_str().to_string(), token.clone());
        self.saved
            .lock()
            .unwrap()
            .push((object_class.clone(), token.value().to_string()));
        Ok(())
    }
}

// =============================================================================
// Hooks and events
// =============================================================================

/// Hook recording phase calls; can rewrite, fail or ignore errors.
pub struct RecordingHook {
    name: String,
    pub calls: Mutex<Vec<String>>,
    pub after_all_seen: AtomicUsize,
    /// `mail` of the record as received in create and update phases.
    pub seen_mail: Mutex<Vec<String>>,
    /// `email` of the draft handed to `before_create`.
    pub create_draft_email: Mutex<Vec<String>>,
    rewrite: Option<(String, String)>,
    provision_rewrite: Option<(String, String)>,
    fail_phase: Option<&'static str>,
    ignore_errors: bool,
}

impl RecordingHook {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            after_all_seen: AtomicUsize::new(0),
            seen_mail: Mutex::new(Vec::new()),
            create_draft_email: Mutex::new(Vec::new()),
            rewrite: None,
            provision_rewrite: None,
            fail_phase: None,
            ignore_errors: false,
        }
    }

    /// Set `attribute` to `value` on the record in create and update phases.
    pub fn rewriting(mut self, attribute: &str, value: &str) -> Self {
        self.rewrite = Some((attribute.to_string(), value.to_string()));
        self
    }

    /// Set `attribute` to `value` on the record in provision and assign phases.
    pub fn rewriting_on_provision(mut self, attribute: &str, value: &str) -> Self {
        self.provision_rewrite = Some((attribute.to_string(), value.to_string()));
        self
    }

    /// Fail in the named phase.
    pub fn failing_in(mut self, phase: &'static str) -> Self {
        self.fail_phase = Some(phase);
        self
    }

    /// Downgrade every failure to ignored.
    pub fn ignoring_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, phase: &'static str) -> HookResult<()> {
        self.calls.lock().unwrap().push(phase.to_string());
        if self.fail_phase == Some(phase) {
            return Err(HookError::failed(&self.name, format!("{phase} rejected")));
        }
        Ok(())
    }

    fn rewritten(&self, record: ChangeRecord) -> ChangeRecord {
        if let Some(mail) = record.attributes().get_string("mail") {
            self.seen_mail.lock().unwrap().push(mail.to_string());
        }
        match &self.rewrite {
            Some((attribute, value)) => record.with_attribute(attribute.clone(), value.as_str()),
            None => record,
        }
    }

    fn provisioned(&self, record: ChangeRecord) -> ChangeRecord {
        match &self.provision_rewrite {
            Some((attribute, value)) => record.with_attribute(attribute.clone(), value.as_str()),
            None => record,
        }
    }
}

#[async_trait]
impl ActionHook for RecordingHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn before_all(&self, _profile: &RunProfile) -> HookResult<()> {
        self.enter("before_all")
    }

    async fn before_provision(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_provision")?;
        Ok(self.provisioned(record))
    }

    async fn before_assign(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_assign")?;
        Ok(self.provisioned(record))
    }

    async fn before_create(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        draft: &EntityDraft,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_create")?;
        if let Some(email) = draft.attributes.get_string("email") {
            self.create_draft_email.lock().unwrap().push(email.to_string());
        }
        Ok(self.rewritten(record))
    }

    async fn before_update(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _patch: &EntityPatch,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_update")?;
        Ok(self.rewritten(record))
    }

    async fn before_link(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_link")?;
        Ok(record)
    }

    async fn before_unlink(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_unlink")?;
        Ok(record)
    }

    async fn before_unassign(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_unassign")?;
        Ok(record)
    }

    async fn before_deprovision(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_deprovision")?;
        Ok(record)
    }

    async fn before_delete(
        &self,
        _profile: &RunProfile,
        record: ChangeRecord,
        _entity: &LocalEntity,
    ) -> HookResult<ChangeRecord> {
        self.enter("before_delete")?;
        Ok(record)
    }

    async fn on_error(
        &self,
        _profile: &RunProfile,
        _record: &ChangeRecord,
        _result: &SyncResult,
        _error: &DispatchError,
    ) -> ErrorDisposition {
        self.calls.lock().unwrap().push("on_error".to_string());
        if self.ignore_errors {
            ErrorDisposition::Ignore
        } else {
            ErrorDisposition::Fail
        }
    }

    async fn after(
        &self,
        _profile: &RunProfile,
        _record: &ChangeRecord,
        _entity: Option<&LocalEntity>,
        _result: &SyncResult,
    ) {
        self.calls.lock().unwrap().push("after".to_string());
    }

    async fn after_all(&self, _profile: &RunProfile, results: &[SyncResult]) -> HookResult<()> {
        self.after_all_seen.store(results.len(), Ordering::SeqCst);
        self.enter("after_all")
    }
}

/// Event sink keeping every event.
#[derive(Default)]
pub struct CollectingEventSink {
    pub events: Mutex<Vec<ReconciliationEvent>>,
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: ReconciliationEvent) -> EventResult<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// User mapping: `uid` is the account id mapped onto the username, `mail`
/// onto `email`.
pub fn user_mapping() -> KindMapping {
    KindMapping::new(
        EntityKind::User,
        Mapping::new(vec![
            MappingItem::new("username", "uid", MappingTarget::Name).as_account_id(),
            MappingItem::new("email", "mail", MappingTarget::PlainSchema),
        ]),
    )
}

pub fn group_mapping() -> KindMapping {
    KindMapping::new(
        EntityKind::Group,
        Mapping::new(vec![
            MappingItem::new("name", "cn", MappingTarget::Name).as_account_id(),
        ]),
    )
}

pub fn account(uid: &str, mail: &str) -> ChangeRecord {
    ChangeRecord::create_or_update(
        uid,
        ObjectClass::Principal,
        AttributeSet::new().with("uid", uid).with("mail", mail),
    )
}

pub fn deleted_account(uid: &str) -> ChangeRecord {
    ChangeRecord::delete(uid, ObjectClass::Principal)
}

/// Collaborators of one engine, kept for assertions.
pub struct Harness {
    pub store: Arc<EntityStore>,
    pub repository: Arc<InMemoryRepository>,
    pub workflow: Arc<RecordingWorkflow>,
    pub propagation: Arc<RecordingPropagation>,
    pub resources: Arc<InMemoryResourceStore>,
    pub connector: Arc<ScriptedConnector>,
    pub events: Arc<CollectingEventSink>,
}

impl Harness {
    pub fn new(resource: ResourceConfig, connector: ScriptedConnector) -> Self {
        init_test_logging();
        let store = EntityStore::new();
        Self {
            repository: Arc::new(InMemoryRepository::new(Arc::clone(&store))),
            workflow: Arc::new(RecordingWorkflow::new(Arc::clone(&store))),
            propagation: Arc::new(RecordingPropagation::new()),
            resources: Arc::new(InMemoryResourceStore::new(resource)),
            connector: Arc::new(connector),
            events: Arc::new(CollectingEventSink::default()),
            store,
        }
    }

    /// Harness over the user mapping of [`RESOURCE`].
    pub fn users(connector: ScriptedConnector) -> Self {
        Self::new(ResourceConfig::new(RESOURCE).with_mapping(user_mapping()), connector)
    }

    pub fn engine(&self) -> ReconciliationEngine {
        ReconciliationEngine::new(
            Arc::clone(&self.repository) as Arc<dyn Repository>,
            Arc::clone(&self.workflow) as Arc<dyn Workflow>,
            Arc::clone(&self.propagation) as Arc<dyn Propagation>,
            Arc::clone(&self.resources) as Arc<dyn ResourceStore>,
            Arc::new(StaticConnectorProvider::new(
                Arc::clone(&self.connector) as Arc<dyn Connector>
            )),
        )
        .with_event_sink(Arc::clone(&self.events) as Arc<dyn EventSink>)
    }
}
