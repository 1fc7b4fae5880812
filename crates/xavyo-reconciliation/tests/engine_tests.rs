//! Reconciliation Engine Tests
//!
//! Run-level behavior of `ReconciliationEngine`:
//! - Scenarios: simple create, ambiguous matches, delete with failed propagation
//! - Dry-run purity and idempotent re-runs
//! - Sync token persistence for incremental runs
//! - Fatal configuration and connector errors
//! - Cooperative cancellation
//! - Trace report and statistics
//! - Account id lookups per mapping target

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use xavyo_connector::change::{ObjectClass, SyncToken};
use xavyo_connector::mapping::{Mapping, MappingItem, MappingTarget};
use xavyo_connector::operation::{AttributeSet, AttributeValue};
use xavyo_connector::schema::{AttributeDataType, SchemaAttribute};
use xavyo_core::EntityId;
use xavyo_reconciliation::{
    ConflictResolutionAction, EntityKind, HookPipeline, KindMapping, ReconciliationError,
    ReconciliationTask, ResourceConfig, ResourceOperation, RunState, SyncStatus, TraceLevel,
};

use common::{
    account, deleted_account, group_mapping, user_mapping, Harness, RecordingHook,
    ScriptedConnector, RESOURCE,
};

fn full_task() -> ReconciliationTask {
    ReconciliationTask::new(RESOURCE).full()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_simple_create() {
    let harness = Harness::users(
        ScriptedConnector::new().with_snapshot(vec![account("u1", "u1@example.com")]),
    );

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    let result = &outcome.results[0];
    assert_eq!(result.operation(), ResourceOperation::Create);
    assert_eq!(result.status(), SyncStatus::Success);
    assert!(!result.entity_id().is_nil());

    let created = harness.store.by_name("u1").expect("user created");
    assert_eq!(created.id, result.entity_id());
    assert_eq!(created.attributes.get_string("email"), Some("u1@example.com"));
    assert_eq!(harness.propagation.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.state, RunState::Done);
}

fn email_correlated_users() -> ResourceConfig {
    ResourceConfig::new(RESOURCE)
        .with_mapping(user_mapping().with_alternate_search_schemas(vec!["email".to_string()]))
}

#[tokio::test]
async fn test_ambiguous_match_first_match() {
    let harness = Harness::new(
        email_correlated_users(),
        ScriptedConnector::new().with_snapshot(vec![account("jdoe", "shared@example.com")]),
    );
    let shared = AttributeSet::new().with("email", "shared@example.com");
    let first = harness.store.user("john", shared.clone());
    let second = harness.store.user("johnny", shared);

    let task = full_task().with_conflict_resolution(ConflictResolutionAction::FirstMatch);
    let outcome = harness.engine().run(&task, false).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].operation(), ResourceOperation::Update);
    assert_eq!(outcome.results[0].entity_id(), first);
    assert_eq!(harness.store.get(first).unwrap().name, "jdoe");
    assert_eq!(harness.store.get(second).unwrap().name, "johnny");
}

#[tokio::test]
async fn test_ambiguous_match_last_match() {
    let harness = Harness::new(
        email_correlated_users(),
        ScriptedConnector::new().with_snapshot(vec![account("jdoe", "shared@example.com")]),
    );
    let shared = AttributeSet::new().with("email", "shared@example.com");
    harness.store.user("john", shared.clone());
    let last = harness.store.user("johnny", shared);

    let task = full_task().with_conflict_resolution(ConflictResolutionAction::LastMatch);
    let outcome = harness.engine().run(&task, false).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].entity_id(), last);
}

#[tokio::test]
async fn test_ambiguous_match_ignore() {
    let harness = Harness::new(
        email_correlated_users(),
        ScriptedConnector::new().with_snapshot(vec![account("jdoe", "shared@example.com")]),
    );
    let shared = AttributeSet::new().with("email", "shared@example.com");
    harness.store.user("john", shared.clone());
    harness.store.user("johnny", shared);
    let before = harness.store.snapshot();

    // Ignore is the engine default when the task names no policy.
    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.statistics.records_skipped, 1);
    assert_eq!(harness.store.snapshot(), before);
    assert_eq!(harness.workflow.mutations(), 0);
}

#[tokio::test]
async fn test_ambiguous_match_all() {
    let harness = Harness::new(
        email_correlated_users(),
        ScriptedConnector::new().with_snapshot(vec![account("jdoe", "shared@example.com")]),
    );
    let shared = AttributeSet::new().with("email", "shared@example.com");
    let first = harness.store.user("john", shared.clone());
    let second = harness.store.user("johnny", shared);

    let task = full_task().with_conflict_resolution(ConflictResolutionAction::All);
    let outcome = harness.engine().run(&task, false).await.unwrap();

    let ids: Vec<EntityId> = outcome.results.iter().map(|r| r.entity_id()).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(outcome.results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn test_delete_with_failed_propagation() {
    let harness = Harness::users(ScriptedConnector::new().with_snapshot(vec![deleted_account("u1")]));
    let id = harness.store.user("u1", AttributeSet::new());
    harness.propagation.fail();

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    let result = &outcome.results[0];
    assert_eq!(result.operation(), ResourceOperation::Delete);
    assert_eq!(result.status(), SyncStatus::Success);
    assert_eq!(result.entity_id(), id);
    assert!(result.message().unwrap().contains("connector timeout"));
    assert!(harness.store.get(id).is_none());
    assert_eq!(harness.propagation.delete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delete_without_match_is_silent() {
    let harness = Harness::users(ScriptedConnector::new().with_snapshot(vec![deleted_account("ghost")]));

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(harness.workflow.mutations(), 0);
}

// =============================================================================
// Dry run and re-runs
// =============================================================================

#[tokio::test]
async fn test_dry_run_leaves_repository_untouched() {
    let harness = Harness::users(ScriptedConnector::new().with_snapshot(vec![
        account("u1", "new@example.com"),
        account("u2", "u2@example.com"),
        deleted_account("gone"),
    ]));
    harness
        .store
        .user("u1", AttributeSet::new().with("email", "old@example.com"));
    harness.store.user("gone", AttributeSet::new());
    let before = harness.store.snapshot();

    let outcome = harness.engine().run(&full_task(), true).await.unwrap();

    let operations: Vec<ResourceOperation> = outcome.results.iter().map(|r| r.operation()).collect();
    assert_eq!(
        operations,
        vec![
            ResourceOperation::Update,
            ResourceOperation::Create,
            ResourceOperation::Delete
        ]
    );
    assert!(outcome.results.iter().all(|r| r.is_success()));
    assert!(outcome.results[1].entity_id().is_nil());
    assert_eq!(outcome.results[1].display_name(), "u2");

    assert_eq!(harness.store.snapshot(), before);
    assert_eq!(harness.workflow.mutations(), 0);
    assert_eq!(harness.propagation.calls(), 0);
    assert!(outcome.dry_run);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let harness = Harness::users(ScriptedConnector::new().with_snapshot(vec![
        account("u1", "u1@example.com"),
        account("u2", "u2@example.com"),
    ]));
    let engine = harness.engine();

    let first = engine.run(&full_task(), false).await.unwrap();
    assert!(first
        .results
        .iter()
        .all(|r| r.operation() == ResourceOperation::Create));

    let second = engine.run(&full_task(), false).await.unwrap();
    assert_eq!(second.results.len(), 2);
    assert!(second
        .results
        .iter()
        .all(|r| r.operation() == ResourceOperation::Update && r.is_success()));
    assert_eq!(harness.store.len(), 2);
    assert_eq!(harness.workflow.create_calls.load(Ordering::SeqCst), 2);
    assert_eq!(harness.workflow.update_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Sync tokens
// =============================================================================

fn incremental_resource() -> ResourceConfig {
    ResourceConfig::new(RESOURCE)
        .with_mapping(user_mapping())
        .with_sync_token(&ObjectClass::Principal, SyncToken::new("t0"))
}

#[tokio::test]
async fn test_incremental_run_persists_latest_token() {
    let harness = Harness::new(
        incremental_resource(),
        ScriptedConnector::new()
            .with_snapshot(vec![account("everyone", "all@example.com")])
            .with_delta(vec![account("u1", "u1@example.com")])
            .with_latest_token("t1"),
    );

    let outcome = harness
        .engine()
        .run(&ReconciliationTask::new(RESOURCE), false)
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].uid(), "u1");
    assert_eq!(
        *harness.connector.seen_tokens.lock().unwrap(),
        vec![(ObjectClass::Principal, Some("t0".to_string()))]
    );
    assert_eq!(
        harness.resources.stored_token(&ObjectClass::Principal),
        Some("t1".to_string())
    );
}

#[tokio::test]
async fn test_full_run_ignores_and_keeps_token() {
    let harness = Harness::new(
        incremental_resource(),
        ScriptedConnector::new().with_snapshot(vec![account("u1", "u1@example.com")]),
    );

    harness.engine().run(&full_task(), false).await.unwrap();

    assert_eq!(
        *harness.connector.seen_tokens.lock().unwrap(),
        vec![(ObjectClass::Principal, None)]
    );
    assert!(harness.resources.saved.lock().unwrap().is_empty());
    assert_eq!(
        harness.resources.stored_token(&ObjectClass::Principal),
        Some("t0".to_string())
    );
}

#[tokio::test]
async fn test_dry_run_does_not_persist_token() {
    let harness = Harness::new(
        incremental_resource(),
        ScriptedConnector::new().with_delta(vec![account("u1", "u1@example.com")]),
    );

    harness
        .engine()
        .run(&ReconciliationTask::new(RESOURCE), true)
        .await
        .unwrap();

    assert!(harness.resources.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_token_read_failure_is_fatal() {
    let harness = Harness::new(incremental_resource(), ScriptedConnector::new());
    harness.connector.fail_latest_token();

    let err = harness
        .engine()
        .run(&ReconciliationTask::new(RESOURCE), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconciliationError::TokenPersistence { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_token_save_failure_is_fatal() {
    let harness = Harness::new(incremental_resource(), ScriptedConnector::new());
    harness.resources.fail_save();

    let err = harness
        .engine()
        .run(&ReconciliationTask::new(RESOURCE), false)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("While updating sync token for __ACCOUNT__"));
}

// =============================================================================
// Fatal errors
// =============================================================================

#[tokio::test]
async fn test_missing_connector_is_fatal() {
    let harness = Harness::users(ScriptedConnector::new());
    let engine = xavyo_reconciliation::ReconciliationEngine::new(
        harness.repository.clone(),
        harness.workflow.clone(),
        harness.propagation.clone(),
        harness.resources.clone(),
        Arc::new(common::StaticConnectorProvider::empty()),
    );

    let err = engine.run(&full_task(), false).await.unwrap_err();

    assert!(matches!(err, ReconciliationError::ConnectorNotFound { .. }));
    assert!(err
        .to_string()
        .starts_with("Connector instance for resource 'hr-ldap' not found"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_mapping_without_account_id_is_fatal() {
    let mapping = KindMapping::new(
        EntityKind::User,
        Mapping::new(vec![MappingItem::new("email", "mail", MappingTarget::PlainSchema)]),
    );
    let harness = Harness::new(
        ResourceConfig::new(RESOURCE).with_mapping(mapping),
        ScriptedConnector::new().with_snapshot(vec![account("u1", "u1@example.com")]),
    );

    let err = harness.engine().run(&full_task(), false).await.unwrap_err();

    assert!(matches!(err, ReconciliationError::InvalidMapping { .. }));
    assert!(harness.connector.seen_tokens.lock().unwrap().is_empty());
    assert_eq!(harness.store.len(), 0);
}

#[tokio::test]
async fn test_resource_without_mappings_is_fatal() {
    let harness = Harness::new(ResourceConfig::new(RESOURCE), ScriptedConnector::new());

    let err = harness.engine().run(&full_task(), false).await.unwrap_err();

    assert!(matches!(err, ReconciliationError::NoMapping { .. }));
}

#[tokio::test]
async fn test_any_object_mapping_alone_is_fatal() {
    let printers = KindMapping::new(
        EntityKind::AnyObject("PRINTER".to_string()),
        Mapping::new(vec![
            MappingItem::new("name", "cn", MappingTarget::Name).as_account_id(),
        ]),
    );
    let harness = Harness::new(
        ResourceConfig::new(RESOURCE).with_mapping(printers),
        ScriptedConnector::new(),
    );

    let err = harness.engine().run(&full_task(), false).await.unwrap_err();

    assert!(matches!(err, ReconciliationError::NoMapping { .. }));
    assert!(harness.connector.seen_tokens.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_resource_is_fatal() {
    let harness = Harness::users(ScriptedConnector::new());

    let err = harness
        .engine()
        .run(&ReconciliationTask::new("nowhere").full(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconciliationError::ResourceUnavailable { .. }));
}

#[tokio::test]
async fn test_unreachable_connector_is_fatal() {
    let harness = Harness::users(
        ScriptedConnector::new().with_snapshot(vec![account("u1", "u1@example.com")]),
    );
    harness.connector.fail_connection();

    let err = harness.engine().run(&full_task(), false).await.unwrap_err();

    assert!(matches!(err, ReconciliationError::ConnectorUnavailable { .. }));
    assert!(err.is_retryable());
    assert!(harness.connector.seen_tokens.lock().unwrap().is_empty());
    assert_eq!(harness.store.len(), 0);
}

#[tokio::test]
async fn test_stream_failure_is_fatal() {
    let harness = Harness::users(ScriptedConnector::new());
    harness.connector.fail_stream();

    let err = harness.engine().run(&full_task(), false).await.unwrap_err();

    assert!(matches!(err, ReconciliationError::Connector { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_invalid_task_is_rejected() {
    let harness = Harness::users(ScriptedConnector::new());

    let err = harness
        .engine()
        .run(&ReconciliationTask::new(" "), false)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconciliationError::Configuration { .. }));
}

#[tokio::test]
async fn test_before_all_failure_aborts_run() {
    let harness = Harness::users(
        ScriptedConnector::new().with_snapshot(vec![account("u1", "u1@example.com")]),
    );
    let hook = Arc::new(RecordingHook::new("gate").failing_in("before_all"));
    let engine = harness
        .engine()
        .with_hooks(HookPipeline::new().with_hook(hook));

    let err = engine.run(&full_task(), false).await.unwrap_err();

    assert!(matches!(
        err,
        ReconciliationError::Hook {
            phase: "before_all",
            ..
        }
    ));
    assert_eq!(harness.store.len(), 0);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancellation_stops_between_records() {
    let cancel = CancellationToken::new();
    let harness = Harness::new(
        incremental_resource().with_trace_level(TraceLevel::Summary),
        ScriptedConnector::new()
            .with_delta(vec![
                account("u1", "u1@example.com"),
                account("u2", "u2@example.com"),
                account("u3", "u3@example.com"),
            ])
            .with_cancel_after(1, cancel.clone()),
    );

    let outcome = harness
        .engine()
        .run_with_cancellation(&ReconciliationTask::new(RESOURCE), false, cancel)
        .await
        .unwrap();

    assert_eq!(outcome.state, RunState::Cancelled);
    assert!(outcome.was_cancelled());
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(harness.store.len(), 1);
    assert!(harness.resources.saved.lock().unwrap().is_empty());
    assert!(outcome
        .report
        .unwrap()
        .starts_with("==>Execution was interrupted<==\n\n"));
}

// =============================================================================
// Report and statistics
// =============================================================================

#[tokio::test]
async fn test_users_scanned_before_groups() {
    let group = xavyo_connector::change::ChangeRecord::create_or_update(
        "staff",
        ObjectClass::Group,
        AttributeSet::new().with("cn", "staff"),
    );
    let harness = Harness::new(
        ResourceConfig::new(RESOURCE)
            .with_mapping(group_mapping())
            .with_mapping(user_mapping())
            .with_trace_level(TraceLevel::Summary),
        ScriptedConnector::new().with_snapshot(vec![group, account("u1", "u1@example.com")]),
    );

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    let classes: Vec<ObjectClass> = harness
        .connector
        .seen_tokens
        .lock()
        .unwrap()
        .iter()
        .map(|(class, _)| class.clone())
        .collect();
    assert_eq!(classes, vec![ObjectClass::Principal, ObjectClass::Group]);
    assert_eq!(
        outcome.report.unwrap(),
        "Users [created/failures]: 1/0 [updated/failures]: 0/0 [deleted/failures]: 0/0 [no operation/ignored]: 0/0\n\
         Groups [created/failures]: 1/0 [updated/failures]: 0/0 [deleted/failures]: 0/0 [no operation/ignored]: 0/0"
    );
    assert_eq!(outcome.statistics.counts(&EntityKind::Group).created, 1);
    assert_eq!(outcome.statistics.records_processed, 2);
}

#[tokio::test]
async fn test_failures_report_and_registration() {
    let harness = Harness::users(ScriptedConnector::new().with_snapshot(vec![
        account("u1", "u1@example.com"),
        account("u2", "u2@example.com"),
    ]));
    harness.workflow.fail_with("quota exceeded");

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.results.iter().all(|r| r.is_failure()));
    assert_eq!(outcome.statistics.counts(&EntityKind::User).create_failures, 2);
    assert!(outcome.should_register);

    let report = outcome.report.unwrap();
    assert!(report.contains("\n\nUsers failed to create:\nFailed CREATE (key/name): "));
    assert!(report.contains("/u2 with message: Internal error: quota exceeded"));
}

#[tokio::test]
async fn test_run_reconciliation_returns_report() {
    let harness = Harness::new(
        ResourceConfig::new(RESOURCE)
            .with_mapping(user_mapping())
            .with_trace_level(TraceLevel::None),
        ScriptedConnector::new().with_snapshot(vec![account("u1", "u1@example.com")]),
    );

    let report = harness
        .engine()
        .run_reconciliation(&full_task(), true)
        .await
        .unwrap();

    assert!(report.is_none());
}

#[tokio::test]
async fn test_every_result_is_emitted_as_event() {
    let harness = Harness::users(ScriptedConnector::new().with_snapshot(vec![
        account("u1", "new@example.com"),
        account("u2", "u2@example.com"),
    ]));
    let existing = harness
        .store
        .user("u1", AttributeSet::new().with("email", "old@example.com"));

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    let events = harness.events.events.lock().unwrap();
    assert_eq!(events.len(), outcome.results.len());
    assert_eq!(events[0].event, "user.update");
    assert_eq!(events[0].entity_id, existing);
    assert!(events[0].before.is_some());
    assert!(events[0].input.is_some());
    assert_eq!(events[1].event, "user.create");
    assert!(events[1].before.is_none());
}

// =============================================================================
// Account id lookups
// =============================================================================

/// Users keyed by a `Long` employee number mapped from `empNo`.
fn employee_number_resource() -> ResourceConfig {
    let mapping = KindMapping::new(
        EntityKind::User,
        Mapping::new(vec![
            MappingItem::new("employeeNumber", "empNo", MappingTarget::PlainSchema).as_account_id(),
            MappingItem::new("email", "mail", MappingTarget::PlainSchema),
        ]),
    )
    .with_schema(SchemaAttribute::new("employeeNumber", AttributeDataType::Long));
    ResourceConfig::new(RESOURCE).with_mapping(mapping)
}

fn employee(uid: &str) -> xavyo_connector::change::ChangeRecord {
    xavyo_connector::change::ChangeRecord::create_or_update(
        uid,
        ObjectClass::Principal,
        AttributeSet::new()
            .with("empNo", uid)
            .with("mail", "staff@example.com"),
    )
}

#[tokio::test]
async fn test_typed_plain_account_id_rerun_updates() {
    let harness = Harness::new(
        employee_number_resource(),
        ScriptedConnector::new().with_snapshot(vec![employee("1001")]),
    );
    let engine = harness.engine();

    let first = engine.run(&full_task(), false).await.unwrap();
    assert_eq!(first.results[0].operation(), ResourceOperation::Create);
    let created = harness.store.by_name("1001").unwrap();
    assert_eq!(
        created.attributes.first("employeeNumber"),
        Some(&AttributeValue::Integer(1001))
    );

    let second = engine.run(&full_task(), false).await.unwrap();
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.results[0].operation(), ResourceOperation::Update);
    assert_eq!(second.results[0].entity_id(), created.id);
    assert_eq!(harness.store.len(), 1);
    assert_eq!(harness.workflow.update_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unparsable_account_id_falls_back_to_text() {
    let harness = Harness::new(
        employee_number_resource(),
        ScriptedConnector::new().with_snapshot(vec![employee("E-17")]),
    );
    let engine = harness.engine();

    engine.run(&full_task(), false).await.unwrap();
    assert_eq!(
        harness
            .store
            .by_name("E-17")
            .unwrap()
            .attributes
            .first("employeeNumber"),
        Some(&AttributeValue::String("E-17".to_string()))
    );

    let second = engine.run(&full_task(), false).await.unwrap();
    assert_eq!(second.results[0].operation(), ResourceOperation::Update);
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn test_derived_account_id_lookup() {
    let mapping = KindMapping::new(
        EntityKind::User,
        Mapping::new(vec![
            MappingItem::new("login", "uid", MappingTarget::DerivedSchema).as_account_id(),
            MappingItem::new("email", "mail", MappingTarget::PlainSchema),
        ]),
    );
    let harness = Harness::new(
        ResourceConfig::new(RESOURCE).with_mapping(mapping),
        ScriptedConnector::new().with_snapshot(vec![account("jdoe", "new@example.com")]),
    );
    let id = harness.store.user(
        "John Doe",
        AttributeSet::new()
            .with("login", "jdoe")
            .with("email", "old@example.com"),
    );

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].operation(), ResourceOperation::Update);
    assert_eq!(outcome.results[0].entity_id(), id);
    let entity = harness.store.get(id).unwrap();
    assert_eq!(entity.name, "John Doe");
    assert_eq!(entity.attributes.get_string("email"), Some("new@example.com"));
    assert_eq!(harness.store.len(), 1);
}

#[tokio::test]
async fn test_id_account_id_lookup() {
    let mapping = KindMapping::new(
        EntityKind::User,
        Mapping::new(vec![
            MappingItem::new("id", "entryUUID", MappingTarget::Id).as_account_id(),
            MappingItem::new("email", "mail", MappingTarget::PlainSchema),
        ]),
    );
    let existing = EntityId::new();
    let harness = Harness::new(
        ResourceConfig::new(RESOURCE).with_mapping(mapping),
        ScriptedConnector::new().with_snapshot(vec![
            account(&existing.to_string(), "new@example.com"),
            account("legacy-42", "legacy@example.com"),
        ]),
    );
    harness.store.insert(
        xavyo_reconciliation::LocalEntity::new(existing, EntityKind::User, "jdoe")
            .with_attributes(AttributeSet::new().with("email", "old@example.com")),
    );

    let outcome = harness.engine().run(&full_task(), false).await.unwrap();

    let operations: Vec<ResourceOperation> = outcome.results.iter().map(|r| r.operation()).collect();
    assert_eq!(
        operations,
        vec![ResourceOperation::Update, ResourceOperation::Create]
    );
    assert_eq!(outcome.results[0].entity_id(), existing);
    assert_eq!(harness.store.get(existing).unwrap().name, "jdoe");
    assert_eq!(harness.store.len(), 2);
}
