//! End-to-end tests for job creation, dispatch and execution against a fake plugin.

use std::sync::Arc;

use account_sync::app::Services;
use account_sync::dispatch::JobDispatchMessage;
use account_sync::jobs::JobStatus;
use account_sync::models::trusted_account::ScopeKind;
use account_sync::reconciler::Inventory;
use account_sync::repositories::{JobDispatchRepository, JobFilter, SecretRepository};
use anyhow::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::json;
use uuid::Uuid;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    ACCOUNT_SCHEMA, FakeTransport, TEST_DOMAIN, TEST_PLUGIN_ID, create_trusted_account, ledger,
    new_trusted_account, node, object, record, seed_catalog, setup_test_db_arc,
    store_trusted_secret, test_services,
};

async fn setup(transport: FakeTransport) -> Result<(Arc<DatabaseConnection>, Arc<FakeTransport>, Services)> {
    let db = setup_test_db_arc().await?;
    seed_catalog(&db).await?;
    let transport = Arc::new(transport);
    let services = test_services(db.clone(), transport.clone());
    Ok((db, transport, services))
}

fn discovered_with_secret() -> account_sync::plugins::DiscoveredRecord {
    let mut discovered = record("acct-1", "r1", vec![node("ws-a", "w1")]);
    discovered.secret_data = Some(object(json!({ "key": "abc" })));
    discovered.secret_schema_id = Some(ACCOUNT_SCHEMA.to_string());
    discovered
}

/// Claims every queued dispatch and returns how many were processed.
async fn drain(services: &Services) -> Result<usize> {
    let worker = services.dispatch_worker();
    let mut total = 0;
    loop {
        let processed = worker.tick().await?;
        if processed == 0 {
            return Ok(total);
        }
        total += processed;
    }
}

#[tokio::test]
async fn created_job_is_dispatched_with_resolved_secret() -> Result<()> {
    let (db, _transport, services) = setup(FakeTransport::returning(Vec::new())).await?;
    let mut new = new_trusted_account(ScopeKind::Domain);
    new.trusted_secret_id = Some(store_trusted_secret(&db).await?);
    let account = create_trusted_account(&db, new).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({ "full": true }))
        .await?;
    assert_eq!(job.status, "PENDING");
    assert_eq!(job.workspace_id, "*");
    assert_eq!(job.plugin_id, TEST_PLUGIN_ID);

    let claimed = services.queue.claim(10).await?;
    assert_eq!(claimed.len(), 1);
    let message = &claimed[0].message;
    assert_eq!(message.job_id, job.id);
    assert_eq!(message.trusted_account_id, account.id);
    assert_eq!(message.trusted_secret_id, account.trusted_secret_id);
    assert_eq!(message.secret_data["aws_access_key_id"], "AKIATEST");
    assert_eq!(message.options, json!({ "full": true }));
    Ok(())
}

#[tokio::test]
async fn unresolvable_secret_dispatches_empty_payload() -> Result<()> {
    let (db, _transport, services) = setup(FakeTransport::returning(Vec::new())).await?;
    let mut new = new_trusted_account(ScopeKind::Domain);
    new.trusted_secret_id = Some(Uuid::new_v4());
    let account = create_trusted_account(&db, new).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    assert_eq!(job.status, "PENDING");

    let claimed = services.queue.claim(10).await?;
    assert!(claimed[0].message.secret_data.is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_job_fails_without_dispatch() -> Result<()> {
    let (db, _transport, services) = setup(FakeTransport::returning(Vec::new())).await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let running = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    services.jobs.ledger().mark_in_progress(running.id).await?;

    let duplicate = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    assert_eq!(duplicate.status, "FAILURE");
    assert!(duplicate.finished_at.is_some());
    assert_eq!(duplicate.error.unwrap()["code"], "ERROR_DUPLICATE_JOB");

    let dispatches = JobDispatchRepository::new(db.clone());
    assert!(dispatches.list_for_job(duplicate.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn successful_run_reconciles_and_rotates() -> Result<()> {
    let (db, transport, services) =
        setup(FakeTransport::returning(vec![discovered_with_secret()])).await?;
    let mut new = new_trusted_account(ScopeKind::Domain);
    new.trusted_secret_id = Some(store_trusted_secret(&db).await?);
    let account = create_trusted_account(&db, new).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    assert_eq!(drain(&services).await?, 1);

    let job = services.jobs.ledger().get_job(TEST_DOMAIN, job.id, None).await?;
    assert_eq!(job.status, "SUCCESS");
    assert!(job.finished_at.is_some());
    assert!(job.error.is_none());

    // Account plugin options override provider defaults
    let init = transport.init_calls.lock().unwrap().clone();
    assert_eq!(init.len(), 1);
    assert_eq!(init[0]["region"], "eu-west-1");
    assert_eq!(init[0]["page_size"], 100);
    let sync = transport.sync_calls.lock().unwrap().clone();
    assert_eq!(sync[0].domain_id, TEST_DOMAIN);
    assert_eq!(sync[0].secret_data["aws_secret_access_key"], "shh");

    let inventory = Inventory::new(db.clone());
    let accounts = inventory.service_accounts.list_by_domain(TEST_DOMAIN).await?;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].trusted_account_id, Some(account.id));
    let secret_id = accounts[0].secret_id.expect("rotated secret");
    let secret = SecretRepository::new(db.clone())
        .find(TEST_DOMAIN, secret_id)
        .await?
        .unwrap();
    assert_eq!(secret.trusted_secret_id, account.trusted_secret_id);

    // Dispatch was acknowledged
    assert!(services.queue.claim(10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn plugin_failure_marks_job_failed() -> Result<()> {
    let (db, _transport, services) = setup(FakeTransport::failing("collector crashed")).await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    drain(&services).await?;

    let job = services.jobs.ledger().get_job(TEST_DOMAIN, job.id, None).await?;
    assert_eq!(job.status, "FAILURE");
    assert!(job.finished_at.is_some());
    let error = job.error.unwrap();
    assert_eq!(error["code"], "ERROR_PLUGIN_INVOCATION");
    assert!(error["message"].as_str().unwrap().contains("collector crashed"));

    assert!(
        Inventory::new(db.clone())
            .projects
            .list_by_domain(TEST_DOMAIN)
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test]
async fn invalid_record_secret_fails_the_job() -> Result<()> {
    let mut discovered = discovered_with_secret();
    discovered.secret_data = Some(object(json!({ "unexpected": "field" })));
    let (db, _transport, services) = setup(FakeTransport::returning(vec![discovered])).await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    drain(&services).await?;

    let job = services.jobs.ledger().get_job(TEST_DOMAIN, job.id, None).await?;
    assert_eq!(job.status, "FAILURE");
    assert_eq!(job.error.unwrap()["code"], "ERROR_SECRET_VALIDATION");
    Ok(())
}

#[tokio::test]
async fn cancel_during_run_discards_result() -> Result<()> {
    let (db, transport, services) =
        setup(FakeTransport::returning(vec![record("acct-1", "r1", vec![node("ws-a", "w1")])]))
            .await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    transport.cancel_during_sync(ledger(&db), job.id);
    drain(&services).await?;

    let job = services.jobs.ledger().get_job(TEST_DOMAIN, job.id, None).await?;
    assert_eq!(job.status, "CANCELED");
    assert!(job.finished_at.is_some());
    Ok(())
}

#[tokio::test]
async fn job_canceled_before_start_never_calls_plugin() -> Result<()> {
    let (db, transport, services) = setup(FakeTransport::returning(Vec::new())).await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    services.jobs.ledger().cancel(TEST_DOMAIN, job.id).await?;
    drain(&services).await?;

    let job = services.jobs.ledger().get_job(TEST_DOMAIN, job.id, None).await?;
    assert_eq!(job.status, "CANCELED");
    assert!(transport.init_calls.lock().unwrap().is_empty());
    assert!(transport.sync_calls.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn redelivered_message_for_succeeded_job_is_not_rerun() -> Result<()> {
    let (db, transport, services) =
        setup(FakeTransport::returning(vec![discovered_with_secret()])).await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    let claimed = services.queue.claim(10).await?;
    assert_eq!(claimed.len(), 1);
    let message = &claimed[0].message;

    let first = services.executor.execute(message).await?;
    assert_eq!(first.status, "SUCCESS");
    let inventory = Inventory::new(db.clone());
    let secret_before = inventory.service_accounts.list_by_domain(TEST_DOMAIN).await?[0].secret_id;
    assert!(secret_before.is_some());

    // same message again, as after a lost acknowledgement
    let second = services.executor.execute(message).await?;
    assert_eq!(second.id, job.id);
    assert_eq!(second.status, "SUCCESS");
    assert_eq!(second.finished_at, first.finished_at);

    assert_eq!(transport.init_calls.lock().unwrap().len(), 1);
    assert_eq!(transport.sync_calls.lock().unwrap().len(), 1);
    let secret_after = inventory.service_accounts.list_by_domain(TEST_DOMAIN).await?[0].secret_id;
    assert_eq!(secret_after, secret_before);
    Ok(())
}

#[tokio::test]
async fn unrecorded_failure_leaves_job_open_for_redelivery() -> Result<()> {
    let (db, _transport, services) = setup(FakeTransport::failing("collector crashed")).await?;
    let account = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    db.execute_unprepared(
        "CREATE TRIGGER reject_failure BEFORE UPDATE ON jobs \
         WHEN NEW.status = 'FAILURE' \
         BEGIN SELECT RAISE(ABORT, 'ledger unavailable'); END;",
    )
    .await?;

    assert_eq!(drain(&services).await?, 1);

    let job = services.jobs.ledger().get_job(TEST_DOMAIN, job.id, None).await?;
    assert_eq!(job.status, "IN_PROGRESS");
    assert!(job.finished_at.is_none());

    let dispatches = JobDispatchRepository::new(db.clone());
    let open = dispatches.find_open_for_job(job.id).await?;
    assert_eq!(open.map(|dispatch| dispatch.status), Some("claimed".to_string()));
    Ok(())
}

#[tokio::test]
async fn message_for_missing_job_is_acknowledged() -> Result<()> {
    let (_db, _transport, services) = setup(FakeTransport::returning(Vec::new())).await?;

    services
        .queue
        .push(&JobDispatchMessage {
            job_id: Uuid::new_v4(),
            trusted_account_id: Uuid::new_v4(),
            trusted_secret_id: None,
            secret_data: Default::default(),
            workspace_id: "*".to_string(),
            domain_id: TEST_DOMAIN.to_string(),
            options: json!({}),
        })
        .await?;

    assert_eq!(drain(&services).await?, 1);
    assert!(services.queue.claim(10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn sweep_creates_jobs_for_due_accounts_only() -> Result<()> {
    let (db, _transport, services) = setup(FakeTransport::returning(Vec::new())).await?;
    let due = create_trusted_account(&db, new_trusted_account(ScopeKind::Domain)).await?;

    let mut off_hour = new_trusted_account(ScopeKind::Domain);
    off_hour.schedule = account_sync::models::trusted_account::Schedule::new(true, [4]);
    create_trusted_account(&db, off_hour).await?;

    let mut disabled = new_trusted_account(ScopeKind::Domain);
    disabled.schedule = account_sync::models::trusted_account::Schedule::new(false, [3]);
    create_trusted_account(&db, disabled).await?;

    let mut broken = new_trusted_account(ScopeKind::Domain);
    broken.provider = "unknown-provider".to_string();
    create_trusted_account(&db, broken).await?;

    let report = services.jobs.create_jobs_by_trusted_account(Some(3)).await?;
    assert_eq!(report.hour, 3);
    assert_eq!(report.due, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.failed, 1);

    let jobs = services
        .jobs
        .ledger()
        .list_jobs(&JobFilter {
            domain_id: TEST_DOMAIN.to_string(),
            ..Default::default()
        })
        .await?;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].trusted_account_id, due.id);
    assert_eq!(jobs[0].job_status()?, JobStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn workspace_account_job_is_scoped_to_its_workspace() -> Result<()> {
    let (db, _transport, services) =
        setup(FakeTransport::returning(vec![record("acct-1", "r1", vec![node("ou", "g1")])]))
            .await?;
    let workspace_id = Uuid::new_v4();
    let mut new = new_trusted_account(ScopeKind::Workspace);
    new.workspace_id = Some(workspace_id);
    let account = create_trusted_account(&db, new).await?;

    let job = services
        .jobs
        .create_service_account_job(&account, json!({}))
        .await?;
    assert_eq!(job.workspace_id, workspace_id.to_string());

    drain(&services).await?;
    let job = services.jobs.ledger().get_job(TEST_DOMAIN, job.id, None).await?;
    assert_eq!(job.status, "SUCCESS");

    let accounts = Inventory::new(db.clone())
        .service_accounts
        .list_by_domain(TEST_DOMAIN)
        .await?;
    assert_eq!(accounts[0].workspace_id, workspace_id);
    Ok(())
}
