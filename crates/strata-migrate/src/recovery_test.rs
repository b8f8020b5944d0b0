use super::*;
use crate::runner::{MigrationRunner, RunOptions};
use strata_core::{CodeSource, Migration};
use strata_db::DuckDbBackend;

fn ops(source: CodeSource) -> (MigrationRunner, RecoveryOperations) {
    let runner = MigrationRunner::new(Arc::new(source), VersionTracker::default());
    let recovery = runner.recovery();
    (runner, recovery)
}

fn four_steps() -> CodeSource {
    CodeSource::new()
        .with(Migration::new(MigrationId::new("001"), "SELECT 1"))
        .with(Migration::new(MigrationId::new("002"), "SELECT 2"))
        .with(Migration::new(MigrationId::new("003"), "SELECT 3"))
        .with(Migration::new(MigrationId::new("004"), "SELECT 4"))
}

/// 001 completed, 002 failed, 003 in progress, 004 pending.
async fn one_of_each_state(tracker: &VersionTracker, db: &DuckDbBackend) {
    tracker.ensure_table(db).await.unwrap();
    tracker
        .force_complete(db, &MigrationId::new("001"), Some("c1"))
        .await
        .unwrap();
    tracker.begin(db, &MigrationId::new("002")).await.unwrap();
    tracker
        .fail(db, &MigrationId::new("002"), "boom")
        .await
        .unwrap();
    tracker.begin(db, &MigrationId::new("003")).await.unwrap();
}

fn failing_second() -> CodeSource {
    CodeSource::new()
        .with(Migration::new(MigrationId::new("001"), "CREATE TABLE a (id INT)"))
        .with(Migration::new(
            MigrationId::new("002"),
            "INSERT INTO target VALUES (1)",
        ))
        .with(Migration::new(MigrationId::new("003"), "CREATE TABLE c (id INT)"))
}

#[test]
fn test_scope_from_flags() {
    assert_eq!(MarkScope::from_flags(false, false, false), MarkScope::PendingOnly);
    assert_eq!(MarkScope::from_flags(true, false, false), MarkScope::IncludeFailed);
    assert_eq!(
        MarkScope::from_flags(false, true, false),
        MarkScope::IncludeInProgress
    );
    assert_eq!(MarkScope::from_flags(true, true, false), MarkScope::All);
    assert_eq!(MarkScope::from_flags(false, false, true), MarkScope::All);
}

#[test]
fn test_gate() {
    assert!(!ConfirmGate::default().is_satisfied());
    assert!(ConfirmGate::confirmed().is_satisfied());
    assert!(ConfirmGate::forced().is_satisfied());
}

#[tokio::test]
async fn test_retry_after_fix() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (runner, recovery) = ops(failing_second());
    runner.run(&db, &RunOptions::default()).await.unwrap_err();

    db.execute_batch("CREATE TABLE target (id INT)").await.unwrap();
    recovery.retry(&db, "002").await.unwrap();

    assert_eq!(
        runner.tracker().state(&db, "002").await.unwrap(),
        MigrationState::Completed
    );
    assert_eq!(db.query_rows("SELECT * FROM target", &[]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_retry_failing_again_stays_failed() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (runner, recovery) = ops(failing_second());
    runner.run(&db, &RunOptions::default()).await.unwrap_err();

    let err = recovery.retry(&db, "002").await.unwrap_err();
    assert!(matches!(err, MigrateError::Execution { .. }));
    assert_eq!(
        runner.tracker().state(&db, "002").await.unwrap(),
        MigrationState::Failed
    );
}

#[tokio::test]
async fn test_retry_requires_failed_state() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (_, recovery) = ops(failing_second());

    let err = recovery.retry(&db, "001").await.unwrap_err();
    assert!(matches!(
        err,
        MigrateError::InvalidState {
            state: MigrationState::Pending,
            operation: "retry",
            ..
        }
    ));

    let err = recovery.retry(&db, "nope").await.unwrap_err();
    assert!(matches!(err, MigrateError::NotFound { .. }));
}

#[tokio::test]
async fn test_mark_completed_needs_consent() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (runner, recovery) = ops(failing_second());

    let err = recovery
        .mark_completed(&db, "001", ConfirmGate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::ConfirmationRequired { .. }));

    assert!(recovery
        .mark_completed(&db, "001", ConfirmGate::forced())
        .await
        .unwrap());
    assert!(!recovery
        .mark_completed(&db, "001", ConfirmGate::confirmed())
        .await
        .unwrap());

    assert!(!db.relation_exists("a").await.unwrap());
    let record = runner.tracker().get(&db, "001").await.unwrap().unwrap();
    assert!(record.checksum.is_some());
}

#[tokio::test]
async fn test_mark_completed_unknown_id() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (_, recovery) = ops(failing_second());
    let err = recovery
        .mark_completed(&db, "nope", ConfirmGate::forced())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::NotFound { .. }));
}

#[tokio::test]
async fn test_mark_all_pending_only() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (runner, recovery) = ops(failing_second());
    runner.run(&db, &RunOptions::default()).await.unwrap_err();

    let summary = recovery
        .mark_all_completed(&db, MarkScope::PendingOnly, ConfirmGate::forced())
        .await
        .unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.already_completed, 1);
    assert_eq!(summary.newly_marked, 1);
    assert_eq!(summary.failed_skipped, 1);
    assert_eq!(summary.failed_marked, 0);
    assert_eq!(
        runner.tracker().state(&db, "002").await.unwrap(),
        MigrationState::Failed
    );
}

#[tokio::test]
async fn test_mark_all_each_scope() {
    use MigrationState::{Completed, Failed, InProgress};

    let cases = [
        (
            MarkScope::PendingOnly,
            MarkAllSummary {
                total: 4,
                already_completed: 1,
                newly_marked: 1,
                failed_marked: 0,
                in_progress_marked: 0,
                failed_skipped: 1,
                in_progress_skipped: 1,
            },
            [Completed, Failed, InProgress, Completed],
        ),
        (
            MarkScope::IncludeFailed,
            MarkAllSummary {
                total: 4,
                already_completed: 1,
                newly_marked: 1,
                failed_marked: 1,
                in_progress_marked: 0,
                failed_skipped: 0,
                in_progress_skipped: 1,
            },
            [Completed, Completed, InProgress, Completed],
        ),
        (
            MarkScope::IncludeInProgress,
            MarkAllSummary {
                total: 4,
                already_completed: 1,
                newly_marked: 1,
                failed_marked: 0,
                in_progress_marked: 1,
                failed_skipped: 1,
                in_progress_skipped: 0,
            },
            [Completed, Failed, Completed, Completed],
        ),
        (
            MarkScope::All,
            MarkAllSummary {
                total: 4,
                already_completed: 1,
                newly_marked: 1,
                failed_marked: 1,
                in_progress_marked: 1,
                failed_skipped: 0,
                in_progress_skipped: 0,
            },
            [Completed, Completed, Completed, Completed],
        ),
    ];

    for (scope, expected, states) in cases {
        let db = DuckDbBackend::in_memory().unwrap();
        let (runner, recovery) = ops(four_steps());
        one_of_each_state(runner.tracker(), &db).await;

        let summary = recovery
            .mark_all_completed(&db, scope, ConfirmGate::forced())
            .await
            .unwrap();
        assert_eq!(summary, expected, "{scope:?}");
        assert_eq!(summary.marked(), expected.marked(), "{scope:?}");

        for (id, state) in ["001", "002", "003", "004"].into_iter().zip(states) {
            assert_eq!(
                runner.tracker().state(&db, id).await.unwrap(),
                state,
                "{scope:?} {id}"
            );
        }
        // Nothing ran: the untouched completed record keeps its checksum.
        let first = runner.tracker().get(&db, "001").await.unwrap().unwrap();
        assert_eq!(first.checksum.as_deref(), Some("c1"), "{scope:?}");
    }
}

#[tokio::test]
async fn test_mark_completed_settles_record_without_source() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (runner, recovery) = ops(four_steps());
    let tracker = runner.tracker();
    tracker.ensure_table(&db).await.unwrap();
    tracker
        .begin(&db, &MigrationId::new("000_removed"))
        .await
        .unwrap();
    tracker
        .fail(&db, &MigrationId::new("000_removed"), "boom")
        .await
        .unwrap();

    let err = runner.run(&db, &RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, MigrateError::DirtyState { .. }));

    let err = recovery
        .mark_completed(&db, "000_removed", ConfirmGate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::ConfirmationRequired { .. }));

    assert!(recovery
        .mark_completed(&db, "000_removed", ConfirmGate::confirmed())
        .await
        .unwrap());
    let record = tracker.get(&db, "000_removed").await.unwrap().unwrap();
    assert_eq!(record.state(), MigrationState::Completed);
    assert!(record.failure_reason.is_none());

    let report = runner.run(&db, &RunOptions::default()).await.unwrap();
    assert_eq!(report.applied.len(), 4);
}

#[tokio::test]
async fn test_mark_all_scopes_apply_to_records_without_source() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (runner, recovery) = ops(four_steps());
    let tracker = runner.tracker();
    tracker.ensure_table(&db).await.unwrap();
    tracker
        .force_complete(&db, &MigrationId::new("000_done"), Some("c0"))
        .await
        .unwrap();
    tracker.begin(&db, &MigrationId::new("000_failed")).await.unwrap();
    tracker
        .fail(&db, &MigrationId::new("000_failed"), "boom")
        .await
        .unwrap();
    tracker.begin(&db, &MigrationId::new("000_stuck")).await.unwrap();

    let summary = recovery
        .mark_all_completed(&db, MarkScope::IncludeFailed, ConfirmGate::forced())
        .await
        .unwrap();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.newly_marked, 4);
    assert_eq!(summary.failed_marked, 1);
    assert_eq!(summary.in_progress_skipped, 1);
    assert_eq!(
        tracker.state(&db, "000_failed").await.unwrap(),
        MigrationState::Completed
    );
    assert_eq!(
        tracker.state(&db, "000_stuck").await.unwrap(),
        MigrationState::InProgress
    );

    let summary = recovery
        .mark_all_completed(&db, MarkScope::All, ConfirmGate::forced())
        .await
        .unwrap();
    assert_eq!(summary.total, 5);
    assert_eq!(summary.already_completed, 4);
    assert_eq!(summary.in_progress_marked, 1);
    assert!(runner.status(&db).await.unwrap().failed().is_empty());
}

#[tokio::test]
async fn test_mark_all_needs_consent() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (_, recovery) = ops(failing_second());
    let err = recovery
        .mark_all_completed(&db, MarkScope::All, ConfirmGate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::ConfirmationRequired { .. }));
}

#[tokio::test]
async fn test_drop_requires_matching_table_name() {
    let db = DuckDbBackend::in_memory().unwrap();
    let (runner, recovery) = ops(failing_second());
    runner.run(&db, &RunOptions::default()).await.unwrap_err();

    let wrong_name = DropAcknowledgement {
        confirmed: true,
        table_name: "schema_migrations".to_string(),
    };
    assert!(matches!(
        recovery.drop_and_recreate(&db, &wrong_name).await.unwrap_err(),
        MigrateError::ConfirmationRequired { .. }
    ));

    let unconfirmed = DropAcknowledgement {
        confirmed: false,
        table_name: "__schema_migrations".to_string(),
    };
    assert!(recovery.drop_and_recreate(&db, &unconfirmed).await.is_err());
    assert_eq!(runner.tracker().list(&db).await.unwrap().len(), 2);

    let ack = DropAcknowledgement {
        confirmed: true,
        table_name: "__schema_migrations".to_string(),
    };
    recovery.drop_and_recreate(&db, &ack).await.unwrap();
    assert!(runner.tracker().list(&db).await.unwrap().is_empty());
}
