use super::*;
use crate::runner::{MigrationRunner, RunOptions};
use strata_core::CodeSource;
use strata_db::DuckDbBackend;

fn reversible(id: &str, table: &str) -> Migration {
    Migration::new(MigrationId::new(id), format!("CREATE TABLE {table} (id INT)"))
        .with_down(format!("DROP TABLE {table}"))
}

async fn applied(source: CodeSource) -> (DuckDbBackend, MigrationRunner) {
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = MigrationRunner::new(Arc::new(source), VersionTracker::default());
    runner.run(&db, &RunOptions::default()).await.unwrap();
    (db, runner)
}

fn three() -> CodeSource {
    CodeSource::new()
        .with(reversible("001", "a"))
        .with(reversible("002", "b"))
        .with(reversible("003", "c"))
}

fn ids(list: &[MigrationId]) -> Vec<&str> {
    list.iter().map(|id| id.as_str()).collect()
}

#[test]
fn test_parse_strategies() {
    assert_eq!("last".parse::<RollbackStrategy>().unwrap(), RollbackStrategy::Last);
    assert_eq!("all".parse::<RollbackStrategy>().unwrap(), RollbackStrategy::All);
    assert_eq!(
        "steps:2".parse::<RollbackStrategy>().unwrap(),
        RollbackStrategy::Steps(2)
    );
    assert_eq!(
        "down-to:001".parse::<RollbackStrategy>().unwrap(),
        RollbackStrategy::DownTo(MigrationId::new("001"))
    );
    assert!("steps:0".parse::<RollbackStrategy>().is_err());
    assert!("steps:x".parse::<RollbackStrategy>().is_err());
    assert!("down-to:".parse::<RollbackStrategy>().is_err());
    assert!("sideways".parse::<RollbackStrategy>().is_err());
}

#[test]
fn test_strategy_display_parses_back() {
    for s in ["last", "all", "steps:3", "down-to:002"] {
        assert_eq!(s.parse::<RollbackStrategy>().unwrap().to_string(), s);
    }
}

#[tokio::test]
async fn test_rollback_last() {
    let (db, runner) = applied(three()).await;
    let report = runner
        .rollback_engine()
        .rollback(&db, &RollbackStrategy::Last, false)
        .await
        .unwrap();

    assert_eq!(ids(&report.rolled_back), vec!["003"]);
    assert!(!db.relation_exists("c").await.unwrap());
    assert!(db.relation_exists("b").await.unwrap());
    assert!(runner.tracker().get(&db, "003").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rollback_down_to_is_exclusive() {
    let (db, runner) = applied(three()).await;
    let report = runner
        .rollback_engine()
        .rollback(
            &db,
            &RollbackStrategy::DownTo(MigrationId::new("001")),
            false,
        )
        .await
        .unwrap();

    assert_eq!(ids(&report.rolled_back), vec!["003", "002"]);
    assert!(db.relation_exists("a").await.unwrap());
}

#[tokio::test]
async fn test_rollback_down_to_unknown_id() {
    let (db, runner) = applied(three()).await;
    let err = runner
        .rollback_engine()
        .rollback(&db, &RollbackStrategy::DownTo(MigrationId::new("zzz")), false)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::NotFound { .. }));
}

#[tokio::test]
async fn test_rollback_steps_and_all() {
    let (db, runner) = applied(three()).await;
    let engine = runner.rollback_engine();

    let report = engine
        .rollback(&db, &RollbackStrategy::Steps(2), false)
        .await
        .unwrap();
    assert_eq!(ids(&report.rolled_back), vec!["003", "002"]);

    let report = engine
        .rollback(&db, &RollbackStrategy::All, false)
        .await
        .unwrap();
    assert_eq!(ids(&report.rolled_back), vec!["001"]);

    let report = engine
        .rollback(&db, &RollbackStrategy::All, false)
        .await
        .unwrap();
    assert!(report.is_noop());
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let (db, runner) = applied(three()).await;
    let report = runner
        .rollback_engine()
        .rollback(&db, &RollbackStrategy::All, true)
        .await
        .unwrap();

    assert_eq!(ids(&report.planned), vec!["003", "002", "001"]);
    assert!(report.rolled_back.is_empty());
    assert!(db.relation_exists("a").await.unwrap());
    assert_eq!(runner.tracker().list(&db).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_irreversible_rejects_whole_plan() {
    let source = CodeSource::new()
        .with(reversible("001", "a"))
        .with(Migration::new(
            MigrationId::new("002"),
            "CREATE TABLE b (id INT)",
        ))
        .with(reversible("003", "c"));
    let (db, runner) = applied(source).await;

    let err = runner
        .rollback_engine()
        .rollback(&db, &RollbackStrategy::All, false)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::Irreversible { ref id } if id == "002"));
    assert!(db.relation_exists("c").await.unwrap());
}

#[tokio::test]
async fn test_missing_from_source_is_not_found() {
    let (db, _) = applied(three()).await;
    let shrunk = MigrationRunner::new(
        Arc::new(CodeSource::new().with(reversible("001", "a"))),
        VersionTracker::default(),
    );

    let err = shrunk
        .rollback_engine()
        .rollback(&db, &RollbackStrategy::Last, false)
        .await
        .unwrap_err();
    assert!(matches!(err, MigrateError::NotFound { ref id } if id == "003"));
}

#[tokio::test]
async fn test_failing_reverse_keeps_record_completed() {
    let source = CodeSource::new()
        .with(reversible("001", "a"))
        .with(
            Migration::new(MigrationId::new("002"), "CREATE TABLE b (id INT)")
                .with_down("DROP TABLE does_not_exist"),
        )
        .with(reversible("003", "c"));
    let (db, runner) = applied(source).await;

    let err = runner
        .rollback_engine()
        .rollback(&db, &RollbackStrategy::All, false)
        .await
        .unwrap_err();
    match err {
        MigrateError::Execution {
            id,
            direction,
            state,
            completed,
            ..
        } => {
            assert_eq!(id, "002");
            assert_eq!(direction, Direction::Down);
            assert_eq!(state, MigrationState::Completed);
            assert_eq!(completed, vec![MigrationId::new("003")]);
        }
        other => panic!("expected execution error, got {other}"),
    }

    let tracker = runner.tracker();
    assert!(tracker.get(&db, "003").await.unwrap().is_none());
    assert_eq!(
        tracker.state(&db, "002").await.unwrap(),
        MigrationState::Completed
    );
    assert_eq!(
        tracker.state(&db, "001").await.unwrap(),
        MigrationState::Completed
    );
}

#[tokio::test]
async fn test_rollback_without_tracking_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let engine = RollbackEngine::new(Arc::new(three()), VersionTracker::default());
    let report = engine
        .rollback(&db, &RollbackStrategy::Last, false)
        .await
        .unwrap();
    assert!(report.is_noop());
}
