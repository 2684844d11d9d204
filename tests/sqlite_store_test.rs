use circuit_sim::db::init_db;
use circuit_sim::store::{ledger_to_entities, load_ledger, EntityKind};
use circuit_sim::{
    Ledger, LedgerStore, MemoryStore, ProjectId, RecordingReporter, Repository, Scenario, Session,
    SimulationParams, StoreError, TimeStamp, VersionId,
};
use std::sync::Arc;
use tempfile::TempDir;

const SIMPLE: &str = include_str!("../scenarios/simple_reproduction.json");

fn scenario_ledger() -> Ledger {
    Scenario::from_json(SIMPLE)
        .unwrap()
        .into_ledger(&SimulationParams::default())
        .unwrap()
}

async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

#[tokio::test]
async fn test_snapshot_round_trips_through_sqlite() {
    let (repo, _temp) = setup_repo().await;
    let project = ProjectId::new(1);
    let ledger = scenario_ledger();

    let stamp = TimeStamp::initial(project);
    repo.write_new_version(project, &stamp, &ledger_to_entities(&ledger))
        .await
        .unwrap();
    repo.set_current_version(project, stamp.id).await.unwrap();

    let loaded = load_ledger(repo.as_ref(), project, VersionId::INITIAL)
        .await
        .unwrap();
    assert_eq!(loaded, ledger);
    assert_eq!(
        repo.current_version(project).await.unwrap(),
        Some(VersionId::INITIAL)
    );
    assert_eq!(repo.timestamps(project).await.unwrap(), vec![stamp]);

    let workers = repo
        .read_entity(EntityKind::SocialClass, project, VersionId::INITIAL, "Workers")
        .await
        .unwrap();
    assert!(workers.is_some());
}

#[tokio::test]
async fn test_duplicate_version_is_conflict() {
    let (repo, _temp) = setup_repo().await;
    let project = ProjectId::new(1);
    let entities = ledger_to_entities(&scenario_ledger());
    let stamp = TimeStamp::initial(project);

    repo.write_new_version(project, &stamp, &entities).await.unwrap();
    let err = repo
        .write_new_version(project, &stamp, &entities)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict(_)));
    let commodities = repo
        .read_entities(EntityKind::Commodity, project, VersionId::INITIAL)
        .await
        .unwrap();
    assert_eq!(commodities.len(), 4);
}

#[tokio::test]
async fn test_pointer_cannot_move_to_unwritten_version() {
    let (repo, _temp) = setup_repo().await;

    let err = repo
        .set_current_version(ProjectId::new(1), VersionId::new(3))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
    assert_eq!(repo.current_version(ProjectId::new(1)).await.unwrap(), None);
}

#[tokio::test]
async fn test_sqlite_and_memory_sessions_agree() {
    let (repo, _temp) = setup_repo().await;
    let project = ProjectId::new(1);
    let params = SimulationParams::default();
    let ledger = scenario_ledger();

    let mut on_disk = Session::initialise(
        repo.clone(),
        project,
        &ledger,
        params,
        Arc::new(RecordingReporter::new()),
    )
    .await
    .unwrap();
    let mut in_memory = Session::initialise(
        Arc::new(MemoryStore::new()),
        project,
        &ledger,
        params,
        Arc::new(RecordingReporter::new()),
    )
    .await
    .unwrap();

    on_disk.run_period().await.unwrap();
    in_memory.run_period().await.unwrap();

    assert_eq!(
        on_disk.ledger(None).await.unwrap(),
        in_memory.ledger(None).await.unwrap()
    );
    assert_eq!(
        on_disk.timestamps().await.unwrap(),
        in_memory.timestamps().await.unwrap()
    );

    // A reopened session resumes at the start of the next period.
    let reopened = Session::open(repo, project, params, Arc::new(RecordingReporter::new()))
        .await
        .unwrap();
    assert_eq!(reopened.current_version(), VersionId::new(9));
    assert_eq!(reopened.period(), 2);
}
