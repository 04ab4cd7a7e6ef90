//! Integration tests for upload path reconciliation against a file-backed
//! snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use ontocheck::model::Entity;
use ontocheck::reconcile::{PathOutcome, Reconciler};
use ontocheck::source::{EntitySource, SnapshotSource};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    repository: PathBuf,
    outside: PathBuf,
    snapshot: PathBuf,
}

/// Repository with one file in place, one stray file and one missing file.
fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let repository = temp.path().join("repository");
    let outside = temp.path().join("incoming");
    fs::create_dir_all(repository.join("ACR").join("1")).unwrap();
    fs::create_dir_all(&outside).unwrap();

    fs::write(repository.join("ACR").join("1").join("acr.owl"), "v1").unwrap();
    fs::write(outside.join("acr-2.owl"), "v2").unwrap();

    let snapshot = temp.path().join("metadata.json");
    let json = serde_json::json!({
        "ontologies": [
            { "id": "ACR", "submissions": [
                { "id": 1, "statuses": ["UPLOADED"], "upload_file_path": "ACR/1/acr.owl" },
                { "id": 2, "statuses": ["UPLOADED"], "upload_file_path": outside.join("acr-2.owl") },
                { "id": 3, "statuses": ["UPLOADED"] }
            ] },
            { "id": "BRO", "submissions": [
                { "id": 1, "statuses": ["UPLOADED"], "upload_file_path": "/nowhere/bro.owl" }
            ] }
        ]
    });
    fs::write(&snapshot, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    Fixture {
        _temp: temp,
        repository,
        outside,
        snapshot,
    }
}

fn upload_paths(snapshot: &Path, id: &str) -> Vec<Option<PathBuf>> {
    let store = SnapshotSource::open(snapshot).unwrap();
    store
        .load_revisions(&Entity::new(id))
        .unwrap()
        .into_iter()
        .map(|r| r.upload_file_path)
        .collect()
}

#[test]
fn test_reconcile_writes_back_to_snapshot() {
    let fx = fixture();
    let store = SnapshotSource::open(&fx.snapshot).unwrap();
    let summary = Reconciler::new(&store, &fx.repository).run().unwrap();

    assert_eq!(summary.checked, 4);
    assert_eq!(summary.in_place, 1);
    assert_eq!(summary.relocated, 1);
    assert_eq!(summary.no_upload_path, 1);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.failed, 0);

    let relocated = fx.repository.join("ACR").join("2").join("acr-2.owl");
    assert_eq!(fs::read_to_string(&relocated).unwrap(), "v2");
    assert!(fx.outside.join("acr-2.owl").exists());

    let paths = upload_paths(&fx.snapshot, "ACR");
    assert_eq!(paths[0], Some(PathBuf::from("ACR/1/acr.owl")));
    assert_eq!(paths[1], Some(relocated));
    assert_eq!(paths[2], None);
}

#[test]
fn test_dry_run_leaves_snapshot_untouched() {
    let fx = fixture();
    let before = fs::read_to_string(&fx.snapshot).unwrap();

    let store = SnapshotSource::open(&fx.snapshot).unwrap();
    let summary = Reconciler::new(&store, &fx.repository)
        .dry_run(true)
        .log_all(true)
        .run()
        .unwrap();

    assert_eq!(summary.relocated, 1);
    assert_eq!(fs::read_to_string(&fx.snapshot).unwrap(), before);
    assert!(!fx.repository.join("ACR").join("2").exists());
}

#[test]
fn test_filter_limits_reconciliation() {
    let fx = fixture();
    let store = SnapshotSource::open(&fx.snapshot).unwrap();
    let summary = Reconciler::new(&store, &fx.repository)
        .filter(["BRO".to_string()].into_iter().collect())
        .run()
        .unwrap();

    assert_eq!(summary.checked, 1);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.changed(), 0);
}

#[test]
fn test_relative_path_resolves_against_repository() {
    let fx = fixture();
    let store = SnapshotSource::open(&fx.snapshot).unwrap();
    let reconciler = Reconciler::new(&store, &fx.repository);
    let entity = Entity::new("ACR");
    let revisions = store.load_revisions(&entity).unwrap();

    assert_eq!(
        reconciler.reconcile_revision(&entity, &revisions[0]),
        PathOutcome::InPlace(fx.repository.join("ACR/1/acr.owl"))
    );
    assert_eq!(
        reconciler.expected_dir(&entity, &revisions[2]),
        fx.repository.join("ACR").join("3")
    );
}
