//! Plan classification, job seeding and disk round-trips.

use std::collections::HashSet;
use std::fs;

use pseudo_core::{
    ContentKind, FileId, FileStore, JobStatus, JobStore, ProcessingMode, ProjectId, Schema,
    SchemaSettings, SchemaStore,
};
use pseudo_sync::{
    apply_bullets, apply_raw, export_project, import_dir, plan, seed_job, Direction, PlanOptions,
    SyncError, WriteResult,
};
use tempfile::TempDir;

fn proj() -> ProjectId {
    ProjectId::from("app")
}

fn write(store: &FileStore, path: &str, body: &str) -> FileId {
    store
        .write_file(&proj(), path, body, ContentKind::for_name(path))
        .unwrap()
}

/// One pair per drift state: in sync, raw stale, bullet stale, both stale,
/// no raw at all.
fn mixed_store() -> FileStore {
    let store = FileStore::new();

    let b = write(&store, "/lib/synced.dart.pseudo", "- synced");
    let r = write(&store, "/lib/synced.dart", "synced()");
    store.mark_synced(b, r).unwrap();

    let b = write(&store, "/lib/bullet_edited.dart.pseudo", "- v1");
    let r = write(&store, "/lib/bullet_edited.dart", "v1()");
    store.mark_synced(b, r).unwrap();
    write(&store, "/lib/bullet_edited.dart.pseudo", "- v2");

    let b = write(&store, "/lib/raw_edited.dart.pseudo", "- v1");
    let r = write(&store, "/lib/raw_edited.dart", "v1()");
    store.mark_synced(b, r).unwrap();
    write(&store, "/lib/raw_edited.dart", "v2()");

    let b = write(&store, "/lib/both.dart.pseudo", "- v1");
    let r = write(&store, "/lib/both.dart", "v1()");
    store.mark_synced(b, r).unwrap();
    write(&store, "/lib/both.dart.pseudo", "- v2");
    write(&store, "/lib/both.dart", "v2()");

    write(&store, "/lib/new.dart.pseudo", "- new");
    write(&store, "/README.md", "not paired");
    store
}

fn names(pairs: &[pseudo_sync::SyncPair]) -> Vec<String> {
    pairs.iter().map(|p| p.bullet.name.clone()).collect()
}

fn sync_schemas() -> SchemaStore {
    let schemas = SchemaStore::new();
    let settings = |name: &str, mode| SchemaSettings {
        schema_name: name.to_string(),
        project: proj(),
        processing_mode: mode,
        is_agent: false,
        multi_files_output: false,
        override_files: true,
        input_extension: None,
        purpose: String::new(),
        visible_to_agent: true,
    };
    let schema = |name: &str| Schema {
        name: name.to_string(),
        sections: Vec::new(),
    };
    schemas
        .replace_project(
            &proj(),
            vec![
                (schema("to-raw"), settings("to-raw", ProcessingMode::SyncRaw)),
                (schema("to-bullets"), settings("to-bullets", ProcessingMode::SyncBullets)),
                (schema("edit"), settings("edit", ProcessingMode::Single)),
            ],
        )
        .unwrap();
    schemas
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn each_drift_state_lands_in_one_set() {
    let store = mixed_store();
    let plan = plan(&store, &proj(), &PlanOptions::default()).unwrap();

    assert_eq!(names(&plan.raw_needing_creation), vec!["new.dart.pseudo"]);
    assert_eq!(
        names(&plan.raw_needing_update),
        vec!["both.dart.pseudo", "bullet_edited.dart.pseudo"]
    );
    assert_eq!(names(&plan.bullets_needing_update), vec!["raw_edited.dart.pseudo"]);
    assert_eq!(plan.in_sync, 1);

    let summary = plan.summary();
    assert_eq!(summary.raw_needing_creation, 1);
    assert_eq!(summary.raw_needing_update, 2);
    assert_eq!(summary.bullets_needing_update, 1);
}

#[test]
fn sets_are_disjoint_and_cover_every_unreconciled_bullet() {
    let store = mixed_store();
    let plan = plan(&store, &proj(), &PlanOptions::default()).unwrap();

    let mut seen = HashSet::new();
    for pair in plan
        .bullets_needing_update
        .iter()
        .chain(&plan.raw_needing_creation)
        .chain(&plan.raw_needing_update)
    {
        assert!(seen.insert(pair.bullet.id), "bullet in two sets: {}", pair.bullet.name);
    }
    let bullets = store
        .live_files(&proj())
        .unwrap()
        .into_iter()
        .filter(|n| n.is_bullet())
        .count();
    assert_eq!(seen.len() + plan.in_sync, bullets);
}

#[test]
fn force_overrides_every_paired_row() {
    let store = mixed_store();
    let options = PlanOptions {
        force: Some(Direction::BulletsFromRaw),
        ..PlanOptions::default()
    };
    let plan = plan(&store, &proj(), &options).unwrap();
    assert_eq!(plan.bullets_needing_update.len(), 4);
    assert_eq!(plan.raw_needing_creation.len(), 1);
    assert!(plan.raw_needing_update.is_empty());
    assert_eq!(plan.in_sync, 0);
}

#[test]
fn deleted_raw_counts_as_missing() {
    let store = mixed_store();
    store.mark_to_delete(&proj(), "/lib/synced.dart").unwrap();
    let plan = plan(&store, &proj(), &PlanOptions::default()).unwrap();
    assert!(names(&plan.raw_needing_creation).contains(&"synced.dart.pseudo".to_string()));
}

#[test]
fn applying_results_reconciles_the_project() {
    let store = mixed_store();
    let first = plan(&store, &proj(), &PlanOptions::default()).unwrap();
    for pair in first.pairs_for(Direction::RawFromBullets) {
        apply_raw(&store, pair.bullet.id, pair.raw_id(), "regenerated()\n").unwrap();
    }
    for pair in first.pairs_for(Direction::BulletsFromRaw) {
        let raw = pair.raw_id().unwrap();
        apply_bullets(&store, pair.bullet.id, raw, "- regenerated\n").unwrap();
    }

    let second = plan(&store, &proj(), &PlanOptions::default()).unwrap();
    assert!(second.pairs_for(Direction::RawFromBullets).is_empty());
    assert!(second.pairs_for(Direction::BulletsFromRaw).is_empty());
    assert_eq!(second.in_sync, 5);
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

#[test]
fn seed_job_carries_parallel_ids() {
    let store = mixed_store();
    let schemas = sync_schemas();
    let jobs = JobStore::new();

    let (_, id) = seed_job(
        &store,
        &schemas,
        &jobs,
        &proj(),
        "to-raw",
        &PlanOptions::default(),
        Some("local".into()),
    )
    .unwrap();
    let job = jobs.get(id.unwrap()).unwrap().unwrap();

    assert_eq!(job.status, JobStatus::Submitted);
    assert_eq!(job.path, "/");
    assert_eq!(job.sync_bullet_file_ids.len(), 3);
    assert_eq!(job.sync_raw_file_ids.len(), 3);
    assert_eq!(job.sync_raw_file_ids[0], None, "creation pairs come first");
    assert!(job.sync_raw_file_ids[1..].iter().all(Option::is_some));
}

#[test]
fn seed_job_skips_when_nothing_is_stale() {
    let store = FileStore::new();
    let b = write(&store, "/a.dart.pseudo", "- a");
    let r = write(&store, "/a.dart", "a()");
    store.mark_synced(b, r).unwrap();
    let jobs = JobStore::new();

    let (plan, id) = seed_job(
        &store,
        &sync_schemas(),
        &jobs,
        &proj(),
        "to-bullets",
        &PlanOptions::default(),
        None,
    )
    .unwrap();
    assert!(id.is_none());
    assert_eq!(plan.in_sync, 1);
    assert!(jobs.list(&proj()).unwrap().is_empty());
}

#[test]
fn seed_job_rejects_non_sync_schemas() {
    let store = mixed_store();
    let schemas = sync_schemas();
    let jobs = JobStore::new();
    let opts = PlanOptions::default();

    let err = seed_job(&store, &schemas, &jobs, &proj(), "edit", &opts, None).unwrap_err();
    assert!(matches!(err, SyncError::NotASyncSchema(name) if name == "edit"));
    let err = seed_job(&store, &schemas, &jobs, &proj(), "nope", &opts, None).unwrap_err();
    assert!(matches!(err, SyncError::UnknownSchema(_)));
}

// ---------------------------------------------------------------------------
// Disk
// ---------------------------------------------------------------------------

#[test]
fn import_then_export_mirrors_tree() {
    let src = TempDir::new().unwrap();
    fs::create_dir_all(src.path().join("lib")).unwrap();
    fs::create_dir_all(src.path().join(".git")).unwrap();
    fs::write(src.path().join("lib/main.dart"), "void main() {}\n").unwrap();
    fs::write(src.path().join("lib/main.dart.pseudo"), "- main\n").unwrap();
    fs::write(src.path().join(".git/HEAD"), "ref").unwrap();
    fs::write(src.path().join("logo.png"), [0xffu8, 0xfe, 0x00]).unwrap();

    let store = FileStore::new();
    let report = import_dir(&store, &proj(), src.path()).unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped.len(), 1);
    let bullet = store.find(&proj(), "/lib/main.dart.pseudo").unwrap().unwrap();
    assert_eq!(
        store.content(bullet.id).unwrap().unwrap().kind,
        ContentKind::Bullet
    );

    let dest = TempDir::new().unwrap();
    let writes = export_project(&store, &proj(), dest.path(), false).unwrap();
    assert_eq!(writes.len(), 2);
    assert_eq!(
        fs::read_to_string(dest.path().join("lib/main.dart")).unwrap(),
        "void main() {}\n"
    );

    let again = export_project(&store, &proj(), dest.path(), false).unwrap();
    assert!(again.iter().all(|w| matches!(w, WriteResult::Unchanged { .. })));
}

#[test]
fn export_dry_run_touches_nothing() {
    let store = FileStore::new();
    write(&store, "/lib/a.dart", "a()");
    let dest = TempDir::new().unwrap();
    let writes = export_project(&store, &proj(), dest.path(), true).unwrap();
    assert!(matches!(writes[0], WriteResult::WouldWrite { .. }));
    assert!(!dest.path().join("lib").exists());
}
