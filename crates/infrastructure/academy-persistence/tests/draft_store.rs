use academy_persistence::{DbState, DraftSnapshot, DraftStore, RedbDraftStore, CURRENT_SCHEMA};
use camino::Utf8PathBuf;
use chrono::{Duration, Utc};
use redb::TableDefinition;
use uuid::Uuid;

const META: TableDefinition<&str, &str> = TableDefinition::new("meta");

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

fn snapshot(title: &str, age_minutes: i64) -> DraftSnapshot {
    DraftSnapshot {
        session_id: Uuid::new_v4(),
        saved_at: Utc::now() - Duration::minutes(age_minutes),
        step: "modules".into(),
        course_title: title.into(),
        state: serde_json::json!({ "course": { "title": title } }),
    }
}

#[test]
fn missing_store_reads_as_empty() {
    let (_dir, root) = temp_root();
    let store = RedbDraftStore::in_dir(&root);
    assert_eq!(store.validate().unwrap(), DbState::Missing);
    assert!(store.list_drafts().unwrap().is_empty());
    assert!(store.load_draft(&Uuid::new_v4()).unwrap().is_none());
    assert!(!store.delete_draft(&Uuid::new_v4()).unwrap());
}

#[test]
fn saved_drafts_can_be_loaded_listed_and_deleted() {
    let (_dir, root) = temp_root();
    let store = RedbDraftStore::in_dir(&root);

    let older = snapshot("Older course", 30);
    let newer = snapshot("Newer course", 1);
    store.save_draft(&older).unwrap();
    store.save_draft(&newer).unwrap();
    assert_eq!(store.validate().unwrap(), DbState::Valid);

    let loaded = store.load_draft(&older.session_id).unwrap().unwrap();
    assert_eq!(loaded, older);

    let listed = store.list_drafts().unwrap();
    let titles: Vec<_> = listed.iter().map(|d| d.course_title.as_str()).collect();
    assert_eq!(titles, vec!["Newer course", "Older course"]);

    assert!(store.delete_draft(&older.session_id).unwrap());
    assert!(store.load_draft(&older.session_id).unwrap().is_none());
    assert_eq!(store.list_drafts().unwrap().len(), 1);
}

#[test]
fn saving_twice_replaces_the_draft() {
    let (_dir, root) = temp_root();
    let store = RedbDraftStore::in_dir(&root);

    let mut draft = snapshot("First title", 0);
    store.save_draft(&draft).unwrap();
    draft.course_title = "Second title".into();
    draft.step = "lessons".into();
    store.save_draft(&draft).unwrap();

    let listed = store.list_drafts().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].course_title, "Second title");
    assert_eq!(listed[0].step, "lessons");
}

#[test]
fn corrupt_store_is_quarantined_and_recreated_on_save() {
    let (_dir, root) = temp_root();
    let db_path = root.join("academy.redb");
    std::fs::write(&db_path, b"definitely-not-a-redb-database").unwrap();

    let store = RedbDraftStore::in_dir(&root);
    assert_eq!(store.validate().unwrap(), DbState::Corrupt);
    assert!(!db_path.exists());

    let quarantines: Vec<_> = std::fs::read_dir(&root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.starts_with("academy.redb.corrupt-"))
        .collect();
    assert_eq!(quarantines.len(), 1, "expected exactly one quarantine");

    let draft = snapshot("Recovered", 0);
    store.save_draft(&draft).unwrap();
    assert!(db_path.exists());
    assert!(store.load_draft(&draft.session_id).unwrap().is_some());
}

#[test]
fn newer_schema_is_reported_without_quarantine() {
    let (_dir, root) = temp_root();
    let db_path = root.join("academy.redb");

    let db = redb::Database::create(db_path.as_std_path()).unwrap();
    let write_tx = db.begin_write().unwrap();
    {
        let mut meta = write_tx.open_table(META).unwrap();
        let schema_version = (CURRENT_SCHEMA + 1).to_string();
        meta.insert("format", "academy-drafts").unwrap();
        meta.insert("schema_version", schema_version.as_str()).unwrap();
        meta.insert("created_at", "2020-01-01T00:00:00Z").unwrap();
    }
    write_tx.commit().unwrap();
    drop(db);

    let store = RedbDraftStore::in_dir(&root);
    assert_eq!(
        store.validate().unwrap(),
        DbState::NewerSchema {
            found: CURRENT_SCHEMA + 1,
            supported: CURRENT_SCHEMA
        }
    );
    assert!(db_path.exists(), "newer schema should not be quarantined");
}
