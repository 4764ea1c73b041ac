use std::path::Path;

use tempfile::TempDir;

use evcal::{
    calendar::Calendar,
    persist::{BlobStore, json_file::JsonFileStore, sqlite::SqliteBlobStore},
    runtime::scheduler::Scheduler,
};

#[test]
fn json_file_store_round_trips_and_treats_missing_file_as_empty() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("nested").join("calendar.json");

    let mut store = JsonFileStore::new(&path);
    assert!(store.load().expect("load missing").is_empty());

    store.save(br#"{"a":1}"#).expect("save");
    store.save(br#"{"b":2}"#).expect("overwrite");
    assert_eq!(store.load().expect("load"), br#"{"b":2}"#.to_vec());
    assert!(store.name().ends_with("calendar.json"));
    assert!(!path.with_file_name("calendar.json.tmp").exists());
}

#[test]
fn sqlite_store_keeps_documents_apart() {
    let tmp = TempDir::new().expect("tmp");
    let db = tmp.path().join("evcal.db");

    let mut calendar_doc = SqliteBlobStore::open(&db, "calendar").expect("open calendar");
    let mut history_doc = SqliteBlobStore::open(&db, "history").expect("open history");
    assert!(calendar_doc.load().expect("empty").is_empty());
    assert!(calendar_doc.updated_ms().expect("ts").is_none());

    calendar_doc.save(b"{}").expect("save calendar");
    history_doc.save(b"[]").expect("save history");
    calendar_doc.save(br#"{"x":null}"#).expect("replace calendar");
    drop(calendar_doc);
    drop(history_doc);

    let calendar_doc = SqliteBlobStore::open(&db, "calendar").expect("reopen");
    let history_doc = SqliteBlobStore::open(&db, "history").expect("reopen");
    assert_eq!(calendar_doc.load().expect("load"), br#"{"x":null}"#.to_vec());
    assert_eq!(history_doc.load().expect("load"), b"[]".to_vec());
    assert!(calendar_doc.updated_ms().expect("ts").is_some());
    assert!(calendar_doc.name().ends_with("#calendar"));
}

fn open_backend(label: &str, dir: &Path) -> Box<dyn BlobStore> {
    match label {
        "json" => Box::new(JsonFileStore::new(dir.join("calendar_data.json"))),
        _ => Box::new(SqliteBlobStore::open(dir.join("calendar.db"), "calendar").expect("sqlite")),
    }
}

#[tokio::test]
async fn calendar_survives_restart_on_each_backend() {
    let tmp = TempDir::new().expect("tmp");

    for label in ["json", "sqlite"] {
        let (mut calendar, _rx) = Calendar::new(open_backend(label, tmp.path()), Scheduler::current());
        let event = calendar
            .add_event("Team sync", "2025-06-01 09:00", "medium")
            .expect("add");
        calendar.close().expect("close");

        let (mut reopened, _rx) = Calendar::new(open_backend(label, tmp.path()), Scheduler::current());
        reopened.load().expect("load");
        let restored = reopened
            .get_event(event.id())
            .unwrap_or_else(|| panic!("{label}: event lost"));
        assert_eq!(restored.title(), "Team sync");
        assert_eq!(restored.priority(), event.priority());
    }
}

#[test]
fn sqlite_in_memory_store_works() {
    let mut store = SqliteBlobStore::open_in_memory("calendar").expect("open");
    store.save(b"{}").expect("save");
    assert_eq!(store.load().expect("load"), b"{}".to_vec());
}
