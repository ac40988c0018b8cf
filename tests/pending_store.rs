use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use diecast_scanner::{
    AnalysisRecord, Clock, DetectedType, PendingScanResult, PendingStore, SlotStore,
    SqliteSlotStore, PENDING_RESULT_TTL,
};
use tempfile::TempDir;

struct ManualClock(Arc<AtomicU64>);

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn sample_result() -> PendingScanResult {
    let mut record = AnalysisRecord::new("Ferrari", "250 GTO", Some(1962));
    record.real_car_photos = Some(vec![
        "https://photos.example/ferrari/1.jpg".to_string(),
        "https://photos.example/ferrari/2.jpg".to_string(),
    ]);
    PendingScanResult {
        captured_image_ref: "capture:0011223344".to_string(),
        analysis_results: vec![record],
        detected_type: DetectedType::Collectible,
        captured_at_epoch_ms: 42_000,
    }
}

#[test]
fn pending_record_survives_a_process_restart() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("scanner.db");
    let db_path = db_path.to_str().expect("utf-8 path");
    let now = Arc::new(AtomicU64::new(100_000));

    let result = sample_result();
    {
        let slot = SqliteSlotStore::open(db_path).expect("open slot");
        let mut store = PendingStore::new(Box::new(slot), Box::new(ManualClock(now.clone())));
        store.save(&result);
    } // store dropped: the "process" dies here

    let slot = SqliteSlotStore::open(db_path).expect("reopen slot");
    let mut store = PendingStore::new(Box::new(slot), Box::new(ManualClock(now)));
    let record = store.load().expect("pending record after restart");
    assert_eq!(record.result, result);
    assert_eq!(record.stored_at_epoch_ms, 100_000);
    assert!(store.has_pending());
}

#[test]
fn expiry_applies_across_restarts() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("scanner.db");
    let db_path = db_path.to_str().expect("utf-8 path");
    let ttl_ms = PENDING_RESULT_TTL.as_millis() as u64;
    let now = Arc::new(AtomicU64::new(100_000));

    {
        let slot = SqliteSlotStore::open(db_path).expect("open slot");
        let mut store = PendingStore::new(Box::new(slot), Box::new(ManualClock(now.clone())));
        store.save(&sample_result());
    }

    now.store(100_000 + ttl_ms + 1, Ordering::SeqCst);
    let slot = SqliteSlotStore::open(db_path).expect("reopen slot");
    let mut store = PendingStore::new(Box::new(slot), Box::new(ManualClock(now)));
    assert!(store.load().is_none());
    assert!(!store.has_pending());

    // The expired record was deleted from the slot, not just hidden.
    let mut raw = SqliteSlotStore::open(db_path).expect("reopen raw");
    assert!(raw.read().expect("read slot").is_none());
}

#[test]
fn corrupt_slot_is_cleared_on_load() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("scanner.db");
    let db_path = db_path.to_str().expect("utf-8 path");

    {
        let mut raw = SqliteSlotStore::open(db_path).expect("open raw");
        raw.write(r#"{"result": "half a record"#).expect("write junk");
    }

    let slot = SqliteSlotStore::open(db_path).expect("open slot");
    let now = Arc::new(AtomicU64::new(1_000));
    let mut store = PendingStore::new(Box::new(slot), Box::new(ManualClock(now)));
    assert!(store.load().is_none());

    let mut raw = SqliteSlotStore::open(db_path).expect("reopen raw");
    assert!(raw.read().expect("read slot").is_none());
}

#[test]
fn save_clear_load_leaves_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("scanner.db");
    let db_path = db_path.to_str().expect("utf-8 path");
    let now = Arc::new(AtomicU64::new(1_000));

    let slot = SqliteSlotStore::open(db_path).expect("open slot");
    let mut store = PendingStore::new(Box::new(slot), Box::new(ManualClock(now)));
    store.save(&sample_result());
    store.clear();
    assert!(!store.has_pending());
    assert!(store.load().is_none());
}
