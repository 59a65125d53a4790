//! Tests for CollectionService
//!
//! These tests verify:
//! - Parameter validation happens before the store is touched
//! - Store outcomes map to the right error kinds
//! - The listing payload
//! - Scrub / repartition existence checks
//! - Lock discipline under concurrent callers

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use colstore::admin::{AdminRequest, ErrorKind, Listing, Reply};
use colstore::config::Config;
use colstore::engine::{CollectionInfo, CollectionStore, Database, ScrubReport};
use colstore::{CollectionService, Result, StoreError};
use tempfile::TempDir;

// =============================================================================
// Recording Store
// =============================================================================

/// In-memory store that counts calls and detects overlapping calls
#[derive(Default)]
struct RecordingStore {
    collections: BTreeMap<String, usize>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    scrubbed: Vec<String>,
    repartitioned: Vec<(String, i64)>,
    flushes: usize,
    delay: Option<Duration>,
}

impl RecordingStore {
    fn with_collection(mut self, name: &str, partitions: usize) -> Self {
        self.collections.insert(name.to_string(), partitions);
        self
    }

    fn enter(&self) -> InFlight {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        InFlight(Arc::clone(&self.in_flight))
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CollectionStore for RecordingStore {
    fn create(&mut self, name: &str, partitions: i64) -> Result<()> {
        let _guard = self.enter();
        if self.collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        if partitions <= 0 {
            return Err(StoreError::InvalidPartitionCount(partitions));
        }
        self.collections.insert(name.to_string(), partitions as usize);
        Ok(())
    }

    fn list_all(&self) -> BTreeMap<String, CollectionInfo> {
        let _guard = self.enter();
        self.collections
            .iter()
            .map(|(name, partitions)| (name.clone(), CollectionInfo { partitions: *partitions }))
            .collect()
    }

    fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let _guard = self.enter();
        if self.collections.contains_key(new) {
            return Err(StoreError::CollectionExists(new.to_string()));
        }
        let partitions = self
            .collections
            .remove(old)
            .ok_or_else(|| StoreError::CollectionNotFound(old.to_string()))?;
        self.collections.insert(new.to_string(), partitions);
        Ok(())
    }

    fn drop_collection(&mut self, name: &str) -> Result<()> {
        let _guard = self.enter();
        self.collections
            .remove(name)
            .map(drop)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn lookup(&self, name: &str) -> Option<CollectionInfo> {
        let _guard = self.enter();
        self.collections
            .get(name)
            .map(|partitions| CollectionInfo { partitions: *partitions })
    }

    fn scrub(&mut self, name: &str) -> Result<ScrubReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scrubbed.push(name.to_string());
        Ok(ScrubReport::default())
    }

    fn repartition(&mut self, name: &str, partitions: i64) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.repartitioned.push((name.to_string(), partitions));
        if partitions <= 0 {
            return Err(StoreError::InvalidPartitionCount(partitions));
        }
        if let Some(p) = self.collections.get_mut(name) {
            *p = partitions as usize;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let _guard = self.enter();
        self.flushes += 1;
        Err(StoreError::Storage("disk full".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn recording_service(store: RecordingStore) -> (Arc<AtomicUsize>, CollectionService<RecordingStore>) {
    let calls = Arc::clone(&store.calls);
    (calls, CollectionService::new(store))
}

fn setup_db_service() -> (TempDir, CollectionService<Database>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let db = Database::open(config).unwrap();
    (temp_dir, CollectionService::new(db))
}

fn create_req(name: &str, partitions: &str) -> AdminRequest {
    AdminRequest::new()
        .with("col", name)
        .with("numparts", partitions)
}

fn col_req(name: &str) -> AdminRequest {
    AdminRequest::new().with("col", name)
}

fn listing_of<S: CollectionStore>(service: &CollectionService<S>) -> Listing {
    match service.list().unwrap() {
        Reply::Listing(json) => serde_json::from_str(&json).unwrap(),
        other => panic!("expected listing, got {:?}", other),
    }
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_missing_parameters_never_reach_store() {
    let (calls, service) = recording_service(RecordingStore::default());

    let cases: Vec<(&str, AdminRequest)> = vec![
        ("create without col", AdminRequest::new().with("numparts", "2")),
        ("create without numparts", AdminRequest::new().with("col", "a")),
        ("rename without old", AdminRequest::new().with("new", "b")),
        ("rename without new", AdminRequest::new().with("old", "a")),
        ("drop without col", AdminRequest::new()),
        ("scrub without col", AdminRequest::new()),
        ("repartition without numparts", col_req("a")),
    ];

    for (label, request) in cases {
        let result = match label.split(' ').next().unwrap() {
            "create" => service.create(&request),
            "rename" => service.rename(&request),
            "drop" => service.drop_collection(&request),
            "scrub" => service.scrub(&request),
            _ => service.repartition(&request),
        };
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingParameter, "{}", label);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_malformed_partition_count_never_reaches_store() {
    let (calls, service) = recording_service(RecordingStore::default().with_collection("a", 1));

    let create_err = service.create(&create_req("b", "abc")).unwrap_err();
    let repart_err = service.repartition(&create_req("a", "abc")).unwrap_err();

    for err in [create_err, repart_err] {
        assert_eq!(err.kind, ErrorKind::MalformedParameter);
        assert!(err.message.contains("abc"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Create / List Tests
// =============================================================================

#[test]
fn test_create_then_list() {
    let (_temp, service) = setup_db_service();

    let reply = service.create(&create_req("events", "4")).unwrap();

    assert_eq!(reply, Reply::Created);
    assert_eq!(reply.body(), None);
    let listing = listing_of(&service);
    assert_eq!(listing.len(), 1);
    assert_eq!(listing["events"].partitions, 4);
}

#[test]
fn test_listing_json_shape() {
    let (_temp, service) = setup_db_service();
    service.create(&create_req("events", "4")).unwrap();
    service.create(&create_req("users", "1")).unwrap();

    let reply = service.list().unwrap();

    let value: serde_json::Value = serde_json::from_str(reply.body().unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "events": {"partitions": 4},
            "users": {"partitions": 1}
        })
    );
}

#[test]
fn test_create_engine_errors_carry_engine_text() {
    let (_temp, service) = setup_db_service();
    service.create(&create_req("events", "2")).unwrap();

    let dup = service.create(&create_req("events", "2")).unwrap_err();
    assert_eq!(dup.kind, ErrorKind::Conflict);
    assert_eq!(dup.message, "Collection events already exists");

    let zero = service.create(&create_req("other", "0")).unwrap_err();
    assert_eq!(zero.kind, ErrorKind::Conflict);
    assert_eq!(zero.message, "Invalid number of partitions: 0");
}

// =============================================================================
// Rename / Drop Tests
// =============================================================================

#[test]
fn test_rename_moves_name() {
    let (_temp, service) = setup_db_service();
    service.create(&create_req("a", "3")).unwrap();

    let reply = service
        .rename(&AdminRequest::new().with("old", "a").with("new", "b"))
        .unwrap();

    assert_eq!(reply, Reply::Done);
    service.with_store(|db| {
        assert_eq!(db.lookup("a"), None);
        assert_eq!(db.lookup("b"), Some(CollectionInfo { partitions: 3 }));
    });
}

#[test]
fn test_rename_missing_source_is_not_found() {
    let (_temp, service) = setup_db_service();

    let err = service
        .rename(&AdminRequest::new().with("old", "ghost").with("new", "b"))
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.kind.is_client_error());
}

#[test]
fn test_drop_missing_collection_leaves_directory() {
    let (_temp, service) = setup_db_service();
    service.create(&create_req("kept", "1")).unwrap();
    let before = listing_of(&service);

    let err = service.drop_collection(&col_req("ghost")).unwrap_err();

    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.message, "Collection ghost does not exist");
    assert_eq!(listing_of(&service), before);
}

#[test]
fn test_drop_existing_collection() {
    let (_temp, service) = setup_db_service();
    service.create(&create_req("events", "2")).unwrap();

    assert_eq!(service.drop_collection(&col_req("events")).unwrap(), Reply::Done);
    assert!(listing_of(&service).is_empty());
}

// =============================================================================
// Scrub / Repartition Tests
// =============================================================================

#[test]
fn test_scrub_and_repartition_unknown_name() {
    let store = RecordingStore::default();
    let service = CollectionService::new(store);

    let scrub = service.scrub(&col_req("ghost")).unwrap_err();
    let repart = service.repartition(&create_req("ghost", "3")).unwrap_err();

    for err in [scrub, repart] {
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Collection ghost does not exist");
    }
    let store = service.into_inner();
    assert!(store.scrubbed.is_empty());
    assert!(store.repartitioned.is_empty());
}

#[test]
fn test_scrub_existing_collection_calls_store() {
    let store = RecordingStore::default().with_collection("events", 2);
    let service = CollectionService::new(store);

    assert_eq!(service.scrub(&col_req("events")).unwrap(), Reply::Done);
    assert_eq!(service.into_inner().scrubbed, vec!["events".to_string()]);
}

#[test]
fn test_repartition_outcome_is_not_surfaced() {
    let store = RecordingStore::default().with_collection("events", 2);
    let service = CollectionService::new(store);

    // The store rejects a non-positive count, but only the existence check
    // decides the reply
    assert_eq!(service.repartition(&create_req("events", "-1")).unwrap(), Reply::Done);
    assert_eq!(service.repartition(&create_req("events", "8")).unwrap(), Reply::Done);

    let listing = listing_of(&service);
    assert_eq!(listing["events"].partitions, 8);
    assert_eq!(
        service.into_inner().repartitioned,
        vec![("events".to_string(), -1), ("events".to_string(), 8)]
    );
}

#[test]
fn test_repartition_on_database() {
    let (_temp, service) = setup_db_service();
    service.create(&create_req("events", "2")).unwrap();
    service.with_store(|db| {
        let events = db.collection_mut("events").unwrap();
        for i in 0..10 {
            events.insert(format!("event {}", i)).unwrap();
        }
    });

    service.repartition(&create_req("events", "3")).unwrap();

    assert_eq!(listing_of(&service)["events"].partitions, 3);
    service.with_store(|db| assert_eq!(db.collection("events").unwrap().count(), 10));
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_does_not_change_listing() {
    let (_temp, service) = setup_db_service();
    service.create(&create_req("events", "4")).unwrap();
    service.create(&create_req("users", "2")).unwrap();

    let before = listing_of(&service);
    assert_eq!(service.flush().unwrap(), Reply::Done);
    let after = listing_of(&service);

    assert_eq!(before, after);
}

#[test]
fn test_flush_failure_is_logged_not_returned() {
    let service = CollectionService::new(RecordingStore::default());

    assert_eq!(service.flush().unwrap(), Reply::Done);
    assert_eq!(service.into_inner().flushes, 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_create_same_name() {
    let (_temp, service) = setup_db_service();
    let service = Arc::new(service);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                service.create(&create_req("events", "2"))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind, ErrorKind::Conflict);
    }
    let listing = listing_of(&service);
    assert_eq!(listing.len(), 1);
    assert_eq!(listing["events"].partitions, 2);
}

#[test]
fn test_store_calls_never_overlap() {
    let store = RecordingStore {
        delay: Some(Duration::from_millis(2)),
        ..RecordingStore::default()
    };
    let max_in_flight = Arc::clone(&store.max_in_flight);
    let service = Arc::new(CollectionService::new(store));
    let threads = 8;

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let name = format!("c{}", i);
                service.create(&create_req(&name, "1")).unwrap();
                service.list().unwrap();
                service
                    .rename(&AdminRequest::new().with("old", name.as_str()).with("new", format!("r{}", i)))
                    .unwrap();
                service.flush().unwrap();
                service.drop_collection(&col_req(&format!("r{}", i))).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    assert!(listing_of(&service).is_empty());
}

#[test]
fn test_independent_services_do_not_share_state() {
    let (_temp_a, a) = setup_db_service();
    let (_temp_b, b) = setup_db_service();

    a.create(&create_req("only_in_a", "1")).unwrap();

    assert_eq!(listing_of(&a).len(), 1);
    assert!(listing_of(&b).is_empty());
}
