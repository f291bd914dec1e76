//! Save/load E2E tests for lexmap.
//!
//! Verifies that a saved record comes back from an identity lookup with every
//! stored and analyzed field intact, and that updates, deletes and clears
//! are reflected after a reader refresh.

use pretty_assertions::assert_eq;

use e2e_tests::{date, shop, Shop, TestHarness, ATHENS, PIRAEUS};
use lexmap_search::{resolve, DocumentStore, Indexer, SearchError, Searcher, StoreConfig};
use lexmap_types::{RecordId, Settings};

#[test]
fn test_save_then_search_by_identity() {
    let harness = TestHarness::new();

    let mut original = shop("Φούρνος Αυγερινός", 12, ATHENS);
    original.opened = date(1998, 3, 25);
    original.scratch = "draft".to_string();
    let mut batch = vec![original.clone(), shop("Άλλος φούρνος", 3, PIRAEUS)];
    let searcher = harness.seed(&mut batch);

    let id = batch[0].id.clone();
    assert!(!id.is_empty(), "identity should be generated on save");

    let found = searcher
        .search_by_field("id", &id)
        .unwrap()
        .expect("record should be found by identity");

    let expected = Shop {
        id,
        scratch: String::new(),
        ..original
    };
    assert_eq!(found, expected);
}

#[test]
fn test_existing_identity_is_kept() {
    let harness = TestHarness::new();
    let mut record = shop("Γωνία", 1, ATHENS);
    record.id = RecordId::new("shop-001");
    let searcher = harness.seed(std::slice::from_mut(&mut record));

    assert_eq!(record.id.as_str(), "shop-001");
    let found = searcher.search_exact_one("id", "shop-001").unwrap();
    assert_eq!(found.map(|s| s.name), Some("Γωνία".to_string()));
}

#[test]
fn test_update_replaces_document() {
    let harness = TestHarness::new();
    let store = harness.store::<Shop>();
    let indexer = Indexer::<Shop>::new(&store).unwrap();
    let searcher = Searcher::<Shop>::new(&store).unwrap();

    let mut record = shop("Πρώτο όνομα", 5, ATHENS);
    let id = indexer.save(&mut record).unwrap();
    record.name = "Δεύτερο όνομα".to_string();
    record.stock = 6;
    indexer.save(&mut record).unwrap();

    searcher.refresh().unwrap();
    assert_eq!(searcher.count(), 1);
    let found = searcher.search_by_field("id", &id).unwrap().unwrap();
    assert_eq!(found.name, "Δεύτερο όνομα");
    assert_eq!(found.stock, 6);
}

#[test]
fn test_delete_and_clear() {
    let harness = TestHarness::new();
    let store = harness.store::<Shop>();
    let indexer = Indexer::<Shop>::new(&store).unwrap();
    let searcher = Searcher::<Shop>::new(&store).unwrap();

    let mut batch = vec![
        shop("a", 1, ATHENS),
        shop("b", 2, ATHENS),
        shop("c", 3, ATHENS),
    ];
    indexer.save_batch(&mut batch).unwrap();

    assert!(indexer.delete(&batch[0]).unwrap());
    searcher.refresh().unwrap();
    assert_eq!(searcher.count(), 2);
    assert!(searcher.search_by_field("id", &batch[0].id).unwrap().is_none());

    assert!(indexer.clear());
    searcher.refresh().unwrap();
    assert_eq!(searcher.count(), 0);
}

#[test]
fn test_records_persist_across_reopen() {
    let harness = TestHarness::new();
    let mut batch = vec![shop("Μόνιμο", 9, ATHENS)];
    drop(harness.seed(&mut batch));

    let schema = resolve::<Shop>().unwrap();
    let store = DocumentStore::open(harness.config.clone(), &schema).unwrap();
    let searcher = Searcher::<Shop>::new(&store).unwrap();
    let found = searcher.search_by_field("id", &batch[0].id).unwrap();
    assert_eq!(found.map(|s| s.stock), Some(9));
}

#[test]
fn test_open_before_create_is_unavailable() {
    let harness = TestHarness::new();
    let schema = resolve::<Shop>().unwrap();
    let result = DocumentStore::open(harness.config.clone(), &schema);
    match result {
        Err(SearchError::IndexUnavailable { name, .. }) => assert_eq!(name, "Shop"),
        other => panic!("expected IndexUnavailable, got {:?}", other.map(|s| s.path().to_path_buf())),
    }
}

#[test]
fn test_store_from_settings() {
    let harness = TestHarness::new();
    let settings = Settings {
        index_path: harness.config.index_root.to_string_lossy().to_string(),
        max_results: 50,
        ..Settings::default()
    };
    let config = StoreConfig::from_settings(&settings).unwrap();
    assert_eq!(config.max_results, 50);

    let schema = resolve::<Shop>().unwrap();
    let store = DocumentStore::open_or_create(config, &schema).unwrap();
    assert!(store.exists());
    assert_eq!(store.name(), "Shop");
}
