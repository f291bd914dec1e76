//! End-to-end test infrastructure for lexmap.
//!
//! Provides a shared TestHarness and a sample record type for tests that
//! run the full save-to-search path against an on-disk index.

use std::sync::Once;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use lexmap_search::{
    resolve, DocumentStore, Indexer, Json, Record, SchemaBuilder, Searcher, StoreConfig,
};
use lexmap_types::{GeoPoint, RecordId, Settings};

/// Shared test harness for E2E tests.
///
/// Owns a temp directory used as the index root.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Store configuration rooted in the temp dir
    pub config: StoreConfig,
}

impl TestHarness {
    /// Create a new test harness with a temp index root.
    pub fn new() -> Self {
        init_tracing();
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let config = StoreConfig::new(temp_dir.path());
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Harness with a custom configuration; the index root is replaced.
    pub fn with_config(config: StoreConfig) -> Self {
        let mut harness = Self::new();
        harness.config = StoreConfig {
            index_root: harness.config.index_root.clone(),
            ..config
        };
        harness
    }

    /// Open (creating if needed) the store for `T`.
    pub fn store<T: Record>(&self) -> DocumentStore {
        let schema = resolve::<T>().expect("Failed to resolve schema");
        DocumentStore::open_or_create(self.config.clone(), &schema).expect("Failed to open store")
    }

    /// Save `records` in one batch and return a fresh searcher.
    pub fn seed<T: Record>(&self, records: &mut [T]) -> Searcher<T> {
        let store = self.store::<T>();
        {
            let indexer = Indexer::<T>::new(&store).expect("Failed to create indexer");
            indexer.save_batch(records).expect("Failed to save batch");
        }
        Searcher::<T>::new(&store).expect("Failed to create searcher")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a test subscriber once; `RUST_LOG` overrides the default level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let default_level = Settings::default().log_level;
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Opening details kept as structured text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hours {
    pub open: u8,
    pub close: u8,
}

/// Sample record covering every field role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shop {
    pub id: RecordId,
    pub name: String,
    pub category: String,
    pub stock: i64,
    pub price: f64,
    pub opened: NaiveDateTime,
    pub location: GeoPoint,
    pub hours: Json<Hours>,
    pub scratch: String,
    pub distance: f64,
}

impl Record for Shop {
    fn describe(schema: &mut SchemaBuilder<Self>) {
        schema
            .field("id", |s| &s.id, |s| &mut s.id)
            .analyzed("name", |s| &s.name, |s| &mut s.name)
            .stored_as("category", "kind", |s| &s.category, |s| &mut s.category)
            .field("stock", |s| &s.stock, |s| &mut s.stock)
            .field("price", |s| &s.price, |s| &mut s.price)
            .field("opened", |s| &s.opened, |s| &mut s.opened)
            .geo("location", |s| &s.location, |s| &mut s.location)
            .field("hours", |s| &s.hours, |s| &mut s.hours)
            .no_index("scratch")
            .no_index("distance");
    }

    fn set_distance(&mut self, distance_km: f64) {
        self.distance = distance_km;
    }
}

pub const ATHENS: GeoPoint = GeoPoint::new(37.9838, 23.7275);
pub const PIRAEUS: GeoPoint = GeoPoint::new(37.9420, 23.6465);
pub const MARATHON: GeoPoint = GeoPoint::new(38.1540, 23.9630);
pub const THESSALONIKI: GeoPoint = GeoPoint::new(40.6401, 22.9444);

/// A shop with the given name, stock and location.
pub fn shop(name: &str, stock: i64, location: GeoPoint) -> Shop {
    Shop {
        name: name.to_string(),
        category: "bakery".to_string(),
        stock,
        price: 2.5,
        opened: date(2020, 5, 17),
        location,
        hours: Json(Hours { open: 7, close: 21 }),
        ..Shop::default()
    }
}

/// Midnight of the given day.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date")
}

/// `count` shops named `shop-<n>` with stock `n`.
pub fn numbered_shops(count: usize) -> Vec<Shop> {
    (0..count)
        .map(|n| shop(&format!("shop-{n}"), n as i64, ATHENS))
        .collect()
}
