//! # lexmap-types
//!
//! Types shared by the lexmap crates.
//!
//! ## Contents
//! - `GeoPoint`: latitude/longitude pair used for spatial indexing
//! - `RecordId` and the injectable `IdGenerator` implementations
//! - `Settings`: layered configuration (defaults, file, `LEXMAP_*` env vars)

pub mod config;
pub mod error;
pub mod geo;
pub mod id;

pub use config::Settings;
pub use error::TypesError;
pub use geo::GeoPoint;
pub use id::{IdGenerator, RecordId, ShortIdGenerator, UlidGenerator};
