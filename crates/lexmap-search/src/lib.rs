//! # lexmap-search
//!
//! Typed record mapping and query construction over a Tantivy index.
//!
//! Record types describe their properties once through [`Record`]; the crate
//! resolves those descriptions into field bindings, encodes records into
//! documents, and compiles search clauses into Tantivy queries.
//!
//! ## Features
//! - Declarative field roles: analyzed, stored, geo, no-index
//! - Fixed-format codec for dates, numbers, geo points and JSON values
//! - Term, like, fuzzy, exact, range and area clauses with boost and occurrence
//! - Area search with great-circle distance on every hit
//! - Deterministic paging and in-memory sort over stored values

pub mod codec;
pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod paginate;
pub mod query;
pub mod schema;
pub mod searcher;
pub mod spatial;

pub use codec::{FieldCodec, FieldKind, FieldPayload, FieldType, FieldValue, Json, DATE_FORMAT};
pub use document::{build_store_schema, doc_to_record, record_to_doc};
pub use error::{CodecError, QueryCompositionError, SchemaError, SearchError};
pub use index::{DocumentStore, StoreConfig};
pub use indexer::Indexer;
pub use paginate::{page_count, paginate};
pub use query::{
    Occurrence, QueryBuilder, QueryDescriptor, RangeBounds, SearchClause, SortKey, SortOption,
};
pub use schema::{
    resolve, FieldBinding, FieldMarker, FieldRole, Record, RecordSchema, SchemaBuilder,
    SchemaCache,
};
pub use searcher::{ResultPage, SearchHit, SearchRequest, Searcher};
pub use spatial::{distance_km, SearchArea, SpatialStrategy, DEFAULT_RADIUS_KM};

pub use lexmap_types::{GeoPoint, IdGenerator, RecordId, ShortIdGenerator, UlidGenerator};
