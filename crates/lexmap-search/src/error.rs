//! Search error types.

use thiserror::Error;

use crate::codec::FieldKind;

/// Errors found while resolving a record's field bindings.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// More than one property carries the geo marker
    #[error("Record {record} declares more than one geo field: {first} and {second}")]
    DuplicateGeo {
        record: String,
        first: String,
        second: String,
    },

    /// More than one property carries an identity
    #[error("Record {record} declares more than one identity: {first} and {second}")]
    DuplicateIdentity {
        record: String,
        first: String,
        second: String,
    },

    /// Two bindings produce the same document field
    #[error("Record {record} maps more than one property to field {field}")]
    DuplicateField { record: String, field: String },

    /// The geo marker is on a property that is not a geo point
    #[error("Property {property} of {record} is marked geo but is declared as {kind}")]
    GeoKind {
        record: String,
        property: String,
        kind: FieldKind,
    },

    /// Lookup of a property the record does not declare
    #[error("Record {record} has no indexed property {property}")]
    UnknownProperty { record: String, property: String },

    /// Area search on a record without a geo field
    #[error("Record {0} has no geo field")]
    NoGeoField(String),
}

/// Errors converting between typed values and field payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload or value does not match the declared kind
    #[error("expected {expected} value, found {found}")]
    KindMismatch { expected: FieldKind, found: String },

    /// Date payload not in yyyyMMddHHmmss form
    #[error("invalid date '{0}', expected yyyyMMddHHmmss")]
    InvalidDate(String),

    /// Geo payload not in `<lat>;<lon>` form
    #[error("invalid geo point '{0}', expected '<lat>;<lon>'")]
    InvalidGeo(String),

    /// Stored number does not fit the declared type
    #[error("value {0} is out of range for the declared type")]
    OutOfRange(String),

    /// Structured-text payload could not be (de)serialized
    #[error("structured value: {0}")]
    Structured(#[from] serde_json::Error),

    /// A codec error attributed to one document field
    #[error("field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    pub(crate) fn in_field(self, field: &str) -> Self {
        match self {
            CodecError::Field { .. } => self,
            other => CodecError::Field {
                field: field.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Misuse of the query construction API.
#[derive(Debug, Error)]
pub enum QueryCompositionError {
    /// A request may carry a single area clause
    #[error("A search request may contain at most one area clause")]
    DuplicateArea,

    /// Area radius must be positive and finite
    #[error("Area radius must be a positive number of kilometres, got {0}")]
    InvalidRadius(f64),

    /// Literal cannot be converted to the field's declared type
    #[error("Invalid literal '{literal}' for field {field}: {reason}")]
    InvalidLiteral {
        field: String,
        literal: String,
        reason: String,
    },

    /// Range bounds do not fit the field's declared type
    #[error("Range over field {field} does not match its declared type {kind}")]
    RangeKind { field: String, kind: FieldKind },
}

/// Errors that can occur during index and search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// Query parse error
    #[error("Query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema resolution error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Field encode/decode error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Query composition error
    #[error("Query error: {0}")]
    Query(#[from] QueryCompositionError),

    /// Analyzer selection error
    #[error("Analysis error: {0}")]
    Analysis(#[from] lexmap_analysis::AnalysisError),

    /// The index has not been created yet
    #[error("The index {name} was not found at path {path}")]
    IndexUnavailable { name: String, path: String },

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Index is locked (writer mutex poisoned or held elsewhere)
    #[error("Index is locked: {0}")]
    IndexLocked(String),
}
