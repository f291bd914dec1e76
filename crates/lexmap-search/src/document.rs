//! Record to Tantivy document mapping.
//!
//! `build_store_schema` derives the index schema from a record's bindings;
//! `record_to_doc` and `doc_to_record` move values through the field codec.

use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions, Value,
    STORED, STRING,
};
use tantivy::{TantivyDocument, Term};

use lexmap_analysis::TEXT_ANALYZER;
use lexmap_types::RecordId;

use crate::codec::{FieldCodec, FieldKind, FieldPayload, FieldValue};
use crate::error::{CodecError, SearchError};
use crate::schema::{FieldBinding, FieldRole, Record, RecordSchema, IMPLICIT_ID_FIELD};
use crate::spatial::SpatialStrategy;

fn numeric_options() -> NumericOptions {
    NumericOptions::default()
        .set_indexed()
        .set_stored()
        .set_fast()
}

fn analyzed_options() -> TextOptions {
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(TEXT_ANALYZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    TextOptions::default().set_indexing_options(indexing)
}

/// Build the Tantivy schema for a record type.
pub fn build_store_schema<T: Record>(schema: &RecordSchema<T>) -> Schema {
    let mut builder = Schema::builder();

    if schema.identity().is_none() {
        builder.add_text_field(IMPLICIT_ID_FIELD, STRING | STORED);
    }

    for binding in schema.bindings() {
        match binding.kind {
            FieldKind::Int => {
                builder.add_i64_field(&binding.field_name, numeric_options());
            }
            FieldKind::UInt => {
                builder.add_u64_field(&binding.field_name, numeric_options());
            }
            FieldKind::Float => {
                builder.add_f64_field(&binding.field_name, numeric_options());
            }
            FieldKind::Identity
            | FieldKind::Text
            | FieldKind::Date
            | FieldKind::Geo
            | FieldKind::Structured => {
                builder.add_text_field(&binding.field_name, STRING | STORED);
            }
        }

        if let Some(analysis) = &binding.analysis_name {
            builder.add_text_field(analysis, analyzed_options());
        }

        if let Some(prefix) = &binding.spatial_prefix {
            let strategy = SpatialStrategy::from_prefix(prefix);
            builder.add_text_field(strategy.point_field(), STORED);
            builder.add_f64_field(&strategy.x_field(), numeric_options());
            builder.add_f64_field(&strategy.y_field(), numeric_options());
        }
    }

    builder.build()
}

fn add_payload(doc: &mut TantivyDocument, field: Field, payload: &FieldPayload) {
    match payload {
        FieldPayload::Text(s) => doc.add_text(field, s),
        FieldPayload::I64(n) => doc.add_i64(field, *n),
        FieldPayload::U64(n) => doc.add_u64(field, *n),
        FieldPayload::F64(n) => doc.add_f64(field, *n),
    }
}

fn read_payload<'a>(value: impl Value<'a>, kind: FieldKind) -> Option<FieldPayload> {
    match kind {
        FieldKind::Int => value.as_i64().map(FieldPayload::I64),
        FieldKind::UInt => value.as_u64().map(FieldPayload::U64),
        FieldKind::Float => value.as_f64().map(FieldPayload::F64),
        _ => value.as_str().map(|s| FieldPayload::Text(s.to_string())),
    }
}

/// Stored payload of a raw field, if the document has one.
pub(crate) fn stored_payload(
    doc: &TantivyDocument,
    field: Field,
    kind: FieldKind,
) -> Option<FieldPayload> {
    doc.get_first(field).and_then(|v| read_payload(v, kind))
}

/// Encode `record` into a document.
///
/// `implicit_id` is written to the implicit identity field for records that
/// declare no identity property.
pub fn record_to_doc<T: Record>(
    schema: &RecordSchema<T>,
    store: &Schema,
    codec: &FieldCodec,
    record: &T,
    implicit_id: Option<&RecordId>,
) -> Result<TantivyDocument, SearchError> {
    let mut doc = TantivyDocument::default();

    if let Some(id) = implicit_id {
        doc.add_text(store.get_field(IMPLICIT_ID_FIELD)?, id.as_str());
    }

    for (index, binding) in schema.bindings().iter().enumerate() {
        let value = schema
            .read(index, record)
            .map_err(|e| e.in_field(&binding.field_name))?;
        let Some(value) = value else {
            continue;
        };

        let payload = codec
            .encode(&value, binding.kind)
            .map_err(|e| e.in_field(&binding.field_name))?;
        add_payload(&mut doc, store.get_field(&binding.field_name)?, &payload);

        if let Some(analysis) = &binding.analysis_name {
            doc.add_text(store.get_field(analysis)?, payload.to_text());
        }

        if binding.role == FieldRole::Geo {
            add_spatial_fields(&mut doc, store, binding, &value)?;
        }
    }

    Ok(doc)
}

fn add_spatial_fields(
    doc: &mut TantivyDocument,
    store: &Schema,
    binding: &FieldBinding,
    value: &FieldValue,
) -> Result<(), SearchError> {
    let (Some(prefix), FieldValue::Geo(point)) = (&binding.spatial_prefix, value) else {
        return Ok(());
    };
    let strategy = SpatialStrategy::from_prefix(prefix);
    for (name, payload) in strategy.point_fields(point) {
        add_payload(doc, store.get_field(&name)?, &payload);
    }
    Ok(())
}

/// Decode a stored document back into a record.
///
/// Fields missing from the document keep the record's default value; a field
/// that is present but cannot be decoded fails the whole record.
pub fn doc_to_record<T: Record>(
    schema: &RecordSchema<T>,
    store: &Schema,
    codec: &FieldCodec,
    doc: &TantivyDocument,
) -> Result<T, SearchError> {
    let mut record = T::default();

    for (index, binding) in schema.bindings().iter().enumerate() {
        let field = store.get_field(&binding.field_name)?;
        let Some(stored) = doc.get_first(field) else {
            continue;
        };
        let payload = read_payload(stored, binding.kind).ok_or_else(|| {
            CodecError::KindMismatch {
                expected: binding.kind,
                found: "incompatible stored value".to_string(),
            }
            .in_field(&binding.field_name)
        })?;
        let value = codec
            .decode(&payload, binding.kind)
            .map_err(|e| e.in_field(&binding.field_name))?;
        schema
            .write(index, &mut record, value)
            .map_err(|e| e.in_field(&binding.field_name))?;
    }

    Ok(record)
}

/// Identity of `record` as stored, or `None` if it has not been assigned.
pub(crate) fn record_identity<T: Record>(
    schema: &RecordSchema<T>,
    record: &T,
) -> Result<Option<RecordId>, CodecError> {
    let Some(index) = schema.identity_index() else {
        return Ok(None);
    };
    let id = match schema.read(index, record)? {
        Some(FieldValue::Id(id)) => id,
        Some(FieldValue::Text(s)) => RecordId::new(s),
        _ => RecordId::default(),
    };
    Ok((!id.is_empty()).then_some(id))
}

/// Delete term addressing the document with identity `id`.
pub(crate) fn identity_term<T: Record>(
    schema: &RecordSchema<T>,
    store: &Schema,
    id: &RecordId,
) -> Result<Term, SearchError> {
    let field = store.get_field(schema.identity_field())?;
    Ok(Term::from_field_text(field, id.as_str()))
}
