//! Field codec: typed property values to and from document payloads.
//!
//! Dispatch is keyed by the property's declared [`FieldKind`], never by the
//! runtime value. Dates are written as fixed-width `yyyyMMddHHmmss` strings so
//! that lexical order is chronological; numbers use the store's native numeric
//! fields; geo points use a `"<lat>;<lon>"` composite.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use lexmap_types::{GeoPoint, RecordId};

use crate::error::CodecError;

/// Date layout of stored date payloads.
pub const DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Separator between latitude and longitude in a geo payload.
pub const GEO_SEPARATOR: char = ';';

/// Declared kind of a record property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Record identity, stored as-is
    Identity,
    Text,
    /// Signed integral types (and unsigned types up to 32 bits)
    Int,
    /// Unsigned 64-bit integral types
    UInt,
    Float,
    Date,
    Geo,
    /// Anything else, carried as serialized JSON text
    Structured,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Identity => "identity",
            FieldKind::Text => "text",
            FieldKind::Int => "int",
            FieldKind::UInt => "uint",
            FieldKind::Float => "float",
            FieldKind::Date => "date",
            FieldKind::Geo => "geo",
            FieldKind::Structured => "structured",
        }
    }

    /// True when the store keeps this kind in a text field.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldKind::Identity
                | FieldKind::Text
                | FieldKind::Date
                | FieldKind::Geo
                | FieldKind::Structured
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed property value, one variant per [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Id(RecordId),
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Date(NaiveDateTime),
    Geo(GeoPoint),
    Structured(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Id(_) => FieldKind::Identity,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::UInt(_) => FieldKind::UInt,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Geo(_) => FieldKind::Geo,
            FieldValue::Structured(_) => FieldKind::Structured,
        }
    }
}

/// What the document store actually holds for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPayload {
    Text(String),
    I64(i64),
    U64(u64),
    F64(f64),
}

impl FieldPayload {
    fn describe(&self) -> &'static str {
        match self {
            FieldPayload::Text(_) => "text payload",
            FieldPayload::I64(_) => "i64 payload",
            FieldPayload::U64(_) => "u64 payload",
            FieldPayload::F64(_) => "f64 payload",
        }
    }

    /// Plain-text rendering, used to feed analyzed copies of a field.
    pub fn to_text(&self) -> String {
        match self {
            FieldPayload::Text(s) => s.clone(),
            FieldPayload::I64(n) => n.to_string(),
            FieldPayload::U64(n) => n.to_string(),
            FieldPayload::F64(n) => n.to_string(),
        }
    }
}

/// Encodes and decodes field values with a fixed, locale-independent format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCodec {
    date_format: &'static str,
    geo_separator: char,
}

impl Default for FieldCodec {
    fn default() -> Self {
        Self {
            date_format: DATE_FORMAT,
            geo_separator: GEO_SEPARATOR,
        }
    }
}

impl FieldCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_date(&self, date: &NaiveDateTime) -> String {
        date.format(self.date_format).to_string()
    }

    pub fn format_geo(&self, point: &GeoPoint) -> String {
        format!(
            "{}{}{}",
            point.latitude, self.geo_separator, point.longitude
        )
    }

    /// Encode `value` for a property declared as `kind`.
    pub fn encode(&self, value: &FieldValue, kind: FieldKind) -> Result<FieldPayload, CodecError> {
        let payload = match (kind, value) {
            (FieldKind::Identity, FieldValue::Id(id)) => FieldPayload::Text(id.to_string()),
            (FieldKind::Identity, FieldValue::Text(s)) => FieldPayload::Text(s.clone()),
            (FieldKind::Text, FieldValue::Text(s)) => FieldPayload::Text(s.clone()),
            (FieldKind::Int, FieldValue::Int(n)) => FieldPayload::I64(*n),
            (FieldKind::UInt, FieldValue::UInt(n)) => FieldPayload::U64(*n),
            (FieldKind::Float, FieldValue::Float(n)) => FieldPayload::F64(*n),
            (FieldKind::Date, FieldValue::Date(d)) => FieldPayload::Text(self.format_date(d)),
            (FieldKind::Geo, FieldValue::Geo(p)) => FieldPayload::Text(self.format_geo(p)),
            (FieldKind::Structured, FieldValue::Structured(s)) => FieldPayload::Text(s.clone()),
            (expected, other) => {
                return Err(CodecError::KindMismatch {
                    expected,
                    found: other.kind().to_string(),
                })
            }
        };
        Ok(payload)
    }

    /// Decode a stored payload for a property declared as `kind`.
    pub fn decode(&self, payload: &FieldPayload, kind: FieldKind) -> Result<FieldValue, CodecError> {
        let value = match (kind, payload) {
            (FieldKind::Identity, FieldPayload::Text(s)) => FieldValue::Id(RecordId::new(s.as_str())),
            (FieldKind::Text, FieldPayload::Text(s)) => FieldValue::Text(s.clone()),
            (FieldKind::Int, FieldPayload::I64(n)) => FieldValue::Int(*n),
            (FieldKind::UInt, FieldPayload::U64(n)) => FieldValue::UInt(*n),
            (FieldKind::Float, FieldPayload::F64(n)) => FieldValue::Float(*n),
            (FieldKind::Date, FieldPayload::Text(s)) => FieldValue::Date(
                NaiveDateTime::parse_from_str(s, self.date_format)
                    .map_err(|_| CodecError::InvalidDate(s.clone()))?,
            ),
            (FieldKind::Geo, FieldPayload::Text(s)) => FieldValue::Geo(self.parse_geo(s)?),
            (FieldKind::Structured, FieldPayload::Text(s)) => {
                // validate here so a corrupt payload fails at decode time
                serde_json::from_str::<serde_json::Value>(s)?;
                FieldValue::Structured(s.clone())
            }
            (expected, other) => {
                return Err(CodecError::KindMismatch {
                    expected,
                    found: other.describe().to_string(),
                })
            }
        };
        Ok(value)
    }

    fn parse_geo(&self, s: &str) -> Result<GeoPoint, CodecError> {
        let mut parts = s.split(self.geo_separator);
        let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CodecError::InvalidGeo(s.to_string()));
        };
        let latitude = lat
            .trim()
            .parse::<f64>()
            .map_err(|_| CodecError::InvalidGeo(s.to_string()))?;
        let longitude = lon
            .trim()
            .parse::<f64>()
            .map_err(|_| CodecError::InvalidGeo(s.to_string()))?;
        Ok(GeoPoint::new(latitude, longitude))
    }
}

/// A Rust type that can back a record property.
///
/// `to_field_value` returns `None` for absent values (an empty `Option`),
/// which are left out of the document.
pub trait FieldType: Sized + Send + Sync + 'static {
    const KIND: FieldKind;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError>;

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError>;
}

fn mismatch(expected: FieldKind, found: &FieldValue) -> CodecError {
    CodecError::KindMismatch {
        expected,
        found: found.kind().to_string(),
    }
}

macro_rules! int_field_type {
    ($($ty:ty),*) => {$(
        impl FieldType for $ty {
            const KIND: FieldKind = FieldKind::Int;

            fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
                Ok(Some(FieldValue::Int(i64::from(*self))))
            }

            fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
                match value {
                    FieldValue::Int(n) => {
                        <$ty>::try_from(n).map_err(|_| CodecError::OutOfRange(n.to_string()))
                    }
                    other => Err(mismatch(Self::KIND, &other)),
                }
            }
        }
    )*};
}

int_field_type!(i8, i16, i32, i64, u8, u16, u32);

impl FieldType for u64 {
    const KIND: FieldKind = FieldKind::UInt;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        Ok(Some(FieldValue::UInt(*self)))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::UInt(n) => Ok(n),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        Ok(Some(FieldValue::Float(*self)))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Float(n) => Ok(n),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FieldType for f32 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        Ok(Some(FieldValue::Float(f64::from(*self))))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Float(n) => Ok(n as f32),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        Ok(Some(FieldValue::Text(self.clone())))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Text(s) => Ok(s),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FieldType for RecordId {
    const KIND: FieldKind = FieldKind::Identity;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        Ok(Some(FieldValue::Id(self.clone())))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Id(id) => Ok(id),
            FieldValue::Text(s) => Ok(RecordId::new(s)),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FieldType for NaiveDateTime {
    const KIND: FieldKind = FieldKind::Date;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        // payloads have second precision
        let truncated = self.with_nanosecond(0).unwrap_or(*self);
        Ok(Some(FieldValue::Date(truncated)))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Date(d) => Ok(d),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl FieldType for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Date;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        self.naive_utc().to_field_value()
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        NaiveDateTime::from_field_value(value).map(|d| d.and_utc())
    }
}

impl FieldType for GeoPoint {
    const KIND: FieldKind = FieldKind::Geo;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        Ok(Some(FieldValue::Geo(*self)))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Geo(p) => Ok(p),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

impl<V: FieldType> FieldType for Option<V> {
    const KIND: FieldKind = V::KIND;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        match self {
            Some(v) => v.to_field_value(),
            None => Ok(None),
        }
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        V::from_field_value(value).map(Some)
    }
}

/// Wrapper selecting the structured-text (JSON) encoding for any serde type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> FieldType for Json<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    const KIND: FieldKind = FieldKind::Structured;

    fn to_field_value(&self) -> Result<Option<FieldValue>, CodecError> {
        Ok(Some(FieldValue::Structured(serde_json::to_string(&self.0)?)))
    }

    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Structured(s) => Ok(Json(serde_json::from_str(&s)?)),
            other => Err(mismatch(Self::KIND, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn roundtrip<V: FieldType + PartialEq + fmt::Debug>(value: V) -> V {
        let codec = FieldCodec::new();
        let encoded = value
            .to_field_value()
            .unwrap()
            .expect("value should be present");
        let payload = codec.encode(&encoded, V::KIND).unwrap();
        let decoded = codec.decode(&payload, V::KIND).unwrap();
        V::from_field_value(decoded).unwrap()
    }

    fn sample_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 3)
            .unwrap()
    }

    #[test]
    fn test_date_payload_format() {
        let codec = FieldCodec::new();
        let payload = codec
            .encode(&FieldValue::Date(sample_date()), FieldKind::Date)
            .unwrap();
        assert_eq!(payload, FieldPayload::Text("20240309070503".to_string()));
    }

    #[test]
    fn test_date_truncated_to_seconds() {
        let with_millis = sample_date().with_nanosecond(250_000_000).unwrap();
        assert_eq!(roundtrip(with_millis), sample_date());
    }

    #[test]
    fn test_utc_datetime_roundtrip() {
        let dt = sample_date().and_utc();
        assert_eq!(roundtrip(dt), dt);
    }

    #[test]
    fn test_numeric_roundtrip() {
        assert_eq!(roundtrip(-42i32), -42);
        assert_eq!(roundtrip(200u8), 200);
        assert_eq!(roundtrip(u64::MAX), u64::MAX);
        assert_eq!(roundtrip(1.25f32), 1.25);
        assert_eq!(roundtrip(0.1f64 + 0.2f64), 0.1 + 0.2);
    }

    #[test]
    fn test_numeric_payloads_are_native() {
        let codec = FieldCodec::new();
        assert_eq!(
            codec.encode(&FieldValue::Int(10), FieldKind::Int).unwrap(),
            FieldPayload::I64(10)
        );
        assert_eq!(
            codec.encode(&FieldValue::Float(2.5), FieldKind::Float).unwrap(),
            FieldPayload::F64(2.5)
        );
    }

    #[test]
    fn test_text_identity_geo_roundtrip() {
        assert_eq!(roundtrip("Καφέ".to_string()), "Καφέ");
        assert_eq!(roundtrip(RecordId::new("abc123")), RecordId::new("abc123"));
        let point = GeoPoint::new(37.9838, -23.7275);
        assert_eq!(roundtrip(point), point);
    }

    #[test]
    fn test_geo_payload_format() {
        let codec = FieldCodec::new();
        let payload = codec
            .encode(&FieldValue::Geo(GeoPoint::new(37.5, 23.25)), FieldKind::Geo)
            .unwrap();
        assert_eq!(payload, FieldPayload::Text("37.5;23.25".to_string()));
    }

    #[test]
    fn test_structured_roundtrip() {
        let tags = Json(vec!["coffee".to_string(), "bakery".to_string()]);
        assert_eq!(roundtrip(tags.clone()), tags);
    }

    #[test]
    fn test_option_absent() {
        let value: Option<i32> = None;
        assert_eq!(value.to_field_value().unwrap(), None);
        assert_eq!(roundtrip(Some(7i32)), Some(7));
    }

    #[test]
    fn test_decode_errors_surface() {
        let codec = FieldCodec::new();
        assert!(matches!(
            codec.decode(&FieldPayload::Text("2024-01-01".into()), FieldKind::Date),
            Err(CodecError::InvalidDate(_))
        ));
        assert!(matches!(
            codec.decode(&FieldPayload::Text("37.5".into()), FieldKind::Geo),
            Err(CodecError::InvalidGeo(_))
        ));
        assert!(matches!(
            codec.decode(&FieldPayload::Text("{not json".into()), FieldKind::Structured),
            Err(CodecError::Structured(_))
        ));
        assert!(matches!(
            codec.decode(&FieldPayload::I64(1), FieldKind::Text),
            Err(CodecError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_out_of_range_int() {
        assert!(matches!(
            i8::from_field_value(FieldValue::Int(1000)),
            Err(CodecError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_encode_kind_mismatch() {
        let codec = FieldCodec::new();
        assert!(codec
            .encode(&FieldValue::Text("x".into()), FieldKind::Int)
            .is_err());
    }
}
