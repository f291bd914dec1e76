//! Spatial strategy for the geo property of a record.
//!
//! A geo property `p` is indexed as three extra fields:
//! - `pvs_p`: stored `POINT (lon lat)` text
//! - `pvs_p__x`: longitude, f64 (indexed, fast, stored)
//! - `pvs_p__y`: latitude, f64 (indexed, fast, stored)
//!
//! Area search is a bounding-box range filter on x/y followed by an exact
//! great-circle test on the candidates. Distances are measured on a sphere
//! with the Earth's equatorial radius.

use std::ops::Bound;

use tantivy::query::{BooleanQuery, Occur, Query, RangeQuery};
use tantivy::schema::Field;
use tantivy::Term;

use lexmap_types::GeoPoint;

use crate::codec::FieldPayload;
use crate::error::QueryCompositionError;
use crate::schema::SPATIAL_PREFIX;

/// Earth's equatorial radius in kilometres.
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;

/// Radius used when an area is requested without one.
pub const DEFAULT_RADIUS_KM: f64 = 500.0;

/// Convert a surface distance in km to degrees of arc.
pub fn km_to_degrees(km: f64) -> f64 {
    (km / EARTH_EQUATORIAL_RADIUS_KM).to_degrees()
}

/// Convert degrees of arc to a surface distance in km.
pub fn degrees_to_km(degrees: f64) -> f64 {
    degrees.to_radians() * EARTH_EQUATORIAL_RADIUS_KM
}

/// Great-circle distance between two points, in degrees (haversine).
pub fn distance_degrees(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let central = 2.0 * h.sqrt().min(1.0).asin();
    central.to_degrees()
}

/// Great-circle distance between two points, in km.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    degrees_to_km(distance_degrees(a, b))
}

/// A circular search area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl SearchArea {
    pub fn new(center: GeoPoint, radius_km: f64) -> Result<Self, QueryCompositionError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(QueryCompositionError::InvalidRadius(radius_km));
        }
        Ok(Self { center, radius_km })
    }

    /// Radius in degrees of arc.
    pub fn radius_degrees(&self) -> f64 {
        km_to_degrees(self.radius_km)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        distance_degrees(&self.center, point) <= self.radius_degrees()
    }

    /// Smallest lat/lon box enclosing the circle.
    pub fn bounding_box(&self) -> BoundingBox {
        let radius = self.radius_degrees();
        let min_lat = (self.center.latitude - radius).max(-90.0);
        let max_lat = (self.center.latitude + radius).min(90.0);

        // widest longitude reached by the circle is asin(sin r / cos lat);
        // near a pole, or wrapping the antimeridian, every longitude qualifies
        let sin_r = radius.to_radians().sin();
        let cos_lat = self.center.latitude.to_radians().cos();
        let polar = self.center.latitude.abs() + radius >= 90.0 || sin_r >= cos_lat;
        let (min_lon, max_lon) = if polar {
            (-180.0, 180.0)
        } else {
            let spread = (sin_r / cos_lat).asin().to_degrees();
            let min_lon = self.center.longitude - spread;
            let max_lon = self.center.longitude + spread;
            if min_lon < -180.0 || max_lon > 180.0 {
                (-180.0, 180.0)
            } else {
                (min_lon, max_lon)
            }
        };

        BoundingBox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Point indexing and circle filtering for one geo property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialStrategy {
    prefix: String,
}

impl SpatialStrategy {
    pub fn new(property: &str) -> Self {
        Self {
            prefix: format!("{SPATIAL_PREFIX}{property}"),
        }
    }

    /// Build from an already derived `pvs_<property>` prefix.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn point_field(&self) -> &str {
        &self.prefix
    }

    pub fn x_field(&self) -> String {
        format!("{}__x", self.prefix)
    }

    pub fn y_field(&self) -> String {
        format!("{}__y", self.prefix)
    }

    /// Indexable sub-fields for `point`.
    pub fn point_fields(&self, point: &GeoPoint) -> Vec<(String, FieldPayload)> {
        vec![
            (
                self.point_field().to_string(),
                FieldPayload::Text(format!("POINT ({} {})", point.longitude, point.latitude)),
            ),
            (self.x_field(), FieldPayload::F64(point.longitude)),
            (self.y_field(), FieldPayload::F64(point.latitude)),
        ]
    }

    /// Bounding-box filter for `area` over the x/y fields.
    pub fn circle_filter(&self, area: &SearchArea, x: Field, y: Field) -> Box<dyn Query> {
        let bbox = area.bounding_box();
        let lon = RangeQuery::new(
            Bound::Included(Term::from_field_f64(x, bbox.min_lon)),
            Bound::Included(Term::from_field_f64(x, bbox.max_lon)),
        );
        let lat = RangeQuery::new(
            Bound::Included(Term::from_field_f64(y, bbox.min_lat)),
            Bound::Included(Term::from_field_f64(y, bbox.max_lat)),
        );
        Box::new(BooleanQuery::new(vec![
            (Occur::Must, Box::new(lon) as Box<dyn Query>),
            (Occur::Must, Box::new(lat) as Box<dyn Query>),
        ]))
    }
}
