//! Geographic coordinate type.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point, rejecting coordinates outside the valid ranges.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, TypesError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(TypesError::InvalidInput(format!(
                "latitude must be within -90..=90, got {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(TypesError::InvalidInput(format!(
                "longitude must be within -180..=180, got {longitude}"
            )));
        }
        Ok(Self::new(latitude, longitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_accepts_bounds() {
        let p = GeoPoint::try_new(-90.0, 180.0).unwrap();
        assert_eq!(p.latitude, -90.0);
        assert_eq!(p.longitude, 180.0);
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert!(GeoPoint::try_new(90.5, 0.0).is_err());
        assert!(GeoPoint::try_new(0.0, -180.1).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let p = GeoPoint::new(37.9838, 23.7275);
        let json = serde_json::to_string(&p).unwrap();
        let back: GeoPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
