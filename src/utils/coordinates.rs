use crate::utils::constants::{FUSION_BIN_SCALE, SWATH_BIN_SCALE};

/// Undo the coordinate wraparound quirk of AMSR-E geolocation arrays.
///
/// Source latitudes run past 90 and longitudes past 180 by a fixed offset;
/// this is that specific correction, not a general normalisation.
pub fn normalize_swath_latitude(lat: f64) -> f64 {
    if lat > 90.0 {
        lat - 180.0
    } else {
        lat
    }
}

pub fn normalize_swath_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Integer bin key at swath resolution (4 decimal places). Joins on
/// floating coordinates go through these keys so equality is exact.
pub fn swath_bin(value: f64) -> i64 {
    (value * SWATH_BIN_SCALE).round() as i64
}

/// Integer bin key at fusion resolution (1 decimal place).
pub fn fusion_bin(value: f64) -> i64 {
    (value * FUSION_BIN_SCALE).round() as i64
}

/// Recover the bin-centre coordinate from a fusion bin key.
pub fn fusion_bin_value(bin: i64) -> f64 {
    bin as f64 / FUSION_BIN_SCALE
}

/// Manhattan distance in coordinate space, the tie-break metric of
/// nearest-pixel station matching. Deliberately not great-circle: downstream
/// consumers depend on the exact ordering this produces.
pub fn manhattan_distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    (lat_a - lat_b).abs() + (lon_a - lon_b).abs()
}

/// Axis-aligned geographic box, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Continental box of the study region (matches the MODIS search box).
    pub fn study_region() -> Self {
        Self::new(35.0, 45.0, -10.0, 10.0)
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swath_normalization() {
        // lat' = lat - 180 if lat > 90
        assert_eq!(normalize_swath_latitude(190.0), 10.0);
        assert_eq!(normalize_swath_latitude(90.0), 90.0);
        assert_eq!(normalize_swath_latitude(-45.0), -45.0);

        // lon' = lon - 360 if lon > 180
        assert_eq!(normalize_swath_longitude(350.0), -10.0);
        assert_eq!(normalize_swath_longitude(180.0), 180.0);
        assert_eq!(normalize_swath_longitude(-110.51), -110.51);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(41.8472, 2), 41.85);
        assert_eq!(round_to(41.8472, 1), 41.8);
        assert_eq!(round_to(-0.005, 2), -0.01);
    }

    #[test]
    fn test_bin_keys_are_exact() {
        // Values that differ below the bin resolution map to the same key
        assert_eq!(swath_bin(41.85), swath_bin(41.850000001));
        assert_ne!(swath_bin(41.85), swath_bin(41.8501));
        assert_eq!(fusion_bin(41.84), fusion_bin(41.76));
        assert_eq!(fusion_bin_value(fusion_bin(41.8)), 41.8);
    }

    #[test]
    fn test_manhattan_distance() {
        assert_eq!(manhattan_distance(40.0, -3.0, 40.1, -2.9), 0.1 + 0.1);
        assert_eq!(manhattan_distance(40.0, -3.0, 40.0, -3.0), 0.0);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox::study_region();
        assert!(bbox.contains(40.0, -3.0)); // Iberia
        assert!(!bbox.contains(52.17, 5.74)); // Loobos, NL
        assert!(bbox.contains(35.0, -10.0)); // inclusive edges
    }
}
