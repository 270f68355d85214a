use serde::{Deserialize, Serialize};
use validator::Validate;

/// A named flux-tower site with known coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxnetStation {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Fixed registry of the FLUXNET towers covered by the study.
///
/// Nearest-pixel matching runs against this table; the window-mean matcher
/// instead takes coordinates from the station-coordinates CSV so that the
/// two inputs can disagree without silently shadowing each other.
pub fn station_registry() -> &'static [FluxnetStation] {
    const REGISTRY: &[FluxnetStation] = &[
        FluxnetStation { name: "Arizona, US", latitude: 31.59, longitude: -110.51 },
        FluxnetStation { name: "Fort Peck Montana, US", latitude: 48.31, longitude: -105.10 },
        FluxnetStation { name: "Brookings Illinois, US", latitude: 44.35, longitude: -96.84 },
        FluxnetStation { name: "Bondville Illinois, US", latitude: 40.01, longitude: -88.29 },
        FluxnetStation { name: "Bondville comp. Illinois, US", latitude: 40.01, longitude: -88.29 },
        FluxnetStation { name: "Gebesse, DE", latitude: 51.10, longitude: 10.91 },
        FluxnetStation { name: "Ozark Missouri, US", latitude: 38.74, longitude: -92.20 },
        FluxnetStation { name: "Morgan Monroe Indiana, US", latitude: 39.32, longitude: -86.41 },
        FluxnetStation { name: "Collelongo beech, IT", latitude: 41.85, longitude: 13.59 },
        FluxnetStation { name: "Hainich, DE", latitude: 51.08, longitude: 10.45 },
        FluxnetStation { name: "Loobos, NL", latitude: 52.17, longitude: 5.74 },
        FluxnetStation { name: "Le Brai, NL", latitude: 44.72, longitude: -0.77 },
        FluxnetStation { name: "Black Hills South Dakota, US", latitude: 44.16, longitude: -103.65 },
        FluxnetStation { name: "North Carolina, US", latitude: 35.98, longitude: -79.10 },
    ];
    REGISTRY
}

/// Station coordinates as loaded from the lookup CSV.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationCoordinates {
    #[serde(rename = "station")]
    pub name: String,

    #[serde(rename = "lat")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[serde(rename = "lon")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Result of window-mean matching one station against one daily TB table.
///
/// `brightness_temp` is the spatial mean over the +/-1 degree window and is
/// `None` when no instrument pixel fell inside it; `temperature` is the
/// sanitised flux-tower reading in Kelvin.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMatch {
    pub station: String,
    pub latitude: f64,
    pub longitude: f64,
    pub brightness_temp: Option<f64>,
    pub temperature: f64,
}

/// One raw grid pixel that fell within tolerance of a registry station.
///
/// Every qualifying pixel is recorded, not just the closest, and a pixel
/// near two stations appears once per station. `distance` is the Manhattan
/// sum `|dlat| + |dlon|` used downstream for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelMatch {
    pub station: String,
    pub station_lat: f64,
    pub station_lon: f64,
    pub pixel_lat: f64,
    pub pixel_lon: f64,
    pub distance: f64,
    pub brightness_temp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_complete() {
        let registry = station_registry();
        assert_eq!(registry.len(), 14);

        for station in registry {
            assert!((-90.0..=90.0).contains(&station.latitude), "{}", station.name);
            assert!((-180.0..=180.0).contains(&station.longitude), "{}", station.name);
        }
    }

    #[test]
    fn test_registry_shares_bondville_coordinates() {
        // Two Bondville entries deliberately share a location; pixels near
        // it must be reported once per entry.
        let registry = station_registry();
        let bondville: Vec<_> = registry
            .iter()
            .filter(|s| s.name.starts_with("Bondville"))
            .collect();
        assert_eq!(bondville.len(), 2);
        assert_eq!(bondville[0].latitude, bondville[1].latitude);
        assert_eq!(bondville[0].longitude, bondville[1].longitude);
    }

    #[test]
    fn test_station_coordinates_validation() {
        let ok = StationCoordinates {
            name: "Hainich, DE".to_string(),
            latitude: 51.08,
            longitude: 10.45,
        };
        assert!(ok.validate().is_ok());

        let bad = StationCoordinates {
            name: "Nowhere".to_string(),
            latitude: 95.0,
            longitude: 0.0,
        };
        assert!(bad.validate().is_err());
    }
}
