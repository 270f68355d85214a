use std::path::Path;

use ndarray::{Array2, Zip};
use tracing::debug;

use crate::error::{FusionError, Result};
use crate::models::{Channel, PassType, SwathSample};
use crate::utils::constants::{
    LATITUDE_VAR, LONGITUDE_VAR, OFFSET_ATTR, SCALE_ATTR, SWATH_COORD_DECIMALS,
    TB_SENTINEL_KELVIN,
};
use crate::utils::coordinates::{
    normalize_swath_latitude, normalize_swath_longitude, round_to, BoundingBox,
};

/// A decoded instrument scan: geolocation and corrected brightness
/// temperatures on the channel's native footprint grid. Missing readings
/// are NaN.
#[derive(Debug, Clone)]
pub struct SwathGrid {
    pub latitude: Array2<f64>,
    pub longitude: Array2<f64>,
    pub values: Array2<f64>,
}

impl SwathGrid {
    /// Flatten into validity-filtered samples, dropping NaN readings and
    /// anything outside the optional bounding box.
    pub fn samples(&self, pass_type: PassType, bbox: Option<&BoundingBox>) -> Vec<SwathSample> {
        let mut samples = Vec::new();
        Zip::from(&self.latitude)
            .and(&self.longitude)
            .and(&self.values)
            .for_each(|&lat, &lon, &tb| {
                if tb.is_nan() {
                    return;
                }
                if let Some(bbox) = bbox {
                    if !bbox.contains(lat, lon) {
                        return;
                    }
                }
                samples.push(SwathSample {
                    latitude: lat,
                    longitude: lon,
                    brightness_temp: tb,
                    pass_type,
                });
            });
        samples
    }
}

/// Decodes single AMSR-E granules into aligned swath grids.
pub struct SwathReader;

impl SwathReader {
    pub fn new() -> Self {
        Self
    }

    /// Decode one granule for one frequency channel.
    ///
    /// Any failure here (unreadable file, no known channel variable,
    /// unresolvable grid shapes) is per-file: callers log it and move on to
    /// the next granule.
    pub fn decode(&self, path: &Path, channel: Channel) -> Result<SwathGrid> {
        let file = netcdf::open(path)?;

        let tb_var = channel
            .variable_aliases()
            .iter()
            .find_map(|name| file.variable(name))
            .ok_or_else(|| FusionError::ChannelNotFound {
                channel: channel.label().to_string(),
                path: path.to_path_buf(),
            })?;

        let values = read_grid(&tb_var, path)?;
        let scale = attr_f64(&tb_var, SCALE_ATTR).unwrap_or(1.0);
        let offset = attr_f64(&tb_var, OFFSET_ATTR).unwrap_or(0.0);
        debug!(
            granule = %path.display(),
            variable = %tb_var.name(),
            scale,
            offset,
            "decoded channel variable"
        );

        let values = values.mapv(|raw| apply_scale_and_sentinel(raw, scale, offset));

        let lat_var = file
            .variable(LATITUDE_VAR)
            .ok_or_else(|| FusionError::MissingData(format!("{} in {}", LATITUDE_VAR, path.display())))?;
        let lon_var = file
            .variable(LONGITUDE_VAR)
            .ok_or_else(|| FusionError::MissingData(format!("{} in {}", LONGITUDE_VAR, path.display())))?;

        let latitude = read_grid(&lat_var, path)?
            .mapv(|lat| round_to(normalize_swath_latitude(lat), SWATH_COORD_DECIMALS));
        let longitude = read_grid(&lon_var, path)?
            .mapv(|lon| round_to(normalize_swath_longitude(lon), SWATH_COORD_DECIMALS));

        let (latitude, longitude) = align_geolocation(latitude, longitude, &values, path)?;

        Ok(SwathGrid {
            latitude,
            longitude,
            values,
        })
    }
}

impl Default for SwathReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a 2-D variable into an `Array2<f64>`.
fn read_grid(var: &netcdf::Variable, path: &Path) -> Result<Array2<f64>> {
    let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    if dims.len() != 2 {
        return Err(FusionError::InvalidFormat(format!(
            "variable {} in {} is {}-dimensional, expected 2",
            var.name(),
            path.display(),
            dims.len()
        )));
    }

    let data: Vec<f64> = var.get_values(..)?;
    Array2::from_shape_vec((dims[0], dims[1]), data)
        .map_err(|e| FusionError::InvalidFormat(format!("{} in {}: {}", var.name(), path.display(), e)))
}

fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    // Probe the attribute list first; asking HDF for a missing attribute
    // spams stderr through the C library.
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

/// Reconcile geolocation and value grid shapes.
///
/// The only shape mismatch with a known meaning is the 2:1 oversampled
/// geolocation grid (same rows, double columns), which is reduced by
/// pairwise column averaging. Anything else is rejected rather than
/// guessed at.
pub fn align_geolocation(
    latitude: Array2<f64>,
    longitude: Array2<f64>,
    values: &Array2<f64>,
    path: &Path,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let (geo_rows, geo_cols) = latitude.dim();
    let (value_rows, value_cols) = values.dim();

    if (geo_rows, geo_cols) == (value_rows, value_cols) {
        return Ok((latitude, longitude));
    }

    if geo_rows == value_rows && geo_cols == 2 * value_cols {
        return Ok((
            downsample_columns(&latitude),
            downsample_columns(&longitude),
        ));
    }

    Err(FusionError::GridAlignment {
        path: path.to_path_buf(),
        geo_rows,
        geo_cols,
        value_rows,
        value_cols,
    })
}

/// Scale/offset correction with the instrument's fill convention:
/// corrected values above the 6550 K sentinel are missing, not readings.
pub fn apply_scale_and_sentinel(raw: f64, scale: f64, offset: f64) -> f64 {
    let corrected = raw * scale + offset;
    if corrected > TB_SENTINEL_KELVIN {
        f64::NAN
    } else {
        corrected
    }
}

/// Average adjacent column pairs: shape (R, 2C) -> (R, C).
pub fn downsample_columns(grid: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = grid.dim();
    let half = cols / 2;
    Array2::from_shape_fn((rows, half), |(i, j)| {
        (grid[[i, 2 * j]] + grid[[i, 2 * j + 1]]) / 2.0
    })
}
