use std::path::Path;

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::error::{FusionError, Result};
use crate::utils::constants::LAND_COVER_VAR_ALIASES;

/// Nearest-neighbour lookup over the static land-cover classification.
///
/// The raster's coordinate grid is flattened into scattered (lat, lon)
/// points and indexed in a KD-tree, so lookups work for target points that
/// sit off the raster grid. This is value interpolation, not a copy from
/// rounded bins.
pub struct LandCoverMap {
    tree: kd_tree::KdTree2<(i32, [f64; 2])>,
}

impl LandCoverMap {
    /// Build from flattened (class, [lat, lon]) points.
    pub fn from_points(points: Vec<(i32, [f64; 2])>) -> Result<Self> {
        if points.is_empty() {
            return Err(FusionError::MissingData(
                "land-cover raster contains no classified cells".to_string(),
            ));
        }
        let tree =
            kd_tree::KdTree2::build_by_key(points, |item, k| OrderedFloat(item.1[k]));
        Ok(Self { tree })
    }

    /// Load the classification raster. The expected variable name is tried
    /// first; failing that, the first 2-D variable in the file is used, as
    /// some distributions rename the single data variable.
    pub fn from_raster(path: &Path) -> Result<Self> {
        let points = read_raster_points(path)?;
        debug!(raster = %path.display(), cells = points.len(), "loaded land-cover raster");
        Self::from_points(points)
    }

    /// Class of the nearest raster cell to the target point.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> i32 {
        // from_points rejects empty input, so a nearest item always exists.
        self.tree
            .nearest_by(&[latitude, longitude], |item, k| item.1[k])
            .map(|found| found.item.0)
            .unwrap_or_default()
    }
}

/// Flatten the raster into (class, [lat, lon]) points, skipping
/// unclassified cells.
fn read_raster_points(path: &Path) -> Result<Vec<(i32, [f64; 2])>> {
    let file = netcdf::open(path)?;

    let var = LAND_COVER_VAR_ALIASES
        .iter()
        .find_map(|name| file.variable(name))
        .or_else(|| {
            file.variables()
                .find(|v| v.dimensions().len() >= 2)
        })
        .ok_or_else(|| {
            FusionError::MissingData(format!(
                "land-cover variable in {}",
                path.display()
            ))
        })?;

    // Leading singleton dimensions (a 1-element time axis) are squeezed.
    let dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let squeezed: Vec<usize> = dims.iter().copied().filter(|&len| len > 1).collect();
    let &[rows, cols] = &squeezed[..] else {
        return Err(FusionError::InvalidFormat(format!(
            "land-cover variable in {} has shape {:?}, expected 2-D",
            path.display(),
            dims
        )));
    };

    let values: Vec<f64> = var.get_values(..)?;
    let latitudes = read_axis(&file, &["latitude", "lat"], rows, path)?;
    let longitudes = read_axis(&file, &["longitude", "lon"], cols, path)?;

    let mut points = Vec::with_capacity(values.len());
    for (i, &lat) in latitudes.iter().enumerate() {
        for (j, &lon) in longitudes.iter().enumerate() {
            let value = values[i * cols + j];
            if value.is_nan() {
                continue;
            }
            points.push((value as i32, [lat, lon]));
        }
    }
    Ok(points)
}

fn read_axis(
    file: &netcdf::File,
    aliases: &[&str],
    expected_len: usize,
    path: &Path,
) -> Result<Vec<f64>> {
    let var = aliases
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| {
            FusionError::MissingData(format!(
                "coordinate variable ({}) in {}",
                aliases.join("/"),
                path.display()
            ))
        })?;

    let values: Vec<f64> = var.get_values(..)?;
    if values.len() != expected_len {
        return Err(FusionError::InvalidFormat(format!(
            "coordinate {} has {} entries, raster axis has {} in {}",
            var.name(),
            values.len(),
            expected_len,
            path.display()
        )));
    }
    Ok(values)
}

/// Flattened raster rows for the CSV conversion command.
pub fn raster_to_rows(path: &Path) -> Result<Vec<(f64, f64, i32)>> {
    Ok(read_raster_points(path)?
        .into_iter()
        .map(|(class, [lat, lon])| (lat, lon, class))
        .collect())
}
