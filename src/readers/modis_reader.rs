use std::path::Path;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::error::{FusionError, Result};
use crate::models::LstSample;
use crate::utils::constants::{LST_SCALE, LST_VAR_ALIASES};

/// Extracts per-day land-surface-temperature tables from the MODIS raster.
///
/// The raster encodes its time axis as a day-of-year offset from January 1
/// of the observation year; every extracted table carries the resolved
/// calendar date so downstream joins never see the raw offset.
pub struct ModisReader {
    epoch_year: i32,
}

impl ModisReader {
    pub fn new(epoch_year: i32) -> Self {
        Self { epoch_year }
    }

    /// Calendar date for a day-of-year offset.
    pub fn date_for_day(&self, day_index: u32) -> Result<NaiveDate> {
        let epoch = NaiveDate::from_ymd_opt(self.epoch_year, 1, 1).ok_or_else(|| {
            FusionError::Config(format!("invalid epoch year {}", self.epoch_year))
        })?;
        Ok(epoch + Duration::days(day_index as i64))
    }

    /// Slice one day out of the LST raster into geolocated Kelvin samples.
    ///
    /// Zero digital numbers are the product's no-data marker and are
    /// dropped, not scaled.
    pub fn extract_day(&self, nc_path: &Path, day_index: u32) -> Result<Vec<LstSample>> {
        let date = self.date_for_day(day_index)?;
        let file = netcdf::open(nc_path)?;

        let lst_var = LST_VAR_ALIASES
            .iter()
            .find_map(|name| file.variable(name))
            .ok_or_else(|| {
                FusionError::MissingData(format!("LST variable in {}", nc_path.display()))
            })?;

        let scale = attr_f64(&lst_var, "scale_factor").unwrap_or(LST_SCALE);

        let dims: Vec<usize> = lst_var.dimensions().iter().map(|d| d.len()).collect();
        let (raw, rows, cols): (Vec<f64>, usize, usize) = match dims.as_slice() {
            [time, rows, cols] => {
                if day_index as usize >= *time {
                    return Err(FusionError::MissingData(format!(
                        "day index {} beyond time axis ({} days) in {}",
                        day_index,
                        time,
                        nc_path.display()
                    )));
                }
                let raw = lst_var.get_values((day_index as usize, .., ..))?;
                (raw, *rows, *cols)
            }
            [rows, cols] => {
                let raw = lst_var.get_values(..)?;
                (raw, *rows, *cols)
            }
            other => {
                return Err(FusionError::InvalidFormat(format!(
                    "LST variable in {} is {}-dimensional",
                    nc_path.display(),
                    other.len()
                )))
            }
        };

        let latitudes = read_axis(&file, &["lat", "latitude"], rows, nc_path)?;
        let longitudes = read_axis(&file, &["lon", "longitude"], cols, nc_path)?;

        let mut samples = Vec::new();
        for (i, &lat) in latitudes.iter().enumerate() {
            for (j, &lon) in longitudes.iter().enumerate() {
                let dn = raw[i * cols + j];
                if dn == 0.0 || dn.is_nan() {
                    continue;
                }
                samples.push(LstSample {
                    latitude: lat,
                    longitude: lon,
                    date,
                    lst_kelvin: dn * scale,
                });
            }
        }

        debug!(
            raster = %nc_path.display(),
            day_index,
            date = %date,
            samples = samples.len(),
            "extracted MODIS day slice"
        );
        Ok(samples)
    }
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
            "coordinate {} has {} entries, grid axis has {} in {}",
            var.name(),
            values.len(),
            expected_len,
            path.display()
        )));
    }
    Ok(values)
}

fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_offset_conversion() {
        let reader = ModisReader::new(2005);
        assert_eq!(
            reader.date_for_day(0).unwrap(),
            NaiveDate::from_ymd_opt(2005, 1, 1).unwrap()
        );
        assert_eq!(
            reader.date_for_day(181).unwrap(),
            NaiveDate::from_ymd_opt(2005, 7, 1).unwrap()
        );
        assert_eq!(
            reader.date_for_day(364).unwrap(),
            NaiveDate::from_ymd_opt(2005, 12, 31).unwrap()
        );
    }
}
