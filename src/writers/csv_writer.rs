//! CSV cache writers.
//!
//! Every table is written to a temp file in the destination directory and
//! persisted by rename, so an interrupted run can never leave a truncated
//! artifact behind that would satisfy a later presence check.

use std::path::Path;

use crate::error::{FusionError, Result};
use crate::models::{
    Channel, DailyRegressionRecord, FusedObservation, LstSample, MergedTbRecord, PixelMatch,
    SwathSample, WindowMatch,
};

fn atomic_write<F>(path: &Path, write_fn: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<&mut tempfile::NamedTempFile>) -> Result<()>,
{
    let dir = path.parent().ok_or_else(|| {
        FusionError::Config(format!("output path {} has no parent directory", path.display()))
    })?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(&mut tmp);
        write_fn(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path)
        .map_err(|e| FusionError::Io(e.error))?;
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

/// Combined per-channel daily table:
/// `latitude,longitude,{channel column},pass_type`.
pub fn write_samples(path: &Path, samples: &[SwathSample], channel: Channel) -> Result<()> {
    atomic_write(path, |writer| {
        writer.write_record(["latitude", "longitude", channel.column(), "pass_type"])?;
        for sample in samples {
            writer.write_record([
                sample.latitude.to_string(),
                sample.longitude.to_string(),
                sample.brightness_temp.to_string(),
                sample.pass_type.to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Canonical per-day fused instrument table:
/// `date,latitude,longitude,brightness_temp_37v,brightness_temp_19v`.
pub fn write_merged(path: &Path, records: &[MergedTbRecord]) -> Result<()> {
    atomic_write(path, |writer| {
        writer.write_record([
            "date",
            "latitude",
            "longitude",
            "brightness_temp_37v",
            "brightness_temp_19v",
        ])?;
        for record in records {
            writer.write_record([
                record.date.format("%Y-%m-%d").to_string(),
                record.latitude.to_string(),
                record.longitude.to_string(),
                record.brightness_temp_37v.to_string(),
                record.brightness_temp_19v.to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Daily station-match table:
/// `station,latitude,longitude,{channel column},temperature`.
pub fn write_window_matches(path: &Path, matches: &[WindowMatch], channel: Channel) -> Result<()> {
    atomic_write(path, |writer| {
        writer.write_record([
            "station",
            "latitude",
            "longitude",
            channel.column(),
            "temperature",
        ])?;
        for m in matches {
            writer.write_record([
                m.station.clone(),
                m.latitude.to_string(),
                m.longitude.to_string(),
                format_optional(m.brightness_temp),
                m.temperature.to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Nearest-pixel registry match table.
pub fn write_pixel_matches(path: &Path, matches: &[PixelMatch]) -> Result<()> {
    atomic_write(path, |writer| {
        writer.write_record([
            "station",
            "station_lat",
            "station_lon",
            "pixel_lat",
            "pixel_lon",
            "distance",
            "TB",
        ])?;
        for m in matches {
            writer.write_record([
                m.station.clone(),
                m.station_lat.to_string(),
                m.station_lon.to_string(),
                m.pixel_lat.to_string(),
                m.pixel_lon.to_string(),
                m.distance.to_string(),
                format_optional(Some(m.brightness_temp)),
            ])?;
        }
        Ok(())
    })
}

/// Per-day MODIS LST table: `latitude,longitude,date,LST_Kelvin`.
pub fn write_lst_samples(path: &Path, samples: &[LstSample]) -> Result<()> {
    atomic_write(path, |writer| {
        writer.write_record(["latitude", "longitude", "date", "LST_Kelvin"])?;
        for sample in samples {
            writer.write_record([
                sample.latitude.to_string(),
                sample.longitude.to_string(),
                sample.date.format("%Y-%m-%d").to_string(),
                sample.lst_kelvin.to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Per-day training table produced by the dataset fuser.
pub fn write_fused(path: &Path, rows: &[FusedObservation]) -> Result<()> {
    atomic_write(path, |writer| {
        write_fused_header(writer)?;
        for row in rows {
            write_fused_row(writer, row)?;
        }
        Ok(())
    })
}

pub(crate) fn write_fused_header<W: std::io::Write>(writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "latitude",
        "longitude",
        "date",
        "LST_Kelvin",
        "LST_Celsius",
        "brightness_temp_37v",
        "brightness_temp_19v",
        "land_cover_class",
    ])?;
    Ok(())
}

pub(crate) fn write_fused_row<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    row: &FusedObservation,
) -> Result<()> {
    writer.write_record([
        row.latitude.to_string(),
        row.longitude.to_string(),
        row.date.format("%Y-%m-%d").to_string(),
        row.lst_kelvin.to_string(),
        row.lst_celsius.to_string(),
        row.brightness_temp_37v.to_string(),
        row.brightness_temp_19v.to_string(),
        row.land_cover_class.to_string(),
    ])?;
    Ok(())
}

/// Running daily-regression metrics table: `date,a,b,r2,rmse,n_points`.
pub fn write_daily_regressions(path: &Path, records: &[DailyRegressionRecord]) -> Result<()> {
    atomic_write(path, |writer| {
        writer.write_record(["date", "a", "b", "r2", "rmse", "n_points"])?;
        for record in records {
            writer.write_record([
                record.date.format("%Y%m%d").to_string(),
                record.slope.to_string(),
                record.intercept.to_string(),
                record.r_squared.to_string(),
                record.rmse.to_string(),
                record.n_points.to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Flattened land-cover raster: `latitude,longitude,land_cover_class`.
pub fn write_land_cover(path: &Path, points: &[(f64, f64, i32)]) -> Result<()> {
    atomic_write(path, |writer| {
        writer.write_record(["latitude", "longitude", "land_cover_class"])?;
        for (lat, lon, class) in points {
            writer.write_record([lat.to_string(), lon.to_string(), class.to_string()])?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PassType;
    use tempfile::TempDir;

    #[test]
    fn test_write_samples_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2005-07-01").join("table.csv");

        let samples = vec![SwathSample {
            latitude: 40.0,
            longitude: -3.0,
            brightness_temp: 250.0,
            pass_type: PassType::Ascending,
        }];
        write_samples(&path, &samples, Channel::Ghz37).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "latitude,longitude,brightness_temp_37v,pass_type"
        );
        assert_eq!(lines.next().unwrap(), "40,-3,250,ascending");
    }

    #[test]
    fn test_missing_window_mean_written_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("matched.csv");

        let matches = vec![WindowMatch {
            station: "Hainich, DE".to_string(),
            latitude: 51.08,
            longitude: 10.45,
            brightness_temp: None,
            temperature: 281.3,
        }];
        write_window_matches(&path, &matches, Channel::Ghz37).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Hainich, DE\",51.08,10.45,,281.3"));
    }
}
