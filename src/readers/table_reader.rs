use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use memmap2::Mmap;
use tracing::debug;

use crate::error::{FusionError, Result};
use crate::models::{
    FusedObservation, LstSample, MergedTbRecord, PassType, TbRecord, WindowMatch,
};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;

/// Reads the pipeline's CSV cache tables back into typed rows.
///
/// Daily swath tables can run to hundreds of megabytes, so reading through
/// a memory map is available as an option, same interface either way.
pub struct TableReader {
    use_mmap: bool,
}

impl TableReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    fn read_raw(&self, path: &Path) -> Result<(csv::StringRecord, Vec<csv::StringRecord>)> {
        let file = File::open(path)?;
        if self.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            collect_records(csv::Reader::from_reader(&mmap[..]))
        } else {
            collect_records(csv::Reader::from_reader(BufReader::with_capacity(
                DEFAULT_BUFFER_SIZE,
                file,
            )))
        }
    }

    /// Read one combined per-channel table. The brightness-temperature
    /// column is located by its `brightness_temp_` prefix so either
    /// channel's table can be read without knowing the frequency upfront.
    pub fn read_tb_table(&self, path: &Path) -> Result<Vec<TbRecord>> {
        let (headers, records) = self.read_raw(path)?;

        let lat_idx = column_index(&headers, "latitude", path)?;
        let lon_idx = column_index(&headers, "longitude", path)?;
        let pass_idx = column_index(&headers, "pass_type", path)?;
        let tb_idx = headers
            .iter()
            .position(|h| h.starts_with("brightness_temp_"))
            .ok_or_else(|| {
                FusionError::MissingData(format!(
                    "no brightness_temp_* column in {}",
                    path.display()
                ))
            })?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let pass_type = match record.get(pass_idx) {
                Some("ascending") => PassType::Ascending,
                Some("descending") => PassType::Descending,
                other => {
                    return Err(FusionError::InvalidFormat(format!(
                        "unknown pass type {:?} in {}",
                        other,
                        path.display()
                    )))
                }
            };
            rows.push(TbRecord {
                latitude: parse_f64(record.get(lat_idx), "latitude", path)?,
                longitude: parse_f64(record.get(lon_idx), "longitude", path)?,
                brightness_temp: parse_f64(record.get(tb_idx), "brightness_temp", path)?,
                pass_type,
            });
        }
        Ok(rows)
    }

    /// Read one canonical per-day fused instrument table.
    pub fn read_merged_table(&self, path: &Path) -> Result<Vec<MergedTbRecord>> {
        let (headers, records) = self.read_raw(path)?;

        let date_idx = column_index(&headers, "date", path)?;
        let lat_idx = column_index(&headers, "latitude", path)?;
        let lon_idx = column_index(&headers, "longitude", path)?;
        let tb37_idx = column_index(&headers, "brightness_temp_37v", path)?;
        let tb19_idx = column_index(&headers, "brightness_temp_19v", path)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let date_str = record
                .get(date_idx)
                .ok_or_else(|| FusionError::MissingData(format!("date in {}", path.display())))?;
            rows.push(MergedTbRecord {
                date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d")?,
                latitude: parse_f64(record.get(lat_idx), "latitude", path)?,
                longitude: parse_f64(record.get(lon_idx), "longitude", path)?,
                brightness_temp_37v: parse_f64(record.get(tb37_idx), "brightness_temp_37v", path)?,
                brightness_temp_19v: parse_f64(record.get(tb19_idx), "brightness_temp_19v", path)?,
            });
        }
        Ok(rows)
    }

    /// Read one daily station-match table. An empty brightness-temperature
    /// field means the station's window held no instrument pixel that day.
    pub fn read_matched_table(&self, path: &Path) -> Result<Vec<WindowMatch>> {
        let (headers, records) = self.read_raw(path)?;

        let station_idx = column_index(&headers, "station", path)?;
        let lat_idx = column_index(&headers, "latitude", path)?;
        let lon_idx = column_index(&headers, "longitude", path)?;
        let temp_idx = column_index(&headers, "temperature", path)?;
        let tb_idx = headers
            .iter()
            .position(|h| h.starts_with("brightness_temp_"))
            .ok_or_else(|| {
                FusionError::MissingData(format!(
                    "no brightness_temp_* column in {}",
                    path.display()
                ))
            })?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let tb_field = record.get(tb_idx).unwrap_or("");
            let brightness_temp = if tb_field.is_empty() {
                None
            } else {
                Some(parse_f64(Some(tb_field), "brightness_temp", path)?)
            };
            rows.push(WindowMatch {
                station: record.get(station_idx).unwrap_or("").to_string(),
                latitude: parse_f64(record.get(lat_idx), "latitude", path)?,
                longitude: parse_f64(record.get(lon_idx), "longitude", path)?,
                brightness_temp,
                temperature: parse_f64(record.get(temp_idx), "temperature", path)?,
            });
        }
        Ok(rows)
    }

    /// Read one per-day MODIS LST table.
    pub fn read_lst_table(&self, path: &Path) -> Result<Vec<LstSample>> {
        let (headers, records) = self.read_raw(path)?;

        let lat_idx = column_index(&headers, "latitude", path)?;
        let lon_idx = column_index(&headers, "longitude", path)?;
        let date_idx = column_index(&headers, "date", path)?;
        let lst_idx = column_index(&headers, "LST_Kelvin", path)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let date_str = record
                .get(date_idx)
                .ok_or_else(|| FusionError::MissingData(format!("date in {}", path.display())))?;
            rows.push(LstSample {
                latitude: parse_f64(record.get(lat_idx), "latitude", path)?,
                longitude: parse_f64(record.get(lon_idx), "longitude", path)?,
                date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d")?,
                lst_kelvin: parse_f64(record.get(lst_idx), "LST_Kelvin", path)?,
            });
        }
        Ok(rows)
    }

    /// Read one per-day fused training table. Rows with missing or
    /// malformed fields are dropped, not defaulted; the dropped count is
    /// returned so the cleaning stage can report it.
    pub fn read_fused_table(&self, path: &Path) -> Result<(Vec<FusedObservation>, usize)> {
        let (headers, records) = self.read_raw(path)?;

        let mut rows = Vec::with_capacity(records.len());
        let mut dropped = 0usize;
        for record in &records {
            match record.deserialize::<FusedObservation>(Some(&headers)) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    debug!(file = %path.display(), error = %e, "dropping malformed fused row");
                    dropped += 1;
                }
            }
        }
        Ok((rows, dropped))
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_records<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<(csv::StringRecord, Vec<csv::StringRecord>)> {
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    Ok((headers, records))
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| FusionError::MissingData(format!("column {} in {}", name, path.display())))
}

fn parse_f64(field: Option<&str>, column: &str, path: &Path) -> Result<f64> {
    let field = field
        .ok_or_else(|| FusionError::MissingData(format!("{} in {}", column, path.display())))?;
    field.trim().parse().map_err(|_| {
        FusionError::InvalidFormat(format!(
            "invalid {} value '{}' in {}",
            column,
            field,
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, SwathSample};
    use crate::writers::csv_writer;
    use tempfile::TempDir;

    fn sample(lat: f64, lon: f64, tb: f64) -> SwathSample {
        SwathSample {
            latitude: lat,
            longitude: lon,
            brightness_temp: tb,
            pass_type: PassType::Descending,
        }
    }

    #[test]
    fn test_tb_table_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("combined.csv");

        let samples = vec![sample(40.0, -3.0, 250.0), sample(41.0, -4.0, 260.0)];
        csv_writer::write_samples(&path, &samples, Channel::Ghz19).unwrap();

        let reader = TableReader::new();
        let rows = reader.read_tb_table(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].latitude, 40.0);
        assert_eq!(rows[0].brightness_temp, 250.0);
        assert_eq!(rows[1].pass_type, PassType::Descending);
    }

    #[test]
    fn test_tb_table_roundtrip_mmap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("combined.csv");
        csv_writer::write_samples(&path, &[sample(40.0, -3.0, 250.0)], Channel::Ghz37).unwrap();

        let rows = TableReader::with_mmap(true).read_tb_table(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].longitude, -3.0);
    }

    #[test]
    fn test_missing_column_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "latitude,longitude\n40.0,-3.0\n").unwrap();

        let err = TableReader::new().read_tb_table(&path);
        assert!(matches!(err, Err(FusionError::MissingData(_))));
    }

    #[test]
    fn test_fused_table_drops_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged_dataset_2005-07-01.csv");
        std::fs::write(
            &path,
            "latitude,longitude,date,LST_Kelvin,LST_Celsius,brightness_temp_37v,brightness_temp_19v,land_cover_class\n\
             41.8,13.6,2005-07-01,295.4,22.25,266.1,259.7,4\n\
             41.9,13.7,2005-07-01,,22.3,266.0,259.0,4\n",
        )
        .unwrap();

        let (rows, dropped) = TableReader::new().read_fused_table(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(dropped, 1);
        assert_eq!(rows[0].land_cover_class, 4);
    }
}
