use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{FusedObservation, LstSample, MergedTbRecord};
use crate::readers::{LandCoverMap, ModisReader, TableReader};
use crate::utils::coordinates::{fusion_bin, fusion_bin_value};
use crate::utils::filename::{
    fused_csv_path, merged_csv_path, parse_modis_day_index, MODIS_DAY_PREFIX,
};
use crate::writers::csv_writer;

const KELVIN_OFFSET: f64 = 273.15;

/// Joins per-day MODIS LST tables with the merged instrument tables and
/// enriches the result with land-cover classes.
///
/// Coordinates from both sources are harmonised to one decimal place
/// before joining, the coarsest common resolution across the 1 km MODIS
/// grid, the instrument footprint, and the 0.25° land-cover raster.
pub struct DatasetFuser {
    land_cover: LandCoverMap,
    modis: ModisReader,
    reader: TableReader,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FuseSummary {
    pub fused_days: usize,
    pub already_cached: usize,
    pub skipped: usize,
}

impl DatasetFuser {
    pub fn new(land_cover: LandCoverMap, epoch_year: i32) -> Self {
        Self {
            land_cover,
            modis: ModisReader::new(epoch_year),
            reader: TableReader::new(),
        }
    }

    /// Fuse every per-day MODIS table in `modis_dir`, in day order.
    /// Per-day failures are logged and the sweep continues.
    pub fn fuse_all(
        &self,
        modis_dir: &Path,
        amsre_root: &Path,
        output_root: &Path,
    ) -> Result<FuseSummary> {
        std::fs::create_dir_all(output_root)?;

        let mut day_files: Vec<(u32, PathBuf)> = std::fs::read_dir(modis_dir)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let day = parse_modis_day_index(path.file_name()?.to_str()?)?;
                Some((day, path))
            })
            .collect();
        day_files.sort_by_key(|(day, _)| *day);

        if day_files.is_empty() {
            warn!(dir = %modis_dir.display(), prefix = MODIS_DAY_PREFIX, "no MODIS day tables found");
        }

        let mut summary = FuseSummary::default();
        for (day_index, modis_file) in day_files {
            match self.fuse_day(&modis_file, day_index, amsre_root, output_root) {
                Ok(DayOutcome::Fused) => summary.fused_days += 1,
                Ok(DayOutcome::AlreadyCached) => summary.already_cached += 1,
                Ok(DayOutcome::Skipped) => summary.skipped += 1,
                Err(e) if !e.is_fatal() => {
                    warn!(file = %modis_file.display(), error = %e, "skipping day");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    fn fuse_day(
        &self,
        modis_file: &Path,
        day_index: u32,
        amsre_root: &Path,
        output_root: &Path,
    ) -> Result<DayOutcome> {
        let date = self.modis.date_for_day(day_index)?;

        let output = fused_csv_path(output_root, date);
        if output.exists() {
            info!(date = %date, "fused table already exists, skipping");
            return Ok(DayOutcome::AlreadyCached);
        }

        let amsre_file = merged_csv_path(amsre_root, date);
        if !amsre_file.exists() {
            warn!(date = %date, path = %amsre_file.display(), "missing merged instrument table");
            return Ok(DayOutcome::Skipped);
        }

        let lst_rows = self.reader.read_lst_table(modis_file)?;
        let tb_rows = self.reader.read_merged_table(&amsre_file)?;

        let fused = self.fuse_tables(date, &lst_rows, &tb_rows);
        if fused.is_empty() {
            info!(date = %date, "no spatial correspondence between MODIS and instrument tables");
            return Ok(DayOutcome::Skipped);
        }

        csv_writer::write_fused(&output, &fused)?;
        info!(path = %output.display(), rows = fused.len(), "wrote fused table");
        Ok(DayOutcome::Fused)
    }

    /// Inner join on (lat, lon, date) at one-decimal resolution, then
    /// nearest-neighbour land-cover enrichment at the exact joined point.
    pub fn fuse_tables(
        &self,
        date: NaiveDate,
        lst_rows: &[LstSample],
        tb_rows: &[MergedTbRecord],
    ) -> Vec<FusedObservation> {
        let mut tb_index: HashMap<(i64, i64), Vec<(f64, f64)>> = HashMap::new();
        for record in tb_rows {
            if record.date != date {
                continue;
            }
            let key = (fusion_bin(record.latitude), fusion_bin(record.longitude));
            tb_index
                .entry(key)
                .or_default()
                .push((record.brightness_temp_37v, record.brightness_temp_19v));
        }

        let mut fused = Vec::new();
        for sample in lst_rows {
            if sample.date != date {
                continue;
            }
            let key = (fusion_bin(sample.latitude), fusion_bin(sample.longitude));
            let Some(tb_matches) = tb_index.get(&key) else {
                continue;
            };

            let latitude = fusion_bin_value(key.0);
            let longitude = fusion_bin_value(key.1);
            let land_cover_class = self.land_cover.nearest(latitude, longitude);

            for &(tb_37v, tb_19v) in tb_matches {
                fused.push(FusedObservation {
                    latitude,
                    longitude,
                    date,
                    lst_kelvin: sample.lst_kelvin,
                    lst_celsius: sample.lst_kelvin - KELVIN_OFFSET,
                    brightness_temp_37v: tb_37v,
                    brightness_temp_19v: tb_19v,
                    land_cover_class,
                });
            }
        }
        fused
    }
}

enum DayOutcome {
    Fused,
    AlreadyCached,
    Skipped,
}

/// Final cleaning stage: one pass over the whole accumulated fused
/// dataset, applied separately from per-day fusion.
///
/// Drops rows with any missing field and keeps only rows whose LST and
/// both TB channels fall inside the [220, 330] K training gate. The
/// cleaned table is rebuilt from scratch on every run.
pub struct DatasetCleaner {
    reader: TableReader,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanSummary {
    pub files: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
}

impl DatasetCleaner {
    pub fn new() -> Self {
        Self {
            reader: TableReader::new(),
        }
    }

    pub fn clean(
        &self,
        fused_dir: &Path,
        output_csv: &Path,
        parquet_output: Option<&Path>,
    ) -> Result<CleanSummary> {
        let mut day_files: Vec<PathBuf> = std::fs::read_dir(fused_dir)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let name = path.file_name()?.to_str()?;
                (name.starts_with(crate::utils::filename::FUSED_PREFIX) && name.ends_with(".csv"))
                    .then_some(path)
            })
            .collect();
        day_files.sort();

        if let Some(parent) = output_csv.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if output_csv.exists() {
            std::fs::remove_file(output_csv)?;
        }

        let mut csv_out = csv::Writer::from_path(output_csv)?;
        csv_writer::write_fused_header(&mut csv_out)?;

        let mut parquet_out = match parquet_output {
            Some(path) => Some(crate::writers::ParquetTableWriter::create(path, "snappy")?),
            None => None,
        };

        let mut summary = CleanSummary::default();
        for file in &day_files {
            let (rows, dropped) = match self.reader.read_fused_table(file) {
                Ok(result) => result,
                Err(e) if !e.is_fatal() => {
                    warn!(file = %file.display(), error = %e, "skipping unreadable fused table");
                    continue;
                }
                Err(e) => return Err(e),
            };

            summary.files += 1;
            summary.rows_read += rows.len() + dropped;

            let kept: Vec<FusedObservation> = rows
                .into_iter()
                .filter(FusedObservation::is_within_training_bounds)
                .collect();
            summary.rows_kept += kept.len();

            for row in &kept {
                csv_writer::write_fused_row(&mut csv_out, row)?;
            }
            if let Some(writer) = parquet_out.as_mut() {
                writer.append_records(&kept)?;
            }
        }

        csv_out.flush()?;
        if let Some(writer) = parquet_out {
            writer.close()?;
        }

        summary.rows_dropped = summary.rows_read - summary.rows_kept;
        info!(
            files = summary.files,
            kept = summary.rows_kept,
            dropped = summary.rows_dropped,
            "cleaned training table written"
        );
        Ok(summary)
    }
}

impl Default for DatasetCleaner {
    fn default() -> Self {
        Self::new()
    }
}
