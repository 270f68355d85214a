use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{Channel, MergedTbRecord, PassType, TbRecord};
use crate::readers::TableReader;
use crate::utils::coordinates::swath_bin;
use crate::utils::filename::{combined_csv_path, merged_csv_path};
use crate::writers::csv_writer;

/// Inner-joins the two frequency channels into the canonical per-day
/// fused instrument table.
pub struct ChannelMerger {
    data_root: PathBuf,
    reader: TableReader,
}

impl ChannelMerger {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            reader: TableReader::new(),
        }
    }

    /// Merge both pass directions for one day. Returns `None` when no pass
    /// had both channel tables or the join was empty: a skipped day, not
    /// an error.
    pub fn merge_day(&self, date: NaiveDate) -> Result<Option<PathBuf>> {
        let output = merged_csv_path(&self.data_root, date);
        if output.exists() {
            info!(date = %date, "merged table already exists, skipping");
            return Ok(Some(output));
        }

        let mut rows = Vec::new();
        for pass_type in [PassType::Ascending, PassType::Descending] {
            let path_37 = combined_csv_path(&self.data_root, date, Channel::Ghz37, pass_type);
            let path_19 = combined_csv_path(&self.data_root, date, Channel::Ghz19, pass_type);
            if !path_37.exists() || !path_19.exists() {
                warn!(date = %date, pass = %pass_type, "missing combined table, skipping pass");
                continue;
            }

            let table_37 = self.reader.read_tb_table(&path_37)?;
            let table_19 = self.reader.read_tb_table(&path_19)?;
            rows.extend(merge_tables(date, &table_37, &table_19));
        }

        if rows.is_empty() {
            warn!(date = %date, "no cross-channel correspondence");
            return Ok(None);
        }

        csv_writer::write_merged(&output, &rows)?;
        info!(path = %output.display(), rows = rows.len(), "wrote merged table");
        Ok(Some(output))
    }
}

/// Inner join on (latitude, longitude, pass type), exact on the
/// already-rounded swath coordinates. Rows where either channel reads
/// exactly 0.0 are artifacts of no-data cells and are dropped after the
/// join; coordinates present in only one channel are excluded, not errors.
pub fn merge_tables(
    date: NaiveDate,
    table_37: &[TbRecord],
    table_19: &[TbRecord],
) -> Vec<MergedTbRecord> {
    let mut index_19: HashMap<(i64, i64, PassType), Vec<f64>> = HashMap::new();
    for record in table_19 {
        index_19
            .entry(join_key(record))
            .or_default()
            .push(record.brightness_temp);
    }

    let mut rows = Vec::new();
    for record in table_37 {
        let Some(matches) = index_19.get(&join_key(record)) else {
            continue;
        };
        for &tb_19v in matches {
            if record.brightness_temp == 0.0 || tb_19v == 0.0 {
                continue;
            }
            rows.push(MergedTbRecord {
                date,
                latitude: record.latitude,
                longitude: record.longitude,
                brightness_temp_37v: record.brightness_temp,
                brightness_temp_19v: tb_19v,
            });
        }
    }
    rows
}

fn join_key(record: &TbRecord) -> (i64, i64, PassType) {
    (
        swath_bin(record.latitude),
        swath_bin(record.longitude),
        record.pass_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lat: f64, lon: f64, tb: f64, pass_type: PassType) -> TbRecord {
        TbRecord {
            latitude: lat,
            longitude: lon,
            brightness_temp: tb,
            pass_type,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2005, 7, 1).unwrap()
    }

    #[test]
    fn test_join_on_shared_coordinates() {
        let table_37 = vec![
            record(40.0, -3.0, 250.0, PassType::Ascending),
            record(41.0, -4.0, 260.0, PassType::Ascending),
        ];
        let table_19 = vec![
            record(40.0, -3.0, 255.0, PassType::Ascending),
            record(41.0, -4.0, 265.0, PassType::Ascending),
        ];

        let rows = merge_tables(date(), &table_37, &table_19);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].brightness_temp_37v, 250.0);
        assert_eq!(rows[0].brightness_temp_19v, 255.0);
        assert_eq!(rows[1].brightness_temp_37v, 260.0);
        assert_eq!(rows[1].brightness_temp_19v, 265.0);
    }

    #[test]
    fn test_unmatched_coordinates_excluded() {
        let table_37 = vec![record(40.0, -3.0, 250.0, PassType::Ascending)];
        let table_19 = vec![record(48.31, -105.1, 255.0, PassType::Ascending)];

        assert!(merge_tables(date(), &table_37, &table_19).is_empty());
    }

    #[test]
    fn test_pass_type_is_part_of_the_key() {
        let table_37 = vec![record(40.0, -3.0, 250.0, PassType::Ascending)];
        let table_19 = vec![record(40.0, -3.0, 255.0, PassType::Descending)];

        assert!(merge_tables(date(), &table_37, &table_19).is_empty());
    }

    #[test]
    fn test_zero_sentinel_rows_dropped() {
        let table_37 = vec![
            record(40.0, -3.0, 0.0, PassType::Descending),
            record(41.0, -4.0, 260.0, PassType::Descending),
        ];
        let table_19 = vec![
            record(40.0, -3.0, 255.0, PassType::Descending),
            record(41.0, -4.0, 0.0, PassType::Descending),
        ];

        let rows = merge_tables(date(), &table_37, &table_19);
        assert!(rows.is_empty());

        // And every surviving row keeps non-zero readings from both tables
        let table_19_ok = vec![record(41.0, -4.0, 265.0, PassType::Descending)];
        let rows = merge_tables(date(), &table_37, &table_19_ok);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].brightness_temp_37v != 0.0 && rows[0].brightness_temp_19v != 0.0);
    }

    #[test]
    fn test_duplicate_keys_pair_fully() {
        // Two 19GHz readings at one location pair with the single 37GHz
        // reading there, inner-join style.
        let table_37 = vec![record(40.0, -3.0, 250.0, PassType::Ascending)];
        let table_19 = vec![
            record(40.0, -3.0, 255.0, PassType::Ascending),
            record(40.0, -3.0, 256.0, PassType::Ascending),
        ];

        let rows = merge_tables(date(), &table_37, &table_19);
        assert_eq!(rows.len(), 2);
    }
}
