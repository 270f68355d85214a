//! Cache-path grammar of the pipeline.
//!
//! File names are deterministic functions of (date, frequency, pass type);
//! their presence on disk is the idempotence contract that makes multi-month
//! backfills resumable, so the grammar here is an external interface and
//! must not drift.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::models::{Channel, PassType};

pub const MATCHED_PREFIX: &str = "matched_tb_fluxnet_";
pub const FUSED_PREFIX: &str = "merged_dataset_";
pub const MODIS_DAY_PREFIX: &str = "modis_lst_";

/// `{root}/{date}/amsre_combined_{freq}_{date}_{pass}.csv`
pub fn combined_csv_path(
    root: &Path,
    date: NaiveDate,
    channel: Channel,
    pass_type: PassType,
) -> PathBuf {
    let date_str = date.format("%Y-%m-%d");
    root.join(date_str.to_string()).join(format!(
        "amsre_combined_{}_{}_{}.csv",
        channel.label(),
        date_str,
        pass_type
    ))
}

/// `{root}/{date}/merged_amsre_data_{date}.csv`
pub fn merged_csv_path(root: &Path, date: NaiveDate) -> PathBuf {
    let date_str = date.format("%Y-%m-%d");
    root.join(date_str.to_string())
        .join(format!("merged_amsre_data_{}.csv", date_str))
}

/// `{root}/matched_tb_fluxnet_{YYYYMMDD}.csv`
pub fn matched_csv_path(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(format!("{}{}.csv", MATCHED_PREFIX, date.format("%Y%m%d")))
}

/// `{root}/amsre_tb_station_{date}.csv`
pub fn station_pixels_csv_path(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(format!("amsre_tb_station_{}.csv", date.format("%Y-%m-%d")))
}

/// `{root}/modis_lst_{doy}.csv`
pub fn modis_day_csv_path(root: &Path, day_index: u32) -> PathBuf {
    root.join(format!("{}{}.csv", MODIS_DAY_PREFIX, day_index))
}

/// `{root}/merged_dataset_{date}.csv`
pub fn fused_csv_path(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(format!("{}{}.csv", FUSED_PREFIX, date.format("%Y-%m-%d")))
}

/// `{root}/daily_regressions_{freq}.csv`
pub fn daily_regressions_path(root: &Path, channel: Channel) -> PathBuf {
    root.join(format!("daily_regressions_{}.csv", channel.label()))
}

/// Extract the `YYYYMMDD` date from a matched-table file name.
pub fn parse_matched_date(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name.strip_prefix(MATCHED_PREFIX)?.strip_suffix(".csv")?;
    NaiveDate::parse_from_str(stem, "%Y%m%d").ok()
}

/// Extract the day-of-year index from a MODIS day-table file name.
pub fn parse_modis_day_index(file_name: &str) -> Option<u32> {
    let stem = file_name
        .strip_prefix(MODIS_DAY_PREFIX)?
        .strip_suffix(".csv")?;
    stem.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2005, 7, 1).unwrap()
    }

    #[test]
    fn test_combined_path_grammar() {
        let path = combined_csv_path(
            Path::new("data/processed/amsre"),
            date(),
            Channel::Ghz37,
            PassType::Ascending,
        );
        assert_eq!(
            path,
            Path::new("data/processed/amsre/2005-07-01/amsre_combined_37GHz_2005-07-01_ascending.csv")
        );
    }

    #[test]
    fn test_merged_and_fused_paths() {
        assert_eq!(
            merged_csv_path(Path::new("amsre"), date()),
            Path::new("amsre/2005-07-01/merged_amsre_data_2005-07-01.csv")
        );
        assert_eq!(
            fused_csv_path(Path::new("merged"), date()),
            Path::new("merged/merged_dataset_2005-07-01.csv")
        );
    }

    #[test]
    fn test_matched_path_roundtrip() {
        let path = matched_csv_path(Path::new("matched"), date());
        assert_eq!(path, Path::new("matched/matched_tb_fluxnet_20050701.csv"));

        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(parse_matched_date(name), Some(date()));
        assert_eq!(parse_matched_date("matched_tb_fluxnet_2005.csv"), None);
        assert_eq!(parse_matched_date("other_20050701.csv"), None);
    }

    #[test]
    fn test_modis_day_roundtrip() {
        let path = modis_day_csv_path(Path::new("modis"), 181);
        assert_eq!(path, Path::new("modis/modis_lst_181.csv"));
        assert_eq!(parse_modis_day_index("modis_lst_181.csv"), Some(181));
        assert_eq!(parse_modis_day_index("modis_lst_x.csv"), None);
    }
}
