use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::constants::{TRAINING_MAX_KELVIN, TRAINING_MIN_KELVIN};

/// One row of a combined per-channel daily table
/// (`amsre_combined_{freq}_{date}_{pass}.csv`).
#[derive(Debug, Clone, PartialEq)]
pub struct TbRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub brightness_temp: f64,
    pub pass_type: crate::models::PassType,
}

/// One row of the canonical per-day fused instrument table
/// (`merged_amsre_data_{date}.csv`): both channels at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedTbRecord {
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub brightness_temp_37v: f64,
    pub brightness_temp_19v: f64,
}

/// One MODIS land-surface-temperature sample for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstSample {
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    #[serde(rename = "LST_Kelvin")]
    pub lst_kelvin: f64,
}

/// One row of the per-day training table produced by the dataset fuser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FusedObservation {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    pub date: NaiveDate,

    #[serde(rename = "LST_Kelvin")]
    pub lst_kelvin: f64,

    #[serde(rename = "LST_Celsius")]
    pub lst_celsius: f64,

    pub brightness_temp_37v: f64,
    pub brightness_temp_19v: f64,
    pub land_cover_class: i32,
}

impl FusedObservation {
    /// The final training-data admission gate: tighter than the per-stage
    /// [180, 330] filters on purpose.
    pub fn is_within_training_bounds(&self) -> bool {
        let in_bounds =
            |v: f64| (TRAINING_MIN_KELVIN..=TRAINING_MAX_KELVIN).contains(&v) && v.is_finite();
        in_bounds(self.lst_kelvin)
            && in_bounds(self.brightness_temp_37v)
            && in_bounds(self.brightness_temp_19v)
    }
}
