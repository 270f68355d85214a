use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Coefficients and goodness-of-fit metrics of one univariate OLS fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub rmse: f64,
    pub n_points: usize,
}

impl LinearFit {
    pub fn predict(&self, tb: f64) -> f64 {
        self.slope * tb + self.intercept
    }
}

/// One row of the running daily-regression metrics table
/// (`daily_regressions_{freq}.csv`). Days without enough valid pairs are
/// absent from the table, never recorded as zero rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRegressionRecord {
    pub date: NaiveDate,
    #[serde(rename = "a")]
    pub slope: f64,
    #[serde(rename = "b")]
    pub intercept: f64,
    #[serde(rename = "r2")]
    pub r_squared: f64,
    pub rmse: f64,
    pub n_points: usize,
}

/// Meteorological season, used only to group pooled points for downstream
/// inspection; the global fit itself is season-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
