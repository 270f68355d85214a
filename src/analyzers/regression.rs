use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::models::{DailyRegressionRecord, LinearFit, Season, WindowMatch};
use crate::readers::TableReader;
use crate::utils::constants::{
    GLOBAL_FIT_TB_MIN_KELVIN, MIN_DAILY_FIT_POINTS, MIN_GLOBAL_FIT_POINTS, TEMP_MAX_KELVIN,
    TEMP_MIN_KELVIN,
};
use crate::utils::filename::parse_matched_date;

/// Seam for the off-the-shelf model collaborators (k-NN, SVR, forests,
/// boosting): anything that fits X against y and predicts.
pub trait Estimator {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()>;
    fn predict(&self, x: &[f64]) -> Vec<f64>;
}

/// Univariate ordinary least squares.
pub struct LinearRegression {
    fit: Option<LinearFit>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self { fit: None }
    }

    pub fn coefficients(&self) -> Option<LinearFit> {
        self.fit
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        self.fit = ols(x, y);
        match self.fit {
            Some(_) => Ok(()),
            None => Err(crate::error::FusionError::MissingData(
                "fewer than two distinct points for regression".to_string(),
            )),
        }
    }

    fn predict(&self, x: &[f64]) -> Vec<f64> {
        match self.fit {
            Some(fit) => x.iter().map(|&v| fit.predict(v)).collect(),
            None => Vec::new(),
        }
    }
}

/// Closed-form OLS of `y ≈ a·x + b` with R² and RMSE.
///
/// Returns `None` below two points or when x carries no variance (a
/// vertical point cloud has no defined slope).
pub fn ols(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let mean_x = x[..n].iter().sum::<f64>() / n_f;
    let mean_y = y[..n].iter().sum::<f64>() / n_f;

    let mut ss_xx = 0.0;
    let mut ss_xy = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        ss_xx += dx * dx;
        ss_xy += dx * (y[i] - mean_y);
    }
    if ss_xx == 0.0 {
        return None;
    }

    let slope = ss_xy / ss_xx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for i in 0..n {
        let predicted = slope * x[i] + intercept;
        ss_res += (y[i] - predicted).powi(2);
        ss_tot += (y[i] - mean_y).powi(2);
    }

    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };
    let rmse = (ss_res / n_f).sqrt();

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        rmse,
        n_points: n,
    })
}

/// Pooled multi-day fit plus per-season point counts for downstream
/// grouping; the fit itself uses all points regardless of season.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GlobalFit {
    pub fit: LinearFit,
    pub season_counts: HashMap<Season, usize>,
}

/// Fits daily and pooled regressions over a folder of matched tables.
///
/// Value bounds and the minimum point count vary by call site (the daily
/// fit admits TB above 180 K, the pooled fit above 220 K), so both are
/// builder-configurable rather than fixed.
pub struct RegressionFitter {
    min_points: usize,
    tb_min: f64,
    tb_min_inclusive: bool,
    reader: TableReader,
}

impl RegressionFitter {
    pub fn new() -> Self {
        Self {
            min_points: MIN_DAILY_FIT_POINTS,
            tb_min: TEMP_MIN_KELVIN,
            tb_min_inclusive: false,
            reader: TableReader::new(),
        }
    }

    /// Configuration used by the pooled multi-day fit.
    pub fn for_global_fit() -> Self {
        Self::new()
            .with_min_points(MIN_GLOBAL_FIT_POINTS)
            .with_tb_lower_bound(GLOBAL_FIT_TB_MIN_KELVIN, true)
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn with_tb_lower_bound(mut self, tb_min: f64, inclusive: bool) -> Self {
        self.tb_min = tb_min;
        self.tb_min_inclusive = inclusive;
        self
    }

    /// Valid (TB, temperature) pairs of one matched table: missing means
    /// dropped, both series bounded to the plausible range.
    fn valid_pairs(&self, matches: &[WindowMatch]) -> (Vec<f64>, Vec<f64>) {
        let mut tb = Vec::new();
        let mut temp = Vec::new();
        for m in matches {
            let Some(tb_value) = m.brightness_temp else {
                continue;
            };
            if !tb_value.is_finite() {
                continue;
            }
            let above_min = if self.tb_min_inclusive {
                tb_value >= self.tb_min
            } else {
                tb_value > self.tb_min
            };
            if !above_min || tb_value >= TEMP_MAX_KELVIN {
                continue;
            }
            if m.temperature <= TEMP_MIN_KELVIN || m.temperature >= TEMP_MAX_KELVIN {
                continue;
            }
            tb.push(tb_value);
            temp.push(m.temperature);
        }
        (tb, temp)
    }

    fn matched_files(&self, folder: &Path) -> Result<Vec<(chrono::NaiveDate, PathBuf)>> {
        let mut files: Vec<(chrono::NaiveDate, PathBuf)> = std::fs::read_dir(folder)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let date = parse_matched_date(path.file_name()?.to_str()?)?;
                Some((date, path))
            })
            .collect();
        files.sort_by_key(|(date, _)| *date);
        Ok(files)
    }

    /// One regression record per day with enough valid pairs; days below
    /// the threshold are absent from the output, never zero rows.
    pub fn fit_daily(&self, folder: &Path) -> Result<Vec<DailyRegressionRecord>> {
        let mut records = Vec::new();

        for (date, path) in self.matched_files(folder)? {
            let matches = match self.reader.read_matched_table(&path) {
                Ok(matches) => matches,
                Err(e) if !e.is_fatal() => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable matched table");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let (tb, temp) = self.valid_pairs(&matches);
            if tb.len() < self.min_points {
                info!(date = %date, points = tb.len(), "not enough valid pairs, day skipped");
                continue;
            }

            if let Some(fit) = ols(&tb, &temp) {
                records.push(DailyRegressionRecord {
                    date,
                    slope: fit.slope,
                    intercept: fit.intercept,
                    r_squared: fit.r_squared,
                    rmse: fit.rmse,
                    n_points: fit.n_points,
                });
            }
        }

        Ok(records)
    }

    /// Pooled fit over every matched table in the folder, with points
    /// bucketed into meteorological seasons for later visual grouping.
    pub fn fit_global(&self, folder: &Path) -> Result<Option<GlobalFit>> {
        let mut tb_all = Vec::new();
        let mut temp_all = Vec::new();
        let mut season_counts: HashMap<Season, usize> = HashMap::new();

        for (date, path) in self.matched_files(folder)? {
            let matches = match self.reader.read_matched_table(&path) {
                Ok(matches) => matches,
                Err(e) if !e.is_fatal() => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable matched table");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let (tb, temp) = self.valid_pairs(&matches);
            *season_counts.entry(Season::from_date(date)).or_default() += tb.len();
            tb_all.extend(tb);
            temp_all.extend(temp);
        }

        if tb_all.len() < self.min_points {
            info!(points = tb_all.len(), "not enough pooled pairs for a global fit");
            return Ok(None);
        }

        Ok(ols(&tb_all, &temp_all).map(|fit| GlobalFit {
            fit,
            season_counts,
        }))
    }
}

impl Default for RegressionFitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;
    use crate::utils::filename::matched_csv_path;
    use crate::writers::csv_writer;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn window_match(tb: Option<f64>, temp: f64) -> WindowMatch {
        WindowMatch {
            station: "Hainich, DE".to_string(),
            latitude: 51.08,
            longitude: 10.45,
            brightness_temp: tb,
            temperature: temp,
        }
    }

    #[test]
    fn test_ols_recovers_exact_line() {
        let x = [250.0, 260.0, 270.0, 280.0];
        let y: Vec<f64> = x.iter().map(|&v| 0.8 * v + 60.0).collect();

        let fit = ols(&x, &y).unwrap();
        assert!((fit.slope - 0.8).abs() < 1e-9);
        assert!((fit.intercept - 60.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!(fit.rmse < 1e-9);
        assert_eq!(fit.n_points, 4);
    }

    #[test]
    fn test_ols_degenerate_inputs() {
        assert!(ols(&[250.0], &[280.0]).is_none());
        // No variance in x
        assert!(ols(&[250.0, 250.0], &[280.0, 290.0]).is_none());
    }

    #[test]
    fn test_estimator_roundtrip() {
        let x = [250.0, 260.0, 270.0];
        let y = [275.0, 283.0, 291.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let predictions = model.predict(&[280.0]);
        assert_eq!(predictions.len(), 1);
        assert!((predictions[0] - 299.0).abs() < 1e-9);
    }

    #[test]
    fn test_valid_pairs_filtering() {
        let fitter = RegressionFitter::new();
        let matches = vec![
            window_match(Some(265.0), 281.0), // valid
            window_match(None, 281.0),        // missing TB
            window_match(Some(170.0), 281.0), // TB below plausible range
            window_match(Some(265.0), 340.0), // temperature above range
            window_match(Some(f64::NAN), 281.0),
        ];

        let (tb, temp) = fitter.valid_pairs(&matches);
        assert_eq!(tb, vec![265.0]);
        assert_eq!(temp, vec![281.0]);
    }

    #[test]
    fn test_global_bound_is_inclusive_at_220() {
        let daily = RegressionFitter::new();
        let global = RegressionFitter::for_global_fit();
        let matches = vec![window_match(Some(220.0), 281.0)];

        // 220 passes the daily filter (bound at 180) and the inclusive
        // global bound, but 219.9 fails the global one.
        assert_eq!(daily.valid_pairs(&matches).0.len(), 1);
        assert_eq!(global.valid_pairs(&matches).0.len(), 1);
        let below = vec![window_match(Some(219.9), 281.0)];
        assert_eq!(global.valid_pairs(&below).0.len(), 0);
    }

    #[test]
    fn test_day_below_threshold_absent_from_table() {
        let dir = TempDir::new().unwrap();

        // One valid point only: below any reasonable minimum
        let date = NaiveDate::from_ymd_opt(2005, 7, 1).unwrap();
        let path = matched_csv_path(dir.path(), date);
        csv_writer::write_window_matches(
            &path,
            &[window_match(Some(265.0), 281.0)],
            Channel::Ghz37,
        )
        .unwrap();

        let records = RegressionFitter::new().fit_daily(dir.path()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_daily_fit_produces_records() {
        let dir = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2005, 7, 1).unwrap();
        let path = matched_csv_path(dir.path(), date);

        let matches = vec![
            window_match(Some(250.0), 270.0),
            window_match(Some(260.0), 278.0),
            window_match(Some(270.0), 286.0),
        ];
        csv_writer::write_window_matches(&path, &matches, Channel::Ghz37).unwrap();

        let records = RegressionFitter::new().fit_daily(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date);
        assert_eq!(records[0].n_points, 3);
        assert!((records[0].slope - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_global_fit_buckets_seasons() {
        let dir = TempDir::new().unwrap();

        let winter = NaiveDate::from_ymd_opt(2005, 1, 15).unwrap();
        let summer = NaiveDate::from_ymd_opt(2005, 7, 15).unwrap();
        for (date, base) in [(winter, 240.0), (summer, 280.0)] {
            let matches = vec![
                window_match(Some(base), base + 15.0),
                window_match(Some(base + 10.0), base + 23.0),
            ];
            csv_writer::write_window_matches(
                &matched_csv_path(dir.path(), date),
                &matches,
                Channel::Ghz37,
            )
            .unwrap();
        }

        let global = RegressionFitter::for_global_fit()
            .fit_global(dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(global.fit.n_points, 4);
        assert_eq!(global.season_counts[&Season::Winter], 2);
        assert_eq!(global.season_counts[&Season::Summer], 2);
    }
}
