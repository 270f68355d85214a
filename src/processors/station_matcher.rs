use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{
    station_registry, Channel, PassType, PixelMatch, StationCoordinates, TbRecord, WindowMatch,
};
use crate::readers::fluxnet_reader::clean_temperature;
use crate::readers::{FluxnetTable, SwathGrid, TableReader};
use crate::utils::constants::{
    NEAREST_PIXEL_TOLERANCE_DEG, STATION_WINDOW_DEG, TEMP_MAX_KELVIN, TEMP_MIN_KELVIN,
};
use crate::utils::coordinates::manhattan_distance;
use crate::utils::filename::{combined_csv_path, matched_csv_path};
use crate::writers::csv_writer;

/// The two station-matching strategies.
///
/// Window-mean matching and nearest-pixel matching use different spatial
/// thresholds (a 1-degree box vs a 0.3-degree tolerance); both are
/// configurable but deliberately not unified, see DESIGN.md.
pub struct StationMatcher {
    window_deg: f64,
    tolerance_deg: f64,
}

impl StationMatcher {
    pub fn new() -> Self {
        Self {
            window_deg: STATION_WINDOW_DEG,
            tolerance_deg: NEAREST_PIXEL_TOLERANCE_DEG,
        }
    }

    pub fn with_window(mut self, window_deg: f64) -> Self {
        self.window_deg = window_deg;
        self
    }

    pub fn with_tolerance(mut self, tolerance_deg: f64) -> Self {
        self.tolerance_deg = tolerance_deg;
        self
    }

    /// Match one FLUXNET day row against one daily TB table.
    ///
    /// Each station gets the mean of every instrument pixel inside its
    /// window. Stations without coordinates, with unparseable temperature
    /// values, or with temperatures outside [180, 330] K are logged and
    /// excluded, never defaulted to a placeholder.
    pub fn match_window_means(
        &self,
        fluxnet_row: &[(&str, &str)],
        coordinates: &[StationCoordinates],
        tb_table: &[TbRecord],
    ) -> Vec<WindowMatch> {
        let mut matches = Vec::new();

        for &(station, raw_value) in fluxnet_row {
            let Some(coord) = coordinates.iter().find(|c| c.name == station) else {
                warn!(station, "missing coordinates for station");
                continue;
            };

            let mut sum = 0.0;
            let mut count = 0usize;
            for record in tb_table {
                if (record.latitude - coord.latitude).abs() <= self.window_deg
                    && (record.longitude - coord.longitude).abs() <= self.window_deg
                {
                    sum += record.brightness_temp;
                    count += 1;
                }
            }
            let brightness_temp = if count > 0 {
                Some(sum / count as f64)
            } else {
                None
            };

            let Some(temperature) = clean_temperature(raw_value) else {
                warn!(station, value = raw_value, "illegible temperature ignored");
                continue;
            };
            if !(TEMP_MIN_KELVIN..=TEMP_MAX_KELVIN).contains(&temperature) {
                warn!(
                    station,
                    temperature, "temperature outside realistic range ignored"
                );
                continue;
            }

            matches.push(WindowMatch {
                station: station.to_string(),
                latitude: coord.latitude,
                longitude: coord.longitude,
                brightness_temp,
                temperature,
            });
        }

        matches
    }

    /// Record every grid pixel within tolerance of each registry station.
    ///
    /// All qualifying pixels are kept (not just the closest) with their
    /// Manhattan distance, and no deduplication happens across stations: a
    /// pixel near two stations appears twice.
    pub fn match_nearest_pixels(&self, grid: &SwathGrid) -> Vec<PixelMatch> {
        let mut matches = Vec::new();
        let (rows, cols) = grid.latitude.dim();

        for station in station_registry() {
            for i in 0..rows {
                for j in 0..cols {
                    let lat = grid.latitude[[i, j]];
                    let lon = grid.longitude[[i, j]];
                    let lat_diff = (lat - station.latitude).abs();
                    let lon_diff = (lon - station.longitude).abs();
                    if lat_diff < self.tolerance_deg && lon_diff < self.tolerance_deg {
                        matches.push(PixelMatch {
                            station: station.name.to_string(),
                            station_lat: station.latitude,
                            station_lon: station.longitude,
                            pixel_lat: lat,
                            pixel_lon: lon,
                            distance: manhattan_distance(
                                lat,
                                lon,
                                station.latitude,
                                station.longitude,
                            ),
                            brightness_temp: grid.values[[i, j]],
                        });
                    }
                }
            }
        }

        matches
    }
}

impl Default for StationMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterates a date range, producing one matched table per day with
/// FLUXNET data and a TB table; everything else is a logged skip.
pub struct DailyMatcher {
    matcher: StationMatcher,
    channel: Channel,
    pass_type: PassType,
    reader: TableReader,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchSummary {
    pub matched_days: usize,
    pub already_cached: usize,
    pub skipped: usize,
}

impl DailyMatcher {
    pub fn new(channel: Channel) -> Self {
        Self {
            matcher: StationMatcher::new(),
            channel,
            // Descending overpasses are the night-time readings the study
            // compares against tower temperatures.
            pass_type: PassType::Descending,
            reader: TableReader::new(),
        }
    }

    pub fn with_pass_type(mut self, pass_type: PassType) -> Self {
        self.pass_type = pass_type;
        self
    }

    pub fn with_matcher(mut self, matcher: StationMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Produce `matched_tb_fluxnet_{YYYYMMDD}.csv` for every day in the
    /// inclusive range. Existing outputs are left untouched.
    pub fn run(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        fluxnet: &FluxnetTable,
        coordinates: &[StationCoordinates],
        tb_root: &Path,
        output_root: &Path,
    ) -> Result<MatchSummary> {
        std::fs::create_dir_all(output_root)?;
        let mut summary = MatchSummary::default();

        let mut date = start;
        while date <= end {
            match self.run_day(date, fluxnet, coordinates, tb_root, output_root) {
                Ok(DayOutcome::Matched) => summary.matched_days += 1,
                Ok(DayOutcome::AlreadyCached) => summary.already_cached += 1,
                Ok(DayOutcome::Skipped) => summary.skipped += 1,
                Err(e) if !e.is_fatal() => {
                    warn!(date = %date, error = %e, "skipping day");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        Ok(summary)
    }

    fn run_day(
        &self,
        date: NaiveDate,
        fluxnet: &FluxnetTable,
        coordinates: &[StationCoordinates],
        tb_root: &Path,
        output_root: &Path,
    ) -> Result<DayOutcome> {
        let output = matched_csv_path(output_root, date);
        if output.exists() {
            info!(date = %date, "matched table already exists, skipping");
            return Ok(DayOutcome::AlreadyCached);
        }

        let Some(fluxnet_row) = fluxnet.row(date) else {
            info!(date = %date, "no FLUXNET data");
            return Ok(DayOutcome::Skipped);
        };

        let tb_path = combined_csv_path(tb_root, date, self.channel, self.pass_type);
        if !tb_path.exists() {
            warn!(date = %date, path = %tb_path.display(), "missing TB table");
            return Ok(DayOutcome::Skipped);
        }

        let tb_table = self.reader.read_tb_table(&tb_path)?;
        let matches = self
            .matcher
            .match_window_means(&fluxnet_row, coordinates, &tb_table);
        csv_writer::write_window_matches(&output, &matches, self.channel)?;
        info!(path = %output.display(), stations = matches.len(), "wrote matched table");

        Ok(DayOutcome::Matched)
    }
}

enum DayOutcome {
    Matched,
    AlreadyCached,
    Skipped,
}

/// Extract registry-station pixels from raw granules for one date, the
/// inspection table kept alongside the window-mean matches.
pub fn extract_station_pixels(
    reader: &crate::readers::SwathReader,
    matcher: &StationMatcher,
    files: &[PathBuf],
    channel: Channel,
) -> Vec<PixelMatch> {
    let mut matches = Vec::new();
    for path in files {
        match reader.decode(path, channel) {
            Ok(grid) => matches.extend(matcher.match_nearest_pixels(&grid)),
            Err(e) => {
                warn!(granule = %path.display(), error = %e, "skipping undecodable granule");
            }
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn coords(name: &str, lat: f64, lon: f64) -> StationCoordinates {
        StationCoordinates {
            name: name.to_string(),
            latitude: lat,
            longitude: lon,
        }
    }

    fn tb(lat: f64, lon: f64, value: f64) -> TbRecord {
        TbRecord {
            latitude: lat,
            longitude: lon,
            brightness_temp: value,
            pass_type: PassType::Descending,
        }
    }

    #[test]
    fn test_window_mean_counts_only_pixels_in_box() {
        let matcher = StationMatcher::new();
        let coordinates = vec![coords("Madrid, ES", 40.0, -3.0)];
        let tb_table = vec![tb(40.1, -2.9, 270.0), tb(41.5, -3.0, 300.0)];

        let row = vec![("Madrid, ES", "281.3")];
        let matches = matcher.match_window_means(&row, &coordinates, &tb_table);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].brightness_temp, Some(270.0));
        assert_eq!(matches[0].temperature, 281.3);
    }

    #[test]
    fn test_window_mean_averages_multiple_pixels() {
        let matcher = StationMatcher::new();
        let coordinates = vec![coords("Madrid, ES", 40.0, -3.0)];
        let tb_table = vec![tb(40.1, -2.9, 260.0), tb(39.9, -3.1, 280.0)];

        let row = vec![("Madrid, ES", "281.3")];
        let matches = matcher.match_window_means(&row, &coordinates, &tb_table);
        assert_eq!(matches[0].brightness_temp, Some(270.0));
    }

    #[test]
    fn test_empty_window_keeps_station_with_missing_mean() {
        let matcher = StationMatcher::new();
        let coordinates = vec![coords("Madrid, ES", 40.0, -3.0)];

        let row = vec![("Madrid, ES", "281.3")];
        let matches = matcher.match_window_means(&row, &coordinates, &[]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].brightness_temp, None);
    }

    #[test]
    fn test_corrupted_temperature_repaired() {
        let matcher = StationMatcher::new();
        let coordinates = vec![coords("Madrid, ES", 40.0, -3.0)];
        let tb_table = vec![tb(40.0, -3.0, 270.0)];

        let row = vec![("Madrid, ES", "281.3.5")];
        let matches = matcher.match_window_means(&row, &coordinates, &tb_table);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].temperature, 281.35);
    }

    #[test]
    fn test_invalid_temperatures_excluded_not_defaulted() {
        let matcher = StationMatcher::new();
        let coordinates = vec![coords("Madrid, ES", 40.0, -3.0)];
        let tb_table = vec![tb(40.0, -3.0, 270.0)];

        // Unparseable
        assert!(matcher
            .match_window_means(&[("Madrid, ES", "n/a")], &coordinates, &tb_table)
            .is_empty());
        // Below the plausible range
        assert!(matcher
            .match_window_means(&[("Madrid, ES", "150.0")], &coordinates, &tb_table)
            .is_empty());
        // Above the plausible range
        assert!(matcher
            .match_window_means(&[("Madrid, ES", "350.0")], &coordinates, &tb_table)
            .is_empty());
    }

    #[test]
    fn test_station_without_coordinates_skipped() {
        let matcher = StationMatcher::new();
        let matches = matcher.match_window_means(
            &[("Unknown, XX", "281.3")],
            &[coords("Madrid, ES", 40.0, -3.0)],
            &[tb(40.0, -3.0, 270.0)],
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn test_nearest_pixels_within_tolerance() {
        let matcher = StationMatcher::new();
        // Hainich, DE sits at (51.08, 10.45)
        let grid = SwathGrid {
            latitude: array![[51.10, 51.50]],
            longitude: array![[10.50, 10.45]],
            values: array![[262.5, 263.0]],
        };

        let matches = matcher.match_nearest_pixels(&grid);
        let hainich: Vec<_> = matches
            .iter()
            .filter(|m| m.station == "Hainich, DE")
            .collect();
        assert_eq!(hainich.len(), 1);
        let m = hainich[0];
        assert_eq!(m.pixel_lat, 51.10);
        assert!((m.distance - (0.02 + 0.05)).abs() < 1e-9);
        assert_eq!(m.brightness_temp, 262.5);
    }

    #[test]
    fn test_pixel_near_two_stations_reported_twice() {
        let matcher = StationMatcher::new();
        // Both Bondville registry entries share (40.01, -88.29)
        let grid = SwathGrid {
            latitude: array![[40.0]],
            longitude: array![[-88.3]],
            values: array![[261.0]],
        };

        let matches = matcher.match_nearest_pixels(&grid);
        let bondville = matches
            .iter()
            .filter(|m| m.station.starts_with("Bondville"))
            .count();
        assert_eq!(bondville, 2);
    }
}
