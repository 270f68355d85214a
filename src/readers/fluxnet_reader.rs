use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;
use validator::Validate;

use crate::error::{FusionError, Result};
use crate::models::StationCoordinates;

/// FLUXNET export in wide format: one row per day, one column per station,
/// semicolon-separated, dates as `dd/mm/YYYY` in `TIMESTAMP_START`.
pub struct FluxnetTable {
    stations: Vec<String>,
    rows: HashMap<NaiveDate, Vec<String>>,
}

impl FluxnetTable {
    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw (station, value) pairs for one day, or `None` when the export
    /// has no row for that date.
    pub fn row(&self, date: NaiveDate) -> Option<Vec<(&str, &str)>> {
        let values = self.rows.get(&date)?;
        Some(
            self.stations
                .iter()
                .map(String::as_str)
                .zip(values.iter().map(String::as_str))
                .collect(),
        )
    }
}

pub struct FluxnetReader;

impl FluxnetReader {
    /// Read the wide-format tower export. The files come out of various
    /// spreadsheet tools, so non-UTF-8 bytes are decoded as Windows-1252
    /// rather than rejected.
    pub fn read_wide_table(path: &Path) -> Result<FluxnetTable> {
        let bytes = std::fs::read(path)?;
        let text = decode_lossy(&bytes);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let mut header_iter = headers.iter();
        match header_iter.next() {
            Some("TIMESTAMP_START") => {}
            other => {
                return Err(FusionError::InvalidFormat(format!(
                    "expected TIMESTAMP_START as first column of {}, found {:?}",
                    path.display(),
                    other
                )))
            }
        }
        let stations: Vec<String> = header_iter.map(str::to_string).collect();

        let mut rows = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let Some(date_field) = record.get(0) else {
                continue;
            };
            let date = NaiveDate::parse_from_str(date_field.trim(), "%d/%m/%Y")?;
            let values: Vec<String> = (1..=stations.len())
                .map(|i| record.get(i).unwrap_or("").to_string())
                .collect();
            rows.insert(date, values);
        }

        debug!(
            file = %path.display(),
            stations = stations.len(),
            days = rows.len(),
            "loaded FLUXNET wide table"
        );
        Ok(FluxnetTable { stations, rows })
    }

    /// Read the station-coordinates lookup table
    /// (`station,lat,lon`, comma-separated).
    pub fn read_station_coordinates(path: &Path) -> Result<Vec<StationCoordinates>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut stations = Vec::new();
        for record in reader.deserialize::<StationCoordinates>() {
            let station = record?;
            station.validate()?;
            stations.push(station);
        }
        Ok(stations)
    }
}

fn decode_lossy(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Repair a temperature string with multiple decimal points, a known
/// data-entry corruption in the tower exports: the first decimal point is
/// kept and the rest are removed, so `"12.3.4"` parses as `12.34`.
/// Returns `None` for anything that still fails to parse.
pub fn clean_temperature(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = if trimmed.matches('.').count() > 1 {
        let mut kept_dot = false;
        trimmed
            .chars()
            .filter(|&c| {
                if c != '.' {
                    return true;
                }
                if kept_dot {
                    false
                } else {
                    kept_dot = true;
                    true
                }
            })
            .collect()
    } else {
        trimmed.to_string()
    };

    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_clean_temperature() {
        assert_eq!(clean_temperature("12.3.4"), Some(12.34));
        assert_eq!(clean_temperature("281.35"), Some(281.35));
        assert_eq!(clean_temperature(" 281.35 "), Some(281.35));
        assert_eq!(clean_temperature("2.8.1.3"), Some(2.813));
        assert_eq!(clean_temperature("-"), None);
        assert_eq!(clean_temperature(""), None);
        assert_eq!(clean_temperature("abc"), None);
    }

    #[test]
    fn test_read_wide_table() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "TIMESTAMP_START;Hainich, DE;Loobos, NL")?;
        writeln!(file, "01/07/2005;281.3;279.9")?;
        writeln!(file, "02/07/2005;282.1;")?;

        let table = FluxnetReader::read_wide_table(file.path())?;
        assert_eq!(table.stations(), &["Hainich, DE", "Loobos, NL"]);
        assert_eq!(table.len(), 2);

        let day = NaiveDate::from_ymd_opt(2005, 7, 1).unwrap();
        let row = table.row(day).unwrap();
        assert_eq!(row, vec![("Hainich, DE", "281.3"), ("Loobos, NL", "279.9")]);

        // Short row pads missing stations with empty strings
        let day2 = NaiveDate::from_ymd_opt(2005, 7, 2).unwrap();
        let row2 = table.row(day2).unwrap();
        assert_eq!(row2[1], ("Loobos, NL", ""));

        // Absent date
        let day3 = NaiveDate::from_ymd_opt(2005, 7, 3).unwrap();
        assert!(table.row(day3).is_none());
        Ok(())
    }

    #[test]
    fn test_read_wide_table_rejects_wrong_layout() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "date;Hainich, DE")?;
        writeln!(file, "01/07/2005;281.3")?;

        assert!(FluxnetReader::read_wide_table(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_read_station_coordinates() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "station,lat,lon")?;
        writeln!(file, "\"Hainich, DE\",51.08,10.45")?;
        writeln!(file, "\"Le Brai, NL\",44.72,-0.77")?;

        let stations = FluxnetReader::read_station_coordinates(file.path())?;
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "Hainich, DE");
        assert_eq!(stations[1].longitude, -0.77);
        Ok(())
    }

    #[test]
    fn test_windows_1252_fallback() {
        // 0xE9 is 'é' in Windows-1252 and invalid standalone UTF-8
        let decoded = decode_lossy(b"Gebess\xe9");
        assert_eq!(decoded, "Gebessé");
    }
}
