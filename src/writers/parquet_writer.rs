use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, Int32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;

use crate::error::Result;
use crate::models::FusedObservation;
use crate::utils::constants::DEFAULT_ROW_GROUP_SIZE;

/// Streaming Parquet writer for the cleaned training table.
///
/// The cleaning stage feeds it one batch per input day file, so the whole
/// accumulated dataset never has to sit in memory at once.
pub struct ParquetTableWriter {
    writer: ArrowWriter<File>,
    schema: Arc<Schema>,
}

impl ParquetTableWriter {
    pub fn create(path: &Path, compression: &str) -> Result<Self> {
        let compression = parse_compression(compression)?;
        let schema = training_schema();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(compression)
            .set_max_row_group_size(DEFAULT_ROW_GROUP_SIZE)
            .build();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        Ok(Self { writer, schema })
    }

    pub fn append_records(&mut self, records: &[FusedObservation]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let batch = records_to_batch(records, self.schema.clone())?;
        self.writer.write(&batch)?;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.writer.close()?;
        Ok(())
    }
}

/// One-shot convenience for small tables.
pub fn write_training_table(path: &Path, records: &[FusedObservation]) -> Result<()> {
    let mut writer = ParquetTableWriter::create(path, "snappy")?;
    writer.append_records(records)?;
    writer.close()
}

fn parse_compression(compression: &str) -> Result<Compression> {
    let compression = match compression.to_lowercase().as_str() {
        "snappy" => Compression::SNAPPY,
        "gzip" => Compression::GZIP(GzipLevel::default()),
        "lz4" => Compression::LZ4,
        "zstd" => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
        "none" => Compression::UNCOMPRESSED,
        other => {
            return Err(crate::error::FusionError::Config(format!(
                "Unsupported compression: {}",
                other
            )))
        }
    };
    Ok(compression)
}

fn training_schema() -> Arc<Schema> {
    let fields = vec![
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("date", DataType::Date32, false),
        Field::new("lst_kelvin", DataType::Float64, false),
        Field::new("lst_celsius", DataType::Float64, false),
        Field::new("brightness_temp_37v", DataType::Float64, false),
        Field::new("brightness_temp_19v", DataType::Float64, false),
        Field::new("land_cover_class", DataType::Int32, false),
    ];

    Arc::new(Schema::new(fields))
}

// Date32 counts days from the Unix epoch; chrono counts from CE.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn records_to_batch(records: &[FusedObservation], schema: Arc<Schema>) -> Result<RecordBatch> {
    let latitudes: Vec<f64> = records.iter().map(|r| r.latitude).collect();
    let longitudes: Vec<f64> = records.iter().map(|r| r.longitude).collect();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| r.date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect();
    let lst_kelvin: Vec<f64> = records.iter().map(|r| r.lst_kelvin).collect();
    let lst_celsius: Vec<f64> = records.iter().map(|r| r.lst_celsius).collect();
    let tb_37v: Vec<f64> = records.iter().map(|r| r.brightness_temp_37v).collect();
    let tb_19v: Vec<f64> = records.iter().map(|r| r.brightness_temp_19v).collect();
    let land_cover: Vec<i32> = records.iter().map(|r| r.land_cover_class).collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(latitudes)),
            Arc::new(Float64Array::from(longitudes)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(Float64Array::from(lst_kelvin)),
            Arc::new(Float64Array::from(lst_celsius)),
            Arc::new(Float64Array::from(tb_37v)),
            Arc::new(Float64Array::from(tb_19v)),
            Arc::new(Int32Array::from(land_cover)),
        ],
    )?;

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn observation() -> FusedObservation {
        FusedObservation {
            latitude: 41.8,
            longitude: 13.6,
            date: NaiveDate::from_ymd_opt(2005, 7, 1).unwrap(),
            lst_kelvin: 295.4,
            lst_celsius: 295.4 - 273.15,
            brightness_temp_37v: 266.1,
            brightness_temp_19v: 259.7,
            land_cover_class: 4,
        }
    }

    #[test]
    fn test_write_training_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cleaned.parquet");

        write_training_table(&path, &[observation(), observation()]).unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_unsupported_compression_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cleaned.parquet");
        assert!(ParquetTableWriter::create(&path, "brotli9000").is_err());
    }
}
