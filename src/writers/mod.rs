pub mod csv_writer;
pub mod parquet_writer;

pub use parquet_writer::ParquetTableWriter;
