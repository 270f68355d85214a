use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::models::{Channel, PassType};

#[derive(Parser)]
#[command(name = "amsre-fusion")]
#[command(about = "Fuses AMSR-E brightness temperatures with MODIS LST and FLUXNET tower records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Suppress progress bars")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Combine daily instrument granules into per-channel pass tables
    Combine {
        #[arg(short, long, help = "Directory holding downloaded .hdf granules")]
        input_dir: PathBuf,

        #[arg(short, long, default_value = "data/processed/amsre")]
        data_dir: PathBuf,

        #[arg(short, long, help = "First day to process (YYYY-MM-DD)")]
        start_date: NaiveDate,

        #[arg(short, long, help = "Last day to process, inclusive [default: start date]")]
        end_date: Option<NaiveDate>,

        #[arg(long, help = "Restrict to one channel [default: both]")]
        frequency: Option<Channel>,

        #[arg(long, help = "Drop samples outside the continental study box")]
        bounding_box: bool,
    },

    /// Merge the two frequency channels into per-day fused instrument tables
    Merge {
        #[arg(short, long, default_value = "data/processed/amsre")]
        data_dir: PathBuf,

        #[arg(short, long)]
        start_date: NaiveDate,

        #[arg(short, long)]
        end_date: Option<NaiveDate>,
    },

    /// Match daily TB tables against FLUXNET tower temperatures
    Match {
        #[arg(long, help = "FLUXNET wide-format export (semicolon-separated)")]
        fluxnet_file: PathBuf,

        #[arg(long, help = "Station coordinates lookup table")]
        coords_file: PathBuf,

        #[arg(short, long, default_value = "data/processed/amsre")]
        data_dir: PathBuf,

        #[arg(short, long, default_value = "data/processed/amsre/matched")]
        output_dir: PathBuf,

        #[arg(long, default_value = "37ghz")]
        frequency: Channel,

        #[arg(long, default_value = "descending")]
        pass: PassType,

        #[arg(short, long)]
        start_date: NaiveDate,

        #[arg(short, long)]
        end_date: Option<NaiveDate>,

        #[arg(long, help = "Window half-width in degrees [default: 1.0]")]
        window: Option<f64>,
    },

    /// Record raw grid pixels near the registry stations for one day
    ExtractStationTb {
        #[arg(short, long, help = "Directory holding downloaded .hdf granules")]
        input_dir: PathBuf,

        #[arg(short, long, default_value = "data/processed/amsre/stations")]
        output_dir: PathBuf,

        #[arg(short, long, help = "Acquisition day (YYYY-MM-DD)")]
        date: NaiveDate,

        #[arg(long, default_value = "37ghz")]
        frequency: Channel,

        #[arg(long, help = "Match tolerance in degrees [default: 0.3]")]
        tolerance: Option<f64>,
    },

    /// Extract per-day LST tables from the MODIS raster
    ExtractModis {
        #[arg(short, long, help = "MODIS LST NetCDF raster")]
        input_file: PathBuf,

        #[arg(short, long, default_value = "data/processed/modis")]
        output_dir: PathBuf,

        #[arg(long, default_value = "2005", help = "Year day-of-year offsets count from")]
        epoch_year: i32,

        #[arg(long, default_value = "0")]
        first_day: u32,

        #[arg(long, default_value = "364")]
        last_day: u32,
    },

    /// Flatten the land-cover raster into a CSV table
    ExtractLandCover {
        #[arg(short, long, help = "Land-cover classification raster")]
        input_file: PathBuf,

        #[arg(short, long, default_value = "data/processed/land_cover/land_cover_classes.csv")]
        output_file: PathBuf,
    },

    /// Summarise extracted LST tables (series and spatial-mean statistics)
    Analyze {
        #[arg(short, long, default_value = "data/processed/modis")]
        modis_dir: PathBuf,

        #[arg(short, long, default_value = "data/analysis/modis")]
        output_dir: PathBuf,
    },

    /// Fit daily and pooled TB-vs-temperature regressions
    Regress {
        #[arg(short, long, help = "Directory of matched_tb_fluxnet_*.csv tables")]
        matched_dir: PathBuf,

        #[arg(short, long, default_value = "data/analysis/amsre")]
        output_dir: PathBuf,

        #[arg(long, default_value = "37ghz")]
        frequency: Channel,

        #[arg(long, help = "Minimum valid pairs per day [default: 2]")]
        min_points: Option<usize>,

        #[arg(long, help = "Also fit the pooled multi-day regression")]
        global: bool,
    },

    /// Fuse MODIS, instrument, and land-cover data into training tables
    Fuse {
        #[arg(long, default_value = "data/processed/modis")]
        modis_dir: PathBuf,

        #[arg(long, default_value = "data/processed/amsre")]
        amsre_dir: PathBuf,

        #[arg(long, help = "Land-cover classification raster")]
        land_cover: PathBuf,

        #[arg(short, long, default_value = "data/processed/merged")]
        output_dir: PathBuf,

        #[arg(long, default_value = "2005")]
        epoch_year: i32,
    },

    /// Apply the final training gate over all fused tables
    Clean {
        #[arg(short, long, default_value = "data/processed/merged")]
        fused_dir: PathBuf,

        #[arg(short, long, default_value = "data/processed/cleaned_data.csv")]
        output_file: PathBuf,

        #[arg(long, help = "Also export the cleaned table as Parquet")]
        parquet: Option<PathBuf>,
    },
}
