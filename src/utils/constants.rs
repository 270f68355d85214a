/// Instrument fill/sentinel convention: corrected brightness temperatures
/// above this are missing data, not physical readings.
pub const TB_SENTINEL_KELVIN: f64 = 6550.0;

/// Scale/offset attribute names on AMSR-E channel variables.
pub const SCALE_ATTR: &str = "SCALE FACTOR";
pub const OFFSET_ATTR: &str = "OFFSET";

/// Geolocation variable names in instrument granules.
pub const LATITUDE_VAR: &str = "Latitude";
pub const LONGITUDE_VAR: &str = "Longitude";

/// MODIS LST variable aliases, in priority order.
pub const LST_VAR_ALIASES: &[&str] = &["LST_Day_1km", "LST"];

/// MODIS digital-number to Kelvin scale.
pub const LST_SCALE: f64 = 0.02;

/// Land-cover raster variable aliases, in priority order.
pub const LAND_COVER_VAR_ALIASES: &[&str] = &["land_cover_class", "Land_Cover_Class"];

/// Physical plausibility bounds for any temperature series (Kelvin).
pub const TEMP_MIN_KELVIN: f64 = 180.0;
pub const TEMP_MAX_KELVIN: f64 = 330.0;

/// Final training-data admission gate (Kelvin); intentionally tighter than
/// the per-component plausibility bounds.
pub const TRAINING_MIN_KELVIN: f64 = 220.0;
pub const TRAINING_MAX_KELVIN: f64 = 330.0;

/// Brightness-temperature lower bound used by the pooled multi-day fit.
pub const GLOBAL_FIT_TB_MIN_KELVIN: f64 = 220.0;

/// Half-width of the window-mean matching box around a station (degrees).
pub const STATION_WINDOW_DEG: f64 = 1.0;

/// Default tolerance of nearest-pixel registry matching (degrees).
pub const NEAREST_PIXEL_TOLERANCE_DEG: f64 = 0.3;

/// Minimum valid pairs before a daily regression is attempted.
pub const MIN_DAILY_FIT_POINTS: usize = 2;

/// Minimum pooled pairs before the global regression is attempted.
pub const MIN_GLOBAL_FIT_POINTS: usize = 3;

/// Decimal places kept on swath coordinates after normalisation.
pub const SWATH_COORD_DECIMALS: i32 = 2;

/// Bin scale of the swath-level join key (4 decimal places).
pub const SWATH_BIN_SCALE: f64 = 1e4;

/// Bin scale of the cross-instrument fusion join key (1 decimal place).
pub const FUSION_BIN_SCALE: f64 = 10.0;

/// Processing defaults
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
