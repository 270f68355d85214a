pub mod fused;
pub mod regression;
pub mod station;
pub mod swath;

pub use fused::{FusedObservation, LstSample, MergedTbRecord, TbRecord};
pub use regression::{DailyRegressionRecord, LinearFit, Season};
pub use station::{station_registry, PixelMatch, StationCoordinates, WindowMatch};
pub use swath::{Channel, PassType, SwathSample};
