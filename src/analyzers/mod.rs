pub mod regression;
pub mod spatial;

pub use regression::{ols, Estimator, GlobalFit, LinearRegression, RegressionFitter};
pub use spatial::{SeriesSummary, SpatialAccumulator, SpatialMean};
