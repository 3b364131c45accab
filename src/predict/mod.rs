pub mod batch;
mod error;
mod pass_finder;
pub mod stats;
mod tle_loader;
mod types;

pub use error::PredictError;
pub use pass_finder::{
    predict_passes, sweep_elevations, ElevationSample, PassPrediction, PassPredictor, Refinement,
    SweepSettings,
};
pub use stats::{filter_by_score, quality_score, WindowStatistics};
pub use tle_loader::{parse_catalog_text, RejectedSet, TleLoader};
pub use types::{PassWindow, Quality, QualityBands};
