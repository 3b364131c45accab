use thiserror::Error;

use crate::orbit::{ElementsError, GeometryError, PropagationError};
use crate::tracker::TrackerError;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("malformed elements for {satellite}: {source}")]
    MalformedElements {
        satellite: String,
        source: ElementsError,
    },
    #[error(transparent)]
    PropagationFailure(#[from] PropagationError),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),
    #[error("no ground stations provided")]
    NoStationsProvided,
    #[error("invalid sweep settings: {0}")]
    InvalidSettings(String),
    #[error("prediction cancelled")]
    Cancelled,
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("prediction task failed: {0}")]
    TaskFailed(String),
}

impl From<TrackerError> for PredictError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Propagation(e) => PredictError::PropagationFailure(e),
            TrackerError::Geometry(e) => PredictError::InvalidGeometry(e),
            TrackerError::InvalidStep => {
                PredictError::InvalidSettings("sampling step must be positive".into())
            }
        }
    }
}
