use thiserror::Error;

use crate::orbit::{GeometryError, PropagationError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StationError {
    #[error("invalid coordinates {0:?}, expected \"lat, lon\"")]
    Coordinates(String),
    #[error("latitude {0} outside -90..90")]
    Latitude(f64),
    #[error("longitude {0} outside -180..180")]
    Longitude(f64),
    #[error("altitude {0} is not finite")]
    Altitude(f64),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
    #[error("step must be positive")]
    InvalidStep,
}
