mod error;
mod ground_station;
pub mod look_angles;
pub mod trajectory;

pub use error::{StationError, TrackerError};
pub use ground_station::GroundStation;
pub use look_angles::{look_angles, ElevationModel, LookAngles};
pub use trajectory::{build_track, locate, visibility_at, StationVisibility, TrackPoint};
