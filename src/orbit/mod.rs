pub mod constants;
mod elements;
mod error;
pub mod frames;
mod parameters;
mod propagation;
mod types;

pub use elements::{checksum, ChecksumPolicy, OrbitalElements};
pub use error::{ElementsError, GeometryError, PropagationError};
pub use parameters::{ApsisSource, OrbitalParameters};
pub use propagation::{Propagator, Sgp4Propagator};
pub use types::{GeodeticPosition, StateVector};
