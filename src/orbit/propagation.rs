use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::orbit::elements::OrbitalElements;
use crate::orbit::error::{ElementsError, PropagationError};
use crate::orbit::types::StateVector;

/// Produces the inertial state of one satellite at an arbitrary instant.
///
/// Implementations must be pure: the same instant always yields the same state.
pub trait Propagator {
    fn propagate(&self, at: DateTime<Utc>) -> Result<StateVector, PropagationError>;
}

impl<P: Propagator + ?Sized> Propagator for &P {
    fn propagate(&self, at: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        (**self).propagate(at)
    }
}

/// SGP4/SDP4 propagation backed by the `sgp4` crate.
pub struct Sgp4Propagator {
    id: String,
    elements: Elements,
    constants: Constants,
}

impl Sgp4Propagator {
    pub fn new(elements: &OrbitalElements) -> Result<Self, ElementsError> {
        let tle = Elements::from_tle(
            Some(elements.id.clone()),
            elements.line1.as_bytes(),
            elements.line2.as_bytes(),
        )
        .map_err(|e| ElementsError::Rejected(e.to_string()))?;

        let constants =
            Constants::from_elements(&tle).map_err(|e| ElementsError::Rejected(e.to_string()))?;

        Ok(Self {
            id: elements.id.clone(),
            elements: tle,
            constants,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(&self, at: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let failure = |message: String| PropagationError { at, message };

        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&at.naive_utc())
            .map_err(|e| failure(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| failure(e.to_string()))?;

        let state = StateVector {
            time: at,
            position_km: prediction.position,
            velocity_km_s: prediction.velocity,
        };
        if !state.is_finite() {
            return Err(failure("non-finite state vector".into()));
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn iss() -> OrbitalElements {
        OrbitalElements::parse(
            Some("ISS (ZARYA)"),
            "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
        )
        .unwrap()
    }

    #[test]
    fn state_at_epoch_is_finite_and_nonzero() {
        let elements = iss();
        let propagator = Sgp4Propagator::new(&elements).unwrap();
        assert_eq!(propagator.id(), "ISS (ZARYA)");

        let state = propagator.propagate(elements.epoch).unwrap();
        assert!(state.is_finite());
        // Low Earth orbit: a few hundred km above a 6378 km equatorial radius
        assert!((6600.0..7000.0).contains(&state.radius_km()));
        assert!((7.0..8.0).contains(&state.speed_km_s()));
    }

    #[test]
    fn propagation_is_pure() {
        let elements = iss();
        let propagator = Sgp4Propagator::new(&elements).unwrap();
        let at = elements.epoch + Duration::minutes(42);

        let a = propagator.propagate(at).unwrap();
        let b = propagator.propagate(at).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn one_period_later_radius_is_similar() {
        let elements = iss();
        let propagator = Sgp4Propagator::new(&elements).unwrap();
        let period = Duration::milliseconds((elements.period_minutes() * 60_000.0) as i64);

        let r0 = propagator.propagate(elements.epoch).unwrap().radius_km();
        let r1 = propagator.propagate(elements.epoch + period).unwrap().radius_km();
        assert!((r0 - r1).abs() < 20.0);
    }
}
