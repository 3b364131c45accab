use chrono::{DateTime, Utc};
use serde::Serialize;

/// Inertial-frame (TEME) state produced by a propagator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateVector {
    pub time: DateTime<Utc>,
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

impl StateVector {
    pub fn is_finite(&self) -> bool {
        self.position_km
            .iter()
            .chain(self.velocity_km_s.iter())
            .all(|v| v.is_finite())
    }

    pub fn radius_km(&self) -> f64 {
        norm(self.position_km)
    }

    pub fn speed_km_s(&self) -> f64 {
        norm(self.velocity_km_s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticPosition {
    pub time: DateTime<Utc>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

pub(crate) fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
