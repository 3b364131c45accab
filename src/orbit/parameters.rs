use std::f64::consts::TAU;

use serde::Serialize;
use strum_macros::Display;

use crate::orbit::constants::{EARTH_MEAN_RADIUS_KM, EARTH_MU_KM3_S2, SECONDS_PER_DAY};
use crate::orbit::elements::OrbitalElements;

/// Where the apogee/perigee figures of an [`OrbitalParameters`] come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ApsisSource {
    /// `r ± 10%` placeholder carried over from the dashboard calculator. Not
    /// derived from the orbit; do not rely on it.
    Heuristic,
    /// `a(1 ± e)` with the semi-major axis from the mean motion.
    Elements,
}

/// Derived orbit figures. Radii are geocentric, in km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitalParameters {
    pub geocentric_distance_km: f64,
    pub period_minutes: f64,
    pub velocity_km_s: f64,
    pub apogee_radius_km: f64,
    pub perigee_radius_km: f64,
    pub apsis_source: ApsisSource,
}

impl OrbitalParameters {
    /// Circular-orbit figures at `r = mean radius + altitude`.
    pub fn from_altitude(altitude_km: f64) -> Self {
        let r = EARTH_MEAN_RADIUS_KM + altitude_km;
        Self {
            geocentric_distance_km: r,
            period_minutes: circular_period_minutes(r),
            velocity_km_s: circular_velocity_km_s(r),
            apogee_radius_km: r * 1.1,
            perigee_radius_km: r * 0.9,
            apsis_source: ApsisSource::Heuristic,
        }
    }

    /// Figures from the element set itself: semi-major axis from the mean
    /// motion, apsides from the eccentricity.
    pub fn from_elements(elements: &OrbitalElements) -> Self {
        let a = semi_major_axis_km(elements.mean_motion_rev_per_day);
        let e = elements.eccentricity;
        Self {
            geocentric_distance_km: a,
            period_minutes: circular_period_minutes(a),
            velocity_km_s: circular_velocity_km_s(a),
            apogee_radius_km: a * (1.0 + e),
            perigee_radius_km: a * (1.0 - e),
            apsis_source: ApsisSource::Elements,
        }
    }

    pub fn apogee_altitude_km(&self) -> f64 {
        self.apogee_radius_km - EARTH_MEAN_RADIUS_KM
    }

    pub fn perigee_altitude_km(&self) -> f64 {
        self.perigee_radius_km - EARTH_MEAN_RADIUS_KM
    }
}

pub fn circular_period_minutes(r_km: f64) -> f64 {
    TAU * (r_km.powi(3) / EARTH_MU_KM3_S2).sqrt() / 60.0
}

pub fn circular_velocity_km_s(r_km: f64) -> f64 {
    (EARTH_MU_KM3_S2 / r_km).sqrt()
}

/// Kepler's third law with the mean motion in revolutions per day.
pub fn semi_major_axis_km(mean_motion_rev_per_day: f64) -> f64 {
    let n = mean_motion_rev_per_day * TAU / SECONDS_PER_DAY;
    (EARTH_MU_KM3_S2 / (n * n)).cbrt()
}
