//! Inertial ↔ Earth-fixed ↔ geodetic conversions.
//!
//! Geodetic coordinates use the WGS-84 ellipsoid. Compared with a spherical Earth
//! this moves a low-orbit sub-point by up to ~0.19° in latitude, which shifts the
//! computed elevation by up to ~0.1°.

use std::f64::consts::{PI, TAU};

use chrono::{DateTime, Utc};

use crate::orbit::constants::{
    JULIAN_DATE_J2000, JULIAN_DATE_UNIX_EPOCH, SECONDS_PER_DAY, WGS84_A_KM, WGS84_E2,
};
use crate::orbit::error::GeometryError;
use crate::orbit::types::{GeodeticPosition, StateVector};

const GEODETIC_TOLERANCE_RAD: f64 = 1e-12;
const GEODETIC_MAX_ITERATIONS: usize = 20;

/// Julian date (UTC, used as UT1) of an instant.
pub fn julian_date(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / (SECONDS_PER_DAY * 1e6) + JULIAN_DATE_UNIX_EPOCH
}

/// Greenwich Mean Sidereal Time in radians, normalised to [0, 2π).
///
/// IAU-82 polynomial in Julian centuries since J2000.
pub fn gmst(at: DateTime<Utc>) -> f64 {
    let t = (julian_date(at) - JULIAN_DATE_J2000) / 36_525.0;
    let seconds = -6.2e-6 * t.powi(3)
        + 0.093_104 * t.powi(2)
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
        + 67_310.548_41;
    // 240 sidereal seconds per degree
    (seconds * (PI / 180.0) / 240.0).rem_euclid(TAU)
}

/// Rotate an inertial vector by −GMST about the polar axis.
pub fn eci_to_ecef(eci: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_g, cos_g) = gmst.sin_cos();
    [
        eci[0] * cos_g + eci[1] * sin_g,
        -eci[0] * sin_g + eci[1] * cos_g,
        eci[2],
    ]
}

pub fn ecef_to_eci(ecef: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_g, cos_g) = gmst.sin_cos();
    [
        ecef[0] * cos_g - ecef[1] * sin_g,
        ecef[0] * sin_g + ecef[1] * cos_g,
        ecef[2],
    ]
}

/// Earth-fixed Cartesian (km) to geodetic `(latitude°, longitude°, altitude km)`.
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> (f64, f64, f64) {
    let [x, y, z] = ecef;
    let p = x.hypot(y);
    let longitude = y.atan2(x);

    let mut latitude = z.atan2(p * (1.0 - WGS84_E2));
    for _ in 0..GEODETIC_MAX_ITERATIONS {
        let sin_lat = latitude.sin();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let next = (z + n * WGS84_E2 * sin_lat).atan2(p);
        let done = (next - latitude).abs() < GEODETIC_TOLERANCE_RAD;
        latitude = next;
        if done {
            break;
        }
    }

    let (sin_lat, cos_lat) = latitude.sin_cos();
    let altitude =
        p * cos_lat + z * sin_lat - WGS84_A_KM * (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    (
        latitude.to_degrees(),
        normalize_longitude(longitude.to_degrees()),
        altitude,
    )
}

/// Geodetic coordinates to Earth-fixed Cartesian (km).
pub fn geodetic_to_ecef(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = latitude_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude_deg.to_radians().sin_cos();
    let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    [
        (n + altitude_km) * cos_lat * cos_lon,
        (n + altitude_km) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + altitude_km) * sin_lat,
    ]
}

/// Sub-point and altitude of an inertial state.
pub fn to_geodetic(state: &StateVector) -> Result<GeodeticPosition, GeometryError> {
    if !state.position_km.iter().all(|v| v.is_finite()) {
        return Err(GeometryError::NonFinite("inertial position"));
    }

    let ecef = eci_to_ecef(state.position_km, gmst(state.time));
    let (latitude_deg, longitude_deg, altitude_km) = ecef_to_geodetic(ecef);
    if !(latitude_deg.is_finite() && longitude_deg.is_finite() && altitude_km.is_finite()) {
        return Err(GeometryError::NonFinite("geodetic position"));
    }

    Ok(GeodeticPosition {
        time: state.time,
        latitude_deg,
        longitude_deg,
        altitude_km,
    })
}

/// Wrap a longitude into [−180, 180).
pub fn normalize_longitude(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}
