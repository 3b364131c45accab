//! Range, bearing and elevation from a ground station to a satellite.
//!
//! The default [`ElevationModel::Planar`] treats the ground between station and
//! sub-point as flat: slant range is the hypotenuse of the great-circle surface
//! distance and the altitude difference. This overestimates elevation at low
//! angles (an ISS-height satellite reads 10° roughly 2200 km away, where the true
//! figure is near 0°). It is kept because pass windows and quality labels are
//! defined against it. Once the sub-point is more than a quarter of a great circle
//! away the flat model no longer means anything and the spherical elevation
//! (always negative there) is reported instead.

use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::orbit::constants::EARTH_MEAN_RADIUS_KM;
use crate::orbit::{GeodeticPosition, GeometryError};
use crate::tracker::GroundStation;

const MIN_RANGE_KM: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ElevationModel {
    /// Locally flat Earth between station and sub-point.
    #[default]
    Planar,
    /// Straight line of sight on a sphere of mean Earth radius.
    Spherical,
}

impl FromStr for ElevationModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planar" => Ok(Self::Planar),
            "spherical" => Ok(Self::Spherical),
            other => Err(format!("unknown elevation model: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LookAngles {
    pub range_km: f64,
    /// Forward azimuth from the station, clockwise from north, [0, 360).
    pub bearing_deg: f64,
    /// Negative below the horizon.
    pub elevation_deg: f64,
    /// Great-circle distance from the station to the sub-point.
    pub surface_distance_km: f64,
}

pub fn look_angles(
    satellite: &GeodeticPosition,
    station: &GroundStation,
    model: ElevationModel,
) -> Result<LookAngles, GeometryError> {
    if !(satellite.latitude_deg.is_finite()
        && satellite.longitude_deg.is_finite()
        && satellite.altitude_km.is_finite())
    {
        return Err(GeometryError::NonFinite("satellite position"));
    }

    let lat1 = station.lat_rad();
    let lon1 = station.lon_rad();
    let lat2 = satellite.latitude_deg.to_radians();
    let lon2 = satellite.longitude_deg.to_radians();

    let central = central_angle(lat1, lon1, lat2, lon2);
    let surface_distance_km = EARTH_MEAN_RADIUS_KM * central;
    let bearing_deg = forward_azimuth(lat1, lon1, lat2, lon2);

    let (range_km, elevation_deg) = match model {
        ElevationModel::Planar => {
            let height = satellite.altitude_km - station.altitude_km;
            let range = surface_distance_km.hypot(height);
            if !range.is_finite() {
                return Err(GeometryError::NonFinite("slant range"));
            }
            if range < MIN_RANGE_KM {
                return Err(GeometryError::ZeroRange);
            }

            let elevation = if central > FRAC_PI_2 {
                spherical(central, station.altitude_km, satellite.altitude_km)?.1
            } else {
                // asin(height / range), written as atan2 to stay exact at the zenith
                height.atan2(surface_distance_km).to_degrees()
            };
            (range, elevation)
        }
        ElevationModel::Spherical => {
            spherical(central, station.altitude_km, satellite.altitude_km)?
        }
    };

    if !elevation_deg.is_finite() {
        return Err(GeometryError::NonFinite("elevation"));
    }

    Ok(LookAngles {
        range_km,
        bearing_deg,
        elevation_deg,
        surface_distance_km,
    })
}

/// Haversine central angle between two points, radians.
fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt())
}

fn forward_azimuth(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lon = lon2 - lon1;
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Line-of-sight range and elevation between two points above a spherical Earth.
fn spherical(
    central: f64,
    station_alt_km: f64,
    satellite_alt_km: f64,
) -> Result<(f64, f64), GeometryError> {
    let rs = EARTH_MEAN_RADIUS_KM + station_alt_km;
    let rt = EARTH_MEAN_RADIUS_KM + satellite_alt_km;
    let (sin_c, cos_c) = central.sin_cos();

    // satellite relative to the station, split into local vertical and horizontal
    let up = rt * cos_c - rs;
    let across = rt * sin_c;
    let range = up.hypot(across);
    if !range.is_finite() {
        return Err(GeometryError::NonFinite("slant range"));
    }
    if range < MIN_RANGE_KM {
        return Err(GeometryError::ZeroRange);
    }

    Ok((range, up.atan2(across).to_degrees()))
}
