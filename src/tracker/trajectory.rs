use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::orbit::{frames, GeodeticPosition, Propagator};
use crate::tracker::look_angles::{look_angles, ElevationModel, LookAngles};
use crate::tracker::{GroundStation, TrackerError};

#[derive(Debug, Clone, Serialize)]
pub struct TrackPoint {
    pub position: GeodeticPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look: Option<LookAngles>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationVisibility {
    pub station_id: String,
    pub visible: bool,
    pub elevation_deg: f64,
    pub look: LookAngles,
}

/// Propagate and convert to a sub-point in one step.
pub fn locate<P: Propagator + ?Sized>(
    propagator: &P,
    at: DateTime<Utc>,
) -> Result<GeodeticPosition, TrackerError> {
    let state = propagator.propagate(at)?;
    Ok(frames::to_geodetic(&state)?)
}

/// Sample `[start, end]` every `step`. Instants where propagation or geometry
/// fails are left out of the series.
pub fn build_track<P: Propagator + ?Sized>(
    propagator: &P,
    station: Option<&GroundStation>,
    model: ElevationModel,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
) -> Result<Vec<TrackPoint>, TrackerError> {
    if step <= Duration::zero() {
        return Err(TrackerError::InvalidStep);
    }

    let mut cursor = start;
    let mut points = Vec::new();

    while cursor <= end {
        match sample_point(propagator, station, model, cursor) {
            Ok(point) => points.push(point),
            Err(e) => log::debug!("Skipping track sample at {}: {}", cursor, e),
        }
        match cursor.checked_add_signed(step) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    Ok(points)
}

fn sample_point<P: Propagator + ?Sized>(
    propagator: &P,
    station: Option<&GroundStation>,
    model: ElevationModel,
    at: DateTime<Utc>,
) -> Result<TrackPoint, TrackerError> {
    let position = locate(propagator, at)?;
    let look = station
        .map(|s| look_angles(&position, s, model))
        .transpose()?;
    Ok(TrackPoint { position, look })
}

/// Elevation of the satellite above every station at one instant. A station
/// sees the satellite only when the elevation is strictly above
/// `min_elevation_deg`, the same rule the pass sweep applies.
pub fn visibility_at<P: Propagator + ?Sized>(
    propagator: &P,
    stations: &[GroundStation],
    model: ElevationModel,
    min_elevation_deg: f64,
    at: DateTime<Utc>,
) -> Result<Vec<StationVisibility>, TrackerError> {
    let position = locate(propagator, at)?;
    stations
        .iter()
        .map(|station| {
            let look = look_angles(&position, station, model)?;
            Ok(StationVisibility {
                station_id: station.id.clone(),
                visible: look.elevation_deg > min_elevation_deg,
                elevation_deg: look.elevation_deg,
                look,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::frames::{ecef_to_eci, geodetic_to_ecef, gmst};
    use crate::orbit::{PropagationError, StateVector};
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    /// Hovers over a fixed sub-point; fails at one chosen instant.
    struct Hover {
        lat: f64,
        lon: f64,
        alt: f64,
        fail_at: Option<DateTime<Utc>>,
    }

    impl Propagator for Hover {
        fn propagate(&self, at: DateTime<Utc>) -> Result<StateVector, PropagationError> {
            if self.fail_at == Some(at) {
                return Err(PropagationError {
                    at,
                    message: "decayed".into(),
                });
            }
            let ecef = geodetic_to_ecef(self.lat, self.lon, self.alt);
            Ok(StateVector {
                time: at,
                position_km: ecef_to_eci(ecef, gmst(at)),
                velocity_km_s: [0.0; 3],
            })
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn locate_recovers_sub_point() {
        let hover = Hover {
            lat: -33.86,
            lon: 151.21,
            alt: 550.0,
            fail_at: None,
        };
        let pos = locate(&hover, t0()).unwrap();
        assert_abs_diff_eq!(pos.latitude_deg, -33.86, epsilon = 1e-8);
        assert_abs_diff_eq!(pos.longitude_deg, 151.21, epsilon = 1e-8);
        assert_abs_diff_eq!(pos.altitude_km, 550.0, epsilon = 1e-6);
    }

    #[test]
    fn track_skips_failed_samples() {
        let hover = Hover {
            lat: 10.0,
            lon: 20.0,
            alt: 500.0,
            fail_at: Some(t0() + Duration::minutes(2)),
        };
        let station = GroundStation::new("gs", 10.0, 20.0, 0.0).unwrap();

        let track = build_track(
            &hover,
            Some(&station),
            ElevationModel::Planar,
            t0(),
            t0() + Duration::minutes(4),
            Duration::minutes(1),
        )
        .unwrap();

        let times: Vec<_> = track.iter().map(|p| p.position.time).collect();
        assert_eq!(
            times,
            vec![
                t0(),
                t0() + Duration::minutes(1),
                t0() + Duration::minutes(3),
                t0() + Duration::minutes(4)
            ]
        );
        let look = track[0].look.unwrap();
        assert_abs_diff_eq!(look.elevation_deg, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn track_without_station_has_no_look_angles() {
        let hover = Hover {
            lat: 0.0,
            lon: 0.0,
            alt: 500.0,
            fail_at: None,
        };
        let track = build_track(
            &hover,
            None,
            ElevationModel::Planar,
            t0(),
            t0() + Duration::minutes(10),
            Duration::minutes(5),
        )
        .unwrap();
        assert_eq!(track.len(), 3);
        assert!(track.iter().all(|p| p.look.is_none()));
    }

    #[test]
    fn track_rejects_zero_step() {
        let hover = Hover {
            lat: 0.0,
            lon: 0.0,
            alt: 500.0,
            fail_at: None,
        };
        let err = build_track(
            &hover,
            None,
            ElevationModel::Planar,
            t0(),
            t0(),
            Duration::zero(),
        )
        .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidStep));
    }

    #[test]
    fn track_ends_at_the_last_representable_instant() {
        let hover = Hover {
            lat: 0.0,
            lon: 0.0,
            alt: 500.0,
            fail_at: None,
        };
        let end = DateTime::<Utc>::MAX_UTC;
        let track = build_track(
            &hover,
            None,
            ElevationModel::Planar,
            end - Duration::minutes(1),
            end,
            Duration::minutes(1),
        )
        .unwrap();
        assert!(track.len() <= 2);
    }

    #[test]
    fn threshold_elevation_is_not_visible() {
        let hover = Hover {
            lat: 5.0,
            lon: 3.0,
            alt: 420.0,
            fail_at: None,
        };
        let stations = vec![GroundStation::new("eq", 0.0, 0.0, 0.0).unwrap()];
        let position = locate(&hover, t0()).unwrap();
        let elevation = look_angles(&position, &stations[0], ElevationModel::Planar)
            .unwrap()
            .elevation_deg;

        let at_threshold =
            visibility_at(&hover, &stations, ElevationModel::Planar, elevation, t0()).unwrap();
        assert!(!at_threshold[0].visible);

        let below_threshold =
            visibility_at(&hover, &stations, ElevationModel::Planar, elevation - 0.01, t0())
                .unwrap();
        assert!(below_threshold[0].visible);
    }

    #[test]
    fn visibility_per_station() {
        let hover = Hover {
            lat: 12.9716,
            lon: 77.5946,
            alt: 420.0,
            fail_at: None,
        };
        let stations = vec![
            GroundStation::new("blr", 12.9716, 77.5946, 0.92).unwrap(),
            GroundStation::new("hou", 29.5586, -95.0890, 0.018).unwrap(),
        ];

        let status =
            visibility_at(&hover, &stations, ElevationModel::Planar, 10.0, t0()).unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].station_id, "blr");
        assert!(status[0].visible);
        assert!(!status[1].visible);
        assert!(status[1].elevation_deg < 0.0);
    }
}
