use approx::assert_abs_diff_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};

use passwatch::orbit::{
    ChecksumPolicy, ElementsError, OrbitalElements, OrbitalParameters, Sgp4Propagator,
};
use passwatch::predict::{predict_passes, PassWindow, Refinement, SweepSettings};
use passwatch::tracker::{build_track, ElevationModel, GroundStation};

// Published with wrong checksum digits on both lines.
const ISS_LINE1: &str = "1 25544U 98067A   25001.00000000  .00002182  00000-0  40864-4 0  9990";
const ISS_LINE2: &str = "2 25544  51.6461 339.2971 0002829  68.6102 291.5211 15.48919103123456";

const ISS_LINE1_FIXED: &str =
    "1 25544U 98067A   25001.00000000  .00002182  00000-0  40864-4 0  9997";
const ISS_LINE2_FIXED: &str =
    "2 25544  51.6461 339.2971 0002829  68.6102 291.5211 15.48919103123450";

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn bangalore() -> GroundStation {
    GroundStation::new("bangalore", 12.9716, 77.5946, 0.92).unwrap()
}

fn iss() -> OrbitalElements {
    OrbitalElements::parse_with(Some("ISS"), ISS_LINE1, ISS_LINE2, ChecksumPolicy::Repair)
        .unwrap()
}

fn day_sweep() -> SweepSettings {
    SweepSettings {
        step: Duration::minutes(5),
        horizon: Duration::hours(24),
        min_elevation_deg: 10.0,
        ..SweepSettings::default()
    }
}

fn assert_well_formed(windows: &[PassWindow]) {
    assert!(!windows.is_empty());
    for pair in windows.windows(2) {
        assert!(pair[0].start <= pair[1].start);
    }
    for window in windows {
        assert!(window.end > window.start);
        assert!(window.duration_minutes > 0.0);
        assert!((10.0..=90.0).contains(&window.max_elevation_deg));
        assert!(window.start >= epoch());
        assert!(window.end <= epoch() + Duration::hours(24));
        assert!(window.max_elevation_time >= window.start);
        assert!(window.max_elevation_time <= window.end);
    }
}

#[test]
fn iss_over_bangalore_for_a_day() {
    let elements = iss();
    assert_eq!(elements.epoch, epoch());

    let prediction =
        predict_passes(&elements, &[bangalore()], epoch(), &day_sweep(), None).unwrap();

    assert_eq!(prediction.samples, 288);
    assert_eq!(prediction.skipped_samples, 0);
    assert_well_formed(&prediction.windows);
    for window in &prediction.windows {
        assert_eq!(window.satellite_id, "ISS");
        assert_eq!(window.station_id, "bangalore");
    }
}

#[test]
fn repaired_and_corrected_lines_agree() {
    let corrected =
        OrbitalElements::parse(Some("ISS"), ISS_LINE1_FIXED, ISS_LINE2_FIXED).unwrap();
    let repaired = iss();
    assert_eq!(repaired.line1, corrected.line1);
    assert_eq!(repaired.line2, corrected.line2);

    let a = predict_passes(&repaired, &[bangalore()], epoch(), &day_sweep(), None).unwrap();
    let b = predict_passes(&corrected, &[bangalore()], epoch(), &day_sweep(), None).unwrap();
    assert_eq!(a.windows, b.windows);
}

#[test]
fn published_checksums_are_rejected_by_default() {
    let err = OrbitalElements::parse(Some("ISS"), ISS_LINE1, ISS_LINE2).unwrap_err();
    assert_eq!(
        err,
        ElementsError::BadChecksum {
            line: 1,
            found: 0,
            computed: 7
        }
    );
}

#[test]
fn collapsed_whitespace_is_rejected() {
    let err = OrbitalElements::parse_with(
        None,
        "1 25544U 98067A 25001.00000000 .00002182 00000-0 40864-4 0 9990",
        "2 25544 51.6461 339.2971 0002829 68.6102 291.5211 15.48919103123456",
        ChecksumPolicy::Repair,
    )
    .unwrap_err();
    assert!(matches!(err, ElementsError::BadLength { line: 1, .. }));
}

#[test]
fn refinement_moves_edges_inside_one_step() {
    let fixed = predict_passes(&iss(), &[bangalore()], epoch(), &day_sweep(), None).unwrap();
    let refined_settings = SweepSettings {
        refinement: Refinement::Bisection {
            tolerance: Duration::seconds(1),
        },
        ..day_sweep()
    };
    let refined =
        predict_passes(&iss(), &[bangalore()], epoch(), &refined_settings, None).unwrap();

    assert_eq!(fixed.windows.len(), refined.windows.len());
    let step = Duration::minutes(5);
    for (f, r) in fixed.windows.iter().zip(&refined.windows) {
        assert!(r.start <= f.start && f.start - r.start <= step);
        assert!(r.end <= f.end && f.end - r.end <= step);
        assert_eq!(r.max_elevation_deg, f.max_elevation_deg);
    }
}

#[test]
fn several_stations_stay_ordered() {
    let stations = [
        bangalore(),
        GroundStation::new("houston", 29.5586, -95.0890, 0.018).unwrap(),
        GroundStation::new("kiruna", 67.8558, 20.2253, 0.4).unwrap(),
    ];
    let prediction = predict_passes(&iss(), &stations, epoch(), &day_sweep(), None).unwrap();

    assert_well_formed(&prediction.windows);
    for pair in prediction.windows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.start < b.start || (a.start == b.start && a.station_id <= b.station_id));
    }
}

#[test]
fn ground_track_stays_in_orbit_band() {
    let propagator = Sgp4Propagator::new(&iss()).unwrap();
    let station = bangalore();
    let track = build_track(
        &propagator,
        Some(&station),
        ElevationModel::Spherical,
        epoch(),
        epoch() + Duration::minutes(90),
        Duration::minutes(1),
    )
    .unwrap();

    assert_eq!(track.len(), 91);
    for point in &track {
        assert!(point.position.latitude_deg.abs() <= 52.0);
        assert!((-180.0..180.0).contains(&point.position.longitude_deg));
        assert!((380.0..460.0).contains(&point.position.altitude_km));
        let look = point.look.unwrap();
        assert!((0.0..360.0).contains(&look.bearing_deg));
        assert!(look.elevation_deg <= 90.0);
    }
}

#[test]
fn orbit_figures_from_elements() {
    let params = OrbitalParameters::from_elements(&iss());
    assert_abs_diff_eq!(params.period_minutes, 1440.0 / 15.48919103, epsilon = 1e-6);
    assert!((7.6..7.7).contains(&params.velocity_km_s));
    assert!(params.apogee_radius_km > params.perigee_radius_km);
    assert!((400.0..440.0).contains(&params.apogee_altitude_km()));
    assert!((400.0..440.0).contains(&params.perigee_altitude_km()));
}
