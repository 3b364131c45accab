/// Mean Earth radius used for surface distances and circular-orbit estimates.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0;

/// Standard gravitational parameter of the Earth.
pub const EARTH_MU_KM3_S2: f64 = 398_600.441_8;

// WGS-84 constants
pub const WGS84_A_KM: f64 = 6378.137;
pub const WGS84_E2: f64 = 0.006_694_379_990_14;

pub const JULIAN_DATE_UNIX_EPOCH: f64 = 2_440_587.5;
pub const JULIAN_DATE_J2000: f64 = 2_451_545.0;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const MINUTES_PER_DAY: f64 = 1440.0;
