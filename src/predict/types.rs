use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::predict::stats::quality_score;

/// Link quality label derived from a window's maximum elevation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
pub enum Quality {
    Low,
    Medium,
    High,
}

/// Elevation cutoffs for [`Quality`]. These are operating policy, not physics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityBands {
    pub high_deg: f64,
    pub medium_deg: f64,
}

impl Default for QualityBands {
    fn default() -> Self {
        Self {
            high_deg: 60.0,
            medium_deg: 30.0,
        }
    }
}

impl QualityBands {
    pub fn classify(&self, max_elevation_deg: f64) -> Quality {
        if max_elevation_deg >= self.high_deg {
            Quality::High
        } else if max_elevation_deg >= self.medium_deg {
            Quality::Medium
        } else {
            Quality::Low
        }
    }
}

/// One contiguous interval with the satellite above the visibility threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassWindow {
    pub satellite_id: String,
    pub station_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: f64,
    pub max_elevation_deg: f64,
    pub max_elevation_time: DateTime<Utc>,
    pub quality: Quality,
    pub quality_score: f64,
}

impl PassWindow {
    pub fn new(
        satellite_id: &str,
        station_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_elevation_deg: f64,
        max_elevation_time: DateTime<Utc>,
        bands: &QualityBands,
    ) -> Self {
        let duration_minutes = (end - start).num_milliseconds() as f64 / 60_000.0;
        Self {
            satellite_id: satellite_id.to_string(),
            station_id: station_id.to_string(),
            start,
            end,
            duration_minutes,
            max_elevation_deg,
            max_elevation_time,
            quality: bands.classify(max_elevation_deg),
            quality_score: quality_score(duration_minutes, max_elevation_deg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    #[rstest]
    #[case(72.8, Quality::High)]
    #[case(60.0, Quality::High)]
    #[case(45.2, Quality::Medium)]
    #[case(30.0, Quality::Medium)]
    #[case(15.0, Quality::Low)]
    fn default_bands(#[case] elevation: f64, #[case] expected: Quality) {
        assert_eq!(QualityBands::default().classify(elevation), expected);
    }

    #[test]
    fn custom_bands() {
        let bands = QualityBands {
            high_deg: 45.0,
            medium_deg: 20.0,
        };
        assert_eq!(bands.classify(45.2), Quality::High);
        assert_eq!(bands.classify(15.0), Quality::Low);
    }

    #[test]
    fn window_duration_and_label() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap();
        let window = PassWindow::new(
            "ISS",
            "blr",
            start,
            start + Duration::seconds(450),
            45.2,
            start + Duration::minutes(4),
            &QualityBands::default(),
        );
        assert_eq!(window.duration_minutes, 7.5);
        assert_eq!(window.quality, Quality::Medium);
        assert_eq!(window.quality.to_string(), "Medium");
    }

    #[test]
    fn serializes_iso_instants_and_label() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap();
        let window = PassWindow::new(
            "ISS",
            "blr",
            start,
            start + Duration::minutes(10),
            72.8,
            start + Duration::minutes(5),
            &QualityBands::default(),
        );
        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(json["start"], "2025-01-01T03:00:00Z");
        assert_eq!(json["end"], "2025-01-01T03:10:00Z");
        assert_eq!(json["quality"], "High");
        assert_eq!(json["duration_minutes"], 10.0);
    }
}
