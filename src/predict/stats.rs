use chrono::Duration;
use serde::Serialize;

use crate::predict::types::PassWindow;

/// Window length at which the duration term of the score saturates.
const FULL_SCORE_DURATION_MINUTES: f64 = 15.0;
const DURATION_WEIGHT: f64 = 0.6;
const ELEVATION_WEIGHT: f64 = 0.4;

/// Composite score in [0, 1] weighting duration and peak elevation.
pub fn quality_score(duration_minutes: f64, max_elevation_deg: f64) -> f64 {
    let duration = (duration_minutes / FULL_SCORE_DURATION_MINUTES).clamp(0.0, 1.0);
    let elevation = (max_elevation_deg / 90.0).clamp(0.0, 1.0);
    DURATION_WEIGHT * duration + ELEVATION_WEIGHT * elevation
}

pub fn filter_by_score(windows: &[PassWindow], min_score: f64) -> Vec<PassWindow> {
    windows
        .iter()
        .filter(|w| w.quality_score >= min_score)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WindowStatistics {
    pub total_windows: usize,
    pub total_minutes: f64,
    pub average_duration_minutes: f64,
    pub average_max_elevation_deg: f64,
    /// Share of the swept time covered by windows, averaged over all
    /// satellite/station pairs, capped at 100.
    pub coverage_efficiency_percent: f64,
}

impl WindowStatistics {
    pub fn from_windows(windows: &[PassWindow], horizon: Duration, pairs: usize) -> Self {
        if windows.is_empty() {
            return Self::default();
        }

        let total_windows = windows.len();
        let total_minutes: f64 = windows.iter().map(|w| w.duration_minutes).sum();
        let elevation_sum: f64 = windows.iter().map(|w| w.max_elevation_deg).sum();

        let horizon_minutes = horizon.num_milliseconds() as f64 / 60_000.0;
        let coverage_efficiency_percent = if pairs == 0 || horizon_minutes <= 0.0 {
            0.0
        } else {
            (total_minutes / (horizon_minutes * pairs as f64) * 100.0).min(100.0)
        };

        Self {
            total_windows,
            total_minutes,
            average_duration_minutes: total_minutes / total_windows as f64,
            average_max_elevation_deg: elevation_sum / total_windows as f64,
            coverage_efficiency_percent,
        }
    }
}
