use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;

use crate::cancel::CancelToken;
use crate::orbit::OrbitalElements;
use crate::predict::error::PredictError;
use crate::predict::pass_finder::{predict_passes, PassPrediction, SweepSettings};
use crate::tracker::GroundStation;

/// Outcome of one satellite's sweep within a catalog run.
#[derive(Debug)]
pub struct SatellitePrediction {
    pub satellite_id: String,
    pub catalog_number: u32,
    pub outcome: Result<PassPrediction, PredictError>,
}

/// Sweep every satellite on the blocking pool. Results come back in input
/// order; a failing satellite does not abort the others.
pub async fn predict_catalog(
    satellites: Vec<OrbitalElements>,
    stations: Vec<GroundStation>,
    start: DateTime<Utc>,
    settings: SweepSettings,
    cancel: CancelToken,
) -> Result<Vec<SatellitePrediction>, PredictError> {
    if stations.is_empty() {
        return Err(PredictError::NoStationsProvided);
    }
    settings.validate()?;

    let stations: Arc<[GroundStation]> = stations.into();
    let settings = Arc::new(settings);
    let mut tasks = JoinSet::new();

    for (index, elements) in satellites.into_iter().enumerate() {
        let stations = Arc::clone(&stations);
        let settings = Arc::clone(&settings);
        let cancel = cancel.clone();

        tasks.spawn_blocking(move || {
            let outcome = predict_passes(&elements, &stations, start, &settings, Some(&cancel));
            if let Err(e) = &outcome {
                log::warn!("Prediction for {} failed: {}", elements.id, e);
            }
            (
                index,
                SatellitePrediction {
                    satellite_id: elements.id,
                    catalog_number: elements.catalog_number,
                    outcome,
                },
            )
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let (index, prediction) = joined.map_err(|e| PredictError::TaskFailed(e.to_string()))?;
        results.push((index, prediction));
    }

    if cancel.is_cancelled() {
        return Err(PredictError::Cancelled);
    }

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, prediction)| prediction).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::ChecksumPolicy;
    use crate::predict::types::PassWindow;
    use chrono::{Duration, TimeZone};

    const FIXED_1: &str =
        "1 25544U 98067A   25001.00000000  .00002182  00000-0  40864-4 0  9997";
    const FIXED_2: &str =
        "2 25544  51.6461 339.2971 0002829  68.6102 291.5211 15.48919103123450";
    const PUBLISHED_1: &str =
        "1 25544U 98067A   25001.00000000  .00002182  00000-0  40864-4 0  9990";
    const PUBLISHED_2: &str =
        "2 25544  51.6461 339.2971 0002829  68.6102 291.5211 15.48919103123456";

    fn stations() -> Vec<GroundStation> {
        vec![GroundStation::new("blr", 12.9716, 77.5946, 0.92).unwrap()]
    }

    fn settings() -> SweepSettings {
        SweepSettings {
            horizon: Duration::hours(6),
            ..SweepSettings::default()
        }
    }

    fn satellites() -> Vec<OrbitalElements> {
        vec![
            OrbitalElements::parse_with(
                Some("repaired"),
                PUBLISHED_1,
                PUBLISHED_2,
                ChecksumPolicy::Repair,
            )
            .unwrap(),
            OrbitalElements::parse(Some("corrected"), FIXED_1, FIXED_2).unwrap(),
        ]
    }

    #[tokio::test]
    async fn results_follow_input_order() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let results = predict_catalog(
            satellites(),
            stations(),
            start,
            settings(),
            CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].satellite_id, "repaired");
        assert_eq!(results[1].satellite_id, "corrected");

        let repaired = results[0].outcome.as_ref().unwrap();
        let corrected = results[1].outcome.as_ref().unwrap();
        assert_eq!(repaired.samples, 72);
        let renamed: Vec<_> = corrected
            .windows
            .iter()
            .map(|w| PassWindow {
                satellite_id: "repaired".into(),
                ..w.clone()
            })
            .collect();
        assert_eq!(repaired.windows, renamed);
    }

    #[tokio::test]
    async fn empty_station_list_fails_fast() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let err = predict_catalog(satellites(), vec![], start, settings(), CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::NoStationsProvided));
    }

    #[tokio::test]
    async fn cancelled_run() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = predict_catalog(satellites(), stations(), start, settings(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Cancelled));
    }

    #[tokio::test]
    async fn empty_catalog() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let results = predict_catalog(vec![], stations(), start, settings(), CancelToken::new())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
