use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::deserialize_duration;
use crate::orbit::{
    frames, GeometryError, OrbitalElements, PropagationError, Propagator, Sgp4Propagator,
};
use crate::predict::error::PredictError;
use crate::predict::types::{PassWindow, QualityBands};
use crate::tracker::{look_angles, ElevationModel, GroundStation};

const DEFAULT_STEP_MINUTES: i64 = 5;
const DEFAULT_HORIZON_HOURS: i64 = 24;
const DEFAULT_MIN_ELEVATION_DEG: f64 = 10.0;

/// How rise and set instants are placed between two samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refinement {
    /// Edges land on sample instants.
    #[default]
    None,
    /// Bisect the bracketing samples until the interval is within `tolerance`.
    Bisection {
        #[serde(deserialize_with = "deserialize_duration")]
        tolerance: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    #[serde(deserialize_with = "deserialize_duration")]
    pub step: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub horizon: Duration,
    /// Visibility threshold. A sample is in view when its elevation is strictly above it.
    pub min_elevation_deg: f64,
    /// Keep only the earliest this many windows across all stations. The sweep
    /// stops once no later sample can produce an earlier window.
    pub max_windows: Option<usize>,
    /// Windows shorter than this are dropped.
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_duration: Duration,
    pub quality: QualityBands,
    pub elevation_model: ElevationModel,
    pub refinement: Refinement,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            step: Duration::minutes(DEFAULT_STEP_MINUTES),
            horizon: Duration::hours(DEFAULT_HORIZON_HOURS),
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
            max_windows: None,
            min_duration: Duration::zero(),
            quality: QualityBands::default(),
            elevation_model: ElevationModel::default(),
            refinement: Refinement::default(),
        }
    }
}

impl SweepSettings {
    pub fn validate(&self) -> Result<(), PredictError> {
        let invalid = |msg: &str| Err(PredictError::InvalidSettings(msg.to_string()));

        if self.step <= Duration::zero() {
            return invalid("step must be positive");
        }
        if self.horizon <= Duration::zero() {
            return invalid("horizon must be positive");
        }
        if !(self.min_elevation_deg.is_finite() && (-90.0..=90.0).contains(&self.min_elevation_deg))
        {
            return invalid("min_elevation_deg must be within -90..90");
        }
        if self.max_windows == Some(0) {
            return invalid("max_windows must be at least 1");
        }
        if self.min_duration < Duration::zero() {
            return invalid("min_duration must not be negative");
        }
        if let Refinement::Bisection { tolerance } = self.refinement {
            if tolerance <= Duration::zero() {
                return invalid("refinement tolerance must be positive");
            }
        }
        Ok(())
    }
}

/// Windows found by one sweep, plus how many samples had to be skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassPrediction {
    pub windows: Vec<PassWindow>,
    pub samples: usize,
    /// Instants where propagation failed for every station.
    pub skipped_samples: usize,
    /// Individual station samples dropped for invalid geometry.
    pub skipped_station_samples: usize,
}

/// Elevation above each station at one instant, in station order.
pub type ElevationSample = Result<Vec<Result<f64, GeometryError>>, PropagationError>;

pub struct PassPredictor<'a, P: Propagator + ?Sized> {
    satellite_id: &'a str,
    propagator: &'a P,
    settings: SweepSettings,
    cancel: Option<CancelToken>,
}

impl<'a, P: Propagator + ?Sized> PassPredictor<'a, P> {
    pub fn new(satellite_id: &'a str, propagator: &'a P, settings: SweepSettings) -> Self {
        Self {
            satellite_id,
            propagator,
            settings,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn predict(
        &self,
        stations: &[GroundStation],
        start: DateTime<Utc>,
    ) -> Result<PassPrediction, PredictError> {
        let model = self.settings.elevation_model;
        sweep_elevations(
            self.satellite_id,
            stations,
            start,
            &self.settings,
            self.cancel.as_ref(),
            |at| {
                let state = self.propagator.propagate(at)?;
                let position = match frames::to_geodetic(&state) {
                    Ok(position) => position,
                    Err(e) => return Ok(vec![Err(e); stations.len()]),
                };
                Ok(stations
                    .iter()
                    .map(|station| look_angles(&position, station, model).map(|l| l.elevation_deg))
                    .collect())
            },
        )
    }
}

/// Build an SGP4 propagator for `elements` and sweep every station.
pub fn predict_passes(
    elements: &OrbitalElements,
    stations: &[GroundStation],
    start: DateTime<Utc>,
    settings: &SweepSettings,
    cancel: Option<&CancelToken>,
) -> Result<PassPrediction, PredictError> {
    let propagator =
        Sgp4Propagator::new(elements).map_err(|source| PredictError::MalformedElements {
            satellite: elements.id.clone(),
            source,
        })?;

    let mut predictor = PassPredictor::new(&elements.id, &propagator, settings.clone());
    if let Some(cancel) = cancel {
        predictor = predictor.with_cancel(cancel.clone());
    }
    predictor.predict(stations, start)
}

#[derive(Debug, Clone, Copy)]
struct OpenWindow {
    start: DateTime<Utc>,
    peak_elevation: f64,
    peak_time: DateTime<Utc>,
    last_sample: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
enum Visibility {
    BelowHorizon { last_sample: Option<DateTime<Utc>> },
    InView(OpenWindow),
}

/// Fixed-step visibility sweep over `[start, start + horizon)`.
///
/// `sample` yields the elevation above every station at an instant. A failed
/// sample is skipped for all stations; a failed station entry is skipped for
/// that station only. Neither changes the station's visibility state.
pub fn sweep_elevations<F>(
    satellite_id: &str,
    stations: &[GroundStation],
    start: DateTime<Utc>,
    settings: &SweepSettings,
    cancel: Option<&CancelToken>,
    mut sample: F,
) -> Result<PassPrediction, PredictError>
where
    F: FnMut(DateTime<Utc>) -> ElevationSample,
{
    if stations.is_empty() {
        return Err(PredictError::NoStationsProvided);
    }
    settings.validate()?;

    let threshold = settings.min_elevation_deg;
    let end = start.checked_add_signed(settings.horizon).ok_or_else(|| {
        PredictError::InvalidSettings("horizon exceeds the supported time range".to_string())
    })?;
    let mut states = vec![Visibility::BelowHorizon { last_sample: None }; stations.len()];
    let mut result = PassPrediction::default();
    let mut capped = false;
    let mut cursor = start;

    while cursor < end {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(PredictError::Cancelled);
        }
        result.samples += 1;

        let elevations = match sample(cursor) {
            Ok(elevations) => elevations,
            Err(e) => {
                log::debug!("{}: skipping sample: {}", satellite_id, e);
                result.skipped_samples += 1;
                match cursor.checked_add_signed(settings.step) {
                    Some(next) => cursor = next,
                    None => break,
                }
                continue;
            }
        };

        for (index, elevation) in elevations.into_iter().enumerate().take(stations.len()) {
            let elevation = match elevation {
                Ok(elevation) => elevation,
                Err(e) => {
                    log::debug!(
                        "{}: skipping {} at {}: {}",
                        satellite_id,
                        stations[index].id,
                        cursor,
                        e
                    );
                    result.skipped_station_samples += 1;
                    continue;
                }
            };

            match states[index] {
                Visibility::BelowHorizon { last_sample } => {
                    if elevation > threshold {
                        let rise = match (settings.refinement, last_sample) {
                            (Refinement::Bisection { tolerance }, Some(before)) => refine_crossing(
                                &mut sample,
                                index,
                                threshold,
                                before,
                                cursor,
                                true,
                                tolerance,
                            ),
                            _ => cursor,
                        };
                        states[index] = Visibility::InView(OpenWindow {
                            start: rise,
                            peak_elevation: elevation,
                            peak_time: cursor,
                            last_sample: cursor,
                        });
                    } else {
                        states[index] = Visibility::BelowHorizon {
                            last_sample: Some(cursor),
                        };
                    }
                }
                Visibility::InView(mut open) => {
                    if elevation > threshold {
                        if elevation > open.peak_elevation {
                            open.peak_elevation = elevation;
                            open.peak_time = cursor;
                        }
                        open.last_sample = cursor;
                        states[index] = Visibility::InView(open);
                        continue;
                    }

                    let set = match settings.refinement {
                        Refinement::Bisection { tolerance } => refine_crossing(
                            &mut sample,
                            index,
                            threshold,
                            open.last_sample,
                            cursor,
                            false,
                            tolerance,
                        ),
                        Refinement::None => cursor,
                    };
                    states[index] = Visibility::BelowHorizon {
                        last_sample: Some(cursor),
                    };
                    emit(&mut result, satellite_id, &stations[index], open, set, settings);
                }
            }
        }

        if let Some(max) = settings.max_windows {
            if cap_reached(&result.windows, &states, start, max) {
                log::debug!("{}: window cap of {} reached at {}", satellite_id, max, cursor);
                capped = true;
                break;
            }
        }

        match cursor.checked_add_signed(settings.step) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    // a capped sweep only stops once every open window starts too late to rank
    if !capped {
        for (index, state) in states.iter().enumerate() {
            if let Visibility::InView(open) = *state {
                emit(&mut result, satellite_id, &stations[index], open, end, settings);
            }
        }
    }

    result
        .windows
        .sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.station_id.cmp(&b.station_id)));
    if let Some(max) = settings.max_windows {
        result.windows.truncate(max);
    }

    log::info!(
        "{}: {} windows over {} stations ({} samples, {} skipped)",
        satellite_id,
        result.windows.len(),
        stations.len(),
        result.samples,
        result.skipped_samples
    );

    Ok(result)
}

/// Push a closed window unless it is too short.
fn emit(
    result: &mut PassPrediction,
    satellite_id: &str,
    station: &GroundStation,
    open: OpenWindow,
    end: DateTime<Utc>,
    settings: &SweepSettings,
) {
    if end - open.start < settings.min_duration {
        log::debug!(
            "{}: dropping short window over {} at {}",
            satellite_id,
            station.id,
            open.start
        );
        return;
    }

    result.windows.push(PassWindow::new(
        satellite_id,
        &station.id,
        open.start,
        end,
        open.peak_elevation,
        open.peak_time,
        &settings.quality,
    ));
}

/// True once `max` closed windows start before anything the rest of the sweep
/// could still produce. An open window keeps its start; a station below the
/// horizon can only rise after its last sample.
fn cap_reached(
    windows: &[PassWindow],
    states: &[Visibility],
    start: DateTime<Utc>,
    max: usize,
) -> bool {
    if windows.len() < max {
        return false;
    }
    let earliest_pending = states
        .iter()
        .map(|state| match *state {
            Visibility::InView(open) => open.start,
            Visibility::BelowHorizon { last_sample } => last_sample.unwrap_or(start),
        })
        .min()
        .unwrap_or(start);

    windows.iter().filter(|w| w.start < earliest_pending).count() >= max
}

/// Binary search for the threshold crossing between `before` and `after`.
/// Returns the first instant found on the far side of the crossing.
fn refine_crossing<F>(
    sample: &mut F,
    index: usize,
    threshold: f64,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    rising: bool,
    tolerance: Duration,
) -> DateTime<Utc>
where
    F: FnMut(DateTime<Utc>) -> ElevationSample,
{
    let mut low = before;
    let mut high = after;

    while high - low > tolerance {
        let mid = low + (high - low) / 2;
        let elevation = match sample(mid).map(|e| e.into_iter().nth(index)) {
            Ok(Some(Ok(elevation))) => elevation,
            _ => break,
        };

        if (elevation > threshold) == rising {
            high = mid;
        } else {
            low = mid;
        }
    }

    high
}
