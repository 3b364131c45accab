use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

use passwatch::cancel::CancelToken;
use passwatch::config::{parse_datetime, parse_duration, Config, ConfigError};
use passwatch::orbit::{
    ChecksumPolicy, GeodeticPosition, OrbitalElements, OrbitalParameters, Sgp4Propagator,
};
use passwatch::predict::{
    batch, filter_by_score, parse_catalog_text, PassWindow, PredictError, Refinement,
    TleLoader, WindowStatistics,
};
use passwatch::tracker::{
    build_track, locate, visibility_at, ElevationModel, GroundStation, StationVisibility,
    TrackPoint, TrackerError,
};

#[derive(Parser)]
#[command(name = "passwatch")]
#[command(about = "Satellite visibility windows over ground stations")]
struct Cli {
    /// YAML file with stations, prediction defaults and the TLE folder
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check element sets in a TLE file
    Validate {
        file: PathBuf,
        #[arg(long)]
        repair: bool,
    },
    /// Predict visibility windows for every satellite over every station
    Passes(PassesArgs),
    /// Sample the ground track of one satellite
    Track(TrackArgs),
    /// Derived orbit figures and current position of one satellite
    Orbit(OrbitArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// TLE file(s); defaults to the configured catalog folder
    #[arg(long = "tle")]
    tle: Vec<PathBuf>,
    /// Rewrite wrong checksum digits instead of rejecting the set
    #[arg(long)]
    repair: bool,
    /// Extra station as `id=lat,lon[,alt_km]`
    #[arg(long = "station", value_parser = parse_station)]
    stations: Vec<GroundStation>,
    #[arg(long, value_parser = parse_datetime)]
    start: Option<DateTime<Utc>>,
    #[arg(long)]
    model: Option<ElevationModel>,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PassesArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, value_parser = parse_duration)]
    horizon: Option<Duration>,
    #[arg(long, value_parser = parse_duration)]
    step: Option<Duration>,
    #[arg(long)]
    min_elevation: Option<f64>,
    #[arg(long)]
    max_windows: Option<usize>,
    /// Drop windows shorter than this
    #[arg(long, value_parser = parse_duration)]
    min_duration: Option<Duration>,
    /// Bisect rise and set instants down to this tolerance
    #[arg(long, value_parser = parse_duration)]
    refine: Option<Duration>,
    /// Keep only windows with at least this quality score (0..1)
    #[arg(long)]
    min_score: Option<f64>,
}

#[derive(Args)]
struct TrackArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Catalog number or name; required when the source holds several satellites
    #[arg(long)]
    satellite: Option<String>,
    /// Configured station id to compute look angles from
    #[arg(long = "from")]
    from: Option<String>,
    #[arg(long, value_parser = parse_duration, default_value = "90m")]
    duration: Duration,
    #[arg(long, value_parser = parse_duration, default_value = "1m")]
    step: Duration,
}

#[derive(Args)]
struct OrbitArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long)]
    satellite: Option<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Predict(#[from] PredictError),
    #[error("{0}")]
    Tracker(#[from] TrackerError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let result = match cli.command {
        Commands::Validate { file, repair } => validate(&file, repair),
        Commands::Passes(args) => passes(&config, args).await,
        Commands::Track(args) => track(&config, args),
        Commands::Orbit(args) => orbit(&config, args),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &Path, repair: bool) -> Result<ExitCode, CliError> {
    let content = fs::read_to_string(path)?;
    let file = path.display().to_string();
    let (loaded, rejected) = parse_catalog_text(&content, &file, checksum_policy(repair, None));

    for elements in &loaded {
        println!(
            "  ok  {:>6}  {}  epoch {}  period {:.1} min",
            elements.catalog_number,
            elements.id,
            elements.epoch.format("%Y-%m-%d %H:%M:%S"),
            elements.period_minutes()
        );
    }
    for set in &rejected {
        println!(
            "  bad  {}: {}",
            set.name.as_deref().unwrap_or("(unnamed)"),
            set.error
        );
    }
    println!("{} valid, {} rejected", loaded.len(), rejected.len());

    Ok(if rejected.is_empty() && !loaded.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[derive(Serialize)]
struct PassReport<'a> {
    windows: &'a [PassWindow],
    statistics: WindowStatistics,
    failed: Vec<String>,
}

async fn passes(config: &Config, args: PassesArgs) -> Result<ExitCode, CliError> {
    let satellites = load_satellites(config, &args.source)?;
    let stations = stations(config, &args.source);
    let start = args.source.start.unwrap_or_else(Utc::now);

    let mut settings = config.predict.clone();
    if let Some(horizon) = args.horizon {
        settings.horizon = horizon;
    }
    if let Some(step) = args.step {
        settings.step = step;
    }
    if let Some(min_elevation) = args.min_elevation {
        settings.min_elevation_deg = min_elevation;
    }
    if let Some(max_windows) = args.max_windows {
        settings.max_windows = Some(max_windows);
    }
    if let Some(min_duration) = args.min_duration {
        settings.min_duration = min_duration;
    }
    if let Some(tolerance) = args.refine {
        settings.refinement = Refinement::Bisection { tolerance };
    }
    if let Some(model) = args.source.model {
        settings.elevation_model = model;
    }

    let cancel = CancelToken::new();
    let trip = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping prediction");
            trip.cancel();
        }
    });

    let pairs = satellites.len() * stations.len();
    let results =
        batch::predict_catalog(satellites, stations, start, settings.clone(), cancel).await?;

    let mut windows = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        match result.outcome {
            Ok(prediction) => {
                if prediction.skipped_samples > 0 {
                    log::warn!(
                        "{}: {} of {} samples could not be propagated",
                        result.satellite_id,
                        prediction.skipped_samples,
                        prediction.samples
                    );
                }
                windows.extend(prediction.windows);
            }
            Err(e) => {
                log::error!("{}: {}", result.satellite_id, e);
                failed.push(result.satellite_id);
            }
        }
    }
    windows.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.station_id.cmp(&b.station_id))
    });
    if let Some(min_score) = args.min_score {
        windows = filter_by_score(&windows, min_score);
    }

    let statistics = WindowStatistics::from_windows(&windows, settings.horizon, pairs);

    if args.source.json {
        let report = PassReport {
            windows: &windows,
            statistics,
            failed,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<20} {:<12} {:<20} {:<20} {:>8} {:>7} {:<7} {:>5}",
        "SATELLITE", "STATION", "START", "END", "MINUTES", "MAX EL", "QUALITY", "SCORE"
    );
    for w in &windows {
        println!(
            "{:<20} {:<12} {:<20} {:<20} {:>8.1} {:>7.1} {:<7} {:>5.2}",
            w.satellite_id,
            w.station_id,
            w.start.format("%Y-%m-%d %H:%M:%S"),
            w.end.format("%Y-%m-%d %H:%M:%S"),
            w.duration_minutes,
            w.max_elevation_deg,
            w.quality,
            w.quality_score
        );
    }
    println!();
    println!(
        "{} windows, {:.1} min total, avg {:.1} min, avg max el {:.1}°, coverage {:.1}%",
        statistics.total_windows,
        statistics.total_minutes,
        statistics.average_duration_minutes,
        statistics.average_max_elevation_deg,
        statistics.coverage_efficiency_percent
    );
    if !failed.is_empty() {
        println!("failed: {}", failed.join(", "));
    }

    Ok(ExitCode::SUCCESS)
}

fn track(config: &Config, args: TrackArgs) -> Result<ExitCode, CliError> {
    let satellites = load_satellites(config, &args.source)?;
    let elements = select_satellite(&satellites, args.satellite.as_deref())?;
    let propagator = propagator(elements)?;

    let stations = stations(config, &args.source);
    let station = match &args.from {
        Some(id) => Some(
            stations
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| CliError::Usage(format!("unknown station {:?}", id)))?,
        ),
        None => None,
    };

    let model = args.source.model.unwrap_or(config.predict.elevation_model);
    let start = args.source.start.unwrap_or_else(Utc::now);
    let end = start
        .checked_add_signed(args.duration)
        .ok_or_else(|| CliError::Usage("--duration exceeds the supported time range".into()))?;
    let points = build_track(&propagator, station, model, start, end, args.step)?;

    if args.source.json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} ({})", elements.id, elements.catalog_number);
    for TrackPoint { position, look } in &points {
        print!(
            "{}  {:>8.3} {:>9.3} {:>8.1} km",
            position.time.format("%Y-%m-%d %H:%M:%S"),
            position.latitude_deg,
            position.longitude_deg,
            position.altitude_km
        );
        match look {
            Some(look) => println!(
                "  az {:>6.1}  el {:>6.1}  range {:>8.1} km",
                look.bearing_deg, look.elevation_deg, look.range_km
            ),
            None => println!(),
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct OrbitReport<'a> {
    elements: &'a OrbitalElements,
    from_elements: OrbitalParameters,
    from_altitude: OrbitalParameters,
    position: GeodeticPosition,
    stations: Vec<StationVisibility>,
}

fn orbit(config: &Config, args: OrbitArgs) -> Result<ExitCode, CliError> {
    let satellites = load_satellites(config, &args.source)?;
    let elements = select_satellite(&satellites, args.satellite.as_deref())?;
    let propagator = propagator(elements)?;

    let at = args.source.start.unwrap_or_else(Utc::now);
    let position = locate(&propagator, at)?;
    let stations = stations(config, &args.source);
    let model = args.source.model.unwrap_or(config.predict.elevation_model);
    let visibility = visibility_at(
        &propagator,
        &stations,
        model,
        config.predict.min_elevation_deg,
        at,
    )?;

    let report = OrbitReport {
        elements,
        from_elements: OrbitalParameters::from_elements(elements),
        from_altitude: OrbitalParameters::from_altitude(position.altitude_km),
        position,
        stations: visibility,
    };

    if args.source.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    let exact = &report.from_elements;
    println!("{} ({})", elements.id, elements.catalog_number);
    println!("  epoch         {}", elements.epoch.format("%Y-%m-%d %H:%M:%S"));
    println!("  inclination   {:.4}°", elements.inclination_deg);
    println!("  eccentricity  {:.7}", elements.eccentricity);
    println!("  period        {:.2} min", exact.period_minutes);
    println!(
        "  apogee        {:.1} km  perigee {:.1} km",
        exact.apogee_altitude_km(),
        exact.perigee_altitude_km()
    );
    println!(
        "  at {}  lat {:.3}  lon {:.3}  alt {:.1} km  speed {:.3} km/s",
        at.format("%Y-%m-%d %H:%M:%S"),
        position.latitude_deg,
        position.longitude_deg,
        position.altitude_km,
        report.from_altitude.velocity_km_s
    );
    for status in &report.stations {
        println!(
            "  {:<12} el {:>6.1}  az {:>6.1}  {}",
            status.station_id,
            status.elevation_deg,
            status.look.bearing_deg,
            if status.visible { "visible" } else { "-" }
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn checksum_policy(repair: bool, config: Option<&Config>) -> ChecksumPolicy {
    if repair {
        ChecksumPolicy::Repair
    } else {
        config.map(|c| c.catalog.checksum).unwrap_or_default()
    }
}

fn load_satellites(config: &Config, source: &SourceArgs) -> Result<Vec<OrbitalElements>, CliError> {
    let policy = checksum_policy(source.repair, Some(config));

    let satellites = if !source.tle.is_empty() {
        let mut satellites = Vec::new();
        for path in &source.tle {
            let content = fs::read_to_string(path)?;
            let (loaded, rejected) =
                parse_catalog_text(&content, &path.display().to_string(), policy);
            if !rejected.is_empty() {
                log::warn!("{}: {} element sets rejected", path.display(), rejected.len());
            }
            satellites.extend(loaded);
        }
        satellites
    } else if let Some(dir) = &config.catalog.tle_folder {
        let mut loader = TleLoader::new(dir.clone(), policy);
        loader.load_all()?;
        loader.satellites().into_iter().cloned().collect()
    } else {
        return Err(CliError::Usage(
            "no element sets: pass --tle or set catalog.tle_folder".into(),
        ));
    };

    if satellites.is_empty() {
        return Err(CliError::Usage("no valid element sets loaded".into()));
    }
    Ok(satellites)
}

fn select_satellite<'a>(
    satellites: &'a [OrbitalElements],
    query: Option<&str>,
) -> Result<&'a OrbitalElements, CliError> {
    match (query, satellites) {
        (None, [only]) => Ok(only),
        (None, _) => Err(CliError::Usage(format!(
            "{} satellites loaded, pick one with --satellite",
            satellites.len()
        ))),
        (Some(query), _) => {
            let query = query.trim();
            satellites
                .iter()
                .find(|s| {
                    s.catalog_number.to_string() == query || s.id.eq_ignore_ascii_case(query)
                })
                .ok_or_else(|| CliError::Usage(format!("no satellite matches {:?}", query)))
        }
    }
}

fn propagator(elements: &OrbitalElements) -> Result<Sgp4Propagator, CliError> {
    Sgp4Propagator::new(elements).map_err(|source| {
        CliError::Predict(PredictError::MalformedElements {
            satellite: elements.id.clone(),
            source,
        })
    })
}

fn stations(config: &Config, source: &SourceArgs) -> Vec<GroundStation> {
    let mut stations = config.stations.clone();
    stations.extend(source.stations.iter().cloned());
    stations
}

/// `id=lat,lon[,alt_km]`
fn parse_station(s: &str) -> Result<GroundStation, String> {
    let (id, coordinates) = s
        .split_once('=')
        .ok_or_else(|| format!("expected id=lat,lon[,alt_km], got {:?}", s))?;

    let parts: Vec<&str> = coordinates.split(',').map(str::trim).collect();
    let (lat_lon, altitude) = match parts.as_slice() {
        [lat, lon] => (format!("{}, {}", lat, lon), None),
        [lat, lon, alt] => (
            format!("{}, {}", lat, lon),
            Some(
                alt.parse::<f64>()
                    .map_err(|e| format!("invalid altitude {:?}: {}", alt, e))?,
            ),
        ),
        _ => return Err(format!("expected id=lat,lon[,alt_km], got {:?}", s)),
    };

    GroundStation::from_coordinates(id.trim(), &lat_lon, altitude).map_err(|e| e.to_string())
}
