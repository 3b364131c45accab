use std::ops::Range;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::orbit::constants::MINUTES_PER_DAY;
use crate::orbit::error::ElementsError;

const LINE_LENGTH: usize = 69;
const CHECKSUM_COLUMN: usize = 68;

/// What to do when an element line's checksum digit does not match its contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    #[default]
    Enforce,
    /// Replace a wrong checksum digit with the computed one. All other format
    /// rules still apply.
    Repair,
}

/// A decoded two-line element set.
///
/// `line1` and `line2` always hold 69-column lines with a valid checksum, so they
/// can be handed to the propagation model as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalElements {
    pub id: String,
    pub line1: String,
    pub line2: String,
    pub catalog_number: u32,
    pub classification: char,
    pub international_designator: String,
    pub epoch: DateTime<Utc>,
    /// First derivative of mean motion divided by two (rev/day²).
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion divided by six (rev/day³).
    pub mean_motion_ddot: f64,
    pub bstar: f64,
    pub element_set_number: u32,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion_rev_per_day: f64,
    pub revolution_number: u32,
}

impl OrbitalElements {
    pub fn parse(name: Option<&str>, line1: &str, line2: &str) -> Result<Self, ElementsError> {
        Self::parse_with(name, line1, line2, ChecksumPolicy::Enforce)
    }

    pub fn parse_with(
        name: Option<&str>,
        line1: &str,
        line2: &str,
        policy: ChecksumPolicy,
    ) -> Result<Self, ElementsError> {
        let line1 = prepare_line(line1, 1, policy)?;
        let line2 = prepare_line(line2, 2, policy)?;

        let catalog_number = parse_u32(&line1, 1, 2..7, "catalog number")?;
        let catalog_line2 = parse_u32(&line2, 2, 2..7, "catalog number")?;
        if catalog_number != catalog_line2 {
            return Err(ElementsError::CatalogMismatch {
                line1: catalog_number,
                line2: catalog_line2,
            });
        }

        let classification = match line1.as_bytes()[7] {
            c @ (b'U' | b'C' | b'S') => c as char,
            _ => return Err(bad_field(&line1, 1, 7..8, "classification")),
        };

        let epoch = parse_epoch(&line1)?;
        let mean_motion_dot = parse_f64(&line1, 1, 33..43, "mean motion derivative")?;
        let mean_motion_ddot =
            parse_assumed_decimal(&line1, 1, 44..52, "mean motion second derivative")?;
        let bstar = parse_assumed_decimal(&line1, 1, 53..61, "drag term")?;
        let element_set_number = parse_u32(&line1, 1, 64..68, "element set number")?;

        let inclination_deg = parse_angle(&line2, 8..16, "inclination", 180.0)?;
        let raan_deg = parse_angle(&line2, 17..25, "right ascension", 360.0)?;
        let eccentricity = parse_eccentricity(&line2)?;
        let arg_perigee_deg = parse_angle(&line2, 34..42, "argument of perigee", 360.0)?;
        let mean_anomaly_deg = parse_angle(&line2, 43..51, "mean anomaly", 360.0)?;

        let mean_motion_rev_per_day = parse_f64(&line2, 2, 52..63, "mean motion")?;
        if mean_motion_rev_per_day <= 0.0 {
            return Err(bad_field(&line2, 2, 52..63, "mean motion"));
        }
        let revolution_number = parse_u32(&line2, 2, 63..68, "revolution number")?;

        let id = name
            .map(clean_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("NORAD {}", catalog_number));

        Ok(Self {
            id,
            international_designator: line1[9..17].trim().to_string(),
            line1,
            line2,
            catalog_number,
            classification,
            epoch,
            mean_motion_dot,
            mean_motion_ddot,
            bstar,
            element_set_number,
            inclination_deg,
            raan_deg,
            eccentricity,
            arg_perigee_deg,
            mean_anomaly_deg,
            mean_motion_rev_per_day,
            revolution_number,
        })
    }

    /// Parse a two-line set, optionally preceded by a name line.
    pub fn from_text(text: &str, policy: ChecksumPolicy) -> Result<Self, ElementsError> {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        match lines.as_slice() {
            [line1, line2] => Self::parse_with(None, line1, line2, policy),
            [name, line1, line2] => Self::parse_with(Some(*name), line1, line2, policy),
            _ => Err(ElementsError::LineCount(lines.len())),
        }
    }

    /// Nominal orbital period from the mean motion.
    pub fn period_minutes(&self) -> f64 {
        MINUTES_PER_DAY / self.mean_motion_rev_per_day
    }
}

/// Modulo-10 checksum over the first 68 columns: digits count their value, minus
/// signs count one.
pub fn checksum(body: &str) -> u8 {
    let sum: u32 = body
        .bytes()
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

fn prepare_line(raw: &str, number: u8, policy: ChecksumPolicy) -> Result<String, ElementsError> {
    let line = raw.trim();
    if !line.is_ascii() {
        return Err(ElementsError::NonAscii { line: number });
    }
    if line.len() != LINE_LENGTH {
        return Err(ElementsError::BadLength {
            line: number,
            len: line.len(),
        });
    }

    let bytes = line.as_bytes();
    if bytes[0] != b'0' + number || bytes[1] != b' ' {
        return Err(ElementsError::BadLineNumber { line: number });
    }

    let found = bytes[CHECKSUM_COLUMN];
    if !found.is_ascii_digit() {
        return Err(bad_field(line, number, 68..69, "checksum"));
    }
    let found = found - b'0';
    let computed = checksum(&line[..CHECKSUM_COLUMN]);
    if found == computed {
        return Ok(line.to_string());
    }

    match policy {
        ChecksumPolicy::Enforce => Err(ElementsError::BadChecksum {
            line: number,
            found,
            computed,
        }),
        ChecksumPolicy::Repair => {
            log::warn!(
                "Line {} checksum is {}, repairing to {}",
                number,
                found,
                computed
            );
            Ok(format!("{}{}", &line[..CHECKSUM_COLUMN], computed))
        }
    }
}

fn clean_name(name: &str) -> String {
    let name = name.trim();
    // 3LE catalogs prefix the name line with "0 "
    name.strip_prefix("0 ").unwrap_or(name).trim().to_string()
}

fn bad_field(line: &str, number: u8, range: Range<usize>, field: &'static str) -> ElementsError {
    ElementsError::BadField {
        line: number,
        field,
        text: line[range].to_string(),
    }
}

fn parse_u32(
    line: &str,
    number: u8,
    range: Range<usize>,
    field: &'static str,
) -> Result<u32, ElementsError> {
    line[range.clone()]
        .trim()
        .parse()
        .map_err(|_| bad_field(line, number, range, field))
}

fn parse_f64(
    line: &str,
    number: u8,
    range: Range<usize>,
    field: &'static str,
) -> Result<f64, ElementsError> {
    line[range.clone()]
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| bad_field(line, number, range, field))
}

fn parse_angle(
    line: &str,
    range: Range<usize>,
    field: &'static str,
    max: f64,
) -> Result<f64, ElementsError> {
    let value = parse_f64(line, 2, range.clone(), field)?;
    if !(0.0..=max).contains(&value) {
        return Err(bad_field(line, 2, range, field));
    }
    Ok(value)
}

/// Columns like ` 40864-4`: optional sign, mantissa digits after an implied
/// leading decimal point, signed single-digit exponent.
fn parse_assumed_decimal(
    line: &str,
    number: u8,
    range: Range<usize>,
    field: &'static str,
) -> Result<f64, ElementsError> {
    let err = || bad_field(line, number, range.clone(), field);
    let text = line[range.clone()].trim();
    if text.len() < 3 {
        return Err(err());
    }

    let (mantissa, exponent) = text.split_at(text.len() - 2);
    let exponent: i32 = exponent.parse().map_err(|_| err())?;
    let (sign, digits) = match mantissa.strip_prefix('-') {
        Some(d) => (-1.0, d),
        None => (1.0, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let value: f64 = format!("0.{}", digits).parse().map_err(|_| err())?;
    Ok(sign * value * 10f64.powi(exponent))
}

fn parse_eccentricity(line: &str) -> Result<f64, ElementsError> {
    let digits = &line[26..33];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_field(line, 2, 26..33, "eccentricity"));
    }
    format!("0.{}", digits)
        .parse()
        .map_err(|_| bad_field(line, 2, 26..33, "eccentricity"))
}

fn parse_epoch(line: &str) -> Result<DateTime<Utc>, ElementsError> {
    let two_digit_year = parse_u32(line, 1, 18..20, "epoch year")?;
    let day = parse_f64(line, 1, 20..32, "epoch day")?;
    if !(1.0..367.0).contains(&day) {
        return Err(bad_field(line, 1, 20..32, "epoch day"));
    }

    let year = if two_digit_year < 57 {
        2000 + two_digit_year
    } else {
        1900 + two_digit_year
    };
    let jan1 = NaiveDate::from_yo_opt(year as i32, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| bad_field(line, 1, 18..20, "epoch year"))?
        .and_utc();
    let micros = ((day - 1.0) * 86_400_000_000.0).round() as i64;

    Ok(jan1 + Duration::microseconds(micros))
}
