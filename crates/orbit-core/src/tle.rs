//! Two-Line Element (TLE) parsing and validation.
//!
//! Fixed-column text format per the NORAD/CelesTrak specification:
//! <https://celestrak.org/NORAD/documentation/tle-fmt.php>
//!
//! Supports the 2-line layout (line 1 + line 2), the 3-line layout (name
//! line first), concatenated batches of either, Alpha-5 extended catalog
//! numbers, and the format's Modulo-10 checksums.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::earth::{EARTH_MU, WGS84_A};
use crate::error::{OrbitError, Result};

/// Length of a TLE line, checksum included.
pub const TLE_LINE_LEN: usize = 69;

/// One parsed element set. Immutable after parsing.
///
/// Angles are kept in degrees and mean motion in revolutions/day, exactly as
/// encoded in the element set; the propagator converts to canonical units.
/// The original text lines are retained verbatim for serialization and
/// caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tle {
    /// Satellite name from line 0, empty for the 2-line layout.
    pub name: String,
    /// NORAD catalog number; Alpha-5 values exceed 99 999.
    pub norad_id: u32,
    /// Classification: 'U' unclassified, 'C' classified, 'S' secret.
    pub classification: char,
    /// International designator (COSPAR ID), e.g. "98067A".
    pub intl_designator: String,
    /// Element-set epoch, UTC.
    pub epoch: DateTime<Utc>,
    /// First derivative of mean motion, rev/day².
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion, rev/day³.
    pub mean_motion_ddot: f64,
    /// B* ballistic drag term, 1/Earth radii.
    pub bstar: f64,
    /// Ephemeris type, normally 0.
    pub ephemeris_type: u8,
    /// Element-set number.
    pub element_set_number: u16,
    /// Orbital inclination, degrees.
    pub inclination_deg: f64,
    /// Right ascension of the ascending node, degrees.
    pub raan_deg: f64,
    /// Eccentricity, dimensionless in [0, 1).
    pub eccentricity: f64,
    /// Argument of perigee, degrees.
    pub arg_of_perigee_deg: f64,
    /// Mean anomaly, degrees.
    pub mean_anomaly_deg: f64,
    /// Mean motion, revolutions/day.
    pub mean_motion: f64,
    /// Revolution number at epoch.
    pub rev_number: u32,
    /// Original line 1, verbatim.
    pub line1: String,
    /// Original line 2, verbatim.
    pub line2: String,
}

impl Tle {
    /// Parses a TLE from 2 (line 1 + line 2) or 3 (name first) text lines.
    pub fn parse(lines: &[&str]) -> Result<Tle> {
        if lines.len() < 2 {
            return Err(OrbitError::InvalidFormat(format!(
                "need at least 2 lines, got {}",
                lines.len()
            )));
        }

        let first = lines[0].trim();
        if first.is_empty() {
            return Err(OrbitError::InvalidFormat("first line is empty".into()));
        }

        match first.as_bytes()[0] {
            b'1' => parse_lines("", first, lines[1].trim()),
            b'2' => Err(OrbitError::InvalidFormat(
                "expected line 1, got line 2".into(),
            )),
            _ => {
                if lines.len() < 3 {
                    return Err(OrbitError::InvalidFormat(format!(
                        "3-line layout requires 3 lines, got {}",
                        lines.len()
                    )));
                }
                parse_lines(first, lines[1].trim(), lines[2].trim())
            }
        }
    }

    /// Parses a blob of concatenated records. Fails on the first bad record.
    ///
    /// Records are separated by blank lines or recognized implicitly: two
    /// accumulated lines starting with `1` and `2`, or three lines whose
    /// first is a name line.
    pub fn parse_batch(data: &str) -> Result<Vec<Tle>> {
        let mut tles = Vec::new();
        for chunk in record_chunks(data) {
            tles.push(Tle::parse(&chunk)?);
        }
        Ok(tles)
    }

    /// Parses a blob of concatenated records, skipping bad ones.
    ///
    /// Returns the records that parsed together with the per-record errors,
    /// so callers can log and move on instead of failing a whole bundle.
    pub fn parse_batch_lossy(data: &str) -> (Vec<Tle>, Vec<OrbitError>) {
        let mut tles = Vec::new();
        let mut errors = Vec::new();
        for chunk in record_chunks(data) {
            match Tle::parse(&chunk) {
                Ok(tle) => tles.push(tle),
                Err(err) => errors.push(err),
            }
        }
        (tles, errors)
    }

    /// Orbital period in minutes (1440 / mean motion).
    pub fn orbital_period_min(&self) -> f64 {
        if self.mean_motion == 0.0 {
            return 0.0;
        }
        1440.0 / self.mean_motion
    }

    /// Semi-major axis in km, from a = (μ/n²)^(1/3).
    pub fn semi_major_axis_km(&self) -> f64 {
        let n = self.mean_motion * 2.0 * std::f64::consts::PI / 86_400.0;
        if n == 0.0 {
            return 0.0;
        }
        (EARTH_MU / (n * n)).powf(1.0 / 3.0)
    }

    /// Apogee altitude above the Earth's equatorial radius, km.
    pub fn apogee_km(&self) -> f64 {
        self.semi_major_axis_km() * (1.0 + self.eccentricity) - WGS84_A
    }

    /// Perigee altitude above the Earth's equatorial radius, km.
    pub fn perigee_km(&self) -> f64 {
        self.semi_major_axis_km() * (1.0 - self.eccentricity) - WGS84_A
    }

    /// Time elapsed since the element-set epoch.
    pub fn age(&self) -> Duration {
        Utc::now() - self.epoch
    }

    /// True if the element set is older than `max_age_days`.
    pub fn is_stale(&self, max_age_days: f64) -> bool {
        let age_days = self.age().num_milliseconds() as f64 / 86_400_000.0;
        age_days > max_age_days
    }

    /// True for geostationary satellites: mean motion within 0.1 rev/day of 1.
    pub fn is_geostationary(&self) -> bool {
        (self.mean_motion - 1.0).abs() < 0.1
    }
}

impl std::fmt::Display for Tle {
    /// Renders the record in 3-line (or nameless 2-line) text form.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}\n{}", self.line1, self.line2)
        } else {
            write!(f, "{}\n{}\n{}", self.name, self.line1, self.line2)
        }
    }
}

/// Modulo-10 checksum: digits count as their value, a minus sign as 1,
/// every other character as 0.
pub fn checksum(line: &str) -> u32 {
    line.bytes()
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

/// Validates the checksum in column 69 against the first 68 characters.
pub fn validate_checksum(line: &str) -> bool {
    if line.len() < TLE_LINE_LEN || !line.is_ascii() {
        return false;
    }
    let expected = line.as_bytes()[TLE_LINE_LEN - 1];
    expected.is_ascii_digit() && checksum(&line[..TLE_LINE_LEN - 1]) == (expected - b'0') as u32
}

/// Splits a text blob into per-record line groups.
fn record_chunks(data: &str) -> Vec<Vec<&str>> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for raw in data.lines() {
        let line = raw.trim();

        // Blank line flushes a pending record.
        if line.is_empty() {
            if current.len() >= 2 {
                chunks.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(line);

        let complete = match current.len() {
            2 => current[0].starts_with('1') && current[1].starts_with('2'),
            3 => !current[0].starts_with('1') && !current[0].starts_with('2'),
            _ => false,
        };
        if complete {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if current.len() >= 2 {
        chunks.push(current);
    }
    chunks
}

fn parse_lines(name: &str, line1: &str, line2: &str) -> Result<Tle> {
    for (idx, line) in [(1u8, line1), (2u8, line2)] {
        if !line.is_ascii() {
            return Err(OrbitError::InvalidFormat(format!(
                "line {idx} contains non-ASCII characters"
            )));
        }
        if line.len() < TLE_LINE_LEN {
            return Err(OrbitError::LineTooShort {
                line: idx,
                length: line.len(),
                expected: TLE_LINE_LEN,
            });
        }
    }

    let expect_start = |idx: u8, line: &str, expected: char| -> Result<()> {
        let found = line.as_bytes()[0] as char;
        if found != expected {
            return Err(OrbitError::InvalidLineNumber {
                line: idx,
                found,
                expected,
            });
        }
        Ok(())
    };
    expect_start(1, line1, '1')?;
    expect_start(2, line2, '2')?;

    if !validate_checksum(line1) {
        return Err(OrbitError::InvalidChecksum { line: 1 });
    }
    if !validate_checksum(line2) {
        return Err(OrbitError::InvalidChecksum { line: 2 });
    }

    // Line 1 columns:
    //   3-7   catalog number (Alpha-5 capable)
    //   8     classification
    //   10-17 international designator
    //   19-32 epoch (YYDDD.DDDDDDDD)
    //   34-43 first derivative of mean motion
    //   45-52 second derivative of mean motion (TLE exponent notation)
    //   54-61 B* drag term (TLE exponent notation)
    //   63    ephemeris type
    //   65-68 element set number
    let norad_id = parse_catalog_number(line1[2..7].trim())?;
    let classification = line1.as_bytes()[7] as char;
    let intl_designator = line1[9..17].trim().to_string();
    let epoch = parse_epoch(line1[18..32].trim())?;
    let mean_motion_dot = parse_f64("mean motion dot", &line1[33..43])?;
    let mean_motion_ddot = parse_tle_exponent(&line1[44..52]);
    let bstar = parse_tle_exponent(&line1[53..61]);
    let ephemeris_type = line1[62..63].trim().parse().unwrap_or(0);
    let element_set_number = line1[64..68].trim().parse().unwrap_or(0);

    // Line 2 columns:
    //   3-7   catalog number
    //   9-16  inclination (deg)
    //   18-25 RAAN (deg)
    //   27-33 eccentricity (implied leading "0.")
    //   35-42 argument of perigee (deg)
    //   44-51 mean anomaly (deg)
    //   53-63 mean motion (rev/day)
    //   64-68 revolution number at epoch
    let norad_id2 = parse_catalog_number(line2[2..7].trim())?;
    if norad_id != norad_id2 {
        return Err(OrbitError::CatalogNumberMismatch {
            line1: norad_id,
            line2: norad_id2,
        });
    }

    let inclination_deg = parse_f64("inclination", &line2[8..16])?;
    let raan_deg = parse_f64("RAAN", &line2[17..25])?;
    let eccentricity = parse_implied_decimal("eccentricity", &line2[26..33])?;
    let arg_of_perigee_deg = parse_f64("argument of perigee", &line2[34..42])?;
    let mean_anomaly_deg = parse_f64("mean anomaly", &line2[43..51])?;
    let mean_motion = parse_f64("mean motion", &line2[52..63])?;
    let rev_number = line2[63..68].trim().parse().unwrap_or(0);

    Ok(Tle {
        name: name.to_string(),
        norad_id,
        classification,
        intl_designator,
        epoch,
        mean_motion_dot,
        mean_motion_ddot,
        bstar,
        ephemeris_type,
        element_set_number,
        inclination_deg,
        raan_deg,
        eccentricity,
        arg_of_perigee_deg,
        mean_anomaly_deg,
        mean_motion,
        rev_number,
        line1: line1.to_string(),
        line2: line2.to_string(),
    })
}

/// Parses a 5-column catalog number, Alpha-5 included.
///
/// Standard form is a base-10 integer. In Alpha-5 the first column is a
/// letter (I and O excluded) mapping A=10 … Z=33; the catalog number is
/// `letter_value * 10_000 + low4`, so A0000 = 100 000 and Z9999 = 339 999.
pub fn parse_catalog_number(s: &str) -> Result<u32> {
    if s.is_empty() {
        return Err(OrbitError::InvalidAlpha5("empty".into()));
    }

    let first = s.as_bytes()[0];
    if first.is_ascii_uppercase() {
        let prefix = alpha5_prefix(first)
            .ok_or_else(|| OrbitError::InvalidAlpha5(format!("letter {} not allowed", first as char)))?;

        if s.len() < 5 {
            return Err(OrbitError::InvalidAlpha5(s.to_string()));
        }
        let low: u32 = s[1..5]
            .parse()
            .map_err(|_| OrbitError::InvalidAlpha5(s.to_string()))?;

        return Ok(prefix * 10_000 + low);
    }

    s.parse().map_err(|_| OrbitError::InvalidField {
        field: "catalog number",
        value: s.to_string(),
    })
}

/// Alpha-5 letter value: A=10 … H=17, J=18 … N=22, P=23 … Z=33.
fn alpha5_prefix(c: u8) -> Option<u32> {
    match c {
        b'A'..=b'H' => Some((c - b'A') as u32 + 10),
        b'J'..=b'N' => Some((c - b'J') as u32 + 18),
        b'P'..=b'Z' => Some((c - b'P') as u32 + 23),
        _ => None,
    }
}

/// Parses the TLE exponent notation `[±]NNNNN±E`, meaning ±0.NNNNN × 10^±E.
pub fn parse_tle_exponent(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() || s == "00000-0" || s == "00000+0" {
        return 0.0;
    }

    let (sign, rest) = match s.as_bytes()[0] {
        b'-' => (-1.0, &s[1..]),
        b'+' => (1.0, &s[1..]),
        _ => (1.0, s),
    };

    // The exponent sign is the last '+' or '-' in the field.
    let exp_pos = rest.rfind(['+', '-']);

    match exp_pos {
        None => sign * implied_decimal(rest),
        Some(pos) => {
            let mantissa = implied_decimal(&rest[..pos]);
            let exp: i32 = rest[pos..].parse().unwrap_or(0);
            sign * mantissa * 10f64.powi(exp)
        }
    }
}

/// Interprets a digit string with an implied leading "0.".
fn implied_decimal(digits: &str) -> f64 {
    format!("0.{digits}").parse().unwrap_or(0.0)
}

fn parse_implied_decimal(field: &'static str, s: &str) -> Result<f64> {
    let digits = s.trim();
    format!("0.{digits}")
        .parse()
        .map_err(|_| OrbitError::InvalidField {
            field,
            value: digits.to_string(),
        })
}

fn parse_f64(field: &'static str, s: &str) -> Result<f64> {
    let t = s.trim();
    t.parse().map_err(|_| OrbitError::InvalidField {
        field,
        value: t.to_string(),
    })
}

/// Decodes the epoch field `YYDDD.DDDDDDDD`.
///
/// Years 57-99 map to 1957-1999, 00-56 to 2000-2056. Day-of-year 1.0 is the
/// start of January 1, so the instant is Jan 1 UTC + (day - 1) days.
fn parse_epoch(s: &str) -> Result<DateTime<Utc>> {
    let invalid = || OrbitError::InvalidField {
        field: "epoch",
        value: s.to_string(),
    };

    if s.len() < 7 {
        return Err(invalid());
    }

    let yy: i32 = s[..2].parse().map_err(|_| invalid())?;
    let year = if yy >= 57 { 1900 + yy } else { 2000 + yy };

    let day_of_year: f64 = s[2..].parse().map_err(|_| invalid())?;

    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)?
        .and_utc();

    let micros = ((day_of_year - 1.0) * 86_400_000_000.0).round() as i64;
    Ok(jan1 + Duration::microseconds(micros))
}
