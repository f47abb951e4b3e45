//! Ground-track generation.
//!
//! Samples a propagator over a time interval, projects each state to
//! geodetic coordinates, splits the polyline where it crosses the ±180°
//! antimeridian, and partitions the segments into past and future around a
//! reference instant. The output serializes directly to the JSON contract
//! consumed by map renderers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coordinates::{ecef_to_lla, eci_to_ecef};
use crate::error::{OrbitError, Result};
use crate::propagator::Propagator;
use crate::tle::Tle;

/// Longitude jump (degrees) between consecutive samples that marks an
/// antimeridian crossing. A LEO sample step moves a few degrees at most.
const ANTIMERIDIAN_THRESHOLD_DEG: f64 = 270.0;

/// Default sampling step for auto-ranged tracks.
const DEFAULT_STEP_SECS: i64 = 30;

/// One sub-satellite point, ready for JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Longitude, degrees in [-180, +180].
    pub lon: f64,
    /// Latitude, degrees in [-90, +90].
    pub lat: f64,
    /// Unix timestamp, milliseconds.
    pub ts: i64,
}

/// A full ground track split into traversed and upcoming segments.
///
/// Each segment is an unbroken polyline that never crosses the
/// antimeridian.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundTrack {
    pub past: Vec<Vec<TrackPoint>>,
    pub future: Vec<Vec<TrackPoint>>,
    pub norad_id: u32,
}

impl GroundTrack {
    /// All points of all segments, past then future, as a flat list.
    pub fn points(&self) -> Vec<TrackPoint> {
        self.past
            .iter()
            .chain(self.future.iter())
            .flatten()
            .copied()
            .collect()
    }

    pub fn total_points(&self) -> usize {
        self.past.iter().map(Vec::len).sum::<usize>()
            + self.future.iter().map(Vec::len).sum::<usize>()
    }
}

/// Generates the ground track of `tle` over `[start, end]`.
///
/// `now` decides the past/future partition; `step` is the sampling
/// interval. Reversed bounds are swapped silently; an empty interval or a
/// non-positive step is an error.
pub fn generate_ground_track(
    tle: &Tle,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    step: Duration,
) -> Result<GroundTrack> {
    if step <= Duration::zero() {
        return Err(OrbitError::InvalidStep);
    }
    if start == end {
        return Err(OrbitError::InvalidRange);
    }
    let (start, end) = if end < start { (end, start) } else { (start, end) };

    let prop = Propagator::new(tle)?;
    let points = sample_track_points(&prop, start, end, step)?;

    if points.is_empty() {
        return Ok(GroundTrack {
            norad_id: tle.norad_id,
            ..Default::default()
        });
    }

    let segments = split_at_antimeridian(points);
    let (past, future) = split_past_future(segments, now.timestamp_millis());

    Ok(GroundTrack {
        past,
        future,
        norad_id: tle.norad_id,
    })
}

/// Auto-ranged track: one orbital period back, three forward, 30 s step.
pub fn generate_default_ground_track(tle: &Tle, now: DateTime<Utc>) -> Result<GroundTrack> {
    let period_min = tle.orbital_period_min();
    if period_min <= 0.0 {
        return Err(OrbitError::InvalidRange);
    }

    let period = Duration::milliseconds((period_min * 60_000.0) as i64);
    let start = now - period;
    let end = now + period * 3;

    generate_ground_track(tle, start, end, now, Duration::seconds(DEFAULT_STEP_SECS))
}

/// Samples sub-satellite points over the interval.
///
/// If propagation fails mid-interval (orbital decay and the like) the track
/// is truncated at the last good sample; a failure on the very first sample
/// is an error.
fn sample_track_points(
    prop: &Propagator,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
) -> Result<Vec<TrackPoint>> {
    let estimated = ((end - start).num_milliseconds() / step.num_milliseconds()) as usize + 1;
    let mut points = Vec::with_capacity(estimated);

    let mut t = start;
    while t <= end {
        let eci = match prop.propagate(t) {
            Ok(state) => state,
            Err(err) => {
                if points.is_empty() {
                    return Err(err);
                }
                warn!(
                    norad_id = prop.tle().norad_id,
                    at = %t,
                    error = %err,
                    "truncating ground track on propagation failure"
                );
                return Ok(points);
            }
        };

        let lla = ecef_to_lla(&eci_to_ecef(&eci));
        points.push(TrackPoint {
            lon: lla.lon_deg(),
            lat: lla.lat_deg(),
            ts: t.timestamp_millis(),
        });

        t += step;
    }

    Ok(points)
}

/// Splits a point list into segments at each antimeridian crossing,
/// inserting interpolated boundary points on both sides of ±180°.
fn split_at_antimeridian(points: Vec<TrackPoint>) -> Vec<Vec<TrackPoint>> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = vec![points[0]];

    for pair in points.windows(2) {
        let (prev, next) = (pair[0], pair[1]);

        if (next.lon - prev.lon).abs() > ANTIMERIDIAN_THRESHOLD_DEG {
            let (outgoing, incoming) = interpolate_antimeridian(prev, next);

            current.push(outgoing);
            segments.push(std::mem::take(&mut current));
            current = vec![incoming, next];
        } else {
            current.push(next);
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Computes the two boundary points where the segment between `p1` and `p2`
/// meets the antimeridian.
///
/// The outgoing point sits on `p1`'s side (+180 or -180), the incoming one
/// on the opposite side; latitude and timestamp are linearly interpolated
/// against the unwrapped longitude.
fn interpolate_antimeridian(p1: TrackPoint, p2: TrackPoint) -> (TrackPoint, TrackPoint) {
    let crossing_east = p1.lon > 0.0;

    let (boundary_out, boundary_in) = if crossing_east {
        (180.0, -180.0)
    } else {
        (-180.0, 180.0)
    };

    // Unwrap the far side so the longitude axis is continuous across the
    // boundary, then solve for the crossing parameter.
    let p2_unwrapped = if crossing_east {
        p2.lon + 360.0
    } else {
        p2.lon - 360.0
    };

    let d_lon = p2_unwrapped - p1.lon;
    let t = if d_lon.abs() > 1e-10 {
        ((boundary_out - p1.lon) / d_lon).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let lat = p1.lat + (p2.lat - p1.lat) * t;
    let ts = p1.ts + ((p2.ts - p1.ts) as f64 * t) as i64;

    (
        TrackPoint {
            lon: boundary_out,
            lat,
            ts,
        },
        TrackPoint {
            lon: boundary_in,
            lat,
            ts,
        },
    )
}

/// Partitions segments around `now_ms`: a segment entirely before it goes
/// to past, entirely at-or-after to future, and a straddling segment is cut
/// at the first point whose timestamp reaches `now_ms`.
fn split_past_future(
    segments: Vec<Vec<TrackPoint>>,
    now_ms: i64,
) -> (Vec<Vec<TrackPoint>>, Vec<Vec<TrackPoint>>) {
    let mut past = Vec::new();
    let mut future = Vec::new();

    for seg in segments {
        let (Some(first), Some(last)) = (seg.first(), seg.last()) else {
            continue;
        };

        if last.ts < now_ms {
            past.push(seg);
            continue;
        }
        if first.ts >= now_ms {
            future.push(seg);
            continue;
        }

        match seg.iter().position(|p| p.ts >= now_ms) {
            None | Some(0) => future.push(seg),
            Some(idx) => {
                past.push(seg[..idx].to_vec());
                future.push(seg[idx..].to_vec());
            }
        }
    }

    (past, future)
}
