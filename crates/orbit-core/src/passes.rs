//! Observer pass prediction.
//!
//! Scans propagated elevation for an observer over a time window, detects
//! horizon crossings, and refines AOS/LOS by bisection. Renderers that need
//! interpolated rise/set instants next to the raw ground-track polyline get
//! them from here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinates::{ecef_to_aer, eci_to_ecef, Lla, Observer};
use crate::error::{OrbitError, Result};
use crate::propagator::Propagator;
use crate::tle::Tle;

/// Elevation threshold commonly used for usable passes, degrees.
pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 5.0;

/// One pass of a satellite over an observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    /// Acquisition of signal: first instant at or above the threshold.
    pub aos: DateTime<Utc>,
    /// Loss of signal: last instant at or above the threshold.
    pub los: DateTime<Utc>,
    /// Peak elevation during the pass, degrees.
    pub max_elevation_deg: f64,
    /// Instant of peak elevation (coarse-sample resolution).
    pub max_elevation_at: DateTime<Utc>,
}

impl Pass {
    pub fn duration(&self) -> Duration {
        self.los - self.aos
    }
}

struct PassBuilder {
    aos: DateTime<Utc>,
    max_elevation_deg: f64,
    max_elevation_at: DateTime<Utc>,
}

impl PassBuilder {
    fn finish(self, los: DateTime<Utc>) -> Pass {
        Pass {
            aos: self.aos,
            los,
            max_elevation_deg: self.max_elevation_deg,
            max_elevation_at: self.max_elevation_at,
        }
    }
}

/// Finds all passes of `tle` over `observer` within `[start, end]` whose
/// elevation reaches `min_elevation_deg`.
///
/// AOS/LOS are refined to about one second; a pass already in progress at
/// `start` (or still in progress at `end`) is clamped to the window edge.
pub fn find_passes(
    tle: &Tle,
    observer: &Observer,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_elevation_deg: f64,
) -> Result<Vec<Pass>> {
    if start == end {
        return Err(OrbitError::InvalidRange);
    }
    let (start, end) = if end < start { (end, start) } else { (start, end) };

    let prop = Propagator::new(tle)?;
    let obs_ecef = observer.to_ecef();
    let obs_lla = observer.to_lla();

    let coarse_step = Duration::seconds(30);
    let mut passes = Vec::new();
    let mut current: Option<PassBuilder> = None;
    let mut prev: Option<(DateTime<Utc>, f64)> = None;

    let mut t = start;
    while t <= end {
        let el = elevation_deg(&prop, obs_ecef, &obs_lla, t)?;

        if el >= min_elevation_deg {
            if current.is_none() {
                let aos = match prev {
                    Some((pt, pe)) if pe < min_elevation_deg => {
                        refine_crossing(&prop, obs_ecef, &obs_lla, min_elevation_deg, pt, t)?
                    }
                    // Already above the horizon at the window edge.
                    _ => t,
                };
                current = Some(PassBuilder {
                    aos,
                    max_elevation_deg: el,
                    max_elevation_at: t,
                });
            } else if let Some(pass) = current.as_mut() {
                if el > pass.max_elevation_deg {
                    pass.max_elevation_deg = el;
                    pass.max_elevation_at = t;
                }
            }
        } else if let Some(pass) = current.take() {
            let (pt, _) = prev.expect("a pass implies a previous sample");
            let los = refine_crossing(&prop, obs_ecef, &obs_lla, min_elevation_deg, t, pt)?;
            passes.push(pass.finish(los));
        }

        prev = Some((t, el));
        t += coarse_step;
    }

    if let Some(pass) = current {
        passes.push(pass.finish(end));
    }

    Ok(passes)
}

fn elevation_deg(
    prop: &Propagator,
    obs_ecef: [f64; 3],
    obs_lla: &Lla,
    t: DateTime<Utc>,
) -> Result<f64> {
    let eci = prop.propagate(t)?;
    let aer = ecef_to_aer(&eci_to_ecef(&eci), obs_ecef, obs_lla);
    Ok(aer.elevation_deg())
}

/// Bisects between an instant below the threshold and one at-or-above it
/// until the bracket shrinks to a second, returning the above side.
fn refine_crossing(
    prop: &Propagator,
    obs_ecef: [f64; 3],
    obs_lla: &Lla,
    min_elevation_deg: f64,
    mut below: DateTime<Utc>,
    mut above: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    for _ in 0..24 {
        if (above - below).num_seconds().abs() <= 1 {
            break;
        }
        let mid = below + (above - below) / 2;
        if elevation_deg(prop, obs_ecef, obs_lla, mid)? >= min_elevation_deg {
            above = mid;
        } else {
            below = mid;
        }
    }
    Ok(above)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::iss_tle;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn moscow() -> Observer {
        Observer::new(55.7558, 37.6173, 0.156)
    }

    #[test]
    fn iss_passes_over_moscow() {
        let tle = iss_tle();
        let start = epoch();
        let end = start + Duration::hours(24);

        let passes = find_passes(&tle, &moscow(), start, end, DEFAULT_MIN_ELEVATION_DEG).unwrap();
        assert!(!passes.is_empty(), "expected at least one pass in 24 h");

        for pass in &passes {
            assert!(pass.aos >= start && pass.los <= end);
            assert!(pass.aos < pass.los);
            assert!(pass.max_elevation_deg >= DEFAULT_MIN_ELEVATION_DEG);
            assert!(pass.max_elevation_at >= pass.aos && pass.max_elevation_at <= pass.los);
            // An ISS pass lasts minutes, not hours.
            assert!(pass.duration() <= Duration::minutes(15), "{:?}", pass);
        }

        // Passes are disjoint and ordered.
        for pair in passes.windows(2) {
            assert!(pair[0].los < pair[1].aos);
        }
    }

    #[test]
    fn raising_threshold_prunes_passes() {
        let tle = iss_tle();
        let start = epoch();
        let end = start + Duration::hours(24);
        let obs = moscow();

        let low = find_passes(&tle, &obs, start, end, 5.0).unwrap();
        let high = find_passes(&tle, &obs, start, end, 60.0).unwrap();
        assert!(high.len() <= low.len());
    }

    #[test]
    fn pass_in_progress_clamps_to_window() {
        let tle = iss_tle();
        let start = epoch();
        let end = start + Duration::hours(24);
        let obs = moscow();

        let passes = find_passes(&tle, &obs, start, end, DEFAULT_MIN_ELEVATION_DEG).unwrap();
        let Some(first) = passes.first() else {
            panic!("need a pass to probe");
        };

        // Start the window in the middle of a known pass.
        let mid = first.aos + (first.los - first.aos) / 2;
        let clamped = find_passes(&tle, &obs, mid, end, DEFAULT_MIN_ELEVATION_DEG).unwrap();
        assert!(!clamped.is_empty());
        assert_eq!(clamped[0].aos, mid);
    }

    #[test]
    fn reversed_window_is_swapped() {
        let tle = iss_tle();
        let start = epoch();
        let end = start + Duration::hours(12);
        let obs = moscow();

        let a = find_passes(&tle, &obs, start, end, 5.0).unwrap();
        let b = find_passes(&tle, &obs, end, start, 5.0).unwrap();
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn empty_window_is_rejected() {
        let err = find_passes(&iss_tle(), &moscow(), epoch(), epoch(), 5.0).unwrap_err();
        assert!(matches!(err, OrbitError::InvalidRange));
    }
}
