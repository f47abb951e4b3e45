//! SGP4 propagation driver.
//!
//! Wraps the `sgp4` kernel crate: a parsed element set is initialized once
//! into kernel constants under the selected gravity model, then queried for
//! TEME-frame position and velocity at arbitrary UTC instants. Propagation
//! is pure; identical timestamps produce identical output.

use std::f64::consts::PI;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::earth::EARTH_MEAN_RADIUS_KM;
use crate::error::{OrbitError, Result};
use crate::tle::Tle;

/// Geopotential model used to initialize the SGP4 kernel.
///
/// WGS72 matches the constants TLEs were historically fitted against;
/// WGS84 is the modern ellipsoid and the default here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GravityModel {
    Wgs72,
    #[default]
    Wgs84,
}

/// Position and velocity in the ECI (TEME) frame.
///
/// Coordinates in km, velocities in km/s, stamped with the instant of
/// computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EciState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub time: DateTime<Utc>,
}

impl EciState {
    /// Distance from the Earth's center, km.
    pub fn magnitude_km(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Approximate altitude over the mean-radius sphere, km.
    pub fn altitude_km(&self) -> f64 {
        self.magnitude_km() - EARTH_MEAN_RADIUS_KM
    }

    /// Scalar speed, km/s.
    pub fn speed_km_s(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy + self.vz * self.vz).sqrt()
    }
}

impl std::fmt::Display for EciState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ECI[{:.3}, {:.3}, {:.3} km] V[{:.6}, {:.6}, {:.6} km/s] @ {}",
            self.x,
            self.y,
            self.z,
            self.vx,
            self.vy,
            self.vz,
            self.time.to_rfc3339()
        )
    }
}

/// SGP4 propagator for one element set.
///
/// Construction initializes the kernel's secular and periodic coefficients
/// once; `propagate` then evaluates the theory at any instant.
pub struct Propagator {
    tle: Tle,
    gravity: GravityModel,
    constants: sgp4::Constants,
}

impl Propagator {
    /// Creates a propagator with the default WGS84 gravity model.
    pub fn new(tle: &Tle) -> Result<Self> {
        Self::with_gravity(tle, GravityModel::default())
    }

    /// Creates a propagator under an explicit gravity model.
    pub fn with_gravity(tle: &Tle, gravity: GravityModel) -> Result<Self> {
        if tle.line1.is_empty() || tle.line2.is_empty() {
            return Err(OrbitError::MissingLines);
        }

        let geopotential = match gravity {
            GravityModel::Wgs72 => sgp4::WGS72,
            GravityModel::Wgs84 => sgp4::WGS84,
        };

        // Kernel elements are built straight from the parsed fields rather
        // than re-reading the text lines, which keeps Alpha-5 catalog
        // numbers propagatable.
        let elements = sgp4::Elements {
            object_name: if tle.name.is_empty() {
                None
            } else {
                Some(tle.name.clone())
            },
            international_designator: if tle.intl_designator.is_empty() {
                None
            } else {
                Some(tle.intl_designator.clone())
            },
            norad_id: tle.norad_id as u64,
            classification: match tle.classification {
                'C' => sgp4::Classification::Classified,
                'S' => sgp4::Classification::Secret,
                _ => sgp4::Classification::Unclassified,
            },
            datetime: tle.epoch.naive_utc(),
            mean_motion_dot: tle.mean_motion_dot,
            mean_motion_ddot: tle.mean_motion_ddot,
            drag_term: tle.bstar,
            element_set_number: tle.element_set_number as u64,
            inclination: tle.inclination_deg,
            right_ascension: tle.raan_deg,
            eccentricity: tle.eccentricity,
            argument_of_perigee: tle.arg_of_perigee_deg,
            mean_anomaly: tle.mean_anomaly_deg,
            mean_motion: tle.mean_motion,
            revolution_number: tle.rev_number as u64,
            ephemeris_type: tle.ephemeris_type,
        };

        let orbit_0 = sgp4::Orbit::from_kozai_elements(
            &geopotential,
            elements.inclination * (PI / 180.0),
            elements.right_ascension * (PI / 180.0),
            elements.eccentricity,
            elements.argument_of_perigee * (PI / 180.0),
            elements.mean_anomaly * (PI / 180.0),
            elements.mean_motion * (PI / 720.0),
        )
        .map_err(|e| OrbitError::KernelInit(format!("{e:?}")))?;

        let constants = sgp4::Constants::new(
            geopotential,
            sgp4::iau_epoch_to_sidereal_time,
            elements.epoch(),
            elements.drag_term,
            orbit_0,
        )
        .map_err(|e| OrbitError::KernelInit(format!("{e:?}")))?;

        Ok(Self {
            tle: tle.clone(),
            gravity,
            constants,
        })
    }

    /// The element set this propagator was built from.
    pub fn tle(&self) -> &Tle {
        &self.tle
    }

    pub fn gravity(&self) -> GravityModel {
        self.gravity
    }

    /// Computes the ECI (TEME) state at `t`.
    ///
    /// A kernel error or a non-finite component is reported as orbital decay
    /// or a pathological element set.
    pub fn propagate(&self, t: DateTime<Utc>) -> Result<EciState> {
        let minutes = (t - self.tle.epoch).num_milliseconds() as f64 / 60_000.0;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| OrbitError::DecayedOrInvalid(format!("{e:?}")))?;

        let [x, y, z] = prediction.position;
        let [vx, vy, vz] = prediction.velocity;
        if ![x, y, z, vx, vy, vz].iter().all(|v| v.is_finite()) {
            return Err(OrbitError::DecayedOrInvalid(
                "state contains a non-finite component".into(),
            ));
        }

        Ok(EciState {
            x,
            y,
            z,
            vx,
            vy,
            vz,
            time: t,
        })
    }

    /// Computes states at `start, start+step, …, ≤ end`.
    ///
    /// `start` and `end` are swapped if reversed. On a per-step failure the
    /// prefix collected so far is returned together with the error.
    pub fn propagate_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> (Vec<EciState>, Option<OrbitError>) {
        if step <= Duration::zero() {
            return (Vec::new(), Some(OrbitError::InvalidStep));
        }

        let (start, end) = if end < start { (end, start) } else { (start, end) };

        let estimated = ((end - start).num_milliseconds() / step.num_milliseconds()) as usize + 1;
        let mut states = Vec::with_capacity(estimated);

        let mut t = start;
        while t <= end {
            match self.propagate(t) {
                Ok(state) => states.push(state),
                Err(err) => return (states, Some(err)),
            }
            t += step;
        }

        (states, None)
    }
}
