//! Satellite-tracking core.
//!
//! TLE parsing and validation, SGP4 propagation, frame transforms
//! (ECI/ECEF/geodetic/topocentric), ground-track generation, and observer
//! pass prediction.
//!
//! # Usage
//!
//! ```rust,ignore
//! let tle = Tle::parse(&[name, line1, line2])?;
//! let prop = Propagator::new(&tle)?;
//! let eci = prop.propagate(Utc::now())?;
//! let aer = Observer::new(55.7558, 37.6173, 0.156).aer_from_eci(&eci);
//! ```

pub mod coordinates;
pub mod earth;
pub mod error;
pub mod ground_track;
pub mod passes;
pub mod propagator;
pub mod tle;

#[cfg(test)]
mod testutil;

pub use coordinates::{Aer, EcefPosition, Lla, Observer};
pub use error::{OrbitError, Result};
pub use ground_track::{
    generate_default_ground_track, generate_ground_track, GroundTrack, TrackPoint,
};
pub use passes::{find_passes, Pass, DEFAULT_MIN_ELEVATION_DEG};
pub use propagator::{EciState, GravityModel, Propagator};
pub use tle::Tle;
