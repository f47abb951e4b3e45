//! Frame transforms: ECI (TEME) ↔ ECEF ↔ geodetic (WGS84) ↔ topocentric.
//!
//! The inertial and Earth-fixed frames are related by a rotation about the
//! Z axis through GMST. Geodetic inversion uses the iterative Bowring
//! algorithm; observer-relative azimuth/elevation/range comes from the
//! East-North-Up decomposition of the line-of-sight vector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::earth::{gmst, wrap_two_pi, WGS84_A, WGS84_E2};
use crate::propagator::EciState;

/// Position in the rotating Earth-fixed frame, km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcefPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub time: DateTime<Utc>,
}

/// Geodetic coordinates on the WGS84 ellipsoid.
///
/// Latitude and longitude in radians, altitude in km (may be negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lla {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl Lla {
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, alt_km: f64) -> Self {
        Self {
            lat: lat_deg.to_radians(),
            lon: lon_deg.to_radians(),
            alt: alt_km,
        }
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat.to_degrees()
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon.to_degrees()
    }
}

/// Topocentric look angles from an observer.
///
/// Azimuth in radians from true north, clockwise, in [0, 2π); elevation in
/// radians from the horizon; slant range in km.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aer {
    pub azimuth: f64,
    pub elevation: f64,
    pub range_km: f64,
}

impl Aer {
    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth.to_degrees()
    }

    pub fn elevation_deg(&self) -> f64 {
        self.elevation.to_degrees()
    }
}

/// Fixed ground-station position.
///
/// Latitude and longitude are stored in degrees for ergonomics; altitude is
/// km above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_km: f64,
}

impl Observer {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_km: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_km,
        }
    }

    pub fn to_lla(&self) -> Lla {
        Lla::from_degrees(self.lat_deg, self.lon_deg, self.alt_km)
    }

    /// Earth-fixed coordinates of the station, km.
    pub fn to_ecef(&self) -> [f64; 3] {
        lla_to_ecef(&self.to_lla())
    }

    /// Look angles to a satellite given its inertial state.
    pub fn aer_from_eci(&self, eci: &EciState) -> Aer {
        let sat_ecef = eci_to_ecef(eci);
        ecef_to_aer(&sat_ecef, self.to_ecef(), &self.to_lla())
    }
}

/// Rotates an inertial state into the Earth-fixed frame by GMST(t).
pub fn eci_to_ecef(eci: &EciState) -> EcefPosition {
    let theta = gmst(eci.time);
    let (sin_t, cos_t) = theta.sin_cos();

    EcefPosition {
        x: eci.x * cos_t + eci.y * sin_t,
        y: -eci.x * sin_t + eci.y * cos_t,
        z: eci.z,
        time: eci.time,
    }
}

/// Inverse rotation of [`eci_to_ecef`]. Velocity components are zero: the
/// Earth-fixed position carries none.
pub fn ecef_to_eci(ecef: &EcefPosition) -> EciState {
    let theta = gmst(ecef.time);
    let (sin_t, cos_t) = theta.sin_cos();

    EciState {
        x: ecef.x * cos_t - ecef.y * sin_t,
        y: ecef.x * sin_t + ecef.y * cos_t,
        z: ecef.z,
        vx: 0.0,
        vy: 0.0,
        vz: 0.0,
        time: ecef.time,
    }
}

/// Geodetic to Earth-fixed, km.
pub fn lla_to_ecef(lla: &Lla) -> [f64; 3] {
    let (sin_lat, cos_lat) = lla.lat.sin_cos();
    let (sin_lon, cos_lon) = lla.lon.sin_cos();

    // Radius of curvature in the prime vertical.
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    [
        (n + lla.alt) * cos_lat * cos_lon,
        (n + lla.alt) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + lla.alt) * sin_lat,
    ]
}

/// Earth-fixed to geodetic via the iterative Bowring algorithm.
pub fn ecef_to_lla(ecef: &EcefPosition) -> Lla {
    const MAX_ITERATIONS: usize = 10;
    const TOLERANCE: f64 = 1e-12;

    let (x, y, z) = (ecef.x, ecef.y, ecef.z);

    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();

    // Spherical first guess.
    let mut lat = z.atan2(p * (1.0 - WGS84_E2));

    for _ in 0..MAX_ITERATIONS {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let next = (z + WGS84_E2 * n * sin_lat).atan2(p);

        let done = (next - lat).abs() < TOLERANCE;
        lat = next;
        if done {
            break;
        }
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    let alt = if cos_lat.abs() > 1e-10 {
        p / cos_lat - n
    } else {
        // Degenerate at the poles.
        z.abs() / sin_lat.abs() - n * (1.0 - WGS84_E2)
    };

    Lla { lat, lon, alt }
}

/// Azimuth, elevation, and slant range from an observer to a satellite,
/// both in the Earth-fixed frame.
pub fn ecef_to_aer(sat: &EcefPosition, obs_ecef: [f64; 3], obs_lla: &Lla) -> Aer {
    let dx = sat.x - obs_ecef[0];
    let dy = sat.y - obs_ecef[1];
    let dz = sat.z - obs_ecef[2];

    let range_km = (dx * dx + dy * dy + dz * dz).sqrt();

    let (sin_lat, cos_lat) = obs_lla.lat.sin_cos();
    let (sin_lon, cos_lon) = obs_lla.lon.sin_cos();

    // Line of sight in East-North-Up.
    let east = -sin_lon * dx + cos_lon * dy;
    let north = -sin_lat * cos_lon * dx - sin_lat * sin_lon * dy + cos_lat * dz;
    let up = cos_lat * cos_lon * dx + cos_lat * sin_lon * dy + sin_lat * dz;

    Aer {
        azimuth: wrap_two_pi(east.atan2(north)),
        elevation: (up / range_km).asin(),
        range_km,
    }
}
