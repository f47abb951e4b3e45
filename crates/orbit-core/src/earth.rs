//! Earth model constants and sidereal time.
//!
//! WGS84 ellipsoid parameters plus the Julian date / Greenwich Mean Sidereal
//! Time routines that relate the inertial (TEME) and Earth-fixed frames.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

/// WGS84 equatorial radius (semi-major axis), km.
pub const WGS84_A: f64 = 6378.137;

/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257223563;

/// WGS84 polar radius (semi-minor axis), km.
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = 2.0 * WGS84_F - WGS84_F * WGS84_F;

/// Earth rotation rate, rad/s.
pub const EARTH_ROTATION_RATE: f64 = 7.292115e-5;

/// Mean Earth radius (spherical model), km.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0;

/// Earth gravitational parameter, km³/s².
pub const EARTH_MU: f64 = 398_600.4418;

const TWO_PI: f64 = 2.0 * PI;

/// Julian date for a UTC instant (Vallado's algorithm, valid 1900-2100).
pub fn julian_date(t: DateTime<Utc>) -> f64 {
    let year = t.year() as f64;
    let month = t.month() as f64;
    let day = t.day() as f64;
    let second = t.second() as f64 + t.nanosecond() as f64 * 1e-9;

    let jd = 367.0 * year - ((7.0 * (year + ((month + 9.0) / 12.0).floor())) * 0.25).floor()
        + (275.0 * month / 9.0).floor()
        + day
        + 1_721_013.5;

    jd + ((second / 60.0 + t.minute() as f64) / 60.0 + t.hour() as f64) / 24.0
}

/// Greenwich Mean Sidereal Time in radians, reduced to [0, 2π).
///
/// Standard polynomial of the Julian century since J2000.0.
pub fn gmst(t: DateTime<Utc>) -> f64 {
    gmst_from_julian(julian_date(t))
}

/// GMST in radians for a UT1 Julian date.
pub fn gmst_from_julian(jd_ut1: f64) -> f64 {
    let tut1 = (jd_ut1 - 2_451_545.0) / 36_525.0;

    // Seconds of sidereal time.
    let secs = -6.2e-6 * tut1 * tut1 * tut1
        + 0.093_104 * tut1 * tut1
        + (876_600.0 * 3600.0 + 8_640_184.812_866) * tut1
        + 67_310.548_41;

    // 86400 sidereal seconds per revolution: seconds -> degrees is /240.
    let mut theta = (secs * (PI / 180.0) / 240.0) % TWO_PI;
    if theta < 0.0 {
        theta += TWO_PI;
    }
    theta
}

/// Wrap an angle in radians to [0, 2π).
pub(crate) fn wrap_two_pi(angle: f64) -> f64 {
    let mut a = angle % TWO_PI;
    if a < 0.0 {
        a += TWO_PI;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wgs84_derived_constants() {
        assert!((WGS84_B - 6356.752_314_245).abs() < 1e-6);
        assert!((WGS84_E2 - 0.006_694_379_990_14).abs() < 1e-12);
    }

    #[test]
    fn julian_date_j2000() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((julian_date(t) - 2_451_545.0).abs() < 1e-6);
    }

    #[test]
    fn julian_date_2024() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!((julian_date(t) - 2_460_310.5).abs() < 1e-6);
    }

    #[test]
    fn gmst_at_j2000() {
        // GMST at J2000.0 is about 18.697374558 sidereal hours.
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let theta = gmst(t);
        let hours = theta * 12.0 / PI;
        assert!((hours - 18.697_374_558).abs() < 1e-3, "got {hours} h");
    }

    #[test]
    fn gmst_in_range() {
        for day in 1..=28 {
            let t = Utc.with_ymd_and_hms(2024, 3, day, 6, 30, 15).unwrap();
            let theta = gmst(t);
            assert!((0.0..TWO_PI).contains(&theta));
        }
    }

    #[test]
    fn gmst_advances_with_earth_rotation() {
        // One sidereal day is ~23h56m04s: over 1h the angle advances ~15.04 deg.
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap();
        let delta = wrap_two_pi(gmst(t1) - gmst(t0)).to_degrees();
        assert!((delta - 15.041).abs() < 0.01, "got {delta} deg");
    }
}
