//! Shared fixtures for unit tests.

use crate::tle::{checksum, Tle};

/// ISS (ZARYA) reference lines, checksum column omitted.
pub(crate) const ISS_LINE1_68: &str =
    "1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  999";
pub(crate) const ISS_LINE2_68: &str =
    "2 25544  51.6400 247.4627 0006703 130.5360 325.0288 15.4981557142340";

/// Sun-synchronous polar orbiter (METEOR-M2 shaped).
pub(crate) const POLAR_LINE1_68: &str =
    "1 40069U 14037A   24001.50000000  .00000123  00000-0  12345-4 0  999";
pub(crate) const POLAR_LINE2_68: &str =
    "2 40069  98.5200  45.6789 0001234 123.4567 236.7890 14.2098765432109";

/// Geostationary element set (mean motion ~1 rev/day).
pub(crate) const GEO_LINE1_68: &str =
    "1 19548U 88091B   24001.50000000  .00000100  00000-0  00000-0 0  999";
pub(crate) const GEO_LINE2_68: &str =
    "2 19548   0.0500  95.0000 0002000 150.0000  95.0000  1.0027000010000";

/// Appends the Modulo-10 checksum to a 68-character line body.
pub(crate) fn make_line(line68: &str) -> String {
    assert_eq!(line68.len(), 68, "TLE line body must be 68 chars");
    format!("{line68}{}", checksum(line68))
}

pub(crate) fn tle_from(name: &str, line1_68: &str, line2_68: &str) -> Tle {
    let l1 = make_line(line1_68);
    let l2 = make_line(line2_68);
    if name.is_empty() {
        Tle::parse(&[l1.as_str(), l2.as_str()]).unwrap()
    } else {
        Tle::parse(&[name, l1.as_str(), l2.as_str()]).unwrap()
    }
}

pub(crate) fn iss_tle() -> Tle {
    tle_from("ISS (ZARYA)", ISS_LINE1_68, ISS_LINE2_68)
}
