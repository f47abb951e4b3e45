//! Named satellite groups served by the upstream catalog.

/// Groups the upstream catalog serves under `GROUP=<name>`.
///
/// Constellations, agencies, and mission classes; `tle-new` is the rolling
/// recent-launches bundle.
pub const AVAILABLE_GROUPS: &[&str] = &[
    "stations",
    "weather",
    "noaa",
    "goes",
    "amateur",
    "cubesat",
    "starlink",
    "oneweb",
    "gps-ops",
    "glo-ops",
    "galileo",
    "beidou",
    "sbas",
    "science",
    "geo",
    "iridium",
    "iridium-NEXT",
    "globalstar",
    "orbcomm",
    "active",
    "analyst",
    "military",
    "radar",
    "argos",
    "planet",
    "spire",
    "resource",
    "sarsat",
    "dmc",
    "tdrss",
    "education",
    "geodetic",
    "engineering",
    "tle-new",
];

/// True if `name` is a known group (case-insensitive).
pub fn is_valid_group(name: &str) -> bool {
    AVAILABLE_GROUPS
        .iter()
        .any(|g| g.eq_ignore_ascii_case(name))
}
