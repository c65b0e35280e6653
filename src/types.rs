//! Physical constants for the voyage physics engine.
//!
//! Working units are kilometres, seconds and kilograms: state vectors hold
//! km and km/s, gravitational parameters km³/s².

use crate::units::GravParam;

/// Speed of light in km/s (exact, SI definition)
pub const C_KM_S: f64 = 299_792.458;

/// Astronomical unit in kilometres
pub const AU_KM: f64 = 149_597_870.7;

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees conversion factor
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// Seconds per day
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Days per Julian century (secular rates in the ephemeris are per century)
pub const JULIAN_CENTURY_DAYS: f64 = 36525.0;

/// Julian Date of the J2000.0 epoch (2000-01-01 12:00 TT)
pub const J2000_JD: f64 = 2_451_545.0;

/// J2000.0 epoch as Unix timestamp (January 1, 2000, 12:00 TT)
/// Note: This is approximate; TT differs from UTC by leap seconds
pub const J2000_UNIX: i64 = 946728000;

/// Standard gravity (m/s²) for Isp calculations
pub const G0_M_S2: f64 = 9.80665;

/// Gravitational parameters μ = GM in km³/s².
pub mod mu {
    use super::GravParam;

    /// Sun (IAU 2015 nominal)
    pub const SUN: GravParam = GravParam::from_km3_s2(1.327_124_400_41e11);
    pub const MERCURY: GravParam = GravParam::from_km3_s2(2.203_2e4);
    pub const VENUS: GravParam = GravParam::from_km3_s2(3.248_59e5);
    /// Earth (WGS-84 / EGM2008)
    pub const EARTH: GravParam = GravParam::from_km3_s2(3.986_004_418e5);
    pub const MARS: GravParam = GravParam::from_km3_s2(4.282_837_14e4);
    pub const JUPITER: GravParam = GravParam::from_km3_s2(1.266_865_349e8);
    pub const SATURN: GravParam = GravParam::from_km3_s2(3.793_120_749e7);
    pub const URANUS: GravParam = GravParam::from_km3_s2(5.793_939e6);
    pub const NEPTUNE: GravParam = GravParam::from_km3_s2(6.836_529e6);
}

/// Reference radii in km.
pub mod radius {
    /// Earth equatorial radius
    pub const EARTH: f64 = 6_378.137;
    /// Circular low Earth orbit used by validation cases (200 km altitude)
    pub const LEO: f64 = 6_578.0;
    /// Geostationary orbit radius
    pub const GEO: f64 = 42_164.0;
}
