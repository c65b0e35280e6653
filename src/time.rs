//! Epochs measured in seconds since J2000.0.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::types::{J2000_JD, J2000_UNIX, JULIAN_CENTURY_DAYS, SECONDS_PER_DAY};
use crate::units::{Time, second, seconds};

/// Instant on the J2000 time scale.
///
/// Stored as seconds since 2000-01-01 12:00 TT. The TT−UTC offset (about a
/// minute) is ignored when converting from calendar dates; it is far below
/// the accuracy of the ephemeris model.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(f64);

impl Epoch {
    /// The J2000.0 reference epoch.
    pub const J2000: Epoch = Epoch(0.0);

    /// Create from seconds since J2000.
    pub const fn from_j2000_seconds(seconds: f64) -> Self {
        Self(seconds)
    }

    /// Create from a Julian Date.
    pub fn from_julian_date(jd: f64) -> Self {
        Self((jd - J2000_JD) * SECONDS_PER_DAY)
    }

    /// Convert Unix timestamp to an epoch
    pub fn from_unix(unix_timestamp: i64) -> Self {
        Self((unix_timestamp - J2000_UNIX) as f64)
    }

    /// Create from a UTC date-time.
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        let whole = (datetime.timestamp() - J2000_UNIX) as f64;
        let frac = f64::from(datetime.timestamp_subsec_nanos()) * 1e-9;
        Self(whole + frac)
    }

    /// Create from a calendar date at 00:00 UTC; `day` may carry a fraction.
    pub fn from_calendar(year: i32, month: u32, day: f64) -> PhysicsResult<Self> {
        if !day.is_finite() || day < 1.0 {
            return Err(PhysicsError::invalid("day", format!("must be >= 1, got {day}")));
        }
        let date = NaiveDate::from_ymd_opt(year, month, day.floor() as u32).ok_or_else(|| {
            PhysicsError::invalid("calendar date", format!("{year:04}-{month:02}-{day} is not a valid date"))
        })?;
        let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        Ok(Self::from_datetime(midnight) + seconds(day.fract() * SECONDS_PER_DAY))
    }

    /// Seconds since J2000.
    #[inline]
    pub const fn j2000_seconds(self) -> f64 {
        self.0
    }

    /// Days since J2000.
    pub fn days(self) -> f64 {
        self.0 / SECONDS_PER_DAY
    }

    /// Julian centuries since J2000 (the argument of secular rates).
    pub fn julian_centuries(self) -> f64 {
        self.days() / JULIAN_CENTURY_DAYS
    }

    /// Julian Date.
    pub fn julian_date(self) -> f64 {
        J2000_JD + self.days()
    }

    /// UTC date-time, if representable.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        let whole = self.0.floor();
        let nanos = ((self.0 - whole) * 1e9).round() as u32;
        DateTime::from_timestamp(J2000_UNIX + whole as i64, nanos.min(999_999_999))
    }

    /// Elapsed time from `earlier` to `self`.
    pub fn since(self, earlier: Epoch) -> Time {
        seconds(self.0 - earlier.0)
    }
}

impl Add<Time> for Epoch {
    type Output = Epoch;
    fn add(self, rhs: Time) -> Epoch {
        Epoch(self.0 + rhs.get::<second>())
    }
}

impl Sub<Epoch> for Epoch {
    type Output = Time;
    fn sub(self, rhs: Epoch) -> Time {
        self.since(rhs)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "J2000{:+.3}s", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_j2000_round_trip_julian_date() {
        assert_relative_eq!(Epoch::J2000.julian_date(), J2000_JD, epsilon = 1e-9);
        let e = Epoch::from_julian_date(2_460_000.5);
        assert_relative_eq!(e.julian_date(), 2_460_000.5, epsilon = 1e-9);
    }

    #[test]
    fn test_calendar_date_julian_day() {
        // 2000-01-01 00:00 UTC is JD 2451544.5
        let e = Epoch::from_calendar(2000, 1, 1.0).unwrap();
        assert_relative_eq!(e.julian_date(), 2_451_544.5, epsilon = 1e-9);

        // 1999-01-01 00:00 UTC is JD 2451179.5
        let e = Epoch::from_calendar(1999, 1, 1.0).unwrap();
        assert_relative_eq!(e.julian_date(), 2_451_179.5, epsilon = 1e-9);

        // Fractional day: 2000-01-01.5 is J2000 itself
        let e = Epoch::from_calendar(2000, 1, 1.5).unwrap();
        assert_relative_eq!(e.j2000_seconds(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_calendar_date_rejected() {
        assert!(Epoch::from_calendar(2001, 2, 30.0).is_err());
        assert!(Epoch::from_calendar(2001, 13, 1.0).is_err());
        assert!(Epoch::from_calendar(2001, 1, 0.5).is_err());
    }

    #[test]
    fn test_datetime_round_trip() {
        let e = Epoch::from_j2000_seconds(86_400.0 * 365.0 + 12.5);
        let dt = e.to_datetime().unwrap();
        let back = Epoch::from_datetime(dt);
        assert_relative_eq!(back.j2000_seconds(), e.j2000_seconds(), epsilon = 1e-6);
    }

    #[test]
    fn test_unix_conversion() {
        assert_eq!(Epoch::from_unix(J2000_UNIX), Epoch::J2000);
        assert_eq!(Epoch::from_unix(J2000_UNIX + 60).j2000_seconds(), 60.0);
    }

    #[test]
    fn test_epoch_arithmetic() {
        let a = Epoch::from_j2000_seconds(100.0);
        let b = a + seconds(50.0);
        assert_eq!(b.j2000_seconds(), 150.0);
        assert_eq!((b - a).get::<second>(), 50.0);
    }

    #[test]
    fn test_display_iso() {
        assert_eq!(Epoch::J2000.to_string(), "2000-01-01T12:00:00Z");
    }
}
