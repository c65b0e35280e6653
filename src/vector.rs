//! Unit-tagged 3D vectors.
//!
//! [`Vector3<U>`] wraps a `glam::DVec3` and carries its unit as a zero-sized
//! marker, so a position (km) cannot be added to a velocity (km/s). The
//! marker costs nothing at runtime.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Neg, Sub};

use glam::DVec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PhysicsError, PhysicsResult};
use crate::units::{Length, Velocity, km, km_per_s};

/// Marker for the unit a [`Vector3`] is expressed in.
pub trait VectorUnit: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Symbol used by `Display` and in export keys.
    const SYMBOL: &'static str;
}

/// Kilometres (positions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Kilometers;

/// Kilometres per second (velocities).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KilometersPerSecond;

/// Kilometres per second squared (accelerations).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KilometersPerSecondSquared;

/// Square kilometres per second (specific angular momentum).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SquareKilometersPerSecond;

/// Dimensionless directions and axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unitless;

impl VectorUnit for Kilometers {
    const SYMBOL: &'static str = "km";
}
impl VectorUnit for KilometersPerSecond {
    const SYMBOL: &'static str = "km/s";
}
impl VectorUnit for KilometersPerSecondSquared {
    const SYMBOL: &'static str = "km/s²";
}
impl VectorUnit for SquareKilometersPerSecond {
    const SYMBOL: &'static str = "km²/s";
}
impl VectorUnit for Unitless {
    const SYMBOL: &'static str = "";
}

/// Position vector in km.
pub type Position = Vector3<Kilometers>;
/// Velocity vector in km/s.
pub type VelocityVector = Vector3<KilometersPerSecond>;
/// Acceleration vector in km/s².
pub type AccelerationVector = Vector3<KilometersPerSecondSquared>;
/// Specific angular momentum h = r × v in km²/s.
pub type AngularMomentum = Vector3<SquareKilometersPerSecond>;
/// Dimensionless direction.
pub type Direction = Vector3<Unitless>;

/// Immutable 3D vector in the unit `U`.
pub struct Vector3<U: VectorUnit> {
    raw: DVec3,
    unit: PhantomData<U>,
}

// Manual impls: derives would demand the bounds on `U` itself.
impl<U: VectorUnit> Clone for Vector3<U> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<U: VectorUnit> Copy for Vector3<U> {}

impl<U: VectorUnit> PartialEq for Vector3<U> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<U: VectorUnit> fmt::Debug for Vector3<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3({}, {}, {} {})", self.raw.x, self.raw.y, self.raw.z, U::SYMBOL)
    }
}

impl<U: VectorUnit> fmt::Display for Vector3<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6e}, {:.6e}, {:.6e}) {}", self.raw.x, self.raw.y, self.raw.z, U::SYMBOL)
    }
}

impl<U: VectorUnit> Default for Vector3<U> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<U: VectorUnit> Vector3<U> {
    pub const ZERO: Self = Self::from_raw(DVec3::ZERO);

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_raw(DVec3::new(x, y, z))
    }

    #[inline]
    pub const fn from_raw(raw: DVec3) -> Self {
        Self {
            raw,
            unit: PhantomData,
        }
    }

    /// Components as a bare `DVec3` in the unit `U`.
    #[inline]
    pub const fn raw(self) -> DVec3 {
        self.raw
    }

    #[inline]
    pub fn x(self) -> f64 {
        self.raw.x
    }

    #[inline]
    pub fn y(self) -> f64 {
        self.raw.y
    }

    #[inline]
    pub fn z(self) -> f64 {
        self.raw.z
    }

    pub fn to_array(self) -> [f64; 3] {
        self.raw.to_array()
    }

    /// Multiply by a dimensionless factor.
    #[inline]
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::from_raw(self.raw * factor)
    }

    /// Dot product, in `U`².
    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.raw.dot(other.raw)
    }

    /// Cross product.
    ///
    /// The result is tagged `U` like its operands; the physical unit is `U`².
    /// Use [`angular_momentum`] when mixing position and velocity.
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::from_raw(self.raw.cross(other.raw))
    }

    /// Euclidean length in `U`.
    #[inline]
    pub fn norm(self) -> f64 {
        self.raw.length()
    }

    pub fn is_finite(self) -> bool {
        self.raw.is_finite()
    }

    /// Unit vector in the same direction.
    ///
    /// Fails with [`PhysicsError::DegenerateVector`] for zero or non-finite input.
    pub fn normalize(self) -> PhysicsResult<Direction> {
        let len = self.raw.length();
        if !len.is_finite() || len <= f64::MIN_POSITIVE {
            return Err(PhysicsError::DegenerateVector {
                context: "cannot normalize a zero-length vector",
            });
        }
        Ok(Direction::from_raw(self.raw / len))
    }

    /// Rotate about `axis` by `angle` radians (right-hand rule), Rodrigues' formula:
    ///
    /// v' = v·cosθ + (k×v)·sinθ + k·(k·v)·(1 − cosθ)
    pub fn rotate_about<A: VectorUnit>(self, axis: Vector3<A>, angle: f64) -> PhysicsResult<Self> {
        let k = axis.normalize().map_err(|_| PhysicsError::DegenerateVector {
            context: "rotation axis is undefined (zero length)",
        })?;
        Ok(self.rotate_about_unit(k, angle))
    }

    /// Rodrigues rotation about an axis already known to be unit length.
    #[inline]
    pub(crate) fn rotate_about_unit(self, k: Direction, angle: f64) -> Self {
        let k = k.raw;
        let v = self.raw;
        let (sin, cos) = angle.sin_cos();
        Self::from_raw(v * cos + k.cross(v) * sin + k * (k.dot(v) * (1.0 - cos)))
    }

    /// Angle in radians between two vectors, in [0, π].
    pub fn angle_between<V: VectorUnit>(self, other: Vector3<V>) -> PhysicsResult<f64> {
        let a = self.normalize()?;
        let b = other.normalize()?;
        // atan2 form stays accurate for nearly parallel vectors
        Ok(a.raw.cross(b.raw).length().atan2(a.raw.dot(b.raw)))
    }

    /// Attach a different unit to the same components.
    ///
    /// Used where a derivative is formed from raw integrator arrays.
    #[inline]
    pub(crate) fn retag<V: VectorUnit>(self) -> Vector3<V> {
        Vector3::from_raw(self.raw)
    }
}

impl Direction {
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);
}

impl Position {
    /// Distance from the origin as a typed length.
    pub fn magnitude(self) -> Length {
        km(self.norm())
    }
}

impl VelocityVector {
    /// Speed as a typed velocity.
    pub fn magnitude(self) -> Velocity {
        km_per_s(self.norm())
    }
}

/// h = r × v.
pub fn angular_momentum(position: Position, velocity: VelocityVector) -> AngularMomentum {
    AngularMomentum::from_raw(position.raw().cross(velocity.raw()))
}

impl<U: VectorUnit> Add for Vector3<U> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::from_raw(self.raw + rhs.raw)
    }
}

impl<U: VectorUnit> AddAssign for Vector3<U> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.raw += rhs.raw;
    }
}

impl<U: VectorUnit> Sub for Vector3<U> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::from_raw(self.raw - rhs.raw)
    }
}

impl<U: VectorUnit> Neg for Vector3<U> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::from_raw(-self.raw)
    }
}

impl<U: VectorUnit> Serialize for Vector3<U> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.to_array().serialize(serializer)
    }
}

impl<'de, U: VectorUnit> Deserialize<'de> for Vector3<U> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y, z] = <[f64; 3]>::deserialize(deserializer)?;
        Ok(Self::new(x, y, z))
    }
}
