use num::traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::{Add, Mul, Sub};

/// A 3D vector generic over a floating point type.
///
/// The scene uses a Y-up convention: `x` and `z` span the horizontal plane,
/// `y` is altitude.
///
/// # Type Parameters
/// * `T` - The scalar type of the components.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Vec3D<T> {
    /// The x-component (right).
    x: T,
    /// The y-component (up).
    y: T,
    /// The z-component (towards the viewer).
    z: T,
}

impl<T: Copy> Vec3D<T> {
    /// Creates a new vector from its three components.
    pub const fn new(x: T, y: T, z: T) -> Self { Self { x, y, z } }

    pub fn x(&self) -> T { self.x }
    pub fn y(&self) -> T { self.y }
    pub fn z(&self) -> T { self.z }

    /// Returns a copy of this vector with its altitude replaced.
    pub fn with_y(self, y: T) -> Self { Self { y, ..self } }
}

impl<T: Float> Vec3D<T> {
    pub fn zero() -> Self { Self::new(T::zero(), T::zero(), T::zero()) }

    /// Computes the distance between `self` and `other` projected onto the horizontal plane.
    pub fn horizontal_dist(&self, other: &Self) -> T {
        (other.x - self.x).hypot(other.z - self.z)
    }

    /// Computes the heading angle in radians of the horizontal direction from `self` to `other`.
    ///
    /// The angle is measured from the +X axis towards the +Z axis.
    pub fn heading_to(&self, other: &Self) -> T { (other.z - self.z).atan2(other.x - self.x) }

    /// Full euclidean magnitude.
    pub fn abs(&self) -> T { (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt() }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl<T: Float> Add for Vec3D<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl<T: Float> Sub for Vec3D<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl<T: Float> Mul<T> for Vec3D<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self::Output { Self::new(self.x * rhs, self.y * rhs, self.z * rhs) }
}

impl<T: Display> Display for Vec3D<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}, {:.3}, {:.3}]", self.x, self.y, self.z)
    }
}

impl<T: Copy> From<(T, T, T)> for Vec3D<T> {
    fn from(value: (T, T, T)) -> Self { Self::new(value.0, value.1, value.2) }
}
