//! Fundamental geometric types for truss modelling.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Position in three dimensional space measured in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Distance along the global X axis.
    pub x: f64,
    /// Distance along the global Y axis.
    pub y: f64,
    /// Distance along the global Z axis.
    pub z: f64,
}

impl Point {
    /// Create a [`Point`] with explicit coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the point into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Return the point moved by `displacement`.
    #[must_use]
    pub fn displaced(self, displacement: Displacement) -> Self {
        Self::from(self.to_vector() + displacement.to_vector())
    }

    /// True when every coordinate is a finite number.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vector3<f64>> for Point {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Point> for Vector3<f64> {
    fn from(value: Point) -> Self {
        value.to_vector()
    }
}

/// Cartesian vector representing a three dimensional force in newtons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Force {
    /// Force component acting along the global X axis.
    pub x: f64,
    /// Force component acting along the global Y axis.
    pub y: f64,
    /// Force component acting along the global Z axis.
    pub z: f64,
}

impl Force {
    /// Create a [`Force`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the force into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Component along `axis` (0 = X, 1 = Y, 2 = Z).
    #[must_use]
    pub fn component(self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

impl std::ops::Add for Force {
    type Output = Force;

    fn add(self, rhs: Force) -> Force {
        Force::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<Vector3<f64>> for Force {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Force> for Vector3<f64> {
    fn from(value: Force) -> Self {
        value.to_vector()
    }
}

/// Translation vector describing joint displacement in metres.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    /// Displacement component along the global X axis.
    pub x: f64,
    /// Displacement component along the global Y axis.
    pub y: f64,
    /// Displacement component along the global Z axis.
    pub z: f64,
}

impl Displacement {
    /// Create a [`Displacement`] with explicit components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert the displacement into an algebraic vector.
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean length of the displacement.
    #[must_use]
    pub fn magnitude(self) -> f64 {
        self.to_vector().norm()
    }
}

impl From<Vector3<f64>> for Displacement {
    fn from(value: Vector3<f64>) -> Self {
        Self::new(value.x, value.y, value.z)
    }
}

impl From<Displacement> for Vector3<f64> {
    fn from(value: Displacement) -> Self {
        value.to_vector()
    }
}

/// Restraint state of the three translational degrees of freedom of a node.
///
/// Bit 0 fixes X, bit 1 fixes Y and bit 2 fixes Z, matching the three-bit
/// restraint mask used in model files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[bool; 3]", into = "[bool; 3]")]
pub struct Restraint([bool; 3]);

impl Restraint {
    /// All three translations are free.
    pub const FREE: Restraint = Restraint([false, false, false]);
    /// All three translations are fixed.
    pub const FIXED: Restraint = Restraint([true, true, true]);

    /// Create a restraint from per-axis flags; `true` means fixed.
    #[must_use]
    pub const fn new(x: bool, y: bool, z: bool) -> Self {
        Self([x, y, z])
    }

    /// Build a restraint from the low three bits of `mask`.
    ///
    /// # Examples
    /// ```
    /// use spacetruss::Restraint;
    ///
    /// let roller = Restraint::from_mask(0b110);
    /// assert!(!roller.is_fixed(0));
    /// assert!(roller.is_fixed(1) && roller.is_fixed(2));
    /// ```
    #[must_use]
    pub const fn from_mask(mask: u8) -> Self {
        Self([mask & 0b001 != 0, mask & 0b010 != 0, mask & 0b100 != 0])
    }

    /// Three-bit mask representation.
    #[must_use]
    pub fn mask(self) -> u8 {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, fixed)| **fixed)
            .fold(0, |mask, (axis, _)| mask | (1 << axis))
    }

    /// Whether the translation along `axis` is fixed.
    #[must_use]
    pub fn is_fixed(self, axis: usize) -> bool {
        self.0.get(axis).copied().unwrap_or(false)
    }

    /// Number of fixed translations.
    #[must_use]
    pub fn fixed_count(self) -> usize {
        self.0.iter().filter(|fixed| **fixed).count()
    }
}

impl From<[bool; 3]> for Restraint {
    fn from(value: [bool; 3]) -> Self {
        Self(value)
    }
}

impl From<Restraint> for [bool; 3] {
    fn from(value: Restraint) -> Self {
        value.0
    }
}

/// Convenience helper for creating [`Point`] instances.
///
/// # Examples
/// ```
/// use spacetruss::point;
///
/// let origin = point(0.0, 0.0, 0.0);
/// assert_eq!(origin.x, 0.0);
/// ```
#[must_use]
pub const fn point(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

/// Convenience helper for creating [`Force`] instances.
///
/// # Examples
/// ```
/// use spacetruss::force;
///
/// let load = force(1.0, 0.0, -5.0);
/// assert_eq!(load.z, -5.0);
/// ```
#[must_use]
pub const fn force(x: f64, y: f64, z: f64) -> Force {
    Force::new(x, y, z)
}
