//! Minimal 3-vector math used by the manifold builder and the
//! barycentric point-location test.
//!
//! Deliberately has no numerical linear-algebra dependency: the source's
//! `triangle.c` links GSL only to allocate scratch vectors an abandoned
//! SVD approach would have needed; `triangle_point_in_triangle` itself
//! only ever calls a plain determinant ratio. See `SPEC_FULL.md` §4.3.

use serde::{Deserialize, Serialize};

/// A point on (or near) the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Vec3 {
    /// Construct a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Cross product `self x other`.
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Return the point projected onto the unit sphere, or `None` if it
    /// is too close to the origin to normalise safely.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let l = self.length();
        if l < 1.0e-12 {
            None
        } else {
            Some(Self::new(self.x / l, self.y / l, self.z / l))
        }
    }

    /// Rotate around the Y axis by `theta` radians.
    #[must_use]
    pub fn rotate_y(self, theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self::new(
            self.x * c + self.z * s,
            self.y,
            -self.x * s + self.z * c,
        )
    }

    /// Rotate around the Z axis by `theta` radians.
    #[must_use]
    pub fn rotate_z(self, theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c, self.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// `det [p - c; a - c; b - c]`-style signed volume used by the
/// barycentric in-triangle test: the determinant of the 3x3 matrix
/// whose rows are `a`, `b`, `c`.
#[must_use]
pub fn determinant(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    a.x * (b.y * c.z - b.z * c.y) - a.y * (b.x * c.z - b.z * c.x) + a.z * (b.x * c.y - b.y * c.x)
}
