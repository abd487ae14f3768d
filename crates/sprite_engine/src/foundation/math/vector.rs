//! Three and four component vectors
//!
//! Plain `f32` value types with chaining mutators. Scene-graph owners wrap
//! mutations so that every call marks the owning transform dirty once.

use super::Quaternion;
use approx::{AbsDiffEq, RelativeEq};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Three component vector
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
pub struct Vector3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vector3 {
    /// All components zero
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Negative X
    pub const LEFT: Self = Self::new(-1.0, 0.0, 0.0);
    /// Positive X
    pub const RIGHT: Self = Self::new(1.0, 0.0, 0.0);
    /// Positive Y
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);
    /// Negative Y
    pub const DOWN: Self = Self::new(0.0, -1.0, 0.0);
    /// Negative Z
    pub const FORWARD: Self = Self::new(0.0, 0.0, -1.0);
    /// Positive Z
    pub const BACK: Self = Self::new(0.0, 0.0, 1.0);

    /// Create a new vector
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Reset every component to zero
    pub fn clear(&mut self) -> &mut Self {
        self.set(0.0, 0.0, 0.0)
    }

    /// Overwrite all components
    pub fn set(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    /// Add the given offsets to each component
    pub fn add(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.x += x;
        self.y += y;
        self.z += z;
        self
    }

    /// Add another vector component-wise
    pub fn sum(&mut self, other: &Self) -> &mut Self {
        self.add(other.x, other.y, other.z)
    }

    /// Copy the components of another vector
    pub fn copy(&mut self, other: &Self) -> &mut Self {
        *self = *other;
        self
    }

    /// Scale every component by `factor`
    pub fn multiply(&mut self, factor: f32) -> &mut Self {
        self.x *= factor;
        self.y *= factor;
        self.z *= factor;
        self
    }

    /// Scale to unit length
    ///
    /// The vector must not be zero length; a zero vector produces NaN
    /// components.
    pub fn normalize(&mut self) -> &mut Self {
        let length = self.length();
        self.multiply(1.0 / length)
    }

    /// Rotate this vector by a quaternion as `q⁻¹ · p · q`
    ///
    /// This matches the row-vector rotation matrices produced by
    /// [`Quaternion::rotation_matrix`].
    pub fn rotate_on_quaternion(&mut self, rotation: &Quaternion) -> &mut Self {
        let point = Quaternion::new(0.0, *self);
        let mut result = rotation.inverse();
        result.multiply_quaternion(&point).multiply_quaternion(rotation);
        self.copy(&result.imaginary)
    }

    /// Move towards `target` by the interpolation factor `time`
    pub fn lerp(&mut self, target: &Self, time: f32) -> &mut Self {
        self.set(
            (target.x - self.x).mul_add(time, self.x),
            (target.y - self.y).mul_add(time, self.y),
            (target.z - self.z).mul_add(time, self.z),
        )
    }

    /// Exact component equality
    #[allow(clippy::float_cmp)]
    pub fn equals(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }

    /// Euclidean length
    pub fn length(&self) -> f32 {
        Self::dot(self, self).sqrt()
    }

    /// Components as an array
    pub const fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Cross product `a × b`
    pub fn cross(a: &Self, b: &Self) -> Self {
        Self::new(
            a.y.mul_add(b.z, -(a.z * b.y)),
            a.z.mul_add(b.x, -(a.x * b.z)),
            a.x.mul_add(b.y, -(a.y * b.x)),
        )
    }

    /// Dot product `a · b`
    pub fn dot(a: &Self, b: &Self) -> f32 {
        a.z.mul_add(b.z, a.x.mul_add(b.x, a.y * b.y))
    }
}

impl From<Vector3> for nalgebra::Vector3<f32> {
    fn from(v: Vector3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<nalgebra::Vector3<f32>> for Vector3 {
    fn from(v: nalgebra::Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl AbsDiffEq for Vector3 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon)
            && self.y.abs_diff_eq(&other.y, epsilon)
            && self.z.abs_diff_eq(&other.z, epsilon)
    }
}

impl RelativeEq for Vector3 {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.x.relative_eq(&other.x, epsilon, max_relative)
            && self.y.relative_eq(&other.y, epsilon, max_relative)
            && self.z.relative_eq(&other.z, epsilon, max_relative)
    }
}

/// Four component vector, used for homogeneous positions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
pub struct Vector4 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Vector4 {
    /// Create a new vector
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Homogeneous point from a position (`w = 1`)
    pub const fn from_point(p: &Vector3) -> Self {
        Self::new(p.x, p.y, p.z, 1.0)
    }

    /// Overwrite all components
    pub fn set(&mut self, x: f32, y: f32, z: f32, w: f32) -> &mut Self {
        *self = Self::new(x, y, z, w);
        self
    }

    /// Copy the components of another vector
    pub fn copy(&mut self, other: &Self) -> &mut Self {
        *self = *other;
        self
    }

    /// Add the given offsets to each component
    pub fn add(&mut self, x: f32, y: f32, z: f32, w: f32) -> &mut Self {
        self.x += x;
        self.y += y;
        self.z += z;
        self.w += w;
        self
    }

    /// Scale every component by `factor`
    pub fn multiply(&mut self, factor: f32) -> &mut Self {
        self.x *= factor;
        self.y *= factor;
        self.z *= factor;
        self.w *= factor;
        self
    }

    /// Scale to unit length
    pub fn normalize(&mut self) -> &mut Self {
        let length = self.length();
        self.multiply(1.0 / length)
    }

    /// Components as an array
    pub const fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// The first three components
    pub const fn xyz(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean length over all four components
    pub fn length(&self) -> f32 {
        Self::dot(self, self).sqrt()
    }

    /// Dot product over all four components
    pub fn dot(a: &Self, b: &Self) -> f32 {
        a.w.mul_add(b.w, a.z.mul_add(b.z, a.x.mul_add(b.x, a.y * b.y)))
    }
}

impl From<Vector4> for nalgebra::Vector4<f32> {
    fn from(v: Vector4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl From<nalgebra::Vector4<f32>> for Vector4 {
    fn from(v: nalgebra::Vector4<f32>) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }
}

impl AbsDiffEq for Vector4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.xyz().abs_diff_eq(&other.xyz(), epsilon) && self.w.abs_diff_eq(&other.w, epsilon)
    }
}

impl RelativeEq for Vector4 {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.xyz().relative_eq(&other.xyz(), epsilon, max_relative)
            && self.w.relative_eq(&other.w, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_chained_mutators() {
        let mut v = Vector3::new(1.0, 2.0, 3.0);
        v.add(1.0, 1.0, 1.0).multiply(2.0);
        assert_eq!(v, Vector3::new(4.0, 6.0, 8.0));

        v.clear();
        assert_eq!(v, Vector3::ZERO);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = Vector3::new(3.0, 0.0, 4.0);
        v.normalize();
        assert_relative_eq!(v.length(), 1.0, epsilon = EPSILON);
        assert_relative_eq!(v, Vector3::new(0.6, 0.0, 0.8), epsilon = EPSILON);
    }

    #[test]
    fn test_cross_and_dot() {
        let c = Vector3::cross(&Vector3::RIGHT, &Vector3::UP);
        assert_relative_eq!(c, Vector3::BACK, epsilon = EPSILON);
        assert_relative_eq!(Vector3::dot(&Vector3::RIGHT, &Vector3::UP), 0.0);
        assert_relative_eq!(
            Vector3::dot(&Vector3::new(1.0, 2.0, 3.0), &Vector3::new(4.0, 5.0, 6.0)),
            32.0
        );
    }

    #[test]
    fn test_lerp_halfway() {
        let mut v = Vector3::ZERO;
        v.lerp(&Vector3::new(10.0, -4.0, 2.0), 0.5);
        assert_relative_eq!(v, Vector3::new(5.0, -2.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_vector4_xyz_view() {
        let mut v = Vector4::new(1.0, 2.0, 3.0, 1.0);
        v.add(1.0, 0.0, 0.0, 0.0);
        assert_eq!(v.xyz(), Vector3::new(2.0, 2.0, 3.0));
        assert_eq!(v.to_array(), [2.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_nalgebra_conversion() {
        let v = Vector3::new(1.0, -2.0, 0.5);
        let n: nalgebra::Vector3<f32> = v.into();
        assert_relative_eq!(n.norm(), v.length(), epsilon = EPSILON);
        assert_eq!(Vector3::from(n), v);
    }
}
