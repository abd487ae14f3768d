//! Row-major 3x3 and 4x4 matrices
//!
//! Matrices use the row-vector convention: a point is transformed as
//! `v' = v · M`, so translation lives in the last row and composition reads
//! left to right (`scale · rotation · translation · parent`).
//!
//! The flat `data` array is uploaded as-is; a column-major consumer (such as
//! a GL uniform with `transpose = false`) therefore sees `Mᵀ`, which is what
//! column-vector shader code expects.

use super::{Quaternion, Vector3, Vector4};
use approx::{AbsDiffEq, RelativeEq};
use bytemuck::{Pod, Zeroable};

/// 4x4 matrix stored row-major
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Matrix4 {
    /// Coefficients, `data[row * 4 + column]`
    pub data: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix4 {
    /// Identity coefficients
    pub const IDENTITY: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];

    /// Create a matrix from row-major coefficients
    pub const fn new(data: [f32; 16]) -> Self {
        Self { data }
    }

    /// The identity matrix
    pub const fn identity() -> Self {
        Self::new(Self::IDENTITY)
    }

    /// Create a matrix from a row-major slice
    ///
    /// Returns `None` unless the slice holds exactly 16 values.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let data: [f32; 16] = values.try_into().ok()?;
        Some(Self::new(data))
    }

    /// Overwrite all coefficients
    pub fn set(&mut self, data: [f32; 16]) -> &mut Self {
        self.data = data;
        self
    }

    /// Copy the coefficients of another matrix
    pub fn copy(&mut self, other: &Self) -> &mut Self {
        self.data = other.data;
        self
    }

    /// Reset to identity
    pub fn set_identity(&mut self) -> &mut Self {
        self.set(Self::IDENTITY)
    }

    /// `self = self · other`
    pub fn multiply(&mut self, other: &Self) -> &mut Self {
        let a = self.data;
        let b = &other.data;
        for row in 0..4 {
            for col in 0..4 {
                self.data[row * 4 + col] = (0..4).map(|k| a[row * 4 + k] * b[k * 4 + col]).sum();
            }
        }
        self
    }

    /// Transform a row vector, `v · M`
    pub fn multiply_vector(&self, v: &Vector4) -> Vector4 {
        let m = &self.data;
        let column = |c: usize| v.x * m[c] + v.y * m[4 + c] + v.z * m[8 + c] + v.w * m[12 + c];
        Vector4::new(column(0), column(1), column(2), column(3))
    }

    /// Multiply every coefficient by `factor`
    pub fn scale(&mut self, factor: f32) -> &mut Self {
        for value in &mut self.data {
            *value *= factor;
        }
        self
    }

    /// Set the translation row to `(x, y, z)`
    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.data[12] = x;
        self.data[13] = y;
        self.data[14] = z;
        self
    }

    /// Add `(x, y, z)` to the translation row
    pub fn translate_relative(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.data[12] += x;
        self.data[13] += y;
        self.data[14] += z;
        self
    }

    /// Reset to a pure scale matrix
    pub fn set_scale(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.set(Self::from_scale(x, y, z).data)
    }

    /// Swap rows and columns
    pub fn transpose(&mut self) -> &mut Self {
        let m = self.data;
        for row in 0..4 {
            for col in 0..4 {
                self.data[row * 4 + col] = m[col * 4 + row];
            }
        }
        self
    }

    /// Determinant by cofactor expansion
    pub fn determinant(&self) -> f32 {
        nalgebra::Matrix4::from(*self).determinant()
    }

    /// Inverse matrix, or `None` when the determinant is zero
    pub fn invert(&self) -> Option<Self> {
        nalgebra::Matrix4::from(*self).try_inverse().map(Self::from)
    }

    /// Rotation stored in the upper 3x3 block as a quaternion
    pub fn quaternion(&self) -> Quaternion {
        let m = &self.data;
        let trace = m[0] + m[5] + m[10];

        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quaternion::new(
                0.25 * s,
                Vector3::new((m[9] - m[6]) / s, (m[2] - m[8]) / s, (m[4] - m[1]) / s),
            )
        } else if m[0] > m[5] && m[0] > m[10] {
            let s = (1.0 + m[0] - m[5] - m[10]).sqrt() * 2.0;
            Quaternion::new(
                (m[9] - m[6]) / s,
                Vector3::new(0.25 * s, (m[1] + m[4]) / s, (m[2] + m[8]) / s),
            )
        } else if m[5] > m[10] {
            let s = (1.0 + m[5] - m[0] - m[10]).sqrt() * 2.0;
            Quaternion::new(
                (m[2] - m[8]) / s,
                Vector3::new((m[1] + m[4]) / s, 0.25 * s, (m[6] + m[9]) / s),
            )
        } else {
            let s = (1.0 + m[10] - m[0] - m[5]).sqrt() * 2.0;
            Quaternion::new(
                (m[4] - m[1]) / s,
                Vector3::new((m[2] + m[8]) / s, (m[6] + m[9]) / s, 0.25 * s),
            )
        }
    }

    /// The translation row
    pub const fn translation(&self) -> Vector3 {
        Vector3::new(self.data[12], self.data[13], self.data[14])
    }

    /// Scale matrix
    pub const fn from_scale(x: f32, y: f32, z: f32) -> Self {
        Self::new([
            x, 0.0, 0.0, 0.0, //
            0.0, y, 0.0, 0.0, //
            0.0, 0.0, z, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Translation matrix
    pub const fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self::new([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            x, y, z, 1.0,
        ])
    }

    /// Centered orthographic projection of a `width` x `height` view
    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let (left, right) = (-width / 2.0, width / 2.0);
        let (bottom, top) = (-height / 2.0, height / 2.0);

        let a = 2.0 / (right - left);
        let b = 2.0 / (top - bottom);
        let c = -2.0 / (far - near);

        let x = -(right + left) / (right - left);
        let y = -(top + bottom) / (top - bottom);
        let z = -(far + near) / (far - near);

        Self::new([
            a, 0.0, 0.0, 0.0, //
            0.0, b, 0.0, 0.0, //
            0.0, 0.0, c, 0.0, //
            x, y, z, 1.0,
        ])
    }

    /// Perspective projection
    ///
    /// # Arguments
    /// * `fov` - Field of view in radians
    /// * `ratio` - Aspect ratio; scales the vertical axis
    pub fn perspective(fov: f32, ratio: f32, near: f32, far: f32) -> Self {
        let s = 1.0 / (fov / 2.0).tan();
        let r = s * ratio;
        let a = -far / (far - near);
        let b = -(far * near) / (far - near);

        Self::new([
            s, 0.0, 0.0, 0.0, //
            0.0, r, 0.0, 0.0, //
            0.0, 0.0, a, -1.0, //
            0.0, 0.0, b, 0.0,
        ])
    }

    /// Rotation around the X axis
    pub fn rotation_x(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new([
            1.0, 0.0, 0.0, 0.0, //
            0.0, c, -s, 0.0, //
            0.0, s, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation around the Y axis
    pub fn rotation_y(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new([
            c, 0.0, -s, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            s, 0.0, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Rotation around the Z axis
    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new([
            c, -s, 0.0, 0.0, //
            s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }
}

impl From<Matrix4> for nalgebra::Matrix4<f32> {
    fn from(m: Matrix4) -> Self {
        Self::from_row_slice(&m.data)
    }
}

impl From<nalgebra::Matrix4<f32>> for Matrix4 {
    fn from(m: nalgebra::Matrix4<f32>) -> Self {
        let mut data = [0.0; 16];
        for row in 0..4 {
            for col in 0..4 {
                data[row * 4 + col] = m[(row, col)];
            }
        }
        Self::new(data)
    }
}

impl AbsDiffEq for Matrix4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.data
            .iter()
            .zip(&other.data)
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Matrix4 {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.data
            .iter()
            .zip(&other.data)
            .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

/// 3x3 matrix stored row-major
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Matrix3 {
    /// Coefficients, `data[row * 3 + column]`
    pub data: [f32; 9],
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix3 {
    /// Identity coefficients
    pub const IDENTITY: [f32; 9] = [
        1.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0,
    ];

    /// Create a matrix from row-major coefficients
    pub const fn new(data: [f32; 9]) -> Self {
        Self { data }
    }

    /// The identity matrix
    pub const fn identity() -> Self {
        Self::new(Self::IDENTITY)
    }

    /// Overwrite all coefficients
    pub fn set(&mut self, data: [f32; 9]) -> &mut Self {
        self.data = data;
        self
    }

    /// Reset to identity
    pub fn set_identity(&mut self) -> &mut Self {
        self.set(Self::IDENTITY)
    }

    /// Take the upper-left 3x3 block of a 4x4 matrix
    pub fn from_matrix4(m: &Matrix4) -> Self {
        let d = &m.data;
        Self::new([d[0], d[1], d[2], d[4], d[5], d[6], d[8], d[9], d[10]])
    }

    /// `self = self · other`
    pub fn multiply(&mut self, other: &Self) -> &mut Self {
        let a = self.data;
        let b = &other.data;
        for row in 0..3 {
            for col in 0..3 {
                self.data[row * 3 + col] = (0..3).map(|k| a[row * 3 + k] * b[k * 3 + col]).sum();
            }
        }
        self
    }

    /// Transform a row vector, `v · M`
    pub fn multiply_vector(&self, v: &Vector3) -> Vector3 {
        let m = &self.data;
        let column = |c: usize| v.x * m[c] + v.y * m[3 + c] + v.z * m[6 + c];
        Vector3::new(column(0), column(1), column(2))
    }

    /// Multiply every coefficient by `factor`
    pub fn scale(&mut self, factor: f32) -> &mut Self {
        for value in &mut self.data {
            *value *= factor;
        }
        self
    }

    /// Swap rows and columns
    pub fn transpose(&mut self) -> &mut Self {
        let m = self.data;
        for row in 0..3 {
            for col in 0..3 {
                self.data[row * 3 + col] = m[col * 3 + row];
            }
        }
        self
    }

    /// Determinant
    pub fn determinant(&self) -> f32 {
        nalgebra::Matrix3::from(*self).determinant()
    }

    /// Inverse matrix, or `None` when the determinant is zero
    pub fn invert(&self) -> Option<Self> {
        nalgebra::Matrix3::from(*self).try_inverse().map(Self::from)
    }
}

impl From<Matrix3> for nalgebra::Matrix3<f32> {
    fn from(m: Matrix3) -> Self {
        Self::from_row_slice(&m.data)
    }
}

impl From<nalgebra::Matrix3<f32>> for Matrix3 {
    fn from(m: nalgebra::Matrix3<f32>) -> Self {
        let mut data = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                data[row * 3 + col] = m[(row, col)];
            }
        }
        Self::new(data)
    }
}

impl AbsDiffEq for Matrix3 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.data
            .iter()
            .zip(&other.data)
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Matrix3 {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.data
            .iter()
            .zip(&other.data)
            .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}
