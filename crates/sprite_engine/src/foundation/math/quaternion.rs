//! Rotation quaternion with a tracked local axis frame
//!
//! Besides the scalar/imaginary pair, every quaternion carries three
//! orthonormal axis vectors that are rotated along with it. When
//! [`Quaternion::local`] is set, `rotate_x/y/z` spin around those tracked
//! axes instead of the fixed world axes, which gives "turn relative to where
//! I am facing" controls without re-deriving axes from the matrix.
//!
//! The default frame is `X = RIGHT`, `Y = DOWN`, `Z = BACK`.

use super::{Matrix4, Vector3};
use approx::{AbsDiffEq, RelativeEq};

/// Below this `|sin(θ/2)|` slerp falls back to the plain midpoint
const SLERP_MIDPOINT_THRESHOLD: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

/// Quaternion `s + v`, plus a cached local axis frame
#[derive(Debug, Clone, Copy)]
pub struct Quaternion {
    /// Scalar part
    pub s: f32,
    /// Imaginary (vector) part
    pub imaginary: Vector3,
    /// Rotate around the tracked own axes instead of the world axes
    pub local: bool,
    axis_x: Vector3,
    axis_y: Vector3,
    axis_z: Vector3,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        self.s == other.s && self.imaginary == other.imaginary
    }
}

impl Quaternion {
    /// Create a quaternion from its scalar and imaginary parts
    pub const fn new(s: f32, imaginary: Vector3) -> Self {
        Self {
            s,
            imaginary,
            local: false,
            axis_x: Vector3::RIGHT,
            axis_y: Vector3::DOWN,
            axis_z: Vector3::BACK,
        }
    }

    /// The identity rotation
    pub const fn identity() -> Self {
        Self::new(1.0, Vector3::ZERO)
    }

    /// Unit quaternion rotating `radians` around `axis`
    ///
    /// The axis does not need to be normalized.
    pub fn create_rotation_on_axis(radians: f32, axis: &Vector3) -> Self {
        let half = radians * 0.5;
        let mut imaginary = *axis;
        imaginary.normalize().multiply(half.sin());
        Self::new(half.cos(), imaginary)
    }

    /// Copy the rotation (scalar and imaginary parts) of another quaternion
    ///
    /// The axis frame and the `local` flag are left untouched.
    pub fn copy(&mut self, other: &Self) -> &mut Self {
        self.s = other.s;
        self.imaginary = other.imaginary;
        self
    }

    /// Component-wise addition
    pub fn sum(&mut self, other: &Self) -> &mut Self {
        self.s += other.s;
        self.imaginary.sum(&other.imaginary);
        self
    }

    /// Scale all four components
    pub fn multiply_scalar(&mut self, factor: f32) -> &mut Self {
        self.s *= factor;
        self.imaginary.multiply(factor);
        self
    }

    /// Hamilton product `self = self · other`
    pub fn multiply_quaternion(&mut self, other: &Self) -> &mut Self {
        let (sa, sb) = (self.s, other.s);
        let (va, vb) = (self.imaginary, other.imaginary);
        let cross = Vector3::cross(&va, &vb);

        self.s = sa.mul_add(sb, -Vector3::dot(&va, &vb));

        let mut scaled_b = vb;
        scaled_b.multiply(sa);
        self.imaginary.multiply(sb).sum(&scaled_b).sum(&cross);
        self
    }

    /// Scale to unit norm; a zero quaternion is left as is
    pub fn normalize(&mut self) -> &mut Self {
        let norm = self.norm();
        if norm != 0.0 {
            self.multiply_scalar(1.0 / norm);
        }
        self
    }

    /// Rotate around the X axis (local or world)
    pub fn rotate_x(&mut self, radians: f32) -> &mut Self {
        self.rotate_about(Axis::X, radians)
    }

    /// Rotate around the Y axis (local or world)
    ///
    /// The world Y axis points down.
    pub fn rotate_y(&mut self, radians: f32) -> &mut Self {
        self.rotate_about(Axis::Y, radians)
    }

    /// Rotate around the Z axis (local or world)
    pub fn rotate_z(&mut self, radians: f32) -> &mut Self {
        self.rotate_about(Axis::Z, radians)
    }

    fn rotate_about(&mut self, axis: Axis, radians: f32) -> &mut Self {
        let direction = match (axis, self.local) {
            (Axis::X, true) => self.axis_x,
            (Axis::Y, true) => self.axis_y,
            (Axis::Z, true) => self.axis_z,
            (Axis::X, false) => Vector3::RIGHT,
            (Axis::Y, false) => Vector3::DOWN,
            (Axis::Z, false) => Vector3::BACK,
        };
        let rotation = Self::create_rotation_on_axis(radians, &direction);

        self.multiply_quaternion(&rotation);

        for (frame_axis, tracked) in [
            (Axis::X, &mut self.axis_x),
            (Axis::Y, &mut self.axis_y),
            (Axis::Z, &mut self.axis_z),
        ] {
            if frame_axis != axis {
                tracked.rotate_on_quaternion(&rotation).normalize();
            }
        }
        self
    }

    /// The tracked local X axis
    pub const fn axis_x(&self) -> Vector3 {
        self.axis_x
    }

    /// The tracked local Y axis
    pub const fn axis_y(&self) -> Vector3 {
        self.axis_y
    }

    /// The tracked local Z axis
    pub const fn axis_z(&self) -> Vector3 {
        self.axis_z
    }

    /// Rotation matrix derived from `(s, imaginary)`
    ///
    /// The axis cache does not take part in this computation.
    pub fn rotation_matrix(&self) -> Matrix4 {
        let Vector3 { x: qx, y: qy, z: qz } = self.imaginary;
        let qw = self.s;

        Matrix4::new([
            1.0 - 2.0 * qy * qy - 2.0 * qz * qz,
            2.0 * qx * qy - 2.0 * qz * qw,
            2.0 * qx * qz + 2.0 * qy * qw,
            0.0,
            2.0 * qx * qy + 2.0 * qz * qw,
            1.0 - 2.0 * qx * qx - 2.0 * qz * qz,
            2.0 * qy * qz - 2.0 * qx * qw,
            0.0,
            2.0 * qx * qz - 2.0 * qy * qw,
            2.0 * qy * qz + 2.0 * qx * qw,
            1.0 - 2.0 * qx * qx - 2.0 * qy * qy,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ])
    }

    /// Reset to the identity rotation and the default axis frame
    pub fn set_identity(&mut self) -> &mut Self {
        self.s = 1.0;
        self.imaginary = Vector3::ZERO;
        self.axis_x = Vector3::RIGHT;
        self.axis_y = Vector3::DOWN;
        self.axis_z = Vector3::BACK;
        self
    }

    /// Face along `direction` using a yaw then pitch rotation
    pub fn look_to_direction(&mut self, direction: &Vector3) -> &mut Self {
        let mut normal = *direction;
        normal.normalize();

        let pitch = normal.y.asin();
        let yaw = (-normal.z).atan2(normal.x);

        self.set_identity();
        self.rotate_y(yaw - std::f32::consts::FRAC_PI_2);
        self.rotate_x(-pitch)
    }

    /// Spherical interpolation towards `target` by `time` in `[0, 1]`
    pub fn slerp(&mut self, target: &Self, time: f32) -> &mut Self {
        let mut target = *target;
        let mut cos_half_theta =
            self.s.mul_add(target.s, Vector3::dot(&self.imaginary, &target.imaginary));

        if cos_half_theta.abs() >= 1.0 {
            return self;
        }

        if cos_half_theta < 0.0 {
            target.multiply_scalar(-1.0);
            cos_half_theta = -cos_half_theta;
        }

        let half_theta = cos_half_theta.acos();
        let sin_half_theta = cos_half_theta.mul_add(-cos_half_theta, 1.0).sqrt();

        let (ratio_a, ratio_b) = if sin_half_theta.abs() < SLERP_MIDPOINT_THRESHOLD {
            (0.5, 0.5)
        } else {
            (
                ((1.0 - time) * half_theta).sin() / sin_half_theta,
                (time * half_theta).sin() / sin_half_theta,
            )
        };

        let (a, b) = (self.imaginary, target.imaginary);
        self.s = self.s.mul_add(ratio_a, target.s * ratio_b);
        self.imaginary.set(
            a.x.mul_add(ratio_a, b.x * ratio_b),
            a.y.mul_add(ratio_a, b.y * ratio_b),
            a.z.mul_add(ratio_a, b.z * ratio_b),
        );
        self
    }

    /// Quaternion norm `√(s² + v·v)`
    pub fn norm(&self) -> f32 {
        self.s
            .mul_add(self.s, Vector3::dot(&self.imaginary, &self.imaginary))
            .sqrt()
    }

    /// Conjugate `s − v`
    pub fn conjugate(&self) -> Self {
        let mut imaginary = self.imaginary;
        imaginary.multiply(-1.0);
        Self::new(self.s, imaginary)
    }

    /// Multiplicative inverse `conjugate / norm²`
    pub fn inverse(&self) -> Self {
        let norm = self.norm();
        let mut inverse = self.conjugate();
        inverse.multiply_scalar(1.0 / (norm * norm));
        inverse
    }
}

impl From<Quaternion> for nalgebra::UnitQuaternion<f32> {
    fn from(q: Quaternion) -> Self {
        Self::from_quaternion(nalgebra::Quaternion::new(
            q.s,
            q.imaginary.x,
            q.imaginary.y,
            q.imaginary.z,
        ))
    }
}

impl From<nalgebra::UnitQuaternion<f32>> for Quaternion {
    fn from(q: nalgebra::UnitQuaternion<f32>) -> Self {
        Self::new(q.w, Vector3::new(q.i, q.j, q.k))
    }
}

impl AbsDiffEq for Quaternion {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.s.abs_diff_eq(&other.s, epsilon)
            && self.imaginary.abs_diff_eq(&other.imaginary, epsilon)
    }
}

impl RelativeEq for Quaternion {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.s.relative_eq(&other.s, epsilon, max_relative)
            && self
                .imaginary
                .relative_eq(&other.imaginary, epsilon, max_relative)
    }
}
