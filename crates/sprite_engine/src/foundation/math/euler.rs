//! Euler angle rotations with a configurable gimbal order

use super::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Order in which the three axis rotations are multiplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GimbalOrder {
    /// X, then Y, then Z
    Xyz,
    /// X, then Z, then Y
    Xzy,
    /// Y, then X, then Z
    Yxz,
    /// Y, then Z, then X
    Yzx,
    /// Z, then Y, then X
    #[default]
    Zyx,
    /// Z, then X, then Y
    Zxy,
}

impl GimbalOrder {
    const fn axes(self) -> [char; 3] {
        match self {
            Self::Xyz => ['X', 'Y', 'Z'],
            Self::Xzy => ['X', 'Z', 'Y'],
            Self::Yxz => ['Y', 'X', 'Z'],
            Self::Yzx => ['Y', 'Z', 'X'],
            Self::Zyx => ['Z', 'Y', 'X'],
            Self::Zxy => ['Z', 'X', 'Y'],
        }
    }
}

impl FromStr for GimbalOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "XYZ" => Ok(Self::Xyz),
            "XZY" => Ok(Self::Xzy),
            "YXZ" => Ok(Self::Yxz),
            "YZX" => Ok(Self::Yzx),
            "ZYX" => Ok(Self::Zyx),
            "ZXY" => Ok(Self::Zxy),
            other => Err(format!("unknown gimbal order '{other}'")),
        }
    }
}

/// Rotation expressed as three angles in radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Euler {
    /// Angles around X, Y and Z
    pub angles: Vector3,
    /// Multiplication order
    pub order: GimbalOrder,
}

impl Euler {
    /// Create a rotation from angles and an order
    pub const fn new(x: f32, y: f32, z: f32, order: GimbalOrder) -> Self {
        Self {
            angles: Vector3::new(x, y, z),
            order,
        }
    }

    /// Compose the axis rotations in gimbal order
    pub fn rotation_matrix(&self) -> Matrix4 {
        let mut matrix = Matrix4::identity();
        for axis in self.order.axes() {
            let step = match axis {
                'X' => Matrix4::rotation_x(self.angles.x),
                'Y' => Matrix4::rotation_y(self.angles.y),
                _ => Matrix4::rotation_z(self.angles.z),
            };
            matrix.multiply(&step);
        }
        matrix
    }

    /// Set yaw and pitch so the rotation faces along `direction`
    pub fn look_to_direction(&mut self, direction: &Vector3) {
        let mut normal = *direction;
        normal.normalize();

        let pitch = normal.y.asin();
        let yaw = (-normal.z).atan2(normal.x);

        self.angles.y = yaw;
        self.angles.z = -pitch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_axis_matches_factory() {
        let euler = Euler::new(0.0, 0.0, 0.8, GimbalOrder::Xyz);
        assert_relative_eq!(euler.rotation_matrix(), Matrix4::rotation_z(0.8), epsilon = 1e-6);
    }

    #[test]
    fn test_order_changes_result() {
        let a = Euler::new(0.5, 0.7, 0.0, GimbalOrder::Xyz).rotation_matrix();
        let b = Euler::new(0.5, 0.7, 0.0, GimbalOrder::Yxz).rotation_matrix();
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_order() {
        assert_eq!("zxy".parse::<GimbalOrder>(), Ok(GimbalOrder::Zxy));
        assert!("XXY".parse::<GimbalOrder>().is_err());
    }
}
