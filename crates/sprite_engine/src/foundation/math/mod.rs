//! Math utilities and types
//!
//! Provides the engine's own row-major math types. Vectors, quaternions and
//! matrices convert to and from their `nalgebra` counterparts and implement the
//! `approx` traits so tests can compare them with tolerances.

mod euler;
mod matrix;
mod quaternion;
mod vector;

pub use euler::{Euler, GimbalOrder};
pub use matrix::{Matrix3, Matrix4};
pub use quaternion::Quaternion;
pub use vector::{Vector3, Vector4};

