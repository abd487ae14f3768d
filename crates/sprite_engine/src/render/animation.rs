//! Sprite sheet animations

use crate::foundation::math::Vector4;

/// Sequence of UV rectangles played at `speed` frames per tick
#[derive(Debug, Clone, PartialEq)]
pub struct Animation2D {
    frames: Vec<Vector4>,
    /// Frame index advance per rendered frame
    pub speed: f32,
}

impl Default for Animation2D {
    fn default() -> Self {
        Self::new()
    }
}

impl Animation2D {
    /// Empty animation at speed 1
    pub const fn new() -> Self {
        Self {
            frames: Vec::new(),
            speed: 1.0,
        }
    }

    /// Set the playback speed
    #[must_use]
    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Append a frame, `(u, v, width, height)` in texture space
    pub fn add_frame(&mut self, uvs: Vector4) -> &mut Self {
        self.frames.push(uvs);
        self
    }

    /// Frame at a fractional index; the fraction is dropped
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn frame(&self, index: f32) -> Option<Vector4> {
        if index < 0.0 {
            return None;
        }
        self.frames.get(index.floor() as usize).copied()
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether there are no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_floors_index() {
        let mut animation = Animation2D::new();
        animation
            .add_frame(Vector4::new(0.0, 0.0, 0.5, 1.0))
            .add_frame(Vector4::new(0.5, 0.0, 0.5, 1.0));

        assert_eq!(animation.len(), 2);
        assert_eq!(animation.frame(0.9), Some(Vector4::new(0.0, 0.0, 0.5, 1.0)));
        assert_eq!(animation.frame(1.0), Some(Vector4::new(0.5, 0.0, 0.5, 1.0)));
        assert_eq!(animation.frame(2.0), None);
        assert_eq!(animation.frame(-1.0), None);
    }

    #[test]
    fn test_default_speed() {
        assert!((Animation2D::default().speed - 1.0).abs() < f32::EPSILON);
        assert!((Animation2D::new().with_speed(0.25).speed - 0.25).abs() < f32::EPSILON);
    }
}
