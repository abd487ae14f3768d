//! # Camera
//!
//! A camera is an ordinary instance of the scene graph plus a projection.
//! Moving, rotating or parenting the camera instance works exactly like any
//! other node; the view matrix is derived from the instance's global
//! position and rotation.
//!
//! ## Coordinate System
//! Row-vector convention, `v' = v · M`. The view matrix is
//!
//! ```text
//! view = Translate(-global_position) · Rotation(global_rotation⁻¹)
//! ```
//!
//! and is cached until the camera instance is invalidated again.

use super::{GraphId, Instance, InstanceId, SceneGraph};
use crate::foundation::math::{Matrix4, Vector3};
use std::cell::Cell;

/// Scene camera with a projection and a view derived from its node
#[derive(Debug, Clone)]
pub struct Camera {
    node: InstanceId,
    projection: Matrix4,
    screen_size: Vector3,
    view: Cell<Option<(GraphId, u64, Matrix4)>>,
}

impl Camera {
    /// Create a camera with an arbitrary projection
    ///
    /// An empty instance is inserted into `graph` to carry the camera
    /// transform.
    pub fn new(graph: &mut SceneGraph, projection: Matrix4) -> Self {
        let node = graph.insert(Instance::new());
        Self::with_node(node, projection)
    }

    /// Create a camera driven by an existing instance
    pub const fn with_node(node: InstanceId, projection: Matrix4) -> Self {
        Self {
            node,
            projection,
            screen_size: Vector3::ZERO,
            view: Cell::new(None),
        }
    }

    /// Perspective camera
    ///
    /// # Arguments
    /// * `fov_degrees` - Field of view in degrees
    /// * `ratio` - Aspect ratio (width / height)
    /// * `near` - Near clipping plane distance
    /// * `far` - Far clipping plane distance
    pub fn perspective(graph: &mut SceneGraph, fov_degrees: f32, ratio: f32, near: f32, far: f32) -> Self {
        Self::new(graph, Matrix4::perspective(fov_degrees.to_radians(), ratio, near, far))
    }

    /// Orthographic camera covering `width` x `height` world units
    pub fn orthographic(graph: &mut SceneGraph, width: f32, height: f32, near: f32, far: f32) -> Self {
        let mut camera = Self::new(graph, Matrix4::orthographic(width, height, near, far));
        camera.screen_size = Vector3::new(width, height, 0.0);
        camera
    }

    /// Instance carrying the camera transform
    pub const fn node(&self) -> InstanceId {
        self.node
    }

    /// Projection matrix
    pub const fn projection(&self) -> &Matrix4 {
        &self.projection
    }

    /// Replace the projection matrix
    pub fn set_projection(&mut self, projection: Matrix4) {
        self.projection = projection;
    }

    /// Visible area for orthographic cameras, zero otherwise
    pub const fn screen_size(&self) -> Vector3 {
        self.screen_size
    }

    /// View matrix from the camera instance's global transform
    ///
    /// Rebuilt only when the camera instance changed since the last call
    /// or `graph` is not the graph of that call. Falls back to identity if
    /// the camera instance is gone.
    pub fn view_matrix(&self, graph: &SceneGraph) -> Matrix4 {
        let Some(revision) = graph.revision(self.node) else {
            return Matrix4::identity();
        };
        if let Some((cached_graph, cached_revision, view)) = self.view.get() {
            if cached_graph == graph.id() && cached_revision == revision {
                return view;
            }
        }

        let (Some(position), Some(rotation)) =
            (graph.global_position(self.node), graph.global_rotation(self.node))
        else {
            return Matrix4::identity();
        };

        let mut view = Matrix4::from_translation(-position.x, -position.y, -position.z);
        view.multiply(&rotation.inverse().rotation_matrix());
        self.view.set(Some((graph.id(), revision, view)));
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vector4;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_camera_inserts_node() {
        let mut graph = SceneGraph::new();
        let camera = Camera::orthographic(&mut graph, 320.0, 240.0, 0.1, 100.0);
        assert!(graph.contains(camera.node()));
        assert_eq!(camera.screen_size(), Vector3::new(320.0, 240.0, 0.0));
    }

    #[test]
    fn test_view_moves_world_opposite_to_camera() {
        let mut graph = SceneGraph::new();
        let camera = Camera::orthographic(&mut graph, 100.0, 100.0, 0.1, 100.0);
        graph.set_position(camera.node(), 10.0, 5.0, 0.0);

        let view = camera.view_matrix(&graph);
        let p = view.multiply_vector(&Vector4::new(10.0, 5.0, 0.0, 1.0));
        assert_relative_eq!(p.xyz(), Vector3::ZERO, epsilon = EPSILON);
    }

    #[test]
    fn test_view_undoes_camera_rotation() {
        let mut graph = SceneGraph::new();
        let camera = Camera::perspective(&mut graph, 90.0, 1.0, 0.1, 100.0);
        graph.rotate_z(camera.node(), FRAC_PI_2);

        let rotation = graph.global_rotation(camera.node()).unwrap();
        let mut view = camera.view_matrix(&graph);
        view.multiply(&rotation.rotation_matrix());
        assert_relative_eq!(view, Matrix4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_view_cache_follows_camera() {
        let mut graph = SceneGraph::new();
        let camera = Camera::orthographic(&mut graph, 100.0, 100.0, 0.1, 100.0);

        let first = camera.view_matrix(&graph);
        assert_eq!(first, camera.view_matrix(&graph));

        graph.translate(camera.node(), 3.0, 0.0, 0.0);
        let moved = camera.view_matrix(&graph);
        assert_relative_eq!(moved.translation(), Vector3::new(-3.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_view_cache_is_per_graph() {
        let mut a = SceneGraph::new();
        let mut b = SceneGraph::new();
        let camera = Camera::orthographic(&mut a, 100.0, 100.0, 0.1, 100.0);
        assert_eq!(b.insert(Instance::new()), camera.node());

        a.set_position(camera.node(), 1.0, 0.0, 0.0);
        b.set_position(camera.node(), 7.0, 0.0, 0.0);
        assert_eq!(a.revision(camera.node()), b.revision(camera.node()));

        let in_a = camera.view_matrix(&a);
        let in_b = camera.view_matrix(&b);
        assert_relative_eq!(in_a.translation(), Vector3::new(-1.0, 0.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(in_b.translation(), Vector3::new(-7.0, 0.0, 0.0), epsilon = EPSILON);
    }
}
