//! Geometry - vertex data with per-renderer buffers
//!
//! Vertices, texture coordinates and `u16` triangle indices are collected on
//! the CPU. The first time a renderer draws a geometry, its buffers are
//! uploaded and remembered under that renderer's id.

use super::{BackendResult, BufferHandle, BufferKind, Renderer, RendererId};
use crate::foundation::math::Vector3;
use crate::scene::Pivot;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;

/// Geometry construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// A triangle references a vertex that was never added
    #[error("Vertex [{0}] not found")]
    VertexNotFound(u16),
}

/// Backend buffers of one geometry on one renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBuffers {
    /// Positions, three floats per vertex
    pub vertex: BufferHandle,
    /// Texture coordinates, two floats per vertex, if any were added
    pub tex_coords: Option<BufferHandle>,
    /// Triangle indices
    pub index: BufferHandle,
}

/// Indexed triangle mesh
#[derive(Debug, Default)]
pub struct Geometry {
    vertices: Vec<f32>,
    tex_coords: Vec<f32>,
    triangles: Vec<u16>,
    bounds: Option<(Vector3, Vector3)>,
    buffers: RefCell<HashMap<RendererId, GeometryBuffers>>,
}

impl Geometry {
    /// Create an empty geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex and grow the bounding box
    pub fn add_vertex(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.vertices.extend_from_slice(&[x, y, z]);
        let point = Vector3::new(x, y, z);
        self.bounds = Some(match self.bounds {
            None => (point, point),
            Some((min, max)) => (
                Vector3::new(min.x.min(x), min.y.min(y), min.z.min(z)),
                Vector3::new(max.x.max(x), max.y.max(y), max.z.max(z)),
            ),
        });
        self
    }

    /// Append a texture coordinate
    pub fn add_tex_coord(&mut self, u: f32, v: f32) -> &mut Self {
        self.tex_coords.extend_from_slice(&[u, v]);
        self
    }

    /// Append a triangle of existing vertices
    pub fn add_triangle(&mut self, a: u16, b: u16, c: u16) -> Result<&mut Self, GeometryError> {
        let count = self.vertex_count();
        if let Some(missing) = [a, b, c].into_iter().find(|&i| usize::from(i) >= count) {
            return Err(GeometryError::VertexNotFound(missing));
        }
        self.triangles.extend_from_slice(&[a, b, c]);
        Ok(self)
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Flat vertex positions
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Flat texture coordinates
    pub fn tex_coords(&self) -> &[f32] {
        &self.tex_coords
    }

    /// Triangle indices
    pub fn triangles(&self) -> &[u16] {
        &self.triangles
    }

    /// Number of indices drawn
    pub fn index_len(&self) -> u32 {
        u32::try_from(self.triangles.len()).unwrap_or(u32::MAX)
    }

    /// Minimum and maximum corner of all vertices
    pub const fn bounding_box(&self) -> Option<(Vector3, Vector3)> {
        self.bounds
    }

    /// Buffers on `renderer`, uploading them on first use
    pub fn buffers(&self, renderer: &mut Renderer) -> BackendResult<GeometryBuffers> {
        if let Some(buffers) = self.buffers.borrow().get(&renderer.id()) {
            return Ok(*buffers);
        }

        let backend = renderer.backend_mut();
        let vertex = backend.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&self.vertices))?;
        let tex_coords = if self.tex_coords.is_empty() {
            None
        } else {
            Some(backend.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&self.tex_coords))?)
        };
        let index = backend.create_buffer(BufferKind::Index, bytemuck::cast_slice(&self.triangles))?;

        let buffers = GeometryBuffers {
            vertex,
            tex_coords,
            index,
        };
        debug!(
            "Built geometry buffers for {:?}: {} vertices, {} indices",
            renderer.id(),
            self.vertex_count(),
            self.triangles.len()
        );
        self.buffers.borrow_mut().insert(renderer.id(), buffers);
        Ok(buffers)
    }

    /// Delete the buffers held on `renderer`
    pub fn destroy(&self, renderer: &mut Renderer) {
        let Some(buffers) = self.buffers.borrow_mut().remove(&renderer.id()) else {
            return;
        };
        let backend = renderer.backend_mut();
        backend.delete_buffer(buffers.vertex);
        if let Some(tex_coords) = buffers.tex_coords {
            backend.delete_buffer(tex_coords);
        }
        backend.delete_buffer(buffers.index);
    }
}

/// Builder for a textured quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteGeometry {
    width: f32,
    height: f32,
    pivot: Pivot,
}

impl SpriteGeometry {
    /// Quad of `width` x `height`, centered on the origin
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pivot: Pivot::M,
        }
    }

    /// Anchor the quad at `pivot` instead of its center
    #[must_use]
    pub const fn with_pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = pivot;
        self
    }

    /// Build the geometry
    pub fn build(self) -> Geometry {
        let (x1, x2) = self.pivot.horizontal(self.width);
        let (y1, y2) = self.pivot.vertical(self.height);

        let mut geometry = Geometry::new();
        geometry
            .add_vertex(x1, y1, 0.0)
            .add_vertex(x2, y1, 0.0)
            .add_vertex(x1, y2, 0.0)
            .add_vertex(x2, y2, 0.0);
        geometry
            .add_tex_coord(0.0, 1.0)
            .add_tex_coord(1.0, 1.0)
            .add_tex_coord(0.0, 0.0)
            .add_tex_coord(1.0, 0.0);
        geometry.triangles.extend_from_slice(&[0, 1, 2, 1, 3, 2]);
        geometry
    }
}

impl From<SpriteGeometry> for Geometry {
    fn from(sprite: SpriteGeometry) -> Self {
        sprite.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::render::HeadlessBackend;

    fn renderer() -> Renderer {
        Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default())
    }

    #[test]
    fn test_add_triangle_validates_indices() {
        let mut geometry = Geometry::new();
        geometry.add_vertex(0.0, 0.0, 0.0).add_vertex(1.0, 0.0, 0.0);
        assert_eq!(
            geometry.add_triangle(0, 1, 2).unwrap_err(),
            GeometryError::VertexNotFound(2)
        );

        geometry.add_vertex(0.0, 1.0, 0.0);
        geometry.add_triangle(0, 1, 2).unwrap();
        assert_eq!(geometry.index_len(), 3);
    }

    #[test]
    fn test_bounding_box() {
        let mut geometry = Geometry::new();
        assert_eq!(geometry.bounding_box(), None);
        geometry.add_vertex(1.0, -2.0, 0.0).add_vertex(-3.0, 4.0, 5.0);
        assert_eq!(
            geometry.bounding_box(),
            Some((Vector3::new(-3.0, -2.0, 0.0), Vector3::new(1.0, 4.0, 5.0)))
        );
    }

    #[test]
    fn test_sprite_quad() {
        let geometry = SpriteGeometry::new(4.0, 2.0).build();
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.triangles(), &[0, 1, 2, 1, 3, 2]);
        assert_eq!(
            geometry.bounding_box(),
            Some((Vector3::new(-2.0, -1.0, 0.0), Vector3::new(2.0, 1.0, 0.0)))
        );

        let anchored = SpriteGeometry::new(4.0, 2.0).with_pivot(Pivot::BL).build();
        assert_eq!(
            anchored.bounding_box(),
            Some((Vector3::ZERO, Vector3::new(4.0, 2.0, 0.0)))
        );
    }

    #[test]
    fn test_buffers_built_once_per_renderer() {
        let mut a = renderer();
        let mut b = renderer();
        let geometry = SpriteGeometry::new(1.0, 1.0).build();

        let first = geometry.buffers(&mut a).unwrap();
        assert_eq!(geometry.buffers(&mut a).unwrap(), first);
        assert!(first.tex_coords.is_some());
        geometry.buffers(&mut b).unwrap();

        let backend = a.backend_as::<HeadlessBackend>().unwrap();
        assert_eq!(backend.buffer_count(), 3);
        assert_eq!(backend.buffer_data(first.index).map(<[u8]>::len), Some(12));

        geometry.destroy(&mut a);
        assert_eq!(a.backend_as::<HeadlessBackend>().unwrap().buffer_count(), 0);
    }
}
