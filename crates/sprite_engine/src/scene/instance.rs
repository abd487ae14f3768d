//! Scene-graph nodes
//!
//! An [`Instance`] owns its local [`Transform`], its components, and the
//! render resources it draws with. Instances live in a
//! [`SceneGraph`](super::SceneGraph) arena and refer to their parent and
//! children by [`InstanceId`]. Transform changes go through the graph, which
//! marks the instance and every descendant dirty; the world matrix is then
//! rebuilt lazily on the next read.

use super::component::{downcast_mut, downcast_ref, Component};
use super::{BoxCollision, Camera};
use crate::foundation::math::{Matrix4, Quaternion, Vector3, Vector4};
use crate::render::{Geometry, Material, RenderResult, Renderer};
use slotmap::new_key_type;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

new_key_type! {
    /// Stable identifier of an instance inside a scene graph
    pub struct InstanceId;
}

/// Local placement relative to the parent (or the world for roots)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation
    pub position: Vector3,
    /// Orientation
    pub rotation: Quaternion,
    /// Per-axis scale
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Quaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// A node of the scene graph
pub struct Instance {
    pub(crate) local: Transform,
    pub(crate) parent: Option<InstanceId>,
    pub(crate) children: Vec<InstanceId>,

    pub(crate) transform: Cell<Matrix4>,
    pub(crate) needs_update: Cell<bool>,
    pub(crate) global_position: Cell<Option<Vector4>>,
    pub(crate) rebuilds: Cell<u64>,
    pub(crate) revision: u64,
    pub(crate) world_matrix: Matrix4,

    pub(crate) components: Vec<Box<dyn Component>>,
    pub(crate) collision: Option<BoxCollision>,
    pub(crate) geometry: Option<Rc<Geometry>>,
    pub(crate) material: Option<Box<dyn Material>>,
    pub(crate) destroyed: bool,
    pub(crate) layer: Option<usize>,

    /// Hidden instances are skipped by the render pass but still updated
    pub visible: bool,
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("local", &self.local)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("needs_update", &self.needs_update.get())
            .field("components", &self.components.len())
            .field("has_geometry", &self.geometry.is_some())
            .field("has_material", &self.material.is_some())
            .field("visible", &self.visible)
            .field("destroyed", &self.destroyed)
            .field("layer", &self.layer)
            .finish_non_exhaustive()
    }
}

impl Instance {
    /// Create an empty instance at the origin
    pub fn new() -> Self {
        Self {
            local: Transform::default(),
            parent: None,
            children: Vec::new(),
            transform: Cell::new(Matrix4::identity()),
            needs_update: Cell::new(true),
            global_position: Cell::new(None),
            rebuilds: Cell::new(0),
            revision: 0,
            world_matrix: Matrix4::identity(),
            components: Vec::new(),
            collision: None,
            geometry: None,
            material: None,
            destroyed: false,
            layer: None,
            visible: true,
        }
    }

    /// Create a drawable instance
    pub fn with_render(geometry: Rc<Geometry>, material: impl Material + 'static) -> Self {
        Self::new().with_geometry(geometry).with_material(material)
    }

    /// Set the initial position
    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.local.position.set(x, y, z);
        self
    }

    /// Set the initial rotation
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quaternion) -> Self {
        self.local.rotation = rotation;
        self
    }

    /// Set the initial scale
    #[must_use]
    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.local.scale.set(x, y, z);
        self
    }

    /// Attach geometry
    #[must_use]
    pub fn with_geometry(mut self, geometry: Rc<Geometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Attach a material
    #[must_use]
    pub fn with_material(mut self, material: impl Material + 'static) -> Self {
        self.material = Some(Box::new(material));
        self
    }

    /// Attach a collision box
    #[must_use]
    pub const fn with_collision(mut self, collision: BoxCollision) -> Self {
        self.collision = Some(collision);
        self
    }

    /// Attach a component
    #[must_use]
    pub fn with_component(mut self, component: impl Component) -> Self {
        self.add_component(component);
        self
    }

    /// Attach a component
    pub fn add_component(&mut self, component: impl Component) -> &mut Self {
        self.components.push(Box::new(component));
        self
    }

    /// First component of type `T`
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components.iter().find_map(|c| downcast_ref::<T>(c.as_ref()))
    }

    /// First component of type `T`, mutably
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|c| downcast_mut::<T>(c.as_mut()))
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Local transform
    pub const fn local(&self) -> &Transform {
        &self.local
    }

    /// Local position
    pub const fn position(&self) -> Vector3 {
        self.local.position
    }

    /// Local rotation
    pub const fn rotation(&self) -> &Quaternion {
        &self.local.rotation
    }

    /// Local scale
    pub const fn scale(&self) -> Vector3 {
        self.local.scale
    }

    /// Parent instance, if any
    pub const fn parent(&self) -> Option<InstanceId> {
        self.parent
    }

    /// Whether `id` is this instance's parent
    pub fn is_parent(&self, id: InstanceId) -> bool {
        self.parent == Some(id)
    }

    /// Children in insertion order
    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    /// Whether the cached world transform is stale
    pub fn needs_update(&self) -> bool {
        self.needs_update.get()
    }

    /// How many times the world transform has been rebuilt
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.get()
    }

    /// Counter bumped every time this instance is invalidated
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// World × view matrix of the last render
    pub const fn world_matrix(&self) -> &Matrix4 {
        &self.world_matrix
    }

    /// Attached geometry
    pub const fn geometry(&self) -> Option<&Rc<Geometry>> {
        self.geometry.as_ref()
    }

    /// Replace the geometry
    pub fn set_geometry(&mut self, geometry: Option<Rc<Geometry>>) {
        self.geometry = geometry;
    }

    /// Attached material
    pub fn material(&self) -> Option<&dyn Material> {
        self.material.as_deref()
    }

    /// Attached material, mutably
    pub fn material_mut(&mut self) -> Option<&mut (dyn Material + 'static)> {
        self.material.as_deref_mut()
    }

    /// Attached material downcast to its concrete type
    pub fn material_as<M: Material>(&self) -> Option<&M> {
        self.material.as_deref()?.as_any().downcast_ref::<M>()
    }

    /// Attached material downcast to its concrete type, mutably
    pub fn material_as_mut<M: Material>(&mut self) -> Option<&mut M> {
        self.material.as_deref_mut()?.as_any_mut().downcast_mut::<M>()
    }

    /// Replace the material
    pub fn set_material(&mut self, material: Option<Box<dyn Material>>) {
        self.material = material;
    }

    /// Collision box
    pub const fn collision(&self) -> Option<&BoxCollision> {
        self.collision.as_ref()
    }

    /// Replace the collision box
    pub fn set_collision(&mut self, collision: Option<BoxCollision>) {
        self.collision = collision;
    }

    /// Whether `destroy` has run on this instance
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Layer the scene placed this instance in
    pub const fn layer(&self) -> Option<usize> {
        self.layer
    }

    /// Draw this instance
    ///
    /// Does nothing when hidden, missing geometry or material, or when the
    /// material is not ready. Otherwise stores `transformation × view` as the
    /// world matrix, lets the material draw, then runs every component's
    /// render hook.
    pub fn render(
        &mut self,
        transformation: &Matrix4,
        view: &Matrix4,
        renderer: &mut Renderer,
        camera: &Camera,
    ) -> RenderResult<()> {
        if !self.visible || self.destroyed {
            return Ok(());
        }
        let (Some(geometry), Some(material)) = (self.geometry.as_ref(), self.material.as_mut())
        else {
            return Ok(());
        };
        if !material.is_ready() {
            return Ok(());
        }

        let mut world = *transformation;
        world.multiply(view);
        self.world_matrix = world;

        material.render(renderer, &world, geometry, camera)?;

        for component in &mut self.components {
            component.render(renderer, geometry, camera)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BasicMaterial, SpriteGeometry, SpriteMaterial, Texture};
    use std::rc::Rc;

    #[test]
    fn test_material_downcast() {
        let geometry = Rc::new(SpriteGeometry::new(1.0, 1.0).build());
        let mut instance = Instance::with_render(geometry, SpriteMaterial::new(Rc::new(Texture::data(2, 2))));

        assert!(instance.material_as::<SpriteMaterial>().is_some());
        assert!(instance.material_as::<BasicMaterial>().is_none());

        instance.material_as_mut::<SpriteMaterial>().unwrap().set_repeat(2.0, 3.0);
        assert!(Instance::new().material_as::<SpriteMaterial>().is_none());
    }
}
