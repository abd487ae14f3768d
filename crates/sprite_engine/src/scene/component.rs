//! Behaviour attached to instances
//!
//! Components are looked up by type: each kind of behaviour is its own Rust
//! type and [`Instance::get_component`](super::Instance::get_component)
//! resolves it with a `TypeId` check.
//!
//! While a hook runs the component is temporarily detached from its
//! instance, so the hook gets full mutable access to the scene graph through
//! [`ComponentContext`]. Sibling components stay reachable; only the running
//! component itself is absent from its instance for the duration.

use super::{Camera, Instance, InstanceId, Rect, SceneGraph};
use crate::foundation::collections::LinkedList;
use crate::foundation::downcast::AsAny;
use crate::render::{Geometry, RenderResult, Renderer};

/// Per-instance behaviour with lifecycle hooks
pub trait Component: AsAny {
    /// Called once by `Scene::init`
    fn init(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called every frame before anything is rendered
    fn update(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called after the owning instance's material has drawn
    fn render(
        &mut self,
        _renderer: &mut Renderer,
        _geometry: &Geometry,
        _camera: &Camera,
    ) -> RenderResult<()> {
        Ok(())
    }

    /// Called when the owning instance is destroyed
    fn destroy(&mut self, _instance: InstanceId) {}
}

pub(crate) fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

pub(crate) fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

/// Placeholder left in a component slot while its hook runs
pub(crate) struct Vacant;

impl Component for Vacant {}

/// Access to the scene from inside a component hook
pub struct ComponentContext<'a> {
    instance: InstanceId,
    graph: &'a mut SceneGraph,
    layers: &'a [Option<LinkedList<InstanceId>>],
    level: &'a [Rect],
    spawned: &'a mut Vec<(InstanceId, usize)>,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(
        instance: InstanceId,
        graph: &'a mut SceneGraph,
        layers: &'a [Option<LinkedList<InstanceId>>],
        level: &'a [Rect],
        spawned: &'a mut Vec<(InstanceId, usize)>,
    ) -> Self {
        Self {
            instance,
            graph,
            layers,
            level,
            spawned,
        }
    }

    /// The instance owning the running component
    pub const fn instance(&self) -> InstanceId {
        self.instance
    }

    /// The scene graph
    pub fn graph(&self) -> &SceneGraph {
        &*self.graph
    }

    /// The scene graph, mutably
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut *self.graph
    }

    /// Instances of a layer as they were when the pass started
    pub fn layer(&self, index: usize) -> Option<&LinkedList<InstanceId>> {
        self.layers.get(index)?.as_ref()
    }

    /// Add a new instance to the scene
    ///
    /// The instance joins the graph immediately and its layer once the
    /// current pass finishes.
    pub fn spawn(&mut self, instance: Instance, layer: usize) -> InstanceId {
        let id = self.graph.insert(instance);
        self.spawned.push((id, layer));
        id
    }

    /// First instance in the owner's layer whose box overlaps the owner's
    pub fn collision(&self) -> Option<InstanceId> {
        self.collision_of(self.instance)
    }

    /// First instance in `id`'s layer whose box overlaps `id`'s
    pub fn collision_of(&self, id: InstanceId) -> Option<InstanceId> {
        let layer = self.graph.get(id)?.layer?;
        let list = self.layer(layer)?;
        self.graph.first_overlap(id, list.iter())
    }

    /// First level rectangle overlapping the owner's box
    pub fn level_collision(&self) -> Option<Rect> {
        self.graph.level_overlap(self.instance, self.level)
    }
}
