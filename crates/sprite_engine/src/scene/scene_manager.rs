//! Scene - layered instance lists and the frame passes
//!
//! The scene owns the [`SceneGraph`] arena and one [`LinkedList`] of
//! instance ids per layer. A frame is:
//!
//! 1. Update pass: every component of every layered instance runs `update`.
//!    Instances spawned by components join their layer afterwards.
//! 2. Per layer, the optional `before_render` hook may reorder the list
//!    (depth sorting, typically).
//! 3. Render pass: destroyed instances are unlinked and swept from the
//!    arena, everything else is drawn in list order.

use super::component::ComponentContext;
use super::{Camera, Instance, InstanceId, Rect, SceneGraph};
use crate::config::{LevelMask, SceneConfig};
use crate::foundation::collections::LinkedList;
use crate::render::{RenderResult, Renderer};
use log::{debug, trace, warn};
use std::collections::HashSet;

/// Hook run on every layer before it is drawn
///
/// Receives the layer's list and index and must return a list holding the
/// same instances. Instances missing from the returned list leave the
/// layer: they are no longer drawn, updated or found by
/// [`Scene::get_collision`].
pub type BeforeRender =
    Box<dyn FnMut(LinkedList<InstanceId>, usize, &SceneGraph) -> LinkedList<InstanceId>>;

#[derive(Clone, Copy)]
enum Hook {
    Init,
    Update,
}

/// Layered collection of instances
pub struct Scene {
    graph: SceneGraph,
    layers: Vec<Option<LinkedList<InstanceId>>>,
    level_collisions: Vec<Rect>,
    before_render: Option<BeforeRender>,
    default_layer: usize,
    /// Instances spawned by components, waiting for their layer
    pending: Vec<(InstanceId, usize)>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::with_config(&SceneConfig::default())
    }

    /// Create an empty scene from settings
    pub fn with_config(config: &SceneConfig) -> Self {
        Self {
            graph: SceneGraph::with_config(config),
            layers: Vec::new(),
            level_collisions: Vec::new(),
            before_render: None,
            default_layer: config.default_layer,
            pending: Vec::new(),
        }
    }

    /// The instance arena
    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The instance arena, mutably
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Add an instance to the default layer
    pub fn add_instance(&mut self, instance: Instance) -> InstanceId {
        self.add_instance_to_layer(instance, self.default_layer)
    }

    /// Add an instance to `layer`, creating the layer if needed
    pub fn add_instance_to_layer(&mut self, instance: Instance, layer: usize) -> InstanceId {
        let id = self.graph.insert(instance);
        self.add_to_layer(id, layer);
        id
    }

    /// Link an instance already in the graph into `layer`
    ///
    /// An instance lives in at most one layer; it is moved if already
    /// linked elsewhere. Returns `false` for unknown instances.
    pub fn add_to_layer(&mut self, id: InstanceId, layer: usize) -> bool {
        let Some(instance) = self.graph.get_mut(id) else {
            return false;
        };
        let previous = instance.layer.replace(layer);

        if let Some(list) = previous.and_then(|p| self.layers.get_mut(p)).and_then(Option::as_mut) {
            list.remove(&id);
        }

        if self.layers.len() <= layer {
            self.layers.resize_with(layer + 1, || None);
        }
        self.layers[layer].get_or_insert_with(LinkedList::new).push(id);
        trace!("Linked {id:?} into layer {layer}");
        true
    }

    /// Instances of a layer in draw order
    pub fn layer(&self, index: usize) -> Option<&LinkedList<InstanceId>> {
        self.layers.get(index)?.as_ref()
    }

    /// Number of layer slots (including empty ones)
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Install the per-layer hook run before drawing
    pub fn set_before_render(
        &mut self,
        hook: impl FnMut(LinkedList<InstanceId>, usize, &SceneGraph) -> LinkedList<InstanceId> + 'static,
    ) {
        self.before_render = Some(Box::new(hook));
    }

    /// Remove the before-render hook
    pub fn clear_before_render(&mut self) {
        self.before_render = None;
    }

    /// Replace the level collision rectangles
    pub fn set_level_collisions(&mut self, rects: Vec<Rect>) {
        self.level_collisions = rects;
    }

    /// Use a loaded level mask
    pub fn set_level_mask(&mut self, mask: LevelMask) {
        self.set_level_collisions(mask.rects);
    }

    /// Level collision rectangles
    pub fn level_collisions(&self) -> &[Rect] {
        &self.level_collisions
    }

    /// First instance in `id`'s layer whose box overlaps `id`'s box
    ///
    /// `None` when `id` has no box, is not layered, or overlaps nothing.
    pub fn get_collision(&self, id: InstanceId) -> Option<InstanceId> {
        let layer = self.graph.get(id)?.layer?;
        self.graph.first_overlap(id, self.layer(layer)?.iter())
    }

    /// First level rectangle overlapping `id`'s box
    pub fn get_level_collision(&self, id: InstanceId) -> Option<Rect> {
        self.graph.level_overlap(id, &self.level_collisions)
    }

    /// Destroy an instance and its children
    ///
    /// Layered instances are unlinked by the next render pass; unlayered
    /// ones leave the arena immediately.
    pub fn destroy_instance(&mut self, id: InstanceId) {
        self.graph.destroy(id);
        if self.graph.get(id).is_some_and(|instance| instance.layer.is_none()) {
            self.graph.purge(id);
        }
    }

    /// Run every component's `init` hook
    pub fn init(&mut self) {
        for id in self.layered_ids() {
            self.run_hook(id, Hook::Init);
        }
        self.link_spawned();
    }

    /// Run every component's `update` hook
    pub fn update(&mut self) {
        for id in self.layered_ids() {
            self.run_hook(id, Hook::Update);
        }
        self.link_spawned();
    }

    /// Update, then draw every layer in order
    pub fn render(&mut self, renderer: &mut Renderer, camera: &Camera) -> RenderResult<()> {
        self.update();
        self.graph.purge_unlinked();

        let view = camera.view_matrix(&self.graph);

        for index in 0..self.layers.len() {
            let Some(mut list) = self.layers[index].take() else {
                continue;
            };

            if let Some(hook) = self.before_render.as_mut() {
                let before: Vec<InstanceId> = list.iter().copied().collect();
                list = hook(list, index, &self.graph);
                if list.len() != before.len() {
                    warn!(
                        "before_render changed layer {index} from {} to {} instances",
                        before.len(),
                        list.len()
                    );
                }
                self.unlink_dropped(&before, &list, index);
            }

            let graph = &mut self.graph;
            let mut result = Ok(());
            list.each(|list, id| {
                if result.is_err() {
                    return;
                }
                let alive = graph.get(id).is_some_and(|instance| !instance.destroyed);
                if !alive {
                    list.remove(&id);
                    graph.purge(id);
                    debug!("Swept destroyed instance {id:?} from layer {index}");
                    return;
                }

                let Some(transformation) = graph.transformation(id) else {
                    return;
                };
                if let Some(instance) = graph.get_mut(id) {
                    result = instance.render(&transformation, &view, renderer, camera);
                }
            });

            self.layers[index] = Some(list);
            result?;
        }
        Ok(())
    }

    /// Clear the layer of instances a hook left out of `list`
    fn unlink_dropped(&mut self, before: &[InstanceId], list: &LinkedList<InstanceId>, index: usize) {
        let kept: HashSet<InstanceId> = list.iter().copied().collect();
        for &id in before.iter().filter(|id| !kept.contains(id)) {
            let Some(instance) = self.graph.get_mut(id) else {
                continue;
            };
            if instance.layer != Some(index) {
                continue;
            }
            instance.layer = None;
            warn!("before_render dropped {id:?} from layer {index}; it is no longer layered");
            if instance.destroyed {
                self.graph.purge(id);
            }
        }
    }

    fn layered_ids(&self) -> Vec<InstanceId> {
        self.layers
            .iter()
            .flatten()
            .flat_map(LinkedList::iter)
            .copied()
            .collect()
    }

    fn run_hook(&mut self, id: InstanceId, hook: Hook) {
        let mut spawned = Vec::new();
        let count = self.graph.get(id).map_or(0, Instance::component_count);

        for index in 0..count {
            let alive = self.graph.get(id).is_some_and(|instance| !instance.destroyed);
            if !alive {
                break;
            }
            let Some(mut component) = self.graph.take_component(id, index) else {
                break;
            };

            {
                let mut ctx = ComponentContext::new(
                    id,
                    &mut self.graph,
                    &self.layers,
                    &self.level_collisions,
                    &mut spawned,
                );
                match hook {
                    Hook::Init => component.init(&mut ctx),
                    Hook::Update => component.update(&mut ctx),
                }
            }

            self.graph.restore_component(id, index, component);
        }

        self.pending.extend(spawned);
    }

    fn link_spawned(&mut self) {
        for (id, layer) in std::mem::take(&mut self.pending) {
            self.add_to_layer(id, layer);
        }
    }
}
