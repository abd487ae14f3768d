//! Scene graph arena
//!
//! [`SceneGraph`] owns every [`Instance`] in a slot map. Parents own an
//! ordered list of child ids; children keep a non-owning parent id. All
//! transform mutations go through the graph so that one call marks the
//! instance and its whole subtree dirty exactly once.
//!
//! World transforms use the row-vector convention:
//!
//! ```text
//! world = Scale · Rotation · Translation · parent_world
//! ```
//!
//! and are cached per instance until the next invalidation.

use super::component::{Component, Vacant};
use super::{Instance, InstanceId, Rect, Transform};
use crate::config::SceneConfig;
use crate::foundation::math::{Matrix4, Quaternion, Vector3, Vector4};
use log::{debug, trace, warn};
use slotmap::SlotMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Errors raised by structural graph edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The id does not refer to a live instance
    #[error("Instance not found: {0:?}")]
    InstanceNotFound(InstanceId),

    /// Parenting would make an instance its own ancestor
    #[error("Cannot parent {child:?} under {parent:?}: would create a cycle")]
    CyclicParent {
        /// Requested parent
        parent: InstanceId,
        /// Requested child
        child: InstanceId,
    },
}

/// Identity of a scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Arena of scene-graph nodes
#[derive(Debug)]
pub struct SceneGraph {
    id: GraphId,
    instances: SlotMap<InstanceId, Instance>,
    pixel_snap: bool,
    /// Destroyed instances that were not linked into a layer
    unlinked_dead: Vec<InstanceId>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::with_config(&SceneConfig::default())
    }
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of this graph
    pub const fn id(&self) -> GraphId {
        self.id
    }

    /// Create an empty graph using scene settings
    pub fn with_config(config: &SceneConfig) -> Self {
        Self {
            id: GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)),
            instances: SlotMap::with_key(),
            pixel_snap: config.pixel_snap,
            unlinked_dead: Vec::new(),
        }
    }

    /// Truncate translations to whole units when building transforms
    pub fn set_pixel_snap(&mut self, enabled: bool) {
        if self.pixel_snap != enabled {
            self.pixel_snap = enabled;
            let roots: Vec<InstanceId> = self
                .instances
                .iter()
                .filter(|(_, instance)| instance.parent.is_none())
                .map(|(id, _)| id)
                .collect();
            for id in roots {
                self.emit_needs_update(id);
            }
        }
    }

    /// Add an instance and return its id
    pub fn insert(&mut self, instance: Instance) -> InstanceId {
        let id = self.instances.insert(instance);
        trace!("Inserted instance {id:?}");
        id
    }

    /// Remove an instance from the arena
    ///
    /// Its children are detached first and keep their world placement.
    pub fn remove(&mut self, id: InstanceId) -> Option<Instance> {
        let children = self.instances.get(id)?.children.clone();
        for child in children {
            self.detach(child);
        }
        self.detach(id);
        self.instances.remove(id)
    }

    /// Detach from the parent, dropping the link outright if the world
    /// placement cannot be kept
    fn detach(&mut self, id: InstanceId) {
        let Err(err) = self.remove_parent(id) else {
            return;
        };
        warn!("Unlinking {id:?} without keeping its placement: {err}");
        let Some(parent) = self.instances.get_mut(id).and_then(|i| i.parent.take()) else {
            return;
        };
        if let Some(parent) = self.instances.get_mut(parent) {
            parent.children.retain(|&c| c != id);
        }
        self.emit_needs_update(id);
    }

    /// Remove destroyed instances that no layer will sweep
    ///
    /// Returns how many left the arena.
    pub(crate) fn purge_unlinked(&mut self) -> usize {
        let mut purged = 0;
        for id in std::mem::take(&mut self.unlinked_dead) {
            let unlinked = self
                .instances
                .get(id)
                .is_some_and(|instance| instance.destroyed && instance.layer.is_none());
            if unlinked {
                self.remove(id);
                purged += 1;
            }
        }
        if purged > 0 {
            debug!("Purged {purged} unlinked destroyed instances");
        }
        purged
    }

    /// Remove a destroyed instance and any destroyed, unlayered descendants
    pub(crate) fn purge(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get(id) else {
            return;
        };
        let children = instance.children.clone();
        for child in children {
            let orphan = self
                .instances
                .get(child)
                .is_some_and(|c| c.destroyed && c.layer.is_none());
            if orphan {
                self.purge(child);
            }
        }
        self.remove(id);
    }

    /// Whether `id` refers to a live instance
    pub fn contains(&self, id: InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Borrow an instance
    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    /// Borrow an instance mutably
    ///
    /// The local transform is read-only here; use the graph's transform
    /// methods so the change propagates.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id)
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Iterate over all instances
    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.instances.iter()
    }

    // ------------------------------------------------------------------
    // Transform access
    // ------------------------------------------------------------------

    /// World transform, rebuilt only when the instance is dirty
    pub fn transformation(&self, id: InstanceId) -> Option<Matrix4> {
        let instance = self.instances.get(id)?;
        if !instance.needs_update.get() {
            return Some(instance.transform.get());
        }

        let Transform {
            position,
            rotation,
            scale,
        } = &instance.local;

        let mut matrix = Matrix4::from_scale(scale.x, scale.y, scale.z);
        matrix.multiply(&rotation.rotation_matrix());
        if self.pixel_snap {
            matrix.translate(position.x.trunc(), position.y.trunc(), position.z.trunc());
        } else {
            matrix.translate(position.x, position.y, position.z);
        }

        if let Some(parent) = instance.parent.and_then(|p| self.transformation(p)) {
            matrix.multiply(&parent);
        }

        instance.transform.set(matrix);
        instance.needs_update.set(false);
        instance.rebuilds.set(instance.rebuilds.get() + 1);
        Some(matrix)
    }

    /// Position in world space
    ///
    /// Roots report their local position. Parented instances transform
    /// their local position through the parent's world transform and cache
    /// the result until the next invalidation.
    pub fn global_position(&self, id: InstanceId) -> Option<Vector3> {
        let instance = self.instances.get(id)?;
        let Some(parent) = instance.parent else {
            return Some(instance.local.position);
        };

        if let Some(cached) = instance.global_position.get() {
            return Some(cached.xyz());
        }

        let parent_matrix = self.transformation(parent)?;
        let global = parent_matrix.multiply_vector(&Vector4::from_point(&instance.local.position));
        instance.global_position.set(Some(global));
        Some(global.xyz())
    }

    /// Rotation in world space, `local · parent_global`
    pub fn global_rotation(&self, id: InstanceId) -> Option<Quaternion> {
        let instance = self.instances.get(id)?;
        let mut rotation = instance.local.rotation;
        if let Some(parent) = instance.parent {
            rotation.multiply_quaternion(&self.global_rotation(parent)?);
        }
        Some(rotation)
    }

    /// Invalidation counter of an instance
    pub fn revision(&self, id: InstanceId) -> Option<u64> {
        self.instances.get(id).map(|instance| instance.revision)
    }

    /// Mark an instance and all of its descendants dirty
    pub fn emit_needs_update(&mut self, id: InstanceId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(instance) = self.instances.get_mut(current) {
                instance.needs_update.set(true);
                instance.global_position.set(None);
                instance.revision += 1;
                pending.extend_from_slice(&instance.children);
            }
        }
    }

    /// Mutate the local transform, then invalidate once
    ///
    /// Returns `None` when the instance does not exist.
    pub fn modify<R>(&mut self, id: InstanceId, f: impl FnOnce(&mut Transform) -> R) -> Option<R> {
        let result = f(&mut self.instances.get_mut(id)?.local);
        self.emit_needs_update(id);
        Some(result)
    }

    /// Set the local position
    pub fn set_position(&mut self, id: InstanceId, x: f32, y: f32, z: f32) {
        self.modify(id, |t| {
            t.position.set(x, y, z);
        });
    }

    /// Offset the local position
    pub fn translate(&mut self, id: InstanceId, x: f32, y: f32, z: f32) {
        self.modify(id, |t| {
            t.position.add(x, y, z);
        });
    }

    /// Set the local scale
    pub fn set_scale(&mut self, id: InstanceId, x: f32, y: f32, z: f32) {
        self.modify(id, |t| {
            t.scale.set(x, y, z);
        });
    }

    /// Replace the local rotation
    pub fn set_rotation(&mut self, id: InstanceId, rotation: Quaternion) {
        self.modify(id, |t| t.rotation = rotation);
    }

    /// Rotate around the X axis
    pub fn rotate_x(&mut self, id: InstanceId, radians: f32) {
        self.modify(id, |t| {
            t.rotation.rotate_x(radians);
        });
    }

    /// Rotate around the Y axis
    pub fn rotate_y(&mut self, id: InstanceId, radians: f32) {
        self.modify(id, |t| {
            t.rotation.rotate_y(radians);
        });
    }

    /// Rotate around the Z axis
    pub fn rotate_z(&mut self, id: InstanceId, radians: f32) {
        self.modify(id, |t| {
            t.rotation.rotate_z(radians);
        });
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    /// Whether `ancestor` is `id`'s parent, grandparent, ...
    pub fn is_ancestor(&self, ancestor: InstanceId, id: InstanceId) -> bool {
        let mut current = self.instances.get(id).and_then(|i| i.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.instances.get(parent).and_then(|i| i.parent);
        }
        false
    }

    /// Parent `child` under `parent`, keeping its world placement
    ///
    /// The child is first detached from any current parent. Its position is
    /// then mapped through the inverse of the parent's world transform and
    /// its rotation multiplied by the inverse of the parent's world rotation.
    /// For an unrotated, unscaled root parent this is simply an offset by the
    /// parent's position.
    pub fn add_child(&mut self, parent: InstanceId, child: InstanceId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::InstanceNotFound(parent));
        }
        if !self.contains(child) {
            return Err(SceneError::InstanceNotFound(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::CyclicParent { parent, child });
        }

        self.remove_parent(child)?;

        let world = self.instances[child].local;
        let parent_matrix = self
            .transformation(parent)
            .ok_or(SceneError::InstanceNotFound(parent))?;
        let parent_rotation = self
            .global_rotation(parent)
            .ok_or(SceneError::InstanceNotFound(parent))?;

        let position = if let Some(inverse) = parent_matrix.invert() {
            inverse
                .multiply_vector(&Vector4::from_point(&world.position))
                .xyz()
        } else {
            debug!("Parent {parent:?} has a singular transform, offsetting child by position only");
            let origin = parent_matrix.translation();
            Vector3::new(
                world.position.x - origin.x,
                world.position.y - origin.y,
                world.position.z - origin.z,
            )
        };

        let mut rotation = world.rotation;
        rotation.multiply_quaternion(&parent_rotation.inverse());

        self.instances[parent].children.push(child);
        let instance = &mut self.instances[child];
        instance.parent = Some(parent);
        instance.local.position = position;
        instance.local.rotation.copy(&rotation);

        self.emit_needs_update(child);
        Ok(())
    }

    /// Detach from the parent, converting the local transform to world space
    ///
    /// Does nothing for root instances.
    pub fn remove_parent(&mut self, child: InstanceId) -> Result<(), SceneError> {
        let Some(parent) = self
            .instances
            .get(child)
            .ok_or(SceneError::InstanceNotFound(child))?
            .parent
        else {
            return Ok(());
        };

        let (Some(position), Some(rotation)) =
            (self.global_position(child), self.global_rotation(child))
        else {
            return Err(SceneError::InstanceNotFound(child));
        };

        if let Some(parent) = self.instances.get_mut(parent) {
            parent.children.retain(|&c| c != child);
        }

        let instance = &mut self.instances[child];
        instance.parent = None;
        instance.local.position = position;
        instance.local.rotation.copy(&rotation);

        self.emit_needs_update(child);
        Ok(())
    }

    /// Detach `child` if `parent` is its parent
    ///
    /// Returns whether anything was detached.
    pub fn remove_child(&mut self, parent: InstanceId, child: InstanceId) -> bool {
        let is_child = self
            .instances
            .get(child)
            .is_some_and(|c| c.is_parent(parent));
        is_child && self.remove_parent(child).is_ok()
    }

    // ------------------------------------------------------------------
    // Components and lifecycle
    // ------------------------------------------------------------------

    /// Attach a component to an existing instance
    pub fn add_component(&mut self, id: InstanceId, component: impl Component) -> bool {
        match self.instances.get_mut(id) {
            Some(instance) => {
                instance.add_component(component);
                true
            }
            None => false,
        }
    }

    /// First component of type `T` on an instance
    pub fn get_component<T: Component>(&self, id: InstanceId) -> Option<&T> {
        self.instances.get(id)?.get_component::<T>()
    }

    pub(crate) fn take_component(&mut self, id: InstanceId, index: usize) -> Option<Box<dyn Component>> {
        let slot = self.instances.get_mut(id)?.components.get_mut(index)?;
        Some(std::mem::replace(slot, Box::new(Vacant)))
    }

    pub(crate) fn restore_component(&mut self, id: InstanceId, index: usize, mut component: Box<dyn Component>) {
        match self.instances.get_mut(id) {
            Some(instance) if !instance.destroyed => {
                if let Some(slot) = instance.components.get_mut(index) {
                    *slot = component;
                }
            }
            _ => component.destroy(id),
        }
    }

    /// Destroy an instance and, recursively, its children
    ///
    /// Runs every component's destroy hook and releases the instance's
    /// components, geometry and material. The node stays in the arena,
    /// flagged as destroyed, until the scene's next render pass removes it,
    /// whether or not it is linked into a layer.
    pub fn destroy(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        if instance.destroyed {
            return;
        }

        instance.destroyed = true;
        if instance.layer.is_none() {
            self.unlinked_dead.push(id);
        }
        let mut components = std::mem::take(&mut instance.components);
        instance.geometry = None;
        instance.material = None;
        let children = instance.children.clone();

        for component in &mut components {
            component.destroy(id);
        }
        for child in children {
            self.destroy(child);
        }
        debug!("Destroyed instance {id:?}");
    }

    // ------------------------------------------------------------------
    // Collision queries
    // ------------------------------------------------------------------

    /// World-space collision rectangle of an instance
    pub fn collision_bounds(&self, id: InstanceId) -> Option<Rect> {
        let collision = self.instances.get(id)?.collision.as_ref()?;
        let origin = self.global_position(id)?;
        Some(collision.bounds_at(&origin))
    }

    /// Whether two distinct instances' boxes overlap
    ///
    /// An instance never overlaps itself; instances without a box never
    /// overlap anything.
    pub fn overlaps(&self, a: InstanceId, b: InstanceId) -> bool {
        if a == b {
            return false;
        }
        match (self.collision_bounds(a), self.collision_bounds(b)) {
            (Some(ra), Some(rb)) => ra.overlaps(&rb),
            _ => false,
        }
    }

    /// First candidate, other than `id`, whose box overlaps `id`'s
    pub fn first_overlap<'a>(
        &self,
        id: InstanceId,
        candidates: impl IntoIterator<Item = &'a InstanceId>,
    ) -> Option<InstanceId> {
        let bounds = self.collision_bounds(id)?;
        candidates.into_iter().copied().find(|&other| {
            other != id
                && self
                    .instances
                    .get(other)
                    .is_some_and(|instance| !instance.destroyed)
                && self
                    .collision_bounds(other)
                    .is_some_and(|rect| rect.overlaps(&bounds))
        })
    }

    /// First rectangle of `rects` overlapping `id`'s box
    pub fn level_overlap(&self, id: InstanceId, rects: &[Rect]) -> Option<Rect> {
        let bounds = self.collision_bounds(id)?;
        rects.iter().copied().find(|rect| bounds.overlaps(rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{BoxCollision, Pivot};
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_root_globals_equal_locals() {
        let mut graph = SceneGraph::new();
        let mut rotation = Quaternion::identity();
        rotation.rotate_z(0.3);
        let id = graph.insert(Instance::new().with_position(1.0, 2.0, 3.0).with_rotation(rotation));

        assert_eq!(graph.global_position(id), Some(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(graph.global_rotation(id), Some(rotation));
    }

    #[test]
    fn test_transformation_is_cached() {
        let mut graph = SceneGraph::new();
        let id = graph.insert(Instance::new().with_position(5.0, 0.0, 0.0));

        let first = graph.transformation(id).unwrap();
        let second = graph.transformation(id).unwrap();
        assert_eq!(first, second);
        assert_eq!(graph.get(id).unwrap().rebuild_count(), 1);

        graph.translate(id, 1.0, 0.0, 0.0);
        assert!(graph.get(id).unwrap().needs_update());
        let third = graph.transformation(id).unwrap();
        assert_eq!(graph.get(id).unwrap().rebuild_count(), 2);
        assert_relative_eq!(third.translation(), Vector3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_dirty_propagates_to_all_descendants() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(Instance::new());
        let child = graph.insert(Instance::new());
        let grandchild = graph.insert(Instance::new());
        graph.add_child(root, child).unwrap();
        graph.add_child(child, grandchild).unwrap();

        for id in [root, child, grandchild] {
            graph.transformation(id);
            assert!(!graph.get(id).unwrap().needs_update());
        }

        graph.set_position(root, 3.0, 0.0, 0.0);
        for id in [root, child, grandchild] {
            assert!(graph.get(id).unwrap().needs_update());
        }
        assert_relative_eq!(
            graph.global_position(grandchild).unwrap(),
            Vector3::new(3.0, 0.0, 0.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_modify_invalidates_once() {
        let mut graph = SceneGraph::new();
        let id = graph.insert(Instance::new());
        let before = graph.revision(id).unwrap();

        graph.modify(id, |t| {
            t.position.set(1.0, 1.0, 0.0);
            t.scale.set(2.0, 2.0, 1.0);
            t.rotation.rotate_z(0.5);
        });

        assert_eq!(graph.revision(id).unwrap(), before + 1);
    }

    #[test]
    fn test_add_child_offsets_by_parent_position() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(Instance::new().with_position(10.0, 5.0, 0.0));
        let child = graph.insert(Instance::new().with_position(12.0, 7.0, 0.0));

        graph.add_child(parent, child).unwrap();

        assert_relative_eq!(
            graph.get(child).unwrap().position(),
            Vector3::new(2.0, 2.0, 0.0),
            epsilon = EPSILON
        );
        assert_relative_eq!(
            graph.global_position(child).unwrap(),
            Vector3::new(12.0, 7.0, 0.0),
            epsilon = EPSILON
        );
        assert!(graph.get(child).unwrap().is_parent(parent));
        assert_eq!(graph.get(parent).unwrap().children(), &[child]);
    }

    #[test]
    fn test_add_child_then_remove_parent_round_trip() {
        let mut graph = SceneGraph::new();
        let mut parent_rotation = Quaternion::identity();
        parent_rotation.rotate_z(FRAC_PI_2).rotate_x(0.4);
        let parent = graph.insert(
            Instance::new()
                .with_position(-4.0, 9.0, 1.0)
                .with_rotation(parent_rotation)
                .with_scale(2.0, 2.0, 2.0),
        );

        let mut child_rotation = Quaternion::identity();
        child_rotation.rotate_y(0.7);
        let child = graph.insert(
            Instance::new()
                .with_position(3.0, -1.0, 2.0)
                .with_rotation(child_rotation),
        );

        graph.add_child(parent, child).unwrap();
        assert_relative_eq!(
            graph.global_position(child).unwrap(),
            Vector3::new(3.0, -1.0, 2.0),
            epsilon = EPSILON
        );
        assert_relative_eq!(graph.global_rotation(child).unwrap(), child_rotation, epsilon = EPSILON);

        graph.remove_parent(child).unwrap();
        let instance = graph.get(child).unwrap();
        assert!(instance.parent().is_none());
        assert_relative_eq!(instance.position(), Vector3::new(3.0, -1.0, 2.0), epsilon = EPSILON);
        assert_relative_eq!(*instance.rotation(), child_rotation, epsilon = EPSILON);
        assert!(graph.get(parent).unwrap().children().is_empty());
    }

    #[test]
    fn test_child_follows_parent() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(Instance::new());
        let child = graph.insert(Instance::new().with_position(1.0, 0.0, 0.0));
        graph.add_child(parent, child).unwrap();

        graph.rotate_z(parent, FRAC_PI_2);
        let world = graph.transformation(child).unwrap();
        let global = graph.global_position(child).unwrap();

        assert_relative_eq!(world.translation(), global, epsilon = EPSILON);
        assert_relative_eq!(global.x, 0.0, epsilon = EPSILON);
        assert_relative_eq!(global.y.abs(), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_reparenting_detaches_from_old_parent() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Instance::new().with_position(1.0, 0.0, 0.0));
        let b = graph.insert(Instance::new().with_position(0.0, 1.0, 0.0));
        let child = graph.insert(Instance::new().with_position(2.0, 2.0, 0.0));

        graph.add_child(a, child).unwrap();
        graph.add_child(b, child).unwrap();

        assert!(graph.get(a).unwrap().children().is_empty());
        assert_eq!(graph.get(b).unwrap().children(), &[child]);
        assert_relative_eq!(
            graph.global_position(child).unwrap(),
            Vector3::new(2.0, 2.0, 0.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_cycles_rejected() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Instance::new());
        let b = graph.insert(Instance::new());
        graph.add_child(a, b).unwrap();

        assert_eq!(
            graph.add_child(b, a),
            Err(SceneError::CyclicParent { parent: b, child: a })
        );
        assert!(graph.add_child(a, a).is_err());
    }

    #[test]
    fn test_remove_child_requires_parent() {
        let mut graph = SceneGraph::new();
        let a = graph.insert(Instance::new());
        let b = graph.insert(Instance::new());
        let c = graph.insert(Instance::new());
        graph.add_child(a, b).unwrap();

        assert!(!graph.remove_child(c, b));
        assert!(graph.remove_child(a, b));
        assert!(graph.get(b).unwrap().parent().is_none());
    }

    #[test]
    fn test_pixel_snap_truncates_translation() {
        let mut graph = SceneGraph::with_config(&SceneConfig::default().with_pixel_snap(true));
        let id = graph.insert(Instance::new().with_position(3.7, -2.4, 0.0));

        let snapped = graph.transformation(id).unwrap().translation();
        assert_eq!(snapped, Vector3::new(3.0, -2.0, 0.0));

        graph.set_pixel_snap(false);
        let exact = graph.transformation(id).unwrap().translation();
        assert_relative_eq!(exact, Vector3::new(3.7, -2.4, 0.0));
    }

    #[test]
    fn test_instance_never_overlaps_itself() {
        let mut graph = SceneGraph::new();
        let id = graph.insert(Instance::new().with_collision(BoxCollision::new(4.0, 4.0, Pivot::M)));
        assert!(!graph.overlaps(id, id));
        assert_eq!(graph.first_overlap(id, [id].iter()), None);
    }

    #[test]
    fn test_collision_uses_global_position() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(Instance::new().with_position(100.0, 0.0, 0.0));
        let child = graph.insert(
            Instance::new()
                .with_position(100.0, 0.0, 0.0)
                .with_collision(BoxCollision::new(2.0, 2.0, Pivot::M)),
        );
        let other = graph.insert(
            Instance::new()
                .with_position(100.5, 0.0, 0.0)
                .with_collision(BoxCollision::new(2.0, 2.0, Pivot::M)),
        );
        graph.add_child(parent, child).unwrap();

        assert!(graph.overlaps(child, other));
        assert_eq!(graph.first_overlap(child, [child, other].iter()), Some(other));
    }

    #[test]
    fn test_remove_keeps_children_in_place() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(Instance::new().with_position(5.0, 5.0, 0.0));
        let child = graph.insert(Instance::new().with_position(6.0, 6.0, 0.0));
        graph.add_child(parent, child).unwrap();

        assert!(graph.remove(parent).is_some());
        assert!(!graph.contains(parent));
        assert!(graph.get(child).unwrap().parent().is_none());
        assert_relative_eq!(
            graph.get(child).unwrap().position(),
            Vector3::new(6.0, 6.0, 0.0),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_purge_unlinked_skips_layered_and_live() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(Instance::new());
        let child = graph.insert(Instance::new());
        graph.add_child(parent, child).unwrap();
        let layered = graph.insert(Instance::new());
        graph.get_mut(layered).unwrap().layer = Some(1);
        let live = graph.insert(Instance::new());

        graph.destroy(child);
        graph.destroy(layered);
        assert_eq!(graph.purge_unlinked(), 1);

        assert!(!graph.contains(child));
        assert!(graph.get(parent).unwrap().children.is_empty());
        assert!(graph.contains(layered));
        assert!(graph.contains(live));
        assert_eq!(graph.purge_unlinked(), 0);
    }
}
