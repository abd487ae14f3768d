//! Scene management system
//!
//! ## Architecture
//!
//! ```text
//! Scene (layers, frame passes, level collisions)
//!      ↓
//! SceneGraph (instance arena, lazy world transforms)
//!      ↓
//! Instance (transform, components, geometry + material)
//! ```
//!
//! - Instances are addressed by [`InstanceId`] and owned by the graph
//! - Transform mutations mark the subtree dirty; matrices rebuild on read
//! - Components hook into init, update, render and destroy
//! - Collision is box against box within a layer, or box against level rects

mod camera;
mod collision;
mod component;
mod instance;
mod scene_graph;
mod scene_manager;

#[cfg(test)]
mod tests;

pub use camera::Camera;
pub use collision::{BoxCollision, ParsePivotError, Pivot, Rect};
pub use component::{Component, ComponentContext};
pub use instance::{Instance, InstanceId, Transform};
pub use scene_graph::{GraphId, SceneError, SceneGraph};
pub use scene_manager::{BeforeRender, Scene};
