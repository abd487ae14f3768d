//! # Sprite Engine
//!
//! A small 2D rendering engine built around a scene graph with lazily
//! rebuilt transforms and a renderer that reuses compiled shader variants.
//!
//! ## Features
//!
//! - **Scene Graph**: parent/child instances, quaternion rotations, world
//!   matrices rebuilt only when something moved
//! - **Layers**: per-layer linked lists with removal-safe traversal and an
//!   in-place stable sort for draw ordering
//! - **Shader Variants**: GLSL reflection plus a program cache keyed by
//!   shader and flag set, shared by reference count
//! - **State Cache**: redundant program and texture binds are skipped
//! - **Headless Backend**: every GPU call can be recorded instead of issued
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sprite_engine::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut renderer = Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default());
//!     let mut scene = Scene::new();
//!     let camera = Camera::orthographic(scene.graph_mut(), 320.0, 240.0, 0.1, 100.0);
//!
//!     let texture = Rc::new(Texture::open("hero.png")?);
//!     let geometry = Rc::new(SpriteGeometry::new(16.0, 16.0).with_pivot(Pivot::BM).build());
//!     scene.add_instance(
//!         Instance::with_render(geometry, SpriteMaterial::new(texture))
//!             .with_collision(BoxCollision::new(12.0, 4.0, Pivot::BM)),
//!     );
//!
//!     scene.init();
//!     renderer.clear();
//!     scene.render(&mut renderer, &camera)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig, LevelMask, RendererConfig, SceneConfig},
        foundation::{
            collections::LinkedList,
            math::{Euler, GimbalOrder, Matrix3, Matrix4, Quaternion, Vector3, Vector4},
        },
        render::{
            Animation2D, BasicMaterial, Geometry, GraphicsBackend, HeadlessBackend, Material,
            RenderError, RenderResult, Renderer, Shader, ShaderSource, SpriteGeometry,
            SpriteMaterial, Texture,
        },
        scene::{
            BoxCollision, Camera, Component, ComponentContext, Instance, InstanceId, Pivot, Rect,
            Scene, SceneGraph,
        },
    };
}
