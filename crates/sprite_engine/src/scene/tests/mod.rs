//! Scene tests driven through a headless renderer


use crate::config::RendererConfig;
use crate::foundation::math::Matrix4;
use crate::render::{Geometry, HeadlessBackend, Material, RenderResult, Renderer, SpriteGeometry};
use crate::scene::{Camera, Instance, Scene};
use std::cell::RefCell;
use std::rc::Rc;

pub(super) fn renderer() -> Renderer {
    crate::foundation::logging::init_for_tests();
    Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default())
}

/// Orthographic camera whose node lives in the scene's own graph
pub(super) fn camera(scene: &mut Scene) -> Camera {
    Camera::orthographic(scene.graph_mut(), 320.0, 240.0, 0.1, 100.0)
}

pub(super) fn quad() -> Rc<Geometry> {
    Rc::new(SpriteGeometry::new(8.0, 8.0).build())
}

/// Draw log shared by recording materials
pub(super) type DrawLog = Rc<RefCell<Vec<&'static str>>>;

/// Material that records its name instead of drawing
pub(super) struct Recorder {
    name: &'static str,
    log: DrawLog,
}

impl Material for Recorder {
    fn render(
        &mut self,
        _renderer: &mut Renderer,
        _world: &Matrix4,
        _geometry: &Geometry,
        _camera: &Camera,
    ) -> RenderResult<()> {
        self.log.borrow_mut().push(self.name);
        Ok(())
    }
}

pub(super) fn recorded(name: &'static str, log: &DrawLog, y: f32, z: f32) -> Instance {
    Instance::with_render(
        quad(),
        Recorder {
            name,
            log: Rc::clone(log),
        },
    )
    .with_position(0.0, y, z)
}
