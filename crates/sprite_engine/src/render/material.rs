//! Materials
//!
//! A material owns a [`Shader`] and knows how to feed it: it binds the
//! program, sets per-instance uniforms, points the attributes at the
//! geometry buffers and issues the draw.

use super::{
    Geometry, Program, RenderResult, Renderer, Shader, ShaderSource, Texture, TextureError,
    TEXCOORD_SIZE, VERTEX_SIZE,
};
use crate::foundation::downcast::AsAny;
use crate::foundation::math::{Matrix4, Vector4};
use crate::scene::Camera;
use std::rc::Rc;

/// Flag enabling texture sampling in the built-in shader
pub const USE_TEXTURE: &str = "USE_TEXTURE";

/// Something that can draw a geometry
pub trait Material: AsAny {
    /// Draw `geometry` with the instance's `world` matrix
    fn render(
        &mut self,
        renderer: &mut Renderer,
        world: &Matrix4,
        geometry: &Geometry,
        camera: &Camera,
    ) -> RenderResult<()>;

    /// Whether the material can draw yet
    fn is_ready(&self) -> bool {
        true
    }

    /// Release the programs held on `renderer`
    fn release(&mut self, _renderer: &mut Renderer) {}
}

fn set_instance_uniforms(renderer: &mut Renderer, program: &Program, world: &Matrix4, camera: &Camera) {
    renderer.set_matrix4(program, "uProjection", camera.projection());
    renderer.set_matrix4(program, "uPosition", world);
}

fn draw_geometry(
    renderer: &mut Renderer,
    program: &Program,
    geometry: &Geometry,
    textured: bool,
) -> RenderResult<()> {
    let buffers = geometry.buffers(renderer)?;

    if let Some(slot) = program.attribute("aVertexPosition") {
        renderer.vertex_attrib_pointer(buffers.vertex, slot, VERTEX_SIZE);
    }
    if textured {
        if let (Some(buffer), Some(slot)) = (buffers.tex_coords, program.attribute("aTexCoords")) {
            renderer.vertex_attrib_pointer(buffer, slot, TEXCOORD_SIZE);
        }
    }

    renderer.draw_elements(buffers.index, geometry.index_len());
    Ok(())
}

/// Untextured material on the built-in shader
#[derive(Debug)]
pub struct BasicMaterial {
    shader: Shader,
}

impl Default for BasicMaterial {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicMaterial {
    /// Material on the built-in shader with no flags
    pub fn new() -> Self {
        Self::with_source(Rc::new(ShaderSource::main()))
    }

    /// Material on a custom shader source
    pub fn with_source(source: Rc<ShaderSource>) -> Self {
        Self {
            shader: Shader::new(source),
        }
    }

    /// The shader
    pub const fn shader(&self) -> &Shader {
        &self.shader
    }

    /// The shader, to toggle flags
    pub fn shader_mut(&mut self) -> &mut Shader {
        &mut self.shader
    }
}

impl Material for BasicMaterial {
    fn render(
        &mut self,
        renderer: &mut Renderer,
        world: &Matrix4,
        geometry: &Geometry,
        camera: &Camera,
    ) -> RenderResult<()> {
        let program = self.shader.use_program(renderer)?;
        set_instance_uniforms(renderer, &program, world, camera);
        draw_geometry(renderer, &program, geometry, false)
    }

    fn release(&mut self, renderer: &mut Renderer) {
        self.shader.release(renderer);
    }
}

/// Textured material with sprite-sheet animation
///
/// Draws the texture region given by its UVs, or by the current frame of
/// the playing animation. Each render advances the animation by its speed
/// and wraps to the first frame past the end.
#[derive(Debug)]
pub struct SpriteMaterial {
    shader: Shader,
    texture: Rc<Texture>,
    uvs: Vector4,
    repeat: [f32; 2],
    frame: f32,
    animation: Option<String>,
}

impl SpriteMaterial {
    /// Sprite over the whole of `texture`
    pub fn new(texture: Rc<Texture>) -> Self {
        let mut shader = Shader::new(Rc::new(ShaderSource::main()));
        shader.add_flag(USE_TEXTURE);
        Self {
            shader,
            texture,
            uvs: Vector4::new(0.0, 0.0, 1.0, 1.0),
            repeat: [1.0, 1.0],
            frame: 0.0,
            animation: None,
        }
    }

    /// Start playing a texture animation from its first frame
    ///
    /// Playing the animation that is already playing does nothing.
    pub fn play_animation(&mut self, code: &str) -> Result<(), TextureError> {
        if self.animation.as_deref() == Some(code) {
            return Ok(());
        }
        self.texture.animation(code)?;
        self.animation = Some(code.to_string());
        self.frame = 0.0;
        Ok(())
    }

    /// Stop the animation and show the static UVs again
    pub fn stop_animation(&mut self) {
        self.animation = None;
        self.frame = 0.0;
    }

    /// Code of the playing animation
    pub fn animation(&self) -> Option<&str> {
        self.animation.as_deref()
    }

    /// Current fractional frame index
    pub const fn frame(&self) -> f32 {
        self.frame
    }

    /// Texture region drawn when no animation plays
    pub fn set_uvs(&mut self, uvs: Vector4) {
        self.uvs = uvs;
    }

    /// Texture region drawn when no animation plays
    pub const fn uvs(&self) -> Vector4 {
        self.uvs
    }

    /// Tiling factor along u and v
    pub fn set_repeat(&mut self, u: f32, v: f32) {
        self.repeat = [u, v];
    }

    /// Swap the texture; a playing animation keeps its code
    pub fn set_texture(&mut self, texture: Rc<Texture>) {
        self.texture = texture;
    }

    /// The texture
    pub fn texture(&self) -> &Rc<Texture> {
        &self.texture
    }

    fn advance_animation(&mut self) -> Result<Option<Vector4>, TextureError> {
        let Some(code) = self.animation.as_deref() else {
            return Ok(None);
        };
        let animation = self.texture.animation(code)?;

        // the frame shown is the one after advancing
        #[allow(clippy::cast_precision_loss)]
        let len = animation.len() as f32;
        self.frame += animation.speed;
        if self.frame >= len {
            self.frame = 0.0;
        }
        Ok(animation.frame(self.frame))
    }
}

impl Material for SpriteMaterial {
    fn render(
        &mut self,
        renderer: &mut Renderer,
        world: &Matrix4,
        geometry: &Geometry,
        camera: &Camera,
    ) -> RenderResult<()> {
        let program = self.shader.use_program(renderer)?;
        let uvs = self.advance_animation()?.unwrap_or(self.uvs);

        set_instance_uniforms(renderer, &program, world, camera);
        renderer.set_vector4(&program, "uUV", &uvs);
        renderer.set_vector2(&program, "uRepeat", self.repeat);
        renderer.bind_texture(&self.texture, "baseTexture", program.uniform("uTexture"))?;

        draw_geometry(renderer, &program, geometry, true)
    }

    fn is_ready(&self) -> bool {
        self.texture.is_ready()
    }

    fn release(&mut self, renderer: &mut Renderer) {
        self.shader.release(renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::render::{BackendCall, HeadlessBackend, SpriteGeometry};
    use crate::scene::SceneGraph;

    fn setup() -> (Renderer, Camera, Geometry) {
        let renderer = Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default());
        let mut graph = SceneGraph::new();
        let camera = Camera::orthographic(&mut graph, 320.0, 240.0, 0.1, 100.0);
        (renderer, camera, SpriteGeometry::new(16.0, 16.0).build())
    }

    fn uv_uploads(renderer: &Renderer) -> Vec<[f32; 4]> {
        renderer
            .backend_as::<HeadlessBackend>()
            .unwrap()
            .calls()
            .iter()
            .filter_map(|call| match call {
                BackendCall::Uniform4f(_, value) => Some(*value),
                _ => None,
            })
            .collect()
    }

    fn sheet() -> Rc<Texture> {
        let mut texture = Texture::data(4, 1);
        texture
            .create_animation("walk")
            .add_frame(Vector4::new(0.0, 0.0, 0.25, 1.0))
            .add_frame(Vector4::new(0.25, 0.0, 0.25, 1.0))
            .add_frame(Vector4::new(0.5, 0.0, 0.25, 1.0));
        Rc::new(texture)
    }

    #[test]
    fn test_basic_material_draws() {
        let (mut renderer, camera, geometry) = setup();
        let mut material = BasicMaterial::new();
        material
            .render(&mut renderer, &Matrix4::identity(), &geometry, &camera)
            .unwrap();

        let backend = renderer.backend_as::<HeadlessBackend>().unwrap();
        assert_eq!(backend.draw_count(), 1);
        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::DrawElements { count: 6, .. })));
        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::UniformMatrix4(_, m) if *m == Matrix4::identity().data)));
    }

    #[test]
    fn test_sprite_material_binds_texture_and_coords() {
        let (mut renderer, camera, geometry) = setup();
        let mut material = SpriteMaterial::new(Rc::new(Texture::data(2, 2)));
        material
            .render(&mut renderer, &Matrix4::identity(), &geometry, &camera)
            .unwrap();

        assert_eq!(renderer.texture_unit("baseTexture"), Some(0));
        assert_eq!(uv_uploads(&renderer), vec![[0.0, 0.0, 1.0, 1.0]]);

        let calls = renderer.backend_as::<HeadlessBackend>().unwrap().calls();
        let pointers = calls
            .iter()
            .filter(|c| matches!(c, BackendCall::AttribPointer { .. }))
            .count();
        assert_eq!(pointers, 2);
        assert!(calls
            .iter()
            .any(|c| matches!(c, BackendCall::Uniform2f(_, [u, v]) if *u == 1.0 && *v == 1.0)));
    }

    #[test]
    fn test_animation_advances_and_wraps() {
        let (mut renderer, camera, geometry) = setup();
        let mut material = SpriteMaterial::new(sheet());
        material.play_animation("walk").unwrap();

        for _ in 0..3 {
            material
                .render(&mut renderer, &Matrix4::identity(), &geometry, &camera)
                .unwrap();
        }

        assert_eq!(
            uv_uploads(&renderer),
            vec![
                [0.25, 0.0, 0.25, 1.0],
                [0.5, 0.0, 0.25, 1.0],
                [0.0, 0.0, 0.25, 1.0],
            ]
        );
        assert!(material.frame().abs() < f32::EPSILON);
    }

    #[test]
    fn test_play_animation() {
        let mut material = SpriteMaterial::new(sheet());
        assert!(matches!(
            material.play_animation("jump"),
            Err(TextureError::AnimationNotFound(_))
        ));
        assert_eq!(material.animation(), None);

        material.play_animation("walk").unwrap();
        material.frame = 1.5;
        material.play_animation("walk").unwrap();
        assert!((material.frame() - 1.5).abs() < f32::EPSILON);

        material.stop_animation();
        assert_eq!(material.animation(), None);
    }

    #[test]
    fn test_pending_texture_is_not_ready() {
        let texture = Rc::new(Texture::pending());
        let material = SpriteMaterial::new(Rc::clone(&texture));
        assert!(!material.is_ready());
        texture.fulfill(image::RgbaImage::new(1, 1));
        assert!(material.is_ready());
    }

    #[test]
    fn test_sprite_materials_share_one_program() {
        let (mut renderer, camera, geometry) = setup();
        let mut a = SpriteMaterial::new(Rc::new(Texture::data(1, 1)));
        let mut b = SpriteMaterial::new(Rc::new(Texture::data(1, 1)));
        a.render(&mut renderer, &Matrix4::identity(), &geometry, &camera)
            .unwrap();
        b.render(&mut renderer, &Matrix4::identity(), &geometry, &camera)
            .unwrap();

        let key = a.shader.key();
        assert_eq!(renderer.programs().references(&key), 2);
        assert_eq!(renderer.backend_as::<HeadlessBackend>().unwrap().programs_linked(), 1);

        a.release(&mut renderer);
        assert_eq!(renderer.programs().references(&key), 1);
        b.release(&mut renderer);
        assert!(renderer.programs().is_empty());
    }
}
