//! Renderer - backend owner and GL state cache
//!
//! The renderer remembers the bound program and, for that program, which
//! texture sits in each named texture slot and on which unit. Redundant
//! program switches and texture binds never reach the backend.

use super::shader::{Program, ProgramCache, ProgramKey, ShaderSource};
use super::texture::{Texture, TextureId};
use super::{
    BufferHandle, ClearFlags, GraphicsBackend, ProgramHandle, RenderError, RenderResult,
    UniformLocation,
};
use crate::config::RendererConfig;
use crate::foundation::math::{Matrix4, Vector4};
use log::{debug, trace};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a renderer; GPU resources are cached per renderer id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(u64);

static NEXT_RENDERER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy)]
struct BoundTexture {
    texture: TextureId,
    unit: u32,
}

/// High-level renderer over a [`GraphicsBackend`]
pub struct Renderer {
    id: RendererId,
    backend: Box<dyn GraphicsBackend>,
    programs: ProgramCache,
    config: RendererConfig,
    program: Option<ProgramHandle>,
    textures: HashMap<String, BoundTexture>,
    texture_units: u32,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("id", &self.id)
            .field("programs", &self.programs.len())
            .field("program", &self.program)
            .field("textures", &self.textures.len())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Create a renderer over `backend`
    pub fn new(backend: Box<dyn GraphicsBackend>, config: RendererConfig) -> Self {
        let id = RendererId(NEXT_RENDERER_ID.fetch_add(1, Ordering::Relaxed));
        debug!("Created renderer {id:?} ({}x{})", config.width, config.height);
        Self {
            id,
            backend,
            programs: ProgramCache::new(),
            config,
            program: None,
            textures: HashMap::new(),
            texture_units: 0,
        }
    }

    /// Identity of this renderer
    pub const fn id(&self) -> RendererId {
        self.id
    }

    /// Renderer settings
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The backend
    pub fn backend(&self) -> &dyn GraphicsBackend {
        self.backend.as_ref()
    }

    /// The backend, mutably
    pub fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    /// The backend as its concrete type
    pub fn backend_as<B: GraphicsBackend + 'static>(&self) -> Option<&B> {
        self.backend.as_any().downcast_ref::<B>()
    }

    /// The backend as its concrete type, mutably
    pub fn backend_as_mut<B: GraphicsBackend + 'static>(&mut self) -> Option<&mut B> {
        self.backend.as_any_mut().downcast_mut::<B>()
    }

    /// The program cache
    pub const fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    // ------------------------------------------------------------------
    // Programs
    // ------------------------------------------------------------------

    /// Take a reference on the program for `source` + `flags`
    pub fn acquire_program(
        &mut self,
        source: &ShaderSource,
        flags: &BTreeSet<String>,
    ) -> RenderResult<Rc<Program>> {
        Ok(self.programs.acquire(self.backend.as_mut(), source, flags)?)
    }

    /// Cached program, without taking a reference
    pub fn program(&self, key: &ProgramKey) -> Option<Rc<Program>> {
        self.programs.get(key)
    }

    /// Drop a reference taken with [`Renderer::acquire_program`]
    pub fn release_program(&mut self, key: &ProgramKey) {
        let handle = self.programs.get(key).map(|p| p.handle());
        if self.programs.release(self.backend.as_mut(), key) && handle == self.program {
            self.program = None;
        }
    }

    /// Currently bound program
    pub const fn current_program(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Bind `program` unless it already is
    ///
    /// On a switch, enables exactly the program's attribute slots, disables
    /// every other slot below the highest attribute count seen, and forgets
    /// the texture-slot bindings. Returns whether a switch happened.
    pub fn switch_program(&mut self, program: &Program) -> bool {
        if self.program == Some(program.handle()) {
            return false;
        }

        self.program = Some(program.handle());
        self.backend.use_program(program.handle());

        let slots = program.attribute_slots();
        let highest = slots.last().map_or(0, |s| *s as usize + 1);
        let limit = self.programs.max_attributes().max(highest);
        for slot in (0u32..).take(limit) {
            if slots.contains(&slot) {
                self.backend.enable_vertex_attrib(slot);
            } else {
                self.backend.disable_vertex_attrib(slot);
            }
        }

        self.textures.clear();
        self.texture_units = 0;
        trace!("Switched to program {:?}", program.handle());
        true
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    /// Bind `texture` to the named slot of the current program
    ///
    /// A new slot takes the next free texture unit; rebinding the texture a
    /// slot already holds does nothing. `uniform` is the sampler to point at
    /// the unit, if the program uses one.
    pub fn bind_texture(
        &mut self,
        texture: &Texture,
        slot: &str,
        uniform: Option<UniformLocation>,
    ) -> RenderResult<()> {
        let unit = match self.textures.get(slot) {
            Some(bound) if bound.texture == texture.id() && !texture.needs_upload(self.id) => {
                return Ok(());
            }
            Some(bound) => bound.unit,
            None => {
                if self.texture_units >= self.config.max_texture_units {
                    return Err(RenderError::TextureUnitsExhausted(self.config.max_texture_units));
                }
                self.texture_units += 1;
                self.texture_units - 1
            }
        };

        let handle = texture.upload(self)?;
        self.backend.active_texture(unit);
        self.backend.bind_texture(handle);
        if let Some(location) = uniform {
            self.backend
                .uniform1i(location, i32::try_from(unit).unwrap_or(i32::MAX));
        }
        self.textures.insert(
            slot.to_string(),
            BoundTexture {
                texture: texture.id(),
                unit,
            },
        );
        Ok(())
    }

    /// Texture unit assigned to a slot of the current program
    pub fn texture_unit(&self, slot: &str) -> Option<u32> {
        self.textures.get(slot).map(|bound| bound.unit)
    }

    // ------------------------------------------------------------------
    // Uniforms
    // ------------------------------------------------------------------

    /// Set a `mat4` uniform if the program has it
    pub fn set_matrix4(&mut self, program: &Program, name: &str, value: &Matrix4) {
        if let Some(location) = program.uniform(name) {
            self.backend.uniform_matrix4(location, &value.data);
        }
    }

    /// Set a `vec4` uniform if the program has it
    pub fn set_vector4(&mut self, program: &Program, name: &str, value: &Vector4) {
        if let Some(location) = program.uniform(name) {
            self.backend.uniform4f(location, value.to_array());
        }
    }

    /// Set a `vec2` uniform if the program has it
    pub fn set_vector2(&mut self, program: &Program, name: &str, value: [f32; 2]) {
        if let Some(location) = program.uniform(name) {
            self.backend.uniform2f(location, value);
        }
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Clear color and depth with the configured clear color
    pub fn clear(&mut self) {
        let [r, g, b] = self.config.clear_color;
        self.clear_with(r, g, b);
    }

    /// Clear color and depth with an explicit color
    pub fn clear_with(&mut self, r: f32, g: f32, b: f32) {
        self.backend
            .clear([r, g, b, 1.0], ClearFlags::COLOR | ClearFlags::DEPTH);
    }

    /// Point an attribute slot at a float buffer
    pub fn vertex_attrib_pointer(&mut self, buffer: BufferHandle, slot: u32, size: u32) {
        self.backend.vertex_attrib_pointer(buffer, slot, size);
    }

    /// Draw indexed triangles
    pub fn draw_elements(&mut self, index_buffer: BufferHandle, count: u32) {
        self.backend.draw_elements(index_buffer, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{BackendCall, HeadlessBackend};

    fn renderer() -> Renderer {
        Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default())
    }

    fn headless(renderer: &mut Renderer) -> &mut HeadlessBackend {
        renderer.backend_as_mut::<HeadlessBackend>().unwrap()
    }

    fn textured() -> BTreeSet<String> {
        ["USE_TEXTURE".to_string()].into()
    }

    #[test]
    fn test_renderer_ids_are_unique() {
        assert_ne!(renderer().id(), renderer().id());
    }

    #[test]
    fn test_switch_program_is_cached() {
        let mut renderer = renderer();
        let program = renderer
            .acquire_program(&ShaderSource::main(), &BTreeSet::new())
            .unwrap();

        assert!(renderer.switch_program(&program));
        assert!(!renderer.switch_program(&program));

        let uses = headless(&mut renderer)
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::UseProgram(_)))
            .count();
        assert_eq!(uses, 1);
    }

    #[test]
    fn test_switch_program_toggles_attribute_slots() {
        let mut renderer = renderer();
        let source = ShaderSource::main();
        let plain = renderer.acquire_program(&source, &BTreeSet::new()).unwrap();
        let sprite = renderer.acquire_program(&source, &textured()).unwrap();

        renderer.switch_program(&sprite);
        assert_eq!(
            headless(&mut renderer).take_calls()[1..],
            [BackendCall::EnableAttrib(0), BackendCall::EnableAttrib(1)]
        );

        renderer.switch_program(&plain);
        assert_eq!(
            headless(&mut renderer).take_calls()[1..],
            [BackendCall::EnableAttrib(0), BackendCall::DisableAttrib(1)]
        );
    }

    #[test]
    fn test_bind_texture_assigns_units_per_slot() {
        let mut renderer = renderer();
        let program = renderer
            .acquire_program(&ShaderSource::main(), &textured())
            .unwrap();
        renderer.switch_program(&program);

        let a = Texture::data(2, 2);
        let b = Texture::data(2, 2);
        renderer.bind_texture(&a, "base", None).unwrap();
        renderer.bind_texture(&b, "normal", None).unwrap();
        assert_eq!(renderer.texture_unit("base"), Some(0));
        assert_eq!(renderer.texture_unit("normal"), Some(1));

        headless(&mut renderer).take_calls();
        renderer.bind_texture(&a, "base", None).unwrap();
        assert!(headless(&mut renderer).calls().is_empty());

        renderer.bind_texture(&b, "base", None).unwrap();
        assert_eq!(renderer.texture_unit("base"), Some(0));
    }

    #[test]
    fn test_switch_program_forgets_texture_slots() {
        let mut renderer = renderer();
        let source = ShaderSource::main();
        let plain = renderer.acquire_program(&source, &BTreeSet::new()).unwrap();
        let sprite = renderer.acquire_program(&source, &textured()).unwrap();
        let texture = Texture::data(1, 1);

        renderer.switch_program(&sprite);
        renderer.bind_texture(&texture, "base", None).unwrap();
        renderer.switch_program(&plain);
        assert_eq!(renderer.texture_unit("base"), None);

        // the program cache survives the switch
        assert_eq!(renderer.programs().len(), 2);
    }

    #[test]
    fn test_texture_units_are_limited() {
        let mut renderer = Renderer::new(
            Box::new(HeadlessBackend::new()),
            RendererConfig::default().with_max_texture_units(1),
        );
        let texture = Texture::data(1, 1);
        renderer.bind_texture(&texture, "a", None).unwrap();
        assert!(matches!(
            renderer.bind_texture(&texture, "b", None),
            Err(RenderError::TextureUnitsExhausted(1))
        ));
    }

    #[test]
    fn test_release_unbinds_deleted_program() {
        let mut renderer = renderer();
        let program = renderer
            .acquire_program(&ShaderSource::main(), &BTreeSet::new())
            .unwrap();
        renderer.switch_program(&program);
        renderer.release_program(program.key());
        assert_eq!(renderer.current_program(), None);
    }

    #[test]
    fn test_clear_uses_config_color() {
        let mut renderer = Renderer::new(
            Box::new(HeadlessBackend::new()),
            RendererConfig::default().with_clear_color(0.5, 0.25, 0.0),
        );
        renderer.clear();
        assert_eq!(
            headless(&mut renderer).calls(),
            &[BackendCall::Clear(
                [0.5, 0.25, 0.0, 1.0],
                ClearFlags::COLOR | ClearFlags::DEPTH
            )]
        );
    }
}
