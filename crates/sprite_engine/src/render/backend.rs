//! Backend abstraction trait for the rendering system
//!
//! The trait mirrors an immediate-mode GL-style API: shaders and programs,
//! vertex attribute slots, buffers, texture units, uniforms and indexed
//! draws. Resources are referenced through opaque handles.

use super::BackendResult;
use bitflags::bitflags;

/// Handle to a compiled shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

/// Handle to a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Handle to a vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Handle to a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Location of a uniform inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

/// Buffer binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// `f32` vertex attributes
    Vertex,
    /// `u16` triangle indices
    Index,
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Color buffer
        const COLOR = 0b01;
        /// Depth buffer
        const DEPTH = 0b10;
    }
}

/// Native graphics API seam
///
/// Compile and link failures return the driver's info log so the caller can
/// wrap it in a typed error.
pub trait GraphicsBackend {
    /// Compile one shader stage
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;

    /// Link a vertex and a fragment stage into a program
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String>;

    /// Release a shader stage
    fn delete_shader(&mut self, shader: ShaderHandle);

    /// Release a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Attribute slot of an active attribute, `None` if inactive
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Location of an active uniform, `None` if inactive
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Bind a program for subsequent calls
    fn use_program(&mut self, program: ProgramHandle);

    /// Enable a vertex attribute array slot
    fn enable_vertex_attrib(&mut self, slot: u32);

    /// Disable a vertex attribute array slot
    fn disable_vertex_attrib(&mut self, slot: u32);

    /// Upload a static buffer
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Release a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Upload RGBA8 pixels into a new texture
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle>;

    /// Replace the pixels of an existing texture
    fn update_texture(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> BackendResult<()>;

    /// Release a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Select the active texture unit
    fn active_texture(&mut self, unit: u32);

    /// Bind a texture to the active unit
    fn bind_texture(&mut self, texture: TextureHandle);

    /// Set a `mat4` uniform from a row-major array
    fn uniform_matrix4(&mut self, location: UniformLocation, value: &[f32; 16]);

    /// Set a `vec4` uniform
    fn uniform4f(&mut self, location: UniformLocation, value: [f32; 4]);

    /// Set a `vec2` uniform
    fn uniform2f(&mut self, location: UniformLocation, value: [f32; 2]);

    /// Set an `int`/`sampler2D` uniform
    fn uniform1i(&mut self, location: UniformLocation, value: i32);

    /// Point an attribute slot at a float buffer with `size` components
    fn vertex_attrib_pointer(&mut self, buffer: BufferHandle, slot: u32, size: u32);

    /// Draw `count` `u16` indices as triangles
    fn draw_elements(&mut self, index_buffer: BufferHandle, count: u32);

    /// Clear the selected buffers
    fn clear(&mut self, color: [f32; 4], flags: ClearFlags);

    /// Downcast to the concrete backend type
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to the concrete backend type, mutably
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
