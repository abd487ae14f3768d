//! Recording backend without a GPU
//!
//! [`HeadlessBackend`] keeps every resource in memory and appends each
//! state-changing call to a log. "Compiling" a stage runs the shader
//! reflector, so syntax errors and missing `main` functions fail the same
//! way a driver would, and attribute/uniform locations are handed out in
//! declaration order.

use super::shader::{reflect_stage, StageInterface};
use super::{
    BackendResult, BufferHandle, BufferKind, ClearFlags, GraphicsBackend, ProgramHandle,
    ShaderHandle, ShaderStage, TextureHandle, UniformLocation,
};
use std::collections::HashMap;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `use_program`
    UseProgram(ProgramHandle),
    /// `delete_program`
    DeleteProgram(ProgramHandle),
    /// `enable_vertex_attrib`
    EnableAttrib(u32),
    /// `disable_vertex_attrib`
    DisableAttrib(u32),
    /// `create_buffer`
    CreateBuffer {
        /// New buffer
        buffer: BufferHandle,
        /// Target
        kind: BufferKind,
        /// Size in bytes
        len: usize,
    },
    /// `delete_buffer`
    DeleteBuffer(BufferHandle),
    /// `create_texture`
    CreateTexture {
        /// New texture
        texture: TextureHandle,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// `update_texture`
    UpdateTexture(TextureHandle),
    /// `delete_texture`
    DeleteTexture(TextureHandle),
    /// `active_texture`
    ActiveTexture(u32),
    /// `bind_texture`
    BindTexture(TextureHandle),
    /// `uniform_matrix4`
    UniformMatrix4(UniformLocation, [f32; 16]),
    /// `uniform4f`
    Uniform4f(UniformLocation, [f32; 4]),
    /// `uniform2f`
    Uniform2f(UniformLocation, [f32; 2]),
    /// `uniform1i`
    Uniform1i(UniformLocation, i32),
    /// `vertex_attrib_pointer`
    AttribPointer {
        /// Source buffer
        buffer: BufferHandle,
        /// Attribute slot
        slot: u32,
        /// Components per vertex
        size: u32,
    },
    /// `draw_elements`
    DrawElements {
        /// Index buffer
        buffer: BufferHandle,
        /// Index count
        count: u32,
    },
    /// `clear`
    Clear([f32; 4], ClearFlags),
}

#[derive(Debug)]
struct CompiledStage {
    stage: ShaderStage,
    interface: StageInterface,
}

#[derive(Debug)]
struct LinkedProgram {
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
}

/// In-memory [`GraphicsBackend`] that records its calls
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u32,
    shaders: HashMap<u32, CompiledStage>,
    programs: HashMap<u32, LinkedProgram>,
    buffers: HashMap<u32, (BufferKind, Vec<u8>)>,
    textures: HashMap<u32, (u32, u32, Vec<u8>)>,
    links: usize,
    calls: Vec<BackendCall>,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Every call recorded so far
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Take the call log, leaving it empty
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of recorded draws
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::DrawElements { .. }))
            .count()
    }

    /// How many programs were linked over the backend's life
    pub const fn programs_linked(&self) -> usize {
        self.links
    }

    /// Whether a program is still alive
    pub fn is_program_alive(&self, program: ProgramHandle) -> bool {
        self.programs.contains_key(&program.0)
    }

    /// Number of live buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Contents of a live buffer
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|(_, data)| data.as_slice())
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Pixels of a live texture
    pub fn texture_data(&self, texture: TextureHandle) -> Option<&[u8]> {
        self.textures.get(&texture.0).map(|(_, _, data)| data.as_slice())
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        let interface = reflect_stage(stage, source).map_err(|e| e.to_string())?;
        let handle = self.allocate();
        self.shaders.insert(handle, CompiledStage { stage, interface });
        Ok(ShaderHandle(handle))
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex.0), self.shaders.get(&fragment.0))
        else {
            return Err("unknown shader handle".to_string());
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("stage mismatch".to_string());
        }
        for (stage, compiled) in [("vertex", vs), ("fragment", fs)] {
            if !compiled.interface.functions.iter().any(|f| f == "main") {
                return Err(format!("{stage} shader has no main function"));
            }
        }

        let attributes = vs
            .interface
            .attributes
            .iter()
            .zip(0u32..)
            .map(|(name, slot)| (name.clone(), slot))
            .collect();
        let mut uniforms = HashMap::new();
        for name in vs.interface.uniforms.iter().chain(&fs.interface.uniforms) {
            let next = i32::try_from(uniforms.len()).unwrap_or(i32::MAX);
            uniforms.entry(name.clone()).or_insert(UniformLocation(next));
        }

        let handle = self.allocate();
        self.programs.insert(handle, LinkedProgram { attributes, uniforms });
        self.links += 1;
        Ok(ProgramHandle(handle))
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader.0);
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
        self.calls.push(BackendCall::DeleteProgram(program));
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.programs.get(&program.0)?.attributes.get(name).copied()
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program.0)?.uniforms.get(name).copied()
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn enable_vertex_attrib(&mut self, slot: u32) {
        self.calls.push(BackendCall::EnableAttrib(slot));
    }

    fn disable_vertex_attrib(&mut self, slot: u32) {
        self.calls.push(BackendCall::DisableAttrib(slot));
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer.0, (kind, data.to_vec()));
        self.calls.push(BackendCall::CreateBuffer {
            buffer,
            kind,
            len: data.len(),
        });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
        self.calls.push(BackendCall::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle> {
        let texture = TextureHandle(self.allocate());
        self.textures.insert(texture.0, (width, height, rgba.to_vec()));
        self.calls.push(BackendCall::CreateTexture {
            texture,
            width,
            height,
        });
        Ok(texture)
    }

    fn update_texture(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> BackendResult<()> {
        let Some(slot) = self.textures.get_mut(&texture.0) else {
            return Err(super::RenderError::BackendError(format!(
                "unknown texture {texture:?}"
            )));
        };
        *slot = (width, height, rgba.to_vec());
        self.calls.push(BackendCall::UpdateTexture(texture));
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
        self.calls.push(BackendCall::DeleteTexture(texture));
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(BackendCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.calls.push(BackendCall::BindTexture(texture));
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, value: &[f32; 16]) {
        self.calls.push(BackendCall::UniformMatrix4(location, *value));
    }

    fn uniform4f(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.calls.push(BackendCall::Uniform4f(location, value));
    }

    fn uniform2f(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.calls.push(BackendCall::Uniform2f(location, value));
    }

    fn uniform1i(&mut self, location: UniformLocation, value: i32) {
        self.calls.push(BackendCall::Uniform1i(location, value));
    }

    fn vertex_attrib_pointer(&mut self, buffer: BufferHandle, slot: u32, size: u32) {
        self.calls
            .push(BackendCall::AttribPointer { buffer, slot, size });
    }

    fn draw_elements(&mut self, index_buffer: BufferHandle, count: u32) {
        self.calls.push(BackendCall::DrawElements {
            buffer: index_buffer,
            count,
        });
    }

    fn clear(&mut self, color: [f32; 4], flags: ClearFlags) {
        self.calls.push(BackendCall::Clear(color, flags));
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_assigns_locations_in_order() {
        let mut backend = HeadlessBackend::new();
        let vs = backend
            .compile_shader(
                ShaderStage::Vertex,
                "attribute vec3 aPos; attribute vec2 aUv; uniform mat4 uM; void main() {}",
            )
            .unwrap();
        let fs = backend
            .compile_shader(ShaderStage::Fragment, "uniform vec4 uC; uniform mat4 uM; void main() {}")
            .unwrap();
        let program = backend.link_program(vs, fs).unwrap();

        assert_eq!(backend.attribute_location(program, "aPos"), Some(0));
        assert_eq!(backend.attribute_location(program, "aUv"), Some(1));
        assert_eq!(backend.uniform_location(program, "uM"), Some(UniformLocation(0)));
        assert_eq!(backend.uniform_location(program, "uC"), Some(UniformLocation(1)));
        assert_eq!(backend.uniform_location(program, "uMissing"), None);
    }

    #[test]
    fn test_link_requires_main() {
        let mut backend = HeadlessBackend::new();
        let vs = backend.compile_shader(ShaderStage::Vertex, "void helper() {}").unwrap();
        let fs = backend.compile_shader(ShaderStage::Fragment, "void main() {}").unwrap();
        assert!(backend.link_program(vs, fs).is_err());
        assert!(backend.link_program(fs, vs).is_err());
    }

    #[test]
    fn test_compile_rejects_bad_syntax() {
        let mut backend = HeadlessBackend::new();
        assert!(backend
            .compile_shader(ShaderStage::Vertex, "#ifdef X\nvoid main() {}")
            .is_err());
    }

    #[test]
    fn test_resources_are_tracked() {
        let mut backend = HeadlessBackend::new();
        let buffer = backend.create_buffer(BufferKind::Index, &[1, 0, 2, 0]).unwrap();
        let texture = backend.create_texture(1, 1, &[255, 0, 0, 255]).unwrap();
        assert_eq!(backend.buffer_data(buffer), Some(&[1u8, 0, 2, 0][..]));

        backend.update_texture(texture, 1, 1, &[0, 255, 0, 255]).unwrap();
        assert_eq!(backend.texture_data(texture), Some(&[0u8, 255, 0, 255][..]));

        backend.delete_buffer(buffer);
        backend.delete_texture(texture);
        assert_eq!(backend.buffer_count(), 0);
        assert_eq!(backend.texture_count(), 0);
        assert!(backend.update_texture(texture, 1, 1, &[]).is_err());
    }
}
