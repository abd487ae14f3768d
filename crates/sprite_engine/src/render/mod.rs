//! # Rendering System
//!
//! A thin state-caching layer over a GL-style [`GraphicsBackend`].
//!
//! ## Architecture
//!
//! - **Renderer**: owns a backend and a [`ProgramCache`]; caches the bound
//!   program and per-slot texture bindings to skip redundant state changes
//! - **Shader**: source pair plus a flag set; programs are compiled once per
//!   (renderer, shader, flags) and shared by reference count
//! - **Geometry / Texture**: CPU-side data uploaded lazily, once per renderer
//! - **Material**: binds uniforms, textures and buffers, then draws
//!
//! The [`HeadlessBackend`] records every call and is what the tests run on.

pub mod animation;
pub mod backend;
pub mod geometry;
pub mod headless;
pub mod material;
pub mod renderer;
pub mod shader;
pub mod texture;

pub use animation::Animation2D;
pub use backend::{
    BufferHandle, BufferKind, ClearFlags, GraphicsBackend, ProgramHandle, ShaderHandle,
    ShaderStage, TextureHandle, UniformLocation,
};
pub use geometry::{Geometry, GeometryBuffers, GeometryError, SpriteGeometry};
pub use headless::{BackendCall, HeadlessBackend};
pub use material::{BasicMaterial, Material, SpriteMaterial, USE_TEXTURE};
pub use renderer::{Renderer, RendererId};
pub use shader::{Program, ProgramCache, ProgramKey, Shader, ShaderError, ShaderId, ShaderSource};
pub use texture::{Texture, TextureError, TextureId};

/// Number of floats per vertex position
pub const VERTEX_SIZE: u32 = 3;

/// Number of floats per texture coordinate
pub const TEXCOORD_SIZE: u32 = 2;

/// Rendering errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Shader compilation, linking or reflection failed
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// Texture lookup or upload failed
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    /// Geometry data is invalid
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// More texture slots requested than the renderer allows
    #[error("Texture units exhausted: at most {0} per program")]
    TextureUnitsExhausted(u32),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;
