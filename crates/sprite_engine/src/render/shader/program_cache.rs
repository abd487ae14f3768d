//! Program variants shared by reference count
//!
//! One cache per renderer. A program is identified by its [`ProgramKey`]:
//! the shader source id plus the sorted flag set, so `{A, B}` and `{B, A}`
//! select the same program.

use super::{ShaderError, ShaderId, ShaderInterface, ShaderSource};
use crate::render::{GraphicsBackend, ProgramHandle, ShaderStage, UniformLocation};
use log::{debug, trace, warn};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Identity of a compiled program variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey {
    /// Shader source
    pub shader: ShaderId,
    /// Enabled flags, sorted
    pub flags: BTreeSet<String>,
}

impl ProgramKey {
    /// Build a key from any flag order
    pub fn new(shader: ShaderId, flags: impl IntoIterator<Item = String>) -> Self {
        Self {
            shader,
            flags: flags.into_iter().collect(),
        }
    }
}

/// A linked program and its binding table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    key: ProgramKey,
    handle: ProgramHandle,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
}

impl Program {
    /// Cache key
    pub const fn key(&self) -> &ProgramKey {
        &self.key
    }

    /// Backend handle
    pub const fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Slot of an active attribute
    pub fn attribute(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    /// Location of an active uniform leaf
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Active attribute slots, ascending
    pub fn attribute_slots(&self) -> Vec<u32> {
        let mut slots: Vec<u32> = self.attributes.values().copied().collect();
        slots.sort_unstable();
        slots
    }

    /// Number of active attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Names of the active uniform leaves
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }
}

#[derive(Debug)]
struct CachedProgram {
    program: Rc<Program>,
    references: usize,
}

/// Compiled programs of one renderer
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: HashMap<ProgramKey, CachedProgram>,
    max_attributes: usize,
}

impl ProgramCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the program for `source` + `flags`, compiling it on a miss
    ///
    /// Every call adds one reference, balanced by [`ProgramCache::release`].
    pub fn acquire(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        source: &ShaderSource,
        flags: &BTreeSet<String>,
    ) -> Result<Rc<Program>, ShaderError> {
        let key = ProgramKey::new(source.id(), flags.iter().cloned());

        if let Some(cached) = self.programs.get_mut(&key) {
            cached.references += 1;
            trace!("Program cache hit for {key:?} ({} refs)", cached.references);
            return Ok(Rc::clone(&cached.program));
        }

        trace!("Program cache miss for {key:?}");
        let program = Rc::new(Self::build(backend, source, key.clone())?);
        self.max_attributes = self.max_attributes.max(program.attribute_count());
        self.programs.insert(
            key,
            CachedProgram {
                program: Rc::clone(&program),
                references: 1,
            },
        );
        Ok(program)
    }

    fn build(
        backend: &mut dyn GraphicsBackend,
        source: &ShaderSource,
        key: ProgramKey,
    ) -> Result<Program, ShaderError> {
        let vertex_text = source.with_defines(ShaderStage::Vertex, &key.flags);
        let fragment_text = source.with_defines(ShaderStage::Fragment, &key.flags);
        let interface = ShaderInterface::reflect(&vertex_text, &fragment_text)?;

        let vertex = backend
            .compile_shader(ShaderStage::Vertex, &vertex_text)
            .map_err(|log| ShaderError::Compile {
                stage: ShaderStage::Vertex,
                log,
            })?;
        let fragment = match backend.compile_shader(ShaderStage::Fragment, &fragment_text) {
            Ok(fragment) => fragment,
            Err(log) => {
                backend.delete_shader(vertex);
                return Err(ShaderError::Compile {
                    stage: ShaderStage::Fragment,
                    log,
                });
            }
        };

        let linked = backend.link_program(vertex, fragment);
        backend.delete_shader(vertex);
        backend.delete_shader(fragment);
        let handle = linked.map_err(ShaderError::Link)?;

        let mut attributes = HashMap::new();
        for name in interface.attributes {
            match backend.attribute_location(handle, &name) {
                Some(slot) => {
                    attributes.insert(name, slot);
                }
                None => warn!("Attribute {name} is declared but inactive in {key:?}"),
            }
        }

        let mut uniforms = HashMap::new();
        for name in interface.uniforms {
            match backend.uniform_location(handle, &name) {
                Some(location) => {
                    uniforms.insert(name, location);
                }
                None => trace!("Uniform {name} optimized out of {key:?}"),
            }
        }

        debug!(
            "Compiled program {handle:?} for {key:?}: {} attributes, {} uniforms",
            attributes.len(),
            uniforms.len()
        );
        Ok(Program {
            key,
            handle,
            attributes,
            uniforms,
        })
    }

    /// Drop one reference; the backend program is deleted at zero
    ///
    /// Returns whether the program was deleted.
    pub fn release(&mut self, backend: &mut dyn GraphicsBackend, key: &ProgramKey) -> bool {
        let Some(cached) = self.programs.get_mut(key) else {
            return false;
        };
        cached.references = cached.references.saturating_sub(1);
        if cached.references > 0 {
            return false;
        }

        if let Some(cached) = self.programs.remove(key) {
            backend.delete_program(cached.program.handle());
            debug!("Deleted program {:?} for {key:?}", cached.program.handle());
        }
        true
    }

    /// Cached program without touching its reference count
    pub fn get(&self, key: &ProgramKey) -> Option<Rc<Program>> {
        self.programs.get(key).map(|cached| Rc::clone(&cached.program))
    }

    /// Current reference count, 0 when absent
    pub fn references(&self, key: &ProgramKey) -> usize {
        self.programs.get(key).map_or(0, |cached| cached.references)
    }

    /// Highest attribute count of any program compiled so far
    pub const fn max_attributes(&self) -> usize {
        self.max_attributes
    }

    /// Number of cached programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Delete every program regardless of references
    pub fn clear(&mut self, backend: &mut dyn GraphicsBackend) {
        for (_, cached) in self.programs.drain() {
            backend.delete_program(cached.program.handle());
        }
    }
}
