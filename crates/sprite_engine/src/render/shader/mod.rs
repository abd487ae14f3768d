//! Shader sources, reflection and program variants
//!
//! A [`ShaderSource`] is a vertex/fragment pair with a stable [`ShaderId`].
//! A [`Shader`] is one material's use of a source together with its set of
//! feature flags. Each flag becomes a `#define` line prepended to both
//! stages, and every distinct (source, flags) pair is compiled once per
//! renderer by the [`ProgramCache`].
//!
//! Attribute and uniform names are found by lexing and parsing the GLSL
//! itself, so programs know every binding point up front, including each
//! leaf of struct and array uniforms (`uLights[0].color`). `layout(...)`
//! qualifiers are ignored, and uniform blocks expand like structs.

mod lexer;
mod parser;
mod program_cache;

pub use lexer::{Lexer, Token, TokenWithPos};
pub use parser::{Parser, StageInterface};
pub use program_cache::{Program, ProgramCache, ProgramKey};

use super::{RenderResult, Renderer, RendererId, ShaderStage};
use log::debug;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Built-in sprite vertex stage
pub const MAIN_VERTEX: &str = include_str!("../../../shaders/main.vert");

/// Built-in sprite fragment stage
pub const MAIN_FRAGMENT: &str = include_str!("../../../shaders/main.frag");

/// A parse error in shader source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shader parse error at {line}:{col}: {message}")]
pub struct ParseError {
    /// What went wrong
    pub message: String,
    /// 1-based source line
    pub line: usize,
    /// 1-based source column
    pub col: usize,
}

impl ParseError {
    pub(crate) fn new(msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            message: msg.into(),
            line,
            col,
        }
    }
}

/// Shader compilation and reflection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    /// The source could not be reflected
    #[error("{stage:?} shader: {source}")]
    Parse {
        /// Failing stage
        stage: ShaderStage,
        /// Parser diagnostic
        source: ParseError,
    },

    /// The backend rejected a stage
    #[error("Error compiling {stage:?} shader: {log}")]
    Compile {
        /// Failing stage
        stage: ShaderStage,
        /// Driver info log
        log: String,
    },

    /// The backend could not link the stages
    #[error("Error linking the program: {0}")]
    Link(String),
}

/// Identity of a shader source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u64);

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

impl ShaderId {
    /// Id of the built-in sprite shader
    pub const MAIN: Self = Self(0);

    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A vertex and fragment source pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    id: ShaderId,
    vertex: Cow<'static, str>,
    fragment: Cow<'static, str>,
}

impl ShaderSource {
    /// Register a new source pair under a fresh id
    pub fn new(vertex: impl Into<Cow<'static, str>>, fragment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: ShaderId::next(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// The built-in sprite shader
    ///
    /// Always the same id, so every material using it shares programs.
    pub const fn main() -> Self {
        Self {
            id: ShaderId::MAIN,
            vertex: Cow::Borrowed(MAIN_VERTEX),
            fragment: Cow::Borrowed(MAIN_FRAGMENT),
        }
    }

    /// Identity of this source
    pub const fn id(&self) -> ShaderId {
        self.id
    }

    /// Vertex stage text
    pub fn vertex(&self) -> &str {
        &self.vertex
    }

    /// Fragment stage text
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Source of a stage with one `#define` line per flag in front
    pub fn with_defines(&self, stage: ShaderStage, flags: &BTreeSet<String>) -> String {
        let body = match stage {
            ShaderStage::Vertex => self.vertex(),
            ShaderStage::Fragment => self.fragment(),
        };
        let mut text: String = flags.iter().map(|flag| format!("#define {flag}\n")).collect();
        text.push_str(body);
        text
    }
}

/// Bindings declared by a vertex + fragment pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    /// Vertex stage inputs
    pub attributes: Vec<String>,
    /// Uniform leaves of both stages, without duplicates
    pub uniforms: Vec<String>,
}

impl ShaderInterface {
    /// Reflect a preprocessed-ready source pair
    pub fn reflect(vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        let vs = reflect_stage(ShaderStage::Vertex, vertex)?;
        let fs = reflect_stage(ShaderStage::Fragment, fragment)?;

        let mut uniforms = vs.uniforms;
        for leaf in fs.uniforms {
            if !uniforms.contains(&leaf) {
                uniforms.push(leaf);
            }
        }
        Ok(Self {
            attributes: vs.attributes,
            uniforms,
        })
    }
}

/// Parse one stage
pub fn reflect_stage(stage: ShaderStage, source: &str) -> Result<StageInterface, ShaderError> {
    Lexer::new(source)
        .tokenize()
        .and_then(|tokens| Parser::new(tokens, stage)?.parse())
        .map_err(|source| ShaderError::Parse { stage, source })
}

/// One material's use of a shader source
///
/// Holds the feature flags and, per renderer, the key of the program it
/// acquired. Programs are released through [`Shader::release`].
#[derive(Debug, Clone)]
pub struct Shader {
    source: Rc<ShaderSource>,
    flags: BTreeSet<String>,
    programs: HashMap<RendererId, ProgramKey>,
}

impl Shader {
    /// Use `source` with no flags
    pub fn new(source: Rc<ShaderSource>) -> Self {
        Self {
            source,
            flags: BTreeSet::new(),
            programs: HashMap::new(),
        }
    }

    /// Enable a feature flag
    ///
    /// Programs acquired with the previous flag set are swapped on next use.
    pub fn add_flag(&mut self, flag: impl Into<String>) -> &mut Self {
        self.flags.insert(flag.into());
        self
    }

    /// Disable a feature flag
    pub fn remove_flag(&mut self, flag: &str) -> &mut Self {
        self.flags.remove(flag);
        self
    }

    /// Enabled flags
    pub const fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    /// Shader source
    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    /// Cache key for the current flag set
    pub fn key(&self) -> ProgramKey {
        ProgramKey::new(self.source.id(), self.flags.iter().cloned())
    }

    /// Whether both shaders select the same program
    pub fn equals(&self, other: &Self) -> bool {
        self.source.id() == other.source.id() && self.flags == other.flags
    }

    /// The program for `renderer`, acquiring it on first use
    pub fn program(&mut self, renderer: &mut Renderer) -> RenderResult<Rc<Program>> {
        let key = self.key();
        match self.programs.get(&renderer.id()) {
            Some(held) if *held == key => {
                if let Some(program) = renderer.program(&key) {
                    return Ok(program);
                }
            }
            Some(stale) => {
                debug!("Flag set changed, releasing {stale:?}");
                renderer.release_program(stale);
            }
            None => {}
        }

        let program = renderer.acquire_program(&self.source, &self.flags)?;
        self.programs.insert(renderer.id(), key);
        Ok(program)
    }

    /// Bind this shader's program on `renderer`
    pub fn use_program(&mut self, renderer: &mut Renderer) -> RenderResult<Rc<Program>> {
        let program = self.program(renderer)?;
        renderer.switch_program(&program);
        Ok(program)
    }

    /// Drop this shader's reference to its program on `renderer`
    pub fn release(&mut self, renderer: &mut Renderer) {
        if let Some(key) = self.programs.remove(&renderer.id()) {
            renderer.release_program(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_shader_interface() {
        let interface = ShaderInterface::reflect(MAIN_VERTEX, MAIN_FRAGMENT).unwrap();
        assert_eq!(interface.attributes, vec!["aVertexPosition"]);
        assert_eq!(interface.uniforms, vec!["uProjection", "uPosition"]);
    }

    #[test]
    fn test_main_shader_with_texture() {
        let source = ShaderSource::main();
        let flags: BTreeSet<String> = ["USE_TEXTURE".to_string()].into();
        let interface = ShaderInterface::reflect(
            &source.with_defines(ShaderStage::Vertex, &flags),
            &source.with_defines(ShaderStage::Fragment, &flags),
        )
        .unwrap();

        assert_eq!(interface.attributes, vec!["aVertexPosition", "aTexCoords"]);
        assert_eq!(
            interface.uniforms,
            vec!["uProjection", "uPosition", "uUV", "uRepeat", "uTexture"]
        );
    }

    #[test]
    fn test_defines_are_prefixed_in_order() {
        let source = ShaderSource::new("void main() {}", "void main() {}");
        let flags: BTreeSet<String> = ["B".to_string(), "A".to_string()].into();
        assert_eq!(
            source.with_defines(ShaderStage::Vertex, &flags),
            "#define A\n#define B\nvoid main() {}"
        );
    }

    #[test]
    fn test_shader_ids_are_unique() {
        let a = ShaderSource::new("", "");
        let b = ShaderSource::new("", "");
        assert_ne!(a.id(), b.id());
        assert_eq!(ShaderSource::main().id(), ShaderSource::main().id());
    }

    #[test]
    fn test_flag_order_does_not_matter() {
        let source = Rc::new(ShaderSource::main());
        let mut a = Shader::new(Rc::clone(&source));
        let mut b = Shader::new(source);
        a.add_flag("X").add_flag("Y");
        b.add_flag("Y").add_flag("X");
        assert!(a.equals(&b));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_parse_error_is_reported_per_stage() {
        let err = ShaderInterface::reflect("void main() {}", "uniform float x[N];").unwrap_err();
        assert!(matches!(err, ShaderError::Parse { stage: ShaderStage::Fragment, .. }));
    }
}
