use super::lexer::{Token, TokenWithPos};
use super::ParseError;
use crate::render::ShaderStage;
use std::collections::HashMap;

/// Declarations found in one shader stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInterface {
    /// Vertex inputs in declaration order
    pub attributes: Vec<String>,
    /// Uniform leaves in declaration order, arrays and structs expanded
    pub uniforms: Vec<String>,
    /// Names of the functions defined
    pub functions: Vec<String>,
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    size: Option<usize>,
}

// ── Preprocessor ──────────────────────────────────────────────────────────

/// Drop inactive `#ifdef` branches and collect `#define`s
fn preprocess(
    tokens: Vec<TokenWithPos>,
) -> Result<(Vec<TokenWithPos>, HashMap<String, String>), ParseError> {
    let mut defines = HashMap::new();
    // (branch active, parent active, else seen)
    let mut conditions: Vec<(bool, bool, bool)> = Vec::new();
    let mut output = Vec::with_capacity(tokens.len());

    for tok in tokens {
        let active = conditions.last().map_or(true, |c| c.0);
        let Token::Directive { name, args } = &tok.token else {
            if active || tok.token == Token::Eof {
                output.push(tok);
            }
            continue;
        };

        let err = |msg: &str| ParseError::new(msg, tok.line, tok.col);
        match name.as_str() {
            "ifdef" | "ifndef" => {
                let flag = args.first().ok_or_else(|| err("missing macro name"))?;
                let defined = defines.contains_key(flag);
                let taken = if name == "ifdef" { defined } else { !defined };
                conditions.push((active && taken, active, false));
            }
            // expressions are not evaluated; the branch is kept
            "if" => conditions.push((active, active, false)),
            "elif" => return Err(err("#elif is not supported")),
            "else" => {
                let Some(top) = conditions.last_mut() else {
                    return Err(err("#else without #if"));
                };
                if top.2 {
                    return Err(err("duplicate #else"));
                }
                *top = (top.1 && !top.0, top.1, true);
            }
            "endif" => {
                if conditions.pop().is_none() {
                    return Err(err("#endif without #if"));
                }
            }
            "define" if active => {
                let flag = args.first().ok_or_else(|| err("missing macro name"))?;
                defines.insert(flag.clone(), args[1..].join(" "));
            }
            "undef" if active => {
                if let Some(flag) = args.first() {
                    defines.remove(flag);
                }
            }
            _ => {}
        }
    }

    if !conditions.is_empty() {
        let (line, col) = output.last().map_or((1, 1), |t| (t.line, t.col));
        return Err(ParseError::new("unterminated #if block", line, col));
    }
    Ok((output, defines))
}

// ── Parser ────────────────────────────────────────────────────────────────

/// Finds global declarations in preprocessed GLSL
pub struct Parser {
    tokens: Vec<TokenWithPos>,
    pos: usize,
    stage: ShaderStage,
    defines: HashMap<String, String>,
    structs: HashMap<String, Vec<Field>>,
}

impl Parser {
    /// Preprocess `tokens` and prepare to parse them as `stage` source
    pub fn new(tokens: Vec<TokenWithPos>, stage: ShaderStage) -> Result<Self, ParseError> {
        let (tokens, defines) = preprocess(tokens)?;
        Ok(Self {
            tokens,
            pos: 0,
            stage,
            defines,
            structs: HashMap::new(),
        })
    }

    fn current_pos(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or((1, 1), |t| (t.line, t.col))
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::Eof, |t| &t.token)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map_or(&Token::Eof, |t| &t.token)
    }

    fn advance(&mut self) -> Token {
        let tok = self
            .tokens
            .get(self.pos)
            .map_or(Token::Eof, |t| t.token.clone());
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        let (line, col) = self.current_pos();
        ParseError::new(msg, line, col)
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Token::Ident(s) => Ok(s),
            tok => Err(self.err(format!("expected identifier, got {tok:?}"))),
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), ParseError> {
        let got = self.advance();
        if &got == expected {
            Ok(())
        } else {
            Err(self.err(format!("expected {expected:?}, got {got:?}")))
        }
    }

    // ── Translation unit ──────────────────────────────────────────────────

    /// Parse every global declaration
    pub fn parse(mut self) -> Result<StageInterface, ParseError> {
        let mut interface = StageInterface::default();

        loop {
            match self.peek().clone() {
                Token::Eof => break,
                Token::Ident(word) => match word.as_str() {
                    "layout" if self.peek_ahead(1) == &Token::LParen => self.skip_layout()?,
                    "struct" => {
                        self.parse_struct()?;
                    }
                    "uniform" => {
                        self.advance();
                        for leaf in self.parse_uniform()? {
                            if !interface.uniforms.contains(&leaf) {
                                interface.uniforms.push(leaf);
                            }
                        }
                    }
                    "attribute" | "in" if self.stage == ShaderStage::Vertex => {
                        self.advance();
                        for field in self.parse_declarators()? {
                            interface.attributes.push(field.name);
                        }
                    }
                    _ => {
                        if let Some(function) = self.skip_statement()? {
                            interface.functions.push(function);
                        }
                    }
                },
                _ => {
                    self.skip_statement()?;
                }
            }
        }

        Ok(interface)
    }

    // ── Struct ────────────────────────────────────────────────────────────

    /// `struct Name { ... } instances;`, returning the instance declarators
    fn parse_struct(&mut self) -> Result<Vec<Field>, ParseError> {
        self.advance(); // consume `struct`
        let name = self.expect_ident()?;
        let fields = self.parse_struct_body(&name)?;
        let instances = self.parse_trailing_declarators()?;
        self.structs.insert(name, fields);
        Ok(instances)
    }

    fn parse_struct_body(&mut self, name: &str) -> Result<Vec<Field>, ParseError> {
        self.expect_token(&Token::LBrace)?;
        let mut fields = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.peek() == &Token::Eof {
                return Err(self.err(format!("unterminated struct {name}")));
            }
            fields.extend(self.parse_declarators()?);
        }
        self.advance(); // consume `}`
        Ok(fields)
    }

    /// `name[size], name2;` after a struct or block body, possibly empty
    fn parse_trailing_declarators(&mut self) -> Result<Vec<Field>, ParseError> {
        let mut fields = Vec::new();
        while let Token::Ident(name) = self.peek().clone() {
            self.advance();
            fields.push(Field {
                name,
                size: self.parse_array_size()?,
            });
            if self.peek() != &Token::Comma {
                break;
            }
            self.advance();
        }
        self.expect_token(&Token::Semicolon)?;
        Ok(fields)
    }

    /// `layout(...)`; the qualified declaration is parsed on its own
    fn skip_layout(&mut self) -> Result<(), ParseError> {
        self.advance(); // consume `layout`
        loop {
            match self.advance() {
                Token::RParen => return Ok(()),
                Token::Eof => return Err(self.err("unterminated layout qualifier")),
                _ => {}
            }
        }
    }

    // ── Declarations ──────────────────────────────────────────────────────

    /// `qualifiers type name[size], name2;` with the leading keyword consumed
    ///
    /// Returns the type name and the declared fields.
    fn parse_typed_declarators(&mut self) -> Result<(String, Vec<Field>), ParseError> {
        let mut words = Vec::new();
        while let Token::Ident(word) = self.peek() {
            words.push(word.clone());
            self.advance();
        }
        if words.len() < 2 {
            return Err(self.err("expected a type and a name"));
        }
        let Some(first_name) = words.pop() else {
            return Err(self.err("expected a name"));
        };
        let ty = words.pop().unwrap_or_default();

        let mut fields = vec![Field {
            name: first_name,
            size: self.parse_array_size()?,
        }];
        while self.peek() == &Token::Comma {
            self.advance();
            let name = self.expect_ident()?;
            fields.push(Field {
                name,
                size: self.parse_array_size()?,
            });
        }
        self.expect_token(&Token::Semicolon)?;
        Ok((ty, fields))
    }

    fn parse_declarators(&mut self) -> Result<Vec<Field>, ParseError> {
        Ok(self.parse_typed_declarators()?.1)
    }

    fn parse_array_size(&mut self) -> Result<Option<usize>, ParseError> {
        if self.peek() != &Token::LBracket {
            return Ok(None);
        }
        self.advance();
        let size = match self.advance() {
            Token::Number(n) => n.parse::<usize>().ok(),
            Token::Ident(name) => self
                .defines
                .get(&name)
                .and_then(|value| value.trim().parse::<usize>().ok()),
            _ => None,
        };
        let Some(size) = size else {
            return Err(self.err("array size must be an integer constant"));
        };
        self.expect_token(&Token::RBracket)?;
        Ok(Some(size))
    }

    /// Uniform declaration after the `uniform` keyword
    ///
    /// Handles plain declarations, inline structs
    /// (`uniform struct S { .. } s;`) and interface blocks
    /// (`uniform Block { .. } block;`). Members of an unnamed block are
    /// global uniforms.
    fn parse_uniform(&mut self) -> Result<Vec<String>, ParseError> {
        match (self.peek().clone(), self.peek_ahead(1).clone()) {
            (Token::Ident(word), Token::Ident(ty)) if word == "struct" => {
                let instances = self.parse_struct()?;
                Ok(self.struct_leaves(&ty, instances))
            }
            (Token::Ident(block), Token::LBrace) => {
                self.advance();
                let members = self.parse_struct_body(&block)?;
                let instances = self.parse_trailing_declarators()?;
                if instances.is_empty() {
                    return Ok(members
                        .iter()
                        .flat_map(|member| expand(&member.name, member.size))
                        .collect());
                }
                self.structs.insert(block.clone(), members);
                Ok(self.struct_leaves(&block, instances))
            }
            _ => {
                let (ty, fields) = self.parse_typed_declarators()?;
                Ok(self.struct_leaves(&ty, fields))
            }
        }
    }

    /// Leaf names of `fields` declared with type `ty`
    fn struct_leaves(&self, ty: &str, fields: Vec<Field>) -> Vec<String> {
        let members = self.structs.get(ty);

        let mut leaves = Vec::new();
        for field in fields {
            let bases = expand(&field.name, field.size);
            match members {
                Some(members) => {
                    for base in &bases {
                        for member in members {
                            leaves.extend(expand(&format!("{base}.{}", member.name), member.size));
                        }
                    }
                }
                None => leaves.extend(bases),
            }
        }
        leaves
    }

    // ── Everything else ───────────────────────────────────────────────────

    /// Skip one statement or function definition
    ///
    /// Returns the function name when a definition was skipped.
    fn skip_statement(&mut self) -> Result<Option<String>, ParseError> {
        let mut function = None;
        loop {
            match self.peek().clone() {
                Token::Eof => return Ok(None),
                Token::Semicolon => {
                    self.advance();
                    return Ok(None);
                }
                Token::Ident(name) if self.peek_ahead(1) == &Token::LParen => {
                    function.get_or_insert(name);
                    self.advance();
                }
                Token::LBrace => {
                    self.skip_block()?;
                    return Ok(function);
                }
                Token::RBrace => return Err(self.err("unbalanced '}'")),
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_block(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.advance() {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Eof => return Err(self.err("unterminated block")),
                _ => {}
            }
        }
    }
}

fn expand(name: &str, size: Option<usize>) -> Vec<String> {
    match size {
        Some(n) => (0..n).map(|k| format!("{name}[{k}]")).collect(),
        None => vec![name.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::lexer::Lexer;

    fn parse(src: &str, stage: ShaderStage) -> Result<StageInterface, ParseError> {
        Parser::new(Lexer::new(src).tokenize()?, stage)?.parse()
    }

    #[test]
    fn test_attributes_and_uniforms() {
        let src = "
            precision mediump float;
            attribute vec3 aVertexPosition;
            uniform mat4 uProjection;
            uniform mat4 uPosition;
            void main(void) {
                gl_Position = uProjection * uPosition * vec4(aVertexPosition, 1.0);
            }
        ";
        let interface = parse(src, ShaderStage::Vertex).unwrap();
        assert_eq!(interface.attributes, vec!["aVertexPosition"]);
        assert_eq!(interface.uniforms, vec!["uProjection", "uPosition"]);
        assert_eq!(interface.functions, vec!["main"]);
    }

    #[test]
    fn test_ifdef_branches() {
        let src = "
            #define USE_TEXTURE
            #ifdef USE_TEXTURE
                attribute vec2 aTexCoords;
            #else
                attribute vec4 aColor;
            #endif
            #ifndef USE_TEXTURE
                uniform vec4 uTint;
            #endif
        ";
        let interface = parse(src, ShaderStage::Vertex).unwrap();
        assert_eq!(interface.attributes, vec!["aTexCoords"]);
        assert!(interface.uniforms.is_empty());
    }

    #[test]
    fn test_nested_inactive_branch_stays_inactive() {
        let src = "
            #ifdef A
                #ifndef B
                    uniform float uHidden;
                #else
                    uniform float uAlsoHidden;
                #endif
            #endif
            uniform float uShown;
        ";
        let interface = parse(src, ShaderStage::Fragment).unwrap();
        assert_eq!(interface.uniforms, vec!["uShown"]);
    }

    #[test]
    fn test_arrays_of_structs() {
        let src = "
            #define MAX_LIGHTS 2
            struct Light {
                vec3 position;
                vec3 color[2];
            };
            uniform Light uLights[MAX_LIGHTS];
            uniform float uWeights[3];
        ";
        let interface = parse(src, ShaderStage::Fragment).unwrap();
        assert_eq!(
            interface.uniforms,
            vec![
                "uLights[0].position",
                "uLights[0].color[0]",
                "uLights[0].color[1]",
                "uLights[1].position",
                "uLights[1].color[0]",
                "uLights[1].color[1]",
                "uWeights[0]",
                "uWeights[1]",
                "uWeights[2]",
            ]
        );
    }

    #[test]
    fn test_fragment_inputs_are_not_attributes() {
        let src = "in vec2 vTexCoords; uniform sampler2D uTexture;";
        let interface = parse(src, ShaderStage::Fragment).unwrap();
        assert!(interface.attributes.is_empty());
        assert_eq!(interface.uniforms, vec!["uTexture"]);
    }

    #[test]
    fn test_qualifiers_and_lists() {
        let src = "uniform highp vec2 uA, uB[2];";
        let interface = parse(src, ShaderStage::Vertex).unwrap();
        assert_eq!(interface.uniforms, vec!["uA", "uB[0]", "uB[1]"]);
    }

    #[test]
    fn test_errors_carry_position() {
        let err = parse("uniform float uBad[SIZE];", ShaderStage::Vertex).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("integer constant"));

        assert!(parse("#endif", ShaderStage::Vertex).is_err());
        assert!(parse("#ifdef A\nuniform float x;", ShaderStage::Vertex).is_err());
        assert!(parse("void main() {", ShaderStage::Vertex).is_err());
    }

    #[test]
    fn test_layout_qualified_declarations() {
        let src = "
            layout(location = 0) in vec3 aVertexPosition;
            layout(location = 1) in vec2 aTexCoords;
            layout(std140) uniform Camera { mat4 uProjection; };
            void main() {}
        ";
        let interface = parse(src, ShaderStage::Vertex).unwrap();
        assert_eq!(interface.attributes, vec!["aVertexPosition", "aTexCoords"]);
        assert_eq!(interface.uniforms, vec!["uProjection"]);
        assert_eq!(interface.functions, vec!["main"]);

        assert!(parse("layout(location = 0 in vec3 a;", ShaderStage::Vertex).is_err());
    }

    #[test]
    fn test_inline_struct_uniform_and_named_block() {
        let src = "
            uniform struct Fog { float near; float far; } uFog, uMist[2];
            uniform Lights { vec3 color; } uLights;
        ";
        let interface = parse(src, ShaderStage::Fragment).unwrap();
        assert_eq!(
            interface.uniforms,
            vec![
                "uFog.near",
                "uFog.far",
                "uMist[0].near",
                "uMist[0].far",
                "uMist[1].near",
                "uMist[1].far",
                "uLights.color",
            ]
        );
    }
}
