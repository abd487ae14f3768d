use super::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────

/// GLSL token, enough of the language to find declarations
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier or keyword
    Ident(String),
    /// Numeric literal, kept as written
    Number(String),
    /// Preprocessor line: `#name arg arg ...`
    Directive {
        /// Directive name without the `#`
        name: String,
        /// Whitespace-separated words after the name
        args: Vec<String>,
    },
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// Any other operator character
    Op(char),
    /// End of input
    Eof,
}

/// Token with its 1-based source position
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithPos {
    /// The token
    pub token: Token,
    /// Line
    pub line: usize,
    /// Column
    pub col: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

/// Splits GLSL source into [`Token`]s
pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    col: usize,
    /// Only whitespace seen since the last newline
    line_start: bool,
}

impl<'s> Lexer<'s> {
    /// Lex `src`
    pub const fn new(src: &'s str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            col: 1,
            line_start: true,
        }
    }

    /// Lex the whole source; the last token is always [`Token::Eof`]
    pub fn tokenize(mut self) -> Result<Vec<TokenWithPos>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let (line, col) = (self.line, self.col);
            let token = self.next_token()?;
            let eof = token == Token::Eof;
            tokens.push(TokenWithPos { token, line, col });
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
            self.line_start = true;
        } else {
            self.col += 1;
            if !ch.is_whitespace() {
                self.line_start = false;
            }
        }
        Some(ch)
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.line, self.col)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            let rest = &self.src[self.pos..];
            if rest.starts_with("//") {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.advance();
                }
            } else if rest.starts_with("/*") {
                let (line, col) = (self.line, self.col);
                self.advance();
                self.advance();
                loop {
                    if self.src[self.pos..].starts_with("*/") {
                        self.advance();
                        self.advance();
                        break;
                    }
                    if self.advance().is_none() {
                        return Err(ParseError::new("unterminated block comment", line, col));
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let Some(ch) = self.peek() else {
            return Ok(Token::Eof);
        };

        if ch == '#' {
            if !self.line_start {
                return Err(self.err("'#' must start a line"));
            }
            return Ok(self.lex_directive());
        }

        let single = match ch {
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ';' => Some(Token::Semicolon),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        match ch {
            c if c.is_ascii_digit() => Ok(self.lex_number()),
            '.' if matches!(self.src[self.pos + 1..].chars().next(), Some(c) if c.is_ascii_digit()) => {
                Ok(self.lex_number())
            }
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.lex_ident()),
            c if c.is_ascii_punctuation() => {
                self.advance();
                Ok(Token::Op(c))
            }
            other => Err(self.err(format!("unexpected character {other:?}"))),
        }
    }

    fn lex_directive(&mut self) -> Token {
        self.advance(); // consume `#`
        let start = self.pos;
        while !matches!(self.peek(), None | Some('\n')) {
            // line comments end the directive
            if self.src[self.pos..].starts_with("//") {
                break;
            }
            self.advance();
        }
        let mut words = self.src[start..self.pos].split_whitespace().map(str::to_string);
        let name = words.next().unwrap_or_default();
        Token::Directive {
            name,
            args: words.collect(),
        }
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '.') {
            self.advance();
        }
        Token::Number(self.src[start..self.pos].to_string())
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_declaration() {
        assert_eq!(
            tokens("uniform vec4 uUV;"),
            vec![
                Token::Ident("uniform".into()),
                Token::Ident("vec4".into()),
                Token::Ident("uUV".into()),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_directive_takes_rest_of_line() {
        let toks = tokens("  #define MAX_LIGHTS 4 // lights\nuniform");
        assert_eq!(
            toks[0],
            Token::Directive {
                name: "define".into(),
                args: vec!["MAX_LIGHTS".into(), "4".into()],
            }
        );
        assert_eq!(toks[1], Token::Ident("uniform".into()));
    }

    #[test]
    fn test_comments_and_numbers() {
        let toks = tokens("/* a\n b */ x = 1.0e3 * .5; // tail");
        assert_eq!(
            toks,
            vec![
                Token::Ident("x".into()),
                Token::Op('='),
                Token::Number("1.0e3".into()),
                Token::Op('*'),
                Token::Number(".5".into()),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let toks = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!((toks[1].line, toks[1].col), (2, 3));
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("/* open").tokenize().is_err());
        assert!(Lexer::new("x # y").tokenize().is_err());
        assert!(Lexer::new("float é;").tokenize().is_err());
    }
}
