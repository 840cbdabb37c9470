//! Tokenizer for ISO 10303-21 exchange files.
//!
//! Produces a flat token stream. Recognized:
//! - bare words such as `ADVANCED_FACE`, `DATA` and `END-ISO-10303-21`
//! - instance names such as `#42`
//! - quoted strings, where `''` stands for one quote
//! - reals (`2.5E-7`, `-3.`, `0.`) and integers
//! - enumeration literals such as `.T.` and `.FORWARD.`
//! - the separators `( ) , ; =` and the `$` / `*` placeholders
//!
//! Every token carries the line and column it starts at so the parser can
//! report positions.

use crate::error::ParseError;

/// A token in a STEP file.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: an entity type name or a section keyword.
    Keyword(String),
    /// Instance name; `#42` lexes to `EntityRef(42)`.
    EntityRef(u64),
    /// Quoted string, quotes stripped and escapes decoded.
    String(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (e.g., `.T.` becomes `Enum("T")`).
    Enum(String),
    /// Left parenthesis `(`.
    LParen,
    /// Right parenthesis `)`.
    RParen,
    /// Comma `,`.
    Comma,
    /// Semicolon `;`.
    Semicolon,
    /// Equals `=`.
    Equals,
    /// `*`, a value derived by the schema.
    Asterisk,
    /// `$`, an omitted attribute.
    Dollar,
}

/// Position in the source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub col: usize,
}

/// Token plus the line and column it starts at.
#[derive(Debug, Clone)]
pub struct SpannedToken {
    /// The token.
    pub token: Token,
    /// Position where the token starts.
    pub pos: Position,
}

/// Byte-oriented Part 21 tokenizer.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Lexer positioned at the start of `input`.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, ParseError> {
        // Roughly one token per 4 bytes in typical exporter output.
        let mut tokens = Vec::with_capacity(self.input.len() / 4);
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    /// Position just past the last consumed byte.
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
        }
    }

    /// Next token; `Ok(None)` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Option<SpannedToken>, ParseError> {
        self.skip_whitespace_and_comments()?;

        let Some(ch) = self.peek_byte() else {
            return Ok(None);
        };
        let start_pos = self.position();

        let token = match ch {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'=' => self.single(Token::Equals),
            b'*' => self.single(Token::Asterisk),
            b'$' => self.single(Token::Dollar),
            b'#' => self.read_entity_ref()?,
            b'\'' => self.read_string()?,
            b'.' => self.read_enum()?,
            b'-' | b'+' | b'0'..=b'9' => self.read_number()?,
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => self.read_keyword(),
            _ => {
                return Err(self.error_here(format!(
                    "unexpected character: '{}'",
                    ch.escape_ascii()
                )));
            }
        };

        Ok(Some(SpannedToken {
            token,
            pos: start_pos,
        }))
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn error_here(&self, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.line, self.col, reason)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ParseError> {
        loop {
            while let Some(ch) = self.peek_byte() {
                if ch.is_ascii_whitespace() {
                    self.bump();
                } else {
                    break;
                }
            }

            if self.peek_byte() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let (line, col) = (self.line, self.col);
                self.bump();
                self.bump();
                loop {
                    match self.peek_byte() {
                        None => return Err(ParseError::new(line, col, "unterminated comment")),
                        Some(b'*') if self.peek_at(1) == Some(b'/') => {
                            self.bump();
                            self.bump();
                            break;
                        }
                        Some(_) => {
                            self.bump();
                        }
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    fn take_digits(&mut self, out: &mut String) -> usize {
        let mut n = 0;
        while let Some(ch) = self.peek_byte() {
            if !ch.is_ascii_digit() {
                break;
            }
            out.push(ch as char);
            self.bump();
            n += 1;
        }
        n
    }

    fn read_entity_ref(&mut self) -> Result<Token, ParseError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // '#'

        let mut digits = String::new();
        if self.take_digits(&mut digits) == 0 {
            return Err(ParseError::new(line, col, "expected digits after '#'"));
        }
        let id: u64 = digits
            .parse()
            .map_err(|_| ParseError::new(line, col, format!("invalid entity id: {digits}")))?;
        Ok(Token::EntityRef(id))
    }

    fn read_string(&mut self) -> Result<Token, ParseError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // opening quote

        let mut content = Vec::new();
        loop {
            match self.peek_byte() {
                None => return Err(ParseError::new(line, col, "unterminated string")),
                Some(b'\'') => {
                    self.bump();
                    if self.peek_byte() == Some(b'\'') {
                        content.push(b'\'');
                        self.bump();
                    } else {
                        break;
                    }
                }
                Some(ch) => {
                    content.push(ch);
                    self.bump();
                }
            }
        }

        Ok(Token::String(String::from_utf8_lossy(&content).into_owned()))
    }

    fn read_enum(&mut self) -> Result<Token, ParseError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // opening '.'

        let mut name = String::new();
        loop {
            match self.peek_byte() {
                Some(b'.') => {
                    self.bump();
                    break;
                }
                Some(ch) if ch.is_ascii_alphanumeric() || ch == b'_' => {
                    name.push(ch.to_ascii_uppercase() as char);
                    self.bump();
                }
                Some(ch) => {
                    return Err(ParseError::new(
                        line,
                        col,
                        format!("invalid character in enumeration: '{}'", ch.escape_ascii()),
                    ));
                }
                None => return Err(ParseError::new(line, col, "unterminated enumeration")),
            }
        }

        if name.is_empty() {
            return Err(ParseError::new(line, col, "empty enumeration"));
        }
        Ok(Token::Enum(name))
    }

    /// Reads `[sign] digits [. digits*] [E [sign] digits]`.
    ///
    /// Part 21 reals always carry the decimal point, possibly with no
    /// fraction digits (`0.`, `1.E-5`).
    fn read_number(&mut self) -> Result<Token, ParseError> {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        let mut is_real = false;

        if let Some(ch @ (b'-' | b'+')) = self.peek_byte() {
            text.push(ch as char);
            self.bump();
        }

        if self.take_digits(&mut text) == 0 {
            return Err(ParseError::new(
                line,
                col,
                format!("malformed number: '{text}' has no digits"),
            ));
        }

        if self.peek_byte() == Some(b'.') {
            is_real = true;
            text.push('.');
            self.bump();
            self.take_digits(&mut text);
        }

        if let Some(b'E' | b'e') = self.peek_byte() {
            is_real = true;
            text.push('E');
            self.bump();
            if let Some(ch @ (b'-' | b'+')) = self.peek_byte() {
                text.push(ch as char);
                self.bump();
            }
            if self.take_digits(&mut text) == 0 {
                return Err(ParseError::new(
                    line,
                    col,
                    format!("malformed number: exponent of '{text}' has no digits"),
                ));
            }
        }

        // `1.2.3` or `12AB` cannot start a new token without a separator.
        if let Some(ch) = self.peek_byte() {
            if ch == b'.' || ch.is_ascii_alphanumeric() || ch == b'_' {
                return Err(ParseError::new(
                    line,
                    col,
                    format!("malformed number: '{text}' followed by '{}'", ch.escape_ascii()),
                ));
            }
        }

        if is_real {
            let val: f64 = text
                .parse()
                .map_err(|_| ParseError::new(line, col, format!("invalid real number: {text}")))?;
            Ok(Token::Real(val))
        } else {
            let val: i64 = text
                .parse()
                .map_err(|_| ParseError::new(line, col, format!("invalid integer: {text}")))?;
            Ok(Token::Integer(val))
        }
    }

    fn read_keyword(&mut self) -> Token {
        let mut name = String::new();
        while let Some(ch) = self.peek_byte() {
            // hyphens appear in ISO-10303-21 and END-ISO-10303-21
            if ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'-' {
                name.push(ch.to_ascii_uppercase() as char);
                self.bump();
            } else {
                break;
            }
        }
        Token::Keyword(name)
    }
}
