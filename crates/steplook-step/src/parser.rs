//! Part 21 parser: builds a raw entity table from tokens.
//!
//! The parser does not interpret entity semantics. Each instance keeps its
//! id, its records (one for simple instances, several for complex
//! `#id = (A(..) B(..));` instances), and an [`EntityKind`] telling the
//! resolver whether the type tag is one it maps.

use crate::error::ParseError;
use crate::lexer::{Lexer, Position, SpannedToken, Token};
use crate::schema;
use rustc_hash::FxHashMap;

/// One attribute value of an instance record.
#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    /// Instance name, `#n`.
    EntityRef(u64),
    /// String literal.
    String(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration (e.g., `.T.`).
    Enum(String),
    /// Parenthesized aggregate.
    List(Vec<StepValue>),
    /// `*`: the schema derives this attribute.
    Derived,
    /// `$`: attribute omitted.
    Null,
    /// Typed value such as `PLANE_ANGLE_MEASURE(0.01745)`.
    Typed {
        /// The type name.
        type_name: String,
        /// Arguments.
        args: Vec<StepValue>,
    },
}

impl StepValue {
    /// The referenced instance id, if this is `#n`.
    pub fn as_entity_ref(&self) -> Option<u64> {
        match self {
            StepValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Numeric value. Integers widen and single-argument typed measures unwrap.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            StepValue::Real(v) => Some(*v),
            StepValue::Integer(v) => Some(*v as f64),
            StepValue::Typed { args, .. } if args.len() == 1 => args[0].as_real(),
            _ => None,
        }
    }

    /// Integer value; reals are not truncated.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StepValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// String contents.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Enumeration label without the dots.
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            StepValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// `.T.` or `.F.` as a bool. `.U.` yields `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    /// Aggregate members.
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the attribute was omitted with `$`.
    pub fn is_null(&self) -> bool {
        matches!(self, StepValue::Null)
    }

    /// Whether the attribute is `*`.
    pub fn is_derived(&self) -> bool {
        matches!(self, StepValue::Derived)
    }

    /// Short description of the value kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StepValue::EntityRef(_) => "reference",
            StepValue::String(_) => "string",
            StepValue::Real(_) => "real",
            StepValue::Integer(_) => "integer",
            StepValue::Enum(_) => "enumeration",
            StepValue::List(_) => "list",
            StepValue::Derived => "derived value",
            StepValue::Null => "null",
            StepValue::Typed { .. } => "typed value",
        }
    }
}

/// One `TYPE_NAME(args)` record of an entity instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Type name (e.g., `CARTESIAN_POINT`).
    pub type_name: String,
    /// Arguments in declaration order.
    pub args: Vec<StepValue>,
}

/// Whether the resolver has a typed mapping for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// At least one record has a known type tag.
    Recognized,
    /// No record is in the mapped schema subset.
    Unrecognized,
}

/// A parsed STEP entity instance.
#[derive(Debug, Clone)]
pub struct StepEntity {
    /// Entity ID (from `#123`).
    pub id: u64,
    /// Records; a simple instance has exactly one.
    pub records: Vec<Record>,
    /// Whether the instance used the complex `(A() B())` form.
    pub complex: bool,
    /// Mapping status of the type tag.
    pub kind: EntityKind,
    /// Where the instance starts in the source.
    pub pos: Position,
    primary: usize,
}

impl StepEntity {
    /// Build an entity, classifying it against the mapped schema.
    pub fn new(id: u64, records: Vec<Record>, complex: bool, pos: Position) -> Self {
        let known = records.iter().position(|r| schema::is_known(&r.type_name));
        let kind = if known.is_some() {
            EntityKind::Recognized
        } else {
            EntityKind::Unrecognized
        };
        Self {
            id,
            records,
            complex,
            kind,
            pos,
            primary: known.unwrap_or(0),
        }
    }

    /// Type tag of the instance.
    ///
    /// For complex instances this is the first record with a mapped tag,
    /// falling back to the first record.
    pub fn type_name(&self) -> &str {
        self.records
            .get(self.primary)
            .map(|r| r.type_name.as_str())
            .unwrap_or("")
    }

    /// Arguments of the primary record.
    pub fn args(&self) -> &[StepValue] {
        self.records
            .get(self.primary)
            .map(|r| r.args.as_slice())
            .unwrap_or(&[])
    }

    /// Find a record by type name.
    pub fn record(&self, type_name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.type_name == type_name)
    }

    /// Whether any record has this type name.
    pub fn has_record(&self, type_name: &str) -> bool {
        self.record(type_name).is_some()
    }

    /// Whether the resolver can type this instance.
    pub fn is_recognized(&self) -> bool {
        self.kind == EntityKind::Recognized
    }
}

/// Header records and data instances of one exchange file.
#[derive(Debug, Clone, Default)]
pub struct StepFile {
    /// Header section records (FILE_DESCRIPTION, FILE_NAME, FILE_SCHEMA).
    pub header: Vec<Record>,
    /// DATA section instances keyed by instance id.
    pub entities: FxHashMap<u64, StepEntity>,
}

impl StepFile {
    /// Instance `#id`, if defined.
    pub fn get(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// All entities with this type tag, in ascending id order.
    pub fn entities_of_type(&self, type_name: &str) -> Vec<&StepEntity> {
        let mut found: Vec<&StepEntity> = self
            .entities
            .values()
            .filter(|e| e.type_name() == type_name)
            .collect();
        found.sort_unstable_by_key(|e| e.id);
        found
    }

    /// All complex instances containing a record with this name, in id order.
    pub fn entities_with_record(&self, type_name: &str) -> Vec<&StepEntity> {
        let mut found: Vec<&StepEntity> = self
            .entities
            .values()
            .filter(|e| e.has_record(type_name))
            .collect();
        found.sort_unstable_by_key(|e| e.id);
        found
    }

    /// Schema name from the FILE_SCHEMA header record, if present.
    pub fn schema_name(&self) -> Option<&str> {
        self.header
            .iter()
            .find(|r| r.type_name == "FILE_SCHEMA")?
            .args
            .first()?
            .as_list()?
            .first()?
            .as_string()
    }

    /// Number of data entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the data section is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Deepest aggregate nesting accepted inside one attribute.
pub const MAX_NESTING: usize = 256;

/// Recursive-descent parser over the token stream.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    eof: Position,
    /// Open parentheses around the current value.
    depth: usize,
}

impl Parser {
    /// Lex and parse a whole exchange file.
    pub fn parse(input: &[u8]) -> Result<StepFile, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            eof: lexer.position(),
            depth: 0,
        };
        parser.parse_file()
    }

    fn parse_file(&mut self) -> Result<StepFile, ParseError> {
        let mut file = StepFile::default();

        self.expect_keyword("ISO-10303-21")?;
        self.expect_token(&Token::Semicolon, "';' after ISO-10303-21")?;

        loop {
            if self.at_keyword("HEADER") {
                self.advance();
                self.expect_token(&Token::Semicolon, "';' after HEADER")?;
                file.header = self.parse_header_records()?;
                self.expect_keyword("ENDSEC")?;
                self.expect_token(&Token::Semicolon, "';' after ENDSEC")?;
            } else if self.at_keyword("DATA") {
                self.advance();
                // DATA may carry a parameter list in edition 3 files.
                if self.at_token(&Token::LParen) {
                    self.parse_args()?;
                }
                self.expect_token(&Token::Semicolon, "';' after DATA")?;
                self.parse_data_section(&mut file.entities)?;
                self.expect_keyword("ENDSEC")?;
                self.expect_token(&Token::Semicolon, "';' after ENDSEC")?;
            } else if self.at_keyword("END-ISO-10303-21") {
                self.advance();
                self.expect_token(&Token::Semicolon, "';' after END-ISO-10303-21")?;
                return Ok(file);
            } else if self.is_at_end() {
                return Err(self.error_here("missing END-ISO-10303-21"));
            } else {
                let found = self.describe_current();
                return Err(self.error_here(format!("expected section keyword, got {found}")));
            }
        }
    }

    fn parse_header_records(&mut self) -> Result<Vec<Record>, ParseError> {
        let mut records = Vec::new();
        while let Some(Token::Keyword(name)) = self.peek().map(|t| &t.token) {
            if name == "ENDSEC" {
                break;
            }
            let record = self.parse_record()?;
            self.expect_token(&Token::Semicolon, "';' after header record")?;
            records.push(record);
        }
        Ok(records)
    }

    fn parse_data_section(
        &mut self,
        entities: &mut FxHashMap<u64, StepEntity>,
    ) -> Result<(), ParseError> {
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.error_here("missing ENDSEC at end of DATA section"));
            };
            let start = tok.pos;
            let id = match &tok.token {
                Token::EntityRef(id) => *id,
                Token::Keyword(k) if k == "ENDSEC" => return Ok(()),
                _ => {
                    let found = self.describe_current();
                    return Err(self.error_here(format!(
                        "expected entity instance or ENDSEC, got {found}"
                    )));
                }
            };
            self.advance();
            self.expect_token(&Token::Equals, "'=' after entity id")?;

            let (records, complex) = if self.at_token(&Token::LParen) {
                (self.parse_complex_records()?, true)
            } else {
                (vec![self.parse_record()?], false)
            };

            if !self.at_token(&Token::Semicolon) {
                let found = self.describe_current();
                return Err(self.error_here(format!(
                    "unterminated statement: expected ';' after entity #{id}, got {found}"
                )));
            }
            self.advance();

            if entities.contains_key(&id) {
                return Err(ParseError::new(
                    start.line,
                    start.col,
                    format!("duplicate entity id #{id}"),
                ));
            }
            entities.insert(id, StepEntity::new(id, records, complex, start));
        }
    }

    fn parse_complex_records(&mut self) -> Result<Vec<Record>, ParseError> {
        self.advance(); // '('
        let mut records = Vec::new();
        loop {
            match self.peek().map(|t| &t.token) {
                Some(Token::Keyword(_)) => records.push(self.parse_record()?),
                Some(Token::RParen) => {
                    self.advance();
                    break;
                }
                None | Some(Token::Semicolon) => {
                    return Err(self.error_here("unbalanced parentheses in complex entity"));
                }
                Some(_) => {
                    let found = self.describe_current();
                    return Err(self.error_here(format!(
                        "expected record in complex entity, got {found}"
                    )));
                }
            }
        }
        if records.is_empty() {
            return Err(self.error_here("complex entity without records"));
        }
        Ok(records)
    }

    fn parse_record(&mut self) -> Result<Record, ParseError> {
        let type_name = match self.peek().map(|t| &t.token) {
            Some(Token::Keyword(name)) => name.clone(),
            _ => {
                let found = self.describe_current();
                return Err(self.error_here(format!("expected type name, got {found}")));
            }
        };
        self.advance();
        let args = self.parse_args()?;
        Ok(Record { type_name, args })
    }

    fn parse_args(&mut self) -> Result<Vec<StepValue>, ParseError> {
        self.expect_token(&Token::LParen, "'('")?;
        self.parse_list_tail()
    }

    /// Parse values up to and including the closing `)`.
    fn parse_list_tail(&mut self) -> Result<Vec<StepValue>, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here(format!("aggregates nested deeper than {MAX_NESTING}")));
        }
        self.depth += 1;
        let values = self.parse_list_items();
        self.depth -= 1;
        values
    }

    fn parse_list_items(&mut self) -> Result<Vec<StepValue>, ParseError> {
        let mut values = Vec::new();
        if self.at_token(&Token::RParen) {
            self.advance();
            return Ok(values);
        }
        loop {
            values.push(self.parse_value()?);
            match self.peek().map(|t| &t.token) {
                Some(Token::Comma) => {
                    self.advance();
                }
                Some(Token::RParen) => {
                    self.advance();
                    return Ok(values);
                }
                None | Some(Token::Semicolon) => {
                    return Err(self.error_here("unbalanced parentheses"));
                }
                Some(_) => {
                    let found = self.describe_current();
                    return Err(self.error_here(format!("expected ',' or ')', got {found}")));
                }
            }
        }
    }

    fn parse_value(&mut self) -> Result<StepValue, ParseError> {
        let Some(tok) = self.peek() else {
            return Err(self.error_here("unbalanced parentheses"));
        };
        let value = match &tok.token {
            Token::EntityRef(id) => StepValue::EntityRef(*id),
            Token::String(s) => StepValue::String(s.clone()),
            Token::Real(v) => StepValue::Real(*v),
            Token::Integer(v) => StepValue::Integer(*v),
            Token::Enum(s) => StepValue::Enum(s.clone()),
            Token::Asterisk => StepValue::Derived,
            Token::Dollar => StepValue::Null,
            Token::LParen => {
                self.advance();
                return Ok(StepValue::List(self.parse_list_tail()?));
            }
            Token::Keyword(_) => {
                let Record { type_name, args } = self.parse_record()?;
                return Ok(StepValue::Typed { type_name, args });
            }
            Token::Semicolon => return Err(self.error_here("unbalanced parentheses")),
            Token::RParen | Token::Comma | Token::Equals => {
                let found = self.describe_current();
                return Err(self.error_here(format!("expected value, got {found}")));
            }
        };
        self.advance();
        Ok(value)
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_token(&self, expected: &Token) -> bool {
        self.peek().is_some_and(|t| &t.token == expected)
    }

    fn at_keyword(&self, name: &str) -> bool {
        matches!(self.peek(), Some(SpannedToken { token: Token::Keyword(k), .. }) if k == name)
    }

    fn current_pos(&self) -> Position {
        self.peek().map(|t| t.pos).unwrap_or(self.eof)
    }

    fn error_here(&self, reason: impl Into<String>) -> ParseError {
        let pos = self.current_pos();
        ParseError::new(pos.line, pos.col, reason)
    }

    fn describe_current(&self) -> String {
        match self.peek().map(|t| &t.token) {
            None => "end of input".into(),
            Some(Token::Keyword(k)) => format!("keyword {k}"),
            Some(Token::EntityRef(id)) => format!("#{id}"),
            Some(Token::String(_)) => "string".into(),
            Some(Token::Real(v)) => format!("real {v}"),
            Some(Token::Integer(v)) => format!("integer {v}"),
            Some(Token::Enum(e)) => format!(".{e}."),
            Some(Token::LParen) => "'('".into(),
            Some(Token::RParen) => "')'".into(),
            Some(Token::Comma) => "','".into(),
            Some(Token::Semicolon) => "';'".into(),
            Some(Token::Equals) => "'='".into(),
            Some(Token::Asterisk) => "'*'".into(),
            Some(Token::Dollar) => "'$'".into(),
        }
    }

    fn expect_token(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        if self.at_token(expected) {
            self.advance();
            Ok(())
        } else {
            let found = self.describe_current();
            Err(self.error_here(format!("expected {what}, got {found}")))
        }
    }

    fn expect_keyword(&mut self, name: &str) -> Result<(), ParseError> {
        if self.at_keyword(name) {
            self.advance();
            Ok(())
        } else {
            let found = self.describe_current();
            Err(self.error_here(format!("missing {name}, got {found}")))
        }
    }
}
