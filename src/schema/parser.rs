//! IDL scanner and recursive-descent parser
//!
//! ```text
//! schema := block*
//! block  := IDENT POSITIVE_INT '{' field* '}'
//! field  := IDENT type ('[' ']')? flag? ';'
//! type   := 'integer' | 'number' | 'string' | IDENT
//! flag   := 'required' | 'optional'
//! ```
//!
//! Produces unresolved block definitions; binding custom type names to
//! blocks happens in the compiler once the whole text has been read.

use crate::error::{ProtoError, ProtoResult};
use crate::schema::types::Requirement;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Largest block id that fits the 24-bit id field
pub const MAX_BLOCK_ID: u32 = 0x00FF_FFFF;

/// Most fields a single block may declare
pub const MAX_FIELDS: usize = 255;

// ============================================================================
// Parsed definitions
// ============================================================================

/// Field type as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeRef {
    Integer,
    Number,
    String,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldDef {
    pub name: String,
    pub type_ref: TypeRef,
    pub is_list: bool,
    pub requirement: Requirement,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockDef {
    pub name: String,
    pub id: u32,
    pub line: usize,
    pub fields: Vec<FieldDef>,
}

// ============================================================================
// Parser
// ============================================================================

#[inline]
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        let pos = if src.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        Self { src, pos, line: 1 }
    }

    /// Parse every block in the source; the first error aborts
    pub fn parse(mut self) -> ProtoResult<Vec<BlockDef>> {
        let mut blocks = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_eof() {
                break;
            }
            blocks.push(self.parse_block()?);
        }
        Ok(blocks)
    }

    fn error(&self, message: impl Into<String>) -> ProtoError {
        ProtoError::parse(self.line, message)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    /// Skip whitespace (bytes <= 0x20) and `#` comments, counting lines
    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b'#' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                0..=0x20 => self.pos += 1,
                _ => break,
            }
        }
    }

    /// Read `[A-Za-z0-9_]*` at the cursor
    fn ident(&mut self) -> &'a [u8] {
        let start = self.pos;
        while self.peek().map_or(false, is_ident_byte) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn parse_block(&mut self) -> ProtoResult<BlockDef> {
        let line = self.line;
        let name = self.block_name()?;
        let id = self.block_id()?;
        let fields = self.block_body()?;

        Ok(BlockDef {
            name,
            id,
            line,
            fields,
        })
    }

    fn block_name(&mut self) -> ProtoResult<String> {
        if self.peek().map_or(false, |b| b.is_ascii_digit()) {
            return Err(self.error("invalid block name"));
        }

        let name = self.ident();
        if name.is_empty() {
            return Err(self.error("can't find block name"));
        }
        Ok(String::from_utf8_lossy(name).into_owned())
    }

    fn block_id(&mut self) -> ProtoResult<u32> {
        self.skip_trivia();
        match self.peek() {
            None => return Err(self.error("incomplete block")),
            Some(b) if !b.is_ascii_digit() => return Err(self.error("invalid block id")),
            Some(_) => {}
        }

        let mut id: u64 = 0;
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            id = id.saturating_mul(10).saturating_add(u64::from(b - b'0'));
            self.pos += 1;
        }

        if self.peek().map_or(false, is_ident_byte) {
            return Err(self.error("invalid block id"));
        }
        if id == 0 {
            return Err(self.error("block id must be greater than 0"));
        }
        if id > u64::from(MAX_BLOCK_ID) {
            return Err(self.error(format!(
                "block id out of range (max {MAX_BLOCK_ID})"
            )));
        }
        Ok(id as u32)
    }

    fn block_body(&mut self) -> ProtoResult<Vec<FieldDef>> {
        self.skip_trivia();
        match self.peek() {
            None => return Err(self.error("undefined block body")),
            Some(b'{') => self.pos += 1,
            Some(_) => return Err(self.error("missing '{' before block body")),
        }

        let mut fields: Vec<FieldDef> = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error("not found block terminator")),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(fields);
                }
                Some(_) => {}
            }

            let field = self.field()?;
            if fields.len() == MAX_FIELDS {
                return Err(ProtoError::parse(
                    field.line,
                    format!("too many fields (max {MAX_FIELDS})"),
                ));
            }
            if fields.iter().any(|f| f.name == field.name) {
                return Err(ProtoError::parse(
                    field.line,
                    format!("duplicate field name '{}'", field.name),
                ));
            }
            fields.push(field);
        }
    }

    fn field(&mut self) -> ProtoResult<FieldDef> {
        let line = self.line;

        if self.peek().map_or(false, |b| b.is_ascii_digit()) {
            return Err(self.error("invalid field name"));
        }
        let name = self.ident();
        if name.is_empty() {
            return Err(self.error("invalid field name"));
        }
        let name = String::from_utf8_lossy(name).into_owned();

        self.skip_trivia();
        let type_ref = self.field_type()?;
        let is_list = self.list_marker()?;
        let requirement = self.field_flag()?;

        self.skip_trivia();
        if self.peek() != Some(b';') {
            return Err(self.error("missing field terminator ';'"));
        }
        self.pos += 1;

        Ok(FieldDef {
            name,
            type_ref,
            is_list,
            requirement,
            line,
        })
    }

    fn field_type(&mut self) -> ProtoResult<TypeRef> {
        if self.peek().map_or(false, |b| b.is_ascii_digit()) {
            return Err(self.error("invalid field type"));
        }

        Ok(match self.ident() {
            b"" => return Err(self.error("invalid field type")),
            b"integer" => TypeRef::Integer,
            b"number" => TypeRef::Number,
            b"string" => TypeRef::String,
            other => TypeRef::Named(String::from_utf8_lossy(other).into_owned()),
        })
    }

    fn list_marker(&mut self) -> ProtoResult<bool> {
        self.skip_trivia();
        if self.peek() != Some(b'[') {
            return Ok(false);
        }
        self.pos += 1;

        self.skip_trivia();
        if self.peek() != Some(b']') {
            return Err(self.error("invalid list marker, expected '[]'"));
        }
        self.pos += 1;
        Ok(true)
    }

    fn field_flag(&mut self) -> ProtoResult<Requirement> {
        self.skip_trivia();
        match self.ident() {
            b"" | b"optional" => Ok(Requirement::Optional),
            b"required" => Ok(Requirement::Required),
            _ => Err(self.error("unknown field flag")),
        }
    }
}
