//! Schema Types - Blocks and Fields
//!
//! A `Schema` owns every block in a `Vec` arena. Fields that reference
//! other blocks hold a `BlockIndex` into that arena, bound once by the
//! compiler's resolution pass.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use super::compiler;
use super::table::SymbolTable;
use crate::error::{ErrorRecord, ProtoError, ProtoResult};

/// Wire kind of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Number,
    String,
    Custom,
    Nil,
}

impl ValueKind {
    /// Tag written in front of every encoded value
    pub fn tag(&self) -> i64 {
        match self {
            ValueKind::Integer => 1,
            ValueKind::Number => 2,
            ValueKind::String => 4,
            ValueKind::Custom => 8,
            ValueKind::Nil => 0x8000,
        }
    }

    /// Map a wire tag back to a kind; anything unrecognised is `None`
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            1 => Some(ValueKind::Integer),
            2 => Some(ValueKind::Number),
            4 => Some(ValueKind::String),
            8 => Some(ValueKind::Custom),
            0x8000 => Some(ValueKind::Nil),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Custom => "custom",
            ValueKind::Nil => "nil",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a block inside its schema's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockIndex(pub(crate) usize);

impl BlockIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Number,
    String,
    /// Reference to another block, resolved at compile time
    Custom {
        type_name: String,
        #[serde(skip_serializing)]
        block: BlockIndex,
    },
}

impl FieldType {
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldType::Integer => ValueKind::Integer,
            FieldType::Number => ValueKind::Number,
            FieldType::String => ValueKind::String,
            FieldType::Custom { .. } => ValueKind::Custom,
        }
    }

    /// Referenced block name for custom fields
    pub fn type_name(&self) -> Option<&str> {
        match self {
            FieldType::Custom { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// Referenced block for custom fields
    pub fn block(&self) -> Option<BlockIndex> {
        match self {
            FieldType::Custom { block, .. } => Some(*block),
            _ => None,
        }
    }

    fn display_name(&self) -> &str {
        match self {
            FieldType::Custom { type_name, .. } => type_name,
            other => other.kind().as_str(),
        }
    }
}

/// Whether a field must be present on encode and decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    #[default]
    Optional,
}

impl Requirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requirement::Required => "required",
            Requirement::Optional => "optional",
        }
    }
}

/// A field in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// 1-based position within the block
    pub sequence_id: u32,
    pub name: String,
    pub field_type: FieldType,
    pub is_list: bool,
    pub requirement: Requirement,
}

impl Field {
    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }

    pub fn kind(&self) -> ValueKind {
        self.field_type.kind()
    }
}

/// A message type: a numbered, named, ordered list of fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub numeric_id: u32,
    pub name: String,
    pub fields: Vec<Field>,
}

impl Block {
    /// Get field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A compiled schema
///
/// Immutable after compilation apart from the error slot, which records
/// the last codec failure run against it.
#[derive(Serialize)]
pub struct Schema {
    blocks: Vec<Block>,
    #[serde(skip)]
    by_name: SymbolTable<BlockIndex>,
    #[serde(skip)]
    by_id: Vec<Option<BlockIndex>>,
    max_id: u32,
    #[serde(skip)]
    last_error: Mutex<Option<ErrorRecord>>,
}

impl Schema {
    pub(crate) fn from_parts(
        blocks: Vec<Block>,
        by_name: SymbolTable<BlockIndex>,
        by_id: Vec<Option<BlockIndex>>,
        max_id: u32,
    ) -> Self {
        Self {
            blocks,
            by_name,
            by_id,
            max_id,
            last_error: Mutex::new(None),
        }
    }

    /// Compile IDL text
    pub fn parse(text: &str) -> ProtoResult<Self> {
        compiler::compile(text.as_bytes())
    }

    /// Compile IDL bytes; a leading UTF-8 BOM is skipped
    pub fn parse_bytes(bytes: &[u8]) -> ProtoResult<Self> {
        compiler::compile(bytes)
    }

    /// Read and compile an IDL file
    pub fn from_file(path: impl AsRef<Path>) -> ProtoResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProtoError::FileNotFound(path.display().to_string()),
            _ => ProtoError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            },
        })?;
        compiler::compile(&bytes)
    }

    /// Get block by name
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.block_index(name).map(|idx| &self.blocks[idx.0])
    }

    pub fn block_index(&self, name: &str) -> Option<BlockIndex> {
        self.by_name.get(name.as_bytes()).copied()
    }

    /// Get block by numeric id; zero, out-of-range and unused ids are `None`
    pub fn block_by_id(&self, id: u32) -> Option<&Block> {
        let slot = (id as usize).checked_sub(1)?;
        let idx = (*self.by_id.get(slot)?)?;
        Some(&self.blocks[idx.0])
    }

    pub fn block_at(&self, idx: BlockIndex) -> &Block {
        &self.blocks[idx.0]
    }

    /// All blocks in declaration order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Largest numeric id declared
    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    /// Last failure recorded against this schema
    pub fn error(&self) -> Option<ErrorRecord> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub(crate) fn record_error(&self, err: &ProtoError) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(err.record());
    }

    /// Human-readable listing of every block and field
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{} {}", block.name, block.numeric_id)?;
            for field in &block.fields {
                writeln!(
                    f,
                    "\t{} {}{} {}",
                    field.name,
                    field.field_type.display_name(),
                    if field.is_list { "[]" } else { "" },
                    field.requirement.as_str()
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("blocks", &self.blocks.len())
            .field("max_id", &self.max_id)
            .field("by_name", &self.by_name)
            .finish()
    }
}
