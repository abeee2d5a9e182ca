//! Schema compiler: parse, index and resolve
//!
//! The second pass binds every custom-typed field to its block by name.
//! Forward references are fine because resolution runs only after the
//! whole source has been consumed.

use tracing::{debug, info};

use super::parser::{BlockDef, FieldDef, Parser, TypeRef};
use super::table::SymbolTable;
use super::types::{Block, BlockIndex, Field, FieldType, Schema};
use crate::error::{ProtoError, ProtoResult};

/// Compile IDL source into a schema
pub fn compile(src: &[u8]) -> ProtoResult<Schema> {
    let defs = Parser::new(src).parse()?;
    if defs.is_empty() {
        return Err(ProtoError::NoBlocks);
    }

    let (by_name, max_id) = index_blocks(&defs)?;
    let by_id = dense_ids(&defs, max_id)?;

    let mut blocks = Vec::new();
    blocks
        .try_reserve_exact(defs.len())
        .map_err(|_| ProtoError::OutOfMemory("block table".into()))?;
    for def in defs {
        blocks.push(resolve_block(def, &by_name)?);
    }

    info!(blocks = blocks.len(), max_id, "schema compiled");
    Ok(Schema::from_parts(blocks, by_name, by_id, max_id))
}

/// Build the name index and reject duplicate names or ids
fn index_blocks(defs: &[BlockDef]) -> ProtoResult<(SymbolTable<BlockIndex>, u32)> {
    let mut by_name = SymbolTable::new();
    let mut seen_ids = SymbolTable::new();
    let mut max_id = 0;

    for (i, def) in defs.iter().enumerate() {
        if by_name.insert(def.name.as_bytes(), BlockIndex(i)).is_some() {
            return Err(ProtoError::parse(
                def.line,
                format!("duplicate block name '{}'", def.name),
            ));
        }
        if let Some(&BlockIndex(prev)) = seen_ids.get_id(def.id) {
            return Err(ProtoError::parse(
                def.line,
                format!(
                    "duplicate block id {} (already used by '{}')",
                    def.id, defs[prev].name
                ),
            ));
        }
        seen_ids.insert_id(def.id, BlockIndex(i));
        max_id = max_id.max(def.id);
        debug!(block = %def.name, id = def.id, fields = def.fields.len(), "block parsed");
    }

    Ok((by_name, max_id))
}

/// Lookup array indexed by `numeric_id - 1`
fn dense_ids(defs: &[BlockDef], max_id: u32) -> ProtoResult<Vec<Option<BlockIndex>>> {
    let len = max_id as usize;
    let mut by_id = Vec::new();
    by_id
        .try_reserve_exact(len)
        .map_err(|_| ProtoError::OutOfMemory(format!("id table of {len} slots")))?;
    by_id.resize(len, None);

    for (i, def) in defs.iter().enumerate() {
        by_id[def.id as usize - 1] = Some(BlockIndex(i));
    }
    Ok(by_id)
}

fn resolve_block(def: BlockDef, by_name: &SymbolTable<BlockIndex>) -> ProtoResult<Block> {
    let BlockDef {
        name, id, fields, ..
    } = def;

    let fields = fields
        .into_iter()
        .enumerate()
        .map(|(pos, field)| resolve_field(&name, pos, field, by_name))
        .collect::<ProtoResult<Vec<_>>>()?;

    Ok(Block {
        numeric_id: id,
        name,
        fields,
    })
}

fn resolve_field(
    block: &str,
    pos: usize,
    def: FieldDef,
    by_name: &SymbolTable<BlockIndex>,
) -> ProtoResult<Field> {
    let field_type = match def.type_ref {
        TypeRef::Integer => FieldType::Integer,
        TypeRef::Number => FieldType::Number,
        TypeRef::String => FieldType::String,
        TypeRef::Named(type_name) => match by_name.get(type_name.as_bytes()) {
            Some(&target) => {
                debug!(block, field = %def.name, target = %type_name, "custom type resolved");
                FieldType::Custom {
                    type_name,
                    block: target,
                }
            }
            None => {
                return Err(ProtoError::UndefinedType {
                    block: block.to_string(),
                    field: def.name,
                    type_name,
                })
            }
        },
    };

    Ok(Field {
        // bounded by MAX_FIELDS
        sequence_id: pos as u32 + 1,
        name: def.name,
        field_type,
        is_list: def.is_list,
        requirement: def.requirement,
    })
}
