//! Reflective encoder
//!
//! Walks a block's fields in declaration order, pulling each value from
//! the host through a [`Getter`], and writes the raw tagged stream. The
//! stream is then compressed and sealed with its checksum.

use tracing::debug;

use super::context::{CodecError, EncodeContext};
use super::value::{FieldKey, Getter, Value};
use super::wire::{self, WireError, FORMAT_VERSION};
use crate::config::CodecConfig;
use crate::error::{ProtoError, ProtoResult};
use crate::schema::{Block, BlockIndex, Field, FieldType, Schema, ValueKind};

/// Encode `userdata` as block `block_name` with the default limits
pub fn encode<G: Getter>(
    schema: &Schema,
    block_name: &str,
    userdata: G::Userdata,
    getter: &G,
) -> ProtoResult<Vec<u8>> {
    encode_with(schema, block_name, userdata, getter, &CodecConfig::default())
}

/// Encode `userdata` as block `block_name`
///
/// On failure nothing is returned and the error is also stored in the
/// schema's error slot.
pub fn encode_with<G: Getter>(
    schema: &Schema,
    block_name: &str,
    userdata: G::Userdata,
    getter: &G,
    config: &CodecConfig,
) -> ProtoResult<Vec<u8>> {
    let result = encode_frame(schema, block_name, &userdata, getter, config);
    match &result {
        Ok(frame) => debug!(block = block_name, bytes = frame.len(), "encoded"),
        Err(e) => schema.record_error(e),
    }
    result
}

fn encode_frame<G: Getter>(
    schema: &Schema,
    block_name: &str,
    userdata: &G::Userdata,
    getter: &G,
    config: &CodecConfig,
) -> ProtoResult<Vec<u8>> {
    let root = schema
        .block_index(block_name)
        .ok_or_else(|| ProtoError::UnknownBlock(block_name.to_string()))?;

    let mut encoder = Encoder {
        schema,
        getter,
        max_depth: config.max_depth,
        out: EncodeContext::with_header(&[FORMAT_VERSION, 0, 0]).map_err(codec_error)?,
    };
    encoder.encode_block(root, userdata, 0)?;

    let raw = encoder.out.into_inner();
    let mut frame = wire::compress(&raw).map_err(wire_error)?;
    wire::seal(&mut frame);
    Ok(frame)
}

fn codec_error(err: CodecError) -> ProtoError {
    match err {
        CodecError::OutOfMemory(n) => ProtoError::OutOfMemory(format!("{n} bytes")),
        other => ProtoError::Encode(other.to_string()),
    }
}

fn wire_error(err: WireError) -> ProtoError {
    match err {
        WireError::OutOfMemory(n) => ProtoError::OutOfMemory(format!("{n} bytes")),
        other => ProtoError::Encode(other.to_string()),
    }
}

fn field_key<'a>(block: &'a Block, field: &'a Field, index: Option<usize>) -> FieldKey<'a> {
    FieldKey {
        block: &block.name,
        name: &field.name,
        index,
        type_name: field.field_type.type_name(),
        kind: field.kind(),
        is_list: field.is_list,
    }
}

struct Encoder<'s, G: Getter> {
    schema: &'s Schema,
    getter: &'s G,
    max_depth: usize,
    out: EncodeContext,
}

impl<G: Getter> Encoder<'_, G> {
    fn encode_block(&mut self, idx: BlockIndex, ud: &G::Userdata, depth: usize) -> ProtoResult<()> {
        let schema = self.schema;
        let block = schema.block_at(idx);
        if depth > self.max_depth {
            return Err(ProtoError::Encode(format!(
                "block({}) nested deeper than {}",
                block.name, self.max_depth
            )));
        }

        self.out
            .write_integer(i64::from(block.numeric_id))
            .map_err(codec_error)?;
        for field in &block.fields {
            if field.is_list {
                self.encode_list(block, field, ud, depth)?;
            } else {
                self.encode_value(block, field, ud, None, depth)?;
            }
        }
        Ok(())
    }

    fn encode_list(
        &mut self,
        block: &Block,
        field: &Field,
        ud: &G::Userdata,
        depth: usize,
    ) -> ProtoResult<()> {
        let getter = self.getter;
        let key = field_key(block, field, None);
        let count = getter.get(ud, &key).map_err(|e| {
            ProtoError::Encode(format!(
                "get field({}:{}) element size error: {e}",
                block.name, field.name
            ))
        })?;

        let count = match count {
            Value::Integer(n) => usize::try_from(n).map_err(|_| {
                ProtoError::Encode(format!(
                    "field({}:{}) has negative element size {n}",
                    block.name, field.name
                ))
            })?,
            other if field.is_required() => {
                return Err(ProtoError::Encode(format!(
                    "field({}:{}) element size must be integer, got {}",
                    block.name,
                    field.name,
                    other.kind()
                )))
            }
            _ => {
                self.write_nil()?;
                return Ok(());
            }
        };

        self.out
            .write_integer(ValueKind::Integer.tag())
            .map_err(codec_error)?;
        self.out.write_integer(count as i64).map_err(codec_error)?;
        for index in 0..count {
            self.encode_value(block, field, ud, Some(index), depth)?;
        }
        Ok(())
    }

    fn encode_value(
        &mut self,
        block: &Block,
        field: &Field,
        ud: &G::Userdata,
        index: Option<usize>,
        depth: usize,
    ) -> ProtoResult<()> {
        let getter = self.getter;
        let key = field_key(block, field, index);
        let value = getter.get(ud, &key).map_err(|e| {
            ProtoError::Encode(format!("get field({}:{}) error: {e}", block.name, field.name))
        })?;

        let expected = field.kind();
        if value.kind() != expected {
            if field.is_required() {
                return Err(match value {
                    Value::Nil => ProtoError::Encode(format!(
                        "required field({}:{}) but got nil",
                        block.name, field.name
                    )),
                    other => ProtoError::Encode(format!(
                        "field({}:{}) type not match expect {expected} got {}",
                        block.name,
                        field.name,
                        other.kind()
                    )),
                });
            }
            // Optional: a mismatched value is written as absent.
            return self.write_nil();
        }

        match value {
            Value::Integer(i) => {
                self.out.write_integer(expected.tag()).map_err(codec_error)?;
                self.out.write_integer(i).map_err(codec_error)?;
            }
            Value::String(s) => {
                self.out.write_integer(expected.tag()).map_err(codec_error)?;
                self.out.write_string(s).map_err(codec_error)?;
            }
            Value::Custom(child) => {
                let FieldType::Custom { block: target, .. } = field.field_type else {
                    return Err(ProtoError::Encode(format!(
                        "field({}:{}) is not a custom type",
                        block.name, field.name
                    )));
                };
                self.out.write_integer(expected.tag()).map_err(codec_error)?;
                self.encode_block(target, &child, depth + 1)?;
            }
            Value::Number(_) => {
                return Err(ProtoError::Encode(format!(
                    "field({}:{}) number type not supported",
                    block.name, field.name
                )))
            }
            Value::Nil => return self.write_nil(),
        }
        Ok(())
    }

    fn write_nil(&mut self) -> ProtoResult<()> {
        self.out
            .write_integer(ValueKind::Nil.tag())
            .map_err(codec_error)?;
        Ok(())
    }
}
