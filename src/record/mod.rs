//! Record Binding - Dynamic Host Values
//!
//! A ready-made host for the reflective codec, shaped like the
//! dictionaries and lists of a scripting-language binding:
//!
//! 1. **Values** - `RecordValue` and the ordered `Record` map
//! 2. **Host** - `RecordGetter` for encode, `RecordBuilder` for decode
//! 3. **JSON** - conversion to and from `serde_json::Value`

pub mod host;
pub mod json;
pub mod value;

pub use host::{NodeId, RecordBuilder, RecordGetter};
pub use json::RecordError;
pub use value::{Record, RecordValue};

use crate::codec;
use crate::config::CodecConfig;
use crate::error::ProtoResult;
use crate::schema::Schema;

/// Encode a record as block `block_name`
pub fn encode_record(schema: &Schema, block_name: &str, record: &Record) -> ProtoResult<Vec<u8>> {
    encode_record_with(schema, block_name, record, &CodecConfig::default())
}

pub fn encode_record_with(
    schema: &Schema,
    block_name: &str,
    record: &Record,
    config: &CodecConfig,
) -> ProtoResult<Vec<u8>> {
    codec::encode_with(schema, block_name, record, &RecordGetter::new(), config)
}

/// Decode a frame into a fresh record, returning the root block id with it
pub fn decode_record(schema: &Schema, frame: &[u8]) -> ProtoResult<(u32, Record)> {
    decode_record_with(schema, frame, &CodecConfig::default())
}

pub fn decode_record_with(
    schema: &Schema,
    frame: &[u8],
    config: &CodecConfig,
) -> ProtoResult<(u32, Record)> {
    let mut builder = RecordBuilder::new();
    let root = builder.root();
    let id = codec::decode_with(schema, frame, root, &mut builder, config)?;
    Ok((id, builder.finish()))
}
