//! Reflective decoder
//!
//! Verifies and expands a frame, then replays the tagged stream into the
//! host through a [`Setter`]. Returns the numeric id of the root block so
//! callers can dispatch on message type.

use tracing::{debug, warn};

use super::context::{CodecError, DecodeContext, INTEGER_SIZE};
use super::value::{Decoded, FieldKey, HostError, Setter};
use super::wire::{self, WireError, HEADER_SIZE};
use crate::config::CodecConfig;
use crate::error::{ProtoError, ProtoResult};
use crate::schema::{Block, BlockIndex, Field, FieldType, Schema, ValueKind};

/// Decode `frame` into `userdata` with the default limits
pub fn decode<S: Setter>(
    schema: &Schema,
    frame: &[u8],
    userdata: S::Userdata,
    setter: &mut S,
) -> ProtoResult<u32> {
    decode_with(schema, frame, userdata, setter, &CodecConfig::default())
}

/// Decode `frame` into `userdata`
///
/// The setter may already have been called for leading fields when an
/// error is returned; the error is also stored in the schema's error slot.
pub fn decode_with<S: Setter>(
    schema: &Schema,
    frame: &[u8],
    userdata: S::Userdata,
    setter: &mut S,
    config: &CodecConfig,
) -> ProtoResult<u32> {
    let result = decode_frame(schema, frame, &userdata, setter, config);
    match &result {
        Ok(id) => debug!(block_id = id, bytes = frame.len(), "decoded"),
        Err(e) => schema.record_error(e),
    }
    result
}

fn decode_frame<S: Setter>(
    schema: &Schema,
    frame: &[u8],
    userdata: &S::Userdata,
    setter: &mut S,
    config: &CodecConfig,
) -> ProtoResult<u32> {
    if let Err(e) = wire::verify(frame) {
        if matches!(
            e,
            WireError::VersionMismatch { .. } | WireError::CrcMismatch { .. }
        ) {
            warn!(error = %e, "rejecting frame");
        }
        return Err(ProtoError::Decode(e.to_string()));
    }

    let payload = wire::decompress(frame, config.max_payload).map_err(|e| match e {
        WireError::OutOfMemory(n) => ProtoError::OutOfMemory(format!("{n} bytes")),
        other => ProtoError::Decode(other.to_string()),
    })?;

    let mut decoder = Decoder {
        schema,
        setter,
        max_depth: config.max_depth,
        ctx: DecodeContext::new(&payload[HEADER_SIZE..]),
    };
    let id = decoder.decode_block(None, userdata, 0)?;

    // Only the zero padding of the last group may follow the root block.
    let rest = decoder.ctx.remaining_buffer();
    if rest.len() >= INTEGER_SIZE || rest.iter().any(|&b| b != 0) {
        return Err(ProtoError::Decode(format!(
            "{} trailing bytes after block({id})",
            rest.len()
        )));
    }
    Ok(id)
}

fn codec_error(err: CodecError) -> ProtoError {
    match err {
        CodecError::BufferUnderflow { needed, available } => ProtoError::Decode(format!(
            "truncated payload: need {needed} bytes, have {available}"
        )),
        CodecError::InvalidLength(len) => ProtoError::Decode(format!("invalid string length {len}")),
        CodecError::OutOfMemory(n) => ProtoError::OutOfMemory(format!("{n} bytes")),
    }
}

fn host_error(block: &Block, field: &Field, err: HostError) -> ProtoError {
    ProtoError::Decode(format!("set field({}:{}) error: {err}", block.name, field.name))
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

struct Decoder<'s, 'p, S: Setter> {
    schema: &'s Schema,
    setter: &'s mut S,
    max_depth: usize,
    ctx: DecodeContext<'p>,
}

impl<'s, 'p, S: Setter> Decoder<'s, 'p, S> {
    /// Read a block id and its fields
    ///
    /// `expected` is the block a custom field declares; the root block
    /// may be any registered block.
    fn decode_block(
        &mut self,
        expected: Option<BlockIndex>,
        ud: &S::Userdata,
        depth: usize,
    ) -> ProtoResult<u32> {
        let schema = self.schema;
        if depth > self.max_depth {
            return Err(ProtoError::Decode(format!(
                "blocks nested deeper than {}",
                self.max_depth
            )));
        }

        let raw_id = self.ctx.read_integer().map_err(codec_error)?;
        let block = self.lookup_block(raw_id)?;
        if let Some(expected) = expected {
            let declared = schema.block_at(expected);
            if declared.numeric_id != block.numeric_id {
                return Err(ProtoError::Decode(format!(
                    "bid({raw_id}) does not match field type {}({})",
                    declared.name, declared.numeric_id
                )));
            }
        }

        for field in &block.fields {
            if field.is_list {
                self.decode_list(block, field, ud, depth)?;
            } else {
                self.decode_value(block, field, ud, None, depth)?;
            }
        }
        Ok(block.numeric_id)
    }

    fn lookup_block(&self, raw_id: i64) -> ProtoResult<&'s Block> {
        let schema = self.schema;
        let max_id = i64::from(schema.max_id());
        if raw_id > max_id {
            return Err(ProtoError::Decode(format!(
                "bid({raw_id}) greater than max bid({max_id})"
            )));
        }
        if raw_id <= 0 {
            return Err(ProtoError::Decode(format!("invalid bid({raw_id})")));
        }

        // 0 < raw_id <= max_id, which fits in u32
        schema
            .block_by_id(raw_id as u32)
            .ok_or_else(|| ProtoError::Decode(format!("not found block by bid({raw_id})")))
    }

    fn decode_list(
        &mut self,
        block: &Block,
        field: &Field,
        ud: &S::Userdata,
        depth: usize,
    ) -> ProtoResult<()> {
        let key = field_key(block, field, None);
        let tag = self.ctx.read_integer().map_err(codec_error)?;

        match ValueKind::from_tag(tag) {
            Some(ValueKind::Integer) => {}
            None | Some(ValueKind::Nil) => return self.set_nil(block, field, ud, &key),
            Some(kind) if field.is_required() => {
                return Err(ProtoError::Decode(format!(
                    "field({}:{}) element size must be integer, got {kind}",
                    block.name, field.name
                )))
            }
            Some(_) => return self.set_nil(block, field, ud, &key),
        }

        let count = self.ctx.read_integer().map_err(codec_error)?;
        // Every element carries at least its tag.
        let count = usize::try_from(count)
            .ok()
            .filter(|&n| n <= self.ctx.remaining() / INTEGER_SIZE)
            .ok_or_else(|| {
                ProtoError::Decode(format!(
                    "field({}:{}) invalid element size {count}",
                    block.name, field.name
                ))
            })?;

        let list = self
            .setter
            .set(ud, &key, Decoded::List(count))
            .map_err(|e| host_error(block, field, e))?
            .ok_or_else(|| {
                ProtoError::Decode(format!(
                    "setter returned no list for field({}:{})",
                    block.name, field.name
                ))
            })?;

        for index in 0..count {
            self.decode_value(block, field, &list, Some(index), depth)?;
        }
        Ok(())
    }

    fn decode_value(
        &mut self,
        block: &Block,
        field: &Field,
        ud: &S::Userdata,
        index: Option<usize>,
        depth: usize,
    ) -> ProtoResult<()> {
        let key = field_key(block, field, index);
        let tag = self.ctx.read_integer().map_err(codec_error)?;

        let expected = field.kind();
        if tag != expected.tag() {
            if field.is_required() {
                return Err(ProtoError::Decode(format!(
                    "field({}:{}) type not match decode value({tag}) expect({})",
                    block.name,
                    field.name,
                    expected.tag()
                )));
            }
            return self.set_nil(block, field, ud, &key);
        }

        let value = match &field.field_type {
            FieldType::Integer => Decoded::Integer(self.ctx.read_integer().map_err(codec_error)?),
            FieldType::String => Decoded::String(self.ctx.read_string().map_err(codec_error)?),
            FieldType::Number => {
                return Err(ProtoError::Decode(format!(
                    "field({}:{}) number type not supported",
                    block.name, field.name
                )))
            }
            FieldType::Custom { block: target, .. } => {
                let child = self
                    .setter
                    .set(ud, &key, Decoded::Custom)
                    .map_err(|e| host_error(block, field, e))?
                    .ok_or_else(|| {
                        ProtoError::Decode(format!(
                            "setter returned no object for field({}:{})",
                            block.name, field.name
                        ))
                    })?;
                self.decode_block(Some(*target), &child, depth + 1)?;
                return Ok(());
            }
        };

        self.setter
            .set(ud, &key, value)
            .map_err(|e| host_error(block, field, e))?;
        Ok(())
    }

    fn set_nil(
        &mut self,
        block: &Block,
        field: &Field,
        ud: &S::Userdata,
        key: &FieldKey<'_>,
    ) -> ProtoResult<()> {
        self.setter
            .set(ud, key, Decoded::Nil)
            .map_err(|e| host_error(block, field, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::context::EncodeContext;
    use crate::codec::wire::FORMAT_VERSION;

    /// Records every setter call as a line of text
    #[derive(Default)]
    struct Trace {
        events: Vec<String>,
        next: u32,
    }

    impl Setter for Trace {
        type Userdata = u32;

        fn set(
            &mut self,
            ud: &u32,
            key: &FieldKey<'_>,
            value: Decoded<'_>,
        ) -> Result<Option<u32>, HostError> {
            let at = match key.index {
                Some(i) => format!("{}[{i}]", key.name),
                None => key.name.to_string(),
            };
            let shown = match value {
                Decoded::Integer(i) => i.to_string(),
                Decoded::String(s) => format!("{:?}", String::from_utf8_lossy(s)),
                Decoded::Custom => "custom".to_string(),
                Decoded::List(n) => format!("list({n})"),
                Decoded::Nil => "nil".to_string(),
            };
            self.events.push(format!("{ud}.{at}={shown}"));

            match value {
                Decoded::Custom | Decoded::List(_) => {
                    self.next += 1;
                    Ok(Some(self.next))
                }
                _ => Ok(None),
            }
        }
    }

    /// Build a sealed frame from raw integers and strings
    enum Raw<'a> {
        Int(i64),
        Str(&'a [u8]),
    }

    fn frame(items: &[Raw<'_>]) -> Vec<u8> {
        let mut ctx = EncodeContext::with_header(&[FORMAT_VERSION, 0, 0]).unwrap();
        for item in items {
            match item {
                Raw::Int(i) => ctx.write_integer(*i).unwrap(),
                Raw::Str(s) => ctx.write_string(s).unwrap(),
            };
        }
        let mut frame = wire::compress(&ctx.into_inner()).unwrap();
        wire::seal(&mut frame);
        frame
    }

    use Raw::{Int, Str};

    const NIL: i64 = 0x8000;

    #[test]
    fn test_decode_person() {
        let schema = Schema::parse("person 1 { name string; age integer; }").unwrap();
        let wire = frame(&[Int(1), Int(4), Str(b"Ann"), Int(1), Int(5)]);

        let mut trace = Trace::default();
        assert_eq!(decode(&schema, &wire, 0, &mut trace).unwrap(), 1);
        assert_eq!(trace.events, vec!["0.name=\"Ann\"", "0.age=5"]);
    }

    #[test]
    fn test_nested_and_list_protocol() {
        let schema = Schema::parse(
            "person 1 { name string; phones phone[]; }
             phone 2 { number string; }",
        )
        .unwrap();
        let wire = frame(&[
            Int(1),
            Int(4),
            Str(b"Bo"),
            Int(1), // list tag
            Int(2), // count
            Int(8),
            Int(2),
            Int(4),
            Str(b"111"),
            Int(8),
            Int(2),
            Int(NIL),
        ]);

        let mut trace = Trace::default();
        decode(&schema, &wire, 0, &mut trace).unwrap();
        assert_eq!(
            trace.events,
            vec![
                "0.name=\"Bo\"",
                "0.phones=list(2)",
                "1.phones[0]=custom",
                "2.number=\"111\"",
                "1.phones[1]=custom",
                "3.number=nil",
            ]
        );
    }

    #[test]
    fn test_absent_list() {
        let schema = Schema::parse("a 1 { xs integer[] required; y integer; }").unwrap();
        let wire = frame(&[Int(1), Int(NIL), Int(1), Int(7)]);

        let mut trace = Trace::default();
        decode(&schema, &wire, 0, &mut trace).unwrap();
        assert_eq!(trace.events, vec!["0.xs=nil", "0.y=7"]);
    }

    #[test]
    fn test_required_tag_mismatch() {
        let schema = Schema::parse("a 1 { x integer required; }").unwrap();
        let wire = frame(&[Int(1), Int(NIL)]);
        let err = decode(&schema, &wire, 0, &mut Trace::default()).unwrap_err();
        assert_eq!(
            err,
            ProtoError::Decode("field(a:x) type not match decode value(32768) expect(1)".into())
        );
        assert_eq!(schema.error().unwrap().code, crate::error::code::DECODE_ERROR);
    }

    #[test]
    fn test_optional_tag_mismatch_sets_nil() {
        let schema = Schema::parse("a 1 { x integer; y integer; }").unwrap();
        let wire = frame(&[Int(1), Int(NIL), Int(1), Int(3)]);
        let mut trace = Trace::default();
        decode(&schema, &wire, 0, &mut trace).unwrap();
        assert_eq!(trace.events, vec!["0.x=nil", "0.y=3"]);
    }

    #[test]
    fn test_block_id_checks() {
        let schema = Schema::parse("a 1 { } c 3 { }").unwrap();
        let mut trace = Trace::default();

        let err = decode(&schema, &frame(&[Int(4)]), 0, &mut trace).unwrap_err();
        assert_eq!(err, ProtoError::Decode("bid(4) greater than max bid(3)".into()));

        let err = decode(&schema, &frame(&[Int(0)]), 0, &mut trace).unwrap_err();
        assert_eq!(err, ProtoError::Decode("invalid bid(0)".into()));

        let err = decode(&schema, &frame(&[Int(-5)]), 0, &mut trace).unwrap_err();
        assert_eq!(err, ProtoError::Decode("invalid bid(-5)".into()));

        let err = decode(&schema, &frame(&[Int(2)]), 0, &mut trace).unwrap_err();
        assert_eq!(err, ProtoError::Decode("not found block by bid(2)".into()));

        assert_eq!(decode(&schema, &frame(&[Int(3)]), 0, &mut trace).unwrap(), 3);
    }

    #[test]
    fn test_nested_block_must_match_field_type() {
        let schema = Schema::parse("a 1 { b b; } b 2 { } c 3 { }").unwrap();
        let wire = frame(&[Int(1), Int(8), Int(3)]);
        let err = decode(&schema, &wire, 0, &mut Trace::default()).unwrap_err();
        assert_eq!(err, ProtoError::Decode("bid(3) does not match field type b(2)".into()));
    }

    #[test]
    fn test_truncated_payload() {
        let schema = Schema::parse("a 1 { name string; }").unwrap();
        let wire = frame(&[Int(1), Int(4), Int(100)]);
        let err = decode(&schema, &wire, 0, &mut Trace::default()).unwrap_err();
        assert!(matches!(err, ProtoError::Decode(ref m) if m.starts_with("truncated payload")));
    }

    #[test]
    fn test_list_count_sanity() {
        let schema = Schema::parse("a 1 { xs integer[]; }").unwrap();
        let wire = frame(&[Int(1), Int(1), Int(1_000_000)]);
        let err = decode(&schema, &wire, 0, &mut Trace::default()).unwrap_err();
        assert_eq!(
            err,
            ProtoError::Decode("field(a:xs) invalid element size 1000000".into())
        );
    }

    #[test]
    fn test_trailing_data_rejected() {
        let schema = Schema::parse("a 1 { }").unwrap();
        let wire = frame(&[Int(1), Int(1)]);
        let err = decode(&schema, &wire, 0, &mut Trace::default()).unwrap_err();
        assert_eq!(err, ProtoError::Decode("8 trailing bytes after block(1)".into()));
    }

    #[test]
    fn test_setter_must_return_handles() {
        struct NoHandles;
        impl Setter for NoHandles {
            type Userdata = ();
            fn set(&mut self, _: &(), _: &FieldKey<'_>, _: Decoded<'_>) -> Result<Option<()>, HostError> {
                Ok(None)
            }
        }

        let schema = Schema::parse("a 1 { b b; } b 2 { }").unwrap();
        let wire = frame(&[Int(1), Int(8), Int(2)]);
        let err = decode(&schema, &wire, (), &mut NoHandles).unwrap_err();
        assert_eq!(
            err,
            ProtoError::Decode("setter returned no object for field(a:b)".into())
        );
    }

    #[test]
    fn test_header_checks() {
        let schema = Schema::parse("a 1 { }").unwrap();
        let mut wire = frame(&[Int(1)]);

        wire[0] = 0x21;
        let err = decode(&schema, &wire, 0, &mut Trace::default()).unwrap_err();
        assert_eq!(err, ProtoError::Decode("version not match expect 17, got 33".into()));

        wire[0] = FORMAT_VERSION;
        wire[1] ^= 0xFF;
        let err = decode(&schema, &wire, 0, &mut Trace::default()).unwrap_err();
        assert!(err.to_string().contains("crc not match"));

        let err = decode(&schema, &[0x11], 0, &mut Trace::default()).unwrap_err();
        assert_eq!(err, ProtoError::Decode("frame too short: 1 bytes".into()));
    }

    #[test]
    fn test_payload_limit() {
        let schema = Schema::parse("a 1 { s string; }").unwrap();
        let text = vec![b'x'; 64];
        let wire = frame(&[Int(1), Int(4), Str(&text)]);
        let config = CodecConfig::default().with_max_payload(32);
        let err = decode_with(&schema, &wire, 0, &mut Trace::default(), &config).unwrap_err();
        assert!(matches!(err, ProtoError::Decode(ref m) if m.contains("exceeds limit")));
    }
}
