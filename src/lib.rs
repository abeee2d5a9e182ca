//! sge-proto - Schema-Driven Binary Serialization
//!
//! A small interface definition language compiles into an in-memory
//! schema of numbered message blocks, and a reflective codec moves data
//! between that schema and any host structure through accessor callbacks:
//! - Blocks and typed fields are declared in text and compiled once
//! - Encode walks a block's fields, pulling values through a `Getter`
//! - Decode replays the wire stream into the host through a `Setter`
//! - Frames are zero-byte compressed and protected by a CRC-16
//!
//! ```
//! use sge_proto::{decode_record, encode_record, Record, Schema};
//!
//! let schema = Schema::parse("person 1 { name string; age integer; }")?;
//! let ann = Record::new().with_str("name", "Ann").with_int("age", 5);
//!
//! let frame = encode_record(&schema, "person", &ann)?;
//! let (id, decoded) = decode_record(&schema, &frame)?;
//! assert_eq!((id, decoded), (1, ann));
//! # Ok::<(), sge_proto::ProtoError>(())
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod record;
pub mod schema;

// Re-export commonly used types
pub use codec::{decode, decode_with, encode, encode_with};
pub use codec::{Decoded, FieldKey, Getter, HostError, Setter, Value};
pub use config::CodecConfig;
pub use error::{ErrorRecord, ProtoError, ProtoResult};
pub use record::{
    decode_record, decode_record_with, encode_record, encode_record_with, Record, RecordBuilder,
    RecordGetter, RecordValue,
};
pub use schema::{Block, Field, FieldType, Requirement, Schema, ValueKind};
