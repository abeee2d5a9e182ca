//! Reflective Codec - Callback-Based Encode/Decode
//!
//! Encodes and decodes any host data structure against a compiled
//! [`Schema`] without generated per-type code:
//!
//! - **value** - `Getter`/`Setter` traits and the values they exchange
//! - **context** - cursor buffers for the raw tagged stream
//! - **encoder** / **decoder** - the schema walk
//! - **wire** / **crc** - zero-byte elision, framing and checksum

pub mod context;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod value;
pub mod wire;

pub use context::{CodecError, DecodeContext, EncodeContext};
pub use decoder::{decode, decode_with};
pub use encoder::{encode, encode_with};
pub use value::{Decoded, FieldKey, Getter, HostError, Setter, Value};
pub use wire::{WireError, FORMAT_VERSION, HEADER_SIZE};

use crate::config::CodecConfig;
use crate::error::ProtoResult;
use crate::schema::Schema;

impl Schema {
    /// Encode `userdata` as block `block_name`; see [`encode_with`]
    pub fn encode<G: Getter>(
        &self,
        block_name: &str,
        userdata: G::Userdata,
        getter: &G,
    ) -> ProtoResult<Vec<u8>> {
        encode(self, block_name, userdata, getter)
    }

    /// Decode `frame` into `userdata`, returning the root block id; see [`decode_with`]
    pub fn decode<S: Setter>(
        &self,
        frame: &[u8],
        userdata: S::Userdata,
        setter: &mut S,
    ) -> ProtoResult<u32> {
        decode(self, frame, userdata, setter)
    }

    pub fn encode_with<G: Getter>(
        &self,
        block_name: &str,
        userdata: G::Userdata,
        getter: &G,
        config: &CodecConfig,
    ) -> ProtoResult<Vec<u8>> {
        encode_with(self, block_name, userdata, getter, config)
    }

    pub fn decode_with<S: Setter>(
        &self,
        frame: &[u8],
        userdata: S::Userdata,
        setter: &mut S,
        config: &CodecConfig,
    ) -> ProtoResult<u32> {
        decode_with(self, frame, userdata, setter, config)
    }
}
