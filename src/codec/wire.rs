//! Wire framing: zero-byte elision and checksum
//!
//! ```text
//! byte 0    : format version
//! bytes 1-2 : CRC-16 of bytes 3.., little-endian
//! bytes 3.. : groups of {mask, non-zero bytes}
//! ```
//!
//! Each group covers up to 8 payload bytes. Bit `i` of the mask is set
//! when byte `i` of the group is non-zero, and only those bytes follow.

use thiserror::Error;

use super::crc::crc16;

const VERSION_MAJOR: u8 = 0;
const VERSION_MINOR: u8 = 1;

/// `(1 << (major + 4)) | minor`
pub const FORMAT_VERSION: u8 = (1 << (VERSION_MAJOR + 4)) | VERSION_MINOR;

/// Version byte plus checksum
pub const HEADER_SIZE: usize = 3;

const GROUP_SIZE: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("frame too short: {len} bytes")]
    TooShort { len: usize },

    #[error("version not match expect {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("crc not match: expect {expected:#06x}, got {got:#06x}")]
    CrcMismatch { expected: u16, got: u16 },

    #[error("truncated group at offset {offset}")]
    Truncated { offset: usize },

    #[error("payload of {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("memory not enough for {0} bytes")]
    OutOfMemory(usize),
}

fn alloc(len: usize) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| WireError::OutOfMemory(len))?;
    Ok(buf)
}

/// Compress everything after the header; the header is copied verbatim
pub fn compress(frame: &[u8]) -> Result<Vec<u8>, WireError> {
    if frame.len() < HEADER_SIZE {
        return Err(WireError::TooShort { len: frame.len() });
    }

    let (header, payload) = frame.split_at(HEADER_SIZE);
    let groups = (payload.len() + GROUP_SIZE - 1) / GROUP_SIZE;
    let mut out = alloc(HEADER_SIZE + groups + payload.len())?;
    out.extend_from_slice(header);

    for chunk in payload.chunks(GROUP_SIZE) {
        let mask_at = out.len();
        out.push(0);
        let mut mask = 0u8;
        for (bit, &byte) in chunk.iter().enumerate() {
            if byte != 0 {
                mask |= 1 << bit;
                out.push(byte);
            }
        }
        out[mask_at] = mask;
    }

    Ok(out)
}

/// Inverse of [`compress`]
///
/// Every group expands to 8 bytes, so the result carries up to 7 zero
/// bytes of padding past the original payload. `max_payload` bounds the
/// expanded size and is checked before anything is allocated.
pub fn decompress(frame: &[u8], max_payload: usize) -> Result<Vec<u8>, WireError> {
    if frame.len() < HEADER_SIZE {
        return Err(WireError::TooShort { len: frame.len() });
    }

    // First pass: validate group boundaries and size the output.
    let mut groups = 0usize;
    let mut pos = HEADER_SIZE;
    while pos < frame.len() {
        let offset = pos;
        pos += 1 + frame[pos].count_ones() as usize;
        if pos > frame.len() {
            return Err(WireError::Truncated { offset });
        }
        groups += 1;
    }

    let size = groups.saturating_mul(GROUP_SIZE);
    if size > max_payload {
        return Err(WireError::PayloadTooLarge {
            size,
            limit: max_payload,
        });
    }

    let mut out = alloc(HEADER_SIZE + size)?;
    out.extend_from_slice(&frame[..HEADER_SIZE]);

    let mut pos = HEADER_SIZE;
    while pos < frame.len() {
        let mask = frame[pos];
        pos += 1;
        for bit in 0..GROUP_SIZE {
            if mask & (1 << bit) != 0 {
                out.push(frame[pos]);
                pos += 1;
            } else {
                out.push(0);
            }
        }
    }

    Ok(out)
}

/// Write the checksum of the compressed payload into bytes 1-2
pub fn seal(frame: &mut [u8]) {
    if frame.len() < HEADER_SIZE {
        return;
    }
    let crc = crc16(&frame[HEADER_SIZE..]);
    frame[1..HEADER_SIZE].copy_from_slice(&crc.to_le_bytes());
}

/// Check the version byte and checksum of a compressed frame
pub fn verify(frame: &[u8]) -> Result<(), WireError> {
    if frame.len() < HEADER_SIZE {
        return Err(WireError::TooShort { len: frame.len() });
    }
    if frame[0] != FORMAT_VERSION {
        return Err(WireError::VersionMismatch {
            expected: FORMAT_VERSION,
            got: frame[0],
        });
    }

    let stored = u16::from_le_bytes([frame[1], frame[2]]);
    let computed = crc16(&frame[HEADER_SIZE..]);
    if stored != computed {
        return Err(WireError::CrcMismatch {
            expected: computed,
            got: stored,
        });
    }
    Ok(())
}
