//! Fixed 64-byte container header
//!
//! Layout (little-endian):
//! - version: 4 bytes (u32)
//! - media type id: 4 bytes (u32)
//! - original name: 32 bytes (UTF-8, zero-padded)
//! - ciphertext length: 4 bytes (u32)
//! - reserved: 20 bytes (zero on write, ignored on read)

use crate::error::{ErrorCategory, ErrorKind, Result, VeilboxError};

pub const HEADER_LEN: usize = 64;

/// The only format version this codec reads or writes.
pub const FORMAT_VERSION: u32 = 1;

/// Capacity of the name field in bytes.
pub const NAME_LEN: usize = 32;

const VERSION_OFFSET: usize = 0;
const MEDIA_TYPE_OFFSET: usize = 4;
const NAME_OFFSET: usize = 8;
const PAYLOAD_LEN_OFFSET: usize = 40;
const RESERVED_OFFSET: usize = 44;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub media_type_id: u32,
    /// Original name, already cut to fit [`NAME_LEN`] bytes.
    pub name: String,
    /// Length of the ciphertext that follows salt and IV.
    pub payload_len: u32,
}

impl Header {
    /// A current-version header. `name` is truncated to fit the name field.
    pub fn new(media_type_id: u32, name: &str, payload_len: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            media_type_id,
            name: truncate_name(name).to_string(),
            payload_len,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&self.version.to_le_bytes());
        out[MEDIA_TYPE_OFFSET..MEDIA_TYPE_OFFSET + 4]
            .copy_from_slice(&self.media_type_id.to_le_bytes());
        let name = truncate_name(&self.name).as_bytes();
        out[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
        out[PAYLOAD_LEN_OFFSET..PAYLOAD_LEN_OFFSET + 4]
            .copy_from_slice(&self.payload_len.to_le_bytes());
        // RESERVED_OFFSET..HEADER_LEN stays zero.
        out
    }

    /// Parse the header at the start of `bytes`.
    ///
    /// Fails with `MalformedContainer` when fewer than [`HEADER_LEN`] bytes
    /// are available and with `UnsupportedVersion` when the version field
    /// is not [`FORMAT_VERSION`]. The reserved range is not inspected.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(VeilboxError::malformed(format!(
                "input likely truncated while reading header ({} of {} bytes)",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let version = read_u32(bytes, VERSION_OFFSET);
        if version != FORMAT_VERSION {
            return Err(VeilboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::UnsupportedVersion,
                format!(
                    "unsupported container format version {} (expected {})",
                    version, FORMAT_VERSION
                ),
            ));
        }

        Ok(Self {
            version,
            media_type_id: read_u32(bytes, MEDIA_TYPE_OFFSET),
            name: decode_name(&bytes[NAME_OFFSET..NAME_OFFSET + NAME_LEN]),
            payload_len: read_u32(bytes, PAYLOAD_LEN_OFFSET),
        })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut field = [0u8; 4];
    field.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(field)
}

/// Longest prefix of `name` that fits the name field without splitting
/// a UTF-8 sequence.
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= NAME_LEN {
        return name;
    }
    let mut end = NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Name field to string: trailing NULs and whitespace are dropped, invalid
/// UTF-8 is replaced rather than rejected.
fn decode_name(field: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(field);
    decoded
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}
