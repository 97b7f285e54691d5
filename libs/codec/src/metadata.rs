//! Stream metadata - the handshake record
//!
//! The first frame on every connection carries the stream metadata
//! body: the magic word used for endianness detection, the protocol
//! version, frame-size limit and producer pid, a pool of NUL-terminated
//! identification strings addressed by payload-relative offsets, and a
//! table declaring the packet versions the producer will emit.
//!
//! Body layout (offsets relative to the payload, magic at 0):
//!
//! ```text
//! 0  magic            20 offset_hw_version
//! 4  version          24 offset_sw_version
//! 8  max_data_len     28 offset_process_name
//! 12 pid              32 offset_packet_version_table
//! 16 offset_info      36 reserved
//! ```
//!
//! An offset of zero means the field is absent. The version table is
//! `reserved:u16, count:u16` followed by `count` entries of
//! `{family_and_id:u16, reserved:u16, version:u32}` where
//! `family_and_id` packs the family into bits 15:10 and the id into
//! bits 9:0.

use crate::constants::{PIPE_MAGIC, STREAM_METADATA_HEADER_SIZE};
use crate::error::{CodecError, CodecResult};
use crate::wire::{put_u16, put_u32, read_u16, read_u32, TargetEndianness};

/// Determine the connection byte order from the raw magic bytes.
///
/// The magic is the only field that may be interpreted before the
/// endianness is known: it is tried big-endian first, then
/// little-endian, and anything else is a handshake failure.
pub fn resolve_endianness(magic_bytes: &[u8; 4]) -> CodecResult<TargetEndianness> {
    if u32::from_be_bytes(*magic_bytes) == PIPE_MAGIC {
        Ok(TargetEndianness::BigWire)
    } else if u32::from_le_bytes(*magic_bytes) == PIPE_MAGIC {
        Ok(TargetEndianness::LittleWire)
    } else {
        Err(CodecError::InvalidMagic {
            actual: u32::from_be_bytes(*magic_bytes),
        })
    }
}

/// Semantic packet version packed as `major<<22 | minor<<12 | patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version(u32);

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self(((major & 0x3FF) << 22) | ((minor & 0x3FF) << 12) | (patch & 0xFFF))
    }

    pub const fn from_encoded(encoded: u32) -> Self {
        Self(encoded)
    }

    pub const fn encoded(self) -> u32 {
        self.0
    }

    pub const fn major(self) -> u32 {
        (self.0 >> 22) & 0x3FF
    }

    pub const fn minor(self) -> u32 {
        (self.0 >> 12) & 0x3FF
    }

    pub const fn patch(self) -> u32 {
        self.0 & 0xFFF
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// Packet encoding version 1.0.0, assumed for any packet the producer
/// did not list in its version table.
pub const DEFAULT_PACKET_VERSION: Version = Version::new(1, 0, 0);

/// One declared `(family, id) -> version` compatibility entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketVersionEntry {
    pub family: u32,
    pub packet_id: u32,
    pub version: u32,
}

/// The packet-version compatibility table from the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketVersionTable {
    entries: Vec<PacketVersionEntry>,
}

impl PacketVersionTable {
    pub fn new(entries: Vec<PacketVersionEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PacketVersionEntry] {
        &self.entries
    }

    /// Declared version for a packet kind, or the default 1.0.0.
    pub fn resolve(&self, family: u32, packet_id: u32) -> u32 {
        self.entries
            .iter()
            .find(|entry| entry.family == family && entry.packet_id == packet_id)
            .map(|entry| entry.version)
            .unwrap_or(DEFAULT_PACKET_VERSION.encoded())
    }
}

/// The parsed handshake record. Created once per connection and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub version: u32,
    pub max_data_len: u32,
    pub pid: u32,
    pub info: Option<String>,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
    pub process_name: Option<String>,
    pub packet_versions: PacketVersionTable,
}

impl StreamMetadata {
    /// Parse a stream metadata body. `payload` starts at the magic
    /// word and the connection endianness must already be resolved.
    pub fn parse(payload: &[u8], endianness: TargetEndianness) -> CodecResult<Self> {
        if payload.len() < STREAM_METADATA_HEADER_SIZE {
            return Err(CodecError::truncated(
                STREAM_METADATA_HEADER_SIZE,
                payload.len(),
                "stream metadata fixed header",
            ));
        }

        let magic = read_u32(payload, 0, endianness)?;
        if magic != PIPE_MAGIC {
            return Err(CodecError::InvalidMagic { actual: magic });
        }

        let version = read_u32(payload, 4, endianness)?;
        let max_data_len = read_u32(payload, 8, endianness)?;
        let pid = read_u32(payload, 12, endianness)?;
        let offset_info = read_u32(payload, 16, endianness)? as usize;
        let offset_hw = read_u32(payload, 20, endianness)? as usize;
        let offset_sw = read_u32(payload, 24, endianness)? as usize;
        let offset_name = read_u32(payload, 28, endianness)? as usize;
        let offset_table = read_u32(payload, 32, endianness)? as usize;

        Ok(Self {
            version,
            max_data_len,
            pid,
            info: read_pool_string(payload, offset_info, "info")?,
            hardware_version: read_pool_string(payload, offset_hw, "hardware version")?,
            software_version: read_pool_string(payload, offset_sw, "software version")?,
            process_name: read_pool_string(payload, offset_name, "process name")?,
            packet_versions: read_version_table(payload, offset_table, endianness)?,
        })
    }

    /// Encode this record back into a metadata body. Used by clients
    /// and tests; the layout mirrors what [`StreamMetadata::parse`]
    /// accepts, with the string pool directly after the fixed header
    /// and the version table last.
    pub fn encode(&self, endianness: TargetEndianness) -> Vec<u8> {
        let mut pool_offset = STREAM_METADATA_HEADER_SIZE;
        let mut string_offset = |s: &Option<String>| -> u32 {
            match s {
                Some(value) => {
                    let offset = pool_offset;
                    pool_offset += value.len() + 1;
                    offset as u32
                }
                None => 0,
            }
        };
        let offset_info = string_offset(&self.info);
        let offset_hw = string_offset(&self.hardware_version);
        let offset_sw = string_offset(&self.software_version);
        let offset_name = string_offset(&self.process_name);
        let offset_table = pool_offset as u32;

        let mut body = Vec::with_capacity(
            pool_offset + 4 + self.packet_versions.entries().len() * 8,
        );
        put_u32(&mut body, PIPE_MAGIC, endianness);
        put_u32(&mut body, self.version, endianness);
        put_u32(&mut body, self.max_data_len, endianness);
        put_u32(&mut body, self.pid, endianness);
        put_u32(&mut body, offset_info, endianness);
        put_u32(&mut body, offset_hw, endianness);
        put_u32(&mut body, offset_sw, endianness);
        put_u32(&mut body, offset_name, endianness);
        put_u32(&mut body, offset_table, endianness);
        put_u32(&mut body, 0, endianness); // reserved

        for value in [
            &self.info,
            &self.hardware_version,
            &self.software_version,
            &self.process_name,
        ]
        .into_iter()
        .flatten()
        {
            body.extend_from_slice(value.as_bytes());
            body.push(0);
        }

        put_u16(&mut body, 0, endianness); // reserved
        put_u16(&mut body, self.packet_versions.entries().len() as u16, endianness);
        for entry in self.packet_versions.entries() {
            let family_and_id =
                (((entry.family & 0x3F) << 10) | (entry.packet_id & 0x3FF)) as u16;
            put_u16(&mut body, family_and_id, endianness);
            put_u16(&mut body, 0, endianness);
            put_u32(&mut body, entry.version, endianness);
        }
        body
    }
}

fn read_pool_string(
    payload: &[u8],
    offset: usize,
    field: &'static str,
) -> CodecResult<Option<String>> {
    if offset == 0 {
        return Ok(None);
    }
    if offset >= payload.len() {
        return Err(CodecError::InvalidOffset {
            offset,
            payload_len: payload.len(),
            field,
        });
    }
    let terminator = payload[offset..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::StringNotTerminated { offset })?;
    let bytes = &payload[offset..offset + terminator];
    if bytes.iter().any(|b| !b.is_ascii()) {
        return Err(CodecError::InvalidString { offset });
    }
    String::from_utf8(bytes.to_vec())
        .map(Some)
        .map_err(|_| CodecError::InvalidString { offset })
}

fn read_version_table(
    payload: &[u8],
    offset: usize,
    endianness: TargetEndianness,
) -> CodecResult<PacketVersionTable> {
    if offset == 0 {
        return Ok(PacketVersionTable::default());
    }
    if offset >= payload.len() {
        return Err(CodecError::InvalidOffset {
            offset,
            payload_len: payload.len(),
            field: "packet version table",
        });
    }

    let count = read_u16(payload, offset + 2, endianness)? as usize;
    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let base = offset + 4 + index * 8;
        let family_and_id = read_u16(payload, base, endianness)? as u32;
        let version = read_u32(payload, base + 4, endianness)?;
        entries.push(PacketVersionEntry {
            family: (family_and_id >> 10) & 0x3F,
            packet_id: family_and_id & 0x3FF,
            version,
        });
    }
    Ok(PacketVersionTable::new(entries))
}
