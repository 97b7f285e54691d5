//! Endianness-aware word encoding
//!
//! One connection uses one byte order for every multi-byte integer,
//! chosen during the handshake. Readers take the buffer, an offset and
//! the connection endianness; writers append to a growing frame buffer.
//! Reads are bounds-checked and never panic on short input.

use crate::error::{CodecError, CodecResult};

/// Byte order negotiated for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEndianness {
    BigWire,
    LittleWire,
}

fn take<const N: usize>(
    buf: &[u8],
    offset: usize,
    context: &'static str,
) -> CodecResult<[u8; N]> {
    let end = offset
        .checked_add(N)
        .ok_or_else(|| CodecError::truncated(usize::MAX, buf.len(), context))?;
    let slice = buf
        .get(offset..end)
        .ok_or_else(|| CodecError::truncated(end, buf.len(), context))?;
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(slice);
    Ok(bytes)
}

pub fn read_u16(buf: &[u8], offset: usize, endianness: TargetEndianness) -> CodecResult<u16> {
    let bytes = take::<2>(buf, offset, "u16")?;
    Ok(match endianness {
        TargetEndianness::BigWire => u16::from_be_bytes(bytes),
        TargetEndianness::LittleWire => u16::from_le_bytes(bytes),
    })
}

pub fn read_u32(buf: &[u8], offset: usize, endianness: TargetEndianness) -> CodecResult<u32> {
    let bytes = take::<4>(buf, offset, "u32")?;
    Ok(match endianness {
        TargetEndianness::BigWire => u32::from_be_bytes(bytes),
        TargetEndianness::LittleWire => u32::from_le_bytes(bytes),
    })
}

pub fn read_u64(buf: &[u8], offset: usize, endianness: TargetEndianness) -> CodecResult<u64> {
    let bytes = take::<8>(buf, offset, "u64")?;
    Ok(match endianness {
        TargetEndianness::BigWire => u64::from_be_bytes(bytes),
        TargetEndianness::LittleWire => u64::from_le_bytes(bytes),
    })
}

pub fn put_u16(buf: &mut Vec<u8>, value: u16, endianness: TargetEndianness) {
    match endianness {
        TargetEndianness::BigWire => buf.extend_from_slice(&value.to_be_bytes()),
        TargetEndianness::LittleWire => buf.extend_from_slice(&value.to_le_bytes()),
    }
}

pub fn put_u32(buf: &mut Vec<u8>, value: u32, endianness: TargetEndianness) {
    match endianness {
        TargetEndianness::BigWire => buf.extend_from_slice(&value.to_be_bytes()),
        TargetEndianness::LittleWire => buf.extend_from_slice(&value.to_le_bytes()),
    }
}

pub fn put_u64(buf: &mut Vec<u8>, value: u64, endianness: TargetEndianness) {
    match endianness {
        TargetEndianness::BigWire => buf.extend_from_slice(&value.to_be_bytes()),
        TargetEndianness::LittleWire => buf.extend_from_slice(&value.to_le_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_round_trip_in_both_orders() {
        for endianness in [TargetEndianness::BigWire, TargetEndianness::LittleWire] {
            let mut buf = Vec::new();
            put_u16(&mut buf, 0xBEEF, endianness);
            put_u32(&mut buf, 0xDEAD_BEEF, endianness);
            put_u64(&mut buf, 0x0123_4567_89AB_CDEF, endianness);

            assert_eq!(read_u16(&buf, 0, endianness).unwrap(), 0xBEEF);
            assert_eq!(read_u32(&buf, 2, endianness).unwrap(), 0xDEAD_BEEF);
            assert_eq!(read_u64(&buf, 6, endianness).unwrap(), 0x0123_4567_89AB_CDEF);
        }
    }

    #[test]
    fn byte_orders_differ_on_the_wire() {
        let mut be = Vec::new();
        let mut le = Vec::new();
        put_u32(&mut be, 0x0102_0304, TargetEndianness::BigWire);
        put_u32(&mut le, 0x0102_0304, TargetEndianness::LittleWire);
        assert_eq!(be, [1, 2, 3, 4]);
        assert_eq!(le, [4, 3, 2, 1]);
    }

    #[test]
    fn short_buffer_is_an_error_not_a_panic() {
        let err = read_u32(&[0, 1, 2], 0, TargetEndianness::LittleWire).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { need: 4, got: 3, .. }));

        let err = read_u64(&[0; 16], 12, TargetEndianness::BigWire).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { need: 20, got: 16, .. }));
    }
}
