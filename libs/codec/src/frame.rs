//! Frame header packing and whole-frame encode/decode
//!
//! A frame is `[header:u32][length:u32][payload]`. The header word
//! packs the packet family into bits 31:26 and the packet id into bits
//! 25:16; bits 15:0 are reserved and written as zero by this layer.

use crate::constants::FRAME_HEADER_SIZE;
use crate::error::{CodecError, CodecResult};
use crate::wire::{put_u32, read_u32, TargetEndianness};

/// Pack a family and packet id into a header word.
pub fn pack_header(family: u32, packet_id: u32) -> u32 {
    ((family & 0x0000_003F) << 26) | ((packet_id & 0x0000_03FF) << 16)
}

/// Family field of a header word, bits 31:26.
pub fn unpack_family(header: u32) -> u32 {
    (header >> 26) & 0x0000_003F
}

/// Packet id field of a header word, bits 25:16.
pub fn unpack_packet_id(header: u32) -> u32 {
    (header >> 16) & 0x0000_03FF
}

/// Encode one complete frame ready for a single write.
pub fn encode_frame(
    family: u32,
    packet_id: u32,
    payload: &[u8],
    endianness: TargetEndianness,
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    put_u32(&mut frame, pack_header(family, packet_id), endianness);
    put_u32(&mut frame, payload.len() as u32, endianness);
    frame.extend_from_slice(payload);
    frame
}

/// Decode one complete frame into `(family, packet_id, payload)`.
///
/// The declared length must match the bytes actually present.
pub fn decode_frame(
    bytes: &[u8],
    endianness: TargetEndianness,
) -> CodecResult<(u32, u32, Vec<u8>)> {
    let header = read_u32(bytes, 0, endianness)?;
    let length = read_u32(bytes, 4, endianness)? as usize;
    let expected = FRAME_HEADER_SIZE + length;
    if bytes.len() != expected {
        return Err(CodecError::truncated(expected, bytes.len(), "frame payload"));
    }
    Ok((
        unpack_family(header),
        unpack_packet_id(header),
        bytes[FRAME_HEADER_SIZE..].to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packing_round_trips_at_the_field_edges() {
        for (family, id) in [(0, 0), (0, 1023), (63, 0), (63, 1023), (1, 1), (42, 513)] {
            let header = pack_header(family, id);
            assert_eq!(unpack_family(header), family);
            assert_eq!(unpack_packet_id(header), id);
            assert_eq!(header & 0x0000_FFFF, 0, "reserved bits must stay zero");
        }
    }

    #[test]
    fn out_of_range_inputs_are_masked() {
        let header = pack_header(64, 1024);
        assert_eq!(unpack_family(header), 0);
        assert_eq!(unpack_packet_id(header), 0);
    }

    #[test]
    fn frames_round_trip_in_both_byte_orders() {
        let payload = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x00];
        for endianness in [TargetEndianness::BigWire, TargetEndianness::LittleWire] {
            let frame = encode_frame(5, 130, &payload, endianness);
            assert_eq!(frame.len(), FRAME_HEADER_SIZE + payload.len());
            let (family, id, body) = decode_frame(&frame, endianness).unwrap();
            assert_eq!(family, 5);
            assert_eq!(id, 130);
            assert_eq!(body, payload);
        }
    }

    #[test]
    fn an_empty_payload_is_a_valid_frame() {
        let frame = encode_frame(0, 1, &[], TargetEndianness::LittleWire);
        let (family, id, body) = decode_frame(&frame, TargetEndianness::LittleWire).unwrap();
        assert_eq!((family, id), (0, 1));
        assert!(body.is_empty());
    }

    #[test]
    fn a_length_mismatch_is_rejected() {
        let mut frame = encode_frame(1, 1, &[1, 2, 3], TargetEndianness::LittleWire);
        frame.pop();
        assert!(decode_frame(&frame, TargetEndianness::LittleWire).is_err());
    }
}
