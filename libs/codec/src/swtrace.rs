//! SwTrace compact string encoding
//!
//! Strings embedded in packet payloads use a length-prefixed word
//! format: word 0 holds the byte length including a NUL terminator,
//! the following words hold the string bytes packed four per word and
//! NUL-padded to a whole word. Validity is policy-gated before any
//! output is produced.

use crate::error::{CodecError, CodecResult};
use crate::wire::{put_u32, read_u32, TargetEndianness};

/// One-character type tags accepted by the [`CharPolicy::Type`] policy.
const TYPE_TAGS: &[u8] = b"@tbBcsijIlfdp";

/// Character-validity policy applied before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharPolicy {
    /// Any 7-bit ASCII byte.
    Generic,
    /// Alphanumeric or underscore; used for declaration and object names.
    Name,
    /// One of the fixed argument type tags.
    Type,
}

impl CharPolicy {
    fn admits(self, byte: u8) -> bool {
        if !byte.is_ascii() {
            return false;
        }
        match self {
            CharPolicy::Generic => true,
            CharPolicy::Name => byte.is_ascii_alphanumeric() || byte == b'_',
            CharPolicy::Type => TYPE_TAGS.contains(&byte),
        }
    }

    fn name(self) -> &'static str {
        match self {
            CharPolicy::Generic => "generic",
            CharPolicy::Name => "name",
            CharPolicy::Type => "type",
        }
    }
}

/// Encode a string into its SwTrace word sequence.
///
/// Fails without producing output if any character violates the active
/// policy. Word 0 is the byte length including the NUL terminator;
/// data words pack the bytes in string order (low byte first).
pub fn encode_string(s: &str, policy: CharPolicy) -> CodecResult<Vec<u32>> {
    if let Some(byte) = s.bytes().find(|&b| !policy.admits(b)) {
        return Err(CodecError::InvalidChar {
            ch: byte as char,
            policy: policy.name(),
        });
    }

    let len_with_nul = s.len() + 1;
    let data_words = len_with_nul.div_ceil(4);
    let bytes = s.as_bytes();

    let mut words = Vec::with_capacity(1 + data_words);
    words.push(len_with_nul as u32);
    for word_index in 0..data_words {
        let mut packed = [0u8; 4];
        for (slot, value) in packed.iter_mut().enumerate() {
            if let Some(&b) = bytes.get(word_index * 4 + slot) {
                *value = b;
            }
        }
        words.push(u32::from_le_bytes(packed));
    }
    Ok(words)
}

/// Append an encoded word sequence to a payload buffer in the
/// connection byte order.
pub fn write_string(buf: &mut Vec<u8>, words: &[u32], endianness: TargetEndianness) {
    for &word in words {
        put_u32(buf, word, endianness);
    }
}

/// Decode an SwTrace string at `offset`.
///
/// Returns the string and the total bytes consumed (length word plus
/// padded data words).
pub fn decode_string(
    buf: &[u8],
    offset: usize,
    endianness: TargetEndianness,
) -> CodecResult<(String, usize)> {
    let len_with_nul = read_u32(buf, offset, endianness)? as usize;
    if len_with_nul == 0 {
        return Err(CodecError::InvalidString { offset });
    }
    let data_words = len_with_nul.div_ceil(4);

    let mut bytes = Vec::with_capacity(data_words * 4);
    for word_index in 0..data_words {
        let word = read_u32(buf, offset + 4 + word_index * 4, endianness)?;
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes.truncate(len_with_nul - 1);

    if bytes.iter().any(|b| !b.is_ascii() || *b == 0) {
        return Err(CodecError::InvalidString { offset });
    }
    let s = String::from_utf8(bytes).map_err(|_| CodecError::InvalidString { offset })?;
    Ok((s, 4 + data_words * 4))
}

/// One declaration from a timeline message directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwTraceMessage {
    pub id: u32,
    pub name: String,
    pub ui_name: String,
    pub arg_types: Vec<char>,
    pub arg_names: Vec<String>,
}

/// Decode a directory declaration at `offset`: a u32 id followed by
/// four SwTrace strings (name, ui name, argument type tags, and the
/// comma-separated argument names).
pub fn read_sw_trace_message(
    buf: &[u8],
    offset: usize,
    endianness: TargetEndianness,
) -> CodecResult<(SwTraceMessage, usize)> {
    let id = read_u32(buf, offset, endianness)?;
    let mut consumed = 4;

    let (name, used) = decode_string(buf, offset + consumed, endianness)?;
    consumed += used;
    let (ui_name, used) = decode_string(buf, offset + consumed, endianness)?;
    consumed += used;
    let (arg_types, used) = decode_string(buf, offset + consumed, endianness)?;
    consumed += used;
    let (arg_names, used) = decode_string(buf, offset + consumed, endianness)?;
    consumed += used;

    let message = SwTraceMessage {
        id,
        name,
        ui_name,
        arg_types: arg_types.chars().collect(),
        arg_names: if arg_names.is_empty() {
            Vec::new()
        } else {
            arg_names.split(',').map(str::to_owned).collect()
        },
    };
    Ok((message, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_length_word_includes_the_terminator() {
        let words = encode_string("abc", CharPolicy::Name).unwrap();
        // "abc\0" fits one data word
        assert_eq!(words, vec![4, u32::from_le_bytes(*b"abc\0")]);
    }

    #[test]
    fn a_word_aligned_string_still_gets_a_terminator_word() {
        let words = encode_string("abcd", CharPolicy::Name).unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0], 5);
        assert_eq!(words[2], 0, "terminator spills into an all-zero word");
    }

    #[test]
    fn round_trip_through_both_byte_orders() {
        for endianness in [TargetEndianness::BigWire, TargetEndianness::LittleWire] {
            for input in ["x", "conv2d_1", "a_long_layer_name_00042"] {
                let words = encode_string(input, CharPolicy::Name).unwrap();
                let mut buf = Vec::new();
                write_string(&mut buf, &words, endianness);
                let (decoded, consumed) = decode_string(&buf, 0, endianness).unwrap();
                assert_eq!(decoded, input);
                assert_eq!(consumed, buf.len());
            }
        }
    }

    #[test]
    fn the_name_policy_rejects_punctuation() {
        let err = encode_string("conv 2d", CharPolicy::Name).unwrap_err();
        assert!(matches!(err, CodecError::InvalidChar { ch: ' ', .. }));
        assert!(encode_string("conv 2d", CharPolicy::Generic).is_ok());
    }

    #[test]
    fn the_generic_policy_rejects_non_ascii() {
        assert!(encode_string("naïve", CharPolicy::Generic).is_err());
    }

    #[test]
    fn the_type_policy_admits_only_type_tags() {
        assert!(encode_string("@ti", CharPolicy::Type).is_ok());
        assert!(encode_string("z", CharPolicy::Type).is_err());
        assert!(encode_string("ti_", CharPolicy::Type).is_err());
    }

    #[test]
    fn the_empty_string_encodes_as_one_nul() {
        let words = encode_string("", CharPolicy::Generic).unwrap();
        assert_eq!(words, vec![1, 0]);
        let mut buf = Vec::new();
        write_string(&mut buf, &words, TargetEndianness::LittleWire);
        let (decoded, consumed) = decode_string(&buf, 0, TargetEndianness::LittleWire).unwrap();
        assert_eq!(decoded, "");
        assert_eq!(consumed, 8);
    }

    #[test]
    fn directory_messages_decode_all_four_strings() {
        let endianness = TargetEndianness::LittleWire;
        let mut buf = Vec::new();
        put_u32(&mut buf, 7, endianness); // decl id
        for (text, policy) in [
            ("declareEvent", CharPolicy::Generic),
            ("declare event", CharPolicy::Generic),
            ("ps", CharPolicy::Type),
            ("timestamp,eventGuid", CharPolicy::Generic),
        ] {
            let words = encode_string(text, policy).unwrap();
            write_string(&mut buf, &words, endianness);
        }

        let (message, consumed) = read_sw_trace_message(&buf, 0, endianness).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(message.id, 7);
        assert_eq!(message.name, "declareEvent");
        assert_eq!(message.ui_name, "declare event");
        assert_eq!(message.arg_types, vec!['p', 's']);
        assert_eq!(message.arg_names, vec!["timestamp", "eventGuid"]);
    }

    #[test]
    fn a_truncated_string_is_reported_not_panicked() {
        let words = encode_string("abcdefgh", CharPolicy::Name).unwrap();
        let mut buf = Vec::new();
        write_string(&mut buf, &words, TargetEndianness::LittleWire);
        buf.truncate(buf.len() - 2);
        assert!(decode_string(&buf, 0, TargetEndianness::LittleWire).is_err());
    }
}
