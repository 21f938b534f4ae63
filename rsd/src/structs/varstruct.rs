//! Tag-length-value structure encoding used by RSD record frames.
//!
//! ## Wire format
//!
//! A VarStruct opens with a `field_count` varuint, then carries one entry
//! per field: a `key` varuint packing `tag << 3 | len_code`, where codes
//! 0-6 inline the value length and code 7 escapes to an explicit varuint
//! length, followed by the value bytes. A 4-byte big-endian CRC-32 trailer
//! covers every byte from the struct's first byte up to the trailer.
//!
//! Tags are unique within one struct; on duplicates the last occurrence
//! wins. Decoding records `consumed_len` so callers can locate the bytes
//! that follow the trailer.

use log::warn;

use crate::utils::crc::crc32_custom;
use crate::utils::errors::VarStructError;
use crate::utils::varint::{read_varuint, write_varuint};

/// Declared field counts above this are rejected as garbage input.
pub const MAX_FIELD_COUNT: u64 = 10_000;

/// Length code marking an escaped explicit length varuint.
const LEN_CODE_ESCAPE: u64 = 7;

/// CRC trailer handling for [`VarStruct::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcMode {
    /// A mismatching trailer fails the decode.
    Strict,
    /// A mismatching trailer is logged and flagged, and the struct returned.
    Warn,
}

/// One raw tag-length-value field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub tag: u32,
    pub bytes: Vec<u8>,
}

impl RawField {
    pub fn new(tag: u32, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            bytes: bytes.into(),
        }
    }
}

/// A decoded VarStruct: ordered fields plus decode bookkeeping.
#[derive(Debug, Clone)]
pub struct VarStruct {
    fields: Vec<RawField>,
    /// Source bytes the decode consumed, CRC trailer included.
    pub consumed_len: usize,
    /// False when [`CrcMode::Warn`] accepted a mismatching trailer.
    pub crc_ok: bool,
}

impl VarStruct {
    /// Decodes one VarStruct from `buf[pos..limit]`.
    ///
    /// Returns the struct and the position one past its CRC trailer. The
    /// decode never reads past `limit`.
    pub fn decode(
        buf: &[u8],
        pos: usize,
        limit: usize,
        crc_mode: CrcMode,
    ) -> Result<(Self, usize), VarStructError> {
        let limit = limit.min(buf.len());
        let start = pos;

        let (count, mut pos) = read_varuint(buf, pos, limit)?;
        if count > MAX_FIELD_COUNT {
            return Err(VarStructError::FieldCountUnreasonable(count));
        }

        let mut fields: Vec<RawField> = Vec::new();
        for _ in 0..count {
            let (key, next) = read_varuint(buf, pos, limit)?;
            pos = next;
            let tag = (key >> 3) as u32;
            let len_code = key & 7;

            let value_len = if len_code == LEN_CODE_ESCAPE {
                let (len, next) = read_varuint(buf, pos, limit)?;
                pos = next;
                len
            } else {
                len_code
            };

            let avail = (limit - pos) as u64;
            if value_len > avail {
                return Err(VarStructError::ValueExceedsBounds {
                    tag,
                    len: value_len,
                    avail,
                });
            }

            let end = pos + value_len as usize;
            let bytes = buf[pos..end].to_vec();
            pos = end;

            match fields.iter_mut().find(|f| f.tag == tag) {
                Some(existing) => existing.bytes = bytes,
                None => fields.push(RawField { tag, bytes }),
            }
        }

        if pos + 4 > limit {
            return Err(VarStructError::TruncatedBeforeCrc(pos));
        }
        let read = u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);
        let calculated = crc32_custom(&buf[start..pos]);
        pos += 4;

        let crc_ok = calculated == read;
        if !crc_ok {
            match crc_mode {
                CrcMode::Strict => return Err(VarStructError::CrcMismatch { calculated, read }),
                CrcMode::Warn => warn!(
                    "VarStruct CRC mismatch at {start:#X}: calculated {calculated:#010X}, read {read:#010X}"
                ),
            }
        }

        Ok((
            Self {
                fields,
                consumed_len: pos - start,
                crc_ok,
            },
            pos,
        ))
    }

    /// Encodes `fields` in order and appends the CRC trailer.
    ///
    /// The recorded format is read-only in production; this inverse exists
    /// for round-trip tests and synthetic capture fixtures.
    pub fn encode(fields: &[RawField]) -> Vec<u8> {
        let mut out = Vec::new();
        write_varuint(&mut out, fields.len() as u64);

        for field in fields {
            let len = field.bytes.len() as u64;
            let len_code = if len < LEN_CODE_ESCAPE {
                len
            } else {
                LEN_CODE_ESCAPE
            };
            write_varuint(&mut out, (u64::from(field.tag) << 3) | len_code);
            if len_code == LEN_CODE_ESCAPE {
                write_varuint(&mut out, len);
            }
            out.extend_from_slice(&field.bytes);
        }

        let crc = crc32_custom(&out);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    /// Value bytes of the field with `tag`, if present.
    pub fn get(&self, tag: u32) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.bytes.as_slice())
    }

    /// Fields in their on-wire order.
    pub fn fields(&self) -> &[RawField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[test]
fn round_trip_preserves_fields() {
    let fields = vec![
        RawField::new(0, vec![]),
        RawField::new(2, vec![0xAA; 4]),
        RawField::new(5, vec![1, 2, 3, 4, 5, 6]),
        RawField::new(7, vec![0x55; 7]),
        RawField::new(9, vec![0x10; 300]),
        RawField::new((1 << 29) - 1, b"forward-compat".to_vec()),
    ];

    let bytes = VarStruct::encode(&fields);
    let (decoded, end) = VarStruct::decode(&bytes, 0, bytes.len(), CrcMode::Strict).unwrap();

    assert_eq!(decoded.fields(), fields.as_slice());
    assert_eq!(end, bytes.len());
    assert_eq!(decoded.consumed_len, bytes.len());
    assert!(decoded.crc_ok);
}

#[test]
fn decode_within_larger_buffer() {
    let fields = vec![RawField::new(3, vec![9, 9])];
    let inner = VarStruct::encode(&fields);

    let mut buf = vec![0xEE; 10];
    buf.extend_from_slice(&inner);
    buf.extend_from_slice(&[0xEE; 10]);

    let (decoded, end) = VarStruct::decode(&buf, 10, buf.len(), CrcMode::Strict).unwrap();
    assert_eq!(decoded.get(3), Some(&[9u8, 9][..]));
    assert_eq!(decoded.consumed_len, inner.len());
    assert_eq!(end, 10 + inner.len());
}

#[test]
fn duplicate_tag_last_write_wins() {
    // Hand-built: two fields sharing tag 1, values [0xAA] then [0xBB].
    let mut body = Vec::new();
    write_varuint(&mut body, 2);
    write_varuint(&mut body, (1 << 3) | 1);
    body.push(0xAA);
    write_varuint(&mut body, (1 << 3) | 1);
    body.push(0xBB);
    let crc = crc32_custom(&body);
    body.extend_from_slice(&crc.to_be_bytes());

    let (decoded, _) = VarStruct::decode(&body, 0, body.len(), CrcMode::Strict).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded.get(1), Some(&[0xBBu8][..]));
}

#[test]
fn unreasonable_field_count_rejected() {
    let mut buf = Vec::new();
    write_varuint(&mut buf, 1_000_000);
    buf.extend_from_slice(&[0u8; 64]);

    assert!(matches!(
        VarStruct::decode(&buf, 0, buf.len(), CrcMode::Warn),
        Err(VarStructError::FieldCountUnreasonable(1_000_000))
    ));
}

#[test]
fn value_past_limit_rejected() {
    let mut buf = Vec::new();
    write_varuint(&mut buf, 1);
    write_varuint(&mut buf, (4 << 3) | 7);
    write_varuint(&mut buf, 500);
    buf.extend_from_slice(&[0u8; 16]);

    assert!(matches!(
        VarStruct::decode(&buf, 0, buf.len(), CrcMode::Warn),
        Err(VarStructError::ValueExceedsBounds { tag: 4, len: 500, .. })
    ));
}

#[test]
fn truncated_before_crc_rejected() {
    let full = VarStruct::encode(&[RawField::new(2, vec![1, 2, 3])]);
    let short = &full[..full.len() - 2];

    assert!(matches!(
        VarStruct::decode(short, 0, short.len(), CrcMode::Strict),
        Err(VarStructError::TruncatedBeforeCrc(_))
    ));
}

#[test]
fn crc_mismatch_strict_vs_warn() {
    let mut bytes = VarStruct::encode(&[RawField::new(2, vec![1, 2, 3, 4])]);
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    assert!(matches!(
        VarStruct::decode(&bytes, 0, bytes.len(), CrcMode::Strict),
        Err(VarStructError::CrcMismatch { .. })
    ));

    let (decoded, end) = VarStruct::decode(&bytes, 0, bytes.len(), CrcMode::Warn).unwrap();
    assert!(!decoded.crc_ok);
    assert_eq!(end, bytes.len());
    assert_eq!(decoded.get(2), Some(&[1u8, 2, 3, 4][..]));
}

#[test]
fn seven_byte_value_uses_escape_code() {
    let bytes = VarStruct::encode(&[RawField::new(1, vec![0x11; 7])]);
    // key byte carries the escape code, then an explicit length of 7
    assert_eq!(bytes[1], (1 << 3) | 7);
    assert_eq!(bytes[2], 7);

    let (decoded, _) = VarStruct::decode(&bytes, 0, bytes.len(), CrcMode::Strict).unwrap();
    assert_eq!(decoded.get(1).map(<[u8]>::len), Some(7));
}
