//! Record stream decoding pipeline.
//!
//! 1. **Magic scanning** ([`scan`]): locates candidate frame boundaries by
//!    searching for the header magic's byte pattern.
//! 2. **Record decoding** ([`decode`]): drives the scanner, parses header
//!    and body VarStructs and yields [`Record`](crate::structs::record::Record)s,
//!    resynchronizing across corruption.

pub mod decode;
pub mod scan;

pub use crate::structs::varstruct::CrcMode;

/// Header magic echoed in field 0 of every record header VarStruct.
///
/// Scanned as its little-endian byte pattern.
pub const HEADER_MAGIC: u32 = 0xB7E9_DA86;

/// Magic opening the `(magic, chunk_size, crc)` frame trailer.
pub const TRAILER_MAGIC: u32 = 0xD926_4B7C;

/// Byte length of the frame trailer.
pub const TRAILER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    #[inline]
    pub(crate) fn u32_from(self, word: [u8; 4]) -> u32 {
        match self {
            Endian::Little => u32::from_le_bytes(word),
            Endian::Big => u32::from_be_bytes(word),
        }
    }

    #[inline]
    pub(crate) fn i32_from(self, word: [u8; 4]) -> i32 {
        match self {
            Endian::Little => i32::from_le_bytes(word),
            Endian::Big => i32::from_be_bytes(word),
        }
    }
}

/// How a body VarStruct decode failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFailure {
    /// Drop the frame and resynchronize.
    Abort,
    /// Emit the record with defaults; `channel_id` falls back to `seq` and
    /// the body is assumed to have consumed a fixed fallback length.
    SubstituteDefaults,
}

/// How an invalid frame trailer is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailerFailure {
    /// Drop the frame and resume scanning just past its magic.
    FixedSkip,
    /// Keep the record and re-scan a bounded window for the next header.
    Rescan,
}

/// Failure-handling policy for one decoding pass.
///
/// The two presets reproduce the recorder generations observed in the
/// field. Both run through the same decoder; only these knobs differ, so
/// the variants cannot drift apart.
#[derive(Debug, Clone, Copy)]
pub struct ResyncPolicy {
    pub crc_mode: CrcMode,
    pub on_body_failure: BodyFailure,
    pub on_bad_trailer: TrailerFailure,
    /// Trailer word order. Classic recorders write the trailer
    /// little-endian, nextgen recorders big-endian; a property of the
    /// captured files, not something to normalize away.
    pub trailer_order: Endian,
    /// Byte order of the 32-bit map-unit position fields.
    pub map_unit_order: Endian,
}

impl ResyncPolicy {
    /// Strict decoding: CRC failures are fatal per frame, bad trailers drop
    /// the frame, and the scan resumes just past the magic.
    pub const fn classic() -> Self {
        Self {
            crc_mode: CrcMode::Strict,
            on_body_failure: BodyFailure::Abort,
            on_bad_trailer: TrailerFailure::FixedSkip,
            trailer_order: Endian::Little,
            map_unit_order: Endian::Little,
        }
    }

    /// Salvaging decoding: CRC failures warn, body failures substitute
    /// defaults, and bad trailers fall back to a bounded forward re-scan.
    pub const fn tolerant() -> Self {
        Self {
            crc_mode: CrcMode::Warn,
            on_body_failure: BodyFailure::SubstituteDefaults,
            on_bad_trailer: TrailerFailure::Rescan,
            trailer_order: Endian::Big,
            map_unit_order: Endian::Big,
        }
    }
}

impl Default for ResyncPolicy {
    fn default() -> Self {
        Self::tolerant()
    }
}

/// VarStruct tag assignments for header and body fields.
///
/// The mapping was recovered by experimentation against sample captures,
/// not from a vendor specification, so it stays configurable. Body tags
/// with no entry here land in `Record::extras` and are logged.
#[derive(Debug, Clone)]
pub struct TagMap {
    /// Header: magic echo (u32 LE).
    pub header_magic: u32,
    /// Header: sequence counter (u32 LE).
    pub header_seq: u32,
    /// Header: body-plus-payload size (u16 LE).
    pub header_data_size: u32,
    /// Header: device timestamp (u32 LE).
    pub header_time_ms: u32,
    /// Body: channel identifier (u32 LE).
    pub body_channel: u32,
    /// Body: depth in millimeters (zigzag varint).
    pub body_depth_mm: u32,
    /// Body: sample count (u32 LE).
    pub body_sample_cnt: u32,
    /// Body: latitude map units (i32, order per policy).
    pub body_lat: u32,
    /// Body: longitude map units (i32, order per policy).
    pub body_lon: u32,
    /// Body: beam angle (f32 LE).
    pub body_beam: u32,
}

impl Default for TagMap {
    fn default() -> Self {
        Self {
            header_magic: 0,
            header_seq: 2,
            header_data_size: 4,
            header_time_ms: 5,
            body_channel: 0,
            body_depth_mm: 1,
            body_sample_cnt: 7,
            body_lat: 9,
            body_lon: 10,
            body_beam: 11,
        }
    }
}
