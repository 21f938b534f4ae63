//! Decoded sonar record representation.

use std::collections::BTreeMap;

/// One decoded sonar ping or metadata unit.
///
/// Values come from the frame's header and body VarStructs. Fields the
/// frame did not carry keep their defaults; position and depth additionally
/// clear the matching `has_*` flag so callers can tell a genuine zero from
/// absence. `extras` preserves body fields with no named mapping for
/// forward compatibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Byte offset of the frame header start; identity key within one file.
    pub offset: u64,
    /// Transducer channel identifier.
    pub channel_id: u32,
    /// Device sequence counter.
    pub seq: u32,
    /// Device timestamp in milliseconds.
    pub time_ms: u32,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Water depth in meters.
    pub depth_m: f64,
    /// Number of samples in the acoustic payload.
    pub sample_cnt: u32,
    /// Offset of the opaque acoustic payload, 0 when the frame has none.
    pub sonar_ofs: u64,
    /// Length of the acoustic payload in bytes.
    pub sonar_size: u64,
    /// Beam angle in degrees.
    pub beam_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
    pub heave_m: Option<f64>,
    pub tx_ofs_m: Option<f64>,
    pub rx_ofs_m: Option<f64>,
    pub color_id: Option<u32>,
    /// True when the body carried both latitude and longitude.
    pub has_position: bool,
    /// True when the body carried a depth field.
    pub has_depth: bool,
    /// Body fields with no named mapping, keyed by tag.
    pub extras: BTreeMap<u32, Vec<u8>>,
}

impl Record {
    /// The payload span as `(offset, length)`, if the frame carried one.
    pub fn payload_span(&self) -> Option<(u64, u64)> {
        (self.sonar_size > 0).then_some((self.sonar_ofs, self.sonar_size))
    }
}
