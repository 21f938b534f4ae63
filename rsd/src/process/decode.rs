//! Record stream decoder.
//!
//! Walks a capture forward in a single pass: finds the next header magic,
//! locates the enclosing header VarStruct by bounded backward search,
//! decodes the body, computes the acoustic payload span, validates the
//! frame trailer and advances. Every decode failure is resolved locally by
//! skipping and resynchronizing, so the iterator yields only complete
//! [`Record`]s and always makes forward progress, even on pathological
//! input.
//!
//! # Example
//!
//! ```rust,no_run
//! use rsd::process::ResyncPolicy;
//! use rsd::process::decode::RecordStream;
//!
//! let stream = RecordStream::open("capture.rsd")?
//!     .with_policy(ResyncPolicy::classic())
//!     .with_record_limit(100);
//!
//! for record in stream {
//!     println!(
//!         "{:#010X} ch {} {:.6},{:.6} depth {:.2} m",
//!         record.offset, record.channel_id, record.lat, record.lon, record.depth_m
//!     );
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, warn};

use crate::process::scan::Scanner;
use crate::process::{
    BodyFailure, HEADER_MAGIC, ResyncPolicy, TRAILER_LEN, TRAILER_MAGIC, TagMap, TrailerFailure,
};
use crate::structs::record::Record;
use crate::structs::varstruct::{CrcMode, VarStruct};
use crate::utils::errors::ScanError;
use crate::utils::units::{depth_mm_to_meters, map_unit_to_degrees};
use crate::utils::varint::read_varint;

/// Candidate window searched backward from a magic hit for the header
/// VarStruct's start. The magic sits a few key/count bytes into the struct,
/// never further back than this.
pub const HEADER_BACK_WINDOW: usize = 64;

/// Same-offset magic hits tolerated before the watchdog forces a skip.
pub const MAX_STALL_HITS: u32 = 2;

/// Bytes skipped past a stalled magic offset.
const STALL_SKIP: usize = 8;

/// Body length assumed when a tolerant decode substitutes defaults.
const FALLBACK_BODY_LEN: usize = 32;

/// Forward window for bad-trailer re-scans, from the frame's header start.
const RESCAN_WINDOW: usize = 4 * 1024 * 1024;

/// Backward search for the VarStruct enclosing a magic hit.
///
/// The header magic is a field *value* inside the header VarStruct, so the
/// struct starts shortly before the scanner's match. Tries each start in
/// `magic_ofs - 1 ..= magic_ofs - HEADER_BACK_WINDOW` and accepts the first
/// decode whose `magic_tag` field echoes `magic`. Returns the struct, its
/// start offset and the position one past its CRC trailer.
pub fn find_struct_start(
    data: &[u8],
    magic_ofs: usize,
    limit: usize,
    magic_tag: u32,
    magic: u32,
    crc_mode: CrcMode,
) -> Option<(VarStruct, usize, usize)> {
    for back in 1..=HEADER_BACK_WINDOW {
        let Some(start) = magic_ofs.checked_sub(back) else {
            break;
        };
        let Ok((decoded, end)) = VarStruct::decode(data, start, limit, crc_mode) else {
            continue;
        };
        let echoed = decoded
            .get(magic_tag)
            .filter(|bytes| bytes.len() >= 4)
            .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        if echoed == Some(magic) {
            return Some((decoded, start, end));
        }
    }

    None
}

/// Pull-based decoder over an immutable byte view of one capture.
///
/// Construct with [`RecordStream::open`] or [`RecordStream::new`], adjust
/// with the builder methods, then iterate. Decode failures never surface;
/// they are logged and skipped (see the module docs).
pub struct RecordStream<'a> {
    data: Arc<[u8]>,
    policy: ResyncPolicy,
    tags: TagMap,
    scanner: Scanner<'a>,
    pattern: [u8; 4],
    pos: usize,
    limit: usize,
    start_offset: usize,
    record_limit: Option<u64>,
    emitted: u64,
    skipped: u64,
    last_offset: Option<u64>,
    last_magic: Option<usize>,
    stall_hits: u32,
    started: bool,
    finished: bool,
}

impl std::fmt::Debug for RecordStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("len", &self.data.len())
            .field("pos", &self.pos)
            .field("policy", &self.policy)
            .field("emitted", &self.emitted)
            .field("skipped", &self.skipped)
            .finish()
    }
}

impl<'a> RecordStream<'a> {
    /// Creates a decoder over an in-memory byte view.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let limit = data.len();
        Self {
            data,
            policy: ResyncPolicy::default(),
            tags: TagMap::default(),
            scanner: Scanner::new(),
            pattern: HEADER_MAGIC.to_le_bytes(),
            pos: 0,
            limit,
            start_offset: 0,
            record_limit: None,
            emitted: 0,
            skipped: 0,
            last_offset: None,
            last_magic: None,
            stall_hits: 0,
            started: false,
            finished: false,
        }
    }

    /// Reads `path` into memory and decodes it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::new(data))
    }

    pub fn with_policy(mut self, policy: ResyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tag_map(mut self, tags: TagMap) -> Self {
        self.tags = tags;
        self
    }

    /// Starts the scan at `offset` instead of the beginning of the view.
    pub fn with_start_offset(mut self, offset: u64) -> Self {
        self.start_offset = usize::try_from(offset).unwrap_or(usize::MAX);
        self
    }

    /// Stops after yielding `limit` records.
    pub fn with_record_limit(mut self, limit: u64) -> Self {
        self.record_limit = Some(limit);
        self
    }

    /// Scanner chunk span; a reporting knob, not a semantic one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.scanner = std::mem::take(&mut self.scanner).with_chunk_size(chunk_size);
        self
    }

    /// Registers a progress callback, replacing any previous one.
    ///
    /// Invoked synchronously on the scanning thread with
    /// `(percent, message)`; percentages never decrease within one scan.
    pub fn with_progress(mut self, callback: impl FnMut(f64, &str) + 'a) -> Self {
        self.scanner = std::mem::take(&mut self.scanner).with_progress(callback);
        self
    }

    /// The byte view records index into with `sonar_ofs`/`sonar_size`.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn policy(&self) -> ResyncPolicy {
        self.policy
    }

    /// Records yielded so far.
    pub fn records_emitted(&self) -> u64 {
        self.emitted
    }

    /// Skip-and-resync events so far (failed headers, bad trailers,
    /// watchdog skips, suppressed duplicates).
    pub fn resync_skips(&self) -> u64 {
        self.skipped
    }

    fn complete(&mut self) {
        if !self.finished {
            self.finished = true;
            let message = format!("scan complete, {} records", self.emitted);
            self.scanner.emit(100.0, &message);
        }
    }

    fn skip_to(&mut self, pos: usize, reason: ScanError) {
        debug!("resync: {reason}, resuming at {pos:#X}");
        self.pos = pos;
        self.skipped += 1;
    }

    fn apply_body(&self, record: &mut Record, body: &VarStruct) {
        let tags = &self.tags;
        let mut lat_seen = false;
        let mut lon_seen = false;

        for field in body.fields() {
            let bytes = field.bytes.as_slice();
            if field.tag == tags.body_channel {
                record.channel_id = u32_le_padded(Some(bytes));
            } else if field.tag == tags.body_depth_mm {
                match read_varint(bytes, 0, bytes.len()) {
                    Ok((mm, _)) => {
                        record.depth_m = depth_mm_to_meters(mm);
                        record.has_depth = true;
                    }
                    Err(e) => debug!("bad depth varint in record at {:#X}: {e}", record.offset),
                }
            } else if field.tag == tags.body_sample_cnt {
                record.sample_cnt = u32_le_padded(Some(bytes));
            } else if field.tag == tags.body_lat && bytes.len() >= 4 {
                let raw = self.policy.map_unit_order.i32_from(word4(bytes, 0));
                record.lat = map_unit_to_degrees(raw);
                lat_seen = true;
            } else if field.tag == tags.body_lon && bytes.len() >= 4 {
                let raw = self.policy.map_unit_order.i32_from(word4(bytes, 0));
                record.lon = map_unit_to_degrees(raw);
                lon_seen = true;
            } else if field.tag == tags.body_beam && bytes.len() >= 4 {
                record.beam_deg = f32::from_le_bytes(word4(bytes, 0)) as f64;
            } else {
                // Unrecognized tags are preserved, not silently dropped.
                debug!(
                    "unmapped body field tag {} ({} bytes) in record at {:#X}",
                    field.tag,
                    bytes.len(),
                    record.offset
                );
                record.extras.insert(field.tag, bytes.to_vec());
            }
        }

        record.has_position = lat_seen && lon_seen;
    }
}

impl Iterator for RecordStream<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            self.pos = self.start_offset.min(self.limit);
            self.scanner.set_origin(self.pos, self.limit);
            self.scanner.emit(0.0, "scanning for record headers");
        }

        let data = Arc::clone(&self.data);

        loop {
            if self.record_limit.is_some_and(|n| self.emitted >= n)
                || self.pos + TRAILER_LEN >= self.limit
            {
                self.complete();
                return None;
            }

            let Some(magic_ofs) = self.scanner.find(&data, &self.pattern, self.pos, self.limit)
            else {
                // normal end of scan, not an error
                debug!("{}", ScanError::MagicNotFound);
                self.complete();
                return None;
            };

            // Stall watchdog: the same magic revisited repeatedly without a
            // record means the advance logic is looping; force a skip.
            if self.last_magic == Some(magic_ofs) {
                self.stall_hits += 1;
                if self.stall_hits > MAX_STALL_HITS {
                    self.last_magic = None;
                    self.stall_hits = 0;
                    self.skip_to(magic_ofs + STALL_SKIP, ScanError::StalledScan(magic_ofs));
                    continue;
                }
            } else {
                self.last_magic = Some(magic_ofs);
                self.stall_hits = 0;
            }

            let Some((header, header_start, body_start)) = find_struct_start(
                &data,
                magic_ofs,
                self.limit,
                self.tags.header_magic,
                HEADER_MAGIC,
                self.policy.crc_mode,
            ) else {
                self.skip_to(magic_ofs + 4, ScanError::HeaderDecodeFailed(magic_ofs));
                continue;
            };

            let seq = u32_le_padded(header.get(self.tags.header_seq));
            let time_ms = u32_le_padded(header.get(self.tags.header_time_ms));
            let data_size = u16_le_padded(header.get(self.tags.header_data_size)) as usize;

            let mut record = Record {
                offset: header_start as u64,
                seq,
                time_ms,
                ..Record::default()
            };

            let body_consumed =
                match VarStruct::decode(&data, body_start, self.limit, self.policy.crc_mode) {
                    Ok((body, body_end)) => {
                        self.apply_body(&mut record, &body);
                        body_end - body_start
                    }
                    Err(e) => match self.policy.on_body_failure {
                        BodyFailure::Abort => {
                            self.skip_to(magic_ofs + 4, ScanError::BodyDecodeFailed(body_start));
                            continue;
                        }
                        BodyFailure::SubstituteDefaults => {
                            warn!("body decode failed at {body_start:#X}, substituting defaults: {e}");
                            record.channel_id = seq;
                            FALLBACK_BODY_LEN
                        }
                    },
                };

            let sonar_size = data_size.saturating_sub(body_consumed);
            if sonar_size > 0 {
                record.sonar_ofs = (body_start + body_consumed) as u64;
                record.sonar_size = sonar_size as u64;
            }

            // A frame whose trailer region runs past EOF is a partial
            // trailing frame; the payload bounds cannot be trusted.
            let trailer_pos = body_start + data_size;
            if trailer_pos + TRAILER_LEN > self.limit {
                self.complete();
                return None;
            }

            let order = self.policy.trailer_order;
            let trailer_magic = order.u32_from(word4(&data, trailer_pos));
            let chunk_size = order.u32_from(word4(&data, trailer_pos + 4));
            let trailer_ok = trailer_magic == TRAILER_MAGIC && chunk_size > 0;

            let mut exhausted = false;
            if trailer_ok {
                self.pos = header_start + chunk_size as usize;
            } else {
                match self.policy.on_bad_trailer {
                    TrailerFailure::FixedSkip => {
                        self.skip_to(magic_ofs + 4, ScanError::TrailerMismatch(trailer_pos));
                        continue;
                    }
                    TrailerFailure::Rescan => {
                        warn!("trailer mismatch at {trailer_pos:#X}, re-scanning for next header");
                        let from = (trailer_pos + 2).min(self.limit);
                        let to = (header_start + RESCAN_WINDOW).min(self.limit);
                        match self.scanner.find(&data, &self.pattern, from, to) {
                            Some(next_magic) => self.pos = next_magic,
                            None => exhausted = true,
                        }
                    }
                }
            }

            // Yielded offsets are strictly increasing within one scan; a
            // backward-pointing chunk_size must not re-emit a frame. The
            // cursor is pushed past this magic so revisit cycles spanning
            // several frames still terminate.
            if self.last_offset.is_some_and(|last| record.offset <= last) {
                self.pos = self.pos.max(magic_ofs + 4);
                self.skipped += 1;
                if exhausted {
                    self.complete();
                    return None;
                }
                continue;
            }

            self.emitted += 1;
            self.last_offset = Some(record.offset);

            if self.emitted.is_multiple_of(100) {
                let percent = self.scanner.percent_at(trailer_pos);
                let message = format!("records: {}", self.emitted);
                self.scanner.emit(percent, &message);
            }

            if exhausted {
                self.complete();
            }
            return Some(record);
        }
    }
}

fn word4(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

fn u32_le_padded(bytes: Option<&[u8]>) -> u32 {
    let mut word = [0u8; 4];
    if let Some(bytes) = bytes {
        let n = bytes.len().min(4);
        word[..n].copy_from_slice(&bytes[..n]);
    }
    u32::from_le_bytes(word)
}

fn u16_le_padded(bytes: Option<&[u8]>) -> u16 {
    let mut word = [0u8; 2];
    if let Some(bytes) = bytes {
        let n = bytes.len().min(2);
        word[..n].copy_from_slice(&bytes[..n]);
    }
    u16::from_le_bytes(word)
}

#[cfg(test)]
use crate::process::Endian;
#[cfg(test)]
use crate::structs::varstruct::RawField;
#[cfg(test)]
use crate::utils::varint::{write_varuint, zigzag_encode};

#[cfg(test)]
fn trailer_word(order: Endian, value: u32) -> [u8; 4] {
    match order {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    }
}

#[cfg(test)]
fn standard_body(
    policy: &ResyncPolicy,
    channel: u32,
    lat_raw: i32,
    lon_raw: i32,
    depth_mm: i64,
    samples: u32,
    beam: f32,
) -> Vec<RawField> {
    let map = |v: i32| -> Vec<u8> {
        match policy.map_unit_order {
            Endian::Little => v.to_le_bytes().to_vec(),
            Endian::Big => v.to_be_bytes().to_vec(),
        }
    };
    let mut depth = Vec::new();
    write_varuint(&mut depth, zigzag_encode(depth_mm));

    vec![
        RawField::new(0, channel.to_le_bytes()),
        RawField::new(1, depth),
        RawField::new(7, samples.to_le_bytes()),
        RawField::new(9, map(lat_raw)),
        RawField::new(10, map(lon_raw)),
        RawField::new(11, beam.to_le_bytes()),
    ]
}

/// One complete frame: header VarStruct, body VarStruct, payload, trailer.
/// `chunk_to_next` defaults to the frame's own length (contiguous layout).
#[cfg(test)]
fn build_frame(
    policy: &ResyncPolicy,
    seq: u32,
    time_ms: u32,
    body_fields: &[RawField],
    payload: &[u8],
    chunk_to_next: Option<u32>,
) -> Vec<u8> {
    let body = VarStruct::encode(body_fields);
    let data_size = (body.len() + payload.len()) as u16;
    let header = VarStruct::encode(&[
        RawField::new(0, HEADER_MAGIC.to_le_bytes()),
        RawField::new(2, seq.to_le_bytes()),
        RawField::new(4, data_size.to_le_bytes()),
        RawField::new(5, time_ms.to_le_bytes()),
    ]);

    let total = header.len() + body.len() + payload.len() + TRAILER_LEN;
    let chunk = chunk_to_next.unwrap_or(total as u32);

    let mut frame = header;
    frame.extend_from_slice(&body);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&trailer_word(policy.trailer_order, TRAILER_MAGIC));
    frame.extend_from_slice(&trailer_word(policy.trailer_order, chunk));
    frame.extend_from_slice(&trailer_word(policy.trailer_order, 0));
    frame
}

#[cfg(test)]
fn concat_with_prefix(prefix_len: usize, frames: &[Vec<u8>]) -> (Vec<u8>, Vec<usize>) {
    let mut data = vec![0u8; prefix_len];
    let mut starts = Vec::new();
    for frame in frames {
        starts.push(data.len());
        data.extend_from_slice(frame);
    }
    (data, starts)
}

#[test]
fn decodes_contiguous_frames_tolerant() {
    let policy = ResyncPolicy::tolerant();
    let payloads: [&[u8]; 3] = [&[0xA1; 16], &[], &[0xC3; 32]];
    let frames: Vec<Vec<u8>> = (0..3)
        .map(|i| {
            let mut body = standard_body(
                &policy,
                i as u32,
                0x2000_0000,
                -0x4000_0000,
                3500 + i as i64,
                480,
                12.5,
            );
            if i == 0 {
                body.push(RawField::new(13, vec![0xEE, 0xEF]));
            }
            build_frame(&policy, i as u32 + 1, 1000 * i as u32, &body, payloads[i], None)
        })
        .collect();
    let (data, starts) = concat_with_prefix(64, &frames);

    let records: Vec<Record> = RecordStream::new(data.clone()).collect();
    assert_eq!(records.len(), 3);

    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.offset, starts[i] as u64);
        assert_eq!(record.seq, i as u32 + 1);
        assert_eq!(record.time_ms, 1000 * i as u32);
        assert_eq!(record.channel_id, i as u32);
        assert!((record.lat - 45.0).abs() < 1e-9);
        assert!((record.lon + 90.0).abs() < 1e-9);
        assert!(record.has_position);
        assert!(record.has_depth);
        assert!((record.depth_m - (3.5 + i as f64 / 1000.0)).abs() < 1e-9);
        assert_eq!(record.sample_cnt, 480);
        assert_eq!(record.beam_deg, 12.5);

        match record.payload_span() {
            Some((ofs, len)) => {
                assert_eq!(len as usize, payloads[i].len());
                assert_eq!(&data[ofs as usize..(ofs + len) as usize], payloads[i]);
            }
            None => assert!(payloads[i].is_empty()),
        }
    }

    // offsets strictly increasing
    assert!(records.windows(2).all(|w| w[0].offset < w[1].offset));
    // the unmapped tag survived in extras
    assert_eq!(records[0].extras.get(&13), Some(&vec![0xEE, 0xEF]));
    assert!(records[1].extras.is_empty());
}

#[test]
fn decodes_classic_little_endian_layout() {
    let policy = ResyncPolicy::classic();
    let frames: Vec<Vec<u8>> = (0..3)
        .map(|i| {
            let body = standard_body(&policy, 2, 0x1000_0000, 0x2000_0000, 900, 256, 5.0);
            build_frame(&policy, 10 + i, 0, &body, &[0x42; 8], None)
        })
        .collect();
    let (data, starts) = concat_with_prefix(32, &frames);

    let mut stream = RecordStream::new(data).with_policy(policy);
    let records: Vec<Record> = stream.by_ref().collect();

    assert_eq!(records.len(), 3);
    assert_eq!(stream.records_emitted(), 3);
    assert_eq!(records[0].offset, starts[0] as u64);
    assert_eq!(records[2].seq, 12);
    assert!((records[0].lat - 22.5).abs() < 1e-9);
    assert!((records[0].lon - 45.0).abs() < 1e-9);
    assert!((records[0].depth_m - 0.9).abs() < 1e-9);
}

#[test]
fn corrupt_chunk_size_strict_skips_frame_two() {
    let policy = ResyncPolicy::classic();
    let frames: Vec<Vec<u8>> = (0..3)
        .map(|i| {
            let body = standard_body(&policy, 0, 0, 0, 100, 64, 1.0);
            build_frame(&policy, i + 1, 0, &body, &[0x55; 4], None)
        })
        .collect();
    let (mut data, starts) = concat_with_prefix(16, &frames);

    // zero out frame 2's chunk_size
    let chunk_at = starts[1] + frames[1].len() - 8;
    data[chunk_at..chunk_at + 4].fill(0);

    let mut stream = RecordStream::new(data).with_policy(policy);
    let seqs: Vec<u32> = stream.by_ref().map(|r| r.seq).collect();

    assert_eq!(seqs, vec![1, 3]);
    assert!(stream.resync_skips() >= 1);
}

#[test]
fn corrupt_chunk_size_tolerant_keeps_frame_two() {
    let policy = ResyncPolicy::tolerant();
    let frames: Vec<Vec<u8>> = (0..3)
        .map(|i| {
            let body = standard_body(&policy, 7, 0x0800_0000, 0x0800_0000, 2000, 128, 3.0);
            build_frame(&policy, i + 1, 0, &body, &[0x66; 6], None)
        })
        .collect();
    let (mut data, starts) = concat_with_prefix(16, &frames);

    let chunk_at = starts[1] + frames[1].len() - 8;
    data[chunk_at..chunk_at + 4].fill(0);

    let records: Vec<Record> = RecordStream::new(data).with_policy(policy).collect();
    let seqs: Vec<u32> = records.iter().map(|r| r.seq).collect();

    assert_eq!(seqs, vec![1, 2, 3]);
    // frame 2's body decoded normally despite the bad trailer
    assert!(records[1].has_position);
    assert_eq!(records[1].channel_id, 7);
}

#[test]
fn false_positive_magic_before_frames_resyncs() {
    let policy = ResyncPolicy::tolerant();
    let frames: Vec<Vec<u8>> = (0..2)
        .map(|i| {
            let body = standard_body(&policy, 1, 0, 0, 500, 32, 0.0);
            build_frame(&policy, i + 1, 0, &body, &[], None)
        })
        .collect();
    let (mut data, _starts) = concat_with_prefix(96, &frames);

    // plant the magic's byte pattern in the junk prefix
    data[10..14].copy_from_slice(&HEADER_MAGIC.to_le_bytes());

    let mut stream = RecordStream::new(data).with_policy(policy);
    let seqs: Vec<u32> = stream.by_ref().map(|r| r.seq).collect();

    assert_eq!(seqs, vec![1, 2]);
    assert!(stream.resync_skips() >= 1);
}

#[test]
fn all_magic_bytes_terminates_without_records() {
    let mut data = Vec::new();
    for _ in 0..300 {
        data.extend_from_slice(&HEADER_MAGIC.to_le_bytes());
    }

    for policy in [ResyncPolicy::classic(), ResyncPolicy::tolerant()] {
        let records: Vec<Record> = RecordStream::new(data.clone()).with_policy(policy).collect();
        assert!(records.is_empty());
    }
}

#[test]
fn backward_chunk_size_yields_one_record_and_terminates() {
    let policy = ResyncPolicy::tolerant();
    let body = standard_body(&policy, 0, 0, 0, 100, 16, 0.0);
    // chunk_size of 1 hops the cursor backward relative to the magic
    let frame = build_frame(&policy, 1, 0, &body, &[0x11; 64], Some(1));
    let (data, _) = concat_with_prefix(0, &[frame]);

    let records: Vec<Record> = RecordStream::new(data).with_policy(policy).collect();
    assert_eq!(records.len(), 1);
}

#[test]
fn empty_and_tiny_inputs_yield_nothing() {
    assert_eq!(RecordStream::new(Vec::new()).count(), 0);
    assert_eq!(RecordStream::new(vec![0u8; 11]).count(), 0);
}

#[test]
fn header_only_file_yields_nothing() {
    let header = VarStruct::encode(&[
        RawField::new(0, HEADER_MAGIC.to_le_bytes()),
        RawField::new(2, 1u32.to_le_bytes()),
        RawField::new(4, 0x40u16.to_le_bytes()),
        RawField::new(5, 0u32.to_le_bytes()),
    ]);
    let (data, _) = concat_with_prefix(8, &[header]);

    for policy in [ResyncPolicy::classic(), ResyncPolicy::tolerant()] {
        let records: Vec<Record> = RecordStream::new(data.clone()).with_policy(policy).collect();
        assert!(records.is_empty(), "policy {policy:?}");
    }
}

#[test]
fn record_limit_and_start_offset() {
    let policy = ResyncPolicy::tolerant();
    let frames: Vec<Vec<u8>> = (0..3)
        .map(|i| {
            let body = standard_body(&policy, 0, 0, 0, 100, 16, 0.0);
            build_frame(&policy, i + 1, 0, &body, &[0x22; 4], None)
        })
        .collect();
    let (data, starts) = concat_with_prefix(24, &frames);

    let limited: Vec<u32> = RecordStream::new(data.clone())
        .with_record_limit(2)
        .map(|r| r.seq)
        .collect();
    assert_eq!(limited, vec![1, 2]);

    let offset: Vec<u32> = RecordStream::new(data)
        .with_start_offset(starts[1] as u64)
        .map(|r| r.seq)
        .collect();
    assert_eq!(offset, vec![2, 3]);
}

#[test]
fn progress_is_monotone_across_a_scan() {
    let policy = ResyncPolicy::tolerant();
    let frames: Vec<Vec<u8>> = (0..3)
        .map(|i| {
            let body = standard_body(&policy, 0, 0, 0, 100, 16, 0.0);
            build_frame(&policy, i + 1, 0, &body, &[0x33; 40], None)
        })
        .collect();
    let (data, _) = concat_with_prefix(200, &frames);

    let mut seen: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for _record in RecordStream::new(data)
        .with_chunk_size(16)
        .with_progress(|pct, _msg| seen.push(pct))
    {
        count += 1;
    }

    assert_eq!(count, 3);
    assert!(seen.len() >= 2);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.last().unwrap(), 100.0);
}

#[test]
fn find_struct_start_locates_header() {
    let header = VarStruct::encode(&[
        RawField::new(0, HEADER_MAGIC.to_le_bytes()),
        RawField::new(2, 9u32.to_le_bytes()),
    ]);
    let mut data = vec![0u8; 30];
    data.extend_from_slice(&header);
    data.extend_from_slice(&[0u8; 30]);

    // the magic value starts two key/count bytes into the struct
    let magic_ofs = 32;
    assert_eq!(&data[magic_ofs..magic_ofs + 4], &HEADER_MAGIC.to_le_bytes());

    for crc_mode in [CrcMode::Strict, CrcMode::Warn] {
        let (decoded, start, end) =
            find_struct_start(&data, magic_ofs, data.len(), 0, HEADER_MAGIC, crc_mode)
                .expect("header should be found");
        assert_eq!(start, 30);
        assert_eq!(end, 30 + header.len());
        assert_eq!(decoded.get(2), Some(&9u32.to_le_bytes()[..]));
    }

    // no decodable struct around a bare magic pattern
    let mut bare = vec![0u8; 80];
    bare[40..44].copy_from_slice(&HEADER_MAGIC.to_le_bytes());
    for crc_mode in [CrcMode::Strict, CrcMode::Warn] {
        assert!(find_struct_start(&bare, 40, bare.len(), 0, HEADER_MAGIC, crc_mode).is_none());
    }
}
