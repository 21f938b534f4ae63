//! Research implementation of the Garmin RSD record-stream format.
//!
//! ## Technical Overview
//!
//! RSD recorders write an undocumented, self-describing tag-length-value
//! encoding ("VarStruct") wrapped in magic-delimited frames and protected
//! by a non-standard CRC-32 variant. Real capture files are routinely
//! corrupted, truncated or misaligned, so decoding is as much about
//! resynchronization as about parsing.
//!
//! ### Frame Organization
//!
//! **Header**: a VarStruct echoing the header magic and carrying the
//! sequence counter, timestamp and declared data size.
//! **Body**: a second VarStruct with channel, position, depth, sample
//! count and beam fields, followed by the opaque acoustic payload.
//! **Trailer**: `(magic, chunk_size, crc)` giving the O(1) hop to the
//! next frame.
//!
//! ### Recovery Policies
//!
//! One decoder handles both recorder generations, parameterized by
//! [`ResyncPolicy`](process::ResyncPolicy): `classic()` validates CRCs
//! strictly and drops suspect frames; `tolerant()` salvages what it can,
//! substituting defaults and re-scanning across bad trailers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rsd::process::ResyncPolicy;
//! use rsd::process::decode::RecordStream;
//!
//! let stream = RecordStream::open("capture.rsd")?
//!     .with_policy(ResyncPolicy::tolerant())
//!     .with_progress(|percent, message| eprintln!("{percent:5.1}% {message}"));
//!
//! for record in stream {
//!     if record.has_position {
//!         println!("{:.6},{:.6} depth {:.2} m", record.lat, record.lon, record.depth_m);
//!     }
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Decode failures never escape the iterator: the stream skips and
//! resynchronizes, yielding only structurally complete records.

/// Record stream decoding.
///
/// 1. **Magic scanning** ([`process::scan`]): chunked search for frame
///    boundary candidates with progress reporting.
/// 2. **Record decoding** ([`process::decode`]): the policy-parameterized
///    state machine yielding [`Record`](structs::record::Record)s.
pub mod process;

/// Data structures representing format components.
///
/// - **VarStruct** ([`structs::varstruct`]): the tag-length-value codec
/// - **Record** ([`structs::record`]): the decoded value object
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Varint I/O** ([`utils::varint`]): LEB128-style integer codecs
/// - **CRC Validation** ([`utils::crc`]): the recorder's CRC-32 variant
/// - **Unit Transforms** ([`utils::units`]): map units and millimeters
/// - **Error Handling** ([`utils::errors`]): error types
pub mod utils;
