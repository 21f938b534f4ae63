#[derive(thiserror::Error, Debug)]
pub enum VarintError {
    #[error("Varint continuation past 35 bits")]
    Overflow,

    #[error("Truncated varint at offset {0:#X}")]
    Truncated(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum VarStructError {
    #[error("Unreasonable field count: {0}")]
    FieldCountUnreasonable(u64),

    #[error("Field {tag} declares {len} value bytes with only {avail} available")]
    ValueExceedsBounds { tag: u32, len: u64, avail: u64 },

    #[error("Truncated before CRC trailer at offset {0:#X}")]
    TruncatedBeforeCrc(usize),

    #[error("CRC mismatch: calculated {calculated:#010X}, read {read:#010X}")]
    CrcMismatch { calculated: u32, read: u32 },

    #[error(transparent)]
    Varint(#[from] VarintError),
}

/// Conditions the record-stream decoder recovers from in place.
///
/// These never leave the iterator; they exist so skip decisions can be
/// logged with a uniform shape.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("No header magic remains in the scanned span")]
    MagicNotFound,

    #[error("No header VarStruct decodes around magic at {0:#X}")]
    HeaderDecodeFailed(usize),

    #[error("Body VarStruct decode failed at {0:#X}")]
    BodyDecodeFailed(usize),

    #[error("Trailer mismatch at {0:#X}")]
    TrailerMismatch(usize),

    #[error("Scan stalled on magic at {0:#X}")]
    StalledScan(usize),
}
