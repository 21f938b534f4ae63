//! CRC validation utilities for record streams.
//!
//! Implements the CRC-32 variant RSD recorders write after every VarStruct:
//! polynomial `0x04C11DB7` over an all-zero seed, bytes processed MSB-first,
//! and the final register bit-reversed and inverted.
//!
//! Note: this is not standard CRC-32/ISO-HDLC; the seed and the output
//! transform must match the recorder exactly to validate captured files.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm {
    poly: u32,
    init: u32,
}

/// CRC-32 algorithm used for VarStruct trailer validation.
pub const CRC_VARSTRUCT_ALG: Algorithm = Algorithm {
    poly: 0x04C1_1DB7,
    init: 0x0000_0000,
};

/// Computes CRC-32 checksum using specified polynomial.
#[inline(always)]
pub const fn crc32(poly: u32, mut value: u32, len: usize) -> u32 {
    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 31) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc32_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc32(poly, (i as u32) << 24, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc32 {
    pub poly: u32,
    pub init: u32,
    table: [u32; 256],
}

impl Crc32 {
    pub const fn new(algorithm: &Algorithm) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc32_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u32) -> u32 {
        self.table[(index & 0xFF) as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u32, bytes: &[u8]) -> u32 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table_entry((crc >> 24) ^ bytes[i] as u32) ^ (crc << 8);
            i += 1;
        }

        crc
    }

    /// Applies the recorder's output transform: bit reversal then inversion.
    #[inline(always)]
    pub const fn finalize(&self, crc: u32) -> u32 {
        crc.reverse_bits() ^ 0xFFFF_FFFF
    }

    #[inline(always)]
    pub const fn checksum(&self, bytes: &[u8]) -> u32 {
        self.finalize(self.update(self.init, bytes))
    }
}

/// Table computed once at compile time; shared by every decode.
pub static VARSTRUCT_CRC: Crc32 = Crc32::new(&CRC_VARSTRUCT_ALG);

/// Checksum over a VarStruct span as the recorder writes it.
#[inline(always)]
pub fn crc32_custom(bytes: &[u8]) -> u32 {
    VARSTRUCT_CRC.checksum(bytes)
}

#[test]
fn conformance_vectors() {
    // Known outputs of the recorder's CRC variant, fixed by the reference
    // bitwise definition. A zero seed makes leading zero bytes invisible.
    assert_eq!(crc32_custom(b""), 0xFFFF_FFFF);
    assert_eq!(crc32_custom(b"\x00"), 0xFFFF_FFFF);
    assert_eq!(crc32_custom(b"123456789"), 0x016E_7A6E);
    assert_eq!(crc32_custom(b"RSD"), 0x6687_89C9);

    let ramp: Vec<u8> = (0u8..16).collect();
    assert_eq!(crc32_custom(&ramp), 0x5E44_15C0);
}

#[test]
fn table_matches_bitwise_kernel() {
    // The table-driven update must agree with the plain shift-and-xor form.
    let bitwise = |data: &[u8]| {
        let mut crc = 0u32;
        for &b in data {
            crc ^= (b as u32) << 24;
            crc = crc32(CRC_VARSTRUCT_ALG.poly, crc, 8);
        }
        VARSTRUCT_CRC.finalize(crc)
    };

    for data in [&b"\xB7\xE9\xDA\x86"[..], b"abcdefgh", b"\xFF\xFF\xFF\xFF"] {
        assert_eq!(crc32_custom(data), bitwise(data));
    }
}

#[test]
fn determinism() {
    let data = b"the same bytes every time";
    assert_eq!(crc32_custom(data), crc32_custom(data));
}
