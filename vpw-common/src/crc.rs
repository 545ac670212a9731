// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! 32-bit CRC used to verify memory ranges.
//!
//! Generator 0x04C11DB7, zero initial value, no reflection, no final xor.
//! The table is built once at compile time by the `crc` crate from the same
//! bit-at-a-time division a hand-written table would use.

use crc::{Algorithm, Crc};

pub const CRC_32_KERNEL: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x04C1_1DB7,
    init: 0x0000_0000,
    refin: false,
    refout: false,
    xorout: 0x0000_0000,
    check: 0x89A1_897F,
    residue: 0x0000_0000,
};

pub static KERNEL_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_KERNEL);

/// One-shot CRC of `data`. Only for ranges short enough to finish inside the
/// watchdog window; long ranges go through the resumable context.
pub fn crc_fast(data: &[u8]) -> u32 {
    KERNEL_CRC.checksum(data)
}

/// Continue a CRC from a previous remainder.
pub fn crc_update(remainder: u32, data: &[u8]) -> u32 {
    let mut digest = KERNEL_CRC.digest_with_initial(remainder);
    digest.update(data);
    digest.finalize()
}
