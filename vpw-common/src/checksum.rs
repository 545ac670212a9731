// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! 16-bit additive block checksum.
//!
//! The sum covers every byte from the command byte (offset 4) through the
//! end of the payload, modulo 65536, and travels big-endian after the data.

use crate::protocol::{CHECKSUM_START, HEADER_LEN};

/// Add `bytes` to a running sum.
pub fn accumulate(sum: u16, bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(sum, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Sum of `bytes` starting from zero.
pub fn block_sum(bytes: &[u8]) -> u16 {
    accumulate(0, bytes)
}

/// Seed a running sum from the checksummed part of a 10-byte block header.
///
/// Shorter headers are summed as far as they go.
pub fn start_checksum(header: &[u8]) -> u16 {
    let end = header.len().min(HEADER_LEN);
    if end <= CHECKSUM_START {
        return 0;
    }
    block_sum(&header[CHECKSUM_START..end])
}

/// Checksum over a complete block frame of `HEADER_LEN + payload_len` bytes.
pub fn frame_checksum(frame: &[u8], payload_len: usize) -> Option<u16> {
    let end = HEADER_LEN.checked_add(payload_len)?;
    frame.get(CHECKSUM_START..end).map(block_sum)
}

/// Compare the computed sum of a block frame with its trailing big-endian sum.
///
/// Returns `(computed, expected)` on mismatch, `None` if the frame is too short.
pub fn verify_block(frame: &[u8], payload_len: usize) -> Option<Result<u16, (u16, u16)>> {
    let computed = frame_checksum(frame, payload_len)?;
    let at = HEADER_LEN + payload_len;
    let expected = u16::from_be_bytes([*frame.get(at)?, *frame.get(at + 1)?]);
    if computed == expected {
        Some(Ok(computed))
    } else {
        Some(Err((computed, expected)))
    }
}
