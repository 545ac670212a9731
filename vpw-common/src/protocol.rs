// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire vocabulary shared by the kernel and host tooling.
//!
//! Frame layout: priority, destination, source, mode, submode/command,
//! mode-specific payload, and for block transfers a big-endian 16-bit sum.

use serde::{Deserialize, Serialize};

/// Scan tool address.
pub const ADDR_TOOL: u8 = 0xF0;
/// Engine controller address.
pub const ADDR_PCM: u8 = 0x10;
/// Functional broadcast address.
pub const ADDR_BROADCAST: u8 = 0xFE;

/// Normal priority/header byte.
pub const PRIORITY_NORMAL: u8 = 0x6C;
/// Block transfer priority, required for mode 0x36.
pub const PRIORITY_BLOCK: u8 = 0x6D;
/// Tool-present priority.
pub const PRIORITY_TOOL_PRESENT: u8 = 0x8C;

/// Offset added to a request mode to form its positive response.
pub const RESPONSE_OFFSET: u8 = 0x40;
/// Negative response mode.
pub const MODE_REJECT: u8 = 0x7F;

/// Largest payload accepted by a single 0x34/0x35/0x36 exchange.
pub const MAX_TRANSFER: usize = 4096;
/// Priority, addresses, mode, command, length(2), address(3).
pub const HEADER_LEN: usize = 10;
/// First byte covered by the block checksum.
pub const CHECKSUM_START: usize = 4;
/// Header, payload, checksum and a little slack.
pub const MESSAGE_BUFFER_SIZE: usize = MAX_TRANSFER + 20;

/// 0x36 command byte: write the payload.
pub const WRITE_PROGRAM: u8 = 0x00;
/// 0x36 command byte: exercise the flash path without mutating it.
pub const WRITE_TEST: u8 = 0x44;
/// 0x36 command byte: write to RAM, then jump to the start address.
pub const WRITE_EXECUTE: u8 = 0x80;

/// Write failure: odd start address or length for a word-wide device.
pub const WRITE_ERR_MISALIGNED: u8 = 0xBB;
/// Write failure: target outside the RAM and flash windows.
pub const WRITE_ERR_RANGE: u8 = 0xEE;
/// Write failure: frame shorter than its declared length.
pub const WRITE_ERR_TRUNCATED: u8 = 0xDD;

/// Kernel type byte reported by the version query.
pub const KERNEL_TYPE_P01: u8 = 0x01;
pub const KERNEL_TYPE_P10: u8 = 0x0A;
pub const KERNEL_TYPE_P12: u8 = 0x0C;

/// Protocol mode byte (byte 3 of a frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// 0x20: leave the kernel and reset.
    ExitKernel,
    /// 0x34: request permission to upload.
    WriteRequest,
    /// 0x35: read a memory range.
    Read,
    /// 0x36: block transfer into RAM or flash.
    Write,
    /// 0x37: alternate read, not supported.
    ReadAlternate,
    /// 0x3D: kernel query with a submode.
    Query,
    /// 0x3F: tool present.
    ToolPresent,
    Other(u8),
}

impl From<u8> for Mode {
    fn from(value: u8) -> Self {
        match value {
            0x20 => Mode::ExitKernel,
            0x34 => Mode::WriteRequest,
            0x35 => Mode::Read,
            0x36 => Mode::Write,
            0x37 => Mode::ReadAlternate,
            0x3D => Mode::Query,
            0x3F => Mode::ToolPresent,
            other => Mode::Other(other),
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::ExitKernel => 0x20,
            Mode::WriteRequest => 0x34,
            Mode::Read => 0x35,
            Mode::Write => 0x36,
            Mode::ReadAlternate => 0x37,
            Mode::Query => 0x3D,
            Mode::ToolPresent => 0x3F,
            Mode::Other(other) => other,
        }
    }
}

impl Mode {
    /// Positive response mode for this request.
    pub fn response(self) -> u8 {
        u8::from(self).wrapping_add(RESPONSE_OFFSET)
    }
}

/// Submode of a 0x3D kernel query (byte 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Query {
    Version,
    FlashChipId,
    Crc,
    OperatingSystemId,
    /// Reserved; accepted without a reply.
    Reserved,
    EraseBlock,
    EraseAll,
    Diagnostics,
    Other(u8),
}

impl From<u8> for Query {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Query::Version,
            0x01 => Query::FlashChipId,
            0x02 => Query::Crc,
            0x03 => Query::OperatingSystemId,
            0x04 => Query::Reserved,
            0x05 => Query::EraseBlock,
            0x06 => Query::EraseAll,
            0xFF => Query::Diagnostics,
            other => Query::Other(other),
        }
    }
}

impl From<Query> for u8 {
    fn from(query: Query) -> Self {
        match query {
            Query::Version => 0x00,
            Query::FlashChipId => 0x01,
            Query::Crc => 0x02,
            Query::OperatingSystemId => 0x03,
            Query::Reserved => 0x04,
            Query::EraseBlock => 0x05,
            Query::EraseAll => 0x06,
            Query::Diagnostics => 0xFF,
            Query::Other(other) => other,
        }
    }
}

/// Kernel state dumped by the 0x3D 0xFF query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticSnapshot {
    pub iterations: u32,
    pub messages: u32,
    pub receive_errors: u32,
    pub last_read_state: u8,
    pub last_completion_code: u8,
    pub flash_id: u32,
    pub crc_index: u32,
    pub crc_length: u32,
}

/// Upper bound of a postcard-encoded [`DiagnosticSnapshot`] (varint worst case).
pub const DIAGNOSTIC_SNAPSHOT_MAX: usize = 5 * 6 + 2;

/// Parse a semver string like "1.2.3" into `[major, minor, patch]` at compile time.
/// Missing or non-numeric components read as zero; components saturate at 255.
pub const fn parse_version(s: &str) -> [u8; 3] {
    let bytes = s.as_bytes();
    let mut out = [0u8; 3];
    let mut part = 0;
    let mut value: u16 = 0;
    let mut i = 0;
    while i < bytes.len() && part < 3 {
        let b = bytes[i];
        if b == b'.' {
            out[part] = if value > 255 { 255 } else { value as u8 };
            part += 1;
            value = 0;
        } else if b >= b'0' && b <= b'9' {
            value = value * 10 + (b - b'0') as u16;
            if value > 255 {
                value = 256;
            }
        } else {
            break;
        }
        i += 1;
    }
    if part < 3 {
        out[part] = if value > 255 { 255 } else { value as u8 };
    }
    out
}
