// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Resumable CRC over a memory range.
//!
//! A scan of a whole flash chip takes longer than the watchdog window and
//! longer than the tool is willing to wait for a reply, so the range is
//! folded in slices across several dispatcher ticks.

use crate::hal::{Memory, Watchdog};
use crc::Digest;
use vpw_common::crc::KERNEL_CRC;

/// Bytes read per watchdog service inside a slice.
const CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcContext {
    start: u32,
    length: u32,
    index: u32,
    remainder: u32,
    started: bool,
}

impl Default for CrcContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CrcContext {
    pub const fn new() -> Self {
        Self {
            start: 0,
            length: 0,
            index: 0,
            remainder: 0,
            started: false,
        }
    }

    /// Begin a new scan of `[start, start + length)`, dropping any other.
    pub fn start(&mut self, start: u32, length: u32) {
        self.start = start;
        self.length = length;
        self.index = 0;
        self.remainder = 0;
        self.started = true;
    }

    /// Forget the current scan, e.g. after flash contents changed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True when a scan of exactly this range is in progress or complete.
    pub fn is_started(&self, start: u32, length: u32) -> bool {
        self.started && self.start == start && self.length == length
    }

    pub fn is_done(&self, start: u32, length: u32) -> bool {
        self.is_started(start, length) && self.index == self.length
    }

    /// A scan is started and has bytes left.
    pub fn is_pending(&self) -> bool {
        self.started && self.index < self.length
    }

    /// `(index, length)` of the current scan.
    pub fn progress(&self) -> (u32, u32) {
        (self.index, self.length)
    }

    /// Final CRC of this range if its scan is complete.
    pub fn result(&self, start: u32, length: u32) -> Option<u32> {
        if self.is_done(start, length) {
            Some(self.remainder)
        } else {
            None
        }
    }

    /// Fold up to `slice_len` more bytes into the running remainder.
    /// Returns true once the whole range has been read.
    pub fn process_slice<H: Memory + Watchdog>(&mut self, hw: &mut H, slice_len: u32) -> bool {
        if !self.started {
            return false;
        }

        let end = self
            .index
            .saturating_add(slice_len.max(1))
            .min(self.length);
        let mut digest: Digest<'static, u32> = KERNEL_CRC.digest_with_initial(self.remainder);
        let mut chunk = [0u8; CHUNK];

        while self.index < end {
            let take = ((end - self.index) as usize).min(CHUNK);
            let base = self.start.wrapping_add(self.index);
            for (offset, slot) in chunk[..take].iter_mut().enumerate() {
                *slot = hw.read_u8(base.wrapping_add(offset as u32));
            }
            digest.update(&chunk[..take]);
            self.index += take as u32;
            hw.scratch();
        }

        self.remainder = digest.finalize();
        if self.index == self.length {
            debug!(
                "crc done: {=u32:#x}+{=u32:#x} = {=u32:#x}",
                self.start,
                self.length,
                self.remainder
            );
            true
        } else {
            false
        }
    }
}
