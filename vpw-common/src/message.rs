// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The single message buffer shared by receive, dispatch and reply.

use crate::protocol::{Mode, MESSAGE_BUFFER_SIZE};
use heapless::Vec;

/// Bytes zeroed between watchdog services in [`MessageBuffer::wipe`].
const WIPE_STRIDE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferFull;

/// Fixed-capacity frame storage.
///
/// Holds one received frame or one reply under construction. Field readers
/// return `None` instead of panicking when a frame is shorter than the
/// field they ask for.
pub struct MessageBuffer {
    data: Vec<u8, MESSAGE_BUFFER_SIZE>,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuffer {
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub const fn capacity(&self) -> usize {
        MESSAGE_BUFFER_SIZE
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.is_full()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Forget the contents without touching memory.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn push(&mut self, byte: u8) -> Result<(), BufferFull> {
        self.data.push(byte).map_err(|_| BufferFull)
    }

    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), BufferFull> {
        self.data.extend_from_slice(bytes).map_err(|_| BufferFull)
    }

    /// Replace the contents with `header` followed by `payload`.
    pub fn compose(&mut self, header: &[u8], payload: &[u8]) -> Result<(), BufferFull> {
        self.data.clear();
        self.extend(header)?;
        self.extend(payload)
    }

    /// Zero the whole backing store, then empty the buffer.
    ///
    /// Bytes past the current length still hold older, longer frames, so
    /// the full capacity is written. `service` runs every `WIPE_STRIDE`
    /// bytes so the wipe never outlasts the watchdog window.
    pub fn wipe(&mut self, mut service: impl FnMut()) {
        self.data.clear();
        while !self.data.is_full() {
            let next = (self.data.len() + WIPE_STRIDE).min(MESSAGE_BUFFER_SIZE);
            // `next` never exceeds the capacity
            let _ = self.data.resize(next, 0);
            service();
        }
        self.data.clear();
    }

    pub fn byte(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    pub fn get(&self, range: core::ops::Range<usize>) -> Option<&[u8]> {
        self.data.get(range)
    }

    pub fn priority(&self) -> Option<u8> {
        self.byte(0)
    }

    pub fn destination(&self) -> Option<u8> {
        self.byte(1)
    }

    pub fn source(&self) -> Option<u8> {
        self.byte(2)
    }

    pub fn mode(&self) -> Option<Mode> {
        self.byte(3).map(Mode::from)
    }

    /// Submode or command byte; zero when the frame stops at the mode byte.
    pub fn submode(&self) -> u8 {
        self.byte(4).unwrap_or(0)
    }

    pub fn u16_be(&self, at: usize) -> Option<u16> {
        let b = self.get(at..at + 2)?;
        Some(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u24_be(&self, at: usize) -> Option<u32> {
        let b = self.get(at..at + 3)?;
        Some(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn u32_be(&self, at: usize) -> Option<u32> {
        let b = self.get(at..at + 4)?;
        Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
