// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! VPW framing over the line controller's status and FIFO registers.
//!
//! Outgoing frames are written byte by byte with the first byte tagged by
//! the frame-open command and the last byte by the frame-close command.
//! Incoming frames are collected until the controller posts a completion
//! code behind the data.

use crate::config::PollPolicy;
use crate::hal::Platform;
use vpw_common::checksum::accumulate;
use vpw_common::protocol::CHECKSUM_START;
use vpw_common::{MessageBuffer, Segment};

/// Load the next FIFO byte as the first byte of a frame.
pub const CMD_FIRST_BYTE: u8 = 0x14;
/// Load the next FIFO byte as the last byte of a frame.
pub const CMD_LAST_BYTE: u8 = 0x0C;
/// Flush; followed by a zero written to the FIFO.
pub const CMD_FLUSH: u8 = 0x03;
/// Acknowledge a completion code read from the receive FIFO.
pub const CMD_ACK_COMPLETION: u8 = 0x02;

/// Completion code bits that flag a bus error on the received frame.
pub const COMPLETION_ERROR_MASK: u8 = 0x30;

/// Bytes written between watchdog services when the FIFO never fills.
const SERVICE_STRIDE: usize = 64;

/// Receive FIFO state, status bits 7..5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxStatus {
    Empty,
    Data,
    Overflow,
    Completion,
}

impl RxStatus {
    fn decode(status: u8) -> Self {
        match status >> 5 {
            0 => RxStatus::Empty,
            1 | 2 | 4 => RxStatus::Data,
            3 => RxStatus::Overflow,
            _ => RxStatus::Completion,
        }
    }
}

/// Transmit FIFO almost full (2) or full (3).
fn tx_busy(status: u8) -> bool {
    status & 0x03 >= 0x02
}

fn tx_pending(status: u8) -> bool {
    status & 0x03 != 0
}

/// Why a receive produced no usable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveError {
    /// Frame closed with error bits set in its completion code.
    Transmission { completion_code: u8 },
    /// The controller's receive FIFO overran.
    Overflow,
    /// The frame did not fit the message buffer.
    LengthExceeded { length: usize },
    /// Bytes arrived but no completion code followed before the poll cap.
    Incomplete { length: usize },
}

impl ReceiveError {
    /// Diagnostic byte reported to the tool for a failed receive.
    pub fn read_state(&self) -> u8 {
        match self {
            ReceiveError::Transmission { .. } => 0x02,
            ReceiveError::Overflow => 0x0B,
            ReceiveError::LengthExceeded { .. } => 0xEE,
            ReceiveError::Incomplete { .. } => 0x0A,
        }
    }
}

/// Outcome of one receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Received {
    /// Nothing arrived before the poll cap; not an error.
    Empty,
    Error(ReceiveError),
    /// A clean frame of this many bytes is in the buffer.
    Data(usize),
}

/// Read state of a clean frame.
pub const READ_STATE_OK: u8 = 0x01;

pub struct VpwTransport {
    policy: PollPolicy,
    completion_code: u8,
    tx_stalls: u32,
    /// Last byte of an unfinished message, written by the next `send`.
    held: Option<u8>,
    /// Addressing bytes of the current message not yet seen by `send`.
    unsummed: usize,
}

impl VpwTransport {
    pub const fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            completion_code: 0xFF,
            tx_stalls: 0,
            held: None,
            unsummed: 0,
        }
    }

    /// Completion code from the most recent receive, including ones latched
    /// while no data was pending.
    pub fn completion_code(&self) -> u8 {
        self.completion_code
    }

    /// Bytes written after the FIFO stayed full for the whole retry budget.
    pub fn tx_stalls(&self) -> u32 {
        self.tx_stalls
    }

    /// Reset the transmit side: flush command, then a zero byte.
    pub fn flush<H: Platform>(&mut self, hw: &mut H) {
        hw.write_command(CMD_FLUSH);
        hw.write_fifo(0x00);
    }

    fn write_byte<H: Platform>(&mut self, hw: &mut H, byte: u8) {
        let mut retries = 0;
        while tx_busy(hw.status()) {
            if retries == self.policy.tx_fifo_retries {
                self.tx_stalls = self.tx_stalls.wrapping_add(1);
                trace!("tx fifo stalled, writing anyway");
                break;
            }
            retries += 1;
            for _ in 0..self.policy.tx_retry_spins {
                hw.spin();
            }
            hw.scratch();
        }
        hw.write_fifo(byte);
    }

    /// Send one segment of a logical message and return the updated block
    /// checksum.
    ///
    /// `checksum` carries the running sum between calls of the same message;
    /// pass zero with the `START` segment. The four addressing bytes at the
    /// head of the message are not summed. With `END | ADD_CHECKSUM` the sum is
    /// sent big-endian behind `data` and its low byte closes the frame.
    ///
    /// The last byte of a segment that does not end the message is held back
    /// until the next call, so any split of a message puts the same bytes on
    /// the wire as a single `COMPLETE` call.
    pub fn send<H: Platform>(
        &mut self,
        hw: &mut H,
        data: &[u8],
        segment: Segment,
        mut checksum: u16,
    ) -> u16 {
        hw.scratch();

        if segment.is_start() {
            if self.held.take().is_some() {
                warn!("previous message never closed");
            }
            hw.write_command(CMD_FIRST_BYTE);
            self.unsummed = CHECKSUM_START;
        }
        let skip = self.unsummed.min(data.len());
        self.unsummed -= skip;
        checksum = accumulate(checksum, &data[skip..]);

        let held = self.held.take();

        if !segment.is_end() {
            self.held = match data.split_last() {
                Some((&last, body)) => {
                    if let Some(held) = held {
                        self.write_byte(hw, held);
                    }
                    self.write_all(hw, body);
                    Some(last)
                }
                None => held,
            };
            return checksum;
        }

        let last = if segment.adds_checksum() {
            if let Some(held) = held {
                self.write_byte(hw, held);
            }
            self.write_all(hw, data);
            let [hi, lo] = checksum.to_be_bytes();
            self.write_byte(hw, hi);
            lo
        } else if let Some((&last, body)) = data.split_last() {
            if let Some(held) = held {
                self.write_byte(hw, held);
            }
            self.write_all(hw, body);
            last
        } else if let Some(held) = held {
            held
        } else {
            warn!("frame close with no byte to close it");
            0x00
        };

        hw.write_command(CMD_LAST_BYTE);
        hw.write_fifo(last);
        hw.spin();
        self.flush(hw);
        self.drain(hw);

        checksum
    }

    fn write_all<H: Platform>(&mut self, hw: &mut H, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            if i % SERVICE_STRIDE == 0 {
                hw.scratch();
            }
            self.write_byte(hw, b);
        }
    }

    /// Wait for the transmit FIFO to empty after a frame close.
    fn drain<H: Platform>(&mut self, hw: &mut H) {
        let mut polls = 0;
        while tx_pending(hw.status()) && polls < self.policy.tx_drain_polls {
            polls += 1;
            for _ in 0..self.policy.tx_drain_spins {
                hw.scratch();
                hw.spin();
            }
            hw.scratch();
        }
        if polls == self.policy.tx_drain_polls {
            debug!("tx drain gave up after {} polls", polls);
        }
    }

    /// Send a whole frame in one call.
    pub fn send_frame<H: Platform>(&mut self, hw: &mut H, frame: &[u8]) {
        self.send(hw, frame, Segment::COMPLETE, 0);
    }

    /// Poll for one incoming frame and collect it into `buffer`.
    ///
    /// The buffer is cleared first. A completion code that arrives with no
    /// data in front of it is latched and polling continues.
    pub fn receive<H: Platform>(&mut self, hw: &mut H, buffer: &mut MessageBuffer) -> Received {
        hw.scratch();
        buffer.clear();

        let mut idle = 0u32;
        loop {
            hw.scratch();
            if idle >= self.policy.rx_idle_polls {
                break;
            }
            idle += 1;

            match RxStatus::decode(hw.status()) {
                RxStatus::Empty => {}
                RxStatus::Data => {
                    if let Err(e) = self.collect(hw, buffer) {
                        return Received::Error(e);
                    }
                    idle = 0;
                }
                RxStatus::Completion => {
                    self.completion_code = hw.read_fifo();
                    hw.write_command(CMD_ACK_COMPLETION);

                    if buffer.is_empty() {
                        continue;
                    }
                    if self.completion_code & COMPLETION_ERROR_MASK != 0 {
                        return Received::Error(ReceiveError::Transmission {
                            completion_code: self.completion_code,
                        });
                    }
                    return Received::Data(buffer.len());
                }
                RxStatus::Overflow => {
                    self.discard(hw, |s| RxStatus::decode(s) == RxStatus::Overflow);
                    return Received::Error(ReceiveError::Overflow);
                }
            }
        }

        if buffer.is_empty() {
            Received::Empty
        } else {
            Received::Error(ReceiveError::Incomplete {
                length: buffer.len(),
            })
        }
    }

    /// Move bytes from the receive FIFO while it reports data.
    fn collect<H: Platform>(
        &mut self,
        hw: &mut H,
        buffer: &mut MessageBuffer,
    ) -> Result<(), ReceiveError> {
        loop {
            if buffer.push(hw.read_fifo()).is_err() {
                let length = buffer.len();
                self.discard(hw, |s| RxStatus::decode(s) == RxStatus::Data);
                return Err(ReceiveError::LengthExceeded { length });
            }
            if buffer.len() % SERVICE_STRIDE == 0 {
                hw.scratch();
            }
            if RxStatus::decode(hw.status()) != RxStatus::Data {
                return Ok(());
            }
        }
    }

    /// Read and drop receive FIFO bytes while `pending` holds for the status.
    /// Bounded by the idle poll cap.
    fn discard<H: Platform>(&mut self, hw: &mut H, pending: impl Fn(u8) -> bool) {
        let mut polls = 0;
        while pending(hw.status()) && polls < self.policy.rx_idle_polls {
            let _ = hw.read_fifo();
            polls += 1;
            if polls % SERVICE_STRIDE as u32 == 0 {
                hw.scratch();
            }
        }
    }
}
