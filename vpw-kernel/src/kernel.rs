// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The kernel context and its poll/dispatch loop.

use crate::config::KernelConfig;
use crate::crc::CrcContext;
use crate::dispatch::{self, reply};
use crate::hal::Platform;
use crate::timing::WatchdogDelay;
use crate::transport::{ReceiveError, Received, VpwTransport, READ_STATE_OK};
use vpw_common::protocol::DiagnosticSnapshot;
use vpw_common::{FlashChipId, MessageBuffer};

/// Reboot reason sent for a tool request, or'ed with the iteration count.
pub const REBOOT_REQUESTED: u32 = 0xCC00_0000;
/// Reboot reason sent when the tool went silent.
pub const REBOOT_INACTIVE: u32 = 0xFFFF_FFFF;

/// What the loop does after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    Continue,
    /// Send the reboot notice with this reason and stop servicing the watchdog.
    Reboot(u32),
}

/// Counters reported by the diagnostics query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub iterations: u32,
    pub messages: u32,
    pub receive_errors: u32,
    pub last_read_state: u8,
}

/// All mutable kernel state, owned in one place.
pub struct Kernel<H: Platform> {
    pub(crate) hw: H,
    pub(crate) config: KernelConfig,
    pub(crate) buffer: MessageBuffer,
    pub(crate) transport: VpwTransport,
    pub(crate) crc: CrcContext,
    /// Set by the flash chip query; erase and flash writes need it.
    pub(crate) flash_id: Option<FlashChipId>,
    pub(crate) stats: Stats,
    last_message: u32,
    last_keepalive: u32,
}

impl<H: Platform> Kernel<H> {
    pub const fn new(hw: H, config: KernelConfig) -> Self {
        Self {
            transport: VpwTransport::new(config.polling),
            hw,
            config,
            buffer: MessageBuffer::new(),
            crc: CrcContext::new(),
            flash_id: None,
            stats: Stats {
                iterations: 0,
                messages: 0,
                receive_errors: 0,
                last_read_state: 0,
            },
            last_message: 0,
            last_keepalive: 0,
        }
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn flash_id(&self) -> Option<FlashChipId> {
        self.flash_id
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn crc(&self) -> &CrcContext {
        &self.crc
    }

    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    pub(crate) fn delay(&mut self) -> WatchdogDelay<'_, H> {
        WatchdogDelay::new(&mut self.hw, self.config.timing)
    }

    /// Zero the message buffer with the watchdog serviced throughout.
    pub(crate) fn wipe_buffer(&mut self) {
        let hw = &mut self.hw;
        self.buffer.wipe(|| hw.scratch());
    }

    pub fn snapshot(&self) -> DiagnosticSnapshot {
        let (crc_index, crc_length) = self.crc.progress();
        DiagnosticSnapshot {
            iterations: self.stats.iterations,
            messages: self.stats.messages,
            receive_errors: self.stats.receive_errors,
            last_read_state: self.stats.last_read_state,
            last_completion_code: self.transport.completion_code(),
            flash_id: self.flash_id.map_or(0, |id| id.0),
            crc_index,
            crc_length,
        }
    }

    /// Reset the line controller and tell the tool the kernel is running.
    pub fn start(&mut self) {
        self.hw.scratch();
        self.transport.flush(&mut self.hw);
        self.wipe_buffer();
        self.hw.spin();
        self.hw.scratch();

        // The loader jumps here before acknowledging the upload.
        reply::write_success(self, 0x00);
        reply::tool_present(self, [0x01, 0x02, 0x03, 0x04]);
        self.delay().long_pause();
        info!("kernel started, type {=u8:#x}", self.config.kernel_type());
    }

    /// One receive, and one dispatch if a frame arrived.
    pub fn step(&mut self) -> Step {
        self.stats.iterations = self.stats.iterations.wrapping_add(1);
        self.hw.scratch();

        match self.transport.receive(&mut self.hw, &mut self.buffer) {
            Received::Empty => {}
            Received::Error(ReceiveError::Transmission { completion_code }) => {
                // The tool retries on its own.
                self.stats.receive_errors = self.stats.receive_errors.wrapping_add(1);
                self.stats.last_read_state = 0x02;
                debug!("bus error, completion code {=u8:#x}", completion_code);
                self.wipe_buffer();
            }
            Received::Error(e) => {
                self.stats.receive_errors = self.stats.receive_errors.wrapping_add(1);
                let state = e.read_state();
                self.stats.last_read_state = state;
                warn!("receive failed: {}", e);
                self.wipe_buffer();
                reply::tool_present(self, [0xBB, 0xBB, state, state]);
                self.last_keepalive = self.stats.iterations;
            }
            Received::Data(_) => {
                self.stats.messages = self.stats.messages.wrapping_add(1);
                self.stats.last_read_state = READ_STATE_OK;
                self.last_message = self.stats.iterations;
                self.last_keepalive = self.stats.iterations;
                let step = dispatch::dispatch(self);
                self.wipe_buffer();
                return step;
            }
        }

        // Anything but a clean frame counts as an idle iteration.
        self.idle()
    }

    fn idle(&mut self) -> Step {
        let now = self.stats.iterations;

        if self.crc.is_pending() {
            let slice = self.config.crc_slice_len;
            self.crc.process_slice(&mut self.hw, slice);
        }

        if now.wrapping_sub(self.last_keepalive) > self.config.inactivity.keepalive_polls {
            reply::tool_present(self, *b"nsfw");
            self.last_keepalive = now;
        }

        match self.config.inactivity.reboot_polls {
            Some(limit) if now.wrapping_sub(self.last_message) > limit => {
                warn!("no message for {} polls, rebooting", limit);
                Step::Reboot(REBOOT_INACTIVE)
            }
            _ => Step::Continue,
        }
    }

    /// Send the reboot notice and let the watchdog reset the controller.
    pub fn shutdown(&mut self, reason: u32) -> ! {
        info!("reboot, reason {=u32:#x}", reason);
        self.delay().long_pause();
        reply::reboot_notice(self, reason);
        self.delay().long_pause();
        self.hw.reset()
    }

    /// Announce, then serve requests until a reboot.
    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            if let Step::Reboot(reason) = self.step() {
                self.shutdown(reason);
            }
        }
    }
}
