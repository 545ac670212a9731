// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Compile-time kernel configuration.
//!
//! Every bounded loop in the kernel takes its cap from [`PollPolicy`]; no
//! iteration limit is written at a call site.

use vpw_common::protocol::{KERNEL_TYPE_P01, KERNEL_TYPE_P10, KERNEL_TYPE_P12, MAX_TRANSFER};

/// Engine controller generation the kernel is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    P01,
    P10,
    P12,
}

impl Variant {
    /// Variant selected by the `p10`/`p12` cargo features.
    pub const fn selected() -> Self {
        if cfg!(feature = "p12") {
            Variant::P12
        } else if cfg!(feature = "p10") {
            Variant::P10
        } else {
            Variant::P01
        }
    }

    pub const fn kernel_type(self) -> u8 {
        match self {
            Variant::P01 => KERNEL_TYPE_P01,
            Variant::P10 => KERNEL_TYPE_P10,
            Variant::P12 => KERNEL_TYPE_P12,
        }
    }

    /// Where the installed operating system keeps its 32-bit id.
    pub const fn os_id_address(self) -> u32 {
        match self {
            Variant::P01 => 0x0000_0504,
            Variant::P10 => 0x0000_052E,
            Variant::P12 => 0x0000_8004,
        }
    }
}

/// Inclusive address window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressWindow {
    pub first: u32,
    pub last: u32,
}

impl AddressWindow {
    pub const fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub const fn contains(&self, address: u32) -> bool {
        address >= self.first && address <= self.last
    }

    /// True when every byte of `[start, start + len)` lies inside the window.
    /// An empty range only needs its start inside.
    pub const fn contains_range(&self, start: u32, len: u32) -> bool {
        if !self.contains(start) {
            return false;
        }
        if len == 0 {
            return true;
        }
        match start.checked_add(len - 1) {
            Some(end) => end <= self.last,
            None => false,
        }
    }

    /// True when any byte of `[start, start + len)` lies inside the window.
    pub const fn overlaps(&self, start: u32, len: u32) -> bool {
        if len == 0 {
            return false;
        }
        let end = start.saturating_add(len - 1);
        start <= self.last && end >= self.first
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap {
    /// RAM that 0x36 may write and execute from.
    pub ram: AddressWindow,
    /// Flash that 0x36 may program and 0x3D 0x05 may erase.
    pub flash: AddressWindow,
    /// Peripheral registers, DLC FIFOs included. Reads refuse to touch them.
    pub registers: AddressWindow,
    pub os_id: u32,
}

/// Iteration caps for every busy-wait in the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Status polls before a receive gives up with no terminal status.
    pub rx_idle_polls: u32,
    /// Waits for room in the transmit FIFO before writing anyway.
    pub tx_fifo_retries: u32,
    /// Spins between transmit FIFO retries.
    pub tx_retry_spins: u32,
    /// Polls for the transmit FIFO to drain after a frame close.
    pub tx_drain_polls: u32,
    /// Spins between drain polls.
    pub tx_drain_spins: u32,
    /// Status polls per programmed word.
    pub flash_program_polls: u32,
    /// Status polls per erased block.
    pub flash_erase_polls: u32,
}

impl PollPolicy {
    pub const fn new() -> Self {
        Self {
            rx_idle_polls: 0x30000,
            tx_fifo_retries: 250,
            tx_retry_spins: 50,
            tx_drain_polls: 500,
            tx_drain_spins: 100,
            flash_program_polls: 0x1000,
            flash_erase_polls: 0x64_0000,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Approximate duration of one `Platform::spin`.
    pub spin_ns: u32,
    /// Spins allowed between two watchdog services inside a delay.
    pub spins_per_service: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inactivity {
    /// Idle receives between two keepalive tool-present frames.
    pub keepalive_polls: u32,
    /// Idle receives before the kernel reboots itself. `None` runs forever.
    pub reboot_polls: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub variant: Variant,
    pub memory: MemoryMap,
    pub polling: PollPolicy,
    pub timing: Timing,
    pub inactivity: Inactivity,
    /// Bytes folded into the running CRC per slice.
    pub crc_slice_len: u32,
    /// Largest 0x34/0x35/0x36 transfer.
    pub max_transfer: u32,
}

impl KernelConfig {
    pub const fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            memory: MemoryMap {
                ram: AddressWindow::new(0x00FF_8000, 0x00FF_CDFF),
                flash: AddressWindow::new(0x0000_8000, 0x000F_FFFF),
                registers: AddressWindow::new(0x00FF_F000, 0x00FF_FFFF),
                os_id: variant.os_id_address(),
            },
            polling: PollPolicy::new(),
            timing: Timing {
                // 68332 at 16.7 MHz, a few cycles per spin
                spin_ns: 250,
                spins_per_service: 64,
            },
            inactivity: Inactivity {
                keepalive_polls: 2500,
                reboot_polls: None,
            },
            crc_slice_len: 8192,
            max_transfer: MAX_TRANSFER as u32,
        }
    }

    pub const fn selected() -> Self {
        Self::for_variant(Variant::selected())
    }

    pub const fn kernel_type(&self) -> u8 {
        self.variant.kernel_type()
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::selected()
    }
}
