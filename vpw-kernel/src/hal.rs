// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The hardware the kernel touches, reduced to the operations it uses.
//!
//! The controller build implements these over memory-mapped registers
//! (`mmio`, feature `target`); tests implement them over a simulated
//! controller.

/// Watchdog service.
pub trait Watchdog {
    /// Issue the toggle sequence that restarts the watchdog timer.
    fn scratch(&mut self);
}

/// Line controller (DLC) registers.
pub trait DataLink {
    /// Raw status register. Bits 7..5 report the receive FIFO state,
    /// bits 1..0 the transmit FIFO fill level.
    fn status(&mut self) -> u8;
    fn read_fifo(&mut self) -> u8;
    fn write_fifo(&mut self, byte: u8);
    fn write_command(&mut self, command: u8);
}

/// Byte and word access to the controller's address space.
pub trait Memory {
    fn read_u8(&mut self, address: u32) -> u8;
    fn write_u8(&mut self, address: u32, value: u8);
    fn read_u16(&mut self, address: u32) -> u16;
    fn write_u16(&mut self, address: u32, value: u16);
}

/// Chip-select base/option registers of the system integration module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipSelect {
    BootBase,
    BootOption,
    Base0,
    Option0,
}

/// Flash write enable: chip-select timing plus the Vpp line.
pub trait FlashControl {
    fn write_chip_select(&mut self, register: ChipSelect, value: u16);
    fn read_hardware_io(&mut self) -> u16;
    fn write_hardware_io(&mut self, value: u16);
}

/// Everything the kernel needs from the controller.
pub trait Platform: Watchdog + DataLink + Memory + FlashControl {
    /// Burn a few cycles. Used for settle times and delays.
    fn spin(&mut self);

    /// Transfer control to code at `entry`.
    ///
    /// # Safety
    ///
    /// `entry` must be the start of valid machine code for this controller
    /// that was just written to RAM. The callee may never return, and if it
    /// does it must preserve the calling convention and leave the kernel's
    /// statics intact.
    unsafe fn execute(&mut self, entry: u32);

    /// Stop servicing the watchdog until it resets the controller.
    fn reset(&mut self) -> !;
}
