// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash erase and program for the two command sets found in these
//! controllers.
//!
//! The sequence for every mutating operation is:
//!   1. raise Vpp and open chip select 0 for writes ([`Unlocked`])
//!   2. run the family's erase or program algorithm
//!   3. return the chip to read-array mode
//!   4. drop Vpp and restore normal chip-select timing
//!
//! Steps 3 and 4 run on every exit path. Step 4 lives in the guard's
//! `Drop`, so an early return cannot leave the chip unlocked.

pub mod amd;
pub mod intel;

use crate::config::{PollPolicy, Timing};
use crate::hal::{ChipSelect, Platform};
use crate::timing::WatchdogDelay;
use core::ops::{Deref, DerefMut};
use vpw_common::{FlashChipId, FlashFamily};

pub use amd::Amd;
pub use intel::Intel;

/// Chip-select base value for the flash, boot and array alike.
pub const CS_BASE_FLASH: u16 = 0x0006;
/// Boot chip-select option for normal operation.
pub const CS_BOOT_OPTION: u16 = 0x6820;
/// Chip-select 0 option with write strobes enabled.
pub const CS0_OPTION_WRITE: u16 = 0x7060;
/// Chip-select 0 option for normal read-only operation.
pub const CS0_OPTION_READ: u16 = 0x1060;
/// Hardware I/O bit driving the flash Vpp supply.
pub const HWIO_VPP_ENABLE: u16 = 0x0001;

/// Error code reported when a poll runs out without a status to report.
pub const TIMEOUT_CODE: u8 = 0xAA;
/// Error code reported for a chip no algorithm handles.
pub const UNKNOWN_CHIP_CODE: u8 = 0xEE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// The chip reported a failure in its status register.
    Status(u8),
    /// The chip never signalled completion; `status` is the last reading.
    Timeout { status: u8 },
    UnknownChip(FlashChipId),
}

impl FlashError {
    /// Byte sent to the tool. Always nonzero.
    pub fn code(&self) -> u8 {
        match *self {
            FlashError::Status(0) => TIMEOUT_CODE,
            FlashError::Status(status) => status,
            FlashError::Timeout { status: 0 } => TIMEOUT_CODE,
            FlashError::Timeout { status } => status,
            FlashError::UnknownChip(_) => UNKNOWN_CHIP_CODE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteMode {
    Program,
    /// Walk the program loop with synthetic status; the chip is not touched.
    Test,
}

/// Flash write-enabled for the lifetime of the guard.
pub struct Unlocked<'a, H: Platform> {
    hw: &'a mut H,
    timing: Timing,
}

impl<'a, H: Platform> Unlocked<'a, H> {
    pub fn new(hw: &'a mut H, timing: Timing) -> Self {
        set_write_enable(hw, true);
        WatchdogDelay::new(hw, timing).lock_settle();
        trace!("flash unlocked");
        Self { hw, timing }
    }
}

impl<H: Platform> Deref for Unlocked<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.hw
    }
}

impl<H: Platform> DerefMut for Unlocked<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.hw
    }
}

impl<H: Platform> Drop for Unlocked<'_, H> {
    fn drop(&mut self) {
        set_write_enable(self.hw, false);
        WatchdogDelay::new(self.hw, self.timing).lock_settle();
        trace!("flash locked");
    }
}

fn set_write_enable<H: Platform>(hw: &mut H, enable: bool) {
    hw.write_chip_select(ChipSelect::BootBase, CS_BASE_FLASH);
    hw.write_chip_select(ChipSelect::BootOption, CS_BOOT_OPTION);
    hw.write_chip_select(ChipSelect::Base0, CS_BASE_FLASH);
    hw.write_chip_select(
        ChipSelect::Option0,
        if enable { CS0_OPTION_WRITE } else { CS0_OPTION_READ },
    );

    let flags = hw.read_hardware_io();
    hw.spin();
    let flags = if enable {
        flags | HWIO_VPP_ENABLE
    } else {
        flags & !HWIO_VPP_ENABLE
    };
    hw.spin();
    hw.write_hardware_io(flags);
}

/// Open chip select 0 for the id and command cycles of an id query.
pub(crate) fn begin_id_query<H: Platform>(hw: &mut H) {
    hw.write_chip_select(ChipSelect::Base0, CS_BASE_FLASH);
    hw.write_chip_select(ChipSelect::BootOption, CS_BOOT_OPTION);
    hw.write_chip_select(ChipSelect::Option0, CS0_OPTION_WRITE);
}

pub(crate) fn end_id_query<H: Platform>(hw: &mut H) {
    hw.write_chip_select(ChipSelect::Option0, CS0_OPTION_READ);
}

/// One command set.
///
/// `erase_block` and `program_word` run with the flash unlocked and may
/// leave the chip in status mode; callers restore it with `read_array`.
pub trait FlashAlgorithm {
    const FAMILY: FlashFamily;

    fn read_id<H: Platform>(hw: &mut H) -> FlashChipId;

    fn erase_block<H: Platform>(hw: &mut H, address: u32, polls: u32) -> Result<(), FlashError>;

    fn program_word<H: Platform>(
        hw: &mut H,
        address: u32,
        value: u16,
        polls: u32,
        mode: WriteMode,
    ) -> Result<(), FlashError>;

    fn read_array<H: Platform>(hw: &mut H, address: u32);
}

/// Ask the chip who it is, Intel sequence first.
pub fn identify<H: Platform>(hw: &mut H) -> FlashChipId {
    let id = Intel::read_id(hw);
    if id.manufacturer() == vpw_common::chip::MANUFACTURER_INTEL {
        return id;
    }
    Amd::read_id(hw)
}

/// Erase the block containing `address`.
pub fn erase_block<H: Platform>(
    hw: &mut H,
    chip: FlashChipId,
    address: u32,
    policy: &PollPolicy,
    timing: Timing,
) -> Result<(), FlashError> {
    match chip.family() {
        Some(FlashFamily::Intel) => erase_with::<Intel, H>(hw, address, policy, timing),
        Some(FlashFamily::Amd) => erase_with::<Amd, H>(hw, address, policy, timing),
        None => Err(FlashError::UnknownChip(chip)),
    }
}

fn erase_with<A: FlashAlgorithm, H: Platform>(
    hw: &mut H,
    address: u32,
    policy: &PollPolicy,
    timing: Timing,
) -> Result<(), FlashError> {
    let mut flash = Unlocked::new(hw, timing);
    let result = A::erase_block(&mut *flash, address, policy.flash_erase_polls);
    A::read_array(&mut *flash, address);
    if let Err(e) = result {
        warn!("{} erase at {=u32:#x} failed: {}", A::FAMILY, address, e);
    }
    result
}

/// Program `data` at `address`, big-endian, one 16-bit word at a time.
///
/// Stops at the first word that fails; words already written stay written.
/// A trailing odd byte is not written.
pub fn program<H: Platform>(
    hw: &mut H,
    chip: FlashChipId,
    address: u32,
    data: &[u8],
    mode: WriteMode,
    policy: &PollPolicy,
    timing: Timing,
) -> Result<(), FlashError> {
    match chip.family() {
        Some(FlashFamily::Intel) => {
            program_with::<Intel, H>(hw, address, data, mode, policy, timing)
        }
        Some(FlashFamily::Amd) => program_with::<Amd, H>(hw, address, data, mode, policy, timing),
        None => Err(FlashError::UnknownChip(chip)),
    }
}

fn program_with<A: FlashAlgorithm, H: Platform>(
    hw: &mut H,
    address: u32,
    data: &[u8],
    mode: WriteMode,
    policy: &PollPolicy,
    timing: Timing,
) -> Result<(), FlashError> {
    let polls = policy.flash_program_polls;
    if mode == WriteMode::Test {
        return program_words::<A, H>(hw, address, data, mode, polls).map_err(|(_, e)| e);
    }

    let mut flash = Unlocked::new(hw, timing);
    let result = program_words::<A, H>(&mut flash, address, data, mode, polls);
    match result {
        Ok(_) => {
            A::read_array(&mut *flash, address);
            Ok(())
        }
        Err((failed_at, e)) => {
            A::read_array(&mut *flash, failed_at);
            warn!("{} program failed at {=u32:#x}: {}", A::FAMILY, failed_at, e);
            Err(e)
        }
    }
}

fn program_words<A: FlashAlgorithm, H: Platform>(
    hw: &mut H,
    address: u32,
    data: &[u8],
    mode: WriteMode,
    polls: u32,
) -> Result<(), (u32, FlashError)> {
    for (i, word) in data.chunks_exact(2).enumerate() {
        let at = address.wrapping_add(2 * i as u32);
        let value = u16::from_be_bytes([word[0], word[1]]);
        A::program_word(hw, at, value, polls, mode).map_err(|e| (at, e))?;
    }
    Ok(())
}
