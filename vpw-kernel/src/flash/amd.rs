// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! AMD AM29F/AM29BL command set: unlock cycles, toggle-bit erase polling
//! and data polling for program.

use super::{begin_id_query, end_id_query, FlashAlgorithm, FlashError, WriteMode};
use crate::hal::Platform;
use vpw_common::{FlashChipId, FlashFamily};

const UNLOCK_ADDR_1: u32 = 0xAAA;
const UNLOCK_ADDR_2: u32 = 0x554;
const UNLOCK_DATA_1: u16 = 0xAAAA;
const UNLOCK_DATA_2: u16 = 0x5555;

const AUTOSELECT: u16 = 0x9090;
const ERASE_SETUP: u16 = 0x8080;
const SECTOR_ERASE: u16 = 0x3030;
const PROGRAM: u16 = 0xA0A0;
const RESET: u16 = 0xF0F0;

/// DQ6, toggles on every read while an embedded algorithm runs.
const DQ6_TOGGLE: u16 = 0x40;
/// DQ5, set when the embedded algorithm exceeded its time limit.
const DQ5_TIMEOUT: u16 = 0x20;

/// Status reported when DQ5 is set and DQ6 still toggles.
const ERASE_FAILED: u8 = 0xB0;

pub struct Amd;

fn unlock_cycle<H: Platform>(hw: &mut H) {
    hw.write_u16(UNLOCK_ADDR_1, UNLOCK_DATA_1);
    hw.write_u16(UNLOCK_ADDR_2, UNLOCK_DATA_2);
}

fn toggling<H: Platform>(hw: &mut H, address: u32) -> bool {
    let first = hw.read_u16(address) & DQ6_TOGGLE;
    hw.scratch();
    let second = hw.read_u16(address) & DQ6_TOGGLE;
    first != second
}

impl FlashAlgorithm for Amd {
    const FAMILY: FlashFamily = FlashFamily::Amd;

    fn read_id<H: Platform>(hw: &mut H) -> FlashChipId {
        begin_id_query(hw);
        unlock_cycle(hw);
        hw.write_u16(UNLOCK_ADDR_1, AUTOSELECT);
        let manufacturer = hw.read_u16(0);
        let device = hw.read_u16(2);
        Self::read_array(hw, 0);
        end_id_query(hw);
        FlashChipId::from_parts(manufacturer, device)
    }

    fn erase_block<H: Platform>(hw: &mut H, address: u32, polls: u32) -> Result<(), FlashError> {
        unlock_cycle(hw);
        hw.write_u16(UNLOCK_ADDR_1, ERASE_SETUP);
        unlock_cycle(hw);
        hw.write_u16(address, SECTOR_ERASE);

        for _ in 0..polls {
            if !toggling(hw, address) {
                return Ok(());
            }
            if hw.read_u16(address) & DQ5_TIMEOUT != 0 {
                // DQ5 may rise just as the algorithm completes
                return if toggling(hw, address) {
                    Err(FlashError::Status(ERASE_FAILED))
                } else {
                    Ok(())
                };
            }
        }
        Err(FlashError::Timeout { status: 0 })
    }

    fn program_word<H: Platform>(
        hw: &mut H,
        address: u32,
        value: u16,
        polls: u32,
        mode: WriteMode,
    ) -> Result<(), FlashError> {
        if mode == WriteMode::Program {
            unlock_cycle(hw);
            hw.write_u16(UNLOCK_ADDR_1, PROGRAM);
            hw.write_u16(address, value);
        }

        for _ in 0..polls {
            hw.scratch();
            let read = match mode {
                WriteMode::Program => hw.read_u16(address),
                WriteMode::Test => value,
            };
            if read == value {
                return Ok(());
            }
            hw.spin();
        }
        Err(FlashError::Timeout { status: 0 })
    }

    fn read_array<H: Platform>(hw: &mut H, address: u32) {
        hw.write_u16(address, RESET);
        hw.write_u16(address, RESET);
    }
}
