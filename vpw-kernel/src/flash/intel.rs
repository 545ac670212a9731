// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Intel 28F400B/28F800B boot-block command set.

use super::{begin_id_query, end_id_query, FlashAlgorithm, FlashError, WriteMode};
use crate::hal::Platform;
use vpw_common::{FlashChipId, FlashFamily};

const READ_ARRAY: u16 = 0xFFFF;
const READ_SIGNATURE: u16 = 0x9090;
const CLEAR_STATUS: u16 = 0x5050;
const ERASE_SETUP: u16 = 0x2020;
const ERASE_CONFIRM: u16 = 0xD0D0;
const PROGRAM_SETUP: u16 = 0x4040;
const READ_STATUS: u16 = 0x7070;

/// Write state machine ready.
const SR_READY: u16 = 0x80;
/// Ready plus erase, program and Vpp error bits.
const SR_ERASE_MASK: u16 = 0xE8;
/// Ready plus program and Vpp error bits.
const SR_PROGRAM_MASK: u16 = 0x98;

pub struct Intel;

impl FlashAlgorithm for Intel {
    const FAMILY: FlashFamily = FlashFamily::Intel;

    fn read_id<H: Platform>(hw: &mut H) -> FlashChipId {
        begin_id_query(hw);
        hw.write_u16(0, READ_SIGNATURE);
        let manufacturer = hw.read_u16(0);
        let device = hw.read_u16(2);
        hw.write_u16(0, READ_ARRAY);
        end_id_query(hw);
        FlashChipId::from_parts(manufacturer, device)
    }

    fn erase_block<H: Platform>(hw: &mut H, address: u32, polls: u32) -> Result<(), FlashError> {
        hw.write_u16(address, CLEAR_STATUS);
        hw.write_u16(address, ERASE_SETUP);
        hw.write_u16(address, ERASE_CONFIRM);
        hw.spin();
        hw.spin();
        hw.write_u16(address, READ_STATUS);

        let mut status = 0;
        let mut ready = false;
        for _ in 0..polls {
            hw.scratch();
            hw.spin();
            hw.spin();
            status = hw.read_u16(address);
            if status & SR_READY != 0 {
                ready = true;
                break;
            }
        }

        let status = status & SR_ERASE_MASK;
        match (ready, status) {
            (true, SR_READY) => Ok(()),
            (true, status) => Err(FlashError::Status(status as u8)),
            (false, status) => Err(FlashError::Timeout {
                status: status as u8,
            }),
        }
    }

    fn program_word<H: Platform>(
        hw: &mut H,
        address: u32,
        value: u16,
        polls: u32,
        mode: WriteMode,
    ) -> Result<(), FlashError> {
        if mode == WriteMode::Program {
            hw.write_u16(address, CLEAR_STATUS);
            hw.write_u16(address, PROGRAM_SETUP);
            hw.write_u16(address, value);
            hw.write_u16(address, READ_STATUS);
        }

        let mut status = 0;
        for _ in 0..polls {
            status = match mode {
                WriteMode::Program => hw.read_u16(address),
                WriteMode::Test => SR_READY,
            };
            hw.scratch();
            if status & SR_READY != 0 {
                if status & SR_PROGRAM_MASK != SR_READY {
                    return Err(FlashError::Status(status as u8));
                }
                return Ok(());
            }
            hw.spin();
            hw.spin();
        }
        Err(FlashError::Timeout {
            status: status as u8,
        })
    }

    fn read_array<H: Platform>(hw: &mut H, address: u32) {
        hw.write_u16(address, READ_ARRAY);
        hw.write_u16(address, READ_ARRAY);
    }
}
