// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Memory-mapped register access for the controller build.

use crate::config::Variant;
use crate::hal::{ChipSelect, DataLink, FlashControl, Memory, Platform, Watchdog};
use core::ptr::{read_volatile, write_volatile};

/// Line controller register offsets from its base.
const DLC_INTERRUPT_CONFIG: u32 = 0x06;
const DLC_COMMAND: u32 = 0x0C;
const DLC_TX_FIFO: u32 = 0x0D;
const DLC_STATUS: u32 = 0x0E;
const DLC_RX_FIFO: u32 = 0x0F;

/// Chip-select register offsets from the SIM base.
const SIM_CSBARBT: u32 = 0x48;
const SIM_CSORBT: u32 = 0x4A;
const SIM_CSBAR0: u32 = 0x4C;
const SIM_CSOR0: u32 = 0x4E;

/// Register addresses that differ between controller generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    pub dlc_base: u32,
    pub watchdog_1: u32,
    pub watchdog_2: u32,
    pub sim_base: u32,
    pub hardware_io: u32,
}

impl RegisterMap {
    pub const fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::P01 => Self {
                dlc_base: 0x00FF_F600,
                watchdog_1: 0x00FF_FA27,
                watchdog_2: 0x00FF_D006,
                sim_base: 0x00FF_FA00,
                hardware_io: 0xFFFF_E2FA,
            },
            Variant::P10 => Self {
                dlc_base: 0x00FF_F600,
                watchdog_1: 0x00FF_FA27,
                watchdog_2: 0x0080_0806,
                sim_base: 0x00FF_FA00,
                hardware_io: 0xFFFF_E2FA,
            },
            Variant::P12 => Self {
                dlc_base: 0x00FF_F600,
                watchdog_1: 0x00FF_FA55,
                watchdog_2: 0x00FF_FA21,
                sim_base: 0x00FF_FA30,
                hardware_io: 0xFFFF_E2FA,
            },
        }
    }
}

/// The real controller.
pub struct Mmio {
    map: RegisterMap,
}

impl Mmio {
    pub const fn new(map: RegisterMap) -> Self {
        Self { map }
    }

    /// Mask line controller interrupts; the kernel polls.
    pub fn disable_dlc_interrupts(&mut self) {
        self.write8(self.map.dlc_base + DLC_INTERRUPT_CONFIG, 0x00);
    }

    fn read8(&self, address: u32) -> u8 {
        // SAFETY: addresses come from the register map or the tool-validated
        // ranges; all are byte-accessible on the 68332 bus.
        unsafe { read_volatile(address as usize as *const u8) }
    }

    fn write8(&self, address: u32, value: u8) {
        // SAFETY: as for `read8`.
        unsafe { write_volatile(address as usize as *mut u8, value) }
    }

    fn read16(&self, address: u32) -> u16 {
        // SAFETY: callers pass even addresses.
        unsafe { read_volatile(address as usize as *const u16) }
    }

    fn write16(&self, address: u32, value: u16) {
        // SAFETY: callers pass even addresses.
        unsafe { write_volatile(address as usize as *mut u16, value) }
    }
}

impl Watchdog for Mmio {
    fn scratch(&mut self) {
        self.write8(self.map.watchdog_1, 0x55);
        self.write8(self.map.watchdog_1, 0xAA);
        let w2 = self.read8(self.map.watchdog_2);
        self.write8(self.map.watchdog_2, w2 ^ 0x80);
    }
}

impl DataLink for Mmio {
    fn status(&mut self) -> u8 {
        self.read8(self.map.dlc_base + DLC_STATUS)
    }

    fn read_fifo(&mut self) -> u8 {
        self.read8(self.map.dlc_base + DLC_RX_FIFO)
    }

    fn write_fifo(&mut self, byte: u8) {
        self.write8(self.map.dlc_base + DLC_TX_FIFO, byte);
    }

    fn write_command(&mut self, command: u8) {
        self.write8(self.map.dlc_base + DLC_COMMAND, command);
    }
}

impl Memory for Mmio {
    fn read_u8(&mut self, address: u32) -> u8 {
        self.read8(address)
    }

    fn write_u8(&mut self, address: u32, value: u8) {
        self.write8(address, value);
    }

    fn read_u16(&mut self, address: u32) -> u16 {
        self.read16(address)
    }

    fn write_u16(&mut self, address: u32, value: u16) {
        self.write16(address, value);
    }
}

impl FlashControl for Mmio {
    fn write_chip_select(&mut self, register: ChipSelect, value: u16) {
        let offset = match register {
            ChipSelect::BootBase => SIM_CSBARBT,
            ChipSelect::BootOption => SIM_CSORBT,
            ChipSelect::Base0 => SIM_CSBAR0,
            ChipSelect::Option0 => SIM_CSOR0,
        };
        self.write16(self.map.sim_base + offset, value);
    }

    fn read_hardware_io(&mut self) -> u16 {
        self.read16(self.map.hardware_io)
    }

    fn write_hardware_io(&mut self, value: u16) {
        self.write16(self.map.hardware_io, value);
    }
}

impl Platform for Mmio {
    fn spin(&mut self) {
        // A volatile status read costs a bus cycle and is never elided.
        let _ = self.read8(self.map.dlc_base + DLC_STATUS);
    }

    unsafe fn execute(&mut self, entry: u32) {
        let entry = core::mem::transmute::<usize, extern "C" fn()>(entry as usize);
        entry();
    }

    fn reset(&mut self) -> ! {
        loop {
            self.spin();
        }
    }
}
