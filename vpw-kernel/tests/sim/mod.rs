// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Simulated engine controller: line controller FIFOs, RAM, chip selects,
//! watchdog bookkeeping and an Intel or AMD flash chip.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use vpw_common::checksum;
use vpw_kernel::config::{
    AddressWindow, Inactivity, KernelConfig, MemoryMap, PollPolicy, Timing, Variant,
};
use vpw_kernel::hal::{ChipSelect, DataLink, FlashControl, Memory, Platform, Watchdog};

pub const FLASH_SIZE: u32 = 0x10_0000;
pub const BLOCK_SIZE: u32 = 0x1_0000;

/// Clean completion code.
pub const CC_OK: u8 = 0x00;
/// Completion code with bus error bits set.
pub const CC_ERROR: u8 = 0x30;

/// Entry in the receive FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxItem {
    Data(u8),
    Completion(u8),
    /// One byte of an overrun frame.
    Overflow,
}

/// Everything written to the transmit side, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Command(u8),
    Fifo(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxLoad {
    Body,
    First,
    Last,
    Flush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipKind {
    Intel,
    Amd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChipMode {
    ReadArray,
    Id,
    Status,
    IntelEraseSetup,
    IntelProgramSetup,
    AmdUnlock1,
    AmdUnlock2,
    AmdProgram,
    AmdEraseSetup,
    AmdEraseUnlock1,
    AmdEraseUnlock2,
    AmdBusy,
}

/// Word-wide flash chip with busy latency and fault injection.
pub struct FlashChip {
    pub kind: ChipKind,
    pub id: u32,
    pub data: Vec<u8>,
    mode: ChipMode,
    status: u16,
    busy: u32,
    toggle: u16,
    amd_target: u32,
    amd_value: Option<u16>,
    amd_failed: bool,
    /// Status polls an operation stays busy.
    pub latency: u32,
    /// Never finish an operation.
    pub stuck: bool,
    /// Intel: error bits reported when an operation finishes.
    /// AMD: any value makes an erase end with DQ5 set.
    pub fault: Option<u16>,
    pub programmed: Vec<(u32, u16)>,
    pub erased: Vec<u32>,
}

impl FlashChip {
    pub fn new(kind: ChipKind, id: u32) -> Self {
        Self {
            kind,
            id,
            data: vec![0xFF; FLASH_SIZE as usize],
            mode: ChipMode::ReadArray,
            status: 0x80,
            busy: 0,
            toggle: 0,
            amd_target: 0,
            amd_value: None,
            amd_failed: false,
            latency: 2,
            stuck: false,
            fault: None,
            programmed: Vec::new(),
            erased: Vec::new(),
        }
    }

    pub fn intel() -> Self {
        Self::new(ChipKind::Intel, 0x0089_889D)
    }

    pub fn amd() -> Self {
        Self::new(ChipKind::Amd, 0x0001_2203)
    }

    pub fn in_read_array(&self) -> bool {
        self.mode == ChipMode::ReadArray
    }

    pub fn word(&self, address: u32) -> u16 {
        let a = (address & !1) as usize;
        u16::from_be_bytes([self.data[a], self.data[a + 1]])
    }

    fn set_word(&mut self, address: u32, value: u16) {
        let a = (address & !1) as usize;
        let [hi, lo] = value.to_be_bytes();
        self.data[a] &= hi;
        self.data[a + 1] &= lo;
    }

    fn erase(&mut self, address: u32) {
        let base = (address / BLOCK_SIZE * BLOCK_SIZE) as usize;
        self.data[base..base + BLOCK_SIZE as usize].fill(0xFF);
        self.erased.push(base as u32);
    }

    fn read(&mut self, address: u32) -> u16 {
        match self.kind {
            ChipKind::Intel => self.intel_read(address),
            ChipKind::Amd => self.amd_read(address),
        }
    }

    fn write(&mut self, address: u32, value: u16, vpp: bool) {
        match self.kind {
            ChipKind::Intel => self.intel_write(address, value, vpp),
            ChipKind::Amd => self.amd_write(address, value, vpp),
        }
    }

    fn id_word(&self, address: u32) -> u16 {
        if address & 2 == 0 {
            (self.id >> 16) as u16
        } else {
            self.id as u16
        }
    }

    fn intel_read(&mut self, address: u32) -> u16 {
        match self.mode {
            ChipMode::Id => self.id_word(address),
            ChipMode::Status => {
                if self.stuck {
                    return 0x00;
                }
                if self.busy > 0 {
                    self.busy -= 1;
                    return 0x00;
                }
                self.status
            }
            _ => self.word(address),
        }
    }

    fn intel_write(&mut self, address: u32, value: u16, vpp: bool) {
        match (self.mode, value) {
            (ChipMode::IntelProgramSetup, value) => {
                self.mode = ChipMode::Status;
                if !vpp {
                    self.status = 0x88;
                    return;
                }
                self.set_word(address, value);
                self.programmed.push((address, value));
                self.busy = self.latency;
                self.status = 0x80 | self.fault.unwrap_or(0);
            }
            (ChipMode::IntelEraseSetup, 0xD0D0) => {
                self.mode = ChipMode::Status;
                if !vpp {
                    self.status = 0xA8;
                    return;
                }
                self.erase(address);
                self.busy = self.latency;
                self.status = 0x80 | self.fault.unwrap_or(0);
            }
            (_, 0xFFFF) => self.mode = ChipMode::ReadArray,
            (_, 0x9090) => self.mode = ChipMode::Id,
            (_, 0x5050) => self.status = 0x80,
            (_, 0x2020) => self.mode = ChipMode::IntelEraseSetup,
            (_, 0x4040) => self.mode = ChipMode::IntelProgramSetup,
            (_, 0x7070) => self.mode = ChipMode::Status,
            _ => {}
        }
    }

    fn amd_read(&mut self, address: u32) -> u16 {
        match self.mode {
            ChipMode::Id => self.id_word(address),
            ChipMode::AmdBusy => {
                if let Some(value) = self.amd_value {
                    // Data polling: DQ7 reads inverted until the word is in.
                    if self.stuck || self.busy > 0 {
                        self.busy = self.busy.saturating_sub(1);
                        return !value & 0x0080 | (value & !0x0080);
                    }
                    self.mode = ChipMode::ReadArray;
                    return self.word(address);
                }
                if self.stuck || self.busy > 0 || self.amd_failed {
                    self.busy = self.busy.saturating_sub(1);
                    if self.busy == 0 && self.fault.is_some() && !self.stuck {
                        self.amd_failed = true;
                    }
                    self.toggle ^= 0x40;
                    let dq5 = if self.amd_failed { 0x20 } else { 0x00 };
                    return self.toggle | dq5;
                }
                self.mode = ChipMode::ReadArray;
                self.word(address)
            }
            _ => self.word(address),
        }
    }

    fn amd_write(&mut self, address: u32, value: u16, vpp: bool) {
        if value == 0xF0F0 {
            self.mode = ChipMode::ReadArray;
            self.amd_failed = false;
            return;
        }
        self.mode = match (self.mode, address, value) {
            (ChipMode::AmdProgram, _, _) => {
                if vpp {
                    self.set_word(address, value);
                    self.programmed.push((address, value));
                }
                self.amd_target = address;
                self.amd_value = Some(value);
                self.busy = self.latency;
                ChipMode::AmdBusy
            }
            (ChipMode::AmdEraseUnlock2, _, 0x3030) => {
                if !vpp {
                    ChipMode::ReadArray
                } else {
                    self.erase(address);
                    self.amd_target = address;
                    self.amd_value = None;
                    self.busy = self.latency;
                    ChipMode::AmdBusy
                }
            }
            (ChipMode::AmdEraseSetup, 0xAAA, 0xAAAA) => ChipMode::AmdEraseUnlock1,
            (ChipMode::AmdEraseUnlock1, 0x554, 0x5555) => ChipMode::AmdEraseUnlock2,
            (_, 0xAAA, 0xAAAA) => ChipMode::AmdUnlock1,
            (ChipMode::AmdUnlock1, 0x554, 0x5555) => ChipMode::AmdUnlock2,
            (ChipMode::AmdUnlock2, 0xAAA, 0x9090) => ChipMode::Id,
            (ChipMode::AmdUnlock2, 0xAAA, 0xA0A0) => ChipMode::AmdProgram,
            (ChipMode::AmdUnlock2, 0xAAA, 0x8080) => ChipMode::AmdEraseSetup,
            (mode, _, _) => mode,
        };
    }
}

pub struct SimPcm {
    rx: VecDeque<RxItem>,
    tx_load: TxLoad,
    current: Option<Vec<u8>>,
    pub frames: Vec<Vec<u8>>,
    pub wire: Vec<Wire>,
    pub completion_acks: u32,
    pub flushes: u32,
    /// Status reads that report a full transmit FIFO.
    pub tx_full_reads: u32,
    /// Status reads after a flush before the transmit FIFO reads empty.
    pub drain_reads: u32,
    drain_left: u32,

    pub memory: HashMap<u32, u8>,
    pub flash: FlashChip,
    pub chip_selects: Vec<(ChipSelect, u16)>,
    pub csor0: u16,
    pub hardware_io: u16,

    pub scratches: u64,
    pub ops_since_scratch: u64,
    pub max_gap: u64,
    pub spins: u64,
    pub executed: Vec<u32>,
}

impl SimPcm {
    pub fn new(flash: FlashChip) -> Self {
        Self {
            rx: VecDeque::new(),
            tx_load: TxLoad::Body,
            current: None,
            frames: Vec::new(),
            wire: Vec::new(),
            completion_acks: 0,
            flushes: 0,
            tx_full_reads: 0,
            drain_reads: 2,
            drain_left: 0,
            memory: HashMap::new(),
            flash,
            chip_selects: Vec::new(),
            csor0: 0x1060,
            hardware_io: 0x0000,
            scratches: 0,
            ops_since_scratch: 0,
            max_gap: 0,
            spins: 0,
            executed: Vec::new(),
        }
    }

    pub fn intel() -> Self {
        Self::new(FlashChip::intel())
    }

    pub fn amd() -> Self {
        Self::new(FlashChip::amd())
    }

    fn tick(&mut self) {
        self.ops_since_scratch += 1;
    }

    /// Queue a frame followed by the given completion code.
    pub fn queue_frame_with(&mut self, frame: &[u8], completion: u8) {
        self.rx.extend(frame.iter().map(|&b| RxItem::Data(b)));
        self.rx.push_back(RxItem::Completion(completion));
    }

    pub fn queue_frame(&mut self, frame: &[u8]) {
        self.queue_frame_with(frame, CC_OK);
    }

    pub fn queue(&mut self, item: RxItem) {
        self.rx.push_back(item);
    }

    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    pub fn take_frames(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.frames)
    }

    pub fn vpp_enabled(&self) -> bool {
        self.hardware_io & 0x0001 != 0 && self.csor0 == 0x7060
    }

    /// Flash is write-protected and back in normal chip-select timing.
    pub fn flash_locked(&self) -> bool {
        self.hardware_io & 0x0001 == 0 && self.csor0 == 0x1060
    }

    pub fn ram(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| *self.memory.get(&(address + i)).unwrap_or(&0))
            .collect()
    }

    pub fn load(&mut self, address: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            if address + (i as u32) < FLASH_SIZE {
                self.flash.data[(address as usize) + i] = b;
            } else {
                self.memory.insert(address + i as u32, b);
            }
        }
    }

    fn rx_bits(&self) -> u8 {
        match self.rx.front() {
            None => 0b000,
            Some(RxItem::Data(_)) => match self.rx.get(1) {
                Some(RxItem::Completion(_)) => 0b010,
                _ => 0b001,
            },
            Some(RxItem::Overflow) => 0b011,
            Some(RxItem::Completion(_)) => 0b111,
        }
    }

    fn tx_bits(&mut self) -> u8 {
        if self.tx_full_reads > 0 {
            self.tx_full_reads -= 1;
            return 0b11;
        }
        if self.drain_left > 0 {
            self.drain_left -= 1;
            return 0b11;
        }
        0b00
    }
}

impl Watchdog for SimPcm {
    fn scratch(&mut self) {
        self.scratches += 1;
        self.max_gap = self.max_gap.max(self.ops_since_scratch);
        self.ops_since_scratch = 0;
    }
}

impl DataLink for SimPcm {
    fn status(&mut self) -> u8 {
        self.tick();
        (self.rx_bits() << 5) | self.tx_bits()
    }

    fn read_fifo(&mut self) -> u8 {
        self.tick();
        match self.rx.pop_front() {
            Some(RxItem::Data(b)) | Some(RxItem::Completion(b)) => b,
            Some(RxItem::Overflow) => 0xFF,
            None => 0x00,
        }
    }

    fn write_fifo(&mut self, byte: u8) {
        self.tick();
        self.wire.push(Wire::Fifo(byte));
        match self.tx_load {
            TxLoad::First => {
                self.current = Some(vec![byte]);
                self.tx_load = TxLoad::Body;
            }
            TxLoad::Last => {
                let mut frame = self.current.take().unwrap_or_default();
                frame.push(byte);
                self.frames.push(frame);
                self.tx_load = TxLoad::Body;
            }
            TxLoad::Flush => {
                self.flushes += 1;
                self.drain_left = self.drain_reads;
                self.tx_load = TxLoad::Body;
            }
            TxLoad::Body => {
                if let Some(frame) = self.current.as_mut() {
                    frame.push(byte);
                }
            }
        }
    }

    fn write_command(&mut self, command: u8) {
        self.tick();
        self.wire.push(Wire::Command(command));
        match command {
            0x14 => self.tx_load = TxLoad::First,
            0x0C => self.tx_load = TxLoad::Last,
            0x03 => self.tx_load = TxLoad::Flush,
            0x02 => self.completion_acks += 1,
            _ => {}
        }
    }
}

impl Memory for SimPcm {
    fn read_u8(&mut self, address: u32) -> u8 {
        self.tick();
        if address < FLASH_SIZE {
            let word = self.flash.read(address & !1);
            let [hi, lo] = word.to_be_bytes();
            return if address & 1 == 0 { hi } else { lo };
        }
        *self.memory.get(&address).unwrap_or(&0)
    }

    fn write_u8(&mut self, address: u32, value: u8) {
        self.tick();
        if address >= FLASH_SIZE {
            self.memory.insert(address, value);
        }
    }

    fn read_u16(&mut self, address: u32) -> u16 {
        self.tick();
        if address < FLASH_SIZE {
            return self.flash.read(address);
        }
        let hi = *self.memory.get(&address).unwrap_or(&0);
        let lo = *self.memory.get(&(address + 1)).unwrap_or(&0);
        u16::from_be_bytes([hi, lo])
    }

    fn write_u16(&mut self, address: u32, value: u16) {
        self.tick();
        if address < FLASH_SIZE {
            let vpp = self.vpp_enabled();
            self.flash.write(address, value, vpp);
            return;
        }
        let [hi, lo] = value.to_be_bytes();
        self.memory.insert(address, hi);
        self.memory.insert(address + 1, lo);
    }
}

impl FlashControl for SimPcm {
    fn write_chip_select(&mut self, register: ChipSelect, value: u16) {
        self.tick();
        self.chip_selects.push((register, value));
        if register == ChipSelect::Option0 {
            self.csor0 = value;
        }
    }

    fn read_hardware_io(&mut self) -> u16 {
        self.tick();
        self.hardware_io
    }

    fn write_hardware_io(&mut self, value: u16) {
        self.tick();
        self.hardware_io = value;
    }
}

impl Platform for SimPcm {
    fn spin(&mut self) {
        self.tick();
        self.spins += 1;
    }

    unsafe fn execute(&mut self, entry: u32) {
        self.executed.push(entry);
    }

    fn reset(&mut self) -> ! {
        panic!("watchdog reset");
    }
}

/// Small poll caps and slow spins so tests finish quickly.
pub fn test_config() -> KernelConfig {
    KernelConfig {
        variant: Variant::P01,
        memory: MemoryMap {
            ram: AddressWindow::new(0x00FF_8000, 0x00FF_CDFF),
            flash: AddressWindow::new(0x0000_8000, 0x000F_FFFF),
            registers: AddressWindow::new(0x00FF_F000, 0x00FF_FFFF),
            os_id: 0x0000_0504,
        },
        polling: PollPolicy {
            rx_idle_polls: 64,
            tx_fifo_retries: 4,
            tx_retry_spins: 2,
            tx_drain_polls: 8,
            tx_drain_spins: 2,
            flash_program_polls: 16,
            flash_erase_polls: 64,
        },
        timing: Timing {
            spin_ns: 1_000_000,
            spins_per_service: 16,
        },
        inactivity: Inactivity {
            keepalive_polls: 3,
            reboot_polls: None,
        },
        crc_slice_len: 1024,
        max_transfer: 4096,
    }
}

/// `6D 10 F0 36 <command> <len> <addr>` + data + block sum.
pub fn block_write(command: u8, address: u32, data: &[u8]) -> Vec<u8> {
    let [_, a2, a1, a0] = address.to_be_bytes();
    let [l_hi, l_lo] = (data.len() as u16).to_be_bytes();
    let mut frame = vec![0x6D, 0x10, 0xF0, 0x36, command, l_hi, l_lo, a2, a1, a0];
    frame.extend_from_slice(data);
    let sum = checksum::block_sum(&frame[4..]);
    frame.extend_from_slice(&sum.to_be_bytes());
    frame
}
