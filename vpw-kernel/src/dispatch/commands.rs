// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use super::reply;
use crate::config::KernelConfig;
use crate::flash::{self, WriteMode};
use crate::hal::Platform;
use crate::kernel::{Kernel, Step};
use vpw_common::checksum::verify_block;
use vpw_common::protocol::{
    Mode, ADDR_PCM, ADDR_TOOL, HEADER_LEN, PRIORITY_BLOCK, WRITE_ERR_MISALIGNED, WRITE_ERR_RANGE,
    WRITE_ERR_TRUNCATED, WRITE_EXECUTE, WRITE_TEST,
};
use vpw_common::{FlashChipId, Segment};

/// Top of the 24-bit address space the 0x35 read can reach.
const ADDRESS_SPACE_END: u32 = 0x0100_0000;

/// Bytes read from memory per transport call while streaming a 0x35 reply.
const READ_CHUNK: usize = 64;

/// Bytes copied into RAM between watchdog services.
const COPY_STRIDE: usize = 64;

/// Why a 0x36 write was refused before touching memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteRejection {
    Misaligned,
    OutOfRange,
    Truncated,
}

impl WriteRejection {
    pub fn code(self) -> u8 {
        match self {
            WriteRejection::Misaligned => WRITE_ERR_MISALIGNED,
            WriteRejection::OutOfRange => WRITE_ERR_RANGE,
            WriteRejection::Truncated => WRITE_ERR_TRUNCATED,
        }
    }
}

/// Where a write of `length` bytes at `address` would land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Ram,
    Flash,
}

fn classify(config: &KernelConfig, address: u32, length: u32) -> Option<Target> {
    if config.memory.ram.contains_range(address, length) {
        Some(Target::Ram)
    } else if config.memory.flash.contains_range(address, length) {
        Some(Target::Flash)
    } else {
        None
    }
}

/// Handle 0x34: may the tool upload `length` bytes to `address`?
pub fn handle_write_request<H: Platform>(k: &mut Kernel<H>) -> Step {
    let (Some(length), Some(address)) = (k.buffer.u16_be(5), k.buffer.u24_be(7)) else {
        reply::reject(k, Mode::WriteRequest);
        return Step::Continue;
    };
    let length = u32::from(length);

    if length > k.config.max_transfer || classify(&k.config, address, length).is_none() {
        warn!("write request refused: {=u32} bytes at {=u32:#x}", length, address);
        reply::reject(k, Mode::WriteRequest);
    } else {
        reply::positive(k, Mode::WriteRequest, &[0x00]);
    }
    Step::Continue
}

/// Handle 0x35: agree, then stream the range back as a 0x36 block.
pub fn handle_read<H: Platform>(k: &mut Kernel<H>) -> Step {
    let (Some(length), Some(address)) = (k.buffer.u16_be(5), k.buffer.u24_be(7)) else {
        reply::reject(k, Mode::Read);
        return Step::Continue;
    };
    let len = u32::from(length);
    if len > k.config.max_transfer
        || address + len > ADDRESS_SPACE_END
        || k.config.memory.registers.overlaps(address, len)
    {
        warn!("read refused: {=u32} bytes at {=u32:#x}", len, address);
        reply::reject(k, Mode::Read);
        return Step::Continue;
    }

    reply::positive(k, Mode::Read, &[0x01, 0x54, 0x6C, 0xF0]);
    k.delay().long_pause();

    let [l_hi, l_lo] = length.to_be_bytes();
    let [_, a2, a1, a0] = address.to_be_bytes();
    let header = [
        PRIORITY_BLOCK,
        ADDR_TOOL,
        ADDR_PCM,
        Mode::Write.into(),
        0x01,
        l_hi,
        l_lo,
        a2,
        a1,
        a0,
    ];
    let mut sum = k.transport.send(&mut k.hw, &header, Segment::START, 0);

    let mut chunk = [0u8; READ_CHUNK];
    let mut offset = 0;
    while offset < len {
        let n = (len - offset).min(READ_CHUNK as u32) as usize;
        for (i, slot) in chunk[..n].iter_mut().enumerate() {
            *slot = k.hw.read_u8(address + offset + i as u32);
        }
        sum = k.transport.send(&mut k.hw, &chunk[..n], Segment::MIDDLE, sum);
        offset += n as u32;
    }
    k.transport
        .send(&mut k.hw, &[], Segment::END | Segment::ADD_CHECKSUM, sum);
    Step::Continue
}

/// Handle 0x36: verify, then copy to RAM or program flash.
pub fn handle_write<H: Platform>(k: &mut Kernel<H>) -> Step {
    let command = k.buffer.submode();
    let (Some(length), Some(start)) = (k.buffer.u16_be(5), k.buffer.u24_be(7)) else {
        return refuse(k, WriteRejection::Truncated);
    };
    let len = u32::from(length);
    if len > k.config.max_transfer {
        return refuse(k, WriteRejection::OutOfRange);
    }

    match verify_block(k.buffer.as_slice(), usize::from(length)) {
        None => return refuse(k, WriteRejection::Truncated),
        Some(Err((computed, expected))) => {
            warn!(
                "write checksum {=u16:#x}, frame says {=u16:#x}",
                computed,
                expected
            );
            reply::checksum_mismatch(k, computed, expected, length);
            return Step::Continue;
        }
        Some(Ok(_)) => {}
    }

    if start & 1 != 0 {
        return refuse(k, WriteRejection::Misaligned);
    }

    match classify(&k.config, start, len) {
        Some(Target::Ram) => write_ram(k, command, start, usize::from(length)),
        Some(Target::Flash) if len & 1 != 0 => refuse(k, WriteRejection::Misaligned),
        Some(Target::Flash) => write_flash(k, command, start, usize::from(length)),
        None => refuse(k, WriteRejection::OutOfRange),
    }
}

fn refuse<H: Platform>(k: &mut Kernel<H>, why: WriteRejection) -> Step {
    warn!("write refused: {}", why);
    reply::write_failure(k, why.code(), 0x00);
    Step::Continue
}

fn write_ram<H: Platform>(k: &mut Kernel<H>, command: u8, start: u32, len: usize) -> Step {
    let Some(data) = k.buffer.get(HEADER_LEN..HEADER_LEN + len) else {
        return refuse(k, WriteRejection::Truncated);
    };
    for (i, &b) in data.iter().enumerate() {
        if i % COPY_STRIDE == 0 {
            k.hw.scratch();
        }
        k.hw.write_u8(start + i as u32, b);
    }

    reply::write_success(k, command);

    if command == WRITE_EXECUTE {
        k.delay().long_pause();
        info!("executing at {=u32:#x}", start);
        // SAFETY: the tool asked to run the block it just uploaded, which
        // passed its checksum and lies entirely inside kernel-free RAM.
        unsafe { k.hw.execute(start) };
    }
    Step::Continue
}

fn write_flash<H: Platform>(k: &mut Kernel<H>, command: u8, start: u32, len: usize) -> Step {
    let mode = if command == WRITE_TEST {
        WriteMode::Test
    } else {
        WriteMode::Program
    };
    let chip = k.flash_id.unwrap_or(FlashChipId(0));
    let Some(data) = k.buffer.get(HEADER_LEN..HEADER_LEN + len) else {
        return refuse(k, WriteRejection::Truncated);
    };

    let result = flash::program(
        &mut k.hw,
        chip,
        start,
        data,
        mode,
        &k.config.polling,
        k.config.timing,
    );
    if mode == WriteMode::Program {
        k.crc.reset();
    }

    match result {
        Ok(()) => reply::write_success(k, command),
        Err(e) => reply::write_failure(k, 0x00, e.code()),
    }
    Step::Continue
}
