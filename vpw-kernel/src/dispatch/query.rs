// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Mode 0x3D kernel queries.

use super::reply;
use crate::flash;
use crate::hal::Platform;
use crate::kernel::{Kernel, Step};
use vpw_common::protocol::{parse_version, Query, DIAGNOSTIC_SNAPSHOT_MAX, WRITE_ERR_RANGE};

/// `[major, minor, patch]` of this build.
pub const KERNEL_VERSION: [u8; 3] = parse_version(env!("CARGO_PKG_VERSION"));

/// CRC reply while the scan is still running. Shares the submode with the
/// diagnostics reply; the tool tells them apart by length.
const CRC_IN_PROGRESS: u8 = 0xFF;

/// Dispatch a 0x3D query to its handler.
pub fn dispatch_query<H: Platform>(k: &mut Kernel<H>, submode: u8) -> Step {
    match Query::from(submode) {
        Query::Version => handle_version(k),
        Query::FlashChipId => handle_flash_chip(k),
        Query::Crc => handle_crc(k),
        Query::OperatingSystemId => handle_os_id(k),
        Query::Reserved => {}
        Query::EraseBlock => {
            handle_erase_block(k);
            k.crc.reset();
        }
        Query::EraseAll => reply::query_reject(k, submode, &[0x00]),
        Query::Diagnostics => handle_diagnostics(k),
        Query::Other(other) => reply::tool_present(k, [0x3D, other, 0x00, 0x00]),
    }
    Step::Continue
}

/// `7D 00 <major> <minor> <patch> <kernel type>`
fn handle_version<H: Platform>(k: &mut Kernel<H>) {
    let [major, minor, patch] = KERNEL_VERSION;
    let kernel_type = k.config.kernel_type();
    k.delay().elm_pause();
    reply::query(k, Query::Version.into(), &[major, minor, patch, kernel_type]);
}

/// Identify the flash chip and remember it for erase and write.
fn handle_flash_chip<H: Platform>(k: &mut Kernel<H>) {
    k.hw.scratch();
    let id = flash::identify(&mut k.hw);
    k.hw.scratch();
    k.flash_id = Some(id);
    info!("flash chip {=u32:#x}", id.0);

    k.delay().variable_pause(1);
    reply::query(k, Query::FlashChipId.into(), &id.to_be_bytes());
}

/// Start, advance or report the CRC of `[address, address + length)`.
///
/// The first request for a range only starts the scan; each repeat advances
/// it by one slice until the result is ready.
fn handle_crc<H: Platform>(k: &mut Kernel<H>) {
    let (Some(length), Some(address)) = (k.buffer.u24_be(5), k.buffer.u24_be(8)) else {
        reply::query_reject(k, Query::Crc.into(), &[]);
        return;
    };

    let path = if !k.crc.is_started(address, length) {
        k.crc.start(address, length);
        1
    } else {
        let slice = k.config.crc_slice_len;
        k.crc.process_slice(&mut k.hw, slice);
        2
    };

    k.delay().elm_pause();

    match k.crc.result(address, length) {
        Some(crc) => {
            let [_, l2, l1, l0] = length.to_be_bytes();
            let [_, a2, a1, a0] = address.to_be_bytes();
            let [c3, c2, c1, c0] = crc.to_be_bytes();
            reply::query(
                k,
                Query::Crc.into(),
                &[l2, l1, l0, a2, a1, a0, c3, c2, c1, c0],
            );
        }
        None => reply::query(k, CRC_IN_PROGRESS, &[path]),
    }
}

/// `7D 03` plus the four id bytes of the installed operating system.
fn handle_os_id<H: Platform>(k: &mut Kernel<H>) {
    k.delay().elm_pause();
    let base = k.config.memory.os_id;
    let mut id = [0u8; 4];
    for (i, b) in id.iter_mut().enumerate() {
        *b = k.hw.read_u8(base + i as u32);
    }
    reply::query(k, Query::OperatingSystemId.into(), &id);
}

/// Erase the flash block at the address in bytes 5..8.
fn handle_erase_block<H: Platform>(k: &mut Kernel<H>) {
    let submode = Query::EraseBlock.into();
    let Some(address) = k.buffer.u24_be(5) else {
        reply::query_reject(k, submode, &[WRITE_ERR_RANGE, 0x00]);
        return;
    };

    let chip = match k.flash_id {
        Some(chip) if chip.family().is_some() => chip,
        _ => {
            k.delay().variable_pause(2);
            reply::query_reject(k, submode, &[0xFF, 0xFF]);
            return;
        }
    };

    if !k.config.memory.flash.contains(address) {
        warn!("erase refused at {=u32:#x}", address);
        k.delay().variable_pause(2);
        reply::query_reject(k, submode, &[WRITE_ERR_RANGE, 0x00]);
        return;
    }

    let status = match flash::erase_block(
        &mut k.hw,
        chip,
        address,
        &k.config.polling,
        k.config.timing,
    ) {
        Ok(()) => 0x00,
        Err(e) => e.code(),
    };

    // Vpp switching leaves the bus noisy for a moment.
    k.delay().variable_pause(2);
    reply::query(k, submode, &[status, 0x00]);
}

/// `7D FF` plus the postcard-encoded kernel counters.
fn handle_diagnostics<H: Platform>(k: &mut Kernel<H>) {
    let snapshot = k.snapshot();
    let mut encoded = [0u8; DIAGNOSTIC_SNAPSHOT_MAX];
    match postcard::to_slice(&snapshot, &mut encoded) {
        Ok(bytes) => {
            let len = bytes.len();
            reply::query(k, Query::Diagnostics.into(), &encoded[..len]);
        }
        Err(_) => {
            error!("diagnostics snapshot does not fit");
            reply::query(k, Query::Diagnostics.into(), &[]);
        }
    }
}
