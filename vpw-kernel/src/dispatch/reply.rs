// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Reply frames. Each one is composed in the shared message buffer, sent
//! as a single complete frame, and wiped from the buffer once on the wire.

use crate::hal::Platform;
use crate::kernel::Kernel;
use vpw_common::protocol::{
    Mode, ADDR_BROADCAST, ADDR_PCM, ADDR_TOOL, MODE_REJECT, PRIORITY_BLOCK, PRIORITY_NORMAL,
    PRIORITY_TOOL_PRESENT,
};

const TO_TOOL: [u8; 3] = [PRIORITY_NORMAL, ADDR_TOOL, ADDR_PCM];
const BLOCK_TO_TOOL: [u8; 3] = [PRIORITY_BLOCK, ADDR_TOOL, ADDR_PCM];

/// Mode byte of the reboot notice.
const MODE_REBOOT_NOTICE: u8 = 0x60;

pub(crate) fn send<H: Platform>(k: &mut Kernel<H>, header: &[u8], payload: &[u8]) {
    if k.buffer.compose(header, payload).is_err() {
        error!("reply does not fit the message buffer");
        return;
    }
    k.transport.send_frame(&mut k.hw, k.buffer.as_slice());
    k.wipe_buffer();
}

fn send_to_tool<H: Platform>(k: &mut Kernel<H>, mode: u8, payload: &[u8]) {
    let [p, d, s] = TO_TOOL;
    send(k, &[p, d, s, mode], payload);
}

/// `8C FE F0 3F` plus four bytes of diagnostic data.
pub(crate) fn tool_present<H: Platform>(k: &mut Kernel<H>, data: [u8; 4]) {
    send(
        k,
        &[PRIORITY_TOOL_PRESENT, ADDR_BROADCAST, ADDR_TOOL, 0x3F],
        &data,
    );
}

/// `6D F0 10 76 <command>`
pub(crate) fn write_success<H: Platform>(k: &mut Kernel<H>, command: u8) {
    send(k, &BLOCK_TO_TOOL, &[Mode::Write.response(), command]);
}

/// `6D F0 10 7F 36 <request error> <flash error>`
pub(crate) fn write_failure<H: Platform>(k: &mut Kernel<H>, request_error: u8, flash_error: u8) {
    send(
        k,
        &BLOCK_TO_TOOL,
        &[MODE_REJECT, Mode::Write.into(), request_error, flash_error],
    );
}

/// `6D F0 10 7F 36` with the computed sum, the sum the tool sent, and the
/// declared length.
pub(crate) fn checksum_mismatch<H: Platform>(
    k: &mut Kernel<H>,
    computed: u16,
    expected: u16,
    length: u16,
) {
    let [c_hi, c_lo] = computed.to_be_bytes();
    let [e_hi, e_lo] = expected.to_be_bytes();
    let [l_hi, l_lo] = length.to_be_bytes();
    send(
        k,
        &BLOCK_TO_TOOL,
        &[MODE_REJECT, Mode::Write.into(), c_hi, c_lo, e_hi, e_lo, l_hi, l_lo],
    );
}

/// `6C F0 10 7F <mode>`
pub(crate) fn reject<H: Platform>(k: &mut Kernel<H>, mode: Mode) {
    send_to_tool(k, MODE_REJECT, &[mode.into()]);
}

/// `6C F0 10 <positive response of mode>` plus payload.
pub(crate) fn positive<H: Platform>(k: &mut Kernel<H>, mode: Mode, payload: &[u8]) {
    send_to_tool(k, mode.response(), payload);
}

/// `6C F0 10 7D <submode>` plus payload.
pub(crate) fn query<H: Platform>(k: &mut Kernel<H>, submode: u8, payload: &[u8]) {
    let [p, d, s] = TO_TOOL;
    send(k, &[p, d, s, Mode::Query.response(), submode], payload);
}

/// `6C F0 10 7F 3D <submode> <code> <data>`
pub(crate) fn query_reject<H: Platform>(k: &mut Kernel<H>, submode: u8, detail: &[u8]) {
    let [p, d, s] = TO_TOOL;
    send(k, &[p, d, s, MODE_REJECT, Mode::Query.into(), submode], detail);
}

/// `6C F0 10 60 <reason>`
pub(crate) fn reboot_notice<H: Platform>(k: &mut Kernel<H>, reason: u32) {
    send_to_tool(k, MODE_REBOOT_NOTICE, &reason.to_be_bytes());
}
