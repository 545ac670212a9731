// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Routes a received frame to its handler by mode byte.
//!
//! Handlers read the request from the shared buffer, act on it, and send
//! their replies from the same buffer. The kernel wipes the buffer after
//! every dispatch.

pub mod commands;
pub mod query;
pub(crate) mod reply;

use crate::hal::Platform;
use crate::kernel::{Kernel, Step, REBOOT_REQUESTED};
use vpw_common::protocol::{Mode, ADDR_BROADCAST, ADDR_PCM, ADDR_TOOL, PRIORITY_BLOCK};

/// Handle the frame in the kernel's message buffer.
///
/// Frames not addressed to the controller, or not sent by the tool, are
/// dropped without a reply.
pub fn dispatch<H: Platform>(k: &mut Kernel<H>) -> Step {
    let (Some(priority), Some(destination), Some(source), Some(mode)) = (
        k.buffer.priority(),
        k.buffer.destination(),
        k.buffer.source(),
        k.buffer.mode(),
    ) else {
        return Step::Continue;
    };

    if !matches!(destination, ADDR_PCM | ADDR_BROADCAST) || source != ADDR_TOOL {
        trace!("not for us: {=u8:#x} -> {=u8:#x}", source, destination);
        return Step::Continue;
    }

    let submode = k.buffer.submode();
    debug!("mode {} submode {=u8:#x}", mode, submode);

    match mode {
        Mode::ExitKernel => Step::Reboot(REBOOT_REQUESTED | (k.stats.iterations & 0x00FF_FFFF)),
        Mode::WriteRequest => commands::handle_write_request(k),
        Mode::Read => commands::handle_read(k),
        Mode::Write if priority == PRIORITY_BLOCK => commands::handle_write(k),
        Mode::Write => Step::Continue,
        Mode::ReadAlternate => {
            reply::tool_present(k, [0xB2, mode.into(), 0x00, 0x00]);
            Step::Continue
        }
        Mode::Query => query::dispatch_query(k, submode),
        Mode::ToolPresent => Step::Continue,
        Mode::Other(other) => {
            reply::tool_present(k, [0xAA, source, other, submode]);
            Step::Continue
        }
    }
}
