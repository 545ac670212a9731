// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RAM-resident recovery kernel for VPW engine controllers.
//!
//! The kernel is loaded into controller RAM by the factory bootstrap, takes
//! over the line controller, and serves read, write, flash and CRC requests
//! from a scan tool until it is told to reboot.
//!
//! All hardware access goes through the traits in [`hal`]. The `target`
//! feature supplies the memory-mapped implementation and the `KernelStart`
//! entry symbol; without it the crate builds on the host against a
//! simulated controller.

#![no_std]

#[macro_use]
mod logging;

pub mod config;
pub mod crc;
pub mod dispatch;
pub mod flash;
pub mod hal;
pub mod kernel;
pub mod timing;
pub mod transport;

#[cfg(feature = "target")]
pub mod entry;
#[cfg(feature = "target")]
pub mod mmio;

pub use config::{KernelConfig, Variant};
pub use kernel::{Kernel, Step};
pub use transport::{ReceiveError, Received, VpwTransport};
