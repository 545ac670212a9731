// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and utilities for the VPW recovery kernel.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for the controller build
//! - `std` feature: Enables `std` support for host tools and tests
//! - `defmt` feature: Derives `defmt::Format` on the shared types

#![cfg_attr(not(feature = "std"), no_std)]

pub mod checksum;
pub mod chip;
pub mod crc;
pub mod message;
pub mod protocol;
pub mod segment;

// Re-export commonly used types
pub use chip::{FlashChipId, FlashFamily};
pub use message::MessageBuffer;
pub use protocol::{DiagnosticSnapshot, Mode, Query};
pub use protocol::{ADDR_BROADCAST, ADDR_PCM, ADDR_TOOL, MAX_TRANSFER, MESSAGE_BUFFER_SIZE};
pub use segment::Segment;
