// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Which part of a logical message a transport call carries.

use core::ops::BitOr;

/// Combinable segment flags.
///
/// A logical message starts with exactly one `START` call and ends with
/// exactly one `END` call. Calls in between are `MIDDLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment(u8);

impl Segment {
    pub const START: Segment = Segment(0x01);
    pub const MIDDLE: Segment = Segment(0x02);
    pub const END: Segment = Segment(0x04);
    /// Append the accumulated block checksum before closing the frame.
    pub const ADD_CHECKSUM: Segment = Segment(0x08);
    pub const COMPLETE: Segment = Segment(0x01 | 0x04);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Segment) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_start(self) -> bool {
        self.contains(Segment::START)
    }

    pub const fn is_end(self) -> bool {
        self.contains(Segment::END)
    }

    pub const fn adds_checksum(self) -> bool {
        self.contains(Segment::ADD_CHECKSUM)
    }
}

impl BitOr for Segment {
    type Output = Segment;

    fn bitor(self, rhs: Segment) -> Segment {
        Segment(self.0 | rhs.0)
    }
}
