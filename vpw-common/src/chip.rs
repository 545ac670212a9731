// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash chip identity as reported by the vendor id sequence.

/// Manufacturer code in the upper 16 bits, device code in the lower 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashChipId(pub u32);

/// Which command set a chip speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashFamily {
    Intel,
    Amd,
}

pub const MANUFACTURER_INTEL: u16 = 0x0089;
pub const MANUFACTURER_AMD: u16 = 0x0001;

impl FlashChipId {
    /// Intel 28F400B, 512 KiB boot block.
    pub const INTEL_28F400B: FlashChipId = FlashChipId(0x0089_4471);
    /// Intel 28F800B, 1 MiB boot block.
    pub const INTEL_28F800B: FlashChipId = FlashChipId(0x0089_889D);
    /// AMD AM29F800BB, 1 MiB.
    pub const AMD_AM29F800BB: FlashChipId = FlashChipId(0x0001_2258);
    /// AMD AM29BL162C, 2 MiB burst mode.
    pub const AMD_AM29BL162C: FlashChipId = FlashChipId(0x0001_2203);
    /// AMD AM29BL802C, 1 MiB burst mode.
    pub const AMD_AM29BL802C: FlashChipId = FlashChipId(0x0001_2281);

    pub const fn from_parts(manufacturer: u16, device: u16) -> Self {
        FlashChipId(((manufacturer as u32) << 16) | device as u32)
    }

    pub const fn manufacturer(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn device(self) -> u16 {
        self.0 as u16
    }

    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Command set for the chips this kernel knows how to program.
    pub fn family(self) -> Option<FlashFamily> {
        match self {
            Self::INTEL_28F400B | Self::INTEL_28F800B => Some(FlashFamily::Intel),
            Self::AMD_AM29F800BB | Self::AMD_AM29BL162C | Self::AMD_AM29BL802C => {
                Some(FlashFamily::Amd)
            }
            _ => None,
        }
    }
}
