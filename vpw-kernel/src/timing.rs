// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Delays built from platform spins with the watchdog serviced throughout.

use crate::config::Timing;
use crate::hal::Platform;
use embedded_hal::delay::DelayNs;

/// `DelayNs` over `Platform::spin`, scratching the watchdog every
/// `spins_per_service` spins.
pub struct WatchdogDelay<'a, H: Platform> {
    hw: &'a mut H,
    timing: Timing,
}

impl<'a, H: Platform> WatchdogDelay<'a, H> {
    pub fn new(hw: &'a mut H, timing: Timing) -> Self {
        Self { hw, timing }
    }

    /// Spin `count` times.
    pub fn spins(&mut self, count: u32) {
        let per_service = self.timing.spins_per_service.max(1);
        for i in 0..count {
            if i % per_service == 0 {
                self.hw.scratch();
            }
            self.hw.spin();
        }
        self.hw.scratch();
    }

    /// Pause between a reply and whatever follows it on the bus (~500 ms).
    pub fn long_pause(&mut self) {
        self.delay_ms(500);
    }

    /// Gap an ELM327-based tool needs before the next frame.
    pub fn elm_pause(&mut self) {
        self.delay_us(500);
    }

    /// Short pause in steps of 2.5 ms.
    pub fn variable_pause(&mut self, steps: u32) {
        self.delay_us(steps.saturating_mul(2500));
    }

    /// Settle time after switching the flash write enable.
    pub fn lock_settle(&mut self) {
        self.variable_pause(0x50);
    }
}

impl<H: Platform> DelayNs for WatchdogDelay<'_, H> {
    fn delay_ns(&mut self, ns: u32) {
        let spin_ns = self.timing.spin_ns.max(1);
        self.spins(ns.div_ceil(spin_ns));
    }
}
