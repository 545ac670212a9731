// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Entry point called by the factory bootstrap once the kernel is in RAM.
//!
//! The bootstrap jumps here with interrupts already masked. All kernel
//! state lives in one static placed in `.kerneldata` by the linker script.

use crate::config::KernelConfig;
use crate::hal::Watchdog;
use crate::kernel::Kernel;
use crate::mmio::{Mmio, RegisterMap};
use core::cell::UnsafeCell;

const CONFIG: KernelConfig = KernelConfig::selected();

/// The kernel context in static storage.
struct KernelCell(UnsafeCell<Kernel<Mmio>>);

// SAFETY: the kernel runs single-threaded with interrupts masked; the cell
// is only borrowed once, from `KernelStart`.
unsafe impl Sync for KernelCell {}

#[link_section = ".kerneldata"]
static KERNEL: KernelCell = KernelCell(UnsafeCell::new(Kernel::new(
    Mmio::new(RegisterMap::for_variant(CONFIG.variant)),
    CONFIG,
)));

#[allow(non_snake_case)]
#[no_mangle]
#[link_section = ".kernelstart"]
pub extern "C" fn KernelStart() -> ! {
    // SAFETY: `KernelStart` is entered exactly once and never returns, so
    // this is the only reference to the kernel for the life of the program.
    let kernel = unsafe { &mut *KERNEL.0.get() };
    kernel.hw_mut().scratch();
    kernel.hw_mut().disable_dlc_interrupts();
    kernel.run()
}

/// Stop servicing the watchdog and let it reset the controller.
#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {
        core::hint::spin_loop();
    }
}
