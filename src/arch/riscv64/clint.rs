//! CLINT (Core Local Interruptor) doorbell driver.
//!
//! One 32-bit MSIP register per hart at `base + 4 * hart`; writing 1 raises
//! the machine software interrupt on that hart, writing 0 clears it. The
//! base address is board-specific and comes from the device tree.

use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::hart::{HartId, LocalHart};
use crate::platform::Platform;

use super::csr::{self, Mie, Mip};

/// The CLINT-backed doorbell platform.
pub struct Clint {
    base: AtomicUsize,
}

impl Clint {
    /// Creates an unbound driver; [`Clint::set_base`] must run before init.
    pub const fn new() -> Self {
        Self {
            base: AtomicUsize::new(0),
        }
    }

    /// Creates a driver bound to a known CLINT base address.
    pub const fn at(base: usize) -> Self {
        Self {
            base: AtomicUsize::new(base),
        }
    }

    /// Binds the board's CLINT base address (from the device tree).
    pub fn set_base(&self, base: usize) {
        self.base.store(base, Ordering::Release);
    }

    fn msip(&self, hart: HartId) -> Option<*mut u32> {
        let base = self.base.load(Ordering::Acquire);
        if base == 0 {
            return None;
        }
        Some((base + 4 * hart.index()) as *mut u32)
    }
}

impl Platform for Clint {
    fn ipi_init(&self, _cold_boot: bool) -> Result<()> {
        if self.base.load(Ordering::Acquire) == 0 {
            return Err(Error::Failed);
        }
        Ok(())
    }

    fn ipi_exit(&self) {}

    fn ipi_send(&self, hart: HartId) {
        if let Some(msip) = self.msip(hart) {
            unsafe { ptr::write_volatile(msip, 1) };
        }
    }

    fn ipi_clear(&self, local: &LocalHart) {
        if let Some(msip) = self.msip(local.id()) {
            unsafe { ptr::write_volatile(msip, 0) };
        }
    }

    fn soft_irq_enable(&self, _local: &LocalHart) {
        unsafe { csr::set_mie(Mie::MSIE) };
    }

    fn soft_irq_disable(&self, _local: &LocalHart) {
        unsafe { csr::clear_mie(Mie::MSIE) };
    }

    fn raise_soft(&self, _local: &LocalHart) {
        unsafe { csr::set_mip(Mip::SSIP) };
    }

    fn clear_soft(&self, _local: &LocalHart) {
        unsafe { csr::clear_mip(Mip::SSIP) };
    }

    fn hart_halt(&self) -> ! {
        unsafe { csr::clear_mie(Mie::MSIE) };
        loop {
            csr::wfi();
        }
    }
}
