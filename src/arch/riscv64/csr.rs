//! Machine-mode CSR accessors used by the notification layer.

use bitflags::bitflags;
use core::arch::asm;

bitflags! {
    /// Interrupt-pending bits in `mip`.
    #[derive(Clone, Copy, Debug)]
    pub struct Mip: usize {
        /// Supervisor software interrupt pending (the deferred soft flag the
        /// OS consumes).
        const SSIP = 1 << 1;
        /// Machine software interrupt pending (the doorbell itself).
        const MSIP = 1 << 3;
    }
}

bitflags! {
    /// Interrupt-enable bits in `mie`.
    #[derive(Clone, Copy, Debug)]
    pub struct Mie: usize {
        /// Machine software interrupt enable.
        const MSIE = 1 << 3;
    }
}

/// Reads `mhartid`.
pub fn mhartid() -> usize {
    let id: usize;
    unsafe {
        asm!("csrr {}, mhartid", out(reg) id, options(nomem, nostack));
    }
    id
}

/// Sets bits in `mip`.
///
/// # Safety
///
/// Raising interrupt-pending bits hands control flow to whatever handler is
/// installed for them.
pub unsafe fn set_mip(bits: Mip) {
    unsafe {
        asm!("csrrs zero, mip, {}", in(reg) bits.bits(), options(nomem, nostack));
    }
}

/// Clears bits in `mip`.
///
/// # Safety
///
/// See [`set_mip`].
pub unsafe fn clear_mip(bits: Mip) {
    unsafe {
        asm!("csrrc zero, mip, {}", in(reg) bits.bits(), options(nomem, nostack));
    }
}

/// Sets bits in `mie`.
///
/// # Safety
///
/// Enabling an interrupt line requires its handler to be installed first.
pub unsafe fn set_mie(bits: Mie) {
    unsafe {
        asm!("csrrs zero, mie, {}", in(reg) bits.bits(), options(nomem, nostack));
    }
}

/// Clears bits in `mie`.
///
/// # Safety
///
/// See [`set_mie`].
pub unsafe fn clear_mie(bits: Mie) {
    unsafe {
        asm!("csrrc zero, mie, {}", in(reg) bits.bits(), options(nomem, nostack));
    }
}

/// Waits for the next interrupt.
pub fn wfi() {
    unsafe {
        asm!("wfi", options(nomem, nostack));
    }
}
