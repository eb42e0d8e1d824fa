//! # RISC-V 64-bit bindings
//!
//! The CLINT doorbell driver and the CSR plumbing that make up the real
//! [`Platform`](crate::platform::Platform) on RISC-V machine mode.

pub mod clint;
pub mod csr;

use crate::hart::{HartId, LocalHart};

/// Claims the local hart identity from `mhartid`.
///
/// # Safety
///
/// Must be called at most once per hart, by boot code, before anything else
/// uses the notification layer on this hart. `mhartid` must be dense on this
/// platform (or remapped by boot code before this point).
pub unsafe fn claim_local_hart() -> LocalHart {
    let id = csr::mhartid() as u32;
    unsafe { LocalHart::claim(HartId::new(id)) }
}
