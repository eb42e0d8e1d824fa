//! Platform doorbell and software-interrupt interface.
//!
//! The hardware side of the notification protocol: raising a doorbell
//! interrupt on a destination hart, acking the local one, and driving the
//! local software-interrupt machinery. On RISC-V this is the CLINT plus the
//! `mie`/`mip` CSRs (see `arch::riscv64`); tests substitute a recording
//! double.

use crate::error::Result;
use crate::hart::{HartId, LocalHart};

pub trait Platform: Sync {
    /// Initializes the doorbell hardware. Called once per hart at bring-up.
    fn ipi_init(&self, cold_boot: bool) -> Result<()>;

    /// Tears the doorbell hardware down on the local hart.
    fn ipi_exit(&self);

    /// Raises the doorbell interrupt on `hart`.
    fn ipi_send(&self, hart: HartId);

    /// Acks/clears the doorbell on the local hart.
    fn ipi_clear(&self, local: &LocalHart);

    /// Enables the local hardware software-interrupt line.
    fn soft_irq_enable(&self, local: &LocalHart);

    /// Disables the local hardware software-interrupt line.
    fn soft_irq_disable(&self, local: &LocalHart);

    /// Raises the local deferred software-interrupt flag. The OS trap path
    /// consumes it later; firmware does no further work for SOFT.
    fn raise_soft(&self, local: &LocalHart);

    /// Clears the local deferred software-interrupt flag.
    fn clear_soft(&self, local: &LocalHart);

    /// Terminates firmware execution on this hart.
    fn hart_halt(&self) -> !;
}
