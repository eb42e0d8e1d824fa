//! Hart discovery from a flattened device tree.
//!
//! Builds a [`HartRegistry`] from the `/cpus` nodes of the blob the previous
//! boot stage hands over. Harts with `status = "disabled"` are registered
//! but marked disabled so the id space stays dense.

use fdt::Fdt;

use crate::error::{Error, Result};
use crate::hart::{HartId, HartRegistry, MAX_HARTS};

/// Populates a registry from a device tree blob.
pub fn discover(blob: &[u8]) -> Result<HartRegistry> {
    let tree = Fdt::new(blob).map_err(|_| Error::InvalidArgument)?;
    let registry = HartRegistry::new();

    for cpu in tree.cpus() {
        let id = cpu.ids().first();
        if id >= MAX_HARTS {
            log::debug!("dtb: ignoring hart {} beyond MAX_HARTS", id);
            continue;
        }
        let hart = HartId::new(id as u32);
        registry.mark_available(hart);

        let status = cpu.property("status").and_then(|p| p.as_str());
        if status == Some("disabled") {
            registry.set_disabled(hart, true);
        }
    }

    if registry.available_mask() == 0 {
        return Err(Error::InvalidArgument);
    }
    Ok(registry)
}
