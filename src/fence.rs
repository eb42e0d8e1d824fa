//! Remote-fence queue interface.
//!
//! The queue that carries TLB/cache-shootdown requests between harts is an
//! external collaborator; this layer only coordinates with it around FENCE
//! deliveries. Its internal structure (capacity, broadcast handling) is its
//! own business.

use crate::error::{Error, Result};
use crate::hart::{HartId, LocalHart};

/// The remote-fence queue a FENCE delivery routes its payload through.
///
/// The pending word only carries "a fence happened"; the actual request
/// travels out-of-band through this queue, one entry per occurrence.
pub trait FenceQueue: Sync {
    /// The request payload carried to a destination hart.
    type Request;

    /// Initializes the queue. Called once per hart during bring-up.
    fn init(&self, cold_boot: bool) -> Result<()>;

    /// Queues `request` for execution on `dest`.
    fn enqueue(&self, dest: HartId, request: &Self::Request) -> Result<()>;

    /// Blocks until the last request this hart enqueued has been consumed
    /// by its destination. Bounded only by the destination eventually
    /// processing its interrupts.
    fn sync(&self, local: &LocalHart);

    /// Drains and executes every request queued for the local hart.
    fn process(&self, local: &LocalHart);
}

/// A fence queue for platforms without remote-fence support.
///
/// FENCE sends fail with `Error::NotSupported`; everything else is a no-op.
pub struct NoFence;

impl FenceQueue for NoFence {
    type Request = ();

    fn init(&self, _cold_boot: bool) -> Result<()> {
        Ok(())
    }

    fn enqueue(&self, _dest: HartId, _request: &()) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn sync(&self, _local: &LocalHart) {}

    fn process(&self, _local: &LocalHart) {}
}
