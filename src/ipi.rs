//! Inter-hart event notification engine.
//!
//! Any hart may ask one, several, or all other harts to run a small fixed
//! set of firmware-level actions. A send validates the target mask against
//! the hart registry, then for each target sets a bit in the target's
//! pending word, fences, and rings the target's doorbell. The target's trap
//! path calls [`Ipi::process`], which drains its word in one atomic exchange
//! and dispatches every set bit.
//!
//! # Design
//!
//! - No locks anywhere on the send/process path; the pending word's
//!   OR-set/exchange-clear discipline is the entire synchronization story.
//! - The bit update is fenced before the doorbell so a hart that takes the
//!   interrupt is guaranteed to observe the bit.
//! - FENCE deliveries are sequential: the sender blocks on the fence
//!   queue's sync before moving to the next target.

use core::sync::atomic::{fence, Ordering};

use spin::Once;

use crate::error::{Error, Result};
use crate::event::{EventAction, EventHandler, EventTable, IpiKind, MAX_EVENT_KINDS};
use crate::fence::FenceQueue;
use crate::hart::{HartId, HartMask, HartRegistry, LocalHart};
use crate::pending::Pending;
use crate::platform::Platform;
use crate::scratch::ScratchStore;

/// The inter-hart notification engine.
///
/// One instance is shared by every hart; all per-hart state lives in the
/// scratch store and is reached through it.
pub struct Ipi<'a, P: Platform, F: FenceQueue> {
    registry: &'a HartRegistry,
    scratch: &'a ScratchStore,
    platform: &'a P,
    fence_queue: &'a F,
    pending: Once<Pending>,
    table: EventTable,
}

impl<'a, P: Platform, F: FenceQueue> Ipi<'a, P, F> {
    /// Creates the engine with the built-in event kinds bound.
    ///
    /// The subsystem is not usable until [`Ipi::init`] has run on the
    /// cold-boot hart.
    pub fn new(
        registry: &'a HartRegistry,
        scratch: &'a ScratchStore,
        platform: &'a P,
        fence_queue: &'a F,
    ) -> Self {
        let table = EventTable::new();
        for (kind, action) in [
            (IpiKind::SOFT, EventAction::RaiseSoft),
            (IpiKind::FENCE, EventAction::Fence),
            (IpiKind::HALT, EventAction::Halt),
        ] {
            let registered = table.register(kind, action);
            debug_assert!(registered.is_ok());
        }
        Self {
            registry,
            scratch,
            platform,
            fence_queue,
            pending: Once::new(),
            table,
        }
    }

    /// Binds a platform-defined event kind to a handler.
    ///
    /// Must happen on the cold-boot hart before secondary harts start
    /// processing. Fails with `InvalidArgument` if the bit is already bound
    /// (the built-ins included).
    pub fn register_handler(&self, kind: IpiKind, handler: &'static dyn EventHandler) -> Result<()> {
        self.table.register(kind, EventAction::Custom(handler))
    }

    /// Sends event `kind` to the harts selected by `hmask << hbase`.
    ///
    /// Validation is all-or-nothing: a base beyond the highest available
    /// hart, or any requested hart outside availability, rejects the whole
    /// call with `InvalidArgument` and no delivery happens. An empty
    /// selection is a legal no-op. `data` is required for FENCE and handed
    /// to the fence queue per target; other kinds ignore it.
    ///
    /// Targets are notified in ascending hart order, the calling hart last,
    /// so the sender's own interrupt handler cannot re-enter mid-fan-out.
    pub fn send_many(
        &self,
        local: &LocalHart,
        hmask: usize,
        hbase: u32,
        kind: IpiKind,
        data: Option<&F::Request>,
    ) -> Result<()> {
        let avail = self.registry.available_mask();
        let last = self.registry.last_hart().ok_or(Error::InvalidArgument)?;
        if hbase > last.get() {
            // No hart exists at or above the base.
            return Err(Error::InvalidArgument);
        }

        // The available mask is a single word, so harts shifted beyond it
        // cannot exist either way.
        let shifted = hmask << hbase;
        if shifted & !avail != 0 {
            // At least one requested hart is not available.
            return Err(Error::InvalidArgument);
        }

        let targets = HartMask::from_bits(shifted & avail);
        if targets.is_empty() {
            return Ok(());
        }
        if kind == IpiKind::FENCE && data.is_none() {
            return Err(Error::InvalidArgument);
        }
        let pending = self.pending.get().ok_or(Error::OutOfMemory)?;

        // Every other hart first, in ascending order; the calling hart, if
        // selected, strictly last.
        let own = local.id();
        for hart in targets.iter().filter(|hart| *hart != own) {
            self.deliver(local, pending, hart, kind, data)?;
        }
        if targets.contains(own) {
            self.deliver(local, pending, own, kind, data)?;
        }

        Ok(())
    }

    fn deliver(
        &self,
        local: &LocalHart,
        pending: &Pending,
        hart: HartId,
        kind: IpiKind,
        data: Option<&F::Request>,
    ) -> Result<()> {
        if self.registry.is_disabled(hart) {
            log::trace!("ipi: skipping disabled hart {}", hart);
            return Ok(());
        }

        if kind == IpiKind::FENCE {
            if let Some(request) = data {
                // An enqueue failure aborts the remaining fan-out and is
                // surfaced to the caller; targets already notified stay
                // notified.
                self.fence_queue.enqueue(hart, request)?;
            }
        }

        pending.remote(self.scratch, hart).set(kind.index());
        // The bit must be globally visible before the doorbell lands, or
        // the destination could drain an empty word and lose the event.
        fence(Ordering::SeqCst);
        self.platform.ipi_send(hart);

        if kind == IpiKind::FENCE {
            self.fence_queue.sync(local);
        }
        Ok(())
    }

    /// Drains and dispatches the local pending word.
    ///
    /// Called from the local hart's trap entry on a doorbell interrupt. Runs
    /// to completion; a bit set by a sender after the atomic snapshot stays
    /// pending for the next call.
    pub fn process(&self, local: &LocalHart) {
        self.platform.ipi_clear(local);

        let Some(pending) = self.pending.get() else {
            return;
        };
        let mut bits = pending.local(self.scratch, local).take();

        while bits != 0 {
            let index = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            if index >= MAX_EVENT_KINDS {
                continue;
            }
            match self.table.action(index) {
                Some(EventAction::RaiseSoft) => self.platform.raise_soft(local),
                Some(EventAction::Fence) => self.fence_queue.process(local),
                Some(EventAction::Halt) => self.platform.hart_halt(),
                Some(EventAction::Custom(handler)) => handler.handle(local.id()),
                // Unknown kind: skip, newer senders must not fault us.
                None => {}
            }
        }
    }

    /// Clears the local deferred software-interrupt flag.
    ///
    /// Called by OS trap handlers acknowledging a SOFT event.
    pub fn clear_soft(&self, local: &LocalHart) {
        self.platform.clear_soft(local);
    }

    /// Brings the subsystem up on the calling hart.
    ///
    /// The cold-boot hart allocates the pending-word storage; every other
    /// hart fails with `OutOfMemory` until that has happened. Every boot,
    /// cold or warm, resets the local word and enables the local
    /// software-interrupt line.
    pub fn init(&self, local: &LocalHart, cold_boot: bool) -> Result<()> {
        if cold_boot && self.pending.get().is_none() {
            let pending = Pending::alloc(self.scratch)?;
            self.pending.call_once(|| pending);
        }
        let pending = self.pending.get().ok_or(Error::OutOfMemory)?;
        pending.local(self.scratch, local).reset();

        self.fence_queue.init(cold_boot)?;
        self.platform.ipi_init(cold_boot)?;

        self.platform.soft_irq_enable(local);
        log::debug!(
            "ipi: hart {} online ({})",
            local.id(),
            if cold_boot { "cold" } else { "warm" }
        );
        Ok(())
    }

    /// Takes the subsystem down on the calling hart.
    ///
    /// Pending events are flushed with one final [`Ipi::process`] before the
    /// doorbell hardware is torn down; nothing is dropped on shutdown.
    pub fn exit(&self, local: &LocalHart) {
        self.platform.soft_irq_disable(local);
        self.process(local);
        self.platform.ipi_exit();
        log::debug!("ipi: hart {} offline", local.id());
    }

    /// Diagnostic snapshot of `hart`'s pending word.
    pub fn pending_mask(&self, hart: HartId) -> usize {
        self.pending
            .get()
            .map_or(0, |pending| pending.peek(self.scratch, hart))
    }
}
