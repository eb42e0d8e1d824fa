//! The per-hart pending-event word.
//!
//! One machine word per hart, bit *i* meaning "event kind *i* is pending".
//! The update discipline is the whole synchronization story of this layer:
//!
//! - remote harts only ever OR single bits in (set-union, so repeated sends
//!   of one kind coalesce into a single pending flag);
//! - the owning hart only ever clears by exchanging the whole word with
//!   zero, never by clearing individual bits.
//!
//! A bit set after the owner's exchange is not lost; it stays for the next
//! drain.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::hart::{HartId, LocalHart};
use crate::scratch::{PerHart, ScratchStore, ScratchValue};

/// The pending-event bitword living in each hart's scratch region.
#[repr(transparent)]
pub(crate) struct PendingWord(AtomicUsize);

// SAFETY: transparent over an atomic; zero (no event pending) is the valid
// boot state.
unsafe impl ScratchValue for PendingWord {}

/// The pending words of all harts, one scratch slot resolved per hart id.
pub(crate) struct Pending {
    slot: PerHart<PendingWord>,
}

impl Pending {
    /// Allocates the pending word storage. Cold boot only.
    pub fn alloc(store: &ScratchStore) -> Result<Self> {
        let slot = store.alloc::<PendingWord>("ipi pending")?;
        Ok(Self { slot })
    }

    /// The sender-side capability for `hart`'s word: set bits, nothing else.
    pub fn remote<'a>(&self, store: &'a ScratchStore, hart: HartId) -> RemotePending<'a> {
        RemotePending(self.slot.of(store, hart))
    }

    /// The owner-side capability for the local word.
    pub fn local<'a>(&self, store: &'a ScratchStore, local: &LocalHart) -> LocalPending<'a> {
        LocalPending(self.slot.of(store, local.id()))
    }

    /// Diagnostic snapshot of `hart`'s word.
    pub fn peek(&self, store: &ScratchStore, hart: HartId) -> usize {
        self.slot.of(store, hart).0.load(Ordering::Acquire)
    }
}

/// Write capability a sender holds on a destination hart's word.
pub(crate) struct RemotePending<'a>(&'a PendingWord);

impl RemotePending<'_> {
    /// Atomically sets bit `index`, safe against concurrent senders and a
    /// concurrent drain by the owner.
    pub fn set(&self, index: u32) {
        self.0 .0.fetch_or(1 << index, Ordering::Release);
    }
}

/// Drain capability the owning hart holds on its own word.
pub(crate) struct LocalPending<'a>(&'a PendingWord);

impl LocalPending<'_> {
    /// Atomically exchanges the word with zero, returning the snapshot.
    pub fn take(&self) -> usize {
        self.0 .0.swap(0, Ordering::AcqRel)
    }

    /// Resets the word. Boot-time only; discards anything pending.
    pub fn reset(&self) {
        self.0 .0.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hart::HartId;

    fn fixture() -> (&'static ScratchStore, Pending) {
        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        let pending = Pending::alloc(store).unwrap();
        (store, pending)
    }

    #[test]
    fn set_take_roundtrip() {
        let (store, pending) = fixture();
        let hart = HartId::new(1);
        let local = unsafe { LocalHart::claim(hart) };

        pending.remote(store, hart).set(0);
        pending.remote(store, hart).set(2);
        assert_eq!(pending.peek(store, hart), 0b101);

        assert_eq!(pending.local(store, &local).take(), 0b101);
        assert_eq!(pending.peek(store, hart), 0);
    }

    #[test]
    fn repeated_sets_coalesce() {
        let (store, pending) = fixture();
        let hart = HartId::new(2);
        let local = unsafe { LocalHart::claim(hart) };

        pending.remote(store, hart).set(0);
        pending.remote(store, hart).set(0);
        assert_eq!(pending.local(store, &local).take(), 0b1);
        assert_eq!(pending.local(store, &local).take(), 0);
    }

    #[test]
    fn words_are_per_hart() {
        let (store, pending) = fixture();
        pending.remote(store, HartId::new(0)).set(1);
        assert_eq!(pending.peek(store, HartId::new(0)), 0b10);
        assert_eq!(pending.peek(store, HartId::new(1)), 0);
    }
}
