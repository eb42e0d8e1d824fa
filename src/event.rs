//! Event kinds and the dispatch table.
//!
//! Each event kind is bound to one bit position in the per-hart pending
//! word. The processor walks pending bits in ascending order and dispatches
//! through a table of tagged actions, so new kinds can be added at init time
//! without touching the processing loop. Bits with no registered action are
//! skipped: a newer sender must never fault an older processor.

use spin::Once;

use crate::error::{Error, Result};
use crate::hart::HartId;

/// Number of event-kind bit positions the dispatch table covers.
pub const MAX_EVENT_KINDS: usize = 32;

/// An event kind, identified by its bit position in the pending word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IpiKind(u32);

impl IpiKind {
    /// Raise the destination hart's deferred software-interrupt flag.
    pub const SOFT: Self = Self(0);
    /// Run the destination hart's remote-fence queue.
    pub const FENCE: Self = Self(1);
    /// Halt the destination hart.
    pub const HALT: Self = Self(2);

    /// First bit position available for platform-defined kinds.
    pub const FIRST_CUSTOM: u32 = 3;

    /// Creates a kind from a raw bit position.
    pub const fn from_index(index: u32) -> Option<Self> {
        if index < MAX_EVENT_KINDS as u32 {
            Some(Self(index))
        } else {
            None
        }
    }

    /// The bit position of this kind.
    pub const fn index(self) -> u32 {
        self.0
    }

    /// The single-bit mask of this kind in a pending word.
    pub const fn bit(self) -> usize {
        1 << self.0
    }
}

/// A handler for a platform-defined event kind.
///
/// Runs in interrupt context on the destination hart; must not block.
pub trait EventHandler: Sync {
    fn handle(&self, hart: HartId);
}

/// What the processor does when a kind's bit is pending.
#[derive(Clone, Copy)]
pub enum EventAction {
    /// Raise the local deferred software-interrupt flag.
    RaiseSoft,
    /// Drain and execute the local remote-fence queue.
    Fence,
    /// Terminate firmware execution on this hart.
    Halt,
    /// Run a platform-defined handler.
    Custom(&'static dyn EventHandler),
}

/// The per-kind dispatch table.
///
/// Slots are write-once: registration happens on the cold-boot hart before
/// secondary harts start processing, so lookups stay lock-free.
pub struct EventTable {
    slots: [Once<EventAction>; MAX_EVENT_KINDS],
}

impl EventTable {
    /// Creates an empty table.
    pub const fn new() -> Self {
        Self {
            slots: [const { Once::new() }; MAX_EVENT_KINDS],
        }
    }

    /// Binds `kind` to `action`. Fails if the slot is already bound.
    pub fn register(&self, kind: IpiKind, action: EventAction) -> Result<()> {
        let slot = &self.slots[kind.index() as usize];
        if slot.get().is_some() {
            return Err(Error::InvalidArgument);
        }
        slot.call_once(|| action);
        Ok(())
    }

    /// Looks up the action bound to bit position `index`, if any.
    pub fn action(&self, index: usize) -> Option<&EventAction> {
        self.slots.get(index).and_then(Once::get)
    }
}
