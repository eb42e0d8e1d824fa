//! Per-hart scratch store.
//!
//! Every hart owns a small private region with an identical layout, laid out
//! at boot by a process-wide bump allocator. A slot allocated once is valid
//! at the same offset in every hart's region, which is what lets a sender
//! reach a destination hart's state given only (hart id, offset).
//!
//! This is the one place the cross-hart hardware contract meets raw
//! pointers; everything above it goes through typed [`PerHart`] handles.

use core::{
    cell::UnsafeCell,
    fmt,
    marker::PhantomData,
    mem,
    sync::atomic::{AtomicUsize, Ordering},
};

use arrayvec::ArrayVec;
use spin::Mutex;

use crate::error::{Error, Result};
use crate::hart::{HartId, MAX_HARTS};

/// Bytes of scratch space per hart.
pub const SCRATCH_SIZE: usize = 1024;

/// Guaranteed alignment of every hart's region, and therefore the maximum
/// alignment a slot type may require.
pub const REGION_ALIGN: usize = 16;

/// Maximum number of labeled allocations tracked for diagnostics.
const MAX_ALLOCATIONS: usize = 16;

/// Types that may live in the scratch store.
///
/// # Safety
///
/// The all-zeroes bit pattern must be a valid value of the type (slots are
/// zero-initialized, never constructed in place), and the type must tolerate
/// shared references from any hart, i.e. mutate itself only through interior
/// atomics.
pub unsafe trait ScratchValue: Sync {}

// SAFETY: zero is a valid atomic and atomics are Sync by construction.
unsafe impl ScratchValue for AtomicUsize {}

/// One hart's private region.
///
/// The explicit alignment is what makes slot offsets meaningful: `alloc`
/// aligns offsets relative to the region start, so the start itself must be
/// at least as aligned as any slot type.
#[repr(align(16))]
struct Region(UnsafeCell<[u8; SCRATCH_SIZE]>);

// SAFETY: the region's bytes are only ever reinterpreted through `PerHart`
// handles, which point at disjoint allocator-reserved slots of `ScratchValue`
// types; no `&mut` into a region is ever created after boot.
unsafe impl Sync for Region {}

impl Region {
    const fn new() -> Self {
        Self(UnsafeCell::new([0; SCRATCH_SIZE]))
    }
}

/// A labeled allocation record, kept for diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct Allocation {
    /// Diagnostic label given at allocation time.
    pub label: &'static str,
    /// Offset of the slot inside every hart's region.
    pub offset: usize,
    /// Size of the slot in bytes.
    pub size: usize,
}

/// The per-hart scratch store and its offset allocator.
///
/// The allocator state (the next free offset) is process-wide: an offset
/// handed out on the cold-boot hart is valid on every hart.
pub struct ScratchStore {
    regions: [Region; MAX_HARTS],
    next: AtomicUsize,
    allocations: Mutex<ArrayVec<Allocation, MAX_ALLOCATIONS>>,
}

impl ScratchStore {
    /// Creates a store with all regions zeroed and no slots allocated.
    pub const fn new() -> Self {
        Self {
            regions: [const { Region::new() }; MAX_HARTS],
            next: AtomicUsize::new(0),
            allocations: Mutex::new(ArrayVec::new_const()),
        }
    }

    /// Allocates one slot of `T` in every hart's region.
    ///
    /// Returns the typed handle resolving the slot for any hart,
    /// `Error::OutOfMemory` once the regions are exhausted, or
    /// `Error::InvalidArgument` for a `T` more aligned than the regions.
    pub fn alloc<T: ScratchValue>(&self, label: &'static str) -> Result<PerHart<T>> {
        let size = mem::size_of::<T>();
        let align = mem::align_of::<T>();
        if align > REGION_ALIGN {
            return Err(Error::InvalidArgument);
        }

        let mut current = self.next.load(Ordering::Relaxed);
        let offset = loop {
            let start = (current + align - 1) & !(align - 1);
            let end = start.checked_add(size).ok_or(Error::OutOfMemory)?;
            if end > SCRATCH_SIZE {
                return Err(Error::OutOfMemory);
            }
            match self.next.compare_exchange_weak(
                current,
                end,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break start,
                Err(actual) => current = actual,
            }
        };

        // Diagnostics only; an overflowing table loses labels, not slots.
        let record = Allocation { label, offset, size };
        if self.allocations.lock().try_push(record).is_err() {
            log::debug!("scratch: allocation table full, dropping label {:?}", label);
        }

        Ok(PerHart {
            offset,
            _marker: PhantomData,
        })
    }

    /// Runs `f` over the labeled allocation records.
    pub fn with_allocations<R>(&self, f: impl FnOnce(&[Allocation]) -> R) -> R {
        f(&self.allocations.lock())
    }

    /// Logs the allocation map.
    pub fn dump(&self) {
        self.with_allocations(|allocations| {
            for a in allocations {
                log::debug!("scratch: {:#06x} +{:<4} {}", a.offset, a.size, a.label);
            }
        });
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }
}

/// A typed handle to one scratch slot, resolvable for any hart.
///
/// Cheap to copy; the handle carries only the offset, so it can live in
/// shared state and be resolved against the store from any hart.
pub struct PerHart<T> {
    offset: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for PerHart<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for PerHart<T> {}

// Manual impl: the handle is just an offset, `T` need not be `Debug`.
impl<T> fmt::Debug for PerHart<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerHart").field("offset", &self.offset).finish()
    }
}

impl<T: ScratchValue> PerHart<T> {
    /// Resolves this slot inside `hart`'s region.
    // The allocator reserved the slot with the alignment of `T`.
    #[allow(clippy::cast_ptr_alignment)]
    pub fn of<'a>(&self, store: &'a ScratchStore, hart: HartId) -> &'a T {
        let region = &store.regions[hart.index()];
        // SAFETY: the allocator reserved `[offset, offset + size_of::<T>())`
        // inside every region at an offset aligned for `T`, and refused any
        // `T` more aligned than `REGION_ALIGN`, which the region start
        // carries by its repr; the bytes were
        // zeroed at construction, which is a valid `T` per `ScratchValue`;
        // and nothing else reinterprets these bytes.
        unsafe { &*region.0.get().cast::<u8>().add(self.offset).cast::<T>() }
    }

    /// The offset of this slot inside every hart's region.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::Ordering;

    #[test]
    fn alloc_is_aligned_and_labeled() {
        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        let slot = store.alloc::<AtomicUsize>("test slot").unwrap();
        assert_eq!(slot.offset() % core::mem::align_of::<AtomicUsize>(), 0);
        store.with_allocations(|a| {
            assert_eq!(a.len(), 1);
            assert_eq!(a[0].label, "test slot");
            assert_eq!(a[0].size, core::mem::size_of::<AtomicUsize>());
        });
    }

    #[test]
    fn slots_are_disjoint_and_zeroed() {
        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        let a = store.alloc::<AtomicUsize>("a").unwrap();
        let b = store.alloc::<AtomicUsize>("b").unwrap();
        assert_ne!(a.offset(), b.offset());

        let hart = HartId::new(3);
        assert_eq!(a.of(store, hart).load(Ordering::Relaxed), 0);
        a.of(store, hart).store(7, Ordering::Relaxed);
        assert_eq!(b.of(store, hart).load(Ordering::Relaxed), 0);
    }

    #[test]
    fn offsets_identical_across_harts() {
        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        let slot = store.alloc::<AtomicUsize>("word").unwrap();
        slot.of(store, HartId::new(1)).store(11, Ordering::Relaxed);
        slot.of(store, HartId::new(2)).store(22, Ordering::Relaxed);
        assert_eq!(slot.of(store, HartId::new(1)).load(Ordering::Relaxed), 11);
        assert_eq!(slot.of(store, HartId::new(2)).load(Ordering::Relaxed), 22);
    }

    #[test]
    fn regions_carry_slot_alignment() {
        assert!(core::mem::align_of::<Region>() >= core::mem::align_of::<AtomicUsize>());
        assert_eq!(core::mem::align_of::<Region>(), REGION_ALIGN);

        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        let slot = store.alloc::<AtomicUsize>("word").unwrap();
        let addr = slot.of(store, HartId::new(0)) as *const AtomicUsize as usize;
        assert_eq!(addr % core::mem::align_of::<AtomicUsize>(), 0);
    }

    #[test]
    fn overaligned_type_is_rejected() {
        #[repr(align(32))]
        struct Wide(AtomicUsize);
        // SAFETY: zero is a valid atomic and the only mutation is atomic.
        unsafe impl ScratchValue for Wide {}

        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        assert_eq!(
            store.alloc::<Wide>("too wide").unwrap_err(),
            Error::InvalidArgument
        );
    }

    #[test]
    fn handles_are_copy_and_debuggable() {
        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        let slot = store.alloc::<AtomicUsize>("word").unwrap();
        let copy = slot;
        assert_eq!(copy.offset(), slot.offset());
        let repr = format!("{:?}", slot);
        assert!(repr.contains("offset"));
    }

    #[test]
    fn exhaustion_reports_out_of_memory() {
        let store: &'static ScratchStore = Box::leak(Box::new(ScratchStore::new()));
        let per_slot = core::mem::size_of::<AtomicUsize>();
        for _ in 0..(SCRATCH_SIZE / per_slot) {
            store.alloc::<AtomicUsize>("filler").unwrap();
        }
        assert_eq!(
            store.alloc::<AtomicUsize>("one too many").unwrap_err(),
            Error::OutOfMemory
        );
    }
}
