//! Hart ids, hart masks and the hart registry.

use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

/// The maximum number of harts the runtime addresses.
///
/// Hart masks are single machine words, so the dense id space is capped at
/// one bit per word bit.
pub const MAX_HARTS: usize = usize::BITS as usize;

/// A dense number identifying one hart.
///
/// This is usually but not necessarily the same as the hardware `mhartid`;
/// boot code is responsible for the mapping being dense.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct HartId(u32);

impl HartId {
    /// The hart that performs cold boot.
    pub const BOOT: Self = Self::new(0);

    /// Creates a hart id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`MAX_HARTS`].
    pub const fn new(id: u32) -> Self {
        assert!(id < MAX_HARTS as u32);
        Self(id)
    }

    /// Returns the inner dense id.
    pub const fn get(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// The single-bit mask selecting this hart.
    pub const fn bit(self) -> usize {
        1 << self.0
    }
}

impl fmt::Debug for HartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[hart #{}]", self.0)
    }
}
impl fmt::Display for HartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bit-set of hart ids, one bit per dense id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HartMask(usize);

impl HartMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    /// Creates a mask from a raw bit word.
    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    /// A mask containing exactly one hart.
    pub const fn single(hart: HartId) -> Self {
        Self(hart.bit())
    }

    /// Returns the raw bit word.
    pub const fn bits(self) -> usize {
        self.0
    }

    /// Returns true if no hart is selected.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if `hart` is selected.
    pub const fn contains(self, hart: HartId) -> bool {
        self.0 & hart.bit() != 0
    }

    /// Iterates the selected harts in ascending id order.
    pub fn iter(self) -> impl Iterator<Item = HartId> {
        let mut bits = self.0;
        core::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let id = bits.trailing_zeros();
            bits &= bits - 1;
            Some(HartId::new(id))
        })
    }
}

/// Records which harts exist and which are administratively disabled.
///
/// Built once by boot code (by hand or from a device tree, see the `dtb`
/// feature) and shared read-mostly between all harts afterwards.
pub struct HartRegistry {
    /// One bit per hart that exists on this machine.
    available: AtomicUsize,
    /// One bit per hart the platform has fenced off. Disabled harts stay in
    /// `available` so the id space remains dense.
    disabled: AtomicUsize,
}

impl HartRegistry {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            available: AtomicUsize::new(0),
            disabled: AtomicUsize::new(0),
        }
    }

    /// Creates a registry with the given available mask.
    pub const fn with_mask(mask: usize) -> Self {
        Self {
            available: AtomicUsize::new(mask),
            disabled: AtomicUsize::new(0),
        }
    }

    /// Records that `hart` exists.
    pub fn mark_available(&self, hart: HartId) {
        self.available.fetch_or(hart.bit(), Ordering::Release);
    }

    /// Marks `hart` administratively disabled (or enabled again).
    ///
    /// Senders skip disabled destinations silently.
    pub fn set_disabled(&self, hart: HartId, disabled: bool) {
        if disabled {
            self.disabled.fetch_or(hart.bit(), Ordering::Release);
        } else {
            self.disabled.fetch_and(!hart.bit(), Ordering::Release);
        }
    }

    /// The mask of all harts that exist.
    pub fn available_mask(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    /// The highest available hart id, if any hart exists.
    pub fn last_hart(&self) -> Option<HartId> {
        let mask = self.available_mask();
        if mask == 0 {
            return None;
        }
        Some(HartId::new(usize::BITS - 1 - mask.leading_zeros()))
    }

    /// Returns true if `hart` is administratively disabled.
    pub fn is_disabled(&self, hart: HartId) -> bool {
        self.disabled.load(Ordering::Acquire) & hart.bit() != 0
    }
}

/// Proof that the holding code executes on hart `id`.
///
/// Exactly one value per hart may exist; it is the capability for the
/// owner-only operations (draining the local pending word, acking the local
/// doorbell). Deliberately neither `Clone` nor `Copy`.
pub struct LocalHart(HartId);

impl LocalHart {
    /// Claims the local hart identity.
    ///
    /// # Safety
    ///
    /// `id` must be the dense id of the hart this code is running on, and at
    /// most one `LocalHart` may exist per hart. Boot code claims it once and
    /// threads it through trap entry.
    pub unsafe fn claim(id: HartId) -> Self {
        Self(id)
    }

    /// The id of this hart.
    pub fn id(&self) -> HartId {
        self.0
    }
}

impl fmt::Debug for LocalHart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[local hart #{}]", self.0.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_iterates_ascending() {
        let mask = HartMask::from_bits(0b1011_0001);
        let ids: Vec<u32> = mask.iter().map(HartId::get).collect();
        assert_eq!(ids, vec![0, 4, 5, 7]);
    }

    #[test]
    fn empty_mask() {
        assert!(HartMask::EMPTY.is_empty());
        assert_eq!(HartMask::EMPTY.iter().count(), 0);
    }

    #[test]
    fn single_mask() {
        let mask = HartMask::single(HartId::new(3));
        assert!(mask.contains(HartId::new(3)));
        assert!(!mask.contains(HartId::new(2)));
    }

    #[test]
    fn registry_last_hart() {
        let registry = HartRegistry::new();
        assert_eq!(registry.last_hart(), None);

        registry.mark_available(HartId::new(0));
        registry.mark_available(HartId::new(5));
        assert_eq!(registry.last_hart(), Some(HartId::new(5)));
        assert_eq!(registry.available_mask(), 0b10_0001);
    }

    #[test]
    fn registry_disable_toggles() {
        let registry = HartRegistry::with_mask(0b1111);
        let hart = HartId::new(2);
        assert!(!registry.is_disabled(hart));
        registry.set_disabled(hart, true);
        assert!(registry.is_disabled(hart));
        registry.set_disabled(hart, false);
        assert!(!registry.is_disabled(hart));
    }

    #[test]
    fn hart_id_formats() {
        let hart = HartId::new(7);
        assert_eq!(format!("{}", hart), "#7");
        assert_eq!(format!("{:?}", hart), "[hart #7]");
    }
}
