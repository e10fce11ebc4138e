use crate::{MIN_USER_CONTEXT, Mmu, NUM_CONTEXTS, PmapId, USER_CONTEXTS};
use core::fmt;
use core::num::NonZeroU8;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Owner slot value of an unused id.
const FREE: u64 = 0;

/// Translation id of a user address space.
///
/// ### Invariants
/// - Never equal to [`KERNEL_CONTEXT`](crate::KERNEL_CONTEXT).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContextId(NonZeroU8);

impl ContextId {
    /// Returns `None` for ids reserved to the kernel.
    #[inline]
    #[must_use]
    pub const fn new(raw: u8) -> Option<Self> {
        if raw < MIN_USER_CONTEXT {
            return None;
        }
        match NonZeroU8::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0.get()
    }

    /// Slot of this id in the [`ContextTable`].
    #[inline]
    fn index(self) -> usize {
        usize::from(self.0.get())
    }

    /// Id stored in table slot `index`.
    #[inline]
    fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index).ok().and_then(Self::new)
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextId({})", self.get())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.get(), f)
    }
}

/// Which address space currently owns each translation id.
///
/// Slots are claimed with compare-and-set, so allocation needs no lock. When
/// every user id is owned, the id under the round-robin cursor is taken away
/// from its owner and its stale translations are flushed from the TLB. The
/// previous owner notices on its next [`Pmap::context`](crate::Pmap::context)
/// call and allocates again.
///
/// An owner can lose its id between looking it up and using it. Accesses
/// through [`Mmu`] name the address space they are for, so such an access
/// misses instead of reaching the new owner's memory.
pub struct ContextTable {
    owners: [AtomicU64; NUM_CONTEXTS],
    cursor: AtomicUsize,
}

impl Default for ContextTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTable {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owners: [const { AtomicU64::new(FREE) }; NUM_CONTEXTS],
            cursor: AtomicUsize::new(0),
        }
    }

    /// The address space that owns `ctx`, if any.
    #[inline]
    #[must_use]
    pub fn owner(&self, ctx: ContextId) -> Option<PmapId> {
        PmapId::from_raw(self.owners[ctx.index()].load(Ordering::Acquire))
    }

    #[inline]
    #[must_use]
    pub fn is_owned_by(&self, ctx: ContextId, pmap: PmapId) -> bool {
        self.owners[ctx.index()].load(Ordering::Acquire) == pmap.get()
    }

    /// Number of user ids currently owned.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.owners[usize::from(MIN_USER_CONTEXT)..]
            .iter()
            .filter(|slot| slot.load(Ordering::Relaxed) != FREE)
            .count()
    }

    /// Hand a fresh id to `pmap`, stealing one if none is free.
    pub(crate) fn claim<M: Mmu + ?Sized>(&self, pmap: PmapId, mmu: &M) -> ContextId {
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);

        for step in 0..USER_CONTEXTS {
            let index = Self::slot_at(start.wrapping_add(step));
            if self.owners[index]
                .compare_exchange(FREE, pmap.get(), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                let ctx = Self::id_at(index);
                log::debug!("context {ctx} assigned to {pmap:?}");
                return ctx;
            }
        }

        let index = Self::slot_at(start);
        let ctx = Self::id_at(index);
        let victim = self.owners[index].swap(pmap.get(), Ordering::AcqRel);
        if let Some(victim) = PmapId::from_raw(victim) {
            log::debug!("context {ctx} stolen from {victim:?} for {pmap:?}");
            mmu.flush_context(ctx);
        }
        ctx
    }

    /// Give `ctx` back if `pmap` still owns it.
    ///
    /// Returns `false` when the id was stolen in the meantime.
    pub(crate) fn release(&self, ctx: ContextId, pmap: PmapId) -> bool {
        self.owners[ctx.index()]
            .compare_exchange(pmap.get(), FREE, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Map a cursor position onto a user slot index.
    #[inline]
    fn slot_at(position: usize) -> usize {
        usize::from(MIN_USER_CONTEXT) + position % USER_CONTEXTS
    }

    #[inline]
    fn id_at(index: usize) -> ContextId {
        match ContextId::from_index(index) {
            Some(ctx) => ctx,
            None => unreachable!("slot {index} is not a user context"),
        }
    }
}

impl fmt::Debug for ContextTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextTable")
            .field("in_use", &self.in_use())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}
