use crate::{ContextId, ContextTable, KERNEL_CONTEXT, Mmu};
use core::fmt;
use core::hint::spin_loop;
use core::num::NonZeroU64;
use core::sync::atomic::{AtomicU16, AtomicU64, Ordering};

static NEXT_PMAP_ID: AtomicU64 = AtomicU64::new(1);

/// Published-id marker while one thread is claiming a new id for the pmap.
const CLAIMING: u16 = 0x100;

/// Identity of an address space, stable for its whole lifetime.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PmapId(NonZeroU64);

impl PmapId {
    fn next() -> Self {
        let raw = NEXT_PMAP_ID.fetch_add(1, Ordering::Relaxed);
        match NonZeroU64::new(raw) {
            Some(v) => Self(v),
            None => unreachable!("pmap id counter wrapped"),
        }
    }

    #[inline]
    pub(crate) const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for PmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pmap#{}", self.0)
    }
}

/// Address-space descriptor of one process.
///
/// Carries the translation id the MMU uses for this address space. The id is
/// allocated on first use. One thread at a time claims it, so threads of the
/// same process racing through [`context`](Self::context) agree on a single
/// id and take at most one id away from another address space.
pub struct Pmap {
    id: PmapId,
    /// A context id, [`KERNEL_CONTEXT`] for none, or [`CLAIMING`].
    ctx: AtomicU16,
}

impl Default for Pmap {
    fn default() -> Self {
        Self::new()
    }
}

impl Pmap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: PmapId::next(),
            ctx: AtomicU16::new(u16::from(KERNEL_CONTEXT)),
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> PmapId {
        self.id
    }

    /// The published id, without checking whether it was stolen since.
    #[inline]
    #[must_use]
    pub fn cached_context(&self) -> Option<ContextId> {
        Self::decode(self.ctx.load(Ordering::Acquire))
    }

    #[inline]
    fn decode(raw: u16) -> Option<ContextId> {
        u8::try_from(raw).ok().and_then(ContextId::new)
    }

    /// Get this address space's translation id, allocating one if needed.
    ///
    /// Returns the published id while `table` still lists this pmap as its
    /// owner. Otherwise the calling thread marks the pmap as claiming, takes
    /// a fresh id and publishes it; other threads of the same process wait
    /// for that id instead of claiming their own.
    pub fn context<M: Mmu + ?Sized>(&self, table: &ContextTable, mmu: &M) -> ContextId {
        loop {
            let current = self.ctx.load(Ordering::Acquire);
            if current == CLAIMING {
                spin_loop();
                continue;
            }
            if let Some(ctx) = Self::decode(current)
                && table.is_owned_by(ctx, self.id)
            {
                return ctx;
            }

            if self
                .ctx
                .compare_exchange(current, CLAIMING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                continue;
            }
            // another thread may have claimed and published the same value
            // between our load and the swap
            if let Some(ctx) = Self::decode(current)
                && table.is_owned_by(ctx, self.id)
            {
                self.ctx.store(current, Ordering::Release);
                return ctx;
            }
            let fresh = table.claim(self.id, mmu);
            self.ctx.store(u16::from(fresh.get()), Ordering::Release);
            return fresh;
        }
    }

    /// Hand the translation id back, e.g. when the address space is torn down.
    pub fn release(&self, table: &ContextTable) {
        let previous = loop {
            let current = self.ctx.load(Ordering::Acquire);
            if current == CLAIMING {
                spin_loop();
                continue;
            }
            if self
                .ctx
                .compare_exchange(
                    current,
                    u16::from(KERNEL_CONTEXT),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                break current;
            }
        };
        if let Some(ctx) = Self::decode(previous)
            && table.release(ctx, self.id)
        {
            log::debug!("context {ctx} released by {:?}", self.id);
        }
    }
}

impl fmt::Debug for Pmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pmap")
            .field("id", &self.id)
            .field("ctx", &self.ctx.load(Ordering::Relaxed))
            .finish()
    }
}
