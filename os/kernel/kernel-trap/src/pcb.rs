use crate::Errno;
use core::cell::Cell;
use core::panic::Location;

/// A recovery point registered on a [`Pcb`].
///
/// Holds what the trap dispatcher needs to turn a fault into an ordinary error
/// return: the error code to hand back and, for diagnostics, where the guard
/// was armed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FaultBuf {
    errno: Errno,
    site: &'static Location<'static>,
}

impl FaultBuf {
    #[inline]
    #[must_use]
    pub const fn errno(&self) -> Errno {
        self.errno
    }

    #[inline]
    #[must_use]
    pub const fn site(&self) -> &'static Location<'static> {
        self.site
    }
}

/// Per-thread process control block.
///
/// Only the part the fault path needs is modelled: the on-fault slot consulted
/// by the trap dispatcher. A `Pcb` belongs to exactly one kernel thread and is
/// deliberately `!Sync`.
#[derive(Debug, Default)]
pub struct Pcb {
    on_fault: Cell<Option<FaultBuf>>,
    recovered: Cell<u64>,
}

impl Pcb {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            on_fault: Cell::new(None),
            recovered: Cell::new(0),
        }
    }

    /// The currently armed recovery point, if any.
    #[inline]
    #[must_use]
    pub fn on_fault(&self) -> Option<FaultBuf> {
        self.on_fault.get()
    }

    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.on_fault.get().is_some()
    }

    /// Number of faults this thread recovered from.
    #[inline]
    #[must_use]
    pub fn recovered_faults(&self) -> u64 {
        self.recovered.get()
    }

    /// Arm a recovery point that turns faults into `errno`.
    ///
    /// The point stays armed until the returned guard is dropped. An outer
    /// point armed earlier is restored at that time.
    #[track_caller]
    #[must_use = "the recovery point is cleared as soon as the guard is dropped"]
    pub fn set_fault(&self, errno: Errno) -> FaultGuard<'_> {
        let buf = FaultBuf {
            errno,
            site: Location::caller(),
        };
        let saved = self.on_fault.replace(Some(buf));
        FaultGuard { pcb: self, saved }
    }

    pub(crate) fn note_recovered(&self) {
        self.recovered.set(self.recovered.get().saturating_add(1));
    }
}

/// Scope of an armed recovery point; clears it on drop.
#[derive(Debug)]
pub struct FaultGuard<'p> {
    pcb: &'p Pcb,
    saved: Option<FaultBuf>,
}

impl FaultGuard<'_> {
    /// Recovery point installed by this guard.
    ///
    /// # Panics
    /// Panics if the slot was cleared behind the guard's back, which would
    /// leave the thread unprotected.
    #[must_use]
    pub fn fault_buf(&self) -> FaultBuf {
        match self.pcb.on_fault() {
            Some(buf) => buf,
            None => panic!("on-fault slot cleared while its guard is live"),
        }
    }
}

impl Drop for FaultGuard<'_> {
    fn drop(&mut self) {
        self.pcb.on_fault.set(self.saved.take());
    }
}
