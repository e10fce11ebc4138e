//! # Kernel ↔ User Memory Copies
//!
//! System-call handlers never dereference user pointers. They go through
//! [`UserAccess`], which
//!
//! 1. arms a recovery point on the calling thread's [`Pcb`], so a fault on a
//!    bad user address becomes [`CopyError::BadAddress`] instead of a kernel
//!    crash,
//! 2. makes sure the process's address space has a translation id
//!    ([`Pmap::context`]), and
//! 3. moves the data one byte at a time, switching the MMU to the user
//!    context for each user access and back to the kernel context for the
//!    kernel side.
//!
//! If the translation id is stolen by another address space partway through
//! a copy, the next user access misses, a new id is taken and the access is
//! repeated. The copy never reads or writes through another process's
//! tables.
//!
//! The recovery point is dropped on every exit path.
//!
//! ## Strings
//!
//! [`copyinstr`](UserAccess::copyinstr) and
//! [`copyoutstr`](UserAccess::copyoutstr) copy up to a length budget and stop
//! after the first NUL. The returned count includes the NUL. Running out of
//! budget first yields [`CopyError::NameTooLong`] with the full budget copied
//! and no terminator written. [`copystr`] does the same between two kernel
//! buffers.
//!
//! ## Fault reporting
//!
//! A fault always reports zero bytes done, even though bytes before the fault
//! have already been written. Callers must not trust the destination after
//! [`CopyError::BadAddress`].

#![cfg_attr(not(any(test, doctest)), no_std)]

mod bytes;
mod error;
mod string;

pub use error::CopyError;
pub use string::copystr;

use kernel_memory_addresses::UserAddress;
use kernel_mmu::{ContextId, ContextTable, Mmu, Pmap};
use kernel_trap::{DataStorageException, Errno, FaultGuard, Pcb, deliver_data_storage};

/// Longest path, including its terminator, that [`UserAccess::copyinpath`]
/// accepts.
pub const PATH_MAX: usize = 1024;

/// Copy primitives bound to the current thread and its process.
///
/// Holds the thread's [`Pcb`], which is `!Sync`, so a `UserAccess` cannot be
/// shared across threads.
pub struct UserAccess<'a, M: Mmu + ?Sized> {
    mmu: &'a M,
    contexts: &'a ContextTable,
    pmap: &'a Pmap,
    pcb: &'a Pcb,
}

impl<'a, M: Mmu + ?Sized> UserAccess<'a, M> {
    #[must_use]
    pub const fn new(mmu: &'a M, contexts: &'a ContextTable, pmap: &'a Pmap, pcb: &'a Pcb) -> Self {
        Self {
            mmu,
            contexts,
            pmap,
            pcb,
        }
    }

    /// Arm the recovery point, then make sure the pmap has a context.
    fn enter(&self) -> (FaultGuard<'a>, ContextId) {
        let guard = self.pcb.set_fault(Errno::EFAULT);
        let ctx = self.pmap.context(self.contexts, self.mmu);
        (guard, ctx)
    }

    fn fetch(&self, ctx: &mut ContextId, addr: UserAddress) -> Result<u8, CopyError> {
        loop {
            match self.mmu.fetch_byte(*ctx, self.pmap.id(), addr) {
                Ok(b) => return Ok(b),
                Err(exc) => self.reload_or_recover(ctx, &exc)?,
            }
        }
    }

    fn store(&self, ctx: &mut ContextId, addr: UserAddress, value: u8) -> Result<(), CopyError> {
        loop {
            match self.mmu.store_byte(*ctx, self.pmap.id(), addr, value) {
                Ok(()) => return Ok(()),
                Err(exc) => self.reload_or_recover(ctx, &exc)?,
            }
        }
    }

    /// A miss on a context that was stolen mid-copy is not the caller's
    /// fault: take a new id and let the access be retried. Anything else
    /// goes to the trap dispatcher.
    fn reload_or_recover(
        &self,
        ctx: &mut ContextId,
        exc: &DataStorageException,
    ) -> Result<(), CopyError> {
        if self.contexts.is_owned_by(*ctx, self.pmap.id()) {
            return Err(self.recover(exc));
        }
        let stale = *ctx;
        *ctx = self.pmap.context(self.contexts, self.mmu);
        log::debug!("context {stale} lost during copy, retrying with {ctx}");
        Ok(())
    }

    fn recover(&self, exc: &DataStorageException) -> CopyError {
        CopyError::BadAddress(deliver_data_storage(self.pcb, exc))
    }
}
