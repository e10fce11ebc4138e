use crate::{ContextId, PmapId};
use kernel_memory_addresses::UserAddress;
use kernel_trap::DataStorageException;

/// Supervisor access to user memory through the MMU.
///
/// Source and destination of a user copy live in different translation
/// contexts that cannot be active at the same time. Each method therefore
/// performs exactly **one** access: switch the MMU to `ctx`, touch `addr`,
/// switch back to the kernel context. Implementations must restore the
/// kernel context on every path, including when the access faults.
///
/// `space` names the address space `ctx` was resolved for. If `ctx` has been
/// handed to another address space since, the access must miss rather than
/// translate through the new owner's tables. The caller then sees the id is
/// gone and resolves a new one.
///
/// An `Err` means the hardware raised the exception. The caller must route it
/// through [`kernel_trap::deliver_data_storage`] so that the thread's armed
/// recovery point decides whether the fault is recoverable.
pub trait Mmu {
    /// Load the byte at `addr` of `space`, translated under context `ctx`.
    ///
    /// # Errors
    /// Returns the exception raised when `addr` has no valid translation in
    /// `ctx` or its protection forbids reads.
    fn fetch_byte(
        &self,
        ctx: ContextId,
        space: PmapId,
        addr: UserAddress,
    ) -> Result<u8, DataStorageException>;

    /// Store `value` at `addr` of `space`, translated under context `ctx`.
    ///
    /// # Errors
    /// Returns the exception raised when `addr` has no valid translation in
    /// `ctx` or its protection forbids writes.
    fn store_byte(
        &self,
        ctx: ContextId,
        space: PmapId,
        addr: UserAddress,
        value: u8,
    ) -> Result<(), DataStorageException>;

    /// Drop every cached translation tagged with `ctx`.
    fn flush_context(&self, ctx: ContextId);
}
