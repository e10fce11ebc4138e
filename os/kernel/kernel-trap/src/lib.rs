//! # Kernel Trap Handling for Supervisor User-Memory Accesses
//!
//! When the kernel touches user memory it does so under a *recovery point*:
//! a [`FaultGuard`] armed on the current thread's [`Pcb`]. If the MMU raises
//! a [`DataStorageException`] while the point is armed,
//! [`deliver_data_storage`] turns the exception into the guard's error code
//! and the access returns normally. Without an armed point the same exception
//! is a kernel bug and is fatal.
//!
//! ```rust
//! # use kernel_trap::*;
//! # use kernel_memory_addresses::UserAddress;
//! let pcb = Pcb::new();
//! let exc = DataStorageException::tlb_miss(UserAddress::new(0x10), false);
//!
//! let errno = {
//!     let _guard = pcb.set_fault(Errno::EFAULT);
//!     deliver_data_storage(&pcb, &exc)
//! };
//! assert_eq!(errno, Errno::EFAULT);
//! assert!(!pcb.is_armed());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod errno;
mod pcb;
mod syndrome;

pub use errno::Errno;
pub use pcb::{FaultBuf, FaultGuard, Pcb};
pub use syndrome::{DataStorageException, Esr, FaultKind};

/// Dispatch a data-side exception taken by supervisor code on behalf of `pcb`.
///
/// Returns the armed recovery point's error code. The caller unwinds to the
/// recovery point by propagating that error.
///
/// # Panics
/// Panics when no recovery point is armed: the kernel faulted on a user
/// access it did not expect to fail.
#[must_use]
pub fn deliver_data_storage(pcb: &Pcb, exc: &DataStorageException) -> Errno {
    let Some(buf) = pcb.on_fault() else {
        panic!(
            "fatal kernel data storage fault at {}: {} (esr={:#010x})",
            exc.address,
            exc.explain(),
            exc.syndrome.into_bits()
        );
    };

    log::warn!(
        "recovered user fault at {}: {}; resuming at {} with {}",
        exc.address,
        exc.explain(),
        buf.site(),
        buf.errno()
    );
    pcb.note_recovered();
    buf.errno()
}
