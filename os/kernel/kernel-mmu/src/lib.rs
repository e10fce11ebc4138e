//! # Address-Space Contexts (4xx software-managed TLB)
//!
//! The 4xx cores tag every TLB entry with an 8-bit translation id, the `PID`.
//! Only the entries whose tag matches the current `PID` register (or tag 0)
//! take part in translation, so exactly one user address space is visible at a
//! time and switching between user and kernel mappings is a matter of
//! rewriting `PID`.
//!
//! ## What you get
//! - [`ContextId`]: a user translation id (never the kernel's id 0).
//! - [`ContextTable`]: the id → owner table, with lock-free allocation and
//!   round-robin stealing once all ids are handed out.
//! - [`Pmap`]: the per-process address-space descriptor carrying its lazily
//!   allocated, atomically published [`ContextId`].
//! - [`Mmu`]: the hardware seam: *switch to a context, perform one access,
//!   switch back*.
//! - `SoftMmu` (feature `soft`): a software model of the above for hosted use.
//!
//! ## Context lifecycle
//!
//! ```text
//!   Pmap::new ──► ctx = none
//!        │
//!        ▼ Pmap::context()
//!   claim free id ──► publish (CAS) ──► ctx = n ◄──┐
//!        │                                 │       │ fast path while the
//!        │ table full                      │       │ table still lists us
//!        ▼                                 ▼       │
//!   steal cursor id, flush it        other pmap steals n ──► reallocate
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

#[cfg(feature = "soft")]
extern crate alloc;

mod context;
mod mmu;
mod pmap;
#[cfg(feature = "soft")]
mod soft;

pub use context::{ContextId, ContextTable};
pub use mmu::Mmu;
pub use pmap::{Pmap, PmapId};
#[cfg(feature = "soft")]
pub use soft::{MapError, Protection, SoftMmu};

/// Number of hardware translation ids (`PID` is 8 bits wide).
pub const NUM_CONTEXTS: usize = 256;

/// Translation id the kernel runs under; never handed to a user pmap.
pub const KERNEL_CONTEXT: u8 = 0;

/// Lowest id available to user address spaces.
pub const MIN_USER_CONTEXT: u8 = KERNEL_CONTEXT + 1;

/// Number of ids available to user address spaces.
pub const USER_CONTEXTS: usize = NUM_CONTEXTS - MIN_USER_CONTEXT as usize;
