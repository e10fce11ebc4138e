//! # User Address Types
//!
//! Strongly typed wrappers for addresses that live in a **user** address space
//! on the 32-bit 4xx PowerPC family.
//!
//! ## Overview
//!
//! The kernel never dereferences a user address directly. User addresses are
//! only meaningful together with the address-space context (the `PID` tag) of
//! the process that owns them, so they are kept apart from ordinary kernel
//! pointers at the type level:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`UserAddress`] | A raw 32-bit address in some process's address space. |
//! | [`UserPage`] | The page number of a [`PAGE_SIZE`] page in a user address space. |
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let ua = UserAddress::new(0x1000_0123);
//! let (page, off) = ua.split();
//! assert_eq!(page.base().as_u32(), 0x1000_0000);
//! assert_eq!(off, 0x123);
//! assert_eq!(page.join(off), ua);
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`, and
//!   `Hash`, making them suitable as map keys.
//! - Address arithmetic wraps like the hardware's effective-address adder does.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod user_address;
mod user_page;

pub use user_address::UserAddress;
pub use user_page::UserPage;

/// log2 of the base page size.
pub const PAGE_SHIFT: u32 = 12;

/// Base page size in bytes (4 KiB).
pub const PAGE_SIZE: u32 = 1 << PAGE_SHIFT;

/// Mask selecting the in-page offset bits.
pub const PAGE_MASK: u32 = PAGE_SIZE - 1;
