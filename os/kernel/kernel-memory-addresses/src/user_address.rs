use crate::{PAGE_MASK, UserPage};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Address in a user address space.
///
/// A thin wrapper around a 32-bit effective address that denotes memory owned
/// by an unprivileged process. It carries no validation; whether the address
/// is mapped is only known to the MMU once the owning context is active.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let ua = UserAddress::new(0x1000_0000);
/// assert_eq!((ua + 4).as_u32(), 0x1000_0004);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UserAddress(u32);

impl UserAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The page containing this address.
    #[inline]
    #[must_use]
    pub const fn page(self) -> UserPage {
        UserPage::containing(self)
    }

    /// Offset of this address within its page.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.0 & PAGE_MASK
    }

    #[inline]
    #[must_use]
    pub const fn split(self) -> (UserPage, u32) {
        (self.page(), self.offset())
    }

    /// Advance by `n` bytes, wrapping at the top of the 32-bit space.
    #[inline]
    #[must_use]
    pub const fn wrapping_add(self, n: u32) -> Self {
        Self(self.0.wrapping_add(n))
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, n: u32) -> Option<Self> {
        match self.0.checked_add(n) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA(0x{:08X})", self.0)
    }
}

impl fmt::Display for UserAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for UserAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl From<UserAddress> for u32 {
    #[inline]
    fn from(a: UserAddress) -> Self {
        a.as_u32()
    }
}

impl From<UserPage> for UserAddress {
    fn from(value: UserPage) -> Self {
        value.base()
    }
}

impl Add<u32> for UserAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u32> for UserAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u32) {
        self.0 = self.0.wrapping_add(rhs);
    }
}
