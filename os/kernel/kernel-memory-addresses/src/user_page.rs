use crate::{PAGE_MASK, PAGE_SHIFT, UserAddress};
use core::fmt;
use core::ops::Range;

/// Page number of a 4 KiB page in a user address space.
///
/// ### Invariants
/// - `base()` is always page aligned.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct UserPage(u32);

impl UserPage {
    /// Page that contains `addr` (aligns down to page boundary).
    #[inline]
    #[must_use]
    pub const fn containing(addr: UserAddress) -> Self {
        Self(addr.as_u32() >> PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn from_number(number: u32) -> Self {
        Self(number & (u32::MAX >> PAGE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> UserAddress {
        UserAddress::new(self.0 << PAGE_SHIFT)
    }

    /// Combine this page with an in-page offset.
    #[inline]
    #[must_use]
    pub const fn join(self, offset: u32) -> UserAddress {
        UserAddress::new((self.0 << PAGE_SHIFT) | (offset & PAGE_MASK))
    }

    /// Pages touched by the byte range `[start, start + len)`.
    ///
    /// The range is clamped at the top of the address space.
    pub fn range_covering(start: UserAddress, len: u32) -> impl Iterator<Item = Self> {
        let pages: Range<u64> = if len == 0 {
            0..0
        } else {
            let first = u64::from(start.as_u32()) >> PAGE_SHIFT;
            let last = (u64::from(start.as_u32()) + u64::from(len) - 1).min(u64::from(u32::MAX))
                >> PAGE_SHIFT;
            first..last + 1
        };
        pages.filter_map(|n| u32::try_from(n).ok().map(Self))
    }
}

impl fmt::Debug for UserPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserPage({:#010X})", self.base().as_u32())
    }
}

impl fmt::Display for UserPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}
