use crate::{CopyError, UserAccess};
use core::ffi::CStr;
use kernel_memory_addresses::UserAddress;
use kernel_mmu::Mmu;

impl<M: Mmu + ?Sized> UserAccess<'_, M> {
    /// Copy a NUL-terminated string from user space into `dst`.
    ///
    /// At most `dst.len()` bytes are examined. On success the returned count
    /// includes the terminator and `dst[..count]` holds the string plus NUL.
    /// An empty `dst` is a no-op that succeeds with 0 without touching the
    /// MMU.
    ///
    /// # Errors
    /// - [`CopyError::BadAddress`] if reading `src` faults. Bytes before the
    ///   fault are left in `dst`, but the reported count is 0.
    /// - [`CopyError::NameTooLong`] if `dst.len()` bytes were copied without
    ///   meeting a NUL; `dst` is then full and not terminated.
    pub fn copyinstr(&self, src: UserAddress, dst: &mut [u8]) -> Result<usize, CopyError> {
        let len = dst.len();
        if len == 0 {
            return Ok(0);
        }

        let (guard, mut ctx) = self.enter();
        let mut resid = len;
        let mut last = 0;
        let mut addr = src;
        for slot in dst.iter_mut() {
            last = self.fetch(&mut ctx, addr)?;
            *slot = last;
            resid -= 1;
            if last == 0 {
                break;
            }
            addr = addr.wrapping_add(1);
        }
        drop(guard);

        let done = len - resid;
        if resid == 0 && last != 0 {
            log::trace!("copyinstr from {src}: no terminator within {len} bytes");
            return Err(CopyError::NameTooLong { done });
        }
        Ok(done)
    }

    /// Copy a NUL-terminated kernel string out to user space.
    ///
    /// At most `max_len` bytes are written, and never more than `src.len()`.
    /// A zero `max_len` succeeds with 0; an empty `src` fails as too long.
    /// Neither touches the MMU.
    ///
    /// # Errors
    /// - [`CopyError::BadAddress`] if writing `dst` faults; the count is 0.
    /// - [`CopyError::NameTooLong`] if the budget ran out before a NUL was
    ///   written.
    pub fn copyoutstr(
        &self,
        src: &[u8],
        dst: UserAddress,
        max_len: usize,
    ) -> Result<usize, CopyError> {
        if max_len == 0 {
            return Ok(0);
        }
        let len = max_len.min(src.len());
        if len == 0 {
            log::trace!("copyoutstr to {dst}: empty source has no terminator");
            return Err(CopyError::NameTooLong { done: 0 });
        }

        let (guard, mut ctx) = self.enter();
        let mut done = 0;
        let mut terminated = false;
        let mut addr = dst;
        for &b in &src[..len] {
            self.store(&mut ctx, addr, b)?;
            done += 1;
            if b == 0 {
                terminated = true;
                break;
            }
            addr = addr.wrapping_add(1);
        }
        drop(guard);

        if !terminated {
            log::trace!("copyoutstr to {dst}: no terminator within {len} bytes");
            return Err(CopyError::NameTooLong { done });
        }
        Ok(done)
    }

    /// Pull a path name from user space into `buf`.
    ///
    /// `buf` is usually a [`PATH_MAX`](crate::PATH_MAX) sized scratch buffer.
    ///
    /// # Errors
    /// Same as [`copyinstr`](Self::copyinstr).
    pub fn copyinpath<'b>(
        &self,
        src: UserAddress,
        buf: &'b mut [u8],
    ) -> Result<&'b CStr, CopyError> {
        let done = self.copyinstr(src, buf)?;
        CStr::from_bytes_until_nul(&buf[..done]).map_err(|_| CopyError::NameTooLong { done })
    }
}

/// Copy a NUL-terminated string between two kernel buffers.
///
/// Examines at most `min(src.len(), dst.len())` bytes; an empty `dst` is a
/// no-op. No fault recovery is involved, both sides are kernel memory.
///
/// # Errors
/// [`CopyError::NameTooLong`] if the budget ran out before a NUL was copied.
pub fn copystr(src: &[u8], dst: &mut [u8]) -> Result<usize, CopyError> {
    if dst.is_empty() {
        return Ok(0);
    }
    let len = src.len().min(dst.len());
    match src[..len].iter().position(|&b| b == 0) {
        Some(nul) => {
            dst[..=nul].copy_from_slice(&src[..=nul]);
            Ok(nul + 1)
        }
        None => {
            dst[..len].copy_from_slice(&src[..len]);
            Err(CopyError::NameTooLong { done: len })
        }
    }
}
