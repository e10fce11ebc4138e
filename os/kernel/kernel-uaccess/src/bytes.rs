use crate::{CopyError, UserAccess};
use kernel_memory_addresses::UserAddress;
use kernel_mmu::Mmu;

impl<M: Mmu + ?Sized> UserAccess<'_, M> {
    /// Copy exactly `dst.len()` bytes from user space.
    ///
    /// # Errors
    /// [`CopyError::BadAddress`] if any byte of the source faults. `dst` may
    /// be partially written.
    pub fn copyin(&self, src: UserAddress, dst: &mut [u8]) -> Result<(), CopyError> {
        if dst.is_empty() {
            return Ok(());
        }

        let (_guard, mut ctx) = self.enter();
        let mut addr = src;
        for slot in dst.iter_mut() {
            *slot = self.fetch(&mut ctx, addr)?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }

    /// Copy all of `src` out to user space.
    ///
    /// # Errors
    /// [`CopyError::BadAddress`] if any byte of the destination faults.
    /// Bytes before the fault stay written.
    pub fn copyout(&self, src: &[u8], dst: UserAddress) -> Result<(), CopyError> {
        if src.is_empty() {
            return Ok(());
        }

        let (_guard, mut ctx) = self.enter();
        let mut addr = dst;
        for &b in src {
            self.store(&mut ctx, addr, b)?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }
}
