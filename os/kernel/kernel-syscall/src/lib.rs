//! # System-call dispatch for string-passing calls
//!
//! Handlers receive user pointers in the trap frame and pull or push strings
//! through [`UserAccess`]; they never touch user memory themselves.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod frame;

pub use frame::TrapFrame;

use kernel_memory_addresses::UserAddress;
use kernel_mmu::Mmu;
use kernel_trap::Errno;
use kernel_uaccess::UserAccess;

/// Longest message, including its terminator, accepted by [`Sysno::DebugWrite`].
pub const DEBUG_WRITE_MAX: usize = 256;

#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Sysno {
    /// Write a NUL-terminated user string to the kernel debug sink.
    ///
    /// `r3` = string, `r4` = length budget. Returns the bytes written,
    /// excluding the terminator.
    DebugWrite = 1,
    /// Copy the host name, NUL-terminated, into a user buffer.
    ///
    /// `r3` = buffer, `r4` = buffer length.
    GetHostname = 2,
}

impl TryFrom<u32> for Sysno {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::DebugWrite),
            2 => Ok(Self::GetHostname),
            other => Err(other),
        }
    }
}

/// Where [`Sysno::DebugWrite`] output goes (a serial port on hardware).
pub trait DebugSink {
    fn write_bytes(&self, bytes: &[u8]);
}

/// Kernel state the string syscalls need.
pub struct Syscalls<'k, S: DebugSink + ?Sized> {
    sink: &'k S,
    /// Host name including its NUL terminator.
    hostname: &'k [u8],
}

impl<'k, S: DebugSink + ?Sized> Syscalls<'k, S> {
    #[must_use]
    pub const fn new(sink: &'k S, hostname: &'k [u8]) -> Self {
        Self { sink, hostname }
    }

    /// Run the call described by `tf` on behalf of the thread behind `ua`.
    pub fn dispatch<M: Mmu + ?Sized>(&self, ua: &UserAccess<'_, M>, tf: &mut TrapFrame) {
        let result = match Sysno::try_from(tf.sysno()) {
            Ok(Sysno::DebugWrite) => self.debug_write(ua, tf.arg(0).into(), tf.arg(1)),
            Ok(Sysno::GetHostname) => self.get_hostname(ua, tf.arg(0).into(), tf.arg(1)),
            Err(unknown) => {
                log::debug!("unknown syscall {unknown}");
                Err(Errno::ENOSYS)
            }
        };
        tf.set_result(result);
    }

    fn debug_write<M: Mmu + ?Sized>(
        &self,
        ua: &UserAccess<'_, M>,
        msg: UserAddress,
        max_len: u32,
    ) -> Result<u32, Errno> {
        let mut buf = [0_u8; DEBUG_WRITE_MAX];
        let budget = usize::try_from(max_len).map_or(DEBUG_WRITE_MAX, |n| n.min(DEBUG_WRITE_MAX));
        let done = ua.copyinstr(msg, &mut buf[..budget])?;
        let text = &buf[..done.saturating_sub(1)];
        self.sink.write_bytes(text);
        u32::try_from(text.len()).map_err(|_| Errno::ENAMETOOLONG)
    }

    fn get_hostname<M: Mmu + ?Sized>(
        &self,
        ua: &UserAccess<'_, M>,
        buf: UserAddress,
        len: u32,
    ) -> Result<u32, Errno> {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        ua.copyoutstr(self.hostname, buf, len)?;
        Ok(0)
    }
}
