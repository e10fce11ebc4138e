use kernel_trap::Errno;

/// Condition register bit CR0\[SO\]: the syscall failed and `r3` is an errno.
const CR0_SO: u32 = 0x1000_0000;

/// Register state saved on `sc` entry (PowerPC SVR4 syscall convention).
///
/// - `r0`: system call number
/// - `r3`..`r8`: arguments
/// - on return `r3` holds the result, or the errno with CR0\[SO\] set
#[derive(Debug, Default, Clone)]
#[repr(C)]
pub struct TrapFrame {
    pub fixreg: [u32; 32],
    pub lr: u32,
    pub cr: u32,
    pub xer: u32,
    pub ctr: u32,
    pub srr0: u32,
    pub srr1: u32,
}

impl TrapFrame {
    /// Frame for calling `sysno` with up to six arguments.
    #[must_use]
    pub fn syscall(sysno: u32, args: &[u32]) -> Self {
        let mut tf = Self::default();
        tf.fixreg[0] = sysno;
        for (reg, &arg) in tf.fixreg[3..9].iter_mut().zip(args) {
            *reg = arg;
        }
        tf
    }

    #[inline]
    #[must_use]
    pub const fn sysno(&self) -> u32 {
        self.fixreg[0]
    }

    /// Argument `n` (0-based), taken from `r3 + n`.
    #[inline]
    #[must_use]
    pub const fn arg(&self, n: usize) -> u32 {
        self.fixreg[3 + n]
    }

    pub fn set_result(&mut self, result: Result<u32, Errno>) {
        match result {
            Ok(v) => {
                self.fixreg[3] = v;
                self.cr &= !CR0_SO;
            }
            Err(errno) => {
                self.fixreg[3] = errno.get().unsigned_abs();
                self.cr |= CR0_SO;
            }
        }
    }

    /// Decode the result the way the user-side stub does.
    ///
    /// # Errors
    /// Returns the errno when CR0\[SO\] is set.
    pub fn result(&self) -> Result<u32, Errno> {
        if self.cr & CR0_SO == 0 {
            Ok(self.fixreg[3])
        } else {
            Err(Errno::from_raw(i32::try_from(self.fixreg[3]).unwrap_or(i32::MAX)))
        }
    }
}
