use kernel_trap::Errno;

/// Why a copy between user and kernel memory failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CopyError {
    /// A user access faulted; carries the recovery point's error code.
    ///
    /// Bytes may already have been written to the destination.
    #[error("bad address ({0})")]
    BadAddress(Errno),
    /// The length budget ran out before a NUL terminator was copied.
    #[error("string too long: no terminator within {done} bytes")]
    NameTooLong { done: usize },
}

impl CopyError {
    /// Byte count a C caller would find in the `done` out-parameter.
    #[must_use]
    pub const fn done(&self) -> usize {
        match self {
            Self::BadAddress(_) => 0,
            Self::NameTooLong { done } => *done,
        }
    }

    #[must_use]
    pub const fn errno(&self) -> Errno {
        match self {
            Self::BadAddress(errno) => *errno,
            Self::NameTooLong { .. } => Errno::ENAMETOOLONG,
        }
    }
}

impl From<CopyError> for Errno {
    fn from(value: CopyError) -> Self {
        value.errno()
    }
}
