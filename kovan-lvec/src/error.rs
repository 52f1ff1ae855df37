use core::fmt;

/// Errors returned by the non-blocking `try_*` operations of
/// [`LockingVector`](crate::LockingVector).
///
/// The blocking operations never return errors: they spin until the slot is
/// free and treat a bad index as a fatal precondition violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The index is past the end of the vector.
    OutOfBounds {
        /// Requested index.
        index: usize,
        /// Length of the vector.
        len: usize,
    },
    /// The slot is currently held by another owner.
    WouldBlock {
        /// Requested index.
        index: usize,
    },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::OutOfBounds { index, len } => {
                write!(
                    f,
                    "Index {} out of bounds for locking vector of length {}",
                    index, len
                )
            }
            LockError::WouldBlock { index } => {
                write!(f, "Slot {} is locked", index)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LockError {}
