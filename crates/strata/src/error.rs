//! Error taxonomy shared by the array container, typed views, and buffer handles.

use thiserror::Error;

use crate::host::dtype::ElementType;

/// Failures raised synchronously by buffer construction and checked conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Fresh allocation overflowed, exceeded the configured bound, or the allocator refused it.
    #[error("allocation failed: {reason}")]
    Allocation { reason: String },
    /// Typed conversion requested with an element type other than the stored one.
    #[error("element type mismatch: buffer holds {actual}, requested {expected}")]
    TypeMismatch {
        expected: ElementType,
        actual: ElementType,
    },
    /// Typed conversion requested with a rank other than the stored one.
    #[error("rank mismatch: buffer has {actual} dimensions, requested {expected}")]
    RankMismatch { expected: usize, actual: usize },
    /// Dimension accessor called with an index beyond the rank.
    #[error("dimension index {index} out of range for rank {rank}")]
    IndexOutOfRange { index: usize, rank: usize },
    /// Construction from an undefined or inconsistent source.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl BufferError {
    pub fn allocation(reason: impl Into<String>) -> Self {
        BufferError::Allocation {
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        BufferError::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by buffer routines.
pub type BufferResult<T> = Result<T, BufferError>;
