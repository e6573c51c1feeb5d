//! Error taxonomy of the binding layer.
//!
//! Native status codes are opaque: a nonzero status becomes
//! [`KernelError::NativeFailure`] carrying the raw code unmodified, never a
//! reinterpreted variant.

use meshkernel_sys::LoadError;
use thiserror::Error;

/// Result type alias for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors surfaced by the binding layer.
///
/// None of these are retried automatically; partial mutation left behind by
/// a failed native call is the kernel's own concern.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The kernel library could not be located or loaded.
    #[error(transparent)]
    LibraryLoad(#[from] LoadError),

    /// Handle unknown or already released.
    #[error("kernel state {0} is unknown or already released")]
    InvalidHandle(i32),

    /// Malformed input rejected before any native invocation.
    #[error("invalid {context}: {reason}")]
    InvalidInput {
        /// What was being validated (e.g. `geometry list`).
        context: &'static str,
        reason: String,
    },

    /// The native call returned a nonzero status, carried through opaquely.
    #[error("`{operation}` failed with native status {code}")]
    NativeFailure {
        /// Entry-point name of the failing operation.
        operation: &'static str,
        /// Raw kernel status code.
        code: i32,
    },

    /// A foreign buffer allocation failed.
    #[error("failed to allocate a foreign buffer of {len} elements")]
    AllocationFailure { len: usize },

    /// An interactive-protocol operation was invoked out of order.
    #[error("`{operation}` not allowed in protocol state {state:?}")]
    StateFailure {
        operation: &'static str,
        state: crate::ortho::ProtocolState,
    },
}

impl KernelError {
    /// Create an invalid-input error.
    pub fn invalid_input(context: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            context,
            reason: reason.into(),
        }
    }

    /// The raw native status code, if this is a native failure.
    #[must_use]
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Self::NativeFailure { code, .. } => Some(*code),
            _ => None,
        }
    }
}
