//! Error types raised by the wrapper layer.
//!
//! Two kinds of failure are kept apart:
//!
//! - [`Error::NullPointer`]: a caller handed a null pointer to an owning
//!   constructor. This is a contract violation and is never worth retrying.
//! - [`Error::Native`]: the native library could not create or open a resource.
//!   The message is the native diagnostic and the failure may be transient.
//!
//! Routine outcomes such as lock contention or an expired timeout are not errors;
//! they are reported through [`Outcome`](crate::core::Outcome) and
//! [`LockStatus`](crate::core::LockStatus).

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::sys;

/// Result alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the wrapper layer
#[derive(Error, Debug)]
pub enum Error {
    /// A null pointer was passed where an owned resource was required
    #[error("Null {0} pointer!")]
    NullPointer(&'static str),

    /// The native library reported a failure
    #[error("{context}: {message}")]
    Native {
        /// Operation that failed
        context: &'static str,
        /// Native diagnostic
        message: String,
    },

    /// Configuration could not be loaded or applied
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller broke a documented precondition
    ContractViolation,
    /// The native library or the environment failed
    Runtime,
    /// Configuration problem
    Config,
}

impl Error {
    /// Builds a [`Error::Native`] from the calling thread's native error string.
    pub fn native(context: &'static str) -> Self {
        let message = sys::get_error();
        log::warn!("{context}: {message}");
        Self::Native { context, message }
    }

    /// Which kind of failure this is.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NullPointer(_) => ErrorKind::ContractViolation,
            Self::Native { .. } => ErrorKind::Runtime,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether this is a contract violation by the caller.
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self.kind(), ErrorKind::ContractViolation)
    }
}
