//! Boolean-like outcome values for operations whose failure is routine.

use std::fmt;
use std::ops::Not;

use crate::sys;

/// Success or failure of an operation that does not raise an error.
///
/// Converts to and from `bool`; `true` is success.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The operation succeeded
    Success,
    /// The operation failed; see [`crate::last_error`] for the native reason
    Failure,
}

impl Outcome {
    /// Maps a native status code, where `0` is success.
    pub(crate) const fn from_status(status: i32) -> Self {
        if status == 0 {
            Self::Success
        } else {
            Self::Failure
        }
    }

    /// Whether the operation succeeded.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether the operation failed.
    pub const fn is_failure(self) -> bool {
        !self.is_success()
    }
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> Self {
        outcome.is_success()
    }
}

impl Not for Outcome {
    type Output = bool;

    fn not(self) -> bool {
        self.is_failure()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure => f.write_str("failure"),
        }
    }
}

/// Result of an acquisition that may give up: try-locks and timed waits.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockStatus {
    /// The object was acquired
    Success,
    /// The object was not available in time (or, for a try, at all)
    TimedOut,
    /// The native call failed
    Error,
}

impl LockStatus {
    pub(crate) const fn from_status(status: i32) -> Self {
        match status {
            0 => Self::Success,
            sys::MUTEX_TIMEDOUT => Self::TimedOut,
            _ => Self::Error,
        }
    }

    /// Whether the object was acquired.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::TimedOut => f.write_str("timed_out"),
            Self::Error => f.write_str("error"),
        }
    }
}
