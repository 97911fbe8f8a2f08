//! Scoped mutex acquisition

use std::marker::PhantomData;

use log::warn;

use crate::core::{Error, Result};
use crate::sync::Mutex;

/// Holds a [`Mutex`] for as long as it lives.
///
/// The mutex is locked in [`ScopedLock::new`] and unlocked when the guard is dropped,
/// whichever way the scope is left. If locking fails no guard is produced.
///
/// The native mutex can only be unlocked by the thread that locked it, so the
/// guard stays on that thread:
///
/// ```compile_fail
/// use castellan::sync::{Mutex, ScopedLock};
///
/// let mutex = Mutex::new().unwrap();
/// let lock = ScopedLock::new(&mutex).unwrap();
/// std::thread::scope(|s| {
///     s.spawn(move || drop(lock));
/// });
/// ```
#[derive(Debug)]
#[must_use = "the mutex is unlocked as soon as the guard is dropped"]
pub struct ScopedLock<'a> {
    mutex: &'a Mutex,
    _not_send: PhantomData<*const ()>,
}

impl<'a> ScopedLock<'a> {
    /// Locks `mutex`, blocking until it is available.
    pub fn new(mutex: &'a Mutex) -> Result<Self> {
        if mutex.lock().is_failure() {
            return Err(Error::native("Failed to lock mutex"));
        }
        Ok(Self { mutex, _not_send: PhantomData })
    }

    /// The locked mutex, for use with [`Condition::wait`](crate::sync::Condition::wait).
    pub const fn mutex(&self) -> &'a Mutex {
        self.mutex
    }
}

impl Drop for ScopedLock<'_> {
    fn drop(&mut self) {
        if self.mutex.unlock().is_failure() {
            warn!("Failed to unlock mutex: {}", crate::sys::get_error());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LockStatus;
    use std::sync::Arc;

    fn try_lock_elsewhere(mutex: &Arc<Mutex>) -> LockStatus {
        let other = Arc::clone(mutex);
        std::thread::spawn(move || {
            let status = other.try_lock();
            if status.is_success() {
                let _ = other.unlock();
            }
            status
        })
        .join()
        .unwrap_or(LockStatus::Error)
    }

    #[test]
    fn test_locked_for_scope_lifetime() {
        let mutex = Arc::new(Mutex::new().unwrap());
        {
            let lock = ScopedLock::new(&mutex).unwrap();
            assert_eq!(try_lock_elsewhere(&mutex), LockStatus::TimedOut);
            assert!(std::ptr::eq(lock.mutex(), &*mutex));
        }
        assert_eq!(try_lock_elsewhere(&mutex), LockStatus::Success);
        assert_eq!(mutex.try_lock(), LockStatus::Success);
        assert!(mutex.unlock().is_success());
    }

    #[test]
    fn test_released_on_early_return() {
        fn guarded(mutex: &Mutex, bail: bool) -> Result<u32> {
            let _lock = mutex.scoped()?;
            if bail {
                return Ok(0);
            }
            Ok(1)
        }

        let mutex = Arc::new(Mutex::new().unwrap());
        assert_eq!(guarded(&mutex, true).unwrap(), 0);
        assert_eq!(try_lock_elsewhere(&mutex), LockStatus::Success);
        assert_eq!(guarded(&mutex, false).unwrap(), 1);
        assert_eq!(try_lock_elsewhere(&mutex), LockStatus::Success);
    }

    #[test]
    fn test_released_on_panic() {
        let mutex = Arc::new(Mutex::new().unwrap());
        let inner = Arc::clone(&mutex);
        let result = std::thread::spawn(move || {
            let _lock = ScopedLock::new(&inner).unwrap();
            panic!("scope left by panic");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(mutex.try_lock(), LockStatus::Success);
        assert!(mutex.unlock().is_success());
    }
}
