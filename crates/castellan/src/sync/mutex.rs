//! Recursive native mutex

use std::fmt;
use std::ptr::NonNull;

use log::debug;

use crate::core::{Deleter, Error, LockStatus, Outcome, Owning, PointerManager, Result};
use crate::sync::ScopedLock;
use crate::sys::sync::{self as native, NativeMutex};

/// Frees native mutexes.
pub struct MutexDeleter;

impl Deleter<NativeMutex> for MutexDeleter {
    unsafe fn delete(ptr: NonNull<NativeMutex>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::destroy_mutex(ptr.as_ptr()) }
    }
}

/// A mutual exclusion lock, created unlocked.
///
/// The lock is recursive: the thread holding it may lock it again and has to unlock
/// it the same number of times. Prefer [`ScopedLock`] over manual `lock`/`unlock`
/// pairs so that the lock is released on every path.
pub struct Mutex {
    mutex: PointerManager<Owning, NativeMutex, MutexDeleter>,
}

// SAFETY: the native mutex is internally synchronised and not tied to its creator.
unsafe impl Send for Mutex {}
// SAFETY: every operation on the native mutex is thread safe.
unsafe impl Sync for Mutex {}

impl Mutex {
    /// Creates an unlocked mutex.
    ///
    /// Fails with [`Error::Native`] if the native mutex cannot be created.
    pub fn new() -> Result<Self> {
        let ptr = native::create_mutex();
        if ptr.is_null() {
            return Err(Error::native("Failed to create mutex"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let mutex = unsafe { PointerManager::<Owning, _, _>::new(ptr, "mutex") }?;
        debug!("Created mutex {ptr:p}");
        Ok(Self { mutex })
    }

    /// Blocks until the calling thread holds the lock.
    ///
    /// Contention only delays the call; `Failure` means the native call failed.
    pub fn lock(&self) -> Outcome {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        Outcome::from_status(unsafe { native::lock_mutex(self.get()) })
    }

    /// Takes the lock if it is available, without blocking.
    ///
    /// Returns [`LockStatus::TimedOut`] if another thread holds it.
    pub fn try_lock(&self) -> LockStatus {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        LockStatus::from_status(unsafe { native::try_lock_mutex(self.get()) })
    }

    /// Releases one level of the lock held by the calling thread.
    pub fn unlock(&self) -> Outcome {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        Outcome::from_status(unsafe { native::unlock_mutex(self.get()) })
    }

    /// Locks and returns a guard that unlocks on drop.
    pub fn scoped(&self) -> Result<ScopedLock<'_>> {
        ScopedLock::new(self)
    }

    /// The native mutex pointer.
    pub fn get(&self) -> *mut NativeMutex {
        self.mutex.get()
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").field("data", &self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::sys::{fail_next, NativeCall};
    use std::sync::Arc;

    #[test]
    fn test_lock_and_unlock() {
        let mutex = Mutex::new().unwrap();
        assert!(mutex.lock().is_success());
        assert!(mutex.unlock().is_success());
        assert!(mutex.unlock().is_failure());
    }

    #[test]
    fn test_try_lock_from_other_thread() {
        let mutex = Arc::new(Mutex::new().unwrap());
        assert!(mutex.lock().is_success());

        let other = Arc::clone(&mutex);
        let status = std::thread::spawn(move || other.try_lock()).join().unwrap();
        assert_eq!(status, LockStatus::TimedOut);

        assert!(mutex.unlock().is_success());
        let other = Arc::clone(&mutex);
        let status = std::thread::spawn(move || {
            let status = other.try_lock();
            let _ = other.unlock();
            status
        })
        .join()
        .unwrap();
        assert_eq!(status, LockStatus::Success);
    }

    #[test]
    fn test_native_failure_is_runtime_error() {
        fail_next(NativeCall::CreateMutex);
        let error = Mutex::new().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
        assert!(matches!(error, Error::Native { .. }));
    }
}
