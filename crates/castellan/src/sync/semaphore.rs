//! Counting semaphore

use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;

use crate::core::{Deleter, Error, LockStatus, Outcome, Owning, PointerManager, Result};
use crate::sys::sync::{self as native, NativeSemaphore};

/// Frees native semaphores.
pub struct SemaphoreDeleter;

impl Deleter<NativeSemaphore> for SemaphoreDeleter {
    unsafe fn delete(ptr: NonNull<NativeSemaphore>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::destroy_semaphore(ptr.as_ptr()) }
    }
}

/// A counting semaphore.
///
/// Acquiring takes a token, blocking while there are none; releasing returns a
/// token and wakes at most one waiter. Wake order is whatever the native library
/// provides.
pub struct Semaphore {
    semaphore: PointerManager<Owning, NativeSemaphore, SemaphoreDeleter>,
}

// SAFETY: the native semaphore is internally synchronised and not tied to its creator.
unsafe impl Send for Semaphore {}
// SAFETY: every operation on the native semaphore is thread safe.
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// Creates a semaphore holding `tokens` tokens.
    pub fn new(tokens: u32) -> Result<Self> {
        let ptr = native::create_semaphore(tokens);
        if ptr.is_null() {
            return Err(Error::native("Failed to create semaphore"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let semaphore = unsafe { PointerManager::<Owning, _, _>::new(ptr, "semaphore") }?;
        Ok(Self { semaphore })
    }

    /// Takes a token, blocking for as long as it takes.
    pub fn acquire(&self) -> Outcome {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        Outcome::from_status(unsafe { native::semaphore_wait_timeout(self.get(), None) })
    }

    /// Takes a token, giving up after `timeout`. A timeout too long for the
    /// clock waits until a token arrives.
    pub fn acquire_timeout(&self, timeout: Duration) -> LockStatus {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        LockStatus::from_status(unsafe { native::semaphore_wait_timeout(self.get(), Some(timeout)) })
    }

    /// Takes a token only if one is available right now.
    pub fn try_acquire(&self) -> LockStatus {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        LockStatus::from_status(unsafe { native::semaphore_try_wait(self.get()) })
    }

    /// Returns a token, waking one waiter if there is any.
    pub fn release(&self) -> Outcome {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        Outcome::from_status(unsafe { native::semaphore_post(self.get()) })
    }

    /// Number of available tokens.
    pub fn tokens(&self) -> u32 {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        unsafe { native::semaphore_value(self.get()) }
    }

    /// The native semaphore pointer.
    pub fn get(&self) -> *mut NativeSemaphore {
        self.semaphore.get()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("data", &self.get())
            .field("tokens", &self.tokens())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::{fail_next, NativeCall};
    use std::sync::Arc;

    const ONE_MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_acquire() {
        let semaphore = Semaphore::new(1).unwrap();
        assert!(semaphore.acquire().is_success());
        assert_eq!(semaphore.tokens(), 0);
        assert!(semaphore.release().is_success());
        assert_eq!(semaphore.tokens(), 1);
    }

    #[test]
    fn test_acquire_timeout() {
        let semaphore = Semaphore::new(0).unwrap();
        assert_eq!(semaphore.acquire_timeout(ONE_MS), LockStatus::TimedOut);
        assert!(semaphore.release().is_success());
        assert_eq!(semaphore.acquire_timeout(ONE_MS), LockStatus::Success);
    }

    #[test]
    fn test_acquire_timeout_saturates() {
        let semaphore = Semaphore::new(1).unwrap();
        assert_eq!(semaphore.acquire_timeout(Duration::MAX), LockStatus::Success);
        assert_eq!(semaphore.tokens(), 0);
    }

    #[test]
    fn test_try_acquire() {
        let semaphore = Semaphore::new(0).unwrap();
        assert_eq!(semaphore.try_acquire(), LockStatus::TimedOut);
        assert!(semaphore.release().is_success());
        assert_eq!(semaphore.try_acquire(), LockStatus::Success);
    }

    #[test]
    fn test_tokens() {
        let semaphore = Semaphore::new(32).unwrap();
        assert_eq!(semaphore.tokens(), 32);
    }

    #[test]
    fn test_release_wakes_blocked_acquirer() {
        let semaphore = Arc::new(Semaphore::new(0).unwrap());
        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            std::thread::spawn(move || semaphore.acquire())
        };
        std::thread::sleep(Duration::from_millis(10));
        assert!(semaphore.release().is_success());
        assert_eq!(waiter.join().unwrap(), Outcome::Success);
        assert_eq!(semaphore.tokens(), 0);
    }

    #[test]
    fn test_creation_failure() {
        fail_next(NativeCall::CreateSemaphore);
        assert!(matches!(Semaphore::new(1), Err(Error::Native { .. })));
    }
}
