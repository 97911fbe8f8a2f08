//! Condition variable

use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;

use crate::core::{Deleter, Error, LockStatus, Outcome, Owning, PointerManager, Result};
use crate::sync::{Mutex, ScopedLock};
use crate::sys::sync::{self as native, NativeCond};

/// Frees native condition variables.
pub struct ConditionDeleter;

impl Deleter<NativeCond> for ConditionDeleter {
    unsafe fn delete(ptr: NonNull<NativeCond>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::destroy_cond(ptr.as_ptr()) }
    }
}

/// A condition variable used together with a [`Mutex`].
///
/// Waiting releases the mutex and blocks as one atomic step, then re-acquires the
/// mutex before returning, so a signal sent while the mutex is held by the signaller
/// is never lost. Wakeups can still race with other waiters; re-check the guarded
/// state in a loop.
pub struct Condition {
    cond: PointerManager<Owning, NativeCond, ConditionDeleter>,
}

// SAFETY: the native condition variable is internally synchronised.
unsafe impl Send for Condition {}
// SAFETY: every operation on the native condition variable is thread safe.
unsafe impl Sync for Condition {}

impl Condition {
    /// Creates a condition variable.
    pub fn new() -> Result<Self> {
        let ptr = native::create_cond();
        if ptr.is_null() {
            return Err(Error::native("Failed to create condition variable"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let cond = unsafe { PointerManager::<Owning, _, _>::new(ptr, "condition") }?;
        Ok(Self { cond })
    }

    /// Wakes one waiting thread.
    pub fn signal(&self) -> Outcome {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        Outcome::from_status(unsafe { native::cond_signal(self.get()) })
    }

    /// Wakes every waiting thread.
    pub fn broadcast(&self) -> Outcome {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        Outcome::from_status(unsafe { native::cond_broadcast(self.get()) })
    }

    /// Releases `mutex`, waits for a signal and re-acquires `mutex`.
    ///
    /// The calling thread must hold `mutex`; otherwise the call fails without
    /// waiting.
    pub fn wait(&self, mutex: &Mutex) -> Outcome {
        // SAFETY: both owning managers keep their pointers live and non-null.
        Outcome::from_status(unsafe { native::cond_wait_timeout(self.get(), mutex.get(), None) })
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout`.
    ///
    /// The mutex is held again when this returns, whatever the status. A
    /// timeout too long for the clock waits until signalled.
    pub fn wait_timeout(&self, mutex: &Mutex, timeout: Duration) -> LockStatus {
        // SAFETY: both owning managers keep their pointers live and non-null.
        LockStatus::from_status(unsafe {
            native::cond_wait_timeout(self.get(), mutex.get(), Some(timeout))
        })
    }

    /// Waits on the mutex held by `lock` until `done` returns `true`.
    pub fn wait_until<F>(&self, lock: &ScopedLock<'_>, mut done: F) -> Outcome
    where
        F: FnMut() -> bool,
    {
        while !done() {
            if self.wait(lock.mutex()).is_failure() {
                return Outcome::Failure;
            }
        }
        Outcome::Success
    }

    /// The native condition variable pointer.
    pub fn get(&self) -> *mut NativeCond {
        self.cond.get()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition").field("data", &self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::{fail_next, NativeCall};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_constructor_failure() {
        fail_next(NativeCall::CreateCond);
        assert!(matches!(Condition::new(), Err(Error::Native { .. })));
    }

    #[test]
    fn test_wait_without_lock_fails() {
        let mutex = Mutex::new().unwrap();
        let cond = Condition::new().unwrap();
        assert!(cond.wait(&mutex).is_failure());
        assert_eq!(cond.wait_timeout(&mutex, Duration::from_millis(1)), LockStatus::Error);
    }

    #[test]
    fn test_wait_timeout_reacquires_mutex() {
        let mutex = Mutex::new().unwrap();
        let cond = Condition::new().unwrap();
        let lock = ScopedLock::new(&mutex).unwrap();
        assert_eq!(cond.wait_timeout(lock.mutex(), Duration::from_millis(1)), LockStatus::TimedOut);
        // Still held: a recursive unlock/lock pair succeeds.
        assert!(mutex.unlock().is_success());
        assert!(mutex.lock().is_success());
    }

    #[test]
    fn test_wait_timeout_saturates() {
        let mutex = Arc::new(Mutex::new().unwrap());
        let cond = Arc::new(Condition::new().unwrap());
        let ready = Arc::new(AtomicBool::new(false));

        let lock = ScopedLock::new(&mutex).unwrap();
        let signaller = {
            let (mutex, cond, ready) = (Arc::clone(&mutex), Arc::clone(&cond), Arc::clone(&ready));
            std::thread::spawn(move || {
                let _lock = ScopedLock::new(&mutex).unwrap();
                ready.store(true, Ordering::SeqCst);
                cond.signal()
            })
        };
        while !ready.load(Ordering::SeqCst) {
            assert_eq!(cond.wait_timeout(lock.mutex(), Duration::MAX), LockStatus::Success);
        }
        drop(lock);
        assert!(signaller.join().unwrap().is_success());
    }

    #[test]
    fn test_signal_wakes_waiter() {
        let mutex = Arc::new(Mutex::new().unwrap());
        let cond = Arc::new(Condition::new().unwrap());
        let ready = Arc::new(AtomicBool::new(false));

        let waiter = {
            let (mutex, cond, ready) = (Arc::clone(&mutex), Arc::clone(&cond), Arc::clone(&ready));
            std::thread::spawn(move || {
                let lock = ScopedLock::new(&mutex).unwrap();
                cond.wait_until(&lock, || ready.load(Ordering::SeqCst))
            })
        };

        {
            let _lock = ScopedLock::new(&mutex).unwrap();
            ready.store(true, Ordering::SeqCst);
            assert!(cond.signal().is_success());
        }
        assert_eq!(waiter.join().unwrap(), Outcome::Success);
    }

    #[test]
    fn test_broadcast_wakes_every_waiter() {
        const WAITERS: u32 = 4;
        let mutex = Arc::new(Mutex::new().unwrap());
        let cond = Arc::new(Condition::new().unwrap());
        let go = Arc::new(AtomicBool::new(false));
        let woken = Arc::new(AtomicU32::new(0));

        let waiters: Vec<_> = (0..WAITERS)
            .map(|_| {
                let (mutex, cond) = (Arc::clone(&mutex), Arc::clone(&cond));
                let (go, woken) = (Arc::clone(&go), Arc::clone(&woken));
                std::thread::spawn(move || {
                    let lock = ScopedLock::new(&mutex).unwrap();
                    let outcome = cond.wait_until(&lock, || go.load(Ordering::SeqCst));
                    woken.fetch_add(1, Ordering::SeqCst);
                    outcome
                })
            })
            .collect();

        {
            let _lock = ScopedLock::new(&mutex).unwrap();
            go.store(true, Ordering::SeqCst);
            assert!(cond.broadcast().is_success());
        }
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Outcome::Success);
        }
        assert_eq!(woken.load(Ordering::SeqCst), WAITERS);
    }
}
