//! Native mutex, semaphore and condition variable objects.
//!
//! Mutexes are recursive: the owning thread may lock again and must unlock the same
//! number of times. A condition wait releases every level of the mutex while holding
//! the condition's own state lock, so a signal can never fall between the release and
//! the block.

use std::ptr;
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{fail, injected_failure, NativeCall, MUTEX_TIMEDOUT};

/// Deadline for a wait of `timeout`. Timeouts past the end of the clock wait forever.
fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|timeout| Instant::now().checked_add(timeout))
}

// ---------------------------------------------------------------------------
// Mutex
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MutexState {
    owner: Option<ThreadId>,
    depth: u32,
}

/// Opaque native mutex.
#[derive(Debug, Default)]
pub struct NativeMutex {
    state: Mutex<MutexState>,
    released: Condvar,
}

impl NativeMutex {
    fn acquire(&self, depth: u32) {
        let me = std::thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = depth;
                    return;
                }
                Some(owner) if owner == me => {
                    state.depth += depth;
                    return;
                }
                Some(_) => self.released.wait(&mut state),
            }
        }
    }

    fn is_held_by_current(&self) -> bool {
        self.state.lock().owner == Some(std::thread::current().id())
    }

    /// Drops every level held by the calling thread and returns how many there were.
    fn release_all(&self) -> u32 {
        let mut state = self.state.lock();
        let depth = state.depth;
        state.owner = None;
        state.depth = 0;
        self.released.notify_one();
        depth
    }
}

/// Creates an unlocked mutex, or returns null.
pub fn create_mutex() -> *mut NativeMutex {
    if injected_failure(NativeCall::CreateMutex) {
        return ptr::null_mut();
    }
    Box::into_raw(Box::default())
}

/// Frees a mutex. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn destroy_mutex(mutex: *mut NativeMutex) {
    if !mutex.is_null() {
        // SAFETY: non-null pointers handed to this function came from `create_mutex`.
        drop(unsafe { Box::from_raw(mutex) });
    }
}

/// Blocks until the calling thread holds `mutex`.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn lock_mutex(mutex: *mut NativeMutex) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(mutex) = (unsafe { mutex.as_ref() }) else {
        return fail("Passed a NULL mutex");
    };
    mutex.acquire(1);
    0
}

/// Takes `mutex` if it is free or already held by the calling thread.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn try_lock_mutex(mutex: *mut NativeMutex) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(mutex) = (unsafe { mutex.as_ref() }) else {
        return fail("Passed a NULL mutex");
    };
    let me = std::thread::current().id();
    let mut state = mutex.state.lock();
    match state.owner {
        None => {
            state.owner = Some(me);
            state.depth = 1;
            0
        }
        Some(owner) if owner == me => {
            state.depth += 1;
            0
        }
        Some(_) => MUTEX_TIMEDOUT,
    }
}

/// Releases one level of `mutex`.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn unlock_mutex(mutex: *mut NativeMutex) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(mutex) = (unsafe { mutex.as_ref() }) else {
        return fail("Passed a NULL mutex");
    };
    let me = std::thread::current().id();
    let mut state = mutex.state.lock();
    if state.owner != Some(me) {
        return fail("mutex not owned by this thread");
    }
    state.depth -= 1;
    if state.depth == 0 {
        state.owner = None;
        mutex.released.notify_one();
    }
    0
}

// ---------------------------------------------------------------------------
// Semaphore
// ---------------------------------------------------------------------------

/// Opaque native counting semaphore.
#[derive(Debug)]
pub struct NativeSemaphore {
    count: Mutex<u32>,
    posted: Condvar,
}

/// Creates a semaphore holding `initial` tokens, or returns null.
pub fn create_semaphore(initial: u32) -> *mut NativeSemaphore {
    if injected_failure(NativeCall::CreateSemaphore) {
        return ptr::null_mut();
    }
    Box::into_raw(Box::new(NativeSemaphore {
        count: Mutex::new(initial),
        posted: Condvar::new(),
    }))
}

/// Frees a semaphore. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn destroy_semaphore(semaphore: *mut NativeSemaphore) {
    if !semaphore.is_null() {
        // SAFETY: non-null pointers handed to this function came from `create_semaphore`.
        drop(unsafe { Box::from_raw(semaphore) });
    }
}

/// Takes one token, waiting at most `timeout` (forever when `None`).
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn semaphore_wait_timeout(
    semaphore: *mut NativeSemaphore,
    timeout: Option<Duration>,
) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(semaphore) = (unsafe { semaphore.as_ref() }) else {
        return fail("Passed a NULL semaphore");
    };
    let deadline = deadline_after(timeout);
    let mut count = semaphore.count.lock();
    while *count == 0 {
        match deadline {
            None => semaphore.posted.wait(&mut count),
            Some(deadline) => {
                if semaphore.posted.wait_until(&mut count, deadline).timed_out() && *count == 0 {
                    return MUTEX_TIMEDOUT;
                }
            }
        }
    }
    *count -= 1;
    0
}

/// Takes one token without blocking.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn semaphore_try_wait(semaphore: *mut NativeSemaphore) -> i32 {
    // SAFETY: forwarded contract.
    unsafe { semaphore_wait_timeout(semaphore, Some(Duration::ZERO)) }
}

/// Adds one token and wakes a single waiter.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn semaphore_post(semaphore: *mut NativeSemaphore) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(semaphore) = (unsafe { semaphore.as_ref() }) else {
        return fail("Passed a NULL semaphore");
    };
    let mut count = semaphore.count.lock();
    let Some(next) = count.checked_add(1) else {
        return fail("Semaphore token count overflow");
    };
    *count = next;
    semaphore.posted.notify_one();
    0
}

/// Current token count, `0` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn semaphore_value(semaphore: *mut NativeSemaphore) -> u32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    unsafe { semaphore.as_ref() }.map_or(0, |semaphore| *semaphore.count.lock())
}

// ---------------------------------------------------------------------------
// Condition variable
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CondState {
    waiters: u32,
    signals: u32,
}

/// Opaque native condition variable.
#[derive(Debug, Default)]
pub struct NativeCond {
    state: Mutex<CondState>,
    wakeup: Condvar,
}

/// Creates a condition variable, or returns null.
pub fn create_cond() -> *mut NativeCond {
    if injected_failure(NativeCall::CreateCond) {
        return ptr::null_mut();
    }
    Box::into_raw(Box::default())
}

/// Frees a condition variable. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn destroy_cond(cond: *mut NativeCond) {
    if !cond.is_null() {
        // SAFETY: non-null pointers handed to this function came from `create_cond`.
        drop(unsafe { Box::from_raw(cond) });
    }
}

/// Wakes one thread waiting on `cond`, if any.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn cond_signal(cond: *mut NativeCond) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(cond) = (unsafe { cond.as_ref() }) else {
        return fail("Passed a NULL condition variable");
    };
    let mut state = cond.state.lock();
    if state.waiters > state.signals {
        state.signals += 1;
        cond.wakeup.notify_one();
    }
    0
}

/// Wakes every thread waiting on `cond`.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn cond_broadcast(cond: *mut NativeCond) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(cond) = (unsafe { cond.as_ref() }) else {
        return fail("Passed a NULL condition variable");
    };
    let mut state = cond.state.lock();
    if state.waiters > state.signals {
        state.signals = state.waiters;
        cond.wakeup.notify_all();
    }
    0
}

/// Releases `mutex`, waits for a signal for at most `timeout` (forever when `None`)
/// and re-acquires `mutex` before returning.
///
/// The calling thread must hold `mutex`.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn cond_wait_timeout(
    cond: *mut NativeCond,
    mutex: *mut NativeMutex,
    timeout: Option<Duration>,
) -> i32 {
    // SAFETY: the caller guarantees both pointers are null or live.
    let (Some(cond), Some(mutex)) = (unsafe { cond.as_ref() }, unsafe { mutex.as_ref() }) else {
        return fail("Passed a NULL condition variable or mutex");
    };
    if !mutex.is_held_by_current() {
        return fail("mutex not owned by this thread");
    }

    let deadline = deadline_after(timeout);
    let mut state = cond.state.lock();
    state.waiters += 1;
    let depth = mutex.release_all();

    let status = loop {
        if state.signals > 0 {
            state.signals -= 1;
            break 0;
        }
        match deadline {
            None => cond.wakeup.wait(&mut state),
            Some(deadline) => {
                if cond.wakeup.wait_until(&mut state, deadline).timed_out() && state.signals == 0 {
                    break MUTEX_TIMEDOUT;
                }
            }
        }
    };
    state.waiters -= 1;
    drop(state);

    mutex.acquire(depth);
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Shared(*mut NativeMutex, *mut NativeCond);
    // SAFETY: the native objects are internally synchronised.
    unsafe impl Send for Shared {}
    // SAFETY: as above.
    unsafe impl Sync for Shared {}

    #[test]
    fn test_unbounded_deadline() {
        assert_eq!(deadline_after(None), None);
        assert_eq!(deadline_after(Some(Duration::MAX)), None);
        assert!(deadline_after(Some(Duration::from_secs(1))).is_some());
    }

    #[test]
    fn test_mutex_is_recursive() {
        let mutex = create_mutex();
        unsafe {
            assert_eq!(lock_mutex(mutex), 0);
            assert_eq!(try_lock_mutex(mutex), 0);
            assert_eq!(unlock_mutex(mutex), 0);
            assert_eq!(unlock_mutex(mutex), 0);
            assert_eq!(unlock_mutex(mutex), -1);
            destroy_mutex(mutex);
        }
    }

    #[test]
    fn test_try_lock_contended() {
        let shared = Arc::new(Shared(create_mutex(), ptr::null_mut()));
        unsafe { lock_mutex(shared.0) };
        let other = Arc::clone(&shared);
        let status = std::thread::spawn(move || unsafe { try_lock_mutex(other.0) })
            .join()
            .unwrap();
        assert_eq!(status, MUTEX_TIMEDOUT);
        unsafe {
            unlock_mutex(shared.0);
            destroy_mutex(shared.0);
        }
    }

    #[test]
    fn test_null_objects_are_rejected() {
        unsafe {
            assert_eq!(lock_mutex(ptr::null_mut()), -1);
            assert_eq!(semaphore_post(ptr::null_mut()), -1);
            assert_eq!(semaphore_value(ptr::null_mut()), 0);
            assert_eq!(cond_signal(ptr::null_mut()), -1);
        }
    }

    #[test]
    fn test_cond_wait_requires_held_mutex() {
        let mutex = create_mutex();
        let cond = create_cond();
        unsafe {
            assert_eq!(cond_wait_timeout(cond, mutex, Some(Duration::from_millis(1))), -1);
            assert_eq!(super::super::get_error(), "mutex not owned by this thread");
            destroy_cond(cond);
            destroy_mutex(mutex);
        }
    }

    #[test]
    fn test_cond_signal_is_not_lost() {
        let shared = Arc::new(Shared(create_mutex(), create_cond()));
        let ready = Arc::new(AtomicBool::new(false));

        unsafe { lock_mutex(shared.0) };
        let waker = {
            let shared = Arc::clone(&shared);
            let ready = Arc::clone(&ready);
            std::thread::spawn(move || unsafe {
                lock_mutex(shared.0);
                ready.store(true, Ordering::SeqCst);
                cond_signal(shared.1);
                unlock_mutex(shared.0);
            })
        };
        while !ready.load(Ordering::SeqCst) {
            assert_eq!(unsafe { cond_wait_timeout(shared.1, shared.0, None) }, 0);
        }
        unsafe { unlock_mutex(shared.0) };
        waker.join().unwrap();
        unsafe {
            destroy_cond(shared.1);
            destroy_mutex(shared.0);
        }
    }
}
