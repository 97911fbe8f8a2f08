//! Native threads.
//!
//! Thread records outlive the OS thread: `wait_thread` and `detach_thread` only
//! give up the join handle, `destroy_thread` frees the record itself.

use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use super::{fail, injected_failure, set_error, NativeCall};

/// Task run by a native thread; the return value is the thread's status code.
pub type NativeTask = Box<dyn FnOnce() -> i32 + Send + 'static>;

/// Scheduling priority requested through [`set_thread_priority`].
pub const THREAD_PRIORITY_LOW: i32 = 0;
/// Default priority of every thread.
pub const THREAD_PRIORITY_NORMAL: i32 = 1;
/// Elevated priority.
pub const THREAD_PRIORITY_HIGH: i32 = 2;
/// Highest priority, for timing critical work.
pub const THREAD_PRIORITY_TIME_CRITICAL: i32 = 3;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_ID: Cell<u64> = const { Cell::new(0) };
    static CURRENT_PRIORITY: Cell<i32> = const { Cell::new(THREAD_PRIORITY_NORMAL) };
}

/// Opaque native thread record.
#[derive(Debug)]
pub struct NativeThread {
    id: u64,
    name: String,
    handle: Mutex<Option<JoinHandle<i32>>>,
}

fn allocate_id() -> u64 {
    NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identifier of the calling thread. Assigned lazily for threads not created here.
pub fn current_thread_id() -> u64 {
    CURRENT_ID.with(|current| {
        if current.get() == 0 {
            current.set(allocate_id());
        }
        current.get()
    })
}

/// Starts `task` on a new thread called `name`, or returns null. Names with
/// interior NUL bytes are rejected.
pub fn create_thread(name: &str, task: NativeTask) -> *mut NativeThread {
    if injected_failure(NativeCall::CreateThread) {
        return ptr::null_mut();
    }
    if name.contains('\0') {
        set_error("Thread name may not contain NUL bytes");
        return ptr::null_mut();
    }
    let id = allocate_id();
    let spawned = std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            CURRENT_ID.with(|current| current.set(id));
            task()
        });
    match spawned {
        Ok(handle) => Box::into_raw(Box::new(NativeThread {
            id,
            name: name.to_owned(),
            handle: Mutex::new(Some(handle)),
        })),
        Err(error) => {
            set_error(format!("Couldn't create thread: {error}"));
            ptr::null_mut()
        }
    }
}

/// Waits for the thread to finish and stores its status in `status`.
///
/// A task that panicked reports `-1`. Waiting on a detached or already waited thread
/// is an error.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn wait_thread(thread: *mut NativeThread, status: &mut i32) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(thread) = (unsafe { thread.as_ref() }) else {
        return fail("Passed a NULL thread");
    };
    let Some(handle) = thread.handle.lock().take() else {
        return fail("Thread was already waited on or detached");
    };
    *status = handle.join().unwrap_or(-1);
    0
}

/// Lets the thread run to completion without anyone waiting for it.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn detach_thread(thread: *mut NativeThread) {
    // SAFETY: the caller guarantees the pointer is null or live.
    if let Some(thread) = unsafe { thread.as_ref() } {
        drop(thread.handle.lock().take());
    }
}

/// Frees the thread record. A thread still running is detached first.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn destroy_thread(thread: *mut NativeThread) {
    if !thread.is_null() {
        // SAFETY: non-null pointers handed to this function came from `create_thread`.
        drop(unsafe { Box::from_raw(thread) });
    }
}

/// Identifier of `thread`, `0` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn thread_id(thread: *mut NativeThread) -> u64 {
    // SAFETY: the caller guarantees the pointer is null or live.
    unsafe { thread.as_ref() }.map_or(0, |thread| thread.id)
}

/// Name of `thread`, `None` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn thread_name(thread: *mut NativeThread) -> Option<String> {
    // SAFETY: the caller guarantees the pointer is null or live.
    unsafe { thread.as_ref() }.map(|thread| thread.name.clone())
}

/// Requests a scheduling priority for the calling thread.
pub fn set_thread_priority(priority: i32) -> i32 {
    if !(THREAD_PRIORITY_LOW..=THREAD_PRIORITY_TIME_CRITICAL).contains(&priority) {
        return fail(format!("Invalid thread priority {priority}"));
    }
    CURRENT_PRIORITY.with(|current| current.set(priority));
    0
}

/// Priority last requested by the calling thread.
pub fn thread_priority() -> i32 {
    CURRENT_PRIORITY.with(Cell::get)
}

/// Suspends the calling thread for at least `duration`.
pub fn delay(duration: Duration) {
    std::thread::sleep(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_ids_are_distinct() {
        let thread = create_thread("ids", Box::new(|| {
            i32::try_from(current_thread_id()).unwrap_or(-1)
        }));
        let mut status = 0;
        unsafe {
            let id = thread_id(thread);
            assert_ne!(id, current_thread_id());
            assert_eq!(wait_thread(thread, &mut status), 0);
            assert_eq!(u64::try_from(status).ok(), Some(id));
            assert_eq!(wait_thread(thread, &mut status), -1);
            destroy_thread(thread);
        }
    }

    #[test]
    fn test_panicking_task_reports_failure() {
        let thread = create_thread("panics", Box::new(|| panic!("task failed")));
        let mut status = 0;
        unsafe {
            assert_eq!(wait_thread(thread, &mut status), 0);
            destroy_thread(thread);
        }
        assert_eq!(status, -1);
    }

    #[test]
    fn test_priority_range() {
        assert_eq!(set_thread_priority(THREAD_PRIORITY_LOW), 0);
        assert_eq!(thread_priority(), THREAD_PRIORITY_LOW);
        assert_eq!(set_thread_priority(7), -1);
        assert_eq!(thread_priority(), THREAD_PRIORITY_LOW);
    }
}
