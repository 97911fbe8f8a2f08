//! # Threads
//!
//! [`Thread`] owns a native thread record and the task running on it. A thread is in
//! exactly one of three states:
//!
//! ```text
//!            join()
//! joinable ──────────► joined
//!     │
//!     └─────────────► detached
//!            detach()
//! ```
//!
//! Dropping a thread that is still joinable joins it, so the scope that created a
//! thread never outlives the work it started unless the thread was detached.

use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;

use log::{debug, warn};

use crate::core::{Deleter, Error, Outcome, Owning, PointerManager, Result};
use crate::sys::thread::{self as native, NativeThread};

/// Name given to threads created without one.
pub const DEFAULT_NAME: &str = "thread";

/// Frees native thread records.
pub struct ThreadDeleter;

impl Deleter<NativeThread> for ThreadDeleter {
    unsafe fn delete(ptr: NonNull<NativeThread>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::destroy_thread(ptr.as_ptr()) }
    }
}

/// Scheduling priority for the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadPriority {
    /// Background work
    Low,
    /// Default priority
    #[default]
    Normal,
    /// Latency sensitive work
    High,
    /// Timing critical work such as audio mixing
    Critical,
}

impl ThreadPriority {
    const fn to_native(self) -> i32 {
        match self {
            Self::Low => native::THREAD_PRIORITY_LOW,
            Self::Normal => native::THREAD_PRIORITY_NORMAL,
            Self::High => native::THREAD_PRIORITY_HIGH,
            Self::Critical => native::THREAD_PRIORITY_TIME_CRITICAL,
        }
    }
}

/// A native thread running a task that returns an `i32` status.
pub struct Thread {
    thread: PointerManager<Owning, NativeThread, ThreadDeleter>,
    joined: bool,
    detached: bool,
}

// SAFETY: the thread record is only touched through internally synchronised native
// calls and may be joined or detached from any thread.
unsafe impl Send for Thread {}

impl Thread {
    /// Starts `task` on a thread named `"thread"`.
    pub fn spawn<F>(task: F) -> Result<Self>
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        Self::with_name(DEFAULT_NAME, task)
    }

    /// Starts `task` on a thread called `name`.
    ///
    /// Fails with [`Error::Native`] if the native thread cannot be created.
    pub fn with_name<F>(name: &str, task: F) -> Result<Self>
    where
        F: FnOnce() -> i32 + Send + 'static,
    {
        let ptr = native::create_thread(name, Box::new(task));
        if ptr.is_null() {
            return Err(Error::native("Failed to create thread"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let thread = unsafe { PointerManager::<Owning, _, _>::new(ptr, "thread") }?;
        debug!("Started thread '{name}'");
        Ok(Self { thread, joined: false, detached: false })
    }

    /// Starts `task(data)` on a thread called `name`.
    ///
    /// The plain function pointer form of [`with_name`](Self::with_name), for tasks
    /// that carry their state in a separate value.
    pub fn with_data<T>(name: &str, data: T, task: fn(T) -> i32) -> Result<Self>
    where
        T: Send + 'static,
    {
        Self::with_name(name, move || task(data))
    }

    /// Blocks until the task finishes and returns its status.
    ///
    /// Returns `0` without blocking if the thread was already joined or detached.
    pub fn join(&mut self) -> i32 {
        if !self.joinable() {
            return 0;
        }
        let mut status = 0;
        // SAFETY: the owning manager keeps the pointer live and non-null.
        if unsafe { native::wait_thread(self.get(), &mut status) } != 0 {
            warn!("Failed to join thread: {}", crate::sys::get_error());
        }
        self.joined = true;
        status
    }

    /// Lets the thread finish on its own; it is no longer joined on drop.
    pub fn detach(&mut self) {
        if !self.joinable() {
            return;
        }
        // SAFETY: the owning manager keeps the pointer live and non-null.
        unsafe { native::detach_thread(self.get()) };
        self.detached = true;
    }

    /// Whether the thread can still be joined or detached.
    pub const fn joinable(&self) -> bool {
        !self.joined && !self.detached
    }

    /// Whether [`join`](Self::join) has completed.
    pub const fn was_joined(&self) -> bool {
        self.joined
    }

    /// Whether [`detach`](Self::detach) was called.
    pub const fn was_detached(&self) -> bool {
        self.detached
    }

    /// Identifier of this thread.
    pub fn id(&self) -> u64 {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        unsafe { native::thread_id(self.get()) }
    }

    /// Identifier of the calling thread.
    pub fn current_id() -> u64 {
        native::current_thread_id()
    }

    /// Name the thread was created with.
    pub fn name(&self) -> String {
        // SAFETY: the owning manager keeps the pointer live and non-null.
        unsafe { native::thread_name(self.get()) }.unwrap_or_default()
    }

    /// The native thread pointer.
    pub fn get(&self) -> *mut NativeThread {
        self.thread.get()
    }

    /// Suspends the calling thread for at least `duration`.
    pub fn sleep(duration: Duration) {
        native::delay(duration);
    }

    /// Requests `priority` for the calling thread.
    ///
    /// Best effort: platforms may ignore the request or refuse it without privileges.
    pub fn set_priority(priority: ThreadPriority) -> Outcome {
        let outcome = Outcome::from_status(native::set_thread_priority(priority.to_native()));
        if outcome.is_failure() {
            warn!("Failed to set thread priority: {}", crate::sys::get_error());
        }
        outcome
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.joinable() {
            self.join();
        }
    }
}

impl fmt::Display for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "thread{{data: {:p}, name: {}, id: {}}}",
            self.get(),
            self.name(),
            self.id()
        )
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("data", &self.get())
            .field("name", &self.name())
            .field("joined", &self.joined)
            .field("detached", &self.detached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Semaphore;
    use crate::sys::{fail_next, NativeCall};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let mut thread = Thread::spawn(|| 0).unwrap();
        assert!(thread.joinable());
        assert!(!thread.was_joined());
        assert!(!thread.was_detached());
        assert_eq!(thread.name(), DEFAULT_NAME);
        assert_eq!(thread.join(), 0);
    }

    #[test]
    fn test_join_returns_status() {
        let mut thread = Thread::with_name("worker", || 42).unwrap();
        assert_eq!(thread.join(), 42);
        assert!(thread.was_joined());
        assert!(!thread.joinable());
        assert_eq!(thread.join(), 0);
    }

    #[test]
    fn test_detach() {
        let mut thread = Thread::spawn(|| 7).unwrap();
        thread.detach();
        assert!(thread.was_detached());
        assert!(!thread.joinable());
        assert_eq!(thread.join(), 0);
        assert!(!thread.was_joined());
    }

    #[test]
    fn test_with_data() {
        let mut thread = Thread::with_data("data", 20_i32, |value| value + 1).unwrap();
        assert_eq!(thread.join(), 21);
    }

    #[test]
    fn test_drop_joins() {
        let finished = Arc::new(AtomicBool::new(false));
        {
            let finished = Arc::clone(&finished);
            let _thread = Thread::spawn(move || {
                Thread::sleep(Duration::from_millis(10));
                finished.store(true, Ordering::SeqCst);
                0
            })
            .unwrap();
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_ids() {
        let semaphore = Arc::new(Semaphore::new(0).unwrap());
        let inner = Arc::clone(&semaphore);
        let mut thread = Thread::spawn(move || {
            let _ = inner.acquire();
            0
        })
        .unwrap();
        assert_ne!(thread.id(), Thread::current_id());
        assert!(thread.to_string().contains("name: thread"));
        assert!(semaphore.release().is_success());
        assert_eq!(thread.join(), 0);
    }

    #[test]
    fn test_set_priority() {
        let mut thread = Thread::spawn(|| {
            i32::from(Thread::set_priority(ThreadPriority::High).is_success())
        })
        .unwrap();
        assert_eq!(thread.join(), 1);
    }

    #[test]
    fn test_name_with_nul_is_rejected() {
        let error = Thread::with_name("a\0b", || 0).unwrap_err();
        assert_eq!(error.kind(), crate::core::ErrorKind::Runtime);
        assert!(crate::sys::get_error().contains("NUL"));
    }

    #[test]
    fn test_creation_failure() {
        fail_next(NativeCall::CreateThread);
        let error = Thread::spawn(|| 0).unwrap_err();
        assert!(matches!(error, Error::Native { .. }));
    }
}
