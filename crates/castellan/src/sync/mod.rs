//! # Synchronization Primitives
//!
//! Thin owners of the native mutex, semaphore and condition variable, plus a scoped
//! lock guard. Each primitive maps straight onto the native object: blocking calls
//! block the OS thread, nothing is retried and nothing is cancellable except through
//! the timeout variants.
//!
//! Routine outcomes come back as values:
//!
//! | Call                          | Returns                                |
//! |-------------------------------|----------------------------------------|
//! | `Mutex::lock`, `unlock`       | [`Outcome`](crate::core::Outcome)      |
//! | `Mutex::try_lock`             | [`LockStatus`](crate::core::LockStatus)|
//! | `Semaphore::acquire_timeout`  | [`LockStatus`](crate::core::LockStatus)|
//! | `Condition::wait`             | [`Outcome`](crate::core::Outcome)      |
//!
//! Failing to create a primitive, or failing to lock inside [`ScopedLock::new`], is
//! an [`Error::Native`](crate::core::Error::Native).

mod condition;
mod mutex;
mod scoped_lock;
mod semaphore;

pub use condition::{Condition, ConditionDeleter};
pub use mutex::{Mutex, MutexDeleter};
pub use scoped_lock::ScopedLock;
pub use semaphore::{Semaphore, SemaphoreDeleter};
