//! # Core Module
//!
//! Shared abstractions every wrapped resource is built from.
//!
//! ## Organization
//!
//! - **Ownership**: the owning/handle pointer manager
//! - **Error**: contract violation vs. native failure
//! - **Result**: boolean-like outcomes for routine failures
//! - **Config**: library configuration
//! - **Library**: explicit owner of the native library's global state

pub mod config;
pub mod error;
pub mod library;
pub mod ownership;
pub mod result;

pub use config::{Config, ConfigError, ConfigFormat, LibraryConfig, SubsystemConfig};
pub use error::{Error, ErrorKind, Result};
pub use library::{HintCallback, HintPriority, Library, Subsystems};
pub use ownership::{Deleter, Handle, Ownership, Owning, PointerManager};
pub use result::{LockStatus, Outcome};
