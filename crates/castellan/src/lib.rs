//! # Castellan
//!
//! Safe owning and non-owning wrappers around a native multimedia library's
//! windows, renderers, textures, surfaces, input devices, battery status and
//! threading primitives.
//!
//! ## Features
//!
//! - **One type, two ownerships**: every resource is a `BasicX<O>` where `O` is
//!   either [`Owning`](core::Owning), which frees the native object on drop, or
//!   [`Handle`](core::Handle), a copyable view that borrows it
//! - **Two failure channels**: broken contracts and failed constructors are
//!   [`Error`]s; routine failures are [`Outcome`](core::Outcome) or
//!   [`LockStatus`](core::LockStatus) values with the reason in [`last_error`]
//! - **Explicit global state**: subsystems and hints live behind a
//!   [`Library`](core::Library) value
//! - **Configuration**: TOML or RON files through [`config::Config`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use castellan::prelude::*;
//!
//! fn main() -> castellan::Result<()> {
//!     let _library = Library::init(Subsystems::VIDEO)?;
//!     let window = Window::with_title("hello")?;
//!     let renderer = Renderer::new(&window)?;
//!
//!     let _ = renderer.set_color(Color::BLUE);
//!     let _ = renderer.clear();
//!     let _ = renderer.fill_rect(Rect::new(10, 10, 100, 50));
//!     renderer.present();
//!     Ok(())
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod battery;
pub mod config;
pub mod core;
pub mod foundation;
pub mod input;
pub mod sync;
pub mod sys;
pub mod thread;
pub mod video;

pub use crate::core::{Error, Result};

/// Message describing the last native failure on the calling thread.
///
/// Empty when nothing has failed yet.
pub fn last_error() -> String {
    sys::get_error()
}

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        core::{Error, Library, LibraryConfig, LockStatus, Outcome, Result, Subsystems},
        foundation::{Area, Point, Rect},
        input::{Controller, ControllerAxis, ControllerButton, Joystick, KeyState, ScanCode, Sensor, SensorType},
        last_error,
        sync::{Condition, Mutex, ScopedLock, Semaphore},
        thread::Thread,
        video::{Color, Renderer, Surface, Texture, Window, WindowFlags},
    };
}
