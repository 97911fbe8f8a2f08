//! # Native ABI boundary
//!
//! Everything the wrapper layer forwards to lives behind this module. The
//! surface is shaped like the C ABI of the underlying multimedia library:
//!
//! - resources are opaque pointers (`*mut NativeWindow`, `*mut NativeMutex`, ...)
//!   that are null on failure
//! - fallible calls return an `i32` status (`0` success, [`MUTEX_TIMEDOUT`] for an
//!   expired wait, `-1` error)
//! - the reason for the last failure is kept in a per-thread error string that is
//!   read back with [`get_error`]
//!
//! The backend compiled here is headless: windows, renderers and input devices are
//! plain records, and the synchronization objects are built on `parking_lot`. The
//! safe types in the rest of the crate never touch these records directly; they only
//! hold the pointers and hand them back to the functions in this module.
//!
//! ## Safety
//!
//! Functions taking a resource pointer are `unsafe`. The caller guarantees that the
//! pointer is either null or was returned by the matching create function and has
//! not been passed to the matching destroy function yet. Null pointers are always
//! rejected with an error status, never dereferenced.

pub mod hints;
pub mod input;
pub mod power;
pub mod sync;
pub mod thread;
pub mod video;

use std::cell::{Cell, RefCell};

use bitflags::bitflags;
use parking_lot::Mutex;

/// Status returned by a wait that gave up before the object became available.
pub const MUTEX_TIMEDOUT: i32 = 1;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
    static FAIL_NEXT: Cell<Option<NativeCall>> = const { Cell::new(None) };
}

/// Returns the message describing the last native failure on this thread.
pub fn get_error() -> String {
    LAST_ERROR.with(|error| error.borrow().clone())
}

/// Records a native failure message for this thread.
pub fn set_error(message: impl Into<String>) {
    let message = message.into();
    LAST_ERROR.with(|error| *error.borrow_mut() = message);
}

/// Clears the last failure message on this thread.
pub fn clear_error() {
    LAST_ERROR.with(|error| error.borrow_mut().clear());
}

/// Records `message` and returns the generic error status.
pub(crate) fn fail(message: impl Into<String>) -> i32 {
    set_error(message);
    -1
}

/// Native entry points whose failure can be simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCall {
    /// `create_mutex`
    CreateMutex,
    /// `create_semaphore`
    CreateSemaphore,
    /// `create_cond`
    CreateCond,
    /// `create_thread`
    CreateThread,
    /// `create_window`
    CreateWindow,
    /// `create_renderer`
    CreateRenderer,
    /// `create_rgb_surface`
    CreateSurface,
}

/// Makes the next call to `call` on this thread fail with an out-of-memory error.
#[cfg(test)]
pub(crate) fn fail_next(call: NativeCall) {
    FAIL_NEXT.with(|next| next.set(Some(call)));
}

/// Consumes a pending simulated failure for `call`.
pub(crate) fn injected_failure(call: NativeCall) -> bool {
    FAIL_NEXT.with(|next| {
        if next.get() == Some(call) {
            next.set(None);
            set_error("Out of memory");
            true
        } else {
            false
        }
    })
}

bitflags! {
    /// Subsystems that can be brought up by [`init_subsystem`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InitFlags: u32 {
        /// Timer subsystem
        const TIMER = 0x0000_0001;
        /// Video subsystem, implies events
        const VIDEO = 0x0000_0020;
        /// Joystick subsystem, implies events
        const JOYSTICK = 0x0000_0200;
        /// Game controller subsystem, implies joystick
        const GAME_CONTROLLER = 0x0000_2000;
        /// Event queue
        const EVENTS = 0x0000_4000;
        /// Sensor subsystem
        const SENSOR = 0x0000_8000;
    }
}

const SUBSYSTEMS: [InitFlags; 6] = [
    InitFlags::TIMER,
    InitFlags::VIDEO,
    InitFlags::JOYSTICK,
    InitFlags::GAME_CONTROLLER,
    InitFlags::EVENTS,
    InitFlags::SENSOR,
];

static SUBSYSTEM_REFS: Mutex<[u32; 6]> = Mutex::new([0; 6]);

fn with_dependencies(flags: InitFlags) -> InitFlags {
    let mut flags = flags;
    if flags.contains(InitFlags::GAME_CONTROLLER) {
        flags |= InitFlags::JOYSTICK;
    }
    if flags.intersects(InitFlags::VIDEO | InitFlags::JOYSTICK) {
        flags |= InitFlags::EVENTS;
    }
    flags
}

/// Brings up the requested subsystems. Each subsystem is reference counted.
pub fn init_subsystem(flags: InitFlags) -> i32 {
    let flags = with_dependencies(flags);
    let mut refs = SUBSYSTEM_REFS.lock();
    for (slot, subsystem) in SUBSYSTEMS.iter().enumerate() {
        if flags.contains(*subsystem) {
            refs[slot] = refs[slot].saturating_add(1);
        }
    }
    0
}

/// Releases one reference on each requested subsystem.
pub fn quit_subsystem(flags: InitFlags) {
    let flags = with_dependencies(flags);
    let mut refs = SUBSYSTEM_REFS.lock();
    for (slot, subsystem) in SUBSYSTEMS.iter().enumerate() {
        if flags.contains(*subsystem) {
            refs[slot] = refs[slot].saturating_sub(1);
        }
    }
}

/// Returns which of `flags` are currently initialised.
pub fn was_init(flags: InitFlags) -> InitFlags {
    let refs = SUBSYSTEM_REFS.lock();
    SUBSYSTEMS
        .iter()
        .enumerate()
        .filter(|(slot, subsystem)| flags.contains(**subsystem) && refs[*slot] > 0)
        .fold(InitFlags::empty(), |acc, (_, subsystem)| acc | *subsystem)
}

/// Fails with the native message for an uninitialised subsystem.
pub(crate) fn require(flags: InitFlags, name: &str) -> bool {
    if was_init(flags) == flags {
        true
    } else {
        set_error(format!("{name} subsystem has not been initialized"));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_string_is_per_thread() {
        set_error("main thread failure");
        let other = std::thread::spawn(get_error).join().unwrap_or_default();
        assert!(other.is_empty());
        assert_eq!(get_error(), "main thread failure");
        clear_error();
        assert!(get_error().is_empty());
    }

    #[test]
    fn test_injected_failure_is_consumed_once() {
        fail_next(NativeCall::CreateCond);
        assert!(!injected_failure(NativeCall::CreateMutex));
        assert!(injected_failure(NativeCall::CreateCond));
        assert_eq!(get_error(), "Out of memory");
        assert!(!injected_failure(NativeCall::CreateCond));
    }

    #[test]
    fn test_video_implies_events() {
        init_subsystem(InitFlags::VIDEO);
        assert!(was_init(InitFlags::EVENTS).contains(InitFlags::EVENTS));
        assert!(require(InitFlags::VIDEO, "Video"));
        quit_subsystem(InitFlags::VIDEO);
    }

    #[test]
    fn test_game_controller_implies_joystick() {
        init_subsystem(InitFlags::GAME_CONTROLLER);
        assert!(require(InitFlags::JOYSTICK | InitFlags::EVENTS, "Joystick"));
        assert!(require(InitFlags::GAME_CONTROLLER, "GameController"));
        quit_subsystem(InitFlags::GAME_CONTROLLER);
    }
}
