//! # Library Context
//!
//! The native library keeps process-wide state: which subsystems are up, the hint
//! table and the hint callbacks. Instead of touching that state from anywhere, the
//! wrapper routes it through a [`Library`] value:
//!
//! - creating a `Library` initialises the configured subsystems and applies hints
//! - dropping it releases those subsystems again
//! - hints and hint callbacks are reached through `&Library`, and callbacks are
//!   unregistered by dropping the [`HintCallback`] guard, which cannot outlive the
//!   context that produced it
//!
//! Subsystem initialisation is reference counted by the native layer, so several
//! contexts may coexist (for example one per test).

use std::marker::PhantomData;
use std::sync::Arc;

use log::{debug, info};

use crate::core::config::LibraryConfig;
use crate::core::error::{Error, Result};
use crate::sys::{self, hints};

pub use crate::sys::InitFlags as Subsystems;

/// Priority used when setting a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HintPriority {
    /// Lowest priority, used for defaults
    Default,
    /// Priority of values set by the application
    Normal,
    /// Overrides any other value
    Override,
}

impl HintPriority {
    const fn native(self) -> i32 {
        match self {
            Self::Default => hints::HINT_DEFAULT,
            Self::Normal => hints::HINT_NORMAL,
            Self::Override => hints::HINT_OVERRIDE,
        }
    }
}

/// Explicit owner of the native library's process-wide state.
#[derive(Debug)]
pub struct Library {
    subsystems: Subsystems,
}

impl Library {
    /// Initialises the library as described by `config`.
    pub fn new(config: &LibraryConfig) -> Result<Self> {
        let library = Self::init(config.subsystems.flags())?;
        for (name, value) in &config.hints {
            library.set_hint(name, value, HintPriority::Normal);
        }
        for (name, value) in &config.override_hints {
            library.set_hint(name, value, HintPriority::Override);
        }
        Ok(library)
    }

    /// Initialises the given subsystems with no hints.
    pub fn init(subsystems: Subsystems) -> Result<Self> {
        if sys::init_subsystem(subsystems) != 0 {
            return Err(Error::native("Failed to initialize library"));
        }
        info!("Library initialized with subsystems {subsystems:?}");
        Ok(Self { subsystems })
    }

    /// Subsystems this context keeps alive.
    pub const fn subsystems(&self) -> Subsystems {
        self.subsystems
    }

    /// Whether all of `subsystems` are currently initialised by any context.
    pub fn is_initialized(subsystems: Subsystems) -> bool {
        sys::was_init(subsystems) == subsystems
    }

    /// Sets a hint. Returns `false` if a value with a higher priority is present.
    pub fn set_hint(&self, name: &str, value: impl std::fmt::Display, priority: HintPriority) -> bool {
        let value = value.to_string();
        let accepted = hints::set_hint_with_priority(name, &value, priority.native());
        if accepted {
            debug!("Hint {name} = {value} ({priority:?})");
        }
        accepted
    }

    /// Current value of a hint.
    pub fn hint(&self, name: &str) -> Option<String> {
        hints::get_hint(name)
    }

    /// Current value of a boolean hint (`"1"`/`"0"`, `"true"`/`"false"`).
    pub fn hint_bool(&self, name: &str) -> Option<bool> {
        match self.hint(name)?.as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }

    /// Removes every hint value.
    pub fn clear_hints(&self) {
        hints::clear_hints();
    }

    /// Registers `callback` for changes of `name`.
    ///
    /// The callback runs once right away with the current value, then with
    /// `(name, old, new)` on every change until the returned guard is dropped.
    pub fn add_hint_callback<F>(&self, name: &str, callback: F) -> HintCallback<'_>
    where
        F: Fn(&str, Option<&str>, Option<&str>) + Send + Sync + 'static,
    {
        let id = hints::add_hint_callback(name, Arc::new(callback));
        HintCallback {
            id,
            name: name.to_owned(),
            _library: PhantomData,
        }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        sys::quit_subsystem(self.subsystems);
        debug!("Library released subsystems {:?}", self.subsystems);
    }
}

/// Registration guard returned by [`Library::add_hint_callback`].
#[derive(Debug)]
#[must_use = "the callback is removed when the guard is dropped"]
pub struct HintCallback<'lib> {
    id: u64,
    name: String,
    _library: PhantomData<&'lib Library>,
}

impl HintCallback<'_> {
    /// Name of the observed hint.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for HintCallback<'_> {
    fn drop(&mut self) {
        hints::del_hint_callback(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SubsystemConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_context_keeps_subsystems_alive() {
        let library = Library::init(Subsystems::SENSOR).unwrap();
        assert!(Library::is_initialized(Subsystems::SENSOR));
        assert_eq!(library.subsystems(), Subsystems::SENSOR);
    }

    #[test]
    fn test_config_hints_are_applied() {
        let config = LibraryConfig::new(SubsystemConfig::default())
            .with_hint("LIBRARY_TEST_NORMAL", "1")
            .with_override_hint("LIBRARY_TEST_OVERRIDE", "0");
        let library = Library::new(&config).unwrap();
        assert_eq!(library.hint_bool("LIBRARY_TEST_NORMAL"), Some(true));
        assert_eq!(library.hint_bool("LIBRARY_TEST_OVERRIDE"), Some(false));
        assert!(!library.set_hint("LIBRARY_TEST_OVERRIDE", 1, HintPriority::Normal));
    }

    #[test]
    fn test_hint_callback_lifetime() {
        let library = Library::init(Subsystems::empty()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&calls);
            let guard = library.add_hint_callback("LIBRARY_TEST_CALLBACK", move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(guard.name(), "LIBRARY_TEST_CALLBACK");
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(library.set_hint("LIBRARY_TEST_CALLBACK", "a", HintPriority::Normal));
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
        assert!(library.set_hint("LIBRARY_TEST_CALLBACK", "b", HintPriority::Normal));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
