//! Native configuration hints.
//!
//! Hints are string key/value pairs with a priority; a value set with a lower
//! priority never replaces one set with a higher priority. Callbacks registered for
//! a hint fire on registration with the current value and on every change.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Priority of a value set by default.
pub const HINT_DEFAULT: i32 = 0;
/// Priority of a value set by the application.
pub const HINT_NORMAL: i32 = 1;
/// Priority of a value that overrides everything.
pub const HINT_OVERRIDE: i32 = 2;

/// Callback invoked with `(name, old_value, new_value)`.
pub type HintCallbackFn = dyn Fn(&str, Option<&str>, Option<&str>) + Send + Sync;

struct Callback {
    id: u64,
    name: String,
    callback: Arc<HintCallbackFn>,
}

#[derive(Default)]
struct HintTable {
    values: HashMap<String, (String, i32)>,
    callbacks: Vec<Callback>,
    next_callback_id: u64,
}

static HINTS: Mutex<Option<HintTable>> = Mutex::new(None);

fn with_table<R>(f: impl FnOnce(&mut HintTable) -> R) -> R {
    let mut table = HINTS.lock();
    f(table.get_or_insert_with(HintTable::default))
}

fn notify(name: &str, old: Option<&str>, new: Option<&str>) {
    // Collected first so callbacks can touch hints without deadlocking.
    let callbacks: Vec<Arc<HintCallbackFn>> = with_table(|table| {
        table
            .callbacks
            .iter()
            .filter(|callback| callback.name == name)
            .map(|callback| Arc::clone(&callback.callback))
            .collect()
    });
    for callback in callbacks {
        callback(name, old, new);
    }
}

/// Sets `name` to `value` unless a higher priority value is already present.
pub fn set_hint_with_priority(name: &str, value: &str, priority: i32) -> bool {
    let old = with_table(|table| match table.values.get(name) {
        Some((_, current)) if *current > priority => Err(()),
        Some((old, _)) if old == value => {
            table.values.insert(name.to_owned(), (value.to_owned(), priority));
            Ok(None)
        }
        existing => {
            let old = existing.map(|(old, _)| old.clone());
            table.values.insert(name.to_owned(), (value.to_owned(), priority));
            Ok(Some(old))
        }
    });
    match old {
        Err(()) => false,
        Ok(None) => true,
        Ok(Some(old)) => {
            notify(name, old.as_deref(), Some(value));
            true
        }
    }
}

/// Current value of `name`.
pub fn get_hint(name: &str) -> Option<String> {
    with_table(|table| table.values.get(name).map(|(value, _)| value.clone()))
}

/// Removes every hint value, notifying the callbacks of each removed hint.
pub fn clear_hints() {
    let removed: Vec<(String, String)> =
        with_table(|table| table.values.drain().map(|(name, (value, _))| (name, value)).collect());
    for (name, value) in removed {
        notify(&name, Some(&value), None);
    }
}

/// Registers a callback for `name` and returns its id. The callback fires
/// immediately with the current value.
pub fn add_hint_callback(name: &str, callback: Arc<HintCallbackFn>) -> u64 {
    let (id, current) = with_table(|table| {
        let id = table.next_callback_id;
        table.next_callback_id += 1;
        table.callbacks.push(Callback {
            id,
            name: name.to_owned(),
            callback: Arc::clone(&callback),
        });
        (id, table.values.get(name).map(|(value, _)| value.clone()))
    });
    callback(name, current.as_deref(), current.as_deref());
    id
}

/// Unregisters a callback. Unknown ids are ignored.
pub fn del_hint_callback(id: u64) {
    with_table(|table| table.callbacks.retain(|callback| callback.id != id));
}
