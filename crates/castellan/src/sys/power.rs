//! Native power supply status.
//!
//! The headless backend has no battery until one is described with
//! [`set_virtual_power_info`].

use parking_lot::Mutex;

use super::fail;

/// The state could not be determined.
pub const POWERSTATE_UNKNOWN: i32 = 0;
/// Unplugged, running on battery.
pub const POWERSTATE_ON_BATTERY: i32 = 1;
/// Plugged in, no battery present.
pub const POWERSTATE_NO_BATTERY: i32 = 2;
/// Plugged in, charging.
pub const POWERSTATE_CHARGING: i32 = 3;
/// Plugged in, fully charged.
pub const POWERSTATE_CHARGED: i32 = 4;

#[derive(Debug, Clone, Copy)]
struct PowerInfo {
    state: i32,
    seconds: i32,
    percent: i32,
}

static POWER: Mutex<PowerInfo> = Mutex::new(PowerInfo {
    state: POWERSTATE_NO_BATTERY,
    seconds: -1,
    percent: -1,
});

/// Current power state with the seconds and percentage of battery life left,
/// `-1` where unknown.
pub fn get_power_info() -> (i32, i32, i32) {
    let info = *POWER.lock();
    (info.state, info.seconds, info.percent)
}

/// Describes the power supply reported from now on. Negative values mean
/// unknown; percentages above `100` are rejected.
pub fn set_virtual_power_info(state: i32, seconds: i32, percent: i32) -> i32 {
    if !(POWERSTATE_UNKNOWN..=POWERSTATE_CHARGED).contains(&state) {
        return fail(format!("Invalid power state {state}"));
    }
    if percent > 100 {
        return fail(format!("Invalid battery percentage {percent}"));
    }
    *POWER.lock() = PowerInfo {
        state,
        seconds: seconds.max(-1),
        percent: percent.max(-1),
    };
    0
}
