//! # Battery
//!
//! System power supply status. Every query takes a fresh snapshot; nothing
//! needs to be initialised first.

use std::fmt;

use crate::core::Outcome;
use crate::sys::power::{
    self as native, POWERSTATE_CHARGED, POWERSTATE_CHARGING, POWERSTATE_NO_BATTERY, POWERSTATE_ON_BATTERY,
    POWERSTATE_UNKNOWN,
};

/// How the system is powered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowerState {
    /// Could not be determined.
    #[default]
    Unknown,
    /// Unplugged, running on battery.
    OnBattery,
    /// Plugged in, no battery present.
    NoBattery,
    /// Plugged in, charging.
    Charging,
    /// Plugged in, fully charged.
    Charged,
}

impl PowerState {
    pub(crate) const fn from_native(state: i32) -> Self {
        match state {
            POWERSTATE_ON_BATTERY => Self::OnBattery,
            POWERSTATE_NO_BATTERY => Self::NoBattery,
            POWERSTATE_CHARGING => Self::Charging,
            POWERSTATE_CHARGED => Self::Charged,
            _ => Self::Unknown,
        }
    }

    pub(crate) const fn to_native(self) -> i32 {
        match self {
            Self::Unknown => POWERSTATE_UNKNOWN,
            Self::OnBattery => POWERSTATE_ON_BATTERY,
            Self::NoBattery => POWERSTATE_NO_BATTERY,
            Self::Charging => POWERSTATE_CHARGING,
            Self::Charged => POWERSTATE_CHARGED,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::OnBattery => "on_battery",
            Self::NoBattery => "no_battery",
            Self::Charging => "charging",
            Self::Charged => "charged",
        };
        f.write_str(name)
    }
}

fn known(value: i32) -> Option<i32> {
    (value >= 0).then_some(value)
}

/// Seconds of battery life left, if it can be estimated.
pub fn seconds_left() -> Option<i32> {
    known(native::get_power_info().1)
}

/// Whole minutes of battery life left, if it can be estimated.
pub fn minutes_left() -> Option<i32> {
    seconds_left().map(|seconds| seconds / 60)
}

/// Battery charge in `0..=100`, if known.
pub fn percentage() -> Option<i32> {
    known(native::get_power_info().2)
}

/// Current power state.
pub fn state() -> PowerState {
    PowerState::from_native(native::get_power_info().0)
}

/// Whether the system has a battery, charging or not.
pub fn exists() -> bool {
    matches!(
        state(),
        PowerState::OnBattery | PowerState::Charging | PowerState::Charged
    )
}

/// Makes the headless backend report a battery. `None` marks a value as
/// unknown.
pub fn set_virtual(state: PowerState, seconds_left: Option<i32>, percentage: Option<i32>) -> Outcome {
    Outcome::from_status(native::set_virtual_power_info(
        state.to_native(),
        seconds_left.unwrap_or(-1),
        percentage.unwrap_or(-1),
    ))
}
