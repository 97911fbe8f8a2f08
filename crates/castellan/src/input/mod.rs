//! # Input Module
//!
//! Game controllers, motion sensors and the keyboard.
//!
//! | Type | Owning | Handle |
//! |------|--------|--------|
//! | Joystick | [`Joystick`] | [`JoystickHandle`] |
//! | Game controller | [`Controller`] | [`ControllerHandle`] |
//! | Sensor | [`Sensor`] | [`SensorHandle`] |
//!
//! Devices are addressed two ways: by *device index*, which is only valid until
//! the next device is attached or detached, and by *instance id*, which stays
//! the same for as long as the device is connected. The `*_at` queries take a
//! device index and work without opening the device.
//!
//! Opening the same joystick or controller more than once shares one native
//! device. It stays open until the last owner is dropped.
//!
//! [`KeyState`] is not a resource; it copies the native keyboard array on every
//! [`update`](KeyState::update).

mod controller;
mod joystick;
mod key_state;
mod scan_code;
mod sensor;

pub use controller::{
    BasicController, Controller, ControllerAxis, ControllerButton, ControllerDeleter, ControllerHandle,
    MappingResult,
};
pub use joystick::{
    BasicJoystick, ButtonState, HatState, Joystick, JoystickDeleter, JoystickHandle, JoystickPower,
    JoystickType, VirtualJoystick,
};
pub use key_state::KeyState;
pub use scan_code::ScanCode;
pub use sensor::{BasicSensor, Sensor, SensorDeleter, SensorHandle, SensorType};

/// Serializes tests that touch the shared device registry or keyboard.
#[cfg(test)]
pub(crate) static DEVICE_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
