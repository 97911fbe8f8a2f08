//! Native joysticks, sensors and keyboard state.
//!
//! Devices are virtual: they are attached with [`attach_virtual_joystick`] or
//! [`attach_virtual_sensor`] and fed through the `set_virtual_*` functions, the same
//! way a headless test harness drives the native library. Device indices are
//! positions in the attach order; instance ids are stable for a device's lifetime.
//!
//! Opening a joystick or controller that is already open hands back the same
//! pointer with one more reference; it is freed by the close that drops the last
//! reference.

use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{const_reentrant_mutex, Mutex, ReentrantMutex};

use super::{fail, require, set_error, InitFlags};

/// Number of entries in the keyboard state array.
pub const NUM_SCANCODES: usize = 512;

/// Joystick type of a generic game controller.
pub const JOYSTICK_TYPE_GAMECONTROLLER: i32 = 1;

/// Battery level could not be determined.
pub const JOYSTICK_POWER_UNKNOWN: i32 = -1;
/// Battery nearly drained.
pub const JOYSTICK_POWER_EMPTY: i32 = 0;
/// Battery low.
pub const JOYSTICK_POWER_LOW: i32 = 1;
/// Battery medium.
pub const JOYSTICK_POWER_MEDIUM: i32 = 2;
/// Battery full.
pub const JOYSTICK_POWER_FULL: i32 = 3;
/// Powered by cable.
pub const JOYSTICK_POWER_WIRED: i32 = 4;
/// Highest power level code.
pub const JOYSTICK_POWER_MAX: i32 = 5;

/// Number of standard controller axes.
pub const CONTROLLER_AXIS_MAX: i32 = 6;
/// Number of standard controller buttons.
pub const CONTROLLER_BUTTON_MAX: i32 = 15;

/// Sensor type of an unopened or invalid device.
pub const SENSOR_INVALID: i32 = -1;
/// Sensor of unknown kind.
pub const SENSOR_UNKNOWN: i32 = 0;
/// Accelerometer.
pub const SENSOR_ACCEL: i32 = 1;
/// Gyroscope.
pub const SENSOR_GYRO: i32 = 2;

/// Description of a virtual joystick to attach.
#[derive(Debug, Clone, Default)]
pub struct VirtualJoystickDesc {
    /// Device name
    pub name: String,
    /// Joystick type
    pub kind: i32,
    /// Number of axes
    pub axes: usize,
    /// Number of buttons
    pub buttons: usize,
    /// Number of hats
    pub hats: usize,
    /// USB vendor id, `0` when unknown
    pub vendor: u16,
    /// USB product id, `0` when unknown
    pub product: u16,
    /// Product version, `0` when unknown
    pub product_version: u16,
}

#[derive(Debug)]
struct JoystickDevice {
    instance_id: i32,
    desc: VirtualJoystickDesc,
    axes: Vec<i16>,
    buttons: Vec<u8>,
    hats: Vec<u8>,
    player_index: i32,
    rumble: (u16, u16, u32),
    power: i32,
    opened: usize,
    controller: usize,
}

#[derive(Debug)]
struct SensorDevice {
    instance_id: i32,
    name: String,
    kind: i32,
    non_portable: i32,
    data: Vec<f32>,
    pending: Vec<f32>,
}

#[derive(Debug)]
struct ControllerMapping {
    guid: String,
    text: String,
}

#[derive(Debug)]
struct Registry {
    next_instance_id: i32,
    joysticks: Vec<JoystickDevice>,
    sensors: Vec<SensorDevice>,
    mappings: Vec<ControllerMapping>,
    keyboard: [u8; NUM_SCANCODES],
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
    next_instance_id: 0,
    joysticks: Vec::new(),
    sensors: Vec::new(),
    mappings: Vec::new(),
    keyboard: [0; NUM_SCANCODES],
});

static SENSOR_LOCK: ReentrantMutex<()> = const_reentrant_mutex(());

thread_local! {
    static SENSOR_LOCK_DEPTH: Cell<u32> = const { Cell::new(0) };
}

impl Registry {
    fn allocate_instance_id(&mut self) -> i32 {
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        id
    }

    fn joystick(&mut self, instance_id: i32) -> Option<&mut JoystickDevice> {
        let device = self.joysticks.iter_mut().find(|device| device.instance_id == instance_id);
        if device.is_none() {
            set_error("Joystick hasn't been opened yet or was detached");
        }
        device
    }

    fn joystick_at(&self, index: i32) -> Option<&JoystickDevice> {
        let device = usize::try_from(index).ok().and_then(|index| self.joysticks.get(index));
        if device.is_none() {
            set_error(format!(
                "There are {} joysticks available",
                self.joysticks.len()
            ));
        }
        device
    }

    fn sensor(&mut self, instance_id: i32) -> Option<&mut SensorDevice> {
        let device = self.sensors.iter_mut().find(|device| device.instance_id == instance_id);
        if device.is_none() {
            set_error("Sensor hasn't been opened yet or was detached");
        }
        device
    }

    fn sensor_at(&self, index: i32) -> Option<&SensorDevice> {
        let device = usize::try_from(index).ok().and_then(|index| self.sensors.get(index));
        if device.is_none() {
            set_error(format!("There are {} sensors available", self.sensors.len()));
        }
        device
    }
}

fn count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Joysticks
// ---------------------------------------------------------------------------

/// Opaque native joystick; refers to its device by instance id.
#[derive(Debug)]
pub struct NativeJoystick {
    instance_id: i32,
    refs: AtomicU32,
}

/// Attaches a virtual joystick and returns its device index.
pub fn attach_virtual_joystick(desc: VirtualJoystickDesc) -> i32 {
    let mut registry = REGISTRY.lock();
    let instance_id = registry.allocate_instance_id();
    registry.joysticks.push(JoystickDevice {
        instance_id,
        axes: vec![0; desc.axes],
        buttons: vec![0; desc.buttons],
        hats: vec![0; desc.hats],
        desc,
        player_index: -1,
        rumble: (0, 0, 0),
        power: JOYSTICK_POWER_UNKNOWN,
        opened: 0,
        controller: 0,
    });
    count(registry.joysticks.len() - 1)
}

/// Detaches the virtual joystick at `index`. Opened pointers stay valid but stop
/// reporting data.
pub fn detach_virtual_joystick(index: i32) -> i32 {
    let mut registry = REGISTRY.lock();
    match usize::try_from(index).ok().filter(|index| *index < registry.joysticks.len()) {
        Some(index) => {
            registry.joysticks.remove(index);
            0
        }
        None => fail(format!("No joystick at index {index}")),
    }
}

/// Number of attached joysticks.
pub fn num_joysticks() -> i32 {
    count(REGISTRY.lock().joysticks.len())
}

/// Opens the joystick at `index`, or returns null. Requires the joystick subsystem.
pub fn joystick_open(index: i32) -> *mut NativeJoystick {
    if !require(InitFlags::JOYSTICK, "Joystick") {
        return ptr::null_mut();
    }
    let mut registry = REGISTRY.lock();
    let Some(instance_id) = registry.joystick_at(index).map(|device| device.instance_id) else {
        return ptr::null_mut();
    };
    registry.joystick(instance_id).map_or(ptr::null_mut(), open_device)
}

fn open_device(device: &mut JoystickDevice) -> *mut NativeJoystick {
    if device.opened != 0 {
        let joystick = device.opened as *mut NativeJoystick;
        // SAFETY: `opened` is cleared under the registry lock before the last
        // reference is freed, so a stored pointer is live.
        unsafe { &*joystick }.refs.fetch_add(1, Ordering::Relaxed);
        return joystick;
    }
    let joystick = Box::into_raw(Box::new(NativeJoystick {
        instance_id: device.instance_id,
        refs: AtomicU32::new(1),
    }));
    device.opened = joystick as usize;
    joystick
}

/// Drops one reference to an opened joystick and frees it with the last one.
/// Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_close(joystick: *mut NativeJoystick) {
    if joystick.is_null() {
        return;
    }
    let mut registry = REGISTRY.lock();
    // SAFETY: non-null pointers handed to this function came from `joystick_open`
    // and still hold the reference being dropped.
    if unsafe { &*joystick }.refs.fetch_sub(1, Ordering::AcqRel) > 1 {
        return;
    }
    if let Some(device) = registry
        .joysticks
        .iter_mut()
        .find(|device| device.opened == joystick as usize)
    {
        device.opened = 0;
    }
    drop(registry);
    // SAFETY: that was the last reference and the registry no longer hands it out.
    drop(unsafe { Box::from_raw(joystick) });
}

/// The opened joystick with `instance_id`, or null.
pub fn joystick_from_instance_id(instance_id: i32) -> *mut NativeJoystick {
    let mut registry = REGISTRY.lock();
    registry
        .joystick(instance_id)
        .map_or(ptr::null_mut(), |device| device.opened as *mut NativeJoystick)
}

/// The opened joystick assigned to `player_index`, or null.
pub fn joystick_from_player_index(player_index: i32) -> *mut NativeJoystick {
    let registry = REGISTRY.lock();
    let found = registry
        .joysticks
        .iter()
        .find(|device| device.player_index == player_index && device.opened != 0);
    if found.is_none() {
        set_error(format!("No joystick for player index {player_index}"));
    }
    found.map_or(ptr::null_mut(), |device| device.opened as *mut NativeJoystick)
}

/// Runs `f` on the device behind an opened joystick.
unsafe fn with_joystick<R>(
    joystick: *mut NativeJoystick,
    f: impl FnOnce(&mut JoystickDevice) -> Option<R>,
) -> Option<R> {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(joystick) = (unsafe { joystick.as_ref() }) else {
        set_error("Joystick hasn't been opened yet");
        return None;
    };
    let mut registry = REGISTRY.lock();
    registry.joystick(joystick.instance_id).and_then(f)
}

/// Instance id, `-1` for null or detached.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_instance_id(joystick: *mut NativeJoystick) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    unsafe { joystick.as_ref() }.map_or(-1, |joystick| joystick.instance_id)
}

/// Device name.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_name(joystick: *mut NativeJoystick) -> Option<String> {
    // SAFETY: forwarded contract.
    unsafe { with_joystick(joystick, |device| Some(device.desc.name.clone())) }
}

/// Joystick type, `0` when unknown.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_type(joystick: *mut NativeJoystick) -> i32 {
    // SAFETY: forwarded contract.
    unsafe { with_joystick(joystick, |device| Some(device.desc.kind)) }.unwrap_or(0)
}

/// Number of axes, buttons and hats; `-1` each on error.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_counts(joystick: *mut NativeJoystick) -> (i32, i32, i32) {
    // SAFETY: forwarded contract.
    unsafe {
        with_joystick(joystick, |device| {
            Some((count(device.axes.len()), count(device.buttons.len()), count(device.hats.len())))
        })
    }
    .unwrap_or((-1, -1, -1))
}

/// Position of `axis`, `None` if out of range.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_get_axis(joystick: *mut NativeJoystick, axis: i32) -> Option<i16> {
    // SAFETY: forwarded contract.
    unsafe {
        with_joystick(joystick, |device| {
            let value = usize::try_from(axis).ok().and_then(|axis| device.axes.get(axis)).copied();
            if value.is_none() {
                set_error(format!("Joystick only has {} axes", device.axes.len()));
            }
            value
        })
    }
}

/// State of `button` (`1` pressed), `None` if out of range.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_get_button(joystick: *mut NativeJoystick, button: i32) -> Option<u8> {
    // SAFETY: forwarded contract.
    unsafe {
        with_joystick(joystick, |device| {
            let value =
                usize::try_from(button).ok().and_then(|button| device.buttons.get(button)).copied();
            if value.is_none() {
                set_error(format!("Joystick only has {} buttons", device.buttons.len()));
            }
            value
        })
    }
}

/// Position bits of `hat`, `None` if out of range.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_get_hat(joystick: *mut NativeJoystick, hat: i32) -> Option<u8> {
    // SAFETY: forwarded contract.
    unsafe {
        with_joystick(joystick, |device| {
            let value = usize::try_from(hat).ok().and_then(|hat| device.hats.get(hat)).copied();
            if value.is_none() {
                set_error(format!("Joystick only has {} hats", device.hats.len()));
            }
            value
        })
    }
}

/// Feeds an axis value into a virtual joystick.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_set_virtual_axis(joystick: *mut NativeJoystick, axis: i32, value: i16) -> i32 {
    // SAFETY: forwarded contract.
    let stored = unsafe {
        with_joystick(joystick, |device| {
            let slot = usize::try_from(axis).ok().and_then(|axis| device.axes.get_mut(axis))?;
            *slot = value;
            Some(())
        })
    };
    stored.map_or_else(|| fail("Invalid virtual joystick axis"), |()| 0)
}

/// Feeds a button state into a virtual joystick.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_set_virtual_button(joystick: *mut NativeJoystick, button: i32, value: u8) -> i32 {
    // SAFETY: forwarded contract.
    let stored = unsafe {
        with_joystick(joystick, |device| {
            let slot =
                usize::try_from(button).ok().and_then(|button| device.buttons.get_mut(button))?;
            *slot = value;
            Some(())
        })
    };
    stored.map_or_else(|| fail("Invalid virtual joystick button"), |()| 0)
}

/// Feeds hat bits into a virtual joystick.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_set_virtual_hat(joystick: *mut NativeJoystick, hat: i32, value: u8) -> i32 {
    // SAFETY: forwarded contract.
    let stored = unsafe {
        with_joystick(joystick, |device| {
            let slot = usize::try_from(hat).ok().and_then(|hat| device.hats.get_mut(hat))?;
            *slot = value;
            Some(())
        })
    };
    stored.map_or_else(|| fail("Invalid virtual joystick hat"), |()| 0)
}

/// Player index, `-1` when unassigned.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_player_index(joystick: *mut NativeJoystick) -> i32 {
    // SAFETY: forwarded contract.
    unsafe { with_joystick(joystick, |device| Some(device.player_index)) }.unwrap_or(-1)
}

/// Assigns a player index, `-1` clears it.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_set_player_index(joystick: *mut NativeJoystick, player_index: i32) {
    // SAFETY: forwarded contract.
    unsafe {
        with_joystick(joystick, |device| {
            device.player_index = player_index.max(-1);
            Some(())
        });
    }
}

/// Vendor, product and product version ids, `0` when unknown.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_usb_ids(joystick: *mut NativeJoystick) -> (u16, u16, u16) {
    // SAFETY: forwarded contract.
    unsafe {
        with_joystick(joystick, |device| {
            Some((device.desc.vendor, device.desc.product, device.desc.product_version))
        })
    }
    .unwrap_or((0, 0, 0))
}

/// Starts a rumble effect.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_rumble(joystick: *mut NativeJoystick, low: u16, high: u16, duration_ms: u32) -> i32 {
    // SAFETY: forwarded contract.
    let started = unsafe {
        with_joystick(joystick, |device| {
            device.rumble = (low, high, duration_ms);
            Some(())
        })
    };
    started.map_or(-1, |()| 0)
}

/// Battery level, [`JOYSTICK_POWER_UNKNOWN`] on error.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_current_power_level(joystick: *mut NativeJoystick) -> i32 {
    // SAFETY: forwarded contract.
    unsafe { with_joystick(joystick, |device| Some(device.power)) }.unwrap_or(JOYSTICK_POWER_UNKNOWN)
}

/// Sets the battery level a virtual joystick reports.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_set_virtual_power_level(joystick: *mut NativeJoystick, level: i32) -> i32 {
    if !(JOYSTICK_POWER_UNKNOWN..=JOYSTICK_POWER_MAX).contains(&level) {
        return fail(format!("Invalid power level {level}"));
    }
    // SAFETY: forwarded contract.
    let stored = unsafe {
        with_joystick(joystick, |device| {
            device.power = level;
            Some(())
        })
    };
    stored.map_or(-1, |()| 0)
}

/// Last requested rumble effect.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn joystick_last_rumble(joystick: *mut NativeJoystick) -> Option<(u16, u16, u32)> {
    // SAFETY: forwarded contract.
    unsafe { with_joystick(joystick, |device| Some(device.rumble)) }
}

/// Name of the device at `index`.
pub fn joystick_device_name(index: i32) -> Option<String> {
    REGISTRY.lock().joystick_at(index).map(|device| device.desc.name.clone())
}

/// Instance id of the device at `index`, `-1` if there is none.
pub fn joystick_device_instance_id(index: i32) -> i32 {
    REGISTRY.lock().joystick_at(index).map_or(-1, |device| device.instance_id)
}

/// Player index of the device at `index`, `-1` if unassigned or absent.
pub fn joystick_device_player_index(index: i32) -> i32 {
    REGISTRY.lock().joystick_at(index).map_or(-1, |device| device.player_index)
}

/// Joystick type of the device at `index`, `0` if absent.
pub fn joystick_device_type(index: i32) -> i32 {
    REGISTRY.lock().joystick_at(index).map_or(0, |device| device.desc.kind)
}

/// Vendor, product and product version ids of the device at `index`.
pub fn joystick_device_usb_ids(index: i32) -> (u16, u16, u16) {
    REGISTRY.lock().joystick_at(index).map_or((0, 0, 0), |device| {
        (device.desc.vendor, device.desc.product, device.desc.product_version)
    })
}

// ---------------------------------------------------------------------------
// Game controllers
// ---------------------------------------------------------------------------

/// Opaque native game controller; wraps an opened joystick.
#[derive(Debug)]
pub struct NativeController {
    joystick: *mut NativeJoystick,
    refs: AtomicU32,
}

/// Whether the device at `index` has a standard controller layout.
pub fn is_game_controller(index: i32) -> bool {
    REGISTRY
        .lock()
        .joystick_at(index)
        .is_some_and(|device| device.desc.kind == JOYSTICK_TYPE_GAMECONTROLLER)
}

/// Opens the device at `index` as a game controller, or returns null. Requires
/// the game controller subsystem.
pub fn controller_open(index: i32) -> *mut NativeController {
    if !require(InitFlags::GAME_CONTROLLER, "GameController") {
        return ptr::null_mut();
    }
    let mut registry = REGISTRY.lock();
    let Some(instance_id) = registry.joystick_at(index).map(|device| device.instance_id) else {
        return ptr::null_mut();
    };
    registry.joystick(instance_id).map_or(ptr::null_mut(), open_controller)
}

/// Opens the attached device with `instance_id` as a game controller, or
/// returns null.
pub fn controller_open_instance(instance_id: i32) -> *mut NativeController {
    if !require(InitFlags::GAME_CONTROLLER, "GameController") {
        return ptr::null_mut();
    }
    REGISTRY
        .lock()
        .joystick(instance_id)
        .map_or(ptr::null_mut(), open_controller)
}

fn open_controller(device: &mut JoystickDevice) -> *mut NativeController {
    if device.desc.kind != JOYSTICK_TYPE_GAMECONTROLLER {
        set_error(format!("Couldn't find mapping for device ({})", device.instance_id));
        return ptr::null_mut();
    }
    if device.controller != 0 {
        let controller = device.controller as *mut NativeController;
        // SAFETY: `controller` is cleared under the registry lock before the last
        // reference is freed, so a stored pointer is live.
        unsafe { &*controller }.refs.fetch_add(1, Ordering::Relaxed);
        return controller;
    }
    let joystick = open_device(device);
    let controller = Box::into_raw(Box::new(NativeController {
        joystick,
        refs: AtomicU32::new(1),
    }));
    device.controller = controller as usize;
    controller
}

/// Drops one reference to an opened controller. The last one also closes the
/// joystick underneath. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn controller_close(controller: *mut NativeController) {
    if controller.is_null() {
        return;
    }
    let mut registry = REGISTRY.lock();
    // SAFETY: non-null pointers handed to this function came from `controller_open`
    // and still hold the reference being dropped.
    if unsafe { &*controller }.refs.fetch_sub(1, Ordering::AcqRel) > 1 {
        return;
    }
    if let Some(device) = registry
        .joysticks
        .iter_mut()
        .find(|device| device.controller == controller as usize)
    {
        device.controller = 0;
    }
    drop(registry);
    // SAFETY: that was the last reference and the registry no longer hands it out.
    let controller = unsafe { Box::from_raw(controller) };
    // SAFETY: the controller held one reference to its joystick.
    unsafe { joystick_close(controller.joystick) }
}

/// The joystick under a controller, null for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn controller_get_joystick(controller: *mut NativeController) -> *mut NativeJoystick {
    // SAFETY: the caller guarantees the pointer is null or live.
    match unsafe { controller.as_ref() } {
        Some(controller) => controller.joystick,
        None => {
            set_error("Controller hasn't been opened yet");
            ptr::null_mut()
        }
    }
}

/// Position of a standard `axis`, `None` if out of range.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn controller_get_axis(controller: *mut NativeController, axis: i32) -> Option<i16> {
    if !(0..CONTROLLER_AXIS_MAX).contains(&axis) {
        set_error(format!("Invalid controller axis {axis}"));
        return None;
    }
    // SAFETY: forwarded contract.
    unsafe { joystick_get_axis(controller_get_joystick(controller), axis) }
}

/// State of a standard `button` (`1` pressed), `None` if out of range.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn controller_get_button(controller: *mut NativeController, button: i32) -> Option<u8> {
    if !(0..CONTROLLER_BUTTON_MAX).contains(&button) {
        set_error(format!("Invalid controller button {button}"));
        return None;
    }
    // SAFETY: forwarded contract.
    unsafe { joystick_get_button(controller_get_joystick(controller), button) }
}

/// Adds a `"guid,name,bindings"` mapping. Returns `1` when added, `0` when a
/// mapping for the same GUID was replaced and `-1` if the text is malformed.
pub fn controller_add_mapping(mapping: &str) -> i32 {
    let mapping = mapping.trim();
    let mut fields = mapping.splitn(3, ',');
    let (Some(guid), Some(_name), Some(_bindings)) = (fields.next(), fields.next(), fields.next())
    else {
        return fail("Couldn't parse controller mapping");
    };
    if guid.is_empty() || !guid.chars().all(|c| c.is_ascii_hexdigit()) {
        return fail(format!("Couldn't parse GUID from {guid}"));
    }
    let mut registry = REGISTRY.lock();
    if let Some(existing) = registry.mappings.iter_mut().find(|existing| existing.guid == guid) {
        existing.text = mapping.to_owned();
        return 0;
    }
    registry.mappings.push(ControllerMapping {
        guid: guid.to_owned(),
        text: mapping.to_owned(),
    });
    1
}

/// Number of installed mappings.
pub fn controller_num_mappings() -> i32 {
    count(REGISTRY.lock().mappings.len())
}

/// Text of the mapping at `index`.
pub fn controller_mapping_for_index(index: i32) -> Option<String> {
    let registry = REGISTRY.lock();
    let mapping = usize::try_from(index).ok().and_then(|index| registry.mappings.get(index));
    if mapping.is_none() {
        set_error(format!("Mapping not available at index {index}"));
    }
    mapping.map(|mapping| mapping.text.clone())
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Opaque native sensor; refers to its device by instance id.
#[derive(Debug)]
pub struct NativeSensor {
    instance_id: i32,
}

/// Attaches a virtual sensor reporting `channels` values and returns its index.
pub fn attach_virtual_sensor(name: &str, kind: i32, non_portable: i32, channels: usize) -> i32 {
    let mut registry = REGISTRY.lock();
    let instance_id = registry.allocate_instance_id();
    registry.sensors.push(SensorDevice {
        instance_id,
        name: name.to_owned(),
        kind,
        non_portable,
        data: vec![0.0; channels],
        pending: vec![0.0; channels],
    });
    count(registry.sensors.len() - 1)
}

/// Detaches the virtual sensor at `index`.
pub fn detach_virtual_sensor(index: i32) -> i32 {
    let mut registry = REGISTRY.lock();
    match usize::try_from(index).ok().filter(|index| *index < registry.sensors.len()) {
        Some(index) => {
            registry.sensors.remove(index);
            0
        }
        None => fail(format!("No sensor at index {index}")),
    }
}

/// Number of attached sensors.
pub fn num_sensors() -> i32 {
    count(REGISTRY.lock().sensors.len())
}

/// Opens the sensor at `index`, or returns null. Requires the sensor subsystem.
pub fn sensor_open(index: i32) -> *mut NativeSensor {
    if !require(InitFlags::SENSOR, "Sensor") {
        return ptr::null_mut();
    }
    REGISTRY.lock().sensor_at(index).map_or(ptr::null_mut(), |device| {
        Box::into_raw(Box::new(NativeSensor {
            instance_id: device.instance_id,
        }))
    })
}

/// Closes an opened sensor. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn sensor_close(sensor: *mut NativeSensor) {
    if !sensor.is_null() {
        // SAFETY: non-null pointers handed to this function came from `sensor_open`.
        drop(unsafe { Box::from_raw(sensor) });
    }
}

unsafe fn with_sensor<R>(sensor: *mut NativeSensor, f: impl FnOnce(&mut SensorDevice) -> R) -> Option<R> {
    // SAFETY: the caller guarantees the pointer is null or live.
    let Some(sensor) = (unsafe { sensor.as_ref() }) else {
        set_error("Sensor hasn't been opened yet");
        return None;
    };
    let _sensors = SENSOR_LOCK.lock();
    REGISTRY.lock().sensor(sensor.instance_id).map(f)
}

/// Instance id, `-1` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn sensor_instance_id(sensor: *mut NativeSensor) -> i32 {
    // SAFETY: the caller guarantees the pointer is null or live.
    unsafe { sensor.as_ref() }.map_or(-1, |sensor| sensor.instance_id)
}

/// Device name.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn sensor_name(sensor: *mut NativeSensor) -> Option<String> {
    // SAFETY: forwarded contract.
    unsafe { with_sensor(sensor, |device| device.name.clone()) }
}

/// Sensor type, [`SENSOR_INVALID`] for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn sensor_type(sensor: *mut NativeSensor) -> i32 {
    // SAFETY: forwarded contract.
    unsafe { with_sensor(sensor, |device| device.kind) }.unwrap_or(SENSOR_INVALID)
}

/// Platform specific type, `-1` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn sensor_non_portable_type(sensor: *mut NativeSensor) -> i32 {
    // SAFETY: forwarded contract.
    unsafe { with_sensor(sensor, |device| device.non_portable) }.unwrap_or(-1)
}

/// Copies the latest readings into `out`; missing channels read as zero.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn sensor_get_data(sensor: *mut NativeSensor, out: &mut [f32]) -> i32 {
    // SAFETY: forwarded contract.
    let copied = unsafe {
        with_sensor(sensor, |device| {
            out.fill(0.0);
            let n = out.len().min(device.data.len());
            out[..n].copy_from_slice(&device.data[..n]);
        })
    };
    copied.map_or(-1, |()| 0)
}

/// Queues readings for the virtual sensor with `instance_id`. They become
/// visible with the next [`sensor_update`].
pub fn sensor_set_virtual_data(instance_id: i32, data: &[f32]) -> i32 {
    let mut registry = REGISTRY.lock();
    let Some(device) = registry.sensor(instance_id) else {
        return -1;
    };
    let n = data.len().min(device.pending.len());
    device.pending[..n].copy_from_slice(&data[..n]);
    0
}

/// Publishes the readings queued on every sensor. Blocks while another thread
/// holds the sensor lock.
pub fn sensor_update() {
    let _sensors = SENSOR_LOCK.lock();
    let mut registry = REGISTRY.lock();
    for device in &mut registry.sensors {
        device.data.copy_from_slice(&device.pending);
    }
}

/// Takes the sensor lock. The lock is recursive; every call needs a matching
/// [`unlock_sensors`] on the same thread.
pub fn lock_sensors() {
    std::mem::forget(SENSOR_LOCK.lock());
    SENSOR_LOCK_DEPTH.with(|depth| depth.set(depth.get() + 1));
}

/// Releases one level of the sensor lock taken by this thread.
pub fn unlock_sensors() -> i32 {
    let held = SENSOR_LOCK_DEPTH.with(|depth| {
        let current = depth.get();
        depth.set(current.saturating_sub(1));
        current > 0
    });
    if !held {
        return fail("Sensors are not locked by this thread");
    }
    // SAFETY: this thread holds a level of the lock forgotten in `lock_sensors`.
    unsafe { SENSOR_LOCK.force_unlock() };
    0
}

/// Name of the sensor at `index`.
pub fn sensor_device_name(index: i32) -> Option<String> {
    REGISTRY.lock().sensor_at(index).map(|device| device.name.clone())
}

/// Type of the sensor at `index`, [`SENSOR_INVALID`] if absent.
pub fn sensor_device_type(index: i32) -> i32 {
    REGISTRY.lock().sensor_at(index).map_or(SENSOR_INVALID, |device| device.kind)
}

/// Platform specific type of the sensor at `index`, `-1` if absent.
pub fn sensor_device_non_portable_type(index: i32) -> i32 {
    REGISTRY.lock().sensor_at(index).map_or(-1, |device| device.non_portable)
}

/// Instance id of the sensor at `index`, `-1` if absent.
pub fn sensor_device_instance_id(index: i32) -> i32 {
    REGISTRY.lock().sensor_at(index).map_or(-1, |device| device.instance_id)
}

// ---------------------------------------------------------------------------
// Keyboard
// ---------------------------------------------------------------------------

/// Copies the keyboard state array (`1` for pressed) into `out`.
pub fn keyboard_state(out: &mut [u8]) -> usize {
    let registry = REGISTRY.lock();
    let n = out.len().min(NUM_SCANCODES);
    out[..n].copy_from_slice(&registry.keyboard[..n]);
    NUM_SCANCODES
}

/// Records a key press or release, as the event pump would.
pub fn push_key_event(scancode: usize, pressed: bool) -> i32 {
    let mut registry = REGISTRY.lock();
    match registry.keyboard.get_mut(scancode) {
        Some(state) => {
            *state = u8::from(pressed);
            0
        }
        None => fail(format!("Invalid scancode {scancode}")),
    }
}
