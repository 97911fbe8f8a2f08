//! Joysticks

use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;

use log::{debug, warn};

use crate::core::{Deleter, Error, Handle, Outcome, Owning, Ownership, PointerManager, Result};
use crate::sys::input::{
    self as native, NativeJoystick, VirtualJoystickDesc, JOYSTICK_POWER_EMPTY, JOYSTICK_POWER_FULL,
    JOYSTICK_POWER_LOW, JOYSTICK_POWER_MAX, JOYSTICK_POWER_MEDIUM, JOYSTICK_POWER_UNKNOWN,
    JOYSTICK_POWER_WIRED, JOYSTICK_TYPE_GAMECONTROLLER,
};

/// Closes native joysticks.
pub struct JoystickDeleter;

impl Deleter<NativeJoystick> for JoystickDeleter {
    unsafe fn delete(ptr: NonNull<NativeJoystick>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::joystick_close(ptr.as_ptr()) }
    }
}

/// Kind of device behind a joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoystickType {
    /// Not reported by the device.
    #[default]
    Unknown,
    /// A gamepad with a standard layout.
    GameController,
    /// Any other native type code.
    Other(i32),
}

impl JoystickType {
    pub(crate) const fn from_native(kind: i32) -> Self {
        match kind {
            0 => Self::Unknown,
            JOYSTICK_TYPE_GAMECONTROLLER => Self::GameController,
            other => Self::Other(other),
        }
    }

    pub(crate) const fn to_native(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::GameController => JOYSTICK_TYPE_GAMECONTROLLER,
            Self::Other(other) => other,
        }
    }
}

/// Battery level reported by a joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoystickPower {
    /// Could not be determined.
    #[default]
    Unknown,
    /// Five percent or less.
    Empty,
    /// Twenty percent or less.
    Low,
    /// Seventy percent or less.
    Medium,
    /// Up to a hundred percent.
    Full,
    /// Plugged in, no battery in use.
    Wired,
    /// Highest level code.
    Max,
}

impl JoystickPower {
    pub(crate) const fn from_native(level: i32) -> Self {
        match level {
            JOYSTICK_POWER_EMPTY => Self::Empty,
            JOYSTICK_POWER_LOW => Self::Low,
            JOYSTICK_POWER_MEDIUM => Self::Medium,
            JOYSTICK_POWER_FULL => Self::Full,
            JOYSTICK_POWER_WIRED => Self::Wired,
            JOYSTICK_POWER_MAX => Self::Max,
            _ => Self::Unknown,
        }
    }

    pub(crate) const fn to_native(self) -> i32 {
        match self {
            Self::Unknown => JOYSTICK_POWER_UNKNOWN,
            Self::Empty => JOYSTICK_POWER_EMPTY,
            Self::Low => JOYSTICK_POWER_LOW,
            Self::Medium => JOYSTICK_POWER_MEDIUM,
            Self::Full => JOYSTICK_POWER_FULL,
            Self::Wired => JOYSTICK_POWER_WIRED,
            Self::Max => JOYSTICK_POWER_MAX,
        }
    }
}

/// State of a joystick button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// Up.
    Released,
    /// Down.
    Pressed,
}

impl From<bool> for ButtonState {
    fn from(pressed: bool) -> Self {
        if pressed {
            Self::Pressed
        } else {
            Self::Released
        }
    }
}

/// Position of a joystick hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HatState {
    /// Neutral.
    #[default]
    Centered,
    /// Up.
    Up,
    /// Right.
    Right,
    /// Down.
    Down,
    /// Left.
    Left,
    /// Up and right.
    RightUp,
    /// Down and right.
    RightDown,
    /// Up and left.
    LeftUp,
    /// Down and left.
    LeftDown,
}

impl HatState {
    const UP: u8 = 0x01;
    const RIGHT: u8 = 0x02;
    const DOWN: u8 = 0x04;
    const LEFT: u8 = 0x08;

    /// Decodes native position bits. Contradicting bits read as centered.
    pub(crate) const fn from_native(bits: u8) -> Self {
        match bits {
            Self::UP => Self::Up,
            Self::RIGHT => Self::Right,
            Self::DOWN => Self::Down,
            Self::LEFT => Self::Left,
            0x03 => Self::RightUp,
            0x06 => Self::RightDown,
            0x09 => Self::LeftUp,
            0x0C => Self::LeftDown,
            _ => Self::Centered,
        }
    }

    pub(crate) const fn to_native(self) -> u8 {
        match self {
            Self::Centered => 0,
            Self::Up => Self::UP,
            Self::Right => Self::RIGHT,
            Self::Down => Self::DOWN,
            Self::Left => Self::LEFT,
            Self::RightUp => Self::RIGHT | Self::UP,
            Self::RightDown => Self::RIGHT | Self::DOWN,
            Self::LeftUp => Self::LEFT | Self::UP,
            Self::LeftDown => Self::LEFT | Self::DOWN,
        }
    }
}

/// Description of a virtual joystick for [`Joystick::attach_virtual`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VirtualJoystick {
    /// Device name.
    pub name: String,
    /// Reported type.
    pub kind: JoystickType,
    /// Number of axes.
    pub axes: usize,
    /// Number of buttons.
    pub buttons: usize,
    /// Number of hats.
    pub hats: usize,
    /// USB vendor id.
    pub vendor: u16,
    /// USB product id.
    pub product: u16,
    /// Product version.
    pub product_version: u16,
}

/// A joystick, owning or not depending on `O`.
pub struct BasicJoystick<O: Ownership> {
    joystick: PointerManager<O, NativeJoystick, JoystickDeleter>,
}

/// A joystick that is closed when dropped.
pub type Joystick = BasicJoystick<Owning>;

/// A non-owning reference to an opened joystick.
pub type JoystickHandle<'a> = BasicJoystick<Handle<'a>>;

fn non_negative(value: i32) -> Option<i32> {
    (value >= 0).then_some(value)
}

fn non_zero(value: u16) -> Option<u16> {
    (value != 0).then_some(value)
}

impl BasicJoystick<Owning> {
    /// Lowest axis position.
    pub const AXIS_MIN: i16 = i16::MIN;
    /// Highest axis position.
    pub const AXIS_MAX: i16 = i16::MAX;

    /// Opens the joystick at device `index`. Requires the joystick subsystem.
    ///
    /// Opening a device twice shares one native joystick; it is closed when the
    /// last owner drops.
    pub fn open(index: i32) -> Result<Self> {
        let ptr = native::joystick_open(index);
        if ptr.is_null() {
            return Err(Error::native("Failed to open joystick"));
        }
        // SAFETY: `ptr` was just opened and is owned by nobody else.
        let joystick = unsafe { PointerManager::<Owning, _, _>::new(ptr, "joystick") }?;
        debug!("Opened joystick {index}");
        Ok(Self { joystick })
    }

    /// Takes ownership of a native joystick.
    ///
    /// # Errors
    /// [`Error::NullPointer`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or an opened joystick that nothing else closes.
    pub unsafe fn from_raw(ptr: *mut NativeJoystick) -> Result<Self> {
        // SAFETY: forwarded contract.
        let joystick = unsafe { PointerManager::<Owning, _, _>::new(ptr, "joystick") }?;
        Ok(Self { joystick })
    }

    /// A handle borrowing this joystick.
    pub fn handle(&self) -> JoystickHandle<'_> {
        JoystickHandle::from(self)
    }

    /// Number of attached joysticks.
    pub fn count() -> i32 {
        native::num_joysticks()
    }

    /// Name of the device at `index`.
    pub fn name_at(index: i32) -> Option<String> {
        native::joystick_device_name(index)
    }

    /// Instance id of the device at `index`.
    pub fn instance_id_at(index: i32) -> Option<i32> {
        non_negative(native::joystick_device_instance_id(index))
    }

    /// Player index of the device at `index`, `None` when unassigned.
    pub fn player_index_at(index: i32) -> Option<i32> {
        non_negative(native::joystick_device_player_index(index))
    }

    /// Type of the device at `index`.
    pub fn kind_at(index: i32) -> JoystickType {
        JoystickType::from_native(native::joystick_device_type(index))
    }

    /// USB vendor id of the device at `index`.
    pub fn vendor_at(index: i32) -> Option<u16> {
        non_zero(native::joystick_device_usb_ids(index).0)
    }

    /// USB product id of the device at `index`.
    pub fn product_at(index: i32) -> Option<u16> {
        non_zero(native::joystick_device_usb_ids(index).1)
    }

    /// Product version of the device at `index`.
    pub fn product_version_at(index: i32) -> Option<u16> {
        non_zero(native::joystick_device_usb_ids(index).2)
    }

    /// Attaches a virtual device and returns its device index.
    pub fn attach_virtual(device: VirtualJoystick) -> i32 {
        debug!("Attaching virtual joystick '{}'", device.name);
        native::attach_virtual_joystick(VirtualJoystickDesc {
            name: device.name,
            kind: device.kind.to_native(),
            axes: device.axes,
            buttons: device.buttons,
            hats: device.hats,
            vendor: device.vendor,
            product: device.product,
            product_version: device.product_version,
        })
    }

    /// Detaches the virtual device at `index`.
    pub fn detach_virtual(index: i32) -> Outcome {
        Outcome::from_status(native::detach_virtual_joystick(index))
    }
}

impl<'a> BasicJoystick<Handle<'a>> {
    /// Wraps a native joystick without taking ownership. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or stay open for `'a`.
    pub unsafe fn from_raw(ptr: *mut NativeJoystick) -> Self {
        // SAFETY: forwarded contract.
        let joystick = unsafe { PointerManager::<Handle<'a>, _, _>::new(ptr) };
        Self { joystick }
    }

    /// The opened joystick with `instance_id`. The handle is null if there is none.
    ///
    /// # Safety
    /// The joystick must stay open for `'a`.
    pub unsafe fn from_instance_id(instance_id: i32) -> Self {
        // SAFETY: only opened joysticks are returned; the caller vouches for `'a`.
        unsafe { Self::from_raw(native::joystick_from_instance_id(instance_id)) }
    }

    /// The opened joystick assigned to `player_index`. The handle is null if
    /// there is none.
    ///
    /// # Safety
    /// The joystick must stay open for `'a`.
    pub unsafe fn from_player_index(player_index: i32) -> Self {
        // SAFETY: only opened joysticks are returned; the caller vouches for `'a`.
        unsafe { Self::from_raw(native::joystick_from_player_index(player_index)) }
    }

    /// Whether the handle refers to a joystick.
    pub fn is_valid(&self) -> bool {
        !self.joystick.is_null()
    }
}

impl<'a> From<&'a Joystick> for JoystickHandle<'a> {
    fn from(owner: &'a Joystick) -> Self {
        Self { joystick: PointerManager::from_owner(&owner.joystick) }
    }
}

impl Clone for JoystickHandle<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for JoystickHandle<'_> {}

impl<O: Ownership> BasicJoystick<O> {
    /// Instance id, stable for as long as the device stays attached.
    pub fn instance_id(&self) -> Option<i32> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        non_negative(unsafe { native::joystick_instance_id(self.get()) })
    }

    /// Device name.
    pub fn name(&self) -> Option<String> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::joystick_name(self.get()) }
    }

    /// Device type.
    pub fn kind(&self) -> JoystickType {
        // SAFETY: the pointer is null or live for as long as `self` is.
        JoystickType::from_native(unsafe { native::joystick_type(self.get()) })
    }

    fn counts(&self) -> (i32, i32, i32) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::joystick_counts(self.get()) }
    }

    /// Number of axes, `None` on error.
    pub fn axis_count(&self) -> Option<i32> {
        non_negative(self.counts().0)
    }

    /// Number of buttons, `None` on error.
    pub fn button_count(&self) -> Option<i32> {
        non_negative(self.counts().1)
    }

    /// Number of hats, `None` on error.
    pub fn hat_count(&self) -> Option<i32> {
        non_negative(self.counts().2)
    }

    /// Position of `axis`.
    pub fn axis(&self, axis: i32) -> Option<i16> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::joystick_get_axis(self.get(), axis) }
    }

    /// State of `button`.
    pub fn button(&self, button: i32) -> Option<ButtonState> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::joystick_get_button(self.get(), button) }.map(|state| ButtonState::from(state != 0))
    }

    /// Position of `hat`.
    pub fn hat(&self, hat: i32) -> Option<HatState> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::joystick_get_hat(self.get(), hat) }.map(HatState::from_native)
    }

    /// Player index, `None` when unassigned.
    pub fn player_index(&self) -> Option<i32> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        non_negative(unsafe { native::joystick_player_index(self.get()) })
    }

    /// Assigns a player index; `None` clears it.
    pub fn set_player_index(&self, player_index: Option<i32>) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::joystick_set_player_index(self.get(), player_index.unwrap_or(-1)) }
    }

    /// USB vendor id.
    pub fn vendor(&self) -> Option<u16> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        non_zero(unsafe { native::joystick_usb_ids(self.get()) }.0)
    }

    /// USB product id.
    pub fn product(&self) -> Option<u16> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        non_zero(unsafe { native::joystick_usb_ids(self.get()) }.1)
    }

    /// Product version.
    pub fn product_version(&self) -> Option<u16> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        non_zero(unsafe { native::joystick_usb_ids(self.get()) }.2)
    }

    /// Battery level.
    pub fn power_level(&self) -> JoystickPower {
        // SAFETY: the pointer is null or live for as long as `self` is.
        JoystickPower::from_native(unsafe { native::joystick_current_power_level(self.get()) })
    }

    /// Starts a rumble effect that replaces any running one. Durations beyond
    /// `u32::MAX` milliseconds are clamped.
    pub fn rumble(&self, low_frequency: u16, high_frequency: u16, duration: Duration) -> Outcome {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        // SAFETY: the pointer is null or live for as long as `self` is.
        let outcome = Outcome::from_status(unsafe {
            native::joystick_rumble(self.get(), low_frequency, high_frequency, millis)
        });
        if outcome.is_failure() {
            warn!("Joystick rumble failed: {}", crate::sys::get_error());
        }
        outcome
    }

    /// Stops a running rumble effect.
    pub fn stop_rumble(&self) -> Outcome {
        self.rumble(0, 0, Duration::ZERO)
    }

    /// Feeds an axis position into a virtual joystick.
    pub fn set_virtual_axis(&self, axis: i32, value: i16) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::joystick_set_virtual_axis(self.get(), axis, value) })
    }

    /// Feeds a button state into a virtual joystick.
    pub fn set_virtual_button(&self, button: i32, state: ButtonState) -> Outcome {
        let value = u8::from(state == ButtonState::Pressed);
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::joystick_set_virtual_button(self.get(), button, value) })
    }

    /// Feeds a hat position into a virtual joystick.
    pub fn set_virtual_hat(&self, hat: i32, state: HatState) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::joystick_set_virtual_hat(self.get(), hat, state.to_native()) })
    }

    /// Sets the battery level a virtual joystick reports.
    pub fn set_virtual_power_level(&self, level: JoystickPower) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::joystick_set_virtual_power_level(self.get(), level.to_native()) })
    }

    /// The native joystick pointer.
    pub fn get(&self) -> *mut NativeJoystick {
        self.joystick.get()
    }
}

impl<O: Ownership> fmt::Display for BasicJoystick<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "joystick{{data: {:p}, id: {}, name: {}}}",
            self.get(),
            self.instance_id().unwrap_or(-1),
            self.name().unwrap_or_default()
        )
    }
}

impl<O: Ownership> fmt::Debug for BasicJoystick<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicJoystick")
            .field("joystick", &self.joystick)
            .field("instance_id", &self.instance_id())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, Library, Subsystems};
    use crate::input::DEVICE_LOCK;
    use std::ptr;

    fn gamepad() -> VirtualJoystick {
        VirtualJoystick {
            name: "virtual pad".to_owned(),
            kind: JoystickType::GameController,
            axes: 2,
            buttons: 4,
            hats: 1,
            vendor: 0x045E,
            product: 0x028E,
            product_version: 0,
        }
    }

    #[test]
    fn test_owning_from_null() {
        let error = unsafe { Joystick::from_raw(ptr::null_mut()) }.unwrap_err();
        assert_eq!(error.to_string(), "Null joystick pointer!");

        let handle = unsafe { JoystickHandle::from_raw(ptr::null_mut()) };
        assert!(!handle.is_valid());
        assert_eq!(handle.instance_id(), None);
        assert_eq!(handle.axis(0), None);
        assert!(handle.rumble(1, 1, Duration::from_millis(10)).is_failure());
    }

    #[test]
    fn test_open_requires_device() {
        let _guard = DEVICE_LOCK.lock();
        let _joystick = Library::init(Subsystems::JOYSTICK).unwrap();
        let error = Joystick::open(Joystick::count()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_open_virtual() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::JOYSTICK).unwrap();
        let before = Joystick::count();
        let index = Joystick::attach_virtual(gamepad());
        assert_eq!(Joystick::count(), before + 1);
        assert_eq!(Joystick::name_at(index).as_deref(), Some("virtual pad"));
        assert_eq!(Joystick::kind_at(index), JoystickType::GameController);
        assert_eq!(Joystick::vendor_at(index), Some(0x045E));
        assert_eq!(Joystick::product_version_at(index), None);
        assert_eq!(Joystick::player_index_at(index), None);

        {
            let joystick = Joystick::open(index).unwrap();
            assert_eq!(joystick.instance_id(), Joystick::instance_id_at(index));
            assert_eq!(joystick.name().as_deref(), Some("virtual pad"));
            assert_eq!(joystick.axis_count(), Some(2));
            assert_eq!(joystick.button_count(), Some(4));
            assert_eq!(joystick.hat_count(), Some(1));
            assert_eq!(joystick.product(), Some(0x028E));
            assert_eq!(joystick.axis(2), None);
        }

        assert!(Joystick::detach_virtual(index).is_success());
        assert_eq!(Joystick::count(), before);
    }

    #[test]
    fn test_virtual_state() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::JOYSTICK).unwrap();
        let index = Joystick::attach_virtual(gamepad());
        {
            let joystick = Joystick::open(index).unwrap();
            assert!(joystick.set_virtual_axis(1, Joystick::AXIS_MIN).is_success());
            assert!(joystick.set_virtual_button(3, ButtonState::Pressed).is_success());
            assert!(joystick.set_virtual_hat(0, HatState::LeftUp).is_success());
            assert!(joystick.set_virtual_axis(5, 0).is_failure());

            assert_eq!(joystick.axis(1), Some(i16::MIN));
            assert_eq!(joystick.button(3), Some(ButtonState::Pressed));
            assert_eq!(joystick.button(0), Some(ButtonState::Released));
            assert_eq!(joystick.hat(0), Some(HatState::LeftUp));

            assert!(joystick.rumble(0xFFFF, 0x8000, Duration::from_millis(250)).is_success());
            assert_eq!(
                unsafe { native::joystick_last_rumble(joystick.get()) },
                Some((0xFFFF, 0x8000, 250))
            );
            assert!(joystick.stop_rumble().is_success());
        }
        assert!(Joystick::detach_virtual(index).is_success());
    }

    #[test]
    fn test_handles_by_id_and_player() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::JOYSTICK).unwrap();
        let index = Joystick::attach_virtual(gamepad());
        {
            let joystick = Joystick::open(index).unwrap();
            let id = joystick.instance_id().unwrap();
            let handle = unsafe { JoystickHandle::from_instance_id(id) };
            assert_eq!(handle.get(), joystick.get());

            assert_eq!(joystick.player_index(), None);
            joystick.set_player_index(Some(7));
            assert_eq!(handle.player_index(), Some(7));
            let player = unsafe { JoystickHandle::from_player_index(7) };
            assert_eq!(player.get(), joystick.get());

            joystick.set_player_index(None);
            assert!(!unsafe { JoystickHandle::from_player_index(7) }.is_valid());
        }
        assert!(Joystick::detach_virtual(index).is_success());
    }

    #[test]
    fn test_reopening_shares_the_device() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::JOYSTICK).unwrap();
        let index = Joystick::attach_virtual(gamepad());
        let first = Joystick::open(index).unwrap();
        let id = first.instance_id().unwrap();
        {
            let second = Joystick::open(index).unwrap();
            assert_eq!(second.get(), first.get());
        }

        let handle = unsafe { JoystickHandle::from_instance_id(id) };
        assert_eq!(handle.get(), first.get());
        assert_eq!(first.name().as_deref(), Some("virtual pad"));

        drop(first);
        assert!(!unsafe { JoystickHandle::from_instance_id(id) }.is_valid());
        assert!(Joystick::detach_virtual(index).is_success());
    }

    #[test]
    fn test_power_level() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::JOYSTICK).unwrap();
        let index = Joystick::attach_virtual(gamepad());
        {
            let joystick = Joystick::open(index).unwrap();
            assert_eq!(joystick.power_level(), JoystickPower::Unknown);
            assert!(joystick.set_virtual_power_level(JoystickPower::Wired).is_success());
            assert_eq!(joystick.handle().power_level(), JoystickPower::Wired);
        }
        assert!(Joystick::detach_virtual(index).is_success());
        assert_eq!(JoystickPower::from_native(9), JoystickPower::Unknown);
    }

    #[test]
    fn test_hat_bits() {
        assert_eq!(HatState::from_native(0x06), HatState::RightDown);
        assert_eq!(HatState::from_native(0x05), HatState::Centered);
        assert_eq!(HatState::LeftDown.to_native(), 0x0C);
        assert_eq!(JoystickType::from_native(42), JoystickType::Other(42));
    }
}
