//! Game controllers
//!
//! A controller is a joystick with a standard layout: two sticks, two triggers
//! and fifteen named buttons. It keeps its joystick open and forwards state
//! queries to it.

use std::fmt;
use std::path::Path;
use std::ptr::NonNull;
use std::time::Duration;

use log::{debug, info};

use super::joystick::{BasicJoystick, ButtonState, JoystickHandle, JoystickPower};
use crate::core::{Deleter, Error, Handle, Outcome, Owning, Ownership, PointerManager, Result};
use crate::sys::input::{self as native, NativeController};

/// Closes native controllers.
pub struct ControllerDeleter;

impl Deleter<NativeController> for ControllerDeleter {
    unsafe fn delete(ptr: NonNull<NativeController>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::controller_close(ptr.as_ptr()) }
    }
}

/// Axes of the standard layout. Sticks range over the full `i16` span,
/// triggers from `0` up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerAxis {
    /// Left stick, horizontal.
    LeftX,
    /// Left stick, vertical.
    LeftY,
    /// Right stick, horizontal.
    RightX,
    /// Right stick, vertical.
    RightY,
    /// Left trigger.
    TriggerLeft,
    /// Right trigger.
    TriggerRight,
}

impl ControllerAxis {
    /// Every axis, in native order.
    pub const ALL: [Self; 6] = [
        Self::LeftX,
        Self::LeftY,
        Self::RightX,
        Self::RightY,
        Self::TriggerLeft,
        Self::TriggerRight,
    ];

    /// Joystick axis the standard axis reads from.
    pub const fn to_native(self) -> i32 {
        self as i32
    }
}

/// Buttons of the standard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerButton {
    /// Bottom face button.
    A,
    /// Right face button.
    B,
    /// Left face button.
    X,
    /// Top face button.
    Y,
    /// Back or select.
    Back,
    /// Home or guide.
    Guide,
    /// Start.
    Start,
    /// Left stick press.
    LeftStick,
    /// Right stick press.
    RightStick,
    /// Left bumper.
    LeftShoulder,
    /// Right bumper.
    RightShoulder,
    /// D-pad up.
    DpadUp,
    /// D-pad down.
    DpadDown,
    /// D-pad left.
    DpadLeft,
    /// D-pad right.
    DpadRight,
}

impl ControllerButton {
    /// Joystick button the standard button reads from.
    pub const fn to_native(self) -> i32 {
        self as i32
    }
}

/// What [`Controller::add_mapping`] did with a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingResult {
    /// The mapping could not be parsed; see [`last_error`](crate::last_error).
    Error,
    /// A mapping for the same device GUID was replaced.
    Updated,
    /// A new mapping was installed.
    Added,
}

impl MappingResult {
    const fn from_status(status: i32) -> Self {
        match status {
            1 => Self::Added,
            0 => Self::Updated,
            _ => Self::Error,
        }
    }
}

/// A game controller, owning or not depending on `O`.
pub struct BasicController<O: Ownership> {
    controller: PointerManager<O, NativeController, ControllerDeleter>,
}

/// A game controller that is closed when dropped.
pub type Controller = BasicController<Owning>;

/// A non-owning reference to an opened game controller.
pub type ControllerHandle<'a> = BasicController<Handle<'a>>;

impl BasicController<Owning> {
    /// Opens the device at `index` as a controller. Requires the game
    /// controller subsystem.
    pub fn open(index: i32) -> Result<Self> {
        let ptr = native::controller_open(index);
        if ptr.is_null() {
            return Err(Error::native("Failed to open game controller"));
        }
        // SAFETY: `ptr` holds a reference of its own that only this owner drops.
        let controller = unsafe { PointerManager::<Owning, _, _>::new(ptr, "controller") }?;
        debug!("Opened game controller {index}");
        Ok(Self { controller })
    }

    /// Opens the controller for an opened joystick. Both share the same device.
    ///
    /// # Errors
    /// [`Error::NullPointer`] for a null joystick handle and
    /// [`Error::Native`] if the device has no controller layout.
    pub fn from_joystick<P: Ownership>(joystick: &BasicJoystick<P>) -> Result<Self> {
        let Some(instance_id) = joystick.instance_id() else {
            return Err(Error::NullPointer("joystick"));
        };
        let ptr = native::controller_open_instance(instance_id);
        if ptr.is_null() {
            return Err(Error::native("Failed to open game controller"));
        }
        // SAFETY: `ptr` holds a reference of its own that only this owner drops.
        let controller = unsafe { PointerManager::<Owning, _, _>::new(ptr, "controller") }?;
        Ok(Self { controller })
    }

    /// Takes ownership of a native controller.
    ///
    /// # Errors
    /// [`Error::NullPointer`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or an opened controller reference that nothing else
    /// closes.
    pub unsafe fn from_raw(ptr: *mut NativeController) -> Result<Self> {
        // SAFETY: forwarded contract.
        let controller = unsafe { PointerManager::<Owning, _, _>::new(ptr, "controller") }?;
        Ok(Self { controller })
    }

    /// A handle borrowing this controller.
    pub fn handle(&self) -> ControllerHandle<'_> {
        ControllerHandle::from(self)
    }

    /// Whether the device at `index` can be opened as a controller.
    pub fn is_controller(index: i32) -> bool {
        native::is_game_controller(index)
    }

    /// Installs a `"guid,name,bindings"` mapping line.
    pub fn add_mapping(mapping: &str) -> MappingResult {
        MappingResult::from_status(native::controller_add_mapping(mapping))
    }

    /// Installs every mapping in a text file, one per line. Blank lines and
    /// lines starting with `#` are skipped. Returns how many were added.
    pub fn load_mappings(path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| {
            crate::sys::set_error(format!("{}: {error}", path.display()));
            Error::native("Failed to load controller mappings")
        })?;
        let added = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|line| Self::add_mapping(line) == MappingResult::Added)
            .count();
        info!("Loaded {added} controller mappings from {}", path.display());
        Ok(added)
    }

    /// Number of installed mappings.
    pub fn mapping_count() -> i32 {
        native::controller_num_mappings()
    }

    /// Text of the mapping at `index`.
    pub fn mapping_at(index: i32) -> Option<String> {
        native::controller_mapping_for_index(index)
    }
}

impl<'a> BasicController<Handle<'a>> {
    /// Wraps a native controller without taking ownership. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or stay open for `'a`.
    pub unsafe fn from_raw(ptr: *mut NativeController) -> Self {
        // SAFETY: forwarded contract.
        let controller = unsafe { PointerManager::<Handle<'a>, _, _>::new(ptr) };
        Self { controller }
    }

    /// Whether the handle refers to a controller.
    pub fn is_valid(&self) -> bool {
        !self.controller.is_null()
    }
}

impl<'a> From<&'a Controller> for ControllerHandle<'a> {
    fn from(owner: &'a Controller) -> Self {
        Self { controller: PointerManager::from_owner(&owner.controller) }
    }
}

impl Clone for ControllerHandle<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for ControllerHandle<'_> {}

impl<O: Ownership> BasicController<O> {
    /// The joystick underneath. Null for a null controller.
    pub fn joystick(&self) -> JoystickHandle<'_> {
        // SAFETY: the pointer is null or live for as long as `self` is, and an
        // open controller keeps its joystick open.
        unsafe { JoystickHandle::from_raw(native::controller_get_joystick(self.get())) }
    }

    /// Instance id of the joystick underneath.
    pub fn instance_id(&self) -> Option<i32> {
        self.joystick().instance_id()
    }

    /// Device name.
    pub fn name(&self) -> Option<String> {
        self.joystick().name()
    }

    /// Position of `axis`.
    pub fn axis(&self, axis: ControllerAxis) -> Option<i16> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::controller_get_axis(self.get(), axis.to_native()) }
    }

    /// State of `button`.
    pub fn button(&self, button: ControllerButton) -> Option<ButtonState> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::controller_get_button(self.get(), button.to_native()) }
            .map(|state| ButtonState::from(state != 0))
    }

    /// Whether `button` is held down.
    pub fn is_pressed(&self, button: ControllerButton) -> bool {
        self.button(button) == Some(ButtonState::Pressed)
    }

    /// Battery level.
    pub fn power_level(&self) -> JoystickPower {
        self.joystick().power_level()
    }

    /// Player index, `None` when unassigned.
    pub fn player_index(&self) -> Option<i32> {
        self.joystick().player_index()
    }

    /// Assigns a player index; `None` clears it.
    pub fn set_player_index(&self, player_index: Option<i32>) {
        self.joystick().set_player_index(player_index);
    }

    /// Starts a rumble effect that replaces any running one.
    pub fn rumble(&self, low_frequency: u16, high_frequency: u16, duration: Duration) -> Outcome {
        self.joystick().rumble(low_frequency, high_frequency, duration)
    }

    /// Stops a running rumble effect.
    pub fn stop_rumble(&self) -> Outcome {
        self.joystick().stop_rumble()
    }

    /// The native controller pointer.
    pub fn get(&self) -> *mut NativeController {
        self.controller.get()
    }
}

impl<O: Ownership> fmt::Display for BasicController<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "controller{{data: {:p}, name: {}}}",
            self.get(),
            self.name().unwrap_or_default()
        )
    }
}

impl<O: Ownership> fmt::Debug for BasicController<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicController")
            .field("controller", &self.controller)
            .field("instance_id", &self.instance_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, Library, Subsystems};
    use crate::input::{DEVICE_LOCK, Joystick, JoystickType, VirtualJoystick};
    use std::ptr;

    fn standard_pad(kind: JoystickType) -> VirtualJoystick {
        VirtualJoystick {
            name: "standard pad".to_owned(),
            kind,
            axes: ControllerAxis::ALL.len(),
            buttons: 15,
            hats: 0,
            ..VirtualJoystick::default()
        }
    }

    #[test]
    fn test_null() {
        let error = unsafe { Controller::from_raw(ptr::null_mut()) }.unwrap_err();
        assert_eq!(error.to_string(), "Null controller pointer!");

        let handle = unsafe { ControllerHandle::from_raw(ptr::null_mut()) };
        assert!(!handle.is_valid());
        assert!(!handle.joystick().is_valid());
        assert_eq!(handle.axis(ControllerAxis::LeftX), None);
        assert!(!handle.is_pressed(ControllerButton::A));
        assert_eq!(handle.power_level(), JoystickPower::Unknown);
    }

    #[test]
    fn test_open_requires_layout() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::GAME_CONTROLLER).unwrap();
        let index = Joystick::attach_virtual(standard_pad(JoystickType::Other(3)));
        assert!(!Controller::is_controller(index));

        let error = Controller::open(index).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
        assert!(error.to_string().contains("mapping"));
        assert!(Joystick::detach_virtual(index).is_success());
    }

    #[test]
    fn test_standard_layout() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::GAME_CONTROLLER).unwrap();
        let index = Joystick::attach_virtual(standard_pad(JoystickType::GameController));
        assert!(Controller::is_controller(index));
        {
            let controller = Controller::open(index).unwrap();
            assert_eq!(controller.name().as_deref(), Some("standard pad"));
            assert_eq!(controller.instance_id(), Joystick::instance_id_at(index));

            let joystick = controller.joystick();
            assert!(joystick.set_virtual_axis(ControllerAxis::TriggerRight.to_native(), 1200).is_success());
            assert!(joystick.set_virtual_button(ControllerButton::DpadLeft.to_native(), ButtonState::Pressed).is_success());

            assert_eq!(controller.axis(ControllerAxis::TriggerRight), Some(1200));
            assert_eq!(controller.axis(ControllerAxis::LeftX), Some(0));
            assert!(controller.is_pressed(ControllerButton::DpadLeft));
            assert_eq!(controller.handle().button(ControllerButton::A), Some(ButtonState::Released));

            controller.set_player_index(Some(1));
            assert_eq!(joystick.player_index(), Some(1));
            assert!(controller.rumble(10, 20, Duration::from_millis(5)).is_success());
        }
        assert!(Joystick::detach_virtual(index).is_success());
    }

    #[test]
    fn test_from_joystick_shares_device() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::GAME_CONTROLLER).unwrap();
        let index = Joystick::attach_virtual(standard_pad(JoystickType::GameController));
        {
            let joystick = Joystick::open(index).unwrap();
            {
                let controller = Controller::from_joystick(&joystick).unwrap();
                assert_eq!(controller.joystick().get(), joystick.get());

                let again = Controller::open(index).unwrap();
                assert_eq!(again.get(), controller.get());
            }
            assert_eq!(joystick.name().as_deref(), Some("standard pad"));
        }
        assert!(Joystick::detach_virtual(index).is_success());

        let null = unsafe { JoystickHandle::from_raw(ptr::null_mut()) };
        assert!(matches!(Controller::from_joystick(&null), Err(Error::NullPointer("joystick"))));
    }

    #[test]
    fn test_mappings() {
        let _guard = DEVICE_LOCK.lock();
        let before = Controller::mapping_count();
        let mapping = "030000005e0400008e02000000000000,Pad,a:b0,b:b1";
        assert_eq!(Controller::add_mapping(mapping), MappingResult::Added);
        assert_eq!(
            Controller::add_mapping("030000005e0400008e02000000000000,Pad,a:b1,b:b0"),
            MappingResult::Updated
        );
        assert_eq!(Controller::add_mapping("nonsense"), MappingResult::Error);
        assert_eq!(Controller::mapping_count(), before + 1);
        assert!(Controller::mapping_at(before).is_some_and(|text| text.ends_with("a:b1,b:b0")));

        let path = std::env::temp_dir().join(format!("castellan_mappings_{}.txt", std::process::id()));
        std::fs::write(
            &path,
            "# community mappings\n\n0300000011111111,One,a:b0\n0300000022222222,Two,a:b0\n",
        )
        .unwrap();
        assert_eq!(Controller::load_mappings(&path).unwrap(), 2);
        assert_eq!(Controller::mapping_count(), before + 3);
        std::fs::remove_file(&path).unwrap();

        let error = Controller::load_mappings(&path).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
    }
}
