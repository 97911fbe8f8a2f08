//! Motion sensors

use std::fmt;
use std::ptr::NonNull;

use log::debug;

use crate::core::{Deleter, Error, Handle, Outcome, Owning, Ownership, PointerManager, Result};
use crate::sys::input::{self as native, NativeSensor, SENSOR_ACCEL, SENSOR_GYRO, SENSOR_INVALID, SENSOR_UNKNOWN};

/// Closes native sensors.
pub struct SensorDeleter;

impl Deleter<NativeSensor> for SensorDeleter {
    unsafe fn delete(ptr: NonNull<NativeSensor>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::sensor_close(ptr.as_ptr()) }
    }
}

/// What a sensor measures.
///
/// Accelerometers report three channels in m/s² (see
/// [`Sensor::standard_gravity`]); gyroscopes report three channels in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    /// Returned for missing sensors.
    Invalid,
    /// A sensor the platform does not classify.
    Unknown,
    /// Linear acceleration.
    Accelerometer,
    /// Angular velocity.
    Gyroscope,
    /// Any other native type code.
    Other(i32),
}

impl SensorType {
    pub(crate) const fn from_native(kind: i32) -> Self {
        match kind {
            SENSOR_INVALID => Self::Invalid,
            SENSOR_UNKNOWN => Self::Unknown,
            SENSOR_ACCEL => Self::Accelerometer,
            SENSOR_GYRO => Self::Gyroscope,
            other => Self::Other(other),
        }
    }

    pub(crate) const fn to_native(self) -> i32 {
        match self {
            Self::Invalid => SENSOR_INVALID,
            Self::Unknown => SENSOR_UNKNOWN,
            Self::Accelerometer => SENSOR_ACCEL,
            Self::Gyroscope => SENSOR_GYRO,
            Self::Other(other) => other,
        }
    }
}

/// A sensor, owning or not depending on `O`.
pub struct BasicSensor<O: Ownership> {
    sensor: PointerManager<O, NativeSensor, SensorDeleter>,
}

/// A sensor that is closed when dropped.
pub type Sensor = BasicSensor<Owning>;

/// A non-owning reference to an opened sensor.
pub type SensorHandle<'a> = BasicSensor<Handle<'a>>;

fn non_negative(value: i32) -> Option<i32> {
    (value >= 0).then_some(value)
}

impl BasicSensor<Owning> {
    /// Opens the sensor at device `index`. Requires the sensor subsystem.
    pub fn open(index: i32) -> Result<Self> {
        let ptr = native::sensor_open(index);
        if ptr.is_null() {
            return Err(Error::native("Failed to open sensor"));
        }
        // SAFETY: `ptr` was just opened and is owned by nobody else.
        let sensor = unsafe { PointerManager::<Owning, _, _>::new(ptr, "sensor") }?;
        debug!("Opened sensor {index}");
        Ok(Self { sensor })
    }

    /// Takes ownership of a native sensor.
    ///
    /// # Errors
    /// [`Error::NullPointer`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or an opened sensor that nothing else closes.
    pub unsafe fn from_raw(ptr: *mut NativeSensor) -> Result<Self> {
        // SAFETY: forwarded contract.
        let sensor = unsafe { PointerManager::<Owning, _, _>::new(ptr, "sensor") }?;
        Ok(Self { sensor })
    }

    /// A handle borrowing this sensor.
    pub fn handle(&self) -> SensorHandle<'_> {
        SensorHandle::from(self)
    }

    /// Number of attached sensors.
    pub fn count() -> i32 {
        native::num_sensors()
    }

    /// Publishes the latest readings of every sensor. Waits while another thread
    /// holds the sensor lock.
    pub fn update() {
        native::sensor_update();
    }

    /// Locks sensor state against updates from other threads. Recursive; pair
    /// each call with [`unlock`](Self::unlock) on the same thread.
    pub fn lock() {
        native::lock_sensors();
    }

    /// Releases one level of the sensor lock held by this thread.
    pub fn unlock() -> Outcome {
        Outcome::from_status(native::unlock_sensors())
    }

    /// Earth's gravity in m/s², the unit accelerometers report in.
    pub const fn standard_gravity() -> f32 {
        9.806_65
    }

    /// Name of the sensor at `index`.
    pub fn name_at(index: i32) -> Option<String> {
        native::sensor_device_name(index)
    }

    /// Type of the sensor at `index`, [`SensorType::Invalid`] if absent.
    pub fn kind_at(index: i32) -> SensorType {
        SensorType::from_native(native::sensor_device_type(index))
    }

    /// Platform specific type of the sensor at `index`.
    pub fn non_portable_type_at(index: i32) -> Option<i32> {
        non_negative(native::sensor_device_non_portable_type(index))
    }

    /// Instance id of the sensor at `index`.
    pub fn id_at(index: i32) -> Option<i32> {
        non_negative(native::sensor_device_instance_id(index))
    }

    /// Attaches a virtual sensor reporting `channels` values and returns its
    /// device index.
    pub fn attach_virtual(name: &str, kind: SensorType, non_portable_type: i32, channels: usize) -> i32 {
        debug!("Attaching virtual sensor '{name}' ({kind:?})");
        native::attach_virtual_sensor(name, kind.to_native(), non_portable_type, channels)
    }

    /// Detaches the virtual sensor at `index`.
    pub fn detach_virtual(index: i32) -> Outcome {
        Outcome::from_status(native::detach_virtual_sensor(index))
    }

    /// Queues readings for the virtual sensor with instance id `id`. They are
    /// reported after the next [`update`](Self::update).
    pub fn set_virtual_data(id: i32, data: &[f32]) -> Outcome {
        Outcome::from_status(native::sensor_set_virtual_data(id, data))
    }
}

impl<'a> BasicSensor<Handle<'a>> {
    /// Wraps a native sensor without taking ownership. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or stay open for `'a`.
    pub unsafe fn from_raw(ptr: *mut NativeSensor) -> Self {
        // SAFETY: forwarded contract.
        let sensor = unsafe { PointerManager::<Handle<'a>, _, _>::new(ptr) };
        Self { sensor }
    }

    /// Whether the handle refers to a sensor.
    pub fn is_valid(&self) -> bool {
        !self.sensor.is_null()
    }
}

impl<'a> From<&'a Sensor> for SensorHandle<'a> {
    fn from(owner: &'a Sensor) -> Self {
        Self { sensor: PointerManager::from_owner(&owner.sensor) }
    }
}

impl Clone for SensorHandle<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for SensorHandle<'_> {}

impl<O: Ownership> BasicSensor<O> {
    /// Instance id.
    pub fn id(&self) -> Option<i32> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        non_negative(unsafe { native::sensor_instance_id(self.get()) })
    }

    /// Sensor name.
    pub fn name(&self) -> Option<String> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::sensor_name(self.get()) }
    }

    /// What the sensor measures.
    pub fn kind(&self) -> SensorType {
        // SAFETY: the pointer is null or live for as long as `self` is.
        SensorType::from_native(unsafe { native::sensor_type(self.get()) })
    }

    /// Platform specific type.
    pub fn non_portable_type(&self) -> Option<i32> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        non_negative(unsafe { native::sensor_non_portable_type(self.get()) })
    }

    /// The latest `N` readings. Channels the sensor does not have read as zero.
    pub fn data<const N: usize>(&self) -> Option<[f32; N]> {
        let mut values = [0.0; N];
        // SAFETY: the pointer is null or live for as long as `self` is.
        let status = unsafe { native::sensor_get_data(self.get(), &mut values) };
        (status == 0).then_some(values)
    }

    /// The native sensor pointer.
    pub fn get(&self) -> *mut NativeSensor {
        self.sensor.get()
    }
}

impl<O: Ownership> fmt::Display for BasicSensor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sensor{{data: {:p}, id: {}, name: {}}}",
            self.get(),
            self.id().unwrap_or(-1),
            self.name().unwrap_or_default()
        )
    }
}

impl<O: Ownership> fmt::Debug for BasicSensor<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicSensor")
            .field("sensor", &self.sensor)
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, Library, Subsystems};
    use crate::input::DEVICE_LOCK;
    use approx::assert_relative_eq;
    use std::ptr;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_null() {
        let error = unsafe { Sensor::from_raw(ptr::null_mut()) }.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ContractViolation);

        let handle = unsafe { SensorHandle::from_raw(ptr::null_mut()) };
        assert!(!handle.is_valid());
        assert_eq!(handle.kind(), SensorType::Invalid);
        assert_eq!(handle.data::<3>(), None);
        assert_eq!(handle.id(), None);
    }

    #[test]
    fn test_standard_gravity() {
        assert_relative_eq!(Sensor::standard_gravity(), 9.806_65);
    }

    #[test]
    fn test_missing_index() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::SENSOR).unwrap();
        let index = Sensor::count();
        assert_eq!(Sensor::kind_at(index), SensorType::Invalid);
        assert_eq!(Sensor::name_at(index), None);
        assert_eq!(Sensor::id_at(index), None);
        assert_eq!(Sensor::open(index).unwrap_err().kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_virtual_accelerometer() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::SENSOR).unwrap();
        let index = Sensor::attach_virtual("accel", SensorType::Accelerometer, 12, 3);
        assert_eq!(Sensor::kind_at(index), SensorType::Accelerometer);
        assert_eq!(Sensor::non_portable_type_at(index), Some(12));
        {
            let sensor = Sensor::open(index).unwrap();
            assert_eq!(sensor.id(), Sensor::id_at(index));
            assert_eq!(sensor.name().as_deref(), Some("accel"));
            assert_eq!(sensor.kind(), SensorType::Accelerometer);
            assert_eq!(sensor.non_portable_type(), Some(12));

            let id = sensor.id().unwrap();
            let gravity = Sensor::standard_gravity();
            assert!(Sensor::set_virtual_data(id, &[0.0, -gravity, 0.5]).is_success());
            assert_eq!(sensor.data::<3>(), Some([0.0; 3]));
            Sensor::update();

            let [x, y, z] = sensor.data::<3>().unwrap();
            assert_relative_eq!(x, 0.0);
            assert_relative_eq!(y, -9.806_65);
            assert_relative_eq!(z, 0.5);

            let wide = sensor.handle().data::<4>().unwrap();
            assert_relative_eq!(wide[3], 0.0);
        }
        assert!(Sensor::detach_virtual(index).is_success());
        assert!(Sensor::detach_virtual(index).is_failure());
    }

    #[test]
    fn test_lock_holds_back_updates() {
        let _guard = DEVICE_LOCK.lock();
        let _library = Library::init(Subsystems::SENSOR).unwrap();
        let index = Sensor::attach_virtual("gyro", SensorType::Gyroscope, 0, 3);
        {
            let sensor = Sensor::open(index).unwrap();
            let id = sensor.id().unwrap();
            assert!(Sensor::set_virtual_data(id, &[1.0, 2.0, 3.0]).is_success());

            Sensor::lock();
            let updated = Arc::new(AtomicBool::new(false));
            let updater = {
                let updated = Arc::clone(&updated);
                std::thread::spawn(move || {
                    Sensor::update();
                    updated.store(true, Ordering::SeqCst);
                })
            };
            std::thread::sleep(Duration::from_millis(20));
            assert!(!updated.load(Ordering::SeqCst));
            assert!(Sensor::unlock().is_success());
            updater.join().unwrap();

            assert!(updated.load(Ordering::SeqCst));
            assert_eq!(sensor.data::<3>(), Some([1.0, 2.0, 3.0]));
            assert!(Sensor::unlock().is_failure());
        }
        assert!(Sensor::detach_virtual(index).is_success());
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(SensorType::from_native(2), SensorType::Gyroscope);
        assert_eq!(SensorType::from_native(9), SensorType::Other(9));
        assert_eq!(SensorType::Invalid.to_native(), -1);
    }
}
