//! Software pixel surfaces

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::ptr::NonNull;

use log::{debug, warn};

use crate::core::{Deleter, Error, Handle, Outcome, Owning, Ownership, PointerManager, Result};
use crate::foundation::{Area, Point};
use crate::sys::video::{self as native, NativeSurface};
use crate::video::{BlendMode, Color, PixelFormat};

/// Frees native surfaces.
pub struct SurfaceDeleter;

impl Deleter<NativeSurface> for SurfaceDeleter {
    unsafe fn delete(ptr: NonNull<NativeSurface>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::free_surface(ptr.as_ptr()) }
    }
}

/// A block of pixels in main memory, owning or not depending on `O`.
///
/// Owning surfaces are not `Clone`; copying the pixels is an explicit
/// [`duplicate`](Self::duplicate).
pub struct BasicSurface<O: Ownership> {
    surface: PointerManager<O, NativeSurface, SurfaceDeleter>,
}

/// A surface that is freed when dropped.
pub type Surface = BasicSurface<Owning>;

/// A non-owning reference to a surface.
pub type SurfaceHandle<'a> = BasicSurface<Handle<'a>>;

fn adopt(ptr: *mut NativeSurface, context: &'static str) -> Result<Surface> {
    if ptr.is_null() {
        return Err(Error::native(context));
    }
    // SAFETY: `ptr` was just created and is owned by nobody else.
    let surface = unsafe { PointerManager::<Owning, _, _>::new(ptr, "surface") }?;
    Ok(Surface { surface })
}

impl BasicSurface<Owning> {
    /// Creates a transparent surface.
    pub fn new(size: Area, format: PixelFormat) -> Result<Self> {
        let surface = adopt(
            native::create_rgb_surface(size.width, size.height, format.to_native()),
            "Failed to create surface",
        )?;
        debug!("Created surface ({size}, {format:?})");
        Ok(surface)
    }

    /// Decodes an image file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let surface = adopt(native::load_image(path), "Failed to load surface")?;
        debug!("Loaded surface from {}", path.display());
        Ok(surface)
    }

    /// Takes ownership of a native surface.
    ///
    /// # Errors
    /// [`Error::NullPointer`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or a live surface that nothing else frees.
    pub unsafe fn from_raw(ptr: *mut NativeSurface) -> Result<Self> {
        // SAFETY: forwarded contract.
        let surface = unsafe { PointerManager::<Owning, _, _>::new(ptr, "surface") }?;
        Ok(Self { surface })
    }

    /// A handle borrowing this surface.
    pub fn handle(&self) -> SurfaceHandle<'_> {
        SurfaceHandle::from(self)
    }
}

impl<'a> BasicSurface<Handle<'a>> {
    /// Wraps a native surface without taking ownership. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or stay live for `'a`.
    pub unsafe fn from_raw(ptr: *mut NativeSurface) -> Self {
        // SAFETY: forwarded contract.
        let surface = unsafe { PointerManager::<Handle<'a>, _, _>::new(ptr) };
        Self { surface }
    }

    /// Whether the handle refers to a surface.
    pub fn is_valid(&self) -> bool {
        !self.surface.is_null()
    }
}

impl<'a> From<&'a Surface> for SurfaceHandle<'a> {
    fn from(owner: &'a Surface) -> Self {
        Self { surface: PointerManager::from_owner(&owner.surface) }
    }
}

impl Clone for SurfaceHandle<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for SurfaceHandle<'_> {}

impl<O: Ownership> BasicSurface<O> {
    /// Deep copy of the pixels and settings. The copy is unlocked.
    pub fn duplicate(&self) -> Result<Surface> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        adopt(unsafe { native::duplicate_surface(self.get()) }, "Failed to duplicate surface")
    }

    /// Copy of this surface in another pixel format.
    pub fn convert(&self, format: PixelFormat) -> Result<Surface> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        adopt(
            unsafe { native::convert_surface(self.get(), format.to_native()) },
            "Failed to convert surface",
        )
    }

    /// Writes the surface to an image file. The extension selects the encoding.
    pub fn save(&self, path: impl AsRef<Path>) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        let outcome = Outcome::from_status(unsafe { native::save_image(self.get(), path.as_ref()) });
        if outcome.is_failure() {
            warn!("Failed to save surface: {}", crate::sys::get_error());
        }
        outcome
    }

    fn info(&self) -> Option<(i32, i32, usize, u32)> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::surface_info(self.get()) }
    }

    /// Width in pixels, `0` for a null handle.
    pub fn width(&self) -> i32 {
        self.info().map_or(0, |(width, ..)| width)
    }

    /// Height in pixels, `0` for a null handle.
    pub fn height(&self) -> i32 {
        self.info().map_or(0, |(_, height, ..)| height)
    }

    /// Width and height.
    pub fn size(&self) -> Area {
        Area::new(self.width(), self.height())
    }

    /// Bytes per row.
    pub fn pitch(&self) -> usize {
        self.info().map_or(0, |(.., pitch, _)| pitch)
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        PixelFormat::from_native(self.info().map_or(0, |(.., format)| format))
    }

    /// Colour of one pixel, `None` outside the surface.
    pub fn pixel(&self, point: Point) -> Option<Color> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::surface_get_pixel(self.get(), point.x, point.y) }.map(Color::from)
    }

    /// Sets one pixel. Points outside the surface are ignored.
    pub fn set_pixel(&self, point: Point, color: Color) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::surface_set_pixel(self.get(), point.x, point.y, color.to_array()) }
    }

    /// Whether the pixels must be locked before direct access.
    pub fn must_lock(&self) -> bool {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::surface_must_lock(self.get()) }
    }

    /// Enables run-length acceleration. RLE surfaces must be locked for access.
    pub fn set_rle(&self, enabled: bool) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_surface_rle(self.get(), enabled) })
    }

    /// Locks the pixels for direct access. Locks nest.
    pub fn lock(&self) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::lock_surface(self.get()) })
    }

    /// Releases one lock level.
    pub fn unlock(&self) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::unlock_surface(self.get()) }
    }

    /// Whether the pixels are locked.
    pub fn is_locked(&self) -> bool {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::surface_is_locked(self.get()) }
    }

    /// Locks the pixels until the returned guard is dropped.
    pub fn locked(&self) -> Result<SurfaceLock<'_>> {
        if self.lock().is_failure() {
            return Err(Error::native("Failed to lock surface"));
        }
        Ok(SurfaceLock { surface: self.get(), _surface: PhantomData })
    }

    /// Sets the alpha multiplier used when blitting.
    pub fn set_alpha_mod(&self, alpha: u8) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_surface_alpha_mod(self.get(), alpha) })
    }

    /// Alpha multiplier.
    pub fn alpha_mod(&self) -> u8 {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::surface_alpha_mod(self.get()) }
    }

    /// Sets the colour multiplier used when blitting. Alpha is ignored.
    pub fn set_color_mod(&self, color: Color) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe {
            native::set_surface_color_mod(self.get(), [color.r, color.g, color.b])
        })
    }

    /// Colour multiplier, opaque.
    pub fn color_mod(&self) -> Color {
        // SAFETY: the pointer is null or live for as long as `self` is.
        let [r, g, b] = unsafe { native::surface_color_mod(self.get()) };
        Color::rgb(r, g, b)
    }

    /// Sets the blend mode used when blitting.
    pub fn set_blend_mode(&self, mode: BlendMode) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_surface_blend_mode(self.get(), mode.to_native()) })
    }

    /// Blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        // SAFETY: the pointer is null or live for as long as `self` is.
        BlendMode::from_native(unsafe { native::surface_blend_mode(self.get()) })
    }

    /// The native surface pointer.
    pub fn get(&self) -> *mut NativeSurface {
        self.surface.get()
    }
}

impl<O: Ownership> fmt::Display for BasicSurface<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface{{data: {:p}, width: {}, height: {}}}", self.get(), self.width(), self.height())
    }
}

impl<O: Ownership> fmt::Debug for BasicSurface<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicSurface")
            .field("surface", &self.surface)
            .field("size", &self.size())
            .field("format", &self.format())
            .finish()
    }
}

/// Keeps a surface locked while it lives.
#[derive(Debug)]
#[must_use = "the surface is unlocked as soon as the guard is dropped"]
pub struct SurfaceLock<'s> {
    surface: *mut NativeSurface,
    _surface: PhantomData<&'s ()>,
}

impl Drop for SurfaceLock<'_> {
    fn drop(&mut self) {
        // SAFETY: the guard borrows the surface, which therefore is still alive.
        unsafe { native::unlock_surface(self.surface) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::sys::{fail_next, NativeCall};
    use std::ptr;

    fn surface(width: i32, height: i32) -> Surface {
        Surface::new(Area::new(width, height), PixelFormat::Rgba32).unwrap()
    }

    #[test]
    fn test_owning_from_null() {
        let error = unsafe { Surface::from_raw(ptr::null_mut()) }.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ContractViolation);
        assert_eq!(error.to_string(), "Null surface pointer!");
    }

    #[test]
    fn test_handles() {
        let null = unsafe { SurfaceHandle::from_raw(ptr::null_mut()) };
        assert!(!null.is_valid());
        assert_eq!(null.size(), Area::default());
        assert!(null.duplicate().is_err());

        let owner = surface(2, 2);
        let handle = owner.handle();
        assert!(handle.is_valid());
        assert_eq!(handle.get(), owner.get());
    }

    #[test]
    fn test_moving_an_owner_frees_once() {
        let owner = surface(2, 2);
        let ptr = owner.get();
        let moved = owner;
        assert_eq!(moved.get(), ptr);
        let boxed = Box::new(moved);
        boxed.set_pixel(Point::new(0, 0), Color::RED);
        assert_eq!(boxed.pixel(Point::new(0, 0)), Some(Color::RED));
    }

    #[test]
    fn test_dimensions() {
        let surface = surface(10, 4);
        assert_eq!(surface.size(), Area::new(10, 4));
        assert_eq!(surface.pitch(), 40);
        assert_eq!(surface.format(), PixelFormat::Rgba32);
        assert!(Surface::new(Area::new(0, 4), PixelFormat::Rgba32).is_err());
        assert!(Surface::new(Area::new(1, 1), PixelFormat::Unknown(3)).is_err());
    }

    #[test]
    fn test_duplicate_is_deep() {
        let original = surface(3, 3);
        original.set_pixel(Point::new(1, 1), Color::GREEN);
        let copy = original.duplicate().unwrap();
        assert_ne!(copy.get(), original.get());
        assert_eq!(copy.pixel(Point::new(1, 1)), Some(Color::GREEN));

        copy.set_pixel(Point::new(1, 1), Color::BLUE);
        assert_eq!(original.pixel(Point::new(1, 1)), Some(Color::GREEN));
    }

    #[test]
    fn test_convert() {
        let original = surface(2, 1);
        original.set_pixel(Point::new(1, 0), Color::new(1, 2, 3, 4));
        let converted = original.convert(PixelFormat::Bgra32).unwrap();
        assert_eq!(converted.format(), PixelFormat::Bgra32);
        assert_eq!(converted.pixel(Point::new(1, 0)), Some(Color::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_locking() {
        let surface = surface(1, 1);
        assert!(!surface.must_lock());
        assert!(surface.set_rle(true).is_success());
        assert!(surface.must_lock());

        {
            let _lock = surface.locked().unwrap();
            assert!(surface.is_locked());
        }
        assert!(!surface.is_locked());

        assert!(surface.lock().is_success());
        assert!(surface.lock().is_success());
        surface.unlock();
        assert!(surface.is_locked());
        surface.unlock();
        assert!(!surface.is_locked());
    }

    #[test]
    fn test_modulation() {
        let surface = surface(1, 1);
        assert_eq!(surface.alpha_mod(), 0xFF);
        assert_eq!(surface.color_mod(), Color::WHITE);
        assert_eq!(surface.blend_mode(), BlendMode::Blend);

        assert!(surface.set_alpha_mod(0x40).is_success());
        assert!(surface.set_color_mod(Color::new(1, 2, 3, 0)).is_success());
        assert!(surface.set_blend_mode(BlendMode::Mul).is_success());
        assert_eq!(surface.alpha_mod(), 0x40);
        assert_eq!(surface.color_mod(), Color::rgb(1, 2, 3));
        assert_eq!(surface.blend_mode(), BlendMode::Mul);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("castellan-surface-{}.png", std::process::id()));
        let original = surface(3, 2);
        original.set_pixel(Point::new(2, 1), Color::new(10, 20, 30, 255));
        assert!(original.save(&path).is_success());

        let loaded = Surface::from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.size(), Area::new(3, 2));
        assert_eq!(loaded.pixel(Point::new(2, 1)), Some(Color::new(10, 20, 30, 255)));
    }

    #[test]
    fn test_load_missing_file() {
        let error = Surface::from_file("does/not/exist.png").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
        assert!(error.to_string().starts_with("Failed to load surface"));
    }

    #[test]
    fn test_native_failure() {
        fail_next(NativeCall::CreateSurface);
        assert!(matches!(
            Surface::new(Area::new(1, 1), PixelFormat::Rgba32),
            Err(Error::Native { .. })
        ));
    }
}
