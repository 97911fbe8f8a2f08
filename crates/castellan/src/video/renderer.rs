//! Hardware style 2D renderers bound to a window

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use log::debug;

use crate::core::{Deleter, Error, Handle, Outcome, Owning, Ownership, PointerManager, Result};
use crate::foundation::{Area, Point, Rect};
use crate::sys::video::{self as native, NativeRenderer};
use crate::video::{BasicWindow, BlendMode, Color, WindowHandle};

/// Frees native renderers.
pub struct RendererDeleter;

impl Deleter<NativeRenderer> for RendererDeleter {
    unsafe fn delete(ptr: NonNull<NativeRenderer>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::destroy_renderer(ptr.as_ptr()) }
    }
}

/// A renderer drawing into a window that lives for `'w`.
///
/// The window lifetime is part of the type so a renderer can never outlive the
/// window it draws into.
pub struct BasicRenderer<'w, O: Ownership> {
    renderer: PointerManager<O, NativeRenderer, RendererDeleter>,
    _window: PhantomData<&'w ()>,
}

/// A renderer that is destroyed when dropped.
pub type Renderer<'w> = BasicRenderer<'w, Owning>;

/// A non-owning reference to a renderer.
pub type RendererHandle<'a> = BasicRenderer<'a, Handle<'a>>;

impl<'w> BasicRenderer<'w, Owning> {
    /// Creates a renderer for `window`. A window has at most one renderer.
    pub fn new<W: Ownership>(window: &'w BasicWindow<W>) -> Result<Self> {
        // SAFETY: the window pointer is null or live for `'w`.
        let ptr = unsafe { native::create_renderer(window.get(), 0) };
        if ptr.is_null() {
            return Err(Error::native("Failed to create renderer"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let renderer = unsafe { PointerManager::<Owning, _, _>::new(ptr, "renderer") }?;
        debug!("Created renderer for window {}", window.id());
        Ok(Self { renderer, _window: PhantomData })
    }

    /// Takes ownership of a native renderer.
    ///
    /// # Errors
    /// [`Error::NullPointer`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or a live renderer that nothing else frees, whose window
    /// stays alive for `'w`.
    pub unsafe fn from_raw(ptr: *mut NativeRenderer) -> Result<Self> {
        // SAFETY: forwarded contract.
        let renderer = unsafe { PointerManager::<Owning, _, _>::new(ptr, "renderer") }?;
        Ok(Self { renderer, _window: PhantomData })
    }

    /// A handle borrowing this renderer.
    pub fn handle(&self) -> RendererHandle<'_> {
        RendererHandle::from(self)
    }
}

impl<'a> BasicRenderer<'a, Handle<'a>> {
    /// Wraps a native renderer without taking ownership. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or stay live, together with its window, for `'a`.
    pub unsafe fn from_raw(ptr: *mut NativeRenderer) -> Self {
        // SAFETY: forwarded contract.
        let renderer = unsafe { PointerManager::<Handle<'a>, _, _>::new(ptr) };
        Self { renderer, _window: PhantomData }
    }

    /// Whether the handle refers to a renderer.
    pub fn is_valid(&self) -> bool {
        !self.renderer.is_null()
    }
}

impl<'a, 'w: 'a> From<&'a Renderer<'w>> for RendererHandle<'a> {
    fn from(owner: &'a Renderer<'w>) -> Self {
        Self { renderer: PointerManager::from_owner(&owner.renderer), _window: PhantomData }
    }
}

impl Clone for RendererHandle<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for RendererHandle<'_> {}

impl<'w, O: Ownership> BasicRenderer<'w, O> {
    /// Sets the colour used by [`clear`](Self::clear) and [`fill_rect`](Self::fill_rect).
    pub fn set_color(&self, color: Color) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_render_draw_color(self.get(), color.to_array()) })
    }

    /// Current draw colour.
    pub fn color(&self) -> Color {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Color::from(unsafe { native::render_draw_color(self.get()) })
    }

    /// Sets the blend mode used when drawing.
    pub fn set_blend_mode(&self, mode: BlendMode) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_render_draw_blend_mode(self.get(), mode.to_native()) })
    }

    /// Current draw blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        // SAFETY: the pointer is null or live for as long as `self` is.
        BlendMode::from_native(unsafe { native::render_draw_blend_mode(self.get()) })
    }

    /// Fills the whole target with the draw colour.
    pub fn clear(&self) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::render_clear(self.get()) })
    }

    /// Fills the whole target with `color`, keeping the draw colour.
    pub fn clear_with(&self, color: Color) -> Outcome {
        let previous = self.color();
        if self.set_color(color).is_failure() {
            return Outcome::Failure;
        }
        let outcome = self.clear();
        let _ = self.set_color(previous);
        outcome
    }

    /// Fills `rect`, clipped to the target, with the draw colour.
    pub fn fill_rect(&self, rect: Rect) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe {
            native::render_fill_rect(self.get(), rect.x, rect.y, rect.width, rect.height)
        })
    }

    /// Reads one pixel back from the target, `None` outside of it.
    pub fn read_pixel(&self, point: Point) -> Option<Color> {
        let mut rgba = [0; 4];
        // SAFETY: the pointer is null or live for as long as `self` is.
        let status = unsafe { native::render_read_pixel(self.get(), point.x, point.y, &mut rgba) };
        (status == 0).then(|| Color::from(rgba))
    }

    /// Presents everything drawn since the last call.
    pub fn present(&self) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::render_present(self.get()) }
    }

    /// Size of the render target in pixels.
    pub fn output_size(&self) -> Option<Area> {
        let (mut width, mut height) = (0, 0);
        // SAFETY: the pointer is null or live for as long as `self` is.
        let status = unsafe { native::renderer_output_size(self.get(), &mut width, &mut height) };
        (status == 0).then_some(Area::new(width, height))
    }

    /// Sets a device independent resolution; an empty area disables it.
    pub fn set_logical_size(&self, size: Area) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe {
            native::render_set_logical_size(self.get(), size.width, size.height)
        })
    }

    /// Logical resolution, empty when unset.
    pub fn logical_size(&self) -> Area {
        // SAFETY: the pointer is null or live for as long as `self` is.
        let (width, height) = unsafe { native::render_logical_size(self.get()) };
        Area::new(width, height)
    }

    /// Sets the horizontal and vertical drawing scale. Both must be positive.
    pub fn set_scale(&self, x: f32, y: f32) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::render_set_scale(self.get(), x, y) })
    }

    /// Horizontal and vertical drawing scale.
    pub fn scale(&self) -> (f32, f32) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::render_scale(self.get()) }
    }

    /// The window this renderer draws into.
    pub fn window(&self) -> WindowHandle<'w> {
        // SAFETY: the window outlives `'w` by construction of this renderer.
        unsafe { WindowHandle::from_raw(native::renderer_window(self.get())) }
    }

    /// The native renderer pointer.
    pub fn get(&self) -> *mut NativeRenderer {
        self.renderer.get()
    }
}

impl<O: Ownership> fmt::Display for BasicRenderer<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "renderer{{data: {:p}}}", self.get())
    }
}

impl<O: Ownership> fmt::Debug for BasicRenderer<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicRenderer").field("renderer", &self.renderer).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, Library, Subsystems};
    use crate::sys::{fail_next, NativeCall};
    use crate::video::Window;
    use approx::assert_relative_eq;
    use std::ptr;

    fn video() -> Library {
        Library::init(Subsystems::VIDEO).unwrap()
    }

    #[test]
    fn test_owning_from_null() {
        let error = unsafe { Renderer::from_raw(ptr::null_mut()) }.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ContractViolation);
    }

    #[test]
    fn test_handle_from_owner() {
        let _video = video();
        let window = Window::with_title("renderer").unwrap();
        let renderer = Renderer::new(&window).unwrap();
        let handle = renderer.handle();
        assert!(handle.is_valid());
        assert_eq!(handle.get(), renderer.get());
        assert_eq!(renderer.window().get(), window.get());

        let null = unsafe { RendererHandle::from_raw(ptr::null_mut()) };
        assert!(!null.is_valid());
        assert!(null.clear().is_failure());
        assert!(!null.window().is_valid());
    }

    #[test]
    fn test_one_renderer_per_window() {
        let _video = video();
        let window = Window::with_title("single").unwrap();
        let first = Renderer::new(&window).unwrap();
        let error = Renderer::new(&window).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
        drop(first);
        assert!(Renderer::new(&window).is_ok());
    }

    #[test]
    fn test_clear_and_fill() {
        let _video = video();
        let window = Window::new("draw", Area::new(16, 8), crate::video::WindowFlags::HIDDEN).unwrap();
        let renderer = Renderer::new(&window).unwrap();
        assert_eq!(renderer.output_size(), Some(Area::new(16, 8)));

        assert!(renderer.clear_with(Color::BLUE).is_success());
        assert_eq!(renderer.color(), Color::BLACK);
        assert!(renderer.set_color(Color::RED).is_success());
        assert!(renderer.fill_rect(Rect::new(4, 4, 100, 100)).is_success());

        assert_eq!(renderer.read_pixel(Point::new(0, 0)), Some(Color::BLUE));
        assert_eq!(renderer.read_pixel(Point::new(15, 7)), Some(Color::RED));
        assert_eq!(renderer.read_pixel(Point::new(16, 0)), None);

        renderer.present();
        renderer.present();
        assert_eq!(unsafe { native::render_present_count(renderer.get()) }, 2);
    }

    #[test]
    fn test_state() {
        let _video = video();
        let window = Window::with_title("state").unwrap();
        let renderer = Renderer::new(&window).unwrap();

        assert!(renderer.set_blend_mode(BlendMode::Add).is_success());
        assert_eq!(renderer.blend_mode(), BlendMode::Add);

        assert!(renderer.set_logical_size(Area::new(320, 200)).is_success());
        assert!(renderer.set_logical_size(Area::new(-1, 200)).is_failure());
        assert_eq!(renderer.logical_size(), Area::new(320, 200));

        assert!(renderer.set_scale(2.0, 0.5).is_success());
        assert!(renderer.set_scale(0.0, 1.0).is_failure());
        let (x, y) = renderer.scale();
        assert_relative_eq!(x, 2.0);
        assert_relative_eq!(y, 0.5);
    }

    #[test]
    fn test_native_failure() {
        let _video = video();
        let window = Window::with_title("broken").unwrap();
        fail_next(NativeCall::CreateRenderer);
        assert!(matches!(Renderer::new(&window), Err(Error::Native { .. })));
    }
}
