//! Windows

use std::fmt;
use std::ptr::NonNull;

use log::debug;

use crate::core::{Deleter, Error, Handle, Outcome, Owning, Ownership, PointerManager, Result};
use crate::foundation::{Area, Point};
use crate::sys::video::{self as native, NativeWindow};
use crate::video::WindowFlags;

/// Frees native windows.
pub struct WindowDeleter;

impl Deleter<NativeWindow> for WindowDeleter {
    unsafe fn delete(ptr: NonNull<NativeWindow>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::destroy_window(ptr.as_ptr()) }
    }
}

/// A window, owning or not depending on `O`.
pub struct BasicWindow<O: Ownership> {
    window: PointerManager<O, NativeWindow, WindowDeleter>,
}

/// A window that is destroyed when dropped.
pub type Window = BasicWindow<Owning>;

/// A non-owning reference to a window.
pub type WindowHandle<'a> = BasicWindow<Handle<'a>>;

impl BasicWindow<Owning> {
    /// Title used by [`Window::with_title`] callers that do not care.
    pub const DEFAULT_TITLE: &'static str = "castellan window";
    /// Size used by [`Window::with_title`].
    pub const DEFAULT_SIZE: Area = Area::new(800, 600);

    /// Creates a window. Requires the video subsystem.
    ///
    /// Windows start shown unless `flags` contains [`WindowFlags::HIDDEN`].
    pub fn new(title: &str, size: Area, flags: WindowFlags) -> Result<Self> {
        let ptr = native::create_window(title, 0, 0, size.width, size.height, flags.bits());
        if ptr.is_null() {
            return Err(Error::native("Failed to create window"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let window = unsafe { PointerManager::<Owning, _, _>::new(ptr, "window") }?;
        debug!("Created window '{title}' ({size})");
        Ok(Self { window })
    }

    /// Creates a hidden window of [`DEFAULT_SIZE`](Self::DEFAULT_SIZE).
    pub fn with_title(title: &str) -> Result<Self> {
        Self::new(title, Self::DEFAULT_SIZE, WindowFlags::HIDDEN)
    }

    /// Takes ownership of a native window.
    ///
    /// # Errors
    /// [`Error::NullPointer`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or a live window that nothing else frees.
    pub unsafe fn from_raw(ptr: *mut NativeWindow) -> Result<Self> {
        // SAFETY: forwarded contract.
        let window = unsafe { PointerManager::<Owning, _, _>::new(ptr, "window") }?;
        Ok(Self { window })
    }

    /// A handle borrowing this window.
    pub fn handle(&self) -> WindowHandle<'_> {
        WindowHandle::from(self)
    }
}

impl<'a> BasicWindow<Handle<'a>> {
    /// Wraps a native window without taking ownership. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or stay live for `'a`.
    pub unsafe fn from_raw(ptr: *mut NativeWindow) -> Self {
        // SAFETY: forwarded contract.
        let window = unsafe { PointerManager::<Handle<'a>, _, _>::new(ptr) };
        Self { window }
    }

    /// Looks up a live window by id. The handle is null if there is none.
    ///
    /// # Safety
    /// The window with this id must stay alive for `'a`.
    pub unsafe fn from_id(id: u32) -> Self {
        // SAFETY: the registry only holds live windows; the caller vouches for `'a`.
        unsafe { Self::from_raw(native::window_from_id(id)) }
    }

    /// Whether the handle refers to a window.
    pub fn is_valid(&self) -> bool {
        !self.window.is_null()
    }
}

impl<'a> From<&'a Window> for WindowHandle<'a> {
    fn from(owner: &'a Window) -> Self {
        Self { window: PointerManager::from_owner(&owner.window) }
    }
}

impl Clone for WindowHandle<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for WindowHandle<'_> {}

impl<O: Ownership> BasicWindow<O> {
    /// Identifier usable with [`WindowHandle::from_id`].
    pub fn id(&self) -> u32 {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::window_id(self.get()) }
    }

    /// Window title.
    pub fn title(&self) -> String {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::window_title(self.get()) }
    }

    /// Changes the window title.
    pub fn set_title(&self, title: &str) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::set_window_title(self.get(), title) }
    }

    /// Client area size.
    pub fn size(&self) -> Area {
        // SAFETY: the pointer is null or live for as long as `self` is.
        let (width, height) = unsafe { native::window_size(self.get()) };
        Area::new(width, height)
    }

    /// Resizes the client area. Sizes without area are ignored.
    pub fn set_size(&self, size: Area) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::set_window_size(self.get(), size.width, size.height) }
    }

    /// Client area width.
    pub fn width(&self) -> i32 {
        self.size().width
    }

    /// Client area height.
    pub fn height(&self) -> i32 {
        self.size().height
    }

    /// Position of the top-left corner.
    pub fn position(&self) -> Point {
        // SAFETY: the pointer is null or live for as long as `self` is.
        let (x, y) = unsafe { native::window_position(self.get()) };
        Point::new(x, y)
    }

    /// Moves the window.
    pub fn set_position(&self, position: Point) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::set_window_position(self.get(), position.x, position.y) }
    }

    /// Current state flags.
    pub fn flags(&self) -> WindowFlags {
        // SAFETY: the pointer is null or live for as long as `self` is.
        WindowFlags::from_bits_truncate(unsafe { native::window_flags(self.get()) })
    }

    /// Makes the window visible.
    pub fn show(&self) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::show_window(self.get()) }
    }

    /// Hides the window.
    pub fn hide(&self) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::hide_window(self.get()) }
    }

    /// Whether the window is shown.
    pub fn is_visible(&self) -> bool {
        self.flags().contains(WindowFlags::SHOWN)
    }

    /// Maximizes the window.
    pub fn maximize(&self) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::maximize_window(self.get()) }
    }

    /// Minimizes the window.
    pub fn minimize(&self) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::minimize_window(self.get()) }
    }

    /// Restores a minimized or maximized window.
    pub fn restore(&self) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::restore_window(self.get()) }
    }

    /// Whether the window is maximized.
    pub fn is_maximized(&self) -> bool {
        self.flags().contains(WindowFlags::MAXIMIZED)
    }

    /// Whether the window is minimized.
    pub fn is_minimized(&self) -> bool {
        self.flags().contains(WindowFlags::MINIMIZED)
    }

    /// Enters or leaves fullscreen mode.
    pub fn set_fullscreen(&self, fullscreen: bool) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_window_fullscreen(self.get(), fullscreen) })
    }

    /// Whether the window is fullscreen.
    pub fn is_fullscreen(&self) -> bool {
        self.flags().contains(WindowFlags::FULLSCREEN)
    }

    /// Allows or forbids resizing by the user.
    pub fn set_resizable(&self, resizable: bool) {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::set_window_resizable(self.get(), resizable) }
    }

    /// Whether the user may resize the window.
    pub fn is_resizable(&self) -> bool {
        self.flags().contains(WindowFlags::RESIZABLE)
    }

    /// The native window pointer.
    pub fn get(&self) -> *mut NativeWindow {
        self.window.get()
    }
}

impl<O: Ownership> fmt::Display for BasicWindow<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        write!(f, "window{{data: {:p}, width: {}, height: {}}}", self.get(), size.width, size.height)
    }
}

impl<O: Ownership> fmt::Debug for BasicWindow<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicWindow")
            .field("window", &self.window)
            .field("title", &self.title())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, Library, Subsystems};
    use std::ptr;

    fn video() -> Library {
        Library::init(Subsystems::VIDEO).unwrap()
    }

    #[test]
    fn test_owning_from_null() {
        let error = unsafe { Window::from_raw(ptr::null_mut()) }.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ContractViolation);
        assert_eq!(error.to_string(), "Null window pointer!");
    }

    #[test]
    fn test_handle_from_null() {
        let handle = unsafe { WindowHandle::from_raw(ptr::null_mut()) };
        assert!(!handle.is_valid());
        assert_eq!(handle.id(), 0);
        assert_eq!(handle.size(), Area::default());
    }

    #[test]
    fn test_handle_from_owner() {
        let _video = video();
        let window = Window::with_title("owner").unwrap();
        let handle = window.handle();
        assert!(handle.is_valid());
        assert_eq!(handle.get(), window.get());

        handle.set_title("renamed");
        assert_eq!(window.title(), "renamed");
    }

    #[test]
    fn test_defaults() {
        let _video = video();
        let window = Window::with_title(Window::DEFAULT_TITLE).unwrap();
        assert_eq!(window.size(), Window::DEFAULT_SIZE);
        assert!(!window.is_visible());
        assert!(!window.is_fullscreen());
        assert!(!window.is_resizable());
    }

    #[test]
    fn test_state_changes() {
        let _video = video();
        let window = Window::new("state", Area::new(320, 240), WindowFlags::RESIZABLE).unwrap();
        assert!(window.is_visible());
        assert!(window.is_resizable());

        window.hide();
        assert!(!window.is_visible());
        window.show();
        assert!(window.is_visible());

        window.maximize();
        assert!(window.is_maximized());
        window.minimize();
        assert!(window.is_minimized() && !window.is_maximized());
        window.restore();
        assert!(!window.is_minimized() && !window.is_maximized());

        assert!(window.set_fullscreen(true).is_success());
        assert!(window.is_fullscreen());
        assert!(window.set_fullscreen(false).is_success());

        window.set_resizable(false);
        assert!(!window.is_resizable());
    }

    #[test]
    fn test_geometry() {
        let _video = video();
        let window = Window::with_title("geometry").unwrap();
        window.set_size(Area::new(1024, 768));
        window.set_size(Area::new(0, 10));
        assert_eq!(window.width(), 1024);
        assert_eq!(window.height(), 768);

        window.set_position(Point::new(15, 25));
        assert_eq!(window.position(), Point::new(15, 25));
        assert_eq!(window.to_string(), format!("window{{data: {:p}, width: 1024, height: 768}}", window.get()));
    }

    #[test]
    fn test_from_id() {
        let _video = video();
        let window = Window::with_title("lookup").unwrap();
        let id = window.id();
        let handle = unsafe { WindowHandle::from_id(id) };
        assert_eq!(handle.get(), window.get());
        drop(window);

        let handle = unsafe { WindowHandle::from_id(id) };
        assert!(!handle.is_valid());
    }

    #[test]
    fn test_native_failure() {
        let _video = video();
        crate::sys::fail_next(crate::sys::NativeCall::CreateWindow);
        let error = Window::with_title("broken").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
    }
}
