//! Renderer textures

use std::fmt;
use std::ptr::NonNull;

use log::debug;

use crate::core::{Deleter, Error, Handle, Outcome, Owning, Ownership, PointerManager, Result};
use crate::foundation::{Area, Point};
use crate::sys::video::{self as native, NativeTexture};
use crate::video::{BasicRenderer, BasicSurface, BlendMode, Color, PixelFormat, TextureAccess};

/// Frees native textures.
pub struct TextureDeleter;

impl Deleter<NativeTexture> for TextureDeleter {
    unsafe fn delete(ptr: NonNull<NativeTexture>) {
        // SAFETY: forwarded from the owning pointer manager.
        unsafe { native::destroy_texture(ptr.as_ptr()) }
    }
}

/// Pixel data uploaded to a renderer, owning or not depending on `O`.
pub struct BasicTexture<O: Ownership> {
    texture: PointerManager<O, NativeTexture, TextureDeleter>,
}

/// A texture that is destroyed when dropped.
pub type Texture = BasicTexture<Owning>;

/// A non-owning reference to a texture.
pub type TextureHandle<'a> = BasicTexture<Handle<'a>>;

impl BasicTexture<Owning> {
    /// Creates an uninitialised texture.
    pub fn new<R: Ownership>(
        renderer: &BasicRenderer<'_, R>,
        format: PixelFormat,
        access: TextureAccess,
        size: Area,
    ) -> Result<Self> {
        // SAFETY: the renderer pointer is null or live for as long as `renderer` is.
        let ptr = unsafe {
            native::create_texture(
                renderer.get(),
                format.to_native(),
                access.to_native(),
                size.width,
                size.height,
            )
        };
        if ptr.is_null() {
            return Err(Error::native("Failed to create texture"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let texture = unsafe { PointerManager::<Owning, _, _>::new(ptr, "texture") }?;
        debug!("Created {access:?} texture ({size}, {format:?})");
        Ok(Self { texture })
    }

    /// Uploads `surface` into a new static texture.
    pub fn from_surface<R: Ownership, S: Ownership>(
        renderer: &BasicRenderer<'_, R>,
        surface: &BasicSurface<S>,
    ) -> Result<Self> {
        // SAFETY: both pointers are null or live for as long as their wrappers are.
        let ptr = unsafe { native::create_texture_from_surface(renderer.get(), surface.get()) };
        if ptr.is_null() {
            return Err(Error::native("Failed to create texture from surface"));
        }
        // SAFETY: `ptr` was just created and is owned by nobody else.
        let texture = unsafe { PointerManager::<Owning, _, _>::new(ptr, "texture") }?;
        Ok(Self { texture })
    }

    /// Takes ownership of a native texture.
    ///
    /// # Errors
    /// [`Error::NullPointer`] if `ptr` is null.
    ///
    /// # Safety
    /// `ptr` must be null or a live texture that nothing else frees.
    pub unsafe fn from_raw(ptr: *mut NativeTexture) -> Result<Self> {
        // SAFETY: forwarded contract.
        let texture = unsafe { PointerManager::<Owning, _, _>::new(ptr, "texture") }?;
        Ok(Self { texture })
    }

    /// A handle borrowing this texture.
    pub fn handle(&self) -> TextureHandle<'_> {
        TextureHandle::from(self)
    }
}

impl<'a> BasicTexture<Handle<'a>> {
    /// Wraps a native texture without taking ownership. Null is allowed.
    ///
    /// # Safety
    /// `ptr` must be null or stay live for `'a`.
    pub unsafe fn from_raw(ptr: *mut NativeTexture) -> Self {
        // SAFETY: forwarded contract.
        let texture = unsafe { PointerManager::<Handle<'a>, _, _>::new(ptr) };
        Self { texture }
    }

    /// Whether the handle refers to a texture.
    pub fn is_valid(&self) -> bool {
        !self.texture.is_null()
    }
}

impl<'a> From<&'a Texture> for TextureHandle<'a> {
    fn from(owner: &'a Texture) -> Self {
        Self { texture: PointerManager::from_owner(&owner.texture) }
    }
}

impl Clone for TextureHandle<'_> {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for TextureHandle<'_> {}

impl<O: Ownership> BasicTexture<O> {
    fn query(&self) -> Option<(u32, i32, i32, i32)> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::query_texture(self.get()) }
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        PixelFormat::from_native(self.query().map_or(0, |(format, ..)| format))
    }

    /// How the texture may be updated.
    pub fn access(&self) -> TextureAccess {
        TextureAccess::from_native(self.query().map_or(0, |(_, access, ..)| access))
    }

    /// Width and height, empty for a null handle.
    pub fn size(&self) -> Area {
        self.query().map_or_else(Area::default, |(.., width, height)| Area::new(width, height))
    }

    /// Width in pixels.
    pub fn width(&self) -> i32 {
        self.size().width
    }

    /// Height in pixels.
    pub fn height(&self) -> i32 {
        self.size().height
    }

    /// Whether the texture can be a render target.
    pub fn is_target(&self) -> bool {
        self.access() == TextureAccess::Target
    }

    /// Whether the texture is lockable.
    pub fn is_streaming(&self) -> bool {
        self.access() == TextureAccess::Streaming
    }

    /// Whether the texture is static.
    pub fn is_static(&self) -> bool {
        self.access() == TextureAccess::Static
    }

    /// Colour of one texel, `None` outside the texture.
    pub fn pixel(&self, point: Point) -> Option<Color> {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::texture_get_pixel(self.get(), point.x, point.y) }.map(Color::from)
    }

    /// Sets the colour multiplier used when copying. Alpha is ignored.
    pub fn set_color_mod(&self, color: Color) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe {
            native::set_texture_color_mod(self.get(), [color.r, color.g, color.b])
        })
    }

    /// Colour multiplier, opaque.
    pub fn color_mod(&self) -> Color {
        // SAFETY: the pointer is null or live for as long as `self` is.
        let [r, g, b] = unsafe { native::texture_color_mod(self.get()) };
        Color::rgb(r, g, b)
    }

    /// Sets the alpha multiplier used when copying.
    pub fn set_alpha_mod(&self, alpha: u8) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_texture_alpha_mod(self.get(), alpha) })
    }

    /// Alpha multiplier.
    pub fn alpha_mod(&self) -> u8 {
        // SAFETY: the pointer is null or live for as long as `self` is.
        unsafe { native::texture_alpha_mod(self.get()) }
    }

    /// Sets the blend mode used when copying.
    pub fn set_blend_mode(&self, mode: BlendMode) -> Outcome {
        // SAFETY: the pointer is null or live for as long as `self` is.
        Outcome::from_status(unsafe { native::set_texture_blend_mode(self.get(), mode.to_native()) })
    }

    /// Blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        // SAFETY: the pointer is null or live for as long as `self` is.
        BlendMode::from_native(unsafe { native::texture_blend_mode(self.get()) })
    }

    /// The native texture pointer.
    pub fn get(&self) -> *mut NativeTexture {
        self.texture.get()
    }
}

impl<O: Ownership> fmt::Display for BasicTexture<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        write!(f, "texture{{data: {:p}, width: {}, height: {}}}", self.get(), size.width, size.height)
    }
}

impl<O: Ownership> fmt::Debug for BasicTexture<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicTexture")
            .field("texture", &self.texture)
            .field("size", &self.size())
            .field("access", &self.access())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, Library, Subsystems};
    use crate::video::{Renderer, Surface, Window};
    use std::ptr;

    #[test]
    fn test_owning_from_null() {
        let error = unsafe { Texture::from_raw(ptr::null_mut()) }.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ContractViolation);
        let handle = unsafe { TextureHandle::from_raw(ptr::null_mut()) };
        assert!(!handle.is_valid());
        assert_eq!(handle.size(), Area::default());
    }

    #[test]
    fn test_create() {
        let _video = Library::init(Subsystems::VIDEO).unwrap();
        let window = Window::with_title("texture").unwrap();
        let renderer = Renderer::new(&window).unwrap();

        let texture =
            Texture::new(&renderer, PixelFormat::Bgra32, TextureAccess::Target, Area::new(64, 32)).unwrap();
        assert_eq!(texture.size(), Area::new(64, 32));
        assert_eq!(texture.format(), PixelFormat::Bgra32);
        assert!(texture.is_target());
        assert!(!texture.is_static() && !texture.is_streaming());

        let handle = texture.handle();
        assert!(handle.is_valid());
        assert_eq!(handle.get(), texture.get());

        let error = Texture::new(&renderer, PixelFormat::Rgba32, TextureAccess::Static, Area::default())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_from_surface() {
        let _video = Library::init(Subsystems::VIDEO).unwrap();
        let window = Window::with_title("upload").unwrap();
        let renderer = Renderer::new(&window).unwrap();
        let surface = Surface::new(Area::new(4, 4), PixelFormat::Rgba32).unwrap();
        surface.set_pixel(Point::new(3, 2), Color::RED);
        assert!(surface.set_alpha_mod(0x7F).is_success());

        let texture = Texture::from_surface(&renderer, &surface).unwrap();
        assert!(texture.is_static());
        assert_eq!(texture.size(), surface.size());
        assert_eq!(texture.pixel(Point::new(3, 2)), Some(Color::RED));
        assert_eq!(texture.pixel(Point::new(4, 0)), None);
        assert_eq!(texture.alpha_mod(), 0x7F);
    }

    #[test]
    fn test_modulation() {
        let _video = Library::init(Subsystems::VIDEO).unwrap();
        let window = Window::with_title("modulation").unwrap();
        let renderer = Renderer::new(&window).unwrap();
        let texture =
            Texture::new(&renderer, PixelFormat::Rgba32, TextureAccess::Streaming, Area::new(1, 1)).unwrap();

        assert_eq!(texture.color_mod(), Color::WHITE);
        assert!(texture.set_color_mod(Color::new(9, 8, 7, 0)).is_success());
        assert_eq!(texture.color_mod(), Color::rgb(9, 8, 7));

        assert!(texture.set_alpha_mod(3).is_success());
        assert_eq!(texture.alpha_mod(), 3);

        assert!(texture.set_blend_mode(BlendMode::Add).is_success());
        assert_eq!(texture.blend_mode(), BlendMode::Add);
    }
}
