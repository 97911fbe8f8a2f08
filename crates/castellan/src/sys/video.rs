//! Native windows, renderers, textures and surfaces.
//!
//! Windows are registered by id so that [`window_from_id`] can hand back the live
//! pointer. Renderers draw into a software framebuffer sized to their window.

use std::collections::HashMap;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::{fail, injected_failure, require, set_error, InitFlags, NativeCall};

/// Pixel format with bytes laid out as red, green, blue, alpha.
pub const PIXELFORMAT_RGBA32: u32 = 0x1676_2004;
/// Pixel format with bytes laid out as blue, green, red, alpha.
pub const PIXELFORMAT_BGRA32: u32 = 0x1686_2004;

/// No blending.
pub const BLENDMODE_NONE: u32 = 0x0000_0000;
/// Alpha blending.
pub const BLENDMODE_BLEND: u32 = 0x0000_0001;
/// Additive blending.
pub const BLENDMODE_ADD: u32 = 0x0000_0002;
/// Colour modulation.
pub const BLENDMODE_MOD: u32 = 0x0000_0004;
/// Colour multiplication.
pub const BLENDMODE_MUL: u32 = 0x0000_0008;

/// Texture changes rarely and is not lockable.
pub const TEXTUREACCESS_STATIC: i32 = 0;
/// Texture changes frequently and is lockable.
pub const TEXTUREACCESS_STREAMING: i32 = 1;
/// Texture can be used as a render target.
pub const TEXTUREACCESS_TARGET: i32 = 2;

/// Window flag bits, mirrored by [`crate::video::WindowFlags`].
pub mod window_flags {
    /// Fullscreen window
    pub const FULLSCREEN: u32 = 0x0000_0001;
    /// Window is visible
    pub const SHOWN: u32 = 0x0000_0004;
    /// Window is not visible
    pub const HIDDEN: u32 = 0x0000_0008;
    /// No window decoration
    pub const BORDERLESS: u32 = 0x0000_0010;
    /// Window can be resized
    pub const RESIZABLE: u32 = 0x0000_0020;
    /// Window is minimized
    pub const MINIMIZED: u32 = 0x0000_0040;
    /// Window is maximized
    pub const MAXIMIZED: u32 = 0x0000_0080;
}

const BYTES_PER_PIXEL: usize = 4;

fn known_format(format: u32) -> bool {
    format == PIXELFORMAT_RGBA32 || format == PIXELFORMAT_BGRA32
}

fn known_blend_mode(mode: u32) -> bool {
    matches!(
        mode,
        BLENDMODE_NONE | BLENDMODE_BLEND | BLENDMODE_ADD | BLENDMODE_MOD | BLENDMODE_MUL
    )
}

/// Reorders an `[r, g, b, a]` quadruple into the byte layout of `format`.
fn encode(format: u32, rgba: [u8; 4]) -> [u8; 4] {
    let [r, g, b, a] = rgba;
    if format == PIXELFORMAT_BGRA32 {
        [b, g, r, a]
    } else {
        [r, g, b, a]
    }
}

/// Inverse of [`encode`].
fn decode(format: u32, bytes: [u8; 4]) -> [u8; 4] {
    // Swapping the first and third byte is its own inverse.
    encode(format, bytes)
}

fn dimension(value: i32) -> Option<usize> {
    usize::try_from(value).ok().filter(|value| *value > 0)
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Opaque native window.
#[derive(Debug)]
pub struct NativeWindow {
    id: u32,
    title: String,
    position: (i32, i32),
    size: (i32, i32),
    flags: u32,
    has_renderer: bool,
}

static NEXT_WINDOW_ID: AtomicU32 = AtomicU32::new(1);
static WINDOWS: Mutex<Option<HashMap<u32, usize>>> = Mutex::new(None);

/// Creates a window, or returns null. Requires the video subsystem.
pub fn create_window(title: &str, x: i32, y: i32, w: i32, h: i32, flags: u32) -> *mut NativeWindow {
    if injected_failure(NativeCall::CreateWindow) || !require(InitFlags::VIDEO, "Video") {
        return ptr::null_mut();
    }
    if dimension(w).is_none() || dimension(h).is_none() {
        set_error("Window size must be positive");
        return ptr::null_mut();
    }
    let mut flags = flags;
    if flags & window_flags::HIDDEN == 0 {
        flags |= window_flags::SHOWN;
    }
    let id = NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed);
    let window = Box::into_raw(Box::new(NativeWindow {
        id,
        title: title.to_owned(),
        position: (x, y),
        size: (w, h),
        flags,
        has_renderer: false,
    }));
    WINDOWS.lock().get_or_insert_with(HashMap::new).insert(id, window as usize);
    window
}

/// Frees a window. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn destroy_window(window: *mut NativeWindow) {
    if window.is_null() {
        return;
    }
    // SAFETY: non-null pointers handed to this function came from `create_window`.
    let window = unsafe { Box::from_raw(window) };
    if let Some(windows) = WINDOWS.lock().as_mut() {
        windows.remove(&window.id);
    }
}

/// Looks up a live window by id, or returns null.
pub fn window_from_id(id: u32) -> *mut NativeWindow {
    let address = WINDOWS.lock().as_ref().and_then(|windows| windows.get(&id).copied());
    match address {
        Some(address) => address as *mut NativeWindow,
        None => {
            set_error(format!("Invalid window id {id}"));
            ptr::null_mut()
        }
    }
}

/// Shared view of a window, `None` (with the error set) for null.
unsafe fn window_ref<'a>(window: *mut NativeWindow) -> Option<&'a NativeWindow> {
    // SAFETY: the caller guarantees the pointer is null or live.
    let window = unsafe { window.as_ref() };
    if window.is_none() {
        set_error("Invalid window");
    }
    window
}

/// Exclusive view of a window, `None` (with the error set) for null.
unsafe fn window_mut<'a>(window: *mut NativeWindow) -> Option<&'a mut NativeWindow> {
    // SAFETY: the caller guarantees the pointer is null or live.
    let window = unsafe { window.as_mut() };
    if window.is_none() {
        set_error("Invalid window");
    }
    window
}

/// Window id, `0` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn window_id(window: *mut NativeWindow) -> u32 {
    // SAFETY: forwarded contract.
    unsafe { window_ref(window) }.map_or(0, |window| window.id)
}

/// Window title, empty for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn window_title(window: *mut NativeWindow) -> String {
    // SAFETY: forwarded contract.
    unsafe { window_ref(window) }.map(|window| window.title.clone()).unwrap_or_default()
}

/// Replaces the window title.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_window_title(window: *mut NativeWindow, title: &str) {
    // SAFETY: forwarded contract.
    if let Some(window) = unsafe { window_mut(window) } {
        window.title = title.to_owned();
    }
}

/// Window size, `(0, 0)` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn window_size(window: *mut NativeWindow) -> (i32, i32) {
    // SAFETY: forwarded contract.
    unsafe { window_ref(window) }.map_or((0, 0), |window| window.size)
}

/// Resizes the window. Non-positive dimensions are ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_window_size(window: *mut NativeWindow, w: i32, h: i32) {
    // SAFETY: forwarded contract.
    if let Some(window) = unsafe { window_mut(window) } {
        if dimension(w).is_some() && dimension(h).is_some() {
            window.size = (w, h);
        }
    }
}

/// Window position, `(0, 0)` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn window_position(window: *mut NativeWindow) -> (i32, i32) {
    // SAFETY: forwarded contract.
    unsafe { window_ref(window) }.map_or((0, 0), |window| window.position)
}

/// Moves the window.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_window_position(window: *mut NativeWindow, x: i32, y: i32) {
    // SAFETY: forwarded contract.
    if let Some(window) = unsafe { window_mut(window) } {
        window.position = (x, y);
    }
}

/// Window flag bits, `0` for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn window_flags(window: *mut NativeWindow) -> u32 {
    // SAFETY: forwarded contract.
    unsafe { window_ref(window) }.map_or(0, |window| window.flags)
}

unsafe fn update_flags(window: *mut NativeWindow, set: u32, clear: u32) {
    // SAFETY: forwarded contract.
    if let Some(window) = unsafe { window_mut(window) } {
        window.flags = (window.flags & !clear) | set;
    }
}

/// Makes the window visible.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn show_window(window: *mut NativeWindow) {
    // SAFETY: forwarded contract.
    unsafe { update_flags(window, window_flags::SHOWN, window_flags::HIDDEN) }
}

/// Hides the window.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn hide_window(window: *mut NativeWindow) {
    // SAFETY: forwarded contract.
    unsafe { update_flags(window, window_flags::HIDDEN, window_flags::SHOWN) }
}

/// Maximizes the window.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn maximize_window(window: *mut NativeWindow) {
    // SAFETY: forwarded contract.
    unsafe { update_flags(window, window_flags::MAXIMIZED, window_flags::MINIMIZED) }
}

/// Minimizes the window.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn minimize_window(window: *mut NativeWindow) {
    // SAFETY: forwarded contract.
    unsafe { update_flags(window, window_flags::MINIMIZED, window_flags::MAXIMIZED) }
}

/// Restores a minimized or maximized window.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn restore_window(window: *mut NativeWindow) {
    // SAFETY: forwarded contract.
    unsafe {
        update_flags(window, 0, window_flags::MINIMIZED | window_flags::MAXIMIZED);
    }
}

/// Switches fullscreen mode on or off.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_window_fullscreen(window: *mut NativeWindow, fullscreen: bool) -> i32 {
    if window.is_null() {
        return fail("Invalid window");
    }
    let (set, clear) = if fullscreen {
        (window_flags::FULLSCREEN, 0)
    } else {
        (0, window_flags::FULLSCREEN)
    };
    // SAFETY: forwarded contract.
    unsafe { update_flags(window, set, clear) };
    0
}

/// Allows or forbids resizing.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_window_resizable(window: *mut NativeWindow, resizable: bool) {
    let (set, clear) = if resizable {
        (window_flags::RESIZABLE, 0)
    } else {
        (0, window_flags::RESIZABLE)
    };
    // SAFETY: forwarded contract.
    unsafe { update_flags(window, set, clear) }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Opaque native renderer.
#[derive(Debug)]
pub struct NativeRenderer {
    window: *mut NativeWindow,
    draw_color: [u8; 4],
    blend_mode: u32,
    logical_size: (i32, i32),
    scale: (f32, f32),
    framebuffer: Vec<[u8; 4]>,
    framebuffer_size: (i32, i32),
    presented: u64,
}

/// Creates a renderer for `window`, or returns null. A window has at most one.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn create_renderer(window: *mut NativeWindow, _flags: u32) -> *mut NativeRenderer {
    if injected_failure(NativeCall::CreateRenderer) {
        return ptr::null_mut();
    }
    // SAFETY: forwarded contract.
    let Some(target) = (unsafe { window_mut(window) }) else {
        return ptr::null_mut();
    };
    if target.has_renderer {
        set_error("Renderer already associated with window");
        return ptr::null_mut();
    }
    target.has_renderer = true;
    let size = target.size;
    Box::into_raw(Box::new(NativeRenderer {
        window,
        draw_color: [0, 0, 0, 0xFF],
        blend_mode: BLENDMODE_NONE,
        logical_size: (0, 0),
        scale: (1.0, 1.0),
        framebuffer: Vec::new(),
        framebuffer_size: size,
        presented: 0,
    }))
}

/// Frees a renderer. Null is ignored. The window must still be alive.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn destroy_renderer(renderer: *mut NativeRenderer) {
    if renderer.is_null() {
        return;
    }
    // SAFETY: non-null pointers handed to this function came from `create_renderer`.
    let renderer = unsafe { Box::from_raw(renderer) };
    // SAFETY: a renderer never outlives its window.
    if let Some(window) = unsafe { renderer.window.as_mut() } {
        window.has_renderer = false;
    }
}

unsafe fn renderer_mut<'a>(renderer: *mut NativeRenderer) -> Option<&'a mut NativeRenderer> {
    // SAFETY: the caller guarantees the pointer is null or live.
    let renderer = unsafe { renderer.as_mut() };
    if renderer.is_none() {
        set_error("Invalid renderer");
    }
    renderer
}

impl NativeRenderer {
    fn output_size(&self) -> (i32, i32) {
        // SAFETY: a renderer never outlives its window.
        unsafe { self.window.as_ref() }.map_or(self.framebuffer_size, |window| window.size)
    }

    /// Resizes the framebuffer to the current window size, discarding its content.
    fn sync_framebuffer(&mut self) {
        let size = self.output_size();
        let pixels = dimension(size.0).unwrap_or(0) * dimension(size.1).unwrap_or(0);
        if size != self.framebuffer_size || self.framebuffer.len() != pixels {
            self.framebuffer_size = size;
            self.framebuffer = vec![[0, 0, 0, 0xFF]; pixels];
        }
    }

    fn fill(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.sync_framebuffer();
        let (width, height) = self.framebuffer_size;
        let (x0, y0) = (x.max(0), y.max(0));
        let (x1, y1) = (x.saturating_add(w).min(width), y.saturating_add(h).min(height));
        let color = self.draw_color;
        for row in y0..y1 {
            for column in x0..x1 {
                if let Ok(index) = usize::try_from(row * width + column) {
                    self.framebuffer[index] = color;
                }
            }
        }
    }
}

/// Sets the colour used by clear and fill operations.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_render_draw_color(renderer: *mut NativeRenderer, rgba: [u8; 4]) -> i32 {
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    renderer.draw_color = rgba;
    0
}

/// Current draw colour, opaque black for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_draw_color(renderer: *mut NativeRenderer) -> [u8; 4] {
    // SAFETY: forwarded contract.
    unsafe { renderer_mut(renderer) }.map_or([0, 0, 0, 0xFF], |renderer| renderer.draw_color)
}

/// Sets the blend mode used by fill operations.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_render_draw_blend_mode(renderer: *mut NativeRenderer, mode: u32) -> i32 {
    if !known_blend_mode(mode) {
        return fail("Invalid blend mode");
    }
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    renderer.blend_mode = mode;
    0
}

/// Current draw blend mode.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_draw_blend_mode(renderer: *mut NativeRenderer) -> u32 {
    // SAFETY: forwarded contract.
    unsafe { renderer_mut(renderer) }.map_or(BLENDMODE_NONE, |renderer| renderer.blend_mode)
}

/// Fills the whole target with the draw colour.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_clear(renderer: *mut NativeRenderer) -> i32 {
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    let (w, h) = renderer.output_size();
    renderer.fill(0, 0, w, h);
    0
}

/// Fills a rectangle, clipped to the target, with the draw colour.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_fill_rect(renderer: *mut NativeRenderer, x: i32, y: i32, w: i32, h: i32) -> i32 {
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    renderer.fill(x, y, w, h);
    0
}

/// Reads one `[r, g, b, a]` pixel back from the target.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_read_pixel(renderer: *mut NativeRenderer, x: i32, y: i32, out: &mut [u8; 4]) -> i32 {
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    renderer.sync_framebuffer();
    let (w, h) = renderer.framebuffer_size;
    if x < 0 || y < 0 || x >= w || y >= h {
        return fail("Pixel outside of render target");
    }
    match usize::try_from(y * w + x).ok().and_then(|index| renderer.framebuffer.get(index)) {
        Some(pixel) => {
            *out = *pixel;
            0
        }
        None => fail("Pixel outside of render target"),
    }
}

/// Presents the target.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_present(renderer: *mut NativeRenderer) {
    // SAFETY: forwarded contract.
    if let Some(renderer) = unsafe { renderer_mut(renderer) } {
        renderer.presented += 1;
    }
}

/// Number of presented frames.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_present_count(renderer: *mut NativeRenderer) -> u64 {
    // SAFETY: forwarded contract.
    unsafe { renderer_mut(renderer) }.map_or(0, |renderer| renderer.presented)
}

/// Size of the render target in pixels.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn renderer_output_size(renderer: *mut NativeRenderer, w: &mut i32, h: &mut i32) -> i32 {
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    (*w, *h) = renderer.output_size();
    0
}

/// Sets a device independent resolution, `(0, 0)` disables it.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_set_logical_size(renderer: *mut NativeRenderer, w: i32, h: i32) -> i32 {
    if w < 0 || h < 0 {
        return fail("Logical size must not be negative");
    }
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    renderer.logical_size = (w, h);
    0
}

/// Logical resolution, `(0, 0)` when unset.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_logical_size(renderer: *mut NativeRenderer) -> (i32, i32) {
    // SAFETY: forwarded contract.
    unsafe { renderer_mut(renderer) }.map_or((0, 0), |renderer| renderer.logical_size)
}

/// Sets the drawing scale factors.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_set_scale(renderer: *mut NativeRenderer, x: f32, y: f32) -> i32 {
    if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
        return fail("Scale factors must be positive");
    }
    // SAFETY: forwarded contract.
    let Some(renderer) = (unsafe { renderer_mut(renderer) }) else {
        return -1;
    };
    renderer.scale = (x, y);
    0
}

/// Drawing scale factors.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn render_scale(renderer: *mut NativeRenderer) -> (f32, f32) {
    // SAFETY: forwarded contract.
    unsafe { renderer_mut(renderer) }.map_or((1.0, 1.0), |renderer| renderer.scale)
}

/// Window the renderer draws into, null for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn renderer_window(renderer: *mut NativeRenderer) -> *mut NativeWindow {
    // SAFETY: forwarded contract.
    unsafe { renderer_mut(renderer) }.map_or(ptr::null_mut(), |renderer| renderer.window)
}

// ---------------------------------------------------------------------------
// Surfaces
// ---------------------------------------------------------------------------

/// Opaque native pixel surface.
#[derive(Debug, Clone)]
pub struct NativeSurface {
    w: i32,
    h: i32,
    format: u32,
    pixels: Vec<u8>,
    alpha_mod: u8,
    color_mod: [u8; 3],
    blend_mode: u32,
    rle: bool,
    locked: u32,
}

impl NativeSurface {
    fn blank(w: i32, h: i32, format: u32) -> Option<Self> {
        let (width, height) = (dimension(w)?, dimension(h)?);
        Some(Self {
            w,
            h,
            format,
            pixels: vec![0; width * height * BYTES_PER_PIXEL],
            alpha_mod: 0xFF,
            color_mod: [0xFF; 3],
            blend_mode: BLENDMODE_BLEND,
            rle: false,
            locked: 0,
        })
    }

    fn pitch(&self) -> usize {
        dimension(self.w).unwrap_or(0) * BYTES_PER_PIXEL
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.w || y >= self.h {
            return None;
        }
        Some(usize::try_from(y).ok()? * self.pitch() + usize::try_from(x).ok()? * BYTES_PER_PIXEL)
    }

    fn rgba_at(&self, offset: usize) -> [u8; 4] {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_PIXEL]);
        decode(self.format, bytes)
    }

    fn converted(&self, format: u32) -> Self {
        let mut converted = self.clone();
        converted.format = format;
        converted.locked = 0;
        for offset in (0..self.pixels.len()).step_by(BYTES_PER_PIXEL) {
            let bytes = encode(format, self.rgba_at(offset));
            converted.pixels[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&bytes);
        }
        converted
    }
}

fn into_surface_ptr(surface: NativeSurface) -> *mut NativeSurface {
    Box::into_raw(Box::new(surface))
}

/// Creates a transparent surface, or returns null.
pub fn create_rgb_surface(w: i32, h: i32, format: u32) -> *mut NativeSurface {
    if injected_failure(NativeCall::CreateSurface) {
        return ptr::null_mut();
    }
    if !known_format(format) {
        set_error("Unknown pixel format");
        return ptr::null_mut();
    }
    match NativeSurface::blank(w, h, format) {
        Some(surface) => into_surface_ptr(surface),
        None => {
            set_error("Surface size must be positive");
            ptr::null_mut()
        }
    }
}

/// Decodes an image file into an RGBA surface, or returns null.
pub fn load_image(path: &Path) -> *mut NativeSurface {
    let image = match image::open(path) {
        Ok(image) => image.into_rgba8(),
        Err(error) => {
            set_error(format!("Couldn't open {}: {error}", path.display()));
            return ptr::null_mut();
        }
    };
    let (Ok(w), Ok(h)) = (i32::try_from(image.width()), i32::try_from(image.height())) else {
        set_error("Image too large");
        return ptr::null_mut();
    };
    let Some(mut surface) = NativeSurface::blank(w, h, PIXELFORMAT_RGBA32) else {
        set_error("Image has no pixels");
        return ptr::null_mut();
    };
    surface.pixels = image.into_raw();
    into_surface_ptr(surface)
}

/// Encodes a surface into an image file; the extension picks the encoder.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn save_image(surface: *mut NativeSurface, path: &Path) -> i32 {
    // SAFETY: forwarded contract.
    let Some(surface) = (unsafe { surface_mut(surface) }) else {
        return -1;
    };
    let (Ok(w), Ok(h)) = (u32::try_from(surface.w), u32::try_from(surface.h)) else {
        return fail("Invalid surface size");
    };
    let rgba = if surface.format == PIXELFORMAT_RGBA32 {
        surface.pixels.clone()
    } else {
        surface.converted(PIXELFORMAT_RGBA32).pixels
    };
    let Some(image) = image::RgbaImage::from_raw(w, h, rgba) else {
        return fail("Surface pixel buffer does not match its size");
    };
    match image.save(path) {
        Ok(()) => 0,
        Err(error) => fail(format!("Couldn't save {}: {error}", path.display())),
    }
}

/// Frees a surface. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn free_surface(surface: *mut NativeSurface) {
    if !surface.is_null() {
        // SAFETY: non-null pointers handed to this function came from this module.
        drop(unsafe { Box::from_raw(surface) });
    }
}

unsafe fn surface_mut<'a>(surface: *mut NativeSurface) -> Option<&'a mut NativeSurface> {
    // SAFETY: the caller guarantees the pointer is null or live.
    let surface = unsafe { surface.as_mut() };
    if surface.is_none() {
        set_error("Invalid surface");
    }
    surface
}

/// Deep copy of a surface, or null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn duplicate_surface(surface: *mut NativeSurface) -> *mut NativeSurface {
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }.map_or(ptr::null_mut(), |surface| {
        let mut copy = surface.clone();
        copy.locked = 0;
        into_surface_ptr(copy)
    })
}

/// Copy of a surface in another pixel format, or null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn convert_surface(surface: *mut NativeSurface, format: u32) -> *mut NativeSurface {
    if !known_format(format) {
        set_error("Unknown pixel format");
        return ptr::null_mut();
    }
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }
        .map_or(ptr::null_mut(), |surface| into_surface_ptr(surface.converted(format)))
}

/// Width, height, pitch and format of a surface.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_info(surface: *mut NativeSurface) -> Option<(i32, i32, usize, u32)> {
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }
        .map(|surface| (surface.w, surface.h, surface.pitch(), surface.format))
}

/// Reads the `[r, g, b, a]` value of one pixel.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_get_pixel(surface: *mut NativeSurface, x: i32, y: i32) -> Option<[u8; 4]> {
    // SAFETY: forwarded contract.
    let surface = unsafe { surface_mut(surface) }?;
    surface.offset(x, y).map(|offset| surface.rgba_at(offset))
}

/// Writes the `[r, g, b, a]` value of one pixel. Out of bounds writes are ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_set_pixel(surface: *mut NativeSurface, x: i32, y: i32, rgba: [u8; 4]) {
    // SAFETY: forwarded contract.
    if let Some(surface) = unsafe { surface_mut(surface) } {
        if let Some(offset) = surface.offset(x, y) {
            let bytes = encode(surface.format, rgba);
            surface.pixels[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&bytes);
        }
    }
}

/// Whether the pixels must be locked before direct access.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_must_lock(surface: *mut NativeSurface) -> bool {
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }.is_some_and(|surface| surface.rle)
}

/// Enables or disables run-length acceleration, which requires locking.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_surface_rle(surface: *mut NativeSurface, enabled: bool) -> i32 {
    // SAFETY: forwarded contract.
    let Some(surface) = (unsafe { surface_mut(surface) }) else {
        return -1;
    };
    surface.rle = enabled;
    0
}

/// Locks the pixels. Locks nest.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn lock_surface(surface: *mut NativeSurface) -> i32 {
    // SAFETY: forwarded contract.
    let Some(surface) = (unsafe { surface_mut(surface) }) else {
        return -1;
    };
    surface.locked += 1;
    0
}

/// Releases one lock level.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn unlock_surface(surface: *mut NativeSurface) {
    // SAFETY: forwarded contract.
    if let Some(surface) = unsafe { surface_mut(surface) } {
        surface.locked = surface.locked.saturating_sub(1);
    }
}

/// Whether the pixels are currently locked.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_is_locked(surface: *mut NativeSurface) -> bool {
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }.is_some_and(|surface| surface.locked > 0)
}

/// Sets the alpha multiplier used when blitting.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_surface_alpha_mod(surface: *mut NativeSurface, alpha: u8) -> i32 {
    // SAFETY: forwarded contract.
    let Some(surface) = (unsafe { surface_mut(surface) }) else {
        return -1;
    };
    surface.alpha_mod = alpha;
    0
}

/// Alpha multiplier, opaque for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_alpha_mod(surface: *mut NativeSurface) -> u8 {
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }.map_or(0xFF, |surface| surface.alpha_mod)
}

/// Sets the colour multiplier used when blitting.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_surface_color_mod(surface: *mut NativeSurface, rgb: [u8; 3]) -> i32 {
    // SAFETY: forwarded contract.
    let Some(surface) = (unsafe { surface_mut(surface) }) else {
        return -1;
    };
    surface.color_mod = rgb;
    0
}

/// Colour multiplier, white for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_color_mod(surface: *mut NativeSurface) -> [u8; 3] {
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }.map_or([0xFF; 3], |surface| surface.color_mod)
}

/// Sets the blend mode used when blitting.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_surface_blend_mode(surface: *mut NativeSurface, mode: u32) -> i32 {
    if !known_blend_mode(mode) {
        return fail("Invalid blend mode");
    }
    // SAFETY: forwarded contract.
    let Some(surface) = (unsafe { surface_mut(surface) }) else {
        return -1;
    };
    surface.blend_mode = mode;
    0
}

/// Blend mode, none for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn surface_blend_mode(surface: *mut NativeSurface) -> u32 {
    // SAFETY: forwarded contract.
    unsafe { surface_mut(surface) }.map_or(BLENDMODE_NONE, |surface| surface.blend_mode)
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

/// Opaque native texture.
#[derive(Debug)]
pub struct NativeTexture {
    format: u32,
    access: i32,
    w: i32,
    h: i32,
    pixels: Vec<u8>,
    color_mod: [u8; 3],
    alpha_mod: u8,
    blend_mode: u32,
}

/// Creates an empty texture, or returns null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn create_texture(
    renderer: *mut NativeRenderer,
    format: u32,
    access: i32,
    w: i32,
    h: i32,
) -> *mut NativeTexture {
    // SAFETY: forwarded contract.
    if unsafe { renderer_mut(renderer) }.is_none() {
        return ptr::null_mut();
    }
    if !known_format(format) {
        set_error("Unknown pixel format");
        return ptr::null_mut();
    }
    if !(TEXTUREACCESS_STATIC..=TEXTUREACCESS_TARGET).contains(&access) {
        set_error("Invalid texture access");
        return ptr::null_mut();
    }
    let (Some(width), Some(height)) = (dimension(w), dimension(h)) else {
        set_error("Texture dimensions must be positive");
        return ptr::null_mut();
    };
    Box::into_raw(Box::new(NativeTexture {
        format,
        access,
        w,
        h,
        pixels: vec![0; width * height * BYTES_PER_PIXEL],
        color_mod: [0xFF; 3],
        alpha_mod: 0xFF,
        blend_mode: BLENDMODE_NONE,
    }))
}

/// Uploads a surface into a new static texture, or returns null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn create_texture_from_surface(
    renderer: *mut NativeRenderer,
    surface: *mut NativeSurface,
) -> *mut NativeTexture {
    // SAFETY: forwarded contract.
    if unsafe { renderer_mut(renderer) }.is_none() {
        return ptr::null_mut();
    }
    // SAFETY: forwarded contract.
    let Some(surface) = (unsafe { surface_mut(surface) }) else {
        return ptr::null_mut();
    };
    Box::into_raw(Box::new(NativeTexture {
        format: surface.format,
        access: TEXTUREACCESS_STATIC,
        w: surface.w,
        h: surface.h,
        pixels: surface.pixels.clone(),
        color_mod: surface.color_mod,
        alpha_mod: surface.alpha_mod,
        blend_mode: surface.blend_mode,
    }))
}

/// Frees a texture. Null is ignored.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn destroy_texture(texture: *mut NativeTexture) {
    if !texture.is_null() {
        // SAFETY: non-null pointers handed to this function came from this module.
        drop(unsafe { Box::from_raw(texture) });
    }
}

unsafe fn texture_mut<'a>(texture: *mut NativeTexture) -> Option<&'a mut NativeTexture> {
    // SAFETY: the caller guarantees the pointer is null or live.
    let texture = unsafe { texture.as_mut() };
    if texture.is_none() {
        set_error("Invalid texture");
    }
    texture
}

/// Format, access, width and height of a texture.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn query_texture(texture: *mut NativeTexture) -> Option<(u32, i32, i32, i32)> {
    // SAFETY: forwarded contract.
    unsafe { texture_mut(texture) }
        .map(|texture| (texture.format, texture.access, texture.w, texture.h))
}

/// Reads the `[r, g, b, a]` value of one texel.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn texture_get_pixel(texture: *mut NativeTexture, x: i32, y: i32) -> Option<[u8; 4]> {
    // SAFETY: forwarded contract.
    let texture = unsafe { texture_mut(texture) }?;
    if x < 0 || y < 0 || x >= texture.w || y >= texture.h {
        return None;
    }
    let offset = (usize::try_from(y).ok()? * dimension(texture.w)? + usize::try_from(x).ok()?)
        * BYTES_PER_PIXEL;
    let mut bytes = [0; 4];
    bytes.copy_from_slice(&texture.pixels[offset..offset + BYTES_PER_PIXEL]);
    Some(decode(texture.format, bytes))
}

/// Sets the colour multiplier used when copying the texture.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_texture_color_mod(texture: *mut NativeTexture, rgb: [u8; 3]) -> i32 {
    // SAFETY: forwarded contract.
    let Some(texture) = (unsafe { texture_mut(texture) }) else {
        return -1;
    };
    texture.color_mod = rgb;
    0
}

/// Colour multiplier, white for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn texture_color_mod(texture: *mut NativeTexture) -> [u8; 3] {
    // SAFETY: forwarded contract.
    unsafe { texture_mut(texture) }.map_or([0xFF; 3], |texture| texture.color_mod)
}

/// Sets the alpha multiplier used when copying the texture.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_texture_alpha_mod(texture: *mut NativeTexture, alpha: u8) -> i32 {
    // SAFETY: forwarded contract.
    let Some(texture) = (unsafe { texture_mut(texture) }) else {
        return -1;
    };
    texture.alpha_mod = alpha;
    0
}

/// Alpha multiplier, opaque for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn texture_alpha_mod(texture: *mut NativeTexture) -> u8 {
    // SAFETY: forwarded contract.
    unsafe { texture_mut(texture) }.map_or(0xFF, |texture| texture.alpha_mod)
}

/// Sets the blend mode used when copying the texture.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn set_texture_blend_mode(texture: *mut NativeTexture, mode: u32) -> i32 {
    if !known_blend_mode(mode) {
        return fail("Invalid blend mode");
    }
    // SAFETY: forwarded contract.
    let Some(texture) = (unsafe { texture_mut(texture) }) else {
        return -1;
    };
    texture.blend_mode = mode;
    0
}

/// Blend mode, none for null.
///
/// # Safety
/// See the module level contract in [`crate::sys`].
pub unsafe fn texture_blend_mode(texture: *mut NativeTexture) -> u32 {
    // SAFETY: forwarded contract.
    unsafe { texture_mut(texture) }.map_or(BLENDMODE_NONE, |texture| texture.blend_mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_encoding_round_trips_channels() {
        let rgba = [1, 2, 3, 4];
        assert_eq!(encode(PIXELFORMAT_BGRA32, rgba), [3, 2, 1, 4]);
        assert_eq!(decode(PIXELFORMAT_BGRA32, [3, 2, 1, 4]), rgba);
        assert_eq!(encode(PIXELFORMAT_RGBA32, rgba), rgba);
    }

    #[test]
    fn test_invalid_window_sets_error() {
        let window = create_window("x", 0, 0, 0, 10, 0);
        assert!(window.is_null());
        assert!(!super::super::get_error().is_empty());
    }

    #[test]
    fn test_surface_pixels_and_conversion() {
        let surface = create_rgb_surface(4, 2, PIXELFORMAT_RGBA32);
        unsafe {
            surface_set_pixel(surface, 3, 1, [10, 20, 30, 40]);
            surface_set_pixel(surface, 9, 9, [1, 1, 1, 1]);
            assert_eq!(surface_get_pixel(surface, 3, 1), Some([10, 20, 30, 40]));
            assert_eq!(surface_get_pixel(surface, 4, 0), None);

            let converted = convert_surface(surface, PIXELFORMAT_BGRA32);
            assert_eq!(surface_info(converted), Some((4, 2, 16, PIXELFORMAT_BGRA32)));
            assert_eq!(surface_get_pixel(converted, 3, 1), Some([10, 20, 30, 40]));
            free_surface(converted);
            free_surface(surface);
        }
    }

    #[test]
    fn test_surface_rejects_unknown_format() {
        assert!(create_rgb_surface(1, 1, 0).is_null());
        assert_eq!(super::super::get_error(), "Unknown pixel format");
    }
}
