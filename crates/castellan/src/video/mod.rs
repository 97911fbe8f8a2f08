//! # Video
//!
//! Windows, renderers, textures and surfaces, each as an owning type plus a handle
//! alias over one generic implementation:
//!
//! | Owning     | Handle              | Generic               |
//! |------------|---------------------|-----------------------|
//! | `Window`   | `WindowHandle<'a>`  | `BasicWindow<O>`      |
//! | `Renderer` | `RendererHandle<'a>`| `BasicRenderer<'w, O>`|
//! | `Texture`  | `TextureHandle<'a>` | `BasicTexture<O>`     |
//! | `Surface`  | `SurfaceHandle<'a>` | `BasicSurface<O>`     |
//!
//! Every query and mutator is shared by both flavours. Owning constructors fail with
//! [`Error::Native`](crate::core::Error::Native) when the native library refuses to
//! create the resource; owning `from_raw` fails with
//! [`Error::NullPointer`](crate::core::Error::NullPointer) for null.
//!
//! Video resources are bound to the thread that created them and are neither `Send`
//! nor `Sync`.

mod color;
mod renderer;
mod surface;
mod texture;
mod window;

use bitflags::bitflags;

use crate::sys::video as native;

pub use color::Color;
pub use renderer::{BasicRenderer, Renderer, RendererDeleter, RendererHandle};
pub use surface::{BasicSurface, Surface, SurfaceDeleter, SurfaceHandle, SurfaceLock};
pub use texture::{BasicTexture, Texture, TextureDeleter, TextureHandle};
pub use window::{BasicWindow, Window, WindowDeleter, WindowHandle};

bitflags! {
    /// Window creation and state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowFlags: u32 {
        /// Fullscreen window
        const FULLSCREEN = native::window_flags::FULLSCREEN;
        /// Window is visible
        const SHOWN = native::window_flags::SHOWN;
        /// Window is not visible
        const HIDDEN = native::window_flags::HIDDEN;
        /// No window decoration
        const BORDERLESS = native::window_flags::BORDERLESS;
        /// Window can be resized
        const RESIZABLE = native::window_flags::RESIZABLE;
        /// Window is minimized
        const MINIMIZED = native::window_flags::MINIMIZED;
        /// Window is maximized
        const MAXIMIZED = native::window_flags::MAXIMIZED;
    }
}

/// How colours are combined when drawing or copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Source replaces destination
    #[default]
    None,
    /// Alpha blending
    Blend,
    /// Additive blending
    Add,
    /// Colour modulation
    Mod,
    /// Colour multiplication
    Mul,
}

impl BlendMode {
    pub(crate) const fn to_native(self) -> u32 {
        match self {
            Self::None => native::BLENDMODE_NONE,
            Self::Blend => native::BLENDMODE_BLEND,
            Self::Add => native::BLENDMODE_ADD,
            Self::Mod => native::BLENDMODE_MOD,
            Self::Mul => native::BLENDMODE_MUL,
        }
    }

    pub(crate) const fn from_native(mode: u32) -> Self {
        match mode {
            native::BLENDMODE_BLEND => Self::Blend,
            native::BLENDMODE_ADD => Self::Add,
            native::BLENDMODE_MOD => Self::Mod,
            native::BLENDMODE_MUL => Self::Mul,
            _ => Self::None,
        }
    }
}

/// Byte layout of 32-bit pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Red, green, blue, alpha
    #[default]
    Rgba32,
    /// Blue, green, red, alpha
    Bgra32,
    /// A format this crate has no name for
    Unknown(u32),
}

impl PixelFormat {
    pub(crate) const fn to_native(self) -> u32 {
        match self {
            Self::Rgba32 => native::PIXELFORMAT_RGBA32,
            Self::Bgra32 => native::PIXELFORMAT_BGRA32,
            Self::Unknown(format) => format,
        }
    }

    pub(crate) const fn from_native(format: u32) -> Self {
        match format {
            native::PIXELFORMAT_RGBA32 => Self::Rgba32,
            native::PIXELFORMAT_BGRA32 => Self::Bgra32,
            other => Self::Unknown(other),
        }
    }

    /// Bytes used by one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }
}

/// How a texture may be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureAccess {
    /// Changes rarely, not lockable
    #[default]
    Static,
    /// Changes frequently, lockable
    Streaming,
    /// Can be used as a render target
    Target,
}

impl TextureAccess {
    pub(crate) const fn to_native(self) -> i32 {
        match self {
            Self::Static => native::TEXTUREACCESS_STATIC,
            Self::Streaming => native::TEXTUREACCESS_STREAMING,
            Self::Target => native::TEXTUREACCESS_TARGET,
        }
    }

    pub(crate) const fn from_native(access: i32) -> Self {
        match access {
            native::TEXTUREACCESS_STREAMING => Self::Streaming,
            native::TEXTUREACCESS_TARGET => Self::Target,
            _ => Self::Static,
        }
    }
}
