//! Immediate-mode rendering context.
//!
//! A `Context` is an explicit value owned by whoever renders with it; there
//! is no process-global "current" context, so any number of systems can each
//! own one. Per frame it produces `DrawData` from whatever the caller
//! declared between `new_frame` and `Frame::render`.

mod atlas;
mod builtin;
mod frame;
mod style;

pub use atlas::{
    AtlasError, AtlasFont, Charset, FontAtlas, FontId, FontSource, Glyph, MAX_FONT_SIZE, TexData,
    check_font_size,
};
pub use frame::{Frame, WindowUi};
pub use style::{Style, StyleColors, StyleKind};

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use prism_api::{DrawData, NativeHandle};
use serde::{Deserialize, Serialize};

/// Frames averaged for the reported framerate.
const FRAMERATE_WINDOW: usize = 60;

/// Pointer shape a frame asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseCursor {
    Arrow,
    #[serde(rename = "ibeam")]
    TextInput,
    ResizeVertical,
    ResizeHorizontal,
    Hand,
    ResizeAll,
    ResizeNesw,
    ResizeNwse,
    #[serde(rename = "nope")]
    NotAllowed,
}

impl MouseCursor {
    pub const ALL: [MouseCursor; 9] = [
        MouseCursor::Arrow,
        MouseCursor::TextInput,
        MouseCursor::ResizeVertical,
        MouseCursor::ResizeHorizontal,
        MouseCursor::Hand,
        MouseCursor::ResizeAll,
        MouseCursor::ResizeNesw,
        MouseCursor::ResizeNwse,
        MouseCursor::NotAllowed,
    ];

    /// Name of the cursor unit expected to provide this role.
    pub fn role(self) -> &'static str {
        match self {
            MouseCursor::Arrow => "arrow",
            MouseCursor::TextInput => "ibeam",
            MouseCursor::ResizeVertical => "resize_vertical",
            MouseCursor::ResizeHorizontal => "resize_horizontal",
            MouseCursor::Hand => "hand",
            MouseCursor::ResizeAll => "resize_all",
            MouseCursor::ResizeNesw => "resize_nesw",
            MouseCursor::ResizeNwse => "resize_nwse",
            MouseCursor::NotAllowed => "nope",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for MouseCursor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MouseCursor::ALL
            .into_iter()
            .find(|cursor| cursor.role().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown cursor role: {s}"))
    }
}

impl fmt::Display for MouseCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}

/// What the platform and renderer backends support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendFlags(u32);

impl BackendFlags {
    pub const NONE: Self = Self(0);
    pub const HAS_MOUSE_CURSORS: Self = Self(1 << 1);
    pub const HAS_SET_MOUSE_POS: Self = Self(1 << 2);
    pub const RENDERER_HAS_VTX_OFFSET: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for BackendFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Text transfer with the platform clipboard.
pub trait ClipboardBackend {
    fn get(&mut self) -> Option<String>;

    fn set(&mut self, text: &str);
}

/// Input/output state shared between the context and its backends.
pub struct Io {
    pub display_size: [f32; 2],
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// Rolling average, frames per second.
    pub framerate: f32,
    pub backend_flags: BackendFlags,
    pub backend_platform_name: Option<String>,
    pub backend_renderer_name: Option<String>,
    frame_times: VecDeque<f32>,
}

impl Io {
    fn new() -> Self {
        Self {
            display_size: [0.0, 0.0],
            delta_time: 1.0 / 60.0,
            framerate: 0.0,
            backend_flags: BackendFlags::NONE,
            backend_platform_name: None,
            backend_renderer_name: None,
            frame_times: VecDeque::with_capacity(FRAMERATE_WINDOW),
        }
    }

    /// Record the time since the previous frame.
    pub fn advance(&mut self, dt: Duration) {
        let seconds = dt.as_secs_f32();
        self.delta_time = seconds;

        if self.frame_times.len() == FRAMERATE_WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(seconds);

        let total: f32 = self.frame_times.iter().sum();
        self.framerate = if total > 0.0 {
            self.frame_times.len() as f32 / total
        } else {
            0.0
        };
    }
}

impl fmt::Debug for Io {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Io")
            .field("display_size", &self.display_size)
            .field("delta_time", &self.delta_time)
            .field("framerate", &self.framerate)
            .field("backend_flags", &self.backend_flags)
            .finish()
    }
}

/// The platform window the context renders into.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewport {
    pub platform_handle: NativeHandle,
    pub size: [f32; 2],
}

pub struct Context {
    io: Io,
    style: Style,
    fonts: FontAtlas,
    main_viewport: Viewport,
    clipboard: Option<Box<dyn ClipboardBackend>>,
    /// Cursor requested by the last rendered frame; `None` hides it.
    mouse_cursor: Option<MouseCursor>,
    draw_data: DrawData,
    frame_count: u64,
}

impl Context {
    pub fn new(style: Style) -> Self {
        tracing::debug!(style = %style.kind, "Rendering context created");
        Self {
            io: Io::new(),
            style,
            fonts: FontAtlas::new(),
            main_viewport: Viewport::default(),
            clipboard: None,
            mouse_cursor: Some(MouseCursor::Arrow),
            draw_data: DrawData::default(),
            frame_count: 0,
        }
    }

    pub fn io(&self) -> &Io {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut Io {
        &mut self.io
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub fn fonts(&self) -> &FontAtlas {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontAtlas {
        &mut self.fonts
    }

    pub fn main_viewport(&self) -> &Viewport {
        &self.main_viewport
    }

    pub fn main_viewport_mut(&mut self) -> &mut Viewport {
        &mut self.main_viewport
    }

    pub fn set_clipboard_backend(&mut self, backend: impl ClipboardBackend + 'static) {
        self.clipboard = Some(Box::new(backend));
    }

    pub fn clipboard_text(&mut self) -> Option<String> {
        self.clipboard.as_mut()?.get()
    }

    pub fn set_clipboard_text(&mut self, text: &str) {
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard.set(text);
        }
    }

    pub fn mouse_cursor(&self) -> Option<MouseCursor> {
        self.mouse_cursor
    }

    /// Draw data of the last rendered frame.
    pub fn draw_data(&self) -> &DrawData {
        &self.draw_data
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Start declaring a frame. Nothing is drawn until `Frame::render`.
    pub fn new_frame(&mut self) -> Frame<'_> {
        self.main_viewport.size = self.io.display_size;
        Frame::new(self)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("io", &self.io)
            .field("style", &self.style.kind)
            .field("fonts", &self.fonts.fonts().len())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        tracing::debug!(frames = self.frame_count, "Rendering context destroyed");
    }
}
