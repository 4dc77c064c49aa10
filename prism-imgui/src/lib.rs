//! Prism ImGui - immediate-mode GUI module for the Prism unit runtime.
//!
//! Produced units:
//! - `GuiSystem`: a rendering context bound to a window and a renderer
//! - `GuiItem`: a widget declared into each frame
//! - `GuiFont`: a font rasterized into the context atlas and uploaded as an image
//!
//! Register `LIBRARY` with a runtime and load it by name ("ImGui").

pub mod context;
pub mod font;
pub mod io;
pub mod item;
pub mod module;
pub mod settings;
pub mod system;

pub use context::{Charset, Context, FontAtlas, MouseCursor, Style, StyleKind};
pub use font::{GUI_FONT, GuiFont};
pub use item::{GUI_ITEM, GuiItem};
pub use module::{GuiModule, LIBRARY};
pub use settings::{FontSettings, GuiSettings, SettingsError};
pub use system::{GUI_SYSTEM, GuiSystem};
