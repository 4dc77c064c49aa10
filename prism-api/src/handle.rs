//! Opaque handles issued by backends.
//!
//! The GUI layer never interprets these; it only stores them and passes them
//! back to whoever issued them.

use serde::{Deserialize, Serialize};

/// A GPU-visible texture handle (what a renderer binds when drawing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpuHandle(pub u64);

/// A platform cursor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorHandle(pub u64);

/// A platform window handle (HWND, NSWindow*, X11 id...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NativeHandle(pub usize);
