//! Prism Headless - an in-memory platform for the Prism unit runtime.
//!
//! Produces windows, renderers, cursors and images that record what they are
//! asked to do instead of talking to a display server or a GPU. Used by tests
//! and by the demo binary.
//!
//! Two libraries are provided:
//! - `LIBRARY` ("Headless"): everything, including images
//! - `DISPLAY_LIBRARY` ("HeadlessDisplay"): windows, renderers and cursors only

mod display;
mod module;
mod texture;

pub use display::{
    HEADLESS_CURSOR, HEADLESS_RENDERER, HEADLESS_WINDOW, HeadlessCursor, HeadlessRenderer,
    HeadlessWindow,
};
pub use module::{DISPLAY_LIBRARY, HeadlessModule, LIBRARY};
pub use texture::{HEADLESS_IMAGE, HeadlessImage};

use prism_kernel::Runtime;

/// Make both headless libraries loadable in `runtime`.
pub fn register(runtime: &Runtime) {
    runtime.register(&LIBRARY);
    runtime.register(&DISPLAY_LIBRARY);
}
