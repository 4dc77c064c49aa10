//! Prism API - Shared value types for the Prism unit runtime.
//!
//! Everything here is plain data: descriptors handed to constructors, the
//! identities units and capabilities are known by, opaque backend handles,
//! draw data exchanged with renderers, and the runtime error type.

mod descriptor;
mod draw;
mod error;
mod handle;
mod identity;

pub use descriptor::*;
pub use draw::*;
pub use error::*;
pub use handle::*;
pub use identity::*;
