//! Identities - how units, unit types and capabilities are named.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of a produced unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

/// Counter for generating unique unit IDs.
static UNIT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl UnitId {
    /// Generate a new unique unit ID.
    pub fn next() -> Self {
        UnitId(UNIT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable type tag of a concrete unit type (e.g. `"GuiFont"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnitKind(pub &'static str);

impl UnitKind {
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An abstract interface a unit may implement, used for discovery instead
/// of concrete type matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Window,
    Renderer,
    Cursor,
    Image,
    /// A user interface system (a GUI surface bound to a window).
    UiSystem,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityKind::Window => "Window",
            CapabilityKind::Renderer => "Renderer",
            CapabilityKind::Cursor => "Cursor",
            CapabilityKind::Image => "Image",
            CapabilityKind::UiSystem => "UiSystem",
        };
        f.write_str(name)
    }
}

/// What a single request inside a verb is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Target {
    /// A concrete unit type.
    Unit(UnitKind),
    /// Whatever unit type implements the capability.
    Capability(CapabilityKind),
    /// One existing unit (used by Destroy).
    Instance(UnitId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Unit(kind) => write!(f, "unit {}", kind),
            Target::Capability(cap) => write!(f, "capability {}", cap),
            Target::Instance(id) => write!(f, "instance {}", id),
        }
    }
}

/// Monotonic frame counter of a runtime. Tick 0 means "never updated".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FrameTick(pub u64);

impl FrameTick {
    pub fn next(self) -> Self {
        FrameTick(self.0 + 1)
    }
}
