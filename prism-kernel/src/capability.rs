//! Capabilities - abstract interfaces units are discovered by.
//!
//! A GUI never names a concrete window or renderer type. It asks for
//! "something that is a `Window`" and receives a `CapabilityRef<dyn Window>`:
//! a non-owning reference that projects the unit to the interface on use.

use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use prism_api::{CapabilityKind, CursorHandle, DrawData, Extent, GpuHandle, NativeHandle, UnitId};

use crate::unit::Unit;

/// A platform window.
pub trait Window {
    /// Current clipboard contents.
    fn clipboard(&self) -> String;

    fn set_clipboard(&self, text: &str);

    fn native_handle(&self) -> NativeHandle;

    /// Client area size in pixels.
    fn size(&self) -> Extent;

    /// Show `cursor`, or hide the pointer when `None`.
    fn set_cursor(&self, cursor: Option<CursorHandle>);
}

/// Something that accepts draw data once per frame.
pub trait Renderer {
    fn submit(&self, draw_data: &DrawData);
}

/// A pointer shape for some role (arrow, text beam, resize...).
pub trait Cursor {
    fn handle(&self) -> CursorHandle;
}

/// A GPU-resident image.
pub trait Image {
    fn gpu_handle(&self) -> GpuHandle;

    fn extent(&self) -> Extent;
}

/// Connects a capability interface to its `CapabilityKind` and to the
/// projection on `Unit` that exposes it.
pub trait Capability: 'static {
    const KIND: CapabilityKind;

    fn project(unit: &dyn Unit) -> Option<&Self>;
}

impl Capability for dyn Window {
    const KIND: CapabilityKind = CapabilityKind::Window;

    fn project(unit: &dyn Unit) -> Option<&Self> {
        unit.as_window()
    }
}

impl Capability for dyn Renderer {
    const KIND: CapabilityKind = CapabilityKind::Renderer;

    fn project(unit: &dyn Unit) -> Option<&Self> {
        unit.as_renderer()
    }
}

impl Capability for dyn Cursor {
    const KIND: CapabilityKind = CapabilityKind::Cursor;

    fn project(unit: &dyn Unit) -> Option<&Self> {
        unit.as_cursor()
    }
}

impl Capability for dyn Image {
    const KIND: CapabilityKind = CapabilityKind::Image;

    fn project(unit: &dyn Unit) -> Option<&Self> {
        unit.as_image()
    }
}

/// Non-owning reference to a unit known to implement capability `C`.
pub struct CapabilityRef<C: Capability + ?Sized> {
    unit: Weak<dyn Unit>,
    id: UnitId,
    _capability: PhantomData<fn() -> *const C>,
}

impl<C: Capability + ?Sized> CapabilityRef<C> {
    /// Wrap `unit` if it implements `C`.
    pub fn new(unit: &Rc<dyn Unit>) -> Option<Self> {
        C::project(unit.as_ref())?;
        Some(Self {
            unit: Rc::downgrade(unit),
            id: unit.id(),
            _capability: PhantomData,
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        self.unit.strong_count() > 0
    }

    pub fn upgrade(&self) -> Option<Rc<dyn Unit>> {
        self.unit.upgrade()
    }

    /// Run `f` against the capability, if the unit is still alive.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        let unit = self.unit.upgrade()?;
        let capability = C::project(unit.as_ref())?;
        Some(f(capability))
    }
}

impl<C: Capability + ?Sized> Clone for CapabilityRef<C> {
    fn clone(&self) -> Self {
        Self {
            unit: self.unit.clone(),
            id: self.id,
            _capability: PhantomData,
        }
    }
}

impl<C: Capability + ?Sized> fmt::Debug for CapabilityRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRef")
            .field("capability", &C::KIND)
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
