//! Units - polymorphic components attached to things.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use prism_api::{CapabilityKind, Descriptor, TraitTag, UnitId, UnitKind};

use crate::capability::{Cursor, Image, Renderer, Window};
use crate::verb::Verb;

/// State every unit carries: its identity and the descriptor it was made from.
#[derive(Debug, Clone)]
pub struct UnitCore {
    id: UnitId,
    name: Option<String>,
    descriptor: Descriptor,
}

impl UnitCore {
    pub fn new(descriptor: &Descriptor) -> Self {
        Self {
            id: UnitId::next(),
            name: descriptor.text(TraitTag::Name).map(str::to_string),
            descriptor: descriptor.clone(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

/// A component produced by some factory and attached to a `Thing`.
///
/// Capabilities are exposed through the `as_*` projections; a unit that
/// returns `Some` from `as_window` *is* a window as far as seeking goes.
pub trait Unit: 'static {
    /// Stable type tag.
    fn kind(&self) -> UnitKind;

    fn core(&self) -> &UnitCore;

    fn as_any(&self) -> &dyn Any;

    fn id(&self) -> UnitId {
        self.core().id()
    }

    /// The `Name` trait, used to tell apart units with the same capability.
    fn name(&self) -> Option<&str> {
        self.core().name()
    }

    fn capabilities(&self) -> &'static [CapabilityKind] {
        &[]
    }

    fn as_window(&self) -> Option<&(dyn Window + 'static)> {
        None
    }

    fn as_renderer(&self) -> Option<&(dyn Renderer + 'static)> {
        None
    }

    fn as_cursor(&self) -> Option<&(dyn Cursor + 'static)> {
        None
    }

    fn as_image(&self) -> Option<&(dyn Image + 'static)> {
        None
    }

    /// React to a verb sent to the thing this unit lives on.
    fn act(self: Rc<Self>, verb: &mut Verb) {
        let _ = verb;
    }

    /// React to an environmental change.
    fn refresh(&self) {}
}

impl dyn Unit {
    pub fn downcast_ref<T: Unit>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Unit>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl fmt::Debug for dyn Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
