//! GUI items - widgets declared into every frame of their system.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use prism_api::{Descriptor, RuntimeError, TraitTag, UnitKind};
use prism_kernel::{Produced, Production, Unit, UnitCore};

use crate::context::{Frame, MouseCursor};
use crate::system::GuiSystem;

pub const GUI_ITEM: UnitKind = UnitKind("GuiItem");

const UNIT: &str = "GuiItem";

/// A titled window with optional body text and pointer shape.
pub struct GuiItem {
    core: UnitCore,
    system: Weak<GuiSystem>,
    title: String,
    text: RefCell<String>,
    /// `Some(None)` hides the pointer while the item is shown.
    cursor: Option<Option<MouseCursor>>,
}

impl GuiItem {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.borrow_mut() = text.into();
    }

    pub fn cursor(&self) -> Option<Option<MouseCursor>> {
        self.cursor
    }

    pub fn system(&self) -> Option<Rc<GuiSystem>> {
        self.system.upgrade()
    }

    /// Declare this item into `frame`.
    pub fn declare(&self, frame: &mut Frame<'_>) {
        let text = self.text.borrow();
        frame.window(&self.title, |ui| {
            if !text.is_empty() {
                ui.text(text.as_str());
            }
        });
        if let Some(cursor) = self.cursor {
            frame.set_mouse_cursor(cursor);
        }
    }

    fn parse_cursor(descriptor: &Descriptor) -> Result<Option<Option<MouseCursor>>, RuntimeError> {
        let Some(role) = descriptor.text(TraitTag::Cursor) else {
            return Ok(None);
        };
        if role.eq_ignore_ascii_case("none") {
            return Ok(Some(None));
        }
        role.parse()
            .map(|cursor| Some(Some(cursor)))
            .map_err(|reason: String| RuntimeError::construct(UNIT, reason))
    }
}

impl Unit for GuiItem {
    fn kind(&self) -> UnitKind {
        GUI_ITEM
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn refresh(&self) {
        tracing::trace!(unit = UNIT, id = %self.id(), "Refresh");
    }
}

impl Produced for GuiItem {
    type Producer = GuiSystem;
    const KIND: UnitKind = GUI_ITEM;

    fn construct(cx: &Production<'_, GuiSystem>) -> Result<Self, RuntimeError> {
        let descriptor = cx.descriptor();
        let title = descriptor
            .text(TraitTag::Name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| RuntimeError::construct(UNIT, "empty name"))?;

        Ok(Self {
            core: UnitCore::new(descriptor),
            system: Rc::downgrade(cx.producer()),
            title: title.to_string(),
            text: RefCell::new(descriptor.text(TraitTag::Text).unwrap_or_default().to_string()),
            cursor: Self::parse_cursor(descriptor)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cursor() {
        let none = Descriptor::new();
        assert_eq!(GuiItem::parse_cursor(&none), Ok(None));

        let hidden = Descriptor::new().with(TraitTag::Cursor, "None");
        assert_eq!(GuiItem::parse_cursor(&hidden), Ok(Some(None)));

        let hand = Descriptor::new().with(TraitTag::Cursor, "hand");
        assert_eq!(
            GuiItem::parse_cursor(&hand),
            Ok(Some(Some(MouseCursor::Hand)))
        );

        let bad = Descriptor::new().with(TraitTag::Cursor, "spinner");
        assert!(GuiItem::parse_cursor(&bad).unwrap_err().is_construct());
    }
}
