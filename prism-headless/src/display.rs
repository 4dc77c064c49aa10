//! Windows, renderers and cursors that only record.

use std::any::Any;
use std::cell::{Cell, RefCell};

use prism_api::{
    CapabilityKind, CursorHandle, DrawData, Extent, NativeHandle, RuntimeError, TraitTag, UnitKind,
};
use prism_kernel::{Cursor, Produced, Production, Renderer, Unit, UnitCore, Window};

use crate::module::HeadlessModule;

pub const HEADLESS_WINDOW: UnitKind = UnitKind("HeadlessWindow");
pub const HEADLESS_RENDERER: UnitKind = UnitKind("HeadlessRenderer");
pub const HEADLESS_CURSOR: UnitKind = UnitKind("HeadlessCursor");

const DEFAULT_SIZE: Extent = Extent::new(1280, 720);

pub struct HeadlessWindow {
    core: UnitCore,
    size: Cell<Extent>,
    clipboard: RefCell<String>,
    /// `None` until someone sets a cursor.
    cursor: Cell<Option<Option<CursorHandle>>>,
    cursor_changes: Cell<usize>,
}

impl HeadlessWindow {
    pub fn resize(&self, size: Extent) {
        self.size.set(size);
    }

    /// The cursor last applied; `Some(None)` means hidden.
    pub fn cursor(&self) -> Option<Option<CursorHandle>> {
        self.cursor.get()
    }

    pub fn cursor_changes(&self) -> usize {
        self.cursor_changes.get()
    }
}

impl Window for HeadlessWindow {
    fn clipboard(&self) -> String {
        self.clipboard.borrow().clone()
    }

    fn set_clipboard(&self, text: &str) {
        *self.clipboard.borrow_mut() = text.to_string();
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle(self.id().0 as usize)
    }

    fn size(&self) -> Extent {
        self.size.get()
    }

    fn set_cursor(&self, cursor: Option<CursorHandle>) {
        self.cursor.set(Some(cursor));
        self.cursor_changes.set(self.cursor_changes.get() + 1);
    }
}

impl Unit for HeadlessWindow {
    fn kind(&self) -> UnitKind {
        HEADLESS_WINDOW
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn capabilities(&self) -> &'static [CapabilityKind] {
        <Self as Produced>::CAPABILITIES
    }

    fn as_window(&self) -> Option<&(dyn Window + 'static)> {
        Some(self)
    }
}

impl Produced for HeadlessWindow {
    type Producer = HeadlessModule;
    const KIND: UnitKind = HEADLESS_WINDOW;
    const CAPABILITIES: &'static [CapabilityKind] = &[CapabilityKind::Window];

    fn construct(cx: &Production<'_, HeadlessModule>) -> Result<Self, RuntimeError> {
        let descriptor = cx.descriptor();
        let size = descriptor.extent(TraitTag::Size).unwrap_or(DEFAULT_SIZE);
        if size.is_empty() {
            return Err(RuntimeError::construct(
                HEADLESS_WINDOW.name(),
                format!("window size {}x{} is empty", size.width, size.height),
            ));
        }
        let clipboard = descriptor
            .text(TraitTag::Clipboard)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            core: UnitCore::new(descriptor),
            size: Cell::new(size),
            clipboard: RefCell::new(clipboard),
            cursor: Cell::new(None),
            cursor_changes: Cell::new(0),
        })
    }
}

/// Keeps every frame it is handed.
pub struct HeadlessRenderer {
    core: UnitCore,
    frames: RefCell<Vec<DrawData>>,
}

impl HeadlessRenderer {
    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn last_frame(&self) -> Option<DrawData> {
        self.frames.borrow().last().cloned()
    }

    pub fn frames(&self) -> Vec<DrawData> {
        self.frames.borrow().clone()
    }
}

impl Renderer for HeadlessRenderer {
    fn submit(&self, draw_data: &DrawData) {
        tracing::trace!(
            vertices = draw_data.total_vtx_count(),
            indices = draw_data.total_idx_count(),
            commands = draw_data.commands.len(),
            "Frame received"
        );
        self.frames.borrow_mut().push(draw_data.clone());
    }
}

impl Unit for HeadlessRenderer {
    fn kind(&self) -> UnitKind {
        HEADLESS_RENDERER
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn capabilities(&self) -> &'static [CapabilityKind] {
        <Self as Produced>::CAPABILITIES
    }

    fn as_renderer(&self) -> Option<&(dyn Renderer + 'static)> {
        Some(self)
    }
}

impl Produced for HeadlessRenderer {
    type Producer = HeadlessModule;
    const KIND: UnitKind = HEADLESS_RENDERER;
    const CAPABILITIES: &'static [CapabilityKind] = &[CapabilityKind::Renderer];

    fn construct(cx: &Production<'_, HeadlessModule>) -> Result<Self, RuntimeError> {
        Ok(Self {
            core: UnitCore::new(cx.descriptor()),
            frames: RefCell::new(Vec::new()),
        })
    }
}

/// A named pointer shape.
pub struct HeadlessCursor {
    core: UnitCore,
    handle: CursorHandle,
}

impl Cursor for HeadlessCursor {
    fn handle(&self) -> CursorHandle {
        self.handle
    }
}

impl Unit for HeadlessCursor {
    fn kind(&self) -> UnitKind {
        HEADLESS_CURSOR
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn capabilities(&self) -> &'static [CapabilityKind] {
        <Self as Produced>::CAPABILITIES
    }

    fn as_cursor(&self) -> Option<&(dyn Cursor + 'static)> {
        Some(self)
    }
}

impl Produced for HeadlessCursor {
    type Producer = HeadlessModule;
    const KIND: UnitKind = HEADLESS_CURSOR;
    const CAPABILITIES: &'static [CapabilityKind] = &[CapabilityKind::Cursor];

    fn construct(cx: &Production<'_, HeadlessModule>) -> Result<Self, RuntimeError> {
        let descriptor = cx.descriptor();
        if descriptor
            .text(TraitTag::Name)
            .is_none_or(|name| name.trim().is_empty())
        {
            return Err(RuntimeError::construct(
                HEADLESS_CURSOR.name(),
                "cursors need a name",
            ));
        }
        Ok(Self {
            core: UnitCore::new(descriptor),
            handle: cx.producer().allocate_cursor(),
        })
    }
}
