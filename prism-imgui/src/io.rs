//! IO bridge between a rendering context and its platform collaborators.

use prism_api::CursorHandle;
use prism_kernel::{CapabilityRef, Cursor, Production, Window};

use crate::context::{ClipboardBackend, MouseCursor};

/// Clipboard backend routed through a window's clipboard.
pub struct WindowClipboard {
    window: CapabilityRef<dyn Window>,
}

impl WindowClipboard {
    pub fn new(window: CapabilityRef<dyn Window>) -> Self {
        Self { window }
    }
}

impl ClipboardBackend for WindowClipboard {
    fn get(&mut self) -> Option<String> {
        self.window.with(|window| window.clipboard())
    }

    fn set(&mut self, text: &str) {
        if self.window.with(|window| window.set_clipboard(text)).is_none() {
            tracing::warn!("Clipboard write dropped, window is gone");
        }
    }
}

/// Cursor units found for each role, looked up once on construction.
#[derive(Debug, Default)]
pub struct CursorBindings {
    slots: [Option<CapabilityRef<dyn Cursor>>; MouseCursor::ALL.len()],
}

impl CursorBindings {
    /// Seek a cursor named after each role. Missing roles stay unbound.
    pub fn resolve<P: ?Sized>(cx: &Production<'_, P>, roles: &[MouseCursor]) -> Self {
        let mut bindings = Self::default();
        for &role in roles {
            match cx.seek::<dyn Cursor>(Some(role.role())) {
                Some(cursor) => bindings.slots[role.index()] = Some(cursor),
                None => tracing::warn!(role = role.role(), "No cursor available for role"),
            }
        }
        bindings
    }

    pub fn is_bound(&self, role: MouseCursor) -> bool {
        self.slots[role.index()]
            .as_ref()
            .is_some_and(CapabilityRef::is_alive)
    }

    pub fn bound_count(&self) -> usize {
        MouseCursor::ALL
            .into_iter()
            .filter(|&role| self.is_bound(role))
            .count()
    }

    fn handle_of(&self, role: MouseCursor) -> Option<CursorHandle> {
        self.slots[role.index()].as_ref()?.with(|cursor| cursor.handle())
    }

    /// Handle for `role`, falling back to the arrow cursor.
    pub fn handle(&self, role: MouseCursor) -> Option<CursorHandle> {
        self.handle_of(role)
            .or_else(|| self.handle_of(MouseCursor::Arrow))
    }
}
