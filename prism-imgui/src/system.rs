//! GUI system - one rendering context bound to a window and a renderer.
//!
//! Construction order:
//! 1. Require a `Window` and a `Renderer` near the owning thing
//! 2. Create the context with the configured style
//! 3. Route the context clipboard through the window
//! 4. Record the window's native handle in the main viewport
//! 5. Look up a cursor for each role (missing roles are tolerated)
//! 6. Request the default font (failure is logged, not fatal)
//!
//! Items and fonts are produced by the system's own factories: Create and
//! Destroy verbs sent to the owning thing reach them through `Unit::act`.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use prism_api::{CapabilityKind, FrameTick, RuntimeError, UnitKind};
use prism_kernel::{
    CapabilityRef, Factory, Produced, Production, Renderer, UniqueKeyed, Unit, UnitCore, Verb,
    VerbKind, Window,
};

use crate::context::{BackendFlags, Context, MouseCursor, Style};
use crate::font::GuiFont;
use crate::io::{CursorBindings, WindowClipboard};
use crate::item::GuiItem;
use crate::module::GuiModule;
use crate::settings::GuiSettings;

pub const GUI_SYSTEM: UnitKind = UnitKind("GuiSystem");

const UNIT: &str = "GuiSystem";
const BACKEND_NAME: &str = "prism";

pub struct GuiSystem {
    core: UnitCore,
    module: Weak<GuiModule>,
    settings: GuiSettings,
    /// Released explicitly on drop, before the factories.
    context: RefCell<Option<Context>>,
    window: CapabilityRef<dyn Window>,
    renderer: CapabilityRef<dyn Renderer>,
    cursors: CursorBindings,
    items: RefCell<Factory<GuiItem>>,
    fonts: RefCell<Factory<GuiFont, UniqueKeyed>>,
    last_drawn: Cell<Option<FrameTick>>,
    last_frame: Cell<Option<Instant>>,
    /// Cursor last applied to the window; `None` until the first frame.
    applied_cursor: Cell<Option<Option<MouseCursor>>>,
}

impl GuiSystem {
    pub fn settings(&self) -> &GuiSettings {
        &self.settings
    }

    pub fn module(&self) -> Option<Rc<GuiModule>> {
        self.module.upgrade()
    }

    pub fn window(&self) -> &CapabilityRef<dyn Window> {
        &self.window
    }

    pub fn renderer(&self) -> &CapabilityRef<dyn Renderer> {
        &self.renderer
    }

    pub fn cursors(&self) -> &CursorBindings {
        &self.cursors
    }

    /// Run `f` against the rendering context.
    pub fn with_context<R>(&self, f: impl FnOnce(&mut Context) -> R) -> Result<R, RuntimeError> {
        let mut context = self
            .context
            .try_borrow_mut()
            .map_err(|_| RuntimeError::Detached("context"))?;
        let context = context.as_mut().ok_or(RuntimeError::Detached("context"))?;
        Ok(f(context))
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.with_context(|ctx| ctx.clipboard_text()).ok().flatten()
    }

    pub fn set_clipboard_text(&self, text: &str) {
        if let Err(error) = self.with_context(|ctx| ctx.set_clipboard_text(text)) {
            tracing::warn!(unit = UNIT, id = %self.id(), %error, "Clipboard write dropped");
        }
    }

    pub fn items(&self) -> Vec<Rc<GuiItem>> {
        self.items.borrow().iter().cloned().collect()
    }

    pub fn fonts(&self) -> Vec<Rc<GuiFont>> {
        self.fonts.borrow().iter().cloned().collect()
    }

    pub fn item_factory(&self) -> std::cell::Ref<'_, Factory<GuiItem>> {
        self.items.borrow()
    }

    pub fn font_factory(&self) -> std::cell::Ref<'_, Factory<GuiFont, UniqueKeyed>> {
        self.fonts.borrow()
    }

    pub fn last_drawn(&self) -> Option<FrameTick> {
        self.last_drawn.get()
    }

    /// Time since the previous frame, measured by the system's own clock.
    fn elapsed(&self) -> Duration {
        let now = Instant::now();
        let elapsed = self
            .last_frame
            .get()
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_frame.set(Some(now));
        elapsed
    }

    /// Build and submit one frame.
    ///
    /// A second draw within the same tick is ignored. Fails with `Detached`
    /// when the window or renderer no longer exists.
    pub fn draw(&self, tick: FrameTick, dt: Duration) -> Result<(), RuntimeError> {
        if self.last_drawn.get() == Some(tick) {
            tracing::warn!(unit = UNIT, id = %self.id(), tick = tick.0, "Already drawn this tick");
            return Ok(());
        }
        if !self.renderer.is_alive() {
            return Err(RuntimeError::Detached("renderer"));
        }
        let size = self
            .window
            .with(|window| window.size())
            .ok_or(RuntimeError::Detached("window"))?;

        let items = self.items();
        let stats_window = self.settings.stats_window;

        let mut context = self
            .context
            .try_borrow_mut()
            .map_err(|_| RuntimeError::Detached("context"))?;
        let ctx = context.as_mut().ok_or(RuntimeError::Detached("context"))?;

        let io = ctx.io_mut();
        io.display_size = [size.width as f32, size.height as f32];
        io.advance(dt);

        let mut frame = ctx.new_frame();
        if stats_window {
            let framerate = frame.io().framerate;
            let ms = if framerate > 0.0 { 1000.0 / framerate } else { 0.0 };
            frame.window("Hello, world!", |ui| {
                ui.text(format!(
                    "Application average {ms:.3} ms/frame ({framerate:.1} FPS)"
                ));
            });
        }
        for item in &items {
            item.declare(&mut frame);
        }
        let draw_data = frame.render();

        self.renderer
            .with(|renderer| renderer.submit(draw_data))
            .ok_or(RuntimeError::Detached("renderer"))?;
        let cursor = ctx.mouse_cursor();
        drop(context);

        self.apply_cursor(cursor);
        self.last_drawn.set(Some(tick));
        tracing::trace!(unit = UNIT, id = %self.id(), tick = tick.0, items = items.len(), "Frame submitted");
        Ok(())
    }

    /// Forward the requested pointer shape to the window when it changes.
    fn apply_cursor(&self, cursor: Option<MouseCursor>) {
        if self.applied_cursor.get() == Some(cursor) {
            return;
        }
        let applied = match cursor {
            None => self.window.with(|window| window.set_cursor(None)),
            Some(role) => match self.cursors.handle(role) {
                Some(handle) => self.window.with(|window| window.set_cursor(Some(handle))),
                // Nothing bound at all, leave the platform pointer alone
                None => Some(()),
            },
        };
        if applied.is_some() {
            self.applied_cursor.set(Some(cursor));
        }
    }
}

impl Unit for GuiSystem {
    fn kind(&self) -> UnitKind {
        GUI_SYSTEM
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

    fn act(self: Rc<Self>, verb: &mut Verb) {
        match verb.kind() {
            VerbKind::Create => {
                self.items.borrow_mut().create(&self, verb);
                self.fonts.borrow_mut().create(&self, verb);
            }
            VerbKind::Destroy => {
                self.items.borrow_mut().destroy(verb);
                self.fonts.borrow_mut().destroy(verb);
            }
            VerbKind::Draw => {
                let dt = self.elapsed();
                match self.draw(verb.tick(), dt) {
                    Ok(()) => verb.done(),
                    Err(error) => verb.fail(error),
                }
            }
        }
    }

    fn refresh(&self) {
        for item in self.items() {
            item.refresh();
        }
    }
}

impl Produced for GuiSystem {
    type Producer = GuiModule;
    const KIND: UnitKind = GUI_SYSTEM;
    const CAPABILITIES: &'static [CapabilityKind] = &[CapabilityKind::UiSystem];

    fn construct(cx: &Production<'_, GuiModule>) -> Result<Self, RuntimeError> {
        tracing::debug!(unit = UNIT, "Initializing...");

        let window = cx.require::<dyn Window>(UNIT)?;
        let renderer = cx.require::<dyn Renderer>(UNIT)?;

        let settings = cx
            .producer()
            .settings()
            .apply(cx.descriptor())
            .map_err(|error| RuntimeError::construct(UNIT, error.to_string()))?;

        let mut context = Context::new(Style::new(settings.style));
        let io = context.io_mut();
        io.backend_platform_name = Some(BACKEND_NAME.to_string());
        io.backend_renderer_name = Some(BACKEND_NAME.to_string());
        io.backend_flags = BackendFlags::HAS_MOUSE_CURSORS
            | BackendFlags::HAS_SET_MOUSE_POS
            | BackendFlags::RENDERER_HAS_VTX_OFFSET;

        context.set_clipboard_backend(WindowClipboard::new(window.clone()));
        context.main_viewport_mut().platform_handle = window
            .with(|window| window.native_handle())
            .ok_or(RuntimeError::Detached("window"))?;

        let cursors = CursorBindings::resolve(cx, &settings.cursors);

        Ok(Self {
            core: UnitCore::new(cx.descriptor()),
            module: Rc::downgrade(cx.producer()),
            settings,
            context: RefCell::new(Some(context)),
            window,
            renderer,
            cursors,
            items: RefCell::new(Factory::new()),
            fonts: RefCell::new(Factory::new()),
            last_drawn: Cell::new(None),
            last_frame: Cell::new(None),
            applied_cursor: Cell::new(None),
        })
    }

    fn initialize(self: &Rc<Self>, cx: &Production<'_, GuiModule>) -> Result<(), RuntimeError> {
        let descriptor = self.settings.font.to_descriptor();
        if let Err(error) = self
            .fonts
            .borrow_mut()
            .produce(self, cx.owner(), &descriptor)
        {
            tracing::warn!(unit = UNIT, %error, "Default font unavailable");
        }

        tracing::debug!(
            unit = UNIT,
            id = %self.id(),
            cursors = self.cursors.bound_count(),
            fonts = self.fonts.borrow().len(),
            "Initialized"
        );
        Ok(())
    }
}

impl Drop for GuiSystem {
    fn drop(&mut self) {
        // Context first; fonts and items go with the fields afterwards
        if let Some(context) = self.context.get_mut().take() {
            drop(context);
            tracing::debug!(unit = UNIT, id = %self.core.id(), "Context released");
        }
    }
}
