use std::cell::{Cell, RefCell};
use std::rc::Rc;

use prism_api::{CapabilityKind, CursorHandle, Descriptor, GpuHandle, RuntimeError, Target};
use prism_kernel::{Factory, Module, ModuleLibrary, UniqueKeyed, Verb, VerbKind};

use crate::display::{
    HEADLESS_CURSOR, HEADLESS_RENDERER, HEADLESS_WINDOW, HeadlessCursor, HeadlessRenderer,
    HeadlessWindow,
};
use crate::texture::{HEADLESS_IMAGE, HeadlessImage};

pub static LIBRARY: ModuleLibrary = ModuleLibrary {
    name: "Headless",
    priority: 1,
    description: "In-memory windows, renderers, cursors and images",
    produces: &[
        Target::Unit(HEADLESS_WINDOW),
        Target::Unit(HEADLESS_RENDERER),
        Target::Unit(HEADLESS_CURSOR),
        Target::Unit(HEADLESS_IMAGE),
        Target::Capability(CapabilityKind::Window),
        Target::Capability(CapabilityKind::Renderer),
        Target::Capability(CapabilityKind::Cursor),
        Target::Capability(CapabilityKind::Image),
    ],
    instantiate: HeadlessModule::instantiate,
};

/// Same platform without image support.
pub static DISPLAY_LIBRARY: ModuleLibrary = ModuleLibrary {
    name: "HeadlessDisplay",
    priority: 1,
    description: "In-memory windows, renderers and cursors",
    produces: &[
        Target::Unit(HEADLESS_WINDOW),
        Target::Unit(HEADLESS_RENDERER),
        Target::Unit(HEADLESS_CURSOR),
        Target::Capability(CapabilityKind::Window),
        Target::Capability(CapabilityKind::Renderer),
        Target::Capability(CapabilityKind::Cursor),
    ],
    instantiate: HeadlessModule::instantiate_display,
};

pub struct HeadlessModule {
    library: &'static ModuleLibrary,
    windows: RefCell<Factory<HeadlessWindow>>,
    renderers: RefCell<Factory<HeadlessRenderer>>,
    cursors: RefCell<Factory<HeadlessCursor>>,
    images: RefCell<Factory<HeadlessImage, UniqueKeyed>>,
    next_texture: Cell<u64>,
    next_cursor: Cell<u64>,
}

impl HeadlessModule {
    fn new(library: &'static ModuleLibrary) -> Self {
        Self {
            library,
            windows: RefCell::new(Factory::new()),
            renderers: RefCell::new(Factory::new()),
            cursors: RefCell::new(Factory::new()),
            images: RefCell::new(Factory::new()),
            next_texture: Cell::new(1),
            next_cursor: Cell::new(1),
        }
    }

    fn instantiate(_: &Descriptor) -> Result<Rc<dyn Module>, RuntimeError> {
        tracing::debug!(module = LIBRARY.name, "Initializing...");
        Ok(Rc::new(Self::new(&LIBRARY)))
    }

    fn instantiate_display(_: &Descriptor) -> Result<Rc<dyn Module>, RuntimeError> {
        tracing::debug!(module = DISPLAY_LIBRARY.name, "Initializing...");
        Ok(Rc::new(Self::new(&DISPLAY_LIBRARY)))
    }

    fn supports_images(&self) -> bool {
        self.library
            .can_produce(&Target::Capability(CapabilityKind::Image))
    }

    pub(crate) fn allocate_texture(&self) -> GpuHandle {
        let handle = self.next_texture.get();
        self.next_texture.set(handle + 1);
        GpuHandle(handle)
    }

    pub(crate) fn allocate_cursor(&self) -> CursorHandle {
        let handle = self.next_cursor.get();
        self.next_cursor.set(handle + 1);
        CursorHandle(handle)
    }

    pub fn windows(&self) -> Vec<Rc<HeadlessWindow>> {
        self.windows.borrow().iter().cloned().collect()
    }

    pub fn renderers(&self) -> Vec<Rc<HeadlessRenderer>> {
        self.renderers.borrow().iter().cloned().collect()
    }

    pub fn cursors(&self) -> Vec<Rc<HeadlessCursor>> {
        self.cursors.borrow().iter().cloned().collect()
    }

    pub fn images(&self) -> Vec<Rc<HeadlessImage>> {
        self.images.borrow().iter().cloned().collect()
    }
}

impl Module for HeadlessModule {
    fn library(&self) -> &'static ModuleLibrary {
        self.library
    }

    fn act(self: Rc<Self>, verb: &mut Verb) {
        match verb.kind() {
            VerbKind::Create => {
                self.windows.borrow_mut().create(&self, verb);
                self.renderers.borrow_mut().create(&self, verb);
                self.cursors.borrow_mut().create(&self, verb);
                if self.supports_images() {
                    self.images.borrow_mut().create(&self, verb);
                }
            }
            VerbKind::Destroy => {
                self.windows.borrow_mut().destroy(verb);
                self.renderers.borrow_mut().destroy(verb);
                self.cursors.borrow_mut().destroy(verb);
                if self.supports_images() {
                    self.images.borrow_mut().destroy(verb);
                }
            }
            VerbKind::Draw => {}
        }
    }
}
