//! The GUI module - produces GUI systems and draws them every tick.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use prism_api::{CapabilityKind, Descriptor, FrameTick, RuntimeError, Target, TraitTag};
use prism_kernel::{Factory, Module, ModuleLibrary, Unit, Verb, VerbKind};

use crate::settings::GuiSettings;
use crate::system::{GUI_SYSTEM, GuiSystem};

pub static LIBRARY: ModuleLibrary = ModuleLibrary {
    name: "ImGui",
    priority: 9,
    description: "GUI generator and simulator, using an immediate-mode context as backend",
    produces: &[
        Target::Unit(GUI_SYSTEM),
        Target::Capability(CapabilityKind::UiSystem),
    ],
    instantiate: GuiModule::instantiate,
};

pub struct GuiModule {
    /// Base settings; each system's descriptor may override parts.
    settings: GuiSettings,
    systems: RefCell<Factory<GuiSystem>>,
}

impl GuiModule {
    pub fn new(settings: GuiSettings) -> Self {
        Self {
            settings,
            systems: RefCell::new(Factory::new()),
        }
    }

    /// `Path` names a JSON settings file; the other traits override it.
    fn instantiate(descriptor: &Descriptor) -> Result<Rc<dyn Module>, RuntimeError> {
        let base = match descriptor.text(TraitTag::Path) {
            Some(path) => GuiSettings::load(path),
            None => Ok(GuiSettings::default()),
        };
        let settings = base
            .and_then(|settings| settings.apply(descriptor))
            .map_err(|error| RuntimeError::construct(LIBRARY.name, error.to_string()))?;
        tracing::debug!(module = LIBRARY.name, style = %settings.style, "Initializing...");
        Ok(Rc::new(Self::new(settings)))
    }

    pub fn settings(&self) -> &GuiSettings {
        &self.settings
    }

    /// Live systems in creation order.
    pub fn systems(&self) -> Vec<Rc<GuiSystem>> {
        self.systems.borrow().iter().cloned().collect()
    }
}

impl Module for GuiModule {
    fn library(&self) -> &'static ModuleLibrary {
        &LIBRARY
    }

    fn act(self: Rc<Self>, verb: &mut Verb) {
        match verb.kind() {
            VerbKind::Create => {
                self.systems.borrow_mut().create(&self, verb);
            }
            VerbKind::Destroy => {
                self.systems.borrow_mut().destroy(verb);
            }
            VerbKind::Draw => {}
        }
    }

    /// Draw every system once.
    fn update(&self, tick: FrameTick, dt: Duration) -> bool {
        let mut ok = true;
        for system in self.systems() {
            if let Err(error) = system.draw(tick, dt) {
                tracing::warn!(module = LIBRARY.name, system = %system.id(), %error, "Draw failed");
                ok = false;
            }
        }
        ok
    }
}
