//! Runtime - module registry and cross-module verb dispatch.
//!
//! Modules never link against each other. A module library advertises which
//! unit kinds and capabilities it can produce; `run_in` routes each request of
//! a verb to the first loaded module advertising its target and calls it
//! directly, synchronously, on the caller's thread.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use prism_api::{Descriptor, FrameTick, RuntimeError, Target, UnitId};

use crate::thing::Thing;
use crate::unit::Unit;
use crate::verb::Verb;

/// Constructor of a module instance.
pub type Instantiate = fn(&Descriptor) -> Result<Rc<dyn Module>, RuntimeError>;

/// Static description of a loadable module.
#[derive(Clone, Copy)]
pub struct ModuleLibrary {
    pub name: &'static str,
    /// Higher priority modules are updated first and win dispatch ties.
    pub priority: i32,
    pub description: &'static str,
    /// Targets this module can satisfy.
    pub produces: &'static [Target],
    pub instantiate: Instantiate,
}

impl ModuleLibrary {
    pub fn can_produce(&self, target: &Target) -> bool {
        self.produces.contains(target)
    }
}

impl std::fmt::Debug for ModuleLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLibrary")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("produces", &self.produces)
            .finish()
    }
}

/// A loaded module instance.
pub trait Module {
    fn library(&self) -> &'static ModuleLibrary;

    /// Handle a Create or Destroy verb routed here.
    fn act(self: Rc<Self>, verb: &mut Verb);

    /// Per-tick update. Returning `false` reports a problem but keeps running.
    fn update(&self, tick: FrameTick, dt: Duration) -> bool {
        let _ = (tick, dt);
        true
    }

    fn name(&self) -> &'static str {
        self.library().name
    }
}

pub struct Runtime {
    libraries: RefCell<IndexMap<&'static str, &'static ModuleLibrary>>,
    modules: RefCell<Vec<Rc<dyn Module>>>,
    units: RefCell<HashMap<UnitId, Weak<dyn Unit>>>,
    tick: Cell<FrameTick>,
}

impl Runtime {
    pub(crate) fn new() -> Self {
        Self {
            libraries: RefCell::new(IndexMap::new()),
            modules: RefCell::new(Vec::new()),
            units: RefCell::new(HashMap::new()),
            tick: Cell::new(FrameTick::default()),
        }
    }

    /// Make a module library loadable by name.
    pub fn register(&self, library: &'static ModuleLibrary) {
        self.libraries.borrow_mut().insert(library.name, library);
    }

    /// Load a module by library name. Loading twice returns the same instance.
    pub fn load(&self, name: &str, descriptor: &Descriptor) -> Result<Rc<dyn Module>, RuntimeError> {
        if let Some(module) = self.module(name) {
            return Ok(module);
        }

        let library = self
            .libraries
            .borrow()
            .values()
            .find(|library| library.name.eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| RuntimeError::UnknownModule(name.to_string()))?;

        tracing::debug!(module = library.name, "Loading module...");
        let module = (library.instantiate)(descriptor)?;

        let mut modules = self.modules.borrow_mut();
        let position = modules
            .iter()
            .position(|loaded| loaded.library().priority < library.priority)
            .unwrap_or(modules.len());
        modules.insert(position, module.clone());
        tracing::debug!(module = library.name, priority = library.priority, "Module loaded");
        Ok(module)
    }

    /// A loaded module by name.
    pub fn module(&self, name: &str) -> Option<Rc<dyn Module>> {
        self.modules
            .borrow()
            .iter()
            .find(|module| module.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Loaded modules, highest priority first.
    pub fn modules(&self) -> Vec<Rc<dyn Module>> {
        self.modules.borrow().clone()
    }

    /// Remember a produced unit so hints can refer to it by id.
    pub fn register_unit(&self, unit: &Rc<dyn Unit>) {
        let mut units = self.units.borrow_mut();
        units.retain(|_, existing| existing.strong_count() > 0);
        units.insert(unit.id(), Rc::downgrade(unit));
    }

    pub fn resolve(&self, id: UnitId) -> Option<Rc<dyn Unit>> {
        self.units.borrow().get(&id)?.upgrade()
    }

    pub fn tick(&self) -> FrameTick {
        self.tick.get()
    }

    /// Advance one frame and update every module.
    pub fn update(&self, dt: Duration) -> FrameTick {
        let tick = self.tick.get().next();
        self.tick.set(tick);

        for module in self.modules() {
            if !module.update(tick, dt) {
                tracing::warn!(module = module.name(), tick = tick.0, "Module update reported failure");
            }
        }
        tick
    }

    fn module_for(&self, target: Target) -> Option<Rc<dyn Module>> {
        let target = match target {
            Target::Instance(id) => Target::Unit(self.resolve(id)?.kind()),
            other => other,
        };
        self.modules
            .borrow()
            .iter()
            .find(|module| module.library().can_produce(&target))
            .cloned()
    }

    /// Execute `verb` in whichever loaded modules can satisfy its requests.
    ///
    /// Returns when every routed module has finished. Requests no module
    /// advertises are marked with an `Unhandled` failure; if none of the
    /// requests could be routed at all, the first such failure is returned.
    pub fn run_in(&self, context: &Rc<Thing>, verb: &mut Verb) -> Result<(), RuntimeError> {
        if verb.context().is_none() {
            verb.set_context(context);
        }

        let mut handlers: Vec<Rc<dyn Module>> = Vec::new();
        let mut unhandled = None;

        for index in verb.pending() {
            let target = verb.request(index).target;
            match self.module_for(target) {
                Some(module) => {
                    if !handlers.iter().any(|known| known.name() == module.name()) {
                        handlers.push(module);
                    }
                }
                None => {
                    verb.mark_handled(index);
                    verb.fail(RuntimeError::Unhandled(target));
                    unhandled.get_or_insert(target);
                }
            }
        }

        let routed = !handlers.is_empty();
        for module in handlers {
            tracing::trace!(module = module.name(), "Dispatching verb");
            module.act(verb);
        }

        // Anything the chosen modules left alone
        for index in verb.pending() {
            let target = verb.request(index).target;
            verb.mark_handled(index);
            verb.fail(RuntimeError::Unhandled(target));
        }

        match unhandled {
            Some(target) if !routed => Err(RuntimeError::Unhandled(target)),
            _ => Ok(()),
        }
    }
}
