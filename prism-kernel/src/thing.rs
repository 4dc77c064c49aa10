//! Things - entity tree nodes that units attach to.
//!
//! A thing does not own its units; factories do. It only keeps weak
//! references so that capability seeking can scan "what lives here".

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use prism_api::{Descriptor, FrameTick, RuntimeError, TraitTag, TraitValue, UnitId};

use crate::runtime::{Module, Runtime};
use crate::unit::Unit;
use crate::verb::{Request, Verb, VerbKind};

pub struct Thing {
    traits: RefCell<Descriptor>,
    parent: Weak<Thing>,
    children: RefCell<Vec<Rc<Thing>>>,
    units: RefCell<Vec<Weak<dyn Unit>>>,
    runtime: RefCell<Option<Rc<Runtime>>>,
}

impl Thing {
    /// Create a parentless thing.
    pub fn root() -> Rc<Self> {
        Rc::new(Self::with_parent(Weak::new()))
    }

    fn with_parent(parent: Weak<Thing>) -> Self {
        Self {
            traits: RefCell::new(Descriptor::new()),
            parent,
            children: RefCell::new(Vec::new()),
            units: RefCell::new(Vec::new()),
            runtime: RefCell::new(None),
        }
    }

    /// Create a child of this thing.
    pub fn spawn_child(self: &Rc<Self>) -> Rc<Thing> {
        let child = Rc::new(Self::with_parent(Rc::downgrade(self)));
        self.children.borrow_mut().push(child.clone());
        child
    }

    /// Remove a child (and with it the whole subtree).
    pub fn remove_child(&self, child: &Rc<Thing>) -> bool {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|existing| !Rc::ptr_eq(existing, child));
        children.len() != before
    }

    pub fn add_trait(&self, tag: TraitTag, value: impl Into<TraitValue>) {
        let mut traits = self.traits.borrow_mut();
        let updated = std::mem::take(&mut *traits).with(tag, value);
        *traits = updated;
    }

    pub fn traits(&self) -> Descriptor {
        self.traits.borrow().clone()
    }

    pub fn name(&self) -> Option<String> {
        self.traits.borrow().text(TraitTag::Name).map(str::to_string)
    }

    pub fn parent(&self) -> Option<Rc<Thing>> {
        self.parent.upgrade()
    }

    pub fn children(&self) -> Vec<Rc<Thing>> {
        self.children.borrow().clone()
    }

    /// Install a runtime at this thing. Descendants reach it via `runtime()`.
    pub fn create_runtime(&self) -> Rc<Runtime> {
        let runtime = Rc::new(Runtime::new());
        *self.runtime.borrow_mut() = Some(runtime.clone());
        runtime
    }

    /// The nearest runtime, searching this thing and then its ancestors.
    pub fn runtime(&self) -> Option<Rc<Runtime>> {
        if let Some(runtime) = self.runtime.borrow().as_ref() {
            return Some(runtime.clone());
        }
        self.parent()?.runtime()
    }

    /// Register a unit as living on this thing.
    pub fn attach(&self, unit: &Rc<dyn Unit>) {
        let mut units = self.units.borrow_mut();
        units.retain(|existing| existing.strong_count() > 0);
        let id = unit.id();
        if !units
            .iter()
            .filter_map(Weak::upgrade)
            .any(|existing| existing.id() == id)
        {
            units.push(Rc::downgrade(unit));
        }
    }

    pub fn detach(&self, id: UnitId) {
        self.units.borrow_mut().retain(|existing| match existing.upgrade() {
            Some(unit) => unit.id() != id,
            None => false,
        });
    }

    /// Live units in attachment order.
    pub fn units(&self) -> Vec<Rc<dyn Unit>> {
        self.units.borrow().iter().filter_map(Weak::upgrade).collect()
    }

    /// Load a registered module library into the reachable runtime.
    pub fn load_module(
        &self,
        name: &str,
        descriptor: &Descriptor,
    ) -> Result<Rc<dyn Module>, RuntimeError> {
        let runtime = self.runtime().ok_or(RuntimeError::NoRuntime)?;
        runtime.load(name, descriptor)
    }

    /// Execute a verb in the scope of this thing.
    ///
    /// Units living here get the first chance to claim requests; Create and
    /// Destroy requests still pending afterwards go to the runtime's modules.
    pub fn run(self: &Rc<Self>, verb: &mut Verb) -> Result<(), RuntimeError> {
        if verb.context().is_none() {
            verb.set_context(self);
        }

        for unit in self.units() {
            unit.act(verb);
        }

        match verb.kind() {
            VerbKind::Create | VerbKind::Destroy if verb.has_pending() => {
                let runtime = self.runtime().ok_or(RuntimeError::NoRuntime)?;
                runtime.run_in(self, verb)
            }
            _ => Ok(()),
        }
    }

    /// Produce units from a single request and return them.
    pub fn create_unit(self: &Rc<Self>, request: Request) -> Result<Vec<Rc<dyn Unit>>, RuntimeError> {
        let target = request.target;
        let mut verb = Verb::create().with(request).in_context(self);
        self.run(&mut verb)?;

        if verb.outputs().is_empty() {
            return Err(verb
                .failures()
                .first()
                .cloned()
                .unwrap_or(RuntimeError::Unhandled(target)));
        }
        Ok(verb.take_outputs())
    }

    /// Advance the reachable runtime by one frame.
    pub fn update(&self, dt: std::time::Duration) -> Result<FrameTick, RuntimeError> {
        let runtime = self.runtime().ok_or(RuntimeError::NoRuntime)?;
        Ok(runtime.update(dt))
    }

    /// Log the subtree rooted here.
    pub fn dump_hierarchy(&self) {
        self.dump_level(0);
    }

    fn dump_level(&self, depth: usize) {
        let indent = "  ".repeat(depth);
        let name = self.name().unwrap_or_else(|| "<unnamed>".to_string());
        tracing::info!("{}{}", indent, name);
        for unit in self.units() {
            tracing::info!(
                "{}  - {} {} {}",
                indent,
                unit.kind(),
                unit.id(),
                unit.name().unwrap_or("")
            );
        }
        for child in self.children() {
            child.dump_level(depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_is_found_through_ancestors() {
        let root = Thing::root();
        let runtime = root.create_runtime();
        let grandchild = root.spawn_child().spawn_child();

        let found = grandchild.runtime().expect("runtime should be reachable");
        assert!(Rc::ptr_eq(&found, &runtime));
    }

    #[test]
    fn test_no_runtime_without_install() {
        let root = Thing::root();
        let child = root.spawn_child();
        assert!(child.runtime().is_none());
        assert_eq!(
            child.update(std::time::Duration::ZERO),
            Err(RuntimeError::NoRuntime)
        );
    }

    #[test]
    fn test_traits_and_children() {
        let root = Thing::root();
        root.add_trait(TraitTag::Name, "ROOT");
        assert_eq!(root.name().as_deref(), Some("ROOT"));

        let child = root.spawn_child();
        assert!(Rc::ptr_eq(&child.parent().unwrap(), &root));
        assert_eq!(root.children().len(), 1);

        assert!(root.remove_child(&child));
        assert!(root.children().is_empty());
    }
}
