//! Verbs - dynamically dispatched intents.
//!
//! A verb carries a list of requests and collects what happened to them:
//! produced units, per-request failures, and which requests some handler
//! already claimed. Callers read results off the verb, never off a return
//! value of the handler.

use std::fmt;
use std::rc::Rc;

use prism_api::{CapabilityKind, Descriptor, FrameTick, RuntimeError, Target, UnitId, UnitKind};

use crate::thing::Thing;
use crate::unit::Unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbKind {
    Create,
    Destroy,
    Draw,
}

/// One "make (or remove) this" entry of a verb.
#[derive(Debug, Clone)]
pub struct Request {
    pub target: Target,
    pub descriptor: Descriptor,
    /// How many instances to produce.
    pub count: usize,
    handled: bool,
}

impl Request {
    pub fn new(target: Target, descriptor: Descriptor) -> Self {
        Self {
            target,
            descriptor,
            count: 1,
            handled: false,
        }
    }

    pub fn unit(kind: UnitKind, descriptor: Descriptor) -> Self {
        Self::new(Target::Unit(kind), descriptor)
    }

    pub fn capability(kind: CapabilityKind, descriptor: Descriptor) -> Self {
        Self::new(Target::Capability(kind), descriptor)
    }

    pub fn instance(id: UnitId) -> Self {
        Self::new(Target::Instance(id), Descriptor::new())
    }

    pub fn times(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }
}

pub struct Verb {
    kind: VerbKind,
    requests: Vec<Request>,
    context: Option<Rc<Thing>>,
    tick: FrameTick,
    outputs: Vec<Rc<dyn Unit>>,
    failures: Vec<RuntimeError>,
    done: bool,
}

impl Verb {
    fn new(kind: VerbKind) -> Self {
        Self {
            kind,
            requests: Vec::new(),
            context: None,
            tick: FrameTick::default(),
            outputs: Vec::new(),
            failures: Vec::new(),
            done: false,
        }
    }

    pub fn create() -> Self {
        Self::new(VerbKind::Create)
    }

    pub fn destroy() -> Self {
        Self::new(VerbKind::Destroy)
    }

    pub fn draw(tick: FrameTick) -> Self {
        let mut verb = Self::new(VerbKind::Draw);
        verb.tick = tick;
        verb
    }

    pub fn with(mut self, request: Request) -> Self {
        self.requests.push(request);
        self
    }

    /// Set the thing the verb executes on behalf of.
    pub fn in_context(mut self, thing: &Rc<Thing>) -> Self {
        self.context = Some(thing.clone());
        self
    }

    pub fn set_context(&mut self, thing: &Rc<Thing>) {
        self.context = Some(thing.clone());
    }

    pub fn kind(&self) -> VerbKind {
        self.kind
    }

    pub fn tick(&self) -> FrameTick {
        self.tick
    }

    pub fn context(&self) -> Option<&Rc<Thing>> {
        self.context.as_ref()
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Indices of requests nobody has claimed yet.
    pub fn pending(&self) -> Vec<usize> {
        self.requests
            .iter()
            .enumerate()
            .filter(|(_, request)| !request.handled)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.requests.iter().any(|request| !request.handled)
    }

    pub fn request(&self, index: usize) -> &Request {
        &self.requests[index]
    }

    pub fn mark_handled(&mut self, index: usize) {
        self.requests[index].handled = true;
    }

    pub fn push_output(&mut self, unit: Rc<dyn Unit>) {
        self.outputs.push(unit);
    }

    pub fn outputs(&self) -> &[Rc<dyn Unit>] {
        &self.outputs
    }

    pub fn take_outputs(&mut self) -> Vec<Rc<dyn Unit>> {
        std::mem::take(&mut self.outputs)
    }

    pub fn fail(&mut self, error: RuntimeError) {
        self.failures.push(error);
    }

    pub fn failures(&self) -> &[RuntimeError] {
        &self.failures
    }

    /// Mark the verb as having had an effect.
    pub fn done(&mut self) {
        self.done = true;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl fmt::Debug for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verb")
            .field("kind", &self.kind)
            .field("requests", &self.requests)
            .field("tick", &self.tick)
            .field("outputs", &self.outputs.len())
            .field("failures", &self.failures)
            .field("done", &self.done)
            .finish()
    }
}
