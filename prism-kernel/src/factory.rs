//! Factories - ordered containers that produce, track and destroy units.
//!
//! One generic container serves both production modes; the mode is a policy
//! type parameter:
//!
//! - `Repeatable`: every request constructs and appends a new instance.
//! - `UniqueKeyed`: at most one instance per identity key. Repeating a request
//!   with an equal descriptor is a no-op; a changed descriptor reconfigures the
//!   existing instance in place and bumps its generation.
//!
//! A failing request never aborts the batch: it is recorded on the verb and
//! the remaining requests still run. Instances produced earlier in the same
//! verb stay alive.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use prism_api::{CapabilityKind, Descriptor, IdentityKey, RuntimeError, Target, UnitId, UnitKind};

use crate::capability::{Capability, CapabilityRef};
use crate::runtime::Runtime;
use crate::seek::{self, SeekScope};
use crate::thing::Thing;
use crate::unit::Unit;
use crate::verb::{Request, Verb};

/// Everything a constructor gets to look at.
pub struct Production<'a, P: ?Sized> {
    producer: &'a Rc<P>,
    owner: &'a Rc<Thing>,
    descriptor: &'a Descriptor,
}

impl<'a, P: ?Sized> Production<'a, P> {
    pub fn new(producer: &'a Rc<P>, owner: &'a Rc<Thing>, descriptor: &'a Descriptor) -> Self {
        Self {
            producer,
            owner,
            descriptor,
        }
    }

    pub fn producer(&self) -> &'a Rc<P> {
        self.producer
    }

    /// The thing the produced unit will live on.
    pub fn owner(&self) -> &'a Rc<Thing> {
        self.owner
    }

    pub fn descriptor(&self) -> &'a Descriptor {
        self.descriptor
    }

    pub fn runtime(&self) -> Result<Rc<Runtime>, RuntimeError> {
        self.owner.runtime().ok_or(RuntimeError::NoRuntime)
    }

    /// Optional collaborator, searched here and above.
    pub fn seek<C: Capability + ?Sized>(&self, tag: Option<&str>) -> Option<CapabilityRef<C>> {
        seek::seek::<C>(self.owner, self.descriptor, tag, SeekScope::HereAndAbove)
    }

    /// Mandatory collaborator; missing means `unit` cannot be constructed.
    pub fn require<C: Capability + ?Sized>(
        &self,
        unit: &'static str,
    ) -> Result<CapabilityRef<C>, RuntimeError> {
        seek::require::<C>(unit, self.owner, self.descriptor, None)
    }

    /// Have some other module produce a `C` and hand it back.
    ///
    /// Any failure along the way (nothing can produce it, the producer
    /// refused, the result is not a `C`) fails construction of `unit`.
    pub fn produce<C: Capability + ?Sized>(
        &self,
        unit: &'static str,
        request: Request,
    ) -> Result<Rc<dyn Unit>, RuntimeError> {
        let runtime = self.runtime()?;
        let mut verb = Verb::create().with(request).in_context(self.owner);
        runtime
            .run_in(self.owner, &mut verb)
            .map_err(|error| RuntimeError::construct(unit, error.to_string()))?;

        if let Some(found) = verb
            .outputs()
            .iter()
            .find(|output| C::project(output.as_ref()).is_some())
        {
            return Ok(found.clone());
        }

        let reason = match verb.failures().first() {
            Some(error) => error.to_string(),
            None => format!("no {} was produced", C::KIND),
        };
        Err(RuntimeError::construct(unit, reason))
    }
}

/// A unit type that a `Factory` can produce.
pub trait Produced: Unit + Sized {
    /// Whoever owns the factory producing this type.
    type Producer: ?Sized + 'static;

    const KIND: UnitKind;

    /// Capabilities that can be requested to get this type.
    const CAPABILITIES: &'static [CapabilityKind] = &[];

    fn construct(cx: &Production<'_, Self::Producer>) -> Result<Self, RuntimeError>;

    /// Second construction phase, once the instance sits in an `Rc`.
    /// Failing here still discards the instance.
    fn initialize(self: &Rc<Self>, cx: &Production<'_, Self::Producer>) -> Result<(), RuntimeError> {
        let _ = cx;
        Ok(())
    }

    /// Apply a changed descriptor to an existing instance.
    fn reconfigure(&self, cx: &Production<'_, Self::Producer>) -> Result<(), RuntimeError> {
        let _ = cx;
        Ok(())
    }
}

/// A produced type with an identity derived from its descriptor.
pub trait Keyed: Produced {
    /// `None` when the descriptor carries no identity; such requests are
    /// treated as repeatable.
    fn identity(descriptor: &Descriptor) -> Option<IdentityKey>;

    /// Canonical form of `descriptor`, with defaults filled in and spelling
    /// folded. Requests whose canonical forms are equal are the same request.
    fn normalize(descriptor: &Descriptor) -> Descriptor {
        descriptor.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionMode {
    Repeatable,
    UniqueKeyed,
}

pub trait ProductionPolicy<T: Produced> {
    const MODE: ProductionMode;

    fn key(descriptor: &Descriptor) -> Option<IdentityKey>;

    fn normalize(descriptor: &Descriptor) -> Descriptor {
        descriptor.clone()
    }
}

/// Every request appends.
#[derive(Debug)]
pub struct Repeatable;

/// One instance per identity key.
#[derive(Debug)]
pub struct UniqueKeyed;

impl<T: Produced> ProductionPolicy<T> for Repeatable {
    const MODE: ProductionMode = ProductionMode::Repeatable;

    fn key(_: &Descriptor) -> Option<IdentityKey> {
        None
    }
}

impl<T: Keyed> ProductionPolicy<T> for UniqueKeyed {
    const MODE: ProductionMode = ProductionMode::UniqueKeyed;

    fn key(descriptor: &Descriptor) -> Option<IdentityKey> {
        T::identity(descriptor)
    }

    fn normalize(descriptor: &Descriptor) -> Descriptor {
        T::normalize(descriptor)
    }
}

/// One produced instance.
pub struct FactoryEntry<T> {
    key: Option<IdentityKey>,
    instance: Rc<T>,
    generation: u32,
    /// Normalized form of the descriptor the instance was last set up from.
    descriptor: Descriptor,
    owner: Weak<Thing>,
}

impl<T> FactoryEntry<T> {
    pub fn key(&self) -> Option<&IdentityKey> {
        self.key.as_ref()
    }

    pub fn instance(&self) -> &Rc<T> {
        &self.instance
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

pub struct Factory<T: Produced, P = Repeatable> {
    entries: IndexMap<UnitId, FactoryEntry<T>>,
    keys: HashMap<IdentityKey, UnitId>,
    _policy: PhantomData<P>,
}

impl<T: Produced, P: ProductionPolicy<T>> Factory<T, P> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            keys: HashMap::new(),
            _policy: PhantomData,
        }
    }

    pub fn mode(&self) -> ProductionMode {
        P::MODE
    }

    /// Whether a Create/Destroy request aimed at `target` is for this factory.
    pub fn accepts(target: &Target) -> bool {
        match target {
            Target::Unit(kind) => *kind == T::KIND,
            Target::Capability(capability) => T::CAPABILITIES.contains(capability),
            Target::Instance(_) => false,
        }
    }

    /// Produce every pending request of `verb` aimed at `T`.
    ///
    /// Results go to the verb's outputs (and are returned for convenience);
    /// failures go to the verb's failures.
    pub fn create(&mut self, producer: &Rc<T::Producer>, verb: &mut Verb) -> Vec<Rc<T>> {
        let mut produced = Vec::new();
        let owner = verb.context().cloned();

        for index in verb.pending() {
            let request = verb.request(index);
            if !Self::accepts(&request.target) {
                continue;
            }
            let descriptor = request.descriptor.clone();
            let count = request.count;
            verb.mark_handled(index);

            let Some(owner) = owner.as_ref() else {
                verb.fail(RuntimeError::construct(T::KIND.name(), "verb has no context"));
                continue;
            };

            for _ in 0..count {
                match self.produce(producer, owner, &descriptor) {
                    Ok(instance) => {
                        verb.push_output(instance.clone());
                        verb.done();
                        produced.push(instance);
                    }
                    Err(error) => {
                        tracing::warn!(unit = T::KIND.name(), %error, "Construction failed");
                        verb.fail(error);
                    }
                }
            }
        }
        produced
    }

    /// Produce (or, when keyed, reuse/reconfigure) a single instance.
    pub fn produce(
        &mut self,
        producer: &Rc<T::Producer>,
        owner: &Rc<Thing>,
        descriptor: &Descriptor,
    ) -> Result<Rc<T>, RuntimeError> {
        let cx = Production::new(producer, owner, descriptor);
        let key = P::key(descriptor);
        let normalized = P::normalize(descriptor);

        if let Some(key) = key.as_ref() {
            if let Some(entry) = self.keys.get(key).and_then(|id| self.entries.get_mut(id)) {
                if entry.descriptor != normalized {
                    entry.instance.reconfigure(&cx)?;
                    entry.descriptor = normalized;
                    entry.generation += 1;
                    tracing::debug!(
                        unit = T::KIND.name(),
                        %key,
                        generation = entry.generation,
                        "Reconfigured"
                    );
                }
                return Ok(entry.instance.clone());
            }
        }

        let instance = Rc::new(T::construct(&cx)?);
        instance.initialize(&cx)?;

        let id = instance.id();
        let unit: Rc<dyn Unit> = instance.clone();
        owner.attach(&unit);
        if let Some(runtime) = owner.runtime() {
            runtime.register_unit(&unit);
        }

        if let Some(key) = key.as_ref() {
            self.keys.insert(key.clone(), id);
        }
        self.entries.insert(
            id,
            FactoryEntry {
                key,
                instance: instance.clone(),
                generation: 0,
                descriptor: normalized,
                owner: Rc::downgrade(owner),
            },
        );
        Ok(instance)
    }

    /// Remove every entry addressed by a pending request of `verb`.
    ///
    /// Instances are dropped before this returns unless someone else still
    /// holds a strong reference. Returns how many entries were removed.
    pub fn destroy(&mut self, verb: &mut Verb) -> usize {
        let mut removed = 0;

        for index in verb.pending() {
            let request = verb.request(index);
            let ids: Vec<UnitId> = match request.target {
                Target::Instance(id) if self.entries.contains_key(&id) => vec![id],
                Target::Instance(_) => continue,
                ref target if Self::accepts(target) => match P::key(&request.descriptor) {
                    Some(key) => self.keys.get(&key).copied().into_iter().collect(),
                    None => self
                        .entries
                        .values()
                        .filter(|entry| entry.descriptor == request.descriptor)
                        .map(|entry| entry.instance.id())
                        .collect(),
                },
                _ => continue,
            };
            verb.mark_handled(index);

            for id in ids {
                if self.remove(id) {
                    removed += 1;
                    verb.done();
                }
            }
        }
        removed
    }

    /// Remove one entry by unit id.
    pub fn remove(&mut self, id: UnitId) -> bool {
        let Some(entry) = self.entries.shift_remove(&id) else {
            return false;
        };
        if let Some(key) = entry.key.as_ref() {
            self.keys.remove(key);
        }
        if let Some(owner) = entry.owner.upgrade() {
            owner.detach(id);
        }
        tracing::debug!(unit = T::KIND.name(), %id, "Destroyed");
        true
    }

    pub fn get(&self, id: UnitId) -> Option<&Rc<T>> {
        self.entries.get(&id).map(|entry| &entry.instance)
    }

    pub fn entry(&self, id: UnitId) -> Option<&FactoryEntry<T>> {
        self.entries.get(&id)
    }

    pub fn find(&self, key: &IdentityKey) -> Option<&Rc<T>> {
        self.get(*self.keys.get(key)?)
    }

    pub fn generation(&self, id: UnitId) -> Option<u32> {
        self.entries.get(&id).map(|entry| entry.generation)
    }

    /// Instances in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<T>> {
        self.entries.values().map(|entry| &entry.instance)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FactoryEntry<T>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destroy everything, in insertion order.
    pub fn clear(&mut self) {
        let ids: Vec<UnitId> = self.entries.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
    }
}

impl<T: Produced, P: ProductionPolicy<T>> Default for Factory<T, P> {
    fn default() -> Self {
        Self::new()
    }
}
