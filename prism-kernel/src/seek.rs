//! Capability seeking - find a collaborator by what it can do.
//!
//! Search order is locality first: hints supplied in the descriptor, then the
//! requesting thing, then its ancestors outward to the root. The first match
//! wins; duplicates further away are never considered.

use std::collections::VecDeque;
use std::rc::Rc;

use prism_api::{Descriptor, RuntimeError};

use crate::capability::{Capability, CapabilityRef};
use crate::thing::Thing;
use crate::unit::Unit;

/// How far from the requesting thing a search may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekScope {
    /// Only the requesting thing.
    Here,
    /// The requesting thing, then each ancestor up to the root.
    #[default]
    HereAndAbove,
    /// `HereAndAbove`, then the other branches below each visited level,
    /// nearest level first.
    Everywhere,
}

fn matches<C: Capability + ?Sized>(unit: &Rc<dyn Unit>, tag: Option<&str>) -> Option<CapabilityRef<C>> {
    if let Some(tag) = tag {
        if unit.name() != Some(tag) {
            return None;
        }
    }
    CapabilityRef::new(unit)
}

fn scan<C: Capability + ?Sized>(thing: &Thing, tag: Option<&str>) -> Option<CapabilityRef<C>> {
    thing.units().iter().find_map(|unit| matches::<C>(unit, tag))
}

/// Breadth-first search of `root`'s subtree, skipping the branch at `skip`.
fn descend<C: Capability + ?Sized>(
    root: &Rc<Thing>,
    skip: Option<&Rc<Thing>>,
    tag: Option<&str>,
) -> Option<CapabilityRef<C>> {
    let mut queue: VecDeque<Rc<Thing>> = root
        .children()
        .into_iter()
        .filter(|child| skip.is_none_or(|skip| !Rc::ptr_eq(child, skip)))
        .collect();

    while let Some(thing) = queue.pop_front() {
        if let Some(found) = scan::<C>(&thing, tag) {
            return Some(found);
        }
        queue.extend(thing.children());
    }
    None
}

/// Find a unit implementing `C` near `from`.
///
/// `tag` narrows the search to units whose `Name` trait equals it, which is
/// how e.g. the "ibeam" cursor is told apart from the "arrow" cursor.
pub fn seek<C: Capability + ?Sized>(
    from: &Rc<Thing>,
    descriptor: &Descriptor,
    tag: Option<&str>,
    scope: SeekScope,
) -> Option<CapabilityRef<C>> {
    if let Some(runtime) = from.runtime() {
        for hint in descriptor.hints() {
            if let Some(found) = runtime
                .resolve(*hint)
                .and_then(|unit| matches::<C>(&unit, tag))
            {
                return Some(found);
            }
        }
    }

    if let Some(found) = scan::<C>(from, tag) {
        return Some(found);
    }
    if scope == SeekScope::Here {
        return None;
    }

    let mut level = from.parent();
    while let Some(thing) = level {
        if let Some(found) = scan::<C>(&thing, tag) {
            return Some(found);
        }
        level = thing.parent();
    }
    if scope == SeekScope::HereAndAbove {
        return None;
    }

    // Below: own subtree first, then each ancestor's other branches
    let mut skip: Option<Rc<Thing>> = None;
    let mut level = Some(from.clone());
    while let Some(thing) = level {
        if let Some(found) = descend::<C>(&thing, skip.as_ref(), tag) {
            return Some(found);
        }
        level = thing.parent();
        skip = Some(thing);
    }
    None
}

/// Like `seek` with the default scope, but a missing capability fails
/// construction of `unit`.
pub fn require<C: Capability + ?Sized>(
    unit: &'static str,
    from: &Rc<Thing>,
    descriptor: &Descriptor,
    tag: Option<&str>,
) -> Result<CapabilityRef<C>, RuntimeError> {
    seek::<C>(from, descriptor, tag, SeekScope::HereAndAbove).ok_or_else(|| {
        RuntimeError::construct(unit, format!("no {} available", C::KIND))
    })
}
