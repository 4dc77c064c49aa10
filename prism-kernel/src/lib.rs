//! Prism kernel - the entity/unit runtime GUI and platform modules plug into.
//!
//! - `Thing`: tree node that units attach to
//! - `Unit`: a component, discovered by the capabilities it projects
//! - `Verb`: dynamically dispatched Create/Destroy/Draw intent
//! - `Runtime`: module registry and cross-module dispatch (`run_in`)
//! - `Factory`: ordered container producing units, repeatable or unique-keyed
//! - `seek`: locality-ordered capability lookup

pub mod capability;
pub mod factory;
pub mod runtime;
pub mod seek;
pub mod thing;
pub mod unit;
pub mod verb;

pub use capability::{Capability, CapabilityRef, Cursor, Image, Renderer, Window};
pub use factory::{
    Factory, FactoryEntry, Keyed, Produced, Production, ProductionMode, ProductionPolicy,
    Repeatable, UniqueKeyed,
};
pub use runtime::{Instantiate, Module, ModuleLibrary, Runtime};
pub use seek::{require, seek, SeekScope};
pub use thing::Thing;
pub use unit::{Unit, UnitCore};
pub use verb::{Request, Verb, VerbKind};

// Re-export the shared vocabulary so modules need a single import
pub use prism_api;
