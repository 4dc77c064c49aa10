//! Runtime error types.

use thiserror::Error;

use crate::Target;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A unit could not reach a valid state.
    #[error("{unit}: {reason}")]
    Construct { unit: &'static str, reason: String },

    /// No loaded module can satisfy an intent.
    #[error("no loaded module can produce {0}")]
    Unhandled(Target),

    #[error("module not registered: {0}")]
    UnknownModule(String),

    /// A weak collaborator reference no longer points anywhere.
    #[error("{0} is no longer available")]
    Detached(&'static str),

    #[error("no runtime reachable from this entity")]
    NoRuntime,
}

impl RuntimeError {
    pub fn construct(unit: &'static str, reason: impl Into<String>) -> Self {
        RuntimeError::Construct {
            unit,
            reason: reason.into(),
        }
    }

    pub fn is_construct(&self) -> bool {
        matches!(self, RuntimeError::Construct { .. })
    }
}
