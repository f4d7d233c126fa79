use thiserror::Error;

use crate::types::{RegistryError, RuntimeError, SemanticError};

/// Unified error type for hosts that build, compile and evaluate in one place.
///
/// Every library call returns its own narrower error; this one exists so they
/// can all be propagated with `?` from a single function.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
