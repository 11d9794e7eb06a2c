//! The record under construction and the only ways it changes.

pub mod tree;
pub mod value;

pub use tree::{NodeRef, StateTree};
pub use value::{Attempt, LeafShape, LeafValue, ScoringPair};

use crate::kernel::path::FieldPath;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("path must contain at least one key")]
    EmptyPath,

    #[error("shape mismatch at '{path}': expected {expected}, got {actual}")]
    ShapeMismatch {
        path: FieldPath,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("no field is bound at '{0}'")]
    Unbound(FieldPath),

    #[error("field at '{path}' does not accept {operation}")]
    Unsupported {
        path: FieldPath,
        operation: &'static str,
    },
}
