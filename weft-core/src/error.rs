//! Error types for the reactive core.
//!
//! Most misuse of the reactive API degrades to a warning and a no-op (see the
//! read-only handlers). The errors here cover requests the explicit accessor
//! model cannot express at all, such as a named property on a sequence.

use thiserror::Error;

use crate::value::{PropertyKey, Shape};

/// Errors produced by raw object and view operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactivityError {
    /// The key cannot address a slot on a target of this shape.
    #[error("key `{key}` is not valid for a {shape} target")]
    InvalidKey {
        /// The offending key, after normalization.
        key: PropertyKey,
        /// Shape of the target the key was used on.
        shape: Shape,
    },

    /// A sequence `length` was assigned something other than a non-negative integer.
    #[error("sequence length must be a non-negative integer, got {0}")]
    InvalidLength(String),

    /// The operation exists only for other target shapes.
    #[error("operation `{operation}` is not supported on {shape} targets")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Shape of the target.
        shape: Shape,
    },

    /// A composite value was required but a primitive was supplied.
    #[error("expected a composite value, got {0}")]
    NotComposite(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactivityError>;
