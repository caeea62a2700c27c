//! Boundary error taxonomy
//!
//! Four failure classes cross the binding layer:
//! - `InitError`: the foreign runtime could not be bound at process start
//! - `ForeignError`: a foreign call returned its error sentinel
//! - `MarshalError`: a value could not cross the representation boundary
//! - `RangeError`: native pre-validation rejected an argument before the call
//!
//! All boundary errors surface immediately to the direct caller. Swallowing
//! one here can leave the foreign runtime's pending error state inconsistently
//! set or cleared.

use crate::abi::layout::LayoutMismatch;
use crate::loader::LoadError;
use thiserror::Error;

/// Initialization failure. Fatal: the process cannot bind the foreign runtime.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InitError {
    /// The capsule pointer handed to the binding layer was null
    #[error("capsule pointer is null")]
    NullCapsule,

    /// The capsule reports an ABI version this layer was not built against
    #[error("unsupported capsule ABI version: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// A required entry-point slot in the capsule is null
    #[error("capsule entry point '{0}' is null")]
    NullEntryPoint(&'static str),

    /// Native struct layout disagrees with the published ABI layout
    #[error(transparent)]
    Layout(#[from] LayoutMismatch),

    /// The process-wide entry-point table was already installed
    #[error("entry-point table is already installed")]
    AlreadyInitialized,

    /// The foreign runtime library could not be loaded or resolved
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A foreign call returned its error sentinel.
///
/// Carries no payload: the authoritative error detail lives in the foreign
/// runtime's own pending error state, queried through the entry-point table.
/// This layer never fabricates a message on the runtime's behalf.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("foreign call failed; an error is pending in the foreign runtime")]
pub struct ForeignError;

/// A value could not be converted between native and foreign representations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarshalError {
    /// The foreign object is not of the type the conversion requires
    #[error("type mismatch: expected a foreign {expected}")]
    TypeMismatch { expected: &'static str },

    /// Null pointer where an object was required
    #[error("null pointer")]
    NullPointer,

    /// Numeric value does not fit the target representation
    #[error("value {value} out of range for {target}")]
    OutOfRange { value: i128, target: &'static str },

    /// Wrong number of arguments passed to an exposed function
    #[error("expected {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },
}

/// Native pre-validation rejected an argument before the foreign call.
///
/// A pre-check only: the foreign constructor's own validation remains
/// authoritative, this error just saves the round trip.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field} {value} outside {min}..={max}")]
pub struct RangeError {
    pub field: &'static str,
    pub value: i64,
    pub min: i64,
    pub max: i64,
}

/// Umbrella error for boundary-crossing operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindError {
    #[error(transparent)]
    Foreign(#[from] ForeignError),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error(transparent)]
    Range(#[from] RangeError),
}
