//! Error types for object operations

use crate::value::Value;
use membrane_types::Mutation;
use thiserror::Error;

/// Errors raised by object model operations and proxy traps
#[derive(Debug, Clone, Error)]
pub enum ObjectError {
    /// A write-family operation hit a read-only view
    #[error("Invalid mutation: cannot {mutation} on \"{target}\", \"{target}\" is read-only")]
    InvalidMutation { mutation: Mutation, target: String },

    /// A proxy trap reported something inconsistent with its target
    #[error("Proxy invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("{0} is not a constructor")]
    NotConstructor(String),

    #[error("Prototype chain depth exceeds {max}")]
    PrototypeChainTooDeep { max: usize },

    /// A value raised by user code (a native function or accessor)
    #[error("Uncaught {0}")]
    Thrown(Value),
}

impl ObjectError {
    pub fn invalid_mutation(mutation: Mutation, target: impl ToString) -> Self {
        ObjectError::InvalidMutation {
            mutation,
            target: target.to_string(),
        }
    }

    pub fn is_invalid_mutation(&self) -> bool {
        matches!(self, ObjectError::InvalidMutation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ObjectError>;
