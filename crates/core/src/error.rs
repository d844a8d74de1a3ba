//! Model error model.

use thiserror::Error;

/// Result type used across the model layer.
pub type ModelResult<T> = Result<T, ModelError>;

/// Model-level error.
///
/// Keep this focused on deterministic failures of the in-memory model.
/// Transport failures belong to the sync layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// An operation needs a loaded model but none is loaded.
    #[error("no model loaded")]
    NotReady,

    /// A positional product edit pointed outside the product list.
    #[error("product index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// An identifier was invalid (e.g. empty).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl ModelError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// `true` for errors that only mean "load a model first".
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady)
    }
}
