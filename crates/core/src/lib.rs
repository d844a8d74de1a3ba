//! `forecast-core`: shared building blocks for the forecast model data layer.
//!
//! This crate contains **pure** primitives (no IO, no transport concerns).

pub mod error;
pub mod id;

pub use error::{ModelError, ModelResult};
pub use id::ModelId;
