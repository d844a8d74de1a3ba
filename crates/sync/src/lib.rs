//! `forecast-sync`
//!
//! **Responsibility:** moving forecast model bundles between the backend and
//! the in-memory model store.
//!
//! This crate provides:
//! - The `ModelGateway` contract (list, load, save) and its HTTP and
//!   in-memory implementations
//! - Gateway configuration
//! - `ModelSession`, the application-context object that owns one store and
//!   serializes load/save against it

pub mod config;
pub mod gateway;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;
pub mod session;

pub use config::GatewayConfig;
pub use gateway::{GatewayError, ModelGateway, SaveReceipt, SaveTarget};
#[cfg(feature = "http")]
pub use http::HttpGateway;
pub use memory::InMemoryGateway;
pub use session::{ModelSession, SessionError};
