//! crosspost domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Application use cases / business logic
//! - `policy`: Per-platform content constraints and input sanitization

pub mod model;
pub mod policy;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;
