//! Host-side embedding of the character improvement engine.
//!
//! This crate wires together a character, an improvement engine, and a
//! selection provider into a cohesive host API. Consumers embed [`Session`]
//! to grant and revoke catalog entries, query aggregate totals, and persist
//! characters.
//!
//! Modules are organized by responsibility:
//! - [`session`] hosts the engine embedding
//! - [`repository`] persists characters as JSON save files
//! - [`providers`] supplies non-interactive selection collaborators
//! - [`telemetry`] initializes tracing for hosts
pub mod providers;
pub mod repository;
pub mod session;
pub mod telemetry;

pub use providers::{DenyAllSelection, FirstOptionSelection, ScriptedSelection};
pub use repository::{CharacterRepository, FileCharacterRepository, RepositoryError};
pub use session::Session;
