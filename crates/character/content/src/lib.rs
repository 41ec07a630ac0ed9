//! Data-driven content definitions and loaders.
//!
//! This crate houses the catalog entry types (qualities, gear, cyberware)
//! and loaders that read them from RON data files. Each entry may embed a
//! declarative bonus tree that the improvement engine interprets when the
//! entry is added to a character.
//!
//! Content is consumed by hosts and never appears in character state; only
//! the improvement records created from it do.

pub mod catalog;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use catalog::{CyberwareDef, GearDef, QualityDef};

#[cfg(feature = "loaders")]
pub use loaders::{CyberwareLoader, GearLoader, QualityLoader};
