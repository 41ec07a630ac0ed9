//! Selection providers for non-interactive hosts.

mod selection;

pub use selection::{DenyAllSelection, FirstOptionSelection, ScriptedSelection};
