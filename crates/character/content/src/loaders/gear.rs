//! Gear catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::GearDef;
use crate::loaders::{LoadResult, read_file};

/// Gear catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearCatalog {
    pub gear: Vec<GearDef>,
}

/// Loader for gear catalogs from RON files.
pub struct GearLoader;

impl GearLoader {
    /// Load a gear catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<GearDef>> {
        Self::load_str(&read_file(path)?)
    }

    /// Load a gear catalog from RON text.
    pub fn load_str(content: &str) -> LoadResult<Vec<GearDef>> {
        let catalog: GearCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse gear catalog RON: {}", e))?;
        Ok(catalog.gear)
    }

    /// The starter catalog compiled into the crate.
    pub fn builtin() -> Vec<GearDef> {
        Self::load_str(include_str!("../../data/gear.ron"))
            .expect("built-in gear catalog is valid")
    }
}
