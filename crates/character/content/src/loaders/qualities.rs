//! Quality catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::QualityDef;
use crate::loaders::{LoadResult, read_file};

/// Quality catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCatalog {
    pub qualities: Vec<QualityDef>,
}

/// Loader for quality catalogs from RON files.
pub struct QualityLoader;

impl QualityLoader {
    /// Load a quality catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<QualityDef>> {
        Self::load_str(&read_file(path)?)
    }

    /// Load a quality catalog from RON text.
    pub fn load_str(content: &str) -> LoadResult<Vec<QualityDef>> {
        let catalog: QualityCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse quality catalog RON: {}", e))?;
        Ok(catalog.qualities)
    }

    /// The starter catalog compiled into the crate.
    pub fn builtin() -> Vec<QualityDef> {
        Self::load_str(include_str!("../../data/qualities.ron"))
            .expect("built-in quality catalog is valid")
    }
}
