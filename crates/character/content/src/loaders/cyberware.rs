//! Cyberware catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::CyberwareDef;
use crate::loaders::{LoadResult, read_file};

/// Cyberware catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyberwareCatalog {
    pub cyberware: Vec<CyberwareDef>,
}

/// Loader for cyberware catalogs from RON files.
pub struct CyberwareLoader;

impl CyberwareLoader {
    /// Load a cyberware catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<CyberwareDef>> {
        Self::load_str(&read_file(path)?)
    }

    /// Load a cyberware catalog from RON text.
    pub fn load_str(content: &str) -> LoadResult<Vec<CyberwareDef>> {
        let catalog: CyberwareCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse cyberware catalog RON: {}", e))?;
        Ok(catalog.cyberware)
    }

    /// The starter catalog compiled into the crate.
    pub fn builtin() -> Vec<CyberwareDef> {
        Self::load_str(include_str!("../../data/cyberware.ron"))
            .expect("built-in cyberware catalog is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let cyberware = CyberwareLoader::builtin();
        let wired = cyberware
            .iter()
            .find(|item| item.name == "Wired Reflexes")
            .expect("starter catalog includes Wired Reflexes");
        let bonus = wired.bonus.as_ref().unwrap();
        // Competing initiative enhancements never stack.
        assert_eq!(bonus.attr("unique"), Some("precedence0"));
        assert!(bonus.find("initiativedice").is_some());
    }
}
