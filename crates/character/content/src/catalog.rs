//! Catalog entry types shared by all loaders.

use character_core::BonusNode;
use serde::{Deserialize, Serialize};

/// A purchasable quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityDef {
    pub name: String,
    #[serde(default)]
    pub karma: i32,
    #[serde(default = "default_positive")]
    pub positive: bool,
    /// Declarative bonus applied when the quality is taken.
    #[serde(default)]
    pub bonus: Option<BonusNode>,
}

fn default_positive() -> bool {
    true
}

/// A purchasable piece of gear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearDef {
    pub name: String,
    #[serde(default)]
    pub cost: i64,
    /// Highest rating the item is sold at; 0 means unrated.
    #[serde(default)]
    pub max_rating: i32,
    #[serde(default)]
    pub bonus: Option<BonusNode>,
}

/// A purchasable piece of cyberware or bioware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyberwareDef {
    pub name: String,
    #[serde(default)]
    pub cost: i64,
    #[serde(default = "default_grade")]
    pub grade: String,
    #[serde(default)]
    pub max_rating: i32,
    #[serde(default)]
    pub bonus: Option<BonusNode>,
}

fn default_grade() -> String {
    "Standard".to_string()
}
