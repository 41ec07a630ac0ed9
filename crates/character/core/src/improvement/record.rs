//! The effect record: one discrete bonus grant.
//!
//! Records are value objects. Kind, source, and source name are fixed at
//! construction; only the enabled toggle, value-adjacent fields, and display
//! metadata change afterwards, and the enabled toggle changes exclusively
//! through the lifecycle coordinator so the aggregation cache stays honest.
//! A record belongs to exactly one character for its entire lifetime:
//! `created → (enabled ⇄ disabled)* → removed`, with no way back from
//! removed.

use super::kind::{ImprovementKind, ImprovementSource};

/// Failure to reconstruct a record from its saved field set.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordParseError {
    #[error("unknown improvement kind name: {0}")]
    UnknownKind(String),
    #[error("unknown improvement source name: {0}")]
    UnknownSource(String),
}

/// One discrete bonus grant affecting a derived value.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "SavedImprovement", try_from = "SavedImprovement")
)]
pub struct Improvement {
    kind: ImprovementKind,
    source: ImprovementSource,
    source_name: String,
    unique_name: String,
    add_to_rating: bool,
    enabled: bool,

    /// Scope: the specific target (skill name, attribute abbreviation,
    /// sub-object id). Empty for character-wide effects.
    pub improved_name: String,
    /// Net integer contribution.
    pub value: i32,
    pub rating: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub augmented: i32,
    pub augmented_maximum: i32,
    /// Child scope names exempted from a group-wide bonus.
    pub exclude: String,
    /// Free-text predicate; non-empty excludes the record from
    /// unconditional aggregation passes.
    pub condition: String,
    /// Secondary target, e.g. the skill whose linked attribute is swapped.
    pub target: String,
    /// Manually authored record, aggregated in the separate custom pass.
    pub custom: bool,
    pub custom_name: String,
    pub custom_id: String,
    pub custom_group: String,
    pub sort_order: i32,
    pub notes: String,
}

impl Improvement {
    /// Starts building a record. Kind, source, and source name are the
    /// immutable identity of the grant.
    pub fn builder(
        kind: ImprovementKind,
        source: ImprovementSource,
        source_name: impl Into<String>,
    ) -> ImprovementBuilder {
        ImprovementBuilder {
            improvement: Improvement {
                kind,
                source,
                source_name: source_name.into(),
                unique_name: String::new(),
                add_to_rating: false,
                enabled: true,
                improved_name: String::new(),
                value: 0,
                rating: 1,
                minimum: 0,
                maximum: 0,
                augmented: 0,
                augmented_maximum: 0,
                exclude: String::new(),
                condition: String::new(),
                target: String::new(),
                custom: false,
                custom_name: String::new(),
                custom_id: String::new(),
                custom_group: String::new(),
                sort_order: 0,
                notes: String::new(),
            },
        }
    }

    pub fn kind(&self) -> ImprovementKind {
        self.kind
    }

    pub fn source(&self) -> ImprovementSource {
        self.source
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Grouping tag; records sharing a non-empty tag for the same owner and
    /// kind contribute only per the resolver's uniqueness rules.
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn add_to_rating(&self) -> bool {
        self.add_to_rating
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Lifecycle-only toggle; callers must invalidate the cache for
    /// (owner, kind) whenever this flips.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether `other` is a different-source grant of the same capability:
    /// same grouping tag, scope, and kind.
    pub fn duplicates(&self, other: &Improvement) -> bool {
        self.unique_name == other.unique_name
            && self.improved_name == other.improved_name
            && self.kind == other.kind
    }
}

/// Fluent constructor for [`Improvement`].
#[derive(Clone, Debug)]
pub struct ImprovementBuilder {
    improvement: Improvement,
}

impl ImprovementBuilder {
    pub fn improved_name(mut self, value: impl Into<String>) -> Self {
        self.improvement.improved_name = value.into();
        self
    }

    pub fn unique(mut self, value: impl Into<String>) -> Self {
        self.improvement.unique_name = value.into();
        self
    }

    pub fn value(mut self, value: i32) -> Self {
        self.improvement.value = value;
        self
    }

    pub fn rating(mut self, value: i32) -> Self {
        self.improvement.rating = value;
        self
    }

    pub fn minimum(mut self, value: i32) -> Self {
        self.improvement.minimum = value;
        self
    }

    pub fn maximum(mut self, value: i32) -> Self {
        self.improvement.maximum = value;
        self
    }

    pub fn augmented(mut self, value: i32) -> Self {
        self.improvement.augmented = value;
        self
    }

    pub fn augmented_maximum(mut self, value: i32) -> Self {
        self.improvement.augmented_maximum = value;
        self
    }

    pub fn exclude(mut self, value: impl Into<String>) -> Self {
        self.improvement.exclude = value.into();
        self
    }

    pub fn condition(mut self, value: impl Into<String>) -> Self {
        self.improvement.condition = value.into();
        self
    }

    pub fn target(mut self, value: impl Into<String>) -> Self {
        self.improvement.target = value.into();
        self
    }

    pub fn add_to_rating(mut self, value: bool) -> Self {
        self.improvement.add_to_rating = value;
        self
    }

    pub fn custom(mut self, name: impl Into<String>) -> Self {
        self.improvement.custom = true;
        self.improvement.custom_name = name.into();
        self
    }

    pub fn custom_id(mut self, value: impl Into<String>) -> Self {
        self.improvement.custom_id = value.into();
        self
    }

    pub fn custom_group(mut self, value: impl Into<String>) -> Self {
        self.improvement.custom_group = value.into();
        self
    }

    pub fn enabled(mut self, value: bool) -> Self {
        self.improvement.enabled = value;
        self
    }

    pub fn sort_order(mut self, value: i32) -> Self {
        self.improvement.sort_order = value;
        self
    }

    pub fn notes(mut self, value: impl Into<String>) -> Self {
        self.improvement.notes = value.into();
        self
    }

    pub fn build(self) -> Improvement {
        self.improvement
    }
}

// ============================================================================
// Persistence (flat key-value field set)
// ============================================================================

/// Saved shape of an [`Improvement`]: a flat field set with symbolic names
/// for kind and source. Missing fields take defaults so older saves load.
#[cfg(feature = "serde")]
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct SavedImprovement {
    #[serde(default)]
    unique: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    improvedname: String,
    #[serde(default)]
    sourcename: String,
    #[serde(default)]
    min: i32,
    #[serde(default)]
    max: i32,
    #[serde(default)]
    aug: i32,
    #[serde(default)]
    augmax: i32,
    #[serde(default)]
    val: i32,
    #[serde(default = "default_rating")]
    rating: i32,
    #[serde(default)]
    exclude: String,
    #[serde(default)]
    condition: String,
    improvementtype: String,
    improvementsource: String,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    customname: String,
    #[serde(default)]
    customid: String,
    #[serde(default)]
    customgroup: String,
    #[serde(default)]
    addtorating: bool,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    order: i32,
    #[serde(default)]
    notes: String,
}

#[cfg(feature = "serde")]
fn default_rating() -> i32 {
    1
}

#[cfg(feature = "serde")]
fn default_enabled() -> bool {
    true
}

#[cfg(feature = "serde")]
impl From<Improvement> for SavedImprovement {
    fn from(improvement: Improvement) -> Self {
        SavedImprovement {
            unique: improvement.unique_name,
            target: improvement.target,
            improvedname: improvement.improved_name,
            sourcename: improvement.source_name,
            min: improvement.minimum,
            max: improvement.maximum,
            aug: improvement.augmented,
            augmax: improvement.augmented_maximum,
            val: improvement.value,
            rating: improvement.rating,
            exclude: improvement.exclude,
            condition: improvement.condition,
            improvementtype: improvement.kind.to_string(),
            improvementsource: improvement.source.to_string(),
            custom: improvement.custom,
            customname: improvement.custom_name,
            customid: improvement.custom_id,
            customgroup: improvement.custom_group,
            addtorating: improvement.add_to_rating,
            enabled: improvement.enabled,
            order: improvement.sort_order,
            notes: improvement.notes,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<SavedImprovement> for Improvement {
    type Error = RecordParseError;

    fn try_from(saved: SavedImprovement) -> Result<Self, Self::Error> {
        let kind = ImprovementKind::from_save_name(&saved.improvementtype)
            .map_err(|_| RecordParseError::UnknownKind(saved.improvementtype.clone()))?;
        let source = ImprovementSource::from_save_name(&saved.improvementsource)
            .map_err(|_| RecordParseError::UnknownSource(saved.improvementsource.clone()))?;

        let mut condition = saved.condition;
        let mut exclude = saved.exclude;
        // Legacy shim: limit-modifier predicates used to live in the exclude
        // field.
        if kind == ImprovementKind::LimitModifier && condition.is_empty() && !exclude.is_empty() {
            condition = std::mem::take(&mut exclude);
        }

        Ok(Improvement {
            kind,
            source,
            source_name: saved.sourcename,
            unique_name: saved.unique,
            add_to_rating: saved.addtorating,
            enabled: saved.enabled,
            improved_name: saved.improvedname,
            value: saved.val,
            rating: saved.rating,
            minimum: saved.min,
            maximum: saved.max,
            augmented: saved.aug,
            augmented_maximum: saved.augmax,
            exclude,
            condition,
            target: saved.target,
            custom: saved.custom,
            custom_name: saved.customname,
            custom_id: saved.customid,
            custom_group: saved.customgroup,
            sort_order: saved.order,
            notes: saved.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_ignores_source() {
        let a = Improvement::builder(
            ImprovementKind::Fame,
            ImprovementSource::Quality,
            "quality-1",
        )
        .unique("fame")
        .build();
        let b = Improvement::builder(ImprovementKind::Fame, ImprovementSource::Gear, "gear-9")
            .unique("fame")
            .build();
        let c = Improvement::builder(
            ImprovementKind::Erased,
            ImprovementSource::Quality,
            "quality-1",
        )
        .unique("fame")
        .build();

        assert!(a.duplicates(&b));
        assert!(!a.duplicates(&c));
    }

    #[cfg(feature = "serde")]
    mod serde_round_trip {
        use super::*;

        fn sample() -> Improvement {
            Improvement::builder(
                ImprovementKind::Skill,
                ImprovementSource::Cyberware,
                "cyberware-3",
            )
            .improved_name("Pistols")
            .unique("precedence0")
            .value(2)
            .rating(3)
            .minimum(-1)
            .maximum(4)
            .augmented(1)
            .augmented_maximum(2)
            .exclude("Clubs")
            .condition("while visible")
            .target("AGI")
            .add_to_rating(true)
            .sort_order(7)
            .notes("installed at chargen")
            .build()
        }

        #[test]
        fn round_trips_unchanged() {
            let original = sample();
            let json = serde_json::to_string(&original).unwrap();
            let loaded: Improvement = serde_json::from_str(&json).unwrap();
            assert_eq!(original, loaded);
        }

        #[test]
        fn serializes_symbolic_names() {
            let json = serde_json::to_string(&sample()).unwrap();
            assert!(json.contains("\"improvementtype\":\"Skill\""));
            assert!(json.contains("\"improvementsource\":\"Cyberware\""));
        }

        #[test]
        fn legacy_kind_and_source_names_migrate() {
            let json = r#"{
                "improvementtype": "MatrixInitiativePass",
                "improvementsource": "MartialArtAdvantage",
                "sourcename": "technique-2",
                "val": 1
            }"#;
            let loaded: Improvement = serde_json::from_str(json).unwrap();
            assert_eq!(loaded.kind(), ImprovementKind::MatrixInitiativeDice);
            assert_eq!(loaded.source(), ImprovementSource::MartialArtTechnique);
            assert_eq!(loaded.rating, 1);
            assert!(loaded.is_enabled());
        }

        #[test]
        fn limit_modifier_exclude_migrates_into_condition() {
            let json = r#"{
                "improvementtype": "LimitModifier",
                "improvementsource": "Quality",
                "improvedname": "Social",
                "exclude": "while intoxicated",
                "val": -1
            }"#;
            let loaded: Improvement = serde_json::from_str(json).unwrap();
            assert_eq!(loaded.condition, "while intoxicated");
            assert!(loaded.exclude.is_empty());
        }

        #[test]
        fn migration_requires_all_legacy_conditions() {
            // A limit modifier with an explicit condition keeps its exclude.
            let json = r#"{
                "improvementtype": "LimitModifier",
                "improvementsource": "Quality",
                "exclude": "Running",
                "condition": "in melee",
                "val": -1
            }"#;
            let loaded: Improvement = serde_json::from_str(json).unwrap();
            assert_eq!(loaded.exclude, "Running");
            assert_eq!(loaded.condition, "in melee");

            // Non-limit-modifier kinds never migrate.
            let json = r#"{
                "improvementtype": "SkillGroup",
                "improvementsource": "Quality",
                "exclude": "Pistols",
                "val": 1
            }"#;
            let loaded: Improvement = serde_json::from_str(json).unwrap();
            assert_eq!(loaded.exclude, "Pistols");
            assert!(loaded.condition.is_empty());
        }

        #[test]
        fn unknown_kind_is_an_error() {
            let json = r#"{
                "improvementtype": "NotAKind",
                "improvementsource": "Quality"
            }"#;
            assert!(serde_json::from_str::<Improvement>(json).is_err());
        }
    }
}
