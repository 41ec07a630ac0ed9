//! Authoritative character state.
//!
//! This module owns the data structures that describe a character: the
//! ordered improvement collection, capability flags, attributes, skills, and
//! the arenas of dependent sub-objects that improvements can grant. Hosts
//! query this state but mutate improvement-adjacent parts exclusively through
//! [`crate::improvement::ImprovementEngine`].
mod arena;
mod assets;
mod attributes;
mod flags;
mod skills;

pub use arena::{Arena, HasId};
pub use assets::{
    AiProgram, ComplexForm, Contact, CritterPower, Cyberware, Gear, MartialArt,
    MartialArtTechnique, MentorSpirit, Metamagic, Power, Quality, Spell, Weapon,
};
pub use attributes::{Attribute, AttributeKind, AttributeSet};
pub use flags::CharacterFlags;
pub use skills::{
    KnowledgeOrigin, KnowledgeSkill, MAGICAL_ACTIVE, RESONANCE_ACTIVE, Skill, SkillSpecialization,
    SkillsSection, SpecialSkillFilter,
};

use crate::improvement::Improvement;

/// Identity of a character, used as the aggregation-cache owner key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacterId(pub u32);

/// Batched change-notification counters.
///
/// The lifecycle coordinator notifies once per batch, not once per record;
/// dependent caches (skill pools, attribute displays) refresh off these.
/// Not persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeCounter {
    /// One increment per committed improvement batch.
    pub batches: u64,
    /// Skill-pool displays need a refresh.
    pub skill_refreshes: u64,
    /// Attribute displays need a refresh.
    pub attribute_refreshes: u64,
}

/// The aggregate that owns improvements and everything they touch.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Character {
    pub id: CharacterId,
    pub name: String,

    /// Sequential internal-id allocator for granted sub-objects.
    next_internal_id: u32,

    /// Ordered collection of effect records. Mutated only by the engine.
    pub improvements: Vec<Improvement>,

    pub flags: CharacterFlags,
    pub trust_fund: i32,
    pub initiate_grade: i32,
    pub submersion_grade: i32,
    pub prototype_transhuman: i32,
    pub nuyen: i64,

    pub attributes: AttributeSet,
    pub skills: SkillsSection,

    pub qualities: Arena<Quality>,
    pub spells: Arena<Spell>,
    pub complex_forms: Arena<ComplexForm>,
    pub gear: Arena<Gear>,
    pub weapons: Arena<Weapon>,
    pub cyberware: Arena<Cyberware>,
    pub powers: Arena<Power>,
    pub martial_arts: Arena<MartialArt>,
    pub metamagics: Arena<Metamagic>,
    pub critter_powers: Arena<CritterPower>,
    pub mentor_spirits: Arena<MentorSpirit>,
    pub ai_programs: Arena<AiProgram>,
    pub contacts: Arena<Contact>,

    /// Pre-determined selection answers, popped before any prompt is shown.
    #[cfg_attr(feature = "serde", serde(default))]
    pub pending_selections: Vec<String>,

    #[cfg_attr(feature = "serde", serde(skip))]
    pub change_counter: ChangeCounter,
}

impl Character {
    pub fn new(id: CharacterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            next_internal_id: 1,
            improvements: Vec::new(),
            flags: CharacterFlags::empty(),
            trust_fund: 0,
            initiate_grade: 0,
            submersion_grade: 0,
            prototype_transhuman: 0,
            nuyen: 0,
            attributes: AttributeSet::default(),
            skills: SkillsSection::default(),
            qualities: Arena::new(),
            spells: Arena::new(),
            complex_forms: Arena::new(),
            gear: Arena::new(),
            weapons: Arena::new(),
            cyberware: Arena::new(),
            powers: Arena::new(),
            martial_arts: Arena::new(),
            metamagics: Arena::new(),
            critter_powers: Arena::new(),
            mentor_spirits: Arena::new(),
            ai_programs: Arena::new(),
            contacts: Arena::new(),
            pending_selections: Vec::new(),
            change_counter: ChangeCounter::default(),
        }
    }

    /// Allocates a fresh internal id for a granted sub-object.
    ///
    /// Ids are never reused, so a removed sub-object cannot be confused with
    /// a later grant.
    pub fn allocate_internal_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{}", self.next_internal_id);
        self.next_internal_id += 1;
        id
    }

    /// Whether the resonance special attribute is currently available.
    pub fn resonance_enabled(&self) -> bool {
        self.flags.contains(CharacterFlags::RES_ENABLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_ids_are_unique() {
        let mut character = Character::new(CharacterId(1), "Case");
        let a = character.allocate_internal_id("quality");
        let b = character.allocate_internal_id("quality");
        let c = character.allocate_internal_id("gear");
        assert_ne!(a, b);
        assert_eq!(a, "quality-1");
        assert_eq!(c, "gear-3");
    }
}
