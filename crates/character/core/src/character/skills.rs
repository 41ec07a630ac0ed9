//! Active and knowledge skills owned by a character.

use strum::{AsRefStr, Display, EnumString};

use super::arena::{Arena, HasId};

/// Skill category granted by magic/resonance special-skill improvements.
pub const MAGICAL_ACTIVE: &str = "Magical Active";
/// Resonance counterpart of [`MAGICAL_ACTIVE`].
pub const RESONANCE_ACTIVE: &str = "Resonance Active";

/// A named specialization attached to an active skill.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillSpecialization {
    pub name: String,
}

/// One active skill.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skill {
    pub internal_id: String,
    pub name: String,
    pub category: String,
    pub rating: i32,
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub specializations: Vec<SkillSpecialization>,
}

impl Skill {
    pub fn new(
        internal_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        rating: i32,
    ) -> Self {
        Self {
            internal_id: internal_id.into(),
            name: name.into(),
            category: category.into(),
            rating,
            enabled: true,
            specializations: Vec::new(),
        }
    }
}

impl HasId for Skill {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// How a knowledge skill entered the character sheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KnowledgeOrigin {
    /// Learned normally.
    #[default]
    Learned,
    /// Bound from a knowsoft; exists only while skillsoft access is granted.
    Knowsoft,
}

/// One knowledge skill.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnowledgeSkill {
    pub internal_id: String,
    pub name: String,
    pub rating: i32,
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub origin: KnowledgeOrigin,
}

impl KnowledgeSkill {
    pub fn new(internal_id: impl Into<String>, name: impl Into<String>, rating: i32) -> Self {
        Self {
            internal_id: internal_id.into(),
            name: name.into(),
            rating,
            enabled: true,
            origin: KnowledgeOrigin::Learned,
        }
    }

    pub fn knowsoft(mut self) -> Self {
        self.origin = KnowledgeOrigin::Knowsoft;
        self
    }
}

impl HasId for KnowledgeSkill {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// Special-skill grant categories, stored in an improvement's scope name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum SpecialSkillFilter {
    Magician,
    Sorcery,
    Conjuring,
    Enchanting,
    Adept,
    Technomancer,
}

impl SpecialSkillFilter {
    /// The skill category this grant unlocks.
    pub fn category(self) -> &'static str {
        match self {
            SpecialSkillFilter::Magician
            | SpecialSkillFilter::Sorcery
            | SpecialSkillFilter::Conjuring
            | SpecialSkillFilter::Enchanting
            | SpecialSkillFilter::Adept => MAGICAL_ACTIVE,
            SpecialSkillFilter::Technomancer => RESONANCE_ACTIVE,
        }
    }
}

/// All skills owned by one character.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillsSection {
    pub skills: Arena<Skill>,
    pub knowledge: Arena<KnowledgeSkill>,
}

impl SkillsSection {
    /// Looks up an active skill by display name.
    pub fn active_by_name(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.name == name)
    }

    pub fn active_by_name_mut(&mut self, name: &str) -> Option<&mut Skill> {
        self.skills.iter_mut().find(|skill| skill.name == name)
    }

    /// Enables or disables every active skill in `category`.
    pub fn set_category_enabled(&mut self, category: &str, enabled: bool) {
        for skill in self.skills.iter_mut() {
            if skill.category == category {
                skill.enabled = enabled;
            }
        }
    }

    /// Drops every active skill in the filter's category.
    ///
    /// Snapshot-free removal via `retain`: safe against the
    /// mutate-while-indexing hazards of per-index deletion.
    pub fn remove_special_skills(&mut self, filter: SpecialSkillFilter) {
        let category = filter.category();
        self.skills.retain(|skill| skill.category != category);
    }

    /// Enables or disables every knowsoft-bound knowledge skill.
    pub fn set_knowsofts_enabled(&mut self, enabled: bool) {
        for skill in self.knowledge.iter_mut() {
            if skill.origin == KnowledgeOrigin::Knowsoft {
                skill.enabled = enabled;
            }
        }
    }

    /// Drops every knowsoft-bound knowledge skill.
    pub fn remove_knowsofts(&mut self) {
        self.knowledge
            .retain(|skill| skill.origin != KnowledgeOrigin::Knowsoft);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> SkillsSection {
        let mut section = SkillsSection::default();
        section
            .skills
            .push(Skill::new("skill-1", "Spellcasting", MAGICAL_ACTIVE, 4));
        section
            .skills
            .push(Skill::new("skill-2", "Pistols", "Combat Active", 3));
        section
            .knowledge
            .push(KnowledgeSkill::new("know-1", "Sprawl Life", 2));
        section
            .knowledge
            .push(KnowledgeSkill::new("know-2", "Engineering", 3).knowsoft());
        section
    }

    #[test]
    fn remove_special_skills_only_touches_category() {
        let mut section = section();
        section.remove_special_skills(SpecialSkillFilter::Sorcery);
        assert!(section.active_by_name("Spellcasting").is_none());
        assert!(section.active_by_name("Pistols").is_some());
    }

    #[test]
    fn knowsoft_toggles_leave_learned_skills_alone() {
        let mut section = section();
        section.set_knowsofts_enabled(false);
        assert!(section.knowledge.get("know-1").unwrap().enabled);
        assert!(!section.knowledge.get("know-2").unwrap().enabled);

        section.remove_knowsofts();
        assert!(section.knowledge.contains("know-1"));
        assert!(!section.knowledge.contains("know-2"));
    }
}
