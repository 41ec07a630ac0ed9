//! Deterministic character-improvement rules shared across hosts.
//!
//! `character-core` defines the canonical improvement engine (effect records,
//! aggregation, transactional bonus interpretation, lifecycle management) and
//! exposes pure synchronous APIs that can be reused by interactive hosts and
//! offline tools alike. All record mutation flows through
//! [`improvement::ImprovementEngine`], and supporting crates depend on the
//! types re-exported here.
pub mod character;
pub mod improvement;
pub mod selection;

pub use character::{
    AiProgram, Arena, Attribute, AttributeKind, AttributeSet, ChangeCounter, Character,
    CharacterFlags, CharacterId, ComplexForm, Contact, CritterPower, Cyberware, Gear, HasId,
    KnowledgeOrigin, KnowledgeSkill, MartialArt, MartialArtTechnique, MentorSpirit, Metamagic,
    Power, Quality, Skill, SkillSpecialization, SkillsSection, SpecialSkillFilter, Spell, Weapon,
};
pub use improvement::{
    ApplyError, BonusDirective, BonusNode, Improvement, ImprovementBuilder, ImprovementEngine,
    ImprovementKind, ImprovementSource, RecordParseError, ValueQuery,
};
pub use selection::{SelectionCancelled, SelectionOracle, SelectionResult};
