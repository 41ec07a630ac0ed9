//! Declarative bonus descriptions and the directive registry.
//!
//! A bonus is authored in content as a small tagged tree. The interpreter
//! dispatches each child node through [`BonusDirective::from_tag`], a closed
//! compile-time registry: structured directives carry their own node schema,
//! and the long tail of plain `<tag>value</tag>` bonuses maps straight to an
//! effect kind. Unknown tags are not silently extensible: a tag outside
//! this registry with child content is a data-authoring defect.

use std::collections::BTreeMap;

use super::kind::ImprovementKind;

/// One node of a declarative bonus tree.
///
/// Mirrors a generic markup element: a tag, optional text content, optional
/// attributes, and child nodes. Comment nodes use the conventional `#comment`
/// tag and are always ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BonusNode {
    pub tag: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub text: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<BonusNode>,
}

impl BonusNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Builder: attach an attribute.
    pub fn attr_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Builder: attach a child node.
    pub fn child(mut self, node: BonusNode) -> Self {
        self.children.push(node);
        self
    }

    /// Builder: attach a text-only child.
    pub fn child_value(self, tag: impl Into<String>, text: impl Into<String>) -> Self {
        self.child(BonusNode::with_text(tag, text))
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// First child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&BonusNode> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Text content of the first child with the given tag.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.find(tag).map(|child| child.text.as_str())
    }

    pub fn is_comment(&self) -> bool {
        self.tag.starts_with('#')
    }
}

/// The closed registry of bonus directives.
///
/// Structured variants have dedicated handlers with their own node schemas;
/// [`BonusDirective::Simple`] covers every plain value bonus, whose handler
/// evaluates the node text as the record's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BonusDirective {
    /// Free-form text selection, resolved before any other directive.
    SelectText,
    /// Prompt for an attribute, then boost it.
    SelectAttribute,
    /// Boost one named attribute.
    SpecificAttribute,
    /// Grant levels in one named attribute.
    AttributeLevel,
    /// Replace an attribute's metatype limits.
    ReplaceAttribute,
    /// Unlock a special attribute (MAG/RES/DEP).
    EnableAttribute,
    /// Prompt for a skill, then boost its pool.
    SelectSkill,
    /// Boost one named skill's pool.
    SpecificSkill,
    /// Boost a skill group.
    SkillGroup,
    /// Boost every skill in a category.
    SkillCategory,
    /// Boost every skill linked to an attribute.
    SkillAttribute,
    /// Boost every skill whose linked attribute matches.
    SkillLinkedAttribute,
    /// Swap the attribute a skill's pool is built from.
    SwapSkillAttribute,
    /// Grant access to knowsoft-bound knowledge skills.
    SkillsoftAccess,
    /// Force a knowledge skill onto the sheet.
    ForcedKnowledgeSkill,
    /// Physical/stun track and threshold adjustments.
    ConditionMonitor,
    /// Conditional modifier to a named limit.
    LimitModifier,
    /// Unlock special tabs.
    EnableTab,
    /// Lock special tabs.
    DisableTab,
    /// Damage-value bonus for a weapon category.
    WeaponCategoryDv,
    /// Dice-pool bonus for a weapon category.
    WeaponCategoryDice,
    /// Accuracy bonus for a named weapon.
    WeaponAccuracy,
    /// Dice-pool bonus for a spell category.
    SpellCategory,
    /// Restrict spell selection to a category.
    LimitSpellCategory,
    /// Grant a specific quality for free.
    SpecificQuality,
    /// Grant an extra limb.
    AddLimb,
    /// Partial prototype-transhuman essence grant.
    PrototypeTranshuman,
    /// Grant a contact.
    AddContact,
    /// Grant free levels in an adept power.
    AdeptPowerFreeLevels,
    /// Plain value bonus: the node text evaluates to the record's value.
    Simple(ImprovementKind),
}

impl BonusDirective {
    /// Resolves a node tag against the registry.
    ///
    /// Returns `None` for unknown tags; the interpreter decides whether that
    /// is tolerable (childless node) or a hard error. The retired
    /// `initiativepass` spellings stay recognized because published content
    /// still uses them.
    pub fn from_tag(tag: &str) -> Option<Self> {
        use BonusDirective::*;

        let directive = match tag {
            "selecttext" => SelectText,
            "selectattribute" => SelectAttribute,
            "specificattribute" => SpecificAttribute,
            "attributelevel" => AttributeLevel,
            "replaceattribute" => ReplaceAttribute,
            "enableattribute" => EnableAttribute,
            "selectskill" => SelectSkill,
            "specificskill" => SpecificSkill,
            "skillgroup" => SkillGroup,
            "skillcategory" => SkillCategory,
            "skillattribute" => SkillAttribute,
            "skilllinkedattribute" => SkillLinkedAttribute,
            "swapskillattribute" => SwapSkillAttribute,
            "skillsoftaccess" => SkillsoftAccess,
            "forcedknowledgeskill" => ForcedKnowledgeSkill,
            "conditionmonitor" => ConditionMonitor,
            "limitmodifier" => LimitModifier,
            "enabletab" => EnableTab,
            "disabletab" => DisableTab,
            "weaponcategorydv" => WeaponCategoryDv,
            "weaponcategorydice" => WeaponCategoryDice,
            "weaponaccuracy" => WeaponAccuracy,
            "spellcategory" => SpellCategory,
            "limitspellcategory" => LimitSpellCategory,
            "specificquality" => SpecificQuality,
            "addlimb" => AddLimb,
            "prototypetranshuman" => PrototypeTranshuman,
            "addcontact" => AddContact,
            "adeptpowerfreelevels" => AdeptPowerFreeLevels,
            _ => Simple(simple_kind(tag)?),
        };
        Some(directive)
    }
}

/// Tag-to-kind table for plain value bonuses.
fn simple_kind(tag: &str) -> Option<ImprovementKind> {
    use ImprovementKind as Kind;

    let kind = match tag {
        "armor" => Kind::Armor,
        "firearmor" => Kind::FireArmor,
        "coldarmor" => Kind::ColdArmor,
        "electricityarmor" => Kind::ElectricityArmor,
        "acidarmor" => Kind::AcidArmor,
        "fallingarmor" => Kind::FallingArmor,
        "armorencumbrancepenalty" => Kind::ArmorEncumbrancePenalty,
        "dodge" => Kind::Dodge,
        "reach" => Kind::Reach,
        "unarmeddv" => Kind::UnarmedDV,
        "unarmeddvphysical" => Kind::UnarmedDVPhysical,
        "unarmedap" => Kind::UnarmedAP,
        "unarmedreach" => Kind::UnarmedReach,
        "damageresistance" => Kind::DamageResistance,
        "judgeintentions" => Kind::JudgeIntentions,
        "judgeintentionsoffense" => Kind::JudgeIntentionsOffense,
        "judgeintentionsdefense" => Kind::JudgeIntentionsDefense,
        "liftandcarry" => Kind::LiftAndCarry,
        "memory" => Kind::Memory,
        "composure" => Kind::Composure,
        "concealability" => Kind::Concealability,
        "notoriety" => Kind::Notoriety,
        "streetcred" => Kind::StreetCred,
        "streetcredmultiplier" => Kind::StreetCredMultiplier,
        "publicawareness" => Kind::PublicAwareness,
        "initiative" => Kind::Initiative,
        "initiativedice" | "initiativepass" => Kind::InitiativeDice,
        "initiativediceadd" | "initiativepassadd" => Kind::InitiativeDiceAdd,
        "matrixinitiative" => Kind::MatrixInitiative,
        "matrixinitiativedice" => Kind::MatrixInitiativeDice,
        "matrixinitiativediceadd" => Kind::MatrixInitiativeDiceAdd,
        "lifestylecost" => Kind::LifestyleCost,
        "basiclifestylecost" => Kind::BasicLifestyleCost,
        "nuyenmaxbp" => Kind::NuyenMaxBP,
        "physicallimit" => Kind::PhysicalLimit,
        "mentallimit" => Kind::MentalLimit,
        "sociallimit" => Kind::SocialLimit,
        "spelllimit" => Kind::SpellLimit,
        "complexformlimit" => Kind::ComplexFormLimit,
        "nativelanguagelimit" => Kind::NativeLanguageLimit,
        "essencepenalty" => Kind::EssencePenalty,
        "essencemax" => Kind::EssenceMax,
        "cyborgessence" => Kind::CyborgEssence,
        "adeptpowerpoints" => Kind::AdeptPowerPoints,
        "freespiritpowerpoints" => Kind::FreeSpiritPowerPoints,
        "drainresist" => Kind::DrainResistance,
        "fadingresist" => Kind::FadingResistance,
        "drainvalue" => Kind::DrainValue,
        "fadingvalue" => Kind::FadingValue,
        "spellresistance" => Kind::SpellResistance,
        "throwrange" => Kind::ThrowRange,
        "throwstr" => Kind::ThrowSTR,
        "fatigueresist" => Kind::FatigueResist,
        "radiationresist" => Kind::RadiationResist,
        "sonicresist" => Kind::SonicResist,
        "toxincontactresist" => Kind::ToxinContactResist,
        "toxiningestionresist" => Kind::ToxinIngestionResist,
        "toxininhalationresist" => Kind::ToxinInhalationResist,
        "toxininjectionresist" => Kind::ToxinInjectionResist,
        "pathogencontactresist" => Kind::PathogenContactResist,
        "pathogeningestionresist" => Kind::PathogenIngestionResist,
        "pathogeninhalationresist" => Kind::PathogenInhalationResist,
        "pathogeninjectionresist" => Kind::PathogenInjectionResist,
        "toxincontactimmune" => Kind::ToxinContactImmune,
        "toxiningestionimmune" => Kind::ToxinIngestionImmune,
        "toxininhalationimmune" => Kind::ToxinInhalationImmune,
        "toxininjectionimmune" => Kind::ToxinInjectionImmune,
        "pathogencontactimmune" => Kind::PathogenContactImmune,
        "pathogeningestionimmune" => Kind::PathogenIngestionImmune,
        "pathogeninhalationimmune" => Kind::PathogenInhalationImmune,
        "pathogeninjectionimmune" => Kind::PathogenInjectionImmune,
        "physiologicaladdictionfirsttime" => Kind::PhysiologicalAddictionFirstTime,
        "psychologicaladdictionfirsttime" => Kind::PsychologicalAddictionFirstTime,
        "physiologicaladdictionalreadyaddicted" => Kind::PhysiologicalAddictionAlreadyAddicted,
        "psychologicaladdictionalreadyaddicted" => Kind::PsychologicalAddictionAlreadyAddicted,
        "stuncmrecovery" => Kind::StunCMRecovery,
        "physicalcmrecovery" => Kind::PhysicalCMRecovery,
        "addesstostuncmrecovery" => Kind::AddESStoStunCMRecovery,
        "addesstophysicalcmrecovery" => Kind::AddESStoPhysicalCMRecovery,
        "mentalmanipulationresist" => Kind::MentalManipulationResist,
        "physicalmanipulationresist" => Kind::PhysicalManipulationResist,
        "manaillusionresist" => Kind::ManaIllusionResist,
        "physicalillusionresist" => Kind::PhysicalIllusionResist,
        "detectionspellresist" => Kind::DetectionSpellResist,
        "walkmultiplier" => Kind::WalkMultiplier,
        "runmultiplier" => Kind::RunMultiplier,
        "sprintbonus" => Kind::SprintBonus,
        "ignorecmpenaltystun" => Kind::IgnoreCMPenaltyStun,
        "ignorecmpenaltyphysical" => Kind::IgnoreCMPenaltyPhysical,
        "cmoverflow" => Kind::CMOverflow,
        "enhancedarticulation" => Kind::EnhancedArticulation,
        "reflexrecorderoptimization" => Kind::ReflexRecorderOptimization,
        "restricteditemcount" => Kind::RestrictedItemCount,
        "trustfund" => Kind::TrustFund,
        "smartlink" => Kind::Smartlink,
        "softweave" => Kind::SoftWeave,
        "adapsin" => Kind::Adapsin,
        "ambidextrous" => Kind::Ambidextrous,
        "blackmarketdiscount" => Kind::BlackMarketDiscount,
        "friendsinhighplaces" => Kind::FriendsInHighPlaces,
        "excon" => Kind::ExCon,
        "erased" => Kind::Erased,
        "bornrich" => Kind::BornRich,
        "fame" => Kind::Fame,
        "mademan" => Kind::MadeMan,
        "overclocker" => Kind::Overclocker,
        "restrictedgear" => Kind::RestrictedGear,
        "dealerconnection" => Kind::DealerConnection,
        "seeker" => Kind::Seeker,
        "hardwire" => Kind::Hardwire,
        "skillwire" => Kind::Skillwire,
        "initiation" => Kind::Initiation,
        "submersion" => Kind::Submersion,
        "freepositivequalities" => Kind::FreePositiveQualities,
        "freenegativequalities" => Kind::FreeNegativeQualities,
        "freeknowledgeskills" => Kind::FreeKnowledgeSkills,
        "freespells" => Kind::FreeSpells,
        "genetechcostmultiplier" => Kind::GenetechCostMultiplier,
        "cyberwareesscost" => Kind::CyberwareEssCost,
        "cyberwaretotalessmultiplier" => Kind::CyberwareTotalEssMultiplier,
        "biowareesscost" => Kind::BiowareEssCost,
        "biowaretotalessmultiplier" => Kind::BiowareTotalEssMultiplier,
        "basicbiowareesscost" => Kind::BasicBiowareEssCost,
        "attributekarmacostmultiplier" => Kind::AttributeKarmaCostMultiplier,
        "attributekarmacost" => Kind::AttributeKarmaCost,
        "activeskillkarmacostmultiplier" => Kind::ActiveSkillKarmaCostMultiplier,
        "activeskillkarmacost" => Kind::ActiveSkillKarmaCost,
        "skillgroupkarmacostmultiplier" => Kind::SkillGroupKarmaCostMultiplier,
        "skillgroupkarmacost" => Kind::SkillGroupKarmaCost,
        "knowledgeskillkarmacostmultiplier" => Kind::KnowledgeSkillKarmaCostMultiplier,
        "knowledgeskillkarmacost" => Kind::KnowledgeSkillKarmaCost,
        "newspellkarmacostmultiplier" => Kind::NewSpellKarmaCostMultiplier,
        "newspellkarmacost" => Kind::NewSpellKarmaCost,
        "newcomplexformkarmacostmultiplier" => Kind::NewComplexFormKarmaCostMultiplier,
        "newcomplexformkarmacost" => Kind::NewComplexFormKarmaCost,
        "newaiprogramkarmacostmultiplier" => Kind::NewAIProgramKarmaCostMultiplier,
        "newaiprogramkarmacost" => Kind::NewAIProgramKarmaCost,
        "newaiadvancedprogramkarmacostmultiplier" => Kind::NewAIAdvancedProgramKarmaCostMultiplier,
        "newaiadvancedprogramkarmacost" => Kind::NewAIAdvancedProgramKarmaCost,
        "focusbindingkarmacost" => Kind::FocusBindingKarmaCost,
        "focusbindingkarmamultiplier" => Kind::FocusBindingKarmaMultiplier,
        "magicianswaydiscount" => Kind::MagiciansWayDiscount,
        "burnoutsway" => Kind::BurnoutsWay,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose_trees() {
        let bonus = BonusNode::new("bonus")
            .attr_entry("unique", "precedence0")
            .child_value("armor", "2")
            .child(BonusNode::new("specificattribute").child_value("name", "BOD"));

        assert_eq!(bonus.attr("unique"), Some("precedence0"));
        assert_eq!(bonus.child_text("armor"), Some("2"));
        assert_eq!(
            bonus.find("specificattribute").unwrap().child_text("name"),
            Some("BOD")
        );
        assert!(bonus.find("missing").is_none());
    }

    #[test]
    fn registry_resolves_structured_and_simple_tags() {
        assert_eq!(
            BonusDirective::from_tag("selecttext"),
            Some(BonusDirective::SelectText)
        );
        assert_eq!(
            BonusDirective::from_tag("armor"),
            Some(BonusDirective::Simple(ImprovementKind::Armor))
        );
        assert_eq!(BonusDirective::from_tag("frobnicate"), None);
    }

    #[test]
    fn retired_initiative_spellings_stay_registered() {
        assert_eq!(
            BonusDirective::from_tag("initiativepass"),
            Some(BonusDirective::Simple(ImprovementKind::InitiativeDice))
        );
        assert_eq!(
            BonusDirective::from_tag("initiativepassadd"),
            Some(BonusDirective::Simple(ImprovementKind::InitiativeDiceAdd))
        );
    }

    #[test]
    fn comment_nodes_are_flagged() {
        assert!(BonusNode::with_text("#comment", "authoring note").is_comment());
        assert!(!BonusNode::new("armor").is_comment());
    }
}
