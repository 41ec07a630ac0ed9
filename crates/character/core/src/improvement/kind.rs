//! Closed enumerations of effect categories and grant sources.
//!
//! Save files store both as their symbolic names, so the variant spelling is
//! part of the persistence format. Legacy names are translated on read only;
//! see [`ImprovementKind::from_save_name`] and
//! [`ImprovementSource::from_save_name`].

use strum::{AsRefStr, Display, EnumString};

/// Everything an improvement can affect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum ImprovementKind {
    Attribute,
    Text,
    Armor,
    FireArmor,
    ColdArmor,
    ElectricityArmor,
    AcidArmor,
    FallingArmor,
    Dodge,
    Reach,
    Nuyen,
    Essence,
    PhysicalCM,
    StunCM,
    UnarmedDV,
    InitiativeDice,
    MatrixInitiative,
    MatrixInitiativeDice,
    LifestyleCost,
    CMThreshold,
    EnhancedArticulation,
    WeaponCategoryDV,
    WeaponCategoryDice,
    CyberwareEssCost,
    CyberwareTotalEssMultiplier,
    CyberwareEssCostNonRetroactive,
    CyberwareTotalEssMultiplierNonRetroactive,
    SpecialTab,
    Initiative,
    LivingPersonaDeviceRating,
    LivingPersonaProgramLimit,
    LivingPersonaAttack,
    LivingPersonaSleaze,
    LivingPersonaDataProcessing,
    LivingPersonaFirewall,
    Smartlink,
    BiowareEssCost,
    BiowareTotalEssMultiplier,
    BiowareEssCostNonRetroactive,
    BiowareTotalEssMultiplierNonRetroactive,
    GenetechCostMultiplier,
    BasicBiowareEssCost,
    SoftWeave,
    DisableBioware,
    DisableCyberware,
    DisableBiowareGrade,
    DisableCyberwareGrade,
    ConditionMonitor,
    UnarmedDVPhysical,
    Adapsin,
    FreePositiveQualities,
    FreeNegativeQualities,
    FreeKnowledgeSkills,
    NuyenMaxBP,
    CMOverflow,
    FreeSpiritPowerPoints,
    AdeptPowerPoints,
    ArmorEncumbrancePenalty,
    Initiation,
    Submersion,
    Metamagic,
    Echo,
    Skillwire,
    DamageResistance,
    RestrictedItemCount,
    JudgeIntentions,
    JudgeIntentionsOffense,
    JudgeIntentionsDefense,
    LiftAndCarry,
    Memory,
    Concealability,
    SwapSkillAttribute,
    DrainResistance,
    FadingResistance,
    MatrixInitiativeDiceAdd,
    InitiativeDiceAdd,
    Composure,
    UnarmedAP,
    CMThresholdOffset,
    CMSharedThresholdOffset,
    Restricted,
    Notoriety,
    SpellCategory,
    SpellCategoryDamage,
    SpellCategoryDrain,
    ThrowRange,
    SkillsoftAccess,
    AddSprite,
    BlackMarketDiscount,
    ComplexFormLimit,
    SpellLimit,
    QuickeningMetamagic,
    BasicLifestyleCost,
    ThrowSTR,
    IgnoreCMPenaltyStun,
    IgnoreCMPenaltyPhysical,
    CyborgEssence,
    EssenceMax,
    AdeptPower,
    SpecificQuality,
    MartialArt,
    LimitModifier,
    PhysicalLimit,
    MentalLimit,
    SocialLimit,
    FriendsInHighPlaces,
    Erased,
    BornRich,
    Fame,
    MadeMan,
    Overclocker,
    RestrictedGear,
    TrustFund,
    ExCon,
    ContactForceGroup,
    Attributelevel,
    AddContact,
    Seeker,
    PublicAwareness,
    PrototypeTranshuman,
    Hardwire,
    DealerConnection,
    /// Dice-pool bonus to one named skill.
    Skill,
    SkillGroup,
    SkillCategory,
    SkillAttribute,
    SkillLinkedAttribute,
    /// Karma levels in one named skill.
    SkillLevel,
    SkillGroupLevel,
    /// Base points in one named skill.
    SkillBase,
    SkillGroupBase,
    /// A knowledge skill forced onto the sheet by a knowsoft.
    SkillKnowledgeForced,
    ReplaceAttribute,
    SpecialSkills,
    ReflexRecorderOptimization,
    BlockSkillDefault,
    Ambidextrous,
    UnarmedReach,
    SkillSpecialization,
    NativeLanguageLimit,
    AdeptPowerFreeLevels,
    AdeptPowerFreePoints,
    AIProgram,
    CritterPowerLevel,
    CritterPower,
    SwapSkillSpecAttribute,
    SpellResistance,
    LimitSpellCategory,
    LimitSpellDescriptor,
    LimitSpiritCategory,
    WalkSpeed,
    RunSpeed,
    SprintSpeed,
    WalkMultiplier,
    RunMultiplier,
    SprintBonus,
    WalkMultiplierPercent,
    RunMultiplierPercent,
    SprintBonusPercent,
    EssencePenalty,
    EssencePenaltyT100,
    EssencePenaltyMAGOnlyT100,
    FreeSpellsATT,
    FreeSpells,
    DrainValue,
    FadingValue,
    Spell,
    ComplexForm,
    Gear,
    Weapon,
    MentorSpirit,
    Paragon,
    FreeSpellsSkill,
    DisableSpecializationEffects,
    FatigueResist,
    RadiationResist,
    SonicResist,
    ToxinContactResist,
    ToxinIngestionResist,
    ToxinInhalationResist,
    ToxinInjectionResist,
    PathogenContactResist,
    PathogenIngestionResist,
    PathogenInhalationResist,
    PathogenInjectionResist,
    ToxinContactImmune,
    ToxinIngestionImmune,
    ToxinInhalationImmune,
    ToxinInjectionImmune,
    PathogenContactImmune,
    PathogenIngestionImmune,
    PathogenInhalationImmune,
    PathogenInjectionImmune,
    PhysiologicalAddictionFirstTime,
    PsychologicalAddictionFirstTime,
    PhysiologicalAddictionAlreadyAddicted,
    PsychologicalAddictionAlreadyAddicted,
    StunCMRecovery,
    PhysicalCMRecovery,
    AddESStoStunCMRecovery,
    AddESStoPhysicalCMRecovery,
    MentalManipulationResist,
    PhysicalManipulationResist,
    ManaIllusionResist,
    PhysicalIllusionResist,
    DetectionSpellResist,
    AddLimb,
    StreetCredMultiplier,
    StreetCred,
    AttributeKarmaCostMultiplier,
    AttributeKarmaCost,
    ActiveSkillKarmaCostMultiplier,
    SkillGroupKarmaCostMultiplier,
    KnowledgeSkillKarmaCostMultiplier,
    ActiveSkillKarmaCost,
    SkillGroupKarmaCost,
    SkillGroupDisable,
    KnowledgeSkillKarmaCost,
    SkillCategorySpecializationKarmaCostMultiplier,
    SkillCategorySpecializationKarmaCost,
    SkillCategoryKarmaCostMultiplier,
    SkillCategoryKarmaCost,
    SkillGroupCategoryKarmaCostMultiplier,
    SkillGroupCategoryDisable,
    SkillGroupCategoryKarmaCost,
    AttributePointCostMultiplier,
    AttributePointCost,
    ActiveSkillPointCostMultiplier,
    SkillGroupPointCostMultiplier,
    KnowledgeSkillPointCostMultiplier,
    ActiveSkillPointCost,
    SkillGroupPointCost,
    KnowledgeSkillPointCost,
    SkillCategoryPointCostMultiplier,
    SkillCategoryPointCost,
    SkillGroupCategoryPointCostMultiplier,
    SkillGroupCategoryPointCost,
    NewSpellKarmaCostMultiplier,
    NewSpellKarmaCost,
    NewComplexFormKarmaCostMultiplier,
    NewComplexFormKarmaCost,
    NewAIProgramKarmaCostMultiplier,
    NewAIProgramKarmaCost,
    NewAIAdvancedProgramKarmaCostMultiplier,
    NewAIAdvancedProgramKarmaCost,
    BlockSkillSpecializations,
    BlockSkillCategorySpecializations,
    FocusBindingKarmaCost,
    FocusBindingKarmaMultiplier,
    MagiciansWayDiscount,
    BurnoutsWay,
    ContactForcedLoyalty,
    ContactMakeFree,
    FreeWare,
    WeaponAccuracy,
}

impl ImprovementKind {
    /// Parses a symbolic name from a save file.
    ///
    /// Kind names containing the retired `InitiativePass` token are renamed
    /// to their `InitiativeDice` counterparts before lookup.
    pub fn from_save_name(name: &str) -> Result<Self, strum::ParseError> {
        if name.contains("InitiativePass") {
            return name.replace("InitiativePass", "InitiativeDice").parse();
        }
        name.parse()
    }
}

/// The category of game object that granted an improvement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum ImprovementSource {
    Quality,
    Power,
    Metatype,
    Cyberware,
    Metavariant,
    Bioware,
    ArmorEncumbrance,
    Gear,
    Spell,
    Initiation,
    Submersion,
    Metamagic,
    Echo,
    Armor,
    ArmorMod,
    EssenceLoss,
    EssenceLossChargen,
    CritterPower,
    ComplexForm,
    EdgeUse,
    MutantCritter,
    Cyberzombie,
    StackedFocus,
    AttributeLoss,
    Art,
    Enhancement,
    Custom,
    Heritage,
    MartialArt,
    MartialArtTechnique,
    AIProgram,
    SpiritFettering,
    MentorSpirit,
}

impl ImprovementSource {
    /// Parses a symbolic name from a save file.
    ///
    /// The retired `MartialArtAdvantage` source reads as
    /// [`ImprovementSource::MartialArtTechnique`].
    pub fn from_save_name(name: &str) -> Result<Self, strum::ParseError> {
        if name == "MartialArtAdvantage" {
            return Ok(ImprovementSource::MartialArtTechnique);
        }
        name.parse()
    }
}
