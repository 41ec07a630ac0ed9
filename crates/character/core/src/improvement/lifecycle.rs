//! Bulk enable/disable/remove over sets of effect records.
//!
//! Removal is authoritative: records leave the owner's collection, dependent
//! sub-objects are recursively deleted, and accumulated refunds are returned.
//! Enable/disable only flip the record toggle and mirror the kind-specific
//! capability side effects; a capability granted redundantly by two sources
//! stays active until the last enabled grantor goes away.
//!
//! Every operation ends with one batched owner notification, not one per
//! record.

use crate::character::{Character, CharacterFlags, SpecialSkillFilter};

use super::engine::ImprovementEngine;
use super::kind::{ImprovementKind, ImprovementSource};
use super::record::Improvement;

/// Deferred display refreshes accumulated over one batch.
#[derive(Clone, Copy, Debug, Default)]
struct BatchEffects {
    skills: bool,
    attributes: bool,
}

fn finish_batch(character: &mut Character, effects: BatchEffects) {
    if effects.skills {
        character.change_counter.skill_refreshes += 1;
    }
    if effects.attributes {
        character.change_counter.attribute_refreshes += 1;
    }
    character.change_counter.batches += 1;
}

impl ImprovementEngine {
    // ========================================================================
    // Enable / disable
    // ========================================================================

    /// Re-enables every record granted by (source, source name).
    pub fn enable_improvements(
        &mut self,
        character: &mut Character,
        source: ImprovementSource,
        source_name: &str,
    ) {
        self.set_enabled_matching(
            character,
            &|improvement| {
                improvement.source() == source && improvement.source_name() == source_name
            },
            true,
        );
    }

    /// Disables every record granted by (source, source name).
    pub fn disable_improvements(
        &mut self,
        character: &mut Character,
        source: ImprovementSource,
        source_name: &str,
    ) {
        self.set_enabled_matching(
            character,
            &|improvement| {
                improvement.source() == source && improvement.source_name() == source_name
            },
            false,
        );
    }

    /// Enables every record matching `pred`.
    pub fn enable_matching(&mut self, character: &mut Character, pred: impl Fn(&Improvement) -> bool) {
        self.set_enabled_matching(character, &pred, true);
    }

    /// Disables every record matching `pred`.
    pub fn disable_matching(
        &mut self,
        character: &mut Character,
        pred: impl Fn(&Improvement) -> bool,
    ) {
        self.set_enabled_matching(character, &pred, false);
    }

    fn set_enabled_matching(
        &mut self,
        character: &mut Character,
        pred: &dyn Fn(&Improvement) -> bool,
        enabled: bool,
    ) {
        // Flip the whole batch first so duplicate checks in the side-effect
        // pass observe the final enabled states.
        let mut batch: Vec<Improvement> = Vec::new();
        for improvement in &mut character.improvements {
            if pred(improvement) {
                if improvement.is_enabled() != enabled {
                    improvement.set_enabled(enabled);
                }
                batch.push(improvement.clone());
            }
        }
        for improvement in &batch {
            self.cache.invalidate(character.id, improvement.kind());
        }

        let mut effects = BatchEffects::default();
        for improvement in &batch {
            if enabled {
                self.enable_side_effect(character, improvement, &mut effects);
            } else {
                self.disable_side_effect(character, improvement, &mut effects);
            }
        }
        finish_batch(character, effects);
    }

    fn enable_side_effect(
        &mut self,
        character: &mut Character,
        improvement: &Improvement,
        effects: &mut BatchEffects,
    ) {
        match improvement.kind() {
            ImprovementKind::SwapSkillAttribute | ImprovementKind::SwapSkillSpecAttribute => {
                effects.skills = true;
            }
            ImprovementKind::SkillsoftAccess => {
                character.skills.set_knowsofts_enabled(true);
            }
            ImprovementKind::SkillKnowledgeForced => {
                for skill in character.skills.knowledge.iter_mut() {
                    if skill.internal_id == improvement.improved_name {
                        skill.enabled = true;
                    }
                }
            }
            ImprovementKind::Attribute => {
                if improvement.unique_name() == "enableattribute" {
                    if let Some(flag) = special_attribute_flag(&improvement.improved_name) {
                        character.flags.insert(flag);
                    }
                }
                effects.attributes = true;
            }
            ImprovementKind::SpecialTab => match improvement.unique_name() {
                "enabletab" => {
                    if let Some(flag) = tab_flag(&improvement.improved_name) {
                        character.flags.insert(flag);
                    }
                }
                "disabletab" => {
                    if improvement.improved_name == "Cyberware" {
                        character.flags.insert(CharacterFlags::CYBERWARE_DISABLED);
                    }
                }
                _ => {}
            },
            ImprovementKind::BlackMarketDiscount => {
                character.flags.insert(CharacterFlags::BLACK_MARKET_DISCOUNT);
            }
            ImprovementKind::FriendsInHighPlaces => {
                character.flags.insert(CharacterFlags::FRIENDS_IN_HIGH_PLACES);
            }
            ImprovementKind::ExCon => character.flags.insert(CharacterFlags::EX_CON),
            ImprovementKind::Erased => character.flags.insert(CharacterFlags::ERASED),
            ImprovementKind::BornRich => character.flags.insert(CharacterFlags::BORN_RICH),
            ImprovementKind::Fame => character.flags.insert(CharacterFlags::FAME),
            ImprovementKind::MadeMan => character.flags.insert(CharacterFlags::MADE_MAN),
            ImprovementKind::Ambidextrous => character.flags.insert(CharacterFlags::AMBIDEXTROUS),
            ImprovementKind::Overclocker => character.flags.insert(CharacterFlags::OVERCLOCKER),
            ImprovementKind::RestrictedGear => {
                character.flags.insert(CharacterFlags::RESTRICTED_GEAR)
            }
            ImprovementKind::TrustFund => character.trust_fund = improvement.value,
            ImprovementKind::PrototypeTranshuman => {
                // Legacy records carry no amount and mean "fully prototype".
                if improvement.improved_name.is_empty() {
                    character.prototype_transhuman = 1;
                } else {
                    character.prototype_transhuman +=
                        improvement.improved_name.parse::<i32>().unwrap_or(0);
                }
            }
            ImprovementKind::Initiation => character.initiate_grade += improvement.value,
            ImprovementKind::Submersion => character.submersion_grade += improvement.value,
            ImprovementKind::Metamagic | ImprovementKind::Echo => {
                let source = if improvement.kind() == ImprovementKind::Metamagic {
                    ImprovementSource::Metamagic
                } else {
                    ImprovementSource::Echo
                };
                if character.metamagics.contains(&improvement.improved_name) {
                    self.enable_improvements(character, source, &improvement.improved_name.clone());
                }
            }
            ImprovementKind::CritterPower => {
                if let Some(id) = find_critter_power_id(character, improvement) {
                    self.enable_improvements(character, ImprovementSource::CritterPower, &id);
                }
            }
            ImprovementKind::MentorSpirit | ImprovementKind::Paragon => {
                if character.mentor_spirits.contains(&improvement.improved_name) {
                    self.enable_improvements(
                        character,
                        ImprovementSource::MentorSpirit,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::Gear => {
                if let Some(gear) = character.gear.get_mut(&improvement.improved_name) {
                    gear.set_equipped(true);
                }
            }
            ImprovementKind::Spell => {
                if character.spells.contains(&improvement.improved_name) {
                    self.enable_improvements(
                        character,
                        ImprovementSource::Spell,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::ComplexForm => {
                if character.complex_forms.contains(&improvement.improved_name) {
                    self.enable_improvements(
                        character,
                        ImprovementSource::ComplexForm,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::MartialArt => {
                let technique_ids: Vec<String> = character
                    .martial_arts
                    .get(&improvement.improved_name)
                    .map(|art| {
                        art.techniques
                            .iter()
                            .map(|technique| technique.internal_id.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                if character.martial_arts.contains(&improvement.improved_name) {
                    self.enable_improvements(
                        character,
                        ImprovementSource::MartialArt,
                        &improvement.improved_name.clone(),
                    );
                    for id in technique_ids {
                        self.enable_improvements(
                            character,
                            ImprovementSource::MartialArtTechnique,
                            &id,
                        );
                    }
                }
            }
            ImprovementKind::SpecialSkills => {
                if let Ok(filter) = improvement.improved_name.parse::<SpecialSkillFilter>() {
                    character.skills.set_category_enabled(filter.category(), true);
                }
            }
            ImprovementKind::SpecificQuality => {
                if character.qualities.contains(&improvement.improved_name) {
                    self.enable_improvements(
                        character,
                        ImprovementSource::Quality,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::AIProgram => {
                if character.ai_programs.contains(&improvement.improved_name) {
                    self.enable_improvements(
                        character,
                        ImprovementSource::AIProgram,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::AdeptPowerFreeLevels | ImprovementKind::AdeptPowerFreePoints => {
                self.refresh_power_free_levels(character, improvement);
            }
            ImprovementKind::MagiciansWayDiscount => {
                self.refresh_way_discounts(character);
            }
            ImprovementKind::FreeWare => {
                if let Some(cyberware) = character.cyberware.get_mut(&improvement.improved_name) {
                    cyberware.equipped = true;
                }
            }
            ImprovementKind::ContactForceGroup => {
                if let Some(contact) = character.contacts.get_mut(&improvement.improved_name) {
                    contact.group_enabled = false;
                }
            }
            ImprovementKind::ContactForcedLoyalty => {
                if let Some(contact) = character.contacts.get_mut(&improvement.improved_name) {
                    contact.forced_loyalty = contact.forced_loyalty.max(improvement.value);
                }
            }
            ImprovementKind::ContactMakeFree => {
                if let Some(contact) = character.contacts.get_mut(&improvement.improved_name) {
                    contact.free = true;
                }
            }
            _ => {}
        }
    }

    fn disable_side_effect(
        &mut self,
        character: &mut Character,
        improvement: &Improvement,
        effects: &mut BatchEffects,
    ) {
        // Another enabled grant of the same capability from a different
        // source keeps the side effect alive.
        let has_duplicate = character.improvements.iter().any(|other| {
            other.duplicates(improvement)
                && other.source_name() != improvement.source_name()
                && other.is_enabled()
        });

        match improvement.kind() {
            ImprovementKind::SwapSkillAttribute | ImprovementKind::SwapSkillSpecAttribute => {
                effects.skills = true;
            }
            ImprovementKind::SkillsoftAccess => {
                if !has_duplicate {
                    character.skills.set_knowsofts_enabled(false);
                }
            }
            ImprovementKind::SkillKnowledgeForced => {
                if !has_duplicate {
                    for skill in character.skills.knowledge.iter_mut() {
                        if skill.internal_id == improvement.improved_name {
                            skill.enabled = false;
                        }
                    }
                }
            }
            ImprovementKind::Attribute => {
                if improvement.unique_name() == "enableattribute" && !has_duplicate {
                    if let Some(flag) = special_attribute_flag(&improvement.improved_name) {
                        character.flags.remove(flag);
                    }
                }
                effects.attributes = true;
            }
            ImprovementKind::SpecialTab => {
                if !has_duplicate {
                    match improvement.unique_name() {
                        "enabletab" => {
                            if let Some(flag) = tab_flag(&improvement.improved_name) {
                                character.flags.remove(flag);
                            }
                        }
                        "disabletab" => {
                            if improvement.improved_name == "Cyberware" {
                                character.flags.remove(CharacterFlags::CYBERWARE_DISABLED);
                            }
                        }
                        _ => {}
                    }
                }
            }
            ImprovementKind::BlackMarketDiscount => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::BLACK_MARKET_DISCOUNT);
                }
            }
            ImprovementKind::FriendsInHighPlaces => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::FRIENDS_IN_HIGH_PLACES);
                }
            }
            ImprovementKind::ExCon => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::EX_CON);
                }
            }
            ImprovementKind::Erased => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::ERASED);
                }
            }
            ImprovementKind::BornRich => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::BORN_RICH);
                }
            }
            ImprovementKind::Fame => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::FAME);
                }
            }
            ImprovementKind::MadeMan => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::MADE_MAN);
                }
            }
            ImprovementKind::Ambidextrous => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::AMBIDEXTROUS);
                }
            }
            ImprovementKind::Overclocker => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::OVERCLOCKER);
                }
            }
            ImprovementKind::RestrictedGear => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::RESTRICTED_GEAR);
                }
            }
            ImprovementKind::TrustFund => {
                if !has_duplicate {
                    character.trust_fund = 0;
                }
            }
            ImprovementKind::PrototypeTranshuman => {
                if improvement.improved_name.is_empty() {
                    if !has_duplicate {
                        character.prototype_transhuman = 0;
                    }
                } else {
                    character.prototype_transhuman -=
                        improvement.improved_name.parse::<i32>().unwrap_or(0);
                }
            }
            ImprovementKind::Initiation => character.initiate_grade -= improvement.value,
            ImprovementKind::Submersion => character.submersion_grade -= improvement.value,
            ImprovementKind::Metamagic | ImprovementKind::Echo => {
                let source = if improvement.kind() == ImprovementKind::Metamagic {
                    ImprovementSource::Metamagic
                } else {
                    ImprovementSource::Echo
                };
                if character.metamagics.contains(&improvement.improved_name) {
                    self.disable_improvements(character, source, &improvement.improved_name.clone());
                }
            }
            ImprovementKind::CritterPower => {
                if let Some(id) = find_critter_power_id(character, improvement) {
                    self.disable_improvements(character, ImprovementSource::CritterPower, &id);
                }
            }
            ImprovementKind::MentorSpirit | ImprovementKind::Paragon => {
                if character.mentor_spirits.contains(&improvement.improved_name) {
                    self.disable_improvements(
                        character,
                        ImprovementSource::MentorSpirit,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::Gear => {
                if let Some(gear) = character.gear.get_mut(&improvement.improved_name) {
                    gear.set_equipped(false);
                }
            }
            ImprovementKind::Spell => {
                if character.spells.contains(&improvement.improved_name) {
                    self.disable_improvements(
                        character,
                        ImprovementSource::Spell,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::ComplexForm => {
                if character.complex_forms.contains(&improvement.improved_name) {
                    self.disable_improvements(
                        character,
                        ImprovementSource::ComplexForm,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::MartialArt => {
                let technique_ids: Vec<String> = character
                    .martial_arts
                    .get(&improvement.improved_name)
                    .map(|art| {
                        art.techniques
                            .iter()
                            .map(|technique| technique.internal_id.clone())
                            .collect()
                    })
                    .unwrap_or_default();
                if character.martial_arts.contains(&improvement.improved_name) {
                    self.disable_improvements(
                        character,
                        ImprovementSource::MartialArt,
                        &improvement.improved_name.clone(),
                    );
                    for id in technique_ids {
                        self.disable_improvements(
                            character,
                            ImprovementSource::MartialArtTechnique,
                            &id,
                        );
                    }
                }
            }
            ImprovementKind::SpecialSkills => {
                if !has_duplicate {
                    self.disable_special_skills(character, improvement);
                }
            }
            ImprovementKind::SpecificQuality => {
                if character.qualities.contains(&improvement.improved_name) {
                    self.disable_improvements(
                        character,
                        ImprovementSource::Quality,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::AIProgram => {
                if character.ai_programs.contains(&improvement.improved_name) {
                    self.disable_improvements(
                        character,
                        ImprovementSource::AIProgram,
                        &improvement.improved_name.clone(),
                    );
                }
            }
            ImprovementKind::AdeptPowerFreeLevels | ImprovementKind::AdeptPowerFreePoints => {
                self.refresh_power_free_levels(character, improvement);
            }
            ImprovementKind::MagiciansWayDiscount => {
                self.refresh_way_discounts(character);
            }
            ImprovementKind::FreeWare => {
                if let Some(cyberware) = character.cyberware.get_mut(&improvement.improved_name) {
                    cyberware.equipped = false;
                }
            }
            ImprovementKind::ContactForceGroup => {
                if !has_duplicate {
                    if let Some(contact) = character.contacts.get_mut(&improvement.improved_name) {
                        contact.group_enabled = true;
                    }
                }
            }
            ImprovementKind::ContactForcedLoyalty => {
                self.recalculate_forced_loyalty(character, &improvement.improved_name);
            }
            ImprovementKind::ContactMakeFree => {
                if !has_duplicate {
                    if let Some(contact) = character.contacts.get_mut(&improvement.improved_name) {
                        contact.free = false;
                    }
                }
            }
            _ => {}
        }
    }

    /// Disables the granted skill category unless another enabled grant
    /// still covers it.
    fn disable_special_skills(&mut self, character: &mut Character, improvement: &Improvement) {
        let Ok(filter) = improvement.improved_name.parse::<SpecialSkillFilter>() else {
            return;
        };
        let category = filter.category();
        let still_granted = character.improvements.iter().any(|other| {
            other.kind() == ImprovementKind::SpecialSkills
                && other.is_enabled()
                && other
                    .improved_name
                    .parse::<SpecialSkillFilter>()
                    .map(|other_filter| other_filter.category() == category)
                    .unwrap_or(false)
        });
        if !still_granted {
            character.skills.set_category_enabled(category, false);
        }
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Removes every record granted by `source`, optionally narrowed to one
    /// source name. Returns the accumulated monetary refund from deleted
    /// sub-objects.
    pub fn remove_improvements(
        &mut self,
        character: &mut Character,
        source: ImprovementSource,
        source_name: Option<&str>,
    ) -> i64 {
        self.remove_matching_internal(
            character,
            &|improvement| {
                improvement.source() == source
                    && source_name.is_none_or(|name| improvement.source_name() == name)
            },
            false,
            false,
        )
    }

    /// Removes every record matching `pred`.
    ///
    /// `reapply` suppresses destructive skill-list cleanup while a host is
    /// about to re-grant the same improvements; `allow_same_source` makes the
    /// duplicate check ignore source names.
    pub fn remove_matching(
        &mut self,
        character: &mut Character,
        pred: impl Fn(&Improvement) -> bool,
        reapply: bool,
        allow_same_source: bool,
    ) -> i64 {
        self.remove_matching_internal(character, &pred, reapply, allow_same_source)
    }

    fn remove_matching_internal(
        &mut self,
        character: &mut Character,
        pred: &dyn Fn(&Improvement) -> bool,
        reapply: bool,
        allow_same_source: bool,
    ) -> i64 {
        // Snapshot-then-remove: detach the whole batch before any side
        // effect runs, so nothing iterates a collection it is mutating.
        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for improvement in character.improvements.drain(..) {
            if pred(&improvement) {
                removed.push(improvement);
            } else {
                kept.push(improvement);
            }
        }
        character.improvements = kept;
        for improvement in &removed {
            self.cache.invalidate(character.id, improvement.kind());
        }

        let mut refund = 0i64;
        let mut effects = BatchEffects::default();
        for improvement in &removed {
            refund +=
                self.remove_side_effect(character, improvement, reapply, allow_same_source, &mut effects);
        }
        finish_batch(character, effects);
        refund
    }

    fn remove_side_effect(
        &mut self,
        character: &mut Character,
        improvement: &Improvement,
        reapply: bool,
        allow_same_source: bool,
        effects: &mut BatchEffects,
    ) -> i64 {
        let has_duplicate = character.improvements.iter().any(|other| {
            other.duplicates(improvement)
                && (allow_same_source || other.source_name() != improvement.source_name())
        });

        let mut refund = 0i64;
        match improvement.kind() {
            ImprovementKind::SwapSkillAttribute | ImprovementKind::SwapSkillSpecAttribute => {
                effects.skills = true;
            }
            ImprovementKind::SkillsoftAccess => {
                character.skills.remove_knowsofts();
            }
            ImprovementKind::SkillKnowledgeForced => {
                let id = improvement.improved_name.as_str();
                character.skills.knowledge.retain(|skill| skill.internal_id != id);
            }
            ImprovementKind::Attribute => {
                if improvement.unique_name() == "enableattribute" && !has_duplicate {
                    if let Some(flag) = special_attribute_flag(&improvement.improved_name) {
                        character.flags.remove(flag);
                    }
                }
                effects.attributes = effects.attributes || improvement.is_enabled();
            }
            ImprovementKind::SpecialTab => {
                if !has_duplicate {
                    match improvement.unique_name() {
                        "enabletab" => {
                            if let Some(flag) = tab_flag(&improvement.improved_name) {
                                character.flags.remove(flag);
                            }
                        }
                        "disabletab" => {
                            if improvement.improved_name == "Cyberware" {
                                character.flags.remove(CharacterFlags::CYBERWARE_DISABLED);
                            }
                        }
                        _ => {}
                    }
                }
            }
            ImprovementKind::BlackMarketDiscount => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::BLACK_MARKET_DISCOUNT);
                }
            }
            ImprovementKind::FriendsInHighPlaces => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::FRIENDS_IN_HIGH_PLACES);
                }
            }
            ImprovementKind::ExCon => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::EX_CON);
                }
            }
            ImprovementKind::Erased => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::ERASED);
                }
            }
            ImprovementKind::BornRich => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::BORN_RICH);
                }
            }
            ImprovementKind::Fame => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::FAME);
                }
            }
            ImprovementKind::MadeMan => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::MADE_MAN);
                }
            }
            ImprovementKind::Ambidextrous => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::AMBIDEXTROUS);
                }
            }
            ImprovementKind::Overclocker => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::OVERCLOCKER);
                }
            }
            ImprovementKind::RestrictedGear => {
                if !has_duplicate {
                    character.flags.remove(CharacterFlags::RESTRICTED_GEAR);
                }
            }
            ImprovementKind::TrustFund => {
                if !has_duplicate {
                    character.trust_fund = 0;
                }
            }
            ImprovementKind::PrototypeTranshuman => {
                if improvement.improved_name.is_empty() {
                    if !has_duplicate {
                        character.prototype_transhuman = 0;
                    }
                } else {
                    character.prototype_transhuman -=
                        improvement.improved_name.parse::<i32>().unwrap_or(0);
                }
            }
            ImprovementKind::Initiation => character.initiate_grade -= improvement.value,
            ImprovementKind::Submersion => character.submersion_grade -= improvement.value,
            ImprovementKind::Adapsin => {
                if !has_duplicate {
                    for cyberware in character.cyberware.iter_mut() {
                        cyberware.for_each_mut(&mut |item| {
                            if let Some(stripped) = item.grade.strip_suffix("(Adapsin)") {
                                item.grade = stripped.trim().to_string();
                            }
                        });
                    }
                }
            }
            ImprovementKind::ContactForceGroup => {
                if !has_duplicate {
                    if let Some(contact) = character.contacts.get_mut(&improvement.improved_name) {
                        contact.group_enabled = true;
                    }
                }
            }
            ImprovementKind::AddContact => {
                character.contacts.remove(&improvement.improved_name);
            }
            ImprovementKind::Metamagic | ImprovementKind::Echo => {
                let source = if improvement.kind() == ImprovementKind::Metamagic {
                    ImprovementSource::Metamagic
                } else {
                    ImprovementSource::Echo
                };
                if character.metamagics.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund += self.remove_improvements(character, source, Some(&id));
                    character.metamagics.remove(&id);
                }
            }
            ImprovementKind::CritterPower => {
                if let Some(id) = find_critter_power_id(character, improvement) {
                    refund +=
                        self.remove_improvements(character, ImprovementSource::CritterPower, Some(&id));
                    character.critter_powers.remove(&id);
                }
            }
            ImprovementKind::MentorSpirit | ImprovementKind::Paragon => {
                if character.mentor_spirits.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund +=
                        self.remove_improvements(character, ImprovementSource::MentorSpirit, Some(&id));
                    character.mentor_spirits.remove(&id);
                }
            }
            ImprovementKind::Gear => {
                if character.gear.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund += self.remove_improvements(character, ImprovementSource::Gear, Some(&id));
                    if let Some(gear) = character.gear.remove(&id) {
                        refund += gear.total_cost();
                    }
                }
            }
            ImprovementKind::Weapon => {
                let id = improvement.improved_name.as_str();
                if let Some(weapon) = character.weapons.remove(id) {
                    refund += weapon.total_cost();
                } else {
                    for weapon in character.weapons.iter_mut() {
                        if let Some(child) = weapon.remove_child(id) {
                            refund += child.total_cost();
                            break;
                        }
                    }
                }
            }
            ImprovementKind::Spell => {
                if character.spells.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund += self.remove_improvements(character, ImprovementSource::Spell, Some(&id));
                    character.spells.remove(&id);
                }
            }
            ImprovementKind::ComplexForm => {
                if character.complex_forms.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund +=
                        self.remove_improvements(character, ImprovementSource::ComplexForm, Some(&id));
                    character.complex_forms.remove(&id);
                }
            }
            ImprovementKind::MartialArt => {
                if character.martial_arts.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    let technique_ids: Vec<String> = character
                        .martial_arts
                        .get(&id)
                        .map(|art| {
                            art.techniques
                                .iter()
                                .map(|technique| technique.internal_id.clone())
                                .collect()
                        })
                        .unwrap_or_default();
                    refund +=
                        self.remove_improvements(character, ImprovementSource::MartialArt, Some(&id));
                    for technique_id in technique_ids {
                        refund += self.remove_improvements(
                            character,
                            ImprovementSource::MartialArtTechnique,
                            Some(&technique_id),
                        );
                    }
                    character.martial_arts.remove(&id);
                }
            }
            ImprovementKind::SpecialSkills => {
                if !has_duplicate && !reapply {
                    if let Ok(filter) = improvement.improved_name.parse::<SpecialSkillFilter>() {
                        character.skills.remove_special_skills(filter);
                    }
                }
            }
            ImprovementKind::SpecificQuality => {
                if character.qualities.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund += self.remove_improvements(character, ImprovementSource::Quality, Some(&id));
                    character.qualities.remove(&id);
                }
            }
            ImprovementKind::SkillSpecialization => {
                let unique = improvement.unique_name().to_string();
                if let Some(skill) =
                    character.skills.active_by_name_mut(&improvement.improved_name)
                {
                    skill.specializations.retain(|spec| spec.name != unique);
                }
            }
            ImprovementKind::AIProgram => {
                if character.ai_programs.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund +=
                        self.remove_improvements(character, ImprovementSource::AIProgram, Some(&id));
                    character.ai_programs.remove(&id);
                }
            }
            ImprovementKind::AdeptPowerFreeLevels | ImprovementKind::AdeptPowerFreePoints => {
                self.refresh_power_free_levels(character, improvement);
                let name = improvement.improved_name.as_str();
                let extra = improvement.unique_name();
                let drained = character
                    .powers
                    .iter()
                    .find(|power| power.name == name && power.extra == extra)
                    .map(|power| (power.internal_id.clone(), power.total_rating() <= 0));
                if let Some((id, true)) = drained {
                    character.powers.remove(&id);
                }
            }
            ImprovementKind::MagiciansWayDiscount => {
                self.refresh_way_discounts(character);
            }
            ImprovementKind::FreeWare => {
                if character.cyberware.contains(&improvement.improved_name) {
                    let id = improvement.improved_name.clone();
                    refund +=
                        self.remove_improvements(character, ImprovementSource::Cyberware, Some(&id));
                    if let Some(cyberware) = character.cyberware.remove(&id) {
                        refund += cyberware.total_cost();
                    }
                }
            }
            ImprovementKind::ContactForcedLoyalty => {
                self.recalculate_forced_loyalty(character, &improvement.improved_name);
            }
            ImprovementKind::ContactMakeFree => {
                if !has_duplicate {
                    if let Some(contact) = character.contacts.get_mut(&improvement.improved_name) {
                        contact.free = false;
                    }
                }
            }
            _ => {}
        }
        refund
    }

    // ========================================================================
    // Derived refreshes
    // ========================================================================

    /// Rebuilds a power's granted levels from its enabled records.
    fn refresh_power_free_levels(&mut self, character: &mut Character, improvement: &Improvement) {
        let name = improvement.improved_name.as_str();
        let extra = improvement.unique_name();
        let total: i32 = character
            .improvements
            .iter()
            .filter(|other| {
                matches!(
                    other.kind(),
                    ImprovementKind::AdeptPowerFreeLevels | ImprovementKind::AdeptPowerFreePoints
                ) && other.is_enabled()
                    && other.improved_name == name
                    && other.unique_name() == extra
            })
            .map(|other| other.value)
            .sum();
        if let Some(power) = character
            .powers
            .iter_mut()
            .find(|power| power.name == name && power.extra == extra)
        {
            power.free_levels = total;
        }
    }

    /// Drops way discounts when no enabled record grants them anymore.
    fn refresh_way_discounts(&mut self, character: &mut Character) {
        let discount_available =
            self.value_of(Some(&*character), ImprovementKind::MagiciansWayDiscount) > 0;
        if !discount_available {
            for power in character.powers.iter_mut() {
                power.discounted = false;
            }
        }
    }

    fn recalculate_forced_loyalty(&mut self, character: &mut Character, contact_id: &str) {
        let loyalty = character
            .improvements
            .iter()
            .filter(|other| {
                other.kind() == ImprovementKind::ContactForcedLoyalty
                    && other.is_enabled()
                    && other.improved_name == contact_id
            })
            .map(|other| other.value)
            .max()
            .unwrap_or(0);
        if let Some(contact) = character.contacts.get_mut(contact_id) {
            contact.forced_loyalty = loyalty;
        }
    }
}

fn special_attribute_flag(name: &str) -> Option<CharacterFlags> {
    match name {
        "MAG" => Some(CharacterFlags::MAG_ENABLED),
        "RES" => Some(CharacterFlags::RES_ENABLED),
        "DEP" => Some(CharacterFlags::DEP_ENABLED),
        _ => None,
    }
}

fn tab_flag(name: &str) -> Option<CharacterFlags> {
    match name {
        "Magician" => Some(CharacterFlags::MAGICIAN_TAB),
        "Adept" => Some(CharacterFlags::ADEPT_TAB),
        "Technomancer" => Some(CharacterFlags::TECHNOMANCER_TAB),
        "Advanced Programs" => Some(CharacterFlags::ADVANCED_PROGRAMS_TAB),
        "Critter" => Some(CharacterFlags::CRITTER_TAB),
        "Initiation" => Some(CharacterFlags::INITIATION_TAB),
        _ => None,
    }
}

/// Critter powers match by internal id, or by name plus the disambiguating
/// grouping tag.
fn find_critter_power_id(character: &Character, improvement: &Improvement) -> Option<String> {
    character
        .critter_powers
        .iter()
        .find(|power| {
            power.internal_id == improvement.improved_name
                || (power.name == improvement.improved_name
                    && power.extra == improvement.unique_name())
        })
        .map(|power| power.internal_id.clone())
}
