//! Directive handlers for the bonus interpreter.
//!
//! Each structured directive knows its own node schema; the shared
//! [`BonusDirective::Simple`] handler evaluates the node text as the record's
//! value. Handlers create records exclusively through
//! `ImprovementEngine::create_improvement` so every grant lands in the
//! transaction list and invalidates the cache immediately.

use tracing::warn;

use crate::character::{AttributeKind, CharacterFlags, Contact, KnowledgeSkill, Power};
use crate::selection::SelectionCancelled;

use super::bonus::{BonusDirective, BonusNode};
use super::engine::{ApplyContext, ApplyError, ImprovementEngine};
use super::kind::ImprovementKind;
use super::record::Improvement;

impl ImprovementEngine {
    pub(crate) fn process_bonus(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        if node.is_comment() {
            return Ok(());
        }
        match BonusDirective::from_tag(&node.tag) {
            Some(directive) => self.apply_directive(ctx, directive, node),
            None if node.children.is_empty() => Ok(()),
            None => {
                warn!(
                    target: "character_core::improvement",
                    tag = %node.tag,
                    source_name = %ctx.source_name,
                    "unknown bonus directive with child content"
                );
                Err(ApplyError::UnknownTag {
                    tag: node.tag.clone(),
                })
            }
        }
    }

    fn apply_directive(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        directive: BonusDirective,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        match directive {
            // Resolved at the root of the pass, before any other directive.
            BonusDirective::SelectText => Ok(()),
            BonusDirective::SelectAttribute => self.select_attribute(ctx, node),
            BonusDirective::SpecificAttribute => self.specific_attribute(ctx, node),
            BonusDirective::AttributeLevel => self.attribute_level(ctx, node),
            BonusDirective::ReplaceAttribute => self.replace_attribute(ctx, node),
            BonusDirective::EnableAttribute => self.enable_attribute(ctx, node),
            BonusDirective::SelectSkill => self.select_skill(ctx, node),
            BonusDirective::SpecificSkill => self.specific_skill(ctx, node),
            BonusDirective::SkillGroup => self.skill_group(ctx, node),
            BonusDirective::SkillCategory => self.skill_category(ctx, node),
            BonusDirective::SkillAttribute => {
                self.skill_attribute(ctx, node, ImprovementKind::SkillAttribute)
            }
            BonusDirective::SkillLinkedAttribute => {
                self.skill_attribute(ctx, node, ImprovementKind::SkillLinkedAttribute)
            }
            BonusDirective::SwapSkillAttribute => self.swap_skill_attribute(ctx, node),
            BonusDirective::SkillsoftAccess => self.skillsoft_access(ctx),
            BonusDirective::ForcedKnowledgeSkill => self.forced_knowledge_skill(ctx, node),
            BonusDirective::ConditionMonitor => self.condition_monitor(ctx, node),
            BonusDirective::LimitModifier => self.limit_modifier(ctx, node),
            BonusDirective::EnableTab => self.enable_tab(ctx, node),
            BonusDirective::DisableTab => self.disable_tab(ctx, node),
            BonusDirective::WeaponCategoryDv => {
                self.weapon_category(ctx, node, ImprovementKind::WeaponCategoryDV)
            }
            BonusDirective::WeaponCategoryDice => {
                self.weapon_category(ctx, node, ImprovementKind::WeaponCategoryDice)
            }
            BonusDirective::WeaponAccuracy => self.weapon_accuracy(ctx, node),
            BonusDirective::SpellCategory => self.spell_category(ctx, node),
            BonusDirective::LimitSpellCategory => self.limit_spell_category(ctx, node),
            BonusDirective::SpecificQuality => self.specific_quality(ctx, node),
            BonusDirective::AddLimb => self.add_limb(ctx, node),
            BonusDirective::PrototypeTranshuman => self.prototype_transhuman(ctx, node),
            BonusDirective::AddContact => self.add_contact(ctx, node),
            BonusDirective::AdeptPowerFreeLevels => self.adept_power_free_levels(ctx, node),
            BonusDirective::Simple(kind) => self.simple_value(ctx, node, kind),
        }
    }

    // ========================================================================
    // Selection plumbing
    // ========================================================================

    /// Resolves a selection in priority order: caller-forced value, a value
    /// popped from the owner's pending queue, then the external prompt.
    fn resolve_selection(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        description: &str,
        options: Option<&[String]>,
    ) -> Result<String, ApplyError> {
        if !self.forced_value.is_empty() {
            self.limit_selection = self.forced_value.clone();
        } else if let Some(pushed) = ctx.character.pending_selections.pop() {
            self.limit_selection = pushed;
        }

        if !self.limit_selection.is_empty() {
            self.selected_value = self.limit_selection.clone();
            return Ok(self.selected_value.clone());
        }

        let result = match options {
            Some(options) => ctx.selection.select_from(description, options),
            None => ctx.selection.select_text(description),
        };
        match result {
            Ok(choice) => {
                self.selected_value = choice.clone();
                Ok(choice)
            }
            Err(SelectionCancelled) => Err(ApplyError::Cancelled),
        }
    }

    /// Root select-text directive: resolves the value, optionally folds it
    /// into the source name, and records it as a text improvement.
    pub(crate) fn resolve_select_text(
        &mut self,
        ctx: &mut ApplyContext<'_>,
    ) -> Result<(), ApplyError> {
        let description = format!("Select a value for {}", ctx.friendly_name);
        let choice = self.resolve_selection(ctx, &description, None)?;
        if ctx.concat_selected {
            ctx.source_name = format!("{} ({choice})", ctx.source_name);
        }
        let improvement =
            Improvement::builder(ImprovementKind::Text, ctx.source, ctx.source_name.clone())
                .improved_name(choice)
                .unique(ctx.unique.clone())
                .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn eval_child(&mut self, ctx: &mut ApplyContext<'_>, node: &BonusNode, tag: &str) -> i32 {
        match node.child_text(tag) {
            Some(text) if !text.is_empty() => self.value_to_int(ctx.character, text, ctx.rating),
            _ => 0,
        }
    }

    /// Magnitude from either a `bonus` or a `val` child.
    fn eval_bonus_value(&mut self, ctx: &mut ApplyContext<'_>, node: &BonusNode) -> i32 {
        let text = node
            .child_text("bonus")
            .or_else(|| node.child_text("val"))
            .unwrap_or("");
        if text.is_empty() {
            0
        } else {
            self.value_to_int(ctx.character, text, ctx.rating)
        }
    }

    // ========================================================================
    // Attribute directives
    // ========================================================================

    fn specific_attribute(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        self.attribute_bonus(ctx, node, name)
    }

    fn select_attribute(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let listed: Vec<String> = node
            .children
            .iter()
            .filter(|child| child.tag == "attribute")
            .map(|child| child.text.clone())
            .collect();
        let excluded: Vec<&str> = node
            .children
            .iter()
            .filter(|child| child.tag == "excludeattribute")
            .map(|child| child.text.as_str())
            .collect();

        let options: Vec<String> = if listed.is_empty() {
            AttributeKind::ALL
                .iter()
                .filter(|kind| match kind {
                    AttributeKind::Magic => ctx.character.flags.contains(CharacterFlags::MAG_ENABLED),
                    AttributeKind::Resonance => ctx.character.resonance_enabled(),
                    AttributeKind::Depth => ctx.character.flags.contains(CharacterFlags::DEP_ENABLED),
                    _ => true,
                })
                .map(|kind| kind.abbrev().to_string())
                .collect()
        } else {
            listed
        };
        let options: Vec<String> = options
            .into_iter()
            .filter(|option| !excluded.contains(&option.as_str()))
            .collect();
        if options.is_empty() {
            return Err(ApplyError::Aborted {
                reason: "no selectable attribute".to_string(),
            });
        }

        let description = format!("Select an attribute for {}", ctx.friendly_name);
        let choice = self.resolve_selection(ctx, &description, Some(&options))?;
        self.attribute_bonus(ctx, node, choice)
    }

    fn attribute_bonus(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
        name: String,
    ) -> Result<(), ApplyError> {
        let value = self.eval_child(ctx, node, "val");
        let minimum = self.eval_child(ctx, node, "min");
        let maximum = self.eval_child(ctx, node, "max");
        let augmented = self.eval_child(ctx, node, "aug");
        let augmented_maximum = self.eval_child(ctx, node, "augmax");
        let improvement =
            Improvement::builder(ImprovementKind::Attribute, ctx.source, ctx.source_name.clone())
                .improved_name(name)
                .unique(ctx.unique.clone())
                .value(value)
                .rating(ctx.rating)
                .minimum(minimum)
                .maximum(maximum)
                .augmented(augmented)
                .augmented_maximum(augmented_maximum)
                .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn attribute_level(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let value = match node.child_text("val") {
            Some(text) if !text.is_empty() => self.value_to_int(ctx.character, text, ctx.rating),
            _ => 1,
        };
        let improvement = Improvement::builder(
            ImprovementKind::Attributelevel,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(ctx.unique.clone())
        .value(value)
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn replace_attribute(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let minimum = self.eval_child(ctx, node, "min");
        let maximum = self.eval_child(ctx, node, "max");
        let improvement = Improvement::builder(
            ImprovementKind::ReplaceAttribute,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(ctx.unique.clone())
        .minimum(minimum)
        .maximum(maximum)
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn enable_attribute(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let flag = match name.as_str() {
            "MAG" => CharacterFlags::MAG_ENABLED,
            "RES" => CharacterFlags::RES_ENABLED,
            "DEP" => CharacterFlags::DEP_ENABLED,
            _ => {
                return Err(ApplyError::Aborted {
                    reason: format!("{name} is not a special attribute"),
                });
            }
        };
        let improvement =
            Improvement::builder(ImprovementKind::Attribute, ctx.source, ctx.source_name.clone())
                .improved_name(name)
                .unique("enableattribute")
                .build();
        self.create_improvement(ctx.character, improvement);
        ctx.character.flags.insert(flag);
        Ok(())
    }

    // ========================================================================
    // Skill directives
    // ========================================================================

    fn select_skill(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let options: Vec<String> = match node.attr("limittoskill") {
            Some(list) => list.split(',').map(|name| name.trim().to_string()).collect(),
            None => ctx
                .character
                .skills
                .skills
                .iter()
                .filter(|skill| skill.enabled)
                .map(|skill| skill.name.clone())
                .collect(),
        };
        if options.is_empty() {
            return Err(ApplyError::Aborted {
                reason: "no selectable skill".to_string(),
            });
        }

        let description = format!("Select a skill for {}", ctx.friendly_name);
        let choice = self.resolve_selection(ctx, &description, Some(&options))?;
        let value = self.eval_bonus_value(ctx, node);
        let improvement =
            Improvement::builder(ImprovementKind::Skill, ctx.source, ctx.source_name.clone())
                .improved_name(choice)
                .unique(ctx.unique.clone())
                .value(value)
                .rating(ctx.rating)
                .add_to_rating(child_flag(node, "applytorating"))
                .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn specific_skill(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let value = self.eval_bonus_value(ctx, node);
        let improvement =
            Improvement::builder(ImprovementKind::Skill, ctx.source, ctx.source_name.clone())
                .improved_name(name)
                .unique(ctx.unique.clone())
                .value(value)
                .rating(ctx.rating)
                .add_to_rating(child_flag(node, "applytorating"))
                .condition(node.child_text("condition").unwrap_or(""))
                .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn skill_group(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let value = self.eval_bonus_value(ctx, node);
        let improvement =
            Improvement::builder(ImprovementKind::SkillGroup, ctx.source, ctx.source_name.clone())
                .improved_name(name)
                .unique(ctx.unique.clone())
                .value(value)
                .rating(ctx.rating)
                .exclude(node.child_text("exclude").unwrap_or(""))
                .add_to_rating(child_flag(node, "applytorating"))
                .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn skill_category(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let value = self.eval_bonus_value(ctx, node);
        let improvement = Improvement::builder(
            ImprovementKind::SkillCategory,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(ctx.unique.clone())
        .value(value)
        .rating(ctx.rating)
        .exclude(node.child_text("exclude").unwrap_or(""))
        .add_to_rating(child_flag(node, "applytorating"))
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn skill_attribute(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
        kind: ImprovementKind,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let value = self.eval_bonus_value(ctx, node);
        let improvement = Improvement::builder(kind, ctx.source, ctx.source_name.clone())
            .improved_name(name)
            .unique(ctx.unique.clone())
            .value(value)
            .rating(ctx.rating)
            .add_to_rating(child_flag(node, "applytorating"))
            .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn swap_skill_attribute(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let attribute = required_child(node, "attribute")?.to_string();
        let target = node
            .child_text("skillname")
            .or_else(|| {
                node.attr("limittoskill")
                    .map(|list| list.split(',').next().unwrap_or("").trim())
            })
            .unwrap_or("")
            .to_string();
        let improvement = Improvement::builder(
            ImprovementKind::SwapSkillAttribute,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(attribute)
        .unique(ctx.unique.clone())
        .target(target)
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn skillsoft_access(&mut self, ctx: &mut ApplyContext<'_>) -> Result<(), ApplyError> {
        let improvement = Improvement::builder(
            ImprovementKind::SkillsoftAccess,
            ctx.source,
            ctx.source_name.clone(),
        )
        .unique(ctx.unique.clone())
        .build();
        self.create_improvement(ctx.character, improvement);
        ctx.character.skills.set_knowsofts_enabled(true);
        Ok(())
    }

    fn forced_knowledge_skill(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let rating = match node.child_text("val") {
            Some(text) if !text.is_empty() => self.value_to_int(ctx.character, text, ctx.rating),
            _ => ctx.rating,
        };
        let id = ctx.character.allocate_internal_id("knowledge");
        ctx.character
            .skills
            .knowledge
            .push(KnowledgeSkill::new(id.clone(), name, rating).knowsoft());
        let improvement = Improvement::builder(
            ImprovementKind::SkillKnowledgeForced,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(id)
        .unique(ctx.unique.clone())
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    // ========================================================================
    // Condition monitor, limits, tabs
    // ========================================================================

    fn condition_monitor(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        const TRACKS: [(&str, ImprovementKind); 6] = [
            ("physical", ImprovementKind::PhysicalCM),
            ("stun", ImprovementKind::StunCM),
            ("threshold", ImprovementKind::CMThreshold),
            ("thresholdoffset", ImprovementKind::CMThresholdOffset),
            ("sharedthresholdoffset", ImprovementKind::CMSharedThresholdOffset),
            ("overflow", ImprovementKind::CMOverflow),
        ];
        for (tag, kind) in TRACKS {
            if node.find(tag).is_none() {
                continue;
            }
            let value = self.eval_child(ctx, node, tag);
            let improvement = Improvement::builder(kind, ctx.source, ctx.source_name.clone())
                .unique(ctx.unique.clone())
                .value(value)
                .rating(ctx.rating)
                .build();
            self.create_improvement(ctx.character, improvement);
        }
        Ok(())
    }

    fn limit_modifier(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let limit = required_child(node, "limit")?.to_string();
        let value = self.eval_child(ctx, node, "value");
        let improvement = Improvement::builder(
            ImprovementKind::LimitModifier,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(limit)
        .unique(ctx.unique.clone())
        .value(value)
        .condition(node.child_text("condition").unwrap_or(""))
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn enable_tab(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        for child in &node.children {
            if child.tag != "name" {
                continue;
            }
            let flag = match child.text.as_str() {
                "Magician" => Some(CharacterFlags::MAGICIAN_TAB),
                "Adept" => Some(CharacterFlags::ADEPT_TAB),
                "Technomancer" => Some(CharacterFlags::TECHNOMANCER_TAB),
                "Advanced Programs" => Some(CharacterFlags::ADVANCED_PROGRAMS_TAB),
                "Critter" => Some(CharacterFlags::CRITTER_TAB),
                "Initiation" => Some(CharacterFlags::INITIATION_TAB),
                _ => None,
            };
            let improvement = Improvement::builder(
                ImprovementKind::SpecialTab,
                ctx.source,
                ctx.source_name.clone(),
            )
            .improved_name(child.text.clone())
            .unique("enabletab")
            .build();
            self.create_improvement(ctx.character, improvement);
            if let Some(flag) = flag {
                ctx.character.flags.insert(flag);
            }
        }
        Ok(())
    }

    fn disable_tab(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        for child in &node.children {
            if child.tag != "name" {
                continue;
            }
            let improvement = Improvement::builder(
                ImprovementKind::SpecialTab,
                ctx.source,
                ctx.source_name.clone(),
            )
            .improved_name(child.text.clone())
            .unique("disabletab")
            .build();
            self.create_improvement(ctx.character, improvement);
            if child.text == "Cyberware" {
                ctx.character.flags.insert(CharacterFlags::CYBERWARE_DISABLED);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Weapon, spell, and grant directives
    // ========================================================================

    fn weapon_category(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
        kind: ImprovementKind,
    ) -> Result<(), ApplyError> {
        let category = required_child(node, "category")?.to_string();
        let value = self.eval_bonus_value(ctx, node);
        let improvement = Improvement::builder(kind, ctx.source, ctx.source_name.clone())
            .improved_name(category)
            .unique(ctx.unique.clone())
            .value(value)
            .rating(ctx.rating)
            .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn weapon_accuracy(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let value = self.eval_child(ctx, node, "value");
        let improvement = Improvement::builder(
            ImprovementKind::WeaponAccuracy,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(ctx.unique.clone())
        .value(value)
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn spell_category(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let value = self.eval_child(ctx, node, "val");
        let improvement = Improvement::builder(
            ImprovementKind::SpellCategory,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(ctx.unique.clone())
        .value(value)
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn limit_spell_category(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let improvement = Improvement::builder(
            ImprovementKind::LimitSpellCategory,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(ctx.unique.clone())
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn specific_quality(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let improvement = Improvement::builder(
            ImprovementKind::SpecificQuality,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(ctx.unique.clone())
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn add_limb(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let slot = required_child(node, "limbslot")?.to_string();
        let value = match node.child_text("val") {
            Some(text) if !text.is_empty() => self.value_to_int(ctx.character, text, ctx.rating),
            _ => 1,
        };
        let improvement =
            Improvement::builder(ImprovementKind::AddLimb, ctx.source, ctx.source_name.clone())
                .improved_name(slot)
                .unique(ctx.unique.clone())
                .value(value)
                .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn prototype_transhuman(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let amount = node.text.trim();
        let parsed = amount.parse::<i32>().unwrap_or(1);
        let improvement = Improvement::builder(
            ImprovementKind::PrototypeTranshuman,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(amount)
        .unique(ctx.unique.clone())
        .build();
        self.create_improvement(ctx.character, improvement);
        ctx.character.prototype_transhuman += parsed;
        Ok(())
    }

    fn add_contact(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let id = ctx.character.allocate_internal_id("contact");
        let name = node.child_text("name").unwrap_or("").to_string();
        let mut contact = Contact::new(id.clone(), name);
        contact.loyalty = self.eval_child(ctx, node, "loyalty").max(1);
        contact.connection = self.eval_child(ctx, node, "connection").max(1);
        contact.group_enabled = !child_flag(node, "forcegroup");
        contact.free = child_flag(node, "free");
        ctx.character.contacts.push(contact);

        let improvement = Improvement::builder(
            ImprovementKind::AddContact,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(id)
        .unique(ctx.unique.clone())
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    fn adept_power_free_levels(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
    ) -> Result<(), ApplyError> {
        let name = required_child(node, "name")?.to_string();
        let extra = node.child_text("extra").unwrap_or("").to_string();
        let levels = match node.child_text("val") {
            Some(text) if !text.is_empty() => self.value_to_int(ctx.character, text, ctx.rating),
            _ => 1,
        };

        let exists = ctx
            .character
            .powers
            .iter()
            .any(|power| power.name == name && power.extra == extra);
        if exists {
            if let Some(power) = ctx
                .character
                .powers
                .iter_mut()
                .find(|power| power.name == name && power.extra == extra)
            {
                power.free_levels += levels;
            }
        } else {
            let id = ctx.character.allocate_internal_id("power");
            let mut power = Power::new(id, name.clone());
            power.extra = extra.clone();
            power.free_levels = levels;
            ctx.character.powers.push(power);
        }

        let improvement = Improvement::builder(
            ImprovementKind::AdeptPowerFreeLevels,
            ctx.source,
            ctx.source_name.clone(),
        )
        .improved_name(name)
        .unique(extra)
        .value(levels)
        .rating(ctx.rating)
        .build();
        self.create_improvement(ctx.character, improvement);
        Ok(())
    }

    // ========================================================================
    // Plain value bonuses
    // ========================================================================

    fn simple_value(
        &mut self,
        ctx: &mut ApplyContext<'_>,
        node: &BonusNode,
        kind: ImprovementKind,
    ) -> Result<(), ApplyError> {
        let value = if node.text.trim().is_empty() {
            0
        } else {
            self.value_to_int(ctx.character, node.text.trim(), ctx.rating)
        };
        let improvement = Improvement::builder(kind, ctx.source, ctx.source_name.clone())
            .unique(ctx.unique.clone())
            .value(value)
            .rating(ctx.rating)
            .build();
        self.create_improvement(ctx.character, improvement);
        grant_side_effect(ctx, kind, value);
        Ok(())
    }
}

/// Capability side effects applied when a plain value bonus is granted; the
/// lifecycle coordinator mirrors these on enable/disable/remove.
fn grant_side_effect(ctx: &mut ApplyContext<'_>, kind: ImprovementKind, value: i32) {
    let flags = &mut ctx.character.flags;
    match kind {
        ImprovementKind::BlackMarketDiscount => flags.insert(CharacterFlags::BLACK_MARKET_DISCOUNT),
        ImprovementKind::FriendsInHighPlaces => {
            flags.insert(CharacterFlags::FRIENDS_IN_HIGH_PLACES)
        }
        ImprovementKind::ExCon => flags.insert(CharacterFlags::EX_CON),
        ImprovementKind::Erased => flags.insert(CharacterFlags::ERASED),
        ImprovementKind::BornRich => flags.insert(CharacterFlags::BORN_RICH),
        ImprovementKind::Fame => flags.insert(CharacterFlags::FAME),
        ImprovementKind::MadeMan => flags.insert(CharacterFlags::MADE_MAN),
        ImprovementKind::Ambidextrous => flags.insert(CharacterFlags::AMBIDEXTROUS),
        ImprovementKind::Overclocker => flags.insert(CharacterFlags::OVERCLOCKER),
        ImprovementKind::RestrictedGear => flags.insert(CharacterFlags::RESTRICTED_GEAR),
        ImprovementKind::TrustFund => ctx.character.trust_fund = value,
        ImprovementKind::Initiation => ctx.character.initiate_grade += value,
        ImprovementKind::Submersion => ctx.character.submersion_grade += value,
        _ => {}
    }
}

fn required_child<'n>(node: &'n BonusNode, tag: &'static str) -> Result<&'n str, ApplyError> {
    match node.child_text(tag) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ApplyError::MissingData {
            tag: node.tag.clone(),
            field: tag,
        }),
    }
}

/// Presence-style boolean child: an empty or truthy text counts as set.
fn child_flag(node: &BonusNode, tag: &str) -> bool {
    node.find(tag)
        .map(|child| {
            child.text.is_empty()
                || child.text.eq_ignore_ascii_case("true")
                || child.text.eq_ignore_ascii_case("yes")
        })
        .unwrap_or(false)
}
