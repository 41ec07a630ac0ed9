//! The improvement engine.
//!
//! Improvements are discrete bonus grants (attribute boosts, skill-pool
//! modifiers, cost multipliers, capability flags) attached to a character by
//! many kinds of sources. This module owns the whole pipeline:
//!
//! 1. **Records** ([`Improvement`]): immutable-identity value objects.
//! 2. **Interpretation** ([`ImprovementEngine::create_improvements`]):
//!    turns a declarative [`BonusNode`] tree into records inside a
//!    transaction, with all-or-nothing commit semantics.
//! 3. **Resolution** ([`ImprovementEngine::value_of`]): aggregates records
//!    into net totals under grouping and precedence rules, memoized per
//!    (owner, kind).
//! 4. **Lifecycle**: bulk enable/disable/remove with duplicate-aware
//!    capability side effects and recursive sub-object deletion.
mod bonus;
mod cache;
mod engine;
mod formula;
mod handlers;
mod kind;
mod lifecycle;
mod record;
mod resolver;

pub use bonus::{BonusDirective, BonusNode};
pub use engine::{ApplyError, ImprovementEngine};
pub use kind::{ImprovementKind, ImprovementSource};
pub use record::{Improvement, ImprovementBuilder, RecordParseError};
pub use resolver::ValueQuery;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{
        Character, CharacterFlags, CharacterId, Gear, KnowledgeOrigin, MentorSpirit, Skill,
    };
    use crate::selection::{SelectionCancelled, SelectionOracle, SelectionResult};

    /// Scripted selection collaborator: answers from a queue, cancels when
    /// the queue runs dry.
    struct Scripted {
        answers: Vec<String>,
        prompts: usize,
    }

    impl Scripted {
        fn with(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().rev().map(|s| s.to_string()).collect(),
                prompts: 0,
            }
        }

        fn empty() -> Self {
            Self::with(&[])
        }
    }

    impl SelectionOracle for Scripted {
        fn select_text(&mut self, _description: &str) -> SelectionResult {
            self.prompts += 1;
            self.answers.pop().ok_or(SelectionCancelled)
        }

        fn select_from(&mut self, _description: &str, _options: &[String]) -> SelectionResult {
            self.prompts += 1;
            self.answers.pop().ok_or(SelectionCancelled)
        }
    }

    fn character() -> Character {
        Character::new(CharacterId(1), "Case")
    }

    #[test]
    fn empty_bonus_succeeds_and_clears_forced_state() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();
        engine.set_forced_value("leftover");

        let result = engine.create_improvements(
            Some(&mut owner),
            &mut selection,
            ImprovementSource::Quality,
            "quality-1",
            None,
            false,
            1,
            "",
        );
        assert!(result.is_ok());
        assert!(owner.improvements.is_empty());

        // The cleared forced value must not leak into the next call.
        let bonus = BonusNode::new("bonus").child(BonusNode::new("selecttext"));
        let mut selection = Scripted::with(&["Fire"]);
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-2",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert_eq!(selection.prompts, 1);
        assert_eq!(engine.selected_value(), "Fire");
    }

    #[test]
    fn missing_owner_is_a_no_op_success() {
        let mut engine = ImprovementEngine::new();
        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus").child_value("armor", "2");
        let result = engine.create_improvements(
            None,
            &mut selection,
            ImprovementSource::Gear,
            "gear-1",
            Some(&bonus),
            false,
            1,
            "",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn simple_bonus_commits_records() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus")
            .child_value("armor", "2")
            .child_value("damageresistance", "Rating * 2");

        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&bonus),
                false,
                3,
                "Toughness",
            )
            .unwrap();

        assert_eq!(owner.improvements.len(), 2);
        assert_eq!(engine.value_of(Some(&owner), ImprovementKind::Armor), 2);
        assert_eq!(
            engine.value_of(Some(&owner), ImprovementKind::DamageResistance),
            6
        );
        assert_eq!(owner.change_counter.batches, 1);
    }

    #[test]
    fn cancelled_selection_rolls_back_everything() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();

        // Commit one unrelated grant first; rollback must not touch it.
        let mut selection = Scripted::empty();
        let prior = BonusNode::new("bonus").child_value("armor", "1");
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&prior),
                false,
                1,
                "",
            )
            .unwrap();
        let baseline = owner.improvements.clone();

        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus")
            .child_value("reach", "1")
            .child(BonusNode::new("selectskill").child_value("val", "2"));
        let mut skilled = owner.clone();
        skilled
            .skills
            .skills
            .push(Skill::new("skill-1", "Pistols", "Combat Active", 3));

        let result = engine.create_improvements(
            Some(&mut skilled),
            &mut selection,
            ImprovementSource::Quality,
            "quality-2",
            Some(&bonus),
            false,
            1,
            "",
        );
        assert_eq!(result, Err(ApplyError::Cancelled));
        assert_eq!(skilled.improvements, baseline);
        assert_eq!(
            engine.value_of(Some(&skilled), ImprovementKind::Reach),
            0
        );
    }

    #[test]
    fn unknown_tag_with_children_rolls_back() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus")
            .child_value("armor", "4")
            .child(BonusNode::new("frobnicate").child_value("name", "x"));

        let result = engine.create_improvements(
            Some(&mut owner),
            &mut selection,
            ImprovementSource::Quality,
            "quality-1",
            Some(&bonus),
            false,
            1,
            "",
        );
        assert_eq!(
            result,
            Err(ApplyError::UnknownTag {
                tag: "frobnicate".to_string()
            })
        );
        assert!(owner.improvements.is_empty());
        assert_eq!(engine.value_of(Some(&owner), ImprovementKind::Armor), 0);
    }

    #[test]
    fn unknown_childless_tags_and_comments_are_tolerated() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus")
            .child(BonusNode::with_text("#comment", "authoring note"))
            .child(BonusNode::new("notyetsupported"))
            .child_value("dodge", "1");

        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert_eq!(owner.improvements.len(), 1);
    }

    #[test]
    fn select_text_concatenates_into_source_name() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::with(&["Fire"]);
        let bonus = BonusNode::new("bonus")
            .child(BonusNode::new("selecttext"))
            .child_value("armor", "1");

        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&bonus),
                true,
                1,
                "Elemental Resistance",
            )
            .unwrap();

        assert_eq!(engine.selected_value(), "Fire");
        let text = owner
            .improvements
            .iter()
            .find(|imp| imp.kind() == ImprovementKind::Text)
            .unwrap();
        assert_eq!(text.improved_name, "Fire");
        assert_eq!(text.source_name(), "quality-1 (Fire)");
        let armor = owner
            .improvements
            .iter()
            .find(|imp| imp.kind() == ImprovementKind::Armor)
            .unwrap();
        assert_eq!(armor.source_name(), "quality-1 (Fire)");
    }

    #[test]
    fn forced_value_beats_queue_beats_prompt() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        owner.pending_selections.push("Queued".to_string());
        let bonus = BonusNode::new("bonus").child(BonusNode::new("selecttext"));

        engine.set_forced_value("Forced");
        let mut selection = Scripted::with(&["Prompted"]);
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert_eq!(engine.selected_value(), "Forced");
        assert_eq!(selection.prompts, 0);
        // The queued value is still pending.
        assert_eq!(owner.pending_selections.len(), 1);

        let mut selection = Scripted::with(&["Prompted"]);
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-2",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert_eq!(engine.selected_value(), "Queued");
        assert_eq!(selection.prompts, 0);
        assert!(owner.pending_selections.is_empty());

        let mut selection = Scripted::with(&["Prompted"]);
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-3",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert_eq!(engine.selected_value(), "Prompted");
        assert_eq!(selection.prompts, 1);
    }

    #[test]
    fn add_then_remove_restores_resolver_totals() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();

        let prior = BonusNode::new("bonus").child_value("armor", "1");
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&prior),
                false,
                1,
                "",
            )
            .unwrap();
        let before = engine.value_of(Some(&owner), ImprovementKind::Armor);

        let extra = BonusNode::new("bonus").child_value("armor", "3");
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Gear,
                "gear-1",
                Some(&extra),
                false,
                1,
                "",
            )
            .unwrap();
        assert_eq!(engine.value_of(Some(&owner), ImprovementKind::Armor), 4);

        engine.remove_improvements(&mut owner, ImprovementSource::Gear, Some("gear-1"));
        assert_eq!(engine.value_of(Some(&owner), ImprovementKind::Armor), before);
    }

    #[test]
    fn enable_attribute_sets_flags_and_enable_tab_unlocks_tabs() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus")
            .child(BonusNode::new("enableattribute").child_value("name", "MAG"))
            .child(BonusNode::new("enabletab").child_value("name", "Adept"));

        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert!(owner.flags.contains(CharacterFlags::MAG_ENABLED));
        assert!(owner.flags.contains(CharacterFlags::ADEPT_TAB));

        engine.remove_improvements(&mut owner, ImprovementSource::Quality, Some("quality-1"));
        assert!(!owner.flags.contains(CharacterFlags::MAG_ENABLED));
        assert!(!owner.flags.contains(CharacterFlags::ADEPT_TAB));
    }

    #[test]
    fn duplicate_grantors_keep_flags_alive_until_the_last_one_goes() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus").child(BonusNode::new("fame"));

        for source_name in ["quality-1", "quality-2"] {
            engine
                .create_improvements(
                    Some(&mut owner),
                    &mut selection,
                    ImprovementSource::Quality,
                    source_name,
                    Some(&bonus),
                    false,
                    1,
                    "",
                )
                .unwrap();
        }
        assert!(owner.flags.contains(CharacterFlags::FAME));

        engine.disable_improvements(&mut owner, ImprovementSource::Quality, "quality-1");
        assert!(owner.flags.contains(CharacterFlags::FAME));

        engine.disable_improvements(&mut owner, ImprovementSource::Quality, "quality-2");
        assert!(!owner.flags.contains(CharacterFlags::FAME));

        engine.enable_improvements(&mut owner, ImprovementSource::Quality, "quality-1");
        assert!(owner.flags.contains(CharacterFlags::FAME));
    }

    #[test]
    fn lifecycle_batches_one_notification_per_call() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus")
            .child_value("armor", "1")
            .child_value("dodge", "1")
            .child_value("reach", "1");

        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert_eq!(owner.change_counter.batches, 1);

        engine.disable_improvements(&mut owner, ImprovementSource::Quality, "quality-1");
        assert_eq!(owner.change_counter.batches, 2);

        engine.remove_improvements(&mut owner, ImprovementSource::Quality, Some("quality-1"));
        assert_eq!(owner.change_counter.batches, 3);
        assert!(owner.improvements.is_empty());
    }

    #[test]
    fn removing_a_mentor_grant_cascades_into_its_records_and_refunds_gear() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();

        // A quality grants a mentor spirit; the mentor grants a reach bonus
        // and a gear item worth 400.
        owner
            .mentor_spirits
            .push(MentorSpirit {
                internal_id: "mentor-1".to_string(),
                name: "Rat".to_string(),
            });
        owner.gear.push(Gear::new("gear-1", "Fetish", 400));

        let quality_record = Improvement::builder(
            ImprovementKind::MentorSpirit,
            ImprovementSource::Quality,
            "quality-1",
        )
        .improved_name("mentor-1")
        .build();
        engine.create_improvement(&mut owner, quality_record);

        let mentor_reach = Improvement::builder(
            ImprovementKind::Reach,
            ImprovementSource::MentorSpirit,
            "mentor-1",
        )
        .value(1)
        .build();
        engine.create_improvement(&mut owner, mentor_reach);
        let mentor_gear = Improvement::builder(
            ImprovementKind::Gear,
            ImprovementSource::MentorSpirit,
            "mentor-1",
        )
        .improved_name("gear-1")
        .build();
        engine.create_improvement(&mut owner, mentor_gear);

        let refund =
            engine.remove_improvements(&mut owner, ImprovementSource::Quality, Some("quality-1"));
        assert_eq!(refund, 400);
        assert!(owner.improvements.is_empty());
        assert!(owner.mentor_spirits.is_empty());
        assert!(owner.gear.is_empty());
        assert_eq!(engine.value_of(Some(&owner), ImprovementKind::Reach), 0);
    }

    #[test]
    fn skillsoft_access_toggles_and_removal_drops_knowsofts() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        owner
            .skills
            .knowledge
            .push(crate::character::KnowledgeSkill::new("know-1", "History", 2));
        owner.skills.knowledge.push(
            crate::character::KnowledgeSkill::new("know-2", "Engineering", 3).knowsoft(),
        );
        // Knowsofts sit disabled until access is granted.
        owner.skills.set_knowsofts_enabled(false);

        let mut selection = Scripted::empty();
        let bonus = BonusNode::new("bonus").child(BonusNode::new("skillsoftaccess"));
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Gear,
                "gear-1",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();
        assert!(owner.skills.knowledge.get("know-2").unwrap().enabled);

        engine.disable_improvements(&mut owner, ImprovementSource::Gear, "gear-1");
        assert!(!owner.skills.knowledge.get("know-2").unwrap().enabled);
        assert!(owner.skills.knowledge.get("know-1").unwrap().enabled);

        engine.remove_improvements(&mut owner, ImprovementSource::Gear, Some("gear-1"));
        assert!(owner.skills.knowledge.contains("know-1"));
        assert!(!owner.skills.knowledge.contains("know-2"));
        assert_eq!(
            owner
                .skills
                .knowledge
                .iter()
                .filter(|skill| skill.origin == KnowledgeOrigin::Knowsoft)
                .count(),
            0
        );
    }

    #[test]
    fn nested_selection_uses_registered_options() {
        let mut engine = ImprovementEngine::new();
        let mut owner = character();
        owner
            .skills
            .skills
            .push(Skill::new("skill-1", "Pistols", "Combat Active", 3));
        owner
            .skills
            .skills
            .push(Skill::new("skill-2", "Clubs", "Combat Active", 2));

        let mut selection = Scripted::with(&["Pistols"]);
        let bonus = BonusNode::new("bonus")
            .child(BonusNode::new("selectskill").child_value("val", "2"));
        engine
            .create_improvements(
                Some(&mut owner),
                &mut selection,
                ImprovementSource::Quality,
                "quality-1",
                Some(&bonus),
                false,
                1,
                "",
            )
            .unwrap();

        assert_eq!(
            engine.value_of_query(
                Some(&owner),
                ImprovementKind::Skill,
                ValueQuery::new().improved_name("Pistols"),
            ),
            2
        );
    }
}
