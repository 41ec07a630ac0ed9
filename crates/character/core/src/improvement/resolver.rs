//! Aggregation of effect records into net totals.
//!
//! `value_of` walks an owner's records and computes the net total for one
//! effect kind, honoring grouping tags and the reserved precedence groups.
//! Default-shape queries are memoized in the engine's cache.

use crate::character::Character;

use super::engine::ImprovementEngine;
use super::kind::{ImprovementKind, ImprovementSource};
use super::record::Improvement;

/// Non-default query shape for [`ImprovementEngine::value_of_query`].
#[derive(Clone, Copy, Debug)]
pub struct ValueQuery<'a> {
    /// Only records that apply to a skill's base rating.
    pub add_to_rating: bool,
    /// Only records scoped to this name (empty matches everything).
    pub improved_name: &'a str,
    /// Skip records carrying a condition predicate.
    pub unconditional_only: bool,
}

impl Default for ValueQuery<'_> {
    fn default() -> Self {
        Self {
            add_to_rating: false,
            improved_name: "",
            unconditional_only: true,
        }
    }
}

impl<'a> ValueQuery<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_rating(mut self, value: bool) -> Self {
        self.add_to_rating = value;
        self
    }

    pub fn improved_name(mut self, name: &'a str) -> Self {
        self.improved_name = name;
        self
    }

    pub fn include_conditional(mut self) -> Self {
        self.unconditional_only = false;
        self
    }
}

impl ImprovementEngine {
    /// Net total for `kind` over the owner's enabled records, default query
    /// shape. Cached per (owner, kind).
    pub fn value_of(&mut self, owner: Option<&Character>, kind: ImprovementKind) -> i32 {
        self.value_of_query(owner, kind, ValueQuery::default())
    }

    /// Net total for `kind` with an explicit query shape.
    ///
    /// A missing owner yields 0 without touching the cache, as does a kind
    /// with no matching records.
    pub fn value_of_query(
        &mut self,
        owner: Option<&Character>,
        kind: ImprovementKind,
        query: ValueQuery<'_>,
    ) -> i32 {
        let Some(character) = owner else {
            return 0;
        };

        let default_shape = !query.add_to_rating && query.improved_name.is_empty();
        if default_shape && query.unconditional_only {
            if let Some(cached) = self.cache.get(character.id, kind) {
                return cached;
            }
        }

        let resonance_enabled = character.resonance_enabled();
        let allowed = |improvement: &Improvement| {
            improvement.kind() == kind
                // Carve-out: while the resonance attribute is enabled,
                // gear-granted matrix initiative dice do not stack.
                && !(resonance_enabled
                    && improvement.source() == ImprovementSource::Gear
                    && kind == ImprovementKind::MatrixInitiativeDice)
                && improvement.add_to_rating() == query.add_to_rating
                && (query.improved_name.is_empty()
                    || query.improved_name == improvement.improved_name)
        };

        // Non-custom pass: untagged records sum, tagged records bucket by
        // grouping tag for the precedence rules below.
        let mut value = 0i32;
        let mut pairs: Vec<(&str, i32)> = Vec::new();
        for improvement in &character.improvements {
            if !improvement.is_enabled() || improvement.custom {
                continue;
            }
            if query.unconditional_only && !improvement.condition.is_empty() {
                continue;
            }
            if !allowed(improvement) {
                continue;
            }
            if improvement.unique_name().is_empty() {
                value += improvement.value;
            } else {
                pairs.push((improvement.unique_name(), improvement.value));
            }
        }

        if pairs.iter().any(|&(name, _)| name == "precedence0") {
            // Only the single highest precedence0 entry counts, with any
            // precedence-1 entries summed on top, and the whole group
            // competes against the untagged running total.
            let mut highest = i32::MIN;
            let mut minus_one = 0i32;
            let mut has_minus_one = false;
            for &(name, entry) in &pairs {
                match name {
                    "precedence0" => highest = highest.max(entry),
                    "precedence-1" => {
                        minus_one += entry;
                        has_minus_one = true;
                    }
                    _ => {}
                }
            }
            if has_minus_one {
                highest += minus_one;
            }
            value = value.max(highest);
        } else if pairs.iter().any(|&(name, _)| name == "precedence1") {
            let precedence_sum: i32 = pairs
                .iter()
                .filter(|&&(name, _)| name == "precedence1" || name == "precedence-1")
                .map(|&(_, entry)| entry)
                .sum();
            value = value.max(precedence_sum);
        } else {
            value += sum_of_group_maxima(&pairs);
        }

        // Custom pass: manually authored records aggregate separately, with
        // per-tag maxima but never the precedence special cases.
        let mut custom_value = 0i32;
        let mut custom_pairs: Vec<(&str, i32)> = Vec::new();
        for improvement in &character.improvements {
            if !improvement.custom || !improvement.is_enabled() {
                continue;
            }
            if query.unconditional_only && !improvement.condition.is_empty() {
                continue;
            }
            if !allowed(improvement) {
                continue;
            }
            if improvement.unique_name().is_empty() {
                custom_value += improvement.value;
            } else {
                custom_pairs.push((improvement.unique_name(), improvement.value));
            }
        }
        custom_value += sum_of_group_maxima(&custom_pairs);

        let total = value + custom_value;
        if default_shape {
            self.cache.store(character.id, kind, total);
        }
        total
    }

    /// An attribute's current total: raw base plus scoped attribute
    /// improvements. Used by the formula evaluator's substitutions.
    pub fn attribute_total(
        &mut self,
        owner: &Character,
        kind: crate::character::AttributeKind,
    ) -> i32 {
        owner.attributes.base_total(kind)
            + self.value_of_query(
                Some(owner),
                ImprovementKind::Attribute,
                ValueQuery::new().improved_name(kind.abbrev()),
            )
    }
}

/// For each distinct grouping tag, only the single highest value counts.
fn sum_of_group_maxima(pairs: &[(&str, i32)]) -> i32 {
    let mut total = 0i32;
    let mut seen: Vec<&str> = Vec::new();
    for &(name, _) in pairs {
        if seen.contains(&name) {
            continue;
        }
        seen.push(name);
        let highest = pairs
            .iter()
            .filter(|&&(entry_name, _)| entry_name == name)
            .map(|&(_, entry)| entry)
            .max()
            .unwrap_or(0);
        total += highest;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterId;

    fn character() -> Character {
        Character::new(CharacterId(1), "Case")
    }

    fn engine() -> ImprovementEngine {
        ImprovementEngine::new()
    }

    fn grant(
        engine: &mut ImprovementEngine,
        character: &mut Character,
        kind: ImprovementKind,
        source_name: &str,
        unique: &str,
        value: i32,
    ) {
        let improvement = Improvement::builder(kind, ImprovementSource::Quality, source_name)
            .unique(unique)
            .value(value)
            .build();
        engine.create_improvement(character, improvement);
    }

    #[test]
    fn no_records_resolve_to_zero() {
        let mut engine = engine();
        let character = character();
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Armor), 0);
        assert_eq!(engine.value_of(None, ImprovementKind::Armor), 0);
    }

    #[test]
    fn untagged_records_sum() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Armor, "a", "", 2);
        grant(&mut engine, &mut character, ImprovementKind::Armor, "b", "", 3);
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Armor), 5);
    }

    #[test]
    fn grouped_records_contribute_only_their_maximum() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Dodge, "a", "foo", 4);
        grant(&mut engine, &mut character, ImprovementKind::Dodge, "b", "foo", 9);
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Dodge), 9);
    }

    #[test]
    fn distinct_groups_each_contribute_their_maximum() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Dodge, "a", "foo", 4);
        grant(&mut engine, &mut character, ImprovementKind::Dodge, "b", "foo", 9);
        grant(&mut engine, &mut character, ImprovementKind::Dodge, "c", "bar", 2);
        grant(&mut engine, &mut character, ImprovementKind::Dodge, "d", "", 1);
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Dodge), 12);
    }

    #[test]
    fn precedence0_takes_maximum_not_sum() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Initiative, "a", "precedence0", 3);
        grant(&mut engine, &mut character, ImprovementKind::Initiative, "b", "precedence0", 7);
        grant(&mut engine, &mut character, ImprovementKind::Initiative, "c", "", 2);
        assert_eq!(
            engine.value_of(Some(&character), ImprovementKind::Initiative),
            7
        );

        grant(&mut engine, &mut character, ImprovementKind::Initiative, "d", "precedence-1", 1);
        assert_eq!(
            engine.value_of(Some(&character), ImprovementKind::Initiative),
            8
        );
    }

    #[test]
    fn precedence1_competes_with_the_running_sum() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Reach, "a", "", 2);
        grant(&mut engine, &mut character, ImprovementKind::Reach, "b", "precedence1", 1);
        // Untagged sum (2) wins over precedence1 sum (1).
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Reach), 2);

        grant(&mut engine, &mut character, ImprovementKind::Reach, "c", "precedence1", 2);
        grant(&mut engine, &mut character, ImprovementKind::Reach, "d", "precedence-1", 1);
        // precedence1 + precedence-1 (4) now beats the untagged sum.
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Reach), 4);
    }

    #[test]
    fn custom_records_aggregate_separately_then_add() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Memory, "a", "precedence0", 5);
        let custom = Improvement::builder(
            ImprovementKind::Memory,
            ImprovementSource::Custom,
            "house-rule",
        )
        .custom("GM bonus")
        .value(2)
        .build();
        engine.create_improvement(&mut character, custom);
        // Custom pass never applies the precedence carve-outs, it just sums
        // into the non-custom result.
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Memory), 7);
    }

    #[test]
    fn disabled_and_conditional_records_are_skipped() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Composure, "a", "", 3);
        let conditional = Improvement::builder(
            ImprovementKind::Composure,
            ImprovementSource::Quality,
            "b",
        )
        .value(4)
        .condition("only while calm")
        .build();
        engine.create_improvement(&mut character, conditional);
        let disabled = Improvement::builder(
            ImprovementKind::Composure,
            ImprovementSource::Quality,
            "c",
        )
        .value(5)
        .enabled(false)
        .build();
        engine.create_improvement(&mut character, disabled);

        assert_eq!(
            engine.value_of(Some(&character), ImprovementKind::Composure),
            3
        );
        assert_eq!(
            engine.value_of_query(
                Some(&character),
                ImprovementKind::Composure,
                ValueQuery::new().include_conditional(),
            ),
            7
        );
    }

    #[test]
    fn scoped_queries_filter_by_improved_name() {
        let mut engine = engine();
        let mut character = character();
        let pistols = Improvement::builder(
            ImprovementKind::Skill,
            ImprovementSource::Quality,
            "a",
        )
        .improved_name("Pistols")
        .value(2)
        .build();
        engine.create_improvement(&mut character, pistols);
        let clubs = Improvement::builder(ImprovementKind::Skill, ImprovementSource::Quality, "b")
            .improved_name("Clubs")
            .value(3)
            .build();
        engine.create_improvement(&mut character, clubs);

        assert_eq!(
            engine.value_of_query(
                Some(&character),
                ImprovementKind::Skill,
                ValueQuery::new().improved_name("Pistols"),
            ),
            2
        );
        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Skill), 5);
    }

    #[test]
    fn rating_only_records_need_a_rating_query() {
        let mut engine = engine();
        let mut character = character();
        let rating_bonus = Improvement::builder(
            ImprovementKind::Skill,
            ImprovementSource::Cyberware,
            "chipjack",
        )
        .improved_name("Pistols")
        .value(2)
        .add_to_rating(true)
        .build();
        engine.create_improvement(&mut character, rating_bonus);

        assert_eq!(engine.value_of(Some(&character), ImprovementKind::Skill), 0);
        assert_eq!(
            engine.value_of_query(
                Some(&character),
                ImprovementKind::Skill,
                ValueQuery::new().add_to_rating(true).improved_name("Pistols"),
            ),
            2
        );
    }

    #[test]
    fn repeated_queries_are_idempotent_and_cached() {
        let mut engine = engine();
        let mut character = character();
        grant(&mut engine, &mut character, ImprovementKind::Armor, "a", "", 4);

        let first = engine.value_of(Some(&character), ImprovementKind::Armor);
        let second = engine.value_of(Some(&character), ImprovementKind::Armor);
        assert_eq!(first, second);
        assert_eq!(engine.cache.get(character.id, ImprovementKind::Armor), Some(4));
    }

    #[test]
    fn gear_matrix_initiative_dice_ignored_while_resonance_enabled() {
        use crate::character::CharacterFlags;

        let mut engine = engine();
        let mut character = character();
        let gear = Improvement::builder(
            ImprovementKind::MatrixInitiativeDice,
            ImprovementSource::Gear,
            "deck",
        )
        .value(3)
        .build();
        engine.create_improvement(&mut character, gear);

        assert_eq!(
            engine.value_of(Some(&character), ImprovementKind::MatrixInitiativeDice),
            3
        );

        character.flags.insert(CharacterFlags::RES_ENABLED);
        engine.invalidate(&character, ImprovementKind::MatrixInitiativeDice);
        assert_eq!(
            engine.value_of(Some(&character), ImprovementKind::MatrixInitiativeDice),
            0
        );
    }
}
