//! End-to-end flows: catalog grants, aggregation, persistence.

use character_core::{
    AttributeKind, Character, CharacterFlags, CharacterId, ImprovementKind, KnowledgeSkill,
};
use character_content::loaders::{CyberwareLoader, GearLoader, QualityLoader};
use character_content::{CyberwareDef, GearDef, QualityDef};
use runtime::{
    CharacterRepository, DenyAllSelection, FileCharacterRepository, ScriptedSelection, Session,
};

fn fresh_character(name: &str) -> Character {
    let mut character = Character::new(CharacterId(1), name);
    character.nuyen = 500_000;
    let rea = character.attributes.get_mut(AttributeKind::Reaction);
    rea.metatype_min = 1;
    rea.base = 3;
    character
}

fn quality(name: &str) -> QualityDef {
    QualityLoader::builtin()
        .into_iter()
        .find(|def| def.name == name)
        .unwrap_or_else(|| panic!("missing quality {name}"))
}

fn gear(name: &str) -> GearDef {
    GearLoader::builtin()
        .into_iter()
        .find(|def| def.name == name)
        .unwrap_or_else(|| panic!("missing gear {name}"))
}

fn cyberware(name: &str) -> CyberwareDef {
    CyberwareLoader::builtin()
        .into_iter()
        .find(|def| def.name == name)
        .unwrap_or_else(|| panic!("missing cyberware {name}"))
}

#[test]
fn initiative_enhancements_compete_instead_of_stacking() {
    runtime::telemetry::init();
    let mut session = Session::new(fresh_character("Case"), ScriptedSelection::default());

    let wired = session.add_cyberware(&cyberware("Wired Reflexes"), 2).unwrap();
    assert_eq!(session.value_of(ImprovementKind::InitiativeDice), 2);
    assert_eq!(session.attribute_total(AttributeKind::Reaction), 6);

    // A second enhancement in the same precedence group contributes only if
    // it beats the current maximum.
    session.add_cyberware(&cyberware("Synaptic Booster"), 1).unwrap();
    assert_eq!(session.value_of(ImprovementKind::InitiativeDice), 2);
    assert_eq!(session.attribute_total(AttributeKind::Reaction), 6);

    // Unplugging the wired reflexes leaves the booster as the best grantor.
    session.set_cyberware_enabled(&wired, false);
    assert_eq!(session.value_of(ImprovementKind::InitiativeDice), 1);
    assert_eq!(session.attribute_total(AttributeKind::Reaction), 5);

    session.set_cyberware_enabled(&wired, true);
    assert_eq!(session.value_of(ImprovementKind::InitiativeDice), 2);
}

#[test]
fn quality_grants_apply_whole_or_not_at_all() {
    let mut session = Session::new(fresh_character("Molly"), DenyAllSelection);

    session.add_quality(&quality("Toughness")).unwrap();
    assert_eq!(session.value_of(ImprovementKind::DamageResistance), 1);
    let committed = session.character().improvements.clone();

    // Exceptional Attribute needs a selection; a cancelled prompt must leave
    // no partial records behind.
    let result = session.add_quality(&quality("Exceptional Attribute"));
    assert!(result.is_err());
    assert_eq!(session.character().improvements, committed);
    assert_eq!(session.character().qualities.len(), 1);
}

#[test]
fn scripted_selection_resolves_attribute_choice() {
    let mut session = Session::new(
        fresh_character("Armitage"),
        ScriptedSelection::new(["REA"]),
    );
    session.add_quality(&quality("Exceptional Attribute")).unwrap();

    let record = session
        .character()
        .improvements
        .iter()
        .find(|imp| imp.kind() == ImprovementKind::Attribute)
        .expect("attribute record created");
    assert_eq!(record.improved_name, "REA");
    assert_eq!(record.maximum, 1);
}

#[test]
fn gear_purchases_round_trip_through_the_wallet() {
    let mut session = Session::new(fresh_character("Dixie"), ScriptedSelection::default());
    let start = session.character().nuyen;

    let mask = session.add_gear(&gear("Ballistic Mask"), 1).unwrap();
    assert_eq!(session.value_of(ImprovementKind::Armor), 2);
    assert_eq!(session.character().nuyen, start - 150);

    let refund = session.remove_gear(&mask);
    assert_eq!(refund, 150);
    assert_eq!(session.character().nuyen, start);
    assert_eq!(session.value_of(ImprovementKind::Armor), 0);
}

#[test]
fn knowsoft_link_controls_knowsoft_skills() {
    let mut character = fresh_character("Flatline");
    character
        .skills
        .knowledge
        .push(KnowledgeSkill::new("know-1", "Military Tech", 4).knowsoft());
    character.skills.set_knowsofts_enabled(false);
    let mut session = Session::new(character, ScriptedSelection::default());

    let link = session.add_gear(&gear("Knowsoft Link"), 1).unwrap();
    assert!(session.character().skills.knowledge.get("know-1").unwrap().enabled);

    let removed = session.remove_gear(&link);
    assert_eq!(removed, 250);
    // Removal (not just disable) drops the bound skills entirely.
    assert!(!session.character().skills.knowledge.contains("know-1"));
}

#[test]
fn matrix_initiative_dice_from_gear_stop_counting_for_technomancers() {
    let mut session = Session::new(fresh_character("Wintermute"), ScriptedSelection::default());
    session.add_gear(&gear("MCT Drone Deck"), 1).unwrap();
    assert_eq!(session.value_of(ImprovementKind::MatrixInitiativeDice), 1);

    session
        .character_mut()
        .flags
        .insert(CharacterFlags::RES_ENABLED);
    let character = session.character().clone();
    session
        .engine_mut()
        .invalidate(&character, ImprovementKind::MatrixInitiativeDice);
    assert_eq!(session.value_of(ImprovementKind::MatrixInitiativeDice), 0);
}

#[test]
fn characters_round_trip_through_the_repository() {
    let dir = tempfile::tempdir().unwrap();
    let repository = FileCharacterRepository::new(dir.path()).unwrap();

    let mut session = Session::new(fresh_character("Case"), ScriptedSelection::default());
    session.add_quality(&quality("Toughness")).unwrap();
    session.add_cyberware(&cyberware("Dermal Plating"), 3).unwrap();
    let armor_before = session.value_of(ImprovementKind::Armor);
    let character = session.into_character();

    repository.save(&character).unwrap();
    assert!(repository.exists("Case"));
    assert_eq!(repository.list_names().unwrap(), vec!["Case".to_string()]);

    let loaded = repository.load("Case").unwrap().expect("save exists");
    assert_eq!(loaded.improvements, character.improvements);
    assert_eq!(loaded.gear, character.gear);
    assert_eq!(loaded.flags, character.flags);

    // A fresh engine over the loaded character reproduces the totals.
    let mut session = Session::new(loaded, ScriptedSelection::default());
    assert_eq!(session.value_of(ImprovementKind::Armor), armor_before);
    assert_eq!(
        session.value_of(ImprovementKind::DamageResistance),
        1
    );

    repository.delete("Case").unwrap();
    assert!(!repository.exists("Case"));
}

#[test]
fn legacy_field_names_migrate_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let repository = FileCharacterRepository::new(dir.path()).unwrap();

    // Build a modern save, then rewrite one record into the legacy shape.
    let mut session = Session::new(fresh_character("Legacy"), ScriptedSelection::default());
    session.add_cyberware(&cyberware("Wired Reflexes"), 1).unwrap();
    let character = session.into_character();

    let mut value = serde_json::to_value(&character).unwrap();
    let improvements = value["improvements"].as_array_mut().unwrap();
    let initiative = improvements
        .iter_mut()
        .find(|entry| entry["improvementtype"] == "InitiativeDice")
        .expect("initiative record present");
    initiative["improvementtype"] = "InitiativePass".into();
    improvements.push(serde_json::json!({
        "improvementtype": "LimitModifier",
        "improvementsource": "Quality",
        "sourcename": "quality-99",
        "improvedname": "Social",
        "exclude": "while intoxicated",
        "val": -1
    }));
    std::fs::write(
        dir.path().join("Legacy.json"),
        serde_json::to_vec_pretty(&value).unwrap(),
    )
    .unwrap();

    let loaded = repository.load("Legacy").unwrap().expect("save exists");
    assert!(
        loaded
            .improvements
            .iter()
            .any(|imp| imp.kind() == ImprovementKind::InitiativeDice)
    );
    let limit = loaded
        .improvements
        .iter()
        .find(|imp| imp.kind() == ImprovementKind::LimitModifier)
        .unwrap();
    assert_eq!(limit.condition, "while intoxicated");
    assert!(limit.exclude.is_empty());
}
