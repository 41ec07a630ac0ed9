//! The engine embedding consumed by hosts.

use character_core::{
    ApplyError, AttributeKind, Character, Cyberware, Gear, ImprovementEngine, ImprovementKind,
    ImprovementSource, Quality, SelectionOracle, ValueQuery,
};
use character_content::{CyberwareDef, GearDef, QualityDef};
use tracing::info;

/// One character, one engine, one selection provider.
///
/// All catalog grants and revocations go through here so that every record
/// mutation reaches the engine and its cache. The selection provider is
/// fixed at construction; interactive hosts pass their prompt bridge,
/// batch tooling passes a scripted provider.
pub struct Session<S: SelectionOracle> {
    character: Character,
    engine: ImprovementEngine,
    selection: S,
}

impl<S: SelectionOracle> Session<S> {
    pub fn new(character: Character, selection: S) -> Self {
        Self {
            character,
            engine: ImprovementEngine::new(),
            selection,
        }
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn character_mut(&mut self) -> &mut Character {
        &mut self.character
    }

    pub fn into_character(self) -> Character {
        self.character
    }

    pub fn engine_mut(&mut self) -> &mut ImprovementEngine {
        &mut self.engine
    }

    /// Net improvement total for `kind` (default query shape).
    pub fn value_of(&mut self, kind: ImprovementKind) -> i32 {
        self.engine.value_of(Some(&self.character), kind)
    }

    /// Net improvement total with an explicit query shape.
    pub fn value_of_query(&mut self, kind: ImprovementKind, query: ValueQuery<'_>) -> i32 {
        self.engine.value_of_query(Some(&self.character), kind, query)
    }

    /// Attribute total including improvements.
    pub fn attribute_total(&mut self, kind: AttributeKind) -> i32 {
        self.engine.attribute_total(&self.character, kind)
    }

    /// Forces the next selection prompt to this value.
    pub fn set_forced_value(&mut self, value: impl Into<String>) {
        self.engine.set_forced_value(value);
    }

    // ========================================================================
    // Qualities
    // ========================================================================

    /// Grants a quality from the catalog. Returns the new internal id.
    pub fn add_quality(&mut self, def: &QualityDef) -> Result<String, ApplyError> {
        let id = self.character.allocate_internal_id("quality");
        self.engine.create_improvements(
            Some(&mut self.character),
            &mut self.selection,
            ImprovementSource::Quality,
            &id,
            def.bonus.as_ref(),
            false,
            1,
            &def.name,
        )?;
        self.character.qualities.push(Quality {
            internal_id: id.clone(),
            name: def.name.clone(),
            karma: def.karma,
            positive: def.positive,
        });
        info!(quality = %def.name, id = %id, "quality added");
        Ok(id)
    }

    /// Revokes a quality and everything it granted. Returns the refund.
    pub fn remove_quality(&mut self, id: &str) -> i64 {
        let refund =
            self.engine
                .remove_improvements(&mut self.character, ImprovementSource::Quality, Some(id));
        self.character.qualities.remove(id);
        self.character.nuyen += refund;
        refund
    }

    // ========================================================================
    // Gear
    // ========================================================================

    /// Buys a piece of gear from the catalog. Returns the new internal id.
    pub fn add_gear(&mut self, def: &GearDef, rating: i32) -> Result<String, ApplyError> {
        let rating = if def.max_rating > 0 {
            rating.clamp(1, def.max_rating)
        } else {
            rating.max(1)
        };
        let id = self.character.allocate_internal_id("gear");
        self.engine.create_improvements(
            Some(&mut self.character),
            &mut self.selection,
            ImprovementSource::Gear,
            &id,
            def.bonus.as_ref(),
            false,
            rating,
            &def.name,
        )?;
        self.character
            .gear
            .push(Gear::new(id.clone(), def.name.clone(), def.cost));
        self.character.nuyen -= def.cost;
        Ok(id)
    }

    /// Sells a piece of gear back. Returns the refund.
    pub fn remove_gear(&mut self, id: &str) -> i64 {
        let mut refund =
            self.engine
                .remove_improvements(&mut self.character, ImprovementSource::Gear, Some(id));
        if let Some(item) = self.character.gear.remove(id) {
            refund += item.total_cost();
        }
        self.character.nuyen += refund;
        refund
    }

    // ========================================================================
    // Cyberware
    // ========================================================================

    /// Installs a piece of cyberware from the catalog.
    pub fn add_cyberware(&mut self, def: &CyberwareDef, rating: i32) -> Result<String, ApplyError> {
        let rating = if def.max_rating > 0 {
            rating.clamp(1, def.max_rating)
        } else {
            rating.max(1)
        };
        let id = self.character.allocate_internal_id("cyberware");
        self.engine.create_improvements(
            Some(&mut self.character),
            &mut self.selection,
            ImprovementSource::Cyberware,
            &id,
            def.bonus.as_ref(),
            false,
            rating,
            &def.name,
        )?;
        let mut item = Cyberware::new(id.clone(), def.name.clone(), def.cost);
        item.grade = def.grade.clone();
        self.character.cyberware.push(item);
        self.character.nuyen -= def.cost;
        Ok(id)
    }

    /// Uninstalls a piece of cyberware. Returns the refund.
    pub fn remove_cyberware(&mut self, id: &str) -> i64 {
        let mut refund = self.engine.remove_improvements(
            &mut self.character,
            ImprovementSource::Cyberware,
            Some(id),
        );
        if let Some(item) = self.character.cyberware.remove(id) {
            refund += item.total_cost();
        }
        self.character.nuyen += refund;
        refund
    }

    /// Plugs a modular piece in or out without uninstalling it.
    pub fn set_cyberware_enabled(&mut self, id: &str, enabled: bool) {
        if enabled {
            self.engine
                .enable_improvements(&mut self.character, ImprovementSource::Cyberware, id);
        } else {
            self.engine
                .disable_improvements(&mut self.character, ImprovementSource::Cyberware, id);
        }
        if let Some(item) = self.character.cyberware.get_mut(id) {
            item.equipped = enabled;
        }
    }
}
