//! Dependent sub-objects granted to (or bought by) a character.
//!
//! These are deliberately thin: the engine only needs identity, the money a
//! deletion refunds, and the handful of toggles the lifecycle coordinator
//! flips. Rich rules text, availability, page references and the rest belong
//! to the content layer.

use super::arena::HasId;

/// A positive or negative quality.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quality {
    pub internal_id: String,
    pub name: String,
    pub karma: i32,
    pub positive: bool,
}

impl HasId for Quality {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A known spell.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spell {
    pub internal_id: String,
    pub name: String,
    pub category: String,
}

impl HasId for Spell {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A technomancer complex form.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComplexForm {
    pub internal_id: String,
    pub name: String,
}

impl HasId for ComplexForm {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A piece of gear, possibly with nested accessories.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gear {
    pub internal_id: String,
    pub name: String,
    pub cost: i64,
    pub equipped: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Gear>,
}

impl Gear {
    pub fn new(internal_id: impl Into<String>, name: impl Into<String>, cost: i64) -> Self {
        Self {
            internal_id: internal_id.into(),
            name: name.into(),
            cost,
            equipped: true,
            children: Vec::new(),
        }
    }

    /// Cost of this item and everything nested under it.
    pub fn total_cost(&self) -> i64 {
        self.cost + self.children.iter().map(Gear::total_cost).sum::<i64>()
    }

    pub fn set_equipped(&mut self, equipped: bool) {
        self.equipped = equipped;
        for child in &mut self.children {
            child.set_equipped(equipped);
        }
    }
}

impl HasId for Gear {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A weapon, possibly with nested under-barrel weapons.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Weapon {
    pub internal_id: String,
    pub name: String,
    pub cost: i64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Weapon>,
}

impl Weapon {
    pub fn new(internal_id: impl Into<String>, name: impl Into<String>, cost: i64) -> Self {
        Self {
            internal_id: internal_id.into(),
            name: name.into(),
            cost,
            children: Vec::new(),
        }
    }

    pub fn total_cost(&self) -> i64 {
        self.cost + self.children.iter().map(Weapon::total_cost).sum::<i64>()
    }

    /// Depth-first search over this weapon and its children.
    pub fn find(&self, id: &str) -> Option<&Weapon> {
        if self.internal_id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Detaches the weapon with the given id from this subtree.
    pub fn remove_child(&mut self, id: &str) -> Option<Weapon> {
        if let Some(index) = self.children.iter().position(|w| w.internal_id == id) {
            return Some(self.children.remove(index));
        }
        self.children
            .iter_mut()
            .find_map(|child| child.remove_child(id))
    }
}

impl HasId for Weapon {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// An installed piece of cyberware or bioware.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cyberware {
    pub internal_id: String,
    pub name: String,
    pub cost: i64,
    /// Grade name, e.g. `"Standard"` or `"Standard (Adapsin)"`.
    pub grade: String,
    /// Modular pieces can be unplugged without surgery.
    pub equipped: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<Cyberware>,
}

impl Cyberware {
    pub fn new(internal_id: impl Into<String>, name: impl Into<String>, cost: i64) -> Self {
        Self {
            internal_id: internal_id.into(),
            name: name.into(),
            cost,
            grade: "Standard".to_string(),
            equipped: true,
            children: Vec::new(),
        }
    }

    pub fn total_cost(&self) -> i64 {
        self.cost + self.children.iter().map(Cyberware::total_cost).sum::<i64>()
    }

    /// Applies `f` to this item and every nested child.
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Cyberware)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }
}

impl HasId for Cyberware {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// An adept power.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Power {
    pub internal_id: String,
    pub name: String,
    /// Disambiguates powers taken multiple times with different targets.
    pub extra: String,
    /// Levels bought with power points.
    pub rating: i32,
    /// Levels granted for free by improvements.
    pub free_levels: i32,
    /// Whether the power currently benefits from a way discount.
    pub discounted: bool,
}

impl Power {
    pub fn new(internal_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            internal_id: internal_id.into(),
            name: name.into(),
            extra: String::new(),
            rating: 0,
            free_levels: 0,
            discounted: false,
        }
    }

    /// Bought plus granted levels.
    pub fn total_rating(&self) -> i32 {
        self.rating + self.free_levels
    }
}

impl HasId for Power {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A martial-art technique nested under a [`MartialArt`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MartialArtTechnique {
    pub internal_id: String,
    pub name: String,
}

impl HasId for MartialArtTechnique {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A martial art with its owned techniques.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MartialArt {
    pub internal_id: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub techniques: Vec<MartialArtTechnique>,
}

impl HasId for MartialArt {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// An initiate metamagic or submersion echo.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metamagic {
    pub internal_id: String,
    pub name: String,
    pub grade: i32,
    /// True for submersion echoes, false for initiation metamagics.
    pub echo: bool,
}

impl HasId for Metamagic {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A critter power.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CritterPower {
    pub internal_id: String,
    pub name: String,
    pub extra: String,
}

impl HasId for CritterPower {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A mentor spirit (or paragon).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MentorSpirit {
    pub internal_id: String,
    pub name: String,
}

impl HasId for MentorSpirit {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// An AI program.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AiProgram {
    pub internal_id: String,
    pub name: String,
}

impl HasId for AiProgram {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

/// A contact.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contact {
    pub internal_id: String,
    pub name: String,
    pub loyalty: i32,
    pub connection: i32,
    pub group_enabled: bool,
    pub free: bool,
    pub forced_loyalty: i32,
}

impl Contact {
    pub fn new(internal_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            internal_id: internal_id.into(),
            name: name.into(),
            loyalty: 1,
            connection: 1,
            group_enabled: true,
            free: false,
            forced_loyalty: 0,
        }
    }
}

impl HasId for Contact {
    fn internal_id(&self) -> &str {
        &self.internal_id
    }
}
