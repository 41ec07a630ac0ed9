//! Character attributes and their canonical abbreviations.

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// The closed set of character attributes.
///
/// The three special attributes (MAG, RES, DEP) exist on every character but
/// only contribute while the matching capability flag is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, IntoStaticStr)]
pub enum AttributeKind {
    #[strum(serialize = "BOD")]
    Body,
    #[strum(serialize = "AGI")]
    Agility,
    #[strum(serialize = "REA")]
    Reaction,
    #[strum(serialize = "STR")]
    Strength,
    #[strum(serialize = "CHA")]
    Charisma,
    #[strum(serialize = "INT")]
    Intuition,
    #[strum(serialize = "LOG")]
    Logic,
    #[strum(serialize = "WIL")]
    Willpower,
    #[strum(serialize = "EDG")]
    Edge,
    #[strum(serialize = "MAG")]
    Magic,
    #[strum(serialize = "RES")]
    Resonance,
    #[strum(serialize = "DEP")]
    Depth,
}

impl AttributeKind {
    /// All attributes in canonical order.
    pub const ALL: [AttributeKind; 12] = [
        AttributeKind::Body,
        AttributeKind::Agility,
        AttributeKind::Reaction,
        AttributeKind::Strength,
        AttributeKind::Charisma,
        AttributeKind::Intuition,
        AttributeKind::Logic,
        AttributeKind::Willpower,
        AttributeKind::Edge,
        AttributeKind::Magic,
        AttributeKind::Resonance,
        AttributeKind::Depth,
    ];

    /// Canonical abbreviation, e.g. `"BOD"`.
    pub fn abbrev(self) -> &'static str {
        self.into()
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// One attribute's raw values, before improvement aggregation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    /// Metatype minimum.
    pub metatype_min: i32,
    /// Metatype maximum.
    pub metatype_max: i32,
    /// Points bought at creation.
    pub base: i32,
    /// Points bought with karma.
    pub karma: i32,
}

impl Attribute {
    /// Total before improvement aggregation: minimum plus purchased points.
    pub fn base_total(&self) -> i32 {
        self.metatype_min + self.base + self.karma
    }
}

/// All twelve attributes, indexed by [`AttributeKind`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSet {
    values: [Attribute; 12],
}

impl AttributeSet {
    pub fn get(&self, kind: AttributeKind) -> &Attribute {
        &self.values[kind.index()]
    }

    pub fn get_mut(&mut self, kind: AttributeKind) -> &mut Attribute {
        &mut self.values[kind.index()]
    }

    /// Raw total for `kind`, before improvement aggregation.
    ///
    /// The improvement-inclusive total lives on the engine side, because it
    /// needs the resolver: see `ImprovementEngine::attribute_total`.
    pub fn base_total(&self, kind: AttributeKind) -> i32 {
        self.get(kind).base_total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_round_trip() {
        for kind in AttributeKind::ALL {
            assert_eq!(kind.abbrev().parse::<AttributeKind>(), Ok(kind));
        }
    }

    #[test]
    fn base_total_sums_components() {
        let mut set = AttributeSet::default();
        let bod = set.get_mut(AttributeKind::Body);
        bod.metatype_min = 1;
        bod.base = 3;
        bod.karma = 2;
        assert_eq!(set.base_total(AttributeKind::Body), 6);
        assert_eq!(set.base_total(AttributeKind::Agility), 0);
    }
}
