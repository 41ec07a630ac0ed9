//! Capability flags toggled by the improvement lifecycle.

use bitflags::bitflags;

bitflags! {
    /// Boolean capabilities granted (and revoked) by improvements.
    ///
    /// The lifecycle coordinator is the only writer: a flag granted by two
    /// different sources stays set until the last enabled grantor goes away.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct CharacterFlags: u32 {
        /// MAG special attribute is available.
        const MAG_ENABLED = 1 << 0;
        /// RES special attribute is available.
        const RES_ENABLED = 1 << 1;
        /// DEP special attribute is available.
        const DEP_ENABLED = 1 << 2;

        /// Magician tab unlocked.
        const MAGICIAN_TAB = 1 << 3;
        /// Adept tab unlocked.
        const ADEPT_TAB = 1 << 4;
        /// Technomancer tab unlocked.
        const TECHNOMANCER_TAB = 1 << 5;
        /// Advanced Programs tab unlocked.
        const ADVANCED_PROGRAMS_TAB = 1 << 6;
        /// Critter powers tab unlocked.
        const CRITTER_TAB = 1 << 7;
        /// Initiation tab unlocked.
        const INITIATION_TAB = 1 << 8;
        /// Cyberware acquisition locked out.
        const CYBERWARE_DISABLED = 1 << 9;

        const BLACK_MARKET_DISCOUNT = 1 << 10;
        const FRIENDS_IN_HIGH_PLACES = 1 << 11;
        const EX_CON = 1 << 12;
        const ERASED = 1 << 13;
        const BORN_RICH = 1 << 14;
        const FAME = 1 << 15;
        const MADE_MAN = 1 << 16;
        const AMBIDEXTROUS = 1 << 17;
        const OVERCLOCKER = 1 << 18;
        const RESTRICTED_GEAR = 1 << 19;
    }
}
