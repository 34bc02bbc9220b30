//! Enumeration types for the Hamlet economy.
//!
//! Every enumeration that crosses the save-game boundary is `#[repr(u8)]`
//! with explicit discriminants: the discriminant *is* the on-disk and
//! on-wire value, and table lookups index by it.

use serde::{Deserialize, Serialize};

/// Generates a `#[repr(u8)]` enum plus its discriminant helpers.
macro_rules! indexed_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value
            ),+
        }

        impl $name {
            /// Every variant in ascending discriminant order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Return the raw discriminant.
            pub const fn as_u8(self) -> u8 {
                self as u8
            }

            /// Return the discriminant as a table index.
            pub const fn index(self) -> usize {
                self as usize
            }

            /// Decode a raw discriminant, `None` if no variant matches.
            pub const fn from_u8(raw: u8) -> Option<Self> {
                match raw {
                    $(x if x == $value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

/// Number of distinct ware types.
pub const WARE_TYPE_COUNT: usize = 35;

/// Size of every per-building-type table (includes unused slots).
pub const BUILDING_TYPE_COUNT: usize = 40;

/// Number of distinct job types.
pub const JOB_TYPE_COUNT: usize = 30;

/// Number of tool kinds a metalworks can produce.
pub const TOOL_COUNT: usize = 12;

/// Number of pact kinds.
pub const PACT_TYPE_COUNT: usize = 2;

/// Number of merchandise statistic categories.
pub const MERCHANDISE_CATEGORY_COUNT: usize = 14;

/// Number of per-player statistic kinds.
pub const STATISTIC_TYPE_COUNT: usize = 9;

/// Number of statistic resolutions.
pub const STATISTIC_TIME_COUNT: usize = 4;

/// Building types below this id are warehouses or military buildings and
/// never appear in the production-building lists.
pub const FIRST_USUAL_BUILDING: u8 = 10;

/// Number of production-building lists kept per player.
pub const USUAL_BUILDING_LIST_COUNT: usize = 30;

// ---------------------------------------------------------------------------
// Wares
// ---------------------------------------------------------------------------

indexed_enum! {
    /// A kind of transportable good.
    WareType {
        /// Beer for soldier training.
        Beer = 0,
        /// Tool: tongs.
        Tongs = 1,
        /// Tool: hammer.
        Hammer = 2,
        /// Tool: axe.
        Axe = 3,
        /// Tool: saw.
        Saw = 4,
        /// Tool: pick axe.
        PickAxe = 5,
        /// Tool: shovel.
        Shovel = 6,
        /// Tool: crucible.
        Crucible = 7,
        /// Tool: rod and line.
        RodAndLine = 8,
        /// Tool: scythe.
        Scythe = 9,
        /// An empty water bucket.
        WaterEmpty = 10,
        /// Water.
        Water = 11,
        /// Tool: cleaver.
        Cleaver = 12,
        /// Tool: rolling pin.
        Rollingpin = 13,
        /// Tool: bow.
        Bow = 14,
        /// A boat for water roads.
        Boat = 15,
        /// Weapon: sword.
        Sword = 16,
        /// Smelted iron.
        Iron = 17,
        /// Flour.
        Flour = 18,
        /// Fish.
        Fish = 19,
        /// Bread.
        Bread = 20,
        /// Roman shield (the canonical shield in inventories).
        ShieldRomans = 21,
        /// Wood logs.
        Wood = 22,
        /// Boards.
        Boards = 23,
        /// Stones.
        Stones = 24,
        /// Viking shield.
        ShieldVikings = 25,
        /// African shield.
        ShieldAfricans = 26,
        /// Grain.
        Grain = 27,
        /// Gold coins.
        Coins = 28,
        /// Gold ore.
        Gold = 29,
        /// Iron ore.
        IronOre = 30,
        /// Coal.
        Coal = 31,
        /// Meat.
        Meat = 32,
        /// Ham.
        Ham = 33,
        /// Japanese shield.
        ShieldJapanese = 34,
    }
}

impl WareType {
    /// Fold every nation's shield onto [`WareType::ShieldRomans`].
    ///
    /// Inventories count shields as one good regardless of nation.
    pub const fn convert_shields(self) -> Self {
        match self {
            Self::ShieldVikings | Self::ShieldAfricans | Self::ShieldJapanese => Self::ShieldRomans,
            other => other,
        }
    }

    /// Return the merchandise statistic category this ware counts towards.
    pub const fn merchandise_category(self) -> Option<usize> {
        match self {
            Self::Wood => Some(0),
            Self::Boards => Some(1),
            Self::Stones => Some(2),
            Self::Fish | Self::Bread | Self::Meat => Some(3),
            Self::Water => Some(4),
            Self::Beer => Some(5),
            Self::Coal => Some(6),
            Self::IronOre => Some(7),
            Self::Gold => Some(8),
            Self::Iron => Some(9),
            Self::Coins => Some(10),
            Self::Tongs
            | Self::Axe
            | Self::Saw
            | Self::PickAxe
            | Self::Hammer
            | Self::Shovel
            | Self::Crucible
            | Self::RodAndLine
            | Self::Scythe
            | Self::Cleaver
            | Self::Rollingpin
            | Self::Bow => Some(11),
            Self::ShieldVikings
            | Self::ShieldAfricans
            | Self::ShieldRomans
            | Self::ShieldJapanese
            | Self::Sword => Some(12),
            Self::Boat => Some(13),
            Self::WaterEmpty | Self::Flour | Self::Grain | Self::Ham => None,
        }
    }
}

/// The wares a metalworks produces, in tool-settings order.
pub const TOOLS: [WareType; TOOL_COUNT] = [
    WareType::Tongs,
    WareType::Hammer,
    WareType::Axe,
    WareType::Saw,
    WareType::PickAxe,
    WareType::Shovel,
    WareType::Crucible,
    WareType::RodAndLine,
    WareType::Scythe,
    WareType::Cleaver,
    WareType::Rollingpin,
    WareType::Bow,
];

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

indexed_enum! {
    /// A building type.
    ///
    /// Discriminants match the save format and leave gaps for unused
    /// slots; per-type tables are sized [`BUILDING_TYPE_COUNT`].
    BuildingType {
        /// Headquarters. In distribution tables this slot stands for
        /// building sites, since a headquarters is never constructed.
        Headquarters = 0,
        /// Smallest military building.
        Barracks = 1,
        /// Small military building.
        Guardhouse = 2,
        /// Medium military building.
        Watchtower = 4,
        /// Large military building.
        Fortress = 9,
        /// Granite mine.
        GraniteMine = 10,
        /// Coal mine.
        CoalMine = 11,
        /// Iron mine.
        IronMine = 12,
        /// Gold mine.
        GoldMine = 13,
        /// Lookout tower.
        LookoutTower = 14,
        /// Catapult.
        Catapult = 16,
        /// Woodcutter.
        Woodcutter = 17,
        /// Fishery.
        Fishery = 18,
        /// Quarry.
        Quarry = 19,
        /// Forester.
        Forester = 20,
        /// Slaughterhouse.
        Slaughterhouse = 21,
        /// Hunter.
        Hunter = 22,
        /// Brewery.
        Brewery = 23,
        /// Armory.
        Armory = 24,
        /// Metalworks.
        Metalworks = 25,
        /// Iron smelter.
        IronSmelter = 26,
        /// Charcoal burner.
        CharBurner = 27,
        /// Pig farm.
        PigFarm = 28,
        /// Storehouse (a warehouse).
        Storehouse = 29,
        /// Mill.
        Mill = 31,
        /// Bakery.
        Bakery = 32,
        /// Sawmill.
        Sawmill = 33,
        /// Mint.
        Mint = 34,
        /// Well.
        Well = 35,
        /// Shipyard.
        Shipyard = 36,
        /// Farm.
        Farm = 37,
        /// Donkey breeder.
        DonkeyBreeder = 38,
        /// Harbor (a warehouse).
        HarborBuilding = 39,
    }
}

impl BuildingType {
    /// Index into the per-player production-building lists, if this type
    /// has one.
    pub const fn usual_list_index(self) -> Option<usize> {
        let raw = self as u8;
        match raw.checked_sub(FIRST_USUAL_BUILDING) {
            Some(offset) => Some(offset as usize),
            None => None,
        }
    }

    /// Whether this type is a warehouse (stores goods and people).
    pub const fn is_warehouse(self) -> bool {
        matches!(self, Self::Headquarters | Self::Storehouse | Self::HarborBuilding)
    }

    /// Whether this type is a military building.
    pub const fn is_military(self) -> bool {
        matches!(self, Self::Barracks | Self::Guardhouse | Self::Watchtower | Self::Fortress)
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

indexed_enum! {
    /// A profession a settler can take on.
    Job {
        /// Carrier / unskilled helper.
        Helper = 0,
        /// Woodcutter.
        Woodcutter = 1,
        /// Fisher.
        Fisher = 2,
        /// Forester.
        Forester = 3,
        /// Carpenter.
        Carpenter = 4,
        /// Stonemason.
        Stonemason = 5,
        /// Hunter.
        Hunter = 6,
        /// Farmer.
        Farmer = 7,
        /// Miner.
        Miner = 8,
        /// Brewer.
        Brewer = 9,
        /// Butcher.
        Butcher = 10,
        /// Miller.
        Miller = 11,
        /// Baker.
        Baker = 12,
        /// Iron founder.
        IronFounder = 13,
        /// Armorer.
        Armorer = 14,
        /// Minter.
        Minter = 15,
        /// Metalworker.
        Metalworker = 16,
        /// Shipwright.
        Shipwright = 17,
        /// Geologist.
        Geologist = 18,
        /// Builder.
        Builder = 19,
        /// Planer.
        Planer = 20,
        /// Soldier, rank 1.
        Private = 21,
        /// Soldier, rank 2.
        PrivateFirstClass = 22,
        /// Soldier, rank 3.
        Sergeant = 23,
        /// Soldier, rank 4.
        Officer = 24,
        /// Soldier, rank 5.
        General = 25,
        /// Donkey breeder.
        DonkeyBreeder = 26,
        /// Scout.
        Scout = 27,
        /// Pack donkey.
        PackDonkey = 28,
        /// Charcoal burner.
        CharBurner = 29,
    }
}

/// Soldier jobs in ascending rank order.
pub const SOLDIER_JOBS: [Job; 5] = [
    Job::Private,
    Job::PrivateFirstClass,
    Job::Sergeant,
    Job::Officer,
    Job::General,
];

impl Job {
    /// Whether this job is a soldier rank.
    pub const fn is_soldier(self) -> bool {
        matches!(
            self,
            Self::Private | Self::PrivateFirstClass | Self::Sergeant | Self::Officer | Self::General
        )
    }

    /// Whether a warehouse may turn a helper into this job on demand.
    pub const fn is_recruitable(self) -> bool {
        !matches!(self, Self::Helper | Self::PackDonkey) && !self.is_soldier()
    }

    /// The tool a helper needs to be recruited into this job, if any.
    pub const fn tool(self) -> Option<WareType> {
        match self {
            Self::Woodcutter => Some(WareType::Axe),
            Self::Fisher => Some(WareType::RodAndLine),
            Self::Forester | Self::Planer | Self::CharBurner => Some(WareType::Shovel),
            Self::Carpenter => Some(WareType::Saw),
            Self::Stonemason | Self::Miner => Some(WareType::PickAxe),
            Self::Hunter | Self::Scout => Some(WareType::Bow),
            Self::Farmer => Some(WareType::Scythe),
            Self::Butcher => Some(WareType::Cleaver),
            Self::Baker => Some(WareType::Rollingpin),
            Self::IronFounder | Self::Minter => Some(WareType::Crucible),
            Self::Armorer
            | Self::Metalworker
            | Self::Shipwright
            | Self::Geologist
            | Self::Builder => Some(WareType::Hammer),
            Self::Helper
            | Self::Brewer
            | Self::Miller
            | Self::Private
            | Self::PrivateFirstClass
            | Self::Sergeant
            | Self::Officer
            | Self::General
            | Self::DonkeyBreeder
            | Self::PackDonkey => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Diplomacy
// ---------------------------------------------------------------------------

indexed_enum! {
    /// A kind of bilateral treaty.
    PactType {
        /// Treaty of alliance: shared visibility, no attacks.
        Alliance = 0,
        /// Non-aggression pact: no attacks.
        NonAggression = 1,
    }
}

/// The resolved state of one pact entry at a given game frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PactState {
    /// No pact: never proposed, cancelled, or expired.
    NoPact,
    /// Proposed by this side, not yet accepted.
    InProgress,
    /// Accepted and still running.
    Accepted,
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

indexed_enum! {
    /// A per-player statistic tracked over time.
    StatisticType {
        /// Size of the player's territory.
        Country = 0,
        /// Number of buildings.
        Buildings = 1,
        /// Total population.
        Inhabitants = 2,
        /// Total stored goods.
        Merchandise = 3,
        /// Weighted soldier strength.
        Military = 4,
        /// Gold coins.
        Gold = 5,
        /// Average production-building productivity.
        Productivity = 6,
        /// Enemy buildings conquered or destroyed.
        Vanquished = 7,
        /// Tournament score.
        Tournament = 8,
    }
}

indexed_enum! {
    /// Resolution of a statistic ring buffer.
    StatisticTime {
        /// One slot per statistic step.
        FifteenMinutes = 0,
        /// One slot per four finer slots.
        OneHour = 1,
        /// One slot per sixteen statistic steps.
        FourHours = 2,
        /// One slot per sixty-four statistic steps.
        SixteenHours = 3,
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

indexed_enum! {
    /// Occupancy of a player slot.
    #[derive(Default)]
    PlayerStatus {
        /// Open slot.
        #[default]
        Free = 0,
        /// Human player.
        Occupied = 1,
        /// Closed slot.
        Locked = 2,
        /// Computer player.
        Ai = 3,
    }
}

impl PlayerStatus {
    /// Whether this slot takes part in the simulation.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Occupied | Self::Ai)
    }
}

indexed_enum! {
    /// Team membership chosen in the lobby.
    #[derive(Default)]
    Team {
        /// No team.
        #[default]
        NoTeam = 0,
        /// Random team, resolved to team 1.
        Random = 1,
        /// Team 1.
        Team1 = 2,
        /// Team 2.
        Team2 = 3,
        /// Team 3.
        Team3 = 4,
        /// Team 4.
        Team4 = 5,
    }
}

impl Team {
    /// Resolve a lobby choice to the team the game actually uses.
    pub const fn fixed(self) -> Self {
        match self {
            Self::Random => Self::Team1,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_match_declared_counts() {
        assert_eq!(WareType::ALL.len(), WARE_TYPE_COUNT);
        assert_eq!(Job::ALL.len(), JOB_TYPE_COUNT);
        assert_eq!(PactType::ALL.len(), PACT_TYPE_COUNT);
        assert_eq!(StatisticType::ALL.len(), STATISTIC_TYPE_COUNT);
        assert_eq!(StatisticTime::ALL.len(), STATISTIC_TIME_COUNT);
        assert!(BuildingType::ALL.iter().all(|b| b.index() < BUILDING_TYPE_COUNT));
    }

    #[test]
    fn discriminants_roundtrip() {
        for ware in WareType::ALL {
            assert_eq!(WareType::from_u8(ware.as_u8()), Some(*ware));
        }
        for building in BuildingType::ALL {
            assert_eq!(BuildingType::from_u8(building.as_u8()), Some(*building));
        }
        assert_eq!(BuildingType::from_u8(3), None);
        assert_eq!(WareType::from_u8(35), None);
    }

    #[test]
    fn usual_list_index_starts_at_granite_mine() {
        assert_eq!(BuildingType::GraniteMine.usual_list_index(), Some(0));
        assert_eq!(BuildingType::HarborBuilding.usual_list_index(), Some(29));
        assert_eq!(BuildingType::Fortress.usual_list_index(), None);
    }

    #[test]
    fn shields_fold_onto_one_good() {
        assert_eq!(WareType::ShieldJapanese.convert_shields(), WareType::ShieldRomans);
        assert_eq!(WareType::Boards.convert_shields(), WareType::Boards);
    }

    #[test]
    fn food_shares_one_merchandise_category() {
        assert_eq!(WareType::Fish.merchandise_category(), Some(3));
        assert_eq!(WareType::Bread.merchandise_category(), Some(3));
        assert_eq!(WareType::Grain.merchandise_category(), None);
    }

    #[test]
    fn soldiers_are_never_recruited() {
        assert!(!Job::General.is_recruitable());
        assert!(Job::Woodcutter.is_recruitable());
        assert_eq!(Job::Builder.tool(), Some(WareType::Hammer));
    }

    #[test]
    fn random_team_resolves_to_team_one() {
        assert_eq!(Team::Random.fixed(), Team::Team1);
        assert_eq!(Team::Team3.fixed(), Team::Team3);
    }
}
