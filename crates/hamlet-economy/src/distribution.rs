//! Weighted distribution of wares among consumer building types.
//!
//! For every ware type the player sets a percentage per consumer building
//! type. [`Distribution::recalc`] flattens the table into a goals sequence
//! in which each type appears as often as its weight. A cursor walks the
//! sequence with a fixed step of [`GOAL_STEP`], which is prime, so `N`
//! consecutive selections visit all `N` slots. Every client computes the
//! same walk, which keeps the choice identical across a networked game.

use hamlet_types::{
    BUILDING_TYPE_COUNT, BuildingType, GameData, StreamError, WARE_TYPE_COUNT, WareType,
};

/// Step of the goal cursor.
pub const GOAL_STEP: u32 = 907;

/// Number of sliders in the distribution settings window.
pub const DISTRIBUTION_SLIDER_COUNT: usize = 23;

/// Ware and consumer type governed by each distribution slider.
pub const DISTRIBUTION_SLIDERS: [(WareType, BuildingType); DISTRIBUTION_SLIDER_COUNT] = [
    (WareType::Fish, BuildingType::GraniteMine),
    (WareType::Fish, BuildingType::CoalMine),
    (WareType::Fish, BuildingType::IronMine),
    (WareType::Fish, BuildingType::GoldMine),
    (WareType::Grain, BuildingType::Mill),
    (WareType::Grain, BuildingType::PigFarm),
    (WareType::Grain, BuildingType::DonkeyBreeder),
    (WareType::Grain, BuildingType::Brewery),
    (WareType::Grain, BuildingType::CharBurner),
    (WareType::Iron, BuildingType::Armory),
    (WareType::Iron, BuildingType::Metalworks),
    (WareType::Coal, BuildingType::Armory),
    (WareType::Coal, BuildingType::IronSmelter),
    (WareType::Coal, BuildingType::Mint),
    (WareType::Wood, BuildingType::Sawmill),
    (WareType::Wood, BuildingType::CharBurner),
    (WareType::Boards, BuildingType::Headquarters),
    (WareType::Boards, BuildingType::Metalworks),
    (WareType::Boards, BuildingType::Shipyard),
    (WareType::Water, BuildingType::Bakery),
    (WareType::Water, BuildingType::Brewery),
    (WareType::Water, BuildingType::PigFarm),
    (WareType::Water, BuildingType::DonkeyBreeder),
];

/// Default slider values, in [`DISTRIBUTION_SLIDERS`] order.
pub const STD_DISTRIBUTION: DistributionSettings = [
    3, 5, 7, 10, 5, 3, 2, 3, 3, 8, 4, 8, 7, 10, 8, 3, 10, 4, 2, 6, 3, 2, 3,
];

/// Ware types whose consumers are governed by percentages.
const WEIGHTED_WARES: [WareType; 7] = [
    WareType::Fish,
    WareType::Grain,
    WareType::Iron,
    WareType::Coal,
    WareType::Wood,
    WareType::Boards,
    WareType::Water,
];

/// Ware types with fixed consumers and no percentages.
const FIXED_CLIENTS: [(WareType, &[BuildingType]); 5] = [
    (WareType::Flour, &[BuildingType::Bakery]),
    (WareType::Gold, &[BuildingType::Mint]),
    (WareType::IronOre, &[BuildingType::IronSmelter]),
    (WareType::Ham, &[BuildingType::Slaughterhouse]),
    (
        WareType::Stones,
        &[BuildingType::Headquarters, BuildingType::Catapult],
    ),
];

/// Slider values of the distribution settings window.
pub type DistributionSettings = [u8; DISTRIBUTION_SLIDER_COUNT];

/// Distribution state of one ware type.
///
/// [`BuildingType::Headquarters`] in these tables stands for building
/// sites, which have no type of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Percentage per consumer building type.
    pub percent: [u8; BUILDING_TYPE_COUNT],
    /// Building types that consume this ware.
    pub client_buildings: Vec<BuildingType>,
    /// Flattened weighted sequence of building types.
    pub goals: Vec<BuildingType>,
    /// Cursor into [`Distribution::goals`].
    pub selected_goal: u32,
}

impl Default for Distribution {
    fn default() -> Self {
        Self {
            percent: [0; BUILDING_TYPE_COUNT],
            client_buildings: Vec::new(),
            goals: Vec::new(),
            selected_goal: 0,
        }
    }
}

impl Distribution {
    /// Percentage assigned to a consumer type.
    pub fn percent_of(&self, kind: BuildingType) -> u8 {
        self.percent.get(kind.index()).copied().unwrap_or(0)
    }

    /// Rebuild the client list and the goals sequence from the percentages
    /// and reset the cursor.
    pub fn recalc(&mut self) {
        self.client_buildings.clear();
        self.goals.clear();
        for kind in BuildingType::ALL {
            let weight = self.percent_of(*kind);
            if weight == 0 {
                continue;
            }
            self.client_buildings.push(*kind);
            self.goals
                .extend(std::iter::repeat_n(*kind, usize::from(weight)));
        }
        self.selected_goal = 0;
    }

    /// The building type the cursor currently points at.
    pub fn current_goal(&self) -> Option<BuildingType> {
        let index = usize::try_from(self.selected_goal).ok()?;
        self.goals.get(index).copied()
    }

    /// Move the cursor by [`GOAL_STEP`].
    pub fn advance(&mut self) {
        let Ok(len) = u32::try_from(self.goals.len()) else {
            return;
        };
        if let Some(next) = self
            .selected_goal
            .checked_add(GOAL_STEP)
            .and_then(|sum| sum.checked_rem(len))
        {
            self.selected_goal = next;
        }
    }

    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_raw(&self.percent);
        push_types(out, &self.client_buildings)?;
        push_types(out, &self.goals)?;
        out.push_u32(self.selected_goal);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let raw = input.pop_raw(BUILDING_TYPE_COUNT)?;
        let mut percent = [0_u8; BUILDING_TYPE_COUNT];
        for (slot, value) in percent.iter_mut().zip(raw) {
            *slot = value;
        }
        let client_buildings = pop_types(input)?;
        let goals = pop_types(input)?;
        let selected_goal = input.pop_u32()?;
        let in_range = usize::try_from(selected_goal)
            .map(|index| index < goals.len() || (goals.is_empty() && index == 0))
            .unwrap_or(false);
        if !in_range {
            return Err(StreamError::InvalidValue {
                field: "goal cursor",
                value: selected_goal,
            });
        }
        Ok(Self {
            percent,
            client_buildings,
            goals,
            selected_goal,
        })
    }
}

fn push_types(out: &mut GameData, types: &[BuildingType]) -> Result<(), StreamError> {
    out.push_len(types.len())?;
    for kind in types {
        out.push_u8(kind.as_u8());
    }
    Ok(())
}

fn pop_types(input: &mut GameData) -> Result<Vec<BuildingType>, StreamError> {
    let len = input.pop_len()?;
    let mut types = Vec::with_capacity(len);
    for _ in 0..len {
        let raw = input.pop_u8()?;
        types.push(BuildingType::from_u8(raw).ok_or(StreamError::InvalidValue {
            field: "building type",
            value: u32::from(raw),
        })?);
    }
    Ok(types)
}

// ---------------------------------------------------------------------------
// Table of all ware types
// ---------------------------------------------------------------------------

/// Distribution state of every ware type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionTable {
    wares: Vec<Distribution>,
}

impl Default for DistributionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl DistributionTable {
    /// The table a new player starts with.
    pub fn standard() -> Self {
        let mut table = Self {
            wares: vec![Distribution::default(); WARE_TYPE_COUNT],
        };
        for (ware, clients) in FIXED_CLIENTS {
            if let Some(dist) = table.wares.get_mut(ware.index()) {
                dist.client_buildings.extend_from_slice(clients);
            }
        }
        table.apply_sliders(&STD_DISTRIBUTION);
        table.recalc_all();
        table
    }

    /// Distribution of one ware type.
    pub fn get(&self, ware: WareType) -> Option<&Distribution> {
        self.wares.get(ware.index())
    }

    /// Mutable distribution of one ware type.
    pub fn get_mut(&mut self, ware: WareType) -> Option<&mut Distribution> {
        self.wares.get_mut(ware.index())
    }

    /// Rebuild goals of one ware type. Only percentage-governed types are
    /// rebuilt; fixed client lists stay untouched.
    pub fn recalc_distribution_of_ware(&mut self, ware: WareType) {
        if let Some(dist) = self.get_mut(ware) {
            dist.recalc();
        }
    }

    /// Rebuild goals of every percentage-governed ware type.
    pub fn recalc_all(&mut self) {
        for ware in WEIGHTED_WARES {
            self.recalc_distribution_of_ware(ware);
        }
    }

    /// Apply new slider values and rebuild goals.
    pub fn change_distribution(&mut self, settings: &DistributionSettings) {
        self.apply_sliders(settings);
        self.recalc_all();
    }

    /// Read the slider values back out of the table.
    pub fn fill_distribution_settings(&self) -> DistributionSettings {
        let mut settings = [0_u8; DISTRIBUTION_SLIDER_COUNT];
        for (slot, (ware, kind)) in settings.iter_mut().zip(DISTRIBUTION_SLIDERS) {
            *slot = self.get(ware).map_or(0, |dist| dist.percent_of(kind));
        }
        settings
    }

    fn apply_sliders(&mut self, settings: &DistributionSettings) {
        for (value, (ware, kind)) in settings.iter().zip(DISTRIBUTION_SLIDERS) {
            if let Some(slot) = self
                .get_mut(ware)
                .and_then(|dist| dist.percent.get_mut(kind.index()))
            {
                *slot = *value;
            }
        }
    }

    /// Write every ware type's distribution.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] if a list is too long for the stream.
    pub fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        for dist in &self.wares {
            dist.persist(out)?;
        }
        Ok(())
    }

    /// Read every ware type's distribution.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] for short or malformed input.
    pub fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let mut wares = Vec::with_capacity(WARE_TYPE_COUNT);
        for _ in 0..WARE_TYPE_COUNT {
            wares.push(Distribution::restore(input)?);
        }
        Ok(Self { wares })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn standard_table_has_expected_goals() {
        let table = DistributionTable::standard();
        let fish = table.get(WareType::Fish).unwrap();
        assert_eq!(fish.goals.len(), 3 + 5 + 7 + 10);
        assert_eq!(
            fish.client_buildings,
            vec![
                BuildingType::GraniteMine,
                BuildingType::CoalMine,
                BuildingType::IronMine,
                BuildingType::GoldMine
            ]
        );
        assert_eq!(fish.goals[0], BuildingType::GraniteMine);
        assert_eq!(fish.goals[3], BuildingType::CoalMine);

        let stones = table.get(WareType::Stones).unwrap();
        assert!(stones.goals.is_empty());
        assert_eq!(
            stones.client_buildings,
            vec![BuildingType::Headquarters, BuildingType::Catapult]
        );
    }

    #[test]
    fn cursor_visits_every_slot_once_per_cycle() {
        for weights in [[1_u8, 1, 1, 1], [3, 5, 7, 10], [0, 9, 0, 2], [50, 30, 15, 5]] {
            let mut dist = Distribution::default();
            for (kind, weight) in [
                BuildingType::GraniteMine,
                BuildingType::CoalMine,
                BuildingType::IronMine,
                BuildingType::GoldMine,
            ]
            .into_iter()
            .zip(weights)
            {
                dist.percent[kind.index()] = weight;
            }
            dist.recalc();
            let len = dist.goals.len();
            let mut seen = vec![false; len];
            let mut picks: BTreeMap<BuildingType, u8> = BTreeMap::new();
            for _ in 0..len {
                let index = usize::try_from(dist.selected_goal).unwrap();
                assert!(!seen[index], "slot {index} visited twice");
                seen[index] = true;
                *picks.entry(dist.current_goal().unwrap()).or_default() += 1;
                dist.advance();
            }
            assert!(seen.iter().all(|s| *s));
            for (kind, count) in picks {
                assert_eq!(count, dist.percent_of(kind));
            }
        }
    }

    #[test]
    fn empty_goals_keep_cursor_at_zero() {
        let mut dist = Distribution::default();
        dist.recalc();
        dist.advance();
        assert_eq!(dist.selected_goal, 0);
        assert_eq!(dist.current_goal(), None);
    }

    #[test]
    fn sliders_round_trip_through_table() {
        let mut table = DistributionTable::standard();
        assert_eq!(table.fill_distribution_settings(), STD_DISTRIBUTION);
        let mut settings = STD_DISTRIBUTION;
        settings[14] = 0;
        table.change_distribution(&settings);
        assert_eq!(table.fill_distribution_settings(), settings);
        let wood = table.get(WareType::Wood).unwrap();
        assert_eq!(wood.client_buildings, vec![BuildingType::CharBurner]);
        assert_eq!(wood.goals.len(), 3);
    }

    #[test]
    fn table_survives_the_stream() {
        let mut table = DistributionTable::standard();
        table.get_mut(WareType::Coal).unwrap().advance();
        let mut data = GameData::new();
        table.persist(&mut data).unwrap();
        let mut input = GameData::from_bytes(data.into_bytes());
        let restored = DistributionTable::restore(&mut input).unwrap();
        assert!(input.is_exhausted());
        assert_eq!(restored, table);
    }
}
