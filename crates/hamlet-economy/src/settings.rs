//! Player-adjustable settings: military, defenders, tools and build order.
//!
//! All of these are plain values changed by player commands. Side effects
//! on the rest of the economy (troop regulation after a military change)
//! are triggered by [`Player`](crate::Player), not here.

use hamlet_types::{BuildingType, GameData, StreamError, TOOL_COUNT, WareType, TOOLS};
use hamlet_world::SyncedRandom;

use crate::error::EconomyError;

/// Number of military settings sliders.
pub const MILITARY_SETTINGS_COUNT: usize = 8;

/// Default military settings.
pub const STD_MILITARY_SETTINGS: [u8; MILITARY_SETTINGS_COUNT] = [10, 3, 5, 3, 2, 4, 8, 8];

/// Maximum value of each military slider.
pub const MILITARY_SETTINGS_SCALE: [u8; MILITARY_SETTINGS_COUNT] = [10, 5, 5, 5, 8, 8, 8, 8];

/// Slider that controls how many attacked buildings send a defender.
const DEFENDER_SLIDER: usize = 2;

/// Default tool production priorities, indexed like [`TOOLS`].
pub const STD_TOOL_PRIORITIES: [u8; TOOL_COUNT] = [1, 4, 2, 5, 7, 1, 3, 1, 2, 1, 2, 1];

/// Upper bound for committed tool orders.
pub const MAX_TOOLS_ORDERED: i32 = 99;

/// Upper bound for the displayed tool order.
pub const MAX_TOOLS_ORDERED_VISUAL: i32 = 100;

/// Number of entries in the defender list.
pub const DEFENDER_SLOTS: usize = 5;

/// Number of building types that can be placed by a player.
pub const BUILDABLE_TYPE_COUNT: usize = 32;

/// Buildable types in their default build order.
pub const STD_BUILD_ORDER: [BuildingType; BUILDABLE_TYPE_COUNT] = [
    BuildingType::Barracks,
    BuildingType::Guardhouse,
    BuildingType::Watchtower,
    BuildingType::Fortress,
    BuildingType::GraniteMine,
    BuildingType::CoalMine,
    BuildingType::IronMine,
    BuildingType::GoldMine,
    BuildingType::LookoutTower,
    BuildingType::Catapult,
    BuildingType::Woodcutter,
    BuildingType::Fishery,
    BuildingType::Quarry,
    BuildingType::Forester,
    BuildingType::Slaughterhouse,
    BuildingType::Hunter,
    BuildingType::Brewery,
    BuildingType::Armory,
    BuildingType::Metalworks,
    BuildingType::IronSmelter,
    BuildingType::CharBurner,
    BuildingType::PigFarm,
    BuildingType::Storehouse,
    BuildingType::Mill,
    BuildingType::Bakery,
    BuildingType::Sawmill,
    BuildingType::Mint,
    BuildingType::Well,
    BuildingType::Shipyard,
    BuildingType::Farm,
    BuildingType::DonkeyBreeder,
    BuildingType::HarborBuilding,
];

// ---------------------------------------------------------------------------
// Military
// ---------------------------------------------------------------------------

/// The eight military sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilitarySettings(pub [u8; MILITARY_SETTINGS_COUNT]);

impl Default for MilitarySettings {
    fn default() -> Self {
        Self(STD_MILITARY_SETTINGS)
    }
}

impl MilitarySettings {
    /// Check every slider against its scale.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::SettingOutOfRange`] for the first slider above
    /// its maximum.
    pub fn validated(values: [u8; MILITARY_SETTINGS_COUNT]) -> Result<Self, EconomyError> {
        for (index, (value, max)) in values.iter().zip(MILITARY_SETTINGS_SCALE).enumerate() {
            if *value > max {
                return Err(EconomyError::SettingOutOfRange {
                    setting: "military",
                    index,
                    value: *value,
                    max,
                });
            }
        }
        Ok(Self(values))
    }

    /// Value of one slider.
    pub fn get(&self, index: usize) -> u8 {
        self.0.get(index).copied().unwrap_or(0)
    }
}

/// Shuffled list deciding which attacked building sends a defender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefenderList {
    /// Whether the building at this position of the cycle defends.
    pub slots: [bool; DEFENDER_SLOTS],
    /// Next slot to hand out.
    pub pos: u16,
}

impl Default for DefenderList {
    fn default() -> Self {
        Self {
            slots: [true; DEFENDER_SLOTS],
            pos: 0,
        }
    }
}

impl DefenderList {
    /// Fill the slots from the defender slider and shuffle them.
    pub fn refresh(&mut self, settings: &MilitarySettings, rng: &mut SyncedRandom) {
        let setting = usize::from(settings.get(DEFENDER_SLIDER));
        let scale = MILITARY_SETTINGS_SCALE
            .get(DEFENDER_SLIDER)
            .copied()
            .map_or(1, usize::from);
        let active = setting
            .saturating_mul(DEFENDER_SLOTS)
            .checked_div(scale)
            .unwrap_or(0);
        for (i, slot) in self.slots.iter_mut().enumerate() {
            *slot = i < active;
        }
        rng.shuffle(&mut self.slots);
        self.pos = 0;
    }

    /// Whether the next attacked building should send a defender.
    ///
    /// The list is refreshed once four entries have been used.
    pub fn should_send_defender(
        &mut self,
        settings: &MilitarySettings,
        rng: &mut SyncedRandom,
    ) -> bool {
        if self.pos == 4 {
            self.refresh(settings, rng);
        }
        let send = self.slots.get(usize::from(self.pos)).copied().unwrap_or(false);
        self.pos = self.pos.saturating_add(1);
        send
    }

    /// Write slots and cursor.
    pub fn persist(&self, out: &mut GameData) {
        for slot in &self.slots {
            out.push_bool(*slot);
        }
        out.push_u16(self.pos);
    }

    /// Read slots and cursor.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] if the stream is short or the cursor is out
    /// of range.
    pub fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let mut slots = [false; DEFENDER_SLOTS];
        for slot in &mut slots {
            *slot = input.pop_bool()?;
        }
        let pos = input.pop_u16()?;
        if usize::from(pos) >= DEFENDER_SLOTS {
            return Err(StreamError::InvalidValue {
                field: "defender cursor",
                value: u32::from(pos),
            });
        }
        Ok(Self { slots, pos })
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Tool production priorities and outstanding tool orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Production priority per tool.
    pub priorities: [u8; TOOL_COUNT],
    /// Committed orders per tool.
    pub ordered: [u8; TOOL_COUNT],
    /// Local, not yet committed order changes. Never saved.
    pub ordered_delta: [i32; TOOL_COUNT],
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            priorities: STD_TOOL_PRIORITIES,
            ordered: [0; TOOL_COUNT],
            ordered_delta: [0; TOOL_COUNT],
        }
    }
}

impl ToolSettings {
    /// Apply new priorities and commit order changes.
    ///
    /// Committed orders are clamped to `0..=99`; the same amount is taken
    /// back out of the local delta.
    pub fn change(&mut self, priorities: [u8; TOOL_COUNT], order_changes: [i8; TOOL_COUNT]) {
        self.priorities = priorities;
        let slots = self.ordered.iter_mut().zip(self.ordered_delta.iter_mut());
        for ((ordered, delta), change) in slots.zip(order_changes) {
            let change = i32::from(change);
            let committed = i32::from(*ordered)
                .saturating_add(change)
                .clamp(0, MAX_TOOLS_ORDERED);
            *ordered = u8::try_from(committed).unwrap_or(0);
            *delta = delta.saturating_sub(change);
        }
    }

    /// Orders as shown to the player: committed plus local delta.
    pub fn ordered_visual(&self, tool: usize) -> u32 {
        let ordered = self.ordered.get(tool).copied().map_or(0, i32::from);
        let delta = self.ordered_delta.get(tool).copied().unwrap_or(0);
        u32::try_from(ordered.saturating_add(delta).max(0)).unwrap_or(0)
    }

    /// Adjust the displayed order of one tool.
    ///
    /// Returns `false` and changes nothing if the step exceeds 100 or the
    /// result leaves `0..=100`.
    pub fn change_order_visual(&mut self, tool: usize, change: i32) -> bool {
        if change.unsigned_abs() > MAX_TOOLS_ORDERED_VISUAL.unsigned_abs() {
            return false;
        }
        let current = i32::try_from(self.ordered_visual(tool)).unwrap_or(i32::MAX);
        let wanted = current.saturating_add(change);
        if !(0..=MAX_TOOLS_ORDERED_VISUAL).contains(&wanted) {
            return false;
        }
        match self.ordered_delta.get_mut(tool) {
            Some(delta) => {
                *delta = delta.saturating_add(change);
                true
            }
            None => false,
        }
    }

    /// A metalworks finished one ordered tool.
    ///
    /// Returns whether an order was outstanding.
    pub fn order_processed(&mut self, tool: usize) -> bool {
        match self.ordered.get_mut(tool) {
            Some(ordered) if *ordered > 0 => {
                *ordered = ordered.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    /// Index of a tool ware in the tool tables.
    pub fn tool_index(ware: WareType) -> Option<usize> {
        TOOLS.iter().position(|tool| *tool == ware)
    }
}

// ---------------------------------------------------------------------------
// Build order
// ---------------------------------------------------------------------------

/// How building sites are prioritized for material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOrder {
    /// 0 = first come first served, otherwise by [`BuildOrder::order`].
    pub order_type: u8,
    /// Building types, most urgent first.
    pub order: [BuildingType; BUILDABLE_TYPE_COUNT],
}

impl Default for BuildOrder {
    fn default() -> Self {
        Self {
            order_type: 0,
            order: STD_BUILD_ORDER,
        }
    }
}

impl BuildOrder {
    /// Replace the order.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidBuildOrder`] unless `order` contains
    /// every buildable type exactly once.
    pub fn change(
        &mut self,
        order_type: u8,
        order: [BuildingType; BUILDABLE_TYPE_COUNT],
    ) -> Result<(), EconomyError> {
        let mut sorted = order;
        sorted.sort_unstable();
        let mut expected = STD_BUILD_ORDER;
        expected.sort_unstable();
        if sorted != expected {
            return Err(EconomyError::InvalidBuildOrder);
        }
        self.order_type = order_type;
        self.order = order;
        Ok(())
    }

    /// Position of a building type in the order.
    pub fn position(&self, kind: BuildingType) -> Option<usize> {
        self.order.iter().position(|entry| *entry == kind)
    }

    /// Write the order type and the order.
    pub fn persist(&self, out: &mut GameData) {
        out.push_u8(self.order_type);
        for kind in &self.order {
            out.push_u8(kind.as_u8());
        }
    }

    /// Read the order type and the order.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] for a short stream or an unknown type.
    pub fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let order_type = input.pop_u8()?;
        let mut order = STD_BUILD_ORDER;
        for slot in &mut order {
            let raw = input.pop_u8()?;
            *slot = BuildingType::from_u8(raw).ok_or(StreamError::InvalidValue {
                field: "build order",
                value: u32::from(raw),
            })?;
        }
        Ok(Self { order_type, order })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn military_slider_above_scale_is_rejected() {
        let mut values = STD_MILITARY_SETTINGS;
        values[1] = 6;
        let err = MilitarySettings::validated(values).unwrap_err();
        assert!(matches!(
            err,
            EconomyError::SettingOutOfRange { index: 1, value: 6, max: 5, .. }
        ));
        assert!(MilitarySettings::validated(MILITARY_SETTINGS_SCALE).is_ok());
    }

    #[test]
    fn defender_list_matches_slider() {
        let mut rng = SyncedRandom::new(5);
        let mut list = DefenderList::default();
        let mut values = STD_MILITARY_SETTINGS;
        values[DEFENDER_SLIDER] = 3;
        let settings = MilitarySettings::validated(values).unwrap();
        list.refresh(&settings, &mut rng);
        assert_eq!(list.slots.iter().filter(|s| **s).count(), 3);
        assert_eq!(list.pos, 0);
    }

    #[test]
    fn defender_cursor_wraps_after_four() {
        let mut rng = SyncedRandom::new(9);
        let settings = MilitarySettings::default();
        let mut list = DefenderList::default();
        for _ in 0..4 {
            assert!(list.should_send_defender(&settings, &mut rng));
        }
        assert_eq!(list.pos, 4);
        // Slider at its maximum: every slot defends after the refresh too.
        assert!(list.should_send_defender(&settings, &mut rng));
        assert_eq!(list.pos, 1);
    }

    #[test]
    fn tool_orders_clamp_and_track_delta() {
        let mut tools = ToolSettings::default();
        assert!(tools.change_order_visual(0, 5));
        assert_eq!(tools.ordered_visual(0), 5);
        let mut changes = [0_i8; TOOL_COUNT];
        changes[0] = 5;
        tools.change(STD_TOOL_PRIORITIES, changes);
        assert_eq!(tools.ordered[0], 5);
        assert_eq!(tools.ordered_delta[0], 0);
        assert_eq!(tools.ordered_visual(0), 5);

        changes[0] = 120;
        tools.change(STD_TOOL_PRIORITIES, changes);
        assert_eq!(tools.ordered[0], 99);
    }

    #[test]
    fn visual_order_rejects_out_of_range() {
        let mut tools = ToolSettings::default();
        assert!(!tools.change_order_visual(3, -1));
        assert!(!tools.change_order_visual(3, 101));
        assert!(tools.change_order_visual(3, 100));
        assert!(!tools.change_order_visual(3, 1));
    }

    #[test]
    fn processed_order_counts_down() {
        let mut tools = ToolSettings::default();
        assert!(!tools.order_processed(2));
        tools.ordered[2] = 1;
        assert!(tools.order_processed(2));
        assert_eq!(tools.ordered[2], 0);
    }

    #[test]
    fn build_order_must_be_a_permutation() {
        let mut order = BuildOrder::default();
        let mut reversed = STD_BUILD_ORDER;
        reversed.reverse();
        order.change(1, reversed).unwrap();
        assert_eq!(order.position(BuildingType::HarborBuilding), Some(0));

        let mut broken = STD_BUILD_ORDER;
        broken[0] = BuildingType::Mill;
        assert!(matches!(order.change(1, broken), Err(EconomyError::InvalidBuildOrder)));
    }
}
