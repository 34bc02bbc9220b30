//! The emergency program.
//!
//! When construction material runs low and the player cannot produce more
//! of it, boards and stones are reserved for woodcutters and sawmills until
//! supply recovers. The reservation itself is enforced in
//! [`Player::order_ware`].

use hamlet_types::{BuildingType, PostKind, WareType};
use tracing::info;

use crate::EconomyContext;
use crate::error::EconomyError;
use crate::events::EconomyEvent;
use crate::player::Player;

/// Stock of boards or stones at or below which material counts as short.
pub const EMERGENCY_THRESHOLD: u32 = 10;

impl Player {
    /// Goods of one type stored across all warehouses.
    pub fn stored_ware(&self, ware: WareType) -> u32 {
        self.warehouses
            .iter()
            .map(|wh| wh.inventory.ware(ware))
            .fold(0, u32::saturating_add)
    }

    /// Whether material is short and cannot be replenished.
    pub fn needs_emergency_program(&self) -> bool {
        let short = self.stored_ware(WareType::Boards) <= EMERGENCY_THRESHOLD
            || self.stored_ware(WareType::Stones) <= EMERGENCY_THRESHOLD;
        let cannot_produce = self.usual_buildings(BuildingType::Woodcutter).is_empty()
            || self.usual_buildings(BuildingType::Sawmill).is_empty();
        short && cannot_produce
    }

    /// Switch the emergency program on or off.
    ///
    /// Both edges are announced. When it ends, building sites order the
    /// material that was held back. Defeated players are left alone.
    ///
    /// Returns whether the state changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from reordering construction material.
    pub fn test_for_emergency_program(
        &mut self,
        ctx: &mut EconomyContext<'_>,
    ) -> Result<bool, EconomyError> {
        if self.is_defeated() {
            return Ok(false);
        }
        let wanted = self.needs_emergency_program();
        if wanted == self.emergency {
            return Ok(false);
        }
        self.emergency = wanted;
        info!(player = %self.id(), active = wanted, gf = ctx.gf, "emergency program switched");
        self.emit(EconomyEvent::EmergencyChanged { active: wanted });
        if wanted {
            self.post(ctx.gf, PostKind::EmergencyStarted);
        } else {
            self.post(ctx.gf, PostKind::EmergencyEnded);
            self.find_material_for_building_sites(ctx)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_types::{MapPoint, ObjectCounter, ObjectId, PlayerId, PlayerStatus, Team};
    use hamlet_world::SyncedRandom;

    use super::*;
    use crate::buildings::{BuildingSite, UsualBuilding};
    use crate::testing::TableOracle;
    use crate::warehouse::Warehouse;

    fn player_with_stock(boards: u32, stones: u32) -> Player {
        let mut player = Player::new(PlayerId::new(1), PlayerStatus::Occupied, Team::NoTeam);
        let mut hq = Warehouse::new(ObjectId::new(1), BuildingType::Headquarters, MapPoint::new(0, 0))
            .unwrap();
        hq.inventory.add_ware(WareType::Boards, boards);
        hq.inventory.add_ware(WareType::Stones, stones);
        player.add_warehouse(hq).unwrap();
        player.increase_inventory_ware(WareType::Boards, boards);
        player.increase_inventory_ware(WareType::Stones, stones);
        player
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(player_with_stock(10, 20).needs_emergency_program());
        assert!(!player_with_stock(11, 20).needs_emergency_program());
        assert!(player_with_stock(30, 10).needs_emergency_program());
    }

    #[test]
    fn production_of_both_materials_prevents_emergency() {
        let mut player = player_with_stock(0, 0);
        player
            .add_usual_building(UsualBuilding::new(ObjectId::new(2), BuildingType::Woodcutter, MapPoint::new(3, 0)))
            .unwrap();
        assert!(player.needs_emergency_program());
        player
            .add_usual_building(UsualBuilding::new(ObjectId::new(3), BuildingType::Sawmill, MapPoint::new(6, 0)))
            .unwrap();
        assert!(!player.needs_emergency_program());
    }

    #[test]
    fn edges_are_posted_and_held_back_material_is_ordered() {
        let oracle = TableOracle::new().with_path(MapPoint::new(0, 0), MapPoint::new(4, 0), 4);
        let mut rng = SyncedRandom::new(9);
        let mut ids = ObjectCounter::starting_at(50);
        let mut player = player_with_stock(10, 20);
        player
            .add_building_site(BuildingSite::new(ObjectId::new(5), BuildingType::Well, MapPoint::new(4, 0), 2, 0))
            .unwrap();

        let mut ctx = EconomyContext::new(&oracle, 10, &mut rng, &mut ids);
        assert!(player.test_for_emergency_program(&mut ctx).unwrap());
        assert!(player.is_emergency());
        assert!(!player.test_for_emergency_program(&mut ctx).unwrap());
        player.find_material_for_building_sites(&mut ctx).unwrap();
        assert_eq!(player.building_sites()[0].boards.ordered, 0);

        player.warehouse_mut(ObjectId::new(1)).unwrap().inventory.add_ware(WareType::Boards, 5);
        assert!(player.test_for_emergency_program(&mut ctx).unwrap());
        assert!(!player.is_emergency());
        assert_eq!(player.building_sites()[0].boards.ordered, 2);

        let posts: Vec<PostKind> = player.drain_outbox().posts.into_iter().map(|p| p.kind).collect();
        assert_eq!(posts, vec![PostKind::EmergencyStarted, PostKind::EmergencyEnded]);
    }
}
