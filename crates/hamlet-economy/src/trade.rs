//! Trade caravans between allied players.
//!
//! A player sends goods or people from its own warehouses to a warehouse
//! of an ally. Warehouses are drained nearest first until the requested
//! count is met, and every warehouse that contributes sends one caravan.
//! The goods leave the sender's economy when the caravan starts and join
//! the receiver's when it arrives.

use hamlet_types::{Job, MapPoint, ObjectId, PlayerId, WareType};
use hamlet_world::PathQueryPort;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::EconomyError;
use crate::events::EconomyEvent;
use crate::player::Player;
use crate::warehouse::Warehouse;

/// What a caravan carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum TradeGoods {
    /// Goods of one ware type.
    Ware(WareType),
    /// People with one job.
    Figure(Job),
}

impl TradeGoods {
    /// How many a warehouse could send.
    pub fn stock(self, wh: &Warehouse) -> u32 {
        match self {
            Self::Ware(ware) => wh.inventory.ware(ware.convert_shields()),
            Self::Figure(job) => wh.inventory.figure(job),
        }
    }
}

/// The warehouse a trade is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeGoal {
    /// Owner of the warehouse.
    pub owner: PlayerId,
    /// The warehouse.
    pub warehouse: ObjectId,
    /// Its flag.
    pub pos: MapPoint,
}

/// Goods on their way from one player to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeCaravan {
    /// Sending player.
    pub sender: PlayerId,
    /// Warehouse the goods left.
    pub from: ObjectId,
    /// Where they go.
    pub goal: TradeGoal,
    /// What is carried.
    pub goods: TradeGoods,
    /// How many.
    pub count: u32,
}

impl Player {
    /// Own warehouses that have a road to the trade goal.
    ///
    /// Empty when the goal belongs to this player or to a player that is
    /// not an ally.
    pub fn warehouses_for_trading(
        &self,
        paths: &dyn PathQueryPort,
        gf: u32,
        goal: &TradeGoal,
    ) -> Vec<ObjectId> {
        if !self.may_trade_with(goal.owner, gf) {
            return Vec::new();
        }
        self.warehouses
            .iter()
            .filter(|wh| paths.path_exists(wh.pos, goal.pos, false, None))
            .map(|wh| wh.id)
            .collect()
    }

    /// Send up to `count` goods to an ally's warehouse.
    ///
    /// Own warehouses are tried by distance to the goal, ties broken by
    /// id. Each sends what it has, up to what is still missing, if a road
    /// leads to the goal. Returns the caravans that set out; fewer goods
    /// than asked for may be sent.
    ///
    /// # Errors
    ///
    /// Returns an underflow error if a warehouse and the player's
    /// inventory disagree about the stock.
    pub fn trade(
        &mut self,
        paths: &dyn PathQueryPort,
        gf: u32,
        goal: TradeGoal,
        goods: TradeGoods,
        count: u32,
    ) -> Result<Vec<TradeCaravan>, EconomyError> {
        let mut caravans = Vec::new();
        if count == 0 || !self.may_trade_with(goal.owner, gf) {
            debug!(player = %self.id(), to = %goal.owner, count, "trade refused");
            return Ok(caravans);
        }

        let mut sources: Vec<(u32, ObjectId, MapPoint)> = self
            .warehouses
            .iter()
            .map(|wh| (paths.distance_estimate(wh.pos, goal.pos), wh.id, wh.pos))
            .collect();
        sources.sort_unstable_by_key(|&(distance, id, _)| (distance, id));

        let mut remaining = count;
        for (_, id, pos) in sources {
            if remaining == 0 {
                break;
            }
            let amount = self
                .warehouse(id)
                .map_or(0, |wh| goods.stock(wh))
                .min(remaining);
            if amount == 0 || !paths.path_exists(pos, goal.pos, false, None) {
                continue;
            }
            self.send_goods(id, goods, amount)?;
            remaining = remaining.saturating_sub(amount);
            self.emit(EconomyEvent::TradeCaravanSent {
                warehouse: id,
                to: goal.owner,
                goal: goal.warehouse,
                goods,
                count: amount,
            });
            caravans.push(TradeCaravan {
                sender: self.id(),
                from: id,
                goal,
                goods,
                count: amount,
            });
        }

        info!(
            player = %self.id(),
            to = %goal.owner,
            caravans = caravans.len(),
            sent = count.saturating_sub(remaining),
            requested = count,
            "trade sent"
        );
        Ok(caravans)
    }

    /// Store an arriving caravan in its goal warehouse.
    ///
    /// The goods are lost if the warehouse is gone.
    pub fn trade_arrived(&mut self, caravan: &TradeCaravan) {
        let Some(wh) = self.warehouse_mut(caravan.goal.warehouse) else {
            warn!(
                player = %self.id(),
                warehouse = %caravan.goal.warehouse,
                count = caravan.count,
                "trade goal gone, caravan lost"
            );
            return;
        };
        match caravan.goods {
            TradeGoods::Ware(ware) => {
                wh.inventory.add_ware(ware, caravan.count);
                self.increase_inventory_ware(ware, caravan.count);
            }
            TradeGoods::Figure(job) => {
                wh.inventory.add_figure(job, caravan.count);
                self.increase_inventory_job(job, caravan.count);
            }
        }
        self.emit(EconomyEvent::TradeCaravanArrived {
            warehouse: caravan.goal.warehouse,
            from: caravan.sender,
            goods: caravan.goods,
            count: caravan.count,
        });
    }

    fn may_trade_with(&self, other: PlayerId, gf: u32) -> bool {
        other != self.id() && self.is_ally(other, gf)
    }

    fn send_goods(&mut self, from: ObjectId, goods: TradeGoods, count: u32) -> Result<(), EconomyError> {
        let wh = self
            .warehouse_mut(from)
            .ok_or(EconomyError::BuildingNotFound(from))?;
        match goods {
            TradeGoods::Ware(ware) => {
                wh.take_ware(ware, count)?;
                self.decrease_inventory_ware(ware, count)
            }
            TradeGoods::Figure(job) => {
                wh.inventory.remove_figure(job, count)?;
                self.decrease_inventory_job(job, count)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_types::{BuildingType, PlayerStatus, Team};

    use super::*;
    use crate::testing::TableOracle;

    fn p(x: u16, y: u16) -> MapPoint {
        MapPoint::new(x, y)
    }

    fn team_players() -> [(PlayerId, Team); 3] {
        [
            (PlayerId::new(0), Team::Team1),
            (PlayerId::new(1), Team::Team1),
            (PlayerId::new(2), Team::Team2),
        ]
    }

    /// Player 0 with a storehouse near the goal and the headquarters far
    /// from it, both holding boards.
    fn trader() -> Player {
        let mut player = Player::new(PlayerId::new(0), PlayerStatus::Occupied, Team::Team1);
        player.make_start_pacts(&team_players()).unwrap();
        let mut hq = Warehouse::new(ObjectId::new(1), BuildingType::Headquarters, p(0, 0)).unwrap();
        hq.inventory.add_ware(WareType::Boards, 10);
        hq.inventory.add_figure(Job::Woodcutter, 2);
        let mut store = Warehouse::new(ObjectId::new(2), BuildingType::Storehouse, p(16, 0)).unwrap();
        store.inventory.add_ware(WareType::Boards, 3);
        player.add_warehouse(hq).unwrap();
        player.add_warehouse(store).unwrap();
        player.increase_inventory_ware(WareType::Boards, 13);
        player.increase_inventory_job(Job::Woodcutter, 2);
        player
    }

    fn goal(owner: u8) -> TradeGoal {
        TradeGoal {
            owner: PlayerId::new(owner),
            warehouse: ObjectId::new(50),
            pos: p(20, 0),
        }
    }

    fn roads() -> TableOracle {
        TableOracle::new()
            .with_path(p(0, 0), p(20, 0), 24)
            .with_path(p(16, 0), p(20, 0), 5)
    }

    #[test]
    fn only_allies_see_trading_warehouses() {
        let player = trader();
        let paths = roads();

        assert_eq!(
            player.warehouses_for_trading(&paths, 0, &goal(1)),
            vec![ObjectId::new(1), ObjectId::new(2)]
        );
        assert!(player.warehouses_for_trading(&paths, 0, &goal(2)).is_empty());
        assert!(player.warehouses_for_trading(&paths, 0, &goal(0)).is_empty());

        let cut = TableOracle::new().with_path(p(16, 0), p(20, 0), 5);
        assert_eq!(
            player.warehouses_for_trading(&cut, 0, &goal(1)),
            vec![ObjectId::new(2)]
        );
    }

    #[test]
    fn trade_takes_from_the_nearest_warehouse_first() {
        let mut player = trader();
        let caravans = player
            .trade(&roads(), 0, goal(1), TradeGoods::Ware(WareType::Boards), 5)
            .unwrap();

        assert_eq!(caravans.len(), 2);
        assert_eq!((caravans[0].from, caravans[0].count), (ObjectId::new(2), 3));
        assert_eq!((caravans[1].from, caravans[1].count), (ObjectId::new(1), 2));
        assert_eq!(player.warehouse(ObjectId::new(2)).unwrap().inventory.ware(WareType::Boards), 0);
        assert_eq!(player.warehouse(ObjectId::new(1)).unwrap().inventory.ware(WareType::Boards), 8);
        assert_eq!(player.global_inventory().ware(WareType::Boards), 8);

        let sent = player
            .drain_outbox()
            .events
            .into_iter()
            .filter(|event| matches!(event, EconomyEvent::TradeCaravanSent { .. }))
            .count();
        assert_eq!(sent, 2);
    }

    #[test]
    fn trade_is_limited_by_stock_and_roads() {
        let mut player = trader();
        let only_store = TableOracle::new().with_path(p(16, 0), p(20, 0), 5);
        let caravans = player
            .trade(&only_store, 0, goal(1), TradeGoods::Ware(WareType::Boards), 7)
            .unwrap();
        assert_eq!(caravans.len(), 1);
        assert_eq!(caravans[0].count, 3);
        assert_eq!(player.global_inventory().ware(WareType::Boards), 10);

        let people = player
            .trade(&roads(), 0, goal(1), TradeGoods::Figure(Job::Woodcutter), 5)
            .unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!((people[0].from, people[0].count), (ObjectId::new(1), 2));
        assert_eq!(player.global_inventory().figure(Job::Woodcutter), 0);
    }

    #[test]
    fn trade_with_strangers_or_nothing_sends_nothing() {
        let mut player = trader();
        let boards = TradeGoods::Ware(WareType::Boards);
        assert!(player.trade(&roads(), 0, goal(2), boards, 5).unwrap().is_empty());
        assert!(player.trade(&roads(), 0, goal(0), boards, 5).unwrap().is_empty());
        assert!(player.trade(&roads(), 0, goal(1), boards, 0).unwrap().is_empty());
        assert_eq!(player.global_inventory().ware(WareType::Boards), 13);
    }

    #[test]
    fn arriving_caravan_joins_the_receivers_economy() {
        let mut receiver = Player::new(PlayerId::new(1), PlayerStatus::Occupied, Team::Team1);
        receiver
            .add_warehouse(Warehouse::new(ObjectId::new(50), BuildingType::Storehouse, p(20, 0)).unwrap())
            .unwrap();
        let caravan = TradeCaravan {
            sender: PlayerId::new(0),
            from: ObjectId::new(2),
            goal: goal(1),
            goods: TradeGoods::Ware(WareType::Boards),
            count: 3,
        };
        receiver.trade_arrived(&caravan);
        assert_eq!(receiver.warehouse(ObjectId::new(50)).unwrap().inventory.ware(WareType::Boards), 3);
        assert_eq!(receiver.global_inventory().ware(WareType::Boards), 3);

        let lost = TradeCaravan {
            goal: TradeGoal {
                warehouse: ObjectId::new(99),
                ..goal(1)
            },
            ..caravan
        };
        receiver.trade_arrived(&lost);
        assert_eq!(receiver.global_inventory().ware(WareType::Boards), 3);
        let arrived = receiver
            .drain_outbox()
            .events
            .into_iter()
            .filter(|event| matches!(event, EconomyEvent::TradeCaravanArrived { .. }))
            .count();
        assert_eq!(arrived, 1);
    }
}
