//! Choosing where a ware goes.
//!
//! Every building that wants a ware scores it with demand points. A road
//! step costs half a point, so the best consumer maximises
//! `points - path_length / 2`. Candidates are sorted by an optimistic score
//! based on the straight-line distance; the walk stops as soon as no
//! remaining candidate can beat the best real score, and each path search
//! is budgeted so it gives up once the candidate could no longer win.

use hamlet_types::{BuildingType, MapPoint, ObjectId, WareId, WareType};
use hamlet_world::PathQueryPort;
use tracing::debug;

use crate::error::EconomyError;
use crate::events::EconomyEvent;
use crate::locator::{WarehouseMatch, WarehouseQuery, find_warehouse};
use crate::player::Player;
use crate::wares::{Ware, WareLocation};
use crate::warehouse::WarehouseCondition;
use crate::EconomyContext;

/// Bonus or malus for the building type the goal cursor points at.
const GOAL_BONUS: u32 = 300;

/// Bonus of a harbor collecting material for an expedition.
const HARBOR_BONUS: u32 = 300;

/// Extra site points per distribution percent of the site slot.
const SITE_PERCENT_FACTOR: u32 = 30;

/// A building that wants a ware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCandidate {
    /// The building.
    pub id: ObjectId,
    /// Its flag.
    pub pos: MapPoint,
    /// Demand points.
    pub points: u32,
    /// Upper bound of the real score.
    pub estimate: u32,
}

impl ClientCandidate {
    /// A candidate scored against the straight-line distance from `start`.
    pub fn new(
        paths: &dyn PathQueryPort,
        start: MapPoint,
        id: ObjectId,
        pos: MapPoint,
        points: u32,
    ) -> Self {
        let distance = paths.distance_estimate(start, pos) / 2;
        Self {
            id,
            pos,
            points,
            estimate: points.saturating_sub(distance),
        }
    }
}

/// The consumer a search settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientChoice {
    /// The building.
    pub id: ObjectId,
    /// Demand points minus half the path length.
    pub score: u32,
}

/// Sort candidates best first: estimate, then points, then id, all
/// descending.
pub fn rank_candidates(candidates: &mut [ClientCandidate]) {
    candidates.sort_unstable_by(|a, b| {
        b.estimate
            .cmp(&a.estimate)
            .then(b.points.cmp(&a.points))
            .then(b.id.cmp(&a.id))
    });
}

/// Pick the best consumer from ranked candidates.
///
/// Equal scores keep the candidate ranked first. A consumer must score at
/// least 1.
pub fn select_client(
    candidates: &[ClientCandidate],
    paths: &dyn PathQueryPort,
    start: MapPoint,
) -> Option<ClientChoice> {
    let mut best: Option<ClientChoice> = None;
    let mut best_score = 0_u32;
    let mut last: Option<ObjectId> = None;

    for candidate in candidates {
        if candidate.estimate <= best_score {
            break;
        }
        if last == Some(candidate.id) {
            continue;
        }
        last = Some(candidate.id);
        if candidate.points <= best_score {
            continue;
        }
        // Any path longer than this scores at most `best_score`.
        let budget = candidate
            .points
            .saturating_sub(best_score)
            .saturating_mul(2)
            .saturating_sub(1);
        let Some(length) = paths.find_path_budgeted(start, candidate.pos, budget) else {
            continue;
        };
        let score = candidate.points.saturating_sub(length / 2);
        if score > best_score {
            best_score = score;
            best = Some(ClientChoice {
                id: candidate.id,
                score,
            });
        }
    }
    best
}

/// The distribution whose client buildings consume a ware type.
///
/// Bread and meat go to the same buildings as fish. Their goals, percentages
/// and cursor stay their own.
const fn client_table(ware: WareType) -> WareType {
    match ware {
        WareType::Bread | WareType::Meat => WareType::Fish,
        other => other,
    }
}

impl Player {
    /// Collect every building that wants `ware` right now.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::SitePriorityNotFound`] if a building site has
    /// no build priority.
    pub fn client_candidates(
        &self,
        paths: &dyn PathQueryPort,
        ware: WareType,
        start: MapPoint,
    ) -> Result<Vec<ClientCandidate>, EconomyError> {
        let mut candidates = Vec::new();
        let (Some(dist), Some(clients)) = (
            self.distribution.get(ware),
            self.distribution.get(client_table(ware)),
        ) else {
            return Ok(candidates);
        };
        let goal = dist.current_goal();

        if matches!(ware, WareType::Boards | WareType::Stones) {
            for wh in self.harbors.iter().filter_map(|id| self.warehouse(*id)) {
                let need = wh.harbor.as_ref().map_or(0, |h| h.demand.points(ware));
                if need > 0 {
                    let points = need.saturating_add(HARBOR_BONUS);
                    candidates.push(ClientCandidate::new(paths, start, wh.id, wh.pos, points));
                }
            }
        }

        for kind in &clients.client_buildings {
            if *kind == BuildingType::Headquarters {
                let bonus = u32::from(dist.percent_of(BuildingType::Headquarters))
                    .saturating_mul(SITE_PERCENT_FACTOR);
                for site in &self.building_sites {
                    let priority = self.building_site_priority(site.id)?;
                    let points = site.distribution_points(ware, priority);
                    if points > 0 {
                        candidates.push(ClientCandidate::new(
                            paths,
                            start,
                            site.id,
                            site.pos,
                            points.saturating_add(bonus),
                        ));
                    }
                }
                continue;
            }
            for building in self.usual_buildings(*kind) {
                let mut points = building.demand.points(ware);
                if points == 0 {
                    continue;
                }
                if !dist.goals.is_empty() {
                    points = if goal == Some(*kind) {
                        points.saturating_add(GOAL_BONUS)
                    } else {
                        points.saturating_sub(GOAL_BONUS)
                    };
                }
                if points > 0 {
                    candidates.push(ClientCandidate::new(
                        paths,
                        start,
                        building.id,
                        building.pos,
                        points,
                    ));
                }
            }
        }
        Ok(candidates)
    }

    /// Find the building a ware at `start` should be delivered to.
    ///
    /// Coins go to military buildings. When no building wants the ware it
    /// goes to a warehouse; `None` means nothing is reachable at all.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::SitePriorityNotFound`] if a building site has
    /// no build priority.
    pub fn find_client_for_ware(
        &mut self,
        paths: &dyn PathQueryPort,
        ware: WareType,
        start: MapPoint,
    ) -> Result<Option<ObjectId>, EconomyError> {
        if ware == WareType::Coins {
            return Ok(self.find_client_for_coin(paths, start));
        }
        let mut candidates = self.client_candidates(paths, ware, start)?;
        rank_candidates(&mut candidates);
        if let Some(choice) = select_client(&candidates, paths, start) {
            if let Some(dist) = self.distribution.get_mut(ware)
                && !dist.goals.is_empty()
            {
                dist.advance();
            }
            return Ok(Some(choice.id));
        }
        Ok(self
            .find_warehouse_for_ware(paths, start, ware)
            .map(|found| found.id))
    }

    /// Find the military building that profits most from a coin.
    ///
    /// Falls back to a warehouse when no building wants coins.
    pub fn find_client_for_coin(
        &self,
        paths: &dyn PathQueryPort,
        start: MapPoint,
    ) -> Option<ObjectId> {
        let mut best = None;
        let mut best_points = 0_u32;
        for building in &self.military_buildings {
            if building.coin_points == 0 {
                continue;
            }
            let Some(way) = paths.find_path_budgeted(start, building.pos, u32::MAX) else {
                continue;
            };
            let Some(points) = building.coin_points.checked_sub(way) else {
                continue;
            };
            if points > best_points {
                best_points = points;
                best = Some(building.id);
            }
        }
        best.or_else(|| {
            self.find_warehouse_for_ware(paths, start, WareType::Coins)
                .map(|found| found.id)
        })
    }

    /// Find a warehouse to store a ware in.
    ///
    /// Warehouses collecting the ware come first, then those that accept it
    /// without sending it away again, then any that accepts it.
    pub fn find_warehouse_for_ware(
        &self,
        paths: &dyn PathQueryPort,
        start: MapPoint,
        ware: WareType,
    ) -> Option<WarehouseMatch> {
        [
            WarehouseCondition::CollectsWare(ware),
            WarehouseCondition::AcceptsWareButNoSend(ware),
            WarehouseCondition::AcceptsWare(ware),
        ]
        .into_iter()
        .find_map(|condition| {
            let query = WarehouseQuery::from_warehouse(start, condition)
                .towards()
                .with_boats();
            find_warehouse(&self.warehouses, paths, &query)
        })
    }

    /// A building now expects one ware of this type.
    pub(crate) fn claim_goal(&mut self, goal: ObjectId, ware: WareType) {
        if let Some(need) = self
            .building_sites
            .iter_mut()
            .find(|site| site.id == goal)
            .and_then(|site| site.material_mut(ware))
        {
            need.ordered = need.ordered.saturating_add(1);
        }
    }

    /// A ware that was on its way to `goal` will not arrive.
    pub(crate) fn release_goal(&mut self, goal: ObjectId, ware: WareType) {
        if let Some(need) = self
            .building_sites
            .iter_mut()
            .find(|site| site.id == goal)
            .and_then(|site| site.material_mut(ware))
        {
            need.ordered = need.ordered.saturating_sub(1);
        }
    }

    /// Give a ware a new goal, or mark it lost.
    pub(crate) fn route_ware(
        &mut self,
        paths: &dyn PathQueryPort,
        index: usize,
    ) -> Result<(), EconomyError> {
        let Some(ware) = self.wares.get(index).copied() else {
            return Ok(());
        };
        let goal = self.find_client_for_ware(paths, ware.kind, ware.pos)?;
        if let Some(goal) = goal {
            self.claim_goal(goal, ware.kind);
        }
        if let Some(slot) = self.wares.get_mut(index) {
            slot.goal = goal;
        }
        match goal {
            Some(goal) => self.emit(EconomyEvent::WareRouted {
                ware: ware.id,
                kind: ware.kind,
                goal,
            }),
            None => {
                debug!(player = %self.id(), ware = %ware.id, kind = ?ware.kind, "ware is lost");
                self.emit(EconomyEvent::WareLost { ware: ware.id });
            }
        }
        Ok(())
    }

    /// A production building put a ware on its flag.
    ///
    /// The ware is counted, then sent to the best consumer.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::IdsExhausted`] or a site priority error.
    pub fn ware_produced(
        &mut self,
        ctx: &mut EconomyContext<'_>,
        kind: WareType,
        at: MapPoint,
    ) -> Result<WareId, EconomyError> {
        let id = ctx.next_ware()?;
        self.inventory.add_ware(kind, 1);
        self.statistics.increase_merchandise(kind);
        self.wares.push(Ware::lost_at(id, kind, at));
        let index = self.wares.len().saturating_sub(1);
        self.route_ware(ctx.paths, index)?;
        Ok(id)
    }

    /// A ware reached its goal and leaves the transport system.
    ///
    /// Warehouses store it, building sites count it as delivered, any other
    /// building consumes it.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WareNotFound`] for an unknown handle.
    pub fn ware_delivered(&mut self, id: WareId) -> Result<(), EconomyError> {
        let ware = self.remove_ware(id)?;
        let goal = ware.goal;
        if let Some(wh) = goal.and_then(|goal| self.warehouse_mut(goal)) {
            wh.inventory.add_ware(ware.kind, 1);
            return Ok(());
        }
        if let Some(need) = goal.and_then(|goal| {
            self.building_sites
                .iter_mut()
                .find(|site| site.id == goal)
                .and_then(|site| site.material_mut(ware.kind))
        }) {
            need.ordered = need.ordered.saturating_sub(1);
            need.delivered = need.delivered.saturating_add(1);
            return Ok(());
        }
        self.inventory.remove_ware(ware.kind, 1)
    }

    /// Send every lost ware lying at a flag to a warehouse.
    pub fn find_client_for_lost_wares(&mut self, paths: &dyn PathQueryPort) {
        for index in 0..self.wares.len() {
            let Some(ware) = self
                .wares
                .get(index)
                .copied()
                .filter(|ware| ware.is_lost() && ware.location == WareLocation::AtFlag)
            else {
                continue;
            };
            let Some(found) = self.find_warehouse_for_ware(paths, ware.pos, ware.kind) else {
                continue;
            };
            if let Some(slot) = self.wares.get_mut(index) {
                slot.goal = Some(found.id);
            }
            self.emit(EconomyEvent::WareRouted {
                ware: ware.id,
                kind: ware.kind,
                goal: found.id,
            });
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use hamlet_types::{ObjectCounter, PlayerId, PlayerStatus, RoadId, Team};
    use hamlet_world::{RoadGraph, RoadSegment, SyncedRandom};

    use super::*;
    use crate::buildings::{BuildingSite, MilitaryBuilding, UsualBuilding};
    use crate::testing::TableOracle;
    use crate::warehouse::Warehouse;

    fn p(x: u16, y: u16) -> MapPoint {
        MapPoint::new(x, y)
    }

    /// Reference answer: the first ranked candidate with the highest real
    /// score.
    fn brute_force(
        candidates: &[ClientCandidate],
        paths: &dyn PathQueryPort,
        start: MapPoint,
    ) -> Option<ClientChoice> {
        let mut best: Option<ClientChoice> = None;
        for candidate in candidates {
            let Some(length) = paths.find_path_budgeted(start, candidate.pos, u32::MAX) else {
                continue;
            };
            let Some(score) = candidate.points.checked_sub(length / 2).filter(|s| *s > 0) else {
                continue;
            };
            if best.is_none_or(|b| score > b.score) {
                best = Some(ClientChoice {
                    id: candidate.id,
                    score,
                });
            }
        }
        best
    }

    fn random_graph(rng: &mut SyncedRandom, nodes: &[MapPoint]) -> RoadGraph {
        let mut graph = RoadGraph::new();
        let mut next = 0_u32;
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if a == b || rng.rand(3) != 0 {
                    continue;
                }
                let length = a.chebyshev(*b) + rng.rand(6);
                next += 1;
                let segment = RoadSegment {
                    a: *a,
                    b: *b,
                    length,
                    boat: false,
                };
                graph.add_road(RoadId::new(next), segment).unwrap();
            }
        }
        graph
    }

    #[test]
    fn pruned_search_matches_brute_force() {
        let mut rng = SyncedRandom::new(2024);
        for _ in 0..300 {
            let nodes: Vec<MapPoint> = (0..8)
                .map(|_| p(rng.rand(16) as u16, rng.rand(16) as u16))
                .collect();
            let graph = random_graph(&mut rng, &nodes);
            let start = nodes[0];
            let mut candidates: Vec<ClientCandidate> = (1..nodes.len())
                .map(|i| {
                    let points = rng.rand(12);
                    ClientCandidate::new(&graph, start, ObjectId::new(i as u32), nodes[i], points)
                })
                .collect();
            rank_candidates(&mut candidates);
            assert_eq!(
                select_client(&candidates, &graph, start),
                brute_force(&candidates, &graph, start)
            );
        }
    }

    #[test]
    fn ranking_breaks_ties_by_points_then_id() {
        let oracle = TableOracle::new();
        let mut candidates = vec![
            ClientCandidate::new(&oracle, p(0, 0), ObjectId::new(1), p(0, 0), 10),
            ClientCandidate::new(&oracle, p(0, 0), ObjectId::new(3), p(0, 0), 10),
            ClientCandidate::new(&oracle, p(0, 0), ObjectId::new(2), p(2, 0), 11),
        ];
        rank_candidates(&mut candidates);
        let order: Vec<u32> = candidates.iter().map(|c| c.id.into_inner()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn cut_off_avoids_hopeless_searches() {
        // The second candidate's estimate cannot beat the first real score.
        let oracle = TableOracle::new()
            .with_path(p(0, 0), p(2, 0), 2)
            .with_path(p(0, 0), p(40, 0), 40);
        let mut candidates = vec![
            ClientCandidate::new(&oracle, p(0, 0), ObjectId::new(1), p(2, 0), 50),
            ClientCandidate::new(&oracle, p(0, 0), ObjectId::new(2), p(40, 0), 60),
        ];
        rank_candidates(&mut candidates);
        let choice = select_client(&candidates, &oracle, p(0, 0)).unwrap();
        assert_eq!(choice, ClientChoice { id: ObjectId::new(1), score: 49 });
    }

    fn player_with_hq(pos: MapPoint) -> Player {
        let mut player = Player::new(PlayerId::new(0), PlayerStatus::Occupied, Team::NoTeam);
        player
            .add_warehouse(Warehouse::new(ObjectId::new(100), BuildingType::Headquarters, pos).unwrap())
            .unwrap();
        player
    }

    #[test]
    fn goal_cursor_alternates_between_site_and_metalworks() {
        let start = p(0, 0);
        let oracle = TableOracle::new()
            .with_path(start, p(2, 0), 2)
            .with_path(start, p(0, 2), 2);
        let mut player = player_with_hq(p(30, 30));
        player
            .add_building_site(BuildingSite::new(ObjectId::new(1), BuildingType::Mill, p(2, 0), 4, 0))
            .unwrap();
        let mut works = UsualBuilding::new(ObjectId::new(2), BuildingType::Metalworks, p(0, 2));
        works.demand.set(WareType::Boards, 10_200);
        player.add_usual_building(works).unwrap();

        // Cursor on the site slot: site 10000 + 300 beats metalworks 9900.
        let first = player
            .find_client_for_ware(&oracle, WareType::Boards, start)
            .unwrap();
        assert_eq!(first, Some(ObjectId::new(1)));
        player.claim_goal(ObjectId::new(1), WareType::Boards);
        // 907 mod 16 lands on the metalworks slots.
        let dist = player.distribution().get(WareType::Boards).unwrap();
        assert_eq!(dist.current_goal(), Some(BuildingType::Metalworks));

        let second = player
            .find_client_for_ware(&oracle, WareType::Boards, start)
            .unwrap();
        assert_eq!(second, Some(ObjectId::new(2)));
    }

    #[test]
    fn bread_and_meat_use_fish_clients_but_not_its_cursor() {
        let start = p(0, 0);
        let oracle = TableOracle::new()
            .with_path(start, p(2, 0), 2)
            .with_path(start, p(0, 2), 2);
        let mut player = player_with_hq(p(30, 30));
        let mut granite = UsualBuilding::new(ObjectId::new(1), BuildingType::GraniteMine, p(2, 0));
        granite.demand.set(WareType::Bread, 100);
        granite.demand.set(WareType::Meat, 100);
        let mut coal = UsualBuilding::new(ObjectId::new(2), BuildingType::CoalMine, p(0, 2));
        coal.demand.set(WareType::Bread, 110);
        coal.demand.set(WareType::Meat, 110);
        player.add_usual_building(granite).unwrap();
        player.add_usual_building(coal).unwrap();
        let fish_goal = |player: &Player| {
            player.distribution().get(WareType::Fish).unwrap().selected_goal
        };
        assert_eq!(
            player.distribution().get(WareType::Fish).unwrap().current_goal(),
            Some(BuildingType::GraniteMine)
        );

        // No fish goal bonus: the higher demand wins.
        for ware in [WareType::Bread, WareType::Meat] {
            let goal = player.find_client_for_ware(&oracle, ware, start).unwrap();
            assert_eq!(goal, Some(ObjectId::new(2)));
            assert_eq!(fish_goal(&player), 0);
        }
    }

    #[test]
    fn unwanted_ware_goes_to_a_warehouse() {
        let start = p(0, 0);
        let oracle = TableOracle::new().with_path(start, p(5, 5), 7);
        let mut player = player_with_hq(p(5, 5));
        let goal = player
            .find_client_for_ware(&oracle, WareType::Beer, start)
            .unwrap();
        assert_eq!(goal, Some(ObjectId::new(100)));
    }

    #[test]
    fn coins_go_to_the_military_building_that_gains_most() {
        let start = p(0, 0);
        let oracle = TableOracle::new()
            .with_path(start, p(4, 0), 4)
            .with_path(start, p(9, 0), 9);
        let mut player = player_with_hq(p(30, 30));
        let mut near = MilitaryBuilding::new(ObjectId::new(1), BuildingType::Barracks, p(4, 0));
        near.coin_points = 10;
        let mut far = MilitaryBuilding::new(ObjectId::new(2), BuildingType::Fortress, p(9, 0));
        far.coin_points = 30;
        player.add_military_building(near).unwrap();
        player.add_military_building(far).unwrap();
        assert_eq!(
            player.find_client_for_coin(&oracle, start),
            Some(ObjectId::new(2))
        );
    }

    #[test]
    fn warehouse_preference_follows_settings() {
        let start = p(0, 0);
        let oracle = TableOracle::new()
            .with_path(start, p(2, 0), 2)
            .with_path(start, p(8, 0), 8);
        let mut player = player_with_hq(p(2, 0));
        let mut store =
            Warehouse::new(ObjectId::new(101), BuildingType::Storehouse, p(8, 0)).unwrap();
        store.ware_settings[WareType::Wood.index()] =
            crate::warehouse::InventorySetting::from_bits(crate::warehouse::InventorySetting::COLLECT);
        player.add_warehouse(store).unwrap();
        let found = player
            .find_warehouse_for_ware(&oracle, start, WareType::Wood)
            .unwrap();
        assert_eq!(found.id, ObjectId::new(101));
        let found = player
            .find_warehouse_for_ware(&oracle, start, WareType::Fish)
            .unwrap();
        assert_eq!(found.id, ObjectId::new(100));
    }

    #[test]
    fn produced_ware_is_counted_and_delivered() {
        let start = p(0, 0);
        let oracle = TableOracle::new().with_path(start, p(2, 0), 2);
        let mut player = player_with_hq(p(30, 30));
        player
            .add_building_site(BuildingSite::new(ObjectId::new(1), BuildingType::Mill, p(2, 0), 1, 0))
            .unwrap();
        let mut rng = SyncedRandom::new(1);
        let mut ids = ObjectCounter::starting_at(500);
        let mut ctx = EconomyContext::new(&oracle, 10, &mut rng, &mut ids);

        let ware = player.ware_produced(&mut ctx, WareType::Boards, start).unwrap();
        assert_eq!(player.ware(ware).unwrap().goal, Some(ObjectId::new(1)));
        assert_eq!(player.building_sites()[0].boards.ordered, 1);
        assert_eq!(player.global_inventory().ware(WareType::Boards), 1);

        player.ware_delivered(ware).unwrap();
        let site = &player.building_sites()[0];
        assert_eq!((site.boards.ordered, site.boards.delivered), (0, 1));
        assert!(player.wares().is_empty());
    }
}
