//! Workers, road staff, construction material and troops.
//!
//! Requests that cannot be served right away are remembered and re-resolved
//! whenever the road network changes: a new road may connect a workplace to
//! a warehouse that has the worker, while a destroyed road may strand wares
//! and staff.

use hamlet_types::{BuildingType, Job, MapPoint, ObjectId, RoadId, WareId, WareType};
use hamlet_world::PathQueryPort;
use tracing::{debug, info};

use crate::EconomyContext;
use crate::error::EconomyError;
use crate::events::EconomyEvent;
use crate::locator::{WarehouseMatch, WarehouseQuery, find_warehouse};
use crate::player::{JobRequest, Player};
use crate::roads::{Road, Staffing};
use crate::wares::{Ware, WareLocation};
use crate::warehouse::WarehouseCondition;

/// Frontier distance of military buildings right at the border.
const BORDER_DISTANCE: u8 = 2;

/// Which worker slot of a road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoadSlot {
    Carrier,
    Donkey,
}

impl Player {
    // -------------------------------------------------------------------
    // Jobs
    // -------------------------------------------------------------------

    /// A workplace wants a worker. Tries to send one at once and queues the
    /// request otherwise.
    ///
    /// Returns whether a worker was sent.
    ///
    /// # Errors
    ///
    /// Propagates inventory underflows from the warehouse.
    pub fn add_job_wanted(
        &mut self,
        paths: &dyn PathQueryPort,
        job: Job,
        workplace: ObjectId,
    ) -> Result<bool, EconomyError> {
        if self.find_warehouse_for_job(paths, job, workplace)? {
            return Ok(true);
        }
        self.jobs_wanted.push(JobRequest { job, workplace });
        Ok(false)
    }

    /// Drop queued requests of a workplace: every one when `all` is set,
    /// otherwise only the oldest.
    pub fn job_not_wanted(&mut self, workplace: ObjectId, all: bool) {
        if all {
            self.jobs_wanted.retain(|request| request.workplace != workplace);
        } else if let Some(index) = self
            .jobs_wanted
            .iter()
            .position(|request| request.workplace == workplace)
        {
            self.jobs_wanted.remove(index);
        }
    }

    /// Drop the oldest queued request for exactly this job and workplace.
    pub fn one_job_not_wanted(&mut self, job: Job, workplace: ObjectId) {
        if let Some(index) = self
            .jobs_wanted
            .iter()
            .position(|request| request.workplace == workplace && request.job == job)
        {
            self.jobs_wanted.remove(index);
        }
    }

    /// Send a worker from the nearest warehouse that has one or can recruit
    /// one.
    ///
    /// Returns `false` if the workplace is unknown or no warehouse can
    /// serve it.
    ///
    /// # Errors
    ///
    /// Propagates inventory underflows from the warehouse.
    pub fn find_warehouse_for_job(
        &mut self,
        paths: &dyn PathQueryPort,
        job: Job,
        workplace: ObjectId,
    ) -> Result<bool, EconomyError> {
        let Some((pos, _)) = self.building_info(workplace) else {
            return Ok(false);
        };
        let condition = WarehouseCondition::HasFigure { job, recruit: true };
        let query = WarehouseQuery::from_warehouse(pos, condition);
        let Some(found) = find_warehouse(&self.warehouses, paths, &query) else {
            return Ok(false);
        };
        let recruited = self.send_figure(&found, job)?;
        self.emit(EconomyEvent::JobOrdered {
            job,
            workplace,
            warehouse: found.id,
            recruited,
        });
        Ok(true)
    }

    /// Retry queued requests, all of them or only those for `filter`.
    ///
    /// # Errors
    ///
    /// Propagates inventory underflows from the warehouses.
    pub fn find_warehouse_for_all_jobs(
        &mut self,
        paths: &dyn PathQueryPort,
        filter: Option<Job>,
    ) -> Result<(), EconomyError> {
        let pending = std::mem::take(&mut self.jobs_wanted);
        let mut still_wanted = Vec::with_capacity(pending.len());
        for request in pending {
            let matches = filter.is_none_or(|job| job == request.job);
            if matches && self.find_warehouse_for_job(paths, request.job, request.workplace)? {
                continue;
            }
            still_wanted.push(request);
        }
        // Requests queued while retrying keep their place behind the old ones.
        still_wanted.append(&mut self.jobs_wanted);
        self.jobs_wanted = still_wanted;
        Ok(())
    }

    /// Take one person for `job` out of a found warehouse.
    ///
    /// A recruit turns a helper and the job's tool into the new worker.
    fn send_figure(&mut self, found: &WarehouseMatch, job: Job) -> Result<bool, EconomyError> {
        let Some(wh) = self.warehouses.get_mut(found.index) else {
            return Err(EconomyError::BuildingNotFound(found.id));
        };
        let recruited = wh.take_figure(job, true)?;
        if recruited {
            self.inventory.remove_figure(Job::Helper, 1)?;
            self.inventory.add_figure(job, 1);
            if let Some(tool) = job.tool() {
                self.inventory.remove_ware(tool, 1)?;
            }
        }
        Ok(recruited)
    }

    // -------------------------------------------------------------------
    // Roads
    // -------------------------------------------------------------------

    /// Nearest warehouse meeting `condition`, searched from both flags of a
    /// road without using the road itself.
    ///
    /// Returns the flag the worker walks to. The first flag wins unless the
    /// second is strictly closer.
    fn find_warehouse_for_road(
        &self,
        paths: &dyn PathQueryPort,
        road: &Road,
        condition: WarehouseCondition,
    ) -> Option<WarehouseMatch> {
        let search = |flag: MapPoint| {
            let query = WarehouseQuery::from_warehouse(flag, condition).avoiding(road.id);
            find_warehouse(&self.warehouses, paths, &query)
        };
        match (search(road.a), search(road.b)) {
            (Some(first), Some(second)) if second.length < first.length => Some(second),
            (Some(first), _) => Some(first),
            (None, second) => second,
        }
    }

    fn road_index(&self, id: RoadId) -> Result<usize, EconomyError> {
        self.roads
            .iter()
            .position(|road| road.id == id)
            .ok_or(EconomyError::RoadNotFound(id))
    }

    /// Order a carrier for a road. Boat roads need a helper and a boat.
    ///
    /// Returns whether one was sent.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::RoadNotFound`] for an unknown road, or an
    /// underflow from the warehouse.
    pub fn find_carrier_for_road(
        &mut self,
        paths: &dyn PathQueryPort,
        road_id: RoadId,
    ) -> Result<bool, EconomyError> {
        let index = self.road_index(road_id)?;
        let Some(road) = self.roads.get(index).copied() else {
            return Err(EconomyError::RoadNotFound(road_id));
        };
        let condition = if road.boat {
            WarehouseCondition::HasWareAndFigure {
                ware: WareType::Boat,
                job: Job::Helper,
                recruit: false,
            }
        } else {
            WarehouseCondition::HasFigure {
                job: Job::Helper,
                recruit: false,
            }
        };
        let Some(found) = self.find_warehouse_for_road(paths, &road, condition) else {
            return Ok(false);
        };
        if let Some(wh) = self.warehouses.get_mut(found.index) {
            wh.take_figure(Job::Helper, false)?;
            if road.boat {
                wh.take_ware(WareType::Boat, 1)?;
            }
        }
        self.staff_road(index, RoadSlot::Carrier, found.id);
        self.emit(EconomyEvent::CarrierOrdered {
            road: road_id,
            warehouse: found.id,
        });
        Ok(true)
    }

    /// Order carriers for every road that has none.
    ///
    /// # Errors
    ///
    /// Propagates warehouse underflows.
    pub fn find_warehouse_for_all_roads(
        &mut self,
        paths: &dyn PathQueryPort,
    ) -> Result<(), EconomyError> {
        let vacant: Vec<RoadId> = self
            .roads
            .iter()
            .filter(|road| !road.carrier.is_staffed())
            .map(|road| road.id)
            .collect();
        for road in vacant {
            self.find_carrier_for_road(paths, road)?;
        }
        Ok(())
    }

    /// Order a pack donkey for a road.
    ///
    /// Returns whether one was sent.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::RoadNotFound`] for an unknown road, or an
    /// underflow from the warehouse.
    pub fn order_donkey(
        &mut self,
        paths: &dyn PathQueryPort,
        road_id: RoadId,
    ) -> Result<bool, EconomyError> {
        let index = self.road_index(road_id)?;
        let Some(road) = self.roads.get(index).copied() else {
            return Err(EconomyError::RoadNotFound(road_id));
        };
        let condition = WarehouseCondition::HasFigure {
            job: Job::PackDonkey,
            recruit: false,
        };
        let Some(found) = self.find_warehouse_for_road(paths, &road, condition) else {
            return Ok(false);
        };
        if let Some(wh) = self.warehouses.get_mut(found.index) {
            wh.take_figure(Job::PackDonkey, false)?;
        }
        self.staff_road(index, RoadSlot::Donkey, found.id);
        self.emit(EconomyEvent::DonkeyOrdered {
            road: road_id,
            warehouse: found.id,
        });
        Ok(true)
    }

    fn staff_road(&mut self, index: usize, slot: RoadSlot, warehouse: ObjectId) {
        if let Some(road) = self.roads.get_mut(index) {
            match slot {
                RoadSlot::Carrier => road.carrier = Staffing::Ordered(warehouse),
                RoadSlot::Donkey => road.donkey = Staffing::Ordered(warehouse),
            }
        }
    }

    /// Pick the road a new donkey at `start` should work on.
    ///
    /// Among roads that want a donkey and can be reached without crossing
    /// them, the highest `10 * carrier productivity + way` wins. Returns the
    /// road and the flag to walk to.
    pub fn find_road_for_donkey(
        &self,
        paths: &dyn PathQueryPort,
        start: MapPoint,
    ) -> Option<(RoadId, MapPoint)> {
        let mut best = None;
        let mut best_value = 0_u32;
        for road in self.roads.iter().filter(|road| road.needs_donkey()) {
            let to_a = paths.find_path(start, road.a, false, u32::MAX, Some(road.id));
            let to_b = paths.find_path(start, road.b, false, u32::MAX, Some(road.id));
            let (flag, way) = match (to_a, to_b) {
                (Some(a), Some(b)) if b < a => (road.b, b),
                (Some(a), _) => (road.a, a),
                (None, Some(b)) => (road.b, b),
                (None, None) => continue,
            };
            let value = u32::from(road.carrier_productivity)
                .saturating_mul(10)
                .saturating_add(way);
            if value > best_value {
                best_value = value;
                best = Some((road.id, flag));
            }
        }
        best
    }

    /// An ordered carrier started working.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::RoadNotFound`] for an unknown road.
    pub fn carrier_arrived(&mut self, road_id: RoadId) -> Result<(), EconomyError> {
        let road = self
            .road_mut(road_id)
            .ok_or(EconomyError::RoadNotFound(road_id))?;
        road.carrier = Staffing::Working;
        Ok(())
    }

    /// An ordered donkey started working.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::RoadNotFound`] for an unknown road.
    pub fn donkey_arrived(&mut self, road_id: RoadId) -> Result<(), EconomyError> {
        let road = self
            .road_mut(road_id)
            .ok_or(EconomyError::RoadNotFound(road_id))?;
        road.donkey = Staffing::Working;
        Ok(())
    }

    /// A new road joined the network. Everything that was waiting for a
    /// connection tries again.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::DuplicateRoad`] if the road is known, or any
    /// error of the retried operations.
    pub fn new_road_connection(
        &mut self,
        ctx: &mut EconomyContext<'_>,
        road: Road,
    ) -> Result<(), EconomyError> {
        if self.roads.iter().any(|known| known.id == road.id) {
            return Err(EconomyError::DuplicateRoad(road.id));
        }
        debug!(player = %self.id(), road = %road.id, "road connected");
        self.roads.push(road);

        self.find_warehouse_for_all_roads(ctx.paths)?;
        let want_donkey: Vec<RoadId> = self
            .roads
            .iter()
            .filter(|road| road.needs_donkey())
            .map(|road| road.id)
            .collect();
        for road in want_donkey {
            self.order_donkey(ctx.paths, road)?;
        }
        self.find_warehouse_for_all_jobs(ctx.paths, None)?;
        self.find_material_for_building_sites(ctx)?;
        self.find_client_for_lost_wares(ctx.paths);

        let garrisons: Vec<ObjectId> = self.military_buildings.iter().map(|b| b.id).collect();
        for building in garrisons {
            self.regulate_troops(ctx.paths, building)?;
            self.search_coins(ctx, building)?;
        }
        Ok(())
    }

    /// A road was removed from the network.
    ///
    /// Wares re-check their goals: those at flags or waiting for a ship look
    /// for a new one when theirs is cut off, those still inside a warehouse
    /// go back into its stock. The road's staff walk home.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::RoadNotFound`] for an unknown road.
    pub fn road_destroyed(
        &mut self,
        ctx: &mut EconomyContext<'_>,
        road_id: RoadId,
    ) -> Result<(), EconomyError> {
        let index = self.road_index(road_id)?;
        let road = self.roads.remove(index);
        debug!(player = %self.id(), road = %road_id, "road destroyed");

        if road.carrier.is_staffed() {
            self.send_home(ctx.paths, Job::Helper, road.a)?;
            if road.boat {
                self.return_ware_home(ctx.paths, WareType::Boat, road.a)?;
            }
        }
        if road.donkey.is_staffed() {
            self.send_home(ctx.paths, Job::PackDonkey, road.a)?;
        }

        let mut index = 0;
        while let Some(ware) = self.wares.get(index).copied() {
            if self.recheck_ware_route(ctx.paths, &ware)? {
                index = index.saturating_add(1);
            }
        }
        Ok(())
    }

    /// Re-check one ware after a road vanished.
    ///
    /// Returns `false` if the ware was removed from the list.
    fn recheck_ware_route(
        &mut self,
        paths: &dyn PathQueryPort,
        ware: &Ware,
    ) -> Result<bool, EconomyError> {
        let Some(goal) = ware.goal else {
            return Ok(true);
        };
        let Some((goal_pos, _)) = self.building_info(goal) else {
            return Ok(true);
        };
        match ware.location {
            WareLocation::Carried => Ok(true),
            WareLocation::InWarehouse(wh_id) => {
                let Some(wh_pos) = self.warehouse(wh_id).map(|wh| wh.pos) else {
                    return Ok(true);
                };
                if paths.path_exists(wh_pos, goal_pos, true, None) {
                    return Ok(true);
                }
                self.release_goal(goal, ware.kind);
                self.remove_ware(ware.id)?;
                if let Some(wh) = self.warehouse_mut(wh_id) {
                    wh.inventory.add_ware(ware.kind, 1);
                }
                self.emit(EconomyEvent::WareCancelled {
                    ware: ware.id,
                    warehouse: wh_id,
                });
                Ok(false)
            }
            WareLocation::AtFlag | WareLocation::WaitingForShip(_) => {
                if paths.path_exists(ware.pos, goal_pos, true, None) {
                    return Ok(true);
                }
                self.release_goal(goal, ware.kind);
                let fallback = self
                    .find_warehouse_for_ware(paths, ware.pos, ware.kind)
                    .map(|found| found.id);
                if let Some(slot) = self.wares.iter_mut().find(|w| w.id == ware.id) {
                    slot.goal = fallback;
                }
                match fallback {
                    Some(goal) => self.emit(EconomyEvent::WareRouted {
                        ware: ware.id,
                        kind: ware.kind,
                        goal,
                    }),
                    None => self.emit(EconomyEvent::WareLost { ware: ware.id }),
                }
                Ok(true)
            }
        }
    }

    /// A worker without work walks to the nearest warehouse that takes
    /// them. With none reachable the worker is lost.
    fn send_home(
        &mut self,
        paths: &dyn PathQueryPort,
        job: Job,
        from: MapPoint,
    ) -> Result<Option<ObjectId>, EconomyError> {
        let query = WarehouseQuery::from_warehouse(from, WarehouseCondition::AcceptsFigure(job))
            .towards();
        match find_warehouse(&self.warehouses, paths, &query) {
            Some(found) => {
                if let Some(wh) = self.warehouses.get_mut(found.index) {
                    wh.inventory.add_figure(job, 1);
                }
                Ok(Some(found.id))
            }
            None => {
                self.inventory.remove_figure(job, 1)?;
                Ok(None)
            }
        }
    }

    fn return_ware_home(
        &mut self,
        paths: &dyn PathQueryPort,
        ware: WareType,
        from: MapPoint,
    ) -> Result<(), EconomyError> {
        match self.find_warehouse_for_ware(paths, from, ware) {
            Some(found) => {
                if let Some(wh) = self.warehouses.get_mut(found.index) {
                    wh.inventory.add_ware(ware, 1);
                }
                Ok(())
            }
            None => self.inventory.remove_ware(ware, 1),
        }
    }

    // -------------------------------------------------------------------
    // Material
    // -------------------------------------------------------------------

    /// Send a ware from the nearest warehouse that stocks it to `goal`.
    ///
    /// During the emergency program boards and stones only go to
    /// woodcutters and sawmills. When no warehouse has the ware, the lost
    /// ware of that type closest to the goal is redirected instead.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown goal, or
    /// an id or inventory error.
    pub fn order_ware(
        &mut self,
        ctx: &mut EconomyContext<'_>,
        ware: WareType,
        goal: ObjectId,
    ) -> Result<Option<WareId>, EconomyError> {
        let (goal_pos, goal_kind) = self
            .building_info(goal)
            .ok_or(EconomyError::BuildingNotFound(goal))?;
        let query = WarehouseQuery::from_warehouse(
            goal_pos,
            WarehouseCondition::HasMinWares { ware, count: 1 },
        )
        .with_boats();
        if let Some(found) = find_warehouse(&self.warehouses, ctx.paths, &query) {
            if self.emergency && !emergency_allows(ware, goal_kind) {
                debug!(player = %self.id(), ?ware, goal = %goal, "order refused by emergency program");
                return Ok(None);
            }
            let id = ctx.next_ware()?;
            let Some(wh) = self.warehouses.get_mut(found.index) else {
                return Err(EconomyError::BuildingNotFound(found.id));
            };
            wh.take_ware(ware, 1)?;
            let pos = wh.pos;
            self.add_ware(Ware {
                id,
                kind: ware,
                pos,
                location: WareLocation::InWarehouse(found.id),
                goal: Some(goal),
            })?;
            self.claim_goal(goal, ware);
            self.emit(EconomyEvent::WareRouted {
                ware: id,
                kind: ware,
                goal,
            });
            return Ok(Some(id));
        }

        let mut best: Option<(u32, usize)> = None;
        for (index, candidate) in self.wares.iter().enumerate() {
            if !candidate.is_lost() || candidate.kind != ware {
                continue;
            }
            let Some(length) =
                ctx.paths
                    .find_path(candidate.pos, goal_pos, true, u32::MAX, None)
            else {
                continue;
            };
            if best.is_none_or(|(best_length, _)| length < best_length) {
                best = Some((length, index));
            }
        }
        let Some((_, index)) = best else {
            return Ok(None);
        };
        let Some(lost) = self.wares.get_mut(index) else {
            return Ok(None);
        };
        lost.goal = Some(goal);
        let id = lost.id;
        self.claim_goal(goal, ware);
        self.emit(EconomyEvent::WareRouted {
            ware: id,
            kind: ware,
            goal,
        });
        Ok(Some(id))
    }

    /// Every building site orders the boards and stones it still misses.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Player::order_ware`].
    pub fn find_material_for_building_sites(
        &mut self,
        ctx: &mut EconomyContext<'_>,
    ) -> Result<(), EconomyError> {
        let sites: Vec<ObjectId> = self.building_sites.iter().map(|site| site.id).collect();
        for site in sites {
            for ware in [WareType::Boards, WareType::Stones] {
                while self.missing_material(site, ware) > 0 {
                    if self.order_ware(ctx, ware, site)?.is_none() {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn missing_material(&self, site: ObjectId, ware: WareType) -> u8 {
        self.building_sites
            .iter()
            .find(|s| s.id == site)
            .and_then(|s| s.material(ware))
            .map_or(0, |need| need.missing())
    }

    // -------------------------------------------------------------------
    // Troops
    // -------------------------------------------------------------------

    /// Send up to `count` soldiers to a military building, emptying the
    /// nearest warehouses first.
    ///
    /// Returns the number of soldiers sent.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown building.
    pub fn order_troops(
        &mut self,
        paths: &dyn PathQueryPort,
        goal: ObjectId,
        count: u32,
    ) -> Result<u32, EconomyError> {
        let pos = self
            .military_buildings
            .iter()
            .find(|b| b.id == goal)
            .map(|b| b.pos)
            .ok_or(EconomyError::BuildingNotFound(goal))?;
        let query = WarehouseQuery::from_warehouse(pos, WarehouseCondition::HasMinSoldiers(1));
        let mut left = count;
        while left > 0 {
            let Some(found) = find_warehouse(&self.warehouses, paths, &query) else {
                break;
            };
            let Some(wh) = self.warehouses.get_mut(found.index) else {
                break;
            };
            let taken: u32 = wh.take_soldiers(left).iter().map(|(_, n)| n).sum();
            if taken == 0 {
                break;
            }
            left = left.saturating_sub(taken);
            if let Some(building) = self.military_building_mut(goal) {
                building.ordered_troops = building.ordered_troops.saturating_add(taken);
            }
            self.emit(EconomyEvent::TroopsOrdered {
                goal,
                warehouse: found.id,
                count: taken,
            });
        }
        Ok(count.saturating_sub(left))
    }

    /// Order the soldiers one military building is missing.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown building.
    pub fn regulate_troops(
        &mut self,
        paths: &dyn PathQueryPort,
        building: ObjectId,
    ) -> Result<(), EconomyError> {
        let missing = self
            .military_buildings
            .iter()
            .find(|b| b.id == building)
            .map(|b| b.missing_troops(&self.military_settings))
            .ok_or(EconomyError::BuildingNotFound(building))?;
        if missing > 0 {
            self.order_troops(paths, building, missing)?;
        }
        Ok(())
    }

    /// Let every military building adjust its garrison.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Player::regulate_troops`].
    pub fn regulate_all_troops(&mut self, ctx: &mut EconomyContext<'_>) -> Result<(), EconomyError> {
        let ids: Vec<ObjectId> = self.military_buildings.iter().map(|b| b.id).collect();
        for id in ids {
            self.regulate_troops(ctx.paths, id)?;
        }
        Ok(())
    }

    /// Soldiers entered `warehouse`; hand them out.
    ///
    /// Empty new buildings come first, then those at the border, then the
    /// rest. Stops once the warehouse has no soldiers left.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Player::regulate_troops`].
    pub fn new_soldiers_available(
        &mut self,
        paths: &dyn PathQueryPort,
        warehouse: ObjectId,
    ) -> Result<(), EconomyError> {
        let new_built: Vec<ObjectId> = self
            .military_buildings
            .iter()
            .filter(|b| b.new_built)
            .map(|b| b.id)
            .collect();
        let border: Vec<ObjectId> = self
            .military_buildings
            .iter()
            .filter(|b| b.frontier_distance == BORDER_DISTANCE)
            .map(|b| b.id)
            .collect();
        let rest: Vec<ObjectId> = self
            .military_buildings
            .iter()
            .filter(|b| !b.new_built && b.frontier_distance != BORDER_DISTANCE)
            .map(|b| b.id)
            .collect();
        for id in new_built.into_iter().chain(border).chain(rest) {
            if self.soldiers_in(warehouse) == 0 {
                break;
            }
            self.regulate_troops(paths, id)?;
        }
        Ok(())
    }

    fn soldiers_in(&self, warehouse: ObjectId) -> u32 {
        self.warehouse(warehouse)
            .map_or(0, |wh| wh.inventory.soldiers())
    }

    /// Ordered soldiers reached their building.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown building.
    pub fn soldiers_arrived(&mut self, building: ObjectId, count: u32) -> Result<(), EconomyError> {
        let building = self
            .military_building_mut(building)
            .ok_or(EconomyError::BuildingNotFound(building))?;
        building.ordered_troops = building.ordered_troops.saturating_sub(count);
        building.troops = building.troops.saturating_add(count);
        if count > 0 {
            building.new_built = false;
        }
        Ok(())
    }

    /// A military building that accepts coins orders one unless a coin is
    /// already on its way.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Player::order_ware`].
    pub fn search_coins(
        &mut self,
        ctx: &mut EconomyContext<'_>,
        building: ObjectId,
    ) -> Result<Option<WareId>, EconomyError> {
        let wants = self
            .military_buildings
            .iter()
            .any(|b| b.id == building && b.coin_points > 0);
        let coming = self
            .wares
            .iter()
            .any(|w| w.kind == WareType::Coins && w.goal == Some(building));
        if !wants || coming {
            return Ok(None);
        }
        self.order_ware(ctx, WareType::Coins, building)
    }

    // -------------------------------------------------------------------
    // Flag workers
    // -------------------------------------------------------------------

    /// Send a geologist, scout or other flag worker to `flag`.
    ///
    /// Returns the new worker's id, or `None` if no warehouse can provide
    /// one.
    ///
    /// # Errors
    ///
    /// Returns an id or inventory error.
    pub fn call_flag_worker(
        &mut self,
        ctx: &mut EconomyContext<'_>,
        flag: MapPoint,
        job: Job,
    ) -> Result<Option<ObjectId>, EconomyError> {
        let query =
            WarehouseQuery::from_warehouse(flag, WarehouseCondition::HasFigure { job, recruit: true });
        let Some(found) = find_warehouse(&self.warehouses, ctx.paths, &query) else {
            return Ok(None);
        };
        let worker = ctx.next_object()?;
        self.send_figure(&found, job)?;
        self.flag_workers.push(crate::buildings::FlagWorker {
            id: worker,
            job,
            flag,
        });
        info!(player = %self.id(), %worker, ?job, %flag, "flag worker called");
        self.emit(EconomyEvent::FlagWorkerOrdered { worker, job, flag });
        Ok(Some(worker))
    }

    /// A flag was destroyed; its workers give up and walk home.
    ///
    /// # Errors
    ///
    /// Returns an inventory error if a worker with no way home cannot be
    /// written off.
    pub fn flag_destroyed(
        &mut self,
        paths: &dyn PathQueryPort,
        flag: MapPoint,
    ) -> Result<(), EconomyError> {
        let (idle, busy): (Vec<_>, Vec<_>) = std::mem::take(&mut self.flag_workers)
            .into_iter()
            .partition(|worker| worker.flag == flag);
        self.flag_workers = busy;
        for worker in idle {
            let home = self.send_home(paths, worker.job, flag)?;
            self.emit(EconomyEvent::FlagWorkerLostWork {
                worker: worker.id,
                home,
            });
        }
        Ok(())
    }
}

/// Whether the emergency program lets `ware` go to a `goal` building.
const fn emergency_allows(ware: WareType, goal: BuildingType) -> bool {
    !matches!(ware, WareType::Boards | WareType::Stones)
        || matches!(goal, BuildingType::Woodcutter | BuildingType::Sawmill)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use hamlet_types::{ObjectCounter, PlayerId, PlayerStatus, Team};
    use hamlet_world::SyncedRandom;

    use super::*;
    use crate::buildings::{BuildingSite, MilitaryBuilding, UsualBuilding};
    use crate::testing::TableOracle;
    use crate::warehouse::Warehouse;

    fn p(x: u16, y: u16) -> MapPoint {
        MapPoint::new(x, y)
    }

    fn player() -> Player {
        Player::new(PlayerId::new(0), PlayerStatus::Occupied, Team::NoTeam)
    }

    fn storehouse(id: u32, pos: MapPoint) -> Warehouse {
        Warehouse::new(ObjectId::new(id), BuildingType::Storehouse, pos).unwrap()
    }

    /// Stock a warehouse and count the stock as owned.
    fn stock(player: &mut Player, wh: ObjectId, fill: impl FnOnce(&mut crate::inventory::Inventory)) {
        let mut delta = crate::inventory::Inventory::new();
        fill(&mut delta);
        let target = player.warehouse_mut(wh).unwrap();
        for ware in WareType::ALL {
            target.inventory.add_ware(*ware, delta.ware(*ware));
        }
        for job in Job::ALL {
            target.inventory.add_figure(*job, delta.figure(*job));
        }
        for ware in WareType::ALL {
            player.increase_inventory_ware(*ware, delta.ware(*ware));
        }
        for job in Job::ALL {
            player.increase_inventory_job(*job, delta.figure(*job));
        }
    }

    #[test]
    fn job_is_queued_until_a_warehouse_can_recruit() {
        let oracle = TableOracle::new().with_path(p(0, 0), p(3, 0), 3);
        let mut player = player();
        let mill = ObjectId::new(7);
        player
            .add_usual_building(UsualBuilding::new(mill, BuildingType::Woodcutter, p(0, 0)))
            .unwrap();
        assert!(!player.add_job_wanted(&oracle, Job::Woodcutter, mill).unwrap());
        assert_eq!(player.jobs_wanted().len(), 1);

        player.add_warehouse(storehouse(1, p(3, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| {
            inv.add_figure(Job::Helper, 1);
            inv.add_ware(WareType::Axe, 1);
        });
        player.find_warehouse_for_all_jobs(&oracle, None).unwrap();

        assert!(player.jobs_wanted().is_empty());
        let inv = player.global_inventory();
        assert_eq!(inv.figure(Job::Helper), 0);
        assert_eq!(inv.figure(Job::Woodcutter), 1);
        assert_eq!(inv.ware(WareType::Axe), 0);
    }

    #[test]
    fn filtered_retry_leaves_other_jobs_queued() {
        let oracle = TableOracle::new().with_path(p(0, 0), p(3, 0), 3);
        let mut player = player();
        let place = ObjectId::new(7);
        player
            .add_usual_building(UsualBuilding::new(place, BuildingType::Well, p(0, 0)))
            .unwrap();
        player.add_warehouse(storehouse(1, p(3, 0))).unwrap();
        player.jobs_wanted.push(JobRequest { job: Job::Carpenter, workplace: place });
        player.jobs_wanted.push(JobRequest { job: Job::Helper, workplace: place });
        stock(&mut player, ObjectId::new(1), |inv| inv.add_figure(Job::Helper, 1));

        player.find_warehouse_for_all_jobs(&oracle, Some(Job::Helper)).unwrap();
        assert_eq!(
            player.jobs_wanted(),
            &[JobRequest { job: Job::Carpenter, workplace: place }]
        );
    }

    #[test]
    fn job_not_wanted_drops_one_or_all() {
        let mut player = player();
        let a = ObjectId::new(1);
        let b = ObjectId::new(2);
        for (job, place) in [(Job::Helper, a), (Job::Miner, b), (Job::Helper, a), (Job::Baker, a)] {
            player.jobs_wanted.push(JobRequest { job, workplace: place });
        }
        player.one_job_not_wanted(Job::Baker, a);
        assert_eq!(player.jobs_wanted().len(), 3);
        player.job_not_wanted(a, false);
        assert_eq!(player.jobs_wanted().len(), 2);
        player.job_not_wanted(a, true);
        assert_eq!(
            player.jobs_wanted(),
            &[JobRequest { job: Job::Miner, workplace: b }]
        );
    }

    #[test]
    fn carrier_comes_via_the_closer_flag() {
        let oracle = TableOracle::new()
            .with_path(p(10, 0), p(0, 0), 10)
            .with_path(p(10, 0), p(4, 0), 6);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(10, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| inv.add_figure(Job::Helper, 1));
        player.roads.push(Road::new(RoadId::new(3), p(0, 0), p(4, 0), false));

        assert!(player.find_carrier_for_road(&oracle, RoadId::new(3)).unwrap());
        assert_eq!(player.roads()[0].carrier, Staffing::Ordered(ObjectId::new(1)));
        assert_eq!(player.warehouses()[0].inventory.figure(Job::Helper), 0);
    }

    #[test]
    fn boat_road_needs_a_boat() {
        let oracle = TableOracle::new().with_path(p(10, 0), p(0, 0), 10);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(10, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| inv.add_figure(Job::Helper, 1));
        player.roads.push(Road::new(RoadId::new(3), p(0, 0), p(2, 0), true));

        assert!(!player.find_carrier_for_road(&oracle, RoadId::new(3)).unwrap());
        stock(&mut player, ObjectId::new(1), |inv| inv.add_ware(WareType::Boat, 1));
        assert!(player.find_carrier_for_road(&oracle, RoadId::new(3)).unwrap());
        assert_eq!(player.warehouses()[0].inventory.ware(WareType::Boat), 0);
    }

    #[test]
    fn donkey_goes_where_productivity_and_way_score_highest() {
        let oracle = TableOracle::new()
            .with_path(p(0, 0), p(5, 0), 5)
            .with_path(p(0, 0), p(9, 0), 9)
            .with_path(p(0, 0), p(3, 3), 3);
        let mut player = player();
        let mut slow = Road::new(RoadId::new(1), p(5, 0), p(9, 0), false);
        slow.carrier = Staffing::Working;
        slow.busy = true;
        slow.carrier_productivity = 40;
        let mut fast = Road::new(RoadId::new(2), p(3, 3), p(6, 6), false);
        fast.carrier = Staffing::Working;
        fast.busy = true;
        fast.carrier_productivity = 90;
        let quiet = Road::new(RoadId::new(3), p(0, 0), p(1, 0), false);
        player.roads.extend([slow, fast, quiet]);

        assert_eq!(
            player.find_road_for_donkey(&oracle, p(0, 0)),
            Some((RoadId::new(2), p(3, 3)))
        );
    }

    #[test]
    fn emergency_keeps_boards_for_woodcutters_and_sawmills() {
        let oracle = TableOracle::new()
            .with_path(p(5, 0), p(0, 0), 5)
            .with_path(p(5, 0), p(0, 5), 5);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(5, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| inv.add_ware(WareType::Boards, 5));
        player
            .add_building_site(BuildingSite::new(ObjectId::new(2), BuildingType::Mill, p(0, 0), 2, 0))
            .unwrap();
        player
            .add_building_site(BuildingSite::new(ObjectId::new(3), BuildingType::Sawmill, p(0, 5), 2, 0))
            .unwrap();
        player.emergency = true;

        let mut rng = SyncedRandom::new(3);
        let mut ids = ObjectCounter::starting_at(100);
        let mut ctx = EconomyContext::new(&oracle, 0, &mut rng, &mut ids);
        assert_eq!(player.order_ware(&mut ctx, WareType::Boards, ObjectId::new(2)).unwrap(), None);
        let sent = player.order_ware(&mut ctx, WareType::Boards, ObjectId::new(3)).unwrap();
        assert!(sent.is_some());
        assert_eq!(player.building_sites()[1].boards.ordered, 1);
        assert_eq!(player.warehouses()[0].inventory.ware(WareType::Boards), 4);
    }

    #[test]
    fn lost_ware_closest_to_the_goal_is_redirected() {
        let oracle = TableOracle::new()
            .with_path(p(1, 0), p(9, 9), 12)
            .with_path(p(8, 8), p(9, 9), 2);
        let mut player = player();
        player
            .add_building_site(BuildingSite::new(ObjectId::new(2), BuildingType::Mill, p(9, 9), 1, 0))
            .unwrap();
        player.add_ware(Ware::lost_at(WareId::new(1), WareType::Boards, p(1, 0))).unwrap();
        player.add_ware(Ware::lost_at(WareId::new(2), WareType::Boards, p(8, 8))).unwrap();

        let mut rng = SyncedRandom::new(3);
        let mut ids = ObjectCounter::starting_at(100);
        let mut ctx = EconomyContext::new(&oracle, 0, &mut rng, &mut ids);
        let picked = player.order_ware(&mut ctx, WareType::Boards, ObjectId::new(2)).unwrap();
        assert_eq!(picked, Some(WareId::new(2)));
        assert!(player.ware(WareId::new(1)).unwrap().is_lost());
    }

    #[test]
    fn troops_are_taken_from_the_nearest_warehouses_first() {
        let oracle = TableOracle::new()
            .with_path(p(2, 0), p(0, 0), 2)
            .with_path(p(9, 0), p(0, 0), 9);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(9, 0))).unwrap();
        player.add_warehouse(storehouse(2, p(2, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| inv.add_figure(Job::Private, 5));
        stock(&mut player, ObjectId::new(2), |inv| inv.add_figure(Job::Private, 2));
        player
            .add_military_building(MilitaryBuilding::new(ObjectId::new(5), BuildingType::Fortress, p(0, 0)))
            .unwrap();

        let sent = player.order_troops(&oracle, ObjectId::new(5), 4).unwrap();
        assert_eq!(sent, 4);
        assert_eq!(player.warehouses()[1].inventory.soldiers(), 0);
        assert_eq!(player.warehouses()[0].inventory.soldiers(), 3);
        assert_eq!(player.military_buildings()[0].ordered_troops, 4);
    }

    #[test]
    fn new_soldiers_fill_new_buildings_first() {
        let oracle = TableOracle::new()
            .with_path(p(5, 5), p(0, 0), 7)
            .with_path(p(5, 5), p(9, 9), 7);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(5, 5))).unwrap();
        let mut old = MilitaryBuilding::new(ObjectId::new(10), BuildingType::Barracks, p(0, 0));
        old.new_built = false;
        let fresh = MilitaryBuilding::new(ObjectId::new(11), BuildingType::Barracks, p(9, 9));
        player.add_military_building(old).unwrap();
        player.add_military_building(fresh).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| inv.add_figure(Job::Private, 1));

        player.new_soldiers_available(&oracle, ObjectId::new(1)).unwrap();
        assert_eq!(player.military_buildings()[1].ordered_troops, 1);
        assert_eq!(player.military_buildings()[0].ordered_troops, 0);

        player.soldiers_arrived(ObjectId::new(11), 1).unwrap();
        let fresh = &player.military_buildings()[1];
        assert_eq!((fresh.troops, fresh.ordered_troops, fresh.new_built), (1, 0, false));
    }

    #[test]
    fn new_road_staffs_itself_and_supplies_sites() {
        let oracle = TableOracle::new()
            .with_path(p(0, 0), p(4, 0), 4)
            .with_path(p(4, 0), p(0, 0), 4);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(0, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| {
            inv.add_figure(Job::Helper, 1);
            inv.add_ware(WareType::Boards, 2);
        });
        player
            .add_building_site(BuildingSite::new(ObjectId::new(2), BuildingType::Well, p(4, 0), 3, 0))
            .unwrap();

        let mut rng = SyncedRandom::new(3);
        let mut ids = ObjectCounter::starting_at(100);
        let mut ctx = EconomyContext::new(&oracle, 0, &mut rng, &mut ids);
        let road = Road::new(RoadId::new(1), p(0, 0), p(4, 0), false);
        player.new_road_connection(&mut ctx, road).unwrap();

        assert!(player.roads()[0].carrier.is_staffed());
        let boards = player.building_sites()[0].boards;
        assert_eq!((boards.ordered, boards.missing()), (2, 1));
        assert!(matches!(
            player.new_road_connection(&mut ctx, road),
            Err(EconomyError::DuplicateRoad(_))
        ));
    }

    #[test]
    fn destroyed_road_returns_stranded_wares_to_stock() {
        let oracle = TableOracle::new().with_path(p(0, 0), p(4, 0), 4);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(0, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| {
            inv.add_figure(Job::Helper, 1);
            inv.add_ware(WareType::Stones, 1);
        });
        player
            .add_building_site(BuildingSite::new(ObjectId::new(2), BuildingType::Well, p(4, 0), 0, 1))
            .unwrap();
        let mut rng = SyncedRandom::new(3);
        let mut ids = ObjectCounter::starting_at(100);
        {
            let mut ctx = EconomyContext::new(&oracle, 0, &mut rng, &mut ids);
            let road = Road::new(RoadId::new(1), p(0, 0), p(4, 0), false);
            player.new_road_connection(&mut ctx, road).unwrap();
        }
        assert_eq!(player.wares().len(), 1);

        // The road graph no longer connects the two flags.
        let cut = TableOracle::new();
        let mut ctx = EconomyContext::new(&cut, 1, &mut rng, &mut ids);
        player.road_destroyed(&mut ctx, RoadId::new(1)).unwrap();

        assert!(player.roads().is_empty());
        assert!(player.wares().is_empty());
        let wh = &player.warehouses()[0];
        assert_eq!(wh.inventory.ware(WareType::Stones), 1);
        assert_eq!(wh.inventory.figure(Job::Helper), 1);
        assert_eq!(player.building_sites()[0].stones.ordered, 0);
    }

    #[test]
    fn flag_worker_is_called_and_sent_home() {
        let oracle = TableOracle::new().with_path(p(0, 0), p(6, 0), 6);
        let mut player = player();
        player.add_warehouse(storehouse(1, p(0, 0))).unwrap();
        stock(&mut player, ObjectId::new(1), |inv| inv.add_figure(Job::Geologist, 1));
        let mut rng = SyncedRandom::new(3);
        let mut ids = ObjectCounter::starting_at(100);
        let mut ctx = EconomyContext::new(&oracle, 0, &mut rng, &mut ids);

        let worker = player.call_flag_worker(&mut ctx, p(6, 0), Job::Geologist).unwrap();
        assert_eq!(worker, Some(ObjectId::new(100)));
        assert_eq!(player.flag_workers().len(), 1);

        player.flag_destroyed(&oracle, p(6, 0)).unwrap();
        assert!(player.flag_workers().is_empty());
        assert_eq!(player.warehouses()[0].inventory.figure(Job::Geologist), 1);
        let events = player.drain_outbox().events;
        assert!(events.contains(&EconomyEvent::FlagWorkerLostWork {
            worker: ObjectId::new(100),
            home: Some(ObjectId::new(1)),
        }));
    }
}
