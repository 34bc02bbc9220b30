//! Ships and the harbors that wait for them.
//!
//! Harbors post ship jobs; idle ships look for the most rewarding job and
//! harbors call the closest idle ship. Both searches sort by straight-line
//! estimate and stop once no remaining ship or harbor can beat the best
//! real sea route.

use hamlet_types::{GameData, MapPoint, ObjectId, Persist, PostKind, SeaId, ShipId, StreamError};
use hamlet_world::{PathQueryPort, ShipRoute};
use tracing::{debug, info};

use crate::error::EconomyError;
use crate::events::EconomyEvent;
use crate::player::Player;
use crate::warehouse::Warehouse;

/// Sightings closer than this to a known one are not reported again.
const HOSTILE_SIGHTING_SPACING: u32 = 30;

/// What a ship is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipState {
    /// Waiting for work.
    Idle,
    /// Sailing to a harbor.
    GoingToHarbor {
        /// Target harbor.
        harbor: ObjectId,
        /// Route length.
        distance: u32,
    },
    /// Moored at a harbor.
    AtHarbor(ObjectId),
    /// Exploring on an expedition.
    Expedition,
}

/// A ship owned by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ship {
    /// Handle.
    pub id: ShipId,
    /// Current position on the water.
    pub pos: MapPoint,
    /// The sea the ship sails on.
    pub sea: SeaId,
    /// Activity.
    pub state: ShipState,
}

impl Ship {
    /// An idle ship.
    pub const fn idle(id: ShipId, pos: MapPoint, sea: SeaId) -> Self {
        Self {
            id,
            pos,
            sea,
            state: ShipState::Idle,
        }
    }

    /// Whether the ship waits for work.
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, ShipState::Idle)
    }

    /// Harbor the ship is sailing to.
    pub const fn heading_for(&self) -> Option<ObjectId> {
        match self.state {
            ShipState::GoingToHarbor { harbor, .. } => Some(harbor),
            _ => None,
        }
    }
}

impl Persist for Ship {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_ship(self.id);
        out.push_point(self.pos);
        out.push_u16(self.sea.into_inner());
        match self.state {
            ShipState::Idle => out.push_u8(0),
            ShipState::GoingToHarbor { harbor, distance } => {
                out.push_u8(1);
                out.push_object(harbor);
                out.push_u32(distance);
            }
            ShipState::AtHarbor(harbor) => {
                out.push_u8(2);
                out.push_object(harbor);
            }
            ShipState::Expedition => out.push_u8(3),
        }
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let id = input.pop_ship()?;
        let pos = input.pop_point()?;
        let sea = SeaId::new(input.pop_u16()?);
        let state = match input.pop_u8()? {
            0 => ShipState::Idle,
            1 => ShipState::GoingToHarbor {
                harbor: input.pop_object()?,
                distance: input.pop_u32()?,
            },
            2 => ShipState::AtHarbor(input.pop_object()?),
            3 => ShipState::Expedition,
            other => {
                return Err(StreamError::InvalidValue {
                    field: "ship state",
                    value: u32::from(other),
                });
            }
        };
        Ok(Self { id, pos, sea, state })
    }
}

/// Where a ship can drop its cargo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadTarget {
    /// The harbor.
    pub harbor: ObjectId,
    /// Coastal point of the harbor on the ship's sea.
    pub dest: MapPoint,
    /// Route there; `None` when the ship is already at `dest`.
    pub route: Option<ShipRoute>,
}

impl Player {
    /// Register a new ship and let it look for work.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::DuplicateShip`] if the handle is taken.
    pub fn register_ship(
        &mut self,
        paths: &dyn PathQueryPort,
        ship: Ship,
    ) -> Result<(), EconomyError> {
        if self.ship_index(ship.id).is_some() {
            return Err(EconomyError::DuplicateShip(ship.id));
        }
        debug!(player = %self.id(), ship = %ship.id, sea = %ship.sea, "ship registered");
        self.ships.push(ship);
        self.get_job_for_ship(paths, ship.id)
    }

    /// Unregister a sunk or dismantled ship.
    pub fn remove_ship(&mut self, id: ShipId) -> Option<Ship> {
        let index = self.ship_index(id)?;
        Some(self.ships.remove(index))
    }

    /// Position of a ship in the registration order.
    pub fn ship_index(&self, id: ShipId) -> Option<usize> {
        self.ships.iter().position(|ship| ship.id == id)
    }

    /// Ship at a registration position.
    pub fn ship_by_index(&self, index: usize) -> Option<&Ship> {
        self.ships.get(index)
    }

    /// Ships currently sailing to `harbor`.
    pub fn ships_to_harbor(&self, harbor: ObjectId) -> usize {
        self.ships
            .iter()
            .filter(|ship| ship.heading_for() == Some(harbor))
            .count()
    }

    /// Harbors with a coast on `sea`, in registration order.
    pub fn harbor_buildings_at_sea(&self, sea: SeaId) -> Vec<ObjectId> {
        self.harbor_warehouses()
            .filter(|wh| wh.harbor.as_ref().is_some_and(|h| h.is_at_sea(sea)))
            .map(|wh| wh.id)
            .collect()
    }

    fn harbor_warehouses(&self) -> impl Iterator<Item = &Warehouse> {
        self.harbors.iter().filter_map(|id| self.warehouse(*id))
    }

    /// Register a finished harbor; idle ships look for work afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WrongBuildingType`] for a non-harbor, or
    /// any registry error.
    pub fn add_harbor(
        &mut self,
        paths: &dyn PathQueryPort,
        harbor: Warehouse,
    ) -> Result<(), EconomyError> {
        if harbor.harbor.is_none() {
            return Err(EconomyError::WrongBuildingType {
                kind: harbor.kind,
                expected: "harbor",
            });
        }
        self.add_warehouse(harbor)?;
        let idle: Vec<ShipId> = self
            .ships
            .iter()
            .filter(|ship| ship.is_idle())
            .map(|ship| ship.id)
            .collect();
        for ship in idle {
            self.get_job_for_ship(paths, ship)?;
        }
        Ok(())
    }

    /// Forget a harbor; ships heading there or moored there go idle.
    pub fn harbor_destroyed(&mut self, harbor: ObjectId) {
        self.harbors.retain(|id| *id != harbor);
        for ship in &mut self.ships {
            let bound = match ship.state {
                ShipState::GoingToHarbor { harbor: target, .. } | ShipState::AtHarbor(target) => {
                    target == harbor
                }
                ShipState::Idle | ShipState::Expedition => false,
            };
            if bound {
                ship.state = ShipState::Idle;
            }
        }
    }

    /// Add a ship job worth `points` to a harbor and call a ship for it.
    ///
    /// Returns whether a ship was sent or was already there.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] or
    /// [`EconomyError::WrongBuildingType`] if `harbor` is not a harbor.
    pub fn request_ship(
        &mut self,
        paths: &dyn PathQueryPort,
        harbor: ObjectId,
        points: u32,
    ) -> Result<bool, EconomyError> {
        let wh = self
            .warehouse_mut(harbor)
            .ok_or(EconomyError::BuildingNotFound(harbor))?;
        let kind = wh.kind;
        wh.harbor
            .as_mut()
            .ok_or(EconomyError::WrongBuildingType {
                kind,
                expected: "harbor",
            })?
            .ship_jobs
            .push(points);
        self.order_ship(paths, harbor)
    }

    /// Call the closest suitable ship to a harbor.
    ///
    /// While fewer ships are coming than needed, only idle ships are
    /// considered; otherwise ships already heading here count too, so one
    /// that has arrived can be recognised. Ships are tried by their
    /// estimated distance to the harbor building, and the search stops at
    /// the first one whose estimate is no shorter than the best sea route
    /// found. Returns whether a ship was sent or found already at the
    /// harbor.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] or
    /// [`EconomyError::WrongBuildingType`] if `harbor` is not a harbor.
    pub fn order_ship(
        &mut self,
        paths: &dyn PathQueryPort,
        harbor: ObjectId,
    ) -> Result<bool, EconomyError> {
        let wh = self
            .warehouse(harbor)
            .ok_or(EconomyError::BuildingNotFound(harbor))?;
        let state = wh.harbor.as_ref().ok_or(EconomyError::WrongBuildingType {
            kind: wh.kind,
            expected: "harbor",
        })?;
        let harbor_pos = wh.pos;
        let include_coming = self.ships_to_harbor(harbor) >= state.needed_ships();

        let mut candidates: Vec<(u32, ShipId, usize, MapPoint)> = Vec::new();
        for (index, ship) in self.ships.iter().enumerate() {
            let eligible =
                ship.is_idle() || (include_coming && ship.heading_for() == Some(harbor));
            if !eligible {
                continue;
            }
            let Some(dest) = state.coastal_point(ship.sea) else {
                continue;
            };
            candidates.push((paths.distance_estimate(ship.pos, harbor_pos), ship.id, index, dest));
        }
        candidates.sort_unstable_by_key(|(estimate, id, _, _)| (*estimate, *id));

        let mut best: Option<(usize, u32)> = None;
        let mut best_distance = u32::MAX;
        for (estimate, id, index, dest) in candidates {
            if estimate >= best_distance {
                break;
            }
            let Some(ship) = self.ships.get(index) else {
                continue;
            };
            if ship.pos == dest {
                self.ship_arrived(harbor, id)?;
                return Ok(true);
            }
            if let Some(route) = paths.find_ship_path(ship.pos, dest)
                && route.distance < best_distance
            {
                best_distance = route.distance;
                best = Some((index, route.distance));
            }
        }

        let Some((index, distance)) = best else {
            return Ok(false);
        };
        let Some(ship) = self.ships.get_mut(index).filter(|ship| ship.is_idle()) else {
            return Ok(false);
        };
        ship.state = ShipState::GoingToHarbor { harbor, distance };
        let ship = ship.id;
        debug!(player = %self.id(), %ship, %harbor, distance, "ship ordered");
        self.emit(EconomyEvent::ShipDispatched {
            ship,
            harbor,
            distance,
        });
        Ok(true)
    }

    /// Let an idle ship pick the most rewarding harbor job.
    ///
    /// A harbor scores its outstanding job points minus the route length.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::ShipNotFound`] for an unknown ship.
    pub fn get_job_for_ship(
        &mut self,
        paths: &dyn PathQueryPort,
        ship: ShipId,
    ) -> Result<(), EconomyError> {
        let current = self
            .ships
            .iter()
            .find(|s| s.id == ship)
            .copied()
            .ok_or(EconomyError::ShipNotFound(ship))?;
        if !current.is_idle() {
            return Ok(());
        }

        let mut best: Option<(ObjectId, u32)> = None;
        let mut best_points = i64::MIN;
        let mut arrived = None;
        for wh in self.harbor_warehouses() {
            let Some(state) = wh.harbor.as_ref() else {
                continue;
            };
            let needed = state.needed_ships();
            let coming = self.ships_to_harbor(wh.id);
            if needed == 0 || needed <= coming {
                continue;
            }
            let Some(dest) = state.coastal_point(current.sea) else {
                continue;
            };
            if current.pos == dest {
                arrived = Some(wh.id);
                break;
            }
            let Some(route) = paths.find_ship_path(current.pos, dest) else {
                continue;
            };
            let points = i64::from(state.need_for_ship(coming))
                .saturating_sub(i64::from(route.distance));
            if best.is_none() || points > best_points {
                best_points = points;
                best = Some((wh.id, route.distance));
            }
        }

        if let Some(harbor) = arrived {
            return self.ship_arrived(harbor, ship);
        }
        if let Some((harbor, distance)) = best
            && let Some(s) = self.ships.iter_mut().find(|s| s.id == ship)
        {
            s.state = ShipState::GoingToHarbor { harbor, distance };
            debug!(player = %self.id(), %ship, %harbor, distance, "ship found a job");
            self.emit(EconomyEvent::ShipDispatched {
                ship,
                harbor,
                distance,
            });
        }
        Ok(())
    }

    /// A ship moored at a harbor and takes its oldest job.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::ShipNotFound`] for an unknown ship.
    pub fn ship_arrived(&mut self, harbor: ObjectId, ship: ShipId) -> Result<(), EconomyError> {
        let s = self
            .ships
            .iter_mut()
            .find(|s| s.id == ship)
            .ok_or(EconomyError::ShipNotFound(ship))?;
        s.state = ShipState::AtHarbor(harbor);
        if let Some(state) = self
            .warehouse_mut(harbor)
            .and_then(|wh| wh.harbor.as_mut())
            && !state.ship_jobs.is_empty()
        {
            state.ship_jobs.remove(0);
        }
        self.emit(EconomyEvent::ShipArrived { ship, harbor });
        Ok(())
    }

    /// Nearest harbor on the ship's sea, other than `exception`, that the
    /// ship can reach from `start`.
    pub fn find_harbor_for_unloading(
        &self,
        paths: &dyn PathQueryPort,
        ship: ShipId,
        start: MapPoint,
        exception: Option<ObjectId>,
    ) -> Option<UnloadTarget> {
        let sea = self.ships.iter().find(|s| s.id == ship)?.sea;
        let mut nearest: Option<(u32, ObjectId, MapPoint)> = None;
        for wh in self.harbor_warehouses() {
            if Some(wh.id) == exception {
                continue;
            }
            let Some(dest) = wh.harbor.as_ref().and_then(|h| h.coastal_point(sea)) else {
                continue;
            };
            let estimate = paths.distance_estimate(start, dest);
            if nearest.is_none_or(|(best, _, _)| estimate < best) {
                nearest = Some((estimate, wh.id, dest));
            }
        }
        let (_, harbor, dest) = nearest?;
        if start == dest {
            return Some(UnloadTarget {
                harbor,
                dest,
                route: None,
            });
        }
        let route = paths.find_ship_path(start, dest)?;
        Some(UnloadTarget {
            harbor,
            dest,
            route: Some(route),
        })
    }

    /// Record foreign territory seen from a ship.
    ///
    /// Returns `false` without posting if a known sighting lies closer than
    /// 30 fields.
    pub fn ship_discovered_hostile_territory(
        &mut self,
        paths: &dyn PathQueryPort,
        gf: u32,
        location: MapPoint,
    ) -> bool {
        let known = self
            .hostile_sightings
            .iter()
            .any(|seen| paths.distance_estimate(*seen, location) < HOSTILE_SIGHTING_SPACING);
        if known {
            return false;
        }
        self.hostile_sightings.push(location);
        info!(player = %self.id(), %location, "ship sighted hostile territory");
        self.post(gf, PostKind::HostileTerritory { at: location });
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_types::{BuildingType, PlayerId, PlayerStatus, Team};

    use super::*;
    use crate::testing::TableOracle;

    const SEA: SeaId = SeaId(1);

    fn p(x: u16, y: u16) -> MapPoint {
        MapPoint::new(x, y)
    }

    fn harbor(id: u32, coast: MapPoint) -> Warehouse {
        let mut wh =
            Warehouse::new(ObjectId::new(id), BuildingType::HarborBuilding, coast).unwrap();
        if let Some(state) = wh.harbor.as_mut() {
            state.coasts.push((SEA, coast));
        }
        wh
    }

    fn player() -> Player {
        Player::new(PlayerId::new(0), PlayerStatus::Occupied, Team::NoTeam)
    }

    #[test]
    fn closest_idle_ship_is_sent() {
        let oracle = TableOracle::new()
            .with_sea(p(0, 0), p(10, 0), 10)
            .with_sea(p(4, 0), p(10, 0), 30);
        let mut player = player();
        player.add_harbor(&oracle, harbor(1, p(10, 0))).unwrap();
        player
            .register_ship(&oracle, Ship::idle(ShipId(1), p(0, 0), SEA))
            .unwrap();
        player
            .register_ship(&oracle, Ship::idle(ShipId(2), p(4, 0), SEA))
            .unwrap();

        assert!(player.request_ship(&oracle, ObjectId::new(1), 50).unwrap());
        // Ship 2 is closer by estimate but its route is longer.
        assert_eq!(
            player.ships()[0].state,
            ShipState::GoingToHarbor {
                harbor: ObjectId::new(1),
                distance: 10
            }
        );
        assert!(player.ships()[1].is_idle());
        assert_eq!(player.ships_to_harbor(ObjectId::new(1)), 1);
    }

    #[test]
    fn ship_search_is_cut_off_by_distance_to_the_harbor() {
        let oracle = TableOracle::new()
            .with_sea(p(0, 12), p(0, 8), 4)
            .with_sea(p(6, 8), p(0, 8), 6);
        let mut player = player();
        let mut wh = Warehouse::new(ObjectId::new(1), BuildingType::HarborBuilding, p(0, 0)).unwrap();
        if let Some(state) = wh.harbor.as_mut() {
            state.coasts.push((SEA, p(0, 8)));
        }
        player.add_harbor(&oracle, wh).unwrap();
        player
            .register_ship(&oracle, Ship::idle(ShipId(1), p(0, 12), SEA))
            .unwrap();
        player
            .register_ship(&oracle, Ship::idle(ShipId(2), p(6, 8), SEA))
            .unwrap();

        assert!(player.request_ship(&oracle, ObjectId::new(1), 50).unwrap());
        // Ship 2 is nearer the building; ship 1, nearer the coast, is
        // never routed.
        assert!(player.ships()[0].is_idle());
        assert_eq!(
            player.ships()[1].state,
            ShipState::GoingToHarbor {
                harbor: ObjectId::new(1),
                distance: 6
            }
        );
    }

    #[test]
    fn ship_at_coast_arrives_at_once() {
        let oracle = TableOracle::new();
        let mut player = player();
        player.add_harbor(&oracle, harbor(1, p(10, 0))).unwrap();
        player
            .register_ship(&oracle, Ship::idle(ShipId(1), p(10, 0), SEA))
            .unwrap();
        assert!(player.request_ship(&oracle, ObjectId::new(1), 5).unwrap());
        assert_eq!(player.ships()[0].state, ShipState::AtHarbor(ObjectId::new(1)));
        let jobs = &player.warehouse(ObjectId::new(1)).unwrap().harbor.as_ref().unwrap().ship_jobs;
        assert!(jobs.is_empty());
    }

    #[test]
    fn idle_ship_prefers_the_more_rewarding_harbor() {
        let oracle = TableOracle::new()
            .with_sea(p(0, 0), p(10, 0), 10)
            .with_sea(p(0, 0), p(40, 0), 40);
        let mut player = player();
        player.add_harbor(&oracle, harbor(1, p(10, 0))).unwrap();
        player.add_harbor(&oracle, harbor(2, p(40, 0))).unwrap();
        for (id, points) in [(1, 20), (2, 100)] {
            let state = player
                .warehouse_mut(ObjectId::new(id))
                .unwrap()
                .harbor
                .as_mut()
                .unwrap();
            state.ship_jobs.push(points);
        }
        player
            .register_ship(&oracle, Ship::idle(ShipId(7), p(0, 0), SEA))
            .unwrap();
        assert_eq!(player.ships()[0].heading_for(), Some(ObjectId::new(2)));
    }

    #[test]
    fn destroyed_harbor_releases_its_ships() {
        let oracle = TableOracle::new().with_sea(p(0, 0), p(10, 0), 10);
        let mut player = player();
        player.add_harbor(&oracle, harbor(1, p(10, 0))).unwrap();
        player
            .register_ship(&oracle, Ship::idle(ShipId(1), p(0, 0), SEA))
            .unwrap();
        player.request_ship(&oracle, ObjectId::new(1), 5).unwrap();
        player.remove_warehouse(0, ObjectId::new(1)).unwrap();
        assert!(player.harbors().is_empty());
        assert!(player.ships()[0].is_idle());
    }

    #[test]
    fn unloading_skips_the_exception() {
        let oracle = TableOracle::new().with_sea(p(0, 0), p(20, 0), 20);
        let mut player = player();
        player.add_harbor(&oracle, harbor(1, p(5, 0))).unwrap();
        player.add_harbor(&oracle, harbor(2, p(20, 0))).unwrap();
        player
            .register_ship(&oracle, Ship::idle(ShipId(1), p(0, 0), SEA))
            .unwrap();
        let target = player
            .find_harbor_for_unloading(&oracle, ShipId(1), p(0, 0), Some(ObjectId::new(1)))
            .unwrap();
        assert_eq!(target.harbor, ObjectId::new(2));
        assert_eq!(target.route.unwrap().distance, 20);
        // The nearest harbor has no sea route.
        assert!(
            player
                .find_harbor_for_unloading(&oracle, ShipId(1), p(0, 0), None)
                .is_none()
        );
    }

    #[test]
    fn hostile_sightings_are_spaced() {
        let oracle = TableOracle::new();
        let mut player = player();
        assert!(player.ship_discovered_hostile_territory(&oracle, 3, p(50, 50)));
        assert!(!player.ship_discovered_hostile_territory(&oracle, 4, p(60, 70)));
        assert!(player.ship_discovered_hostile_territory(&oracle, 5, p(50, 80)));
        let posts = player.drain_outbox().posts;
        assert_eq!(posts.len(), 2);
    }
}
