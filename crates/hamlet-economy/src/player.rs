//! The per-player state store.
//!
//! [`Player`] owns every entity collection of one player and is the only
//! place they are mutated. Logistics live in further `impl Player` blocks
//! ([`consumer`](crate::consumer), [`jobs`](crate::jobs),
//! [`ships`](crate::ships), [`emergency`](crate::emergency),
//! [`pacts`](crate::pacts)); this module holds the registry, settings
//! commands, statistics, defeat and the save-game record.

use hamlet_ledger::{DiplomacyLedger, Envelope};
use hamlet_types::{
    BUILDING_TYPE_COUNT, BuildingType, GameData, Job, MapPoint, ObjectId, Persist, PlayerId,
    PlayerStatus, PostKind, PostMessage, SOLDIER_JOBS, StatisticType, StreamError, TOOL_COUNT,
    Team, USUAL_BUILDING_LIST_COUNT, WareId, WareType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::buildings::{BuildingSite, FlagWorker, MilitaryBuilding, UsualBuilding};
use crate::distribution::{DistributionSettings, DistributionTable};
use crate::error::EconomyError;
use crate::events::{EconomyEvent, Outbox};
use crate::inventory::Inventory;
use crate::roads::Road;
use crate::settings::{
    BUILDABLE_TYPE_COUNT, BuildOrder, DefenderList, MILITARY_SETTINGS_COUNT, MilitarySettings,
    ToolSettings,
};
use crate::ships::Ship;
use crate::statistics::Statistics;
use crate::transport::{TRANSPORT_GROUP_COUNT, TransportPriorities};
use crate::wares::{Ware, WareLocation};
use crate::warehouse::Warehouse;
use crate::EconomyContext;

/// How many catapults a player may own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatapultLimit {
    /// No limit.
    #[default]
    Unlimited,
    /// One per eight points of military strength, where a barracks counts
    /// 1, a guardhouse 2, a watchtower 4 and a fortress 8.
    Proportional,
    /// A fixed maximum.
    Fixed(u32),
}

/// A workplace waiting for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRequest {
    /// Wanted job.
    pub job: Job,
    /// Building that wants the worker.
    pub workplace: ObjectId,
}

/// Finished buildings and building sites per building type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingCount {
    /// Finished buildings, indexed by building type.
    pub buildings: [u32; BUILDING_TYPE_COUNT],
    /// Building sites, indexed by the type under construction.
    pub sites: [u32; BUILDING_TYPE_COUNT],
}

impl BuildingCount {
    /// Finished buildings of one type.
    pub fn buildings_of(&self, kind: BuildingType) -> u32 {
        self.buildings.get(kind.index()).copied().unwrap_or(0)
    }

    /// Building sites of one type.
    pub fn sites_of(&self, kind: BuildingType) -> u32 {
        self.sites.get(kind.index()).copied().unwrap_or(0)
    }
}

/// One player's complete economy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    status: PlayerStatus,
    team: Team,
    defeated: bool,
    catapult_limit: CatapultLimit,

    pub(crate) warehouses: Vec<Warehouse>,
    pub(crate) harbors: Vec<ObjectId>,
    pub(crate) roads: Vec<Road>,
    pub(crate) jobs_wanted: Vec<JobRequest>,
    /// One list per production building type.
    pub(crate) buildings: Vec<Vec<UsualBuilding>>,
    pub(crate) building_sites: Vec<BuildingSite>,
    pub(crate) military_buildings: Vec<MilitaryBuilding>,
    pub(crate) wares: Vec<Ware>,
    pub(crate) flag_workers: Vec<FlagWorker>,
    pub(crate) ships: Vec<Ship>,

    pub(crate) defenders: DefenderList,
    pub(crate) hq_pos: MapPoint,
    pub(crate) distribution: DistributionTable,
    pub(crate) build_order: BuildOrder,
    pub(crate) transport: TransportPriorities,
    pub(crate) military_settings: MilitarySettings,
    pub(crate) tools: ToolSettings,
    /// Everything the player owns, wherever it is.
    pub(crate) inventory: Inventory,
    pub(crate) statistics: Statistics,
    pub(crate) diplomacy: DiplomacyLedger,
    pub(crate) emergency: bool,

    // Not saved.
    pub(crate) hostile_sightings: Vec<MapPoint>,
    pub(crate) outbox: Outbox,
}

impl Player {
    /// An empty player with standard settings.
    pub fn new(id: PlayerId, status: PlayerStatus, team: Team) -> Self {
        Self {
            id,
            status,
            team: team.fixed(),
            defeated: false,
            catapult_limit: CatapultLimit::default(),
            warehouses: Vec::new(),
            harbors: Vec::new(),
            roads: Vec::new(),
            jobs_wanted: Vec::new(),
            buildings: vec![Vec::new(); USUAL_BUILDING_LIST_COUNT],
            building_sites: Vec::new(),
            military_buildings: Vec::new(),
            wares: Vec::new(),
            flag_workers: Vec::new(),
            ships: Vec::new(),
            defenders: DefenderList::default(),
            hq_pos: MapPoint::INVALID,
            distribution: DistributionTable::standard(),
            build_order: BuildOrder::default(),
            transport: TransportPriorities::default(),
            military_settings: MilitarySettings::default(),
            tools: ToolSettings::default(),
            inventory: Inventory::new(),
            statistics: Statistics::default(),
            diplomacy: DiplomacyLedger::new(id),
            emergency: false,
            hostile_sightings: Vec::new(),
            outbox: Outbox::default(),
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Player slot.
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Slot occupancy.
    pub const fn status(&self) -> PlayerStatus {
        self.status
    }

    /// Team, with a random choice already resolved.
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Whether the player lost.
    pub const fn is_defeated(&self) -> bool {
        self.defeated
    }

    /// Whether the emergency program is running.
    pub const fn is_emergency(&self) -> bool {
        self.emergency
    }

    /// Headquarters position, [`MapPoint::INVALID`] before placement.
    pub const fn hq_pos(&self) -> MapPoint {
        self.hq_pos
    }

    /// The catapult rule in force.
    pub const fn catapult_limit(&self) -> CatapultLimit {
        self.catapult_limit
    }

    /// Set the catapult rule. Rules are game settings and not saved.
    pub const fn set_catapult_limit(&mut self, limit: CatapultLimit) {
        self.catapult_limit = limit;
    }

    /// Warehouses in registration order.
    pub fn warehouses(&self) -> &[Warehouse] {
        &self.warehouses
    }

    /// A warehouse by id.
    pub fn warehouse(&self, id: ObjectId) -> Option<&Warehouse> {
        self.warehouses.iter().find(|wh| wh.id == id)
    }

    /// A warehouse by id, for stock and setting changes.
    pub fn warehouse_mut(&mut self, id: ObjectId) -> Option<&mut Warehouse> {
        self.warehouses.iter_mut().find(|wh| wh.id == id)
    }

    /// Harbor ids in registration order.
    pub fn harbors(&self) -> &[ObjectId] {
        &self.harbors
    }

    /// Roads in registration order.
    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    /// A road by id, for staffing and traffic updates.
    pub fn road_mut(&mut self, id: hamlet_types::RoadId) -> Option<&mut Road> {
        self.roads.iter_mut().find(|road| road.id == id)
    }

    /// Open job requests.
    pub fn jobs_wanted(&self) -> &[JobRequest] {
        &self.jobs_wanted
    }

    /// Production buildings of one type.
    pub fn usual_buildings(&self, kind: BuildingType) -> &[UsualBuilding] {
        kind.usual_list_index()
            .and_then(|index| self.buildings.get(index))
            .map_or(&[], Vec::as_slice)
    }

    /// A production building by id.
    pub fn usual_building_mut(&mut self, id: ObjectId) -> Option<&mut UsualBuilding> {
        self.buildings
            .iter_mut()
            .flat_map(|list| list.iter_mut())
            .find(|b| b.id == id)
    }

    /// Building sites in registration order.
    pub fn building_sites(&self) -> &[BuildingSite] {
        &self.building_sites
    }

    /// Military buildings in registration order.
    pub fn military_buildings(&self) -> &[MilitaryBuilding] {
        &self.military_buildings
    }

    /// A military building by id.
    pub fn military_building_mut(&mut self, id: ObjectId) -> Option<&mut MilitaryBuilding> {
        self.military_buildings.iter_mut().find(|b| b.id == id)
    }

    /// Wares in transit.
    pub fn wares(&self) -> &[Ware] {
        &self.wares
    }

    /// A ware by handle.
    pub fn ware(&self, id: WareId) -> Option<&Ware> {
        self.wares.iter().find(|ware| ware.id == id)
    }

    /// Geologists and scouts working at flags.
    pub fn flag_workers(&self) -> &[FlagWorker] {
        &self.flag_workers
    }

    /// Ships in registration order.
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Everything the player owns.
    pub const fn global_inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Per-ware distribution state.
    pub const fn distribution(&self) -> &DistributionTable {
        &self.distribution
    }

    /// Site build order.
    pub const fn build_order(&self) -> &BuildOrder {
        &self.build_order
    }

    /// Transport priorities.
    pub const fn transport(&self) -> &TransportPriorities {
        &self.transport
    }

    /// Military sliders.
    pub const fn military_settings(&self) -> &MilitarySettings {
        &self.military_settings
    }

    /// Tool priorities and orders.
    pub const fn tool_settings(&self) -> &ToolSettings {
        &self.tools
    }

    /// Statistic history.
    pub const fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Pact ledger.
    pub const fn diplomacy(&self) -> &DiplomacyLedger {
        &self.diplomacy
    }

    /// Take everything queued for the game driver.
    pub fn drain_outbox(&mut self) -> Outbox {
        std::mem::take(&mut self.outbox)
    }

    /// Take only the queued diplomacy envelopes, leaving posts and events.
    pub fn take_envelopes(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outbox.envelopes)
    }

    pub(crate) fn emit(&mut self, event: EconomyEvent) {
        self.outbox.events.push(event);
    }

    pub(crate) fn post(&mut self, gf: u32, kind: PostKind) {
        self.outbox.posts.push(PostMessage::new(self.id, gf, kind));
    }

    // -------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------

    /// Whether any building with this id is registered.
    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.building_info(id).is_some()
    }

    /// Position and type of any registered building.
    ///
    /// For a building site the type is the one under construction.
    pub fn building_info(&self, id: ObjectId) -> Option<(MapPoint, BuildingType)> {
        if let Some(wh) = self.warehouse(id) {
            return Some((wh.pos, wh.kind));
        }
        if let Some(b) = self.buildings.iter().flatten().find(|b| b.id == id) {
            return Some((b.pos, b.kind));
        }
        if let Some(b) = self.military_buildings.iter().find(|b| b.id == id) {
            return Some((b.pos, b.kind));
        }
        self.building_sites
            .iter()
            .find(|site| site.id == id)
            .map(|site| (site.pos, site.kind))
    }

    fn ensure_unregistered(&self, id: ObjectId) -> Result<(), EconomyError> {
        if self.contains_object(id) {
            return Err(EconomyError::DuplicateObject(id));
        }
        Ok(())
    }

    /// Register a warehouse. Harbors are also added to the harbor list.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::DuplicateObject`] if the id is taken.
    pub fn add_warehouse(&mut self, wh: Warehouse) -> Result<(), EconomyError> {
        self.ensure_unregistered(wh.id)?;
        if wh.harbor.is_some() {
            self.harbors.push(wh.id);
        }
        debug!(player = %self.id, warehouse = %wh.id, kind = ?wh.kind, "warehouse added");
        self.warehouses.push(wh);
        Ok(())
    }

    /// Unregister a warehouse.
    ///
    /// Ships heading for a destroyed harbor go idle, and the player is
    /// checked for defeat.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown id.
    pub fn remove_warehouse(&mut self, gf: u32, id: ObjectId) -> Result<Warehouse, EconomyError> {
        let index = self
            .warehouses
            .iter()
            .position(|wh| wh.id == id)
            .ok_or(EconomyError::BuildingNotFound(id))?;
        let wh = self.warehouses.remove(index);
        if wh.harbor.is_some() {
            self.harbor_destroyed(id);
        }
        self.building_gone(id)?;
        self.test_defeat(gf);
        Ok(wh)
    }

    /// Register a finished production building.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WrongBuildingType`] for a type without a
    /// production list, or [`EconomyError::DuplicateObject`].
    pub fn add_usual_building(&mut self, building: UsualBuilding) -> Result<(), EconomyError> {
        let index = building
            .kind
            .usual_list_index()
            .ok_or(EconomyError::WrongBuildingType {
                kind: building.kind,
                expected: "production building",
            })?;
        self.ensure_unregistered(building.id)?;
        let list = self
            .buildings
            .get_mut(index)
            .ok_or(EconomyError::WrongBuildingType {
                kind: building.kind,
                expected: "production building",
            })?;
        list.push(building);
        self.statistics.change_value(StatisticType::Buildings, 1)
    }

    /// Unregister a production building and drop its job requests.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown id.
    pub fn remove_usual_building(&mut self, id: ObjectId) -> Result<UsualBuilding, EconomyError> {
        let (list, index) = self
            .buildings
            .iter()
            .enumerate()
            .find_map(|(list, buildings)| {
                buildings
                    .iter()
                    .position(|b| b.id == id)
                    .map(|index| (list, index))
            })
            .ok_or(EconomyError::BuildingNotFound(id))?;
        let building = self
            .buildings
            .get_mut(list)
            .ok_or(EconomyError::BuildingNotFound(id))?
            .remove(index);
        self.building_gone(id)?;
        self.statistics.change_value(StatisticType::Buildings, -1)?;
        Ok(building)
    }

    /// Register a finished military building.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WrongBuildingType`] or
    /// [`EconomyError::DuplicateObject`].
    pub fn add_military_building(&mut self, building: MilitaryBuilding) -> Result<(), EconomyError> {
        if !building.kind.is_military() {
            return Err(EconomyError::WrongBuildingType {
                kind: building.kind,
                expected: "military building",
            });
        }
        self.ensure_unregistered(building.id)?;
        self.military_buildings.push(building);
        self.statistics.change_value(StatisticType::Buildings, 1)
    }

    /// Unregister a military building and check for defeat.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown id.
    pub fn remove_military_building(
        &mut self,
        gf: u32,
        id: ObjectId,
    ) -> Result<MilitaryBuilding, EconomyError> {
        let index = self
            .military_buildings
            .iter()
            .position(|b| b.id == id)
            .ok_or(EconomyError::BuildingNotFound(id))?;
        let building = self.military_buildings.remove(index);
        self.building_gone(id)?;
        self.statistics.change_value(StatisticType::Buildings, -1)?;
        self.test_defeat(gf);
        Ok(building)
    }

    /// Register a building site.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::DuplicateObject`] if the id is taken.
    pub fn add_building_site(&mut self, site: BuildingSite) -> Result<(), EconomyError> {
        self.ensure_unregistered(site.id)?;
        self.building_sites.push(site);
        Ok(())
    }

    /// Unregister a building site, finished or destroyed.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::BuildingNotFound`] for an unknown id.
    pub fn remove_building_site(&mut self, id: ObjectId) -> Result<BuildingSite, EconomyError> {
        let index = self
            .building_sites
            .iter()
            .position(|site| site.id == id)
            .ok_or(EconomyError::BuildingNotFound(id))?;
        let site = self.building_sites.remove(index);
        self.building_gone(id)?;
        Ok(site)
    }

    /// Register a ware in transit.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::DuplicateWare`] if the handle is in use.
    pub fn add_ware(&mut self, ware: Ware) -> Result<(), EconomyError> {
        if self.ware(ware.id).is_some() {
            return Err(EconomyError::DuplicateWare(ware.id));
        }
        self.wares.push(ware);
        Ok(())
    }

    /// Unregister a ware.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WareNotFound`] for an unknown handle.
    pub fn remove_ware(&mut self, id: WareId) -> Result<Ware, EconomyError> {
        let index = self
            .wares
            .iter()
            .position(|ware| ware.id == id)
            .ok_or(EconomyError::WareNotFound(id))?;
        Ok(self.wares.remove(index))
    }

    /// Drop everything that pointed at a removed building.
    ///
    /// Wares heading there lose their goal; wares stored there burn with it.
    fn building_gone(&mut self, id: ObjectId) -> Result<(), EconomyError> {
        self.job_not_wanted(id, true);
        let (burnt, kept): (Vec<Ware>, Vec<Ware>) =
            std::mem::take(&mut self.wares).into_iter().partition(|ware| {
                matches!(
                    ware.location,
                    WareLocation::InWarehouse(wh) | WareLocation::WaitingForShip(wh) if wh == id
                )
            });
        self.wares = kept;
        for ware in &mut self.wares {
            if ware.goal == Some(id) {
                ware.goal = None;
            }
        }
        for ware in &burnt {
            self.inventory.remove_ware(ware.kind, 1)?;
        }
        if !burnt.is_empty() {
            debug!(player = %self.id, building = %id, burnt = burnt.len(), "wares destroyed with building");
        }
        Ok(())
    }

    /// Count finished buildings and sites per type.
    pub fn building_count(&self) -> BuildingCount {
        let mut count = BuildingCount {
            buildings: [0; BUILDING_TYPE_COUNT],
            sites: [0; BUILDING_TYPE_COUNT],
        };
        let finished = self
            .warehouses
            .iter()
            .map(|wh| wh.kind)
            .chain(self.buildings.iter().flatten().map(|b| b.kind))
            .chain(self.military_buildings.iter().map(|b| b.kind));
        for kind in finished {
            if let Some(slot) = count.buildings.get_mut(kind.index()) {
                *slot = slot.saturating_add(1);
            }
        }
        for site in &self.building_sites {
            if let Some(slot) = count.sites.get_mut(site.kind.index()) {
                *slot = slot.saturating_add(1);
            }
        }
        count
    }

    /// Average productivity per production building type.
    pub fn calc_productivities(&self) -> [u16; BUILDING_TYPE_COUNT] {
        let mut result = [0_u16; BUILDING_TYPE_COUNT];
        for list in &self.buildings {
            let Some(kind) = list.first().map(|b| b.kind) else {
                continue;
            };
            if let Some(slot) = result.get_mut(kind.index()) {
                *slot = mean_productivity(list);
            }
        }
        result
    }

    /// Average productivity over every production building.
    pub fn average_productivity(&self) -> u16 {
        mean_productivity(self.buildings.iter().flatten())
    }

    /// Rank of a building site when material is handed out; lower is
    /// served first.
    ///
    /// First come first served uses the registration order, otherwise the
    /// site's type position in the build order.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::SitePriorityNotFound`] if the site is not
    /// registered or its type is missing from the build order.
    pub fn building_site_priority(&self, site: ObjectId) -> Result<u32, EconomyError> {
        let index = self
            .building_sites
            .iter()
            .position(|s| s.id == site)
            .ok_or(EconomyError::SitePriorityNotFound(site))?;
        let rank = if self.build_order.order_type == 0 {
            Some(index)
        } else {
            self.building_sites
                .get(index)
                .and_then(|s| self.build_order.position(s.kind))
        };
        rank.and_then(|rank| u32::try_from(rank).ok())
            .ok_or(EconomyError::SitePriorityNotFound(site))
    }

    /// Whether another catapult may be built under the current rule.
    pub fn can_build_catapult(&self) -> bool {
        let max = match self.catapult_limit {
            CatapultLimit::Unlimited => return true,
            CatapultLimit::Fixed(max) => max,
            CatapultLimit::Proportional => {
                let strength: u32 = self
                    .military_buildings
                    .iter()
                    .map(|b| match b.kind {
                        BuildingType::Barracks => 1,
                        BuildingType::Guardhouse => 2,
                        BuildingType::Watchtower => 4,
                        BuildingType::Fortress => 8,
                        _ => 0,
                    })
                    .fold(0_u32, u32::saturating_add);
                strength.checked_div(8).unwrap_or(0)
            }
        };
        let count = self.building_count();
        let catapults = count
            .buildings_of(BuildingType::Catapult)
            .saturating_add(count.sites_of(BuildingType::Catapult));
        catapults < max
    }

    /// Place the headquarters.
    pub const fn set_hq(&mut self, pos: MapPoint) {
        self.hq_pos = pos;
    }

    /// Count goods entering the player's economy.
    pub fn increase_inventory_ware(&mut self, ware: WareType, count: u32) {
        self.inventory.add_ware(ware, count);
    }

    /// Count goods leaving the player's economy.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WareUnderflow`] if fewer are owned.
    pub fn decrease_inventory_ware(&mut self, ware: WareType, count: u32) -> Result<(), EconomyError> {
        self.inventory.remove_ware(ware, count)
    }

    /// Count people entering the player's economy.
    pub fn increase_inventory_job(&mut self, job: Job, count: u32) {
        self.inventory.add_figure(job, count);
    }

    /// Count people leaving the player's economy.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::FigureUnderflow`] if fewer are owned.
    pub fn decrease_inventory_job(&mut self, job: Job, count: u32) -> Result<(), EconomyError> {
        self.inventory.remove_figure(job, count)
    }

    // -------------------------------------------------------------------
    // Defeat
    // -------------------------------------------------------------------

    /// Defeat the player once no military building and no warehouse is left.
    pub fn test_defeat(&mut self, gf: u32) {
        if self.military_buildings.is_empty() && self.warehouses.is_empty() {
            self.surrender(gf);
        }
    }

    /// Give up. Defeat is final.
    pub fn surrender(&mut self, gf: u32) {
        if self.defeated {
            return;
        }
        self.defeated = true;
        info!(player = %self.id, gf, "player defeated");
        self.post(gf, PostKind::Defeated);
        self.emit(EconomyEvent::Defeated);
    }

    // -------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------

    /// Apply new military sliders, reshuffle the defenders and adjust
    /// every garrison.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::SettingOutOfRange`] for a value above its
    /// scale; nothing changes then.
    pub fn change_military_settings(
        &mut self,
        ctx: &mut EconomyContext<'_>,
        values: [u8; MILITARY_SETTINGS_COUNT],
    ) -> Result<(), EconomyError> {
        self.military_settings = MilitarySettings::validated(values)?;
        self.defenders.refresh(&self.military_settings, ctx.rng);
        self.regulate_all_troops(ctx)
    }

    /// Whether an attacked building should send out a defender.
    pub fn should_send_defender(&mut self, ctx: &mut EconomyContext<'_>) -> bool {
        self.defenders
            .should_send_defender(&self.military_settings, ctx.rng)
    }

    /// Apply tool priorities and commit order changes.
    pub fn change_tool_settings(
        &mut self,
        priorities: [u8; TOOL_COUNT],
        order_changes: [i8; TOOL_COUNT],
    ) {
        self.tools.change(priorities, order_changes);
        self.emit(EconomyEvent::ToolSettingsChanged);
        if order_changes.iter().any(|change| *change != 0) {
            self.emit(EconomyEvent::ToolOrderPlaced);
        }
    }

    /// Adjust the displayed order of one tool. Returns whether it changed.
    pub fn change_tool_order_visual(&mut self, tool: usize, change: i32) -> bool {
        self.tools.change_order_visual(tool, change)
    }

    /// A metalworks finished `ware`; returns whether it was ordered.
    pub fn tool_order_processed(&mut self, ware: WareType) -> bool {
        let Some(tool) = ToolSettings::tool_index(ware) else {
            return false;
        };
        let processed = self.tools.order_processed(tool);
        if processed {
            self.emit(EconomyEvent::ToolOrderCompleted);
        }
        processed
    }

    /// Apply new distribution sliders.
    pub fn change_distribution(&mut self, settings: &DistributionSettings) {
        self.distribution.change_distribution(settings);
    }

    /// Replace the build order.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidBuildOrder`] for anything but a
    /// permutation of the buildable types.
    pub fn change_build_order(
        &mut self,
        order_type: u8,
        order: [BuildingType; BUILDABLE_TYPE_COUNT],
    ) -> Result<(), EconomyError> {
        self.build_order.change(order_type, order)
    }

    /// Replace the transport order.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidTransportOrder`] for anything but a
    /// permutation of the transport groups.
    pub fn convert_transport_data(
        &mut self,
        order: &[u8; TRANSPORT_GROUP_COUNT],
    ) -> Result<(), EconomyError> {
        self.transport.convert_transport_data(order)
    }

    // -------------------------------------------------------------------
    // Statistics
    // -------------------------------------------------------------------

    /// Refresh the statistics derived from the inventory and buildings.
    pub fn calc_statistics(&mut self) {
        let military = SOLDIER_JOBS
            .iter()
            .zip(1_u32..)
            .map(|(rank, weight)| self.inventory.figure(*rank).saturating_mul(weight))
            .fold(0_u32, u32::saturating_add);
        let vanquished = self.statistics.current(StatisticType::Vanquished);
        let productivity = self.average_productivity();
        let stats = &mut self.statistics;
        stats.set_value(StatisticType::Merchandise, self.inventory.total_goods());
        stats.set_value(StatisticType::Inhabitants, self.inventory.total_people());
        stats.set_value(StatisticType::Military, military);
        stats.set_value(StatisticType::Productivity, u32::from(productivity));
        stats.set_value(
            StatisticType::Tournament,
            military.saturating_add(vanquished.saturating_mul(3)),
        );
    }

    /// Record one statistic step.
    pub fn statistic_step(&mut self) {
        self.calc_statistics();
        self.statistics.step();
    }

    /// Overwrite a current statistic value.
    pub fn set_statistic_value(&mut self, stat: StatisticType, value: u32) {
        self.statistics.set_value(stat, value);
    }

    /// Change a current statistic value.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StatisticUnderflow`] if it would turn negative.
    pub fn change_statistic_value(&mut self, stat: StatisticType, change: i64) -> Result<(), EconomyError> {
        self.statistics.change_value(stat, change)
    }

    /// Count one produced ware towards its merchandise category.
    pub fn increase_merchandise_statistic(&mut self, ware: WareType) {
        self.statistics.increase_merchandise(ware);
    }

    // -------------------------------------------------------------------
    // Save game
    // -------------------------------------------------------------------

    /// Write the player record.
    ///
    /// Free and locked slots only write their status.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] if a list is too long for the stream.
    pub fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_u8(self.status.as_u8());
        if !self.status.is_active() {
            return Ok(());
        }
        out.push_u8(self.team.as_u8());
        out.push_bool(self.defeated);

        out.push_container(&self.warehouses)?;
        out.push_object_list(&self.harbors)?;
        out.push_container(&self.roads)?;
        out.push_len(self.jobs_wanted.len())?;
        for request in &self.jobs_wanted {
            out.push_u8(request.job.as_u8());
            out.push_object(request.workplace);
        }
        for list in &self.buildings {
            out.push_container(list)?;
        }
        out.push_container(&self.building_sites)?;
        out.push_container(&self.military_buildings)?;
        out.push_container(&self.wares)?;
        out.push_container(&self.flag_workers)?;
        out.push_container(&self.ships)?;

        self.defenders.persist(out);
        out.push_point(self.hq_pos);
        self.distribution.persist(out)?;
        self.build_order.persist(out);
        self.transport.persist(out);
        out.push_raw(&self.military_settings.0);
        out.push_raw(&self.tools.priorities);
        out.push_raw(&self.tools.ordered);
        self.inventory.persist(out)?;
        self.statistics.persist(out);
        self.diplomacy.persist_pacts(out)?;
        out.push_bool(self.emergency);
        Ok(())
    }

    /// Read a player record written by [`Player::persist`].
    ///
    /// Transient state starts empty and the catapult rule at its default.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] for short or malformed input.
    pub fn restore(id: PlayerId, input: &mut GameData) -> Result<Self, StreamError> {
        let raw_status = input.pop_u8()?;
        let status = PlayerStatus::from_u8(raw_status).ok_or(StreamError::InvalidValue {
            field: "player status",
            value: u32::from(raw_status),
        })?;
        if !status.is_active() {
            return Ok(Self::new(id, status, Team::NoTeam));
        }
        let raw_team = input.pop_u8()?;
        let team = Team::from_u8(raw_team).ok_or(StreamError::InvalidValue {
            field: "team",
            value: u32::from(raw_team),
        })?;
        let mut player = Self::new(id, status, team);
        player.defeated = input.pop_bool()?;

        player.warehouses = input.pop_container()?;
        player.harbors = input.pop_object_list()?;
        player.roads = input.pop_container()?;
        let jobs = input.pop_len()?;
        for _ in 0..jobs {
            let raw = input.pop_u8()?;
            let job = Job::from_u8(raw).ok_or(StreamError::InvalidValue {
                field: "wanted job",
                value: u32::from(raw),
            })?;
            let workplace = input.pop_object()?;
            player.jobs_wanted.push(JobRequest { job, workplace });
        }
        for (index, list) in player.buildings.iter_mut().enumerate() {
            let buildings: Vec<UsualBuilding> = input.pop_container()?;
            if let Some(wrong) = buildings
                .iter()
                .find(|b| b.kind.usual_list_index() != Some(index))
            {
                return Err(StreamError::InvalidValue {
                    field: "production building list",
                    value: u32::from(wrong.kind.as_u8()),
                });
            }
            *list = buildings;
        }
        player.building_sites = input.pop_container()?;
        player.military_buildings = input.pop_container()?;
        player.wares = input.pop_container()?;
        player.flag_workers = input.pop_container()?;
        player.ships = input.pop_container()?;

        player.defenders = DefenderList::restore(input)?;
        player.hq_pos = input.pop_point()?;
        player.distribution = DistributionTable::restore(input)?;
        player.build_order = BuildOrder::restore(input)?;
        player.transport = TransportPriorities::restore(input)?;
        player.military_settings = restore_military_settings(input)?;
        player.tools.priorities = pop_array(input)?;
        player.tools.ordered = pop_array(input)?;
        player.inventory = Inventory::restore(input)?;
        player.statistics = Statistics::restore(input)?;
        player.diplomacy = DiplomacyLedger::restore_pacts(id, input)?;
        player.emergency = input.pop_bool()?;
        if player.defeated {
            warn!(player = %id, "restored a defeated player");
        }
        Ok(player)
    }
}

/// Unweighted mean; an empty set counts as one building at zero.
fn mean_productivity<'a>(buildings: impl IntoIterator<Item = &'a UsualBuilding>) -> u16 {
    let (sum, count) = buildings.into_iter().fold((0_u32, 0_u32), |(sum, count), b| {
        (
            sum.saturating_add(u32::from(b.productivity)),
            count.saturating_add(1),
        )
    });
    let mean = sum.checked_div(count.max(1)).unwrap_or(0);
    u16::try_from(mean).unwrap_or(u16::MAX)
}

fn pop_array<const N: usize>(input: &mut GameData) -> Result<[u8; N], StreamError> {
    let raw = input.pop_raw(N)?;
    <[u8; N]>::try_from(raw.as_slice()).map_err(|_err| StreamError::UnexpectedEnd {
        needed: N,
        remaining: raw.len(),
    })
}

fn restore_military_settings(input: &mut GameData) -> Result<MilitarySettings, StreamError> {
    let values: [u8; MILITARY_SETTINGS_COUNT] = pop_array(input)?;
    MilitarySettings::validated(values).map_err(|_err| StreamError::InvalidValue {
        field: "military settings",
        value: values.iter().copied().map(u32::from).max().unwrap_or(0),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_types::{PactType, RoadId};

    use super::*;
    use crate::buildings::BuildingSite;
    use crate::roads::Road;

    fn p(x: u16, y: u16) -> MapPoint {
        MapPoint::new(x, y)
    }

    fn stocked_player() -> Player {
        let mut player = Player::new(PlayerId::new(2), PlayerStatus::Occupied, Team::Team2);
        let mut hq = Warehouse::new(ObjectId::new(1), BuildingType::Headquarters, p(10, 10)).unwrap();
        hq.inventory.add_ware(WareType::Boards, 4);
        player.add_warehouse(hq).unwrap();
        player.set_hq(p(10, 10));
        player.increase_inventory_ware(WareType::Boards, 4);
        player.increase_inventory_job(Job::Helper, 3);
        player
    }

    #[test]
    fn save_game_round_trip_drops_transient_state() {
        let mut player = stocked_player();
        player.roads.push(Road::new(RoadId::new(7), p(10, 10), p(14, 10), false));
        player
            .add_usual_building(UsualBuilding::new(ObjectId::new(3), BuildingType::Mill, p(14, 10)))
            .unwrap();
        player
            .add_building_site(BuildingSite::new(ObjectId::new(4), BuildingType::Well, p(14, 12), 2, 1))
            .unwrap();
        player
            .add_military_building(MilitaryBuilding::new(ObjectId::new(5), BuildingType::Fortress, p(20, 10)))
            .unwrap();
        player.add_ware(Ware::lost_at(WareId::new(9), WareType::Stones, p(14, 10))).unwrap();
        player.increase_inventory_ware(WareType::Stones, 1);
        player.jobs_wanted.push(JobRequest {
            job: Job::Miller,
            workplace: ObjectId::new(3),
        });
        player.change_tool_settings([1; TOOL_COUNT], [2; TOOL_COUNT]);
        player.diplomacy.make_start_pacts(PlayerId::new(3)).unwrap();
        player.statistic_step();
        player.surrender(30);
        player.drain_outbox();

        let mut out = GameData::new();
        player.persist(&mut out).unwrap();
        player.change_tool_order_visual(0, 5);
        player.hostile_sightings.push(p(1, 1));
        player.set_catapult_limit(CatapultLimit::Fixed(2));
        let mut input = GameData::from_bytes(out.into_bytes());
        let restored = Player::restore(player.id(), &mut input).unwrap();
        assert!(input.is_exhausted());

        assert_eq!(restored.tools.ordered_delta, [0; TOOL_COUNT]);
        assert!(restored.hostile_sightings.is_empty());
        assert_eq!(restored.catapult_limit(), CatapultLimit::Unlimited);
        assert_eq!(restored.team(), Team::Team2);
        assert!(restored.is_defeated());
        assert!(restored.is_ally(PlayerId::new(3), 100));
        assert_eq!(restored.pact_state(PactType::Alliance, PlayerId::new(3), 0), player.pact_state(PactType::Alliance, PlayerId::new(3), 0));

        player.tools.ordered_delta = [0; TOOL_COUNT];
        player.hostile_sightings.clear();
        player.set_catapult_limit(CatapultLimit::Unlimited);
        assert_eq!(restored, player);
    }

    #[test]
    fn free_slot_writes_only_its_status() {
        let player = Player::new(PlayerId::new(5), PlayerStatus::Free, Team::Team1);
        let mut out = GameData::new();
        player.persist(&mut out).unwrap();
        assert_eq!(out.as_bytes().len(), 1);
        let mut input = GameData::from_bytes(out.into_bytes());
        let restored = Player::restore(PlayerId::new(5), &mut input).unwrap();
        assert_eq!(restored.status(), PlayerStatus::Free);
    }

    #[test]
    fn removing_a_warehouse_burns_its_wares_and_drops_goals() {
        let mut player = stocked_player();
        let mut store = Warehouse::new(ObjectId::new(2), BuildingType::Storehouse, p(30, 10)).unwrap();
        store.inventory.add_ware(WareType::Coins, 1);
        player.add_warehouse(store).unwrap();
        player.increase_inventory_ware(WareType::Coins, 2);
        player
            .add_ware(Ware {
                id: WareId::new(1),
                kind: WareType::Coins,
                pos: p(30, 10),
                location: WareLocation::InWarehouse(ObjectId::new(2)),
                goal: Some(ObjectId::new(1)),
            })
            .unwrap();
        player
            .add_ware(Ware {
                id: WareId::new(2),
                kind: WareType::Coins,
                pos: p(20, 10),
                location: WareLocation::AtFlag,
                goal: Some(ObjectId::new(2)),
            })
            .unwrap();

        player.remove_warehouse(40, ObjectId::new(2)).unwrap();
        assert_eq!(player.wares().len(), 1);
        assert_eq!(player.wares()[0].goal, None);
        assert_eq!(player.inventory.ware(WareType::Coins), 1);
        assert!(!player.is_defeated());
    }

    #[test]
    fn losing_the_last_stronghold_defeats_once() {
        let mut player = stocked_player();
        player
            .add_military_building(MilitaryBuilding::new(ObjectId::new(5), BuildingType::Barracks, p(20, 10)))
            .unwrap();
        player.remove_warehouse(50, ObjectId::new(1)).unwrap();
        assert!(!player.is_defeated());
        player.remove_military_building(51, ObjectId::new(5)).unwrap();
        assert!(player.is_defeated());
        player.surrender(52);

        let outbox = player.drain_outbox();
        let defeats = outbox
            .posts
            .iter()
            .filter(|post| post.kind == PostKind::Defeated)
            .count();
        assert_eq!(defeats, 1);
        assert!(outbox.events.contains(&EconomyEvent::Defeated));
    }

    #[test]
    fn catapult_limits() {
        let mut player = stocked_player();
        assert!(player.can_build_catapult());

        player.set_catapult_limit(CatapultLimit::Proportional);
        player
            .add_military_building(MilitaryBuilding::new(ObjectId::new(5), BuildingType::Watchtower, p(20, 10)))
            .unwrap();
        assert!(!player.can_build_catapult());
        player
            .add_military_building(MilitaryBuilding::new(ObjectId::new(6), BuildingType::Watchtower, p(30, 10)))
            .unwrap();
        assert!(player.can_build_catapult());
        player
            .add_building_site(BuildingSite::new(ObjectId::new(7), BuildingType::Catapult, p(25, 10), 4, 2))
            .unwrap();
        assert!(!player.can_build_catapult());

        player.set_catapult_limit(CatapultLimit::Fixed(2));
        assert!(player.can_build_catapult());
        player.set_catapult_limit(CatapultLimit::Fixed(0));
        assert!(!player.can_build_catapult());
    }

    #[test]
    fn site_priority_follows_build_order_mode() {
        let mut player = stocked_player();
        player
            .add_building_site(BuildingSite::new(ObjectId::new(3), BuildingType::Well, p(12, 10), 2, 0))
            .unwrap();
        player
            .add_building_site(BuildingSite::new(ObjectId::new(4), BuildingType::Barracks, p(14, 10), 2, 0))
            .unwrap();
        assert_eq!(player.building_site_priority(ObjectId::new(3)).unwrap(), 0);
        assert_eq!(player.building_site_priority(ObjectId::new(4)).unwrap(), 1);

        player.change_build_order(1, player.build_order.order).unwrap();
        assert_eq!(player.building_site_priority(ObjectId::new(4)).unwrap(), 0);
        assert!(player.building_site_priority(ObjectId::new(3)).unwrap() > 0);
        assert!(matches!(
            player.building_site_priority(ObjectId::new(99)),
            Err(EconomyError::SitePriorityNotFound(_))
        ));
    }

    #[test]
    fn statistics_weigh_soldiers_by_rank() {
        let mut player = stocked_player();
        player.increase_inventory_job(Job::Private, 2);
        player.increase_inventory_job(Job::Sergeant, 1);
        player.set_statistic_value(StatisticType::Vanquished, 2);
        let mut mill = UsualBuilding::new(ObjectId::new(3), BuildingType::Mill, p(14, 10));
        mill.productivity = 60;
        player.add_usual_building(mill).unwrap();
        let mut well = UsualBuilding::new(ObjectId::new(4), BuildingType::Well, p(16, 10));
        well.productivity = 100;
        player.add_usual_building(well).unwrap();

        player.calc_statistics();
        assert_eq!(player.statistics.current(StatisticType::Military), 5);
        assert_eq!(player.statistics.current(StatisticType::Tournament), 11);
        assert_eq!(player.statistics.current(StatisticType::Productivity), 80);
        assert_eq!(player.statistics.current(StatisticType::Merchandise), 4);
        assert_eq!(player.statistics.current(StatisticType::Inhabitants), 6);
        assert_eq!(player.statistics.current(StatisticType::Buildings), 2);
    }

    #[test]
    fn transport_order_changes_reach_the_priorities() {
        let mut player = stocked_player();
        let mut reversed = [0_u8; TRANSPORT_GROUP_COUNT];
        for (slot, group) in reversed.iter_mut().zip((0..TRANSPORT_GROUP_COUNT).rev()) {
            *slot = u8::try_from(group).unwrap();
        }
        player.convert_transport_data(&reversed).unwrap();
        assert_eq!(player.transport().priority(WareType::Coins), 13);
        assert_eq!(player.transport().transport_order(), reversed);

        assert!(matches!(
            player.convert_transport_data(&[0; TRANSPORT_GROUP_COUNT]),
            Err(EconomyError::InvalidTransportOrder)
        ));
        assert_eq!(player.transport().priority(WareType::Coins), 13);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut player = stocked_player();
        let again = Warehouse::new(ObjectId::new(1), BuildingType::Storehouse, p(3, 3)).unwrap();
        assert!(matches!(
            player.add_warehouse(again),
            Err(EconomyError::DuplicateObject(_))
        ));
        assert!(matches!(
            player.add_usual_building(UsualBuilding::new(ObjectId::new(8), BuildingType::Barracks, p(3, 3))),
            Err(EconomyError::WrongBuildingType { .. })
        ));
    }
}
