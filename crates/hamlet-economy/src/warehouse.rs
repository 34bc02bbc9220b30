//! Warehouses, their inventory settings and the capability predicates used
//! to pick one.

use hamlet_types::{
    BuildingType, GameData, JOB_TYPE_COUNT, Job, MapPoint, ObjectId, Persist, SOLDIER_JOBS, SeaId,
    StreamError, WARE_TYPE_COUNT, WareType,
};

use crate::buildings::Demand;
use crate::error::EconomyError;
use crate::inventory::Inventory;

/// Per-ware or per-job warehouse setting, a small bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventorySetting(u8);

impl InventorySetting {
    /// Refuse new deliveries.
    pub const STOP: u8 = 0b001;
    /// Actively send stock to other warehouses.
    pub const SEND: u8 = 0b010;
    /// Actively collect stock from other warehouses.
    pub const COLLECT: u8 = 0b100;

    /// Build a setting from raw flags, dropping unknown bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::STOP | Self::SEND | Self::COLLECT))
    }

    /// Raw flags.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether deliveries are refused.
    pub const fn is_stopped(self) -> bool {
        self.0 & Self::STOP != 0
    }

    /// Whether stock is sent away.
    pub const fn is_sending(self) -> bool {
        self.0 & Self::SEND != 0
    }

    /// Whether stock is collected.
    pub const fn is_collecting(self) -> bool {
        self.0 & Self::COLLECT != 0
    }
}

// ---------------------------------------------------------------------------
// Harbor
// ---------------------------------------------------------------------------

/// Harbor-specific state of a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarborState {
    /// Coastal landing point per adjacent sea.
    pub coasts: Vec<(SeaId, MapPoint)>,
    /// Open ship jobs, most urgent first, each with its priority points.
    pub ship_jobs: Vec<u32>,
    /// Expedition demand for boards and stones.
    pub demand: Demand,
}

impl HarborState {
    /// Whether the harbor borders this sea.
    pub fn is_at_sea(&self, sea: SeaId) -> bool {
        self.coasts.iter().any(|(id, _)| *id == sea)
    }

    /// Where ships on this sea land.
    pub fn coastal_point(&self, sea: SeaId) -> Option<MapPoint> {
        self.coasts
            .iter()
            .find(|(id, _)| *id == sea)
            .map(|(_, point)| *point)
    }

    /// Number of ships the harbor still needs.
    pub fn needed_ships(&self) -> usize {
        self.ship_jobs.len()
    }

    /// How badly another ship is wanted when `coming` are already on their
    /// way. Jobs covered by the coming ships do not count.
    pub fn need_for_ship(&self, coming: usize) -> u32 {
        self.ship_jobs
            .iter()
            .skip(coming)
            .fold(0_u32, |sum, points| sum.saturating_add(*points))
    }

    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_len(self.coasts.len())?;
        for (sea, point) in &self.coasts {
            out.push_u16(sea.into_inner());
            out.push_point(*point);
        }
        out.push_len(self.ship_jobs.len())?;
        for points in &self.ship_jobs {
            out.push_u32(*points);
        }
        self.demand.persist(out)
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let coast_count = input.pop_len()?;
        let mut coasts = Vec::with_capacity(coast_count);
        for _ in 0..coast_count {
            let sea = SeaId::new(input.pop_u16()?);
            coasts.push((sea, input.pop_point()?));
        }
        let job_count = input.pop_len()?;
        let mut ship_jobs = Vec::with_capacity(job_count);
        for _ in 0..job_count {
            ship_jobs.push(input.pop_u32()?);
        }
        Ok(Self {
            coasts,
            ship_jobs,
            demand: Demand::restore(input)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Warehouse
// ---------------------------------------------------------------------------

/// A headquarters, storehouse or harbor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warehouse {
    /// Object id.
    pub id: ObjectId,
    /// Building type, always a warehouse type.
    pub kind: BuildingType,
    /// Position of the flag in front of the building.
    pub pos: MapPoint,
    /// Stored goods and people.
    pub inventory: Inventory,
    /// Settings per ware type.
    pub ware_settings: [InventorySetting; WARE_TYPE_COUNT],
    /// Settings per job.
    pub figure_settings: [InventorySetting; JOB_TYPE_COUNT],
    /// Harbor state, present only for harbors.
    pub harbor: Option<HarborState>,
}

impl Warehouse {
    /// A warehouse with empty stock and default settings.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WrongBuildingType`] if `kind` is not a
    /// warehouse type.
    pub fn new(id: ObjectId, kind: BuildingType, pos: MapPoint) -> Result<Self, EconomyError> {
        if !kind.is_warehouse() {
            return Err(EconomyError::WrongBuildingType {
                kind,
                expected: "warehouse",
            });
        }
        let harbor = (kind == BuildingType::HarborBuilding).then(HarborState::default);
        Ok(Self {
            id,
            kind,
            pos,
            inventory: Inventory::new(),
            ware_settings: [InventorySetting::default(); WARE_TYPE_COUNT],
            figure_settings: [InventorySetting::default(); JOB_TYPE_COUNT],
            harbor,
        })
    }

    /// Setting for one ware type.
    pub fn ware_setting(&self, ware: WareType) -> InventorySetting {
        self.ware_settings
            .get(ware.convert_shields().index())
            .copied()
            .unwrap_or_default()
    }

    /// Setting for one job.
    pub fn figure_setting(&self, job: Job) -> InventorySetting {
        self.figure_settings
            .get(job.index())
            .copied()
            .unwrap_or_default()
    }

    /// Whether a helper can be turned into `job` here.
    pub fn can_recruit(&self, job: Job) -> bool {
        job.is_recruitable()
            && self.inventory.figure(Job::Helper) > 0
            && job.tool().is_none_or(|tool| self.inventory.ware(tool) > 0)
    }

    /// Whether someone for `job` is available, optionally by recruiting.
    pub fn has_figure(&self, job: Job, recruit: bool) -> bool {
        self.inventory.figure(job) > 0 || (recruit && self.can_recruit(job))
    }

    /// Take goods out of stock.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WareUnderflow`] if fewer are stored.
    pub fn take_ware(&mut self, ware: WareType, count: u32) -> Result<(), EconomyError> {
        self.inventory.remove_ware(ware, count)
    }

    /// Take one person for `job`, recruiting a helper when none is present.
    ///
    /// Returns whether a recruit was made; recruiting consumes a helper and
    /// the job's tool.
    ///
    /// # Errors
    ///
    /// Returns an underflow error if neither the job nor a recruit is
    /// available.
    pub fn take_figure(&mut self, job: Job, recruit: bool) -> Result<bool, EconomyError> {
        if self.inventory.figure(job) > 0 {
            self.inventory.remove_figure(job, 1)?;
            return Ok(false);
        }
        if recruit && self.can_recruit(job) {
            self.inventory.remove_figure(Job::Helper, 1)?;
            if let Some(tool) = job.tool() {
                self.inventory.remove_ware(tool, 1)?;
            }
            return Ok(true);
        }
        Err(EconomyError::FigureUnderflow {
            job,
            requested: 1,
            available: 0,
        })
    }

    /// Take up to `count` soldiers, lowest rank first.
    ///
    /// Returns the soldiers taken per rank.
    pub fn take_soldiers(&mut self, count: u32) -> Vec<(Job, u32)> {
        let mut left = count;
        let mut taken = Vec::new();
        for rank in SOLDIER_JOBS {
            if left == 0 {
                break;
            }
            let n = self.inventory.figure(rank).min(left);
            if n == 0 {
                continue;
            }
            if self.inventory.remove_figure(rank, n).is_ok() {
                left = left.saturating_sub(n);
                taken.push((rank, n));
            }
        }
        taken
    }
}

impl Persist for Warehouse {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_object(self.id);
        out.push_u8(self.kind.as_u8());
        out.push_point(self.pos);
        self.inventory.persist(out)?;
        for setting in &self.ware_settings {
            out.push_u8(setting.bits());
        }
        for setting in &self.figure_settings {
            out.push_u8(setting.bits());
        }
        out.push_bool(self.harbor.is_some());
        if let Some(harbor) = &self.harbor {
            harbor.persist(out)?;
        }
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let id = input.pop_object()?;
        let raw_kind = input.pop_u8()?;
        let kind = BuildingType::from_u8(raw_kind)
            .filter(|kind| kind.is_warehouse())
            .ok_or(StreamError::InvalidValue {
                field: "warehouse type",
                value: u32::from(raw_kind),
            })?;
        let pos = input.pop_point()?;
        let inventory = Inventory::restore(input)?;
        let mut ware_settings = [InventorySetting::default(); WARE_TYPE_COUNT];
        for setting in &mut ware_settings {
            *setting = InventorySetting::from_bits(input.pop_u8()?);
        }
        let mut figure_settings = [InventorySetting::default(); JOB_TYPE_COUNT];
        for setting in &mut figure_settings {
            *setting = InventorySetting::from_bits(input.pop_u8()?);
        }
        let harbor = if input.pop_bool()? {
            Some(HarborState::restore(input)?)
        } else {
            None
        };
        Ok(Self {
            id,
            kind,
            pos,
            inventory,
            ware_settings,
            figure_settings,
            harbor,
        })
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// A capability a warehouse must have to be chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseCondition {
    /// Any warehouse.
    NoCondition,
    /// At least `count` goods of a type in stock.
    HasMinWares {
        /// Ware type.
        ware: WareType,
        /// Minimum stock.
        count: u32,
    },
    /// Someone for a job is present or can be recruited.
    HasFigure {
        /// The job.
        job: Job,
        /// Whether recruiting a helper counts.
        recruit: bool,
    },
    /// Both a ware and a person are available.
    HasWareAndFigure {
        /// Ware type.
        ware: WareType,
        /// The job.
        job: Job,
        /// Whether recruiting a helper counts.
        recruit: bool,
    },
    /// At least this many soldiers of any rank.
    HasMinSoldiers(u32),
    /// Deliveries of this ware are not stopped.
    AcceptsWare(WareType),
    /// Arrivals of this job are not stopped.
    AcceptsFigure(Job),
    /// This ware is being collected.
    CollectsWare(WareType),
    /// This job is being collected.
    CollectsFigure(Job),
    /// The ware is in stock and not being collected here.
    HasWareButNoCollect(WareType),
    /// Someone for the job is available and the job is not collected here.
    HasFigureButNoCollect {
        /// The job.
        job: Job,
        /// Whether recruiting a helper counts.
        recruit: bool,
    },
    /// Accepts the ware and does not send it away again.
    AcceptsWareButNoSend(WareType),
    /// Accepts the job and does not send it away again.
    AcceptsFigureButNoSend(Job),
}

impl WarehouseCondition {
    /// Whether `wh` satisfies the condition.
    pub fn matches(&self, wh: &Warehouse) -> bool {
        match *self {
            Self::NoCondition => true,
            Self::HasMinWares { ware, count } => wh.inventory.ware(ware) >= count,
            Self::HasFigure { job, recruit } => wh.has_figure(job, recruit),
            Self::HasWareAndFigure { ware, job, recruit } => {
                wh.inventory.ware(ware) > 0 && wh.has_figure(job, recruit)
            }
            Self::HasMinSoldiers(count) => wh.inventory.soldiers() >= count,
            Self::AcceptsWare(ware) => !wh.ware_setting(ware).is_stopped(),
            Self::AcceptsFigure(job) => !wh.figure_setting(job).is_stopped(),
            Self::CollectsWare(ware) => wh.ware_setting(ware).is_collecting(),
            Self::CollectsFigure(job) => wh.figure_setting(job).is_collecting(),
            Self::HasWareButNoCollect(ware) => {
                wh.inventory.ware(ware) > 0 && !wh.ware_setting(ware).is_collecting()
            }
            Self::HasFigureButNoCollect { job, recruit } => {
                wh.has_figure(job, recruit) && !wh.figure_setting(job).is_collecting()
            }
            Self::AcceptsWareButNoSend(ware) => {
                let setting = wh.ware_setting(ware);
                !setting.is_stopped() && !setting.is_sending()
            }
            Self::AcceptsFigureButNoSend(job) => {
                let setting = wh.figure_setting(job);
                !setting.is_stopped() && !setting.is_sending()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn storehouse() -> Warehouse {
        Warehouse::new(ObjectId::new(1), BuildingType::Storehouse, MapPoint::new(4, 4)).unwrap()
    }

    #[test]
    fn non_warehouse_type_is_rejected() {
        let err = Warehouse::new(ObjectId::new(1), BuildingType::Mill, MapPoint::new(0, 0));
        assert!(matches!(err, Err(EconomyError::WrongBuildingType { .. })));
    }

    #[test]
    fn recruiting_needs_helper_and_tool() {
        let mut wh = storehouse();
        wh.inventory.add_figure(Job::Helper, 1);
        assert!(!wh.has_figure(Job::Woodcutter, true));
        wh.inventory.add_ware(WareType::Axe, 1);
        assert!(wh.has_figure(Job::Woodcutter, true));
        assert!(!wh.has_figure(Job::Woodcutter, false));
        assert!(wh.has_figure(Job::Brewer, true));
        assert!(!wh.has_figure(Job::Private, true));

        assert!(wh.take_figure(Job::Woodcutter, true).unwrap());
        assert_eq!(wh.inventory.figure(Job::Helper), 0);
        assert_eq!(wh.inventory.ware(WareType::Axe), 0);
        assert!(wh.take_figure(Job::Woodcutter, true).is_err());
    }

    #[test]
    fn settings_drive_accept_and_collect() {
        let mut wh = storehouse();
        let boards = WareType::Boards;
        assert!(WarehouseCondition::AcceptsWare(boards).matches(&wh));
        assert!(WarehouseCondition::AcceptsWareButNoSend(boards).matches(&wh));
        wh.ware_settings[boards.index()] = InventorySetting::from_bits(InventorySetting::SEND);
        assert!(WarehouseCondition::AcceptsWare(boards).matches(&wh));
        assert!(!WarehouseCondition::AcceptsWareButNoSend(boards).matches(&wh));
        wh.ware_settings[boards.index()] = InventorySetting::from_bits(InventorySetting::STOP);
        assert!(!WarehouseCondition::AcceptsWare(boards).matches(&wh));
        wh.ware_settings[boards.index()] = InventorySetting::from_bits(InventorySetting::COLLECT);
        assert!(WarehouseCondition::CollectsWare(boards).matches(&wh));
    }

    #[test]
    fn soldiers_are_taken_weakest_first() {
        let mut wh = storehouse();
        wh.inventory.add_figure(Job::Private, 1);
        wh.inventory.add_figure(Job::Sergeant, 2);
        assert!(WarehouseCondition::HasMinSoldiers(3).matches(&wh));
        let taken = wh.take_soldiers(2);
        assert_eq!(taken, vec![(Job::Private, 1), (Job::Sergeant, 1)]);
        assert_eq!(wh.inventory.soldiers(), 1);
    }

    #[test]
    fn harbor_need_skips_covered_jobs() {
        let harbor = HarborState {
            ship_jobs: vec![100, 20, 5],
            ..HarborState::default()
        };
        assert_eq!(harbor.needed_ships(), 3);
        assert_eq!(harbor.need_for_ship(0), 125);
        assert_eq!(harbor.need_for_ship(2), 5);
        assert_eq!(harbor.need_for_ship(5), 0);
    }

    #[test]
    fn harbor_warehouse_survives_the_stream() {
        let mut wh =
            Warehouse::new(ObjectId::new(9), BuildingType::HarborBuilding, MapPoint::new(1, 2))
                .unwrap();
        wh.inventory.add_ware(WareType::Fish, 4);
        wh.ware_settings[3] = InventorySetting::from_bits(InventorySetting::COLLECT);
        let harbor = wh.harbor.as_mut().unwrap();
        harbor.coasts.push((SeaId::new(1), MapPoint::new(1, 3)));
        harbor.ship_jobs.push(50);
        harbor.demand.set(WareType::Boards, 200);

        let mut data = GameData::new();
        wh.persist(&mut data).unwrap();
        let mut input = GameData::from_bytes(data.into_bytes());
        assert_eq!(Warehouse::restore(&mut input).unwrap(), wh);
        assert!(input.is_exhausted());
    }
}
