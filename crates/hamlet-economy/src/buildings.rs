//! Non-warehouse buildings and the workers bound to flags.

use std::collections::BTreeMap;

use hamlet_types::{BuildingType, GameData, Job, MapPoint, ObjectId, Persist, StreamError, WareType};

use crate::settings::{MILITARY_SETTINGS_SCALE, MilitarySettings};

/// Base points of a building site that still needs material.
const SITE_BASE_POINTS: u32 = 10_000;

/// Points lost per rank in the build priority.
const SITE_PRIORITY_PENALTY: u32 = 30;

/// Points lost per material already ordered or delivered.
const SITE_PROGRESS_PENALTY: u32 = 20;

/// First military slider controlling troop strength by frontier distance.
const TROOP_SLIDER_OFFSET: usize = 4;

// ---------------------------------------------------------------------------
// Demand
// ---------------------------------------------------------------------------

/// Building-local demand score per ware type; zero means "not needed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Demand {
    points: BTreeMap<WareType, u32>,
}

impl Demand {
    /// Demand for one ware type.
    pub fn points(&self, ware: WareType) -> u32 {
        self.points.get(&ware).copied().unwrap_or(0)
    }

    /// Set the demand for one ware type. Zero removes the entry.
    pub fn set(&mut self, ware: WareType, points: u32) {
        if points == 0 {
            self.points.remove(&ware);
        } else {
            self.points.insert(ware, points);
        }
    }

    pub(crate) fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_len(self.points.len())?;
        for (ware, points) in &self.points {
            out.push_u8(ware.as_u8());
            out.push_u32(*points);
        }
        Ok(())
    }

    pub(crate) fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let len = input.pop_len()?;
        let mut demand = Self::default();
        for _ in 0..len {
            let raw = input.pop_u8()?;
            let ware = WareType::from_u8(raw).ok_or(StreamError::InvalidValue {
                field: "demand ware",
                value: u32::from(raw),
            })?;
            demand.set(ware, input.pop_u32()?);
        }
        Ok(demand)
    }
}

// ---------------------------------------------------------------------------
// Production buildings
// ---------------------------------------------------------------------------

/// A production building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsualBuilding {
    /// Object id.
    pub id: ObjectId,
    /// Building type.
    pub kind: BuildingType,
    /// Flag position.
    pub pos: MapPoint,
    /// Productivity in percent.
    pub productivity: u16,
    /// Demand for input wares.
    pub demand: Demand,
}

impl UsualBuilding {
    /// A building with no demand and zero productivity.
    pub fn new(id: ObjectId, kind: BuildingType, pos: MapPoint) -> Self {
        Self {
            id,
            kind,
            pos,
            productivity: 0,
            demand: Demand::default(),
        }
    }
}

impl Persist for UsualBuilding {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_object(self.id);
        out.push_u8(self.kind.as_u8());
        out.push_point(self.pos);
        out.push_u16(self.productivity);
        self.demand.persist(out)
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let id = input.pop_object()?;
        let kind = pop_building_type(input)?;
        Ok(Self {
            id,
            kind,
            pos: input.pop_point()?,
            productivity: input.pop_u16()?,
            demand: Demand::restore(input)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Building sites
// ---------------------------------------------------------------------------

/// Progress of one construction material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialNeed {
    /// Total amount the building costs.
    pub needed: u8,
    /// Amount on its way.
    pub ordered: u8,
    /// Amount already at the site.
    pub delivered: u8,
}

impl MaterialNeed {
    /// A fresh need for `needed` units.
    pub const fn new(needed: u8) -> Self {
        Self {
            needed,
            ordered: 0,
            delivered: 0,
        }
    }

    /// Units ordered or delivered.
    pub const fn covered(self) -> u8 {
        self.ordered.saturating_add(self.delivered)
    }

    /// Units nobody has ordered yet.
    pub const fn missing(self) -> u8 {
        self.needed.saturating_sub(self.covered())
    }
}

/// A building under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingSite {
    /// Object id.
    pub id: ObjectId,
    /// Type of the building being built.
    pub kind: BuildingType,
    /// Flag position.
    pub pos: MapPoint,
    /// Boards.
    pub boards: MaterialNeed,
    /// Stones.
    pub stones: MaterialNeed,
}

impl BuildingSite {
    /// A site waiting for all of its material.
    pub const fn new(id: ObjectId, kind: BuildingType, pos: MapPoint, boards: u8, stones: u8) -> Self {
        Self {
            id,
            kind,
            pos,
            boards: MaterialNeed::new(boards),
            stones: MaterialNeed::new(stones),
        }
    }

    /// Need entry for a construction ware.
    pub const fn material(&self, ware: WareType) -> Option<&MaterialNeed> {
        match ware {
            WareType::Boards => Some(&self.boards),
            WareType::Stones => Some(&self.stones),
            _ => None,
        }
    }

    /// Mutable need entry for a construction ware.
    pub const fn material_mut(&mut self, ware: WareType) -> Option<&mut MaterialNeed> {
        match ware {
            WareType::Boards => Some(&mut self.boards),
            WareType::Stones => Some(&mut self.stones),
            _ => None,
        }
    }

    /// Demand score for `ware` given the site's build priority.
    ///
    /// Zero when the material is fully ordered. Earlier sites in the build
    /// order and sites with less progress score higher.
    pub fn distribution_points(&self, ware: WareType, priority: u32) -> u32 {
        let Some(need) = self.material(ware) else {
            return 0;
        };
        if need.missing() == 0 {
            return 0;
        }
        let progress = u32::from(self.boards.covered()).saturating_add(u32::from(self.stones.covered()));
        SITE_BASE_POINTS
            .saturating_sub(priority.saturating_mul(SITE_PRIORITY_PENALTY))
            .saturating_sub(progress.saturating_mul(SITE_PROGRESS_PENALTY))
    }
}

fn push_need(out: &mut GameData, need: MaterialNeed) {
    out.push_u8(need.needed);
    out.push_u8(need.ordered);
    out.push_u8(need.delivered);
}

fn pop_need(input: &mut GameData) -> Result<MaterialNeed, StreamError> {
    Ok(MaterialNeed {
        needed: input.pop_u8()?,
        ordered: input.pop_u8()?,
        delivered: input.pop_u8()?,
    })
}

impl Persist for BuildingSite {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_object(self.id);
        out.push_u8(self.kind.as_u8());
        out.push_point(self.pos);
        push_need(out, self.boards);
        push_need(out, self.stones);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let id = input.pop_object()?;
        let kind = pop_building_type(input)?;
        Ok(Self {
            id,
            kind,
            pos: input.pop_point()?,
            boards: pop_need(input)?,
            stones: pop_need(input)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Military buildings
// ---------------------------------------------------------------------------

/// A military building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilitaryBuilding {
    /// Object id.
    pub id: ObjectId,
    /// Building type.
    pub kind: BuildingType,
    /// Flag position.
    pub pos: MapPoint,
    /// Demand score for coins; zero when gold delivery is stopped.
    pub coin_points: u32,
    /// Soldiers stationed.
    pub troops: u32,
    /// Soldiers on their way.
    pub ordered_troops: u32,
    /// 0 = inland up to 3 = at the border.
    pub frontier_distance: u8,
    /// Whether no soldier has arrived yet.
    pub new_built: bool,
}

impl MilitaryBuilding {
    /// A freshly finished building without troops.
    pub const fn new(id: ObjectId, kind: BuildingType, pos: MapPoint) -> Self {
        Self {
            id,
            kind,
            pos,
            coin_points: 0,
            troops: 0,
            ordered_troops: 0,
            frontier_distance: 0,
            new_built: true,
        }
    }

    /// Soldier slots of this building type.
    pub const fn capacity(&self) -> u32 {
        match self.kind {
            BuildingType::Barracks => 2,
            BuildingType::Guardhouse => 3,
            BuildingType::Watchtower => 6,
            BuildingType::Fortress => 9,
            _ => 1,
        }
    }

    /// Soldiers wanted under the current military settings.
    ///
    /// At least one soldier is always wanted; the rest scale with the
    /// slider for this building's frontier distance.
    pub fn desired_troops(&self, settings: &MilitarySettings) -> u32 {
        let slider = TROOP_SLIDER_OFFSET.saturating_add(usize::from(self.frontier_distance.min(3)));
        let value = u32::from(settings.get(slider));
        let scale = MILITARY_SETTINGS_SCALE
            .get(slider)
            .copied()
            .map_or(1, u32::from);
        self.capacity()
            .saturating_sub(1)
            .saturating_mul(value)
            .checked_div(scale)
            .unwrap_or(0)
            .saturating_add(1)
    }

    /// Soldiers still to order.
    pub fn missing_troops(&self, settings: &MilitarySettings) -> u32 {
        self.desired_troops(settings)
            .saturating_sub(self.troops.saturating_add(self.ordered_troops))
    }
}

impl Persist for MilitaryBuilding {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_object(self.id);
        out.push_u8(self.kind.as_u8());
        out.push_point(self.pos);
        out.push_u32(self.coin_points);
        out.push_u32(self.troops);
        out.push_u32(self.ordered_troops);
        out.push_u8(self.frontier_distance);
        out.push_bool(self.new_built);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let id = input.pop_object()?;
        let kind = pop_building_type(input)?;
        Ok(Self {
            id,
            kind,
            pos: input.pop_point()?,
            coin_points: input.pop_u32()?,
            troops: input.pop_u32()?,
            ordered_troops: input.pop_u32()?,
            frontier_distance: input.pop_u8()?,
            new_built: input.pop_bool()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Flag workers
// ---------------------------------------------------------------------------

/// A geologist or scout working from a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagWorker {
    /// Object id of the worker.
    pub id: ObjectId,
    /// Job of the worker.
    pub job: Job,
    /// Flag the worker operates from.
    pub flag: MapPoint,
}

impl Persist for FlagWorker {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_object(self.id);
        out.push_u8(self.job.as_u8());
        out.push_point(self.flag);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let id = input.pop_object()?;
        let raw = input.pop_u8()?;
        let job = Job::from_u8(raw).ok_or(StreamError::InvalidValue {
            field: "job",
            value: u32::from(raw),
        })?;
        Ok(Self {
            id,
            job,
            flag: input.pop_point()?,
        })
    }
}

pub(crate) fn pop_building_type(input: &mut GameData) -> Result<BuildingType, StreamError> {
    let raw = input.pop_u8()?;
    BuildingType::from_u8(raw).ok_or(StreamError::InvalidValue {
        field: "building type",
        value: u32::from(raw),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::settings::STD_MILITARY_SETTINGS;

    #[test]
    fn site_points_drop_with_priority_and_progress() {
        let mut site = BuildingSite::new(ObjectId::new(1), BuildingType::Mill, MapPoint::new(0, 0), 2, 2);
        assert_eq!(site.distribution_points(WareType::Boards, 0), 10_000);
        assert_eq!(site.distribution_points(WareType::Boards, 3), 9_910);
        site.boards.ordered = 1;
        site.stones.delivered = 1;
        assert_eq!(site.distribution_points(WareType::Boards, 0), 9_960);
        site.boards.delivered = 1;
        assert_eq!(site.distribution_points(WareType::Boards, 0), 0);
        assert_eq!(site.distribution_points(WareType::Fish, 0), 0);
    }

    #[test]
    fn troops_follow_frontier_slider() {
        let mut fortress = MilitaryBuilding::new(ObjectId::new(2), BuildingType::Fortress, MapPoint::new(3, 3));
        let mut values = STD_MILITARY_SETTINGS;
        values[4] = 0;
        let settings = MilitarySettings::validated(values).unwrap();
        assert_eq!(fortress.desired_troops(&settings), 1);
        fortress.frontier_distance = 3;
        assert_eq!(fortress.desired_troops(&settings), 9);
        fortress.troops = 4;
        fortress.ordered_troops = 2;
        assert_eq!(fortress.missing_troops(&settings), 3);
    }

    #[test]
    fn demand_zero_removes_entry() {
        let mut demand = Demand::default();
        demand.set(WareType::Grain, 40);
        assert_eq!(demand.points(WareType::Grain), 40);
        demand.set(WareType::Grain, 0);
        assert_eq!(demand, Demand::default());
    }
}
