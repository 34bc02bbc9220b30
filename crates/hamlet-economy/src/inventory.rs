//! Counted stock of goods and people.

use hamlet_types::{
    GameData, JOB_TYPE_COUNT, Job, Persist, SOLDIER_JOBS, StreamError, WARE_TYPE_COUNT, WareType,
};

use crate::error::EconomyError;

/// Goods and people held by a warehouse, or by a whole player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    /// Stored goods per ware type.
    pub goods: [u32; WARE_TYPE_COUNT],
    /// Present people per job.
    pub people: [u32; JOB_TYPE_COUNT],
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    /// An empty inventory.
    pub const fn new() -> Self {
        Self {
            goods: [0; WARE_TYPE_COUNT],
            people: [0; JOB_TYPE_COUNT],
        }
    }

    /// Number of stored goods of one type.
    pub fn ware(&self, ware: WareType) -> u32 {
        self.goods.get(ware.index()).copied().unwrap_or(0)
    }

    /// Number of people with one job.
    pub fn figure(&self, job: Job) -> u32 {
        self.people.get(job.index()).copied().unwrap_or(0)
    }

    /// Add goods. Shields of every nation are counted as one type.
    pub fn add_ware(&mut self, ware: WareType, count: u32) {
        if let Some(slot) = self.goods.get_mut(ware.convert_shields().index()) {
            *slot = slot.saturating_add(count);
        }
    }

    /// Remove goods.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::WareUnderflow`] if fewer are stored.
    pub fn remove_ware(&mut self, ware: WareType, count: u32) -> Result<(), EconomyError> {
        let ware = ware.convert_shields();
        let available = self.ware(ware);
        let left = available
            .checked_sub(count)
            .ok_or(EconomyError::WareUnderflow {
                ware,
                requested: count,
                available,
            })?;
        if let Some(slot) = self.goods.get_mut(ware.index()) {
            *slot = left;
        }
        Ok(())
    }

    /// Add people.
    pub fn add_figure(&mut self, job: Job, count: u32) {
        if let Some(slot) = self.people.get_mut(job.index()) {
            *slot = slot.saturating_add(count);
        }
    }

    /// Remove people.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::FigureUnderflow`] if fewer are present.
    pub fn remove_figure(&mut self, job: Job, count: u32) -> Result<(), EconomyError> {
        let available = self.figure(job);
        let left = available
            .checked_sub(count)
            .ok_or(EconomyError::FigureUnderflow {
                job,
                requested: count,
                available,
            })?;
        if let Some(slot) = self.people.get_mut(job.index()) {
            *slot = left;
        }
        Ok(())
    }

    /// Soldiers of every rank.
    pub fn soldiers(&self) -> u32 {
        SOLDIER_JOBS
            .iter()
            .fold(0_u32, |sum, job| sum.saturating_add(self.figure(*job)))
    }

    /// Total number of stored goods.
    pub fn total_goods(&self) -> u32 {
        self.goods.iter().fold(0_u32, |sum, n| sum.saturating_add(*n))
    }

    /// Total number of people.
    pub fn total_people(&self) -> u32 {
        self.people.iter().fold(0_u32, |sum, n| sum.saturating_add(*n))
    }
}

impl Persist for Inventory {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        for count in &self.goods {
            out.push_u32(*count);
        }
        for count in &self.people {
            out.push_u32(*count);
        }
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let mut inventory = Self::new();
        for slot in &mut inventory.goods {
            *slot = input.pop_u32()?;
        }
        for slot in &mut inventory.people {
            *slot = input.pop_u32()?;
        }
        Ok(inventory)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn shields_share_one_slot() {
        let mut inv = Inventory::new();
        inv.add_ware(WareType::ShieldVikings, 2);
        inv.add_ware(WareType::ShieldRomans, 1);
        assert_eq!(inv.ware(WareType::ShieldRomans), 3);
        inv.remove_ware(WareType::ShieldJapanese, 3).unwrap();
        assert_eq!(inv.total_goods(), 0);
    }

    #[test]
    fn underflow_is_an_error() {
        let mut inv = Inventory::new();
        inv.add_ware(WareType::Boards, 1);
        let err = inv.remove_ware(WareType::Boards, 2).unwrap_err();
        assert!(matches!(err, EconomyError::WareUnderflow { available: 1, .. }));
        assert!(inv.remove_figure(Job::Helper, 1).is_err());
    }

    #[test]
    fn soldiers_sum_all_ranks() {
        let mut inv = Inventory::new();
        inv.add_figure(Job::Private, 3);
        inv.add_figure(Job::General, 1);
        inv.add_figure(Job::Helper, 10);
        assert_eq!(inv.soldiers(), 4);
        assert_eq!(inv.total_people(), 14);
    }
}
