//! Multi-resolution statistics rollups.
//!
//! Four tiers cover 15 minutes, 1 hour, 4 hours and 16 hours. Each tier is
//! a ring of [`STAT_STEP_COUNT`] slots per statistic type and per
//! merchandise category. One step writes the current values into the
//! finest tier; every fourth write to a tier rolls one slot up into the
//! next coarser tier.
//!
//! Plain statistics are snapshots and are copied on rollup. Merchandise
//! counters count events since the previous step. A coarser slot gets the
//! events of the current step plus the three slots of the finer tier that
//! precede its newest one. For the 1-hour tier that is exactly the four
//! 15-minute slots it covers; coarser tiers see the same window shape one
//! level up.

use hamlet_types::{
    GameData, MERCHANDISE_CATEGORY_COUNT, STATISTIC_TIME_COUNT, STATISTIC_TYPE_COUNT,
    StatisticTime, StatisticType, StreamError, WareType,
};

use crate::error::EconomyError;

/// Slots per tier ring.
pub const STAT_STEP_COUNT: usize = 30;

/// Finer steps that make up one coarser step.
const ROLLUP_STEPS: u16 = 4;

/// Ring buffers of one time resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticTier {
    /// Snapshot per statistic type and slot.
    pub data: [[u32; STAT_STEP_COUNT]; STATISTIC_TYPE_COUNT],
    /// Event count per merchandise category and slot.
    pub merchandise: [[u16; STAT_STEP_COUNT]; MERCHANDISE_CATEGORY_COUNT],
    /// Most recently written slot.
    pub index: u16,
    /// Writes since the last rollup into the next tier.
    pub counter: u16,
}

impl Default for StatisticTier {
    fn default() -> Self {
        Self {
            data: [[0; STAT_STEP_COUNT]; STATISTIC_TYPE_COUNT],
            merchandise: [[0; STAT_STEP_COUNT]; MERCHANDISE_CATEGORY_COUNT],
            index: 0,
            counter: 0,
        }
    }
}

impl StatisticTier {
    /// Value of one statistic at the most recent slot.
    pub fn latest(&self, stat: StatisticType) -> u32 {
        self.data
            .get(stat.index())
            .and_then(|row| row.get(usize::from(self.index)))
            .copied()
            .unwrap_or(0)
    }

    /// Merchandise count `back` slots before the most recent one.
    pub fn merchandise_back(&self, category: usize, back: u16) -> u16 {
        let slot = step_back(self.index, back);
        self.merchandise
            .get(category)
            .and_then(|row| row.get(usize::from(slot)))
            .copied()
            .unwrap_or(0)
    }

    /// Advance the ring and write one slot.
    fn push(
        &mut self,
        data: &[u32; STATISTIC_TYPE_COUNT],
        merchandise: &[u16; MERCHANDISE_CATEGORY_COUNT],
    ) {
        let slot = usize::from(step_forward(self.index));
        for (row, value) in self.data.iter_mut().zip(data) {
            if let Some(cell) = row.get_mut(slot) {
                *cell = *value;
            }
        }
        for (row, value) in self.merchandise.iter_mut().zip(merchandise) {
            if let Some(cell) = row.get_mut(slot) {
                *cell = *value;
            }
        }
        self.index = step_forward(self.index);
        self.counter = self.counter.saturating_add(1);
    }

    /// Current merchandise plus the three slots preceding the newest one.
    fn merchandise_window(
        &self,
        current: &[u16; MERCHANDISE_CATEGORY_COUNT],
    ) -> [u16; MERCHANDISE_CATEGORY_COUNT] {
        let mut sums = *current;
        for (category, sum) in sums.iter_mut().enumerate() {
            *sum = (1..ROLLUP_STEPS).fold(*sum, |acc, back| {
                acc.saturating_add(self.merchandise_back(category, back))
            });
        }
        sums
    }

    fn persist(&self, out: &mut GameData) {
        for row in &self.data {
            for value in row {
                out.push_u32(*value);
            }
        }
        for row in &self.merchandise {
            for value in row {
                out.push_u16(*value);
            }
        }
        out.push_u16(self.index);
        out.push_u16(self.counter);
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let mut tier = Self::default();
        for row in &mut tier.data {
            for value in row.iter_mut() {
                *value = input.pop_u32()?;
            }
        }
        for row in &mut tier.merchandise {
            for value in row.iter_mut() {
                *value = input.pop_u16()?;
            }
        }
        tier.index = input.pop_u16()?;
        if usize::from(tier.index) >= STAT_STEP_COUNT {
            return Err(StreamError::InvalidValue {
                field: "statistic index",
                value: u32::from(tier.index),
            });
        }
        tier.counter = input.pop_u16()?;
        Ok(tier)
    }
}

fn step_forward(index: u16) -> u16 {
    let next = usize::from(index).saturating_add(1);
    if next >= STAT_STEP_COUNT { 0 } else { u16::try_from(next).unwrap_or(0) }
}

fn step_back(index: u16, back: u16) -> u16 {
    let len = STAT_STEP_COUNT;
    let back = usize::from(back).checked_rem(len).unwrap_or(0);
    let shifted = usize::from(index)
        .saturating_add(len)
        .saturating_sub(back)
        .checked_rem(len)
        .unwrap_or(0);
    u16::try_from(shifted).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// All tiers plus the values collected since the last step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statistics {
    tiers: [StatisticTier; STATISTIC_TIME_COUNT],
    current: [u32; STATISTIC_TYPE_COUNT],
    current_merchandise: [u16; MERCHANDISE_CATEGORY_COUNT],
}

impl Statistics {
    /// One time resolution.
    pub fn tier(&self, time: StatisticTime) -> Option<&StatisticTier> {
        self.tiers.get(time.index())
    }

    /// Current value of a statistic.
    pub fn current(&self, stat: StatisticType) -> u32 {
        self.current.get(stat.index()).copied().unwrap_or(0)
    }

    /// Merchandise events counted since the last step.
    pub fn current_merchandise(&self, category: usize) -> u16 {
        self.current_merchandise.get(category).copied().unwrap_or(0)
    }

    /// Overwrite a current value.
    pub fn set_value(&mut self, stat: StatisticType, value: u32) {
        if let Some(slot) = self.current.get_mut(stat.index()) {
            *slot = value;
        }
    }

    /// Change a current value by a signed amount.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::StatisticUnderflow`] if the value would drop
    /// below zero, or [`EconomyError::ArithmeticOverflow`] above `u32::MAX`.
    pub fn change_value(&mut self, stat: StatisticType, change: i64) -> Result<(), EconomyError> {
        let current = self.current(stat);
        let next = i64::from(current)
            .checked_add(change)
            .ok_or(EconomyError::ArithmeticOverflow {
                context: "statistic change",
            })?;
        if next < 0 {
            return Err(EconomyError::StatisticUnderflow {
                stat,
                current,
                change,
            });
        }
        let next = u32::try_from(next).map_err(|_err| EconomyError::ArithmeticOverflow {
            context: "statistic change",
        })?;
        self.set_value(stat, next);
        Ok(())
    }

    /// Count one produced ware towards its merchandise category.
    pub fn increase_merchandise(&mut self, ware: WareType) {
        if let Some(slot) = ware
            .merchandise_category()
            .and_then(|category| self.current_merchandise.get_mut(category))
        {
            *slot = slot.saturating_add(1);
        }
    }

    /// Record the current values and roll up coarser tiers.
    ///
    /// Merchandise counters start over afterwards.
    pub fn step(&mut self) {
        let data = self.current;
        let current = self.current_merchandise;
        let mut merchandise = current;
        let mut level = 0_usize;
        loop {
            let Some(tier) = self.tiers.get_mut(level) else {
                break;
            };
            tier.push(&data, &merchandise);
            if tier.counter < ROLLUP_STEPS {
                break;
            }
            tier.counter = 0;
            merchandise = tier.merchandise_window(&current);
            level = level.saturating_add(1);
        }
        self.current_merchandise = [0; MERCHANDISE_CATEGORY_COUNT];
    }

    /// Write all tiers, then the current values.
    pub fn persist(&self, out: &mut GameData) {
        for tier in &self.tiers {
            tier.persist(out);
        }
        for value in &self.current {
            out.push_u32(*value);
        }
        for value in &self.current_merchandise {
            out.push_u16(*value);
        }
    }

    /// Read all tiers, then the current values.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] for short or malformed input.
    pub fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let mut stats = Self::default();
        for tier in &mut stats.tiers {
            *tier = StatisticTier::restore(input)?;
        }
        for value in &mut stats.current {
            *value = input.pop_u32()?;
        }
        for value in &mut stats.current_merchandise {
            *value = input.pop_u16()?;
        }
        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const WOOD: usize = 0;

    fn tier(stats: &Statistics, time: StatisticTime) -> &StatisticTier {
        stats.tier(time).unwrap()
    }

    #[test]
    fn step_writes_next_slot_and_clears_merchandise() {
        let mut stats = Statistics::default();
        stats.set_value(StatisticType::Country, 42);
        stats.increase_merchandise(WareType::Wood);
        stats.step();
        let fine = tier(&stats, StatisticTime::FifteenMinutes);
        assert_eq!(fine.index, 1);
        assert_eq!(fine.latest(StatisticType::Country), 42);
        assert_eq!(fine.merchandise[WOOD][1], 1);
        assert_eq!(stats.current_merchandise(WOOD), 0);
    }

    #[test]
    fn four_steps_roll_up_a_window_sum() {
        let mut stats = Statistics::default();
        for produced in [1_u16, 2, 3, 4] {
            for _ in 0..produced {
                stats.increase_merchandise(WareType::Wood);
            }
            stats.step();
        }
        let fine = tier(&stats, StatisticTime::FifteenMinutes);
        let hour = tier(&stats, StatisticTime::OneHour);
        assert_eq!(fine.counter, 0);
        assert_eq!(hour.counter, 1);
        assert_eq!(hour.index, 1);
        let covered: u16 = (1..=4).map(|slot| fine.merchandise[WOOD][slot]).sum();
        assert_eq!(covered, 10);
        assert_eq!(hour.merchandise[WOOD][1], covered);
    }

    #[test]
    fn rollup_cascades_through_every_tier() {
        let mut stats = Statistics::default();
        for _ in 0..64 {
            stats.increase_merchandise(WareType::Boat);
            stats.step();
        }
        let hour = tier(&stats, StatisticTime::OneHour);
        let four = tier(&stats, StatisticTime::FourHours);
        let sixteen = tier(&stats, StatisticTime::SixteenHours);
        // Current step plus the three preceding slots of the finer tier.
        assert_eq!(hour.merchandise_back(13, 0), 4);
        assert_eq!(four.merchandise_back(13, 0), 1 + 4 + 4 + 4);
        assert_eq!(sixteen.merchandise_back(13, 0), 1 + 13 + 13 + 13);
        assert_eq!(sixteen.index, 1);
    }

    #[test]
    fn negative_statistic_is_an_error() {
        let mut stats = Statistics::default();
        stats.change_value(StatisticType::Buildings, 2).unwrap();
        stats.change_value(StatisticType::Buildings, -2).unwrap();
        let err = stats.change_value(StatisticType::Buildings, -1).unwrap_err();
        assert!(matches!(err, EconomyError::StatisticUnderflow { current: 0, .. }));
    }

    #[test]
    fn ring_index_wraps() {
        let mut stats = Statistics::default();
        for _ in 0..STAT_STEP_COUNT {
            stats.step();
        }
        assert_eq!(tier(&stats, StatisticTime::FifteenMinutes).index, 0);
        assert_eq!(step_back(0, 3), 27);
    }

    #[test]
    fn statistics_survive_the_stream() {
        let mut stats = Statistics::default();
        stats.set_value(StatisticType::Military, 7);
        stats.increase_merchandise(WareType::Coins);
        stats.step();
        stats.increase_merchandise(WareType::Gold);
        let mut data = GameData::new();
        stats.persist(&mut data);
        let mut input = GameData::from_bytes(data.into_bytes());
        let restored = Statistics::restore(&mut input).unwrap();
        assert!(input.is_exhausted());
        assert_eq!(restored, stats);
    }
}
