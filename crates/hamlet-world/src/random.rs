//! Synchronized pseudo-randomness.
//!
//! Every client of a lockstep game owns an identical [`SyncedRandom`] and
//! draws from it in the same order, so "random" decisions such as the
//! defender shuffle agree bit for bit. The generator state is part of the
//! game snapshot.

use hamlet_types::{GameData, Persist, StreamError};
use serde::{Deserialize, Serialize};

/// Fallback state, since `xorshift64` is stuck at zero.
const NONZERO_STATE: u64 = 0xdead_beef_cafe_babe;

/// Mixing constant applied to the seed.
const SEED_MIX: u64 = 0x517c_c1b7_2722_0a95;

/// Deterministic `xorshift64` generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedRandom {
    /// Current generator state, never zero.
    state: u64,
}

impl SyncedRandom {
    /// Create a generator from a game seed.
    pub const fn new(seed: u64) -> Self {
        let mut state = seed.wrapping_mul(SEED_MIX);
        if state == 0 {
            state = NONZERO_STATE;
        }
        Self { state }
    }

    /// Return the next raw 64-bit value.
    pub const fn next_u64(&mut self) -> u64 {
        let mut state = self.state;
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.state = state;
        state
    }

    /// Return a value in `0..max`, or 0 when `max` is 0.
    pub fn rand(&mut self, max: u32) -> u32 {
        let raw = self.next_u64();
        let remainder = raw.checked_rem(u64::from(max)).unwrap_or(0);
        u32::try_from(remainder).unwrap_or(0)
    }

    /// Shuffle a slice in place (Fisher-Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        let mut i = items.len();
        while i > 1 {
            let upper = u32::try_from(i).unwrap_or(u32::MAX);
            let j = usize::try_from(self.rand(upper)).unwrap_or(0);
            i = i.saturating_sub(1);
            items.swap(i, j);
        }
    }
}

impl Persist for SyncedRandom {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_u64(self.state);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let state = input.pop_u64()?;
        if state == 0 {
            return Err(StreamError::InvalidValue {
                field: "random state",
                value: 0,
            });
        }
        Ok(Self { state })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SyncedRandom::new(42);
        let mut b = SyncedRandom::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn zero_seed_still_produces_values() {
        let mut rng = SyncedRandom::new(0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn rand_stays_below_max() {
        let mut rng = SyncedRandom::new(7);
        for _ in 0..1000 {
            assert!(rng.rand(10) < 10);
        }
        assert_eq!(rng.rand(0), 0);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = SyncedRandom::new(3);
        let mut items: Vec<u32> = (0..20).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn state_survives_the_stream() {
        let mut rng = SyncedRandom::new(99);
        rng.next_u64();
        let mut data = GameData::new();
        rng.persist(&mut data).unwrap();
        let mut input = GameData::from_bytes(data.into_bytes());
        let mut restored = SyncedRandom::restore(&mut input).unwrap();
        assert_eq!(restored.next_u64(), rng.next_u64());
    }
}
