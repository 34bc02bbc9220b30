//! Game frame clock.
//!
//! The frame counter (`gf`) is the only notion of time the economy has.
//! Periodic work (statistic steps, emergency checks and pact expiry) is
//! derived from it and the configured intervals, never stored separately,
//! so a restored game fires exactly the checks an uninterrupted one would.

use crate::config::TimingConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Frame counter would overflow.
    #[error("frame counter overflow: cannot advance beyond u32::MAX")]
    FrameOverflow,

    /// Invalid timing configuration (e.g. a zero interval).
    #[error("invalid timing configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Counts game frames and says which periodic checks are due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameClock {
    /// Current frame, 0 for the first one.
    gf: u32,
    statistic_interval: u32,
    emergency_interval: u32,
    pact_interval: u32,
}

impl GameClock {
    /// A clock at frame 0.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if any interval is zero.
    pub fn new(timing: &TimingConfig) -> Result<Self, ClockError> {
        Self::from_parts(0, timing)
    }

    /// A clock resumed at frame `gf`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if any interval is zero.
    pub fn from_parts(gf: u32, timing: &TimingConfig) -> Result<Self, ClockError> {
        let intervals = [
            ("statistic_interval_gf", timing.statistic_interval_gf),
            ("emergency_check_interval_gf", timing.emergency_check_interval_gf),
            ("pact_check_interval_gf", timing.pact_check_interval_gf),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ClockError::InvalidConfig {
                reason: format!("{name} must be at least 1"),
            });
        }
        Ok(Self {
            gf,
            statistic_interval: timing.statistic_interval_gf,
            emergency_interval: timing.emergency_check_interval_gf,
            pact_interval: timing.pact_check_interval_gf,
        })
    }

    /// Current frame.
    pub const fn gf(&self) -> u32 {
        self.gf
    }

    /// Move to the next frame and return it.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::FrameOverflow`] at `u32::MAX`.
    pub fn advance(&mut self) -> Result<u32, ClockError> {
        self.gf = self.gf.checked_add(1).ok_or(ClockError::FrameOverflow)?;
        Ok(self.gf)
    }

    /// Whether the statistics take a step this frame.
    ///
    /// Frame 0 never counts: the first step comes one full interval in.
    pub fn is_statistic_frame(&self) -> bool {
        self.gf > 0 && is_multiple(self.gf, self.statistic_interval)
    }

    /// Whether the emergency program is re-evaluated this frame.
    pub fn is_emergency_frame(&self) -> bool {
        is_multiple(self.gf, self.emergency_interval)
    }

    /// Whether pacts are checked for expiry this frame.
    pub fn is_pact_frame(&self) -> bool {
        is_multiple(self.gf, self.pact_interval)
    }
}

fn is_multiple(gf: u32, interval: u32) -> bool {
    gf.checked_rem(interval) == Some(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn timing(statistic: u32, emergency: u32, pact: u32) -> TimingConfig {
        TimingConfig {
            statistic_interval_gf: statistic,
            emergency_check_interval_gf: emergency,
            pact_check_interval_gf: pact,
        }
    }

    #[test]
    fn periodic_checks_follow_the_frame_counter() {
        let mut clock = GameClock::new(&timing(4, 3, 1)).unwrap();
        assert!(!clock.is_statistic_frame());
        assert!(clock.is_emergency_frame());

        let mut statistic_frames = Vec::new();
        let mut emergency_frames = Vec::new();
        for _ in 0..12 {
            let gf = clock.advance().unwrap();
            if clock.is_statistic_frame() {
                statistic_frames.push(gf);
            }
            if clock.is_emergency_frame() {
                emergency_frames.push(gf);
            }
            assert!(clock.is_pact_frame());
        }
        assert_eq!(statistic_frames, vec![4, 8, 12]);
        assert_eq!(emergency_frames, vec![3, 6, 9, 12]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(
            GameClock::new(&timing(750, 0, 1)),
            Err(ClockError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn resumed_clock_matches_uninterrupted_one() {
        let config = timing(5, 5, 5);
        let mut running = GameClock::new(&config).unwrap();
        for _ in 0..7 {
            running.advance().unwrap();
        }
        let resumed = GameClock::from_parts(running.gf(), &config).unwrap();
        assert_eq!(resumed, running);
    }

    #[test]
    fn advance_detects_overflow() {
        let mut clock = GameClock::from_parts(u32::MAX, &TimingConfig::default()).unwrap();
        assert!(matches!(clock.advance(), Err(ClockError::FrameOverflow)));
        assert_eq!(clock.gf(), u32::MAX);
    }
}
