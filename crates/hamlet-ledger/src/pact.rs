//! A single pact entry and its time-dependent state.

use hamlet_types::{GameData, PactState, Persist, StreamError};
use serde::{Deserialize, Serialize};

/// Duration value meaning "never expires".
pub const PERMANENT: u32 = u32::MAX;

/// One side's record of a pact with another player.
///
/// A real pact exists only while both players hold an accepted entry for
/// each other. An entry with a duration but no acceptance is a proposal
/// this side made and is waiting on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pact {
    /// Length in game frames; 0 = no pact, [`PERMANENT`] = forever.
    pub duration: u32,
    /// Frame at which the pact was proposed or concluded.
    pub start: u32,
    /// Whether the other side accepted.
    pub accepted: bool,
    /// Whether this side asked to cancel.
    pub want_cancel: bool,
}

impl Pact {
    /// A concluded, never-ending pact starting at frame 0.
    pub const fn permanent() -> Self {
        Self {
            duration: PERMANENT,
            start: 0,
            accepted: true,
            want_cancel: false,
        }
    }

    /// Resolve the entry at frame `now`.
    pub fn state(&self, now: u32) -> PactState {
        if self.duration == 0 {
            return PactState::NoPact;
        }
        if !self.accepted {
            return PactState::InProgress;
        }
        if self.duration == PERMANENT || u64::from(now) <= self.end() {
            PactState::Accepted
        } else {
            PactState::NoPact
        }
    }

    /// Frames left before an accepted pact runs out.
    ///
    /// [`PERMANENT`] for endless pacts, 0 when nothing is running.
    pub fn remaining(&self, now: u32) -> u32 {
        if self.duration == 0 || !self.accepted {
            return 0;
        }
        if self.duration == PERMANENT {
            return PERMANENT;
        }
        self.end()
            .checked_sub(u64::from(now))
            .and_then(|left| u32::try_from(left).ok())
            .unwrap_or(0)
    }

    /// Last frame on which the pact still holds, computed without overflow.
    fn end(&self) -> u64 {
        u64::from(self.start).saturating_add(u64::from(self.duration))
    }
}

impl Persist for Pact {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_u32(self.duration);
        out.push_u32(self.start);
        out.push_bool(self.accepted);
        out.push_bool(self.want_cancel);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        Ok(Self {
            duration: input.pop_u32()?,
            start: input.pop_u32()?,
            accepted: input.pop_bool()?,
            want_cancel: input.pop_bool()?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_no_pact() {
        let pact = Pact {
            accepted: true,
            ..Pact::default()
        };
        assert_eq!(pact.state(0), PactState::NoPact);
    }

    #[test]
    fn unaccepted_entry_is_in_progress() {
        let pact = Pact {
            duration: 50,
            start: 10,
            ..Pact::default()
        };
        assert_eq!(pact.state(1000), PactState::InProgress);
        assert_eq!(pact.remaining(20), 0);
    }

    #[test]
    fn accepted_pact_holds_through_its_last_frame() {
        let pact = Pact {
            duration: 100,
            start: 20,
            accepted: true,
            want_cancel: false,
        };
        assert_eq!(pact.state(120), PactState::Accepted);
        assert_eq!(pact.state(121), PactState::NoPact);
        assert_eq!(pact.remaining(100), 20);
        assert_eq!(pact.remaining(121), 0);
    }

    #[test]
    fn end_does_not_wrap_near_frame_limit() {
        let pact = Pact {
            duration: 10,
            start: u32::MAX - 5,
            accepted: true,
            want_cancel: false,
        };
        assert_eq!(pact.state(u32::MAX), PactState::Accepted);
    }

    #[test]
    fn permanent_pact_never_ends() {
        let pact = Pact::permanent();
        assert_eq!(pact.state(u32::MAX), PactState::Accepted);
        assert_eq!(pact.remaining(12345), PERMANENT);
    }
}
