//! Post messages delivered to a player's inbox.
//!
//! The economy never talks to the user interface directly. Anything a
//! player should be told about is queued as a [`PostMessage`] and drained by
//! the game driver once per frame.

use serde::{Deserialize, Serialize};

use crate::enums::PactType;
use crate::ids::PlayerId;
use crate::point::MapPoint;

/// A message for one player's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessage {
    /// The player who receives the message.
    pub recipient: PlayerId,
    /// Game frame at which the message was produced.
    pub gf: u32,
    /// What happened.
    pub kind: PostKind,
}

/// The content of a [`PostMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostKind {
    /// Another player proposes a pact and waits for an answer.
    PactProposed {
        /// The proposing player.
        from: PlayerId,
        /// Kind of pact.
        pact: PactType,
        /// Proposed duration in game frames (`u32::MAX` = permanent).
        duration: u32,
        /// Identifier to quote when accepting.
        proposal_id: u32,
    },
    /// A pact came into force.
    PactConcluded {
        /// The other party.
        with: PlayerId,
        /// Kind of pact.
        pact: PactType,
    },
    /// The other party asks to cancel a running pact.
    PactCancelRequested {
        /// The player asking.
        from: PlayerId,
        /// Kind of pact.
        pact: PactType,
    },
    /// A pact was cancelled by mutual consent.
    PactCancelled {
        /// The other party.
        with: PlayerId,
        /// Kind of pact.
        pact: PactType,
    },
    /// A pact ran out.
    PactExpired {
        /// The other party.
        with: PlayerId,
        /// Kind of pact.
        pact: PactType,
    },
    /// Building material ran short and production of it is missing.
    EmergencyStarted,
    /// Material supply recovered.
    EmergencyEnded,
    /// An ally shares a map position.
    AllyLocation {
        /// The ally.
        from: PlayerId,
        /// The shared position.
        at: MapPoint,
    },
    /// A ship sighted foreign territory.
    HostileTerritory {
        /// Where the territory was seen.
        at: MapPoint,
    },
    /// The player lost all military buildings and warehouses.
    Defeated,
}

impl PostMessage {
    /// Build a message.
    pub const fn new(recipient: PlayerId, gf: u32, kind: PostKind) -> Self {
        Self { recipient, gf, kind }
    }
}
