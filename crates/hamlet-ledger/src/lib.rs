//! Pact ledger and diplomacy protocol for the Hamlet economy.
//!
//! Every player keeps its own [`DiplomacyLedger`]: one [`Pact`] entry per
//! other player and pact type. Two ledgers never touch each other's
//! entries; they exchange [`Envelope`]s that the game driver routes in
//! player order. A real pact exists only while both sides hold a matching
//! accepted entry.
//!
//! # Architecture
//!
//! - [`pact`] -- The [`Pact`] entry and its time-dependent state.
//! - [`message`] -- [`DiplomacyMessage`], [`Envelope`] and the [`Effects`]
//!   a ledger operation hands back to its player.
//! - [`diplomacy`] -- The [`DiplomacyLedger`] state machine.
//!
//! The ledger never panics; it returns errors.

pub mod diplomacy;
pub mod message;
pub mod pact;

// Re-export primary types at crate root.
pub use diplomacy::DiplomacyLedger;
pub use message::{DiplomacyMessage, Effects, Envelope};
pub use pact::{PERMANENT, Pact};

use hamlet_types::PlayerId;

/// Errors that can occur during pact ledger operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    /// A player cannot hold a pact with itself.
    #[error("player {0} cannot make a pact with itself")]
    SelfPact(PlayerId),

    /// The player index is outside the player table.
    #[error("unknown player slot {0}")]
    UnknownPlayer(PlayerId),

    /// A proposal must last at least one frame.
    #[error("pact duration must be non-zero")]
    ZeroDuration,

    /// A message was handed to the wrong ledger.
    #[error("envelope for player {actual} delivered to player {expected}")]
    Misrouted {
        /// The ledger owner that received it.
        expected: PlayerId,
        /// The addressee on the envelope.
        actual: PlayerId,
    },
}
