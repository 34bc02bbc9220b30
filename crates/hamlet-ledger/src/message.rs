//! Messages exchanged between two players' pact ledgers.
//!
//! A ledger never writes into another player's entries. Every cross-player
//! effect is an [`Envelope`] the game driver delivers to the addressee's
//! [`DiplomacyLedger::receive`](crate::DiplomacyLedger::receive), in player
//! order, within the same frame.

use hamlet_types::{PactType, PlayerId, PostKind};
use serde::{Deserialize, Serialize};

/// A protocol step of the pact handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiplomacyMessage {
    /// The sender proposes a pact.
    Proposal {
        /// Kind of pact.
        pact: PactType,
        /// Proposed duration in frames.
        duration: u32,
        /// Identifier the addressee quotes when accepting.
        proposal_id: u32,
    },
    /// The sender accepts a proposal the addressee made.
    Acceptance {
        /// Kind of pact.
        pact: PactType,
        /// Identifier from the proposal.
        proposal_id: u32,
    },
    /// The addressee validated an acceptance; the pact is now in force.
    PactMade {
        /// Kind of pact.
        pact: PactType,
        /// Agreed duration in frames.
        duration: u32,
    },
    /// The sender wants to end a running pact.
    CancelRequest {
        /// Kind of pact.
        pact: PactType,
    },
    /// Both sides wanted to cancel; the sender already cleared its entry.
    CancelConfirmed {
        /// Kind of pact.
        pact: PactType,
    },
    /// The pact ran out on the sender's side.
    Expired {
        /// Kind of pact.
        pact: PactType,
    },
}

/// A message in transit between two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending player.
    pub from: PlayerId,
    /// Receiving player.
    pub to: PlayerId,
    /// The protocol step.
    pub message: DiplomacyMessage,
}

/// Everything a ledger operation asks the surrounding player to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    /// Messages to deliver to other players.
    pub envelopes: Vec<Envelope>,
    /// Post messages for the ledger owner's inbox.
    pub posts: Vec<PostKind>,
    /// Pact kinds whose real state changed for the owner.
    pub changed: Vec<PactType>,
}

impl Effects {
    /// No effects.
    pub const fn none() -> Self {
        Self {
            envelopes: Vec::new(),
            posts: Vec::new(),
            changed: Vec::new(),
        }
    }

    /// Whether the operation had no visible effect.
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty() && self.posts.is_empty() && self.changed.is_empty()
    }

    /// Append another operation's effects.
    pub fn merge(&mut self, other: Self) {
        self.envelopes.extend(other.envelopes);
        self.posts.extend(other.posts);
        self.changed.extend(other.changed);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_order() {
        let a = PlayerId::new(0);
        let b = PlayerId::new(1);
        let mut effects = Effects::none();
        assert!(effects.is_empty());
        effects.merge(Effects {
            envelopes: vec![Envelope {
                from: a,
                to: b,
                message: DiplomacyMessage::CancelRequest {
                    pact: PactType::Alliance,
                },
            }],
            posts: Vec::new(),
            changed: vec![PactType::Alliance],
        });
        effects.merge(Effects {
            envelopes: Vec::new(),
            posts: Vec::new(),
            changed: vec![PactType::NonAggression],
        });
        assert_eq!(
            effects.changed,
            vec![PactType::Alliance, PactType::NonAggression]
        );
        assert_eq!(effects.envelopes.len(), 1);
    }

    #[test]
    fn envelope_json_names_the_step() {
        let envelope = Envelope {
            from: PlayerId::new(2),
            to: PlayerId::new(5),
            message: DiplomacyMessage::Proposal {
                pact: PactType::NonAggression,
                duration: 600,
                proposal_id: 41,
            },
        };
        let value = serde_json::to_value(envelope).unwrap();
        assert!(value["message"].get("Proposal").is_some());
        let back: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, envelope);
    }
}
