//! Per-player pact ledger and the pact state machine.
//!
//! # Protocol
//!
//! Every player owns one [`DiplomacyLedger`] holding its side of each pact.
//! The two sides only meet through [`Envelope`]s:
//!
//! | Step | Acting side | Message | Receiving side |
//! |------|-------------|---------|----------------|
//! | propose | proposer stores an unaccepted entry | `Proposal` | posts a question |
//! | accept | acceptor changes nothing yet | `Acceptance` | proposer validates the id, makes the pact |
//! | confirm | proposer | `PactMade` | acceptor makes the pact |
//! | cancel | canceller marks `want_cancel` | `CancelRequest` | clears if it also wants out, else posts a question |
//! | cancel ack | | `CancelConfirmed` | canceller clears |
//! | expire | either side notices first | `Expired` | clears its mirror entry |
//!
//! # Invariants
//!
//! - A running pact is only removed when both sides asked for it, and the
//!   check happens in exactly one place: [`DiplomacyLedger::receive`] for
//!   a `CancelRequest`.
//! - An acceptance quoting a stale proposal id is a silent no-op.
//! - A player is always its own ally.

use hamlet_types::{
    GameData, MAX_PLAYERS, PACT_TYPE_COUNT, PactState, PactType, Persist, PlayerId, PostKind,
    StreamError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::LedgerError;
use crate::message::{DiplomacyMessage, Effects, Envelope};
use crate::pact::Pact;

/// One player's side of every pact with every other player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomacyLedger {
    /// The player owning this ledger.
    owner: PlayerId,
    /// `pacts[other][pact_type]`.
    pacts: [[Pact; PACT_TYPE_COUNT]; MAX_PLAYERS],
}

impl DiplomacyLedger {
    /// Create an empty ledger for `owner`.
    pub fn new(owner: PlayerId) -> Self {
        Self {
            owner,
            pacts: [[Pact::default(); PACT_TYPE_COUNT]; MAX_PLAYERS],
        }
    }

    /// The owning player.
    pub const fn owner(&self) -> PlayerId {
        self.owner
    }

    /// This side's entry for `other`, if `other` is a valid slot.
    pub fn pact(&self, pact: PactType, other: PlayerId) -> Option<&Pact> {
        self.pacts.get(other.index())?.get(pact.index())
    }

    /// Mutable access to this side's entry for another player.
    fn entry_mut(&mut self, pact: PactType, other: PlayerId) -> Result<&mut Pact, LedgerError> {
        if other == self.owner {
            return Err(LedgerError::SelfPact(other));
        }
        self.pacts
            .get_mut(other.index())
            .and_then(|row| row.get_mut(pact.index()))
            .ok_or(LedgerError::UnknownPlayer(other))
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Resolve the pact with `other` at frame `now`.
    pub fn pact_state(&self, pact: PactType, other: PlayerId, now: u32) -> PactState {
        self.pact(pact, other)
            .map_or(PactState::NoPact, |entry| entry.state(now))
    }

    /// Frames left on an accepted pact (`u32::MAX` = permanent).
    pub fn remaining_pact_time(&self, pact: PactType, other: PlayerId, now: u32) -> u32 {
        self.pact(pact, other).map_or(0, |entry| entry.remaining(now))
    }

    /// Whether `other` is an ally. A player is always its own ally.
    pub fn is_ally(&self, other: PlayerId, now: u32) -> bool {
        other == self.owner
            || self.pact_state(PactType::Alliance, other, now) == PactState::Accepted
    }

    /// Whether `other` may be attacked: not an ally and no running
    /// non-aggression pact.
    pub fn is_attackable(&self, other: PlayerId, now: u32) -> bool {
        !self.is_ally(other, now)
            && self.pact_state(PactType::NonAggression, other, now) != PactState::Accepted
    }

    // -------------------------------------------------------------------
    // Commands issued by the owner
    // -------------------------------------------------------------------

    /// Propose a pact to `target` lasting `duration` frames.
    ///
    /// Only the owner's entry changes. The proposal id is the frame of the
    /// proposal. While a pact of this type with `target` is accepted, a new
    /// proposal is ignored: nothing is sent and the running pact keeps its
    /// start and duration. Cancel it first to renegotiate.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SelfPact`], [`LedgerError::UnknownPlayer`] or
    /// [`LedgerError::ZeroDuration`] for an impossible proposal.
    pub fn suggest_pact(
        &mut self,
        target: PlayerId,
        pact: PactType,
        duration: u32,
        now: u32,
    ) -> Result<Effects, LedgerError> {
        if duration == 0 {
            return Err(LedgerError::ZeroDuration);
        }
        let owner = self.owner;
        let entry = self.entry_mut(pact, target)?;
        if entry.state(now) == PactState::Accepted {
            debug!(player = %owner, target = %target, ?pact, "proposal ignored, pact already running");
            return Ok(Effects::none());
        }
        *entry = Pact {
            duration,
            start: now,
            accepted: false,
            want_cancel: false,
        };
        debug!(player = %owner, target = %target, ?pact, duration, "pact proposed");

        Ok(Effects {
            envelopes: vec![Envelope {
                from: owner,
                to: target,
                message: DiplomacyMessage::Proposal {
                    pact,
                    duration,
                    proposal_id: now,
                },
            }],
            ..Effects::none()
        })
    }

    /// Accept a proposal `proposer` made to the owner.
    ///
    /// Nothing changes locally; the proposer validates the id when the
    /// acceptance arrives and answers with `PactMade`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SelfPact`] or [`LedgerError::UnknownPlayer`].
    pub fn accept_pact(
        &mut self,
        proposal_id: u32,
        pact: PactType,
        proposer: PlayerId,
    ) -> Result<Effects, LedgerError> {
        // Validates the slot.
        self.entry_mut(pact, proposer)?;
        Ok(Effects {
            envelopes: vec![Envelope {
                from: self.owner,
                to: proposer,
                message: DiplomacyMessage::Acceptance { pact, proposal_id },
            }],
            ..Effects::none()
        })
    }

    /// Ask to end the pact with `other`, or withdraw a pending proposal.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SelfPact`] or [`LedgerError::UnknownPlayer`].
    pub fn cancel_pact(&mut self, pact: PactType, other: PlayerId) -> Result<Effects, LedgerError> {
        let owner = self.owner;
        let entry = self.entry_mut(pact, other)?;

        if !entry.accepted {
            entry.duration = 0;
            debug!(player = %owner, other = %other, ?pact, "proposal withdrawn");
            return Ok(Effects::none());
        }

        entry.want_cancel = true;
        debug!(player = %owner, other = %other, ?pact, "pact cancel requested");
        Ok(Effects {
            envelopes: vec![Envelope {
                from: owner,
                to: other,
                message: DiplomacyMessage::CancelRequest { pact },
            }],
            ..Effects::none()
        })
    }

    /// Install the permanent alliance and non-aggression pacts that team
    /// mates start the game with.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SelfPact`] or [`LedgerError::UnknownPlayer`].
    pub fn make_start_pacts(&mut self, team_mate: PlayerId) -> Result<(), LedgerError> {
        for pact in PactType::ALL {
            *self.entry_mut(*pact, team_mate)? = Pact::permanent();
        }
        Ok(())
    }

    /// Expire every pact whose time ran out.
    ///
    /// The owner's entry is cleared at once; the other side is told with an
    /// `Expired` message and clears its mirror entry on receipt.
    pub fn test_pacts(&mut self, now: u32) -> Effects {
        let owner = self.owner;
        let mut effects = Effects::none();

        for (index, row) in self.pacts.iter_mut().enumerate() {
            let Ok(raw) = u8::try_from(index) else {
                continue;
            };
            let other = PlayerId::new(raw);
            if other == owner {
                continue;
            }
            for (pact, entry) in PactType::ALL.iter().zip(row.iter_mut()) {
                if entry.duration == 0 || entry.state(now) != PactState::NoPact {
                    continue;
                }
                *entry = Pact::default();
                info!(player = %owner, other = %other, pact = ?pact, "pact expired");
                effects.envelopes.push(Envelope {
                    from: owner,
                    to: other,
                    message: DiplomacyMessage::Expired { pact: *pact },
                });
                effects.posts.push(PostKind::PactExpired {
                    with: other,
                    pact: *pact,
                });
                effects.changed.push(*pact);
            }
        }
        effects
    }

    // -------------------------------------------------------------------
    // Incoming messages
    // -------------------------------------------------------------------

    /// Handle a message from another player's ledger.
    ///
    /// Messages that no longer match this side's state (a stale proposal
    /// id, a cancel for a pact that is gone) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Misrouted`] if the envelope is not addressed to
    /// the owner, or the slot errors of the entry lookup.
    pub fn receive(&mut self, envelope: Envelope, now: u32) -> Result<Effects, LedgerError> {
        if envelope.to != self.owner {
            return Err(LedgerError::Misrouted {
                expected: self.owner,
                actual: envelope.to,
            });
        }
        let owner = self.owner;
        let from = envelope.from;

        match envelope.message {
            DiplomacyMessage::Proposal {
                pact,
                duration,
                proposal_id,
            } => {
                self.entry_mut(pact, from)?;
                Ok(Effects {
                    posts: vec![PostKind::PactProposed {
                        from,
                        pact,
                        duration,
                        proposal_id,
                    }],
                    ..Effects::none()
                })
            }

            DiplomacyMessage::Acceptance { pact, proposal_id } => {
                let entry = self.entry_mut(pact, from)?;
                if entry.accepted || entry.duration == 0 || entry.start != proposal_id {
                    debug!(player = %owner, from = %from, ?pact, proposal_id, "stale acceptance ignored");
                    return Ok(Effects::none());
                }
                let duration = entry.duration;
                let mut effects = self.make_pact(pact, from, duration, now)?;
                effects.envelopes.push(Envelope {
                    from: owner,
                    to: from,
                    message: DiplomacyMessage::PactMade { pact, duration },
                });
                Ok(effects)
            }

            DiplomacyMessage::PactMade { pact, duration } => self.make_pact(pact, from, duration, now),

            DiplomacyMessage::CancelRequest { pact } => {
                let entry = self.entry_mut(pact, from)?;
                if !entry.accepted {
                    debug!(player = %owner, from = %from, ?pact, "cancel request for missing pact ignored");
                    return Ok(Effects::none());
                }
                if !entry.want_cancel {
                    return Ok(Effects {
                        posts: vec![PostKind::PactCancelRequested { from, pact }],
                        ..Effects::none()
                    });
                }
                *entry = Pact::default();
                info!(player = %owner, other = %from, ?pact, "pact cancelled");
                Ok(Effects {
                    envelopes: vec![Envelope {
                        from: owner,
                        to: from,
                        message: DiplomacyMessage::CancelConfirmed { pact },
                    }],
                    posts: vec![PostKind::PactCancelled { with: from, pact }],
                    changed: vec![pact],
                })
            }

            DiplomacyMessage::CancelConfirmed { pact } => {
                let entry = self.entry_mut(pact, from)?;
                if !(entry.accepted && entry.want_cancel) {
                    return Ok(Effects::none());
                }
                *entry = Pact::default();
                info!(player = %owner, other = %from, ?pact, "pact cancelled");
                Ok(Effects {
                    posts: vec![PostKind::PactCancelled { with: from, pact }],
                    changed: vec![pact],
                    ..Effects::none()
                })
            }

            DiplomacyMessage::Expired { pact } => {
                let entry = self.entry_mut(pact, from)?;
                if !entry.accepted || entry.duration == 0 {
                    return Ok(Effects::none());
                }
                *entry = Pact::default();
                info!(player = %owner, other = %from, ?pact, "pact expired");
                Ok(Effects {
                    posts: vec![PostKind::PactExpired { with: from, pact }],
                    changed: vec![pact],
                    ..Effects::none()
                })
            }
        }
    }

    /// Put a pact into force on the owner's side.
    fn make_pact(
        &mut self,
        pact: PactType,
        other: PlayerId,
        duration: u32,
        now: u32,
    ) -> Result<Effects, LedgerError> {
        let owner = self.owner;
        *self.entry_mut(pact, other)? = Pact {
            duration,
            start: now,
            accepted: true,
            want_cancel: false,
        };
        info!(player = %owner, other = %other, ?pact, duration, "pact concluded");
        Ok(Effects {
            posts: vec![PostKind::PactConcluded { with: other, pact }],
            changed: vec![pact],
            ..Effects::none()
        })
    }

    // -------------------------------------------------------------------
    // Serialization
    // -------------------------------------------------------------------

    /// Write the pact matrix, row by row.
    pub fn persist_pacts(&self, out: &mut GameData) -> Result<(), StreamError> {
        for row in &self.pacts {
            for entry in row {
                entry.persist(out)?;
            }
        }
        Ok(())
    }

    /// Read a pact matrix written by [`DiplomacyLedger::persist_pacts`].
    pub fn restore_pacts(owner: PlayerId, input: &mut GameData) -> Result<Self, StreamError> {
        let mut ledger = Self::new(owner);
        for row in &mut ledger.pacts {
            for entry in row.iter_mut() {
                *entry = Pact::restore(input)?;
            }
        }
        Ok(ledger)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    const A: PlayerId = PlayerId(0);
    const B: PlayerId = PlayerId(1);

    /// Deliver envelopes back and forth until no messages remain.
    fn settle(a: &mut DiplomacyLedger, b: &mut DiplomacyLedger, first: Effects, now: u32) {
        let mut queue = first.envelopes;
        while !queue.is_empty() {
            let envelope = queue.remove(0);
            let target = if envelope.to == a.owner() { &mut *a } else { &mut *b };
            queue.extend(target.receive(envelope, now).unwrap().envelopes);
        }
    }

    fn ally_pair(now: u32, duration: u32) -> (DiplomacyLedger, DiplomacyLedger) {
        let mut a = DiplomacyLedger::new(A);
        let mut b = DiplomacyLedger::new(B);
        let proposal = a.suggest_pact(B, PactType::Alliance, duration, now).unwrap();
        settle(&mut a, &mut b, proposal, now);
        let accept = b.accept_pact(now, PactType::Alliance, A).unwrap();
        settle(&mut a, &mut b, accept, now);
        (a, b)
    }

    #[test]
    fn proposal_only_touches_the_proposer() {
        let mut a = DiplomacyLedger::new(A);
        let b = DiplomacyLedger::new(B);
        let effects = a.suggest_pact(B, PactType::Alliance, 100, 5).unwrap();
        assert_eq!(a.pact_state(PactType::Alliance, B, 5), PactState::InProgress);
        assert_eq!(b.pact_state(PactType::Alliance, A, 5), PactState::NoPact);
        assert_eq!(effects.envelopes.len(), 1);
    }

    #[test]
    fn proposal_reaches_target_inbox() {
        let mut b = DiplomacyLedger::new(B);
        let effects = b
            .receive(
                Envelope {
                    from: A,
                    to: B,
                    message: DiplomacyMessage::Proposal {
                        pact: PactType::NonAggression,
                        duration: 300,
                        proposal_id: 9,
                    },
                },
                9,
            )
            .unwrap();
        assert!(matches!(
            effects.posts.as_slice(),
            [PostKind::PactProposed { proposal_id: 9, duration: 300, .. }]
        ));
    }

    #[test]
    fn accepted_pact_is_symmetric_and_expires() {
        let (mut a, mut b) = ally_pair(10, 100);
        assert_eq!(a.pact_state(PactType::Alliance, B, 10), PactState::Accepted);
        assert_eq!(b.pact_state(PactType::Alliance, A, 10), PactState::Accepted);
        assert!(a.is_ally(B, 50));
        assert!(!a.is_attackable(B, 50));
        assert_eq!(a.remaining_pact_time(PactType::Alliance, B, 60), 50);

        // Still in force on the last frame.
        assert!(a.test_pacts(110).is_empty());

        let expired = a.test_pacts(111);
        assert_eq!(expired.changed, vec![PactType::Alliance]);
        assert_eq!(a.pact_state(PactType::Alliance, B, 111), PactState::NoPact);
        settle(&mut a, &mut b, expired, 111);
        assert_eq!(b.pact(PactType::Alliance, A).unwrap().duration, 0);
        assert!(b.test_pacts(111).is_empty());
    }

    #[test]
    fn proposal_during_a_running_pact_is_ignored() {
        let (mut a, _) = ally_pair(10, 100);
        let effects = a.suggest_pact(B, PactType::Alliance, 500, 20).unwrap();
        assert!(effects.is_empty());
        assert_eq!(a.pact_state(PactType::Alliance, B, 20), PactState::Accepted);
        assert_eq!(a.remaining_pact_time(PactType::Alliance, B, 20), 90);
    }

    #[test]
    fn stale_acceptance_is_ignored() {
        let mut a = DiplomacyLedger::new(A);
        let mut b = DiplomacyLedger::new(B);
        let proposal = a.suggest_pact(B, PactType::Alliance, 100, 10).unwrap();
        settle(&mut a, &mut b, proposal, 10);
        let accept = b.accept_pact(7, PactType::Alliance, A).unwrap();
        settle(&mut a, &mut b, accept, 12);
        assert_eq!(a.pact_state(PactType::Alliance, B, 12), PactState::InProgress);
        assert_eq!(b.pact_state(PactType::Alliance, A, 12), PactState::NoPact);
    }

    #[test]
    fn withdrawn_proposal_cannot_be_accepted() {
        let mut a = DiplomacyLedger::new(A);
        let mut b = DiplomacyLedger::new(B);
        let proposal = a.suggest_pact(B, PactType::Alliance, 100, 10).unwrap();
        settle(&mut a, &mut b, proposal, 10);
        assert!(a.cancel_pact(PactType::Alliance, B).unwrap().is_empty());
        let accept = b.accept_pact(10, PactType::Alliance, A).unwrap();
        settle(&mut a, &mut b, accept, 11);
        assert_eq!(b.pact_state(PactType::Alliance, A, 11), PactState::NoPact);
    }

    #[test]
    fn unilateral_cancel_only_asks() {
        let (mut a, mut b) = ally_pair(0, 1000);
        let request = a.cancel_pact(PactType::Alliance, B).unwrap();
        let reply = b.receive(request.envelopes[0], 5).unwrap();
        assert!(matches!(reply.posts.as_slice(), [PostKind::PactCancelRequested { .. }]));
        assert_eq!(a.pact_state(PactType::Alliance, B, 5), PactState::Accepted);
        assert_eq!(b.pact_state(PactType::Alliance, A, 5), PactState::Accepted);
    }

    #[test]
    fn mutual_cancel_clears_both_sides() {
        let (mut a, mut b) = ally_pair(0, 1000);
        let first = a.cancel_pact(PactType::Alliance, B).unwrap();
        settle(&mut a, &mut b, first, 5);
        let second = b.cancel_pact(PactType::Alliance, A).unwrap();
        settle(&mut a, &mut b, second, 6);
        assert_eq!(*a.pact(PactType::Alliance, B).unwrap(), Pact::default());
        assert_eq!(*b.pact(PactType::Alliance, A).unwrap(), Pact::default());
    }

    #[test]
    fn simultaneous_cancel_clears_both_sides() {
        let (mut a, mut b) = ally_pair(0, 1000);
        let mut both = a.cancel_pact(PactType::Alliance, B).unwrap();
        both.merge(b.cancel_pact(PactType::Alliance, A).unwrap());
        settle(&mut a, &mut b, both, 5);
        assert_eq!(a.pact_state(PactType::Alliance, B, 5), PactState::NoPact);
        assert_eq!(b.pact_state(PactType::Alliance, A, 5), PactState::NoPact);
    }

    #[test]
    fn start_pacts_are_permanent() {
        let mut a = DiplomacyLedger::new(A);
        a.make_start_pacts(B).unwrap();
        assert!(a.is_ally(B, u32::MAX));
        assert_eq!(a.remaining_pact_time(PactType::NonAggression, B, 77), u32::MAX);
    }

    #[test]
    fn self_is_ally_and_self_pacts_rejected() {
        let mut a = DiplomacyLedger::new(A);
        assert!(a.is_ally(A, 0));
        assert!(!a.is_attackable(A, 0));
        assert!(matches!(
            a.suggest_pact(A, PactType::Alliance, 10, 0),
            Err(LedgerError::SelfPact(_))
        ));
        assert!(matches!(
            a.suggest_pact(PlayerId(8), PactType::Alliance, 10, 0),
            Err(LedgerError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn misrouted_envelope_is_an_error() {
        let mut a = DiplomacyLedger::new(A);
        let envelope = Envelope {
            from: B,
            to: PlayerId(2),
            message: DiplomacyMessage::Expired {
                pact: PactType::Alliance,
            },
        };
        assert!(matches!(a.receive(envelope, 0), Err(LedgerError::Misrouted { .. })));
    }

    #[test]
    fn pact_matrix_survives_the_stream() {
        let (a, _) = ally_pair(3, 500);
        let mut data = GameData::new();
        a.persist_pacts(&mut data).unwrap();
        assert_eq!(data.as_bytes().len(), MAX_PLAYERS * PACT_TYPE_COUNT * 10);
        let mut input = GameData::from_bytes(data.into_bytes());
        let restored = DiplomacyLedger::restore_pacts(A, &mut input).unwrap();
        assert_eq!(restored, a);
    }
}
