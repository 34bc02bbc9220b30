//! The player's side of diplomacy.
//!
//! Pact bookkeeping lives in [`DiplomacyLedger`]; these wrappers turn its
//! effects into post messages, outgoing envelopes and the follow-up work a
//! changed pact causes in the economy.

use hamlet_ledger::{Effects, Envelope};
use hamlet_types::{MapPoint, PactState, PactType, PlayerId, PostKind, PostMessage, Team};
use tracing::debug;

use crate::error::EconomyError;
use crate::events::EconomyEvent;
use crate::player::Player;

impl Player {
    /// Propose a pact to another player.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::Ledger`] for a pact with oneself, an unknown
    /// player or a zero duration.
    pub fn suggest_pact(
        &mut self,
        gf: u32,
        target: PlayerId,
        pact: PactType,
        duration: u32,
    ) -> Result<(), EconomyError> {
        let effects = self.diplomacy.suggest_pact(target, pact, duration, gf)?;
        self.apply_effects(gf, effects);
        Ok(())
    }

    /// Accept a proposal another player made.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::Ledger`] for an invalid proposer.
    pub fn accept_pact(
        &mut self,
        gf: u32,
        proposal_id: u32,
        pact: PactType,
        proposer: PlayerId,
    ) -> Result<(), EconomyError> {
        let effects = self.diplomacy.accept_pact(proposal_id, pact, proposer)?;
        self.apply_effects(gf, effects);
        Ok(())
    }

    /// Ask to end a pact, or withdraw an unanswered proposal.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::Ledger`] for an invalid player.
    pub fn cancel_pact(
        &mut self,
        gf: u32,
        pact: PactType,
        other: PlayerId,
    ) -> Result<(), EconomyError> {
        let effects = self.diplomacy.cancel_pact(pact, other)?;
        self.apply_effects(gf, effects);
        Ok(())
    }

    /// Handle a diplomacy message from another player.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::Ledger`] for a misrouted envelope.
    pub fn receive_diplomacy(&mut self, gf: u32, envelope: Envelope) -> Result<(), EconomyError> {
        let effects = self.diplomacy.receive(envelope, gf)?;
        self.apply_effects(gf, effects);
        Ok(())
    }

    /// Expire pacts whose time ran out.
    pub fn test_pacts(&mut self, gf: u32) {
        let effects = self.diplomacy.test_pacts(gf);
        self.apply_effects(gf, effects);
    }

    /// Install permanent pacts with everyone on the same team.
    ///
    /// `players` lists every player of the game with their team; a random
    /// team counts as the first team and players without a team get no
    /// pacts.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::Ledger`] for an invalid player slot.
    pub fn make_start_pacts(&mut self, players: &[(PlayerId, Team)]) -> Result<(), EconomyError> {
        let own = self.team();
        if own == Team::NoTeam {
            return Ok(());
        }
        for (other, team) in players {
            if *other == self.id() || team.fixed() != own {
                continue;
            }
            self.diplomacy.make_start_pacts(*other)?;
            debug!(player = %self.id(), team_mate = %other, "start pacts made");
        }
        Ok(())
    }

    fn apply_effects(&mut self, gf: u32, effects: Effects) {
        for kind in effects.posts {
            self.post(gf, kind);
        }
        self.outbox.envelopes.extend(effects.envelopes);
        for pact in effects.changed {
            self.pact_changed(pact);
        }
    }

    /// A pact came into force or ended.
    ///
    /// The border to enemies may have moved; an alliance also changes what
    /// the player can see.
    fn pact_changed(&mut self, pact: PactType) {
        self.emit(EconomyEvent::MilitaryFlagsRecalculated);
        if pact == PactType::Alliance {
            self.emit(EconomyEvent::AllianceChanged);
        }
    }

    /// Resolve a pact with `other` at frame `gf`.
    pub fn pact_state(&self, pact: PactType, other: PlayerId, gf: u32) -> PactState {
        self.diplomacy.pact_state(pact, other, gf)
    }

    /// Frames left on a pact; `u32::MAX` for permanent ones.
    pub fn remaining_pact_time(&self, pact: PactType, other: PlayerId, gf: u32) -> u32 {
        self.diplomacy.remaining_pact_time(pact, other, gf)
    }

    /// Whether `other` is an ally. Every player is its own ally.
    pub fn is_ally(&self, other: PlayerId, gf: u32) -> bool {
        self.diplomacy.is_ally(other, gf)
    }

    /// Whether `other` may be attacked.
    pub fn is_attackable(&self, other: PlayerId, gf: u32) -> bool {
        self.diplomacy.is_attackable(other, gf)
    }

    /// Send every ally a letter pointing at `at`.
    pub fn notify_allies_of_location(&mut self, gf: u32, at: MapPoint, players: &[PlayerId]) {
        let from = self.id();
        let letters: Vec<PostMessage> = players
            .iter()
            .filter(|other| **other != from && self.is_ally(**other, gf))
            .map(|other| PostMessage::new(*other, gf, PostKind::AllyLocation { from, at }))
            .collect();
        self.outbox.posts.extend(letters);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_types::PlayerStatus;

    use super::*;

    fn player(id: u8, team: Team) -> Player {
        Player::new(PlayerId::new(id), PlayerStatus::Occupied, team)
    }

    /// Deliver queued envelopes back and forth until both sides are quiet.
    fn exchange(a: &mut Player, b: &mut Player, gf: u32) {
        loop {
            let from_a = std::mem::take(&mut a.outbox.envelopes);
            let from_b = std::mem::take(&mut b.outbox.envelopes);
            if from_a.is_empty() && from_b.is_empty() {
                break;
            }
            for envelope in from_a {
                b.receive_diplomacy(gf, envelope).unwrap();
            }
            for envelope in from_b {
                a.receive_diplomacy(gf, envelope).unwrap();
            }
        }
    }

    #[test]
    fn alliance_is_concluded_symmetrically_and_expires() {
        let mut a = player(0, Team::NoTeam);
        let mut b = player(1, Team::NoTeam);
        a.suggest_pact(10, b.id(), PactType::Alliance, 100).unwrap();
        exchange(&mut a, &mut b, 10);

        let question = b
            .drain_outbox()
            .posts
            .into_iter()
            .find_map(|post| match post.kind {
                PostKind::PactProposed { proposal_id, .. } => Some(proposal_id),
                _ => None,
            })
            .unwrap();
        b.accept_pact(12, question, PactType::Alliance, a.id()).unwrap();
        exchange(&mut a, &mut b, 12);

        assert_eq!(a.pact_state(PactType::Alliance, b.id(), 12), PactState::Accepted);
        assert_eq!(b.pact_state(PactType::Alliance, a.id(), 12), PactState::Accepted);
        assert!(a.is_ally(b.id(), 12));
        assert!(!a.is_attackable(b.id(), 12));
        assert!(a.drain_outbox().events.contains(&EconomyEvent::AllianceChanged));

        a.test_pacts(113);
        exchange(&mut a, &mut b, 113);
        assert_eq!(a.pact_state(PactType::Alliance, b.id(), 113), PactState::NoPact);
        assert_eq!(b.pact_state(PactType::Alliance, a.id(), 113), PactState::NoPact);
        assert!(a.is_attackable(b.id(), 113));
    }

    #[test]
    fn team_mates_start_allied() {
        let players = [
            (PlayerId::new(0), Team::Team2),
            (PlayerId::new(1), Team::Team2),
            (PlayerId::new(2), Team::Team1),
            (PlayerId::new(3), Team::Random),
        ];
        let mut first = player(0, Team::Team2);
        first.make_start_pacts(&players).unwrap();
        assert!(first.is_ally(PlayerId::new(1), 0));
        assert!(!first.is_ally(PlayerId::new(2), 0));
        assert_eq!(
            first.remaining_pact_time(PactType::NonAggression, PlayerId::new(1), 5),
            u32::MAX
        );

        let mut random = player(3, Team::Random);
        random.make_start_pacts(&players).unwrap();
        assert!(random.is_ally(PlayerId::new(2), 0));

        let mut loner = player(4, Team::NoTeam);
        loner.make_start_pacts(&players).unwrap();
        assert!(!loner.is_ally(PlayerId::new(0), 0));
    }

    #[test]
    fn allies_get_location_letters() {
        let players = [(PlayerId::new(0), Team::Team1), (PlayerId::new(1), Team::Team1)];
        let mut a = player(0, Team::Team1);
        a.make_start_pacts(&players).unwrap();
        let everyone = [PlayerId::new(0), PlayerId::new(1), PlayerId::new(2)];
        a.notify_allies_of_location(40, MapPoint::new(7, 8), &everyone);

        let posts = a.drain_outbox().posts;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].recipient, PlayerId::new(1));
        assert_eq!(
            posts[0].kind,
            PostKind::AllyLocation {
                from: PlayerId::new(0),
                at: MapPoint::new(7, 8)
            }
        );
    }
}
