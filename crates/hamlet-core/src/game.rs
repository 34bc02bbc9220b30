//! The lockstep frame driver.
//!
//! Every client runs the same [`Game`] and feeds it the same commands in
//! the same order, so every client reaches the same state. One frame runs
//! through these phases:
//!
//! 1. **Commands** -- player commands execute in the order given.
//! 2. **Diplomacy** -- envelopes are delivered in player-slot order until no
//!    player has anything left to send.
//! 3. **Periodic checks** -- pact expiry, the emergency program and the
//!    statistic step, each on its own interval.
//! 4. **Collect** -- every player's outbox is drained into a
//!    [`FrameSummary`].
//!
//! World-side notifications (a building finished, a road built) reach a
//! player between frames through [`Game::act`]; what they cause is
//! collected with the next frame.
//!
//! # Save format
//!
//! `gf: u32`, generator state, next object handle `u32`, player count `u8`,
//! then one player record per slot. Game rules come from the configuration
//! and are not saved.

use hamlet_economy::settings::{BUILDABLE_TYPE_COUNT, MILITARY_SETTINGS_COUNT};
use hamlet_economy::transport::TRANSPORT_GROUP_COUNT;
use hamlet_economy::{
    DistributionSettings, EconomyContext, EconomyError, EconomyEvent, Player, TradeCaravan,
    TradeGoal, TradeGoods,
};
use hamlet_types::{
    BuildingType, GameData, MapPoint, ObjectCounter, ObjectId, PactType, Persist, PlayerId,
    PostMessage, StreamError, TOOL_COUNT,
};
use hamlet_world::{PathQueryPort, SyncedRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, GameClock};
use crate::config::{ConfigError, GameConfig};

/// Delivery rounds after which diplomacy is considered stuck.
const MAX_ROUTING_ROUNDS: u32 = 16;

/// Errors that can occur while driving a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The configuration was rejected.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A player's economy broke an invariant. The frame is lost.
    #[error("economy error for player {player}: {source}")]
    Economy {
        /// The player whose economy failed.
        player: PlayerId,
        /// The underlying economy error.
        source: EconomyError,
    },

    /// Save data could not be written or read.
    #[error("save game error: {source}")]
    Stream {
        /// The underlying stream error.
        #[from]
        source: StreamError,
    },

    /// No slot with this id.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    /// The slot is free or locked.
    #[error("player {0} is not taking part in the game")]
    InactivePlayer(PlayerId),

    /// The save game was written for a different number of slots.
    #[error("save game has {saved} player slots, configuration has {configured}")]
    PlayerCountMismatch {
        /// Slots in the configuration.
        configured: usize,
        /// Slots in the save game.
        saved: usize,
    },

    /// Bytes were left over after the last player record.
    #[error("save game has {remaining} trailing bytes")]
    TrailingData {
        /// Unread bytes.
        remaining: usize,
    },

    /// Players kept answering each other's diplomacy messages.
    #[error("diplomacy did not settle after {rounds} delivery rounds")]
    DiplomacyNotSettled {
        /// Rounds delivered before giving up.
        rounds: u32,
    },
}

/// A synchronized player command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GameCommand {
    /// New military sliders.
    ChangeMilitary {
        /// Slider values.
        values: [u8; MILITARY_SETTINGS_COUNT],
    },
    /// New tool priorities plus order changes.
    ChangeTools {
        /// Production priority per tool.
        priorities: [u8; TOOL_COUNT],
        /// Order change per tool.
        order_changes: [i8; TOOL_COUNT],
    },
    /// New distribution sliders.
    ChangeDistribution {
        /// Slider values.
        settings: DistributionSettings,
    },
    /// New building site order.
    ChangeBuildOrder {
        /// 0 for first come first served.
        order_type: u8,
        /// Building types, most urgent first.
        order: [BuildingType; BUILDABLE_TYPE_COUNT],
    },
    /// New transport order.
    ChangeTransportOrder {
        /// Transport groups, most urgent first.
        order: [u8; TRANSPORT_GROUP_COUNT],
    },
    /// Propose a pact.
    SuggestPact {
        /// Player asked.
        target: PlayerId,
        /// Pact kind.
        pact: PactType,
        /// Duration in frames.
        duration: u32,
    },
    /// Accept a proposal.
    AcceptPact {
        /// Id from the proposal post.
        proposal_id: u32,
        /// Pact kind.
        pact: PactType,
        /// Player who proposed.
        proposer: PlayerId,
    },
    /// End a pact or withdraw a proposal.
    CancelPact {
        /// Pact kind.
        pact: PactType,
        /// The other party.
        other: PlayerId,
    },
    /// Tell every ally where to look.
    NotifyAllies {
        /// Location to point at.
        at: MapPoint,
    },
    /// Send goods or people to an ally's warehouse.
    Trade {
        /// Receiving player.
        target: PlayerId,
        /// Receiving warehouse.
        warehouse: ObjectId,
        /// What to send.
        goods: TradeGoods,
        /// How many.
        count: u32,
    },
    /// Give up.
    Surrender,
}

/// One economy event and the player it happened to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameEvent {
    /// Player whose economy emitted the event.
    pub player: PlayerId,
    /// The event.
    #[serde(flatten)]
    pub event: EconomyEvent,
}

/// Everything that happened in one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameSummary {
    /// The frame that was executed.
    pub gf: u32,
    /// Economy events in player-slot order.
    pub events: Vec<FrameEvent>,
    /// Post messages for the players' inboxes.
    pub posts: Vec<PostMessage>,
    /// Players defeated this frame.
    pub defeated: Vec<PlayerId>,
    /// Whether a statistic step was taken.
    pub statistic_step: bool,
}

/// A running game: every player slot plus the shared services.
#[derive(Debug)]
pub struct Game<P> {
    name: String,
    paths: P,
    clock: GameClock,
    rng: SyncedRandom,
    ids: ObjectCounter,
    players: Vec<Player>,
}

impl<P: PathQueryPort> Game<P> {
    /// Set up a new game from its configuration.
    ///
    /// Team mates start with permanent pacts.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Config`] for an invalid configuration.
    pub fn new(config: &GameConfig, paths: P) -> Result<Self, GameError> {
        config.validate()?;
        let players = config
            .players
            .iter()
            .zip(0_u8..)
            .map(|(slot, raw)| {
                let mut player = Player::new(PlayerId::new(raw), slot.status, slot.team);
                player.set_catapult_limit(config.rules.catapult_limit());
                player
            })
            .collect();
        let mut game = Self {
            name: config.game.name.clone(),
            paths,
            clock: GameClock::new(&config.timing)?,
            rng: SyncedRandom::new(config.game.seed),
            ids: ObjectCounter::default(),
            players,
        };
        game.make_start_pacts()?;
        info!(
            game = %game.name,
            players = game.active_players().count(),
            seed = config.game.seed,
            "game created"
        );
        Ok(game)
    }

    /// Give every active player permanent pacts with its team mates.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Economy`] if a pact cannot be made.
    pub fn make_start_pacts(&mut self) -> Result<(), GameError> {
        let teams: Vec<_> = self
            .active_players()
            .map(|player| (player.id(), player.team()))
            .collect();
        for player in self.players.iter_mut().filter(|p| p.status().is_active()) {
            let id = player.id();
            player
                .make_start_pacts(&teams)
                .map_err(|source| GameError::Economy { player: id, source })?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Game name from the configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The frame about to run.
    pub const fn gf(&self) -> u32 {
        self.clock.gf()
    }

    /// Every slot, active or not.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// One slot.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id.into_inner()))
    }

    /// The path oracle.
    pub const fn paths(&self) -> &P {
        &self.paths
    }

    /// The path oracle, for world changes between frames.
    pub const fn paths_mut(&mut self) -> &mut P {
        &mut self.paths
    }

    fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.status().is_active())
    }

    fn active_index(&self, id: PlayerId) -> Result<usize, GameError> {
        let index = usize::from(id.into_inner());
        let player = self.players.get(index).ok_or(GameError::UnknownPlayer(id))?;
        if player.status().is_active() {
            Ok(index)
        } else {
            Err(GameError::InactivePlayer(id))
        }
    }

    // -------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------

    /// Run an economy operation on one player with the shared services.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] or
    /// [`GameError::InactivePlayer`] for a bad slot, and
    /// [`GameError::Economy`] if the operation fails.
    pub fn act<R>(
        &mut self,
        id: PlayerId,
        operation: impl FnOnce(&mut Player, &mut EconomyContext<'_>) -> Result<R, EconomyError>,
    ) -> Result<R, GameError> {
        let index = self.active_index(id)?;
        let gf = self.clock.gf();
        let player = self
            .players
            .get_mut(index)
            .ok_or(GameError::UnknownPlayer(id))?;
        let mut ctx = EconomyContext::new(&self.paths, gf, &mut self.rng, &mut self.ids);
        operation(player, &mut ctx).map_err(|source| GameError::Economy { player: id, source })
    }

    /// Execute one player command.
    ///
    /// Commands of defeated players are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownPlayer`] or
    /// [`GameError::InactivePlayer`] for a bad slot, and
    /// [`GameError::Economy`] if the command fails.
    pub fn execute(&mut self, id: PlayerId, command: GameCommand) -> Result<(), GameError> {
        let index = self.active_index(id)?;
        if self.players.get(index).is_some_and(Player::is_defeated) {
            debug!(player = %id, ?command, "command of a defeated player dropped");
            return Ok(());
        }
        let everyone: Vec<PlayerId> = self.active_players().map(Player::id).collect();
        let gf = self.clock.gf();
        debug!(player = %id, gf, ?command, "executing command");
        let goal = if let GameCommand::Trade {
            target, warehouse, ..
        } = command
        {
            self.trade_goal(target, warehouse)
        } else {
            None
        };
        let mut caravans = Vec::new();
        self.act(id, |player, ctx| match command {
            GameCommand::ChangeMilitary { values } => player.change_military_settings(ctx, values),
            GameCommand::ChangeTools {
                priorities,
                order_changes,
            } => {
                player.change_tool_settings(priorities, order_changes);
                Ok(())
            }
            GameCommand::ChangeDistribution { settings } => {
                player.change_distribution(&settings);
                Ok(())
            }
            GameCommand::ChangeBuildOrder { order_type, order } => {
                player.change_build_order(order_type, order)
            }
            GameCommand::ChangeTransportOrder { order } => player.convert_transport_data(&order),
            GameCommand::SuggestPact {
                target,
                pact,
                duration,
            } => player.suggest_pact(gf, target, pact, duration),
            GameCommand::AcceptPact {
                proposal_id,
                pact,
                proposer,
            } => player.accept_pact(gf, proposal_id, pact, proposer),
            GameCommand::CancelPact { pact, other } => player.cancel_pact(gf, pact, other),
            GameCommand::NotifyAllies { at } => {
                player.notify_allies_of_location(gf, at, &everyone);
                Ok(())
            }
            GameCommand::Trade { goods, count, .. } => {
                match goal {
                    Some(goal) => caravans = player.trade(ctx.paths, gf, goal, goods, count)?,
                    None => debug!(player = %id, "trade goal gone, command dropped"),
                }
                Ok(())
            }
            GameCommand::Surrender => {
                player.surrender(gf);
                Ok(())
            }
        })?;
        self.deliver_caravans(&caravans);
        Ok(())
    }

    /// The warehouse a trade command is addressed to, if it still exists.
    fn trade_goal(&self, target: PlayerId, warehouse: ObjectId) -> Option<TradeGoal> {
        let index = self.active_index(target).ok()?;
        let wh = self.players.get(index)?.warehouse(warehouse)?;
        Some(TradeGoal {
            owner: target,
            warehouse,
            pos: wh.pos,
        })
    }

    /// Hand caravans to their receivers. Caravans arrive in the frame they
    /// are sent.
    fn deliver_caravans(&mut self, caravans: &[TradeCaravan]) {
        for caravan in caravans {
            let Ok(index) = self.active_index(caravan.goal.owner) else {
                warn!(to = %caravan.goal.owner, "trade caravan for an inactive slot lost");
                continue;
            };
            if let Some(receiver) = self.players.get_mut(index) {
                receiver.trade_arrived(caravan);
            }
        }
    }

    // -------------------------------------------------------------------
    // Frame
    // -------------------------------------------------------------------

    /// Run one frame and move the clock on.
    ///
    /// # Errors
    ///
    /// Any command or economy failure aborts the frame and the clock does
    /// not advance. Whatever ran before the failure stays applied, so the
    /// game no longer matches the other clients and must be discarded.
    pub fn advance_frame(
        &mut self,
        commands: Vec<(PlayerId, GameCommand)>,
    ) -> Result<FrameSummary, GameError> {
        let gf = self.clock.gf();

        for (player, command) in commands {
            self.execute(player, command)?;
        }
        self.route_diplomacy()?;

        if self.clock.is_pact_frame() {
            for player in self.players.iter_mut().filter(|p| p.status().is_active()) {
                player.test_pacts(gf);
            }
            self.route_diplomacy()?;
        }

        if self.clock.is_emergency_frame() {
            for player in self.players.iter_mut().filter(|p| p.status().is_active()) {
                let id = player.id();
                let mut ctx = EconomyContext::new(&self.paths, gf, &mut self.rng, &mut self.ids);
                player
                    .test_for_emergency_program(&mut ctx)
                    .map_err(|source| GameError::Economy { player: id, source })?;
            }
        }

        let statistic_step = self.clock.is_statistic_frame();
        if statistic_step {
            for player in self.players.iter_mut().filter(|p| p.status().is_active()) {
                player.statistic_step();
            }
        }

        let mut summary = self.collect(gf);
        summary.statistic_step = statistic_step;
        self.clock.advance()?;
        Ok(summary)
    }

    /// Deliver diplomacy envelopes until every player is quiet.
    ///
    /// Senders are visited in slot order and each envelope is handled by
    /// its receiver immediately, so replies join the next round.
    fn route_diplomacy(&mut self) -> Result<(), GameError> {
        let gf = self.clock.gf();
        for _ in 0..MAX_ROUTING_ROUNDS {
            let mut delivered = false;
            for sender in 0..self.players.len() {
                let envelopes = match self.players.get_mut(sender) {
                    Some(player) => player.take_envelopes(),
                    None => continue,
                };
                for envelope in envelopes {
                    let to = envelope.to;
                    let Ok(index) = self.active_index(to) else {
                        debug!(from = %envelope.from, %to, "diplomacy for an inactive slot dropped");
                        continue;
                    };
                    let Some(receiver) = self.players.get_mut(index) else {
                        continue;
                    };
                    receiver
                        .receive_diplomacy(gf, envelope)
                        .map_err(|source| GameError::Economy { player: to, source })?;
                    delivered = true;
                }
            }
            if !delivered {
                return Ok(());
            }
        }
        warn!(gf, "diplomacy did not settle");
        Err(GameError::DiplomacyNotSettled {
            rounds: MAX_ROUTING_ROUNDS,
        })
    }

    fn collect(&mut self, gf: u32) -> FrameSummary {
        let mut summary = FrameSummary {
            gf,
            ..FrameSummary::default()
        };
        for player in &mut self.players {
            let id = player.id();
            let outbox = player.drain_outbox();
            if !outbox.envelopes.is_empty() {
                warn!(player = %id, count = outbox.envelopes.len(), "undelivered diplomacy dropped");
            }
            if outbox.events.contains(&EconomyEvent::Defeated) {
                summary.defeated.push(id);
            }
            summary.events.extend(
                outbox
                    .events
                    .into_iter()
                    .map(|event| FrameEvent { player: id, event }),
            );
            summary.posts.extend(outbox.posts);
        }
        summary
    }

    // -------------------------------------------------------------------
    // Save game
    // -------------------------------------------------------------------

    /// Write the whole game state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Stream`] if a player record cannot be written.
    pub fn save(&self) -> Result<GameData, GameError> {
        let mut out = GameData::new();
        out.push_u32(self.clock.gf());
        self.rng.persist(&mut out)?;
        out.push_u32(self.ids.peek());
        let count = u8::try_from(self.players.len()).map_err(|_err| StreamError::TooLong {
            len: self.players.len(),
        })?;
        out.push_u8(count);
        for player in &self.players {
            player.persist(&mut out)?;
        }
        debug!(gf = self.clock.gf(), bytes = out.as_bytes().len(), "game saved");
        Ok(out)
    }

    /// Resume a game written by [`Game::save`].
    ///
    /// Rules and intervals come from `config`, which must describe the
    /// same number of slots.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Stream`] for malformed data,
    /// [`GameError::PlayerCountMismatch`] or [`GameError::TrailingData`].
    pub fn load(config: &GameConfig, paths: P, mut data: GameData) -> Result<Self, GameError> {
        config.validate()?;
        let gf = data.pop_u32()?;
        let rng = SyncedRandom::restore(&mut data)?;
        let ids = ObjectCounter::starting_at(data.pop_u32()?);
        let saved = usize::from(data.pop_u8()?);
        if saved != config.players.len() {
            return Err(GameError::PlayerCountMismatch {
                configured: config.players.len(),
                saved,
            });
        }
        let mut players = Vec::with_capacity(saved);
        for raw in (0_u8..).take(saved) {
            let mut player = Player::restore(PlayerId::new(raw), &mut data)?;
            player.set_catapult_limit(config.rules.catapult_limit());
            players.push(player);
        }
        if !data.is_exhausted() {
            return Err(GameError::TrailingData {
                remaining: data.remaining(),
            });
        }
        info!(game = %config.game.name, gf, "game loaded");
        Ok(Self {
            name: config.game.name.clone(),
            paths,
            clock: GameClock::from_parts(gf, &config.timing)?,
            rng,
            ids,
            players,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_economy::Warehouse;
    use hamlet_types::{PlayerStatus, RoadId, Team, WareType};
    use hamlet_world::{RoadGraph, RoadSegment};

    use super::*;
    use crate::config::PlayerConfig;

    fn config(teams: &[Team]) -> GameConfig {
        let mut config = GameConfig::default();
        config.players = teams
            .iter()
            .map(|team| PlayerConfig {
                name: String::new(),
                status: PlayerStatus::Occupied,
                team: *team,
            })
            .collect();
        config
    }

    #[test]
    fn team_mates_are_allied_from_the_start() {
        let game = Game::new(&config(&[Team::Team1, Team::Random, Team::Team2]), RoadGraph::new())
            .unwrap();
        let first = game.player(PlayerId::new(0)).unwrap();
        assert!(first.is_ally(PlayerId::new(1), 0));
        assert!(!first.is_ally(PlayerId::new(2), 0));
    }

    #[test]
    fn commands_for_free_slots_are_rejected() {
        let mut cfg = config(&[Team::NoTeam, Team::NoTeam]);
        cfg.players[1].status = PlayerStatus::Free;
        let mut game = Game::new(&cfg, RoadGraph::new()).unwrap();
        assert!(matches!(
            game.execute(PlayerId::new(1), GameCommand::Surrender),
            Err(GameError::InactivePlayer(_))
        ));
        assert!(matches!(
            game.execute(PlayerId::new(5), GameCommand::Surrender),
            Err(GameError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn invalid_settings_abort_the_frame_without_advancing() {
        let mut game = Game::new(&config(&[Team::NoTeam]), RoadGraph::new()).unwrap();
        let result = game.advance_frame(vec![(
            PlayerId::new(0),
            GameCommand::ChangeMilitary { values: [99; MILITARY_SETTINGS_COUNT] },
        )]);
        assert!(matches!(result, Err(GameError::Economy { .. })));
        assert_eq!(game.gf(), 0);
    }

    #[test]
    fn surrender_is_reported_once() {
        let mut game = Game::new(&config(&[Team::NoTeam]), RoadGraph::new()).unwrap();
        let summary = game
            .advance_frame(vec![
                (PlayerId::new(0), GameCommand::Surrender),
                (PlayerId::new(0), GameCommand::Surrender),
            ])
            .unwrap();
        assert_eq!(summary.defeated, vec![PlayerId::new(0)]);
        assert_eq!(game.gf(), 1);
    }

    #[test]
    fn failed_frame_keeps_earlier_commands_applied() {
        let mut game = Game::new(&config(&[Team::NoTeam, Team::NoTeam]), RoadGraph::new()).unwrap();
        let result = game.advance_frame(vec![
            (PlayerId::new(0), GameCommand::Surrender),
            (
                PlayerId::new(1),
                GameCommand::ChangeTransportOrder {
                    order: [0; TRANSPORT_GROUP_COUNT],
                },
            ),
        ]);
        assert!(matches!(
            result,
            Err(GameError::Economy {
                source: EconomyError::InvalidTransportOrder,
                ..
            })
        ));
        assert_eq!(game.gf(), 0);
        assert!(game.player(PlayerId::new(0)).unwrap().is_defeated());
    }

    /// Two allied players whose warehouses are joined by one road.
    fn trading_game() -> (Game<RoadGraph>, ObjectId, ObjectId) {
        let mut game = Game::new(&config(&[Team::Team1, Team::Team1]), RoadGraph::new()).unwrap();
        game.paths_mut()
            .add_road(
                RoadId::new(1),
                RoadSegment {
                    a: MapPoint::new(0, 0),
                    b: MapPoint::new(6, 0),
                    length: 6,
                    boat: false,
                },
            )
            .unwrap();
        let hq = game
            .act(PlayerId::new(0), |p, ctx| {
                let mut wh = Warehouse::new(ctx.next_object()?, BuildingType::Headquarters, MapPoint::new(0, 0))?;
                wh.inventory.add_ware(WareType::Boards, 10);
                let id = wh.id;
                p.add_warehouse(wh)?;
                p.increase_inventory_ware(WareType::Boards, 10);
                Ok(id)
            })
            .unwrap();
        let store = game
            .act(PlayerId::new(1), |p, ctx| {
                let wh = Warehouse::new(ctx.next_object()?, BuildingType::Storehouse, MapPoint::new(6, 0))?;
                let id = wh.id;
                p.add_warehouse(wh)?;
                Ok(id)
            })
            .unwrap();
        (game, hq, store)
    }

    #[test]
    fn trade_caravans_reach_the_ally_in_the_same_frame() {
        let (mut game, hq, store) = trading_game();
        let summary = game
            .advance_frame(vec![(
                PlayerId::new(0),
                GameCommand::Trade {
                    target: PlayerId::new(1),
                    warehouse: store,
                    goods: TradeGoods::Ware(WareType::Boards),
                    count: 4,
                },
            )])
            .unwrap();

        let sender = game.player(PlayerId::new(0)).unwrap();
        assert_eq!(sender.warehouse(hq).unwrap().inventory.ware(WareType::Boards), 6);
        assert_eq!(sender.global_inventory().ware(WareType::Boards), 6);
        let receiver = game.player(PlayerId::new(1)).unwrap();
        assert_eq!(receiver.warehouse(store).unwrap().inventory.ware(WareType::Boards), 4);
        assert_eq!(receiver.global_inventory().ware(WareType::Boards), 4);

        assert!(summary.events.iter().any(|e| e.player == PlayerId::new(0)
            && matches!(e.event, EconomyEvent::TradeCaravanSent { count: 4, .. })));
        assert!(summary.events.iter().any(|e| e.player == PlayerId::new(1)
            && matches!(e.event, EconomyEvent::TradeCaravanArrived { count: 4, .. })));
    }

    #[test]
    fn trade_to_a_missing_warehouse_is_dropped() {
        let (mut game, hq, _) = trading_game();
        game.advance_frame(vec![(
            PlayerId::new(0),
            GameCommand::Trade {
                target: PlayerId::new(1),
                warehouse: ObjectId::new(999),
                goods: TradeGoods::Ware(WareType::Boards),
                count: 4,
            },
        )])
        .unwrap();
        let sender = game.player(PlayerId::new(0)).unwrap();
        assert_eq!(sender.warehouse(hq).unwrap().inventory.ware(WareType::Boards), 10);
    }
}
