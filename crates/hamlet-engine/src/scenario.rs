//! Demo settlements and the scripted world around them.
//!
//! Every active player gets a stocked headquarters, a woodcutter and a
//! sawmill site and a barracks, all joined to the headquarters by roads.
//! Between frames the [`Director`] plays the part of the world the economy
//! does not model: carriers hand over one ware per player at a time,
//! finished sites turn into production buildings that produce, and every
//! pact proposal is accepted.

use hamlet_core::{FrameSummary, Game, GameCommand};
use hamlet_economy::{
    BuildingSite, EconomyContext, EconomyError, MilitaryBuilding, Player, Road, UsualBuilding,
    Warehouse,
};
use hamlet_types::{
    BuildingType, Job, MapPoint, PactType, PlayerId, PostKind, RoadId, WareType,
};
use hamlet_world::{RoadGraph, RoadSegment};
use tracing::{debug, info};

use crate::error::EngineError;

/// Distance between two headquarters.
const SPACING: u16 = 30;

/// Length of every demo road.
const ROAD_LENGTH: u16 = 4;

/// Frames between two ware hand-overs.
const DELIVERY_INTERVAL_GF: u32 = 10;

/// Frames between two production cycles.
const PRODUCTION_INTERVAL_GF: u32 = 60;

/// Frame at which the first player offers an alliance.
const ALLIANCE_OFFER_GF: u32 = 20;

/// Duration of the offered alliance.
const ALLIANCE_DURATION: u32 = 600;

const START_WARES: [(WareType, u32); 5] = [
    (WareType::Boards, 12),
    (WareType::Stones, 14),
    (WareType::Axe, 1),
    (WareType::Saw, 1),
    (WareType::Coins, 2),
];

const START_FIGURES: [(Job, u32); 2] = [(Job::Helper, 8), (Job::Private, 4)];

/// What each finished production building makes.
const PRODUCTION: [(BuildingType, WareType); 2] = [
    (BuildingType::Woodcutter, WareType::Wood),
    (BuildingType::Sawmill, WareType::Boards),
];

/// Where a player's settlement lies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Owner.
    pub player: PlayerId,
    /// Headquarters flag.
    pub hq: MapPoint,
}

/// Place a settlement for every active player.
///
/// # Errors
///
/// Returns [`EngineError::Scenario`] if the map runs out of room, or any
/// error from building roads and registering buildings.
pub fn found_settlements(game: &mut Game<RoadGraph>) -> Result<Vec<Settlement>, EngineError> {
    let players: Vec<PlayerId> = game
        .players()
        .iter()
        .filter(|p| p.status().is_active())
        .map(Player::id)
        .collect();
    let mut settlements = Vec::with_capacity(players.len());
    for player in players {
        let x = u16::from(player.into_inner())
            .checked_mul(SPACING)
            .and_then(|x| x.checked_add(10))
            .ok_or_else(|| EngineError::Scenario {
                message: format!("no room for player {player}"),
            })?;
        let hq = MapPoint::new(x, 10);
        found_settlement(game, player, hq)?;
        info!(player = %player, x = hq.x, y = hq.y, "settlement founded");
        settlements.push(Settlement { player, hq });
    }
    Ok(settlements)
}

fn found_settlement(
    game: &mut Game<RoadGraph>,
    player: PlayerId,
    hq: MapPoint,
) -> Result<(), EngineError> {
    let woodcutter = offset(hq, ROAD_LENGTH, 0);
    let sawmill = offset(hq, 0, ROAD_LENGTH);
    let barracks = offset(hq, ROAD_LENGTH, ROAD_LENGTH);
    let first_road = u32::from(player.into_inner()).saturating_mul(3);
    let roads: Vec<Road> = [woodcutter, sawmill, barracks]
        .into_iter()
        .zip(1_u32..)
        .map(|(end, n)| Road::new(RoadId::new(first_road.saturating_add(n)), hq, end, false))
        .collect();
    for road in &roads {
        game.paths_mut().add_road(
            road.id,
            RoadSegment {
                a: road.a,
                b: road.b,
                length: u32::from(ROAD_LENGTH),
                boat: false,
            },
        )?;
    }

    game.act(player, |p, ctx| {
        let mut wh = Warehouse::new(ctx.next_object()?, BuildingType::Headquarters, hq)?;
        for (ware, count) in START_WARES {
            wh.inventory.add_ware(ware, count);
            p.increase_inventory_ware(ware, count);
        }
        for (job, count) in START_FIGURES {
            wh.inventory.add_figure(job, count);
            p.increase_inventory_job(job, count);
        }
        p.add_warehouse(wh)?;
        p.set_hq(hq);
        p.add_building_site(BuildingSite::new(
            ctx.next_object()?,
            BuildingType::Woodcutter,
            woodcutter,
            2,
            0,
        ))?;
        p.add_building_site(BuildingSite::new(
            ctx.next_object()?,
            BuildingType::Sawmill,
            sawmill,
            2,
            2,
        ))?;
        p.add_military_building(MilitaryBuilding::new(
            ctx.next_object()?,
            BuildingType::Barracks,
            barracks,
        ))?;
        for road in roads {
            p.new_road_connection(ctx, road)?;
        }
        Ok(())
    })?;
    Ok(())
}

fn offset(from: MapPoint, dx: u16, dy: u16) -> MapPoint {
    MapPoint::new(from.x.saturating_add(dx), from.y.saturating_add(dy))
}

/// Worker a finished building asks for.
const fn worker_for(kind: BuildingType) -> Option<Job> {
    match kind {
        BuildingType::Woodcutter => Some(Job::Woodcutter),
        BuildingType::Sawmill => Some(Job::Carpenter),
        _ => None,
    }
}

/// Drives the demo world between frames and answers diplomacy.
#[derive(Debug)]
pub struct Director {
    settlements: Vec<Settlement>,
    answers: Vec<(PlayerId, GameCommand)>,
}

impl Director {
    /// A director for the given settlements.
    pub const fn new(settlements: Vec<Settlement>) -> Self {
        Self {
            settlements,
            answers: Vec::new(),
        }
    }

    /// Commands for the frame about to run.
    pub fn commands(&mut self, gf: u32) -> Vec<(PlayerId, GameCommand)> {
        let mut commands = std::mem::take(&mut self.answers);
        if gf == ALLIANCE_OFFER_GF
            && let [first, second, ..] = self.settlements.as_slice()
        {
            commands.push((
                first.player,
                GameCommand::SuggestPact {
                    target: second.player,
                    pact: PactType::Alliance,
                    duration: ALLIANCE_DURATION,
                },
            ));
        }
        commands
    }

    /// Queue an acceptance for every proposal posted this frame.
    pub fn observe(&mut self, summary: &FrameSummary) {
        for post in &summary.posts {
            if let PostKind::PactProposed {
                from,
                pact,
                proposal_id,
                ..
            } = post.kind
            {
                debug!(player = %post.recipient, proposer = %from, ?pact, "accepting proposal");
                self.answers.push((
                    post.recipient,
                    GameCommand::AcceptPact {
                        proposal_id,
                        pact,
                        proposer: from,
                    },
                ));
            }
        }
    }

    /// Play the world's part before the next frame.
    ///
    /// # Errors
    ///
    /// Propagates any economy failure.
    pub fn between_frames(&self, game: &mut Game<RoadGraph>) -> Result<(), EngineError> {
        let gf = game.gf();
        if gf == 0 {
            return Ok(());
        }
        for settlement in &self.settlements {
            let player = settlement.player;
            if game.player(player).is_none_or(Player::is_defeated) {
                continue;
            }
            if gf.checked_rem(DELIVERY_INTERVAL_GF) == Some(0) {
                game.act(player, deliver_next)?;
                game.act(player, finish_sites)?;
            }
            if gf.checked_rem(PRODUCTION_INTERVAL_GF) == Some(0) {
                game.act(player, produce)?;
            }
        }
        Ok(())
    }
}

/// The oldest ware with a goal arrives there.
fn deliver_next(player: &mut Player, _ctx: &mut EconomyContext<'_>) -> Result<(), EconomyError> {
    let next = player
        .wares()
        .iter()
        .find(|ware| ware.goal.is_some())
        .map(|ware| ware.id);
    if let Some(id) = next {
        player.ware_delivered(id)?;
    }
    Ok(())
}

/// Sites with all material delivered become production buildings.
fn finish_sites(player: &mut Player, ctx: &mut EconomyContext<'_>) -> Result<(), EconomyError> {
    let done: Vec<BuildingSite> = player
        .building_sites()
        .iter()
        .filter(|site| {
            site.boards.delivered >= site.boards.needed
                && site.stones.delivered >= site.stones.needed
        })
        .cloned()
        .collect();
    for site in done {
        player.remove_building_site(site.id)?;
        player.add_usual_building(UsualBuilding::new(site.id, site.kind, site.pos))?;
        info!(player = %player.id(), building = %site.id, kind = ?site.kind, gf = ctx.gf, "building finished");
        if let Some(job) = worker_for(site.kind) {
            player.add_job_wanted(ctx.paths, job, site.id)?;
        }
    }
    Ok(())
}

/// Every finished production building makes one unit.
fn produce(player: &mut Player, ctx: &mut EconomyContext<'_>) -> Result<(), EconomyError> {
    let outputs: Vec<(WareType, MapPoint)> = PRODUCTION
        .iter()
        .flat_map(|(kind, ware)| {
            player
                .usual_buildings(*kind)
                .iter()
                .map(move |building| (*ware, building.pos))
        })
        .collect();
    for (ware, pos) in outputs {
        player.ware_produced(ctx, ware, pos)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_core::GameConfig;
    use hamlet_core::config::PlayerConfig;
    use hamlet_types::{PlayerStatus, Team};

    use super::*;

    fn game(players: usize) -> Game<RoadGraph> {
        let mut config = GameConfig::default();
        config.players = vec![
            PlayerConfig {
                name: String::new(),
                status: PlayerStatus::Occupied,
                team: Team::NoTeam,
            };
            players
        ];
        Game::new(&config, RoadGraph::new()).unwrap()
    }

    #[test]
    fn settlements_order_their_material() {
        let mut game = game(2);
        let settlements = found_settlements(&mut game).unwrap();
        assert_eq!(settlements.len(), 2);
        assert_eq!(settlements[1].hq, MapPoint::new(40, 10));
        let player = game.player(PlayerId::new(1)).unwrap();
        assert_eq!(player.building_sites().len(), 2);
        assert!(player.building_sites().iter().all(|site| site.boards.ordered == 2));
        assert_eq!(player.wares().len(), 6);
    }

    #[test]
    fn delivered_sites_become_buildings_and_produce() {
        let mut game = game(1);
        let director = Director::new(found_settlements(&mut game).unwrap());
        let mut frames = 0;
        while game.player(PlayerId::new(0)).unwrap().usual_buildings(BuildingType::Sawmill).is_empty() {
            director.between_frames(&mut game).unwrap();
            game.advance_frame(Vec::new()).unwrap();
            frames += 1;
            assert!(frames < 200, "sawmill was never finished");
        }
        let player = game.player(PlayerId::new(0)).unwrap();
        assert!(player.building_sites().is_empty());
        assert_eq!(player.usual_buildings(BuildingType::Woodcutter).len(), 1);
    }

    #[test]
    fn proposals_are_answered_next_frame() {
        let mut game = game(2);
        let mut director = Director::new(found_settlements(&mut game).unwrap());
        for _ in 0..=ALLIANCE_OFFER_GF.saturating_add(1) {
            director.between_frames(&mut game).unwrap();
            let commands = director.commands(game.gf());
            let summary = game.advance_frame(commands).unwrap();
            director.observe(&summary);
        }
        let gf = game.gf();
        assert!(game.player(PlayerId::new(0)).unwrap().is_ally(PlayerId::new(1), gf));
    }
}
