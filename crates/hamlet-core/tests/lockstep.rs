//! Whole-game scenarios driven frame by frame.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use hamlet_core::config::PlayerConfig;
use hamlet_core::{Game, GameCommand, GameConfig};
use hamlet_economy::{BuildingSite, EconomyEvent, Road, UsualBuilding, Warehouse};
use hamlet_types::{
    BuildingType, MapPoint, ObjectId, PactState, PactType, PlayerId, PlayerStatus, PostKind,
    RoadId, Team, WareType,
};
use hamlet_world::{RoadGraph, RoadSegment};

const A: PlayerId = PlayerId(0);
const B: PlayerId = PlayerId(1);

fn two_player_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.timing.statistic_interval_gf = 10;
    config.timing.emergency_check_interval_gf = 5;
    config.players = ["Ada", "Bo"]
        .iter()
        .map(|name| PlayerConfig {
            name: (*name).to_owned(),
            status: PlayerStatus::Occupied,
            team: Team::NoTeam,
        })
        .collect();
    config
}

/// Give `player` a stocked headquarters at `hq` and a building site at
/// `site` joined to it by one road. Returns the site id.
fn found_settlement(
    game: &mut Game<RoadGraph>,
    player: PlayerId,
    hq: MapPoint,
    site: MapPoint,
    boards: u32,
) -> ObjectId {
    let road_id = RoadId::new(u32::from(player.into_inner()) + 1);
    let length = u32::from(hq.x.abs_diff(site.x).max(hq.y.abs_diff(site.y)));
    game.paths_mut()
        .add_road(
            road_id,
            RoadSegment {
                a: hq,
                b: site,
                length,
                boat: false,
            },
        )
        .unwrap();
    game.act(player, |p, ctx| {
        let mut wh = Warehouse::new(ctx.next_object()?, BuildingType::Headquarters, hq)?;
        wh.inventory.add_ware(WareType::Boards, boards);
        wh.inventory.add_ware(WareType::Stones, 20);
        p.add_warehouse(wh)?;
        p.set_hq(hq);
        p.increase_inventory_ware(WareType::Boards, boards);
        p.increase_inventory_ware(WareType::Stones, 20);
        let site_id = ctx.next_object()?;
        p.add_building_site(BuildingSite::new(site_id, BuildingType::Well, site, 2, 1))?;
        p.new_road_connection(ctx, Road::new(road_id, hq, site, false))?;
        Ok(site_id)
    })
    .unwrap()
}

#[test]
fn connected_site_receives_its_material() {
    let mut game = Game::new(&two_player_config(), RoadGraph::new()).unwrap();
    let site = found_settlement(&mut game, A, MapPoint::new(0, 0), MapPoint::new(4, 0), 20);

    let player = game.player(A).unwrap();
    let need = player.building_sites().iter().find(|s| s.id == site).unwrap();
    assert_eq!(need.boards.ordered, 2);
    assert_eq!(need.stones.ordered, 1);
    assert_eq!(player.wares().len(), 3);

    let summary = game.advance_frame(Vec::new()).unwrap();
    let routed = summary
        .events
        .iter()
        .filter(|e| e.player == A && matches!(e.event, EconomyEvent::WareRouted { .. }))
        .count();
    assert_eq!(routed, 3);
}

#[test]
fn alliance_is_negotiated_across_frames() {
    let mut game = Game::new(&two_player_config(), RoadGraph::new()).unwrap();
    let proposal = game
        .advance_frame(vec![(
            A,
            GameCommand::SuggestPact {
                target: B,
                pact: PactType::Alliance,
                duration: 40,
            },
        )])
        .unwrap();
    let proposal_id = proposal
        .posts
        .iter()
        .find_map(|post| match post.kind {
            PostKind::PactProposed { proposal_id, .. } if post.recipient == B => Some(proposal_id),
            _ => None,
        })
        .unwrap();

    let accepted = game
        .advance_frame(vec![(
            B,
            GameCommand::AcceptPact {
                proposal_id,
                pact: PactType::Alliance,
                proposer: A,
            },
        )])
        .unwrap();
    assert!(
        accepted
            .posts
            .iter()
            .any(|post| post.recipient == A && matches!(post.kind, PostKind::PactConcluded { .. }))
    );
    assert_eq!(
        game.player(A).unwrap().pact_state(PactType::Alliance, B, game.gf()),
        PactState::Accepted
    );
    assert!(game.player(B).unwrap().is_ally(A, game.gf()));

    let mut expired = false;
    for _ in 0..45 {
        let summary = game.advance_frame(Vec::new()).unwrap();
        expired |= summary
            .posts
            .iter()
            .any(|post| matches!(post.kind, PostKind::PactExpired { .. }));
    }
    assert!(expired);
    assert!(!game.player(A).unwrap().is_ally(B, game.gf()));
    assert!(!game.player(B).unwrap().is_ally(A, game.gf()));
}

#[test]
fn statistics_step_on_their_interval() {
    let mut game = Game::new(&two_player_config(), RoadGraph::new()).unwrap();
    let steps: Vec<u32> = (0..25)
        .map(|_| game.advance_frame(Vec::new()).unwrap())
        .filter(|summary| summary.statistic_step)
        .map(|summary| summary.gf)
        .collect();
    assert_eq!(steps, vec![10, 20]);
}

#[test]
fn material_shortage_starts_the_emergency_program() {
    let mut game = Game::new(&two_player_config(), RoadGraph::new()).unwrap();
    found_settlement(&mut game, A, MapPoint::new(0, 0), MapPoint::new(4, 0), 5);
    // Just as short on boards, but able to make more.
    found_settlement(&mut game, B, MapPoint::new(40, 0), MapPoint::new(44, 0), 5);
    game.act(B, |p, ctx| {
        for (kind, pos) in [
            (BuildingType::Woodcutter, MapPoint::new(40, 4)),
            (BuildingType::Sawmill, MapPoint::new(44, 4)),
        ] {
            p.add_usual_building(UsualBuilding::new(ctx.next_object()?, kind, pos))?;
        }
        Ok(())
    })
    .unwrap();

    let summary = game.advance_frame(Vec::new()).unwrap();
    assert!(
        summary
            .posts
            .iter()
            .any(|post| post.recipient == A && post.kind == PostKind::EmergencyStarted)
    );
    assert!(game.player(A).unwrap().is_emergency());
    assert!(game.player(B).unwrap().stored_ware(WareType::Boards) <= 10);
    assert!(!game.player(B).unwrap().is_emergency());
    assert!(
        !summary
            .posts
            .iter()
            .any(|post| post.recipient == B && post.kind == PostKind::EmergencyStarted)
    );
}

#[test]
fn restored_game_continues_identically() {
    let config = two_player_config();
    let mut original = Game::new(&config, RoadGraph::new()).unwrap();
    found_settlement(&mut original, A, MapPoint::new(0, 0), MapPoint::new(4, 0), 20);
    found_settlement(&mut original, B, MapPoint::new(40, 0), MapPoint::new(44, 2), 20);
    for _ in 0..7 {
        original.advance_frame(Vec::new()).unwrap();
    }

    let saved = original.save().unwrap();
    let mut restored = Game::load(&config, original.paths().clone(), saved).unwrap();
    assert_eq!(restored.gf(), original.gf());

    let script = |gf: u32| -> Vec<(PlayerId, GameCommand)> {
        match gf {
            8 => vec![(
                A,
                GameCommand::SuggestPact {
                    target: B,
                    pact: PactType::NonAggression,
                    duration: 30,
                },
            )],
            12 => vec![(
                B,
                GameCommand::ChangeMilitary {
                    values: [5, 3, 5, 3, 2, 4, 8, 8],
                },
            )],
            _ => Vec::new(),
        }
    };
    for _ in 0..15 {
        let a = original.advance_frame(script(original.gf())).unwrap();
        let b = restored.advance_frame(script(restored.gf())).unwrap();
        assert_eq!(a, b);
    }
    assert_eq!(
        original.save().unwrap().into_bytes(),
        restored.save().unwrap().into_bytes()
    );
}

#[test]
fn save_game_with_a_different_slot_count_is_rejected() {
    let config = two_player_config();
    let game = Game::new(&config, RoadGraph::new()).unwrap();
    let saved = game.save().unwrap();
    let single = GameConfig::default();
    assert!(matches!(
        Game::load(&single, RoadGraph::new(), saved),
        Err(hamlet_core::GameError::PlayerCountMismatch {
            configured: 1,
            saved: 2
        })
    ));
}
