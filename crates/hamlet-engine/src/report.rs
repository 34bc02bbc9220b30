//! The JSON run summary printed when the engine stops.

use std::collections::BTreeMap;

use hamlet_core::{FrameSummary, Game, GameConfig};
use hamlet_economy::Player;
use hamlet_types::{BuildingType, PlayerId, StatisticType, WareType};
use hamlet_world::RoadGraph;
use serde::Serialize;

/// Final state of one player.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    /// Slot.
    pub player: PlayerId,
    /// Display name from the configuration.
    pub name: String,
    /// Whether the player lost.
    pub defeated: bool,
    /// Whether the emergency program is running.
    pub emergency: bool,
    /// Warehouses, harbors included.
    pub warehouses: usize,
    /// Finished production buildings.
    pub production_buildings: u32,
    /// Sites still under construction.
    pub building_sites: usize,
    /// Finished military buildings.
    pub military_buildings: usize,
    /// Wares outside warehouses.
    pub wares_in_transit: usize,
    /// Boards in stock.
    pub stored_boards: u32,
    /// Stones in stock.
    pub stored_stones: u32,
    /// Current merchandise statistic.
    pub merchandise: u32,
    /// Current inhabitants statistic.
    pub inhabitants: u32,
    /// Allied players at the end of the run.
    pub allies: Vec<PlayerId>,
}

/// Summary of a whole engine run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Game name.
    pub game: String,
    /// Frames executed.
    pub frames: u32,
    /// Statistic steps taken.
    pub statistic_steps: u32,
    /// Post messages delivered.
    pub posts: u32,
    /// Economy events by kind.
    pub events: BTreeMap<String, u32>,
    /// Players defeated during the run, in order.
    pub defeated: Vec<PlayerId>,
    /// Size of a save game of the final state.
    pub save_bytes: usize,
    /// Per-player final state.
    pub players: Vec<PlayerReport>,
}

impl RunReport {
    /// An empty report for `config`'s game.
    pub fn new(config: &GameConfig) -> Self {
        Self {
            game: config.game.name.clone(),
            ..Self::default()
        }
    }

    /// Fold one frame into the report.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if an event cannot be encoded.
    pub fn record(&mut self, summary: &FrameSummary) -> Result<(), serde_json::Error> {
        self.frames = self.frames.saturating_add(1);
        if summary.statistic_step {
            self.statistic_steps = self.statistic_steps.saturating_add(1);
        }
        let posts = u32::try_from(summary.posts.len()).unwrap_or(u32::MAX);
        self.posts = self.posts.saturating_add(posts);
        for frame_event in &summary.events {
            let value = serde_json::to_value(&frame_event.event)?;
            let kind = value
                .get("event")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown")
                .to_owned();
            let count = self.events.entry(kind).or_insert(0);
            *count = count.saturating_add(1);
        }
        self.defeated.extend(summary.defeated.iter().copied());
        Ok(())
    }

    /// Capture every player's final state.
    pub fn finish(&mut self, game: &Game<RoadGraph>, config: &GameConfig, save_bytes: usize) {
        let gf = game.gf();
        let everyone: Vec<PlayerId> = game.players().iter().map(Player::id).collect();
        self.save_bytes = save_bytes;
        self.players = game
            .players()
            .iter()
            .zip(&config.players)
            .filter(|(player, _)| player.status().is_active())
            .map(|(player, slot)| player_report(player, &slot.name, &everyone, gf))
            .collect();
    }
}

fn player_report(player: &Player, name: &str, everyone: &[PlayerId], gf: u32) -> PlayerReport {
    let count = player.building_count();
    let production_buildings = BuildingType::ALL
        .iter()
        .filter(|kind| kind.usual_list_index().is_some())
        .map(|kind| count.buildings_of(*kind))
        .fold(0_u32, u32::saturating_add);
    PlayerReport {
        player: player.id(),
        name: name.to_owned(),
        defeated: player.is_defeated(),
        emergency: player.is_emergency(),
        warehouses: player.warehouses().len(),
        production_buildings,
        building_sites: player.building_sites().len(),
        military_buildings: player.military_buildings().len(),
        wares_in_transit: player.wares().len(),
        stored_boards: player.stored_ware(WareType::Boards),
        stored_stones: player.stored_ware(WareType::Stones),
        merchandise: player.statistics().current(StatisticType::Merchandise),
        inhabitants: player.statistics().current(StatisticType::Inhabitants),
        allies: everyone
            .iter()
            .copied()
            .filter(|other| *other != player.id() && player.is_ally(*other, gf))
            .collect(),
    }
}
