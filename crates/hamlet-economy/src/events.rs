//! Everything a player's economy reports back to the game driver.

use hamlet_ledger::Envelope;
use hamlet_types::{Job, MapPoint, ObjectId, PlayerId, PostMessage, RoadId, ShipId, WareId, WareType};
use serde::Serialize;

use crate::trade::TradeGoods;

/// A notable economy decision, surfaced for logging and the frame summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EconomyEvent {
    /// A carrier left a warehouse for a road.
    CarrierOrdered {
        /// The road.
        road: RoadId,
        /// Source warehouse.
        warehouse: ObjectId,
    },
    /// A pack donkey left a warehouse for a road.
    DonkeyOrdered {
        /// The road.
        road: RoadId,
        /// Source warehouse.
        warehouse: ObjectId,
    },
    /// A worker left a warehouse for a workplace.
    JobOrdered {
        /// The job.
        job: Job,
        /// The workplace.
        workplace: ObjectId,
        /// Source warehouse.
        warehouse: ObjectId,
        /// Whether a helper was recruited for it.
        recruited: bool,
    },
    /// A geologist or scout was sent to a flag.
    FlagWorkerOrdered {
        /// The worker.
        worker: ObjectId,
        /// The job.
        job: Job,
        /// Target flag.
        flag: MapPoint,
    },
    /// A flag worker's flag was destroyed.
    FlagWorkerLostWork {
        /// The worker.
        worker: ObjectId,
        /// Warehouse the worker returns to, if any.
        home: Option<ObjectId>,
    },
    /// A ware got a delivery goal.
    WareRouted {
        /// The ware.
        ware: WareId,
        /// Ware type.
        kind: WareType,
        /// The goal.
        goal: ObjectId,
    },
    /// A ware has no reachable goal.
    WareLost {
        /// The ware.
        ware: WareId,
    },
    /// A ware waiting in a warehouse was put back into stock.
    WareCancelled {
        /// The ware.
        ware: WareId,
        /// Warehouse that keeps it.
        warehouse: ObjectId,
    },
    /// Soldiers were sent to a military building.
    TroopsOrdered {
        /// The military building.
        goal: ObjectId,
        /// Source warehouse.
        warehouse: ObjectId,
        /// Number of soldiers.
        count: u32,
    },
    /// An idle ship was sent to a harbor.
    ShipDispatched {
        /// The ship.
        ship: ShipId,
        /// Target harbor.
        harbor: ObjectId,
        /// Route length.
        distance: u32,
    },
    /// A ship reached a harbor.
    ShipArrived {
        /// The ship.
        ship: ShipId,
        /// The harbor.
        harbor: ObjectId,
    },
    /// A trade caravan left for an ally's warehouse.
    TradeCaravanSent {
        /// Source warehouse.
        warehouse: ObjectId,
        /// Receiving player.
        to: PlayerId,
        /// Goal warehouse.
        goal: ObjectId,
        /// What is carried.
        goods: TradeGoods,
        /// How many.
        count: u32,
    },
    /// A trade caravan from an ally reached a warehouse.
    TradeCaravanArrived {
        /// The warehouse.
        warehouse: ObjectId,
        /// Sending player.
        from: PlayerId,
        /// What was carried.
        goods: TradeGoods,
        /// How many.
        count: u32,
    },
    /// Military buildings must recheck their frontier flags.
    MilitaryFlagsRecalculated,
    /// An alliance changed; visibility must be recomputed.
    AllianceChanged,
    /// A tool order was committed or adjusted.
    ToolOrderPlaced,
    /// A metalworks finished an ordered tool.
    ToolOrderCompleted,
    /// Tool priorities changed.
    ToolSettingsChanged,
    /// Emergency program switched on or off.
    EmergencyChanged {
        /// New state.
        active: bool,
    },
    /// The player is defeated.
    Defeated,
}

/// Transient per-player output, drained by the game driver every frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    /// Post messages; the recipient may be another player.
    pub posts: Vec<PostMessage>,
    /// Diplomacy messages for other players.
    pub envelopes: Vec<Envelope>,
    /// Economy decisions.
    pub events: Vec<EconomyEvent>,
}

impl Outbox {
    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.envelopes.is_empty() && self.events.is_empty()
    }
}

/// A player's drained output with its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOutput {
    /// The sending player.
    pub player: PlayerId,
    /// What was drained.
    pub outbox: Outbox,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_kind() {
        let event = EconomyEvent::WareRouted {
            ware: WareId::new(7),
            kind: WareType::Boards,
            goal: ObjectId::new(3),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "ware_routed");
        assert_eq!(value["goal"], 3);

        let value = serde_json::to_value(EconomyEvent::Defeated).unwrap();
        assert_eq!(value, serde_json::json!({ "event": "defeated" }));
    }

    #[test]
    fn empty_outbox() {
        let mut outbox = Outbox::default();
        assert!(outbox.is_empty());
        outbox.events.push(EconomyEvent::AllianceChanged);
        assert!(!outbox.is_empty());
    }
}
