//! Per-player economy of a Hamlet game.
//!
//! A [`Player`] owns warehouses, roads, buildings, wares and ships and
//! decides where every ware, worker, soldier and ship goes. All decisions
//! are deterministic: collections keep insertion order, ties break on
//! object ids, and randomness comes only from the game's shared
//! generator handed in through an [`EconomyContext`].
//!
//! # Architecture
//!
//! - [`transport`] -- Carrier priority per ware type.
//! - [`warehouse`] / [`locator`] -- Warehouses, their capability
//!   conditions and the nearest-warehouse search.
//! - [`distribution`] / [`consumer`] -- Weighted goal cycling and the
//!   bounded search for the best consumer of a ware.
//! - [`ships`] -- Harbor and ship dispatch.
//! - [`jobs`] -- Workers, road staff, construction material and troops,
//!   re-resolved when the road network changes.
//! - [`pacts`] -- The player's side of diplomacy.
//! - [`emergency`] -- Material reservation when boards or stones run out.
//! - [`statistics`] -- Multi-resolution statistic history.
//! - [`trade`] -- Caravans of goods and people sent to allies.
//! - [`player`] -- The state store and its save format.
//!
//! Nothing here panics on bad input. "Not found" is an `Option`; broken
//! invariants are [`EconomyError`]s that the frame driver treats as fatal.

pub mod buildings;
pub mod consumer;
pub mod context;
pub mod distribution;
pub mod emergency;
pub mod error;
pub mod events;
pub mod inventory;
pub mod jobs;
pub mod locator;
pub mod pacts;
pub mod player;
pub mod roads;
pub mod settings;
pub mod ships;
pub mod statistics;
pub mod trade;
pub mod transport;
pub mod warehouse;
pub mod wares;

#[cfg(test)]
pub(crate) mod testing;

pub use buildings::{BuildingSite, Demand, FlagWorker, MaterialNeed, MilitaryBuilding, UsualBuilding};
pub use consumer::{ClientCandidate, ClientChoice, rank_candidates, select_client};
pub use context::EconomyContext;
pub use distribution::{Distribution, DistributionSettings, DistributionTable, GOAL_STEP};
pub use emergency::EMERGENCY_THRESHOLD;
pub use error::EconomyError;
pub use events::{EconomyEvent, Outbox, PlayerOutput};
pub use inventory::Inventory;
pub use locator::{WarehouseMatch, WarehouseQuery, find_warehouse};
pub use player::{BuildingCount, CatapultLimit, JobRequest, Player};
pub use roads::{Road, Staffing};
pub use settings::{BuildOrder, DefenderList, MilitarySettings, ToolSettings};
pub use ships::{Ship, ShipState, UnloadTarget};
pub use statistics::{StatisticTier, Statistics};
pub use trade::{TradeCaravan, TradeGoal, TradeGoods};
pub use transport::TransportPriorities;
pub use warehouse::{HarborState, InventorySetting, Warehouse, WarehouseCondition};
pub use wares::{Ware, WareLocation};
