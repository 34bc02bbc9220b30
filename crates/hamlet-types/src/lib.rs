//! Shared type definitions for the Hamlet economy.
//!
//! This crate is the single source of truth for identifiers, enumerations
//! and the binary save-game stream used across the Hamlet workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe integer handles and the object counter
//! - [`enums`] -- Wares, buildings, jobs, pacts, statistics, teams
//! - [`point`] -- Map coordinates
//! - [`post`] -- Post messages for a player's inbox
//! - [`stream`] -- Order-dependent binary push/pop stream

pub mod enums;
pub mod ids;
pub mod point;
pub mod post;
pub mod stream;

/// Maximum number of player slots in one game.
pub const MAX_PLAYERS: usize = 8;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BUILDING_TYPE_COUNT, BuildingType, FIRST_USUAL_BUILDING, JOB_TYPE_COUNT, Job,
    MERCHANDISE_CATEGORY_COUNT, PACT_TYPE_COUNT, PactState, PactType, PlayerStatus, SOLDIER_JOBS,
    STATISTIC_TIME_COUNT, STATISTIC_TYPE_COUNT, StatisticTime, StatisticType, TOOL_COUNT, TOOLS,
    Team, USUAL_BUILDING_LIST_COUNT, WARE_TYPE_COUNT, WareType,
};
pub use ids::{ObjectCounter, ObjectId, PlayerId, RoadId, SeaId, ShipId, WareId};
pub use point::MapPoint;
pub use post::{PostKind, PostMessage};
pub use stream::{GameData, Persist, StreamError};
