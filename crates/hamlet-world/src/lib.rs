//! Road network, path queries and synchronized randomness for the Hamlet
//! economy.
//!
//! # Modules
//!
//! - [`path`] -- The [`PathQueryPort`] boundary the economy consumes.
//! - [`road_graph`] -- [`RoadGraph`], a Dijkstra-based implementation of
//!   the port over roads and sea lanes.
//! - [`random`] -- [`SyncedRandom`], the deterministic generator shared by
//!   all clients of a game.
//! - [`error`] -- Error types for road-graph edits.

pub mod error;
pub mod path;
pub mod random;
pub mod road_graph;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use path::{PathQueryPort, ShipRoute};
pub use random::SyncedRandom;
pub use road_graph::{RoadGraph, RoadSegment};
