//! Error types for the `hamlet-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type.

use hamlet_types::{MapPoint, RoadId};

/// Errors that can occur while editing the road graph.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    /// A road was not found in the graph.
    #[error("road not found: {0}")]
    RoadNotFound(RoadId),

    /// A duplicate road was inserted where uniqueness is required.
    #[error("duplicate road id: {0}")]
    DuplicateRoad(RoadId),

    /// A road must connect two different flags.
    #[error("road {road} starts and ends at {at}")]
    DegenerateRoad {
        /// The rejected road.
        road: RoadId,
        /// The single endpoint.
        at: MapPoint,
    },

    /// A road is shorter than the straight-line distance between its flags.
    ///
    /// The distance estimate must stay a lower bound on real path length,
    /// otherwise every branch-and-bound search built on it prunes wrongly.
    #[error("road {road} has length {length} below the distance estimate {estimate}")]
    ShorterThanEstimate {
        /// The rejected road.
        road: RoadId,
        /// Declared length.
        length: u32,
        /// Straight-line lower bound.
        estimate: u32,
    },
}
