//! The path-query boundary consumed by the economy.
//!
//! The economy never walks the road network itself. Every reachability or
//! distance question goes through [`PathQueryPort`], so the map subsystem
//! can be swapped for a test oracle without touching the routing logic.
//!
//! A negative answer (`false` / `None`) is an ordinary result: the target is
//! unreachable, farther than the allowed length, or the search ran out of
//! budget. Callers fall back to another strategy; nothing here is an error.

use hamlet_types::{MapPoint, RoadId};
use serde::{Deserialize, Serialize};

/// A route over water between two coastal points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipRoute {
    /// Points visited in order, both endpoints included.
    pub waypoints: Vec<MapPoint>,
    /// Total length of the route.
    pub distance: u32,
}

/// Synchronous path queries over the road and sea networks.
///
/// Implementations must be deterministic, and
/// [`PathQueryPort::distance_estimate`] must never exceed the length of a
/// real path between the same points.
pub trait PathQueryPort {
    /// Whether any road path connects `from` and `to`.
    ///
    /// Boat roads are only usable when `use_boat` is set. `forbidden`
    /// excludes one road, e.g. the road that is being torn down.
    fn path_exists(
        &self,
        from: MapPoint,
        to: MapPoint,
        use_boat: bool,
        forbidden: Option<RoadId>,
    ) -> bool;

    /// Length of the shortest road path, if one exists that is no longer
    /// than `max_len`.
    fn find_path(
        &self,
        from: MapPoint,
        to: MapPoint,
        use_boat: bool,
        max_len: u32,
        forbidden: Option<RoadId>,
    ) -> Option<u32>;

    /// Length of the shortest ware path, giving up after `budget` steps of
    /// path length.
    fn find_path_budgeted(&self, from: MapPoint, to: MapPoint, budget: u32) -> Option<u32>;

    /// Shortest sea route between two coastal points.
    fn find_ship_path(&self, from: MapPoint, to: MapPoint) -> Option<ShipRoute>;

    /// Admissible straight-line lower bound on the path length.
    fn distance_estimate(&self, a: MapPoint, b: MapPoint) -> u32;
}
