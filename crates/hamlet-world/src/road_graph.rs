//! Road graph: flags as nodes, roads and sea lanes as weighted edges.
//!
//! The [`RoadGraph`] is the reference implementation of [`PathQueryPort`].
//! Roads are undirected. Sea lanes form a separate graph used only by ship
//! routing. Both are keyed by `BTreeMap`, so every search explores
//! neighbours in the same order on every client.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hamlet_types::{MapPoint, RoadId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;
use crate::path::{PathQueryPort, ShipRoute};

/// A road segment between two flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadSegment {
    /// First flag.
    pub a: MapPoint,
    /// Second flag.
    pub b: MapPoint,
    /// Walking length.
    pub length: u32,
    /// Water road that needs a boat.
    pub boat: bool,
}

impl RoadSegment {
    /// Return the flag at the other end, if `from` is one of the ends.
    pub fn other_end(&self, from: MapPoint) -> Option<MapPoint> {
        if from == self.a {
            Some(self.b)
        } else if from == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Which edges a search may use.
#[derive(Debug, Clone, Copy)]
struct EdgeFilter {
    /// Allow boat roads.
    use_boat: bool,
    /// Road to ignore.
    forbidden: Option<RoadId>,
}

/// The road and sea network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadGraph {
    /// All roads indexed by identifier.
    roads: BTreeMap<RoadId, RoadSegment>,
    /// Flag -> roads touching it.
    adjacency: BTreeMap<MapPoint, Vec<RoadId>>,
    /// Coastal point -> (neighbour, lane length).
    sea_lanes: BTreeMap<MapPoint, Vec<(MapPoint, u32)>>,
}

impl RoadGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            roads: BTreeMap::new(),
            adjacency: BTreeMap::new(),
            sea_lanes: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------

    /// Add a road.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateRoad`] if the id is taken,
    /// [`WorldError::DegenerateRoad`] for a loop, and
    /// [`WorldError::ShorterThanEstimate`] if `length` undercuts the
    /// straight-line estimate.
    pub fn add_road(&mut self, id: RoadId, road: RoadSegment) -> Result<(), WorldError> {
        if self.roads.contains_key(&id) {
            return Err(WorldError::DuplicateRoad(id));
        }
        if road.a == road.b {
            return Err(WorldError::DegenerateRoad { road: id, at: road.a });
        }
        let estimate = road.a.chebyshev(road.b);
        if road.length < estimate {
            return Err(WorldError::ShorterThanEstimate {
                road: id,
                length: road.length,
                estimate,
            });
        }

        self.adjacency.entry(road.a).or_default().push(id);
        self.adjacency.entry(road.b).or_default().push(id);
        self.roads.insert(id, road);
        debug!(road = %id, a = %road.a, b = %road.b, length = road.length, "road added");
        Ok(())
    }

    /// Remove a road and return it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RoadNotFound`] if the id is unknown.
    pub fn remove_road(&mut self, id: RoadId) -> Result<RoadSegment, WorldError> {
        let road = self.roads.remove(&id).ok_or(WorldError::RoadNotFound(id))?;
        for end in [road.a, road.b] {
            if let Some(list) = self.adjacency.get_mut(&end) {
                list.retain(|r| *r != id);
                if list.is_empty() {
                    self.adjacency.remove(&end);
                }
            }
        }
        debug!(road = %id, "road removed");
        Ok(road)
    }

    /// Add a two-way sea lane between coastal points.
    pub fn add_sea_lane(&mut self, a: MapPoint, b: MapPoint, length: u32) {
        self.sea_lanes.entry(a).or_default().push((b, length));
        self.sea_lanes.entry(b).or_default().push((a, length));
    }

    /// Look up a road.
    pub fn road(&self, id: RoadId) -> Option<&RoadSegment> {
        self.roads.get(&id)
    }

    /// Number of roads.
    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    /// Iterate roads in id order.
    pub fn roads(&self) -> impl Iterator<Item = (&RoadId, &RoadSegment)> {
        self.roads.iter()
    }

    // -------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------

    /// Road neighbours of a flag under a filter.
    fn road_neighbors(&self, at: MapPoint, filter: EdgeFilter) -> Vec<(MapPoint, u32)> {
        let Some(ids) = self.adjacency.get(&at) else {
            return Vec::new();
        };
        ids.iter()
            .filter(|id| filter.forbidden != Some(**id))
            .filter_map(|id| self.roads.get(id))
            .filter(|road| filter.use_boat || !road.boat)
            .filter_map(|road| road.other_end(at).map(|next| (next, road.length)))
            .collect()
    }

    /// Sea neighbours of a coastal point.
    fn sea_neighbors(&self, at: MapPoint) -> Vec<(MapPoint, u32)> {
        self.sea_lanes.get(&at).cloned().unwrap_or_default()
    }

    /// Dijkstra with a length cap.
    ///
    /// Uses a `BTreeSet` as the priority queue keyed on `(distance, point)`,
    /// which also makes equal-distance expansion order deterministic.
    fn shortest<F>(
        start: MapPoint,
        goal: MapPoint,
        max_len: u32,
        neighbors: F,
    ) -> Option<(u32, Vec<MapPoint>)>
    where
        F: Fn(MapPoint) -> Vec<(MapPoint, u32)>,
    {
        if start == goal {
            return Some((0, vec![start]));
        }

        let mut dist: BTreeMap<MapPoint, u32> = BTreeMap::new();
        let mut prev: BTreeMap<MapPoint, MapPoint> = BTreeMap::new();
        let mut queue: BTreeSet<(u32, MapPoint)> = BTreeSet::new();

        dist.insert(start, 0);
        queue.insert((0, start));

        while let Some((current_dist, current)) = queue.pop_first() {
            if current == goal {
                break;
            }

            for (neighbor, cost) in neighbors(current) {
                let Some(new_dist) = current_dist.checked_add(cost) else {
                    continue;
                };
                if new_dist > max_len {
                    continue;
                }

                let is_shorter = dist
                    .get(&neighbor)
                    .is_none_or(|&existing| new_dist < existing);

                if is_shorter {
                    if let Some(&old_dist) = dist.get(&neighbor) {
                        queue.remove(&(old_dist, neighbor));
                    }
                    dist.insert(neighbor, new_dist);
                    prev.insert(neighbor, current);
                    queue.insert((new_dist, neighbor));
                }
            }
        }

        let length = *dist.get(&goal)?;

        let mut path = VecDeque::new();
        let mut current = goal;
        path.push_front(current);
        while let Some(&predecessor) = prev.get(&current) {
            path.push_front(predecessor);
            current = predecessor;
            if current == start {
                break;
            }
        }

        Some((length, path.into_iter().collect()))
    }

    /// Shortest road path under a filter.
    fn road_path(
        &self,
        from: MapPoint,
        to: MapPoint,
        max_len: u32,
        filter: EdgeFilter,
    ) -> Option<u32> {
        Self::shortest(from, to, max_len, |at| self.road_neighbors(at, filter)).map(|(len, _)| len)
    }
}

impl PathQueryPort for RoadGraph {
    fn path_exists(
        &self,
        from: MapPoint,
        to: MapPoint,
        use_boat: bool,
        forbidden: Option<RoadId>,
    ) -> bool {
        self.road_path(from, to, u32::MAX, EdgeFilter { use_boat, forbidden })
            .is_some()
    }

    fn find_path(
        &self,
        from: MapPoint,
        to: MapPoint,
        use_boat: bool,
        max_len: u32,
        forbidden: Option<RoadId>,
    ) -> Option<u32> {
        self.road_path(from, to, max_len, EdgeFilter { use_boat, forbidden })
    }

    fn find_path_budgeted(&self, from: MapPoint, to: MapPoint, budget: u32) -> Option<u32> {
        // Wares travel on boat roads as well.
        self.road_path(
            from,
            to,
            budget,
            EdgeFilter {
                use_boat: true,
                forbidden: None,
            },
        )
    }

    fn find_ship_path(&self, from: MapPoint, to: MapPoint) -> Option<ShipRoute> {
        Self::shortest(from, to, u32::MAX, |at| self.sea_neighbors(at))
            .map(|(distance, waypoints)| ShipRoute { waypoints, distance })
    }

    fn distance_estimate(&self, a: MapPoint, b: MapPoint) -> u32 {
        a.chebyshev(b)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: u16, y: u16) -> MapPoint {
        MapPoint::new(x, y)
    }

    fn road(a: MapPoint, b: MapPoint, length: u32) -> RoadSegment {
        RoadSegment {
            a,
            b,
            length,
            boat: false,
        }
    }

    /// A square `(0,0) - (4,0) - (4,4) - (0,4)` plus a long diagonal road.
    fn make_square() -> RoadGraph {
        let mut graph = RoadGraph::new();
        graph.add_road(RoadId::new(1), road(p(0, 0), p(4, 0), 4)).unwrap();
        graph.add_road(RoadId::new(2), road(p(4, 0), p(4, 4), 4)).unwrap();
        graph.add_road(RoadId::new(3), road(p(4, 4), p(0, 4), 4)).unwrap();
        graph.add_road(RoadId::new(4), road(p(0, 4), p(0, 0), 4)).unwrap();
        graph.add_road(RoadId::new(5), road(p(0, 0), p(4, 4), 10)).unwrap();
        graph
    }

    #[test]
    fn shortest_path_prefers_cheaper_detour() {
        let graph = make_square();
        assert_eq!(graph.find_path(p(0, 0), p(4, 4), false, u32::MAX, None), Some(8));
    }

    #[test]
    fn same_point_has_zero_length() {
        let graph = make_square();
        assert_eq!(graph.find_path(p(4, 0), p(4, 0), false, 0, None), Some(0));
    }

    #[test]
    fn max_length_caps_the_search() {
        let graph = make_square();
        assert_eq!(graph.find_path(p(0, 0), p(4, 4), false, 7, None), None);
        assert_eq!(graph.find_path_budgeted(p(0, 0), p(4, 4), 8), Some(8));
    }

    #[test]
    fn forbidden_road_is_avoided() {
        let graph = make_square();
        let len = graph.find_path(p(0, 0), p(4, 0), false, u32::MAX, Some(RoadId::new(1)));
        assert_eq!(len, Some(12));
    }

    #[test]
    fn boat_roads_need_a_boat() {
        let mut graph = RoadGraph::new();
        let mut water = road(p(0, 0), p(3, 0), 3);
        water.boat = true;
        graph.add_road(RoadId::new(1), water).unwrap();
        assert!(!graph.path_exists(p(0, 0), p(3, 0), false, None));
        assert!(graph.path_exists(p(0, 0), p(3, 0), true, None));
    }

    #[test]
    fn road_shorter_than_estimate_rejected() {
        let mut graph = RoadGraph::new();
        let result = graph.add_road(RoadId::new(1), road(p(0, 0), p(5, 5), 3));
        assert!(matches!(result, Err(WorldError::ShorterThanEstimate { .. })));
    }

    #[test]
    fn duplicate_and_missing_roads() {
        let mut graph = make_square();
        assert_eq!(
            graph.add_road(RoadId::new(1), road(p(9, 9), p(9, 8), 1)),
            Err(WorldError::DuplicateRoad(RoadId::new(1)))
        );
        assert!(graph.remove_road(RoadId::new(5)).is_ok());
        assert_eq!(
            graph.remove_road(RoadId::new(5)),
            Err(WorldError::RoadNotFound(RoadId::new(5)))
        );
        assert_eq!(graph.road_count(), 4);
    }

    #[test]
    fn ship_path_follows_sea_lanes() {
        let mut graph = RoadGraph::new();
        graph.add_sea_lane(p(0, 0), p(10, 0), 10);
        graph.add_sea_lane(p(10, 0), p(10, 10), 10);
        let route = graph.find_ship_path(p(0, 0), p(10, 10)).unwrap();
        assert_eq!(route.distance, 20);
        assert_eq!(route.waypoints, vec![p(0, 0), p(10, 0), p(10, 10)]);
        assert!(graph.find_ship_path(p(0, 0), p(50, 50)).is_none());
    }

    #[test]
    fn estimate_never_exceeds_real_length() {
        let graph = make_square();
        let real = graph.find_path(p(0, 0), p(4, 4), false, u32::MAX, None).unwrap();
        assert!(graph.distance_estimate(p(0, 0), p(4, 4)) <= real);
    }
}
