//! Table-driven path oracle for unit tests.

use std::cell::Cell;
use std::collections::BTreeMap;

use hamlet_types::{MapPoint, RoadId};
use hamlet_world::{PathQueryPort, ShipRoute};

/// Answers path queries from a fixed table of directed lengths.
///
/// The estimate is the Chebyshev distance, so every table entry must be at
/// least that long.
#[derive(Debug, Default)]
pub struct TableOracle {
    roads: BTreeMap<(MapPoint, MapPoint), u32>,
    sea: BTreeMap<(MapPoint, MapPoint), u32>,
    queries: Cell<u32>,
}

impl TableOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Road path usable in both directions.
    pub fn with_path(self, a: MapPoint, b: MapPoint, length: u32) -> Self {
        self.with_one_way(a, b, length).with_one_way(b, a, length)
    }

    pub fn with_one_way(mut self, from: MapPoint, to: MapPoint, length: u32) -> Self {
        self.roads.insert((from, to), length);
        self
    }

    /// Sea route usable in both directions.
    pub fn with_sea(mut self, a: MapPoint, b: MapPoint, length: u32) -> Self {
        self.sea.insert((a, b), length);
        self.sea.insert((b, a), length);
        self
    }

    /// Number of `find_path` calls so far.
    pub fn path_queries(&self) -> u32 {
        self.queries.get()
    }

    fn road(&self, from: MapPoint, to: MapPoint) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        self.roads.get(&(from, to)).copied()
    }
}

impl PathQueryPort for TableOracle {
    fn path_exists(&self, from: MapPoint, to: MapPoint, _: bool, _: Option<RoadId>) -> bool {
        self.road(from, to).is_some()
    }

    fn find_path(
        &self,
        from: MapPoint,
        to: MapPoint,
        _: bool,
        max_len: u32,
        _: Option<RoadId>,
    ) -> Option<u32> {
        self.queries.set(self.queries.get().saturating_add(1));
        self.road(from, to).filter(|len| *len <= max_len)
    }

    fn find_path_budgeted(&self, from: MapPoint, to: MapPoint, budget: u32) -> Option<u32> {
        self.road(from, to).filter(|len| *len <= budget)
    }

    fn find_ship_path(&self, from: MapPoint, to: MapPoint) -> Option<ShipRoute> {
        let distance = if from == to {
            0
        } else {
            *self.sea.get(&(from, to))?
        };
        Some(ShipRoute {
            waypoints: vec![from, to],
            distance,
        })
    }

    fn distance_estimate(&self, a: MapPoint, b: MapPoint) -> u32 {
        a.chebyshev(b)
    }
}
