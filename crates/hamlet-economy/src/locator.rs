//! Nearest-warehouse search.
//!
//! Warehouses are visited in registration order. A straight-line lower
//! bound skips warehouses that cannot beat the best path found so far, and
//! the path query itself is capped at the current best length. On equal
//! length the warehouse registered first wins.

use hamlet_types::{MapPoint, ObjectId, RoadId};
use hamlet_world::PathQueryPort;

use crate::warehouse::{Warehouse, WarehouseCondition};

/// Parameters of one warehouse search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseQuery {
    /// Road node the search starts from.
    pub start: MapPoint,
    /// Capability the warehouse must have.
    pub condition: WarehouseCondition,
    /// Route from `start` to the warehouse rather than back.
    pub to_warehouse: bool,
    /// Allow boat roads.
    pub use_boat: bool,
    /// Road that must not be used.
    pub forbidden: Option<RoadId>,
}

impl WarehouseQuery {
    /// A search from a warehouse towards `start` over land roads only.
    pub const fn from_warehouse(start: MapPoint, condition: WarehouseCondition) -> Self {
        Self {
            start,
            condition,
            to_warehouse: false,
            use_boat: false,
            forbidden: None,
        }
    }

    /// Also allow boat roads.
    #[must_use]
    pub const fn with_boats(mut self) -> Self {
        self.use_boat = true;
        self
    }

    /// Route towards the warehouse.
    #[must_use]
    pub const fn towards(mut self) -> Self {
        self.to_warehouse = true;
        self
    }

    /// Exclude one road.
    #[must_use]
    pub const fn avoiding(mut self, road: RoadId) -> Self {
        self.forbidden = Some(road);
        self
    }
}

/// The warehouse a search settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseMatch {
    /// Position in the player's warehouse list.
    pub index: usize,
    /// Object id.
    pub id: ObjectId,
    /// Path length, 0 when the search started at the warehouse.
    pub length: u32,
}

/// Find the matching warehouse with the shortest path.
pub fn find_warehouse(
    warehouses: &[Warehouse],
    paths: &dyn PathQueryPort,
    query: &WarehouseQuery,
) -> Option<WarehouseMatch> {
    let mut best: Option<WarehouseMatch> = None;
    let mut best_length = u32::MAX;

    for (index, wh) in warehouses.iter().enumerate() {
        if !query.condition.matches(wh) {
            continue;
        }
        if query.start == wh.pos {
            return Some(WarehouseMatch {
                index,
                id: wh.id,
                length: 0,
            });
        }
        if paths.distance_estimate(query.start, wh.pos) > best_length {
            continue;
        }
        let (from, to) = if query.to_warehouse {
            (query.start, wh.pos)
        } else {
            (wh.pos, query.start)
        };
        let Some(length) = paths.find_path(from, to, query.use_boat, best_length, query.forbidden)
        else {
            continue;
        };
        if length < best_length || best.is_none() {
            best_length = length;
            best = Some(WarehouseMatch {
                index,
                id: wh.id,
                length,
            });
        }
    }
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hamlet_types::{BuildingType, WareType};

    use super::*;
    use crate::testing::TableOracle;

    fn warehouse(id: u32, x: u16) -> Warehouse {
        Warehouse::new(ObjectId::new(id), BuildingType::Storehouse, MapPoint::new(x, 0)).unwrap()
    }

    fn stocked(id: u32, x: u16, boards: u32) -> Warehouse {
        let mut wh = warehouse(id, x);
        wh.inventory.add_ware(WareType::Boards, boards);
        wh
    }

    const START: MapPoint = MapPoint { x: 0, y: 0 };

    fn has_boards() -> WarehouseCondition {
        WarehouseCondition::HasMinWares {
            ware: WareType::Boards,
            count: 1,
        }
    }

    #[test]
    fn returns_shortest_matching_warehouse() {
        let whs = vec![stocked(1, 10, 0), stocked(2, 20, 5), stocked(3, 5, 5)];
        let oracle = TableOracle::new()
            .with_path(MapPoint::new(10, 0), START, 10)
            .with_path(MapPoint::new(20, 0), START, 25)
            .with_path(MapPoint::new(5, 0), START, 30);
        let found =
            find_warehouse(&whs, &oracle, &WarehouseQuery::from_warehouse(START, has_boards()))
                .unwrap();
        assert_eq!(found.id, ObjectId::new(2));
        assert_eq!(found.length, 25);
    }

    #[test]
    fn equal_length_keeps_first_registered() {
        let whs = vec![stocked(7, 10, 1), stocked(3, 10, 1)];
        let oracle = TableOracle::new().with_path(MapPoint::new(10, 0), START, 12);
        let found =
            find_warehouse(&whs, &oracle, &WarehouseQuery::from_warehouse(START, has_boards()))
                .unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.id, ObjectId::new(7));
    }

    #[test]
    fn start_at_warehouse_is_zero_length() {
        let whs = vec![stocked(1, 3, 1), stocked(2, 0, 1)];
        let oracle = TableOracle::new().with_path(MapPoint::new(3, 0), START, 3);
        let found =
            find_warehouse(&whs, &oracle, &WarehouseQuery::from_warehouse(START, has_boards()))
                .unwrap();
        assert_eq!(found.id, ObjectId::new(2));
        assert_eq!(found.length, 0);
    }

    #[test]
    fn unreachable_or_unmatched_gives_none() {
        let whs = vec![stocked(1, 10, 0), stocked(2, 20, 3)];
        let oracle = TableOracle::new().with_path(MapPoint::new(10, 0), START, 10);
        let query = WarehouseQuery::from_warehouse(START, has_boards());
        assert!(find_warehouse(&whs, &oracle, &query).is_none());
    }

    #[test]
    fn lower_bound_skips_path_queries() {
        let whs = vec![stocked(1, 2, 1), stocked(2, 40, 1)];
        let oracle = TableOracle::new()
            .with_path(MapPoint::new(2, 0), START, 2)
            .with_path(MapPoint::new(40, 0), START, 40);
        let query = WarehouseQuery::from_warehouse(START, has_boards());
        let found = find_warehouse(&whs, &oracle, &query).unwrap();
        assert_eq!(found.id, ObjectId::new(1));
        assert_eq!(oracle.path_queries(), 1);
    }

    #[test]
    fn direction_follows_query() {
        let whs = vec![stocked(1, 9, 1)];
        let oracle = TableOracle::new().with_one_way(START, MapPoint::new(9, 0), 9);
        let back = WarehouseQuery::from_warehouse(START, has_boards());
        assert!(find_warehouse(&whs, &oracle, &back).is_none());
        let towards = back.towards();
        assert_eq!(find_warehouse(&whs, &oracle, &towards).unwrap().length, 9);
    }
}
