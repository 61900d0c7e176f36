//! Broadphase candidate provider
//!
//! Merges the spatial hash's static-brick query with a linear scan over
//! dynamic obstacles (bosses, enemies). Those move every tick and are not
//! worth reindexing; a short linear pass is cheaper than churning the grid.
//! Duplicate candidates are harmless: they simply lose to the true earliest
//! hit in the solver's TOI selection.

use super::geom::Aabb;
use super::spatial_hash::SpatialHash;
use super::state::{Obstacle, ObstacleKind};

/// Source of collision candidates for a swept AABB. The solver only ever
/// sees ids; tests substitute a flat list for the grid-backed provider.
pub trait CandidateSource {
    /// Append ids of obstacles possibly overlapping `swept` to `out`
    fn candidates_into(&self, swept: &Aabb, out: &mut Vec<u32>);
}

/// Grid-backed provider over the tick's obstacle array
pub struct Broadphase<'a> {
    pub grid: &'a SpatialHash,
    pub obstacles: &'a [Obstacle],
}

impl CandidateSource for Broadphase<'_> {
    fn candidates_into(&self, swept: &Aabb, out: &mut Vec<u32>) {
        self.grid.query_into(swept, out);
        for ob in self.obstacles {
            if ob.kind != ObstacleKind::Brick && ob.visible && ob.aabb.overlaps(swept) {
                out.push(ob.id);
            }
        }
    }
}

/// Every visible obstacle, no pruning. Used by tests and tiny scenes.
pub struct LinearScan<'a>(pub &'a [Obstacle]);

impl CandidateSource for LinearScan<'_> {
    fn candidates_into(&self, swept: &Aabb, out: &mut Vec<u32>) {
        out.clear();
        for ob in self.0 {
            if ob.visible && ob.aabb.overlaps(swept) {
                out.push(ob.id);
            }
        }
    }
}

/// Binary search over the id-sorted obstacle array
pub fn obstacle_by_id(obstacles: &[Obstacle], id: u32) -> Option<&Obstacle> {
    obstacles
        .binary_search_by_key(&id, |o| o.id)
        .ok()
        .map(|i| &obstacles[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SPATIAL_CELL_SIZE;

    fn setup() -> (SpatialHash, Vec<Obstacle>) {
        let bounds = Aabb::from_rect(0.0, 0.0, 640.0, 480.0);
        let mut grid = SpatialHash::new(bounds, SPATIAL_CELL_SIZE);
        let obstacles = vec![
            Obstacle::brick(1, Aabb::from_rect(27.0, 40.0, 58.0, 20.0), 1),
            Obstacle::brick(2, Aabb::from_rect(500.0, 40.0, 58.0, 20.0), 1),
            Obstacle::boss(3, Aabb::from_rect(300.0, 200.0, 80.0, 60.0), 10),
        ];
        for ob in &obstacles {
            if ob.kind == ObstacleKind::Brick {
                grid.insert(ob.id, &ob.aabb);
            }
        }
        (grid, obstacles)
    }

    #[test]
    fn test_bricks_come_from_grid() {
        let (grid, obstacles) = setup();
        let bp = Broadphase {
            grid: &grid,
            obstacles: &obstacles,
        };
        let mut out = Vec::new();
        bp.candidates_into(&Aabb::from_rect(0.0, 0.0, 100.0, 100.0), &mut out);
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn test_dynamic_obstacles_scanned_linearly() {
        let (grid, obstacles) = setup();
        let bp = Broadphase {
            grid: &grid,
            obstacles: &obstacles,
        };
        // The boss is not in the grid but must still be reported
        assert!(!grid.contains(3));
        let mut out = Vec::new();
        bp.candidates_into(&Aabb::from_rect(290.0, 190.0, 40.0, 40.0), &mut out);
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn test_hidden_dynamic_obstacles_skipped() {
        let (grid, mut obstacles) = setup();
        obstacles[2].visible = false;
        let bp = Broadphase {
            grid: &grid,
            obstacles: &obstacles,
        };
        let mut out = Vec::new();
        bp.candidates_into(&Aabb::from_rect(290.0, 190.0, 40.0, 40.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_obstacle_lookup_by_id() {
        let (_, obstacles) = setup();
        assert_eq!(obstacle_by_id(&obstacles, 3).map(|o| o.kind), Some(ObstacleKind::Boss));
        assert!(obstacle_by_id(&obstacles, 99).is_none());
    }
}
