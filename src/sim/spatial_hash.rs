//! Uniform grid broadphase index for static bricks
//!
//! Bricks are stored in every grid cell their AABB overlaps, with a reverse
//! index per id so removal is O(1) amortized. Destroyed or hidden bricks
//! are removed eagerly rather than filtered at query time, keeping queries
//! cheap. Fast-moving obstacles (bosses, enemies) are deliberately not
//! indexed here; the broadphase provider scans them linearly instead.

use std::collections::HashMap;

use glam::Vec2;

use super::geom::Aabb;

#[derive(Debug, Clone)]
pub struct SpatialHash {
    origin: Vec2,
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<u32>>,
    /// Reverse index: id -> cell indices the id was inserted into
    index: HashMap<u32, Vec<usize>>,
}

impl SpatialHash {
    /// Grid covering `bounds` with square cells of `cell_size` (roughly
    /// twice the typical brick width works well)
    pub fn new(bounds: Aabb, cell_size: f32) -> Self {
        let cell_size = cell_size.max(1.0);
        let cols = (bounds.width() / cell_size).ceil().max(1.0) as usize;
        let rows = (bounds.height() / cell_size).ceil().max(1.0) as usize;
        Self {
            origin: bounds.min,
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            index: HashMap::new(),
        }
    }

    /// Cell ranges overlapped by `aabb`, clamped to the grid.
    /// Clamp to 0 only after the min() so large negative coordinates
    /// cannot underflow.
    fn cell_range(&self, aabb: &Aabb) -> (usize, usize, usize, usize) {
        let min_col = ((aabb.min.x - self.origin.x) / self.cell_size).floor() as isize;
        let max_col = ((aabb.max.x - self.origin.x) / self.cell_size).floor() as isize;
        let min_row = ((aabb.min.y - self.origin.y) / self.cell_size).floor() as isize;
        let max_row = ((aabb.max.y - self.origin.y) / self.cell_size).floor() as isize;

        let min_col = min_col.max(0).min(self.cols as isize - 1) as usize;
        let max_col = max_col.min(self.cols as isize - 1).max(0) as usize;
        let min_row = min_row.max(0).min(self.rows as isize - 1) as usize;
        let max_row = max_row.min(self.rows as isize - 1).max(0) as usize;

        (min_col, max_col, min_row, max_row)
    }

    /// Insert `id` into every cell its AABB overlaps
    pub fn insert(&mut self, id: u32, aabb: &Aabb) {
        let (min_col, max_col, min_row, max_row) = self.cell_range(aabb);
        let slots = self.index.entry(id).or_default();
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                let idx = row * self.cols + col;
                self.cells[idx].push(id);
                slots.push(idx);
            }
        }
    }

    /// Remove `id` from every cell it occupies
    pub fn remove(&mut self, id: u32) {
        if let Some(slots) = self.index.remove(&id) {
            for idx in slots {
                self.cells[idx].retain(|&e| e != id);
            }
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Collect the deduplicated ids overlapping all cells `aabb` touches
    /// into `out`. The buffer is cleared first, so callers can reuse it
    /// across queries without allocating.
    pub fn query_into(&self, aabb: &Aabb, out: &mut Vec<u32>) {
        out.clear();
        let (min_col, max_col, min_row, max_row) = self.cell_range(aabb);
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                out.extend_from_slice(&self.cells[row * self.cols + col]);
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpatialHash {
        SpatialHash::new(Aabb::from_rect(0.0, 0.0, 640.0, 480.0), 116.0)
    }

    #[test]
    fn test_insert_and_query() {
        let mut hash = grid();
        hash.insert(1, &Aabb::from_rect(27.0, 40.0, 58.0, 20.0));
        hash.insert(2, &Aabb::from_rect(500.0, 400.0, 58.0, 20.0));

        let mut out = Vec::new();
        hash.query_into(&Aabb::from_rect(0.0, 0.0, 100.0, 100.0), &mut out);
        assert_eq!(out, vec![1]);

        hash.query_into(&Aabb::from_rect(480.0, 380.0, 100.0, 100.0), &mut out);
        assert_eq!(out, vec![2]);
    }

    #[test]
    fn test_query_dedups_spanning_objects() {
        let mut hash = grid();
        // Wide brick spanning several cells
        hash.insert(7, &Aabb::from_rect(0.0, 0.0, 400.0, 20.0));

        let mut out = Vec::new();
        hash.query_into(&Aabb::from_rect(0.0, 0.0, 640.0, 480.0), &mut out);
        assert_eq!(out, vec![7]);
    }

    #[test]
    fn test_remove_clears_all_cells() {
        let mut hash = grid();
        let brick = Aabb::from_rect(100.0, 100.0, 200.0, 200.0);
        hash.insert(3, &brick);
        assert!(hash.contains(3));

        hash.remove(3);
        assert!(!hash.contains(3));

        let mut out = Vec::new();
        hash.query_into(&Aabb::from_rect(0.0, 0.0, 640.0, 480.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_query_clamps_outside_grid() {
        let mut hash = grid();
        hash.insert(1, &Aabb::from_rect(0.0, 0.0, 58.0, 20.0));

        let mut out = Vec::new();
        // Query box far outside the canvas clamps to the border cells
        hash.query_into(&Aabb::from_rect(-1000.0, -1000.0, 100.0, 100.0), &mut out);
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn test_reinsert_after_remove() {
        let mut hash = grid();
        let brick = Aabb::from_rect(100.0, 100.0, 58.0, 20.0);
        hash.insert(4, &brick);
        hash.remove(4);
        hash.insert(4, &brick);

        let mut out = Vec::new();
        hash.query_into(&brick, &mut out);
        assert_eq!(out, vec![4]);
    }
}
