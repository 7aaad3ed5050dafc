//! Broad phase: a uniform grid over the table bounds.
//!
//! The grid is sized once from the expected body size and count so that each
//! cell holds about one body. Every pass it is cleared and refilled from the
//! bodies' predicted positions; only bodies sharing a cell are tested
//! against each other.
//!
//! ## Cell assignment
//!
//! A body is registered under the midpoints of its four edges, so it can
//! land in up to four cells:
//!
//! ```text
//!          N
//!     ┌────●────┐
//!     │         │
//!   W ●         ● E
//!     │         │
//!     └────●────┘
//!          S
//! ```
//!
//! Points outside the bounds are clamped onto them first.

use tracing::trace;

use crate::types::{Rect, Vec2};

/// Hard cap on rows/columns, guards against absurdly small object sizes.
const MAX_CELLS_PER_AXIS: usize = 4096;

/// Row/column partition of the bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub bounds: Rect,
    pub rows: usize,
    pub cols: usize,
}

impl GridLayout {
    /// Size the grid so the expected density is about one body per cell.
    ///
    /// ```text
    /// density = floor(sqrt(bounds_area / (object_area * count))) + 1
    /// rows    = ceil(bounds_height / (object_height * density))
    /// cols    = ceil(bounds_width  / (object_width  * density))
    /// ```
    ///
    /// Rows and columns are always at least 1.
    pub fn compute(bounds: Rect, object_size: Vec2, expected_count: usize) -> Self {
        let object_area = object_size.x * object_size.y;
        let count = expected_count.max(1) as f64;
        if object_area <= 0.0 || !object_area.is_finite() {
            return Self::single(bounds);
        }

        let density = ((bounds.area() / (object_area * count)).sqrt().floor() + 1.0).max(1.0);
        let rows = (bounds.height / (object_size.y * density)).ceil();
        let cols = (bounds.width / (object_size.x * density)).ceil();

        Self {
            bounds,
            rows: clamp_axis(rows),
            cols: clamp_axis(cols),
        }
    }

    /// One cell covering the whole bounds.
    pub fn single(bounds: Rect) -> Self {
        Self {
            bounds,
            rows: 1,
            cols: 1,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn cell_width(&self) -> f64 {
        self.bounds.width / self.cols as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.bounds.height / self.rows as f64
    }
}

fn clamp_axis(n: f64) -> usize {
    // NaN casts to 0, infinities saturate
    (n as usize).clamp(1, MAX_CELLS_PER_AXIS)
}

/// Cell buckets holding entity indices, reused across passes.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    layout: GridLayout,
    /// Column edges, `cols + 1` entries, last one is exactly the right bound
    col_edges: Vec<f64>,
    /// Row edges, `rows + 1` entries, last one is exactly the bottom bound
    row_edges: Vec<f64>,
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(layout: GridLayout) -> Self {
        let b = layout.bounds;
        let col_edges = edges(b.left(), b.right(), layout.cell_width(), layout.cols);
        let row_edges = edges(b.top(), b.bottom(), layout.cell_height(), layout.rows);
        trace!(
            rows = layout.rows,
            cols = layout.cols,
            "collision grid initialized"
        );
        Self {
            layout,
            col_edges,
            row_edges,
            cells: vec![Vec::new(); layout.cell_count()],
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Rectangle covered by cell `index`.
    pub fn cell_bounds(&self, index: usize) -> Rect {
        let row = index / self.layout.cols;
        let col = index % self.layout.cols;
        Rect::new(
            self.col_edges[col],
            self.row_edges[row],
            self.col_edges[col + 1] - self.col_edges[col],
            self.row_edges[row + 1] - self.row_edges[row],
        )
    }

    pub fn cell(&self, index: usize) -> &[usize] {
        &self.cells[index]
    }

    /// Empty every bucket, keeping allocations.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Register entity `index` under the cells touched by the edge midpoints
    /// of `next_bounds`.
    pub fn insert(&mut self, index: usize, next_bounds: &Rect) {
        let b = next_bounds;
        let midpoints = [
            Vec2::new(b.x + b.width / 2.0, b.y),
            Vec2::new(b.right(), b.y + b.height / 2.0),
            Vec2::new(b.x + b.width / 2.0, b.bottom()),
            Vec2::new(b.x, b.y + b.height / 2.0),
        ];
        for point in midpoints {
            let cell = self.locate_cell(self.clamp(point));
            let bucket = &mut self.cells[cell];
            if !bucket.contains(&index) {
                bucket.push(index);
            }
        }
    }

    /// Pull a point onto the bounds, keeping it strictly left of the right
    /// edge and strictly above the bottom edge.
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        let b = &self.layout.bounds;
        let max_x = b.right() - (b.right().abs() + b.width) * 1e-12;
        let max_y = b.bottom() - (b.bottom().abs() + b.height) * 1e-12;
        Vec2::new(
            point.x.max(b.left()).min(max_x),
            point.y.max(b.top()).min(max_y),
        )
    }

    /// Index of the cell containing `point`.
    ///
    /// The scaled-floor estimate can land one cell off when the cell size does
    /// not divide the bounds cleanly; it is corrected against the cell edges.
    ///
    /// # Panics
    ///
    /// If the point maps outside the grid or into a cell that does not contain
    /// it. Callers clamp points first, so this is a sizing or mapping defect.
    pub fn locate_cell(&self, point: Vec2) -> usize {
        let layout = &self.layout;
        let b = &layout.bounds;
        let row = axis_index(point.y, b.top(), b.height, layout.rows, &self.row_edges);
        let col = axis_index(point.x, b.left(), b.width, layout.cols, &self.col_edges);

        if row < 0 || col < 0 || row as usize >= layout.rows || col as usize >= layout.cols {
            panic!(
                "failed to find grid cell for point {point}: row={row}, col={col}, grid={}x{}",
                layout.rows, layout.cols
            );
        }
        let (row, col) = (row as usize, col as usize);
        let index = row * layout.cols + col;

        let inside = self.col_edges[col] <= point.x
            && point.x < self.col_edges[col + 1]
            && self.row_edges[row] <= point.y
            && point.y < self.row_edges[row + 1];
        if !inside {
            panic!(
                "grid cell {index} {} does not contain point {point}: row={row}, col={col}",
                self.cell_bounds(index)
            );
        }
        index
    }

    /// Cells holding more than one entity, in index order.
    pub fn occupied(&self) -> impl Iterator<Item = &[usize]> {
        self.cells
            .iter()
            .filter(|c| c.len() > 1)
            .map(Vec::as_slice)
    }

    /// Collect every unordered pair sharing a cell into `out`, sorted and
    /// without duplicates (a pair straddling two cells is reported once).
    pub fn candidate_pairs(&self, out: &mut Vec<(usize, usize)>) {
        out.clear();
        for cell in self.occupied() {
            for (i, &a) in cell.iter().enumerate() {
                for &b in &cell[i + 1..] {
                    out.push((a.min(b), a.max(b)));
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

fn edges(start: f64, end: f64, step: f64, count: usize) -> Vec<f64> {
    let mut out: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    out.push(end);
    out
}

/// Scaled-floor cell index along one axis, nudged by one cell when rounding
/// put the cell origin past the point (or the next origin at or before it).
fn axis_index(coord: f64, origin: f64, extent: f64, count: usize, edges: &[f64]) -> isize {
    let mut i = (((coord - origin) / extent) * count as f64).floor() as isize;
    if i >= 0 && (i as usize) < count {
        if edges[i as usize] > coord {
            i -= 1;
        } else if edges[i as usize + 1] <= coord {
            i += 1;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_bounds() -> Rect {
        Rect::new(100.0, 89.0, 700.0, 351.0)
    }

    #[test]
    fn test_layout_for_billiards_table() {
        let layout = GridLayout::compute(table_bounds(), Vec2::new(25.0, 25.0), 16);
        // density = floor(sqrt(245700 / 10000)) + 1 = 5
        assert_eq!(layout.rows, 3); // ceil(351 / 125)
        assert_eq!(layout.cols, 6); // ceil(700 / 125)
    }

    #[test]
    fn test_layout_degenerate_inputs() {
        let b = table_bounds();
        let one = GridLayout::compute(b, Vec2::new(25.0, 25.0), 1);
        assert!(one.rows >= 1 && one.cols >= 1);

        let huge = GridLayout::compute(b, Vec2::new(10_000.0, 10_000.0), 16);
        assert_eq!((huge.rows, huge.cols), (1, 1));

        let zero = GridLayout::compute(b, Vec2::ZERO, 0);
        assert_eq!((zero.rows, zero.cols), (1, 1));
    }

    #[test]
    fn test_cells_tile_bounds() {
        let grid = SpatialGrid::new(GridLayout::compute(table_bounds(), Vec2::new(25.0, 25.0), 16));
        let total: f64 = (0..grid.layout().cell_count())
            .map(|i| grid.cell_bounds(i).area())
            .sum();
        assert!((total - table_bounds().area()).abs() < 1e-6);
        let last = grid.cell_bounds(grid.layout().cell_count() - 1);
        assert_eq!(last.right(), table_bounds().right());
        assert_eq!(last.bottom(), table_bounds().bottom());
    }

    #[test]
    fn test_locate_cell_corners() {
        let grid = SpatialGrid::new(GridLayout::compute(table_bounds(), Vec2::new(25.0, 25.0), 16));
        let b = table_bounds();
        assert_eq!(grid.locate_cell(Vec2::new(b.left(), b.top())), 0);
        let corner = grid.clamp(Vec2::new(b.right(), b.bottom()));
        assert_eq!(grid.locate_cell(corner), grid.layout().cell_count() - 1);
    }

    #[test]
    fn test_locate_cell_on_interior_edge() {
        // 3 columns over width 1.0 do not divide cleanly
        let layout = GridLayout {
            bounds: Rect::new(0.0, 0.0, 1.0, 1.0),
            rows: 3,
            cols: 3,
        };
        let grid = SpatialGrid::new(layout);
        for i in 0..1000 {
            let p = Vec2::new(i as f64 / 1000.0, (999 - i) as f64 / 1000.0);
            let cell = grid.locate_cell(p);
            let b = grid.cell_bounds(cell);
            assert!(
                p.x >= b.left() - 1e-12 && p.x <= b.right() + 1e-12,
                "x={} outside column {}",
                p.x,
                b
            );
        }
        // Exactly on the first interior edge belongs to the second column
        assert_eq!(grid.locate_cell(Vec2::new(1.0 / 3.0, 0.0)), 1);
    }

    #[test]
    #[should_panic(expected = "failed to find grid cell")]
    fn test_locate_cell_out_of_bounds_panics() {
        let grid = SpatialGrid::new(GridLayout::single(table_bounds()));
        grid.locate_cell(Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_insert_spanning_cells_and_pairs() {
        let layout = GridLayout {
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
            rows: 2,
            cols: 2,
        };
        let mut grid = SpatialGrid::new(layout);
        // Straddles the vertical split at x=50
        grid.insert(0, &Rect::new(40.0, 10.0, 20.0, 20.0));
        grid.insert(1, &Rect::new(45.0, 15.0, 20.0, 20.0));
        // Alone in the bottom-right cell
        grid.insert(2, &Rect::new(70.0, 70.0, 10.0, 10.0));

        assert_eq!(grid.cell(0), &[0, 1]);
        assert_eq!(grid.cell(1), &[0, 1]);
        assert_eq!(grid.cell(3), &[2]);

        let mut pairs = Vec::new();
        grid.candidate_pairs(&mut pairs);
        assert_eq!(pairs, vec![(0, 1)]);

        grid.clear();
        assert!(grid.occupied().next().is_none());
    }

    #[test]
    fn test_insert_clamps_outside_points() {
        let mut grid = SpatialGrid::new(GridLayout {
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
            rows: 2,
            cols: 2,
        });
        // Entirely off the table to the top-left
        grid.insert(7, &Rect::new(-40.0, -40.0, 20.0, 20.0));
        assert_eq!(grid.cell(0), &[7]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_layout_is_never_empty(
                w in 1.0f64..5000.0,
                h in 1.0f64..5000.0,
                obj in 0.5f64..500.0,
                count in 0usize..200,
            ) {
                let bounds = Rect::new(0.0, 0.0, w, h);
                let layout = GridLayout::compute(bounds, Vec2::new(obj, obj), count);
                prop_assert!(layout.rows >= 1);
                prop_assert!(layout.cols >= 1);
            }

            #[test]
            fn test_clamped_points_always_locate(
                x in -1000.0f64..2000.0,
                y in -1000.0f64..2000.0,
                count in 1usize..64,
            ) {
                let bounds = Rect::new(100.0, 89.0, 700.0, 351.0);
                let layout = GridLayout::compute(bounds, Vec2::new(25.0, 25.0), count);
                let grid = SpatialGrid::new(layout);
                let cell = grid.locate_cell(grid.clamp(Vec2::new(x, y)));
                prop_assert!(cell < grid.layout().cell_count());
            }
        }
    }
}
