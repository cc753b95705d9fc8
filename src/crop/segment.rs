//! Connected-component segmentation of a coarse luma grid.

use std::collections::VecDeque;

use crate::preprocess::PixelMatrix;

/// Inclusive bounding box in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

/// One 4-connected region of uniform binarized value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// `(row, col)` in discovery order.
    cells: Vec<(usize, usize)>,
    bounds: BoundingBox,
    high: bool,
}

impl Segment {
    fn from_cells(cells: Vec<(usize, usize)>, high: bool) -> Self {
        let (r0, c0) = cells[0];
        let mut bounds = BoundingBox {
            min_row: r0,
            min_col: c0,
            max_row: r0,
            max_col: c0,
        };
        for &(r, c) in &cells[1..] {
            bounds.min_row = bounds.min_row.min(r);
            bounds.min_col = bounds.min_col.min(c);
            bounds.max_row = bounds.max_row.max(r);
            bounds.max_col = bounds.max_col.max(c);
        }
        Self { cells, bounds, high }
    }

    fn full_grid(rows: usize, cols: usize) -> Self {
        let cells = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .collect();
        Self {
            cells,
            bounds: BoundingBox {
                min_row: 0,
                min_col: 0,
                max_row: rows - 1,
                max_col: cols - 1,
            },
            high: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[(usize, usize)] {
        &self.cells
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Whether the region lies above the brightness threshold.
    pub fn is_high(&self) -> bool {
        self.high
    }
}

/// Cells already claimed by some region during one segmentation pass.
struct VisitMap {
    cols: usize,
    visited: Vec<bool>,
}

impl VisitMap {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            visited: vec![false; rows * cols],
        }
    }

    fn is_visited(&self, row: usize, col: usize) -> bool {
        self.visited[row * self.cols + col]
    }

    /// Returns false if the cell was already claimed.
    fn claim(&mut self, row: usize, col: usize) -> bool {
        let idx = row * self.cols + col;
        !std::mem::replace(&mut self.visited[idx], true)
    }
}

/// Binarized grid: `true` where the sample is above the threshold.
struct Binary {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl Binary {
    fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col]
    }
}

fn flood_fill(grid: &Binary, start: (usize, usize), visited: &mut VisitMap) -> Vec<(usize, usize)> {
    let target = grid.get(start.0, start.1);
    let mut region = Vec::new();
    let mut queue = VecDeque::from([start]);
    visited.claim(start.0, start.1);

    while let Some((r, c)) = queue.pop_front() {
        region.push((r, c));
        let neighbours = [
            (r, c + 1),
            (r, c.wrapping_sub(1)),
            (r + 1, c),
            (r.wrapping_sub(1), c),
        ];
        for (nr, nc) in neighbours {
            if nr < grid.rows && nc < grid.cols && grid.get(nr, nc) == target && visited.claim(nr, nc) {
                queue.push_back((nr, nc));
            }
        }
    }
    region
}

/// Segment a blurred luma grid into bright and dark regions.
///
/// Regions of `min_segment_size` cells or fewer are dropped. Bright regions
/// are discovered first, each scan in row-major order. When nothing survives
/// the whole grid is returned as a single segment. A positive `limit` keeps
/// only the largest regions, earlier discoveries winning ties; survivors stay
/// in discovery order.
pub fn find_segments(
    grid: &PixelMatrix,
    threshold: u8,
    min_segment_size: usize,
    limit: usize,
) -> Vec<Segment> {
    let (rows, cols) = (grid.rows(), grid.cols());
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let threshold = f64::from(threshold);
    let binary = Binary {
        rows,
        cols,
        cells: grid.as_slice().iter().map(|&v| v > threshold).collect(),
    };

    let mut visited = VisitMap::new(rows, cols);
    let mut segments = Vec::new();
    for target in [true, false] {
        for r in 0..rows {
            for c in 0..cols {
                if binary.get(r, c) != target || visited.is_visited(r, c) {
                    continue;
                }
                let cells = flood_fill(&binary, (r, c), &mut visited);
                if cells.len() > min_segment_size {
                    segments.push(Segment::from_cells(cells, target));
                }
            }
        }
    }

    if segments.is_empty() {
        log::debug!("no segment above {} cells, using the full grid", min_segment_size);
        return vec![Segment::full_grid(rows, cols)];
    }

    if limit > 0 && segments.len() > limit {
        let mut order: Vec<usize> = (0..segments.len()).collect();
        order.sort_by(|&a, &b| segments[b].len().cmp(&segments[a].len()));
        let mut keep = vec![false; segments.len()];
        for &idx in &order[..limit] {
            keep[idx] = true;
        }
        let mut keep = keep.into_iter();
        segments.retain(|_| keep.next().unwrap_or(false));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(rows: &[&str]) -> PixelMatrix {
        let cols = rows[0].len();
        PixelMatrix::from_fn(rows.len(), cols, |r, c| {
            if rows[r].as_bytes()[c] == b'#' { 255.0 } else { 0.0 }
        })
    }

    #[test]
    fn test_uniform_grid_is_one_segment() {
        for value in [0.0, 128.0, 200.0] {
            let grid = PixelMatrix::from_fn(20, 30, |_, _| value);
            for threshold in [0, 127, 128, 255] {
                let segments = find_segments(&grid, threshold, 10, 0);
                assert_eq!(segments.len(), 1);
                assert_eq!(segments[0].len(), 600);
                assert_eq!(
                    segments[0].bounds(),
                    BoundingBox { min_row: 0, min_col: 0, max_row: 19, max_col: 29 }
                );
            }
        }
    }

    #[test]
    fn test_bright_regions_come_first() {
        let grid = grid_from(&[
            "##....",
            "##....",
            "......",
            "....##",
        ]);
        let segments = find_segments(&grid, 128, 0, 0);
        assert_eq!(segments.len(), 3);
        assert!(segments[0].is_high() && segments[1].is_high());
        assert_eq!(segments[0].len(), 4);
        assert_eq!(segments[1].len(), 2);
        assert_eq!(
            segments[1].bounds(),
            BoundingBox { min_row: 3, min_col: 4, max_row: 3, max_col: 5 }
        );
        assert!(!segments[2].is_high());
        assert_eq!(segments[2].len(), 18);
    }

    #[test]
    fn test_segments_partition_grid() {
        let grid = grid_from(&[
            "#.#.#",
            ".#.#.",
            "#.#.#",
        ]);
        let segments = find_segments(&grid, 128, 0, 0);
        // no two diagonal cells connect
        assert_eq!(segments.len(), 15);
        let mut seen: Vec<_> = segments.iter().flat_map(|s| s.cells().to_vec()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 15);
    }

    #[test]
    fn test_small_regions_are_dropped() {
        let grid = grid_from(&[
            "#.....",
            "......",
            "......",
        ]);
        let segments = find_segments(&grid, 128, 1, 0);
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].is_high());
        assert_eq!(segments[0].len(), 17);

        // nothing survives: full-grid fallback
        let fallback = find_segments(&grid, 128, 100, 0);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].len(), 18);
    }

    #[test]
    fn test_limit_keeps_largest_in_discovery_order() {
        let grid = grid_from(&[
            "#..###",
            "#.....",
            "......",
            "##.#..",
        ]);
        // bright: 2 (col 0), 3 (top right), 2 (bottom left), 1 (bottom)
        let segments = find_segments(&grid, 128, 0, 3);
        assert_eq!(segments.len(), 3);
        let sizes: Vec<_> = segments.iter().map(Segment::len).collect();
        // dark region (16) plus the two largest bright ones; the tie at 2 goes to the first found
        assert_eq!(sizes, vec![2, 3, 16]);
        assert_eq!(segments[0].bounds().min_col, 0);
        assert_eq!(segments[0].bounds().max_row, 1);
    }
}
