//! Grid-to-pixel mapping for stones that only exist as grid coordinates.
//!
//! Pre-positioned stones are given as two-letter codes whose axes are
//! swapped and mirrored relative to the grid used by the history, so a code
//! is first rotated by 90 degrees around the anchor cell and then scaled by
//! the inferred spacing.

use std::collections::HashMap;

use crate::geometry::{Anchor, InferredGeometry};
use crate::model::{GridCoord, PixelPoint, Step};

/// Exact identity of a grid cell. Positions are compared as numbers, with
/// `-0.0` and `0.0` treated as the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    x: u64,
    y: u64,
}

impl CellKey {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: (x + 0.0).to_bits(),
            y: (y + 0.0).to_bits(),
        }
    }
}

impl From<GridCoord> for CellKey {
    fn from(coord: GridCoord) -> Self {
        CellKey::new(coord.x as f64, coord.y as f64)
    }
}

/// Cells occupied by historical moves, each with the pixel position it was
/// last seen at. Cells keep the order in which they were first seen.
#[derive(Debug, Clone, Default)]
pub struct OccupiedCells {
    index: HashMap<CellKey, usize>,
    points: Vec<PixelPoint>,
}

impl OccupiedCells {
    /// Collect cells from every step except the last one, which is the move
    /// being played and is drawn separately.
    pub fn from_history(steps: &[Step]) -> Self {
        let mut cells = OccupiedCells::default();
        let Some((_current, placed)) = steps.split_last() else {
            return cells;
        };
        for anchor in placed.iter().filter_map(Anchor::from_step) {
            cells.insert(CellKey::new(anchor.x, anchor.y), PixelPoint::new(anchor.px, anchor.py));
        }
        cells
    }

    fn insert(&mut self, key: CellKey, point: PixelPoint) {
        match self.index.get(&key) {
            Some(&i) => self.points[i] = point,
            None => {
                self.index.insert(key, self.points.len());
                self.points.push(point);
            }
        }
    }

    pub fn contains(&self, key: CellKey) -> bool {
        self.index.contains_key(&key)
    }

    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Maps grid codes into the pixel frame fixed by an anchor and a spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    anchor: Anchor,
    spacing: f64,
}

impl CoordinateMapper {
    pub fn new(anchor: Anchor, spacing: f64) -> Self {
        Self { anchor, spacing }
    }

    pub fn to_pixel(&self, coord: GridCoord) -> PixelPoint {
        let Anchor { x: ox, y: oy, px: opx, py: opy } = self.anchor;
        let (gx, gy) = (coord.x as f64, coord.y as f64);

        let rotated_x = ox - (gy - oy);
        let rotated_y = oy + (gx - ox);

        PixelPoint::new(
            opx + (rotated_x - ox) * self.spacing,
            opy + (rotated_y - oy) * self.spacing,
        )
    }
}

impl From<&InferredGeometry> for CoordinateMapper {
    fn from(geometry: &InferredGeometry) -> Self {
        CoordinateMapper::new(geometry.anchor, geometry.spacing)
    }
}

/// Pixel positions of every pre-positioned stone whose cell is not already
/// occupied by a historical move, in group order.
pub fn prepos_points(
    groups: &[Vec<GridCoord>],
    occupied: &OccupiedCells,
    mapper: &CoordinateMapper,
) -> Vec<PixelPoint> {
    groups
        .iter()
        .flatten()
        .filter(|&&coord| !occupied.contains(coord.into()))
        .map(|&coord| mapper.to_pixel(coord))
        .collect()
}
