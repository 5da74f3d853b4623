/// Grid geometry: cells, pixel rectangles and map bounds.
///
/// Game logic works in cells. Movers additionally carry a continuous
/// (pixel) position used only for smooth movement and collision boxes.
///
/// ## Coordinates
///   - `Cell { x, y }`: column / row, `(0, 0)` is the top-left cell.
///   - pixel `(px, py)`: `cell * tile_size` is the cell's origin.
///   - `Grid::cell_of(px, py)` uses integer (floor) division.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Cell {
        Cell { x: self.x + dx, y: self.y + dy }
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Squared Euclidean distance; ordering-equivalent to the real distance.
    pub fn distance_sq(self, other: Cell) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_adjacent(self, other: Cell) -> bool {
        self.manhattan(other) == 1
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Cell { x, y }
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
}

/// Static map geometry. Owns no entities.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    pub tile_size: i32,
}

impl Grid {
    pub fn new(width: i32, height: i32, tile_size: i32) -> Self {
        Grid { width, height, tile_size }
    }

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Pixel origin (top-left corner) of a cell.
    #[inline]
    pub fn origin(&self, cell: Cell) -> (i32, i32) {
        (cell.x * self.tile_size, cell.y * self.tile_size)
    }

    /// Cell containing a pixel coordinate.
    #[inline]
    pub fn cell_of(&self, px: i32, py: i32) -> Cell {
        Cell {
            x: px.div_euclid(self.tile_size),
            y: py.div_euclid(self.tile_size),
        }
    }

    /// Full-tile rectangle of a cell (walls, explosions).
    pub fn cell_rect(&self, cell: Cell) -> Rect {
        let (x, y) = self.origin(cell);
        Rect::new(x, y, self.tile_size, self.tile_size)
    }

    /// Pixel extent of the whole map.
    pub fn bounds_rect(&self) -> Rect {
        Rect::new(0, 0, self.width * self.tile_size, self.height * self.tile_size)
    }

    /// Row-major index, `None` outside the map.
    #[inline]
    pub fn index(&self, cell: Cell) -> Option<usize> {
        if self.in_bounds(cell) {
            Some((cell.y * self.width + cell.x) as usize)
        } else {
            None
        }
    }

    pub fn cell_count(&self) -> usize {
        (self.width.max(0) * self.height.max(0)) as usize
    }

    /// Every cell touched by a pixel rectangle (clipped to the map).
    pub fn cells_overlapping(&self, rect: &Rect) -> impl Iterator<Item = Cell> + '_ {
        let first = self.cell_of(rect.x, rect.y);
        let last = self.cell_of(rect.right() - 1, rect.bottom() - 1);
        let x0 = first.x.max(0);
        let y0 = first.y.max(0);
        let x1 = last.x.min(self.width - 1);
        let y1 = last.y.min(self.height - 1);
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| Cell::new(x, y)))
    }
}
