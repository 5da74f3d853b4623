/// Movement and collision resolution.
///
/// ## Architecture
///
/// Two distinct concepts, queried separately:
///   1. TERRAIN  : live walls, looked up through the wall grid
///   2. OCCUPANCY: other living opponents (only opponents block opponents)
///
/// A move is accepted when the candidate collision box stays inside the map
/// and touches neither blocker. Rejected moves are no-ops.
///
/// ## Wall Grid (O(1) lookup)
///
/// Walls never leave their Vec (destruction is a flag), so a per-cell index
/// into it is built once at load and stays valid for the whole match.
///
/// ## Axis snapping
///
/// Before moving along one axis, a mover whose other-axis coordinate is
/// within `SNAP_TOLERANCE` pixels of its cell origin is pulled onto it.
/// Without this a 36px box could never enter a 40px corridor from an
/// off-center approach.

use super::entity::{Body, Opponent};
use super::grid::{Cell, Grid, Rect};
use super::tile::Wall;

pub const SNAP_TOLERANCE: i32 = 8;

// ══════════════════════════════════════════════════════════════
// Layer 1: Terrain (walls: NO entities)
// ══════════════════════════════════════════════════════════════

/// Map `cell → index into walls`. At most one wall per cell; a later wall
/// in an already-claimed cell is ignored (the level builder rejects those).
pub fn build_wall_grid(walls: &[Wall], grid: &Grid) -> Vec<Option<usize>> {
    let mut index = vec![None; grid.cell_count()];
    for (i, w) in walls.iter().enumerate() {
        if let Some(slot) = grid.index(w.cell) {
            if index[slot].is_none() {
                index[slot] = Some(i);
            }
        }
    }
    index
}

/// Borrowed view of the static map plus walls.
#[derive(Clone, Copy)]
pub struct Terrain<'a> {
    pub grid: &'a Grid,
    pub walls: &'a [Wall],
    pub wall_grid: &'a [Option<usize>],
}

impl<'a> Terrain<'a> {
    pub fn new(grid: &'a Grid, walls: &'a [Wall], wall_grid: &'a [Option<usize>]) -> Self {
        Terrain { grid, walls, wall_grid }
    }

    /// Index of the non-destroyed wall at `cell`, if any.
    #[inline]
    pub fn live_wall_index(&self, cell: Cell) -> Option<usize> {
        let slot = self.grid.index(cell)?;
        let i = (*self.wall_grid.get(slot)?)?;
        (!self.walls[i].is_destroyed()).then_some(i)
    }

    pub fn wall_at(&self, cell: Cell) -> Option<&'a Wall> {
        self.live_wall_index(cell).map(|i| &self.walls[i])
    }

    /// In bounds and wall-free.
    pub fn is_open(&self, cell: Cell) -> bool {
        self.grid.in_bounds(cell) && self.live_wall_index(cell).is_none()
    }

    /// Does `rect` intersect any live wall? With `wall_pass`, walls whose
    /// kind allows it are ignored.
    pub fn blocks(&self, rect: &Rect, wall_pass: bool) -> bool {
        self.grid.cells_overlapping(rect).any(|cell| match self.wall_at(cell) {
            Some(w) if wall_pass && w.kind.is_passable_with_wall_pass() => false,
            Some(w) => rect.intersects(&self.grid.cell_rect(w.cell)),
            None => false,
        })
    }
}

// ══════════════════════════════════════════════════════════════
// Layer 2: Occupancy
// ══════════════════════════════════════════════════════════════

/// Does `rect` overlap a living opponent other than index `skip`?
pub fn opponent_blocks(opponents: &[Opponent], rect: &Rect, skip: usize) -> bool {
    opponents
        .iter()
        .enumerate()
        .any(|(j, o)| j != skip && o.alive && rect.intersects(&o.body.rect()))
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

/// Pull the off-axis coordinate onto the containing cell's origin when close.
pub fn snap_to_axis(body: &mut Body, grid: &Grid, dx: i32, dy: i32) {
    let (ox, oy) = grid.origin(body.cell);
    if dx != 0 && (body.y - oy).abs() < SNAP_TOLERANCE {
        body.y = oy;
    }
    if dy != 0 && (body.x - ox).abs() < SNAP_TOLERANCE {
        body.x = ox;
    }
}

/// Try to advance `body` by `speed` pixels along (dx, dy).
///
/// `blocked` decides whether the candidate box collides; map bounds are
/// checked here. Snapping is applied even if the move is then rejected.
/// Returns whether the body moved.
pub fn try_move(
    body: &mut Body,
    grid: &Grid,
    dx: i32,
    dy: i32,
    speed: i32,
    blocked: impl Fn(&Rect) -> bool,
) -> bool {
    if (dx == 0 && dy == 0) || speed <= 0 {
        return false;
    }
    snap_to_axis(body, grid, dx, dy);

    let candidate = Rect::new(body.x + dx * speed, body.y + dy * speed, body.size, body.size);
    let bounds = grid.bounds_rect();
    let inside = candidate.x >= bounds.x
        && candidate.y >= bounds.y
        && candidate.right() <= bounds.right()
        && candidate.bottom() <= bounds.bottom();
    if !inside || blocked(&candidate) {
        return false;
    }

    body.x = candidate.x;
    body.y = candidate.y;
    body.cell = grid.cell_of(body.x, body.y);
    true
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ai::Strategy;
    use crate::domain::tile::WallKind;

    const T: i32 = 40;

    /// '#' unbreakable, '+' breakable, '%' hard, anything else empty.
    fn walls_from(rows: &[&str]) -> (Grid, Vec<Wall>, Vec<Option<usize>>) {
        let grid = Grid::new(rows[0].len() as i32, rows.len() as i32, T);
        let mut walls = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let kind = match ch {
                    '#' => WallKind::Unbreakable,
                    '+' => WallKind::Breakable,
                    '%' => WallKind::Hard,
                    _ => continue,
                };
                walls.push(Wall::new(kind, Cell::new(x as i32, y as i32)));
            }
        }
        let wg = build_wall_grid(&walls, &grid);
        (grid, walls, wg)
    }

    fn move_body(body: &mut Body, t: &Terrain, dx: i32, dy: i32, speed: i32, pass: bool) -> bool {
        try_move(body, t.grid, dx, dy, speed, |r| t.blocks(r, pass))
    }

    // ── terrain ──

    #[test]
    fn wall_grid_lookup() {
        let (g, walls, wg) = walls_from(&["#.+", "..%"]);
        let t = Terrain::new(&g, &walls, &wg);
        assert_eq!(t.wall_at(Cell::new(0, 0)).map(|w| w.kind), Some(WallKind::Unbreakable));
        assert_eq!(t.wall_at(Cell::new(2, 1)).map(|w| w.kind), Some(WallKind::Hard));
        assert!(t.wall_at(Cell::new(1, 0)).is_none());
        assert!(t.is_open(Cell::new(1, 1)));
        assert!(!t.is_open(Cell::new(3, 0)));
    }

    #[test]
    fn destroyed_wall_is_not_terrain() {
        let (g, mut walls, wg) = walls_from(&["+"]);
        walls[0].take_hit();
        let t = Terrain::new(&g, &walls, &wg);
        assert!(t.wall_at(Cell::new(0, 0)).is_none());
        assert!(!t.blocks(&g.cell_rect(Cell::new(0, 0)), false));
    }

    // ── movement ──

    #[test]
    fn free_move_updates_cell() {
        let (g, walls, wg) = walls_from(&["....", "....", "...."]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut b = Body::at_cell(&g, Cell::new(0, 0));
        for _ in 0..14 {
            assert!(move_body(&mut b, &t, 1, 0, 3, false));
        }
        assert_eq!(b.x, 42);
        assert_eq!(b.cell, Cell::new(1, 0));
    }

    #[test]
    fn wall_blocks_move() {
        let (g, walls, wg) = walls_from(&[".#", ".."]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut b = Body::at_cell(&g, Cell::new(0, 0));
        // box is 36 wide: 4px gap to the wall, then blocked
        assert!(move_body(&mut b, &t, 1, 0, 3, false));
        assert!(!move_body(&mut b, &t, 1, 0, 3, false));
        assert_eq!(b.x, 3);
    }

    #[test]
    fn map_edge_blocks_move() {
        let (g, walls, wg) = walls_from(&["..", ".."]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut b = Body::at_cell(&g, Cell::new(0, 0));
        assert!(!move_body(&mut b, &t, -1, 0, 3, false));
        assert!(!move_body(&mut b, &t, 0, -1, 3, false));
        assert_eq!((b.x, b.y), (0, 0));
    }

    #[test]
    fn wall_pass_only_ignores_breakable() {
        let (g, walls, wg) = walls_from(&[".+.", ".#."]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut b = Body::at_cell(&g, Cell::new(0, 0));
        for _ in 0..20 {
            move_body(&mut b, &t, 1, 0, 3, true);
        }
        assert!(b.x > T);

        let mut low = Body::at_cell(&g, Cell::new(0, 1));
        move_body(&mut low, &t, 1, 0, 3, true);
        assert!(!move_body(&mut low, &t, 1, 0, 3, true));
    }

    #[test]
    fn snap_lets_mover_enter_corridor() {
        // corridor at column 1 going down; mover arrives 5px low
        let (g, walls, wg) = walls_from(&["...", "#.#", "#.#"]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut b = Body::at_cell(&g, Cell::new(1, 0));
        b.x = T + 5;
        b.y = 4;
        assert!(move_body(&mut b, &t, 0, 1, 3, false));
        assert_eq!(b.x, T);
        assert_eq!(b.y, 7);
    }

    #[test]
    fn no_snap_outside_tolerance() {
        let (g, walls, wg) = walls_from(&["...", "#.#"]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut b = Body::at_cell(&g, Cell::new(1, 0));
        b.x = T + SNAP_TOLERANCE;
        b.y = 4;
        // still offset: the box clips the pillar at (2,1)
        assert!(!move_body(&mut b, &t, 0, 1, 3, false));
        assert_eq!(b.x, T + SNAP_TOLERANCE);
    }

    #[test]
    fn zero_direction_is_noop() {
        let g = Grid::new(3, 3, T);
        let mut b = Body::at_cell(&g, Cell::new(1, 1));
        b.x += 3;
        assert!(!try_move(&mut b, &g, 0, 0, 3, |_| false));
        assert_eq!(b.x, T + 3);
    }

    // ── occupancy ──

    #[test]
    fn living_opponents_block_each_other() {
        let g = Grid::new(5, 1, T);
        let mut opps = vec![
            Opponent::new(0, &g, Cell::new(0, 0), 2, Strategy::GreedyChase),
            Opponent::new(1, &g, Cell::new(1, 0), 2, Strategy::GreedyChase),
        ];
        let probe = Rect::new(6, 0, 36, 36);
        assert!(opponent_blocks(&opps, &probe, 0));
        assert!(!opponent_blocks(&opps, &Rect::new(0, 0, 36, 36), 0));
        opps[1].die();
        assert!(!opponent_blocks(&opps, &probe, 0));
    }
}
