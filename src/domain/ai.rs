/// Opponent AI: three interchangeable decision strategies.
///
///   1. **RandomWalk**  : keep a heading for a random number of ticks, with a
///      small per-tick chance of turning early.
///   2. **GreedyChase** : step along one axis toward the nearest living player.
///   3. **ShortestPath**: follow a cached A* path to the nearest living
///      player, replanned on a timer.
///
/// Every strategy answers the same question, "which unit direction this
/// tick?", and returns (0, 0) when it has nothing to do. Whether the move is
/// legal is the movement resolver's business, not the strategy's.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::str::FromStr;

use rand::Rng;

use super::entity::{Body, Player};
use super::grid::Cell;
use super::physics::{Terrain, SNAP_TOLERANCE};
use crate::error::GameError;

const DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Random-walk heading lasts this many ticks (inclusive range).
const WALK_MIN_STEPS: u32 = 20;
const WALK_MAX_STEPS: u32 = 50;
/// Per-tick chance of an early turn.
const WALK_TURN_CHANCE: f64 = 0.05;

/// Tunables for the path-following strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannerTuning {
    pub replan_ms: u32,
    /// Max A* node expansions per search.
    pub search_budget: usize,
}

impl Default for PlannerTuning {
    fn default() -> Self {
        PlannerTuning { replan_ms: 500, search_budget: 100 }
    }
}

/// What a strategy may look at. Read-only for the duration of the call.
pub struct Surroundings<'a> {
    pub terrain: Terrain<'a>,
    pub players: &'a [Player],
    /// Cells of the other living opponents.
    pub opponent_cells: &'a [Cell],
}

// ── Strategy kinds (config / factory names) ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StrategyKind {
    RandomWalk,
    GreedyChase,
    ShortestPath,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] =
        [StrategyKind::RandomWalk, StrategyKind::GreedyChase, StrategyKind::ShortestPath];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::RandomWalk => "random_walk",
            StrategyKind::GreedyChase => "greedy_chase",
            StrategyKind::ShortestPath => "shortest_path",
        }
    }

    /// Map glyph used by text levels.
    pub fn glyph(self) -> char {
        match self {
            StrategyKind::RandomWalk => 'r',
            StrategyKind::GreedyChase => 'c',
            StrategyKind::ShortestPath => 'a',
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        StrategyKind::ALL.into_iter().find(|k| k.glyph() == c)
    }

    pub fn build<R: Rng + ?Sized>(self, tuning: PlannerTuning, rng: &mut R) -> Strategy {
        match self {
            StrategyKind::RandomWalk => Strategy::RandomWalk(RandomWalk::new(rng)),
            StrategyKind::GreedyChase => Strategy::GreedyChase,
            StrategyKind::ShortestPath => Strategy::ShortestPath(PathFollower::new(tuning)),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = GameError;

    /// Accepts the canonical names plus the classic enemy-type aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random_walk" | "static" => Ok(StrategyKind::RandomWalk),
            "greedy_chase" | "chasing" => Ok(StrategyKind::GreedyChase),
            "shortest_path" | "intelligent" => Ok(StrategyKind::ShortestPath),
            _ => Err(GameError::unrecognized("strategy", s)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ══════════════════════════════════════════════════════════════
// Strategy
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub enum Strategy {
    RandomWalk(RandomWalk),
    GreedyChase,
    ShortestPath(PathFollower),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::RandomWalk(_) => StrategyKind::RandomWalk,
            Strategy::GreedyChase => StrategyKind::GreedyChase,
            Strategy::ShortestPath(_) => StrategyKind::ShortestPath,
        }
    }

    /// Direction for this tick.
    pub fn compute_move<R: Rng + ?Sized>(
        &mut self,
        me: &Body,
        view: &Surroundings,
        dt_ms: u32,
        rng: &mut R,
    ) -> (i32, i32) {
        match self {
            Strategy::RandomWalk(walk) => walk.next(rng),
            Strategy::GreedyChase => greedy_chase(me.cell, view.players, rng),
            Strategy::ShortestPath(follower) => follower.next(me, view, dt_ms),
        }
    }
}

/// Nearest living player by Euclidean distance; first wins ties.
pub fn nearest_living_player(from: Cell, players: &[Player]) -> Option<&Player> {
    players
        .iter()
        .filter(|p| p.is_alive())
        .min_by_key(|p| p.cell().distance_sq(from))
}

// ── Random walk ──

#[derive(Clone, Debug)]
pub struct RandomWalk {
    heading: (i32, i32),
    steps: u32,
    max_steps: u32,
}

impl RandomWalk {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        RandomWalk {
            heading: DIRS[rng.random_range(0..DIRS.len())],
            steps: 0,
            max_steps: rng.random_range(WALK_MIN_STEPS..=WALK_MAX_STEPS),
        }
    }

    fn next<R: Rng + ?Sized>(&mut self, rng: &mut R) -> (i32, i32) {
        self.steps += 1;
        if self.steps >= self.max_steps || rng.random_bool(WALK_TURN_CHANCE) {
            *self = RandomWalk::new(rng);
        }
        self.heading
    }
}

// ── Greedy chase ──

fn greedy_chase<R: Rng + ?Sized>(me: Cell, players: &[Player], rng: &mut R) -> (i32, i32) {
    let Some(target) = nearest_living_player(me, players) else {
        return (0, 0);
    };
    let dx = (target.cell().x - me.x).signum();
    let dy = (target.cell().y - me.y).signum();

    // one axis at a time, coin flip favouring horizontal
    if rng.random_bool(0.5) && dx != 0 {
        (dx, 0)
    } else if dy != 0 {
        (0, dy)
    } else if dx != 0 {
        (dx, 0)
    } else {
        (0, 0)
    }
}

// ── Shortest path (replanned) ──

#[derive(Clone, Debug)]
pub struct PathFollower {
    tuning: PlannerTuning,
    /// path[0] is the cell last reached; path[1] is the next target.
    path: VecDeque<Cell>,
    since_replan_ms: u32,
}

impl PathFollower {
    pub fn new(tuning: PlannerTuning) -> Self {
        PathFollower { tuning, path: VecDeque::new(), since_replan_ms: 0 }
    }

    pub fn cached_path(&self) -> impl Iterator<Item = &Cell> {
        self.path.iter()
    }

    fn next(&mut self, me: &Body, view: &Surroundings, dt_ms: u32) -> (i32, i32) {
        self.since_replan_ms = self.since_replan_ms.saturating_add(dt_ms);
        if self.path.is_empty() || self.since_replan_ms >= self.tuning.replan_ms {
            self.since_replan_ms = 0;
            self.path = match nearest_living_player(me.cell, view.players) {
                Some(goal) => {
                    find_path(&view.terrain, me.cell, goal.cell(), self.tuning.search_budget).into()
                }
                None => VecDeque::new(),
            };
        }
        self.follow(me, &view.terrain)
    }

    fn follow(&mut self, me: &Body, terrain: &Terrain) -> (i32, i32) {
        while self.path.len() > 1 && self.path[1] == me.cell {
            self.path.pop_front();
        }
        let Some(&next) = self.path.get(1) else {
            return (0, 0);
        };

        let (tx, ty) = terrain.grid.origin(next);
        let step_x = (next.x - me.cell.x).signum();
        let step_y = (next.y - me.cell.y).signum();

        // Line up on the perpendicular axis first if snapping won't do it.
        if step_x != 0 {
            let off = ty - me.y;
            if off.abs() >= SNAP_TOLERANCE {
                return (0, off.signum());
            }
            return (step_x, 0);
        }
        if step_y != 0 {
            let off = tx - me.x;
            if off.abs() >= SNAP_TOLERANCE {
                return (off.signum(), 0);
            }
            return (0, step_y);
        }
        (0, 0)
    }
}

// ══════════════════════════════════════════════════════════════
// A* search
// ══════════════════════════════════════════════════════════════

/// A* over the 4-neighbourhood with a Manhattan heuristic.
///
/// Walls are impassable and the search stays inside the live grid bounds.
/// Frontier ties on f-score go to whichever node was pushed first. At most
/// `budget` nodes are expanded.
///
/// Returns the path including `start` and `goal`, or an empty Vec when the
/// goal is unreachable or the budget runs out. `start == goal` yields `[start]`.
pub fn find_path(terrain: &Terrain, start: Cell, goal: Cell, budget: usize) -> Vec<Cell> {
    let grid = terrain.grid;
    let (Some(start_idx), Some(_)) = (grid.index(start), grid.index(goal)) else {
        return Vec::new();
    };

    let n = grid.cell_count();
    let mut g_score = vec![i32::MAX; n];
    let mut came_from: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut open: BinaryHeap<Reverse<(i32, u64, usize)>> = BinaryHeap::new();
    let mut seq: u64 = 0;

    g_score[start_idx] = 0;
    open.push(Reverse((start.manhattan(goal), seq, start_idx)));

    let cell_at = |idx: usize| Cell::new(idx as i32 % grid.width, idx as i32 / grid.width);
    let mut expansions = 0;

    while let Some(Reverse((_, _, idx))) = open.pop() {
        if closed[idx] {
            continue; // stale entry
        }
        if expansions >= budget {
            log::trace!("path search {start:?} -> {goal:?} exhausted budget {budget}");
            return Vec::new();
        }
        expansions += 1;

        let current = cell_at(idx);
        if current == goal {
            let mut path = vec![current];
            let mut at = idx;
            while let Some(prev) = came_from[at] {
                path.push(cell_at(prev));
                at = prev;
            }
            path.reverse();
            return path;
        }
        closed[idx] = true;

        for &(dx, dy) in &DIRS {
            let neighbor = current.offset(dx, dy);
            let Some(nidx) = grid.index(neighbor) else { continue };
            if closed[nidx] || !terrain.is_open(neighbor) {
                continue;
            }
            let tentative = g_score[idx] + 1;
            if tentative < g_score[nidx] {
                g_score[nidx] = tentative;
                came_from[nidx] = Some(idx);
                seq += 1;
                open.push(Reverse((tentative + neighbor.manhattan(goal), seq, nidx)));
            }
        }
    }
    Vec::new()
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::Grid;
    use crate::domain::physics::build_wall_grid;
    use crate::domain::powerup::PlayerStats;
    use crate::domain::tile::{Wall, WallKind};
    use proptest::prelude::*;
    use super::Strategy;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn walls_from(rows: &[&str]) -> (Grid, Vec<Wall>, Vec<Option<usize>>) {
        let grid = Grid::new(rows[0].len() as i32, rows.len() as i32, 40);
        let mut walls = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    walls.push(Wall::new(WallKind::Unbreakable, Cell::new(x as i32, y as i32)));
                }
            }
        }
        let wg = build_wall_grid(&walls, &grid);
        (grid, walls, wg)
    }

    fn player_at(g: &Grid, x: i32, y: i32) -> Player {
        Player::new(1, g, Cell::new(x, y), PlayerStats { speed: 3, max_bombs: 1, power: 1, wall_pass: false })
    }

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(7)
    }

    // ── find_path ──

    #[test]
    fn path_around_wall() {
        let (g, walls, wg) = walls_from(&[
            ".....",
            ".###.",
            ".....",
        ]);
        let t = Terrain::new(&g, &walls, &wg);
        let path = find_path(&t, Cell::new(0, 1), Cell::new(4, 1), 100);
        assert_eq!(path.first(), Some(&Cell::new(0, 1)));
        assert_eq!(path.last(), Some(&Cell::new(4, 1)));
        assert_eq!(path.len(), 7);
        assert!(path.iter().all(|c| t.is_open(*c)));
    }

    #[test]
    fn path_to_self_is_single_cell() {
        let (g, walls, wg) = walls_from(&["..."]);
        let t = Terrain::new(&g, &walls, &wg);
        assert_eq!(find_path(&t, Cell::new(1, 0), Cell::new(1, 0), 100), vec![Cell::new(1, 0)]);
    }

    #[test]
    fn unreachable_goal_gives_empty_path() {
        let (g, walls, wg) = walls_from(&["..#.."]);
        let t = Terrain::new(&g, &walls, &wg);
        assert!(find_path(&t, Cell::new(0, 0), Cell::new(4, 0), 100).is_empty());
    }

    #[test]
    fn budget_exhaustion_gives_empty_path() {
        let (g, walls, wg) = walls_from(&["...................."]);
        let t = Terrain::new(&g, &walls, &wg);
        assert!(find_path(&t, Cell::new(0, 0), Cell::new(19, 0), 5).is_empty());
        assert_eq!(find_path(&t, Cell::new(0, 0), Cell::new(19, 0), 100).len(), 20);
    }

    #[test]
    fn search_uses_live_bounds_beyond_twenty_columns() {
        let row = ".".repeat(30);
        let (g, walls, wg) = walls_from(&[row.as_str()]);
        let t = Terrain::new(&g, &walls, &wg);
        let path = find_path(&t, Cell::new(20, 0), Cell::new(29, 0), 100);
        assert_eq!(path.len(), 10);
    }

    proptest! {
        #[test]
        fn found_paths_are_contiguous_and_wall_free(
            cells in prop::collection::vec(prop::bool::weighted(0.25), 49),
            sx in 0i32..7, sy in 0i32..7, gx in 0i32..7, gy in 0i32..7,
        ) {
            let grid = Grid::new(7, 7, 40);
            let start = Cell::new(sx, sy);
            let goal = Cell::new(gx, gy);
            let walls: Vec<Wall> = cells
                .iter()
                .enumerate()
                .filter(|(_, w)| **w)
                .map(|(i, _)| Cell::new(i as i32 % 7, i as i32 / 7))
                .filter(|c| *c != start && *c != goal)
                .map(|c| Wall::new(WallKind::Breakable, c))
                .collect();
            let wg = build_wall_grid(&walls, &grid);
            let t = Terrain::new(&grid, &walls, &wg);

            let path = find_path(&t, start, goal, 100);
            if !path.is_empty() {
                prop_assert_eq!(path[0], start);
                prop_assert_eq!(*path.last().unwrap(), goal);
                for pair in path.windows(2) {
                    prop_assert!(pair[0].is_adjacent(pair[1]));
                }
                for c in &path {
                    prop_assert!(t.is_open(*c));
                }
            }
        }
    }

    // ── strategies ──

    #[test]
    fn no_living_player_means_no_movement() {
        let (g, walls, wg) = walls_from(&[".....", "....."]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut dead = player_at(&g, 4, 1);
        dead.take_damage();
        let players = vec![dead];
        let view = Surroundings { terrain: t, players: &players, opponent_cells: &[] };
        let me = Body::at_cell(&g, Cell::new(0, 0));
        let mut r = rng();

        let mut chase = Strategy::GreedyChase;
        let mut path = Strategy::ShortestPath(PathFollower::new(PlannerTuning::default()));
        for _ in 0..10 {
            assert_eq!(chase.compute_move(&me, &view, 16, &mut r), (0, 0));
            assert_eq!(path.compute_move(&me, &view, 16, &mut r), (0, 0));
        }
    }

    #[test]
    fn greedy_chase_moves_along_one_axis_toward_target() {
        let (g, walls, wg) = walls_from(&[".....", ".....", "....."]);
        let t = Terrain::new(&g, &walls, &wg);
        let players = vec![player_at(&g, 3, 2)];
        let view = Surroundings { terrain: t, players: &players, opponent_cells: &[] };
        let me = Body::at_cell(&g, Cell::new(0, 0));
        let mut r = rng();
        let mut s = Strategy::GreedyChase;
        for _ in 0..50 {
            let d = s.compute_move(&me, &view, 16, &mut r);
            assert!(d == (1, 0) || d == (0, 1), "{d:?}");
        }
    }

    #[test]
    fn greedy_chase_picks_nearest_living_player() {
        let (g, walls, wg) = walls_from(&["......."]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut near = player_at(&g, 2, 0);
        near.take_damage();
        let players = vec![near, player_at(&g, 0, 0)];
        let view = Surroundings { terrain: t, players: &players, opponent_cells: &[] };
        let me = Body::at_cell(&g, Cell::new(3, 0));
        let mut r = rng();
        let mut s = Strategy::GreedyChase;
        assert_eq!(s.compute_move(&me, &view, 16, &mut r), (-1, 0));
    }

    #[test]
    fn random_walk_always_returns_unit_direction() {
        let mut r = rng();
        let mut walk = RandomWalk::new(&mut r);
        for _ in 0..500 {
            let (dx, dy) = walk.next(&mut r);
            assert_eq!(dx.abs() + dy.abs(), 1);
        }
    }

    #[test]
    fn path_follower_heads_to_next_cell_and_pops_on_arrival() {
        let (g, walls, wg) = walls_from(&["....."]);
        let t = Terrain::new(&g, &walls, &wg);
        let players = vec![player_at(&g, 4, 0)];
        let view = Surroundings { terrain: t, players: &players, opponent_cells: &[] };
        let mut r = rng();
        let mut s = Strategy::ShortestPath(PathFollower::new(PlannerTuning::default()));

        let mut me = Body::at_cell(&g, Cell::new(0, 0));
        assert_eq!(s.compute_move(&me, &view, 16, &mut r), (1, 0));

        me.place_at(&g, Cell::new(1, 0));
        assert_eq!(s.compute_move(&me, &view, 16, &mut r), (1, 0));
        if let Strategy::ShortestPath(f) = &s {
            assert_eq!(f.cached_path().next(), Some(&Cell::new(1, 0)));
        }
    }

    #[test]
    fn path_follower_lines_up_before_turning() {
        let (g, walls, wg) = walls_from(&["...", "#.#", "..."]);
        let t = Terrain::new(&g, &walls, &wg);
        let players = vec![player_at(&g, 1, 2)];
        let view = Surroundings { terrain: t, players: &players, opponent_cells: &[] };
        let mut r = rng();
        let mut s = Strategy::ShortestPath(PathFollower::new(PlannerTuning::default()));

        // in cell (1,0) but 20px right of its origin
        let mut me = Body::at_cell(&g, Cell::new(1, 0));
        me.x += 20;
        assert_eq!(s.compute_move(&me, &view, 16, &mut r), (-1, 0));
        me.x -= 15;
        assert_eq!(s.compute_move(&me, &view, 16, &mut r), (0, 1));
    }

    #[test]
    fn replans_after_interval() {
        let (g, walls, wg) = walls_from(&["....."]);
        let t = Terrain::new(&g, &walls, &wg);
        let mut r = rng();
        let tuning = PlannerTuning { replan_ms: 500, search_budget: 100 };
        let mut s = Strategy::ShortestPath(PathFollower::new(tuning));
        let me = Body::at_cell(&g, Cell::new(2, 0));

        let right = vec![player_at(&g, 4, 0)];
        let view = Surroundings { terrain: t, players: &right, opponent_cells: &[] };
        assert_eq!(s.compute_move(&me, &view, 16, &mut r), (1, 0));

        // target jumps to the other side; cached path still points right
        let left = vec![player_at(&g, 0, 0)];
        let view = Surroundings { terrain: t, players: &left, opponent_cells: &[] };
        assert_eq!(s.compute_move(&me, &view, 100, &mut r), (1, 0));
        assert_eq!(s.compute_move(&me, &view, 400, &mut r), (-1, 0));
    }

    #[test]
    fn strategy_names_and_aliases() {
        assert_eq!("intelligent".parse::<StrategyKind>().ok(), Some(StrategyKind::ShortestPath));
        assert_eq!("Greedy_Chase".parse::<StrategyKind>().ok(), Some(StrategyKind::GreedyChase));
        assert!("teleport".parse::<StrategyKind>().is_err());
        for k in StrategyKind::ALL {
            assert_eq!(StrategyKind::from_glyph(k.glyph()), Some(k));
            assert_eq!(k.build(PlannerTuning::default(), &mut rng()).kind(), k);
        }
    }
}
