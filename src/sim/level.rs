/// Level sources: the generated arena and text maps.
///
/// Both produce a `Layout`, a plain description of what goes where. The
/// world turns a layout into live entities (`WorldState::from_layout`).
///
/// ## Generated arena
///   - Unbreakable border, Unbreakable pillars on every even (x, y) inside.
///   - 30 random placement attempts, each picking Breakable / Breakable /
///     Hard, skipping occupied cells and the spawn safe-zones.
///   - Five starting pickups at fixed cells, when those cells are free.
///   - Players at (1,1) and (w-2,h-2); opponents at (w/2,1), (w-3,h/2) and
///     (3,h-3), nudged to the nearest open cell if a wall landed there.
///
/// ## Text map legend:
///   '#' = Unbreakable wall        '+' = Breakable wall
///   '%' = Hard wall               '1'..'4' = Player spawn
///   'r' = Random-walk opponent    'c' = Greedy-chase opponent
///   'a' = Shortest-path opponent
///   'b' 'p' 's' 'k' 'w' = Pickup (bomb count, power, speed, skateboard,
///                         wall pass)
///   '.' or ' ' = Empty
///
/// Lines starting with `;` are comments. Rows may be shorter than the
/// widest row; missing cells are empty.

use std::collections::HashSet;
use std::path::Path;

use rand::Rng;

use crate::config::GameConfig;
use crate::domain::ai::StrategyKind;
use crate::domain::grid::Cell;
use crate::domain::powerup::PowerUpKind;
use crate::domain::tile::{Wall, WallKind};
use crate::error::{GameError, Result};

const RANDOM_WALL_ATTEMPTS: usize = 30;
const MAX_PLAYERS: usize = 4;

/// Everything a level places, before it becomes live entities.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub width: i32,
    pub height: i32,
    pub walls: Vec<Wall>,
    /// Index `i` is the spawn of player `i + 1`.
    pub player_spawns: Vec<Cell>,
    /// `None` means "take the next configured strategy".
    pub opponents: Vec<(Cell, Option<StrategyKind>)>,
    pub pickups: Vec<(Cell, PowerUpKind)>,
}

impl Layout {
    fn occupied(&self) -> HashSet<Cell> {
        self.walls.iter().map(|w| w.cell).collect()
    }
}

// ══════════════════════════════════════════════════════════════
// Generated arena
// ══════════════════════════════════════════════════════════════

pub fn generate_arena<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Layout {
    let w = config.grid.width;
    let h = config.grid.height;
    let mut layout = Layout { width: w, height: h, ..Layout::default() };

    // Border
    for x in 0..w {
        layout.walls.push(Wall::new(WallKind::Unbreakable, Cell::new(x, 0)));
        layout.walls.push(Wall::new(WallKind::Unbreakable, Cell::new(x, h - 1)));
    }
    for y in 1..h - 1 {
        layout.walls.push(Wall::new(WallKind::Unbreakable, Cell::new(0, y)));
        layout.walls.push(Wall::new(WallKind::Unbreakable, Cell::new(w - 1, y)));
    }

    // Pillars
    for x in (2..w - 2).step_by(2) {
        for y in (2..h - 2).step_by(2) {
            layout.walls.push(Wall::new(WallKind::Unbreakable, Cell::new(x, y)));
        }
    }

    let player_spawns = [Cell::new(1, 1), Cell::new(w - 2, h - 2)];
    let safe: HashSet<Cell> = player_spawns
        .iter()
        .flat_map(|&c| {
            let toward = if c.x == 1 { 1 } else { -1 };
            [c, c.offset(0, toward), c.offset(toward, 0)]
        })
        .collect();

    let mut occupied = layout.occupied();
    for _ in 0..RANDOM_WALL_ATTEMPTS {
        let cell = Cell::new(rng.random_range(1..=w - 2), rng.random_range(1..=h - 2));
        if safe.contains(&cell) || occupied.contains(&cell) {
            continue;
        }
        let kind = match rng.random_range(0..3) {
            0 | 1 => WallKind::Breakable,
            _ => WallKind::Hard,
        };
        layout.walls.push(Wall::new(kind, cell));
        occupied.insert(cell);
    }

    let starting_pickups = [
        (Cell::new(3, 4), PowerUpKind::SpeedBoost),
        (Cell::new(5, 3), PowerUpKind::BombCount),
        (Cell::new(w - 4, 4), PowerUpKind::BombPower),
        (Cell::new(3, h - 4), PowerUpKind::BombCount),
        (Cell::new(w - 4, h - 4), PowerUpKind::SpeedBoost),
    ];
    for (cell, kind) in starting_pickups {
        let inside = cell.x > 0 && cell.y > 0 && cell.x < w - 1 && cell.y < h - 1;
        if inside && !occupied.contains(&cell) {
            layout.pickups.push((cell, kind));
        }
    }

    layout.player_spawns = player_spawns.to_vec();

    let opponent_spawns = [Cell::new(w / 2, 1), Cell::new(w - 3, h / 2), Cell::new(3, h - 3)];
    let mut taken: HashSet<Cell> = safe;
    for spawn in opponent_spawns {
        if let Some(cell) = nearest_open(spawn, w, h, &occupied, &taken) {
            taken.insert(cell);
            layout.opponents.push((cell, None));
        }
    }

    log::debug!(
        "generated {}x{} arena: {} walls, {} pickups",
        w,
        h,
        layout.walls.len(),
        layout.pickups.len()
    );
    layout
}

/// Closest interior cell to `want` (Manhattan, row-major on ties) that holds
/// no wall and isn't already taken.
fn nearest_open(want: Cell, w: i32, h: i32, walls: &HashSet<Cell>, taken: &HashSet<Cell>) -> Option<Cell> {
    (1..h - 1)
        .flat_map(|y| (1..w - 1).map(move |x| Cell::new(x, y)))
        .filter(|c| !walls.contains(c) && !taken.contains(c))
        .min_by_key(|c| c.manhattan(want))
}

// ══════════════════════════════════════════════════════════════
// Text maps
// ══════════════════════════════════════════════════════════════

pub fn parse_map(text: &str) -> Result<Layout> {
    let rows: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.starts_with(';'))
        .collect();
    let rows: Vec<&str> = trim_blank_edges(&rows);

    if rows.is_empty() {
        return Err(GameError::InvalidMap("map has no rows".into()));
    }
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as i32;
    let height = rows.len() as i32;
    if width < 3 || height < 3 {
        return Err(GameError::InvalidMap(format!("map must be at least 3x3, got {width}x{height}")));
    }

    let mut layout = Layout { width, height, ..Layout::default() };
    let mut spawns: [Option<Cell>; MAX_PLAYERS] = [None; MAX_PLAYERS];

    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let cell = Cell::new(x as i32, y as i32);
            match ch {
                '.' | ' ' => {}
                '#' => layout.walls.push(Wall::new(WallKind::Unbreakable, cell)),
                '+' => layout.walls.push(Wall::new(WallKind::Breakable, cell)),
                '%' => layout.walls.push(Wall::new(WallKind::Hard, cell)),
                '1'..='4' => {
                    let slot = ch as usize - '1' as usize;
                    if spawns[slot].replace(cell).is_some() {
                        return Err(GameError::InvalidMap(format!("player {ch} spawns twice")));
                    }
                }
                _ => {
                    if let Some(kind) = StrategyKind::from_glyph(ch) {
                        layout.opponents.push((cell, Some(kind)));
                    } else if let Some(kind) = PowerUpKind::from_symbol(ch) {
                        layout.pickups.push((cell, kind));
                    } else {
                        return Err(GameError::InvalidMap(format!("unknown glyph {ch:?} at ({x}, {y})")));
                    }
                }
            }
        }
    }

    // Spawns must be numbered without gaps: 1, 1-2, 1-3 or 1-4.
    let count = spawns.iter().take_while(|s| s.is_some()).count();
    if count == 0 {
        return Err(GameError::InvalidMap("no player spawn".into()));
    }
    if spawns[count..].iter().any(Option::is_some) {
        return Err(GameError::InvalidMap("player spawns must be numbered from 1 without gaps".into()));
    }
    layout.player_spawns = spawns.iter().flatten().copied().collect();
    Ok(layout)
}

/// Read and parse a map file.
pub fn load_map(path: &Path) -> Result<Layout> {
    let text = std::fs::read_to_string(path)?;
    let layout = parse_map(&text)?;
    log::info!("loaded map {} ({}x{})", path.display(), layout.width, layout.height);
    Ok(layout)
}

/// Map file from config when it loads, generated arena otherwise.
pub fn layout_for<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Layout {
    if let Some(path) = &config.general.map {
        match load_map(path) {
            Ok(layout) => return layout,
            Err(e) => log::warn!("map {}: {e}; generating an arena instead", path.display()),
        }
    }
    generate_arena(config, rng)
}

fn trim_blank_edges<'a>(rows: &[&'a str]) -> Vec<&'a str> {
    let first = rows.iter().position(|r| !r.trim().is_empty());
    let last = rows.iter().rposition(|r| !r.trim().is_empty());
    match (first, last) {
        (Some(a), Some(b)) => rows[a..=b].to_vec(),
        _ => Vec::new(),
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
