/// Entities: Player, Opponent, Bomb, Explosion, PowerUp.
///
/// Every mover carries a `Body`: a pixel position for smooth movement and
/// collision, plus the cell it currently occupies (recomputed on every
/// accepted move by integer division).

use serde::{Deserialize, Serialize};

use super::ai::Strategy;
use super::grid::{Cell, Grid, Rect};
use super::powerup::{PlayerStats, PowerUpKind};
use super::state::{Damage, LifeState};

/// Mover collision boxes are this many pixels smaller than a tile.
pub const BODY_INSET: i32 = 4;
/// Pickup collision boxes are inset this much on every side.
pub const PICKUP_INSET: i32 = 5;
/// Explosion animation frames over its lifetime.
pub const EXPLOSION_FRAMES: u32 = 8;
/// Bomb blink half-period.
pub const BOMB_BLINK_MS: u32 = 200;

pub type PlayerId = u8;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Facing implied by a movement delta. `None` for (0, 0).
    pub fn from_delta(dx: i32, dy: i32) -> Option<Facing> {
        if dx > 0 {
            Some(Facing::Right)
        } else if dx < 0 {
            Some(Facing::Left)
        } else if dy > 0 {
            Some(Facing::Down)
        } else if dy < 0 {
            Some(Facing::Up)
        } else {
            None
        }
    }
}

/// Movement direction (continuous while key held)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
        }
    }
}

/// Frame input for one local player: movement is continuous (held key),
/// bomb is edge-triggered (fresh press).
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<MoveDir>,
    pub bomb: bool,
}

// ══════════════════════════════════════════════════════════════
// Body
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Body {
    /// Pixel position of the collision box's top-left corner.
    pub x: i32,
    pub y: i32,
    /// Collision box side length.
    pub size: i32,
    pub cell: Cell,
}

impl Body {
    /// Body aligned to a cell origin.
    pub fn at_cell(grid: &Grid, cell: Cell) -> Self {
        let (x, y) = grid.origin(cell);
        Body { x, y, size: grid.tile_size - BODY_INSET, cell }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    /// Teleport to a cell origin (spawn, remote update).
    pub fn place_at(&mut self, grid: &Grid, cell: Cell) {
        let (x, y) = grid.origin(cell);
        self.x = x;
        self.y = y;
        self.cell = cell;
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub body: Body,
    pub stats: PlayerStats,
    pub bombs_placed: u32,
    pub facing: Facing,
    pub state: LifeState,
    /// Driven by inbound network events instead of local input.
    pub remote: bool,
}

impl Player {
    pub fn new(id: PlayerId, grid: &Grid, cell: Cell, stats: PlayerStats) -> Self {
        Player {
            id,
            name: format!("P{id}"),
            body: Body::at_cell(grid, cell),
            stats,
            bombs_placed: 0,
            facing: Facing::Down,
            state: LifeState::Normal,
            remote: false,
        }
    }

    pub fn cell(&self) -> Cell {
        self.body.cell
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }

    pub fn can_place_bomb(&self) -> bool {
        self.is_alive() && self.bombs_placed < self.stats.max_bombs
    }

    /// One of this player's bombs went off.
    pub fn bomb_exploded(&mut self) {
        self.bombs_placed = self.bombs_placed.saturating_sub(1);
    }

    pub fn take_damage(&mut self) -> Damage {
        self.state.take_damage()
    }
}

// ══════════════════════════════════════════════════════════════
// Opponent
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Opponent {
    pub id: u32,
    pub body: Body,
    pub speed: i32,
    pub strategy: Strategy,
    pub alive: bool,
}

impl Opponent {
    pub fn new(id: u32, grid: &Grid, cell: Cell, speed: i32, strategy: Strategy) -> Self {
        Opponent { id, body: Body::at_cell(grid, cell), speed, strategy, alive: true }
    }

    pub fn cell(&self) -> Cell {
        self.body.cell
    }

    /// Swap the decision strategy; nothing else about the opponent changes.
    pub fn set_strategy(&mut self, strategy: Strategy) {
        log::debug!(
            "opponent {} strategy {} -> {}",
            self.id,
            self.strategy.kind().name(),
            strategy.kind().name()
        );
        self.strategy = strategy;
    }

    pub fn die(&mut self) -> bool {
        let was_alive = self.alive;
        self.alive = false;
        was_alive
    }
}

// ══════════════════════════════════════════════════════════════
// Bomb
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Bomb {
    pub id: u32,
    pub owner: PlayerId,
    pub cell: Cell,
    pub power: u32,
    pub fuse_remaining_ms: u32,
    fuse_total_ms: u32,
    exploded: bool,
}

impl Bomb {
    pub fn new(id: u32, owner: PlayerId, cell: Cell, power: u32, fuse_ms: u32) -> Self {
        Bomb {
            id,
            owner,
            cell,
            power,
            fuse_remaining_ms: fuse_ms,
            fuse_total_ms: fuse_ms,
            exploded: false,
        }
    }

    /// Count the fuse down. Returns true exactly once, on the tick it blows.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        if self.exploded {
            return false;
        }
        self.fuse_remaining_ms = self.fuse_remaining_ms.saturating_sub(dt_ms);
        if self.fuse_remaining_ms == 0 {
            self.exploded = true;
            return true;
        }
        false
    }

    pub fn is_exploded(&self) -> bool {
        self.exploded
    }

    /// Remaining fuse 1.0 (just placed) → 0.0.
    pub fn fuse_fraction(&self) -> f32 {
        if self.fuse_total_ms == 0 {
            return 0.0;
        }
        self.fuse_remaining_ms as f32 / self.fuse_total_ms as f32
    }

    /// Blink phase for renderers.
    pub fn blink_visible(&self) -> bool {
        let elapsed = self.fuse_total_ms - self.fuse_remaining_ms;
        (elapsed / BOMB_BLINK_MS) % 2 == 0
    }
}

// ══════════════════════════════════════════════════════════════
// Explosion
// ══════════════════════════════════════════════════════════════

/// Which ray of a blast an explosion cell belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BlastDir {
    Center,
    Up,
    Down,
    Left,
    Right,
}

impl BlastDir {
    /// Rays in propagation order.
    pub const RAYS: [BlastDir; 4] = [BlastDir::Up, BlastDir::Down, BlastDir::Left, BlastDir::Right];

    pub fn delta(self) -> (i32, i32) {
        match self {
            BlastDir::Center => (0, 0),
            BlastDir::Up => (0, -1),
            BlastDir::Down => (0, 1),
            BlastDir::Left => (-1, 0),
            BlastDir::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, BlastDir::Left | BlastDir::Right)
    }
}

#[derive(Clone, Debug)]
pub struct Explosion {
    pub cell: Cell,
    pub dir: BlastDir,
    pub remaining_ms: u32,
    lifetime_ms: u32,
}

impl Explosion {
    pub fn new(cell: Cell, dir: BlastDir, lifetime_ms: u32) -> Self {
        Explosion { cell, dir, remaining_ms: lifetime_ms, lifetime_ms }
    }

    /// Returns true once the explosion has burned out.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        self.remaining_ms = self.remaining_ms.saturating_sub(dt_ms);
        self.remaining_ms == 0
    }

    /// Animation frame 0..EXPLOSION_FRAMES.
    pub fn frame(&self) -> u32 {
        if self.lifetime_ms == 0 {
            return EXPLOSION_FRAMES - 1;
        }
        let elapsed = (self.lifetime_ms - self.remaining_ms) as u64;
        ((elapsed * EXPLOSION_FRAMES as u64 / self.lifetime_ms as u64) as u32).min(EXPLOSION_FRAMES - 1)
    }
}

// ══════════════════════════════════════════════════════════════
// PowerUp
// ══════════════════════════════════════════════════════════════

const FLOAT_AMPLITUDE: f32 = 5.0;

#[derive(Clone, Debug)]
pub struct PowerUp {
    pub cell: Cell,
    pub kind: PowerUpKind,
    collected: bool,
    /// Cosmetic vertical bob in pixels.
    pub float_offset: f32,
    float_speed: f32,
}

impl PowerUp {
    pub fn new(kind: PowerUpKind, cell: Cell) -> Self {
        PowerUp { cell, kind, collected: false, float_offset: 0.0, float_speed: 2.0 }
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn rect(&self, grid: &Grid) -> Rect {
        let (x, y) = grid.origin(self.cell);
        Rect::new(
            x + PICKUP_INSET,
            y + PICKUP_INSET,
            grid.tile_size - 2 * PICKUP_INSET,
            grid.tile_size - 2 * PICKUP_INSET,
        )
    }

    /// Apply the effect to `player` once. Later calls are no-ops.
    pub fn collect(&mut self, player: &mut Player) -> bool {
        if self.collected || !player.is_alive() {
            return false;
        }
        self.collected = true;
        self.kind.apply(&mut player.stats);
        true
    }

    /// Float animation.
    pub fn animate(&mut self, dt_ms: u32) {
        self.float_offset += self.float_speed * (dt_ms as f32 / 100.0);
        if self.float_offset.abs() > FLOAT_AMPLITUDE {
            self.float_offset = self.float_offset.clamp(-FLOAT_AMPLITUDE, FLOAT_AMPLITUDE);
            self.float_speed = -self.float_speed;
        }
    }
}
