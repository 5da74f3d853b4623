/// WorldState: the complete state of a running match.
///
/// ## Ownership
///
/// The tick driver (`step`) is the only code that mutates the entity
/// collections. Strategies and life states live inside the entity they
/// belong to and are reached through it, never aliased elsewhere.
///
/// ## Walls
///
/// Walls are never removed from `walls`; a destroyed wall keeps its slot
/// with the destroyed flag set. `wall_grid` therefore stays valid for the
/// whole match and is built exactly once, in `from_layout`.
///
/// ## Randomness
///
/// One seeded `Pcg32` drives every random decision (arena layout, strategy
/// rolls, pickup drops), so a match is reproducible from its seed.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::domain::ai::StrategyKind;
use crate::domain::entity::{Bomb, Explosion, Opponent, Player, PlayerId, PowerUp};
use crate::domain::grid::{Cell, Grid};
use crate::domain::physics::{self, Terrain};
use crate::domain::tile::Wall;
use crate::error::{GameError, Result};

use super::event::{EventListener, GameEvent};
use super::level::Layout;

pub const WALL_POINTS: u32 = 10;
pub const OPPONENT_POINTS: u32 = 50;
pub const PICKUP_POINTS: u32 = 25;

/// Who is in the match, which decides how the outcome is judged.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// One local player against opponents.
    Solo,
    /// Several local players, opponents included; last one standing wins.
    Versus,
    /// Two players, one driven over the network. No opponents.
    Online { remote: PlayerId },
}

impl Mode {
    pub fn player_count(self) -> usize {
        match self {
            Mode::Solo => 1,
            Mode::Versus | Mode::Online { .. } => 2,
        }
    }

    pub fn has_opponents(self) -> bool {
        !matches!(self, Mode::Online { .. })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Outcome {
    Won { winner: PlayerId },
    /// Solo player died.
    Lost,
    /// Every player died on the same tick.
    Draw,
}

impl Outcome {
    pub fn is_win_for(self, id: PlayerId) -> bool {
        matches!(self, Outcome::Won { winner } if winner == id)
    }
}

// ── Scoreboard ──

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub bombs_placed: u32,
    pub walls_destroyed: u32,
    pub powerups_collected: u32,
    pub opponents_killed: u32,
    pub deaths: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub score: u32,
    pub stats: MatchStats,
}

/// Per-player score and statistics, fed from the event stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    records: BTreeMap<PlayerId, PlayerRecord>,
}

impl Scoreboard {
    pub fn record(&self, id: PlayerId) -> PlayerRecord {
        self.records.get(&id).copied().unwrap_or_default()
    }

    pub fn total_score(&self) -> u32 {
        self.records.values().map(|r| r.score).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &PlayerRecord)> {
        self.records.iter().map(|(id, r)| (*id, r))
    }

    fn entry(&mut self, id: PlayerId) -> &mut PlayerRecord {
        self.records.entry(id).or_default()
    }
}

impl EventListener for Scoreboard {
    fn on_event(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::BombPlaced { owner, .. } => self.entry(owner).stats.bombs_placed += 1,
            GameEvent::WallDestroyed { by, .. } => {
                let r = self.entry(by);
                r.score += WALL_POINTS;
                r.stats.walls_destroyed += 1;
            }
            GameEvent::OpponentDied { by: Some(by), .. } => {
                let r = self.entry(by);
                r.score += OPPONENT_POINTS;
                r.stats.opponents_killed += 1;
            }
            GameEvent::PowerUpCollected { player, .. } => {
                let r = self.entry(player);
                r.score += PICKUP_POINTS;
                r.stats.powerups_collected += 1;
            }
            GameEvent::PlayerDied { player, .. } => self.entry(player).stats.deaths += 1,
            _ => {}
        }
    }
}

// ══════════════════════════════════════════════════════════════
// WorldState
// ══════════════════════════════════════════════════════════════

pub struct WorldState {
    pub config: GameConfig,
    pub mode: Mode,
    pub grid: Grid,

    // ── Terrain ──
    pub walls: Vec<Wall>,
    /// `wall_grid[row * width + col]` → index into `walls`.
    pub wall_grid: Vec<Option<usize>>,

    // ── Entities ──
    pub players: Vec<Player>,
    pub opponents: Vec<Opponent>,
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<Explosion>,
    pub powerups: Vec<PowerUp>,

    // ── Match tracking ──
    pub scoreboard: Scoreboard,
    pub outcome: Option<Outcome>,
    pub tick: u64,
    pub elapsed_ms: u64,

    pub rng: Pcg32,
    next_bomb_id: u32,
}

impl WorldState {
    /// Populate a world from a layout. The layout must provide a spawn for
    /// every player `mode` needs.
    pub fn from_layout(config: GameConfig, mode: Mode, layout: Layout, mut rng: Pcg32) -> Result<Self> {
        let grid = Grid::new(layout.width, layout.height, config.grid.tile_size);
        let needed = mode.player_count();
        if layout.player_spawns.len() < needed {
            return Err(GameError::InvalidMap(format!(
                "{needed} player spawns needed, map has {}",
                layout.player_spawns.len()
            )));
        }

        let stats = config.starting_stats();
        let mut players: Vec<Player> = layout
            .player_spawns
            .iter()
            .take(needed)
            .enumerate()
            .map(|(i, &cell)| Player::new(i as PlayerId + 1, &grid, cell, stats))
            .collect();
        if let Mode::Online { remote } = mode {
            for p in players.iter_mut().filter(|p| p.id == remote) {
                p.remote = true;
            }
        }

        let mut opponents = Vec::new();
        if mode.has_opponents() {
            let strategies = &config.opponent.strategies;
            for (i, &(cell, kind)) in layout.opponents.iter().enumerate() {
                let kind = kind
                    .or_else(|| strategies.get(i % strategies.len().max(1)).copied())
                    .unwrap_or(StrategyKind::RandomWalk);
                let strategy = kind.build(config.opponent.tuning, &mut rng);
                opponents.push(Opponent::new(i as u32 + 1, &grid, cell, config.opponent.speed, strategy));
            }
        }

        let powerups = layout.pickups.iter().map(|&(cell, kind)| PowerUp::new(kind, cell)).collect();
        let wall_grid = physics::build_wall_grid(&layout.walls, &grid);

        log::info!(
            "match ready: {}x{} grid, {} walls, {} players, {} opponents, mode {:?}",
            grid.width,
            grid.height,
            layout.walls.len(),
            players.len(),
            opponents.len(),
            mode
        );

        Ok(WorldState {
            config,
            mode,
            grid,
            walls: layout.walls,
            wall_grid,
            players,
            opponents,
            bombs: Vec::new(),
            explosions: Vec::new(),
            powerups,
            scoreboard: Scoreboard::default(),
            outcome: None,
            tick: 0,
            elapsed_ms: 0,
            rng,
            next_bomb_id: 1,
        })
    }

    /// Seeded RNG from config, or OS entropy when no seed is set.
    pub fn make_rng(config: &GameConfig) -> Pcg32 {
        match config.general.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_os_rng(),
        }
    }

    pub fn terrain(&self) -> Terrain<'_> {
        Terrain::new(&self.grid, &self.walls, &self.wall_grid)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn living_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    pub fn living_opponents(&self) -> usize {
        self.opponents.iter().filter(|o| o.alive).count()
    }

    pub fn bomb_at(&self, cell: Cell) -> bool {
        self.bombs.iter().any(|b| b.cell == cell && !b.is_exploded())
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// External trigger: make a player invincible for the configured time.
    /// Only honoured from Normal.
    pub fn trigger_invincible(&mut self, id: PlayerId) -> bool {
        let ms = self.config.player.invincible_ms;
        self.players.iter_mut().find(|p| p.id == id).is_some_and(|p| p.state.make_invincible(ms))
    }

    /// External trigger: stun a player for the configured time.
    pub fn trigger_stun(&mut self, id: PlayerId) -> bool {
        let ms = self.config.player.stun_ms;
        self.players.iter_mut().find(|p| p.id == id).is_some_and(|p| p.state.stun(ms))
    }

    pub(crate) fn allocate_bomb_id(&mut self) -> u32 {
        let id = self.next_bomb_id;
        self.next_bomb_id += 1;
        id
    }
}
