/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing or incomplete; a file that
/// parses but describes an unplayable match is rejected as a whole.
///
/// The resolved `GameConfig` is handed to the match once at setup and is
/// read-only from then on.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::ai::{PlannerTuning, StrategyKind};
use crate::domain::entity::BODY_INSET;
use crate::domain::grid::Grid;
use crate::domain::powerup::{PlayerStats, PowerUpKind};
use crate::error::{GameError, Result};

/// Pickups a destroyed Breakable wall may drop when the config names none.
const DEFAULT_DROPS: [PowerUpKind; 3] =
    [PowerUpKind::BombCount, PowerUpKind::BombPower, PowerUpKind::SpeedBoost];

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub grid: GridConfig,
    pub player: PlayerConfig,
    pub bomb: BombConfig,
    pub pickup: PickupConfig,
    pub opponent: OpponentConfig,
    pub general: GeneralConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    pub tile_size: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Pixels per tick.
    pub speed: i32,
    pub bomb_count: u32,
    pub bomb_power: u32,
    pub invincible_ms: u32,
    pub stun_ms: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BombConfig {
    pub fuse_ms: u32,
    pub explosion_ms: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PickupConfig {
    /// Probability a destroyed Breakable wall drops a pickup.
    pub spawn_chance: f64,
    pub kinds: Vec<PowerUpKind>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpponentConfig {
    pub speed: i32,
    pub tuning: PlannerTuning,
    /// Strategy per generated opponent, in spawn order (cycled).
    pub strategies: Vec<StrategyKind>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneralConfig {
    pub tick_rate_ms: u64,
    pub seed: Option<u64>,
    pub map: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GamepadConfig {
    pub bomb: Vec<String>,
    pub pause: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    grid: TomlGrid,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    bomb: TomlBomb,
    #[serde(default)]
    pickup: TomlPickup,
    #[serde(default)]
    opponent: TomlOpponent,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGrid {
    #[serde(default = "default_width")]
    width: i32,
    #[serde(default = "default_height")]
    height: i32,
    #[serde(default = "default_tile_size")]
    tile_size: i32,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_player_speed")]
    speed: i32,
    #[serde(default = "default_bomb_count")]
    bomb_count: u32,
    #[serde(default = "default_bomb_power")]
    bomb_power: u32,
    #[serde(default = "default_invincible")]
    invincible_ms: u32,
    #[serde(default = "default_stun")]
    stun_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlBomb {
    #[serde(default = "default_fuse")]
    fuse_ms: u32,
    #[serde(default = "default_explosion")]
    explosion_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlPickup {
    #[serde(default = "default_spawn_chance")]
    spawn_chance: f64,
    #[serde(default = "default_pickup_kinds")]
    kinds: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlOpponent {
    #[serde(default = "default_opponent_speed")]
    speed: i32,
    #[serde(default = "default_replan")]
    replan_ms: u32,
    #[serde(default = "default_search_budget")]
    search_budget: usize,
    #[serde(default = "default_strategies")]
    strategies: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    map: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_bomb")]
    bomb: Vec<String>,
    #[serde(default = "default_pad_pause")]
    pause: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

// ── Defaults ──

fn default_width() -> i32 { 15 }
fn default_height() -> i32 { 13 }
fn default_tile_size() -> i32 { 40 }
fn default_player_speed() -> i32 { 3 }
fn default_bomb_count() -> u32 { 1 }
fn default_bomb_power() -> u32 { 1 }
fn default_invincible() -> u32 { 5000 }
fn default_stun() -> u32 { 2000 }
fn default_fuse() -> u32 { 3000 }
fn default_explosion() -> u32 { 500 }   // 8 animation frames
fn default_spawn_chance() -> f64 { 0.5 }
fn default_pickup_kinds() -> Vec<String> {
    DEFAULT_DROPS.iter().map(|k| k.name().into()).collect()
}
fn default_opponent_speed() -> i32 { 2 }
fn default_replan() -> u32 { 500 }
fn default_search_budget() -> usize { 100 }
fn default_strategies() -> Vec<String> {
    StrategyKind::ALL.iter().map(|k| k.name().into()).collect()
}
fn default_tick_rate() -> u64 { 16 }    // ~60 fps
fn default_pad_bomb() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_pad_pause() -> Vec<String> { vec!["Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlGrid {
    fn default() -> Self {
        TomlGrid { width: default_width(), height: default_height(), tile_size: default_tile_size() }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            speed: default_player_speed(),
            bomb_count: default_bomb_count(),
            bomb_power: default_bomb_power(),
            invincible_ms: default_invincible(),
            stun_ms: default_stun(),
        }
    }
}

impl Default for TomlBomb {
    fn default() -> Self {
        TomlBomb { fuse_ms: default_fuse(), explosion_ms: default_explosion() }
    }
}

impl Default for TomlPickup {
    fn default() -> Self {
        TomlPickup { spawn_chance: default_spawn_chance(), kinds: default_pickup_kinds() }
    }
}

impl Default for TomlOpponent {
    fn default() -> Self {
        TomlOpponent {
            speed: default_opponent_speed(),
            replan_ms: default_replan(),
            search_budget: default_search_budget(),
            strategies: default_strategies(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { tick_rate_ms: default_tick_rate(), seed: None, map: None }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad { bomb: default_pad_bomb(), pause: default_pad_pause(), quit: default_pad_quit() }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            grid: GridConfig {
                width: default_width(),
                height: default_height(),
                tile_size: default_tile_size(),
            },
            player: PlayerConfig {
                speed: default_player_speed(),
                bomb_count: default_bomb_count(),
                bomb_power: default_bomb_power(),
                invincible_ms: default_invincible(),
                stun_ms: default_stun(),
            },
            bomb: BombConfig { fuse_ms: default_fuse(), explosion_ms: default_explosion() },
            pickup: PickupConfig { spawn_chance: default_spawn_chance(), kinds: DEFAULT_DROPS.to_vec() },
            opponent: OpponentConfig {
                speed: default_opponent_speed(),
                tuning: PlannerTuning { replan_ms: default_replan(), search_budget: default_search_budget() },
                strategies: StrategyKind::ALL.to_vec(),
            },
            general: GeneralConfig { tick_rate_ms: default_tick_rate(), seed: None, map: None },
            gamepad: GamepadConfig {
                bomb: default_pad_bomb(),
                pause: default_pad_pause(),
                quit: default_pad_quit(),
            },
        }
    }
}

// ── Derived views ──

impl GameConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(self.grid.width, self.grid.height, self.grid.tile_size)
    }

    /// Stats every player starts a match with.
    pub fn starting_stats(&self) -> PlayerStats {
        PlayerStats {
            speed: self.player.speed,
            max_bombs: self.player.bomb_count,
            power: self.player.bomb_power,
            wall_pass: false,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file, parse errors and invalid values fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        match resolve(toml_cfg, &search_dirs) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config.toml rejected: {e}; using default settings");
                GameConfig::default()
            }
        }
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let toml_cfg: TomlConfig =
            toml::from_str(text).map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        resolve(toml_cfg, &[])
    }

    /// Reject values that cannot produce a playable match.
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(GameError::InvalidConfig(msg));
        let g = &self.grid;
        if g.width < 3 || g.height < 3 {
            return bad(format!("grid must be at least 3x3, got {}x{}", g.width, g.height));
        }
        if g.tile_size <= BODY_INSET {
            return bad(format!("tile_size must exceed {BODY_INSET}, got {}", g.tile_size));
        }
        if self.player.speed < 0 || self.opponent.speed < 0 {
            return bad("speeds must not be negative".into());
        }
        if !(0.0..=1.0).contains(&self.pickup.spawn_chance) {
            return bad(format!("spawn_chance must be within [0, 1], got {}", self.pickup.spawn_chance));
        }
        if self.pickup.spawn_chance > 0.0 && self.pickup.kinds.is_empty() {
            return bad("pickup kinds must not be empty while spawn_chance > 0".into());
        }
        if self.opponent.strategies.is_empty() {
            return bad("opponent strategies must not be empty".into());
        }
        Ok(())
    }
}

fn resolve(t: TomlConfig, search_dirs: &[PathBuf]) -> Result<GameConfig> {
    let kinds = t
        .pickup
        .kinds
        .iter()
        .map(|s| s.parse::<PowerUpKind>())
        .collect::<Result<Vec<_>>>()?;
    let strategies = t
        .opponent
        .strategies
        .iter()
        .map(|s| s.parse::<StrategyKind>())
        .collect::<Result<Vec<_>>>()?;

    let cfg = GameConfig {
        grid: GridConfig { width: t.grid.width, height: t.grid.height, tile_size: t.grid.tile_size },
        player: PlayerConfig {
            speed: t.player.speed,
            bomb_count: t.player.bomb_count,
            bomb_power: t.player.bomb_power,
            invincible_ms: t.player.invincible_ms,
            stun_ms: t.player.stun_ms,
        },
        bomb: BombConfig { fuse_ms: t.bomb.fuse_ms, explosion_ms: t.bomb.explosion_ms },
        pickup: PickupConfig { spawn_chance: t.pickup.spawn_chance, kinds },
        opponent: OpponentConfig {
            speed: t.opponent.speed,
            tuning: PlannerTuning { replan_ms: t.opponent.replan_ms, search_budget: t.opponent.search_budget },
            strategies,
        },
        general: GeneralConfig {
            tick_rate_ms: t.general.tick_rate_ms,
            seed: t.general.seed,
            map: t.general.map.as_deref().map(|m| resolve_path(m, search_dirs)),
        },
        gamepad: GamepadConfig { bomb: t.gamepad.bomb, pause: t.gamepad.pause, quit: t.gamepad.quit },
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Absolute paths as-is; relative ones are looked up in the search dirs,
/// defaulting to CWD-relative.
fn resolve_path(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    search_dirs
        .iter()
        .map(|d| d.join(name))
        .find(|p| p.is_file())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    log::info!("loaded {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    log::warn!("{} parse error: {e}; using default settings", path.display());
                    return TomlConfig::default();
                }
            },
            Err(e) => log::warn!("could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, GameConfig::default());
        assert_eq!(cfg.grid(), Grid::new(15, 13, 40));
        assert_eq!(cfg.bomb.fuse_ms, 3000);
        assert_eq!(cfg.opponent.tuning.search_budget, 100);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[grid]\nwidth = 21\n[pickup]\nkinds = [\"wall_pass\", \"skateboard\"]\n",
        )
        .unwrap();
        assert_eq!(cfg.grid.width, 21);
        assert_eq!(cfg.grid.height, 13);
        assert_eq!(cfg.pickup.kinds, vec![PowerUpKind::WallPass, PowerUpKind::Skateboard]);
        assert_eq!(cfg.player.speed, 3);
    }

    #[test]
    fn strategy_aliases_accepted() {
        let cfg = GameConfig::from_toml_str("[opponent]\nstrategies = [\"intelligent\", \"static\"]\n").unwrap();
        assert_eq!(cfg.opponent.strategies, vec![StrategyKind::ShortestPath, StrategyKind::RandomWalk]);
    }

    #[test]
    fn unknown_variant_names_fail_fast() {
        let err = GameConfig::from_toml_str("[pickup]\nkinds = [\"jetpack\"]\n").unwrap_err();
        assert!(matches!(err, GameError::UnrecognizedVariant { family: "pickup", .. }));
        let err = GameConfig::from_toml_str("[opponent]\nstrategies = [\"psychic\"]\n").unwrap_err();
        assert!(matches!(err, GameError::UnrecognizedVariant { family: "strategy", .. }));
    }

    #[test]
    fn unplayable_values_rejected() {
        for doc in [
            "[grid]\nwidth = 2\n",
            "[grid]\ntile_size = 4\n",
            "[pickup]\nspawn_chance = 1.5\n",
            "[opponent]\nstrategies = []\n",
            "[grid]\nwidth = \"wide\"\n",
        ] {
            assert!(
                matches!(GameConfig::from_toml_str(doc), Err(GameError::InvalidConfig(_))),
                "accepted {doc:?}"
            );
        }
    }

    #[test]
    fn seed_and_map_are_optional() {
        let cfg = GameConfig::from_toml_str("[general]\nseed = 42\nmap = \"/tmp/arena.txt\"\n").unwrap();
        assert_eq!(cfg.general.seed, Some(42));
        assert_eq!(cfg.general.map, Some(PathBuf::from("/tmp/arena.txt")));
    }
}
