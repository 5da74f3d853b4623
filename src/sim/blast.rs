/// Bomb → explosion propagation.
///
/// ```text
///            ray stops here (wall hit, scorched)
///                  │
///   . . ← ← ← C → +  .      C   center, always created
///             ↓             ← → ↑ ↓  one cell per step, up to `power`
///             ↓
/// ```
///
/// Per ray, each step checks in this order:
///   1. outside the grid → stop, no explosion
///   2. live wall        → explosion, one hit on the wall, stop
///   3. otherwise        → explosion, kill whatever stands there, continue
///
/// A wall destroyed by the hit still ends the ray on that tick. Only
/// Breakable walls roll for a pickup drop.

use rand::Rng;

use crate::domain::entity::{BlastDir, Bomb, Explosion, PlayerId, PowerUp};
use crate::domain::grid::Cell;
use crate::domain::state::Damage;
use crate::domain::tile::Hit;

use super::event::GameEvent;
use super::world::WorldState;

/// Blow `bomb` up. The caller removes the bomb and refunds its owner.
pub fn detonate(world: &mut WorldState, bomb: &Bomb, events: &mut Vec<GameEvent>) {
    events.push(GameEvent::BombExploded { owner: bomb.owner, cell: bomb.cell });
    let lifetime = world.config.bomb.explosion_ms;

    world.explosions.push(Explosion::new(bomb.cell, BlastDir::Center, lifetime));
    damage_cell(world, bomb.cell, bomb.owner, events);

    for dir in BlastDir::RAYS {
        let (dx, dy) = dir.delta();
        for step in 1..=bomb.power as i32 {
            let cell = bomb.cell.offset(dx * step, dy * step);
            if !world.grid.in_bounds(cell) {
                break;
            }

            if let Some(wi) = world.terrain().live_wall_index(cell) {
                world.explosions.push(Explosion::new(cell, dir, lifetime));
                hit_wall(world, wi, bomb.owner, events);
                break;
            }

            world.explosions.push(Explosion::new(cell, dir, lifetime));
            damage_cell(world, cell, bomb.owner, events);
        }
    }
}

fn hit_wall(world: &mut WorldState, wi: usize, owner: PlayerId, events: &mut Vec<GameEvent>) {
    let wall = &mut world.walls[wi];
    let (cell, kind) = (wall.cell, wall.kind);
    match wall.take_hit() {
        Hit::Ignored => {}
        Hit::Weakened => events.push(GameEvent::WallDamaged { cell, health: wall.health() }),
        Hit::Destroyed => {
            log::debug!("{} wall at {cell:?} destroyed by player {owner}", kind.name());
            events.push(GameEvent::WallDestroyed { cell, kind, by: owner });
            if kind.drops_pickups() {
                roll_pickup(world, cell, events);
            }
        }
    }
}

fn roll_pickup(world: &mut WorldState, cell: Cell, events: &mut Vec<GameEvent>) {
    let kinds = &world.config.pickup.kinds;
    if kinds.is_empty() || world.rng.random::<f64>() >= world.config.pickup.spawn_chance {
        return;
    }
    let kind = kinds[world.rng.random_range(0..kinds.len())];
    world.powerups.push(PowerUp::new(kind, cell));
    events.push(GameEvent::PowerUpSpawned { cell, kind });
}

/// Kill every living player and opponent standing in `cell`.
fn damage_cell(world: &mut WorldState, cell: Cell, owner: PlayerId, events: &mut Vec<GameEvent>) {
    for p in world.players.iter_mut().filter(|p| p.is_alive() && p.cell() == cell) {
        match p.take_damage() {
            Damage::Killed => {
                log::debug!("player {} caught in blast at {cell:?}", p.id);
                events.push(GameEvent::PlayerDied { player: p.id, cell });
            }
            Damage::Absorbed => log::trace!("player {} shrugged off blast", p.id),
            Damage::Ignored => {}
        }
    }
    for o in world.opponents.iter_mut().filter(|o| o.alive && o.cell() == cell) {
        if o.die() {
            events.push(GameEvent::OpponentDied { id: o.id, cell, by: Some(owner) });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::tile::WallKind;
    use crate::sim::level::{parse_map, Layout};
    use crate::sim::world::Mode;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashSet;

    /// Bordered map with the given extra glyphs placed at cells.
    fn bordered(w: usize, h: usize, extra: &[((usize, usize), char)]) -> String {
        let mut rows = vec![vec!['.'; w]; h];
        for y in 0..h {
            for x in 0..w {
                if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                    rows[y][x] = '#';
                }
            }
        }
        for &((x, y), ch) in extra {
            rows[y][x] = ch;
        }
        rows.iter().map(|r| r.iter().collect::<String>() + "\n").collect()
    }

    fn world_from(map: &str, cfg: GameConfig) -> WorldState {
        let layout = parse_map(map).unwrap();
        WorldState::from_layout(cfg, Mode::Solo, layout, Pcg32::seed_from_u64(9)).unwrap()
    }

    fn cells(world: &WorldState) -> HashSet<Cell> {
        world.explosions.iter().map(|e| e.cell).collect()
    }

    fn set(list: &[(i32, i32)]) -> HashSet<Cell> {
        list.iter().map(|&c| Cell::from(c)).collect()
    }

    #[test]
    fn ray_stops_at_breakable_wall() {
        let mut cfg = GameConfig::default();
        cfg.pickup.spawn_chance = 0.0;
        let mut w = world_from(&bordered(15, 13, &[((1, 1), '1'), ((6, 5), '+')]), cfg);
        let bomb = Bomb::new(1, 1, Cell::new(5, 5), 2, 3000);
        let mut events = Vec::new();
        detonate(&mut w, &bomb, &mut events);

        assert_eq!(
            cells(&w),
            set(&[(5, 5), (4, 5), (3, 5), (5, 4), (5, 3), (5, 6), (5, 7), (6, 5)])
        );
        assert!(!cells(&w).contains(&Cell::new(7, 5)));
        assert_eq!(w.explosions.len(), 8);
        assert!(w.terrain().wall_at(Cell::new(6, 5)).is_none());
        assert!(events.contains(&GameEvent::WallDestroyed { cell: Cell::new(6, 5), kind: WallKind::Breakable, by: 1 }));
        assert_eq!(w.explosions.iter().filter(|e| e.dir == BlastDir::Center).count(), 1);
    }

    #[test]
    fn hard_wall_stops_ray_and_survives_two_blasts() {
        let mut w = world_from(&bordered(9, 5, &[((1, 1), '1'), ((4, 2), '%')]), GameConfig::default());
        let mut events = Vec::new();
        for _ in 0..2 {
            detonate(&mut w, &Bomb::new(1, 1, Cell::new(2, 2), 5, 0), &mut events);
        }
        assert!(w.terrain().wall_at(Cell::new(4, 2)).is_some());
        assert!(!cells(&w).contains(&Cell::new(5, 2)));
        detonate(&mut w, &Bomb::new(1, 1, Cell::new(2, 2), 5, 0), &mut events);
        assert!(w.terrain().wall_at(Cell::new(4, 2)).is_none());
        // hard walls never drop pickups
        assert!(w.powerups.is_empty());
    }

    #[test]
    fn unbreakable_border_is_scorched_not_crossed() {
        let mut w = world_from(&bordered(5, 5, &[((2, 2), '1')]), GameConfig::default());
        let mut events = Vec::new();
        detonate(&mut w, &Bomb::new(1, 1, Cell::new(1, 1), 4, 0), &mut events);
        assert_eq!(cells(&w), set(&[(1, 1), (1, 0), (0, 1), (2, 1), (3, 1), (4, 1), (1, 2), (1, 3), (1, 4)]));
        assert_eq!(w.walls.iter().filter(|x| x.is_destroyed()).count(), 0);
    }

    #[test]
    fn blast_kills_players_and_opponents_in_path() {
        let map = bordered(9, 5, &[((1, 1), '1'), ((3, 2), 'c'), ((6, 2), 'r')]);
        let mut w = world_from(&map, GameConfig::default());
        w.players[0].body.place_at(&w.grid.clone(), Cell::new(2, 3));
        let mut events = Vec::new();
        detonate(&mut w, &Bomb::new(1, 1, Cell::new(2, 2), 2, 0), &mut events);

        assert!(!w.players[0].is_alive());
        assert!(!w.opponents[0].alive);
        assert!(w.opponents[1].alive, "out of range");
        assert!(events.contains(&GameEvent::OpponentDied { id: 1, cell: Cell::new(3, 2), by: Some(1) }));
        assert!(events.contains(&GameEvent::PlayerDied { player: 1, cell: Cell::new(2, 3) }));
    }

    #[test]
    fn invincible_player_survives_blast() {
        let mut w = world_from(&bordered(5, 5, &[((2, 2), '1')]), GameConfig::default());
        w.players[0].state.make_invincible(1000);
        let mut events = Vec::new();
        detonate(&mut w, &Bomb::new(1, 1, Cell::new(2, 2), 1, 0), &mut events);
        assert!(w.players[0].is_alive());
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerDied { .. })));
    }

    #[test]
    fn certain_drop_spawns_configured_pickup() {
        let mut cfg = GameConfig::default();
        cfg.pickup.spawn_chance = 1.0;
        cfg.pickup.kinds = vec![crate::domain::powerup::PowerUpKind::WallPass];
        let mut w = world_from(&bordered(7, 5, &[((1, 1), '1'), ((4, 2), '+')]), cfg);
        let mut events = Vec::new();
        detonate(&mut w, &Bomb::new(1, 1, Cell::new(3, 2), 1, 0), &mut events);
        assert_eq!(w.powerups.len(), 1);
        assert_eq!(w.powerups[0].cell, Cell::new(4, 2));
        assert!(events.iter().any(|e| matches!(e, GameEvent::PowerUpSpawned { .. })));
    }

    proptest! {
        #[test]
        fn open_area_blast_shape(
            w in 3i32..16, h in 3i32..16,
            bx in 0i32..16, by in 0i32..16,
            power in 1u32..7,
        ) {
            let bx = bx % w;
            let by = by % h;
            let layout = Layout {
                width: w,
                height: h,
                player_spawns: vec![Cell::new(0, 0)],
                ..Layout::default()
            };
            let mut world = WorldState::from_layout(
                GameConfig::default(), Mode::Solo, layout, Pcg32::seed_from_u64(0),
            ).unwrap();
            let bomb = Bomb::new(1, 1, Cell::new(bx, by), power, 0);
            let mut events = Vec::new();
            detonate(&mut world, &bomb, &mut events);

            let p = power as i32;
            let expected = 1
                + p.min(by)
                + p.min(h - 1 - by)
                + p.min(bx)
                + p.min(w - 1 - bx);
            prop_assert_eq!(world.explosions.len() as i32, expected);
            let centers = world.explosions.iter().filter(|e| e.dir == BlastDir::Center).count();
            prop_assert_eq!(centers, 1);
            for e in &world.explosions {
                prop_assert!(world.grid.in_bounds(e.cell));
                prop_assert!(e.cell.x == bx || e.cell.y == by);
            }
        }
    }
}
