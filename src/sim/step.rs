/// The step function: advances the world by one tick of `dt_ms`.
///
/// Processing order:
///   1. Player life-state timers
///   2. Local player input (movement, then bomb placement)
///   3. Opponents (strategy → move → contact with players), dead ones dropped
///   4. Bomb fuses; expired bombs detonate and refund their owner
///   5. Explosion lifetimes
///   6. Pickups (float animation, collection on contact)
///   7. Win / lose check
///   8. Scoreboard update from the collected events
///
/// Explosions only hurt on the tick they appear (see `blast`); a lingering
/// explosion is scenery.

use crate::domain::ai::Surroundings;
use crate::domain::entity::{Bomb, Facing, FrameInput, PlayerId};
use crate::domain::grid::Cell;
use crate::domain::physics::{self, Terrain};
use crate::domain::state::Damage;

use super::blast;
use super::event::{EventListener, GameEvent};
use super::world::{Mode, Outcome, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, inputs: &[(PlayerId, FrameInput)], dt_ms: u32) -> Vec<GameEvent> {
    if world.is_over() {
        return vec![];
    }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;
    world.elapsed_ms += dt_ms as u64;

    resolve_player_states(world, dt_ms, &mut events);
    resolve_player_input(world, inputs, &mut events);
    resolve_opponents(world, dt_ms, &mut events);
    resolve_bombs(world, dt_ms, &mut events);
    resolve_explosions(world, dt_ms);
    resolve_pickups(world, dt_ms, &mut events);
    resolve_outcome(world, &mut events);

    for e in &events {
        world.scoreboard.on_event(e);
    }
    events
}

// ══════════════════════════════════════════════════════════════
// Players
// ══════════════════════════════════════════════════════════════

fn resolve_player_states(world: &mut WorldState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    for p in world.players.iter_mut() {
        if p.state.tick(dt_ms) {
            log::debug!("player {} back to normal", p.id);
            events.push(GameEvent::PlayerRecovered { player: p.id });
        }
    }
}

fn resolve_player_input(world: &mut WorldState, inputs: &[(PlayerId, FrameInput)], events: &mut Vec<GameEvent>) {
    for &(id, input) in inputs {
        let Some(idx) = world.player_index(id) else { continue };
        let player = &world.players[idx];
        if player.remote || !player.is_alive() {
            continue;
        }

        if let Some(dir) = input.movement {
            move_player(world, idx, dir.delta());
        }

        if input.bomb {
            let p = &world.players[idx];
            let (cell, power) = (p.cell(), p.stats.power);
            if p.can_place_bomb() {
                place_bomb(world, idx, cell, power, events);
            }
        }
    }
}

fn move_player(world: &mut WorldState, idx: usize, (dx, dy): (i32, i32)) {
    let terrain = Terrain::new(&world.grid, &world.walls, &world.wall_grid);
    let player = &mut world.players[idx];
    if !player.state.accepts_movement() {
        return;
    }
    if let Some(f) = Facing::from_delta(dx, dy) {
        player.facing = f;
    }
    let wall_pass = player.stats.wall_pass;
    physics::try_move(&mut player.body, terrain.grid, dx, dy, player.stats.speed, |r| {
        terrain.blocks(r, wall_pass)
    });
}

/// Put a bomb for `world.players[idx]` at `cell`. One live bomb per cell;
/// the placement budget is the caller's concern.
pub(crate) fn place_bomb(world: &mut WorldState, idx: usize, cell: Cell, power: u32, events: &mut Vec<GameEvent>) -> bool {
    if world.bomb_at(cell) {
        return false;
    }
    let id = world.allocate_bomb_id();
    let fuse = world.config.bomb.fuse_ms;
    let player = &mut world.players[idx];
    player.bombs_placed += 1;
    world.bombs.push(Bomb::new(id, player.id, cell, power, fuse));
    events.push(GameEvent::BombPlaced { owner: player.id, cell, power });
    true
}

// ══════════════════════════════════════════════════════════════
// Opponents
// ══════════════════════════════════════════════════════════════

fn resolve_opponents(world: &mut WorldState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    for i in 0..world.opponents.len() {
        if !world.opponents[i].alive {
            continue;
        }

        // Phase 1: decide
        let others: Vec<Cell> = world
            .opponents
            .iter()
            .enumerate()
            .filter(|(j, o)| *j != i && o.alive)
            .map(|(_, o)| o.cell())
            .collect();
        let terrain = Terrain::new(&world.grid, &world.walls, &world.wall_grid);
        let view = Surroundings { terrain, players: &world.players, opponent_cells: &others };
        let opp = &mut world.opponents[i];
        let (dx, dy) = opp.strategy.compute_move(&opp.body, &view, dt_ms, &mut world.rng);

        // Phase 2: move against walls + other opponents
        let mut body = opp.body;
        let speed = opp.speed;
        physics::try_move(&mut body, terrain.grid, dx, dy, speed, |r| {
            terrain.blocks(r, false) || physics::opponent_blocks(&world.opponents, r, i)
        });
        world.opponents[i].body = body;

        // Phase 3: contact
        let rect = body.rect();
        for p in world.players.iter_mut().filter(|p| p.is_alive()) {
            if rect.intersects(&p.body.rect()) && p.take_damage() == Damage::Killed {
                log::debug!("player {} caught by opponent {}", p.id, world.opponents[i].id);
                events.push(GameEvent::PlayerDied { player: p.id, cell: p.cell() });
            }
        }
    }

    world.opponents.retain(|o| o.alive);
}

// ══════════════════════════════════════════════════════════════
// Bombs / explosions
// ══════════════════════════════════════════════════════════════

fn resolve_bombs(world: &mut WorldState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    let mut i = 0;
    while i < world.bombs.len() {
        if !world.bombs[i].tick(dt_ms) {
            i += 1;
            continue;
        }
        let bomb = world.bombs.remove(i);
        blast::detonate(world, &bomb, events);
        if let Some(owner) = world.players.iter_mut().find(|p| p.id == bomb.owner) {
            owner.bomb_exploded();
        }
    }
}

fn resolve_explosions(world: &mut WorldState, dt_ms: u32) {
    world.explosions.retain_mut(|e| !e.tick(dt_ms));
}

// ══════════════════════════════════════════════════════════════
// Pickups
// ══════════════════════════════════════════════════════════════

fn resolve_pickups(world: &mut WorldState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    for pu in world.powerups.iter_mut() {
        pu.animate(dt_ms);
        let rect = pu.rect(&world.grid);
        for p in world.players.iter_mut() {
            if p.is_alive() && p.body.rect().intersects(&rect) && pu.collect(p) {
                log::debug!("player {} picked up {}", p.id, pu.kind.name());
                events.push(GameEvent::PowerUpCollected { player: p.id, cell: pu.cell, kind: pu.kind });
            }
        }
    }
    world.powerups.retain(|pu| !pu.is_collected());
}

// ══════════════════════════════════════════════════════════════
// Win / lose
// ══════════════════════════════════════════════════════════════

fn resolve_outcome(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.outcome.is_some() {
        return;
    }

    let outcome = match world.mode {
        Mode::Solo => match world.players.first() {
            Some(p) if !p.is_alive() => Some(Outcome::Lost),
            Some(p) if world.living_opponents() == 0 => Some(Outcome::Won { winner: p.id }),
            Some(_) => None,
            None => Some(Outcome::Lost),
        },
        Mode::Versus | Mode::Online { .. } => {
            let alive: Vec<PlayerId> = world.living_players().map(|p| p.id).collect();
            match alive.as_slice() {
                [] => Some(Outcome::Draw),
                [winner] => Some(Outcome::Won { winner: *winner }),
                _ => None,
            }
        }
    };

    if let Some(outcome) = outcome {
        log::info!("match over after {} ticks: {outcome:?}", world.tick);
        world.outcome = Some(outcome);
        events.push(GameEvent::MatchEnded { outcome });
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::MoveDir;
    use crate::domain::powerup::PowerUpKind;
    use crate::domain::state::LifeState;
    use crate::sim::level::parse_map;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DT: u32 = 16;

    fn world_with(rows: &[&str], mode: Mode, cfg: GameConfig) -> WorldState {
        let layout = parse_map(&rows.join("\n")).unwrap();
        WorldState::from_layout(cfg, mode, layout, Pcg32::seed_from_u64(4)).unwrap()
    }

    fn world(rows: &[&str], mode: Mode) -> WorldState {
        world_with(rows, mode, GameConfig::default())
    }

    fn hold(id: PlayerId, dir: MoveDir) -> (PlayerId, FrameInput) {
        (id, FrameInput { movement: Some(dir), bomb: false })
    }

    fn bomb(id: PlayerId) -> (PlayerId, FrameInput) {
        (id, FrameInput { movement: None, bomb: true })
    }

    fn run(w: &mut WorldState, inputs: &[(PlayerId, FrameInput)], ticks: usize) -> Vec<GameEvent> {
        let mut all = Vec::new();
        for _ in 0..ticks {
            all.extend(step(w, inputs, DT));
        }
        all
    }

    // ── movement ──

    #[test]
    fn held_key_moves_player_and_sets_facing() {
        let mut w = world(&["#######", "#1...2#", "#######"], Mode::Versus);
        run(&mut w, &[hold(1, MoveDir::Right)], 14);
        assert_eq!(w.players[0].body.x, 40 + 42);
        assert_eq!(w.players[0].cell(), Cell::new(2, 1));
        assert_eq!(w.players[0].facing, Facing::Right);
    }

    #[test]
    fn stunned_player_ignores_movement() {
        let mut w = world(&["######", "#1..2#", "######"], Mode::Versus);
        w.players[0].state.stun(1000);
        run(&mut w, &[hold(1, MoveDir::Right)], 5);
        assert_eq!(w.players[0].body.x, 40);
    }

    #[test]
    fn wall_pass_player_walks_through_breakable() {
        let mut w = world(&["#######", "#1+..2#", "#######"], Mode::Versus);
        w.players[0].stats.wall_pass = true;
        run(&mut w, &[hold(1, MoveDir::Right)], 30);
        assert!(w.players[0].body.x > 80);
    }

    // ── bombs ──

    #[test]
    fn bomb_budget_and_stacking_guard() {
        let mut w = world(&["#######", "#1...2#", "#######"], Mode::Versus);
        w.players[0].stats.max_bombs = 2;
        let ev = run(&mut w, &[bomb(1)], 3);
        assert_eq!(w.bombs.len(), 1, "second bomb on the same cell refused");
        assert_eq!(ev.iter().filter(|e| matches!(e, GameEvent::BombPlaced { .. })).count(), 1);

        w.players[0].stats.max_bombs = 1;
        w.players[0].body.place_at(&w.grid.clone(), Cell::new(3, 1));
        run(&mut w, &[bomb(1)], 1);
        assert_eq!(w.bombs.len(), 1, "budget exhausted");
    }

    #[test]
    fn bomb_explodes_after_fuse_and_refunds_owner() {
        let mut cfg = GameConfig::default();
        cfg.bomb.fuse_ms = 100;
        cfg.bomb.explosion_ms = 50;
        let mut w = world_with(&["#########", "#1.....2#", "#########"], Mode::Versus, cfg);
        for p in w.players.iter_mut() {
            p.state.make_invincible(10_000);
        }

        step(&mut w, &[bomb(1)], DT);
        assert_eq!(w.players[0].bombs_placed, 1);
        // walk off the bomb
        run(&mut w, &[hold(1, MoveDir::Right)], 5);
        assert!(w.bombs.len() == 1);

        let ev = run(&mut w, &[], 2);
        assert!(w.bombs.is_empty());
        assert_eq!(w.players[0].bombs_placed, 0);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::BombExploded { owner: 1, .. })));
        assert!(!w.explosions.is_empty());

        run(&mut w, &[], 4);
        assert!(w.explosions.is_empty(), "explosions expire");
        assert_eq!(w.scoreboard.record(1).stats.bombs_placed, 1);
    }

    #[test]
    fn own_bomb_kills_player_and_versus_ends() {
        let mut cfg = GameConfig::default();
        cfg.bomb.fuse_ms = 32;
        let mut w = world_with(&["#######", "#1...2#", "#######"], Mode::Versus, cfg);
        let ev = run(&mut w, &[bomb(1)], 3);
        assert!(!w.players[0].is_alive());
        assert_eq!(w.outcome, Some(Outcome::Won { winner: 2 }));
        assert!(ev.contains(&GameEvent::MatchEnded { outcome: Outcome::Won { winner: 2 } }));
        assert_eq!(w.scoreboard.record(1).stats.deaths, 1);

        // nothing moves once the match is decided
        let tick = w.tick;
        assert!(step(&mut w, &[hold(2, MoveDir::Left)], DT).is_empty());
        assert_eq!(w.tick, tick);
    }

    // ── opponents ──

    #[test]
    fn opponent_contact_kills_normal_player() {
        let mut w = world(&["#####", "#1c.#", "#####"], Mode::Solo);
        // 4px gap at speed 2: touching on the third tick
        let ev = run(&mut w, &[], 3);
        assert!(!w.players[0].is_alive());
        assert_eq!(w.outcome, Some(Outcome::Lost));
        assert!(ev.iter().any(|e| matches!(e, GameEvent::PlayerDied { player: 1, .. })));
    }

    #[test]
    fn invincible_player_survives_contact() {
        let mut w = world(&["#####", "#1c.#", "#####"], Mode::Solo);
        w.players[0].state.make_invincible(5000);
        run(&mut w, &[], 10);
        assert!(w.players[0].is_alive());
        assert!(matches!(w.players[0].state, LifeState::Invincible { .. }));
    }

    #[test]
    fn timed_state_expires_with_event() {
        let mut w = world(&["######", "#1..2#", "######"], Mode::Versus);
        w.players[0].state.make_invincible(40);
        let ev = run(&mut w, &[], 3);
        assert_eq!(w.players[0].state, LifeState::Normal);
        assert!(ev.contains(&GameEvent::PlayerRecovered { player: 1 }));
    }

    #[test]
    fn killing_last_opponent_wins_solo_and_scores() {
        let mut cfg = GameConfig::default();
        cfg.bomb.fuse_ms = 16;
        let mut w = world_with(&["#########", "#1.....a#", "#########"], Mode::Solo, cfg);
        w.players[0].state.make_invincible(10_000);
        // park the opponent next to the player's bomb
        w.opponents[0].body.place_at(&w.grid.clone(), Cell::new(2, 1));
        w.opponents[0].speed = 0;

        let ev = run(&mut w, &[bomb(1)], 2);
        assert!(w.opponents.is_empty() || !w.opponents[0].alive);
        assert_eq!(w.outcome, Some(Outcome::Won { winner: 1 }));
        assert!(ev.iter().any(|e| matches!(e, GameEvent::OpponentDied { by: Some(1), .. })));
        assert_eq!(w.scoreboard.record(1).score, crate::sim::world::OPPONENT_POINTS);
    }

    #[test]
    fn dead_opponents_are_removed_next_update() {
        let mut w = world(&["#######", "#1.r.c#", "#######"], Mode::Solo);
        w.players[0].state.make_invincible(10_000);
        w.opponents[0].die();
        step(&mut w, &[], DT);
        assert_eq!(w.opponents.len(), 1);
        assert_eq!(w.opponents[0].id, 2);
    }

    #[test]
    fn opponents_do_not_overlap() {
        let mut w = world(&["########", "#1....##", "######c#", "#.....c#", "########"], Mode::Solo);
        w.players[0].state.make_invincible(100_000);
        for _ in 0..200 {
            step(&mut w, &[], DT);
            if w.opponents.len() == 2 {
                assert!(!w.opponents[0].body.rect().intersects(&w.opponents[1].body.rect()));
            }
        }
    }

    // ── pickups ──

    #[test]
    fn pickup_collected_once_and_scored() {
        let mut w = world(&["######", "#1b.2#", "######"], Mode::Versus);
        let ev = run(&mut w, &[hold(1, MoveDir::Right)], 10);
        assert!(w.powerups.is_empty());
        assert_eq!(w.players[0].stats.max_bombs, 2);
        assert_eq!(
            ev.iter().filter(|e| matches!(e, GameEvent::PowerUpCollected { kind: PowerUpKind::BombCount, .. })).count(),
            1
        );
        assert_eq!(w.scoreboard.record(1).stats.powerups_collected, 1);
    }

    #[test]
    fn dead_player_does_not_collect() {
        let mut w = world(&["######", "#1b.2#", "######"], Mode::Versus);
        w.players[1].state.make_invincible(10_000);
        w.players[0].body.x += 20;
        w.players[0].state.force_dead();
        step(&mut w, &[], DT);
        assert_eq!(w.powerups.len(), 1);
    }

    #[test]
    fn everyone_dead_is_a_draw() {
        let mut w = world(&["######", "#1..2#", "######"], Mode::Versus);
        w.players[0].state.force_dead();
        w.players[1].state.force_dead();
        let ev = step(&mut w, &[], DT);
        assert_eq!(w.outcome, Some(Outcome::Draw));
        assert_eq!(ev, vec![GameEvent::MatchEnded { outcome: Outcome::Draw }]);
    }
}
