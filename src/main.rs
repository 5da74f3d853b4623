/// Entry point and game loop.
///
/// Usage: `blastgrid [solo|versus] [--seed N] [--map FILE]`
///
/// Logs go to stderr through env_logger; the terminal is in alternate
/// screen mode while playing, so run with `RUST_LOG=debug ... 2>game.log`
/// to keep them.

mod ui;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use blastgrid::config::GameConfig;
use blastgrid::domain::entity::{FrameInput, MoveDir, PlayerId};
use blastgrid::error::Result;
use blastgrid::sim::event::SoundCues;
use blastgrid::sim::session::Match;
use blastgrid::sim::world::Mode;
use ui::gamepad::GamepadState;
use ui::input::{InputState, PLAYER_ONE, PLAYER_TWO};
use ui::records::FileStatsStore;
use ui::renderer::TerminalRenderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R'), KeyCode::F(2)];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc];

fn main() {
    env_logger::init();

    let mut config = GameConfig::load();
    let mode = apply_args(&mut config, std::env::args().skip(1));

    // Fail before touching the terminal.
    let first = match start_match(&config, mode, None) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Cannot start match: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = TerminalRenderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let result = game_loop(first, &config, mode, &mut renderer, sound);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    match result {
        Ok(summary) => {
            println!();
            println!("Thanks for playing Blastgrid!");
            println!("{summary}");
        }
        Err(e) => eprintln!("Game error: {e}"),
    }
}

/// Command line → mode, with `--seed` / `--map` folded into the config.
fn apply_args(config: &mut GameConfig, mut args: impl Iterator<Item = String>) -> Mode {
    let mut mode = Mode::Solo;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "solo" => mode = Mode::Solo,
            "versus" | "vs" => mode = Mode::Versus,
            "--seed" => match args.next().map(|s| s.parse::<u64>()) {
                Some(Ok(seed)) => config.general.seed = Some(seed),
                _ => log::warn!("--seed needs a number"),
            },
            "--map" => match args.next() {
                Some(path) => config.general.map = Some(PathBuf::from(path)),
                None => log::warn!("--map needs a file"),
            },
            other => log::warn!("ignoring argument {other:?}"),
        }
    }
    mode
}

fn start_match(config: &GameConfig, mode: Mode, sound: Option<&SoundEngine>) -> Result<Match> {
    let mut m = Match::new(config.clone(), mode)?.with_stats(Box::new(FileStatsStore::open_default()));
    if let Some(sfx) = sound {
        m.subscribe(Box::new(SoundCues::new(sfx.clone())));
    }
    Ok(m)
}

fn game_loop(
    mut current: Match,
    config: &GameConfig,
    mode: Mode,
    renderer: &mut TerminalRenderer,
    sound: Option<SoundEngine>,
) -> Result<String> {
    if let Some(sfx) = sound.as_ref() {
        current.subscribe(Box::new(SoundCues::new(sfx.clone())));
    }

    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let tick_rate = Duration::from_millis(config.general.tick_rate_ms);
    let dt_ms = config.general.tick_rate_ms as u32;
    let mut last_tick = Instant::now();
    // Bomb presses between ticks are kept until the next tick consumes them.
    let mut pending_bomb: [bool; 2] = [false; 2];

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) || gp.quit_pressed() {
            break;
        }

        let over = current.outcome().is_some();
        if kb.any_pressed(KEYS_RESTART) || (over && gp.pause_pressed()) {
            current = start_match(config, mode, sound.as_ref())?;
            pending_bomb = [false; 2];
            last_tick = Instant::now();
            continue;
        }
        if kb.any_pressed(KEYS_PAUSE) || (!over && gp.pause_pressed()) {
            current.set_paused(!current.is_paused());
        }

        let p1 = merge(kb.frame_input(&PLAYER_ONE), gp.movement(), gp.bomb_pressed());
        let p2 = kb.frame_input(&PLAYER_TWO);
        pending_bomb[0] |= p1.bomb;
        pending_bomb[1] |= p2.bomb;

        if last_tick.elapsed() >= tick_rate {
            let mut inputs: Vec<(PlayerId, FrameInput)> = vec![(1, FrameInput { bomb: pending_bomb[0], ..p1 })];
            if mode == Mode::Versus {
                inputs.push((2, FrameInput { bomb: pending_bomb[1], ..p2 }));
            }
            if !current.is_paused() {
                pending_bomb = [false; 2];
            }
            current.tick(&inputs, dt_ms);
            last_tick = Instant::now();
        }

        current.render(renderer);
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(summary(&current))
}

/// Keyboard wins over gamepad for movement; either can bomb.
fn merge(kb: FrameInput, pad_move: Option<MoveDir>, pad_bomb: bool) -> FrameInput {
    FrameInput { movement: kb.movement.or(pad_move), bomb: kb.bomb || pad_bomb }
}

fn summary(m: &Match) -> String {
    let board = &m.world().scoreboard;
    let lifetime = FileStatsStore::open_default();
    let mut lines: Vec<String> = m
        .world()
        .players
        .iter()
        .map(|p| {
            let r = board.record(p.id);
            let life = lifetime.record(p.id);
            format!(
                "Player {}: score {}  (walls {}, foes {}, pickups {}, bombs {})  lifetime {}/{} wins, best {}",
                p.id,
                r.score,
                r.stats.walls_destroyed,
                r.stats.opponents_killed,
                r.stats.powerups_collected,
                r.stats.bombs_placed,
                life.wins,
                life.matches,
                life.best_score
            )
        })
        .collect();
    if let Some(outcome) = m.outcome() {
        lines.push(format!("Result: {outcome:?}"));
    }
    lines.join("\n")
}
