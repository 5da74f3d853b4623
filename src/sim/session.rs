/// Match: the tick driver façade the front end talks to.
///
/// Owns the world plus its collaborators (event listeners, network link,
/// stats store) and decides what happens around a step: pause, remote
/// input, outbound messages, end-of-match reporting. Collaborators are
/// called and forgotten; none of their calls return anything the tick
/// depends on.

use crate::config::GameConfig;
use crate::domain::entity::{Bomb, Explosion, FrameInput, Opponent, Player, PlayerId, PowerUp};
use crate::domain::grid::Grid;
use crate::domain::tile::Wall;
use crate::error::Result;

use super::event::{EventBus, EventListener, GameEvent};
use super::level;
use super::remote::{self, NetworkLink};
use super::step;
use super::world::{Mode, Outcome, Scoreboard, WorldState};

// ══════════════════════════════════════════════════════════════
// Collaborators
// ══════════════════════════════════════════════════════════════

/// Draws a snapshot. Errors stay inside the renderer.
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot<'_>);
}

/// Image lookup. A miss is `None`, never an error.
pub trait AssetProvider {
    type Image;
    fn get_image(&self, name: &str) -> Option<&Self::Image>;
}

/// Long-lived statistics, written once per match.
pub trait StatsStore {
    fn update_stats(&mut self, player: PlayerId, won: bool);
    fn add_score(&mut self, player: PlayerId, score: u32);
}

/// Read-only view of a match handed to renderers.
pub struct Snapshot<'a> {
    pub grid: Grid,
    pub walls: &'a [Wall],
    pub players: &'a [Player],
    pub opponents: &'a [Opponent],
    pub bombs: &'a [Bomb],
    pub explosions: &'a [Explosion],
    pub powerups: &'a [PowerUp],
    pub scoreboard: &'a Scoreboard,
    pub outcome: Option<Outcome>,
    pub mode: Mode,
    pub paused: bool,
    pub tick: u64,
    pub elapsed_ms: u64,
}

// ══════════════════════════════════════════════════════════════
// Match
// ══════════════════════════════════════════════════════════════

pub struct Match {
    world: WorldState,
    bus: EventBus,
    link: Option<Box<dyn NetworkLink>>,
    stats: Option<Box<dyn StatsStore>>,
    paused: bool,
    reported: bool,
}

impl Match {
    /// Validate the config, build the layout (map file or generated arena)
    /// and populate the world.
    pub fn new(config: GameConfig, mode: Mode) -> Result<Self> {
        config.validate()?;
        let mut rng = WorldState::make_rng(&config);
        let layout = level::layout_for(&config, &mut rng);
        let world = WorldState::from_layout(config, mode, layout, rng)?;
        Ok(Match::from_world(world))
    }

    pub fn from_world(world: WorldState) -> Self {
        Match { world, bus: EventBus::new(), link: None, stats: None, paused: false, reported: false }
    }

    pub fn with_link(mut self, link: Box<dyn NetworkLink>) -> Self {
        self.link = Some(link);
        self
    }

    pub fn with_stats(mut self, store: Box<dyn StatsStore>) -> Self {
        self.stats = Some(store);
        self
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.bus.subscribe(listener);
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::debug!("match {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.world.outcome
    }

    /// Advance one tick. A paused match does nothing and returns no events.
    pub fn tick(&mut self, inputs: &[(PlayerId, FrameInput)], dt_ms: u32) -> Vec<GameEvent> {
        if self.paused {
            return Vec::new();
        }

        let mut events = self.pull_remote();
        for e in &events {
            self.world.scoreboard.on_event(e);
        }

        let before = self.world.networked_local_id().and_then(|id| self.world.pose_of(id));
        let stepped = step::step(&mut self.world, inputs, dt_ms);

        if let Some(link) = self.link.as_mut() {
            for msg in remote::outbound(&self.world, before, &stepped) {
                link.send(&msg);
            }
        }

        events.extend(stepped);
        self.bus.publish(&events);
        self.report_outcome();
        events
    }

    /// The transport gave up: the remote player forfeits.
    pub fn link_lost(&mut self) {
        let mut events = Vec::new();
        remote::link_lost(&mut self.world, &mut events);
        for e in &events {
            self.world.scoreboard.on_event(e);
        }
        self.bus.publish(&events);
        self.link = None;
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        let w = &self.world;
        Snapshot {
            grid: w.grid,
            walls: &w.walls,
            players: &w.players,
            opponents: &w.opponents,
            bombs: &w.bombs,
            explosions: &w.explosions,
            powerups: &w.powerups,
            scoreboard: &w.scoreboard,
            outcome: w.outcome,
            mode: w.mode,
            paused: self.paused,
            tick: w.tick,
            elapsed_ms: w.elapsed_ms,
        }
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        renderer.render(&self.snapshot());
    }

    fn pull_remote(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(link) = self.link.as_mut() else {
            return events;
        };
        for inbound in link.poll() {
            remote::apply_remote(&mut self.world, &inbound, &mut events);
        }
        events
    }

    fn report_outcome(&mut self) {
        let Some(outcome) = self.world.outcome else { return };
        if self.reported {
            return;
        }
        self.reported = true;

        let Some(store) = self.stats.as_mut() else { return };
        for p in self.world.players.iter().filter(|p| !p.remote) {
            store.update_stats(p.id, outcome.is_win_for(p.id));
            store.add_score(p.id, self.world.scoreboard.record(p.id).score);
        }
    }
}
