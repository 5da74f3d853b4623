/// Events emitted during a simulation step.
///
/// The step collects them into a Vec; the match fans them out afterwards to
/// the scoreboard and to any registered listeners (sound, network, logs).
/// Listeners only observe. Nothing they do can reach back into the tick.

use crate::domain::entity::PlayerId;
use crate::domain::grid::Cell;
use crate::domain::powerup::PowerUpKind;
use crate::domain::tile::WallKind;

use super::world::Outcome;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    BombPlaced { owner: PlayerId, cell: Cell, power: u32 },
    BombExploded { owner: PlayerId, cell: Cell },
    /// Hard wall took a hit but still stands.
    WallDamaged { cell: Cell, health: u8 },
    WallDestroyed { cell: Cell, kind: WallKind, by: PlayerId },
    PowerUpSpawned { cell: Cell, kind: PowerUpKind },
    PowerUpCollected { player: PlayerId, cell: Cell, kind: PowerUpKind },
    PlayerDied { player: PlayerId, cell: Cell },
    /// A timed state (invincible / stunned) ran out.
    PlayerRecovered { player: PlayerId },
    /// `by` is the bomb owner when an explosion did it.
    OpponentDied { id: u32, cell: Cell, by: Option<PlayerId> },
    MatchEnded { outcome: Outcome },
}

/// Anything that wants to observe events.
pub trait EventListener {
    fn on_event(&mut self, event: &GameEvent);
}

impl<F: FnMut(&GameEvent)> EventListener for F {
    fn on_event(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Fan-out to registered listeners, in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn publish(&mut self, events: &[GameEvent]) {
        for event in events {
            log::trace!("event {event:?}");
            for l in self.listeners.iter_mut() {
                l.on_event(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

// ── Sound cues ──

/// Audio collaborator. A missing sound must be a silent no-op.
pub trait AudioSink {
    fn play_sound(&mut self, name: &str, volume: f32);
}

/// Maps events to named sound cues.
pub struct SoundCues<A: AudioSink> {
    sink: A,
}

impl<A: AudioSink> SoundCues<A> {
    pub fn new(sink: A) -> Self {
        SoundCues { sink }
    }

    pub fn cue_for(event: &GameEvent) -> Option<(&'static str, f32)> {
        match event {
            GameEvent::BombPlaced { .. } => Some(("bomb_place", 0.6)),
            GameEvent::BombExploded { .. } => Some(("explosion", 0.8)),
            GameEvent::WallDestroyed { .. } => Some(("wall_break", 0.5)),
            GameEvent::PowerUpCollected { .. } => Some(("powerup", 0.7)),
            GameEvent::PlayerDied { .. } | GameEvent::OpponentDied { .. } => Some(("death", 0.8)),
            GameEvent::MatchEnded { outcome: Outcome::Won { .. } } => Some(("victory", 1.0)),
            GameEvent::MatchEnded { .. } => Some(("game_over", 1.0)),
            _ => None,
        }
    }
}

impl<A: AudioSink> EventListener for SoundCues<A> {
    fn on_event(&mut self, event: &GameEvent) {
        if let Some((name, volume)) = Self::cue_for(event) {
            self.sink.play_sound(name, volume);
        }
    }
}
