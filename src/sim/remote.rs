/// Remote-opponent plumbing.
///
/// Inbound `RemoteEvent`s drive the remote player directly, bypassing
/// input and movement rules: the peer already resolved them. Outbound
/// messages describe the local player after the tick resolved it.
///
/// The transport itself lives behind `NetworkLink`; no retries, no ordering
/// guarantees. Both message types are serde-tagged so any wire format that
/// speaks serde can carry them.

use serde::{Deserialize, Serialize};

use crate::domain::entity::{Facing, PlayerId};
use crate::domain::grid::Cell;

use super::event::GameEvent;
use super::step::place_bomb;
use super::world::{Mode, WorldState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteEvent {
    OpponentMoved { x: i32, y: i32, direction: Facing },
    OpponentBombPlaced { x: i32, y: i32, power: u32 },
    OpponentDied,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    PlayerMoved { x: i32, y: i32, direction: Facing },
    BombPlaced { x: i32, y: i32, power: u32 },
    PlayerDied,
}

/// Transport collaborator. `poll` must not block.
pub trait NetworkLink {
    fn send(&mut self, msg: &OutboundMessage);
    fn poll(&mut self) -> Vec<RemoteEvent>;
}

/// Local player's pixel position and facing, taken before a tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    pub facing: Facing,
}

impl WorldState {
    pub fn remote_player_id(&self) -> Option<PlayerId> {
        match self.mode {
            Mode::Online { remote } => Some(remote),
            _ => None,
        }
    }

    /// The locally controlled player in an online match.
    pub fn networked_local_id(&self) -> Option<PlayerId> {
        let remote = self.remote_player_id()?;
        self.players.iter().find(|p| p.id != remote).map(|p| p.id)
    }

    pub fn pose_of(&self, id: PlayerId) -> Option<Pose> {
        self.player(id).map(|p| Pose { x: p.body.x, y: p.body.y, facing: p.facing })
    }
}

/// Apply one inbound event to the remote player.
pub fn apply_remote(world: &mut WorldState, event: &RemoteEvent, events: &mut Vec<GameEvent>) {
    let Some(idx) = world.remote_player_id().and_then(|id| world.player_index(id)) else {
        log::warn!("remote event {event:?} outside an online match");
        return;
    };
    if world.is_over() || !world.players[idx].is_alive() {
        return;
    }

    match *event {
        RemoteEvent::OpponentMoved { x, y, direction } => {
            let cell = Cell::new(x, y);
            if !world.grid.in_bounds(cell) {
                log::warn!("remote player moved off the map to {cell:?}");
                return;
            }
            let grid = world.grid;
            let p = &mut world.players[idx];
            p.body.place_at(&grid, cell);
            p.facing = direction;
        }
        RemoteEvent::OpponentBombPlaced { x, y, power } => {
            let cell = Cell::new(x, y);
            if world.grid.in_bounds(cell) {
                place_bomb(world, idx, cell, power, events);
            }
        }
        RemoteEvent::OpponentDied => kill_remote(world, idx, events),
    }
}

/// The link dropped: the remote player is treated as dead.
pub fn link_lost(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if let Some(idx) = world.remote_player_id().and_then(|id| world.player_index(id)) {
        log::info!("network link lost; remote player {} forfeits", world.players[idx].id);
        kill_remote(world, idx, events);
    }
}

fn kill_remote(world: &mut WorldState, idx: usize, events: &mut Vec<GameEvent>) {
    let p = &mut world.players[idx];
    if p.state.force_dead() {
        events.push(GameEvent::PlayerDied { player: p.id, cell: p.cell() });
    }
}

/// Messages describing what the tick did to the local player.
pub fn outbound(world: &WorldState, before: Option<Pose>, events: &[GameEvent]) -> Vec<OutboundMessage> {
    let Some(local) = world.networked_local_id() else {
        return Vec::new();
    };
    let mut out = Vec::new();

    if let (Some(before), Some(after)) = (before, world.pose_of(local)) {
        if before != after {
            if let Some(p) = world.player(local) {
                out.push(OutboundMessage::PlayerMoved { x: p.cell().x, y: p.cell().y, direction: p.facing });
            }
        }
    }
    for e in events {
        match *e {
            GameEvent::BombPlaced { owner, cell, power } if owner == local => {
                out.push(OutboundMessage::BombPlaced { x: cell.x, y: cell.y, power });
            }
            GameEvent::PlayerDied { player, .. } if player == local => out.push(OutboundMessage::PlayerDied),
            _ => {}
        }
    }
    out
}
