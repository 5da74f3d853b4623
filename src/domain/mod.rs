/// Pure game rules: geometry, terrain, entities, movement and AI.
/// Nothing in here knows about ticks, events or I/O.

pub mod ai;
pub mod entity;
pub mod grid;
pub mod physics;
pub mod powerup;
pub mod state;
pub mod tile;
