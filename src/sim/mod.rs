/// Simulation: everything that owns or mutates the entity collections.
/// `session::Match` is the entry point for front ends.

pub mod blast;
pub mod event;
pub mod level;
pub mod remote;
pub mod session;
pub mod step;
pub mod world;
