/// Blastgrid: grid arena bomber simulation.
///
///   config   TOML settings, immutable once a match starts
///   domain   rules with no notion of ticks: geometry, walls, entities, AI
///   sim      the tick driver, events, levels, remote play, match façade
///
/// The terminal front end lives in the binary (`src/main.rs`, `src/ui/`).

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
