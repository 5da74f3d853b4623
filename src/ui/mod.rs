/// Terminal front end: the concrete collaborators the demo binary plugs
/// into a match.

pub mod gamepad;
pub mod input;
pub mod records;
pub mod renderer;
pub mod sound;
