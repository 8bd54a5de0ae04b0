/// Eco Defender: throw leaves, grow trees, clear the factory's smog.
///
/// The per-frame simulation step, pure with the RNG injected.
pub mod compute;
/// Tuning constants and their JSON override.
pub mod config;
/// Plain game data.
pub mod entities;

pub use compute::{step, tick, FrameInput};
pub use config::Config;
pub use entities::{GameState, GameStatus};
