pub mod interjection;
pub mod orchestrator;
pub mod turn;

pub use interjection::{Interjection, InterjectionChannel, ScriptedChannel, StdinChannel};
pub use orchestrator::{Orchestrator, RoundOutcome};
pub use turn::{PROVIDER_ERROR_MARKER, TurnExecutor};
