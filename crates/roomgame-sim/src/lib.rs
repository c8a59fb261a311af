pub mod automaton;
pub mod buffers;
pub mod updater;

pub use automaton::CpuAutomaton;
pub use buffers::GridStateBuffers;
pub use updater::{AutomatonUpdater, DelayedUpdate};
