pub mod automaton;
pub mod constants;
pub mod direction;
pub mod error;
pub mod rng;
pub mod sync;
pub mod types;
