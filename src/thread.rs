//! The Border Router object and the Thread stack behind it.

pub mod controller;
pub mod names;
pub mod object;
pub mod simulated;
pub mod types;

pub use {controller::ThreadController, object::ThreadObject, simulated::SimulatedController};
