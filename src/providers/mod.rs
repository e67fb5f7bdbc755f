//! Snapshot providers for driving the control loop.

mod replay;

pub use replay::{ReplayError, ReplayProvider};
