//! Real-time bus-bunching control engine.
//!
//! Detects bunching from vehicle-position snapshots, scores headway
//! regularity, and computes per-bus holding times on a rolling horizon by
//! solving a small linear program every cycle. A periodic driver
//! ([`driver::ControlLoop`]) wires the pieces together; feed ingestion,
//! holding actuation, and rendering live outside this crate and exchange
//! plain records with it.

pub mod config;
pub mod control;
pub mod driver;
pub mod models;
pub mod providers;
