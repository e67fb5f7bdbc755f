//! The detection and optimization engine.
//!
//! Every component here is a pure function of its per-cycle input apart from
//! the optimizer's call counter, which only feeds diagnostics.

mod bunching;
mod dispatch;
mod headway;
mod holding;
mod metrics;

pub use bunching::BunchingDetector;
pub use dispatch::DispatchSizer;
pub use headway::HeadwayAnalyzer;
pub use holding::HoldingTimeOptimizer;
pub use metrics::PerformanceCalculator;
