//! The periodic driver around the engine.
//!
//! One optimization cycle runs per tick and always to completion: a tick that
//! fires while a cycle is still in flight is dropped rather than queued, so
//! at most one solve is ever running and a stale snapshot is the worst case.
//! Shutdown is observed at tick boundaries only, which means a started cycle
//! still dispatches its full decision and no partial one ever leaves the
//! loop.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::control::{
    BunchingDetector, DispatchSizer, HeadwayAnalyzer, HoldingTimeOptimizer, PerformanceCalculator,
};
use crate::models::{BusState, CycleSnapshot, HoldingDecision};

/// Observed headways kept for rolling performance reporting.
const MAX_OBSERVED_HEADWAYS: usize = 4096;

/// Hands the loop one complete snapshot per cycle.
///
/// Implementations must return atomic snapshots: a bus list together with the
/// demand observed alongside it, never a partially updated mix.
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self) -> CycleSnapshot;
}

/// Receives completed decisions. This is the hand-off point to the actuation
/// layer; the loop never calls it with a partial result.
pub trait DecisionSink: Send + Sync {
    fn dispatch_holding(&self, decision: &HoldingDecision);
    fn dispatch_fleet_size(&self, buses: u32);
}

/// Runs the engine on two cadences: holding optimization every cycle
/// interval, fleet sizing and performance reporting on the slower dispatch
/// interval.
pub struct ControlLoop<P, S> {
    config: Config,
    analyzer: HeadwayAnalyzer,
    detector: BunchingDetector,
    optimizer: HoldingTimeOptimizer,
    sizer: DispatchSizer,
    perf: PerformanceCalculator,
    provider: Arc<P>,
    sink: Arc<S>,
    observed_headways: RwLock<Vec<f64>>,
}

impl<P: SnapshotProvider + 'static, S: DecisionSink + 'static> ControlLoop<P, S> {
    pub fn new(config: Config, provider: Arc<P>, sink: Arc<S>) -> Self {
        Self {
            analyzer: HeadwayAnalyzer::new(config.control.target_headway),
            detector: BunchingDetector::new(config.control.bunching_threshold),
            optimizer: HoldingTimeOptimizer::new(config.control.clone()),
            sizer: DispatchSizer::new(&config.control),
            perf: PerformanceCalculator::new(config.control.bunching_threshold),
            config,
            provider,
            sink,
            observed_headways: RwLock::new(Vec::new()),
        }
    }

    /// Run both loops until the shutdown flag flips.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        info!(
            cycle_interval_secs = self.config.driver.cycle_interval_secs,
            dispatch_interval_secs = self.config.driver.dispatch_interval_secs,
            "Starting control loop"
        );

        let control_self = self.clone();
        let mut control_shutdown = shutdown.clone();
        let control_handle = tokio::spawn(async move {
            let mut ticks = interval(Duration::from_secs(
                control_self.config.driver.cycle_interval_secs,
            ));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticks.tick() => control_self.run_cycle().await,
                    _ = control_shutdown.changed() => break,
                }
            }
        });

        let dispatch_self = self;
        let mut dispatch_shutdown = shutdown;
        let dispatch_handle = tokio::spawn(async move {
            let mut ticks = interval(Duration::from_secs(
                dispatch_self.config.driver.dispatch_interval_secs,
            ));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Skip the first tick which fires immediately; sizing wants at
            // least one cycle of observations behind it.
            ticks.tick().await;
            loop {
                tokio::select! {
                    _ = ticks.tick() => dispatch_self.run_dispatch_sizing().await,
                    _ = dispatch_shutdown.changed() => break,
                }
            }
        });

        let _ = tokio::join!(control_handle, dispatch_handle);
        info!("Control loop stopped");
    }

    /// One optimization cycle: situational awareness per route, then a single
    /// holding solve over the whole snapshot.
    async fn run_cycle(&self) {
        let snapshot = self.provider.snapshot();

        let mut route_ids: Vec<&str> = snapshot.buses.iter().map(|b| b.route_id.as_str()).collect();
        route_ids.sort_unstable();
        route_ids.dedup();

        let mut cycle_headways = Vec::new();
        for route_id in route_ids {
            let route_buses: Vec<BusState> = snapshot
                .buses
                .iter()
                .filter(|b| b.route_id == route_id)
                .cloned()
                .collect();

            let events = self.detector.detect(&snapshot.buses, route_id);
            let stats = self.analyzer.compute(&route_buses);
            debug!(
                route_id,
                buses = route_buses.len(),
                bunched_pairs = events.len(),
                mean_headway = stats.mean,
                cv_headway = stats.cv,
                "Route status"
            );

            cycle_headways.extend(self.analyzer.headways(&route_buses));
        }

        if !cycle_headways.is_empty() {
            let mut observed = self.observed_headways.write().await;
            observed.extend(cycle_headways);
            // Keep the window bounded; older observations age out first.
            if observed.len() > MAX_OBSERVED_HEADWAYS {
                let excess = observed.len() - MAX_OBSERVED_HEADWAYS;
                observed.drain(..excess);
            }
        }

        let decision = self.optimizer.optimize(
            &snapshot.buses,
            &snapshot.demand,
            self.config.driver.horizon_minutes,
        );
        if decision.degraded {
            warn!(cycle = decision.cycle, "Dispatching degraded zero-holding decision");
        }
        self.sink.dispatch_holding(&decision);
    }

    /// The slower cadence: fleet sizing from demand rates, plus a performance
    /// report over the observation window.
    async fn run_dispatch_sizing(&self) {
        let snapshot = self.provider.snapshot();
        if let Some(fleet) = snapshot.fleet {
            let buses = self.sizer.size(
                fleet.current_per_hour,
                fleet.forecast_per_hour,
                fleet.available_buses,
            );
            info!(
                buses,
                available = fleet.available_buses,
                "Fleet size for next horizon"
            );
            self.sink.dispatch_fleet_size(buses);
        }

        let observed = self.observed_headways.read().await;
        let metrics = self.perf.compute(&observed, &[]);
        if let Some(h) = &metrics.headway {
            info!(
                mean_headway = h.mean,
                cv_headway = h.cv,
                bunching_rate = h.bunching_rate,
                observations = observed.len(),
                "Service performance over observation window"
            );
        }
    }
}
