//! Rolling-horizon holding-time optimization.
//!
//! Each call builds one linear program over the current fleet snapshot: a
//! bounded holding variable per bus and a non-negative deviation variable per
//! adjacent pair, with the absolute headway deviation linearized as two
//! one-sided constraints. The projected gap after holding is
//! `current_gap + hold[trailing] - hold[leading]`: holding the leading bus
//! closes the gap behind it, holding the trailing bus opens it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel};
use tracing::{debug, warn};

use crate::config::ControlConfig;
use crate::models::{BusState, HoldingDecision, PassengerDemandSample};

/// Computes per-bus holding times minimizing a weighted cost of passenger
/// wait, schedule deviation, and residual headway deviation.
pub struct HoldingTimeOptimizer {
    config: ControlConfig,
    cycles: AtomicU64,
}

impl HoldingTimeOptimizer {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            cycles: AtomicU64::new(0),
        }
    }

    /// Total optimization calls made so far.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// One optimization cycle over a fleet snapshot.
    ///
    /// Always returns a complete decision covering every input bus: an empty
    /// snapshot yields an empty decision, and any solver failure yields the
    /// zero-holding fallback marked `degraded` so dispatch keeps moving.
    pub fn optimize(
        &self,
        bus_states: &[BusState],
        demand: &[PassengerDemandSample],
        horizon_minutes: u32,
    ) -> HoldingDecision {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;

        if bus_states.is_empty() {
            return HoldingDecision {
                holds: HashMap::new(),
                cycle,
                degraded: false,
                computed_at: Utc::now(),
            };
        }

        // Position order along the route: the bus with the smaller position
        // time leads the pair behind it.
        let mut ordered: Vec<&BusState> = bus_states.iter().collect();
        ordered.sort_by(|a, b| a.position_time.total_cmp(&b.position_time));

        let waiting = waiting_by_stop(demand);
        let target = self.config.target_headway;

        let mut vars = ProblemVariables::new();

        let holds: Vec<_> = ordered
            .iter()
            .map(|_| vars.add(variable().min(0.0).max(self.config.max_holding_time)))
            .collect();

        // One deviation variable per adjacent pair; at the optimum it settles
        // at |projected_gap - target|.
        let devs: Vec<_> = (0..ordered.len().saturating_sub(1))
            .map(|_| vars.add(variable().min(0.0)))
            .collect();

        let mut objective: Expression = 0.0.into();
        for (bus, &hold) in ordered.iter().zip(&holds) {
            let n_waiting = waiting
                .get(bus.current_stop.as_str())
                .copied()
                .unwrap_or(0) as f64;
            objective = objective + self.config.passenger_weight * n_waiting * hold;
            // |schedule_delay| is constant in the decision variables. It never
            // moves the optimum; it keeps objective values comparable from
            // cycle to cycle.
            objective = objective + self.config.schedule_weight * hold;
            objective = objective + self.config.schedule_weight * bus.schedule_delay.abs();
        }
        for &dev in &devs {
            objective = objective + self.config.bunching_penalty * dev;
        }

        let mut problem = vars.minimise(objective).using(good_lp::default_solver);

        for (i, &dev) in devs.iter().enumerate() {
            let current_gap = ordered[i + 1].position_time - ordered[i].position_time;
            let projected: Expression = holds[i + 1] - holds[i] + current_gap;
            // dev >= |projected - target|, linearized two-sided.
            problem = problem.with(constraint!(dev >= projected.clone() - target));
            problem = problem.with(constraint!(dev + projected >= target));
        }

        match problem.solve() {
            Ok(solution) => {
                let holds: HashMap<String, f64> = ordered
                    .iter()
                    .zip(&holds)
                    .map(|(bus, &hold)| {
                        let seconds =
                            solution.value(hold).clamp(0.0, self.config.max_holding_time);
                        (bus.vehicle_id.clone(), seconds)
                    })
                    .collect();
                debug!(
                    cycle,
                    buses = holds.len(),
                    horizon_minutes,
                    "Found optimal holding times"
                );
                HoldingDecision {
                    holds,
                    cycle,
                    degraded: false,
                    computed_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(
                    cycle,
                    error = %e,
                    "Holding optimization failed, falling back to zero holding"
                );
                self.zero_holding(bus_states, cycle)
            }
        }
    }

    /// Zero holding for every bus. Keeps dispatch moving when the solver
    /// cannot; the caller retries on the next cycle.
    fn zero_holding(&self, bus_states: &[BusState], cycle: u64) -> HoldingDecision {
        HoldingDecision {
            holds: bus_states
                .iter()
                .map(|b| (b.vehicle_id.clone(), 0.0))
                .collect(),
            cycle,
            degraded: true,
            computed_at: Utc::now(),
        }
    }
}

fn waiting_by_stop(demand: &[PassengerDemandSample]) -> HashMap<&str, u32> {
    let mut by_stop: HashMap<&str, u32> = HashMap::new();
    for sample in demand {
        *by_stop.entry(sample.stop_id.as_str()).or_default() += sample.waiting;
    }
    by_stop
}
