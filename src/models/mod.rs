//! Records exchanged with the ingestion, actuation, and reporting
//! collaborators. The engine consumes and produces these as complete,
//! immutable snapshots; nothing in here carries cross-cycle state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position snapshot of a single bus, handed over by the ingestion
/// collaborator once per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusState {
    /// Unique vehicle identifier
    pub vehicle_id: String,
    /// Route the vehicle is currently serving
    pub route_id: String,
    /// Stop the vehicle is at or approaching
    pub current_stop: String,
    /// Position of `current_stop` in the route's stop ordering
    pub stop_sequence: u32,
    /// Seconds elapsed since the route's reference epoch, not wall clock.
    /// Orders vehicles along the route and feeds all headway arithmetic.
    pub position_time: f64,
    /// Signed seconds versus the published schedule (positive = late)
    pub schedule_delay: f64,
}

/// Passengers waiting at a stop, sampled at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerDemandSample {
    pub stop_id: String,
    pub waiting: u32,
}

/// A pair of consecutive buses running closer together than the bunching
/// threshold. Recomputed on every detection call, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct BunchingEvent {
    /// Leading bus of the pair
    pub bus1_id: String,
    /// Trailing bus of the pair
    pub bus2_id: String,
    /// Time gap between the pair (seconds)
    pub time_gap: f64,
    /// `(threshold - gap) / threshold`, in `[0, 1]`
    pub severity: f64,
    /// Stop of the leading bus
    pub location: String,
}

/// Headway statistics over one route's vehicles. All zero when the route has
/// fewer than two buses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HeadwayStats {
    pub mean: f64,
    pub std: f64,
    /// Coefficient of variation: `std / mean`, 0 when the mean is 0
    pub cv: f64,
    pub min: f64,
    pub max: f64,
    /// `|mean - target_headway|`
    pub target_deviation: f64,
}

/// Holding times for one optimization cycle. Covers every bus that was in the
/// input snapshot, each within `[0, max_holding_time]`.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingDecision {
    /// Seconds each vehicle should be held at its current stop
    pub holds: HashMap<String, f64>,
    /// Optimizer call counter value for this cycle
    pub cycle: u64,
    /// True when the solver failed and the zero-holding fallback was used
    pub degraded: bool,
    pub computed_at: DateTime<Utc>,
}

/// Headway-side service performance over an observation window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HeadwayPerformance {
    pub mean: f64,
    pub std: f64,
    pub cv: f64,
    /// `1 - cv`
    pub regularity: f64,
    /// Share of observed headways below the bunching threshold
    pub bunching_rate: f64,
}

/// Passenger wait-time performance over an observation window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WaitPerformance {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub max: f64,
}

/// Post-hoc metrics. A section is absent when its observation sequence was
/// empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub headway: Option<HeadwayPerformance>,
    pub wait: Option<WaitPerformance>,
}

impl PerformanceMetrics {
    /// Flat `(name, value)` view of whatever was computed; the unit baseline
    /// comparison works over.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        let mut entries = Vec::new();
        if let Some(h) = &self.headway {
            entries.push(("mean_headway", h.mean));
            entries.push(("std_headway", h.std));
            entries.push(("cv_headway", h.cv));
            entries.push(("headway_regularity", h.regularity));
            entries.push(("bunching_rate", h.bunching_rate));
        }
        if let Some(w) = &self.wait {
            entries.push(("mean_wait_time", w.mean));
            entries.push(("median_wait_time", w.median));
            entries.push(("p95_wait_time", w.p95));
            entries.push(("max_wait_time", w.max));
        }
        entries
    }
}

/// Demand rates and fleet availability consumed by the dispatch sizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FleetDemand {
    /// Passengers per hour right now
    pub current_per_hour: f64,
    /// Forecast passengers per hour over the coming horizon
    pub forecast_per_hour: f64,
    pub available_buses: u32,
}

/// One complete, atomic control-cycle input bundle. Producers must never hand
/// over a partially updated mix of buses and demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub buses: Vec<BusState>,
    pub demand: Vec<PassengerDemandSample>,
    /// Fleet-level demand rates; absent when the producer has no forecast
    #[serde(default)]
    pub fleet: Option<FleetDemand>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_empty_when_nothing_observed() {
        let metrics = PerformanceMetrics::default();
        assert!(metrics.entries().is_empty());
    }

    #[test]
    fn entries_cover_both_sections() {
        let metrics = PerformanceMetrics {
            headway: Some(HeadwayPerformance {
                mean: 300.0,
                std: 30.0,
                cv: 0.1,
                regularity: 0.9,
                bunching_rate: 0.0,
            }),
            wait: Some(WaitPerformance {
                mean: 10.0,
                median: 9.0,
                p95: 18.0,
                max: 20.0,
            }),
        };
        let entries = metrics.entries();
        assert_eq!(entries.len(), 9);
        assert!(entries.iter().any(|(name, v)| *name == "cv_headway" && *v == 0.1));
        assert!(entries.iter().any(|(name, v)| *name == "max_wait_time" && *v == 20.0));
    }

    #[test]
    fn cycle_snapshot_roundtrips_without_fleet() {
        let json = r#"{"buses":[],"demand":[{"stop_id":"stop_1","waiting":4}]}"#;
        let snapshot: CycleSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.buses.is_empty());
        assert_eq!(snapshot.demand[0].waiting, 4);
        assert!(snapshot.fleet.is_none());
    }
}
