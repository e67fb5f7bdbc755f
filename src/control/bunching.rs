use tracing::warn;

use crate::models::{BunchingEvent, BusState};

/// Flags consecutive buses on a route that run closer together than the
/// bunching threshold.
#[derive(Debug, Clone)]
pub struct BunchingDetector {
    threshold: f64,
}

impl BunchingDetector {
    pub fn new(bunching_threshold: f64) -> Self {
        Self {
            threshold: bunching_threshold,
        }
    }

    /// Severity of a gap relative to the threshold, in `[0, 1]`. A gap equal
    /// to the threshold scores 0, a zero gap scores 1.
    pub fn severity(&self, time_gap: f64) -> f64 {
        ((self.threshold - time_gap) / self.threshold).clamp(0.0, 1.0)
    }

    /// Scan one route for bunched pairs.
    ///
    /// Vehicles are ordered by stop sequence rather than raw coordinates:
    /// stop-level ordering shrugs off GPS noise and is the granularity at
    /// which holding actions are actuated. Events come back in route order.
    pub fn detect(&self, bus_states: &[BusState], route_id: &str) -> Vec<BunchingEvent> {
        let mut route_buses: Vec<&BusState> = bus_states
            .iter()
            .filter(|b| b.route_id == route_id)
            .collect();

        if route_buses.len() < 2 {
            return Vec::new();
        }

        route_buses.sort_by_key(|b| b.stop_sequence);

        let mut events = Vec::new();
        for pair in route_buses.windows(2) {
            let (lead, trail) = (pair[0], pair[1]);
            let time_gap = (trail.position_time - lead.position_time).abs();
            if time_gap < self.threshold {
                events.push(BunchingEvent {
                    bus1_id: lead.vehicle_id.clone(),
                    bus2_id: trail.vehicle_id.clone(),
                    time_gap,
                    severity: self.severity(time_gap),
                    location: lead.current_stop.clone(),
                });
            }
        }

        if !events.is_empty() {
            warn!(route_id, count = events.len(), "Detected bunching events");
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(vehicle_id: &str, route_id: &str, stop_sequence: u32, position_time: f64) -> BusState {
        BusState {
            vehicle_id: vehicle_id.to_string(),
            route_id: route_id.to_string(),
            current_stop: format!("stop_{stop_sequence}"),
            stop_sequence,
            position_time,
            schedule_delay: 0.0,
        }
    }

    #[test]
    fn fewer_than_two_buses_yields_no_events() {
        let detector = BunchingDetector::new(120.0);
        assert!(detector.detect(&[], "route_1").is_empty());
        assert!(detector
            .detect(&[bus("b1", "route_1", 1, 0.0)], "route_1")
            .is_empty());
    }

    #[test]
    fn well_spaced_buses_yield_no_events() {
        // Gaps of 180 and 420 both clear a 120s threshold.
        let detector = BunchingDetector::new(120.0);
        let buses = vec![
            bus("b1", "route_1", 1, 0.0),
            bus("b2", "route_1", 3, 180.0),
            bus("b3", "route_1", 7, 600.0),
        ];
        assert!(detector.detect(&buses, "route_1").is_empty());
    }

    #[test]
    fn close_pair_is_flagged_with_half_severity() {
        let detector = BunchingDetector::new(120.0);
        let buses = vec![
            bus("b1", "route_1", 2, 0.0),
            bus("b2", "route_1", 4, 60.0),
        ];
        let events = detector.detect(&buses, "route_1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].bus1_id, "b1");
        assert_eq!(events[0].bus2_id, "b2");
        assert_eq!(events[0].time_gap, 60.0);
        assert_eq!(events[0].severity, 0.5);
        assert_eq!(events[0].location, "stop_2");
    }

    #[test]
    fn gap_equal_to_threshold_is_not_flagged() {
        let detector = BunchingDetector::new(120.0);
        let buses = vec![
            bus("b1", "route_1", 1, 0.0),
            bus("b2", "route_1", 2, 120.0),
        ];
        assert!(detector.detect(&buses, "route_1").is_empty());
    }

    #[test]
    fn severity_stays_within_unit_interval() {
        let detector = BunchingDetector::new(120.0);
        assert_eq!(detector.severity(120.0), 0.0);
        assert_eq!(detector.severity(0.0), 1.0);
        assert_eq!(detector.severity(500.0), 0.0);
        for gap in [10.0, 60.0, 90.0, 119.9] {
            let s = detector.severity(gap);
            assert!((0.0..=1.0).contains(&s), "severity {s} out of range");
        }
    }

    #[test]
    fn other_routes_are_ignored() {
        let detector = BunchingDetector::new(120.0);
        let buses = vec![
            bus("b1", "route_1", 1, 0.0),
            bus("b2", "route_2", 2, 30.0),
            bus("b3", "route_1", 3, 400.0),
        ];
        assert!(detector.detect(&buses, "route_1").is_empty());
    }

    #[test]
    fn scan_order_follows_stop_sequence_not_input_order() {
        let detector = BunchingDetector::new(120.0);
        // Input out of order; by stop sequence the adjacent pairs are
        // (b1, b2) with gap 60 and (b2, b3) with gap 340.
        let buses = vec![
            bus("b3", "route_1", 9, 400.0),
            bus("b1", "route_1", 1, 0.0),
            bus("b2", "route_1", 5, 60.0),
        ];
        let events = detector.detect(&buses, "route_1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].bus1_id, "b1");
        assert_eq!(events[0].bus2_id, "b2");
    }

    #[test]
    fn multiple_bunched_pairs_come_back_in_route_order() {
        let detector = BunchingDetector::new(120.0);
        let buses = vec![
            bus("b1", "route_1", 1, 0.0),
            bus("b2", "route_1", 2, 50.0),
            bus("b3", "route_1", 3, 140.0),
            bus("b4", "route_1", 4, 150.0),
        ];
        let events = detector.detect(&buses, "route_1");
        assert_eq!(events.len(), 3);
        // Route order, not severity order: the most severe pair (b3, b4)
        // comes last.
        assert_eq!(events[0].bus2_id, "b2");
        assert_eq!(events[1].bus2_id, "b3");
        assert_eq!(events[2].bus2_id, "b4");
        assert!(events[2].severity > events[1].severity);
    }
}
