use crate::models::{BusState, HeadwayStats};

/// Computes headway statistics over one route's vehicle snapshot.
#[derive(Debug, Clone)]
pub struct HeadwayAnalyzer {
    target_headway: f64,
}

impl HeadwayAnalyzer {
    pub fn new(target_headway: f64) -> Self {
        Self { target_headway }
    }

    /// Gaps between consecutive vehicles, ordered by position time so every
    /// headway is non-negative.
    pub fn headways(&self, route_buses: &[BusState]) -> Vec<f64> {
        let mut times: Vec<f64> = route_buses.iter().map(|b| b.position_time).collect();
        times.sort_by(f64::total_cmp);
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Headway statistics for one route. A route with fewer than two buses
    /// has no headway; every statistic comes back zero.
    pub fn compute(&self, route_buses: &[BusState]) -> HeadwayStats {
        let headways = self.headways(route_buses);
        if headways.is_empty() {
            return HeadwayStats::default();
        }

        let mean = headways.iter().sum::<f64>() / headways.len() as f64;
        let variance =
            headways.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / headways.len() as f64;
        let std = variance.sqrt();
        let cv = if mean > 0.0 { std / mean } else { 0.0 };
        let min = headways.iter().copied().fold(f64::INFINITY, f64::min);
        let max = headways.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        HeadwayStats {
            mean,
            std,
            cv,
            min,
            max,
            target_deviation: (mean - self.target_headway).abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(vehicle_id: &str, position_time: f64) -> BusState {
        BusState {
            vehicle_id: vehicle_id.to_string(),
            route_id: "route_1".to_string(),
            current_stop: "stop_1".to_string(),
            stop_sequence: 1,
            position_time,
            schedule_delay: 0.0,
        }
    }

    #[test]
    fn fewer_than_two_buses_yields_zero_stats() {
        let analyzer = HeadwayAnalyzer::new(300.0);
        assert_eq!(analyzer.compute(&[]), HeadwayStats::default());
        assert_eq!(analyzer.compute(&[bus("b1", 120.0)]), HeadwayStats::default());
    }

    #[test]
    fn stats_over_three_buses() {
        let analyzer = HeadwayAnalyzer::new(300.0);
        let buses = vec![bus("b1", 0.0), bus("b2", 180.0), bus("b3", 600.0)];
        let stats = analyzer.compute(&buses);

        // Gaps 180 and 420: mean 300, population std 120.
        assert_eq!(stats.mean, 300.0);
        assert_eq!(stats.std, 120.0);
        assert!((stats.cv - 0.4).abs() < 1e-12);
        assert_eq!(stats.min, 180.0);
        assert_eq!(stats.max, 420.0);
        assert_eq!(stats.target_deviation, 0.0);
    }

    #[test]
    fn input_order_does_not_matter() {
        let analyzer = HeadwayAnalyzer::new(300.0);
        let sorted = vec![bus("b1", 0.0), bus("b2", 180.0), bus("b3", 600.0)];
        let shuffled = vec![bus("b3", 600.0), bus("b1", 0.0), bus("b2", 180.0)];
        assert_eq!(analyzer.compute(&sorted), analyzer.compute(&shuffled));
    }

    #[test]
    fn headways_are_never_negative() {
        let analyzer = HeadwayAnalyzer::new(300.0);
        let buses = vec![bus("b2", 500.0), bus("b1", 100.0), bus("b3", 300.0)];
        for headway in analyzer.headways(&buses) {
            assert!(headway >= 0.0);
        }
    }

    #[test]
    fn zero_mean_reports_zero_cv() {
        let analyzer = HeadwayAnalyzer::new(300.0);
        let buses = vec![bus("b1", 250.0), bus("b2", 250.0)];
        let stats = analyzer.compute(&buses);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.cv, 0.0);
    }

    #[test]
    fn target_deviation_tracks_configured_target() {
        let analyzer = HeadwayAnalyzer::new(240.0);
        let buses = vec![bus("b1", 0.0), bus("b2", 300.0)];
        let stats = analyzer.compute(&buses);
        assert_eq!(stats.target_deviation, 60.0);
    }
}
