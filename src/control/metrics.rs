use std::collections::HashMap;

use crate::models::{HeadwayPerformance, PerformanceMetrics, WaitPerformance};

/// Post-hoc service quality metrics over an observation window, and
/// percentage comparison against a baseline run.
#[derive(Debug, Clone)]
pub struct PerformanceCalculator {
    bunching_threshold: f64,
}

impl PerformanceCalculator {
    pub fn new(bunching_threshold: f64) -> Self {
        Self { bunching_threshold }
    }

    /// Metrics over observed headways and passenger wait times. Either
    /// section is omitted when its input sequence is empty.
    pub fn compute(&self, headways: &[f64], wait_times: &[f64]) -> PerformanceMetrics {
        let headway = (!headways.is_empty()).then(|| {
            let mean = mean(headways);
            let std = population_std(headways, mean);
            let cv = if mean > 0.0 { std / mean } else { 0.0 };
            let bunched = headways
                .iter()
                .filter(|&&h| h < self.bunching_threshold)
                .count();
            HeadwayPerformance {
                mean,
                std,
                cv,
                regularity: 1.0 - cv,
                bunching_rate: bunched as f64 / headways.len() as f64,
            }
        });

        let wait = (!wait_times.is_empty()).then(|| {
            let mut sorted = wait_times.to_vec();
            sorted.sort_by(f64::total_cmp);
            WaitPerformance {
                mean: mean(wait_times),
                median: percentile(&sorted, 50.0),
                p95: percentile(&sorted, 95.0),
                max: sorted.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }
        });

        PerformanceMetrics { headway, wait }
    }

    /// Percent improvement of `optimized` over `baseline`, per metric.
    /// Only metrics present in both runs are compared, and an exact-zero
    /// baseline skips the metric rather than dividing by it.
    pub fn compare(
        &self,
        optimized: &PerformanceMetrics,
        baseline: &PerformanceMetrics,
    ) -> HashMap<&'static str, f64> {
        let baseline_entries: HashMap<&'static str, f64> =
            baseline.entries().into_iter().collect();

        optimized
            .entries()
            .into_iter()
            .filter_map(|(name, value)| {
                let base = *baseline_entries.get(name)?;
                (base != 0.0).then(|| (name, (base - value) / base * 100.0))
            })
            .collect()
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Percentile by linear interpolation between closest ranks. Expects sorted
/// input.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
