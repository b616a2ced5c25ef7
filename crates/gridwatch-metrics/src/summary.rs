//! Latency summaries.
//!
//! Each label set keeps a running count and sum plus a bounded window of
//! recent observations from which quantiles are computed at collect time.
//! Summaries are cumulative across scrapes.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::desc::Desc;
use crate::sink::{MetricSink, Sample};

/// Quantiles reported for every summary series.
pub const QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Observations retained per series for quantile estimation.
pub const WINDOW: usize = 500;

#[derive(Default)]
struct SummaryState {
    count: u64,
    sum: f64,
    window: VecDeque<f64>,
}

impl SummaryState {
    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        if self.window.len() == WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(value);
    }
}

/// Duration summary per label set, in seconds.
pub struct SummaryVec {
    desc: Desc,
    series: Mutex<HashMap<Vec<String>, SummaryState>>,
}

impl SummaryVec {
    pub fn new(desc: Desc) -> Self {
        Self {
            desc,
            series: Mutex::new(HashMap::new()),
        }
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub async fn observe(&self, labels: &[&str], elapsed: Duration) {
        if labels.len() != self.desc.labels.len() {
            tracing::warn!(metric = %self.desc.name, "ignoring observation with wrong label count");
            return;
        }
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let mut series = self.series.lock().await;
        series.entry(key).or_default().observe(elapsed.as_secs_f64());
    }

    /// Number of observations recorded for a label set.
    pub async fn count(&self, labels: &[&str]) -> u64 {
        let key: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        let series = self.series.lock().await;
        series.get(&key).map(|s| s.count).unwrap_or(0)
    }

    /// Emit quantile, `_sum` and `_count` samples for every series.
    pub async fn collect(&self, sink: &MetricSink) {
        let series = self.series.lock().await;
        let mut keys: Vec<&Vec<String>> = series.keys().collect();
        keys.sort();

        let mut samples = Vec::new();
        for key in keys {
            let state = &series[key];
            let base: Vec<(String, String)> = self
                .desc
                .labels
                .iter()
                .zip(key)
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();

            let window: Vec<f64> = state.window.iter().copied().collect();
            for (q, value) in QUANTILES.iter().zip(compute_quantiles(&window, &QUANTILES)) {
                let mut labels = base.clone();
                labels.push(("quantile".to_string(), q.to_string()));
                samples.push(Sample {
                    suffix: "",
                    labels,
                    value,
                });
            }
            samples.push(Sample {
                suffix: "_sum",
                labels: base.clone(),
                value: state.sum,
            });
            samples.push(Sample {
                suffix: "_count",
                labels: base,
                value: state.count as f64,
            });
        }
        drop(series);
        sink.push(&self.desc, samples);
    }
}

/// Nearest-rank quantiles over an unsorted window. NaN for an empty window.
fn compute_quantiles(values: &[f64], quantiles: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![f64::NAN; quantiles.len()];
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));

    quantiles
        .iter()
        .map(|q| {
            let idx = (sorted.len() as f64 * q) as usize;
            sorted[idx.min(sorted.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latency() -> SummaryVec {
        SummaryVec::new(Desc::summary(
            "nomad",
            "api_latency_seconds",
            "Latency of control-plane calls.",
            &["method"],
        ))
    }

    #[test]
    fn quantiles_of_empty_window_are_nan() {
        let q = compute_quantiles(&[], &QUANTILES);
        assert_eq!(q.len(), 3);
        assert!(q.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn quantiles_pick_nearest_rank() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let q = compute_quantiles(&values, &[0.5, 0.9, 0.99]);
        assert_eq!(q, vec![51.0, 91.0, 100.0]);
    }

    #[test]
    fn window_is_bounded() {
        let mut state = SummaryState::default();
        for i in 0..(WINDOW + 10) {
            state.observe(i as f64);
        }
        assert_eq!(state.window.len(), WINDOW);
        assert_eq!(state.count, (WINDOW + 10) as u64);
        assert_eq!(state.window.front().copied(), Some(10.0));
    }

    #[tokio::test]
    async fn collect_emits_quantiles_sum_and_count() {
        let summary = latency();
        summary.observe(&["nodes"], Duration::from_millis(100)).await;
        summary.observe(&["nodes"], Duration::from_millis(300)).await;
        assert_eq!(summary.count(&["nodes"]).await, 2);

        let sink = MetricSink::new();
        summary.collect(&sink).await;
        let families = sink.finish();
        assert_eq!(families.len(), 1);

        let samples = &families[0].samples;
        assert_eq!(samples.len(), QUANTILES.len() + 2);
        let count = samples.iter().find(|s| s.suffix == "_count").unwrap();
        assert_eq!(count.value, 2.0);
        let sum = samples.iter().find(|s| s.suffix == "_sum").unwrap();
        assert!((sum.value - 0.4).abs() < 1e-9);
        assert!(samples.iter().any(|s| s.label("quantile") == Some("0.99")));
    }

    #[tokio::test]
    async fn series_persist_across_collects() {
        let summary = latency();
        summary.observe(&["leader"], Duration::from_millis(5)).await;

        summary.collect(&MetricSink::new()).await;
        summary.observe(&["leader"], Duration::from_millis(5)).await;
        assert_eq!(summary.count(&["leader"]).await, 2);
    }
}
