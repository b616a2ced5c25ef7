//! Per-scrape output stream.
//!
//! A [`MetricSink`] is created for one scrape, shared by reference with
//! every concurrent fetcher (behind an `Arc` when tasks are spawned), and
//! drained into the ordered list of metric families when the scrape
//! finishes.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::warn;

use crate::desc::{Desc, MetricKind};

/// One exposed value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Appended to the family name (`_sum`, `_count` for summaries).
    pub suffix: &'static str,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    /// Value of a label on this sample.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// All samples of one metric name gathered during a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    /// Find the first sample whose labels include every given pair.
    pub fn find(&self, labels: &[(&str, &str)]) -> Option<&Sample> {
        self.samples
            .iter()
            .find(|s| labels.iter().all(|(k, v)| s.label(k) == Some(*v)))
    }
}

#[derive(Default)]
struct Families {
    order: Vec<MetricFamily>,
    index: HashMap<String, usize>,
}

/// Concurrency-safe collector for the samples of a single scrape.
#[derive(Default)]
pub struct MetricSink {
    families: Mutex<Families>,
}

impl MetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one sample for `desc` with label values in descriptor order.
    pub fn emit(&self, desc: &Desc, value: f64, label_values: &[&str]) {
        let Some(labels) = desc.label_pairs(label_values) else {
            warn!(
                metric = %desc.name,
                expected = desc.labels.len(),
                got = label_values.len(),
                "dropping sample with wrong label count"
            );
            return;
        };
        self.push(
            desc,
            vec![Sample {
                suffix: "",
                labels,
                value,
            }],
        );
    }

    /// Append prepared samples to the family of `desc`.
    pub fn push(&self, desc: &Desc, samples: Vec<Sample>) {
        if samples.is_empty() {
            return;
        }
        let mut families = self.families.lock().unwrap_or_else(|e| e.into_inner());
        let idx = match families.index.get(&desc.name) {
            Some(&idx) => idx,
            None => {
                let idx = families.order.len();
                families.order.push(MetricFamily {
                    name: desc.name.clone(),
                    help: desc.help,
                    kind: desc.kind,
                    samples: Vec::new(),
                });
                families.index.insert(desc.name.clone(), idx);
                idx
            }
        };
        families.order[idx].samples.extend(samples);
    }

    /// Number of samples emitted so far.
    pub fn sample_count(&self) -> usize {
        let families = self.families.lock().unwrap_or_else(|e| e.into_inner());
        families.order.iter().map(|f| f.samples.len()).sum()
    }

    /// Take every family gathered so far, in first-emission order,
    /// leaving the sink empty.
    pub fn finish(&self) -> Vec<MetricFamily> {
        let mut families = self.families.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *families).order
    }
}
