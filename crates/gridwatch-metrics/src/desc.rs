//! Metric descriptors.

/// Exposition type of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
    Summary,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Counter => "counter",
            Self::Summary => "summary",
        }
    }
}

/// Name, help text, type and ordered label names of a metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

impl Desc {
    /// Build a descriptor named `{namespace}_{name}`.
    pub fn new(
        namespace: &str,
        name: &str,
        help: &'static str,
        kind: MetricKind,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name: format!("{namespace}_{name}"),
            help,
            kind,
            labels,
        }
    }

    pub fn gauge(namespace: &str, name: &str, help: &'static str) -> Self {
        Self::new(namespace, name, help, MetricKind::Gauge, &[])
    }

    pub fn labeled_gauge(
        namespace: &str,
        name: &str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self::new(namespace, name, help, MetricKind::Gauge, labels)
    }

    pub fn counter(
        namespace: &str,
        name: &str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self::new(namespace, name, help, MetricKind::Counter, labels)
    }

    pub fn summary(
        namespace: &str,
        name: &str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self::new(namespace, name, help, MetricKind::Summary, labels)
    }

    /// Pair label names with values. `None` if the arity does not match.
    pub fn label_pairs(&self, values: &[&str]) -> Option<Vec<(String, String)>> {
        if values.len() != self.labels.len() {
            return None;
        }
        Some(
            self.labels
                .iter()
                .zip(values)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
