//! Read options applied to every list/info/stats query.

use std::time::Duration;

/// Consistency and blocking parameters for a read query.
///
/// One value is built per collector and handed to every call, so the
/// stale-read policy lives in a single place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Allow any server (not only the leader) to answer.
    pub allow_stale: bool,
    /// Maximum time a blocking query may wait.
    pub wait_time: Duration,
}

impl ReadOptions {
    /// Stale reads with a 1ms wait, so queries never block on index changes.
    pub const fn stale() -> Self {
        Self {
            allow_stale: true,
            wait_time: Duration::from_millis(1),
        }
    }

    /// Render the options as query-string pairs (without a leading `?`).
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if self.allow_stale {
            pairs.push(("stale", String::new()));
        }
        if !self.wait_time.is_zero() {
            pairs.push(("wait", format!("{}ms", self.wait_time.as_millis().max(1))));
        }
        pairs
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::stale()
    }
}
