//! Minimum agent version for which detail endpoints are queried.

use tracing::warn;

/// Oldest client version whose node and allocation detail is collected.
pub const MIN_VERSION: (u64, u64, u64) = (0, 8, 0);

/// Whether a node running `version` is new enough to query for detail.
/// Pre-release and build suffixes are ignored.
pub fn supported(node: &str, version: &str) -> bool {
    match parse(version) {
        Some(v) => v >= MIN_VERSION,
        None => {
            warn!(node, version, "could not parse node version");
            false
        }
    }
}

fn parse(version: &str) -> Option<(u64, u64, u64)> {
    let core = version
        .trim()
        .trim_start_matches('v')
        .split(['-', '+'])
        .next()?;
    let mut parts = core.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_versions() {
        assert!(supported("n1", "0.8.0"));
        assert!(supported("n1", "1.6.1"));
        assert!(supported("n1", "0.12.0-beta1"));
        assert!(supported("n1", "v1.2"));
    }

    #[test]
    fn rejects_old_or_garbage() {
        assert!(!supported("n1", "0.7.1"));
        assert!(!supported("n1", ""));
        assert!(!supported("n1", "latest"));
        assert!(!supported("n1", "1.2.3.4"));
    }
}
