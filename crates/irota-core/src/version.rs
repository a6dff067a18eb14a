// ── Firmware version comparison ──
//
// Versions are dotted non-negative integers. Firmware filenames embed them
// as `v1.2.3` (the `v` is optional). Malformed versions compare as equal
// to anything, so "unknown" never looks older or newer than a release.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::unwrap_used)] // literal pattern
static VERSION_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v?(\d+\.\d+\.\d+)").unwrap());

/// Pull the first `X.Y.Z` out of a filename.
pub fn extract_version(filename: &str) -> Option<String> {
    VERSION_IN_NAME
        .captures(filename)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

fn segments(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

/// Compare two versions segment-wise, zero-padding the shorter one.
///
/// A non-numeric segment on either side yields `Equal`.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (Some(mut left), Some(mut right)) = (segments(a), segments(b)) else {
        return Ordering::Equal;
    };

    let len = left.len().max(right.len());
    left.resize(len, 0);
    right.resize(len, 0);
    left.cmp(&right)
}

/// `true` when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare(candidate, current) == Ordering::Greater
}

/// Highest version in `versions`, or `None` when empty.
pub fn max_version<I, S>(versions: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut all: Vec<String> = versions
        .into_iter()
        .map(|v| v.as_ref().to_owned())
        .collect();
    all.sort_by(|a, b| compare(a, b));
    all.pop()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extracts_version_with_and_without_prefix() {
        assert_eq!(
            extract_version("ir_remote_v1.2.0.bin").as_deref(),
            Some("1.2.0")
        );
        assert_eq!(extract_version("firmware-2.10.3.bin").as_deref(), Some("2.10.3"));
        assert_eq!(extract_version("fw_1.2_v3.4.5_v6.7.8.bin").as_deref(), Some("3.4.5"));
        assert_eq!(extract_version("latest.bin"), None);
    }

    #[test]
    fn numeric_not_lexicographic() {
        assert_eq!(compare("1.2.3", "1.2.10"), Ordering::Less);
        assert_eq!(compare("1.10.0", "1.9.9"), Ordering::Greater);
    }

    #[test]
    fn zero_padding() {
        assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare("1.2", "1.2.1"), Ordering::Less);
    }

    #[test]
    fn antisymmetric_and_reflexive() {
        let samples = ["0.0.1", "1.0.0", "1.2", "1.2.10", "2.0.0", "10.0.0"];
        for a in samples {
            assert_eq!(compare(a, a), Ordering::Equal);
            for b in samples {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn malformed_versions_compare_equal() {
        assert_eq!(compare("unknown", "1.0.0"), Ordering::Equal);
        assert_eq!(compare("1.0.0", "1.x.0"), Ordering::Equal);
        assert!(!is_newer("1.0.0", "unknown"));
    }

    #[test]
    fn max_version_picks_highest() {
        assert_eq!(
            max_version(["1.0.0", "2.1.0", "1.9.9"]).as_deref(),
            Some("2.1.0")
        );
        assert_eq!(max_version(Vec::<String>::new()), None);
    }
}
