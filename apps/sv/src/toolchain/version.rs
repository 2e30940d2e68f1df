//! Go version tags.
//!
//! Go releases are tagged `go1.21.0`, `go1.22rc1`, `go1.9beta2` and so on.
//! These are not semver: the patch component is often missing on older
//! releases and pre-release labels are glued to the last number. Ordering is
//! numeric per component, and a pre-release sorts before its final release
//! with `alpha < beta < rc`.

use std::cmp::Ordering;
use std::fmt;

/// Normalizes user input to the canonical `go<version>` form.
///
/// `v1.21.0`, `1.21.0` and `go1.21.0` all become `go1.21.0`.
#[must_use]
pub fn normalize_tag(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("go") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix('v') {
        format!("go{rest}")
    } else {
        format!("go{trimmed}")
    }
}

/// Sorts tags newest first.
pub fn sort_newest_first(tags: &mut [String]) {
    tags.sort_by(|a, b| compare_tags(b, a));
}

/// Compares two tags by version order.
#[must_use]
pub fn compare_tags(a: &str, b: &str) -> Ordering {
    GoVersion::parse(a).cmp(&GoVersion::parse(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreRelease {
    Unknown,
    Alpha(u64),
    Beta(u64),
    Rc(u64),
}

/// A parsed version tag with a total order.
#[derive(Debug, Clone)]
pub struct GoVersion {
    raw: String,
    numbers: Vec<u64>,
    pre: Option<PreRelease>,
}

impl GoVersion {
    /// Parses a tag. Never fails: unparsable suffixes sort before any
    /// recognised pre-release of the same numbers.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let raw = normalize_tag(tag);
        let body = &raw[2..];

        let mut numbers = Vec::new();
        let mut rest = body;
        loop {
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if end == 0 {
                break;
            }
            numbers.push(rest[..end].parse().unwrap_or(u64::MAX));
            rest = &rest[end..];
            match rest.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
                _ => break,
            }
        }

        let pre = (!rest.is_empty()).then(|| parse_pre_release(rest));
        Self { raw, numbers, pre }
    }

    fn number(&self, index: usize) -> u64 {
        self.numbers.get(index).copied().unwrap_or(0)
    }
}

fn parse_pre_release(suffix: &str) -> PreRelease {
    let labels: [(&str, fn(u64) -> PreRelease); 3] = [
        ("alpha", PreRelease::Alpha),
        ("beta", PreRelease::Beta),
        ("rc", PreRelease::Rc),
    ];
    for (label, make) in labels {
        if let Some(n) = suffix.strip_prefix(label) {
            return n.parse().map_or(PreRelease::Unknown, make);
        }
    }
    PreRelease::Unknown
}

impl Ord for GoVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        (0..len)
            .map(|i| self.number(i).cmp(&other.number(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (self.pre, other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for GoVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GoVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GoVersion {}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
