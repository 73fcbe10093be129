//! Version ordering and version selectors.
//!
//! Versions are not semver: module repositories carry versions such as
//! `1.0`, `2.1.3-rc1` or `1.0.0.Final`. They are compared part by part:
//! - Parts are split on `.`, `-`, `_`, `+` and between digit and non-digit runs
//! - Numeric parts compare numerically and sort above textual parts
//! - Textual parts compare by qualifier rank (`dev` < others < `rc` < `final`/`release`)
//! - `1.0` < `1.0.1`, but `1.0-beta` < `1.0`
//!
//! Selectors describe which versions a dependency accepts. Dynamic
//! selectors (prefix, latest, ranges, semver requirements) are resolved
//! against the versions a repository lists.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors produced when parsing a version selector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionSelectorError {
    #[error("version selector cannot be empty")]
    Empty,

    #[error("invalid version range '{selector}': {reason}")]
    InvalidRange { selector: String, reason: String },

    #[error("invalid version requirement '{selector}': {reason}")]
    InvalidRequirement { selector: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Part {
    /// Digits with leading zeros stripped.
    Numeric(String),
    Text(String),
}

impl Part {
    fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }
}

/// A parsed version string with a total ordering.
///
/// Two versions that differ only by separators (`1.0` and `1-0`) compare
/// equal. The original string is kept for display.
#[derive(Debug, Clone)]
pub struct Version {
    source: String,
    parts: Vec<Part>,
}

impl Version {
    /// Parse a version string. Parsing never fails; any string is a version.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        Self {
            source: source.to_string(),
            parts: split_parts(source),
        }
    }

    /// The version string as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn split_parts(source: &str) -> Vec<Part> {
    fn flush(parts: &mut Vec<Part>, current: &mut String, digits: bool) {
        if current.is_empty() {
            return;
        }
        let part = if digits {
            let trimmed = current.trim_start_matches('0');
            Part::Numeric(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
        } else {
            Part::Text(current.clone())
        };
        parts.push(part);
        current.clear();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut digits = false;

    for c in source.chars() {
        if matches!(c, '.' | '-' | '_' | '+') {
            flush(&mut parts, &mut current, digits);
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if !current.is_empty() && is_digit != digits {
            flush(&mut parts, &mut current, digits);
        }
        digits = is_digit;
        current.push(c);
    }
    flush(&mut parts, &mut current, digits);
    parts
}

fn qualifier_rank(qualifier: &str) -> u8 {
    match qualifier.to_ascii_lowercase().as_str() {
        "dev" => 0,
        "rc" => 2,
        "final" | "release" => 3,
        _ => 1,
    }
}

fn compare_parts(a: &Part, b: &Part) -> Ordering {
    match (a, b) {
        (Part::Numeric(x), Part::Numeric(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Part::Numeric(_), Part::Text(_)) => Ordering::Greater,
        (Part::Text(_), Part::Numeric(_)) => Ordering::Less,
        (Part::Text(x), Part::Text(y)) => qualifier_rank(x)
            .cmp(&qualifier_rank(y))
            .then_with(|| x.cmp(y)),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            match (self.parts.get(i), other.parts.get(i)) {
                (Some(a), Some(b)) => {
                    let ord = compare_parts(a, b);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                // A trailing numeric part extends the version, a trailing
                // qualifier marks a pre-release of it.
                (Some(extra), None) => {
                    return if extra.is_numeric() {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                }
                (None, Some(extra)) => {
                    return if extra.is_numeric() {
                        Ordering::Less
                    } else {
                        Ordering::Greater
                    };
                }
                (None, None) => break,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Total ordering over version strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionComparator;

impl VersionComparator {
    /// Create the default comparator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compare two version strings.
    #[must_use]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        Version::parse(a).cmp(&Version::parse(b))
    }

    /// Return the highest version in the iterator, keeping the first one seen
    /// among versions that compare equal.
    pub fn max<'a>(&self, versions: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
        versions.into_iter().fold(None, |best, candidate| match best {
            Some(current) if self.compare(candidate, current) != Ordering::Greater => Some(current),
            _ => Some(candidate),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RangeBound {
    version: String,
    inclusive: bool,
}

#[derive(Debug, Clone)]
enum SelectorKind {
    Exact,
    Prefix(String),
    Latest,
    Range {
        lower: Option<RangeBound>,
        upper: Option<RangeBound>,
    },
    Requirement(semver::VersionReq),
}

/// The accepted versions of a dependency, as declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSelector {
    raw: String,
    kind: SelectorKind,
}

impl VersionSelector {
    /// Parse a selector.
    ///
    /// Supported forms:
    /// - `1.2` exact version
    /// - `1.+` prefix
    /// - `+`, `latest.integration`, `latest.release` latest available
    /// - `[1.0,2.0)`, `]1.0,2.0]`, `[1.0,)` ranges
    /// - `^1.2`, `~1.2`, `>=1.0, <2.0` semver requirements
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is empty or a range or requirement
    /// is malformed.
    pub fn parse(raw: &str) -> Result<Self, VersionSelectorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(VersionSelectorError::Empty);
        }

        let kind = if raw == "+" || raw.starts_with("latest.") {
            SelectorKind::Latest
        } else if let Some(prefix) = raw.strip_suffix('+') {
            SelectorKind::Prefix(prefix.to_string())
        } else if raw.starts_with(['[', ']', '(']) {
            parse_range(raw)?
        } else if raw.starts_with(['^', '~', '>', '<', '=']) || raw.contains(',') || raw.contains('*')
        {
            let req = semver::VersionReq::parse(raw).map_err(|e| {
                VersionSelectorError::InvalidRequirement {
                    selector: raw.to_string(),
                    reason: e.to_string(),
                }
            })?;
            SelectorKind::Requirement(req)
        } else {
            SelectorKind::Exact
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
        })
    }

    /// Selector for exactly one version.
    #[must_use]
    pub fn exact(version: &str) -> Self {
        Self {
            raw: version.to_string(),
            kind: SelectorKind::Exact,
        }
    }

    /// The selector as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if resolving this selector requires listing versions.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        !matches!(self.kind, SelectorKind::Exact)
    }

    /// Check whether a candidate version satisfies this selector.
    #[must_use]
    pub fn accepts(&self, candidate: &str) -> bool {
        match &self.kind {
            SelectorKind::Exact => self.raw == candidate,
            SelectorKind::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            SelectorKind::Latest => true,
            SelectorKind::Range { lower, upper } => {
                let version = Version::parse(candidate);
                let above = lower.as_ref().map_or(true, |bound| {
                    let ord = version.cmp(&Version::parse(&bound.version));
                    ord == Ordering::Greater || (bound.inclusive && ord == Ordering::Equal)
                });
                let below = upper.as_ref().map_or(true, |bound| {
                    let ord = version.cmp(&Version::parse(&bound.version));
                    ord == Ordering::Less || (bound.inclusive && ord == Ordering::Equal)
                });
                above && below
            }
            SelectorKind::Requirement(req) => {
                semver::Version::parse(candidate).is_ok_and(|v| req.matches(&v))
            }
        }
    }

    /// Pick the highest candidate accepted by this selector.
    pub fn select<'a>(
        &self,
        comparator: &VersionComparator,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Option<&'a str> {
        comparator.max(candidates.into_iter().filter(|c| self.accepts(c)))
    }
}

fn parse_range(raw: &str) -> Result<SelectorKind, VersionSelectorError> {
    let invalid = |reason: &str| VersionSelectorError::InvalidRange {
        selector: raw.to_string(),
        reason: reason.to_string(),
    };

    let lower_inclusive = raw.starts_with('[');
    let upper_inclusive = raw.ends_with(']');
    if !raw.ends_with([']', '[', ')']) || raw.len() < 3 {
        return Err(invalid("missing closing bracket"));
    }

    let inner = &raw[1..raw.len() - 1];
    let (low, high) = inner
        .split_once(',')
        .ok_or_else(|| invalid("expected 'lower,upper'"))?;
    let (low, high) = (low.trim(), high.trim());
    if low.is_empty() && high.is_empty() {
        return Err(invalid("at least one bound is required"));
    }

    let bound = |version: &str, inclusive: bool| {
        (!version.is_empty()).then(|| RangeBound {
            version: version.to_string(),
            inclusive,
        })
    };

    Ok(SelectorKind::Range {
        lower: bound(low, lower_inclusive),
        upper: bound(high, upper_inclusive),
    })
}

impl TryFrom<String> for VersionSelector {
    type Error = VersionSelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionSelector> for String {
    fn from(selector: VersionSelector) -> Self {
        selector.raw
    }
}

impl PartialEq for VersionSelector {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for VersionSelector {}

impl Hash for VersionSelector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for VersionSelector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionSelector {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
