//! Exclude rules and per-path module exclusion.
//!
//! An exclude rule on a dependency prunes matching modules from the
//! transitive dependencies of its target. Exclusions are tracked per path:
//! a node reached through several incoming edges only excludes a module
//! when every path to it excludes that module.

use crate::identity::{CoordinateError, ModuleIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Excludes modules by group and module name patterns (`*` wildcards).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExcludeRule {
    #[serde(default = "any")]
    pub group: String,
    #[serde(default = "any")]
    pub module: String,
}

fn any() -> String {
    "*".to_string()
}

impl ExcludeRule {
    #[must_use]
    pub fn new(group: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            module: module.into(),
        }
    }

    /// Parse `group:module` or `group` (all modules of the group).
    ///
    /// # Errors
    ///
    /// Returns an error for empty patterns or more than two parts.
    pub fn parse(notation: &str) -> Result<Self, CoordinateError> {
        let invalid = |reason: &str| CoordinateError::InvalidNotation {
            notation: notation.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = notation.trim().split(':');
        let group = parts.next().unwrap_or_default();
        let module = parts.next().unwrap_or("*");
        if parts.next().is_some() {
            return Err(invalid("expected 'group' or 'group:module'"));
        }
        if group.is_empty() || module.is_empty() {
            return Err(invalid("patterns cannot be empty"));
        }
        Ok(Self::new(group, module))
    }

    /// Check whether this rule excludes a module.
    #[must_use]
    pub fn matches(&self, module: &ModuleIdentifier) -> bool {
        pattern_matches(&self.group, &module.group) && pattern_matches(&self.module, &module.name)
    }
}

pub(crate) fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains(['*', '?', '[']) {
        return pattern == value;
    }
    glob::Pattern::new(pattern).map_or(pattern == value, |p| p.matches(value))
}

impl fmt::Display for ExcludeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.module)
    }
}

/// Exclusion in effect at a node of the graph.
///
/// Stored as a set of alternatives, one per distinct path. A module is
/// excluded when every alternative contains a matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExclusion {
    alternatives: BTreeSet<BTreeSet<ExcludeRule>>,
}

impl ModuleExclusion {
    /// Excludes nothing.
    #[must_use]
    pub fn nothing() -> Self {
        Self {
            alternatives: BTreeSet::from([BTreeSet::new()]),
        }
    }

    /// Excludes whatever matches any of the rules.
    #[must_use]
    pub fn of(rules: impl IntoIterator<Item = ExcludeRule>) -> Self {
        Self {
            alternatives: BTreeSet::from([rules.into_iter().collect()]),
        }
    }

    #[must_use]
    pub fn excludes(&self, module: &ModuleIdentifier) -> bool {
        self.alternatives
            .iter()
            .all(|rules| rules.iter().any(|rule| rule.matches(module)))
    }

    #[must_use]
    pub fn excludes_nothing(&self) -> bool {
        self.alternatives.iter().any(BTreeSet::is_empty)
    }

    /// Extend every path with additional rules.
    #[must_use]
    pub fn with_rules(&self, rules: &[ExcludeRule]) -> Self {
        if rules.is_empty() {
            return self.clone();
        }
        let alternatives = self
            .alternatives
            .iter()
            .map(|alt| alt.iter().chain(rules).cloned().collect())
            .collect();
        Self { alternatives }.normalized()
    }

    /// Merge two paths reaching the same node.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        if self.excludes_nothing() || other.excludes_nothing() {
            return Self::nothing();
        }
        let alternatives = self
            .alternatives
            .union(&other.alternatives)
            .cloned()
            .collect();
        Self { alternatives }.normalized()
    }

    /// Drop alternatives that are supersets of another one; they cannot
    /// change the outcome of [`Self::excludes`].
    fn normalized(self) -> Self {
        let alternatives = self
            .alternatives
            .iter()
            .filter(|alt| {
                !self
                    .alternatives
                    .iter()
                    .any(|other| other != *alt && other.is_subset(alt))
            })
            .cloned()
            .collect();
        Self { alternatives }
    }
}
