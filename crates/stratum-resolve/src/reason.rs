//! Why a component version ended up in the graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recorded justification for a selected component.
///
/// Reasons accumulate: a forced version that later wins a conflict is both
/// `forced` and `conflict_resolution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SelectionReason {
    pub root: bool,
    pub forced: bool,
    pub conflict_resolution: bool,
    pub selected_by_rule: bool,
    pub replaced: bool,
}

impl SelectionReason {
    /// First requested version, nothing else happened.
    pub const REQUESTED: Self = Self {
        root: false,
        forced: false,
        conflict_resolution: false,
        selected_by_rule: false,
        replaced: false,
    };

    pub const ROOT: Self = Self {
        root: true,
        ..Self::REQUESTED
    };

    pub const FORCED: Self = Self {
        forced: true,
        ..Self::REQUESTED
    };

    pub const SELECTED_BY_RULE: Self = Self {
        selected_by_rule: true,
        ..Self::REQUESTED
    };

    #[must_use]
    pub fn with_conflict_resolution(self) -> Self {
        Self {
            conflict_resolution: true,
            ..self
        }
    }

    #[must_use]
    pub fn with_replacement(self) -> Self {
        Self {
            replaced: true,
            ..self
        }
    }

    /// Combine the reasons of two selectors that picked the same component.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            root: self.root || other.root,
            forced: self.forced || other.forced,
            conflict_resolution: self.conflict_resolution || other.conflict_resolution,
            selected_by_rule: self.selected_by_rule || other.selected_by_rule,
            replaced: self.replaced || other.replaced,
        }
    }

    /// True when the version is exactly what was asked for.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        !self.forced && !self.conflict_resolution && !self.selected_by_rule && !self.replaced
    }

    /// Human-readable description, stable across runs.
    #[must_use]
    pub fn description(&self) -> String {
        let mut parts = Vec::new();
        if self.conflict_resolution {
            parts.push("conflict resolution");
        }
        if self.forced {
            parts.push("forced");
        }
        if self.selected_by_rule {
            parts.push("selected by rule");
        }
        if self.replaced {
            parts.push("replaced");
        }
        if parts.is_empty() {
            return if self.root { "root" } else { "requested" }.to_string();
        }
        parts.join(", ")
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions() {
        assert_eq!(SelectionReason::ROOT.description(), "root");
        assert_eq!(SelectionReason::REQUESTED.description(), "requested");
        assert_eq!(
            SelectionReason::REQUESTED.with_conflict_resolution().description(),
            "conflict resolution"
        );
        assert_eq!(
            SelectionReason::FORCED.with_conflict_resolution().description(),
            "conflict resolution, forced"
        );
        assert_eq!(
            SelectionReason::REQUESTED.with_replacement().to_string(),
            "replaced"
        );
    }

    #[test]
    fn merge_accumulates() {
        let merged = SelectionReason::FORCED.merge(SelectionReason::SELECTED_BY_RULE);
        assert!(merged.forced);
        assert!(merged.selected_by_rule);
        assert!(!merged.is_expected());
        assert!(SelectionReason::ROOT.is_expected());
    }
}
