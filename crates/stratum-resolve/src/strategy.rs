//! Per-request resolution strategy: conflict policy, forced versions and
//! dependency substitution rules.

use crate::exclude::pattern_matches;
use crate::identity::{ComponentSelector, ModuleVersionIdentifier};
use crate::reason::SelectionReason;
use crate::version::VersionSelector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How version conflicts are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// The highest version wins.
    #[default]
    Latest,
    /// Any conflict fails the request.
    Strict,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Which requested selectors a substitution applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SubstitutionSource {
    /// Modules matching group and name patterns, optionally one version only.
    Module {
        group: String,
        name: String,
        #[serde(default)]
        version: Option<String>,
    },
    /// A project dependency.
    Project { path: String },
}

impl SubstitutionSource {
    #[must_use]
    pub fn matches(&self, selector: &ComponentSelector) -> bool {
        match (self, selector) {
            (
                Self::Module {
                    group,
                    name,
                    version,
                },
                ComponentSelector::Module {
                    module,
                    version: requested,
                },
            ) => {
                pattern_matches(group, &module.group)
                    && pattern_matches(name, &module.name)
                    && version.as_ref().map_or(true, |v| v == requested.as_str())
            }
            (Self::Project { path }, ComponentSelector::Project { path: requested }) => {
                path == requested
            }
            _ => false,
        }
    }
}

/// Rewrites matching requested selectors to another target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySubstitution {
    pub requested: SubstitutionSource,
    pub target: ComponentSelector,
}

impl DependencySubstitution {
    #[must_use]
    pub fn new(requested: SubstitutionSource, target: ComponentSelector) -> Self {
        Self { requested, target }
    }
}

/// Strategy in effect for one resolve request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStrategy {
    pub conflict: ConflictStrategy,
    /// Versions that override whatever is requested for their module.
    pub forced: Vec<ModuleVersionIdentifier>,
    /// Applied in order; the first matching rule wins.
    pub substitutions: Vec<DependencySubstitution>,
}

impl ResolutionStrategy {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            conflict: ConflictStrategy::Strict,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn force(mut self, id: ModuleVersionIdentifier) -> Self {
        self.forced.push(id);
        self
    }

    #[must_use]
    pub fn substitute(mut self, substitution: DependencySubstitution) -> Self {
        self.substitutions.push(substitution);
        self
    }

    /// True when no rule can rewrite a selector.
    #[must_use]
    pub fn has_rules(&self) -> bool {
        !self.forced.is_empty() || !self.substitutions.is_empty()
    }

    /// The selector to resolve instead of `requested`, with the reason for
    /// the rewrite. Returns `None` when no rule applies.
    #[must_use]
    pub fn apply(&self, requested: &ComponentSelector) -> Option<(ComponentSelector, SelectionReason)> {
        let mut selector = requested.clone();
        let mut reason = SelectionReason::REQUESTED;

        if let Some(substitution) = self
            .substitutions
            .iter()
            .find(|rule| rule.requested.matches(requested))
        {
            selector = substitution.target.clone();
            reason = reason.merge(SelectionReason::SELECTED_BY_RULE);
        }

        if let ComponentSelector::Module { module, version } = &selector {
            if let Some(forced) = self.forced.iter().find(|forced| &forced.module == module) {
                if version.as_str() != forced.version {
                    selector = ComponentSelector::Module {
                        module: module.clone(),
                        version: VersionSelector::exact(&forced.version),
                    };
                }
                reason = reason.merge(SelectionReason::FORCED);
            }
        }

        (reason != SelectionReason::REQUESTED).then_some((selector, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(notation: &str) -> ComponentSelector {
        ComponentSelector::parse(notation).unwrap()
    }

    #[test]
    fn no_rules_no_rewrite() {
        assert!(ResolutionStrategy::default().apply(&selector("org:a:1.0")).is_none());
    }

    #[test]
    fn forced_version_overrides_request() {
        let strategy =
            ResolutionStrategy::default().force(ModuleVersionIdentifier::new("org", "a", "1.5"));
        let (rewritten, reason) = strategy.apply(&selector("org:a:2.0")).unwrap();
        assert_eq!(rewritten, selector("org:a:1.5"));
        assert_eq!(reason, SelectionReason::FORCED);

        let (same, reason) = strategy.apply(&selector("org:a:1.5")).unwrap();
        assert_eq!(same, selector("org:a:1.5"));
        assert!(reason.forced);
        assert!(strategy.apply(&selector("org:b:1.0")).is_none());
    }

    #[test]
    fn substitution_to_project() {
        let strategy = ResolutionStrategy::default().substitute(DependencySubstitution::new(
            SubstitutionSource::Module {
                group: "org".into(),
                name: "a*".into(),
                version: None,
            },
            ComponentSelector::project(":a"),
        ));
        let (rewritten, reason) = strategy.apply(&selector("org:api:3.0")).unwrap();
        assert_eq!(rewritten, ComponentSelector::project(":a"));
        assert_eq!(reason, SelectionReason::SELECTED_BY_RULE);
        assert!(strategy.apply(&selector("org:b:1.0")).is_none());
    }

    #[test]
    fn substitution_with_version_filter() {
        let strategy = ResolutionStrategy::default().substitute(DependencySubstitution::new(
            SubstitutionSource::Module {
                group: "org".into(),
                name: "a".into(),
                version: Some("1.0".into()),
            },
            selector("org:a:1.1"),
        ));
        assert!(strategy.apply(&selector("org:a:1.0")).is_some());
        assert!(strategy.apply(&selector("org:a:2.0")).is_none());
    }

    #[test]
    fn substitution_then_force() {
        let strategy = ResolutionStrategy::default()
            .substitute(DependencySubstitution::new(
                SubstitutionSource::Module {
                    group: "org".into(),
                    name: "legacy".into(),
                    version: None,
                },
                selector("org:modern:1.0"),
            ))
            .force(ModuleVersionIdentifier::new("org", "modern", "2.0"));
        let (rewritten, reason) = strategy.apply(&selector("org:legacy:0.9")).unwrap();
        assert_eq!(rewritten, selector("org:modern:2.0"));
        assert!(reason.forced && reason.selected_by_rule);
    }
}
