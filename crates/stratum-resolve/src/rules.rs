//! Build-wide rules supplied to every resolve request.

use crate::conflict::ModuleReplacements;
use crate::exclude::{pattern_matches, ExcludeRule};
use crate::metadata::ComponentMetadata;
use std::fmt;
use std::sync::Arc;

type MetadataCallback = Arc<dyn Fn(&mut ComponentMetadata) + Send + Sync>;

/// What a metadata rule does to a matching component.
#[derive(Clone)]
pub enum MetadataAction {
    /// Overwrite the component status.
    SetStatus(String),
    /// Drop declared dependencies on matching modules.
    RemoveDependencies(Vec<ExcludeRule>),
    /// Arbitrary in-place rewrite.
    Custom(MetadataCallback),
}

impl fmt::Debug for MetadataAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetStatus(status) => f.debug_tuple("SetStatus").field(status).finish(),
            Self::RemoveDependencies(rules) => {
                f.debug_tuple("RemoveDependencies").field(rules).finish()
            }
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Rewrites the metadata of repository components matching a module pattern.
#[derive(Debug, Clone)]
pub struct ComponentMetadataRule {
    group: String,
    name: String,
    action: MetadataAction,
}

impl ComponentMetadataRule {
    /// A rule for modules matching `group` and `name` patterns (`*` wildcards).
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>, action: MetadataAction) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            action,
        }
    }

    #[must_use]
    pub fn matches(&self, metadata: &ComponentMetadata) -> bool {
        pattern_matches(&self.group, metadata.id.group())
            && pattern_matches(&self.name, metadata.id.name())
    }

    /// Apply the rule if it matches.
    pub fn apply(&self, metadata: &mut ComponentMetadata) {
        if !self.matches(metadata) {
            return;
        }
        match &self.action {
            MetadataAction::SetStatus(status) => metadata.status.clone_from(status),
            MetadataAction::RemoveDependencies(rules) => metadata.dependencies.retain(|dep| {
                dep.selector
                    .module_id()
                    .map_or(true, |module| !rules.iter().any(|rule| rule.matches(module)))
            }),
            MetadataAction::Custom(callback) => callback(metadata),
        }
    }
}

/// Replacement and metadata rules shared by every request of a build.
#[derive(Debug, Clone, Default)]
pub struct GlobalDependencyResolutionRules {
    pub module_replacements: ModuleReplacements,
    pub metadata_rules: Vec<ComponentMetadataRule>,
}

impl GlobalDependencyResolutionRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_replacements(mut self, replacements: ModuleReplacements) -> Self {
        self.module_replacements = replacements;
        self
    }

    #[must_use]
    pub fn with_metadata_rule(mut self, rule: ComponentMetadataRule) -> Self {
        self.metadata_rules.push(rule);
        self
    }

    /// Apply every metadata rule in declaration order.
    pub fn process_metadata(&self, metadata: &mut ComponentMetadata) {
        for rule in &self.metadata_rules {
            rule.apply(metadata);
        }
    }
}
