//! Module and component identifiers.

use crate::version::{VersionSelector, VersionSelectorError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced when parsing `group:name[:version]` notation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("invalid module notation '{notation}': {reason}")]
    InvalidNotation { notation: String, reason: String },

    #[error(transparent)]
    Selector(#[from] VersionSelectorError),
}

/// A logical module across all of its versions.
///
/// Equality and ordering ignore versions by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleIdentifier {
    pub group: String,
    pub name: String,
}

impl ModuleIdentifier {
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse `group:name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the notation does not have exactly two non-empty parts.
    pub fn parse(notation: &str) -> Result<Self, CoordinateError> {
        let parts = split_notation(notation, 2, 2)?;
        Ok(Self::new(parts[0], parts[1]))
    }

    /// Attach a version.
    #[must_use]
    pub fn with_version(&self, version: impl Into<String>) -> ModuleVersionIdentifier {
        ModuleVersionIdentifier {
            module: self.clone(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// One version of a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersionIdentifier {
    pub module: ModuleIdentifier,
    pub version: String,
}

impl ModuleVersionIdentifier {
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: ModuleIdentifier::new(group, name),
            version: version.into(),
        }
    }

    /// Parse `group:name:version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the notation does not have exactly three non-empty parts.
    pub fn parse(notation: &str) -> Result<Self, CoordinateError> {
        let parts = split_notation(notation, 3, 3)?;
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.module.group
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.module.name
    }
}

impl fmt::Display for ModuleVersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.version)
    }
}

fn split_notation(notation: &str, min: usize, max: usize) -> Result<Vec<&str>, CoordinateError> {
    let parts: Vec<&str> = notation.trim().split(':').collect();
    let invalid = |reason: String| CoordinateError::InvalidNotation {
        notation: notation.to_string(),
        reason,
    };

    if parts.len() < min || parts.len() > max {
        return Err(invalid(if min == max {
            format!("expected {min} parts separated by ':'")
        } else {
            format!("expected {min} to {max} parts separated by ':'")
        }));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid("parts cannot be empty".to_string()));
    }
    Ok(parts)
}

/// Identifies a resolved component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentIdentifier {
    /// A module version from a repository.
    Module { id: ModuleVersionIdentifier },
    /// A project built locally, identified by its path (`:app`, `:libs:core`).
    Project { path: String },
}

impl ComponentIdentifier {
    #[must_use]
    pub fn module(id: ModuleVersionIdentifier) -> Self {
        Self::Module { id }
    }

    #[must_use]
    pub fn project(path: impl Into<String>) -> Self {
        Self::Project { path: path.into() }
    }

    #[must_use]
    pub fn is_project(&self) -> bool {
        matches!(self, Self::Project { .. })
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { id } => write!(f, "{id}"),
            Self::Project { path } => write!(f, "project {path}"),
        }
    }
}

/// What a dependency asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentSelector {
    /// A module, with a version selector.
    Module {
        module: ModuleIdentifier,
        version: VersionSelector,
    },
    /// A local project.
    Project { path: String },
}

impl ComponentSelector {
    /// Parse `group:name:version` or a project path starting with `:`.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed module notation or version selectors.
    pub fn parse(notation: &str) -> Result<Self, CoordinateError> {
        let notation = notation.trim();
        if notation.starts_with(':') {
            return Ok(Self::project(notation));
        }
        let parts = split_notation(notation, 3, 3)?;
        Ok(Self::Module {
            module: ModuleIdentifier::new(parts[0], parts[1]),
            version: VersionSelector::parse(parts[2])?,
        })
    }

    /// Selector for an exact module version.
    #[must_use]
    pub fn exact(id: &ModuleVersionIdentifier) -> Self {
        Self::Module {
            module: id.module.clone(),
            version: VersionSelector::exact(&id.version),
        }
    }

    #[must_use]
    pub fn project(path: impl Into<String>) -> Self {
        Self::Project { path: path.into() }
    }

    /// The module this selector targets, if it is a module selector.
    #[must_use]
    pub fn module_id(&self) -> Option<&ModuleIdentifier> {
        match self {
            Self::Module { module, .. } => Some(module),
            Self::Project { .. } => None,
        }
    }
}

impl fmt::Display for ComponentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { module, version } => write!(f, "{module}:{version}"),
            Self::Project { path } => write!(f, "project {path}"),
        }
    }
}

/// One artifact (file) published by a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentArtifactIdentifier {
    pub component: ComponentIdentifier,
    pub name: String,
    pub extension: String,
    #[serde(default)]
    pub classifier: Option<String>,
}

impl ComponentArtifactIdentifier {
    /// The conventional file name, `name[-classifier].extension`.
    #[must_use]
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!("{}-{}.{}", self.name, classifier, self.extension),
            None => format!("{}.{}", self.name, self.extension),
        }
    }
}

impl fmt::Display for ComponentArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file_name(), self.component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_module_identifier() {
        let id = ModuleIdentifier::parse("org.example:core").unwrap();
        assert_eq!(id.group, "org.example");
        assert_eq!(id.name, "core");
        assert_eq!(id.to_string(), "org.example:core");
    }

    #[test]
    fn parse_module_identifier_invalid() {
        assert!(ModuleIdentifier::parse("org.example").is_err());
        assert!(ModuleIdentifier::parse("org::core").is_err());
        assert!(ModuleIdentifier::parse("a:b:c").is_err());
    }

    #[test]
    fn identity_ignores_version() {
        let a = ModuleVersionIdentifier::parse("org:a:1.0").unwrap();
        let b = ModuleVersionIdentifier::parse("org:a:2.0").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.module, b.module);
    }

    #[test]
    fn parse_selector() {
        let selector = ComponentSelector::parse("org:a:1.+").unwrap();
        match &selector {
            ComponentSelector::Module { module, version } => {
                assert_eq!(module.to_string(), "org:a");
                assert!(version.is_dynamic());
            }
            ComponentSelector::Project { .. } => panic!("expected module selector"),
        }
        assert_eq!(selector.to_string(), "org:a:1.+");

        let project = ComponentSelector::parse(":libs:core").unwrap();
        assert_eq!(project, ComponentSelector::project(":libs:core"));
        assert!(project.module_id().is_none());
    }

    #[test]
    fn artifact_file_name() {
        let artifact = ComponentArtifactIdentifier {
            component: ComponentIdentifier::module(ModuleVersionIdentifier::new("org", "a", "1.0")),
            name: "a-1.0".to_string(),
            extension: "jar".to_string(),
            classifier: Some("sources".to_string()),
        };
        assert_eq!(artifact.file_name(), "a-1.0-sources.jar");
        assert_eq!(artifact.to_string(), "a-1.0-sources.jar (org:a:1.0)");
    }

    #[test]
    fn component_identifier_serde() {
        let id = ComponentIdentifier::project(":app");
        let json = serde_json::to_string(&id).unwrap();
        let back: ComponentIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
