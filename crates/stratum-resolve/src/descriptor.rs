//! Component descriptor (`component.toml`) parsing and validation.
//!
//! Descriptors are how file repositories and local projects describe a
//! component on disk:
//!
//! ```toml
//! [component]
//! group = "org.example"
//! name = "core"
//! version = "1.0"
//!
//! [configurations.runtime]
//! extends = ["default"]
//!
//! [[dependency]]
//! module = "org.example:util:1.+"
//! exclude = ["org.slf4j"]
//!
//! [[artifact]]
//! name = "core-1.0"
//! extension = "jar"
//! sha256 = "..."
//! ```

use crate::exclude::ExcludeRule;
use crate::identity::{
    ComponentIdentifier, ComponentSelector, CoordinateError, ModuleVersionIdentifier,
};
use crate::metadata::{
    ArtifactMetadata, ComponentMetadata, ConfigurationMetadata, DependencyMetadata,
    DEFAULT_CONFIGURATION,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Conventional descriptor file name inside a version directory.
pub const DESCRIPTOR_FILE: &str = "component.toml";

/// Errors that can occur when working with descriptors.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("failed to read descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse descriptor: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid coordinate in descriptor: {0}")]
    Coordinate(#[from] CoordinateError),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("dependency {index} must declare exactly one of 'module' or 'project'")]
    AmbiguousDependency { index: usize },

    #[error("unknown configuration '{configuration}' referenced by {referenced_by}")]
    UnknownConfiguration {
        configuration: String,
        referenced_by: String,
    },

    #[error("invalid sha256 '{0}' for artifact")]
    InvalidChecksum(String),
}

/// The complete component descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDescriptor {
    pub component: ComponentSection,

    #[serde(default)]
    pub configurations: BTreeMap<String, ConfigurationSection>,

    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DependencySection>,

    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ArtifactSection>,
}

/// Identity of the described component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSection {
    pub group: String,
    pub name: String,
    pub version: String,

    /// Project path when the component is built locally.
    #[serde(default)]
    pub project: Option<String>,

    #[serde(default = "default_status")]
    pub status: String,

    /// Modules excluded from every dependency of this component.
    #[serde(default)]
    pub excludes: Vec<String>,
}

fn default_status() -> String {
    "release".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationSection {
    #[serde(default)]
    pub extends: Vec<String>,

    #[serde(default = "default_true")]
    pub transitive: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySection {
    /// `group:name:version` notation.
    #[serde(default)]
    pub module: Option<String>,

    /// Project path, `:libs:core`.
    #[serde(default)]
    pub project: Option<String>,

    /// Configuration of this component the dependency belongs to.
    #[serde(default = "default_configuration")]
    pub configuration: String,

    /// Configuration of the target to depend on.
    #[serde(default = "default_configuration")]
    pub target: String,

    #[serde(default = "default_true")]
    pub transitive: bool,

    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_configuration() -> String {
    DEFAULT_CONFIGURATION.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSection {
    pub name: String,

    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default)]
    pub classifier: Option<String>,

    #[serde(default)]
    pub configurations: Vec<String>,

    /// Hex-encoded SHA-256 of the artifact file.
    #[serde(default)]
    pub sha256: Option<String>,
}

fn default_extension() -> String {
    "jar".to_string()
}

impl ArtifactSection {
    /// The file name this artifact is stored under.
    #[must_use]
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!("{}-{}.{}", self.name, classifier, self.extension),
            None => format!("{}.{}", self.name, self.extension),
        }
    }
}

impl ComponentDescriptor {
    /// Load a descriptor from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a descriptor from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn parse(content: &str) -> Result<Self, DescriptorError> {
        let descriptor: Self = toml::from_str(content)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if self.component.group.is_empty() {
            return Err(DescriptorError::MissingField("component.group"));
        }
        if self.component.name.is_empty() {
            return Err(DescriptorError::MissingField("component.name"));
        }
        if self.component.version.is_empty() {
            return Err(DescriptorError::MissingField("component.version"));
        }

        for (name, section) in &self.configurations {
            for parent in &section.extends {
                self.check_configuration(parent, &format!("configuration '{name}'"))?;
            }
        }

        for (index, dependency) in self.dependencies.iter().enumerate() {
            if dependency.module.is_some() == dependency.project.is_some() {
                return Err(DescriptorError::AmbiguousDependency { index });
            }
            self.check_configuration(&dependency.configuration, &format!("dependency {index}"))?;
        }

        for artifact in &self.artifacts {
            for configuration in &artifact.configurations {
                self.check_configuration(configuration, &format!("artifact '{}'", artifact.name))?;
            }
            if let Some(sha) = &artifact.sha256 {
                if sha.len() != 64 || hex::decode(sha).is_err() {
                    return Err(DescriptorError::InvalidChecksum(sha.clone()));
                }
            }
        }

        Ok(())
    }

    fn check_configuration(&self, name: &str, referenced_by: &str) -> Result<(), DescriptorError> {
        if name == DEFAULT_CONFIGURATION || self.configurations.contains_key(name) {
            return Ok(());
        }
        Err(DescriptorError::UnknownConfiguration {
            configuration: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })
    }

    /// The module version this descriptor describes.
    #[must_use]
    pub fn module_version(&self) -> ModuleVersionIdentifier {
        ModuleVersionIdentifier::new(
            &self.component.group,
            &self.component.name,
            &self.component.version,
        )
    }

    /// Expected checksum of an artifact file, if declared.
    #[must_use]
    pub fn checksum_for(&self, file_name: &str) -> Option<&str> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.file_name() == file_name)
            .and_then(|artifact| artifact.sha256.as_deref())
    }

    /// Convert into component metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency or exclude notation is malformed.
    pub fn to_metadata(&self) -> Result<ComponentMetadata, DescriptorError> {
        let id = self.module_version();
        let component_id = match &self.component.project {
            Some(path) => ComponentIdentifier::project(path),
            None => ComponentIdentifier::module(id.clone()),
        };

        let mut metadata = ComponentMetadata::new(component_id, id);
        metadata.status.clone_from(&self.component.status);
        metadata.excludes = parse_excludes(&self.component.excludes)?;

        for (name, section) in &self.configurations {
            metadata = metadata.with_configuration(ConfigurationMetadata {
                name: name.clone(),
                extends_from: section.extends.clone(),
                transitive: section.transitive,
            });
        }

        for dependency in &self.dependencies {
            let selector = match (&dependency.module, &dependency.project) {
                (Some(module), _) => ComponentSelector::parse(module)?,
                (None, Some(project)) => ComponentSelector::project(project),
                (None, None) => return Err(DescriptorError::MissingField("dependency.module")),
            };
            let mut declared = DependencyMetadata::new(selector)
                .from_configuration(&dependency.configuration)
                .to_configuration(&dependency.target);
            declared.transitive = dependency.transitive;
            declared.excludes = parse_excludes(&dependency.exclude)?;
            metadata = metadata.with_dependency(declared);
        }

        for artifact in &self.artifacts {
            metadata = metadata.with_artifact(ArtifactMetadata {
                name: artifact.name.clone(),
                extension: artifact.extension.clone(),
                classifier: artifact.classifier.clone(),
                configurations: artifact.configurations.clone(),
            });
        }

        Ok(metadata)
    }
}

fn parse_excludes(notations: &[String]) -> Result<Vec<ExcludeRule>, DescriptorError> {
    notations
        .iter()
        .map(|notation| ExcludeRule::parse(notation).map_err(DescriptorError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE: &str = r#"
[component]
group = "org.example"
name = "core"
version = "1.0"
excludes = ["org.slf4j"]

[configurations.compile]

[configurations.runtime]
extends = ["compile"]

[[dependency]]
module = "org.example:util:1.+"
configuration = "compile"
exclude = ["commons-logging:commons-logging"]

[[dependency]]
project = ":tools"
configuration = "runtime"
transitive = false

[[artifact]]
name = "core-1.0"
configurations = ["compile"]
sha256 = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
"#;

    #[test]
    fn parse_descriptor() {
        let descriptor = ComponentDescriptor::parse(CORE).unwrap();
        assert_eq!(descriptor.module_version().to_string(), "org.example:core:1.0");
        assert_eq!(descriptor.dependencies.len(), 2);
        assert_eq!(descriptor.artifacts[0].file_name(), "core-1.0.jar");
        assert!(descriptor.checksum_for("core-1.0.jar").is_some());
        assert!(descriptor.checksum_for("other.jar").is_none());
    }

    #[test]
    fn convert_to_metadata() {
        let metadata = ComponentDescriptor::parse(CORE).unwrap().to_metadata().unwrap();
        assert_eq!(metadata.excludes, vec![ExcludeRule::new("org.slf4j", "*")]);
        assert_eq!(metadata.hierarchy("runtime"), vec!["runtime", "compile"]);

        let runtime: Vec<_> = metadata.dependencies_for("runtime").collect();
        assert_eq!(runtime.len(), 2);
        assert_eq!(runtime[1].selector, ComponentSelector::project(":tools"));
        assert!(!runtime[1].transitive);
        assert_eq!(runtime[0].excludes.len(), 1);
        assert_eq!(metadata.artifacts_for("runtime").len(), 1);
    }

    #[test]
    fn project_descriptor_has_project_identifier() {
        let content = r#"
[component]
group = "org.example"
name = "app"
version = "unspecified"
project = ":app"
"#;
        let metadata = ComponentDescriptor::parse(content).unwrap().to_metadata().unwrap();
        assert_eq!(metadata.component_id, ComponentIdentifier::project(":app"));
    }

    #[test]
    fn rejects_unknown_configuration() {
        let content = r#"
[component]
group = "org"
name = "a"
version = "1"

[[dependency]]
module = "org:b:1"
configuration = "compile"
"#;
        let err = ComponentDescriptor::parse(content).unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownConfiguration { .. }));
    }

    #[test]
    fn rejects_ambiguous_dependency() {
        let content = r#"
[component]
group = "org"
name = "a"
version = "1"

[[dependency]]
module = "org:b:1"
project = ":b"
"#;
        let err = ComponentDescriptor::parse(content).unwrap_err();
        assert!(matches!(err, DescriptorError::AmbiguousDependency { index: 0 }));
    }

    #[test]
    fn rejects_bad_checksum() {
        let content = r#"
[component]
group = "org"
name = "a"
version = "1"

[[artifact]]
name = "a"
sha256 = "not-hex"
"#;
        assert!(matches!(
            ComponentDescriptor::parse(content),
            Err(DescriptorError::InvalidChecksum(_))
        ));
    }

    #[test]
    fn rejects_unknown_fields() {
        let content = r#"
[component]
group = "org"
name = "a"
version = "1"
colour = "blue"
"#;
        assert!(matches!(
            ComponentDescriptor::parse(content),
            Err(DescriptorError::Parse(_))
        ));
    }
}
