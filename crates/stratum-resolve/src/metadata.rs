//! Resolved component metadata.
//!
//! Metadata is immutable once a resolver produces it; components are shared
//! through `Arc` across the graph and the result builders.

use crate::exclude::ExcludeRule;
use crate::identity::{
    ComponentArtifactIdentifier, ComponentIdentifier, ComponentSelector, ModuleVersionIdentifier,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The configuration used when a dependency does not name one.
pub const DEFAULT_CONFIGURATION: &str = "default";

/// A dependency declared by a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyMetadata {
    /// What is requested.
    pub selector: ComponentSelector,
    /// Configuration of the declaring component this dependency belongs to.
    pub from_configuration: String,
    /// Configuration of the target component to depend on.
    pub target_configuration: String,
    /// Modules pruned from the target's transitive dependencies.
    pub excludes: Vec<ExcludeRule>,
    /// Whether the target's own dependencies are followed.
    pub transitive: bool,
    /// Declared dependencies that replace the resolved module's.
    pub client_module: Option<ClientModule>,
}

impl DependencyMetadata {
    #[must_use]
    pub fn new(selector: ComponentSelector) -> Self {
        Self {
            selector,
            from_configuration: DEFAULT_CONFIGURATION.to_string(),
            target_configuration: DEFAULT_CONFIGURATION.to_string(),
            excludes: Vec::new(),
            transitive: true,
            client_module: None,
        }
    }

    #[must_use]
    pub fn from_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.from_configuration = configuration.into();
        self
    }

    #[must_use]
    pub fn to_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.target_configuration = configuration.into();
        self
    }

    #[must_use]
    pub fn exclude(mut self, rule: ExcludeRule) -> Self {
        self.excludes.push(rule);
        self
    }

    #[must_use]
    pub fn non_transitive(mut self) -> Self {
        self.transitive = false;
        self
    }

    #[must_use]
    pub fn with_client_module(mut self, client_module: ClientModule) -> Self {
        self.client_module = Some(client_module);
        self
    }

    /// A copy of this dependency pointing at another selector.
    #[must_use]
    pub fn with_selector(&self, selector: ComponentSelector) -> Self {
        Self {
            selector,
            ..self.clone()
        }
    }
}

/// A module whose dependencies are declared by the consumer instead of
/// read from the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientModule {
    pub id: ModuleVersionIdentifier,
    pub dependencies: Vec<DependencyMetadata>,
}

/// A named configuration (dependency bucket) of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationMetadata {
    pub name: String,
    #[serde(default)]
    pub extends_from: Vec<String>,
    #[serde(default = "default_true")]
    pub transitive: bool,
}

fn default_true() -> bool {
    true
}

impl ConfigurationMetadata {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends_from: Vec::new(),
            transitive: true,
        }
    }
}

/// A file published by a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,
    pub extension: String,
    #[serde(default)]
    pub classifier: Option<String>,
    /// Configurations that publish this artifact. Empty means all of them.
    #[serde(default)]
    pub configurations: Vec<String>,
}

/// The resolved description of one component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub component_id: ComponentIdentifier,
    pub id: ModuleVersionIdentifier,
    pub status: String,
    pub configurations: BTreeMap<String, ConfigurationMetadata>,
    pub dependencies: Vec<DependencyMetadata>,
    pub excludes: Vec<ExcludeRule>,
    pub artifacts: Vec<ArtifactMetadata>,
}

impl ComponentMetadata {
    /// Metadata with a single `default` configuration and nothing else.
    #[must_use]
    pub fn new(component_id: ComponentIdentifier, id: ModuleVersionIdentifier) -> Self {
        let mut configurations = BTreeMap::new();
        configurations.insert(
            DEFAULT_CONFIGURATION.to_string(),
            ConfigurationMetadata::new(DEFAULT_CONFIGURATION),
        );
        Self {
            component_id,
            id,
            status: "release".to_string(),
            configurations,
            dependencies: Vec::new(),
            excludes: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Metadata for a repository module.
    #[must_use]
    pub fn for_module(id: ModuleVersionIdentifier) -> Self {
        Self::new(ComponentIdentifier::module(id.clone()), id)
    }

    #[must_use]
    pub fn with_configuration(mut self, configuration: ConfigurationMetadata) -> Self {
        self.configurations
            .insert(configuration.name.clone(), configuration);
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyMetadata) -> Self {
        self.dependencies.push(dependency);
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: ArtifactMetadata) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// A copy whose dependencies are replaced.
    #[must_use]
    pub fn with_dependencies(&self, dependencies: Vec<DependencyMetadata>) -> Self {
        Self {
            dependencies,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<&ConfigurationMetadata> {
        self.configurations.get(name)
    }

    /// The configuration and everything it extends, nearest first.
    ///
    /// Unknown parents are skipped; cycles in `extends_from` are tolerated.
    #[must_use]
    pub fn hierarchy(&self, name: &str) -> Vec<&str> {
        let mut hierarchy: Vec<&str> = Vec::new();
        let mut pending = vec![name];
        while let Some(current) = pending.pop() {
            let Some(configuration) = self.configurations.get(current) else {
                continue;
            };
            if hierarchy.contains(&configuration.name.as_str()) {
                continue;
            }
            hierarchy.push(configuration.name.as_str());
            pending.extend(configuration.extends_from.iter().rev().map(String::as_str));
        }
        hierarchy
    }

    /// Dependencies declared in the configuration or anything it extends.
    pub fn dependencies_for<'a>(
        &'a self,
        configuration: &str,
    ) -> impl Iterator<Item = &'a DependencyMetadata> + 'a {
        let hierarchy: Vec<String> = self
            .hierarchy(configuration)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.dependencies
            .iter()
            .filter(move |dep| hierarchy.contains(&dep.from_configuration))
    }

    /// Artifacts published by the configuration or anything it extends.
    #[must_use]
    pub fn artifacts_for(&self, configuration: &str) -> Vec<ComponentArtifactIdentifier> {
        let hierarchy = self.hierarchy(configuration);
        self.artifacts
            .iter()
            .filter(|artifact| {
                artifact.configurations.is_empty()
                    || artifact
                        .configurations
                        .iter()
                        .any(|c| hierarchy.contains(&c.as_str()))
            })
            .map(|artifact| ComponentArtifactIdentifier {
                component: self.component_id.clone(),
                name: artifact.name.clone(),
                extension: artifact.extension.clone(),
                classifier: artifact.classifier.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component() -> ComponentMetadata {
        let mut runtime = ConfigurationMetadata::new("runtime");
        runtime.extends_from.push("compile".to_string());
        let mut default = ConfigurationMetadata::new(DEFAULT_CONFIGURATION);
        default.extends_from.push("runtime".to_string());

        ComponentMetadata::for_module(ModuleVersionIdentifier::new("org", "a", "1.0"))
            .with_configuration(ConfigurationMetadata::new("compile"))
            .with_configuration(runtime)
            .with_configuration(default)
            .with_dependency(
                DependencyMetadata::new(ComponentSelector::parse("org:b:1.0").unwrap())
                    .from_configuration("compile"),
            )
            .with_dependency(
                DependencyMetadata::new(ComponentSelector::parse("org:c:1.0").unwrap())
                    .from_configuration("runtime"),
            )
            .with_artifact(ArtifactMetadata {
                name: "a".to_string(),
                extension: "jar".to_string(),
                classifier: None,
                configurations: vec!["compile".to_string()],
            })
            .with_artifact(ArtifactMetadata {
                name: "a-tools".to_string(),
                extension: "jar".to_string(),
                classifier: None,
                configurations: vec!["runtime".to_string()],
            })
    }

    #[test]
    fn hierarchy_follows_extends() {
        let metadata = component();
        assert_eq!(metadata.hierarchy("default"), vec!["default", "runtime", "compile"]);
        assert_eq!(metadata.hierarchy("compile"), vec!["compile"]);
        assert!(metadata.hierarchy("missing").is_empty());
    }

    #[test]
    fn hierarchy_tolerates_cycles() {
        let mut a = ConfigurationMetadata::new("a");
        a.extends_from.push("b".to_string());
        let mut b = ConfigurationMetadata::new("b");
        b.extends_from.push("a".to_string());
        let metadata = ComponentMetadata::for_module(ModuleVersionIdentifier::new("org", "x", "1"))
            .with_configuration(a)
            .with_configuration(b);
        assert_eq!(metadata.hierarchy("a"), vec!["a", "b"]);
    }

    #[test]
    fn dependencies_per_configuration() {
        let metadata = component();
        assert_eq!(metadata.dependencies_for("compile").count(), 1);
        assert_eq!(metadata.dependencies_for("default").count(), 2);
    }

    #[test]
    fn artifacts_per_configuration() {
        let metadata = component();
        assert_eq!(metadata.artifacts_for("compile").len(), 1);
        let all = metadata.artifacts_for("default");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].file_name(), "a.jar");
    }

    #[test]
    fn with_dependencies_replaces() {
        let metadata = component().with_dependencies(Vec::new());
        assert_eq!(metadata.dependencies_for("default").count(), 0);
        assert_eq!(metadata.artifacts.len(), 2);
    }
}
