//! Local components: projects of the current build and ad-hoc roots.
//!
//! The build hands the resolver opaque [`LocalSource`] values. A
//! [`LocalComponentConverterChain`] turns them into component metadata,
//! using the first registered converter that accepts the source.

use crate::descriptor::ComponentDescriptor;
use crate::error::ResolveError;
use crate::exclude::ExcludeRule;
use crate::identity::{ComponentIdentifier, ModuleVersionIdentifier};
use crate::metadata::{
    ArtifactMetadata, ComponentMetadata, ConfigurationMetadata, DependencyMetadata,
};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Version given to local components that do not declare one.
pub const UNSPECIFIED_VERSION: &str = "unspecified";

/// A project of the current build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectModel {
    /// Project path, `:app` or `:libs:core`.
    pub path: String,
    pub id: ModuleVersionIdentifier,
    /// Where the project's artifacts are produced.
    pub build_dir: PathBuf,
    pub configurations: Vec<ConfigurationMetadata>,
    pub dependencies: Vec<DependencyMetadata>,
    pub excludes: Vec<ExcludeRule>,
    pub artifacts: Vec<ArtifactMetadata>,
}

impl ProjectModel {
    #[must_use]
    pub fn new(path: impl Into<String>, id: ModuleVersionIdentifier) -> Self {
        let path = path.into();
        let build_dir = PathBuf::from(path.trim_start_matches(':').replace(':', "/")).join("build");
        Self {
            path,
            id,
            build_dir,
            configurations: Vec::new(),
            dependencies: Vec::new(),
            excludes: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    #[must_use]
    pub fn with_configuration(mut self, configuration: ConfigurationMetadata) -> Self {
        self.configurations.push(configuration);
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyMetadata) -> Self {
        self.dependencies.push(dependency);
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, rule: ExcludeRule) -> Self {
        self.excludes.push(rule);
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: ArtifactMetadata) -> Self {
        self.artifacts.push(artifact);
        self
    }
}

/// A root that is not part of any project, such as a one-off
/// dependency query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedRoot {
    pub name: String,
    pub dependencies: Vec<DependencyMetadata>,
}

impl DetachedRoot {
    #[must_use]
    pub fn new(name: impl Into<String>, dependencies: Vec<DependencyMetadata>) -> Self {
        Self {
            name: name.into(),
            dependencies,
        }
    }
}

/// An object of the local build model that can become a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSource {
    Project(ProjectModel),
    /// Path to a `component.toml` describing a local component.
    Descriptor(PathBuf),
    Detached(DetachedRoot),
}

impl LocalSource {
    /// Name of the concrete source type, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Project(_) => "project",
            Self::Descriptor(_) => "descriptor",
            Self::Detached(_) => "detached",
        }
    }

    /// Directory local artifacts of this source are found in.
    #[must_use]
    pub fn artifact_dir(&self) -> Option<PathBuf> {
        match self {
            Self::Project(project) => Some(project.build_dir.clone()),
            Self::Descriptor(path) => path.parent().map(Path::to_path_buf),
            Self::Detached(_) => None,
        }
    }
}

/// One way of converting local sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalComponentConverter {
    Project,
    Descriptor,
    Detached,
}

impl LocalComponentConverter {
    #[must_use]
    pub fn can_convert(&self, source: &LocalSource) -> bool {
        matches!(
            (self, source),
            (Self::Project, LocalSource::Project(_))
                | (Self::Descriptor, LocalSource::Descriptor(_))
                | (Self::Detached, LocalSource::Detached(_))
        )
    }

    /// Convert a source this converter accepts.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is of another kind or a descriptor
    /// cannot be read.
    pub fn convert(&self, source: &LocalSource) -> Result<ComponentMetadata, ResolveError> {
        match (self, source) {
            (Self::Project, LocalSource::Project(project)) => Ok(convert_project(project)),
            (Self::Descriptor, LocalSource::Descriptor(path)) => {
                trace!(path = %path.display(), "converting descriptor");
                Ok(ComponentDescriptor::from_path(path)?.to_metadata()?)
            }
            (Self::Detached, LocalSource::Detached(root)) => Ok(convert_detached(root)),
            _ => Err(ResolveError::UnconvertibleSource {
                kind: source.kind().to_string(),
            }),
        }
    }
}

fn convert_project(project: &ProjectModel) -> ComponentMetadata {
    let mut metadata =
        ComponentMetadata::new(ComponentIdentifier::project(&project.path), project.id.clone());
    for configuration in &project.configurations {
        metadata = metadata.with_configuration(configuration.clone());
    }
    metadata.dependencies.clone_from(&project.dependencies);
    metadata.excludes.clone_from(&project.excludes);
    metadata.artifacts.clone_from(&project.artifacts);
    metadata
}

fn convert_detached(root: &DetachedRoot) -> ComponentMetadata {
    let id = ModuleVersionIdentifier::new("detached", &root.name, UNSPECIFIED_VERSION);
    let mut metadata = ComponentMetadata::for_module(id);
    metadata.dependencies.clone_from(&root.dependencies);
    metadata
}

/// Converters tried in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalComponentConverterChain {
    converters: Vec<LocalComponentConverter>,
}

impl Default for LocalComponentConverterChain {
    fn default() -> Self {
        Self::new(vec![
            LocalComponentConverter::Project,
            LocalComponentConverter::Descriptor,
            LocalComponentConverter::Detached,
        ])
    }
}

impl LocalComponentConverterChain {
    #[must_use]
    pub fn new(converters: Vec<LocalComponentConverter>) -> Self {
        Self { converters }
    }

    /// Convert with the first converter that accepts the source.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnconvertibleSource`] naming the source kind
    /// if no converter accepts it, or the converter's own error.
    pub fn convert(&self, source: &LocalSource) -> Result<ComponentMetadata, ResolveError> {
        self.converters
            .iter()
            .find(|converter| converter.can_convert(source))
            .ok_or_else(|| ResolveError::UnconvertibleSource {
                kind: source.kind().to_string(),
            })?
            .convert(source)
    }
}
