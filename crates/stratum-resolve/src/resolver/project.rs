use super::{
    ArtifactResolveResult, ComponentResolveResult, DependencyResolver, IdResolveResult,
    ResolveOutcome, ResolvedId,
};
use crate::error::ResolveError;
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier, ComponentSelector};
use crate::local::{LocalComponentConverterChain, LocalSource};
use crate::metadata::{ComponentMetadata, DependencyMetadata};
use crate::reason::SelectionReason;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

const SEARCHED: &str = "local projects";

#[derive(Debug)]
struct LocalProject {
    metadata: Arc<ComponentMetadata>,
    artifact_dir: Option<PathBuf>,
}

/// Resolves project dependencies against the projects of the build.
///
/// Projects are converted once, up front, so repeated lookups return the
/// same metadata.
#[derive(Debug, Default)]
pub struct ProjectDependencyResolver {
    projects: BTreeMap<String, LocalProject>,
}

impl ProjectDependencyResolver {
    /// Convert every project source.
    ///
    /// Sources that do not convert to a project component are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be converted at all.
    pub fn build(
        converters: &LocalComponentConverterChain,
        sources: &[LocalSource],
    ) -> Result<Self, ResolveError> {
        let mut projects = BTreeMap::new();
        for source in sources {
            let metadata = converters.convert(source)?;
            let ComponentIdentifier::Project { path } = &metadata.component_id else {
                warn!(component = %metadata.component_id, "local source is not a project, skipping");
                continue;
            };
            projects.insert(
                path.clone(),
                LocalProject {
                    artifact_dir: source.artifact_dir(),
                    metadata: Arc::new(metadata),
                },
            );
        }
        Ok(Self { projects })
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.projects.contains_key(path)
    }

    fn project(&self, path: &str) -> ResolveOutcome<&LocalProject> {
        self.projects
            .get(path)
            .map_or_else(|| ResolveOutcome::NotFound(vec![SEARCHED.to_string()]), ResolveOutcome::Resolved)
    }
}

impl DependencyResolver for ProjectDependencyResolver {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult {
        let ComponentSelector::Project { path } = &dependency.selector else {
            return ResolveOutcome::NotFound(Vec::new());
        };
        self.project(path).map(|project| ResolvedId {
            id: project.metadata.component_id.clone(),
            module_version: project.metadata.id.clone(),
            reason: SelectionReason::REQUESTED,
            metadata: Some(project.metadata.clone()),
        })
    }

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult {
        match id {
            ComponentIdentifier::Project { path } => {
                self.project(path).map(|project| project.metadata.clone())
            }
            ComponentIdentifier::Module { .. } => ResolveOutcome::NotFound(Vec::new()),
        }
    }

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
        let ComponentIdentifier::Project { path } = &artifact.component else {
            return ResolveOutcome::NotFound(Vec::new());
        };
        match self.projects.get(path).and_then(|p| p.artifact_dir.as_ref()) {
            Some(dir) => ResolveOutcome::Resolved(dir.join(artifact.file_name())),
            None => ResolveOutcome::NotFound(vec![SEARCHED.to_string()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ModuleVersionIdentifier;
    use crate::local::{DetachedRoot, LocalComponentConverter, ProjectModel};

    fn projects() -> Vec<LocalSource> {
        vec![
            LocalSource::Project(
                ProjectModel::new(":lib", ModuleVersionIdentifier::new("org", "lib", "1.0"))
                    .with_build_dir("/work/lib/build"),
            ),
            LocalSource::Detached(DetachedRoot::new("ignored", Vec::new())),
        ]
    }

    #[test]
    fn resolves_known_projects() {
        let resolver =
            ProjectDependencyResolver::build(&LocalComponentConverterChain::default(), &projects())
                .unwrap();
        assert!(resolver.contains(":lib"));
        assert!(!resolver.contains("ignored"));

        let resolved = resolver.resolve_id(&DependencyMetadata::new(ComponentSelector::project(":lib")));
        let id = resolved.resolved().unwrap();
        assert_eq!(id.id, ComponentIdentifier::project(":lib"));
        assert_eq!(id.module_version.to_string(), "org:lib:1.0");

        let first = resolver.resolve_component(&id.id);
        let second = resolver.resolve_component(&id.id);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_projects_and_modules_miss() {
        let resolver =
            ProjectDependencyResolver::build(&LocalComponentConverterChain::default(), &projects())
                .unwrap();
        assert_eq!(
            resolver.resolve_id(&DependencyMetadata::new(ComponentSelector::project(":other"))),
            ResolveOutcome::NotFound(vec![SEARCHED.to_string()])
        );
        assert_eq!(
            resolver.resolve_id(&DependencyMetadata::new(
                ComponentSelector::parse("org:lib:1.0").unwrap()
            )),
            ResolveOutcome::NotFound(Vec::new())
        );
    }

    #[test]
    fn project_artifacts_live_in_build_dir() {
        let resolver =
            ProjectDependencyResolver::build(&LocalComponentConverterChain::default(), &projects())
                .unwrap();
        let artifact = ComponentArtifactIdentifier {
            component: ComponentIdentifier::project(":lib"),
            name: "lib".into(),
            extension: "jar".into(),
            classifier: None,
        };
        assert_eq!(
            resolver.resolve_artifact(&artifact),
            ResolveOutcome::Resolved(PathBuf::from("/work/lib/build/lib.jar"))
        );
    }

    #[test]
    fn unconvertible_project_source_fails_build() {
        let chain = LocalComponentConverterChain::new(vec![LocalComponentConverter::Project]);
        let err = ProjectDependencyResolver::build(&chain, &projects()).unwrap_err();
        assert!(matches!(err, ResolveError::UnconvertibleSource { .. }));
    }
}
