use super::{
    ArtifactResolveResult, ComponentResolveResult, DependencyResolver, IdResolveResult,
    ResolveOutcome, ResolvedId,
};
use crate::error::ResolveFailure;
use crate::identity::{
    ComponentArtifactIdentifier, ComponentIdentifier, ComponentSelector, ModuleVersionIdentifier,
};
use crate::metadata::DependencyMetadata;
use crate::reason::SelectionReason;
use crate::repository::ModuleSource;
use crate::rules::GlobalDependencyResolutionRules;
use crate::version::VersionComparator;
use std::sync::Arc;
use tracing::{debug, trace};

/// Adapts one [`ModuleSource`] to the resolver interface.
///
/// Dynamic selectors are resolved by listing the module's versions and
/// taking the highest accepted one. Metadata rules run on every component
/// this resolver produces.
pub struct RepositoryResolver {
    source: Arc<dyn ModuleSource>,
    comparator: VersionComparator,
    rules: Arc<GlobalDependencyResolutionRules>,
}

impl RepositoryResolver {
    #[must_use]
    pub fn new(
        source: Arc<dyn ModuleSource>,
        comparator: VersionComparator,
        rules: Arc<GlobalDependencyResolutionRules>,
    ) -> Self {
        Self {
            source,
            comparator,
            rules,
        }
    }

    fn searched(&self) -> Vec<String> {
        vec![self.source.name().to_string()]
    }

    fn metadata(&self, id: &ModuleVersionIdentifier) -> ComponentResolveResult {
        match self.source.component_metadata(id) {
            Ok(Some(mut metadata)) => {
                self.rules.process_metadata(&mut metadata);
                ResolveOutcome::Resolved(Arc::new(metadata))
            }
            Ok(None) => ResolveOutcome::NotFound(self.searched()),
            Err(e) => ResolveOutcome::Failed(ResolveFailure::backend(id, self.source.name(), e)),
        }
    }
}

impl DependencyResolver for RepositoryResolver {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult {
        let ComponentSelector::Module { module, version } = &dependency.selector else {
            return ResolveOutcome::NotFound(Vec::new());
        };

        let chosen = if version.is_dynamic() {
            let versions = match self.source.list_versions(module) {
                Ok(Some(versions)) => versions,
                Ok(None) => return ResolveOutcome::NotFound(self.searched()),
                Err(e) => {
                    return ResolveOutcome::Failed(ResolveFailure::backend(
                        &dependency.selector,
                        self.source.name(),
                        e,
                    ))
                }
            };
            let Some(selected) = version.select(&self.comparator, versions.iter().map(String::as_str))
            else {
                trace!(repository = self.source.name(), selector = %dependency.selector, "no matching version");
                return ResolveOutcome::NotFound(vec![format!(
                    "{} (versions: {})",
                    self.source.name(),
                    versions.join(", ")
                )]);
            };
            debug!(repository = self.source.name(), selector = %dependency.selector, selected, "dynamic version selected");
            selected.to_string()
        } else {
            version.as_str().to_string()
        };

        let id = module.with_version(chosen);
        self.metadata(&id).map(|metadata| ResolvedId {
            id: metadata.component_id.clone(),
            module_version: id,
            reason: SelectionReason::REQUESTED,
            metadata: Some(metadata),
        })
    }

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult {
        match id {
            ComponentIdentifier::Module { id } => self.metadata(id),
            ComponentIdentifier::Project { .. } => ResolveOutcome::NotFound(Vec::new()),
        }
    }

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
        if artifact.component.is_project() {
            return ResolveOutcome::NotFound(Vec::new());
        }
        match self.source.artifact_file(artifact) {
            Ok(Some(path)) => ResolveOutcome::Resolved(path),
            Ok(None) => ResolveOutcome::NotFound(self.searched()),
            Err(e) => {
                ResolveOutcome::Failed(ResolveFailure::backend(artifact, self.source.name(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ModuleIdentifier;
    use crate::metadata::ComponentMetadata;
    use crate::repository::InMemoryRepository;
    use crate::rules::{ComponentMetadataRule, MetadataAction};

    fn resolver(rules: GlobalDependencyResolutionRules) -> RepositoryResolver {
        let repo = ["1.0", "1.1", "1.10", "2.0"]
            .iter()
            .fold(InMemoryRepository::new("repo"), |repo, version| {
                repo.with_component(ComponentMetadata::for_module(ModuleVersionIdentifier::new(
                    "org", "a", *version,
                )))
            })
            .failing(ModuleIdentifier::new("org", "down"));
        RepositoryResolver::new(Arc::new(repo), VersionComparator::new(), Arc::new(rules))
    }

    fn dependency(notation: &str) -> DependencyMetadata {
        DependencyMetadata::new(ComponentSelector::parse(notation).unwrap())
    }

    #[test]
    fn exact_version() {
        let resolver = resolver(GlobalDependencyResolutionRules::new());
        let resolved = resolver.resolve_id(&dependency("org:a:1.1"));
        let id = resolved.resolved().unwrap();
        assert_eq!(id.module_version.version, "1.1");
        assert!(id.metadata.is_some());
        assert_eq!(
            resolver.resolve_id(&dependency("org:a:3.0")),
            ResolveOutcome::NotFound(vec!["repo".into()])
        );
    }

    #[test]
    fn dynamic_versions() {
        let resolver = resolver(GlobalDependencyResolutionRules::new());
        let prefix = resolver.resolve_id(&dependency("org:a:1.+"));
        assert_eq!(prefix.resolved().unwrap().module_version.version, "1.10");
        let latest = resolver.resolve_id(&dependency("org:a:latest.release"));
        assert_eq!(latest.resolved().unwrap().module_version.version, "2.0");
        let range = resolver.resolve_id(&dependency("org:a:[1.0,2.0)"));
        assert_eq!(range.resolved().unwrap().module_version.version, "1.10");
        assert!(resolver.resolve_id(&dependency("org:a:3.+")).is_not_found());
    }

    #[test]
    fn source_errors_become_failures() {
        let resolver = resolver(GlobalDependencyResolutionRules::new());
        assert!(matches!(
            resolver.resolve_id(&dependency("org:down:1.0")),
            ResolveOutcome::Failed(ResolveFailure::Backend { .. })
        ));
        assert!(matches!(
            resolver.resolve_id(&dependency("org:down:1.+")),
            ResolveOutcome::Failed(ResolveFailure::Backend { .. })
        ));
    }

    #[test]
    fn projects_are_not_found() {
        let resolver = resolver(GlobalDependencyResolutionRules::new());
        assert_eq!(
            resolver.resolve_id(&DependencyMetadata::new(ComponentSelector::project(":app"))),
            ResolveOutcome::NotFound(Vec::new())
        );
        assert!(resolver
            .resolve_component(&ComponentIdentifier::project(":app"))
            .is_not_found());
    }

    #[test]
    fn metadata_rules_apply() {
        let rules = GlobalDependencyResolutionRules::new().with_metadata_rule(
            ComponentMetadataRule::new("org", "a", MetadataAction::SetStatus("milestone".into())),
        );
        let resolver = resolver(rules);
        let component = resolver.resolve_component(&ComponentIdentifier::module(
            ModuleVersionIdentifier::new("org", "a", "1.0"),
        ));
        assert_eq!(component.resolved().unwrap().status, "milestone");
    }
}
