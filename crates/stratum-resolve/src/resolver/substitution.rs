use super::{ArtifactResolveResult, ComponentResolveResult, DependencyResolver, IdResolveResult};
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier};
use crate::metadata::DependencyMetadata;
use crate::strategy::ResolutionStrategy;
use std::sync::Arc;
use tracing::debug;

/// Applies substitution and force rules before a dependency is resolved.
///
/// The rewritten selector is resolved instead of the requested one and the
/// rule's reason is merged into the resolved id.
pub struct DependencySubstitutionResolver {
    inner: Arc<dyn DependencyResolver>,
    strategy: ResolutionStrategy,
}

impl DependencySubstitutionResolver {
    #[must_use]
    pub fn new(inner: Arc<dyn DependencyResolver>, strategy: ResolutionStrategy) -> Self {
        Self { inner, strategy }
    }
}

impl DependencyResolver for DependencySubstitutionResolver {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult {
        let Some((selector, reason)) = self.strategy.apply(&dependency.selector) else {
            return self.inner.resolve_id(dependency);
        };
        debug!(requested = %dependency.selector, substituted = %selector, %reason, "dependency substituted");
        self.inner
            .resolve_id(&dependency.with_selector(selector))
            .map(|mut resolved| {
                resolved.reason = resolved.reason.merge(reason);
                resolved
            })
    }

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult {
        self.inner.resolve_component(id)
    }

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
        self.inner.resolve_artifact(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ComponentSelector, ModuleVersionIdentifier};
    use crate::local::{LocalComponentConverterChain, LocalSource, ProjectModel};
    use crate::metadata::ComponentMetadata;
    use crate::repository::InMemoryRepository;
    use crate::resolver::{ProjectDependencyResolver, RepositoryResolver, ResolverProviderChain};
    use crate::rules::GlobalDependencyResolutionRules;
    use crate::strategy::{DependencySubstitution, SubstitutionSource};
    use crate::version::VersionComparator;

    fn chain() -> Arc<dyn DependencyResolver> {
        let repo = InMemoryRepository::new("repo")
            .with_component(ComponentMetadata::for_module(ModuleVersionIdentifier::new("org", "a", "1.0")))
            .with_component(ComponentMetadata::for_module(ModuleVersionIdentifier::new("org", "a", "2.0")));
        let projects = ProjectDependencyResolver::build(
            &LocalComponentConverterChain::default(),
            &[LocalSource::Project(ProjectModel::new(
                ":a",
                ModuleVersionIdentifier::new("org", "a", "3.0-SNAPSHOT"),
            ))],
        )
        .unwrap();
        Arc::new(
            ResolverProviderChain::new()
                .with(Arc::new(projects))
                .with(Arc::new(RepositoryResolver::new(
                    Arc::new(repo),
                    VersionComparator::new(),
                    Arc::new(GlobalDependencyResolutionRules::new()),
                ))),
        )
    }

    fn dependency(notation: &str) -> DependencyMetadata {
        DependencyMetadata::new(ComponentSelector::parse(notation).unwrap())
    }

    #[test]
    fn forced_versions() {
        let resolver = DependencySubstitutionResolver::new(
            chain(),
            ResolutionStrategy::default().force(ModuleVersionIdentifier::new("org", "a", "1.0")),
        );
        let resolved = resolver.resolve_id(&dependency("org:a:2.0"));
        let id = resolved.resolved().unwrap();
        assert_eq!(id.module_version.version, "1.0");
        assert!(id.reason.forced);
    }

    #[test]
    fn module_to_project() {
        let resolver = DependencySubstitutionResolver::new(
            chain(),
            ResolutionStrategy::default().substitute(DependencySubstitution::new(
                SubstitutionSource::Module {
                    group: "org".into(),
                    name: "a".into(),
                    version: None,
                },
                ComponentSelector::project(":a"),
            )),
        );
        let resolved = resolver.resolve_id(&dependency("org:a:2.0"));
        let id = resolved.resolved().unwrap();
        assert_eq!(id.id, ComponentIdentifier::project(":a"));
        assert!(id.reason.selected_by_rule);
    }

    #[test]
    fn untouched_without_rules() {
        let resolver = DependencySubstitutionResolver::new(chain(), ResolutionStrategy::default());
        let resolved = resolver.resolve_id(&dependency("org:a:2.0"));
        let id = resolved.resolved().unwrap();
        assert_eq!(id.module_version.version, "2.0");
        assert!(id.reason.is_expected());
    }
}
