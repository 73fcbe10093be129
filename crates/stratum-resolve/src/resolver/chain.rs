use super::{
    ArtifactResolveResult, ComponentResolveResult, DependencyResolver, IdResolveResult,
    ResolveOutcome,
};
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier};
use crate::metadata::DependencyMetadata;
use std::sync::Arc;

/// Resolvers tried in priority order.
///
/// The first resolver that does not answer NotFound decides the outcome.
/// When every resolver misses, the searched locations of all of them are
/// reported together.
#[derive(Clone, Default)]
pub struct ResolverProviderChain {
    resolvers: Vec<Arc<dyn DependencyResolver>>,
}

impl ResolverProviderChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resolver: Arc<dyn DependencyResolver>) {
        self.resolvers.push(resolver);
    }

    #[must_use]
    pub fn with(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.push(resolver);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    fn first<T>(
        &self,
        attempt: impl Fn(&dyn DependencyResolver) -> ResolveOutcome<T>,
    ) -> ResolveOutcome<T> {
        let mut searched = Vec::new();
        for resolver in &self.resolvers {
            match attempt(resolver.as_ref()) {
                ResolveOutcome::NotFound(locations) => searched.extend(locations),
                outcome => return outcome,
            }
        }
        ResolveOutcome::NotFound(searched)
    }
}

impl DependencyResolver for ResolverProviderChain {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult {
        self.first(|resolver| resolver.resolve_id(dependency))
    }

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult {
        self.first(|resolver| resolver.resolve_component(id))
    }

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
        self.first(|resolver| resolver.resolve_artifact(artifact))
    }
}

impl std::fmt::Debug for ResolverProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverProviderChain")
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ComponentSelector, ModuleVersionIdentifier};
    use crate::metadata::ComponentMetadata;
    use crate::repository::InMemoryRepository;
    use crate::resolver::RepositoryResolver;
    use crate::rules::GlobalDependencyResolutionRules;
    use crate::version::VersionComparator;

    fn repository(repo: InMemoryRepository) -> Arc<dyn DependencyResolver> {
        Arc::new(RepositoryResolver::new(
            Arc::new(repo),
            VersionComparator::new(),
            Arc::new(GlobalDependencyResolutionRules::new()),
        ))
    }

    fn dependency(notation: &str) -> DependencyMetadata {
        DependencyMetadata::new(ComponentSelector::parse(notation).unwrap())
    }

    #[test]
    fn first_hit_wins() {
        let id = ModuleVersionIdentifier::new("org", "a", "1.0");
        let chain = ResolverProviderChain::new()
            .with(repository(InMemoryRepository::new("empty")))
            .with(repository(
                InMemoryRepository::new("second").with_component(ComponentMetadata::for_module(id.clone())),
            ));
        let resolved = chain.resolve_id(&dependency("org:a:1.0"));
        assert_eq!(resolved.resolved().unwrap().module_version, id);
    }

    #[test]
    fn misses_aggregate_searched_locations() {
        let chain = ResolverProviderChain::new()
            .with(repository(InMemoryRepository::new("one")))
            .with(repository(InMemoryRepository::new("two")));
        assert_eq!(
            chain.resolve_id(&dependency("org:a:1.0")),
            ResolveOutcome::NotFound(vec!["one".to_string(), "two".to_string()])
        );
    }

    #[test]
    fn failure_stops_the_chain() {
        let id = ModuleVersionIdentifier::new("org", "a", "1.0");
        let second = Arc::new(
            InMemoryRepository::new("second").with_component(ComponentMetadata::for_module(id.clone())),
        );
        let chain = ResolverProviderChain::new()
            .with(repository(
                InMemoryRepository::new("broken").failing(id.module.clone()),
            ))
            .with(Arc::new(RepositoryResolver::new(
                second.clone(),
                VersionComparator::new(),
                Arc::new(GlobalDependencyResolutionRules::new()),
            )));

        assert!(matches!(
            chain.resolve_id(&dependency("org:a:1.0")),
            ResolveOutcome::Failed(_)
        ));
        assert_eq!(second.request_count(), 0);
    }
}
