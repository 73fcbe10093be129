use super::{
    ArtifactResolveResult, ComponentResolveResult, DependencyResolver, IdResolveResult,
    ResolveOutcome,
};
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier};
use crate::metadata::DependencyMetadata;
use std::sync::Arc;
use tracing::trace;

/// Replaces a resolved module's dependencies with those of the client
/// module declared on the dependency.
pub struct ClientModuleResolver {
    inner: Arc<dyn DependencyResolver>,
}

impl ClientModuleResolver {
    #[must_use]
    pub fn new(inner: Arc<dyn DependencyResolver>) -> Self {
        Self { inner }
    }
}

impl DependencyResolver for ClientModuleResolver {
    fn resolve_id(&self, dependency: &DependencyMetadata) -> IdResolveResult {
        let outcome = self.inner.resolve_id(dependency);
        let Some(client_module) = &dependency.client_module else {
            return outcome;
        };
        let mut resolved = match outcome {
            ResolveOutcome::Resolved(resolved) => resolved,
            other => return other,
        };

        let metadata = match resolved.metadata.take() {
            Some(metadata) => metadata,
            None => match self.inner.resolve_component(&resolved.id) {
                ResolveOutcome::Resolved(metadata) => metadata,
                ResolveOutcome::NotFound(searched) => return ResolveOutcome::NotFound(searched),
                ResolveOutcome::Failed(failure) => return ResolveOutcome::Failed(failure),
            },
        };

        trace!(module = %client_module.id, dependencies = client_module.dependencies.len(), "applying client module");
        resolved.metadata = Some(Arc::new(
            metadata.with_dependencies(client_module.dependencies.clone()),
        ));
        ResolveOutcome::Resolved(resolved)
    }

    fn resolve_component(&self, id: &ComponentIdentifier) -> ComponentResolveResult {
        self.inner.resolve_component(id)
    }

    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> ArtifactResolveResult {
        self.inner.resolve_artifact(artifact)
    }
}
