use super::graph::{ResolutionResult, ResolvedComponentResult};
use crate::error::{ResolveError, ResolveFailure};
use crate::graph::{DependencyGraphVisitor, NodeId, ResolvedGraphEdge, ResolvedGraphNode};
use crate::identity::{ComponentArtifactIdentifier, ComponentIdentifier, ModuleVersionIdentifier};
use crate::resolver::DependencyResolver;
use crate::store::StoreError;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// An artifact file of a node in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub id: ComponentArtifactIdentifier,
    pub node: NodeId,
    pub module_version: ModuleVersionIdentifier,
    pub file: PathBuf,
}

/// An artifact that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailure {
    pub artifact: ComponentArtifactIdentifier,
    pub node: NodeId,
    pub failure: ResolveFailure,
}

impl ArtifactFailure {
    #[must_use]
    pub fn to_error(&self) -> ResolveError {
        ResolveError::ArtifactFailure {
            artifact: self.artifact.to_string(),
            failure: self.failure.clone(),
        }
    }
}

/// The artifacts one node publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub node: NodeId,
    pub component: ComponentIdentifier,
    pub module_version: ModuleVersionIdentifier,
    pub artifacts: Vec<ComponentArtifactIdentifier>,
}

impl ArtifactSet {
    fn resolve(
        &self,
        artifact: &ComponentArtifactIdentifier,
        resolver: &dyn DependencyResolver,
    ) -> Result<ResolvedArtifact, ArtifactFailure> {
        resolver
            .resolve_artifact(artifact)
            .into_result(artifact)
            .map(|file| ResolvedArtifact {
                id: artifact.clone(),
                node: self.node,
                module_version: self.module_version.clone(),
                file,
            })
            .map_err(|failure| {
                warn!(%artifact, %failure, "artifact unresolved");
                ArtifactFailure {
                    artifact: artifact.clone(),
                    node: self.node,
                    failure,
                }
            })
    }
}

/// Artifacts resolved in phase two, by node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedArtifactResults {
    pub artifacts: BTreeMap<NodeId, Vec<ResolvedArtifact>>,
    pub failures: Vec<ArtifactFailure>,
}

/// Collects the artifact set of every non-root node during phase one.
#[derive(Debug, Clone, Default)]
pub struct ResolvedArtifactsBuilder {
    sets: Vec<ArtifactSet>,
}

impl ResolvedArtifactsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sets(&self) -> &[ArtifactSet] {
        &self.sets
    }

    /// Resolve every collected artifact.
    ///
    /// Artifacts are resolved in parallel; results are kept in node order
    /// and, within a node, in declaration order. A failed artifact does not
    /// affect the others.
    #[must_use]
    pub fn resolve(&self, resolver: &dyn DependencyResolver) -> ResolvedArtifactResults {
        let work: Vec<(&ArtifactSet, &ComponentArtifactIdentifier)> = self
            .sets
            .iter()
            .flat_map(|set| set.artifacts.iter().map(move |artifact| (set, artifact)))
            .collect();

        let outcomes: Vec<Result<ResolvedArtifact, ArtifactFailure>> = work
            .par_iter()
            .map(|(set, artifact)| set.resolve(artifact, resolver))
            .collect();

        let mut results = ResolvedArtifactResults::default();
        for outcome in outcomes {
            match outcome {
                Ok(artifact) => results
                    .artifacts
                    .entry(artifact.node)
                    .or_default()
                    .push(artifact),
                Err(failure) => results.failures.push(failure),
            }
        }
        debug!(
            resolved = results.artifacts.values().map(Vec::len).sum::<usize>(),
            failed = results.failures.len(),
            "artifacts resolved"
        );
        results
    }
}

impl DependencyGraphVisitor for ResolvedArtifactsBuilder {
    fn start(&mut self, _root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        Ok(())
    }

    fn visit_node(&mut self, node: &ResolvedGraphNode) -> Result<(), ResolveError> {
        if !node.is_root {
            self.sets.push(ArtifactSet {
                node: node.id,
                component: node.component.clone(),
                module_version: node.module_version.clone(),
                artifacts: node.metadata.artifacts_for(&node.configuration),
            });
        }
        Ok(())
    }

    fn visit_edges(&mut self, _: &ResolvedGraphNode, _: &[ResolvedGraphEdge]) -> Result<(), ResolveError> {
        Ok(())
    }

    fn finish(&mut self, _root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        Ok(())
    }
}

/// Artifacts of a detached request, resolved when asked for.
pub struct DetachedArtifacts {
    graph: Arc<ResolutionResult>,
    sets: Vec<ArtifactSet>,
    resolver: Arc<dyn DependencyResolver>,
}

impl DetachedArtifacts {
    #[must_use]
    pub fn new(
        graph: Arc<ResolutionResult>,
        builder: ResolvedArtifactsBuilder,
        resolver: Arc<dyn DependencyResolver>,
    ) -> Self {
        Self {
            graph,
            sets: builder.sets,
            resolver,
        }
    }

    /// Resolve the artifacts of every node of a component.
    #[must_use]
    pub fn artifacts_for(
        &self,
        component: &ComponentIdentifier,
    ) -> Vec<Result<ResolvedArtifact, ArtifactFailure>> {
        self.sets
            .iter()
            .filter(|set| &set.component == component)
            .flat_map(|set| {
                set.artifacts
                    .iter()
                    .map(|artifact| set.resolve(artifact, self.resolver.as_ref()))
            })
            .collect()
    }

    /// Walk the graph result, resolving each component's artifacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph result cannot be read.
    pub fn visit(
        &self,
        mut visit: impl FnMut(&ResolvedComponentResult, Vec<Result<ResolvedArtifact, ArtifactFailure>>),
    ) -> Result<(), StoreError> {
        self.graph
            .all_components(|component| visit(component, self.artifacts_for(&component.id)))
    }
}

impl std::fmt::Debug for DetachedArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetachedArtifacts")
            .field("root", self.graph.root_id())
            .field("sets", &self.sets.len())
            .finish_non_exhaustive()
    }
}
