use super::artifacts::{ArtifactFailure, ResolvedArtifact, ResolvedArtifactResults};
use super::flat::{ResolvedDependency, ResolvedGraphResults, TransientConfigurationResults, UnresolvedDependency};
use crate::error::ResolveException;
use crate::graph::NodeId;
use crate::identity::ComponentSelector;
use std::collections::{BTreeSet, VecDeque};
use std::path::PathBuf;

/// The flat result of a configuration, tolerating failures.
///
/// Everything that resolved is available; unresolved dependencies and
/// artifact failures are reported alongside instead of raised.
#[derive(Debug, Clone)]
pub struct LenientConfiguration {
    results: TransientConfigurationResults,
    graph: ResolvedGraphResults,
    artifacts: ResolvedArtifactResults,
}

impl LenientConfiguration {
    #[must_use]
    pub fn new(
        results: TransientConfigurationResults,
        graph: ResolvedGraphResults,
        artifacts: ResolvedArtifactResults,
    ) -> Self {
        Self {
            results,
            graph,
            artifacts,
        }
    }

    /// Direct dependencies of the root whose requested selector passes `filter`.
    pub fn first_level_module_dependencies(
        &self,
        filter: impl Fn(&ComponentSelector) -> bool,
    ) -> Vec<&ResolvedDependency> {
        let mut seen = BTreeSet::new();
        self.results
            .first_level()
            .iter()
            .filter(|(requested, _)| filter(requested))
            .filter(|(_, node)| seen.insert(*node))
            .filter_map(|(_, node)| self.results.node(*node))
            .collect()
    }

    /// Every node except the root.
    #[must_use]
    pub fn all_module_dependencies(&self) -> Vec<&ResolvedDependency> {
        let root = self.results.root();
        self.results.nodes().filter(|node| node.id != root).collect()
    }

    #[must_use]
    pub fn unresolved_module_dependencies(&self) -> &[UnresolvedDependency] {
        self.graph.unresolved_dependencies()
    }

    /// Artifacts of the matching first-level dependencies and everything
    /// they depend on, breadth first.
    pub fn artifacts(&self, filter: impl Fn(&ComponentSelector) -> bool) -> Vec<&ResolvedArtifact> {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<NodeId> = self
            .first_level_module_dependencies(filter)
            .iter()
            .map(|node| node.id)
            .collect();
        let mut artifacts: Vec<&ResolvedArtifact> = Vec::new();

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            for artifact in self.module_artifacts(id) {
                if !artifacts.iter().any(|known| known.id == artifact.id) {
                    artifacts.push(artifact);
                }
            }
            if let Some(node) = self.results.node(id) {
                queue.extend(node.children.iter().copied());
            }
        }
        artifacts
    }

    pub fn files(&self, filter: impl Fn(&ComponentSelector) -> bool) -> Vec<PathBuf> {
        self.artifacts(filter)
            .into_iter()
            .map(|artifact| artifact.file.clone())
            .collect()
    }

    #[must_use]
    pub fn module_artifacts(&self, node: NodeId) -> &[ResolvedArtifact] {
        self.artifacts.artifacts.get(&node).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn artifact_failures(&self) -> &[ArtifactFailure] {
        &self.artifacts.failures
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.graph.has_error() || !self.artifacts.failures.is_empty()
    }
}

/// The flat result of a configuration that fails on first use when
/// anything could not be resolved.
#[derive(Debug, Clone)]
pub struct ResolvedConfiguration {
    context: String,
    lenient: LenientConfiguration,
}

impl ResolvedConfiguration {
    #[must_use]
    pub fn new(context: impl Into<String>, lenient: LenientConfiguration) -> Self {
        Self {
            context: context.into(),
            lenient,
        }
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.lenient.has_error()
    }

    /// # Errors
    ///
    /// Returns every unresolved dependency and artifact failure.
    pub fn rethrow_failure(&self) -> Result<(), ResolveException> {
        if !self.has_error() {
            return Ok(());
        }
        let causes = self
            .lenient
            .unresolved_module_dependencies()
            .iter()
            .map(UnresolvedDependency::to_error)
            .chain(self.lenient.artifact_failures().iter().map(ArtifactFailure::to_error))
            .collect();
        Err(ResolveException::new(&self.context, causes))
    }

    /// # Errors
    ///
    /// Fails if anything could not be resolved.
    pub fn first_level_module_dependencies(
        &self,
        filter: impl Fn(&ComponentSelector) -> bool,
    ) -> Result<Vec<&ResolvedDependency>, ResolveException> {
        self.rethrow_failure()?;
        Ok(self.lenient.first_level_module_dependencies(filter))
    }

    /// # Errors
    ///
    /// Fails if anything could not be resolved.
    pub fn files(&self, filter: impl Fn(&ComponentSelector) -> bool) -> Result<Vec<PathBuf>, ResolveException> {
        self.rethrow_failure()?;
        Ok(self.lenient.files(filter))
    }

    /// # Errors
    ///
    /// Fails if anything could not be resolved.
    pub fn resolved_artifacts(&self) -> Result<Vec<ResolvedArtifact>, ResolveException> {
        self.rethrow_failure()?;
        Ok(self.lenient.artifacts(|_| true).into_iter().cloned().collect())
    }

    #[must_use]
    pub fn lenient_configuration(&self) -> &LenientConfiguration {
        &self.lenient
    }
}
