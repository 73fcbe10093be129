use crate::error::{ResolveError, ResolveFailure};
use crate::graph::{DependencyGraphVisitor, ResolvedGraphEdge, ResolvedGraphNode};
use crate::identity::{ComponentIdentifier, ComponentSelector, ModuleVersionIdentifier};
use crate::reason::SelectionReason;
use crate::store::{BinaryStore, RecordStore, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "kebab-case")]
enum GraphRecord {
    Component {
        id: ComponentIdentifier,
        module_version: ModuleVersionIdentifier,
        reason: SelectionReason,
    },
    Dependency {
        from: ComponentIdentifier,
        requested: ComponentSelector,
        reason: SelectionReason,
        outcome: DependencyOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
enum DependencyOutcome {
    Selected { id: ComponentIdentifier },
    Failed { failure: ResolveFailure },
}

/// A dependency of a component in the graph result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyResult {
    Resolved {
        from: ComponentIdentifier,
        requested: ComponentSelector,
        selected: ComponentIdentifier,
        reason: SelectionReason,
    },
    Unresolved {
        from: ComponentIdentifier,
        requested: ComponentSelector,
        failure: ResolveFailure,
    },
}

impl DependencyResult {
    #[must_use]
    pub fn from(&self) -> &ComponentIdentifier {
        match self {
            Self::Resolved { from, .. } | Self::Unresolved { from, .. } => from,
        }
    }

    #[must_use]
    pub fn requested(&self) -> &ComponentSelector {
        match self {
            Self::Resolved { requested, .. } | Self::Unresolved { requested, .. } => requested,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ComponentIdentifier> {
        match self {
            Self::Resolved { selected, .. } => Some(selected),
            Self::Unresolved { .. } => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&ResolveFailure> {
        match self {
            Self::Resolved { .. } => None,
            Self::Unresolved { failure, .. } => Some(failure),
        }
    }
}

/// A selected component and its outgoing dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedComponentResult {
    pub id: ComponentIdentifier,
    pub module_version: ModuleVersionIdentifier,
    pub reason: SelectionReason,
    pub dependencies: Vec<DependencyResult>,
    /// Components with a resolved dependency on this one.
    pub dependents: Vec<ComponentIdentifier>,
}

#[derive(Debug)]
struct LoadedGraph {
    components: Vec<ResolvedComponentResult>,
    index: HashMap<ComponentIdentifier, usize>,
}

impl LoadedGraph {
    fn component(&self, id: &ComponentIdentifier) -> Option<&ResolvedComponentResult> {
        self.index.get(id).map(|&i| &self.components[i])
    }
}

/// The graph-shaped result of a request.
///
/// Components and dependencies live in a binary store until first accessed;
/// the loaded graph is then kept for later calls.
#[derive(Debug)]
pub struct ResolutionResult {
    root: ComponentIdentifier,
    store: RecordStore<GraphRecord>,
    loaded: Mutex<Option<Arc<LoadedGraph>>>,
}

impl ResolutionResult {
    #[must_use]
    pub fn root_id(&self) -> &ComponentIdentifier {
        &self.root
    }

    /// # Errors
    ///
    /// Returns an error if the stored graph cannot be read.
    pub fn root(&self) -> Result<ResolvedComponentResult, StoreError> {
        self.component(&self.root)?
            .ok_or_else(|| StoreError::MissingRecord(self.root.to_string()))
    }

    /// # Errors
    ///
    /// Returns an error if the stored graph cannot be read.
    pub fn component(
        &self,
        id: &ComponentIdentifier,
    ) -> Result<Option<ResolvedComponentResult>, StoreError> {
        Ok(self.load()?.component(id).cloned())
    }

    /// Visit every component, root first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored graph cannot be read.
    pub fn all_components(
        &self,
        mut visit: impl FnMut(&ResolvedComponentResult),
    ) -> Result<(), StoreError> {
        let graph = self.load()?;
        graph.components.iter().for_each(|c| visit(c));
        Ok(())
    }

    /// Visit every dependency of every component.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored graph cannot be read.
    pub fn all_dependencies(&self, mut visit: impl FnMut(&DependencyResult)) -> Result<(), StoreError> {
        let graph = self.load()?;
        graph
            .components
            .iter()
            .flat_map(|c| &c.dependencies)
            .for_each(|d| visit(d));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the stored graph cannot be read.
    pub fn unresolved_dependencies(&self) -> Result<Vec<DependencyResult>, StoreError> {
        let mut unresolved = Vec::new();
        self.all_dependencies(|d| {
            if d.failure().is_some() {
                unresolved.push(d.clone());
            }
        })?;
        Ok(unresolved)
    }

    /// Whether the stored graph has been read yet.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.lock().is_some()
    }

    fn load(&self) -> Result<Arc<LoadedGraph>, StoreError> {
        let mut loaded = self.loaded.lock();
        if let Some(graph) = loaded.as_ref() {
            return Ok(graph.clone());
        }

        let mut components: Vec<ResolvedComponentResult> = Vec::new();
        let mut index = HashMap::new();
        self.store.replay(|record| {
            match record {
                GraphRecord::Component {
                    id,
                    module_version,
                    reason,
                } => {
                    index.insert(id.clone(), components.len());
                    components.push(ResolvedComponentResult {
                        id,
                        module_version,
                        reason,
                        dependencies: Vec::new(),
                        dependents: Vec::new(),
                    });
                }
                GraphRecord::Dependency {
                    from,
                    requested,
                    reason,
                    outcome,
                } => {
                    let owner = *index
                        .get(&from)
                        .ok_or_else(|| StoreError::MissingRecord(from.to_string()))?;
                    let dependency = match outcome {
                        DependencyOutcome::Selected { id } => DependencyResult::Resolved {
                            from,
                            requested,
                            selected: id,
                            reason,
                        },
                        DependencyOutcome::Failed { failure } => DependencyResult::Unresolved {
                            from,
                            requested,
                            failure,
                        },
                    };
                    components[owner].dependencies.push(dependency);
                }
            }
            Ok(())
        })?;

        let mut dependents: Vec<(usize, ComponentIdentifier)> = Vec::new();
        for component in &components {
            for selected in component.dependencies.iter().filter_map(DependencyResult::selected) {
                if let Some(&target) = index.get(selected) {
                    dependents.push((target, component.id.clone()));
                }
            }
        }
        for (target, dependent) in dependents {
            if !components[target].dependents.contains(&dependent) {
                components[target].dependents.push(dependent);
            }
        }

        debug!(components = components.len(), "graph result loaded");
        let graph = Arc::new(LoadedGraph { components, index });
        *loaded = Some(graph.clone());
        Ok(graph)
    }
}

/// Streams the graph result into a binary store as the graph is emitted.
///
/// Nodes of one component in several configurations collapse into a single
/// component; identical dependencies collapse likewise.
#[derive(Debug)]
pub struct StreamingResolutionResultBuilder {
    root: ComponentIdentifier,
    store: RecordStore<GraphRecord>,
    components: HashSet<ComponentIdentifier>,
    dependencies: HashSet<(ComponentIdentifier, ComponentSelector, DependencyOutcome)>,
}

impl StreamingResolutionResultBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn BinaryStore>, root: ComponentIdentifier) -> Self {
        Self {
            root,
            store: RecordStore::new(store),
            components: HashSet::new(),
            dependencies: HashSet::new(),
        }
    }

    #[must_use]
    pub fn complete(self) -> ResolutionResult {
        ResolutionResult {
            root: self.root,
            store: self.store,
            loaded: Mutex::new(None),
        }
    }
}

impl DependencyGraphVisitor for StreamingResolutionResultBuilder {
    fn start(&mut self, _root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        Ok(())
    }

    fn visit_node(&mut self, node: &ResolvedGraphNode) -> Result<(), ResolveError> {
        if self.components.insert(node.component.clone()) {
            self.store.append(&GraphRecord::Component {
                id: node.component.clone(),
                module_version: node.module_version.clone(),
                reason: node.reason,
            })?;
        }
        Ok(())
    }

    fn visit_edges(
        &mut self,
        node: &ResolvedGraphNode,
        edges: &[ResolvedGraphEdge],
    ) -> Result<(), ResolveError> {
        for edge in edges {
            let outcome = match &edge.target {
                Ok(target) => DependencyOutcome::Selected {
                    id: target.component.clone(),
                },
                Err(failure) => DependencyOutcome::Failed {
                    failure: failure.clone(),
                },
            };
            let key = (node.component.clone(), edge.requested.clone(), outcome.clone());
            if !self.dependencies.insert(key) {
                continue;
            }
            self.store.append(&GraphRecord::Dependency {
                from: node.component.clone(),
                requested: edge.requested.clone(),
                reason: edge.reason,
                outcome,
            })?;
        }
        Ok(())
    }

    fn finish(&mut self, _root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        Ok(())
    }
}
