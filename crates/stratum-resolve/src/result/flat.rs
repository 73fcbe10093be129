use crate::error::{ResolveError, ResolveFailure};
use crate::graph::{DependencyGraphVisitor, NodeId, ResolvedGraphEdge, ResolvedGraphNode};
use crate::identity::{ComponentIdentifier, ComponentSelector, ModuleVersionIdentifier};
use crate::store::{BinaryStore, RecordStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Records of the flat result, in the order they are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "kebab-case")]
pub(crate) enum FlatRecord {
    Node {
        id: NodeId,
        component: ComponentIdentifier,
        module_version: ModuleVersionIdentifier,
        configuration: String,
    },
    Root {
        id: NodeId,
    },
    FirstLevel {
        requested: ComponentSelector,
        child: NodeId,
    },
    ParentChild {
        parent: NodeId,
        child: NodeId,
    },
}

/// A dependency that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDependency {
    pub from: ModuleVersionIdentifier,
    pub requested: ComponentSelector,
    pub failure: ResolveFailure,
}

impl UnresolvedDependency {
    #[must_use]
    pub fn to_error(&self) -> ResolveError {
        ResolveError::UnresolvedDependency {
            from: self.from.to_string(),
            requested: self.requested.to_string(),
            failure: self.failure.clone(),
        }
    }
}

/// The part of the flat result kept in memory after phase one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedGraphResults {
    unresolved: Vec<UnresolvedDependency>,
    nodes: usize,
}

impl ResolvedGraphResults {
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.unresolved.is_empty()
    }

    #[must_use]
    pub fn unresolved_dependencies(&self) -> &[UnresolvedDependency] {
        &self.unresolved
    }

    /// Number of nodes written to the store.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes
    }
}

/// Streams the flat legacy result into a binary store.
///
/// Only unresolved dependencies stay in memory; nodes and their parent and
/// child links are replayed from the store in phase two.
#[derive(Debug)]
pub struct TransientConfigurationResultsBuilder {
    store: RecordStore<FlatRecord>,
    results: ResolvedGraphResults,
    links: HashSet<(NodeId, NodeId)>,
}

impl TransientConfigurationResultsBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn BinaryStore>) -> Self {
        Self {
            store: RecordStore::new(store),
            results: ResolvedGraphResults::default(),
            links: HashSet::new(),
        }
    }

    /// Split into the in-memory results and the store to replay later.
    #[must_use]
    pub fn complete(self) -> (ResolvedGraphResults, TransientConfigurationResultsLoader) {
        (
            self.results,
            TransientConfigurationResultsLoader { store: self.store },
        )
    }
}

impl DependencyGraphVisitor for TransientConfigurationResultsBuilder {
    fn start(&mut self, root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        self.store.append(&FlatRecord::Root { id: root.id })?;
        Ok(())
    }

    fn visit_node(&mut self, node: &ResolvedGraphNode) -> Result<(), ResolveError> {
        self.results.nodes += 1;
        self.store.append(&FlatRecord::Node {
            id: node.id,
            component: node.component.clone(),
            module_version: node.module_version.clone(),
            configuration: node.configuration.clone(),
        })?;
        Ok(())
    }

    fn visit_edges(
        &mut self,
        node: &ResolvedGraphNode,
        edges: &[ResolvedGraphEdge],
    ) -> Result<(), ResolveError> {
        for edge in edges {
            match &edge.target {
                Ok(target) => {
                    if node.is_root {
                        self.store.append(&FlatRecord::FirstLevel {
                            requested: edge.requested.clone(),
                            child: target.node,
                        })?;
                    }
                    if self.links.insert((node.id, target.node)) {
                        self.store.append(&FlatRecord::ParentChild {
                            parent: node.id,
                            child: target.node,
                        })?;
                    }
                }
                Err(failure) => self.results.unresolved.push(UnresolvedDependency {
                    from: node.module_version.clone(),
                    requested: edge.requested.clone(),
                    failure: failure.clone(),
                }),
            }
        }
        Ok(())
    }

    fn finish(&mut self, _root: &ResolvedGraphNode) -> Result<(), ResolveError> {
        debug!(
            nodes = self.results.nodes,
            unresolved = self.results.unresolved.len(),
            bytes = self.store.binary_store().size(),
            "flat result written"
        );
        Ok(())
    }
}

/// Replays the flat store. Held by the resolution session until phase two.
#[derive(Debug)]
pub struct TransientConfigurationResultsLoader {
    store: RecordStore<FlatRecord>,
}

impl TransientConfigurationResultsLoader {
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or is incomplete.
    pub fn load(&self) -> Result<TransientConfigurationResults, StoreError> {
        let mut root = None;
        let mut nodes = BTreeMap::new();
        let mut first_level = Vec::new();
        let mut links = Vec::new();

        self.store.replay(|record| {
            match record {
                FlatRecord::Root { id } => root = Some(id),
                FlatRecord::Node {
                    id,
                    component,
                    module_version,
                    configuration,
                } => {
                    nodes.insert(
                        id,
                        ResolvedDependency {
                            id,
                            component,
                            module_version,
                            configuration,
                            children: Vec::new(),
                            parents: Vec::new(),
                        },
                    );
                }
                FlatRecord::FirstLevel { requested, child } => first_level.push((requested, child)),
                FlatRecord::ParentChild { parent, child } => links.push((parent, child)),
            }
            Ok(())
        })?;

        for (parent, child) in links {
            if let Some(node) = nodes.get_mut(&parent) {
                node.children.push(child);
            }
            if let Some(node) = nodes.get_mut(&child) {
                node.parents.push(parent);
            }
        }

        let root = root.ok_or_else(|| StoreError::MissingRecord("root node".to_string()))?;
        Ok(TransientConfigurationResults {
            root,
            nodes,
            first_level,
        })
    }
}

/// A component in one configuration, as seen by flat consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub id: NodeId,
    pub component: ComponentIdentifier,
    pub module_version: ModuleVersionIdentifier,
    pub configuration: String,
    pub children: Vec<NodeId>,
    pub parents: Vec<NodeId>,
}

/// The flat result replayed from the store.
#[derive(Debug, Clone)]
pub struct TransientConfigurationResults {
    root: NodeId,
    nodes: BTreeMap<NodeId, ResolvedDependency>,
    first_level: Vec<(ComponentSelector, NodeId)>,
}

impl TransientConfigurationResults {
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ResolvedDependency> {
        self.nodes.get(&id)
    }

    /// Every node, root included, in node order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.nodes.values()
    }

    /// Dependencies declared by the root, with what they requested.
    #[must_use]
    pub fn first_level(&self) -> &[(ComponentSelector, NodeId)] {
        &self.first_level
    }
}
